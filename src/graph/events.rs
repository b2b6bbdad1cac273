//! Structural change notifications.
//!
//! Listeners are registered on the graph and invoked synchronously, in
//! registration order, after each mutation has been committed.

use crate::graph::connection::Connection;
use crate::graph::id::{ModulationSourceId, NodeId};
use crate::graph::modulation::Modulation;
use crate::graph::parameter::ParameterValues;
use crossbeam_channel::Sender;

#[derive(Debug, Clone, PartialEq)]
pub enum GraphEvent {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    NodeUpdated {
        node_id: NodeId,
        values: ParameterValues,
    },
    ConnectionAdded(Connection),
    ConnectionRemoved(Connection),
    ModulationSourceAdded(ModulationSourceId),
    ModulationSourceRemoved(ModulationSourceId),
    ModulationSourceUpdated {
        source_id: ModulationSourceId,
        values: ParameterValues,
    },
    ModulationAdded(Modulation),
    ModulationRemoved(Modulation),
    ModulationUpdated {
        modulation: Modulation,
        values: ParameterValues,
    },
}

/// Receives [`GraphEvent`]s from a graph.
#[cfg_attr(test, mockall::automock)]
pub trait GraphListener: Send {
    fn on_event(&mut self, event: &GraphEvent);
}

/// Forwards events to another thread. A disconnected receiver is ignored.
impl GraphListener for Sender<GraphEvent> {
    fn on_event(&mut self, event: &GraphEvent) {
        let _ = self.send(event.clone());
    }
}
