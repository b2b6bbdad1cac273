use crate::graph::id::{ConnectionId, NodeId};

/// A directed edge from an output channel of one node to an input channel of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Connection {
    pub id: ConnectionId,
    pub from_node: NodeId,
    pub from_channel: usize,
    pub to_node: NodeId,
    pub to_channel: usize,
}

impl Connection {
    /// Whether this edge touches `node` at either end.
    pub fn touches(&self, node: NodeId) -> bool {
        self.from_node == node || self.to_node == node
    }

    /// Endpoints without the id, for comparing edge sets.
    pub fn endpoints(&self) -> (NodeId, usize, NodeId, usize) {
        (self.from_node, self.from_channel, self.to_node, self.to_channel)
    }
}
