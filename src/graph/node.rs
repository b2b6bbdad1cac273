//! Graph vertex wrapping one effect and its per-frame buffers.

use crate::graph::buffer::Signal;
use crate::graph::effect::Effect;
use crate::graph::error::{GraphError, GraphResult, Phase};
use crate::graph::id::{ConnectionId, NodeId};

/// A node owns its effect, one slot per input/output channel and the ids of
/// the connections feeding it.
pub struct Node {
    id: NodeId,
    effect: Box<dyn Effect>,
    inputs: Vec<Option<Signal>>,
    outputs: Vec<Option<Signal>>,
    incoming: Vec<ConnectionId>,
}

impl Node {
    pub fn new(id: NodeId, effect: Box<dyn Effect>) -> Self {
        let inputs = vec![None; effect.num_input_channels()];
        let outputs = vec![None; effect.num_output_channels()];
        Self {
            id,
            effect,
            inputs,
            outputs,
            incoming: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn effect(&self) -> &dyn Effect {
        self.effect.as_ref()
    }

    pub fn effect_mut(&mut self) -> &mut dyn Effect {
        self.effect.as_mut()
    }

    pub fn into_effect(self) -> Box<dyn Effect> {
        self.effect
    }

    /// Human-readable label, e.g. `StaticColor#3`.
    pub fn label(&self) -> String {
        format!("{}#{}", self.effect.type_name(), self.id.0)
    }

    pub fn inputs(&self) -> &[Option<Signal>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Option<Signal>] {
        &self.outputs
    }

    pub fn input(&self, channel: usize) -> Option<&Signal> {
        self.inputs.get(channel).and_then(Option::as_ref)
    }

    pub fn output(&self, channel: usize) -> Option<&Signal> {
        self.outputs.get(channel).and_then(Option::as_ref)
    }

    pub fn incoming_connections(&self) -> &[ConnectionId] {
        &self.incoming
    }

    pub(crate) fn add_incoming(&mut self, id: ConnectionId) {
        self.incoming.push(id);
    }

    pub(crate) fn remove_incoming(&mut self, id: ConnectionId) {
        self.incoming.retain(|c| *c != id);
    }

    pub(crate) fn clear_inputs(&mut self) {
        self.inputs.iter_mut().for_each(|slot| *slot = None);
    }

    pub(crate) fn set_input(&mut self, channel: usize, value: Option<Signal>) {
        if let Some(slot) = self.inputs.get_mut(channel) {
            *slot = value;
        }
    }

    pub fn update(&mut self, dt: f64) -> GraphResult<()> {
        self.effect
            .update(dt)
            .map_err(|source| GraphError::NodeExecution {
                node_id: self.id,
                phase: Phase::Update,
                source,
            })
    }

    pub fn process(&mut self) -> GraphResult<()> {
        self.effect
            .process(&self.inputs, &mut self.outputs)
            .map_err(|source| GraphError::NodeExecution {
                node_id: self.id,
                phase: Phase::Process,
                source,
            })
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("effect", &self.effect.type_name())
            .field("inputs", &self.inputs.len())
            .field("outputs", &self.outputs.len())
            .field("incoming", &self.incoming)
            .finish()
    }
}
