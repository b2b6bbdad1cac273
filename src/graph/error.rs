//! Graph-specific error types.

use crate::graph::id::{ConnectionId, ModulationId, ModulationSourceId, NodeId};
use std::fmt;
use thiserror::Error;

/// Error raised by an effect or modulation source implementation.
pub type EffectError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias for effect and modulation source callbacks.
pub type EffectResult<T = ()> = std::result::Result<T, EffectError>;

/// The frame phase during which a node failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Update,
    Process,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Update => write!(f, "update"),
            Phase::Process => write!(f, "process"),
        }
    }
}

/// Errors that can occur within the effect graph.
///
/// Structural errors are raised before any mutation is applied, so the
/// graph is left exactly as it was.
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Connection {from:?} -> {to:?} would create a cycle")]
    CyclicGraph { from: NodeId, to: NodeId },

    #[error("Graph already has a device output sink {existing:?}")]
    MultipleSink { existing: NodeId },

    #[error("Node {0:?} not found")]
    NodeNotFound(NodeId),

    #[error("Connection {0:?} not found")]
    ConnectionNotFound(ConnectionId),

    #[error("Modulation source {0:?} not found")]
    ModulationSourceNotFound(ModulationSourceId),

    #[error("Modulation {0:?} not found")]
    ModulationNotFound(ModulationId),

    #[error("Node {node_id:?} has no {direction} channel {channel} (has {available})")]
    ChannelOutOfRange {
        node_id: NodeId,
        direction: &'static str,
        channel: usize,
        available: usize,
    },

    #[error("Node {node_id:?} failed during {phase}: {source}")]
    NodeExecution {
        node_id: NodeId,
        phase: Phase,
        #[source]
        source: EffectError,
    },

    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter { name: String, message: String },

    #[error("Unknown effect type '{0}'")]
    UnknownEffectType(String),

    #[error("Unknown modulation source type '{0}'")]
    UnknownModulationSourceType(String),

    #[error("No {0} ids left to allocate")]
    IdsExhausted(&'static str),

    #[error("Invalid graph state: {0}")]
    InvalidState(String),
}

impl GraphError {
    /// Node that caused this error, if any.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            GraphError::NodeNotFound(id) => Some(*id),
            GraphError::ChannelOutOfRange { node_id, .. } => Some(*node_id),
            GraphError::NodeExecution { node_id, .. } => Some(*node_id),
            _ => None,
        }
    }
}

pub type GraphResult<T> = std::result::Result<T, GraphError>;
