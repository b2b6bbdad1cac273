//! Effect graph engine.
//!
//! Effects are nodes in a directed acyclic graph. Pixel data flows from
//! generators through transforms into a single device-output node (the sink),
//! which also drives resolution negotiation: the sink's pixel count is pushed
//! upstream and every node learns how many pixels it has to produce.
//!
//! # Architecture
//!
//! ```text
//! [ModulationSource] ──(offset)──┐
//!                                ▼
//! [StaticColor] ──► [Panelize] ──► [LedOutput]  (sink)
//! ```
//!
//! # Design
//!
//! - **Cached schedule**: every structural edit recomputes the execution order,
//!   so frames never re-derive it.
//! - **Parallel update, sequential process**: `update` runs on rayon across the
//!   scheduled nodes, `process` walks the order and moves buffers downstream.
//! - **Stable ids**: per-kind `u32` newtypes that survive serialization.
//! - **Dedicated thread**: [`FrameDriver`] owns the graph and serializes edits
//!   against frames through a command channel.

pub mod buffer;
pub mod connection;
pub mod driver;
pub mod effect;
pub mod error;
pub mod events;
pub mod filter_graph;
pub mod id;
pub mod modulation;
pub mod node;
pub mod parameter;
pub mod registry;
pub mod scheduler;
pub mod state;
pub mod timing;

#[cfg(test)]
mod test_support;

pub use buffer::{AudioBuffer, PixelBuffer, Rgb, Signal};
pub use connection::Connection;
pub use driver::{DriverCommand, DriverHandle, DriverMessage, FrameDriver, FrameStats};
pub use effect::{Effect, EffectCore};
pub use error::{EffectError, EffectResult, GraphError, GraphResult, Phase};
pub use events::{GraphEvent, GraphListener};
pub use filter_graph::{FilterGraph, TimingKey};
pub use id::{ConnectionId, ModulationId, ModulationSourceId, NodeId};
pub use modulation::{Modulation, ModulationSource, ModulationSourceNode};
pub use node::Node;
pub use parameter::{ParameterDefinition, ParameterSpec, ParameterValues};
pub use registry::EffectRegistry;
pub use scheduler::{ExecutionPlan, PlanStats};
pub use state::{
    ConnectionState, EffectState, GraphState, ModulationSourceState, ModulationState, NodeState,
};
pub use timing::Timing;
