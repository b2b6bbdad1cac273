//! # audioled-rs: real-time LED effect graph engine
//!
//! Effects are wired into a directed acyclic graph that ends in one
//! device-output node. Every frame the engine advances modulation sources,
//! updates all scheduled effects (concurrently by default) and then moves
//! pixel buffers from generators through transforms into the device.
//!
//! ## Architecture
//!
//! - **Graph**: nodes, connections, modulation and the cached execution order
//! - **Effects**: built-in generators, panel mappers, modulators and the LED output
//! - **Driver**: runs the graph on a dedicated thread, edited through crossbeam channels
//! - **Config**: TOML engine settings and JSON project files
//!
//! ## Example
//!
//! ```ignore
//! use audioled_rs::{
//!     config::EngineConfig,
//!     effects::{LedOutput, MemoryDevice, StaticColor},
//!     graph::{FilterGraph, FrameDriver},
//! };
//!
//! let config = EngineConfig::default();
//! let (_device, shared) = MemoryDevice::shared();
//!
//! let mut graph = FilterGraph::new(config.graph);
//! let color = graph.add_effect_node(Box::new(StaticColor::new([255.0, 0.0, 0.0])))?;
//! let led = graph.add_effect_node(Box::new(LedOutput::new(shared)))?;
//! graph.add_connection(color, 0, led, 0)?;
//! graph.propagate_num_pixels(config.display.num_pixels, config.display.num_rows);
//!
//! let driver = FrameDriver::spawn(graph, config.driver)?;
//! driver.start();
//! ```

pub mod config;
pub mod effects;
pub mod error;
pub mod graph;

// Re-export commonly used types
pub use config::{EngineConfig, ProjectFile};
pub use error::{AudioledError, Result};
pub use graph::{
    Effect, EffectRegistry, FilterGraph, GraphError, GraphResult, GraphState, ModulationSource,
    NodeId,
};
