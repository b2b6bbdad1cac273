//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod mock_helpers;

use audioled_rs::graph::{FilterGraph, NodeId, PixelBuffer, Signal};
use std::time::Duration;

/// Create a test timeout duration
pub fn test_timeout() -> Duration {
    Duration::from_millis(100)
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Pixel output of `node` on `channel` after the last process pass
pub fn output_pixels(graph: &FilterGraph, node: NodeId, channel: usize) -> Option<PixelBuffer> {
    graph
        .node(node)
        .and_then(|n| n.output(channel))
        .and_then(Signal::as_pixels)
        .cloned()
}

/// Run one full frame, panicking on failure
pub fn run_frame(graph: &mut FilterGraph, dt: f64) {
    graph.update(dt).expect("update failed");
    graph.process().expect("process failed");
}
