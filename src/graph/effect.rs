//! The effect capability contract.
//!
//! An [`Effect`] is a unit of signal or pixel processing with a fixed number of
//! input and output channels. The graph only ever talks to effects through this
//! trait; concrete effects live in [`crate::effects`] or in downstream crates.
//!
//! Resolution (pixel and row counts) and parameter offsets are shared state
//! that every effect carries, so they are kept in an [`EffectCore`] the effect
//! embeds. The trait's default methods read and write that core, which gives
//! every effect pass-through resolution negotiation for free.

use crate::graph::buffer::{PixelBuffer, Signal};
use crate::graph::error::{EffectResult, GraphResult};
use crate::graph::parameter::{ParameterDefinition, ParameterValues};
use crate::graph::state::EffectState;
use std::collections::HashMap;

/// Resolution and modulation offsets embedded by every effect.
#[derive(Debug, Clone)]
pub struct EffectCore {
    num_pixels: Option<usize>,
    num_rows: usize,
    offsets: HashMap<String, f64>,
}

impl Default for EffectCore {
    fn default() -> Self {
        Self {
            num_pixels: None,
            num_rows: 1,
            offsets: HashMap::new(),
        }
    }
}

impl EffectCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolved output pixel count, `None` while unresolved.
    pub fn num_pixels(&self) -> Option<usize> {
        self.num_pixels
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Output columns, i.e. pixels per row.
    pub fn num_cols(&self) -> Option<usize> {
        self.num_pixels.map(|p| p / self.num_rows.max(1))
    }

    pub fn set_num_pixels(&mut self, num_pixels: Option<usize>) {
        self.num_pixels = num_pixels;
    }

    pub fn set_num_rows(&mut self, num_rows: usize) {
        self.num_rows = num_rows.max(1);
    }

    pub fn offset(&self, name: &str) -> f64 {
        self.offsets.get(name).copied().unwrap_or(0.0)
    }

    pub fn set_offset(&mut self, name: &str, value: f64) {
        self.offsets.insert(name.to_string(), value);
    }

    pub fn reset_offsets(&mut self) {
        self.offsets.clear();
    }

    /// A black buffer matching the resolved output resolution.
    pub fn blank_buffer(&self) -> Option<PixelBuffer> {
        self.num_pixels
            .map(|pixels| PixelBuffer::new(pixels, self.num_rows))
    }
}

/// A processing unit hosted by a [`Node`](crate::graph::Node).
pub trait Effect: Send {
    /// Registry name used to serialize and recreate this effect.
    fn type_name(&self) -> &'static str;

    fn num_input_channels(&self) -> usize;

    fn num_output_channels(&self) -> usize;

    fn core(&self) -> &EffectCore;

    fn core_mut(&mut self) -> &mut EffectCore;

    /// Advance internal state by `dt` seconds. Must only touch this effect.
    fn update(&mut self, _dt: f64) -> EffectResult {
        Ok(())
    }

    /// Read `inputs`, write `outputs`. Slot counts match the channel counts.
    fn process(&mut self, inputs: &[Option<Signal>], outputs: &mut [Option<Signal>])
        -> EffectResult;

    /// Whether this effect drives the physical display and may act as sink.
    fn is_device_output(&self) -> bool {
        false
    }

    fn parameter_definition(&self) -> ParameterDefinition {
        ParameterDefinition::default()
    }

    /// Current base values of all parameters.
    fn parameters(&self) -> ParameterValues {
        ParameterValues::new()
    }

    /// Apply a partial parameter update. Unknown keys are ignored.
    fn update_parameters(&mut self, _values: &ParameterValues) -> GraphResult<()> {
        Ok(())
    }

    // ── Resolution negotiation ──

    fn num_output_pixels(&self) -> Option<usize> {
        self.core().num_pixels()
    }

    fn num_output_rows(&self) -> usize {
        self.core().num_rows()
    }

    fn set_num_output_pixels(&mut self, num_pixels: Option<usize>) {
        self.core_mut().set_num_pixels(num_pixels);
    }

    fn set_num_output_rows(&mut self, num_rows: usize) {
        self.core_mut().set_num_rows(num_rows);
    }

    /// Pixels this effect needs on input `channel` to produce its output.
    fn num_input_pixels(&self, _channel: usize) -> Option<usize> {
        self.core().num_pixels()
    }

    fn num_input_rows(&self, _channel: usize) -> usize {
        self.core().num_rows()
    }

    // ── Modulation offsets ──

    fn parameter_offset(&self, name: &str) -> f64 {
        self.core().offset(name)
    }

    fn set_parameter_offset(&mut self, name: &str, value: f64) {
        self.core_mut().set_offset(name, value);
    }

    fn reset_parameter_offsets(&mut self) {
        self.core_mut().reset_offsets();
    }

    /// `base` with the current offset for `name` applied.
    fn modulated_parameter(&self, name: &str, base: f64) -> f64 {
        let offset = self.parameter_offset(name);
        match self.parameter_definition().get(name) {
            Some(spec) => spec.modulate(base, offset),
            None => base + offset,
        }
    }

    fn state(&self) -> EffectState {
        EffectState {
            type_name: self.type_name().to_string(),
            params: self.parameters(),
        }
    }
}
