//! LedOutput: the device-output effect.
//!
//! Forwards its input to an [`OutputDevice`] after applying a brightness
//! factor. It is the only built-in effect that reports itself as device
//! output, so adding it to a graph makes it the sink.

use crate::graph::{
    Effect, EffectCore, EffectResult, GraphResult, ParameterDefinition, ParameterValues,
    PixelBuffer, Signal,
};
use crate::graph::parameter::read_f64;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// Something that can display a frame, e.g. an LED strip driver.
pub trait OutputDevice: Send {
    fn name(&self) -> &str;

    fn show(&mut self, frame: &PixelBuffer) -> EffectResult;
}

/// Device handle shared between the registry factory and live effects.
pub type SharedDevice = Arc<Mutex<dyn OutputDevice>>;

/// Keeps the last frame in memory. Useful for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryDevice {
    last_frame: Option<PixelBuffer>,
    frames: u64,
}

impl MemoryDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a new device into a [`SharedDevice`], returning the typed handle too.
    pub fn shared() -> (Arc<Mutex<MemoryDevice>>, SharedDevice) {
        let device = Arc::new(Mutex::new(MemoryDevice::new()));
        let shared: SharedDevice = device.clone();
        (device, shared)
    }

    pub fn last_frame(&self) -> Option<&PixelBuffer> {
        self.last_frame.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl OutputDevice for MemoryDevice {
    fn name(&self) -> &str {
        "memory"
    }

    fn show(&mut self, frame: &PixelBuffer) -> EffectResult {
        self.last_frame = Some(frame.clone());
        self.frames += 1;
        Ok(())
    }
}

pub struct LedOutput {
    core: EffectCore,
    device: SharedDevice,
    brightness: f64,
}

impl LedOutput {
    pub fn new(device: SharedDevice) -> Self {
        Self {
            core: EffectCore::new(),
            device,
            brightness: 1.0,
        }
    }
}

impl Effect for LedOutput {
    fn type_name(&self) -> &'static str {
        "LedOutput"
    }

    fn num_input_channels(&self) -> usize {
        1
    }

    fn num_output_channels(&self) -> usize {
        1
    }

    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn is_device_output(&self) -> bool {
        true
    }

    fn process(&mut self, inputs: &[Option<Signal>], outputs: &mut [Option<Signal>]) -> EffectResult {
        let Some(input) = inputs[0].as_ref().and_then(Signal::as_pixels) else {
            outputs[0] = None;
            return Ok(());
        };

        let mut frame = input.clone();
        frame.scale(self.modulated_parameter("brightness", self.brightness) as f32);
        {
            let mut device = self
                .device
                .lock()
                .map_err(|_| "output device lock poisoned")?;
            device.show(&frame)?;
        }
        outputs[0] = Some(Signal::Pixels(frame));
        Ok(())
    }

    fn parameter_definition(&self) -> ParameterDefinition {
        ParameterDefinition::new().with("brightness", 1.0, 0.0, 1.0, 0.01)
    }

    fn parameters(&self) -> ParameterValues {
        let mut values = ParameterValues::new();
        values.insert("brightness".into(), Value::from(self.brightness));
        values
    }

    fn update_parameters(&mut self, values: &ParameterValues) -> GraphResult<()> {
        if let Some(brightness) = read_f64(values, "brightness")? {
            self.brightness = brightness.clamp(0.0, 1.0);
        }
        Ok(())
    }
}
