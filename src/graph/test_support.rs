//! Minimal effects and sources for unit tests.

use crate::graph::buffer::{PixelBuffer, Signal};
use crate::graph::effect::{Effect, EffectCore};
use crate::graph::error::{EffectResult, GraphResult};
use crate::graph::modulation::ModulationSource;
use crate::graph::parameter::{read_f64, ParameterDefinition, ParameterValues};
use serde_json::Value;

/// One input, one output, copies input to output. Declares `gain` in `[0, 2]`.
pub struct PassThrough {
    core: EffectCore,
    gain: f64,
}

impl PassThrough {
    pub fn new() -> Self {
        Self {
            core: EffectCore::new(),
            gain: 1.0,
        }
    }
}

impl Effect for PassThrough {
    fn type_name(&self) -> &'static str {
        "PassThrough"
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

    fn process(&mut self, inputs: &[Option<Signal>], outputs: &mut [Option<Signal>]) -> EffectResult {
        outputs[0] = inputs[0].clone();
        Ok(())
    }

    fn parameter_definition(&self) -> ParameterDefinition {
        ParameterDefinition::new().with("gain", 1.0, 0.0, 2.0, 0.01)
    }

    fn parameters(&self) -> ParameterValues {
        let mut values = ParameterValues::new();
        values.insert("gain".into(), Value::from(self.gain));
        values
    }

    fn update_parameters(&mut self, values: &ParameterValues) -> GraphResult<()> {
        if let Some(gain) = read_f64(values, "gain")? {
            self.gain = gain;
        }
        Ok(())
    }
}

/// No inputs, one output filled with a fixed color. Counts updates.
pub struct Generator {
    core: EffectCore,
    pub updates: usize,
}

impl Generator {
    pub fn new() -> Self {
        Self {
            core: EffectCore::new(),
            updates: 0,
        }
    }
}

impl Effect for Generator {
    fn type_name(&self) -> &'static str {
        "Generator"
    }

    fn num_input_channels(&self) -> usize {
        0
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

    fn update(&mut self, _dt: f64) -> EffectResult {
        self.updates += 1;
        Ok(())
    }

    fn process(&mut self, _inputs: &[Option<Signal>], outputs: &mut [Option<Signal>]) -> EffectResult {
        outputs[0] = self.core.blank_buffer().map(|mut buf| {
            buf.fill([10.0, 20.0, 30.0]);
            Signal::Pixels(buf)
        });
        Ok(())
    }
}

/// Two inputs, one output; forwards the first present input.
pub struct Mixer {
    core: EffectCore,
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            core: EffectCore::new(),
        }
    }
}

impl Effect for Mixer {
    fn type_name(&self) -> &'static str {
        "Mixer"
    }

    fn num_input_channels(&self) -> usize {
        2
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

    fn process(&mut self, inputs: &[Option<Signal>], outputs: &mut [Option<Signal>]) -> EffectResult {
        outputs[0] = inputs.iter().flatten().next().cloned();
        Ok(())
    }
}

/// Requests twice its output resolution and keeps every second pixel.
pub struct Doubler {
    core: EffectCore,
}

impl Doubler {
    pub fn new() -> Self {
        Self {
            core: EffectCore::new(),
        }
    }
}

impl Effect for Doubler {
    fn type_name(&self) -> &'static str {
        "Doubler"
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

    fn num_input_pixels(&self, _channel: usize) -> Option<usize> {
        self.core.num_pixels().map(|p| p * 2)
    }

    fn process(&mut self, inputs: &[Option<Signal>], outputs: &mut [Option<Signal>]) -> EffectResult {
        outputs[0] = inputs[0].as_ref().and_then(Signal::as_pixels).map(|buf| {
            let pixels = buf.pixels().iter().step_by(2).copied().collect();
            Signal::Pixels(PixelBuffer::from_pixels(pixels, buf.num_rows()))
        });
        Ok(())
    }
}

/// Device-output effect that counts processed frames.
pub struct TestSink {
    core: EffectCore,
    pub frames: usize,
}

impl TestSink {
    pub fn new() -> Self {
        Self {
            core: EffectCore::new(),
            frames: 0,
        }
    }
}

impl Effect for TestSink {
    fn type_name(&self) -> &'static str {
        "TestSink"
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
        self.frames += 1;
        outputs[0] = inputs[0].clone();
        Ok(())
    }
}

/// Fails in the configured phase.
pub struct Failing {
    core: EffectCore,
    fail_update: bool,
    fail_process: bool,
}

impl Failing {
    pub fn on_update() -> Self {
        Self {
            core: EffectCore::new(),
            fail_update: true,
            fail_process: false,
        }
    }

    pub fn on_process() -> Self {
        Self {
            core: EffectCore::new(),
            fail_update: false,
            fail_process: true,
        }
    }
}

impl Effect for Failing {
    fn type_name(&self) -> &'static str {
        "Failing"
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

    fn update(&mut self, _dt: f64) -> EffectResult {
        if self.fail_update {
            return Err("update failed".into());
        }
        Ok(())
    }

    fn process(&mut self, inputs: &[Option<Signal>], outputs: &mut [Option<Signal>]) -> EffectResult {
        if self.fail_process {
            return Err("process failed".into());
        }
        outputs[0] = inputs[0].clone();
        Ok(())
    }
}

/// Modulation source with a settable value.
pub struct Constant {
    pub value: f64,
}

impl Constant {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl ModulationSource for Constant {
    fn type_name(&self) -> &'static str {
        "Constant"
    }

    fn update(&mut self, _dt: f64) {}

    fn value(&self) -> f64 {
        self.value
    }

    fn parameters(&self) -> ParameterValues {
        let mut values = ParameterValues::new();
        values.insert("value".into(), Value::from(self.value));
        values
    }

    fn update_parameters(&mut self, values: &ParameterValues) -> GraphResult<()> {
        if let Some(value) = read_f64(values, "value")? {
            self.value = value;
        }
        Ok(())
    }
}
