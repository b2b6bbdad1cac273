//! StaticColor: fills its output with one color.

use crate::graph::parameter::{read_f64, read_rgb};
use crate::graph::{
    Effect, EffectCore, EffectResult, GraphResult, ParameterDefinition, ParameterValues, Rgb,
    Signal,
};
use serde_json::{json, Value};

pub struct StaticColor {
    core: EffectCore,
    color: Rgb,
    brightness: f64,
}

impl StaticColor {
    pub fn new(color: Rgb) -> Self {
        Self {
            core: EffectCore::new(),
            color,
            brightness: 1.0,
        }
    }
}

impl Default for StaticColor {
    fn default() -> Self {
        Self::new([255.0, 255.0, 255.0])
    }
}

impl Effect for StaticColor {
    fn type_name(&self) -> &'static str {
        "StaticColor"
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

    fn process(&mut self, _inputs: &[Option<Signal>], outputs: &mut [Option<Signal>]) -> EffectResult {
        let brightness = self.modulated_parameter("brightness", self.brightness) as f32;
        outputs[0] = self.core.blank_buffer().map(|mut buf| {
            buf.fill(self.color);
            buf.scale(brightness);
            Signal::Pixels(buf)
        });
        Ok(())
    }

    fn parameter_definition(&self) -> ParameterDefinition {
        ParameterDefinition::new().with("brightness", 1.0, 0.0, 1.0, 0.01)
    }

    fn parameters(&self) -> ParameterValues {
        let mut values = ParameterValues::new();
        values.insert("color".into(), json!(self.color));
        values.insert("brightness".into(), Value::from(self.brightness));
        values
    }

    fn update_parameters(&mut self, values: &ParameterValues) -> GraphResult<()> {
        let color = read_rgb(values, "color")?;
        let brightness = read_f64(values, "brightness")?;
        if let Some(color) = color {
            self.color = color;
        }
        if let Some(brightness) = brightness {
            self.brightness = brightness.clamp(0.0, 1.0);
        }
        Ok(())
    }
}
