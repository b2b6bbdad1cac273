//! Built-in modulation sources.

use crate::graph::parameter::read_f64;
use crate::graph::{GraphResult, ModulationSource, ParameterDefinition, ParameterValues};
use serde_json::Value;
use std::f64::consts::TAU;

/// Emits a fixed value.
#[derive(Debug, Clone)]
pub struct ConstantSource {
    value: f64,
}

impl ConstantSource {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

impl Default for ConstantSource {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ModulationSource for ConstantSource {
    fn type_name(&self) -> &'static str {
        "ConstantSource"
    }

    fn update(&mut self, _dt: f64) {}

    fn value(&self) -> f64 {
        self.value
    }

    fn parameter_definition(&self) -> ParameterDefinition {
        ParameterDefinition::new().with("value", 1.0, 0.0, 1.0, 0.01)
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

/// Sine low-frequency oscillator in `[0, 1]`: `0.5 + 0.5 * sin(2π f t)`.
#[derive(Debug, Clone)]
pub struct SineLfo {
    frequency: f64,
    time: f64,
}

impl SineLfo {
    pub fn new(frequency: f64) -> Self {
        Self {
            frequency,
            time: 0.0,
        }
    }
}

impl Default for SineLfo {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ModulationSource for SineLfo {
    fn type_name(&self) -> &'static str {
        "SineLfo"
    }

    fn update(&mut self, dt: f64) {
        self.time += dt;
        // Keep the phase accumulator small on long runs
        if self.frequency > 0.0 {
            self.time %= 1.0 / self.frequency;
        }
    }

    fn value(&self) -> f64 {
        0.5 + 0.5 * (TAU * self.frequency * self.time).sin()
    }

    fn parameter_definition(&self) -> ParameterDefinition {
        ParameterDefinition::new().with("frequency", 1.0, 0.01, 20.0, 0.01)
    }

    fn parameters(&self) -> ParameterValues {
        let mut values = ParameterValues::new();
        values.insert("frequency".into(), Value::from(self.frequency));
        values
    }

    fn update_parameters(&mut self, values: &ParameterValues) -> GraphResult<()> {
        if let Some(frequency) = read_f64(values, "frequency")? {
            self.frequency = frequency.max(0.0);
        }
        Ok(())
    }
}
