//! Parameter metadata and value payloads for effects and modulation sources.
//!
//! Parameter values travel as a JSON object so that a control surface can
//! send partial updates without knowing the concrete effect type.

use crate::graph::error::{GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter values keyed by name.
pub type ParameterValues = serde_json::Map<String, Value>;

/// Numeric range and default for one parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, default: f64, min: f64, max: f64, step: f64) -> Self {
        Self {
            name: name.into(),
            default,
            min,
            max,
            step,
        }
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Applies an offset expressed in units of the parameter's range.
    pub fn modulate(&self, base: f64, offset: f64) -> f64 {
        (base + offset * self.range()).clamp(self.min, self.max)
    }
}

/// Ordered parameter metadata of an effect or modulation source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub parameters: Vec<ParameterSpec>,
}

impl ParameterDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, default: f64, min: f64, max: f64, step: f64) -> Self {
        self.parameters
            .push(ParameterSpec::new(name, default, min, max, step));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Default values for every parameter.
    pub fn defaults(&self) -> ParameterValues {
        self.parameters
            .iter()
            .map(|p| (p.name.clone(), Value::from(p.default)))
            .collect()
    }
}

// ==================== Payload Readers ====================

fn invalid(name: &str, message: impl Into<String>) -> GraphError {
    GraphError::InvalidParameter {
        name: name.to_string(),
        message: message.into(),
    }
}

/// Reads an optional numeric parameter. Missing keys yield `Ok(None)`.
pub fn read_f64(values: &ParameterValues, name: &str) -> GraphResult<Option<f64>> {
    match values.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_f64()
            .map(Some)
            .ok_or_else(|| invalid(name, format!("expected a number, got {}", v))),
    }
}

pub fn read_bool(values: &ParameterValues, name: &str) -> GraphResult<Option<bool>> {
    match values.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_bool()
            .map(Some)
            .ok_or_else(|| invalid(name, format!("expected a boolean, got {}", v))),
    }
}

/// Reads an optional string. `null` is reported as `Some(None)` so callers
/// can distinguish "clear" from "leave unchanged".
pub fn read_nullable_string(
    values: &ParameterValues,
    name: &str,
) -> GraphResult<Option<Option<String>>> {
    match values.get(name) {
        None => Ok(None),
        Some(Value::Null) => Ok(Some(None)),
        Some(Value::String(s)) => Ok(Some(Some(s.clone()))),
        Some(v) => Err(invalid(name, format!("expected a string, got {}", v))),
    }
}

/// Reads an RGB triple given as a three-element number array.
pub fn read_rgb(values: &ParameterValues, name: &str) -> GraphResult<Option<[f32; 3]>> {
    match values.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) if items.len() == 3 => {
            let mut rgb = [0.0f32; 3];
            for (slot, item) in rgb.iter_mut().zip(items) {
                let c = item
                    .as_f64()
                    .ok_or_else(|| invalid(name, "color components must be numbers"))?;
                *slot = c.clamp(0.0, 255.0) as f32;
            }
            Ok(Some(rgb))
        }
        Some(v) => Err(invalid(name, format!("expected [r, g, b], got {}", v))),
    }
}
