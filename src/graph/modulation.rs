//! Parameter modulation.
//!
//! A [`ModulationSource`] produces one scalar per frame. A [`Modulation`] binds
//! a source to a parameter of a node's effect and adds `value * amount`
//! (negated when inverted) to that parameter's offset. Offsets are reset every
//! frame before any modulation is applied, so several modulations on the same
//! parameter accumulate.

use crate::graph::effect::Effect;
use crate::graph::error::GraphResult;
use crate::graph::id::{ModulationId, ModulationSourceId, NodeId};
use crate::graph::parameter::{
    read_bool, read_f64, read_nullable_string, ParameterDefinition, ParameterValues,
};
use crate::graph::state::EffectState;

/// A scalar signal that drives modulations, such as an LFO or envelope.
pub trait ModulationSource: Send {
    fn type_name(&self) -> &'static str;

    fn update(&mut self, dt: f64);

    fn value(&self) -> f64;

    fn parameter_definition(&self) -> ParameterDefinition {
        ParameterDefinition::default()
    }

    fn parameters(&self) -> ParameterValues {
        ParameterValues::new()
    }

    fn update_parameters(&mut self, _values: &ParameterValues) -> GraphResult<()> {
        Ok(())
    }

    fn state(&self) -> EffectState {
        EffectState {
            type_name: self.type_name().to_string(),
            params: self.parameters(),
        }
    }
}

/// Graph vertex owning one modulation source.
pub struct ModulationSourceNode {
    id: ModulationSourceId,
    source: Box<dyn ModulationSource>,
}

impl ModulationSourceNode {
    pub fn new(id: ModulationSourceId, source: Box<dyn ModulationSource>) -> Self {
        Self { id, source }
    }

    pub fn id(&self) -> ModulationSourceId {
        self.id
    }

    pub fn source(&self) -> &dyn ModulationSource {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn ModulationSource {
        self.source.as_mut()
    }

    pub fn update(&mut self, dt: f64) {
        self.source.update(dt);
    }

    pub fn value(&self) -> f64 {
        self.source.value()
    }
}

impl std::fmt::Debug for ModulationSourceNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModulationSourceNode")
            .field("id", &self.id)
            .field("type", &self.source.type_name())
            .finish()
    }
}

/// Binding from a modulation source to one parameter of a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Modulation {
    pub id: ModulationId,
    pub source_id: ModulationSourceId,
    pub target_node: NodeId,
    /// `None` leaves the modulation in place without affecting anything.
    pub target_param: Option<String>,
    pub amount: f64,
    pub inverted: bool,
}

impl Modulation {
    /// Offset contribution for a given source value.
    pub fn delta(&self, value: f64) -> f64 {
        let delta = value * self.amount;
        if self.inverted {
            -delta
        } else {
            delta
        }
    }

    /// Adds this modulation's contribution to the target parameter offset.
    pub fn propagate(&self, value: f64, effect: &mut dyn Effect) {
        let Some(param) = self.target_param.as_deref() else {
            return;
        };
        let current = effect.parameter_offset(param);
        effect.set_parameter_offset(param, current + self.delta(value));
    }

    /// Applies `amount`, `inverted` and `target_param` from a partial update.
    pub fn update_parameters(&mut self, values: &ParameterValues) -> GraphResult<()> {
        let amount = read_f64(values, "amount")?;
        let inverted = read_bool(values, "inverted")?;
        let target_param = read_nullable_string(values, "target_param")?;

        if let Some(amount) = amount {
            self.amount = amount;
        }
        if let Some(inverted) = inverted {
            self.inverted = inverted;
        }
        if let Some(target_param) = target_param {
            self.target_param = target_param;
        }
        Ok(())
    }
}
