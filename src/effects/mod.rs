//! Built-in effect and modulation source implementations.

pub mod generator;
pub mod modulators;
pub mod output;
pub mod panelize;

pub use generator::StaticColor;
pub use modulators::{ConstantSource, SineLfo};
pub use output::{LedOutput, MemoryDevice, OutputDevice, SharedDevice};
pub use panelize::{PanelPattern, Panelize};

use crate::graph::{Effect, EffectRegistry, GraphResult, ModulationSource, ParameterValues};

fn configured<E: Effect + 'static>(mut effect: E, params: &ParameterValues) -> GraphResult<Box<dyn Effect>> {
    effect.update_parameters(params)?;
    Ok(Box::new(effect))
}

fn configured_source<S: ModulationSource + 'static>(
    mut source: S,
    params: &ParameterValues,
) -> GraphResult<Box<dyn ModulationSource>> {
    source.update_parameters(params)?;
    Ok(Box::new(source))
}

/// Register every built-in type. `LedOutput` instances created by the
/// registry all drive `device`.
pub fn register_builtin(registry: &mut EffectRegistry, device: SharedDevice) {
    registry.register_effect("LedOutput", move |params| {
        configured(LedOutput::new(device.clone()), params)
    });
    registry.register_effect("StaticColor", |params| {
        configured(StaticColor::default(), params)
    });
    for pattern in PanelPattern::ALL {
        registry.register_effect(pattern.type_name(), move |params| {
            configured(Panelize::new(pattern), params)
        });
    }

    registry.register_modulation_source("ConstantSource", |params| {
        configured_source(ConstantSource::default(), params)
    });
    registry.register_modulation_source("SineLfo", |params| {
        configured_source(SineLfo::default(), params)
    });
}
