//! Factories that turn serialized effect state back into live objects.
//!
//! Effects and modulation sources are registered under their
//! [`type_name`](crate::graph::Effect::type_name). Restoring a graph looks the
//! name up and hands the saved parameters to the factory.

use crate::graph::effect::Effect;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::modulation::ModulationSource;
use crate::graph::parameter::ParameterValues;
use crate::graph::state::EffectState;
use std::collections::BTreeMap;

/// Factory function type for creating effects.
pub type EffectFactory =
    Box<dyn Fn(&ParameterValues) -> GraphResult<Box<dyn Effect>> + Send + Sync>;

/// Factory function type for creating modulation sources.
pub type ModulationSourceFactory =
    Box<dyn Fn(&ParameterValues) -> GraphResult<Box<dyn ModulationSource>> + Send + Sync>;

/// Registry of effect and modulation source types available for restoring graphs.
#[derive(Default)]
pub struct EffectRegistry {
    effects: BTreeMap<String, EffectFactory>,
    modulation_sources: BTreeMap<String, ModulationSourceFactory>,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an effect factory. A later registration replaces an earlier one.
    pub fn register_effect<F>(&mut self, type_name: &str, factory: F)
    where
        F: Fn(&ParameterValues) -> GraphResult<Box<dyn Effect>> + Send + Sync + 'static,
    {
        if self
            .effects
            .insert(type_name.to_string(), Box::new(factory))
            .is_some()
        {
            tracing::debug!("Replaced effect factory for '{}'", type_name);
        }
    }

    pub fn register_modulation_source<F>(&mut self, type_name: &str, factory: F)
    where
        F: Fn(&ParameterValues) -> GraphResult<Box<dyn ModulationSource>> + Send + Sync + 'static,
    {
        if self
            .modulation_sources
            .insert(type_name.to_string(), Box::new(factory))
            .is_some()
        {
            tracing::debug!("Replaced modulation source factory for '{}'", type_name);
        }
    }

    pub fn create_effect(&self, state: &EffectState) -> GraphResult<Box<dyn Effect>> {
        let factory = self
            .effects
            .get(&state.type_name)
            .ok_or_else(|| GraphError::UnknownEffectType(state.type_name.clone()))?;
        factory(&state.params)
    }

    pub fn create_modulation_source(
        &self,
        state: &EffectState,
    ) -> GraphResult<Box<dyn ModulationSource>> {
        let factory = self
            .modulation_sources
            .get(&state.type_name)
            .ok_or_else(|| GraphError::UnknownModulationSourceType(state.type_name.clone()))?;
        factory(&state.params)
    }

    /// Registered effect type names, sorted.
    pub fn effect_types(&self) -> impl Iterator<Item = &str> {
        self.effects.keys().map(String::as_str)
    }

    pub fn modulation_source_types(&self) -> impl Iterator<Item = &str> {
        self.modulation_sources.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::test_support::{Constant, PassThrough};
    use serde_json::json;

    fn registry() -> EffectRegistry {
        let mut registry = EffectRegistry::new();
        registry.register_effect("PassThrough", |params| {
            let mut effect = PassThrough::new();
            effect.update_parameters(params)?;
            Ok(Box::new(effect))
        });
        registry.register_modulation_source("Constant", |params| {
            let mut source = Constant::new(0.0);
            source.update_parameters(params)?;
            Ok(Box::new(source))
        });
        registry
    }

    #[test]
    fn test_create_effect_applies_params() {
        let state = EffectState {
            type_name: "PassThrough".into(),
            params: json!({ "gain": 1.5 }).as_object().cloned().unwrap(),
        };
        let effect = registry().create_effect(&state).unwrap();
        assert_eq!(effect.parameters()["gain"], json!(1.5));
    }

    #[test]
    fn test_unknown_types() {
        let state = EffectState {
            type_name: "Nope".into(),
            params: ParameterValues::new(),
        };
        let registry = registry();
        assert!(matches!(
            registry.create_effect(&state),
            Err(GraphError::UnknownEffectType(name)) if name == "Nope"
        ));
        assert!(matches!(
            registry.create_modulation_source(&state),
            Err(GraphError::UnknownModulationSourceType(_))
        ));
    }

    #[test]
    fn test_type_listing() {
        let registry = registry();
        assert_eq!(registry.effect_types().collect::<Vec<_>>(), vec!["PassThrough"]);
        assert_eq!(
            registry.modulation_source_types().collect::<Vec<_>>(),
            vec!["Constant"]
        );
    }
}
