//! Serializable graph state.
//!
//! The state is an id-indexed edge list. Restoring replays the mutation API in
//! dependency order (nodes, connections, modulation sources, modulations) with
//! the saved ids, so every invariant checked on a live edit is checked on load.
//! Resolution is not part of the state: call
//! [`FilterGraph::propagate_num_pixels`] after restoring.

use crate::config::GraphConfig;
use crate::graph::connection::Connection;
use crate::graph::error::GraphResult;
use crate::graph::filter_graph::FilterGraph;
use crate::graph::id::{ConnectionId, ModulationId, ModulationSourceId, NodeId};
use crate::graph::modulation::Modulation;
use crate::graph::parameter::ParameterValues;
use crate::graph::registry::EffectRegistry;
use serde::{Deserialize, Serialize};

/// Type name plus parameters of an effect or modulation source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectState {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub params: ParameterValues,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeState {
    pub effect: EffectState,
    pub uid: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionState {
    pub from_node_uid: NodeId,
    pub from_node_channel: usize,
    pub to_node_uid: NodeId,
    pub to_node_channel: usize,
    pub uid: ConnectionId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationSourceState {
    pub modulator: EffectState,
    pub uid: ModulationSourceId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModulationState {
    pub modulation_source_uid: ModulationSourceId,
    pub target_node_uid: NodeId,
    #[serde(default)]
    pub target_param: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub inverted: bool,
    pub uid: ModulationId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphState {
    #[serde(default)]
    pub nodes: Vec<NodeState>,
    #[serde(default)]
    pub connections: Vec<ConnectionState>,
    #[serde(default, rename = "modulationSources")]
    pub modulation_sources: Vec<ModulationSourceState>,
    #[serde(default)]
    pub modulations: Vec<ModulationState>,
    #[serde(default, rename = "recordTimings")]
    pub record_timings: bool,
}

impl From<&Connection> for ConnectionState {
    fn from(con: &Connection) -> Self {
        Self {
            from_node_uid: con.from_node,
            from_node_channel: con.from_channel,
            to_node_uid: con.to_node,
            to_node_channel: con.to_channel,
            uid: con.id,
        }
    }
}

impl From<&ConnectionState> for Connection {
    fn from(state: &ConnectionState) -> Self {
        Self {
            id: state.uid,
            from_node: state.from_node_uid,
            from_channel: state.from_node_channel,
            to_node: state.to_node_uid,
            to_channel: state.to_node_channel,
        }
    }
}

impl From<&Modulation> for ModulationState {
    fn from(m: &Modulation) -> Self {
        Self {
            modulation_source_uid: m.source_id,
            target_node_uid: m.target_node,
            target_param: m.target_param.clone(),
            amount: m.amount,
            inverted: m.inverted,
            uid: m.id,
        }
    }
}

impl From<&ModulationState> for Modulation {
    fn from(state: &ModulationState) -> Self {
        Self {
            id: state.uid,
            source_id: state.modulation_source_uid,
            target_node: state.target_node_uid,
            target_param: state.target_param.clone(),
            amount: state.amount,
            inverted: state.inverted,
        }
    }
}

impl FilterGraph {
    /// Export the graph structure and every effect's parameters.
    pub fn state(&self) -> GraphState {
        GraphState {
            nodes: self
                .nodes()
                .iter()
                .map(|node| NodeState {
                    effect: node.effect().state(),
                    uid: node.id(),
                })
                .collect(),
            connections: self.connections().iter().map(ConnectionState::from).collect(),
            modulation_sources: self
                .modulation_sources()
                .iter()
                .map(|source| ModulationSourceState {
                    modulator: source.source().state(),
                    uid: source.id(),
                })
                .collect(),
            modulations: self.modulations().iter().map(ModulationState::from).collect(),
            record_timings: self.config().record_timings,
        }
    }

    /// Rebuild a graph from `state`, creating effects through `registry`.
    pub fn from_state(
        state: &GraphState,
        config: GraphConfig,
        registry: &EffectRegistry,
    ) -> GraphResult<Self> {
        let mut graph = FilterGraph::new(GraphConfig {
            record_timings: state.record_timings,
            ..config
        });

        for node in &state.nodes {
            let effect = registry.create_effect(&node.effect)?;
            graph.insert_node(node.uid, effect)?;
        }
        for con in &state.connections {
            graph.insert_connection(Connection::from(con))?;
        }
        for source in &state.modulation_sources {
            let modulator = registry.create_modulation_source(&source.modulator)?;
            graph.insert_modulation_source(source.uid, modulator)?;
        }
        for modulation in &state.modulations {
            graph.insert_modulation(Modulation::from(modulation))?;
        }

        tracing::info!(
            "Restored graph: {} nodes, {} connections, {} modulation sources, {} modulations",
            state.nodes.len(),
            state.connections.len(),
            state.modulation_sources.len(),
            state.modulations.len()
        );
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::effect::Effect;
    use crate::graph::error::GraphError;
    use crate::graph::modulation::ModulationSource;
    use crate::graph::test_support::{Constant, Generator, PassThrough, TestSink};
    use serde_json::json;

    fn registry() -> EffectRegistry {
        let mut registry = EffectRegistry::new();
        registry.register_effect("Generator", |_| Ok(Box::new(Generator::new())));
        registry.register_effect("PassThrough", |params| {
            let mut effect = PassThrough::new();
            effect.update_parameters(params)?;
            Ok(Box::new(effect))
        });
        registry.register_effect("TestSink", |_| Ok(Box::new(TestSink::new())));
        registry.register_modulation_source("Constant", |params| {
            let mut source = Constant::new(0.0);
            source.update_parameters(params)?;
            Ok(Box::new(source))
        });
        registry
    }

    fn sample_graph() -> FilterGraph {
        let mut graph = FilterGraph::default();
        let gen = graph.add_effect_node(Box::new(Generator::new())).unwrap();
        let fx = graph.add_effect_node(Box::new(PassThrough::new())).unwrap();
        let sink = graph.add_effect_node(Box::new(TestSink::new())).unwrap();
        graph.add_connection(gen, 0, fx, 0).unwrap();
        graph.add_connection(fx, 0, sink, 0).unwrap();
        // Leave a gap in the node ids
        let tmp = graph.add_effect_node(Box::new(PassThrough::new())).unwrap();
        graph.remove_effect_node(tmp).unwrap();
        let values = json!({ "gain": 0.7 }).as_object().cloned().unwrap();
        graph.update_node_parameter(fx, &values).unwrap();

        let source = graph.add_modulation_source(Box::new(Constant::new(0.25))).unwrap();
        graph.add_modulation(source, fx, Some("gain"), 0.5, true).unwrap();
        graph
    }

    #[test]
    fn test_state_uses_wire_field_names() {
        let json = serde_json::to_value(sample_graph().state()).unwrap();
        assert!(json.get("modulationSources").is_some());
        assert_eq!(json["connections"][0]["from_node_uid"], json!(0));
        assert_eq!(json["connections"][1]["to_node_channel"], json!(0));
        assert_eq!(json["modulations"][0]["target_param"], json!("gain"));
        assert_eq!(json["nodes"][1]["effect"]["type"], json!("PassThrough"));
        assert_eq!(json["nodes"][1]["effect"]["params"]["gain"], json!(0.7));
    }

    #[test]
    fn test_round_trip_is_idempotent() {
        let original = sample_graph();
        let state = original.state();
        let restored = FilterGraph::from_state(&state, GraphConfig::default(), &registry()).unwrap();
        assert_eq!(restored.state(), state);
        assert_eq!(restored.sink(), original.sink());
    }

    #[test]
    fn test_restored_ids_do_not_collide() {
        let state = sample_graph().state();
        let mut restored =
            FilterGraph::from_state(&state, GraphConfig::default(), &registry()).unwrap();
        let max_id = state.nodes.iter().map(|n| n.uid.0).max().unwrap();
        let fresh = restored.add_effect_node(Box::new(PassThrough::new())).unwrap();
        assert!(fresh.0 > max_id);
    }

    #[test]
    fn test_restored_max_ids_exhaust_allocation() {
        let mut state = sample_graph().state();
        let mut extra = state.nodes[1].clone();
        extra.uid = NodeId(u32::MAX);
        state.nodes.push(extra);
        state.modulation_sources[0].uid = ModulationSourceId(u32::MAX);
        state.modulations[0].modulation_source_uid = ModulationSourceId(u32::MAX);

        let mut restored =
            FilterGraph::from_state(&state, GraphConfig::default(), &registry()).unwrap();

        let err = restored
            .add_modulation_source(Box::new(Constant::new(1.0)))
            .unwrap_err();
        assert!(matches!(err, GraphError::IdsExhausted("modulation source")));
        let err = restored
            .add_effect_node(Box::new(PassThrough::new()))
            .unwrap_err();
        assert!(matches!(err, GraphError::IdsExhausted("node")));

        // Nothing was added and ids stay unique
        let source_ids: Vec<_> = restored.modulation_sources().iter().map(|s| s.id()).collect();
        assert_eq!(source_ids, vec![ModulationSourceId(u32::MAX)]);
        assert_eq!(restored.nodes().len(), state.nodes.len());
        assert_eq!(restored.state(), state);
    }

    #[test]
    fn test_restore_rejects_unknown_type() {
        let mut state = sample_graph().state();
        state.nodes[0].effect.type_name = "Mystery".into();
        let err = FilterGraph::from_state(&state, GraphConfig::default(), &registry()).unwrap_err();
        assert!(matches!(err, GraphError::UnknownEffectType(name) if name == "Mystery"));
    }

    #[test]
    fn test_restore_rejects_cyclic_state() {
        let mut state = sample_graph().state();
        state.connections.push(ConnectionState {
            from_node_uid: NodeId(1),
            from_node_channel: 0,
            to_node_uid: NodeId(1),
            to_node_channel: 0,
            uid: ConnectionId(50),
        });
        let err = FilterGraph::from_state(&state, GraphConfig::default(), &registry()).unwrap_err();
        assert!(matches!(err, GraphError::CyclicGraph { .. }));
    }

    #[test]
    fn test_restore_applies_resolution_after_propagate() {
        let state = sample_graph().state();
        let mut restored =
            FilterGraph::from_state(&state, GraphConfig::default(), &registry()).unwrap();
        assert!(restored.execution_order().is_empty());
        restored.propagate_num_pixels(16, 1);
        assert_eq!(restored.execution_order().len(), 3);
        let gen = restored.execution_order()[0];
        assert_eq!(
            restored.node(gen).unwrap().effect().num_output_pixels(),
            Some(16)
        );
    }
}
