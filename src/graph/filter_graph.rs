//! The effect graph: structure, mutation API and per-frame dispatch.
//!
//! Every structural mutation is validated before it is applied and ends with a
//! synchronous recompute of the execution plan, so the cached order is always
//! consistent with the current structure. A frame is `update(dt)` followed by
//! `process()`:
//!
//! 1. Advance modulation sources.
//! 2. Reset parameter offsets of every modulation target.
//! 3. Apply every modulation (offsets accumulate).
//! 4. Update scheduled nodes, concurrently or sequentially.
//! 5. Process scheduled nodes in order, pulling upstream outputs into inputs.

use crate::config::GraphConfig;
use crate::graph::buffer::Signal;
use crate::graph::connection::Connection;
use crate::graph::effect::Effect;
use crate::graph::error::{GraphError, GraphResult};
use crate::graph::events::{GraphEvent, GraphListener};
use crate::graph::id::{ConnectionId, IdAllocator, ModulationId, ModulationSourceId, NodeId};
use crate::graph::modulation::{Modulation, ModulationSource, ModulationSourceNode};
use crate::graph::node::Node;
use crate::graph::parameter::ParameterValues;
use crate::graph::scheduler::{ExecutionPlan, PlanStats, Scheduler};
use crate::graph::timing::Timing;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::Instant;

/// Key of an update timing accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingKey {
    Node(NodeId),
    /// The whole concurrent update batch.
    AllNodes,
}

impl fmt::Display for TimingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingKey::Node(id) => write!(f, "{}", id),
            TimingKey::AllNodes => write!(f, "all_async"),
        }
    }
}

/// Index lookups rebuilt together with the execution plan.
#[derive(Debug, Default)]
struct GraphIndex {
    nodes: HashMap<NodeId, usize>,
    connections: HashMap<ConnectionId, usize>,
    /// `nodes` positions of the scheduled nodes, in execution order.
    scheduled: Vec<usize>,
}

pub struct FilterGraph {
    config: GraphConfig,
    nodes: Vec<Node>,
    connections: Vec<Connection>,
    modulation_sources: Vec<ModulationSourceNode>,
    modulations: Vec<Modulation>,
    sink: Option<NodeId>,
    plan: ExecutionPlan,
    index: GraphIndex,
    node_ids: IdAllocator,
    connection_ids: IdAllocator,
    modulation_source_ids: IdAllocator,
    modulation_ids: IdAllocator,
    update_timings: HashMap<TimingKey, Timing>,
    process_timings: HashMap<NodeId, Timing>,
    listeners: Vec<Box<dyn GraphListener>>,
}

impl Default for FilterGraph {
    fn default() -> Self {
        Self::new(GraphConfig::default())
    }
}

impl FilterGraph {
    pub fn new(config: GraphConfig) -> Self {
        Self {
            config,
            nodes: Vec::new(),
            connections: Vec::new(),
            modulation_sources: Vec::new(),
            modulations: Vec::new(),
            sink: None,
            plan: ExecutionPlan::default(),
            index: GraphIndex::default(),
            node_ids: IdAllocator::new(),
            connection_ids: IdAllocator::new(),
            modulation_source_ids: IdAllocator::new(),
            modulation_ids: IdAllocator::new(),
            update_timings: HashMap::new(),
            process_timings: HashMap::new(),
            listeners: Vec::new(),
        }
    }

    // ── Configuration ──

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn set_async_update(&mut self, enabled: bool) {
        self.config.async_update = enabled;
    }

    pub fn set_record_timings(&mut self, enabled: bool) {
        self.config.record_timings = enabled;
        if !enabled {
            self.update_timings.clear();
            self.process_timings.clear();
        }
    }

    /// Register a listener for structural change events.
    pub fn add_listener(&mut self, listener: Box<dyn GraphListener>) {
        self.listeners.push(listener);
    }

    fn emit(&mut self, event: GraphEvent) {
        for listener in &mut self.listeners {
            listener.on_event(&event);
        }
    }

    // ── Nodes ──

    /// Add an effect. Device-output effects become the sink.
    pub fn add_effect_node(&mut self, effect: Box<dyn Effect>) -> GraphResult<NodeId> {
        let id = NodeId(self.node_ids.peek().ok_or(GraphError::IdsExhausted("node"))?);
        self.insert_node(id, effect)
    }

    fn check_sink_slot(&self, effect: &dyn Effect) -> GraphResult<()> {
        match self.sink {
            Some(existing) if effect.is_device_output() => {
                Err(GraphError::MultipleSink { existing })
            }
            _ => Ok(()),
        }
    }

    pub(crate) fn insert_node(&mut self, id: NodeId, effect: Box<dyn Effect>) -> GraphResult<NodeId> {
        self.check_sink_slot(effect.as_ref())?;
        if self.node_position(id).is_some() {
            return Err(GraphError::InvalidState(format!("duplicate node id {}", id)));
        }
        self.node_ids.reserve(id.0);

        let is_sink = effect.is_device_output();
        let node = Node::new(id, effect);
        tracing::info!("Added node {:?} ({})", id, node.effect().type_name());
        self.nodes.push(node);
        if is_sink {
            tracing::info!("Node {:?} is the device output", id);
            self.sink = Some(id);
        }

        self.emit(GraphEvent::NodeAdded(id));
        self.recompute_execution_order();
        Ok(id)
    }

    /// Remove a node together with its connections and the modulations
    /// targeting it. Returns the node's effect.
    pub fn remove_effect_node(&mut self, id: NodeId) -> GraphResult<Box<dyn Effect>> {
        let idx = self
            .node_position(id)
            .ok_or(GraphError::NodeNotFound(id))?;

        let incident: Vec<Connection> = self
            .connections
            .iter()
            .filter(|con| con.touches(id))
            .copied()
            .collect();
        for con in incident {
            self.detach_connection(con);
        }

        let targeting: Vec<Modulation> = self
            .modulations
            .iter()
            .filter(|m| m.target_node == id)
            .cloned()
            .collect();
        self.modulations.retain(|m| m.target_node != id);
        for modulation in targeting {
            tracing::info!("Removed modulation {:?} with its target", modulation.id);
            self.emit(GraphEvent::ModulationRemoved(modulation));
        }

        let node = self.nodes.remove(idx);
        if self.sink == Some(id) {
            tracing::info!("Device output {:?} removed", id);
            self.sink = None;
        }
        self.update_timings.remove(&TimingKey::Node(id));
        self.process_timings.remove(&id);

        tracing::info!("Removed node {:?}", id);
        self.emit(GraphEvent::NodeRemoved(id));
        self.recompute_execution_order();
        Ok(node.into_effect())
    }

    /// Apply a partial parameter update to a node's effect.
    pub fn update_node_parameter(&mut self, id: NodeId, values: &ParameterValues) -> GraphResult<()> {
        let node = self.node_mut(id).ok_or(GraphError::NodeNotFound(id))?;
        node.effect_mut().update_parameters(values)?;
        self.emit(GraphEvent::NodeUpdated {
            node_id: id,
            values: values.clone(),
        });
        Ok(())
    }

    // ── Connections ──

    /// Connect `from_channel` of `from` to `to_channel` of `to`.
    ///
    /// Fails without changing the graph if either node is missing, a channel
    /// is out of range, or the edge would close a cycle.
    pub fn add_connection(
        &mut self,
        from: NodeId,
        from_channel: usize,
        to: NodeId,
        to_channel: usize,
    ) -> GraphResult<ConnectionId> {
        let id = ConnectionId(
            self.connection_ids
                .peek()
                .ok_or(GraphError::IdsExhausted("connection"))?,
        );
        self.insert_connection(Connection {
            id,
            from_node: from,
            from_channel,
            to_node: to,
            to_channel,
        })
    }

    pub(crate) fn insert_connection(&mut self, con: Connection) -> GraphResult<ConnectionId> {
        let from = self.node(con.from_node).ok_or(GraphError::NodeNotFound(con.from_node))?;
        let to = self.node(con.to_node).ok_or(GraphError::NodeNotFound(con.to_node))?;
        if self.would_create_cycle(con.from_node, con.to_node) {
            tracing::warn!(
                "Rejected connection {:?} -> {:?}: would create a cycle",
                con.from_node,
                con.to_node
            );
            return Err(GraphError::CyclicGraph {
                from: con.from_node,
                to: con.to_node,
            });
        }
        let available = from.effect().num_output_channels();
        if con.from_channel >= available {
            return Err(GraphError::ChannelOutOfRange {
                node_id: con.from_node,
                direction: "output",
                channel: con.from_channel,
                available,
            });
        }
        let available = to.effect().num_input_channels();
        if con.to_channel >= available {
            return Err(GraphError::ChannelOutOfRange {
                node_id: con.to_node,
                direction: "input",
                channel: con.to_channel,
                available,
            });
        }
        if self.connections.iter().any(|c| c.id == con.id) {
            return Err(GraphError::InvalidState(format!(
                "duplicate connection id {}",
                con.id
            )));
        }
        self.connection_ids.reserve(con.id.0);

        self.connections.push(con);
        if let Some(node) = self.node_mut(con.to_node) {
            node.add_incoming(con.id);
        }

        tracing::info!(
            "Added connection {:?}: {:?}[{}] -> {:?}[{}]",
            con.id,
            con.from_node,
            con.from_channel,
            con.to_node,
            con.to_channel
        );
        self.emit(GraphEvent::ConnectionAdded(con));
        self.recompute_execution_order();
        Ok(con.id)
    }

    pub fn remove_connection(&mut self, id: ConnectionId) -> GraphResult<Connection> {
        let con = self
            .connection(id)
            .copied()
            .ok_or(GraphError::ConnectionNotFound(id))?;
        self.detach_connection(con);
        self.recompute_execution_order();
        Ok(con)
    }

    fn detach_connection(&mut self, con: Connection) {
        self.connections.retain(|c| c.id != con.id);
        if let Some(node) = self.node_mut(con.to_node) {
            node.remove_incoming(con.id);
        }
        tracing::info!("Removed connection {:?}", con.id);
        self.emit(GraphEvent::ConnectionRemoved(con));
    }

    /// Whether adding `from -> to` would close a cycle, i.e. `to` already
    /// feeds `from` (or they are the same node).
    ///
    /// Walks backwards from `from` over each node's incoming connections.
    /// Relies on the index being current, which holds between mutations.
    fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut stack = vec![from];

        while let Some(current) = stack.pop() {
            if current == to {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            let Some(&node_idx) = self.index.nodes.get(&current) else {
                continue;
            };
            let predecessors = self.nodes[node_idx]
                .incoming_connections()
                .iter()
                .filter_map(|con_id| self.index.connections.get(con_id))
                .map(|&con_idx| self.connections[con_idx].from_node);
            for pred in predecessors {
                if !visited.contains(&pred) {
                    stack.push(pred);
                }
            }
        }
        false
    }

    // ── Modulation ──

    pub fn add_modulation_source(
        &mut self,
        source: Box<dyn ModulationSource>,
    ) -> GraphResult<ModulationSourceId> {
        let id = ModulationSourceId(
            self.modulation_source_ids
                .peek()
                .ok_or(GraphError::IdsExhausted("modulation source"))?,
        );
        self.insert_modulation_source(id, source)
    }

    pub(crate) fn insert_modulation_source(
        &mut self,
        id: ModulationSourceId,
        source: Box<dyn ModulationSource>,
    ) -> GraphResult<ModulationSourceId> {
        if self.modulation_source(id).is_some() {
            return Err(GraphError::InvalidState(format!(
                "duplicate modulation source id {}",
                id
            )));
        }
        self.modulation_source_ids.reserve(id.0);

        self.modulation_sources.push(ModulationSourceNode::new(id, source));
        tracing::info!("Added modulation source {:?}", id);
        self.emit(GraphEvent::ModulationSourceAdded(id));
        Ok(id)
    }

    /// Remove a modulation source and every modulation it drives.
    pub fn remove_modulation_source(&mut self, id: ModulationSourceId) -> GraphResult<()> {
        let idx = self
            .modulation_sources
            .iter()
            .position(|s| s.id() == id)
            .ok_or(GraphError::ModulationSourceNotFound(id))?;

        let dependents: Vec<ModulationId> = self
            .modulations
            .iter()
            .filter(|m| m.source_id == id)
            .map(|m| m.id)
            .collect();
        for modulation in dependents {
            self.remove_modulation(modulation)?;
        }

        self.modulation_sources.remove(idx);
        tracing::info!("Removed modulation source {:?}", id);
        self.emit(GraphEvent::ModulationSourceRemoved(id));
        Ok(())
    }

    pub fn update_modulation_source_parameter(
        &mut self,
        id: ModulationSourceId,
        values: &ParameterValues,
    ) -> GraphResult<()> {
        let source = self
            .modulation_sources
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(GraphError::ModulationSourceNotFound(id))?;
        source.source_mut().update_parameters(values)?;
        self.emit(GraphEvent::ModulationSourceUpdated {
            source_id: id,
            values: values.clone(),
        });
        Ok(())
    }

    /// Bind `source` to `target_param` of `target`.
    pub fn add_modulation(
        &mut self,
        source: ModulationSourceId,
        target: NodeId,
        target_param: Option<&str>,
        amount: f64,
        inverted: bool,
    ) -> GraphResult<ModulationId> {
        let id = ModulationId(
            self.modulation_ids
                .peek()
                .ok_or(GraphError::IdsExhausted("modulation"))?,
        );
        self.insert_modulation(Modulation {
            id,
            source_id: source,
            target_node: target,
            target_param: target_param.map(str::to_string),
            amount,
            inverted,
        })
    }

    pub(crate) fn insert_modulation(&mut self, modulation: Modulation) -> GraphResult<ModulationId> {
        if self.modulation_source(modulation.source_id).is_none() {
            return Err(GraphError::ModulationSourceNotFound(modulation.source_id));
        }
        if self.node(modulation.target_node).is_none() {
            return Err(GraphError::NodeNotFound(modulation.target_node));
        }
        if self.modulation(modulation.id).is_some() {
            return Err(GraphError::InvalidState(format!(
                "duplicate modulation id {}",
                modulation.id
            )));
        }
        self.modulation_ids.reserve(modulation.id.0);

        let id = modulation.id;
        tracing::info!(
            "Added modulation {:?}: {:?} -> {:?}.{}",
            id,
            modulation.source_id,
            modulation.target_node,
            modulation.target_param.as_deref().unwrap_or("<none>")
        );
        self.modulations.push(modulation.clone());
        self.emit(GraphEvent::ModulationAdded(modulation));
        Ok(id)
    }

    /// Remove a modulation, zeroing the offset it contributed to.
    pub fn remove_modulation(&mut self, id: ModulationId) -> GraphResult<Modulation> {
        let idx = self
            .modulations
            .iter()
            .position(|m| m.id == id)
            .ok_or(GraphError::ModulationNotFound(id))?;
        let modulation = self.modulations.remove(idx);

        if let Some(param) = modulation.target_param.as_deref() {
            if let Some(node) = self.node_mut(modulation.target_node) {
                node.effect_mut().set_parameter_offset(param, 0.0);
            }
        }

        tracing::info!("Removed modulation {:?}", id);
        self.emit(GraphEvent::ModulationRemoved(modulation.clone()));
        Ok(modulation)
    }

    /// Update `amount`, `inverted` or `target_param` of a modulation.
    pub fn update_modulation_parameter(
        &mut self,
        id: ModulationId,
        values: &ParameterValues,
    ) -> GraphResult<()> {
        let modulation = self
            .modulations
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(GraphError::ModulationNotFound(id))?;
        modulation.update_parameters(values)?;
        let modulation = modulation.clone();
        self.emit(GraphEvent::ModulationUpdated {
            modulation,
            values: values.clone(),
        });
        Ok(())
    }

    // ── Resolution ──

    /// Set the sink resolution and recompute the order.
    pub fn propagate_num_pixels(&mut self, num_pixels: usize, num_rows: usize) {
        let Some(sink) = self.sink else {
            tracing::debug!("No device output, ignoring resolution of {} pixels", num_pixels);
            return;
        };
        if let Some(node) = self.node_mut(sink) {
            let effect = node.effect_mut();
            effect.set_num_output_rows(num_rows);
            effect.set_num_output_pixels(Some(num_pixels));
        }
        tracing::info!("Propagating {} pixels on {} rows", num_pixels, num_rows);
        self.recompute_execution_order();
    }

    fn recompute_execution_order(&mut self) {
        self.plan = Scheduler::compile(&mut self.nodes, &self.connections, self.sink);

        self.index.nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id(), idx))
            .collect();
        self.index.connections = self
            .connections
            .iter()
            .enumerate()
            .map(|(idx, con)| (con.id, idx))
            .collect();
        self.index.scheduled = self
            .plan
            .order
            .iter()
            .filter_map(|id| self.index.nodes.get(id).copied())
            .collect();

        let stats = &self.plan.stats;
        tracing::debug!(
            "Execution order: {:?} ({} of {} nodes, {} unreachable, {} unresolved, {}us)",
            self.plan.order,
            stats.active_nodes,
            stats.total_nodes,
            stats.unreachable_nodes,
            stats.unresolved_nodes,
            stats.compile_time_us
        );
    }

    // ── Frame ──

    /// Advance modulation and every scheduled node by `dt` seconds.
    pub fn update(&mut self, dt: f64) -> GraphResult<()> {
        if self.sink.is_none() {
            return Ok(());
        }

        for source in &mut self.modulation_sources {
            source.update(dt);
        }
        self.apply_modulations();

        if self.config.async_update {
            self.update_concurrent(dt)
        } else {
            self.update_sequential(dt)
        }
    }

    fn apply_modulations(&mut self) {
        // All resets happen before any propagation so shared targets accumulate
        for modulation in &self.modulations {
            if let Some(&idx) = self.index.nodes.get(&modulation.target_node) {
                self.nodes[idx].effect_mut().reset_parameter_offsets();
            }
        }
        for modulation in &self.modulations {
            let Some(value) = self
                .modulation_sources
                .iter()
                .find(|s| s.id() == modulation.source_id)
                .map(ModulationSourceNode::value)
            else {
                continue;
            };
            if let Some(&idx) = self.index.nodes.get(&modulation.target_node) {
                modulation.propagate(value, self.nodes[idx].effect_mut());
            }
        }
    }

    fn update_concurrent(&mut self, dt: f64) -> GraphResult<()> {
        let start = Instant::now();
        let scheduled: HashSet<NodeId> = self.plan.order.iter().copied().collect();

        let mut failures: Vec<GraphError> = self
            .nodes
            .par_iter_mut()
            .filter(|node| scheduled.contains(&node.id()))
            .map(|node| node.update(dt))
            .filter_map(Result::err)
            .collect();

        if self.config.record_timings {
            self.update_timings
                .entry(TimingKey::AllNodes)
                .or_default()
                .record(start.elapsed());
        }

        // Report the earliest failing node in execution order
        failures.sort_by_key(|err| err.node_id().and_then(|id| self.plan.position(id)));
        match failures.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn update_sequential(&mut self, dt: f64) -> GraphResult<()> {
        for &idx in &self.index.scheduled {
            let node = &mut self.nodes[idx];
            let start = Instant::now();
            node.update(dt)?;
            if self.config.record_timings {
                self.update_timings
                    .entry(TimingKey::Node(node.id()))
                    .or_default()
                    .record(start.elapsed());
            }
        }
        Ok(())
    }

    /// Run every scheduled node's process step in execution order.
    ///
    /// The first failure aborts the pass.
    pub fn process(&mut self) -> GraphResult<()> {
        if self.sink.is_none() {
            return Ok(());
        }

        for step in 0..self.index.scheduled.len() {
            let idx = self.index.scheduled[step];

            let transfers: Vec<(usize, Option<Signal>)> = self.nodes[idx]
                .incoming_connections()
                .iter()
                .filter_map(|cid| self.index.connections.get(cid))
                .map(|&con_idx| &self.connections[con_idx])
                .map(|con| {
                    let value = self
                        .index
                        .nodes
                        .get(&con.from_node)
                        .and_then(|&from| self.nodes[from].output(con.from_channel))
                        .cloned();
                    (con.to_channel, value)
                })
                .collect();

            let node = &mut self.nodes[idx];
            node.clear_inputs();
            for (channel, value) in transfers {
                node.set_input(channel, value);
            }

            let start = Instant::now();
            node.process()?;
            if self.config.record_timings {
                self.process_timings
                    .entry(node.id())
                    .or_default()
                    .record(start.elapsed());
            }
        }
        Ok(())
    }

    // ── Accessors ──

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn node_position(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id() == id)
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn modulation_sources(&self) -> &[ModulationSourceNode] {
        &self.modulation_sources
    }

    pub fn modulation_source(&self, id: ModulationSourceId) -> Option<&ModulationSourceNode> {
        self.modulation_sources.iter().find(|s| s.id() == id)
    }

    pub fn modulations(&self) -> &[Modulation] {
        &self.modulations
    }

    pub fn modulation(&self, id: ModulationId) -> Option<&Modulation> {
        self.modulations.iter().find(|m| m.id == id)
    }

    /// The device output node, if one has been added.
    pub fn sink(&self) -> Option<NodeId> {
        self.sink
    }

    pub fn execution_order(&self) -> &[NodeId] {
        &self.plan.order
    }

    pub fn plan_stats(&self) -> &PlanStats {
        &self.plan.stats
    }

    // ── Timings ──

    pub fn update_timings(&self) -> &HashMap<TimingKey, Timing> {
        &self.update_timings
    }

    pub fn process_timings(&self) -> &HashMap<NodeId, Timing> {
        &self.process_timings
    }

    fn label(&self, id: NodeId) -> String {
        self.node(id)
            .map(Node::label)
            .unwrap_or_else(|| id.to_string())
    }

    /// Log update and process timings, one line per node.
    pub fn log_timings(&self) {
        let mut update: Vec<_> = self.update_timings.iter().collect();
        update.sort_by_key(|(key, _)| **key != TimingKey::AllNodes);
        for (key, timing) in update {
            let name = match key {
                TimingKey::Node(id) => self.label(*id),
                TimingKey::AllNodes => key.to_string(),
            };
            tracing::info!("update {}: {}", name, timing);
        }
        for id in &self.plan.order {
            if let Some(timing) = self.process_timings.get(id) {
                tracing::info!("process {}: {}", self.label(*id), timing);
            }
        }
    }
}

impl fmt::Debug for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterGraph")
            .field("nodes", &self.nodes)
            .field("connections", &self.connections)
            .field("modulation_sources", &self.modulation_sources)
            .field("modulations", &self.modulations)
            .field("sink", &self.sink)
            .field("order", &self.plan.order)
            .finish()
    }
}
