//! Execution-order scheduling and resolution propagation.
//!
//! The order is built backwards from the sink: a node is admitted once every
//! node it feeds has already been admitted. Reversing that list gives an order
//! in which producers run before consumers. The same walk, taken from the sink
//! outward, pushes each node's input resolution request to its producers.
//!
//! Nodes that never get admitted (not upstream of the sink) or whose
//! resolution stays unresolved are left out of the order. This is not an
//! error; the counts are reported in [`PlanStats`].

use crate::graph::connection::Connection;
use crate::graph::id::{ConnectionId, NodeId};
use crate::graph::node::Node;
use std::collections::HashMap;
use std::time::Instant;

/// Statistics about the last computed execution plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanStats {
    /// Total number of nodes in the graph
    pub total_nodes: usize,

    /// Number of nodes in the execution order
    pub active_nodes: usize,

    /// Nodes with no path to the sink
    pub unreachable_nodes: usize,

    /// Nodes upstream of the sink whose pixel count never resolved
    pub unresolved_nodes: usize,

    /// Scheduling time in microseconds
    pub compile_time_us: u64,
}

/// Node ids in execution order plus scheduling statistics.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub order: Vec<NodeId>,
    pub stats: PlanStats,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Position of `node` in the order, if scheduled.
    pub fn position(&self, node: NodeId) -> Option<usize> {
        self.order.iter().position(|&id| id == node)
    }
}

/// Computes execution plans for a graph.
pub struct Scheduler;

impl Scheduler {
    /// Compute the execution order for `sink` and propagate resolution.
    ///
    /// Every non-sink effect has its output pixel count reset before
    /// propagation, so effects left out of the order end up unresolved.
    pub fn compile(
        nodes: &mut [Node],
        connections: &[Connection],
        sink: Option<NodeId>,
    ) -> ExecutionPlan {
        let start_time = Instant::now();
        let total_nodes = nodes.len();

        let index: HashMap<NodeId, usize> = nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id(), idx))
            .collect();

        let Some(sink_idx) = sink.and_then(|id| index.get(&id).copied()) else {
            return ExecutionPlan {
                order: Vec::new(),
                stats: PlanStats {
                    total_nodes,
                    unreachable_nodes: total_nodes,
                    compile_time_us: start_time.elapsed().as_micros() as u64,
                    ..Default::default()
                },
            };
        };

        let outgoing = Self::build_outgoing(&index, connections, total_nodes);

        // Consumers before producers, sink first
        let (demand_order, unreachable_nodes) =
            Self::admit_from_sink(sink_idx, &outgoing, total_nodes);

        Self::propagate_resolution(nodes, connections, &index, &demand_order, sink_idx);

        let mut order = Vec::with_capacity(demand_order.len());
        let mut unresolved_nodes = 0;
        for &idx in demand_order.iter().rev() {
            if nodes[idx].effect().num_output_pixels().is_some() {
                order.push(nodes[idx].id());
            } else {
                unresolved_nodes += 1;
            }
        }

        let stats = PlanStats {
            total_nodes,
            active_nodes: order.len(),
            unreachable_nodes,
            unresolved_nodes,
            compile_time_us: start_time.elapsed().as_micros() as u64,
        };

        ExecutionPlan { order, stats }
    }

    /// Destination indices of every node's outgoing connections.
    fn build_outgoing(
        index: &HashMap<NodeId, usize>,
        connections: &[Connection],
        n: usize,
    ) -> Vec<Vec<usize>> {
        let mut outgoing = vec![Vec::new(); n];
        for con in connections {
            if let (Some(&from), Some(&to)) = (index.get(&con.from_node), index.get(&con.to_node)) {
                outgoing[from].push(to);
            }
        }
        outgoing
    }

    /// Admit nodes pass by pass once all their consumers are admitted.
    ///
    /// Eligibility in a pass is judged against the order as it stood when the
    /// pass began. Returns the admission order and the count left behind.
    fn admit_from_sink(
        sink_idx: usize,
        outgoing: &[Vec<usize>],
        n: usize,
    ) -> (Vec<usize>, usize) {
        let mut admitted = vec![false; n];
        admitted[sink_idx] = true;
        let mut order = vec![sink_idx];
        let mut pending: Vec<usize> = (0..n).filter(|&idx| idx != sink_idx).collect();

        while !pending.is_empty() {
            let eligible: Vec<usize> = pending
                .iter()
                .copied()
                .filter(|&idx| outgoing[idx].iter().all(|&to| admitted[to]))
                .collect();

            if eligible.is_empty() {
                break;
            }

            for idx in eligible {
                admitted[idx] = true;
                order.push(idx);
            }
            pending.retain(|&idx| !admitted[idx]);
        }

        (order, pending.len())
    }

    /// Walk from the sink toward the sources assigning each producer the
    /// resolution its consumer requests on the connecting channel.
    fn propagate_resolution(
        nodes: &mut [Node],
        connections: &[Connection],
        index: &HashMap<NodeId, usize>,
        demand_order: &[usize],
        sink_idx: usize,
    ) {
        for (idx, node) in nodes.iter_mut().enumerate() {
            if idx != sink_idx {
                node.effect_mut().set_num_output_pixels(None);
            }
        }

        let by_id: HashMap<ConnectionId, &Connection> =
            connections.iter().map(|con| (con.id, con)).collect();

        for &idx in demand_order {
            let requests: Vec<(usize, Option<usize>, usize)> = {
                let node = &nodes[idx];
                node.incoming_connections()
                    .iter()
                    .filter_map(|cid| by_id.get(cid))
                    .filter_map(|con| {
                        let from = *index.get(&con.from_node)?;
                        let effect = node.effect();
                        Some((
                            from,
                            effect.num_input_pixels(con.to_channel),
                            effect.num_input_rows(con.to_channel),
                        ))
                    })
                    .collect()
            };

            for (from, pixels, rows) in requests {
                let upstream = nodes[from].effect_mut();
                upstream.set_num_output_rows(rows);
                upstream.set_num_output_pixels(pixels);
            }
        }
    }
}
