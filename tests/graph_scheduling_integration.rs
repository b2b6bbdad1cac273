//! Integration tests for graph editing and scheduling
//!
//! These tests validate the structural behavior of the effect graph:
//! - Cycle rejection leaves the graph untouched
//! - Execution order respects every scheduled connection
//! - Dangling and unresolved nodes are excluded from frames
//! - Resolution propagates through resolution-changing effects

mod common;

use audioled_rs::effects::{LedOutput, MemoryDevice, PanelPattern, Panelize, StaticColor};
use audioled_rs::graph::{FilterGraph, GraphError, NodeId};
use common::builders::{Gain, GraphBuilder, Mix};
use common::{output_pixels, run_frame};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

/// Whether the connections of `graph` form a DAG (Kahn's algorithm)
fn is_acyclic(graph: &FilterGraph) -> bool {
    let mut in_degree: HashMap<NodeId, usize> = graph.nodes().iter().map(|n| (n.id(), 0)).collect();
    for con in graph.connections() {
        *in_degree.entry(con.to_node).or_default() += 1;
    }
    let mut ready: Vec<NodeId> = in_degree
        .iter()
        .filter(|&(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut visited = 0;
    while let Some(id) = ready.pop() {
        visited += 1;
        for con in graph.connections().iter().filter(|c| c.from_node == id) {
            let degree = in_degree.entry(con.to_node).or_default();
            *degree -= 1;
            if *degree == 0 {
                ready.push(con.to_node);
            }
        }
    }
    visited == graph.nodes().len()
}

fn assert_order_respects_connections(graph: &FilterGraph) {
    let position: HashMap<NodeId, usize> = graph
        .execution_order()
        .iter()
        .enumerate()
        .map(|(pos, &id)| (id, pos))
        .collect();
    for con in graph.connections() {
        if let (Some(from), Some(to)) = (position.get(&con.from_node), position.get(&con.to_node)) {
            assert!(from < to, "{:?} scheduled after its consumer {:?}", con.from_node, con.to_node);
        }
    }
}

/// Every pixel output of a scheduled node has the node's resolved shape.
/// Returns how many outputs were checked.
fn assert_outputs_match_resolution(graph: &FilterGraph) -> usize {
    let mut checked = 0;
    for &id in graph.execution_order() {
        let node = graph.node(id).unwrap();
        let effect = node.effect();
        for channel in 0..effect.num_output_channels() {
            let Some(buf) = node.output(channel).and_then(|s| s.as_pixels()) else {
                continue;
            };
            assert_eq!(Some(buf.num_pixels()), effect.num_output_pixels(), "{:?} pixels", id);
            assert_eq!(buf.num_rows(), effect.num_output_rows(), "{:?} rows", id);
            checked += 1;
        }
    }
    checked
}

#[test]
fn test_linear_chain_frame_reaches_device() {
    let mut builder = GraphBuilder::new();
    let chain = builder.chain([100.0, 50.0, 0.0], &[0.5, 2.0]);
    let sink = builder.sink();
    let (mut graph, device) = builder.build(8, 2);

    assert_eq!(graph.execution_order(), &[chain[0], chain[1], chain[2], sink]);
    run_frame(&mut graph, 0.016);

    let device = device.lock().unwrap();
    let frame = device.last_frame().expect("device received a frame");
    assert_eq!(frame.shape(), (2, 4));
    assert!(frame.pixels().iter().all(|p| *p == [100.0, 50.0, 0.0]));
}

#[test]
fn test_cycle_rejected_without_changes() {
    let mut builder = GraphBuilder::new();
    let a = builder.node(Box::new(Gain::new(1.0)));
    let b = builder.node(Box::new(Gain::new(1.0)));
    let c = builder.node(Box::new(Gain::new(1.0)));
    let graph = builder.graph_mut();
    graph.add_connection(a, 0, b, 0).unwrap();
    graph.add_connection(b, 0, c, 0).unwrap();

    let before = graph.connections().to_vec();
    let err = graph.add_connection(c, 0, a, 0).unwrap_err();
    assert!(matches!(err, GraphError::CyclicGraph { from, to } if from == c && to == a));
    assert_eq!(graph.connections(), before.as_slice());

    // Self-loops are cycles too
    assert!(matches!(
        graph.add_connection(b, 0, b, 0),
        Err(GraphError::CyclicGraph { .. })
    ));
}

#[test]
fn test_second_sink_rejected() {
    let mut builder = GraphBuilder::new();
    let (_device, shared) = MemoryDevice::shared();
    let existing = builder.sink();
    let err = builder
        .graph_mut()
        .add_effect_node(Box::new(LedOutput::new(shared)))
        .unwrap_err();
    assert!(matches!(err, GraphError::MultipleSink { existing: id } if id == existing));
    assert_eq!(builder.graph_mut().nodes().len(), 1);
}

#[test]
fn test_diamond_merges_branches() {
    let mut builder = GraphBuilder::new();
    let sink = builder.sink();
    let color = builder.node(Box::new(StaticColor::new([10.0, 20.0, 30.0])));
    let left = builder.node(Box::new(Gain::new(1.0)));
    let right = builder.node(Box::new(Gain::new(2.0)));
    let mix = builder.node(Box::new(Mix::new()));
    let graph = builder.graph_mut();
    graph.add_connection(color, 0, left, 0).unwrap();
    graph.add_connection(color, 0, right, 0).unwrap();
    graph.add_connection(left, 0, mix, 0).unwrap();
    graph.add_connection(right, 0, mix, 1).unwrap();
    graph.add_connection(mix, 0, sink, 0).unwrap();
    let (mut graph, _device) = builder.build(4, 1);

    assert_eq!(graph.execution_order().len(), 5);
    assert_eq!(graph.execution_order()[0], color);
    assert_eq!(graph.execution_order()[4], sink);
    assert_order_respects_connections(&graph);

    run_frame(&mut graph, 0.016);
    let out = output_pixels(&graph, mix, 0).unwrap();
    assert_eq!(out.pixels()[0], [30.0, 60.0, 90.0]);
}

#[test]
fn test_dangling_nodes_not_processed() {
    let mut builder = GraphBuilder::new();
    let chain = builder.chain([1.0, 1.0, 1.0], &[]);
    let dangling = builder.node(Box::new(StaticColor::new([9.0, 9.0, 9.0])));
    let (mut graph, _device) = builder.build(4, 1);

    assert!(!graph.execution_order().contains(&dangling));
    assert_eq!(graph.plan_stats().unreachable_nodes, 1);
    assert_eq!(graph.plan_stats().active_nodes, 2);

    run_frame(&mut graph, 0.016);
    assert!(output_pixels(&graph, chain[0], 0).is_some());
    assert!(output_pixels(&graph, dangling, 0).is_none());
}

#[test]
fn test_removing_sink_empties_order() {
    let mut builder = GraphBuilder::new();
    builder.chain([1.0, 1.0, 1.0], &[1.0]);
    let sink = builder.sink();
    let (mut graph, device) = builder.build(4, 1);

    graph.remove_effect_node(sink).unwrap();
    assert!(graph.sink().is_none());
    assert!(graph.execution_order().is_empty());
    assert!(graph.connections().iter().all(|c| !c.touches(sink)));

    // A frame without a sink does nothing
    run_frame(&mut graph, 0.016);
    assert_eq!(device.lock().unwrap().frames(), 0);
}

#[test]
fn test_panelize_changes_upstream_resolution() {
    let mut builder = GraphBuilder::new();
    let sink = builder.sink();
    let color = builder.node(Box::new(StaticColor::new([255.0, 0.0, 0.0])));
    let panel = builder.node(Box::new(Panelize::new(PanelPattern::Square)));
    let graph = builder.graph_mut();
    graph.add_connection(color, 0, panel, 0).unwrap();
    graph.add_connection(panel, 0, sink, 0).unwrap();
    let (mut graph, device) = builder.build(64, 8);

    let color_effect = graph.node(color).unwrap().effect();
    assert_eq!(color_effect.num_output_pixels(), Some(16));
    assert_eq!(color_effect.num_output_rows(), 1);

    run_frame(&mut graph, 0.016);
    let frame = device.lock().unwrap().last_frame().cloned().unwrap();
    assert_eq!(frame.shape(), (8, 8));

    let upstream = output_pixels(&graph, color, 0).unwrap();
    assert_eq!(upstream.shape(), (1, 16));
    let panelized = output_pixels(&graph, panel, 0).unwrap();
    assert_eq!(panelized.shape(), (8, 8));
    assert_eq!(assert_outputs_match_resolution(&graph), 2);
}

#[test]
fn test_channel_out_of_range() {
    let mut builder = GraphBuilder::new();
    let a = builder.node(Box::new(Gain::new(1.0)));
    let b = builder.node(Box::new(Gain::new(1.0)));
    let err = builder.graph_mut().add_connection(a, 0, b, 1).unwrap_err();
    assert!(matches!(
        err,
        GraphError::ChannelOutOfRange { node_id, direction: "input", channel: 1, available: 1 } if node_id == b
    ));
    assert!(builder.graph_mut().connections().is_empty());
}

proptest! {
    #[test]
    fn test_random_edges_never_form_cycles(
        edges in prop::collection::vec((0usize..8, 0usize..8), 0..40)
    ) {
        let mut builder = GraphBuilder::new();
        let sink = builder.sink();
        let mut ids: Vec<NodeId> = (0..7)
            .map(|_| builder.node(Box::new(Gain::new(1.0))))
            .collect();
        ids.push(sink);
        let graph = builder.graph_mut();

        for (from, to) in edges {
            let before = graph.connections().len();
            match graph.add_connection(ids[from], 0, ids[to], 0) {
                Ok(_) => prop_assert_eq!(graph.connections().len(), before + 1),
                Err(GraphError::CyclicGraph { .. }) => {
                    prop_assert_eq!(graph.connections().len(), before)
                }
                Err(other) => prop_assert!(false, "unexpected error {}", other),
            }
            // Property: the graph stays a DAG after every insertion
            prop_assert!(is_acyclic(graph));
        }
    }

    #[test]
    fn test_execution_order_is_valid(
        edges in prop::collection::vec((0usize..6, 0usize..6), 0..30),
        num_pixels in 1usize..64,
    ) {
        let mut builder = GraphBuilder::new();
        let sink = builder.sink();
        let mut ids: Vec<NodeId> = vec![builder.node(Box::new(StaticColor::default()))];
        ids.extend((0..5).map(|_| builder.node(Box::new(Gain::new(1.0)))));
        let graph = builder.graph_mut();
        for (from, to) in edges {
            // The generator has no input; the sink is only ever a consumer
            if to == 0 {
                continue;
            }
            let _ = graph.add_connection(ids[from], 0, ids[to], 0);
        }
        let _ = graph.add_connection(ids[5], 0, sink, 0);
        let (mut graph, _device) = builder.build(num_pixels, 1);

        let order = graph.execution_order().to_vec();
        let unique: HashSet<_> = order.iter().collect();
        prop_assert_eq!(unique.len(), order.len());
        prop_assert_eq!(order.last().copied(), Some(sink));
        assert_order_respects_connections(&graph);

        let stats = graph.plan_stats().clone();
        prop_assert_eq!(
            stats.active_nodes + stats.unreachable_nodes + stats.unresolved_nodes,
            stats.total_nodes
        );

        // Every scheduled node is resolved, so a frame always succeeds
        graph.update(0.016).unwrap();
        graph.process().unwrap();

        // The generator feeds the frame whenever it is scheduled
        let checked = assert_outputs_match_resolution(&graph);
        if order.contains(&ids[0]) {
            prop_assert!(checked >= 1);
            let color = output_pixels(&graph, ids[0], 0).unwrap();
            prop_assert_eq!(color.shape(), (1, num_pixels));
        }
    }
}
