//! Test effects and graph builders

use audioled_rs::effects::{LedOutput, MemoryDevice, StaticColor};
use audioled_rs::graph::parameter::read_f64;
use audioled_rs::graph::{
    Effect, EffectCore, EffectResult, FilterGraph, GraphResult, NodeId, ParameterDefinition,
    ParameterValues, PixelBuffer, Signal,
};
use audioled_rs::config::GraphConfig;
use serde_json::Value;
use std::sync::{Arc, Mutex};

/// One input, one output, scales pixels by a modulatable `gain` in `[0, 2]`.
pub struct Gain {
    core: EffectCore,
    gain: f64,
}

impl Gain {
    pub fn new(gain: f64) -> Self {
        Self {
            core: EffectCore::new(),
            gain,
        }
    }
}

impl Effect for Gain {
    fn type_name(&self) -> &'static str {
        "Gain"
    }

    fn num_input_channels(&self) -> usize {
        1
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

    fn process(&mut self, inputs: &[Option<Signal>], outputs: &mut [Option<Signal>]) -> EffectResult {
        let gain = self.modulated_parameter("gain", self.gain) as f32;
        outputs[0] = inputs[0].as_ref().and_then(Signal::as_pixels).map(|buf| {
            let pixels = buf
                .pixels()
                .iter()
                .map(|p| [p[0] * gain, p[1] * gain, p[2] * gain])
                .collect();
            Signal::Pixels(PixelBuffer::from_pixels(pixels, buf.num_rows()))
        });
        Ok(())
    }

    fn parameter_definition(&self) -> ParameterDefinition {
        ParameterDefinition::new().with("gain", 1.0, 0.0, 2.0, 0.01)
    }

    fn parameters(&self) -> ParameterValues {
        let mut values = ParameterValues::new();
        values.insert("gain".into(), Value::from(self.gain));
        values
    }

    fn update_parameters(&mut self, values: &ParameterValues) -> GraphResult<()> {
        if let Some(gain) = read_f64(values, "gain")? {
            self.gain = gain;
        }
        Ok(())
    }
}

/// Two inputs, one output; adds whatever inputs are present.
pub struct Mix {
    core: EffectCore,
}

impl Mix {
    pub fn new() -> Self {
        Self {
            core: EffectCore::new(),
        }
    }
}

impl Effect for Mix {
    fn type_name(&self) -> &'static str {
        "Mix"
    }

    fn num_input_channels(&self) -> usize {
        2
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

    fn process(&mut self, inputs: &[Option<Signal>], outputs: &mut [Option<Signal>]) -> EffectResult {
        let mut present = inputs.iter().flatten().filter_map(Signal::as_pixels);
        let Some(first) = present.next() else {
            outputs[0] = None;
            return Ok(());
        };
        let mut sum = first.clone();
        for buf in present {
            for (acc, p) in sum.pixels_mut().iter_mut().zip(buf.pixels()) {
                for (a, b) in acc.iter_mut().zip(p) {
                    *a += b;
                }
            }
        }
        outputs[0] = Some(Signal::Pixels(sum));
        Ok(())
    }
}

/// Builder for graphs ending in an in-memory LED output
pub struct GraphBuilder {
    graph: FilterGraph,
    device: Arc<Mutex<MemoryDevice>>,
    sink: NodeId,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    pub fn with_config(config: GraphConfig) -> Self {
        let (device, shared) = MemoryDevice::shared();
        let mut graph = FilterGraph::new(config);
        let sink = graph
            .add_effect_node(Box::new(LedOutput::new(shared)))
            .expect("empty graph accepts a sink");
        Self {
            graph,
            device,
            sink,
        }
    }

    pub fn sink(&self) -> NodeId {
        self.sink
    }

    pub fn device(&self) -> Arc<Mutex<MemoryDevice>> {
        self.device.clone()
    }

    pub fn graph_mut(&mut self) -> &mut FilterGraph {
        &mut self.graph
    }

    /// Add a node without connecting it
    pub fn node(&mut self, effect: Box<dyn Effect>) -> NodeId {
        self.graph.add_effect_node(effect).expect("add node")
    }

    /// Add a `StaticColor -> Gain x n -> sink` chain, returning the chain's node ids
    pub fn chain(&mut self, color: [f32; 3], gains: &[f64]) -> Vec<NodeId> {
        let mut ids = vec![self.node(Box::new(StaticColor::new(color)))];
        for &gain in gains {
            let id = self.node(Box::new(Gain::new(gain)));
            let prev = *ids.last().expect("chain starts with a color");
            self.graph.add_connection(prev, 0, id, 0).expect("connect chain");
            ids.push(id);
        }
        let last = *ids.last().expect("chain starts with a color");
        self.graph
            .add_connection(last, 0, self.sink, 0)
            .expect("connect chain to sink");
        ids
    }

    /// Propagate resolution and hand back the graph and device
    pub fn build(mut self, num_pixels: usize, num_rows: usize) -> (FilterGraph, Arc<Mutex<MemoryDevice>>) {
        self.graph.propagate_num_pixels(num_pixels, num_rows);
        (self.graph, self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_builder_chain() {
        let mut builder = GraphBuilder::new();
        let chain = builder.chain([255.0, 0.0, 0.0], &[0.5]);
        let sink = builder.sink();
        let (graph, _device) = builder.build(10, 1);

        assert_eq!(chain.len(), 2);
        assert_eq!(graph.sink(), Some(sink));
        assert_eq!(graph.execution_order(), &[chain[0], chain[1], sink]);
    }
}
