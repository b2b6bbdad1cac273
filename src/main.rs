//! audioled - Main Entry Point
//!
//! Runs a demo effect graph through the frame driver:
//!
//! ```text
//! audioled [config.toml] [seconds]
//! ```

use anyhow::Context;
use audioled_rs::{
    config::{default_config_path, EngineConfig},
    effects::{
        LedOutput, MemoryDevice, PanelPattern, Panelize, SharedDevice, SineLfo, StaticColor,
    },
    graph::{DriverMessage, FilterGraph, FrameDriver},
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_RUN_SECONDS: f64 = 5.0;

/// StaticColor → Panelize → LedOutput, with an LFO pulsing the color.
fn build_demo_graph(config: &EngineConfig, device: SharedDevice) -> anyhow::Result<FilterGraph> {
    let mut graph = FilterGraph::new(config.graph);

    let color = graph.add_effect_node(Box::new(StaticColor::new([255.0, 96.0, 0.0])))?;
    let panel = graph.add_effect_node(Box::new(Panelize::new(PanelPattern::Diamond)))?;
    let led = graph.add_effect_node(Box::new(LedOutput::new(device)))?;
    graph.add_connection(color, 0, panel, 0)?;
    graph.add_connection(panel, 0, led, 0)?;

    let lfo = graph.add_modulation_source(Box::new(SineLfo::new(0.5)))?;
    graph.add_modulation(lfo, color, Some("brightness"), 0.5, true)?;

    graph.propagate_num_pixels(config.display.num_pixels, config.display.num_rows);
    Ok(graph)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,audioled_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().map(PathBuf::from).or_else(default_config_path);
    let seconds = match args.next() {
        Some(arg) => arg
            .parse::<f64>()
            .with_context(|| format!("Invalid run duration '{}'", arg))?,
        None => DEFAULT_RUN_SECONDS,
    };
    let run_for = Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("Run duration out of range: {}", seconds))?;

    let config = match &config_path {
        Some(path) => {
            tracing::info!("Loading engine config from {:?}", path);
            EngineConfig::load_or_default(path)
        }
        None => EngineConfig::default(),
    };

    tracing::info!(
        "Starting audioled: {} pixels on {} rows at {} fps",
        config.display.num_pixels,
        config.display.num_rows,
        config.driver.fps
    );

    let (device, shared) = MemoryDevice::shared();
    let graph = build_demo_graph(&config, shared).context("Failed to build demo graph")?;
    let driver = FrameDriver::spawn(graph, config.driver).context("Failed to spawn frame driver")?;
    driver.start();

    let deadline = Instant::now() + run_for;
    while Instant::now() < deadline {
        match driver.recv_timeout(Duration::from_millis(100)) {
            Some(DriverMessage::FrameError { node_id, message }) => {
                tracing::warn!("Frame error at {:?}: {}", node_id, message);
            }
            Some(DriverMessage::Stats(stats)) => {
                tracing::info!(
                    "{} frames ({} failed), last frame {:?}",
                    stats.frames,
                    stats.failed_frames,
                    stats.last_frame
                );
            }
            Some(_) | None => {}
        }
    }

    tracing::info!("Shutting down...");
    let graph = driver.shutdown().context("Frame driver thread panicked")?;
    graph.log_timings();

    let frames = device.lock().map(|d| d.frames()).unwrap_or_default();
    tracing::info!("Device showed {} frames", frames);
    Ok(())
}
