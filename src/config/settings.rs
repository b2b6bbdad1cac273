//! Engine settings groups
//!
//! Each group is a plain serde struct with every field defaulted, so a partial
//! TOML file only needs to mention what it changes.
//!
//! # Main Types
//!
//! - [`GraphConfig`] - Update dispatch mode and timing collection
//! - [`DisplayConfig`] - Resolution pushed into the device output
//! - [`DriverConfig`] - Frame rate and statistics cadence of the frame driver

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default frame rate of the frame driver
pub const DEFAULT_FPS: u32 = 60;

/// Default interval between periodic statistics messages
pub const DEFAULT_STATS_INTERVAL_MS: u64 = 5000;

/// Default strip length
pub const DEFAULT_NUM_PIXELS: usize = 300;

fn default_true() -> bool {
    true
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

fn default_stats_interval_ms() -> u64 {
    DEFAULT_STATS_INTERVAL_MS
}

fn default_num_pixels() -> usize {
    DEFAULT_NUM_PIXELS
}

fn default_num_rows() -> usize {
    1
}

/// Behavior of the filter graph itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphConfig {
    /// Run node updates concurrently on the rayon pool
    #[serde(default = "default_true")]
    pub async_update: bool,

    /// Collect per-node update and process timings
    #[serde(default)]
    pub record_timings: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            async_update: true,
            record_timings: false,
        }
    }
}

/// Output resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_num_pixels")]
    pub num_pixels: usize,

    #[serde(default = "default_num_rows")]
    pub num_rows: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            num_pixels: DEFAULT_NUM_PIXELS,
            num_rows: 1,
        }
    }
}

impl DisplayConfig {
    /// Pixels per row
    pub fn num_cols(&self) -> usize {
        self.num_pixels / self.num_rows.max(1)
    }
}

/// Frame driver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Target frames per second (0 idles the loop)
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// Interval between periodic statistics messages in milliseconds
    #[serde(default = "default_stats_interval_ms")]
    pub stats_interval_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            fps: DEFAULT_FPS,
            stats_interval_ms: DEFAULT_STATS_INTERVAL_MS,
        }
    }
}

impl DriverConfig {
    /// Target interval between frame starts, `None` when idle
    pub fn frame_interval(&self) -> Option<Duration> {
        (self.fps > 0).then(|| Duration::from_nanos(1_000_000_000 / self.fps as u64))
    }

    pub fn stats_interval(&self) -> Duration {
        Duration::from_millis(self.stats_interval_ms)
    }
}
