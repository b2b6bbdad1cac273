//! Rolling min/max/avg accumulator for per-node frame timings.

use std::fmt;
use std::time::Duration;

/// Samples per window before statistics restart.
pub const TIMING_WINDOW: u32 = 100;

/// Running statistics over windows of [`TIMING_WINDOW`] samples.
///
/// When a window fills up the next sample discards all history and becomes the
/// new min, max and average.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timing {
    min: Option<f64>,
    max: Option<f64>,
    avg: Option<f64>,
    count: u32,
}

impl Timing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sample in seconds.
    pub fn update(&mut self, sample: f64) {
        match (self.min, self.max, self.avg) {
            (Some(min), Some(max), Some(avg)) if self.count % TIMING_WINDOW != 0 => {
                let n = f64::from(self.count);
                self.min = Some(min.min(sample));
                self.max = Some(max.max(sample));
                self.avg = Some((avg * n + sample) / (n + 1.0));
            }
            _ => {
                self.min = Some(sample);
                self.max = Some(sample);
                self.avg = Some(sample);
                self.count = 0;
            }
        }
        self.count = (self.count + 1).min(TIMING_WINDOW);
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.update(elapsed.as_secs_f64());
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    pub fn avg(&self) -> Option<f64> {
        self.avg
    }

    /// Samples in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl fmt::Display for Timing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max, self.avg) {
            (Some(min), Some(max), Some(avg)) => write!(
                f,
                "min {:.3}ms, max {:.3}ms, avg {:.3}ms",
                min * 1e3,
                max * 1e3,
                avg * 1e3
            ),
            _ => write!(f, "no samples"),
        }
    }
}
