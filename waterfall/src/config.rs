//! Tunables for capture and aggregation
//!
//! Every knob has a constant default; the CLI overrides a subset of them.

use std::num::NonZeroUsize;
use std::time::Duration;

/// Widest time span a single waterfall pass ever covers
pub const WINDOW_CAP_MS: f64 = 30_000.0;

/// Narrowest time bucket; keeps the division non-degenerate for tiny spans
pub const MIN_TIME_BUCKET_MS: f64 = 0.1;

/// Consumer refresh cadence
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// Number of events older than the live window tolerated before a front trim
pub const DEFAULT_TRIM_WATERMARK: usize = 512 * 1024;

/// Horizontal bucket count when no display width is known
pub const DEFAULT_DISPLAY_WIDTH: NonZeroUsize = match NonZeroUsize::new(800) {
    Some(width) => width,
    None => unreachable!(),
};

/// Runtime configuration for a waterfall pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterfallConfig {
    /// Window cap handed to both `snapshot()` and the aggregator
    pub window_cap_ms: f64,
    /// Consumer polling interval
    pub tick: Duration,
    /// Front-trim watermark for the event store
    pub trim_watermark: usize,
    /// Horizontal bucket count
    pub display_width: NonZeroUsize,
}

impl Default for WaterfallConfig {
    fn default() -> Self {
        Self {
            window_cap_ms: WINDOW_CAP_MS,
            tick: DEFAULT_TICK,
            trim_watermark: DEFAULT_TRIM_WATERMARK,
            display_width: DEFAULT_DISPLAY_WIDTH,
        }
    }
}

impl WaterfallConfig {
    #[must_use]
    pub fn with_display_width(mut self, width: NonZeroUsize) -> Self {
        self.display_width = width;
        self
    }

    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    #[must_use]
    pub fn with_trim_watermark(mut self, watermark: usize) -> Self {
        self.trim_watermark = watermark;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_values() {
        let config = WaterfallConfig::default();
        assert_eq!(config.window_cap_ms, 30_000.0);
        assert_eq!(config.tick, Duration::from_millis(50));
        assert_eq!(config.trim_watermark, 524_288);
        assert_eq!(config.display_width.get(), 800);
    }
}
