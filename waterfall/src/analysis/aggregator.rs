//! Windowed waterfall aggregation.
//!
//! Reduces an event sequence to a sparse time × size histogram for the
//! currently visible window, plus summary statistics gathered in the same
//! pass.
//!
//! # Window
//!
//! ```text
//! Static:  start = min(t)            end = start + min(span, cap)
//! Live:    start = max(0, now - cap) end = now
//! ```
//!
//! The window is closed on both ends: an event exactly at `end` is counted
//! in the last column. Static windows always end on an event (the latest one
//! when the span fits under the cap), and dropping it would lose data.
//!
//! # Performance
//!
//! - One pass over the input, O(n) with a `HashMap` entry per event
//! - Memory: O(populated cells), bounded by `display_width × SIZE_BUCKET_ROWS`

// Bucket math intentionally converts between f64 and usize
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroUsize;

use super::size_buckets::size_bucket_index;
use crate::config::{MIN_TIME_BUCKET_MS, WINDOW_CAP_MS};
use crate::domain::AllocationEvent;

// =============================================================================
// INPUT / OUTPUT TYPES
// =============================================================================

/// How the window is placed on the time axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowMode {
    /// Fixed window anchored at the earliest event of a loaded dataset
    Static,
    /// Rolling window ending at the capture clock
    Live { current_time_ms: f64 },
}

/// Time span covered by one aggregation pass (closed interval)
///
/// `span_ms()` is the span the window was built with; a capped window
/// reports exactly the cap even where `end_ms - start_ms` rounds above it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    pub start_ms: f64,
    pub end_ms: f64,
    span_ms: f64,
}

impl TimeWindow {
    #[must_use]
    pub fn new(start_ms: f64, end_ms: f64) -> Self {
        Self { start_ms, end_ms, span_ms: end_ms - start_ms }
    }

    /// Window of `span_ms` starting at `start_ms`
    #[must_use]
    pub fn starting_at(start_ms: f64, span_ms: f64) -> Self {
        Self { start_ms, end_ms: start_ms + span_ms, span_ms }
    }

    /// Window of `span_ms` ending at `end_ms`
    #[must_use]
    pub fn ending_at(end_ms: f64, span_ms: f64) -> Self {
        Self { start_ms: end_ms - span_ms, end_ms, span_ms }
    }

    #[must_use]
    pub fn span_ms(&self) -> f64 {
        self.span_ms
    }

    #[must_use]
    pub fn contains(&self, elapsed_ms: f64) -> bool {
        elapsed_ms >= self.start_ms && elapsed_ms <= self.end_ms
    }
}

/// Summary of one pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateStats {
    pub total_allocations: u64,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
    /// Largest single cell count; the renderer's color scale maximum
    pub max_bucket_count: u32,
    pub time_bucket_width_ms: f64,
}

/// One populated histogram cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistogramCell {
    pub time_bucket: usize,
    pub size_bucket: usize,
    pub count: u32,
}

/// Sparse `(time_bucket, size_bucket) → count` map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Histogram {
    cells: HashMap<(usize, usize), u32>,
}

impl Histogram {
    /// Count of a cell, 0 when unpopulated
    #[must_use]
    pub fn get(&self, time_bucket: usize, size_bucket: usize) -> u32 {
        self.cells.get(&(time_bucket, size_bucket)).copied().unwrap_or(0)
    }

    /// Number of populated cells
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Sum of all cell counts
    #[must_use]
    pub fn total(&self) -> u64 {
        self.cells.values().map(|&c| u64::from(c)).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = HistogramCell> + '_ {
        self.cells.iter().map(|(&(time_bucket, size_bucket), &count)| HistogramCell {
            time_bucket,
            size_bucket,
            count,
        })
    }

    /// Cells ordered by time bucket, then size bucket
    #[must_use]
    pub fn sorted_cells(&self) -> Vec<HistogramCell> {
        let mut cells: Vec<_> = self.iter().collect();
        cells.sort_unstable_by_key(|c| (c.time_bucket, c.size_bucket));
        cells
    }

    /// Increment a cell and return its new count
    fn bump(&mut self, time_bucket: usize, size_bucket: usize) -> u32 {
        let count = self.cells.entry((time_bucket, size_bucket)).or_insert(0);
        *count = count.saturating_add(1);
        *count
    }
}

/// Result of one aggregation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub histogram: Histogram,
    pub stats: AggregateStats,
    /// `None` only for a static pass over no events
    pub window: Option<TimeWindow>,
}

// =============================================================================
// AGGREGATION
// =============================================================================

/// Aggregate `events` into `display_width` columns with the standard 30 s cap
#[must_use]
pub fn aggregate(
    events: &[AllocationEvent],
    display_width: NonZeroUsize,
    mode: WindowMode,
) -> Aggregate {
    aggregate_with_cap(events, display_width, mode, WINDOW_CAP_MS)
}

/// Aggregate with an explicit window cap
#[must_use]
pub fn aggregate_with_cap(
    events: &[AllocationEvent],
    display_width: NonZeroUsize,
    mode: WindowMode,
    window_cap_ms: f64,
) -> Aggregate {
    let window = window_bounds(events, mode, window_cap_ms);

    let Some(window) = window.filter(|_| !events.is_empty()) else {
        return Aggregate { window, ..Aggregate::default() };
    };

    let columns = display_width.get();
    let bucket_width_ms = (window.span_ms() / columns as f64).max(MIN_TIME_BUCKET_MS);
    let last_column = columns - 1;

    let mut histogram = Histogram::default();
    let mut stats = AggregateStats { time_bucket_width_ms: bucket_width_ms, ..Default::default() };

    for event in events {
        if !window.contains(event.elapsed_ms) {
            continue;
        }

        let column = ((event.elapsed_ms - window.start_ms) / bucket_width_ms).floor() as usize;
        let row = size_bucket_index(event.size_bytes);
        let count = histogram.bump(column.min(last_column), row);

        stats.total_allocations += 1;
        stats.total_size_bytes = stats.total_size_bytes.saturating_add(event.size_bytes);
        stats.max_size_bytes = stats.max_size_bytes.max(event.size_bytes);
        stats.max_bucket_count = stats.max_bucket_count.max(count);
    }

    Aggregate { histogram, stats, window: Some(window) }
}

/// Window placement for `mode`; `None` for a static pass over no events
#[must_use]
pub fn window_bounds(
    events: &[AllocationEvent],
    mode: WindowMode,
    window_cap_ms: f64,
) -> Option<TimeWindow> {
    match mode {
        WindowMode::Live { current_time_ms } => {
            let span_ms = current_time_ms.min(window_cap_ms).max(0.0);
            Some(TimeWindow::ending_at(current_time_ms, span_ms))
        }
        WindowMode::Static => {
            let first = events.first()?;
            let (min, max) = events
                .iter()
                .fold((first.elapsed_ms, first.elapsed_ms), |(lo, hi), e| {
                    (lo.min(e.elapsed_ms), hi.max(e.elapsed_ms))
                });
            if max - min <= window_cap_ms {
                Some(TimeWindow::new(min, max))
            } else {
                Some(TimeWindow::starting_at(min, window_cap_ms))
            }
        }
    }
}
