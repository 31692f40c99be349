//! Aggregate export
//!
//! Writes one aggregation pass as JSON so an external renderer (or a test)
//! can paint the waterfall without linking this crate.
//!
//! ```json
//! {
//!   "mode": "static",
//!   "window": { "start_ms": 0.0, "end_ms": 5000.0 },
//!   "stats": { "total_allocations": 3, ... },
//!   "size_buckets": [8, 16, ...],
//!   "cells": [ { "time_bucket": 0, "size_bucket": 1, "count": 2 }, ... ]
//! }
//! ```

use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::analysis::{
    Aggregate, AggregateStats, HistogramCell, TimeWindow, WindowMode, SIZE_BUCKETS,
};
use crate::domain::ExportError;

/// Serialised form of one pass
#[derive(Debug, Serialize)]
pub struct AggregateExport {
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<TimeWindow>,
    pub display_width: usize,
    pub stats: AggregateStats,
    /// Inclusive row bounds; row `size_buckets.len()` is the overflow row
    pub size_buckets: &'static [u64],
    /// Populated cells, ordered by time then size bucket
    pub cells: Vec<HistogramCell>,
}

impl AggregateExport {
    #[must_use]
    pub fn new(aggregate: &Aggregate, mode: WindowMode, display_width: usize) -> Self {
        Self {
            mode: match mode {
                WindowMode::Static => "static",
                WindowMode::Live { .. } => "live",
            },
            window: aggregate.window,
            display_width,
            stats: aggregate.stats,
            size_buckets: &SIZE_BUCKETS,
            cells: aggregate.histogram.sorted_cells(),
        }
    }

    /// Write pretty-printed JSON to `writer`
    ///
    /// # Errors
    /// Serialization or I/O failure.
    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), ExportError> {
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    /// Create (or truncate) `path` and write the export into it
    ///
    /// # Errors
    /// Serialization or I/O failure.
    pub fn write_to_path(&self, path: &Path) -> Result<(), ExportError> {
        let file = File::create(path)
            .map_err(|e| ExportError::WriteFailed(format!("{}: {e}", path.display())))?;
        self.write(BufWriter::new(file))
    }
}
