//! # Waterfall - Heap Allocation Waterfall
//!
//! Waterfall turns a stream of heap allocations into a two-dimensional
//! histogram: elapsed time on one axis, allocation size (in fixed
//! power-of-two-ish buckets) on the other, allocation count in each cell.
//! Data comes either from a recorded file or from a live capture that keeps
//! running while the consumer re-aggregates a sliding window on a timer.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────────┐
//! │   TraceProvider      │        │      CsvSource               │
//! │ ebpf / synthetic /   │        │  timestamp_ms,size_bytes     │
//! │ channel              │        └──────────────┬───────────────┘
//! └──────────┬───────────┘                       │ load_once()
//!            │ RawRecord (ingestion thread)      │
//!            ▼                                   │
//! ┌──────────────────────┐                       │
//! │   CaptureSession     │                       │
//! │  filter ▸ decode ▸   │                       │
//! │  EventStore (Mutex)  │                       │
//! └──────────┬───────────┘                       │
//!            │ snapshot(window_cap)              │
//!            ▼                                   ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  WaterfallModel ─▶ aggregate(events, width, mode)           │
//! │                    Histogram + AggregateStats + TimeWindow  │
//! └──────────────────────────────┬──────────────────────────────┘
//!                                ▼
//!                      renderer / JSON export
//! ```
//!
//! ## Module Structure
//!
//! - [`capture`]: provider seam, session lifecycle, ingestion thread
//! - [`event_store`]: append-only time-ordered buffer with window reads and trimming
//! - [`analysis`]: size buckets and the histogram reduction
//! - [`model`]: renderer-facing state (static data, live mode, live clock)
//! - [`source`]: file and live data sources
//! - [`export`]: JSON form of one aggregation pass
//! - [`config`]: tunables and their defaults
//! - [`domain`]: event types and errors
//! - [`cli`]: command-line arguments
//!
//! ## Typical Usage
//!
//! ```bash
//! # Aggregate a recorded dump
//! ./waterfall load allocs.csv --export agg.json
//!
//! # Live capture with generated traffic
//! ./waterfall live --duration 10
//!
//! # Trace libc malloc in a running process
//! sudo ./waterfall live --provider ebpf --pid <PID>
//! ```

pub mod analysis;
pub mod capture;
pub mod cli;
pub mod config;
pub mod domain;
pub mod event_store;
pub mod export;
pub mod model;
#[cfg(feature = "ebpf")]
pub mod preflight;
pub mod source;
