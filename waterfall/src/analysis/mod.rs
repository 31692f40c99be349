//! Aggregation logic for allocation events
//!
//! Pure reductions with no I/O or shared state, safe to call from whichever
//! thread owns rendering.

pub mod aggregator;
pub mod size_buckets;

pub use aggregator::{
    aggregate, aggregate_with_cap, window_bounds, Aggregate, AggregateStats, Histogram,
    HistogramCell, TimeWindow, WindowMode,
};
pub use size_buckets::{
    bucket_label, bucket_upper_bound, size_bucket_index, OVERFLOW_BUCKET, SIZE_BUCKETS,
    SIZE_BUCKET_ROWS,
};
