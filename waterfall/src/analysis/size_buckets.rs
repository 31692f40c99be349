//! Size bucket ladder
//!
//! Histogram rows are defined by fixed, ascending, inclusive upper bounds.
//! The ladder follows common allocator size classes up to 64 KiB; the last
//! bound (`i32::MAX`) is effectively unbounded, and anything larger lands in
//! the overflow row at index `SIZE_BUCKETS.len()`.

/// Inclusive upper bound of each size bucket, in bytes
pub const SIZE_BUCKETS: [u64; 34] = [
    8, 16, 32, 48, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 384, 448, 512, 640, 768, 896,
    1024, 1792, 2688, 4032, 5376, 8192, 16448, 24640, 32832, 41024, 49216, 57408, 65600,
    2_147_483_647,
];

/// Row for sizes above every threshold
pub const OVERFLOW_BUCKET: usize = SIZE_BUCKETS.len();

/// Number of histogram rows, overflow included
pub const SIZE_BUCKET_ROWS: usize = SIZE_BUCKETS.len() + 1;

/// Index of the first threshold `>= size`, or [`OVERFLOW_BUCKET`]
#[must_use]
pub fn size_bucket_index(size: u64) -> usize {
    SIZE_BUCKETS.partition_point(|&threshold| threshold < size)
}

/// Inclusive upper bound of a row; `None` for the overflow row
#[must_use]
pub fn bucket_upper_bound(index: usize) -> Option<u64> {
    SIZE_BUCKETS.get(index).copied()
}

/// Short human label for a row, e.g. `"≤4032 B"`
#[must_use]
pub fn bucket_label(index: usize) -> String {
    match bucket_upper_bound(index) {
        Some(bound) => format!("≤{bound} B"),
        None => format!(">{} B", SIZE_BUCKETS[SIZE_BUCKETS.len() - 1]),
    }
}
