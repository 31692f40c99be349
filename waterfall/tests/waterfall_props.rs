use std::num::NonZeroUsize;

use proptest::prelude::*;
use waterfall::analysis::{aggregate, size_bucket_index, WindowMode, OVERFLOW_BUCKET, SIZE_BUCKETS};
use waterfall::config::{MIN_TIME_BUCKET_MS, WINDOW_CAP_MS};
use waterfall::domain::AllocationEvent;
use waterfall::event_store::EventStore;

fn events_strategy() -> impl Strategy<Value = Vec<AllocationEvent>> {
    proptest::collection::vec((0.0f64..120_000.0, 0u64..200_000), 0..200)
        .prop_map(|pairs| pairs.into_iter().map(|(t, s)| AllocationEvent::new(t, s)).collect())
}

fn window_mode(live_clock: Option<f64>) -> WindowMode {
    live_clock.map_or(WindowMode::Static, |t| WindowMode::Live { current_time_ms: t })
}

proptest! {
    #[test]
    fn size_buckets_are_monotonic(a in any::<u64>(), b in any::<u64>()) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(size_bucket_index(lo) <= size_bucket_index(hi));

        let index = size_bucket_index(hi);
        prop_assert!(index <= OVERFLOW_BUCKET);
        if let Some(&bound) = SIZE_BUCKETS.get(index) {
            prop_assert!(hi <= bound);
        }
        if index > 0 {
            prop_assert!(hi > SIZE_BUCKETS[index - 1]);
        }
    }

    #[test]
    fn histogram_counts_every_event_in_the_window(
        events in events_strategy(),
        columns in 1usize..1024,
        live_clock in prop::option::of(0.0f64..150_000.0),
    ) {
        let mode = window_mode(live_clock);
        let result = aggregate(&events, NonZeroUsize::new(columns).unwrap(), mode);

        let in_window: Vec<_> = result
            .window
            .map(|w| events.iter().filter(|e| w.contains(e.elapsed_ms)).copied().collect())
            .unwrap_or_default();

        prop_assert_eq!(result.histogram.total(), in_window.len() as u64);
        prop_assert_eq!(result.stats.total_allocations, in_window.len() as u64);
        let in_window_bytes: u64 = in_window.iter().map(|e| e.size_bytes).sum();
        prop_assert_eq!(result.stats.total_size_bytes, in_window_bytes);
        prop_assert_eq!(
            result.stats.max_size_bytes,
            in_window.iter().map(|e| e.size_bytes).max().unwrap_or(0)
        );

        let densest = result.histogram.iter().map(|c| c.count).max().unwrap_or(0);
        prop_assert_eq!(result.stats.max_bucket_count, densest);
        for cell in result.histogram.iter() {
            prop_assert!(cell.time_bucket < columns);
            prop_assert!(cell.size_bucket <= OVERFLOW_BUCKET);
        }
    }

    #[test]
    fn window_never_exceeds_cap(
        events in events_strategy(),
        live_clock in prop::option::of(0.0f64..150_000.0),
    ) {
        let mode = window_mode(live_clock);
        let result = aggregate(&events, NonZeroUsize::new(64).unwrap(), mode);

        if let Some(window) = result.window {
            prop_assert!(window.start_ms >= 0.0);
            prop_assert!(window.span_ms() <= WINDOW_CAP_MS);
            prop_assert!(window.start_ms <= window.end_ms);
            let bucket_width = (window.span_ms() / 64.0).max(MIN_TIME_BUCKET_MS);
            let expected_width = if events.is_empty() { 0.0 } else { bucket_width };
            prop_assert_eq!(result.stats.time_bucket_width_ms, expected_width);
        }
        if let Some(t) = live_clock {
            prop_assert_eq!(result.window.map(|w| w.end_ms), Some(t));
        }
    }

    #[test]
    fn store_window_matches_filter_and_survives_trim(
        mut times in proptest::collection::vec(0.0f64..10_000.0, 1..300),
        max_age in 0.0f64..5_000.0,
        watermark in 0usize..64,
    ) {
        times.sort_by(f64::total_cmp);
        let mut store = EventStore::with_trim_watermark(watermark);
        for &t in &times {
            store.push(AllocationEvent::new(t, 32));
        }

        let latest = times[times.len() - 1];
        let expected: Vec<f64> = times.iter().copied().filter(|&t| t >= latest - max_age).collect();

        let first: Vec<f64> = store.window(max_age).iter().map(|e| e.elapsed_ms).collect();
        prop_assert_eq!(&first, &expected);

        // A trim may only evict what the window already excluded
        let again: Vec<f64> = store.window(max_age).iter().map(|e| e.elapsed_ms).collect();
        prop_assert_eq!(&again, &expected);
        prop_assert_eq!(store.len() as u64 + store.trimmed_total(), times.len() as u64);
    }
}
