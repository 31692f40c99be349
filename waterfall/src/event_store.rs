//! Buffered allocation events for live capture
//!
//! The store is an arena plus a logical head offset. Appends go to the back,
//! eviction only advances the head; the arena is compacted once the dead
//! prefix is at least as long as the live part, so trimming costs O(evicted)
//! amortized instead of shifting the whole buffer on every trim.
//!
//! The store is not synchronised itself. `CaptureSession` keeps it behind the
//! session mutex together with the time-zero anchor.

use crate::config::DEFAULT_TRIM_WATERMARK;
use crate::domain::AllocationEvent;

#[derive(Debug)]
pub struct EventStore {
    arena: Vec<AllocationEvent>,
    /// Index of the oldest live event in `arena`
    head: usize,
    trim_watermark: usize,
    trimmed_total: u64,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new()
    }
}

impl EventStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_trim_watermark(DEFAULT_TRIM_WATERMARK)
    }

    /// Create a store that trims once more than `trim_watermark` events fall
    /// out of the requested window
    #[must_use]
    pub fn with_trim_watermark(trim_watermark: usize) -> Self {
        Self { arena: Vec::new(), head: 0, trim_watermark, trimmed_total: 0 }
    }

    /// Append an event.
    ///
    /// Time order is an invariant of the store: an event arriving with an
    /// earlier timestamp than the latest buffered one is recorded at the
    /// latest time instead of being reordered.
    pub fn push(&mut self, event: AllocationEvent) {
        let elapsed_ms = match self.latest_ms() {
            Some(latest) if event.elapsed_ms < latest => latest,
            _ => event.elapsed_ms,
        };
        self.arena.push(AllocationEvent { elapsed_ms, ..event });
    }

    /// Number of buffered (not yet evicted) events
    #[must_use]
    pub fn len(&self) -> usize {
        self.arena.len() - self.head
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Buffered events, oldest first
    #[must_use]
    pub fn as_slice(&self) -> &[AllocationEvent] {
        &self.arena[self.head..]
    }

    #[must_use]
    pub fn latest_ms(&self) -> Option<f64> {
        self.as_slice().last().map(|e| e.elapsed_ms)
    }

    #[must_use]
    pub fn oldest_ms(&self) -> Option<f64> {
        self.as_slice().first().map(|e| e.elapsed_ms)
    }

    /// Total events evicted by front trims since creation or the last `clear()`
    #[must_use]
    pub fn trimmed_total(&self) -> u64 {
        self.trimmed_total
    }

    /// Drop every buffered event and release the arena
    pub fn clear(&mut self) {
        self.arena = Vec::new();
        self.head = 0;
        self.trimmed_total = 0;
    }

    /// Copy out every event with `elapsed_ms >= latest - max_age_ms`.
    ///
    /// When more than the trim watermark of events lie before that cutoff,
    /// everything strictly before the first returned event is evicted.
    pub fn window(&mut self, max_age_ms: f64) -> Vec<AllocationEvent> {
        let Some(latest) = self.latest_ms() else {
            return Vec::new();
        };
        let cutoff = latest - max_age_ms.max(0.0);

        let live = self.as_slice();
        let first_kept = live.partition_point(|e| e.elapsed_ms < cutoff);
        let recent = live[first_kept..].to_vec();

        if first_kept > self.trim_watermark {
            self.trim_front(first_kept);
        }

        recent
    }

    fn trim_front(&mut self, count: usize) {
        let count = count.min(self.len());
        self.head += count;
        self.trimmed_total += count as u64;

        // Compact once the dead prefix outweighs the live tail; each compaction
        // moves at most as many events as were evicted since the last one.
        if self.head >= self.arena.len() - self.head {
            self.arena.drain(..self.head);
            self.head = 0;
        }

        log::debug!("trimmed {count} events, {} buffered", self.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(times: &[f64], watermark: usize) -> EventStore {
        let mut store = EventStore::with_trim_watermark(watermark);
        for &t in times {
            store.push(AllocationEvent::new(t, 16));
        }
        store
    }

    #[test]
    fn test_window_returns_events_within_max_age() {
        let mut store = store_with(&[0.0, 10.0, 20.0, 30.0], usize::MAX);
        let recent = store.window(15.0);
        let times: Vec<f64> = recent.iter().map(|e| e.elapsed_ms).collect();
        assert_eq!(times, vec![20.0, 30.0]);
        assert_eq!(store.len(), 4, "no trim below the watermark");
    }

    #[test]
    fn test_window_cutoff_is_inclusive() {
        let mut store = store_with(&[0.0, 5.0, 10.0], usize::MAX);
        let recent = store.window(5.0);
        assert_eq!(recent.first().map(|e| e.elapsed_ms), Some(5.0));
    }

    #[test]
    fn test_window_on_empty_store() {
        let mut store = EventStore::new();
        assert!(store.window(1_000.0).is_empty());
    }

    #[test]
    fn test_trim_evicts_only_events_before_window() {
        let mut store = store_with(&[0.0, 1.0, 2.0, 3.0, 100.0, 101.0], 2);
        let recent = store.window(10.0);
        assert_eq!(recent.len(), 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.oldest_ms(), Some(100.0));
        assert_eq!(store.trimmed_total(), 4);
    }

    #[test]
    fn test_trim_waits_for_watermark() {
        let mut store = store_with(&[0.0, 1.0, 2.0, 100.0], 3);
        store.window(10.0);
        assert_eq!(store.len(), 4, "3 stale events do not exceed a watermark of 3");
        store.push(AllocationEvent::new(100.5, 8));
        store.window(0.25);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_out_of_order_push_keeps_time_order() {
        let mut store = store_with(&[5.0, 3.0, 7.0], usize::MAX);
        let times: Vec<f64> = store.as_slice().iter().map(|e| e.elapsed_ms).collect();
        assert_eq!(times, vec![5.0, 5.0, 7.0]);
    }

    #[test]
    fn test_appends_after_trim_are_visible() {
        let mut store = store_with(&[0.0, 1.0, 2.0, 50.0], 1);
        store.window(5.0);
        store.push(AllocationEvent::new(51.0, 32));
        let recent = store.window(5.0);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1], AllocationEvent::new(51.0, 32));
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut store = store_with(&[0.0, 1.0, 2.0, 50.0], 1);
        store.window(5.0);
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.trimmed_total(), 0);
        assert_eq!(store.latest_ms(), None);
    }
}
