//! # Record Ingestion
//!
//! Runs once per delivered record on the ingestion thread:
//!
//! 1. Drop the record if the session is stopping or the opcode is not a heap allocation
//! 2. Decode the size field (sentinel size on failure, the event is kept)
//! 3. Latch time-zero and the monotonic anchor on the first event
//! 4. Clamp the relative time at 0
//! 5. Append under the buffer lock
//!
//! Decoding happens before the lock is taken; the lock covers the anchor
//! check and one append.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use waterfall_common::OPCODE_HEAP_ALLOC;

use super::provider::RawRecord;
use crate::domain::{AllocationEvent, DecodeError, SessionState};
use crate::event_store::EventStore;

/// Size recorded when a payload cannot be decoded.
///
/// A visible bogus 1-byte allocation is preferred over silently losing the event.
pub const SENTINEL_SIZE_BYTES: u64 = 1;

/// Decode the allocation size: little-endian `u64` at payload offset 0
///
/// # Errors
/// `TruncatedPayload` when fewer than 8 bytes are present.
pub fn decode_alloc_size(payload: &[u8]) -> Result<u64, DecodeError> {
    payload
        .get(..8)
        .and_then(|bytes| <[u8; 8]>::try_from(bytes).ok())
        .map(u64::from_le_bytes)
        .ok_or(DecodeError::TruncatedPayload { len: payload.len() })
}

/// Ingestion counters, readable while capture is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Records delivered while the session was live
    pub records_seen: u64,
    /// Records dropped by the opcode filter
    pub records_filtered: u64,
    /// Records kept with the sentinel size
    pub decode_failures: u64,
    /// Events appended to the store
    pub events_appended: u64,
    /// Events evicted by front trims
    pub events_trimmed: u64,
    /// Events currently buffered
    pub buffered: usize,
}

#[derive(Debug, Default)]
struct Counters {
    records_seen: AtomicU64,
    records_filtered: AtomicU64,
    decode_failures: AtomicU64,
    events_appended: AtomicU64,
}

impl Counters {
    fn reset(&self) {
        let all = [
            &self.records_seen,
            &self.records_filtered,
            &self.decode_failures,
            &self.events_appended,
        ];
        for counter in all {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// First-event anchor: provider time-zero plus the local monotonic reading
#[derive(Debug, Clone, Copy)]
struct TimeAnchor {
    time_zero_ms: f64,
    observed_at: Instant,
}

/// Everything guarded by the one session lock
#[derive(Debug)]
struct CaptureBuffer {
    store: EventStore,
    anchor: Option<TimeAnchor>,
}

/// State shared between the session handle and its ingestion thread
///
/// The ingestion closure holds an `Arc` to this, never to the session itself.
#[derive(Debug)]
pub(crate) struct SharedCapture {
    stop: AtomicBool,
    state: AtomicU8,
    buffer: Mutex<CaptureBuffer>,
    counters: Counters,
}

impl SharedCapture {
    pub(crate) fn new(trim_watermark: usize) -> Self {
        Self {
            stop: AtomicBool::new(true),
            state: AtomicU8::new(SessionState::Stopped as u8),
            buffer: Mutex::new(CaptureBuffer {
                store: EventStore::with_trim_watermark(trim_watermark),
                anchor: None,
            }),
            counters: Counters::default(),
        }
    }

    fn lock_buffer(&self) -> MutexGuard<'_, CaptureBuffer> {
        // A panic while holding the lock cannot leave the store half-written
        self.buffer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn signal_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    /// Clear buffered events and the time anchor, then arm ingestion
    pub(crate) fn reset_for_start(&self) {
        {
            let mut buffer = self.lock_buffer();
            buffer.store.clear();
            buffer.anchor = None;
        }
        self.counters.reset();
        self.stop.store(false, Ordering::Release);
    }

    /// Handle one delivered record
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn ingest(&self, record: RawRecord<'_>) {
        if self.stop.load(Ordering::Acquire) {
            return;
        }
        self.counters.records_seen.fetch_add(1, Ordering::Relaxed);

        if record.opcode != OPCODE_HEAP_ALLOC {
            self.counters.records_filtered.fetch_add(1, Ordering::Relaxed);
            return;
        }

        let size_bytes = decode_alloc_size(record.payload).unwrap_or_else(|_| {
            self.counters.decode_failures.fetch_add(1, Ordering::Relaxed);
            SENTINEL_SIZE_BYTES
        });
        let absolute_ms = record.timestamp_ns as f64 / 1_000_000.0;

        {
            let mut buffer = self.lock_buffer();
            let anchor = *buffer.anchor.get_or_insert_with(|| TimeAnchor {
                time_zero_ms: absolute_ms,
                observed_at: Instant::now(),
            });
            let elapsed_ms = (absolute_ms - anchor.time_zero_ms).max(0.0);
            buffer.store.push(AllocationEvent::new(elapsed_ms, size_bytes));
        }

        self.counters.events_appended.fetch_add(1, Ordering::Relaxed);
    }

    /// Milliseconds since the first event was observed; 0.0 when idle
    pub(crate) fn elapsed_ms(&self) -> f64 {
        if self.state() != SessionState::Running {
            return 0.0;
        }
        self.lock_buffer()
            .anchor
            .map_or(0.0, |anchor| anchor.observed_at.elapsed().as_secs_f64() * 1000.0)
    }

    pub(crate) fn snapshot(&self, max_age_ms: f64) -> Vec<AllocationEvent> {
        self.lock_buffer().store.window(max_age_ms)
    }

    pub(crate) fn stats(&self) -> IngestStats {
        let (events_trimmed, buffered) = {
            let buffer = self.lock_buffer();
            (buffer.store.trimmed_total(), buffer.store.len())
        };
        IngestStats {
            records_seen: self.counters.records_seen.load(Ordering::Relaxed),
            records_filtered: self.counters.records_filtered.load(Ordering::Relaxed),
            decode_failures: self.counters.decode_failures.load(Ordering::Relaxed),
            events_appended: self.counters.events_appended.load(Ordering::Relaxed),
            events_trimmed,
            buffered,
        }
    }
}
