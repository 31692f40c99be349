//! In-process provider fed through a channel
//!
//! Stands in for the OS tracing facility when the records come from the
//! application itself: tests, replays, or an allocator hook that forwards its
//! own events. Supports failure injection and reports how many provider
//! sessions are open, so leaked handles are observable.
//!
//! Records fed while no session is open are discarded when the next session
//! opens.

use crossbeam_channel::{select, Receiver, Sender};
use log::debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use waterfall_common::OPCODE_HEAP_ALLOC;

use super::provider::{RawRecord, RecordStream, ShutdownSignal, TraceProvider};
use crate::domain::SessionError;

/// A record owned by the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedRecord {
    pub opcode: u8,
    pub timestamp_ns: u64,
    pub payload: Vec<u8>,
}

impl OwnedRecord {
    /// Heap allocation of `size` bytes at `timestamp_ns`
    #[must_use]
    pub fn alloc(timestamp_ns: u64, size: u64) -> Self {
        Self { opcode: OPCODE_HEAP_ALLOC, timestamp_ns, payload: size.to_le_bytes().to_vec() }
    }

    #[must_use]
    pub fn with_opcode(mut self, opcode: u8) -> Self {
        self.opcode = opcode;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    fn as_raw(&self) -> RawRecord<'_> {
        RawRecord { opcode: self.opcode, timestamp_ns: self.timestamp_ns, payload: &self.payload }
    }
}

/// Sending half handed out by [`ChannelProvider::new`]
#[derive(Debug, Clone)]
pub struct RecordFeeder {
    tx: Sender<OwnedRecord>,
}

impl RecordFeeder {
    /// Queue a record. Returns `false` once the provider has been dropped.
    pub fn send(&self, record: OwnedRecord) -> bool {
        self.tx.send(record).is_ok()
    }

    pub fn send_alloc(&self, timestamp_ns: u64, size: u64) -> bool {
        self.send(OwnedRecord::alloc(timestamp_ns, size))
    }
}

/// Count of provider sessions currently held open
#[derive(Debug, Clone, Default)]
pub struct SessionGauge(Arc<AtomicUsize>);

impl SessionGauge {
    #[must_use]
    pub fn open_sessions(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

pub struct ChannelProvider {
    records: Receiver<OwnedRecord>,
    gauge: SessionGauge,
    session_open: bool,
    start_failure: Option<SessionError>,
    stream_failure: Option<SessionError>,
}

impl ChannelProvider {
    #[must_use]
    pub fn new() -> (Self, RecordFeeder) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let provider = Self {
            records: rx,
            gauge: SessionGauge::default(),
            session_open: false,
            start_failure: None,
            stream_failure: None,
        };
        (provider, RecordFeeder { tx })
    }

    /// Make every `start_session()` fail with `err`
    #[must_use]
    pub fn fail_start_with(mut self, err: SessionError) -> Self {
        self.start_failure = Some(err);
        self
    }

    /// Make every `open_stream()` fail with `err` (after the session opened)
    #[must_use]
    pub fn fail_stream_with(mut self, err: SessionError) -> Self {
        self.stream_failure = Some(err);
        self
    }

    #[must_use]
    pub fn session_gauge(&self) -> SessionGauge {
        self.gauge.clone()
    }
}

impl TraceProvider for ChannelProvider {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn start_session(&mut self) -> Result<(), SessionError> {
        if let Some(err) = &self.start_failure {
            return Err(err.clone());
        }
        if !self.session_open {
            // Records sent between sessions belong to no capture
            let stale = self.records.try_iter().count();
            if stale > 0 {
                debug!("discarded {stale} records queued while stopped");
            }
            self.session_open = true;
            self.gauge.0.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    fn open_stream(
        &mut self,
        shutdown: ShutdownSignal,
    ) -> Result<Box<dyn RecordStream>, SessionError> {
        if let Some(err) = &self.stream_failure {
            return Err(err.clone());
        }
        Ok(Box::new(ChannelStream { records: self.records.clone(), shutdown }))
    }

    fn stop_session(&mut self) {
        if self.session_open {
            self.session_open = false;
            self.gauge.0.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

struct ChannelStream {
    records: Receiver<OwnedRecord>,
    shutdown: ShutdownSignal,
}

impl RecordStream for ChannelStream {
    fn run(&mut self, sink: &mut dyn FnMut(RawRecord<'_>)) {
        loop {
            select! {
                recv(self.records) -> msg => match msg {
                    Ok(record) => sink(record.as_raw()),
                    Err(_) => return,
                },
                recv(self.shutdown.receiver()) -> _ => return,
            }
        }
    }
}
