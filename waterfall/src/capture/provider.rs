//! # Trace Provider Seam
//!
//! A [`TraceProvider`] wraps whatever OS facility emits allocation records.
//! `CaptureSession` drives it through three steps:
//!
//! ```text
//! start_session()  acquire the OS session, enable the allocation provider
//! open_stream()    hand back a blocking RecordStream for the ingestion thread
//! stop_session()   release everything (idempotent)
//! ```
//!
//! The stream blocks inside [`RecordStream::run`] until its [`ShutdownSignal`]
//! fires. The session keeps the matching [`StreamCloser`] and fires it from
//! `stop()`, which is what unblocks the ingestion thread.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use crate::domain::SessionError;

/// One record as delivered by a provider, before decoding
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    /// Record type; only `OPCODE_HEAP_ALLOC` is ingested
    pub opcode: u8,
    /// Absolute provider timestamp in nanoseconds
    pub timestamp_ns: u64,
    /// Undecoded event payload; the size field is a little-endian `u64` at offset 0
    pub payload: &'a [u8],
}

/// Blocking record source owned by the ingestion thread
pub trait RecordStream: Send {
    /// Deliver records to `sink` until the stream is closed.
    ///
    /// Must return promptly once the stream's [`ShutdownSignal`] fires.
    fn run(&mut self, sink: &mut dyn FnMut(RawRecord<'_>));
}

/// An OS tracing facility that can be enabled, streamed and torn down
pub trait TraceProvider: Send {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Acquire the tracing session and enable the allocation provider.
    ///
    /// # Errors
    /// `PermissionDenied`, `ProviderEnableFailed` or `ResourceAllocationFailed`.
    /// On error nothing may stay acquired.
    fn start_session(&mut self) -> Result<(), SessionError>;

    /// Open the real-time record stream for the session started above.
    ///
    /// # Errors
    /// `ResourceAllocationFailed` if the stream cannot be opened. The caller
    /// follows up with `stop_session()`.
    fn open_stream(&mut self, shutdown: ShutdownSignal)
        -> Result<Box<dyn RecordStream>, SessionError>;

    /// Release all session resources. Called after the stream has returned.
    /// Must be safe to call repeatedly and without a prior `start_session()`.
    fn stop_session(&mut self);
}

/// Create a linked closer/signal pair
#[must_use]
pub fn shutdown_pair() -> (StreamCloser, ShutdownSignal) {
    let (tx, rx) = crossbeam_channel::bounded::<()>(0);
    (StreamCloser { tx: Some(tx) }, ShutdownSignal { rx })
}

/// Closing half: dropping or calling `close()` fires the signal
#[derive(Debug)]
pub struct StreamCloser {
    tx: Option<Sender<()>>,
}

impl StreamCloser {
    pub fn close(&mut self) {
        self.tx.take();
    }
}

/// Receiving half held by a [`RecordStream`]
///
/// Nothing is ever sent on the channel; disconnection is the signal.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: Receiver<()>,
}

impl ShutdownSignal {
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self.rx.try_recv(), Err(crossbeam_channel::TryRecvError::Disconnected))
    }

    /// Sleep for up to `timeout`, returning `true` early if the stream was closed
    #[must_use]
    pub fn wait(&self, timeout: Duration) -> bool {
        !matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Timeout))
    }

    /// Channel for `crossbeam_channel::select!` alongside a record channel
    #[must_use]
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}
