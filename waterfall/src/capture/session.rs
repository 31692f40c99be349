//! # Capture Session
//!
//! Owns a [`TraceProvider`] and the single ingestion thread feeding the
//! shared event buffer.
//!
//! ## Lifecycle
//!
//! ```text
//! Stopped ──start()──▶ Starting ──▶ Running ──stop()──▶ Stopping ──▶ Stopped
//!    ▲                    │ error
//!    └────────────────────┘ (partial resources released)
//! ```
//!
//! `start()` and `stop()` are serialised by a control mutex. A `start()` that
//! arrives during another transition waits for it and then acts on the state
//! it left: a Running session is a no-op success, a Stopped one is started.
//!
//! ## Shutdown ordering
//!
//! 1. stop flag set (late callbacks return immediately)
//! 2. record stream closed (unblocks the ingestion thread)
//! 3. ingestion thread joined
//! 4. provider session released
//!
//! Buffered events survive `stop()` so the last capture can still be read;
//! they are cleared by the next `start()`.

use log::{info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;

use super::ingest::{IngestStats, SharedCapture};
use super::provider::{shutdown_pair, StreamCloser, TraceProvider};
use crate::config::DEFAULT_TRIM_WATERMARK;
use crate::domain::{AllocationEvent, SessionError, SessionState};

struct Control<P> {
    provider: P,
    worker: Option<JoinHandle<()>>,
    closer: Option<StreamCloser>,
}

/// A live allocation capture
///
/// Share it across threads with `Arc`: the owner drives `start()`/`stop()`
/// while a consumer polls `snapshot()` and `elapsed_time_ms()`.
pub struct CaptureSession<P: TraceProvider> {
    shared: Arc<SharedCapture>,
    control: Mutex<Control<P>>,
}

impl<P: TraceProvider> CaptureSession<P> {
    #[must_use]
    pub fn new(provider: P) -> Self {
        Self::with_trim_watermark(provider, DEFAULT_TRIM_WATERMARK)
    }

    #[must_use]
    pub fn with_trim_watermark(provider: P, trim_watermark: usize) -> Self {
        Self {
            shared: Arc::new(SharedCapture::new(trim_watermark)),
            control: Mutex::new(Control { provider, worker: None, closer: None }),
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Enable the provider and start ingesting.
    ///
    /// # Errors
    /// Any [`SessionError`]; the session is `Stopped` afterwards and holds no
    /// provider resources.
    pub fn start(&self) -> Result<(), SessionError> {
        let mut control = self.lock_control();

        match self.state() {
            SessionState::Running => return Ok(()),
            // Only reachable after a panic mid-transition poisoned the lock
            SessionState::Starting | SessionState::Stopping => self.tear_down(&mut control),
            SessionState::Stopped => {}
        }

        self.shared.set_state(SessionState::Starting);
        let provider_name = control.provider.name();

        match self.bring_up(&mut control) {
            Ok(()) => {
                self.shared.set_state(SessionState::Running);
                info!("✓ Capture started ({provider_name})");
                Ok(())
            }
            Err(e) => {
                self.tear_down(&mut control);
                self.shared.set_state(SessionState::Stopped);
                warn!("Capture failed to start ({provider_name}): {e}");
                Err(e)
            }
        }
    }

    fn bring_up(&self, control: &mut Control<P>) -> Result<(), SessionError> {
        control.provider.start_session()?;

        let (closer, signal) = shutdown_pair();
        let mut stream = control.provider.open_stream(signal)?;
        control.closer = Some(closer);

        self.shared.reset_for_start();

        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("waterfall-ingest".to_string())
            .spawn(move || {
                stream.run(&mut |record| shared.ingest(record));
            })
            .map_err(|e| {
                SessionError::ResourceAllocationFailed(format!("ingestion thread: {e}"))
            })?;

        control.worker = Some(handle);
        Ok(())
    }

    /// Stop ingesting and release the provider. Idempotent.
    pub fn stop(&self) {
        let provider_name = {
            let mut control = self.lock_control();
            if self.state() == SessionState::Stopped {
                return;
            }

            self.shared.set_state(SessionState::Stopping);
            self.tear_down(&mut control);
            self.shared.set_state(SessionState::Stopped);
            control.provider.name()
        };

        let stats = self.shared.stats();
        info!(
            "Capture stopped ({provider_name}): {} events, {} filtered, {} decode failures",
            stats.events_appended, stats.records_filtered, stats.decode_failures
        );
    }

    /// Release everything `bring_up` may have acquired, in shutdown order
    fn tear_down(&self, control: &mut Control<P>) {
        self.shared.signal_stop();

        if let Some(mut closer) = control.closer.take() {
            closer.close();
        }
        if let Some(worker) = control.worker.take() {
            if worker.join().is_err() {
                warn!("Ingestion thread panicked");
            }
        }
        control.provider.stop_session();
    }

    fn lock_control(&self) -> MutexGuard<'_, Control<P>> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Milliseconds since the first captured event arrived.
    ///
    /// 0.0 while not running or before any event.
    #[must_use]
    pub fn elapsed_time_ms(&self) -> f64 {
        self.shared.elapsed_ms()
    }

    /// Events with `elapsed >= latest - max_age_ms`, oldest first.
    ///
    /// May trim the buffer front, see [`crate::event_store::EventStore::window`].
    #[must_use]
    pub fn snapshot(&self, max_age_ms: f64) -> Vec<AllocationEvent> {
        self.shared.snapshot(max_age_ms)
    }

    #[must_use]
    pub fn stats(&self) -> IngestStats {
        self.shared.stats()
    }
}

impl<P: TraceProvider> Drop for CaptureSession<P> {
    fn drop(&mut self) {
        self.stop();
    }
}
