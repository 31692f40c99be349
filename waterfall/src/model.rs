//! Renderer-facing waterfall state
//!
//! Holds the events currently on display plus the live/static switch and the
//! live clock, and produces a fresh [`Aggregate`] on every refresh. A UI timer
//! (or the headless loop in `main`) drives it:
//!
//! ```text
//! static: set_data(events) ─▶ refresh(width)
//! live:   set_live_mode(true) ─▶ every tick: poll(session) ─▶ refresh(width)
//! ```

use std::num::NonZeroUsize;

use crate::analysis::{aggregate_with_cap, Aggregate, WindowMode};
use crate::capture::{CaptureSession, TraceProvider};
use crate::config::WINDOW_CAP_MS;
use crate::domain::AllocationEvent;

#[derive(Debug, Clone)]
pub struct WaterfallModel {
    events: Vec<AllocationEvent>,
    live: bool,
    current_time_ms: f64,
    window_cap_ms: f64,
}

impl Default for WaterfallModel {
    fn default() -> Self {
        Self::new(WINDOW_CAP_MS)
    }
}

impl WaterfallModel {
    #[must_use]
    pub fn new(window_cap_ms: f64) -> Self {
        Self { events: Vec::new(), live: false, current_time_ms: 0.0, window_cap_ms }
    }

    /// Show a static dataset; leaves live mode
    pub fn set_data(&mut self, events: Vec<AllocationEvent>) {
        self.events = events;
        self.live = false;
        self.current_time_ms = 0.0;
    }

    pub fn set_live_mode(&mut self, enabled: bool) {
        self.live = enabled;
        if !enabled {
            self.current_time_ms = 0.0;
        }
    }

    pub fn set_current_time(&mut self, time_ms: f64) {
        self.current_time_ms = time_ms;
    }

    /// Replace the displayed events with a live snapshot; ignored outside live mode
    pub fn update_live_data(&mut self, events: Vec<AllocationEvent>) {
        if self.live {
            self.events = events;
        }
    }

    /// One consumer tick: pull the window and clock from a running capture
    pub fn poll<P: TraceProvider>(&mut self, session: &CaptureSession<P>) {
        if !self.live {
            return;
        }
        self.update_live_data(session.snapshot(self.window_cap_ms));
        self.set_current_time(session.elapsed_time_ms());
    }

    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live
    }

    #[must_use]
    pub fn current_time_ms(&self) -> f64 {
        self.current_time_ms
    }

    #[must_use]
    pub fn events(&self) -> &[AllocationEvent] {
        &self.events
    }

    #[must_use]
    pub fn mode(&self) -> WindowMode {
        if self.live {
            WindowMode::Live { current_time_ms: self.current_time_ms }
        } else {
            WindowMode::Static
        }
    }

    /// Aggregate the displayed events for `display_width` columns
    #[must_use]
    pub fn refresh(&self, display_width: NonZeroUsize) -> Aggregate {
        aggregate_with_cap(&self.events, display_width, self.mode(), self.window_cap_ms)
    }
}
