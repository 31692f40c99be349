//! Synthetic allocation traffic
//!
//! Emits bursts of heap-allocation records on the ingestion thread with a
//! size mix resembling a typical native process: mostly small objects, a tail
//! of buffers, and rare large blocks. Every `spike_every`-th burst is ten times
//! larger to exercise the capture path under bursty load. A seeded `StdRng`
//! keeps runs reproducible.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

use waterfall_common::OPCODE_HEAP_ALLOC;

use super::provider::{RawRecord, RecordStream, ShutdownSignal, TraceProvider};
use crate::domain::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntheticConfig {
    /// Pause between bursts
    pub burst_interval: Duration,
    /// Records per ordinary burst
    pub burst_len: usize,
    /// Every n-th burst is a spike (0 disables spikes)
    pub spike_every: u32,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            burst_interval: Duration::from_millis(5),
            burst_len: 200,
            spike_every: 40,
            seed: 0x5eed,
        }
    }
}

/// Provider that invents its records
#[derive(Debug, Default)]
pub struct SyntheticProvider {
    config: SyntheticConfig,
    session_open: bool,
}

impl SyntheticProvider {
    #[must_use]
    pub fn new(config: SyntheticConfig) -> Self {
        Self { config, session_open: false }
    }
}

impl TraceProvider for SyntheticProvider {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn start_session(&mut self) -> Result<(), SessionError> {
        self.session_open = true;
        Ok(())
    }

    fn open_stream(
        &mut self,
        shutdown: ShutdownSignal,
    ) -> Result<Box<dyn RecordStream>, SessionError> {
        if !self.session_open {
            return Err(SessionError::ResourceAllocationFailed(
                "synthetic stream opened without a session".to_string(),
            ));
        }
        Ok(Box::new(SyntheticStream {
            config: self.config,
            rng: StdRng::seed_from_u64(self.config.seed),
            origin: Instant::now(),
            shutdown,
        }))
    }

    fn stop_session(&mut self) {
        self.session_open = false;
    }
}

struct SyntheticStream {
    config: SyntheticConfig,
    rng: StdRng,
    origin: Instant,
    shutdown: ShutdownSignal,
}

impl SyntheticStream {
    fn next_size(&mut self) -> u64 {
        match self.rng.gen_range(0..100u32) {
            0..=69 => self.rng.gen_range(1..=256),
            70..=91 => self.rng.gen_range(257..=8_192),
            92..=98 => self.rng.gen_range(8_193..=65_600),
            _ => self.rng.gen_range(65_601..=4 * 1024 * 1024),
        }
    }
}

impl RecordStream for SyntheticStream {
    #[allow(clippy::cast_possible_truncation)]
    fn run(&mut self, sink: &mut dyn FnMut(RawRecord<'_>)) {
        let mut burst: u32 = 0;
        while !self.shutdown.wait(self.config.burst_interval) {
            burst = burst.wrapping_add(1);
            let spike = self.config.spike_every != 0 && burst % self.config.spike_every == 0;
            let len = if spike { self.config.burst_len * 10 } else { self.config.burst_len };

            let base_ns = self.origin.elapsed().as_nanos() as u64;
            for i in 0..len as u64 {
                let payload = self.next_size().to_le_bytes();
                sink(RawRecord {
                    opcode: OPCODE_HEAP_ALLOC,
                    timestamp_ns: base_ns + i * 50,
                    payload: &payload,
                });
            }
        }
    }
}
