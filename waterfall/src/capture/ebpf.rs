//! # Uprobe Provider (Linux)
//!
//! Attaches the `malloc_enter` uprobe from `waterfall-ebpf` to libc and
//! streams [`AllocRecord`]s out of the `ALLOC_EVENTS` ring buffer.
//!
//! Build the object first with `cargo xtask build-ebpf`.

use aya::{
    include_bytes_aligned,
    maps::{HashMap, MapData, RingBuf},
    programs::UProbe,
    Ebpf,
};
use log::{info, warn};
use std::path::PathBuf;
use std::time::Duration;

use waterfall_common::{AllocRecord, ALLOC_EVENTS_MAP, CONFIG_MAP, CONFIG_TARGET_PID, MALLOC_PROBE};

use super::provider::{RawRecord, RecordStream, ShutdownSignal, TraceProvider};
use crate::domain::{Pid, SessionError};
use crate::preflight::run_preflight_checks;

/// How long the stream sleeps when the ring buffer is empty
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Default attach target; aya resolves bare library names through `ld.so.cache`
pub const DEFAULT_LIBC: &str = "libc";

pub struct EbpfProvider {
    libc_path: PathBuf,
    target_pid: Option<Pid>,
    ebpf: Option<Ebpf>,
}

impl EbpfProvider {
    #[must_use]
    pub fn new(libc_path: impl Into<PathBuf>, target_pid: Option<Pid>) -> Self {
        Self { libc_path: libc_path.into(), target_pid, ebpf: None }
    }

    fn load() -> Result<Ebpf, SessionError> {
        Ebpf::load(include_bytes_aligned!("../../../target/bpfel-unknown-none/release/waterfall"))
            .map_err(|e| SessionError::ProviderEnableFailed(format!("load eBPF object: {e}")))
    }

    #[allow(clippy::cast_possible_wrap)]
    fn enable(&self, bpf: &mut Ebpf) -> Result<(), SessionError> {
        let enable_failed = |what: &str, e: &dyn std::fmt::Display| {
            SessionError::ProviderEnableFailed(format!("{what}: {e}"))
        };

        let mut config: HashMap<_, u32, u64> = HashMap::try_from(
            bpf.map_mut(CONFIG_MAP)
                .ok_or_else(|| enable_failed("map lookup", &CONFIG_MAP))?,
        )
        .map_err(|e| enable_failed("CONFIG map", &e))?;
        let pid_filter = self.target_pid.map_or(0, |pid| u64::from(pid.0));
        config
            .insert(CONFIG_TARGET_PID, pid_filter, 0)
            .map_err(|e| enable_failed("set PID filter", &e))?;

        let program: &mut UProbe = bpf
            .program_mut(MALLOC_PROBE)
            .ok_or_else(|| enable_failed("program lookup", &MALLOC_PROBE))?
            .try_into()
            .map_err(|e| enable_failed("program type", &e))?;
        program.load().map_err(|e| enable_failed("load uprobe", &e))?;
        program
            .attach(
                Some("malloc"),
                0,
                &self.libc_path,
                self.target_pid.map(|pid| pid.0 as i32),
            )
            .map_err(|e| enable_failed("attach malloc uprobe", &e))?;

        info!(
            "✓ Attached uprobe: malloc in {} ({})",
            self.libc_path.display(),
            self.target_pid.map_or_else(|| "all processes".to_string(), |pid| pid.to_string())
        );
        Ok(())
    }
}

impl TraceProvider for EbpfProvider {
    fn name(&self) -> &'static str {
        "ebpf"
    }

    fn start_session(&mut self) -> Result<(), SessionError> {
        if self.ebpf.is_some() {
            return Err(SessionError::AlreadyRunning);
        }
        run_preflight_checks()?;

        let mut bpf = Self::load()?;
        self.enable(&mut bpf)?;
        self.ebpf = Some(bpf);
        Ok(())
    }

    fn open_stream(
        &mut self,
        shutdown: ShutdownSignal,
    ) -> Result<Box<dyn RecordStream>, SessionError> {
        let bpf = self.ebpf.as_mut().ok_or_else(|| {
            SessionError::ResourceAllocationFailed("uprobe session not started".to_string())
        })?;
        let map = bpf.take_map(ALLOC_EVENTS_MAP).ok_or_else(|| {
            SessionError::ResourceAllocationFailed(format!("{ALLOC_EVENTS_MAP} map not found"))
        })?;
        let ring = RingBuf::try_from(map)
            .map_err(|e| SessionError::ResourceAllocationFailed(format!("ring buffer: {e}")))?;

        Ok(Box::new(RingBufStream { ring, shutdown }))
    }

    fn stop_session(&mut self) {
        // Dropping the Ebpf handle detaches the uprobe and closes the maps
        if self.ebpf.take().is_some() {
            info!("✓ Detached malloc uprobe");
        }
    }
}

struct RingBufStream {
    ring: RingBuf<MapData>,
    shutdown: ShutdownSignal,
}

impl RecordStream for RingBufStream {
    fn run(&mut self, sink: &mut dyn FnMut(RawRecord<'_>)) {
        loop {
            while let Some(item) = self.ring.next() {
                let bytes: &[u8] = &item;
                if bytes.len() < std::mem::size_of::<AllocRecord>() {
                    warn!("Received incomplete allocation record");
                    continue;
                }

                // SAFETY: length checked above; the uprobe writes whole AllocRecords
                #[allow(unsafe_code)]
                let record =
                    unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<AllocRecord>()) };

                let payload = record.size.to_le_bytes();
                sink(RawRecord {
                    opcode: record.opcode,
                    timestamp_ns: record.timestamp_ns,
                    payload: &payload,
                });
            }

            if self.shutdown.wait(POLL_INTERVAL) {
                return;
            }
        }
    }
}
