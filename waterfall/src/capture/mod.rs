//! Live allocation capture
//!
//! - `provider`: the [`TraceProvider`] seam and the stream shutdown pair
//! - `session`: [`CaptureSession`] lifecycle and the ingestion thread
//! - `ingest`: per-record filter, decode and append
//! - `channel`: in-process provider fed through a channel
//! - `synthetic`: generated bursty traffic
//! - `ebpf`: libc `malloc` uprobe (feature `ebpf`, Linux)

pub mod channel;
#[cfg(feature = "ebpf")]
pub mod ebpf;
pub mod ingest;
pub mod provider;
pub mod session;
pub mod synthetic;

pub use channel::{ChannelProvider, OwnedRecord, RecordFeeder, SessionGauge};
#[cfg(feature = "ebpf")]
pub use ebpf::EbpfProvider;
pub use ingest::{decode_alloc_size, IngestStats, SENTINEL_SIZE_BYTES};
pub use provider::{
    shutdown_pair, RawRecord, RecordStream, ShutdownSignal, StreamCloser, TraceProvider,
};
pub use session::CaptureSession;
pub use synthetic::{SyntheticConfig, SyntheticProvider};
