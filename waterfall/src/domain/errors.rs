//! Structured error types for waterfall
//!
//! Using thiserror for automatic Display implementation and error chaining.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to bring a capture session up.
///
/// Reported once from `CaptureSession::start()`; the session is left
/// `Stopped` with every partially acquired resource released.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Failed to enable allocation provider: {0}")]
    ProviderEnableFailed(String),

    #[error("Capture session already running or mid-transition")]
    AlreadyRunning,

    #[error("Failed to allocate session resources: {0}")]
    ResourceAllocationFailed(String),
}

/// A record payload that could not be decoded.
///
/// Never escapes the ingestion loop: the event is kept with a sentinel size.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Payload too short for size field: {len} bytes")]
    TruncatedPayload { len: usize },
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "No allocation events could be parsed from {} ({skipped} lines skipped)",
        path.display()
    )]
    NoEvents { path: PathBuf, skipped: usize },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write aggregate export: {0}")]
    WriteFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
