//! Where allocation events come from
//!
//! The two sources share no operations: a file is loaded once, a capture is
//! started, polled and stopped. [`DataSource`] tags which one is in use
//! instead of forcing a common trait on both.

pub mod csv;

pub use csv::{parse_line, CsvSource};

use crate::capture::{CaptureSession, TraceProvider};

pub enum DataSource<P: TraceProvider> {
    /// One-shot dataset, aggregated in static mode
    File(CsvSource),
    /// Running capture, aggregated in live mode
    Live(CaptureSession<P>),
}

impl<P: TraceProvider> DataSource<P> {
    #[must_use]
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Live(_))
    }

    #[must_use]
    pub fn as_file(&self) -> Option<&CsvSource> {
        match self {
            Self::File(source) => Some(source),
            Self::Live(_) => None,
        }
    }

    #[must_use]
    pub fn as_live(&self) -> Option<&CaptureSession<P>> {
        match self {
            Self::Live(session) => Some(session),
            Self::File(_) => None,
        }
    }
}
