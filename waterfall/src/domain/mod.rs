//! Domain model for waterfall
//!
//! Core value types and the structured errors every layer reports.

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::{AllocationEvent, Pid, SessionState};

pub use errors::{DecodeError, ExportError, LoadError, SessionError};
