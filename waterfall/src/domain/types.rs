//! Domain types shared by capture, storage and aggregation

use serde::{Deserialize, Serialize};
use std::fmt;

/// One observed heap allocation
///
/// `elapsed_ms` is relative to the first event of the capture (or whatever
/// origin the static source used). Events are produced in non-decreasing
/// `elapsed_ms` order by a single producer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AllocationEvent {
    pub elapsed_ms: f64,
    pub size_bytes: u64,
}

impl AllocationEvent {
    #[must_use]
    pub const fn new(elapsed_ms: f64, size_bytes: u64) -> Self {
        Self { elapsed_ms, size_bytes }
    }
}

/// Process ID
///
/// Used to narrow a live capture to one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(pub u32);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PID:{}", self.0)
    }
}

/// Lifecycle of a capture session
///
/// `Stopped → Starting → Running → Stopping → Stopped`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    #[default]
    Stopped = 0,
    Starting = 1,
    Running = 2,
    Stopping = 3,
}

impl SessionState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Stopped => "stopped",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
        };
        f.write_str(name)
    }
}
