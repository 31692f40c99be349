//! # Shared Data Structures (eBPF ↔ Userspace)
//!
//! Record layout shared between the kernel-side `malloc` uprobe and the
//! userspace capture provider. All types use `#[repr(C)]` for a stable layout
//! across the kernel/userspace boundary.
//!
//! ## Key Types
//!
//! - [`AllocRecord`] - One heap allocation observed by the uprobe

#![no_std]

// ============================================================================
// Opcodes
// ============================================================================

/// Heap allocation record.
///
/// Matches the opcode used by the Windows heap trace provider for
/// `HeapAlloc`, so every provider speaks the same filter value.
pub const OPCODE_HEAP_ALLOC: u8 = 33;

/// Heap free record (emitted by nothing yet; reserved so filters are explicit)
pub const OPCODE_HEAP_FREE: u8 = 36;

/// Ring buffer map name the uprobe writes into
pub const ALLOC_EVENTS_MAP: &str = "ALLOC_EVENTS";

/// Config map name (key `CONFIG_TARGET_PID` holds the PID filter, 0 = all)
pub const CONFIG_MAP: &str = "CONFIG";

/// Config key for the PID filter
pub const CONFIG_TARGET_PID: u32 = 0;

/// Name of the uprobe program attached to `malloc`
pub const MALLOC_PROBE: &str = "malloc_enter";

// ============================================================================
// Shared Data Structures
// ============================================================================

/// Allocation record sent from eBPF to userspace via ring buffer
///
/// **Size**: 24 bytes, no implicit padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default)]
pub struct AllocRecord {
    /// Requested allocation size in bytes (first `malloc` argument)
    pub size: u64,

    /// Timestamp in nanoseconds (from `bpf_ktime_get_ns()`), monotonic since boot
    pub timestamp_ns: u64,

    /// Process ID (TGID in Linux terms)
    pub pid: u32,

    /// Record opcode, see `OPCODE_*`
    pub opcode: u8,

    pub _padding: [u8; 3],
}

impl AllocRecord {
    #[must_use]
    pub const fn new(size: u64, timestamp_ns: u64, pid: u32) -> Self {
        Self { size, timestamp_ns, pid, opcode: OPCODE_HEAP_ALLOC, _padding: [0u8; 3] }
    }
}

#[cfg(feature = "user")]
use aya::Pod;

// Pod ensures the record can be transmitted as plain bytes
#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for AllocRecord {}
