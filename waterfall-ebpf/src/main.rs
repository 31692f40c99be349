//! # eBPF Kernel-Side Instrumentation
//!
//! Uprobe on libc `malloc` that forwards every allocation request to userspace.
//!
//! ## Programs
//!
//! - **Uprobe**: `malloc_enter` - reads the size argument and emits an [`AllocRecord`]
//!
//! ## Maps (Shared with Userspace)
//!
//! - `ALLOC_EVENTS` - Ring buffer (8MB) for the allocation stream
//! - `CONFIG` - Runtime configuration (target PID, 0 = every process)
//!
//! ## Build
//!
//! Always compiled in release mode:
//! ```bash
//! cargo xtask build-ebpf --release
//! ```

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

use aya_ebpf::{
    helpers::{bpf_get_current_pid_tgid, bpf_ktime_get_ns},
    macros::{map, uprobe},
    maps::{HashMap, RingBuf},
    programs::ProbeContext,
};
use waterfall_common::{AllocRecord, CONFIG_TARGET_PID};

// ============================================================================
// eBPF Maps
// ============================================================================

/// Allocation stream to userspace.
///
/// Sized for bursts: at ~24 bytes per record this holds ~350k allocations
/// before `output()` starts failing and records are dropped kernel-side.
#[map]
static ALLOC_EVENTS: RingBuf = RingBuf::with_byte_size(8 * 1024 * 1024, 0);

/// Map: Config key → Config value
///
/// - **Key 0**: Target PID (0 = trace every process)
#[map]
static CONFIG: HashMap<u32, u64> = HashMap::with_max_entries(4, 0);

// ============================================================================
// eBPF Program Hooks
// ============================================================================

/// Hook: libc `malloc(size_t size)`
#[uprobe]
pub fn malloc_enter(ctx: ProbeContext) -> u32 {
    match try_malloc_enter(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_malloc_enter(ctx: &ProbeContext) -> Result<(), i64> {
    let pid = (unsafe { bpf_get_current_pid_tgid() } >> 32) as u32;

    let target = unsafe { CONFIG.get(&CONFIG_TARGET_PID).copied().unwrap_or(0) };
    if target != 0 && u64::from(pid) != target {
        return Ok(());
    }

    let size: u64 = ctx.arg(0).ok_or(1i64)?;
    let now = unsafe { bpf_ktime_get_ns() };

    let record = AllocRecord::new(size, now, pid);
    unsafe { ALLOC_EVENTS.output(&record, 0) }.map_err(|_| 1i64)?;
    Ok(())
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}
