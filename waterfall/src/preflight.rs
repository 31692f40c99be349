//! Pre-flight checks for the uprobe provider
//!
//! Validates system requirements before attempting to load the eBPF object,
//! mapping failures onto [`SessionError`] so `start()` can report them.

#![allow(unsafe_code)] // geteuid() requires unsafe

use crate::domain::SessionError;

/// Minimum kernel version for `BPF_MAP_TYPE_RINGBUF`
const MIN_KERNEL_VERSION: (u32, u32) = (5, 8);

/// Run all pre-flight checks
///
/// # Errors
/// `PermissionDenied` when not root, `ProviderEnableFailed` on an old kernel.
pub fn run_preflight_checks() -> Result<(), SessionError> {
    check_privileges()?;
    check_kernel_version()?;
    Ok(())
}

fn check_privileges() -> Result<(), SessionError> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    // CAP_BPF + CAP_PERFMON would also do, but checking capabilities needs
    // another dependency; require root like the rest of the tooling.
    Err(SessionError::PermissionDenied(
        "loading the malloc uprobe requires root privileges (run with sudo)".to_string(),
    ))
}

fn check_kernel_version() -> Result<(), SessionError> {
    let Ok(version_str) = std::fs::read_to_string("/proc/version") else {
        // Can't tell, let the loader fail with a precise error if it must
        return Ok(());
    };

    match parse_kernel_version(&version_str) {
        Some(version) if version < MIN_KERNEL_VERSION => Err(SessionError::ProviderEnableFailed(
            format!(
                "kernel {}.{} is too old, ring buffer capture needs Linux {}.{} or newer",
                version.0, version.1, MIN_KERNEL_VERSION.0, MIN_KERNEL_VERSION.1
            ),
        )),
        _ => Ok(()),
    }
}

/// Parse `"Linux version 6.1.0-arch1-1 ..."` into `(6, 1)`
fn parse_kernel_version(version_str: &str) -> Option<(u32, u32)> {
    let release = version_str.split_whitespace().nth(2)?;
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;
    Some((major, minor))
}
