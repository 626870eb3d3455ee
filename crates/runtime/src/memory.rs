// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-worker memory policy and OOM-class exit detection.
//!
//! Rust exposes no per-process heap knob, so the cap is enforced as an
//! address-space rlimit on the child and detection works backwards from
//! the ways an allocation failure actually presents:
//!
//! | Signal                              | Source                          |
//! |-------------------------------------|---------------------------------|
//! | stderr `memory allocation of`       | Rust allocator failure abort    |
//! | stderr `out of memory`              | allocator/library OOM reports   |
//! | stderr `Cannot allocate memory`     | ENOMEM surfaced from the OS     |
//! | SIGABRT with an rlimit applied      | alloc-failure abort path        |
//! | SIGKILL with an rlimit applied      | kernel OOM killer               |

/// The heap budget keeps 20% headroom under the hard address-space cap.
pub const HEAP_HEADROOM_FACTOR: f64 = 1.2;

/// stderr substrings that mark an OOM-class failure.
pub const OOM_STDERR_PATTERNS: &[&str] =
    &["memory allocation of", "out of memory", "Cannot allocate memory"];

/// Heap budget granted to the worker, derived from the configured
/// worker heap size.
pub fn max_old_generation_mb(worker_heap_size_mb: u64) -> u64 {
    (worker_heap_size_mb as f64 / HEAP_HEADROOM_FACTOR).floor() as u64
}

/// Address-space cap in bytes for the child process.
pub fn address_space_limit_bytes(worker_heap_size_mb: u64) -> u64 {
    worker_heap_size_mb * 1024 * 1024
}

/// Classify a worker termination as OOM.
///
/// `signal` is the terminating signal number, when the child died to
/// one; `rlimit_applied` records whether the spawn actually installed
/// the address-space cap.
pub fn is_oom_termination(stderr_tail: &str, signal: Option<i32>, rlimit_applied: bool) -> bool {
    if OOM_STDERR_PATTERNS.iter().any(|pattern| stderr_tail.contains(pattern)) {
        return true;
    }
    match signal {
        Some(signal) if rlimit_applied => {
            signal == nix::sys::signal::Signal::SIGABRT as i32
                || signal == nix::sys::signal::Signal::SIGKILL as i32
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
