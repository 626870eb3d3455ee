// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime configuration, serde-defaulted so `{}` deserializes to defaults.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Hard ceiling on the per-worker wall-clock deadline.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(600);

/// Default per-worker heap budget in MiB.
pub const DEFAULT_WORKER_HEAP_MB: u64 = 512;

/// Per-invocation runtime knobs, passed from the supervisor to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeOptions {
    /// Wall-clock deadline in milliseconds; clamped to [`MAX_TIMEOUT`].
    pub timeout_ms: u64,
    /// Heap budget for the worker process, in MiB.
    pub worker_heap_size_mb: u64,
    /// Repository batch size for normalized items.
    pub batch_size: usize,
    /// Outbound event size ceiling in bytes.
    pub event_size_limit: usize,
    /// Fraction of `event_size_limit` at which the worker soft-times-out.
    pub soft_limit_ratio: f64,
    /// How long the supervisor waits after the exit signal before killing.
    pub grace_period_ms: u64,
    /// The attachment pool logs progress every this many completions.
    pub progress_report_interval: usize,
    /// Serialize outbound event names with their legacy spelling.
    pub legacy_event_names: bool,
    /// Attempts the HTTP retry policy makes per call.
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds.
    pub retry_base_delay_ms: u64,
    /// Backoff ceiling in milliseconds.
    pub retry_max_delay_ms: u64,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            timeout_ms: MAX_TIMEOUT.as_millis() as u64,
            worker_heap_size_mb: DEFAULT_WORKER_HEAP_MB,
            batch_size: 2000,
            event_size_limit: 200 * 1024,
            soft_limit_ratio: 0.8,
            grace_period_ms: 3000,
            progress_report_interval: 50,
            legacy_event_names: false,
            retry_attempts: 5,
            retry_base_delay_ms: 1000,
            retry_max_delay_ms: 30_000,
        }
    }
}

impl RuntimeOptions {
    /// Effective deadline: `min(timeout, 10 minutes)`.
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms).min(MAX_TIMEOUT)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Cumulative artifact-metadata size that flips the worker into
    /// soft-timeout, so the task exits via `on_timeout` with a progress
    /// event instead of a done event.
    pub fn soft_size_threshold(&self) -> usize {
        (self.event_size_limit as f64 * self.soft_limit_ratio) as usize
    }
}

#[cfg(test)]
#[path = "options_tests.rs"]
mod tests;
