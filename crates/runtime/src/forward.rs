// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker→parent log forwarding with attribution.

use airlift_wire::{LogFrame, LogLevel};

/// Re-emit a worker log frame through the supervisor's structured logger
/// at the stated level, keeping the sdk/user attribution.
pub fn forward_log(frame: &LogFrame) {
    let fields = if frame.fields.is_empty() {
        String::new()
    } else {
        serde_json::to_string(&frame.fields).unwrap_or_default()
    };

    match frame.level {
        LogLevel::Error => {
            tracing::error!(target: "worker", sdk_log = frame.sdk_log, fields = %fields, "{}", frame.message)
        }
        LogLevel::Warn => {
            tracing::warn!(target: "worker", sdk_log = frame.sdk_log, fields = %fields, "{}", frame.message)
        }
        LogLevel::Info => {
            tracing::info!(target: "worker", sdk_log = frame.sdk_log, fields = %fields, "{}", frame.message)
        }
        LogLevel::Debug => {
            tracing::debug!(target: "worker", sdk_log = frame.sdk_log, fields = %fields, "{}", frame.message)
        }
        LogLevel::Trace => {
            tracing::trace!(target: "worker", sdk_log = frame.sdk_log, fields = %fields, "{}", frame.message)
        }
    }
}
