// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message set carried over the frame protocol.

use airlift_core::{AirdropEvent, OutboundEventType, RuntimeOptions};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// First frame the supervisor writes to the worker's stdin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerInput {
    pub event: AirdropEvent,
    #[serde(default)]
    pub options: RuntimeOptions,
}

/// Parent→worker control messages.
///
/// Serializes with `{"type": "parent:...", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ParentMessage {
    /// Soft-timeout signal: drain and exit via the task's timeout path.
    #[serde(rename = "parent:exit")]
    Exit,
}

/// Log severity, mirroring `tracing` levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// One structured log line forwarded from the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogFrame {
    pub level: LogLevel,
    pub message: String,
    /// Structured fields from the originating tracing event.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, Value>,
    /// True when the line originated in runtime code rather than the
    /// user task.
    pub sdk_log: bool,
}

/// Worker→parent messages.
///
/// Serializes with `{"type": "worker:...", ...fields}` format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WorkerMessage {
    /// The adapter successfully delivered its one outbound event.
    #[serde(rename = "worker:emitted")]
    Emitted { event_type: OutboundEventType },

    /// A forwarded log line.
    #[serde(rename = "worker:log")]
    Log(LogFrame),

    /// Clean shutdown marker, sent before the worker exits 0.
    #[serde(rename = "worker:done")]
    Done,
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
