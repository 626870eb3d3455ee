// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker-side log transport: a tracing layer that serializes events
//! into wire frames for the parent.
//!
//! Attribution travels as a cooperative flag in task-local storage, so a
//! line logged from arbitrarily deep inside the user task still carries
//! `sdk_log = false`.

use airlift_wire::{LogFrame, LogLevel, WorkerMessage};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Fields stamped onto every forwarded line: event context and
/// `sdk_version`, populated once the input frame is parsed.
pub type LogContext = Arc<Mutex<BTreeMap<String, Value>>>;

tokio::task_local! {
    static USER_TASK: bool;
}

/// Run `future` attributed to the user task: lines logged inside it carry
/// `sdk_log = false`.
pub async fn user_context<F: Future>(future: F) -> F::Output {
    USER_TASK.scope(true, future).await
}

/// Whether the current task context belongs to the user task.
pub fn in_user_context() -> bool {
    USER_TASK.try_with(|flag| *flag).unwrap_or(false)
}

fn level_of(level: &Level) -> LogLevel {
    match *level {
        Level::ERROR => LogLevel::Error,
        Level::WARN => LogLevel::Warn,
        Level::INFO => LogLevel::Info,
        Level::DEBUG => LogLevel::Debug,
        Level::TRACE => LogLevel::Trace,
    }
}

#[derive(Default)]
struct FieldCollector {
    message: String,
    fields: BTreeMap<String, Value>,
}

impl Visit for FieldCollector {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.insert(field.name().to_string(), Value::from(format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.insert(field.name().to_string(), Value::from(value));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), Value::from(value));
    }
}

/// Layer that forwards every event to the parent as a log frame.
pub struct ForwardLayer {
    tx: mpsc::UnboundedSender<WorkerMessage>,
    context: LogContext,
}

impl ForwardLayer {
    pub fn new(tx: mpsc::UnboundedSender<WorkerMessage>) -> Self {
        Self { tx, context: LogContext::default() }
    }

    /// Shared handle the harness fills in once the event is known.
    pub fn context_handle(&self) -> LogContext {
        Arc::clone(&self.context)
    }
}

impl<S: Subscriber> Layer<S> for ForwardLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut collector = FieldCollector::default();
        event.record(&mut collector);

        let mut fields = self.context.lock().clone();
        fields.extend(collector.fields);

        let frame = LogFrame {
            level: level_of(event.metadata().level()),
            message: collector.message,
            fields,
            sdk_log: !in_user_context(),
        };
        // A closed channel means the writer task is gone; nothing left
        // to forward to.
        let _ = self.tx.send(WorkerMessage::Log(frame));
    }
}

/// Stamp the context fields every forwarded line carries.
pub fn fill_context(context: &LogContext, event: &airlift_core::AirdropEvent) {
    let mut fields = context.lock();
    fields.insert(
        "sdk_version".to_string(),
        Value::from(env!("CARGO_PKG_VERSION")),
    );
    fields.insert("sync_unit".to_string(), Value::from(event.event_context.sync_unit.clone()));
    if let Some(request_id) = &event.event_context.request_id {
        fields.insert("request_id".to_string(), Value::from(request_id.clone()));
    }
    if let Some(sync_run_id) = &event.event_context.sync_run_id {
        fields.insert("sync_run_id".to_string(), Value::from(sync_run_id.clone()));
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
