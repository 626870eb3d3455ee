// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot event emission with upload-then-save-then-send ordering.

use super::Adapter;
use crate::prune;
use crate::state::ConnectorState;
use airlift_client::{with_retries, ClientError, RetryPolicy};
use airlift_core::{routing, EventData, OutboundEventType, RuntimeOptions};
use airlift_wire::WorkerMessage;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// Retry policy for platform HTTP, sourced from the invocation options.
pub(crate) fn retry_policy_from(options: &RuntimeOptions) -> RetryPolicy {
    RetryPolicy {
        max_attempts: options.retry_attempts,
        base_delay: Duration::from_millis(options.retry_base_delay_ms),
        max_delay: Duration::from_millis(options.retry_max_delay_ms),
    }
}

impl<S: ConnectorState> Adapter<S> {
    /// Deliver the invocation's single outbound event.
    ///
    /// Ordering is load-bearing: repositories flush first, then state
    /// persists, then the callback fires. A failure anywhere marks the
    /// emission spent and requests worker exit, so the supervisor
    /// synthesizes the fault event instead of a second attempt here.
    pub async fn emit(&self, event_type: OutboundEventType, data: Option<EventData>) {
        if self.has_emitted() {
            tracing::warn!(%event_type, "emit called twice, ignoring");
            return;
        }

        // Past the timeout the terminal event must come from on_timeout
        // as a progress or delay, never a done.
        if self.is_timeout() && routing::is_done_event(event_type) {
            tracing::warn!(%event_type, "done emission suppressed during timeout");
            return;
        }

        if !routing::skips_repo_flush(event_type) {
            if let Err(e) = self.upload_all_repos().await {
                tracing::error!(%event_type, error = %e, "repository flush failed, aborting emission");
                self.mark_emitted();
                self.parent().request_exit();
                return;
            }
        }

        if event_type == OutboundEventType::AttachmentExtractionDone {
            self.modify_state("lastSuccessfulSyncStarted", |state| {
                state.last_successful_sync_started = state.last_sync_started.take();
            });
        }

        if !routing::is_stateless(self.event().event_type) {
            let snapshot = self.state();
            if let Err(e) = self.state_client().update(&snapshot).await {
                tracing::error!(%event_type, error = %e, "state persistence failed, aborting emission");
                self.mark_emitted();
                self.parent().request_exit();
                return;
            }
        }

        let mut data = data.unwrap_or_default();
        if routing::is_extraction_family(event_type) {
            data.artifacts = Some(self.collect_artifacts());
        }

        match self.post_callback(event_type, data).await {
            Ok(()) => {
                self.mark_emitted();
                self.clear_collected_artifacts();
                self.parent().send(WorkerMessage::Emitted { event_type });
                tracing::info!(%event_type, "event emitted");
            }
            Err(e) => {
                tracing::error!(%event_type, error = %e, "callback delivery failed");
                self.mark_emitted();
                self.parent().request_exit();
            }
        }
    }

    fn mark_emitted(&self) {
        self.has_emitted.store(true, Ordering::SeqCst);
    }

    async fn post_callback(
        &self,
        event_type: OutboundEventType,
        data: EventData,
    ) -> Result<(), ClientError> {
        let event_data = serde_json::to_value(&data)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        let event_data = prune::prune_to_fit(event_data, self.options().event_size_limit);

        let name = if self.options().legacy_event_names {
            serde_json::Value::String(event_type.legacy_name().to_string())
        } else {
            serde_json::to_value(event_type).map_err(|e| ClientError::Decode(e.to_string()))?
        };

        let envelope = serde_json::json!({
            "event_type": name,
            "event_context": self.event().event_context,
            "event_data": event_data,
        });

        let client = self.http_client().clone();
        let url = self.event().event_context.callback_url.clone();
        let token = self.event().execution_metadata.devrev_token.clone();
        let retry = retry_policy_from(self.options());

        with_retries("callback.emit", &retry, || {
            let client = client.clone();
            let envelope = envelope.clone();
            let url = url.clone();
            let token = token.clone();
            async move {
                let response = client
                    .post(&url)
                    .header(reqwest::header::AUTHORIZATION, token)
                    .json(&envelope)
                    .send()
                    .await?;
                airlift_client::http::check_status(response).await.map(|_| ())
            }
        })
        .await
    }
}
