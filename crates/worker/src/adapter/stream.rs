// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attachment streaming: per-attachment processing plus the chunked walk
//! over the persisted artifact-id queue.

use super::Adapter;
use crate::error::TaskError;
use crate::pool::{self, PoolConfig, ProcessResult};
use crate::state::ConnectorState;
use airlift_core::state::ProcessedRef;
use airlift_core::{NormalizedAttachment, SsorAttachment, SsorAttachmentId, SsorParentId};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use futures_util::TryStreamExt;
use std::sync::Arc;

/// What a connector's stream function produced for one attachment.
///
/// Exactly one of the fields is normally set; an empty response is
/// interpreted as a timeout and the attachment is skipped.
#[derive(Debug, Default)]
pub struct AttachmentStream {
    pub response: Option<reqwest::Response>,
    pub delay: Option<u64>,
    pub error: Option<String>,
}

/// Connector-supplied function that opens the source HTTP stream for one
/// attachment.
pub type StreamFn = Arc<
    dyn Fn(NormalizedAttachment) -> BoxFuture<'static, Result<AttachmentStream, TaskError>>
        + Send
        + Sync,
>;

/// Result of a `stream_attachments` walk. A set `delay` or `error`
/// short-circuited the walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamAttachmentsOutcome {
    pub delay: Option<u64>,
    pub error: Option<String>,
}

/// Replacement for the default pool: a connector can take over chunk
/// processing wholesale.
#[async_trait]
pub trait AttachmentsProcessor<S: ConnectorState>: Send + Sync {
    async fn process_chunk(
        &self,
        adapter: &Adapter<S>,
        attachments: Vec<NormalizedAttachment>,
        stream: &StreamFn,
    ) -> StreamAttachmentsOutcome;
}

pub struct StreamAttachmentsArgs<S: ConnectorState> {
    pub stream: StreamFn,
    pub processor: Option<Arc<dyn AttachmentsProcessor<S>>>,
    pub batch_size: Option<usize>,
}

impl<S: ConnectorState> StreamAttachmentsArgs<S> {
    pub fn new(stream: StreamFn) -> Self {
        Self { stream, processor: None, batch_size: None }
    }
}

impl<S: ConnectorState> Adapter<S> {
    /// Stream one attachment into the artifact store and record the
    /// back-reference. Timeout mid-flow destroys the source stream and
    /// returns without a record.
    pub async fn process_attachment(
        &self,
        attachment: &NormalizedAttachment,
        stream: &StreamFn,
    ) -> ProcessResult {
        let produced = match (stream)(attachment.clone()).await {
            Ok(produced) => produced,
            Err(e) => return ProcessResult::Failed(e.to_string()),
        };

        if let Some(seconds) = produced.delay {
            return ProcessResult::Delayed(seconds);
        }
        if let Some(message) = produced.error {
            return ProcessResult::Failed(message);
        }
        let Some(response) = produced.response else {
            // No stream produced: the source timed out upstream.
            return ProcessResult::Skipped;
        };

        if self.is_timeout() {
            drop(response);
            return ProcessResult::Skipped;
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let content_length = response.content_length();

        let prepared = match self
            .artifacts_client()
            .prepare(&attachment.file_name, &content_type, content_length)
            .await
        {
            Ok(prepared) => prepared,
            Err(e) => return ProcessResult::Failed(e.to_string()),
        };

        if self.is_timeout() {
            drop(response);
            return ProcessResult::Skipped;
        }

        // Abort the transfer as soon as timeout lands: the guard turns the
        // next chunk into an error, which tears the upload down.
        let handle = self.state_handle().clone();
        let guarded = response.bytes_stream().map_err(std::io::Error::other).and_then(
            move |chunk| {
                let timed_out = handle.is_timeout();
                async move {
                    if timed_out {
                        Err(std::io::Error::other("timeout during attachment transfer"))
                    } else {
                        Ok(chunk)
                    }
                }
            },
        );
        let body = reqwest::Body::wrap_stream(guarded);

        if let Err(e) = self
            .artifacts_client()
            .upload_stream(&prepared, &attachment.file_name, &content_type, content_length, body)
            .await
        {
            if self.is_timeout() {
                return ProcessResult::Skipped;
            }
            return ProcessResult::Failed(e.to_string());
        }

        if let Err(e) = self.artifacts_client().confirm(&prepared.artifact_id).await {
            return ProcessResult::Failed(e.to_string());
        }

        let record = SsorAttachment {
            id: SsorAttachmentId {
                devrev: prepared.artifact_id.clone(),
                external: attachment.id.clone(),
            },
            parent_id: SsorParentId { external: attachment.parent_id.clone() },
            actor_id: attachment.author_id.clone(),
            inline: attachment.inline,
        };
        let record_json = match serde_json::to_value(&record) {
            Ok(value) => value,
            Err(e) => return ProcessResult::Failed(e.to_string()),
        };
        if let Err(e) = self.ensure_repo("ssor_attachment").push(vec![record_json]).await {
            return ProcessResult::Failed(e.to_string());
        }

        self.modify_state(
            "toDevRev.attachmentsMetadata.lastProcessedAttachmentsIdsList",
            |state| {
                let metadata = &mut state.to_devrev.attachments_metadata;
                metadata
                    .last_processed_attachments_ids_list
                    .push(ProcessedRef::new(&attachment.id, &attachment.parent_id));
                metadata.last_processed = metadata.last_processed_attachments_ids_list.len();
            },
        );

        ProcessResult::Completed
    }

    /// Walk the persisted artifact-id queue in order, streaming each
    /// chunk's attachments. A clean chunk clears the resume bookkeeping
    /// and pops the chunk id; delay or error short-circuits the walk.
    pub async fn stream_attachments(
        &self,
        args: StreamAttachmentsArgs<S>,
    ) -> StreamAttachmentsOutcome {
        let pool_config = PoolConfig {
            batch_size: args.batch_size.unwrap_or(pool::DEFAULT_POOL_WORKERS),
            progress_report_interval: self.options().progress_report_interval,
        };

        loop {
            if self.is_timeout() {
                return StreamAttachmentsOutcome::default();
            }
            let Some(artifact_id) = self.state_handle().read(|state| {
                state.to_devrev.attachments_metadata.artifact_ids.first().cloned()
            }) else {
                return StreamAttachmentsOutcome::default();
            };

            let lines = match self.artifacts_client().fetch_jsonl(&artifact_id, true).await {
                Ok(lines) => lines,
                Err(e) => {
                    return StreamAttachmentsOutcome {
                        delay: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            let attachments: Vec<NormalizedAttachment> = lines
                .into_iter()
                .filter_map(|line| serde_json::from_value(line).ok())
                .collect();

            if attachments.is_empty() {
                self.pop_attachments_chunk(&artifact_id);
                continue;
            }

            let outcome = match &args.processor {
                Some(processor) => {
                    processor.process_chunk(self, attachments, &args.stream).await
                }
                None => self.pool_chunk(&pool_config, attachments, &args.stream).await,
            };
            if outcome.delay.is_some() || outcome.error.is_some() {
                return outcome;
            }
            if self.is_timeout() {
                // Incomplete chunk: keep the resume bookkeeping intact.
                return StreamAttachmentsOutcome::default();
            }

            self.modify_state("toDevRev.attachmentsMetadata", |state| {
                let metadata = &mut state.to_devrev.attachments_metadata;
                metadata.last_processed = 0;
                metadata.last_processed_attachments_ids_list.clear();
            });
            self.pop_attachments_chunk(&artifact_id);
        }
    }

    async fn pool_chunk(
        &self,
        config: &PoolConfig,
        attachments: Vec<NormalizedAttachment>,
        stream: &StreamFn,
    ) -> StreamAttachmentsOutcome {
        let outcome = pool::stream_all(
            config,
            attachments,
            |attachment| {
                self.state_handle().read(|state| {
                    state
                        .to_devrev
                        .attachments_metadata
                        .last_processed_attachments_ids_list
                        .iter()
                        .any(|r| r.id == attachment.id && r.parent_id == attachment.parent_id)
                })
            },
            || self.is_timeout(),
            |attachment| async move { self.process_attachment(&attachment, stream).await },
        )
        .await;

        StreamAttachmentsOutcome { delay: outcome.delay, error: None }
    }

    fn pop_attachments_chunk(&self, artifact_id: &str) {
        self.modify_state("toDevRev.attachmentsMetadata.artifactIds", |state| {
            let ids = &mut state.to_devrev.attachments_metadata.artifact_ids;
            if ids.first().map(|id| id.as_str()) == Some(artifact_id) {
                ids.remove(0);
            }
        });
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
