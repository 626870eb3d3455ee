// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event taxonomy for the airlift runtime.
//!
//! Incoming events arrive from the control plane with either canonical
//! variant names or legacy snake-case aliases; both deserialize to the
//! same closed set. Outbound event names serialize canonically, with the
//! legacy spelling available for downstream consumers that still expect it.

pub mod routing;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Incoming control-plane event types.
///
/// Unrecognized strings deserialize to `Unknown`; the supervisor answers
/// those with an `UnknownEventType` emission and never spawns a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    #[serde(alias = "EXTRACTION_EXTERNAL_SYNC_UNITS_START")]
    StartExtractingExternalSyncUnits,
    #[serde(alias = "EXTRACTION_METADATA_START")]
    StartExtractingMetadata,
    #[serde(alias = "EXTRACTION_DATA_START")]
    StartExtractingData,
    #[serde(alias = "EXTRACTION_DATA_CONTINUE")]
    ContinueExtractingData,
    #[serde(alias = "EXTRACTION_DATA_DELETE")]
    StartDeletingExtractorState,
    #[serde(alias = "EXTRACTION_ATTACHMENTS_START")]
    StartExtractingAttachments,
    #[serde(alias = "EXTRACTION_ATTACHMENTS_CONTINUE")]
    ContinueExtractingAttachments,
    #[serde(alias = "EXTRACTION_ATTACHMENTS_DELETE")]
    StartDeletingExtractorAttachmentsState,
    #[serde(alias = "START_LOADING_DATA")]
    StartLoadingData,
    #[serde(alias = "CONTINUE_LOADING_DATA")]
    ContinueLoadingData,
    #[serde(alias = "START_DELETING_LOADER_STATE")]
    StartDeletingLoaderState,
    #[serde(alias = "START_LOADING_ATTACHMENTS")]
    StartLoadingAttachments,
    #[serde(alias = "CONTINUE_LOADING_ATTACHMENTS")]
    ContinueLoadingAttachments,
    #[serde(alias = "START_DELETING_LOADER_ATTACHMENT_STATE")]
    StartDeletingLoaderAttachmentState,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Outbound event types sent to the callback URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutboundEventType {
    ExternalSyncUnitExtractionDone,
    ExternalSyncUnitExtractionError,
    MetadataExtractionDone,
    MetadataExtractionError,
    DataExtractionDone,
    DataExtractionProgress,
    DataExtractionDelayed,
    DataExtractionError,
    ExtractorStateDeletionDone,
    ExtractorStateDeletionError,
    AttachmentExtractionDone,
    AttachmentExtractionProgress,
    AttachmentExtractionDelayed,
    AttachmentExtractionError,
    ExtractorAttachmentsStateDeletionDone,
    ExtractorAttachmentsStateDeletionError,
    DataLoadingDone,
    DataLoadingProgress,
    DataLoadingDelayed,
    DataLoadingError,
    LoaderStateDeletionDone,
    LoaderStateDeletionError,
    AttachmentLoadingDone,
    AttachmentLoadingProgress,
    AttachmentLoadingDelayed,
    AttachmentLoadingError,
    LoaderAttachmentStateDeletionDone,
    LoaderAttachmentStateDeletionError,
    UnknownEventType,
}

impl OutboundEventType {
    /// Legacy snake-case spelling for downstream consumers that still
    /// parse the old names.
    pub fn legacy_name(&self) -> &'static str {
        use OutboundEventType::*;
        match self {
            ExternalSyncUnitExtractionDone => "EXTRACTION_EXTERNAL_SYNC_UNITS_DONE",
            ExternalSyncUnitExtractionError => "EXTRACTION_EXTERNAL_SYNC_UNITS_ERROR",
            MetadataExtractionDone => "EXTRACTION_METADATA_DONE",
            MetadataExtractionError => "EXTRACTION_METADATA_ERROR",
            DataExtractionDone => "EXTRACTION_DATA_DONE",
            DataExtractionProgress => "EXTRACTION_DATA_PROGRESS",
            DataExtractionDelayed => "EXTRACTION_DATA_DELAY",
            DataExtractionError => "EXTRACTION_DATA_ERROR",
            ExtractorStateDeletionDone => "EXTRACTION_DATA_DELETE_DONE",
            ExtractorStateDeletionError => "EXTRACTION_DATA_DELETE_ERROR",
            AttachmentExtractionDone => "EXTRACTION_ATTACHMENTS_DONE",
            AttachmentExtractionProgress => "EXTRACTION_ATTACHMENTS_PROGRESS",
            AttachmentExtractionDelayed => "EXTRACTION_ATTACHMENTS_DELAY",
            AttachmentExtractionError => "EXTRACTION_ATTACHMENTS_ERROR",
            ExtractorAttachmentsStateDeletionDone => "EXTRACTION_ATTACHMENTS_DELETE_DONE",
            ExtractorAttachmentsStateDeletionError => "EXTRACTION_ATTACHMENTS_DELETE_ERROR",
            DataLoadingDone => "DATA_LOADING_DONE",
            DataLoadingProgress => "DATA_LOADING_PROGRESS",
            DataLoadingDelayed => "DATA_LOADING_DELAYED",
            DataLoadingError => "DATA_LOADING_ERROR",
            LoaderStateDeletionDone => "LOADER_STATE_DELETION_DONE",
            LoaderStateDeletionError => "LOADER_STATE_DELETION_ERROR",
            AttachmentLoadingDone => "ATTACHMENT_LOADING_DONE",
            AttachmentLoadingProgress => "ATTACHMENT_LOADING_PROGRESS",
            AttachmentLoadingDelayed => "ATTACHMENT_LOADING_DELAYED",
            AttachmentLoadingError => "ATTACHMENT_LOADING_ERROR",
            LoaderAttachmentStateDeletionDone => "LOADER_ATTACHMENT_STATE_DELETION_DONE",
            LoaderAttachmentStateDeletionError => "LOADER_ATTACHMENT_STATE_DELETION_ERROR",
            UnknownEventType => "UNKNOWN_EVENT_TYPE",
        }
    }
}

impl fmt::Display for OutboundEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Per-invocation context forwarded verbatim from the control plane.
///
/// Fields the runtime reads are typed; everything else round-trips through
/// `extra` so the emission envelope carries the incoming context unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventContext {
    #[serde(default)]
    pub callback_url: String,
    #[serde(default)]
    pub worker_data_url: String,
    #[serde(default)]
    pub sync_unit: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_unit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_run_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dev_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_sync_unit_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    /// Reconciliation range start, when the control plane requests one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_from: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Control-plane endpoint and credentials for this invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    #[serde(default)]
    pub devrev_endpoint: String,
    #[serde(default)]
    pub devrev_token: String,
}

/// Request-specific payload carried on some incoming events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data: Option<Value>,
}

/// The event the supervisor receives and forwards verbatim to the worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirdropEvent {
    pub event_type: EventType,
    #[serde(default)]
    pub event_context: EventContext,
    #[serde(default)]
    pub execution_metadata: ExecutionMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<EventPayload>,
}

/// Error detail attached to fault emissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
}

/// Outbound `event_data` section of the emission envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<crate::artifact::Artifact>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reports: Option<Vec<crate::loader::LoaderReport>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_sync_units: Option<Vec<crate::artifact::ExternalSyncUnit>>,
}

impl EventData {
    /// Event data carrying only an error message.
    pub fn from_error(message: impl Into<String>) -> Self {
        Self { error: Some(ErrorRecord { message: message.into() }), ..Self::default() }
    }

    /// Event data carrying only a rate-limit delay in seconds.
    pub fn from_delay(delay: u64) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
