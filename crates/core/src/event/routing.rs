// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Static routing tables between incoming and outbound event types.

use super::{EventType, OutboundEventType};

/// The fault event to emit when the worker for `incoming` times out,
/// exceeds its memory limit, or crashes.
pub fn fault_event_for(incoming: EventType) -> OutboundEventType {
    use EventType::*;
    match incoming {
        StartExtractingExternalSyncUnits => OutboundEventType::ExternalSyncUnitExtractionError,
        StartExtractingMetadata => OutboundEventType::MetadataExtractionError,
        StartExtractingData | ContinueExtractingData => OutboundEventType::DataExtractionError,
        StartDeletingExtractorState => OutboundEventType::ExtractorStateDeletionError,
        StartExtractingAttachments | ContinueExtractingAttachments => {
            OutboundEventType::AttachmentExtractionError
        }
        StartDeletingExtractorAttachmentsState => {
            OutboundEventType::ExtractorAttachmentsStateDeletionError
        }
        StartLoadingData | ContinueLoadingData => OutboundEventType::DataLoadingError,
        StartDeletingLoaderState => OutboundEventType::LoaderStateDeletionError,
        StartLoadingAttachments | ContinueLoadingAttachments => {
            OutboundEventType::AttachmentLoadingError
        }
        StartDeletingLoaderAttachmentState => {
            OutboundEventType::LoaderAttachmentStateDeletionError
        }
        Unknown => OutboundEventType::UnknownEventType,
    }
}

/// The "done" event a deletion start maps to when the connector has no
/// deletion work of its own.
pub fn no_script_done_for(incoming: EventType) -> Option<OutboundEventType> {
    use EventType::*;
    match incoming {
        StartDeletingExtractorState => Some(OutboundEventType::ExtractorStateDeletionDone),
        StartDeletingExtractorAttachmentsState => {
            Some(OutboundEventType::ExtractorAttachmentsStateDeletionDone)
        }
        StartDeletingLoaderState => Some(OutboundEventType::LoaderStateDeletionDone),
        StartDeletingLoaderAttachmentState => {
            Some(OutboundEventType::LoaderAttachmentStateDeletionDone)
        }
        _ => None,
    }
}

/// Events that neither load remote state on worker start nor persist it
/// before emission.
pub fn is_stateless(incoming: EventType) -> bool {
    use EventType::*;
    matches!(
        incoming,
        StartExtractingExternalSyncUnits
            | StartDeletingExtractorState
            | StartDeletingExtractorAttachmentsState
            | StartDeletingLoaderState
            | StartDeletingLoaderAttachmentState
            | Unknown
    )
}

/// Outbound events in the extraction family carry the accumulated artifact
/// list on their `event_data`.
pub fn is_extraction_family(outbound: OutboundEventType) -> bool {
    use OutboundEventType::*;
    matches!(
        outbound,
        MetadataExtractionDone
            | MetadataExtractionError
            | DataExtractionDone
            | DataExtractionProgress
            | DataExtractionDelayed
            | DataExtractionError
            | AttachmentExtractionDone
            | AttachmentExtractionProgress
            | AttachmentExtractionDelayed
            | AttachmentExtractionError
    )
}

/// "Done"-family events. During timeout these are suppressed so the
/// terminal event comes from `on_timeout` as a progress or delay.
pub fn is_done_event(outbound: OutboundEventType) -> bool {
    use OutboundEventType::*;
    matches!(
        outbound,
        ExternalSyncUnitExtractionDone
            | MetadataExtractionDone
            | DataExtractionDone
            | ExtractorStateDeletionDone
            | AttachmentExtractionDone
            | ExtractorAttachmentsStateDeletionDone
            | DataLoadingDone
            | LoaderStateDeletionDone
            | AttachmentLoadingDone
            | LoaderAttachmentStateDeletionDone
    )
}

/// The one outbound event whose emission skips flushing repositories.
pub fn skips_repo_flush(outbound: OutboundEventType) -> bool {
    matches!(outbound, OutboundEventType::ExternalSyncUnitExtractionDone)
}

#[cfg(test)]
#[path = "routing_tests.rs"]
mod tests;
