// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! airlift-core: domain model for the airlift connector runtime

pub mod artifact;
pub mod event;
pub mod loader;
pub mod options;
pub mod state;

pub use artifact::{
    Artifact, ExternalSyncUnit, NormalizedAttachment, SsorAttachment, SsorAttachmentId,
    SsorParentId,
};
pub use event::routing;
pub use event::{
    AirdropEvent, ErrorRecord, EventContext, EventData, EventPayload, EventType,
    ExecutionMetadata, OutboundEventType,
};
pub use loader::{FileToLoad, LoaderReport};
pub use options::RuntimeOptions;
pub use state::{AdapterState, AttachmentsMetadata, FromDevRev, ProcessedRef, ToDevRev};
