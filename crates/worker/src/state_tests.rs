// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::TestState;
use airlift_core::Artifact;

fn handle() -> StateHandle<TestState> {
    StateHandle::new(AdapterState::default(), 160 * 1024)
}

#[test]
fn starts_running() {
    let handle = handle();
    assert_eq!(handle.phase(), Phase::Running);
    assert!(!handle.is_timeout());
}

#[test]
fn mutations_apply_while_running() {
    let handle = handle();
    handle.modify("connector.cursor", |state| {
        state.connector.cursor = Some("c1".into());
    });
    assert_eq!(handle.snapshot().connector.cursor.as_deref(), Some("c1"));
}

#[test]
fn draining_blocks_mutation() {
    let handle = handle();
    handle.begin_draining();
    assert!(handle.is_timeout());

    handle.modify("connector.cursor", |state| {
        state.connector.cursor = Some("lost".into());
    });
    assert_eq!(handle.snapshot().connector.cursor, None);
}

#[test]
fn frozen_mutation_is_observable_noop() {
    let handle = handle();
    handle.freeze();
    assert_eq!(handle.phase(), Phase::Frozen);

    // The closure still runs (and sees a scratch copy), but the real
    // state never changes.
    let seen = handle.modify("connector.cursor", |state| {
        state.connector.cursor = Some("lost".into());
        state.connector.cursor.clone()
    });
    assert_eq!(seen.as_deref(), Some("lost"));
    assert_eq!(handle.snapshot().connector.cursor, None);
}

#[test]
fn phases_never_move_backwards() {
    let handle = handle();
    handle.freeze();
    handle.begin_draining();
    assert_eq!(handle.phase(), Phase::Frozen);
}

fn artifact(id: &str, item_type: &str) -> Artifact {
    Artifact {
        id: id.to_string(),
        item_type: item_type.to_string(),
        item_count: 1,
        byte_length: Some(10),
    }
}

#[test]
fn attachments_artifacts_register_in_state() {
    let handle = handle();
    handle.artifact_uploaded(&artifact("a1", "attachments"));
    handle.artifact_uploaded(&artifact("a2", "attachments"));
    handle.artifact_uploaded(&artifact("a3", "issues"));

    let ids = handle.snapshot().to_devrev.attachments_metadata.artifact_ids;
    assert_eq!(ids, vec!["a1".to_string(), "a2".to_string()]);
}

#[test]
fn metadata_size_threshold_triggers_soft_timeout() {
    let handle: StateHandle<TestState> = StateHandle::new(AdapterState::default(), 100);
    handle.artifact_uploaded(&artifact("a1", "issues"));
    assert_eq!(handle.phase(), Phase::Running);

    handle.artifact_uploaded(&artifact("a2", "issues"));
    assert_eq!(handle.phase(), Phase::Draining);
}

#[test]
fn metadata_bytes_accumulate() {
    let handle = handle();
    assert_eq!(handle.metadata_bytes(), 0);
    handle.artifact_uploaded(&artifact("a1", "issues"));
    assert!(handle.metadata_bytes() > 0);
}
