// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
struct ConnectorState {
    cursor: Option<String>,
}

#[test]
fn missing_substructures_initialize_empty() {
    let state: AdapterState<ConnectorState> =
        serde_json::from_value(json!({"connector": {}})).unwrap();

    assert!(state.to_devrev.attachments_metadata.artifact_ids.is_empty());
    assert_eq!(state.to_devrev.attachments_metadata.last_processed, 0);
    assert!(state.from_devrev.files_to_load.is_empty());
    assert!(state.last_sync_started.is_none());
}

#[test]
fn legacy_processed_ids_migrate_to_refs() {
    let state: AdapterState<ConnectorState> = serde_json::from_value(json!({
        "toDevRev": {
            "attachmentsMetadata": {
                "artifactIds": ["a1"],
                "lastProcessed": 2,
                "lastProcessedAttachmentsIdsList": ["x1", {"id": "x2", "parent_id": "p"}],
            }
        }
    }))
    .unwrap();

    let list = &state.to_devrev.attachments_metadata.last_processed_attachments_ids_list;
    assert_eq!(list[0], ProcessedRef::new("x1", ""));
    assert_eq!(list[1], ProcessedRef::new("x2", "p"));
}

#[test]
fn state_roundtrips_with_camel_case_keys() {
    let state = AdapterState {
        connector: ConnectorState { cursor: Some("c1".into()) },
        to_devrev: ToDevRev {
            attachments_metadata: AttachmentsMetadata {
                artifact_ids: vec!["a1".into()],
                last_processed: 3,
                last_processed_attachments_ids_list: vec![ProcessedRef::new("x", "p")],
            },
        },
        from_devrev: FromDevRev::default(),
        last_sync_started: Some("2026-01-01T00:00:00Z".into()),
        last_successful_sync_started: None,
    };

    let value = serde_json::to_value(&state).unwrap();
    assert_eq!(value["toDevRev"]["attachmentsMetadata"]["artifactIds"][0], "a1");
    assert_eq!(value["lastSyncStarted"], "2026-01-01T00:00:00Z");
    assert!(value.get("lastSuccessfulSyncStarted").is_none());

    let back: AdapterState<ConnectorState> = serde_json::from_value(value).unwrap();
    assert_eq!(back, state);
}

#[test]
fn files_to_load_resume_fields() {
    let state: AdapterState<ConnectorState> = serde_json::from_value(json!({
        "fromDevRev": {
            "filesToLoad": [
                {"artifact_id": "art-1", "item_type": "issues", "count": 10, "lineToProcess": 4},
            ]
        }
    }))
    .unwrap();

    let file = &state.from_devrev.files_to_load[0];
    assert_eq!(file.line_to_process, 4);
    assert!(!file.completed);
}
