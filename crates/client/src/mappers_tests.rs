// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::http::{build_client, HttpConfig};
use crate::retry::RetryPolicy;
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mappers_client(server: &MockServer) -> MappersClient {
    let http = build_client(&HttpConfig::default()).unwrap();
    MappersClient::new(http, server.uri(), "tok").with_retry(RetryPolicy {
        max_attempts: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
    })
}

#[tokio::test]
async fn get_resolves_existing_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/internal/airdrop.sync-mapper.get"))
        .and(query_param("target", "don:core:issue/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sync_mapper": {
                "external_ids": ["ext-1"],
                "targets": ["don:core:issue/1"],
            }
        })))
        .mount(&server)
        .await;

    let record = mappers_client(&server)
        .get_by_target("unit-1", "don:core:issue/1")
        .await
        .unwrap();

    assert_eq!(record.unwrap().external_ids, vec!["ext-1"]);
}

#[tokio::test]
async fn get_maps_404_to_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/internal/airdrop.sync-mapper.get"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let record = mappers_client(&server)
        .get_by_target("unit-1", "don:core:issue/missing")
        .await
        .unwrap();

    assert!(record.is_none());
}

#[tokio::test]
async fn create_posts_record_with_sync_unit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/internal/airdrop.sync-mapper.create"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let record = MapperRecord {
        external_ids: vec!["ext-2".into()],
        targets: vec!["don:core:issue/2".into()],
        status: None,
        extra_data: None,
    };
    mappers_client(&server).create("unit-1", &record).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["sync_unit"], "unit-1");
    assert_eq!(body["external_ids"][0], "ext-2");
}
