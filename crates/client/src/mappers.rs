// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sync-mapper client: resolves external ids to platform records for the
//! loader and records the mapping after create/update.

use crate::error::ClientError;
use crate::http;
use crate::retry::{with_retries, RetryPolicy};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A sync-mapper row linking an external id to a platform object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapperRecord {
    pub external_ids: Vec<String>,
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    sync_mapper: MapperRecord,
}

/// Client for the sync-mapper routes on the control-plane endpoint.
#[derive(Clone)]
pub struct MappersClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    retry: RetryPolicy,
}

impl MappersClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            token: token.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn route(&self, suffix: &str) -> String {
        format!("{}/internal/airdrop.sync-mapper.{}", self.endpoint.trim_end_matches('/'), suffix)
    }

    /// Look up a mapping by sync unit and platform target id. A 404 means
    /// no external object exists for the target yet.
    pub async fn get_by_target(
        &self,
        sync_unit: &str,
        target: &str,
    ) -> Result<Option<MapperRecord>, ClientError> {
        let url = self.route("get");

        let result = with_retries("sync-mapper.get", &self.retry, || async {
            let response = self
                .client
                .get(&url)
                .header(reqwest::header::AUTHORIZATION, &self.token)
                .query(&[("sync_unit", sync_unit), ("target", target)])
                .send()
                .await?;
            let body: GetResponse =
                http::check_status(response).await?.json().await.map_err(ClientError::from)?;
            Ok(body.sync_mapper)
        })
        .await;

        match result {
            Ok(record) => Ok(Some(record)),
            Err(ClientError::Status { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Record a mapping for a freshly created platform object.
    pub async fn create(
        &self,
        sync_unit: &str,
        record: &MapperRecord,
    ) -> Result<(), ClientError> {
        self.post("create", sync_unit, record).await
    }

    /// Update the mapping after an existing object was modified.
    pub async fn update(
        &self,
        sync_unit: &str,
        record: &MapperRecord,
    ) -> Result<(), ClientError> {
        self.post("update", sync_unit, record).await
    }

    async fn post(
        &self,
        suffix: &str,
        sync_unit: &str,
        record: &MapperRecord,
    ) -> Result<(), ClientError> {
        let url = self.route(suffix);
        let operation = format!("sync-mapper.{suffix}");

        #[derive(Serialize)]
        struct PostBody<'a> {
            sync_unit: &'a str,
            #[serde(flatten)]
            record: &'a MapperRecord,
        }

        let body = PostBody { sync_unit, record };
        with_retries(&operation, &self.retry, || async {
            let response = self
                .client
                .post(&url)
                .header(reqwest::header::AUTHORIZATION, &self.token)
                .json(&body)
                .send()
                .await?;
            http::check_status(response).await.map(|_| ())
        })
        .await
    }
}

#[cfg(test)]
#[path = "mappers_tests.rs"]
mod tests;
