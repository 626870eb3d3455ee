// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP client for the worker-data (state) endpoint.
//!
//! The wire contract stringifies state: `GET <url>.get` returns
//! `{"state": "<json-string>"}` and `POST <url>.update` takes the same
//! envelope back.

use crate::error::ClientError;
use crate::http;
use crate::retry::{with_retries, RetryPolicy};
use airlift_core::state::AdapterState;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct StateEnvelope {
    state: String,
}

/// Client for loading and persisting adapter state.
#[derive(Clone)]
pub struct StateClient {
    client: reqwest::Client,
    worker_data_url: String,
    token: String,
    retry: RetryPolicy,
}

impl StateClient {
    pub fn new(
        client: reqwest::Client,
        worker_data_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            worker_data_url: worker_data_url.into(),
            token: token.into(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch and decode the persisted state envelope.
    pub async fn get<S>(&self) -> Result<AdapterState<S>, ClientError>
    where
        S: DeserializeOwned + Default,
    {
        let url = format!("{}.get", self.worker_data_url);
        let envelope: StateEnvelope = with_retries("state.get", &self.retry, || async {
            let response = self
                .client
                .get(&url)
                .header(reqwest::header::AUTHORIZATION, &self.token)
                .send()
                .await?;
            http::check_status(response).await?.json().await.map_err(ClientError::from)
        })
        .await?;

        serde_json::from_str(&envelope.state).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Persist the current state. Idempotent per call; failure is surfaced
    /// to the emitter, which treats it as fatal for the current emission.
    pub async fn update<S>(&self, state: &AdapterState<S>) -> Result<(), ClientError>
    where
        S: Serialize + Sync,
    {
        let url = format!("{}.update", self.worker_data_url);
        let body = StateEnvelope {
            state: serde_json::to_string(state).map_err(|e| ClientError::Decode(e.to_string()))?,
        };

        with_retries("state.update", &self.retry, || async {
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
#[path = "state_tests.rs"]
mod tests;
