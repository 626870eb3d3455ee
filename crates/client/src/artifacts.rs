// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact-store client: prepare, upload, confirm, fetch.

use crate::error::ClientError;
use crate::http;
use crate::jsonl;
use crate::retry::{with_retries, RetryPolicy};
use airlift_core::Artifact;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One signed form field returned by the prepare call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormField {
    pub key: String,
    pub value: String,
}

/// Result of `artifacts.prepare`: an id plus the signed upload form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreparedArtifact {
    pub artifact_id: String,
    pub url: String,
    #[serde(default)]
    pub form_data: Vec<FormField>,
}

#[derive(Debug, Serialize)]
struct PrepareRequest<'a> {
    file_name: &'a str,
    file_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_size: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ConfirmRequest<'a> {
    id: &'a str,
}

/// Client for the artifact store behind the control-plane endpoint.
#[derive(Clone)]
pub struct ArtifactsClient {
    client: reqwest::Client,
    endpoint: String,
    token: String,
    retry: RetryPolicy,
}

impl ArtifactsClient {
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
        format!("{}/internal/{}", self.endpoint.trim_end_matches('/'), suffix)
    }

    /// Reserve an artifact id and a signed upload form.
    pub async fn prepare(
        &self,
        file_name: &str,
        file_type: &str,
        file_size: Option<u64>,
    ) -> Result<PreparedArtifact, ClientError> {
        let url = self.route("artifacts.prepare");
        let request = PrepareRequest { file_name, file_type, file_size };

        with_retries("artifacts.prepare", &self.retry, || async {
            let response = self
                .client
                .post(&url)
                .header(reqwest::header::AUTHORIZATION, &self.token)
                .json(&request)
                .send()
                .await?;
            http::check_status(response).await?.json().await.map_err(ClientError::from)
        })
        .await
    }

    /// Upload an in-memory payload through the signed form. Retryable
    /// because the payload can be replayed.
    pub async fn upload_bytes(
        &self,
        prepared: &PreparedArtifact,
        file_name: &str,
        content_type: &str,
        payload: Vec<u8>,
    ) -> Result<(), ClientError> {
        with_retries("artifacts.upload", &self.retry, || {
            let payload = payload.clone();
            async move {
                let form = self.signed_form(prepared, file_name, |part_name| {
                    reqwest::multipart::Part::bytes(payload)
                        .file_name(part_name)
                        .mime_str(content_type)
                        .map_err(|e| ClientError::Decode(e.to_string()))
                })?;
                let response = self.client.post(&prepared.url).multipart(form).send().await?;
                http::check_status(response).await.map(|_| ())
            }
        })
        .await
    }

    /// Upload a one-shot byte stream through the signed form. Not
    /// retryable: the body cannot be replayed once consumed.
    pub async fn upload_stream(
        &self,
        prepared: &PreparedArtifact,
        file_name: &str,
        content_type: &str,
        content_length: Option<u64>,
        body: reqwest::Body,
    ) -> Result<(), ClientError> {
        let form = self.signed_form(prepared, file_name, |part_name| {
            let part = match content_length {
                Some(len) => reqwest::multipart::Part::stream_with_length(body, len),
                None => reqwest::multipart::Part::stream(body),
            };
            part.file_name(part_name)
                .mime_str(content_type)
                .map_err(|e| ClientError::Decode(e.to_string()))
        })?;

        let response = self.client.post(&prepared.url).multipart(form).send().await?;
        http::check_status(response).await.map(|_| ())
    }

    fn signed_form<F>(
        &self,
        prepared: &PreparedArtifact,
        file_name: &str,
        make_part: F,
    ) -> Result<reqwest::multipart::Form, ClientError>
    where
        F: FnOnce(String) -> Result<reqwest::multipart::Part, ClientError>,
    {
        let mut form = reqwest::multipart::Form::new();
        for field in &prepared.form_data {
            form = form.text(field.key.clone(), field.value.clone());
        }
        Ok(form.part("file", make_part(file_name.to_string())?))
    }

    /// Finalize an uploaded artifact.
    pub async fn confirm(&self, artifact_id: &str) -> Result<(), ClientError> {
        let url = self.route("artifacts.confirm_upload");
        let request = ConfirmRequest { id: artifact_id };

        with_retries("artifacts.confirm", &self.retry, || async {
            let response = self
                .client
                .post(&url)
                .header(reqwest::header::AUTHORIZATION, &self.token)
                .json(&request)
                .send()
                .await?;
            http::check_status(response).await.map(|_| ())
        })
        .await
    }

    /// Fetch an artifact body by id.
    pub async fn fetch_bytes(&self, artifact_id: &str) -> Result<Vec<u8>, ClientError> {
        let url = format!("{}?id={}", self.route("artifacts.get"), artifact_id);

        with_retries("artifacts.get", &self.retry, || async {
            let response = self
                .client
                .get(&url)
                .header(reqwest::header::AUTHORIZATION, &self.token)
                .send()
                .await?;
            let bytes = http::check_status(response).await?.bytes().await?;
            Ok(bytes.to_vec())
        })
        .await
    }

    /// Fetch an artifact holding a single JSON document.
    pub async fn fetch_json(&self, artifact_id: &str) -> Result<Value, ClientError> {
        let bytes = self.fetch_bytes(artifact_id).await?;
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Fetch a JSONL artifact, decoding gzip when the caller asserts it.
    pub async fn fetch_jsonl(
        &self,
        artifact_id: &str,
        gzipped: bool,
    ) -> Result<Vec<Value>, ClientError> {
        let bytes = self.fetch_bytes(artifact_id).await?;
        if gzipped {
            jsonl::from_jsonl_gz(&bytes)
        } else {
            let text = String::from_utf8(bytes).map_err(|e| ClientError::Decode(e.to_string()))?;
            jsonl::from_jsonl(&text)
        }
    }

    /// Serialize a small batch as gzipped JSONL and upload it in one step:
    /// prepare, upload, confirm.
    pub async fn upload_jsonl<T: Serialize>(
        &self,
        item_type: &str,
        objects: &[T],
    ) -> Result<Artifact, ClientError> {
        let payload = jsonl::to_jsonl_gz(objects)?;
        let byte_length = payload.len() as u64;
        let file_name = format!("{item_type}.jsonl.gz");

        let prepared = self
            .prepare(&file_name, "application/x-gzip", Some(byte_length))
            .await?;
        self.upload_bytes(&prepared, &file_name, "application/x-gzip", payload)
            .await?;
        self.confirm(&prepared.artifact_id).await?;

        tracing::debug!(
            item_type,
            artifact_id = %prepared.artifact_id,
            item_count = objects.len(),
            "artifact uploaded"
        );

        Ok(Artifact {
            id: prepared.artifact_id,
            item_type: item_type.to_string(),
            item_count: objects.len(),
            byte_length: Some(byte_length),
        })
    }
}

#[cfg(test)]
#[path = "artifacts_tests.rs"]
mod tests;
