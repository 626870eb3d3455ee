// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal-event synthesis for worker faults.

use airlift_client::{build_client, with_retries, ClientError, HttpConfig, RetryPolicy};
use airlift_core::{routing, AirdropEvent, EventData, OutboundEventType, RuntimeOptions};
use std::time::Duration;

fn retry_policy(options: &RuntimeOptions) -> RetryPolicy {
    RetryPolicy {
        max_attempts: options.retry_attempts,
        base_delay: Duration::from_millis(options.retry_base_delay_ms),
        max_delay: Duration::from_millis(options.retry_max_delay_ms),
    }
}

/// POST the fault event matching the originating event type to the
/// callback URL, with `message` as the error detail.
pub async fn synthesize_fault(
    event: &AirdropEvent,
    options: &RuntimeOptions,
    message: &str,
) -> Result<OutboundEventType, ClientError> {
    let fault = routing::fault_event_for(event.event_type);
    post_event(event, options, fault, EventData::from_error(message)).await?;
    Ok(fault)
}

/// POST an arbitrary outbound event on the worker's behalf.
pub async fn post_event(
    event: &AirdropEvent,
    options: &RuntimeOptions,
    outbound: OutboundEventType,
    data: EventData,
) -> Result<(), ClientError> {
    let name = if options.legacy_event_names {
        serde_json::Value::String(outbound.legacy_name().to_string())
    } else {
        serde_json::to_value(outbound).map_err(|e| ClientError::Decode(e.to_string()))?
    };
    let envelope = serde_json::json!({
        "event_type": name,
        "event_context": event.event_context,
        "event_data": serde_json::to_value(&data)
            .map_err(|e| ClientError::Decode(e.to_string()))?,
    });

    let client = build_client(&HttpConfig::default())?;
    let url = event.event_context.callback_url.clone();
    let token = event.execution_metadata.devrev_token.clone();
    let retry = retry_policy(options);

    with_retries("callback.synthesize", &retry, || {
        let client = client.clone();
        let envelope = envelope.clone();
        let url = url.clone();
        let token = token.clone();
        async move {
            let response = client
                .post(&url)
                .header(reqwest::header::AUTHORIZATION, token)
                .json(&envelope)
                .send()
                .await?;
            airlift_client::http::check_status(response).await.map(|_| ())
        }
    })
    .await
}
