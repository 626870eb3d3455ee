// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    server_error     = { 500, None, true },
    bad_gateway      = { 502, None, true },
    rate_limited     = { 429, Some(5), true },
    rate_limit_blind = { 429, None, false },
    not_found        = { 404, None, false },
    bad_request      = { 400, None, false },
)]
fn status_retryability(status: u16, retry_after: Option<u64>, expected: bool) {
    let error = ClientError::Status { status, detail: String::new(), retry_after };
    assert_eq!(error.is_retryable(), expected);
}

#[test]
fn transport_errors_are_retryable() {
    assert!(ClientError::Transport("connection reset".into()).is_retryable());
}

#[test]
fn decode_errors_are_not_retryable() {
    assert!(!ClientError::Decode("bad json".into()).is_retryable());
}

#[test]
fn scrub_masks_authorization_values() {
    let detail = "request headers:\nauthorization: Bearer secret-token\naccept: json";
    let scrubbed = scrub_credentials(detail);
    assert!(!scrubbed.contains("secret-token"));
    assert!(scrubbed.contains("authorization: <scrubbed>"));
    assert!(scrubbed.contains("accept: json"));
}

#[test]
fn scrub_masks_json_style_headers() {
    let detail = r#"{"Authorization":"token-abc","host":"h"}"#;
    let scrubbed = scrub_credentials(detail);
    assert!(!scrubbed.contains("token-abc"));
}

#[test]
fn scrubbed_error_keeps_status() {
    let error = ClientError::Status {
        status: 500,
        detail: "Authorization: tok".into(),
        retry_after: None,
    };
    match error.scrubbed() {
        ClientError::Status { status, detail, .. } => {
            assert_eq!(status, 500);
            assert!(!detail.contains("tok"));
        }
        other => panic!("unexpected variant: {other:?}"),
    }
}
