// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde_json::json;

use super::*;

#[yare::parameterized(
    transport = { FailureKind::Transport, "TRANSPORT" },
    anomaly = { FailureKind::ProtocolAnomaly, "PROTOCOL_ANOMALY" },
    server_error = { FailureKind::ServerError, "SERVER_ERROR" },
    port = { FailureKind::PortResolution, "PORT_RESOLUTION" },
)]
fn failure_kind_labels(kind: FailureKind, label: &str) {
    assert_eq!(kind.as_str(), label);
    assert_eq!(kind.to_string(), label);
}

#[test]
fn error_descriptor_with_message_only() {
    let payload = json!({"error": {"message": "no such view"}});
    let err = ServerError::from_payload(&payload);
    assert_eq!(err, Some(ServerError { message: "no such view".into(), stack: None }));
}

#[test]
fn error_descriptor_with_stack() {
    let payload = json!({"error": {"message": "boom", "stack": "Error: boom\n  at x"}});
    let err = ServerError::from_payload(&payload);
    assert_eq!(err.as_ref().and_then(|e| e.stack.as_deref()), Some("Error: boom\n  at x"));
}

#[yare::parameterized(
    no_error_key = { json!({"ok": true}) },
    null_error = { json!({"error": null}) },
    false_error = { json!({"error": false}) },
    empty_string = { json!({"error": ""}) },
    zero = { json!({"error": 0, "rows": []}) },
    zero_float = { json!({"error": 0.0}) },
    not_an_object = { json!("plain") },
    null_payload = { json!(null) },
)]
fn payload_without_error(payload: Value) {
    assert_eq!(ServerError::from_payload(&payload), None);
}

#[test]
fn nonzero_number_is_an_error() {
    let err = ServerError::from_payload(&json!({"error": 1}));
    assert_eq!(err, Some(ServerError { message: String::new(), stack: None }));
}

#[test]
fn string_error_becomes_message() {
    let err = ServerError::from_payload(&json!({"error": "denied"}));
    assert_eq!(err.map(|e| e.message), Some("denied".to_owned()));
}

#[test]
fn render_prefers_stack() {
    let plain = ServerError { message: "boom".into(), stack: None };
    assert_eq!(plain.render(), "Server Error: boom");

    let stacked = ServerError { message: "boom".into(), stack: Some("trace".into()) };
    assert_eq!(stacked.render(), "Server Error\ntrace");
}
