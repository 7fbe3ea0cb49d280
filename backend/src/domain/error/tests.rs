//! Tests for domain error construction and serialisation.

use super::*;
use crate::domain::TraceId;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[fixture]
fn base_error() -> Error {
    Error::invalid_request("bad")
}

#[rstest]
#[case(Error::invalid_request("x"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("x"), ErrorCode::Unauthorized)]
#[case(Error::forbidden("x"), ErrorCode::Forbidden)]
#[case(Error::not_found("x"), ErrorCode::NotFound)]
#[case(Error::conflict("x"), ErrorCode::Conflict)]
#[case(Error::too_many_requests("x", 1), ErrorCode::TooManyRequests)]
#[case(Error::service_unavailable("x"), ErrorCode::ServiceUnavailable)]
#[case(Error::internal("x"), ErrorCode::InternalError)]
fn constructors_set_codes(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn try_new_rejects_empty_messages() {
    let result = Error::try_new(ErrorCode::InvalidRequest, "   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyMessage)));
}

#[rstest]
fn try_with_trace_id_rejects_empty_values(base_error: Error) {
    let result = base_error.try_with_trace_id("   ");
    assert!(matches!(result, Err(ErrorValidationError::EmptyTraceId)));
}

#[rstest]
fn new_returns_none_when_trace_id_out_of_scope() {
    assert!(Error::internal("boom").trace_id().is_none());
}

#[rstest]
#[tokio::test]
async fn new_captures_trace_id_in_scope(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id.parse().expect("fixture UUID");
    let error = TraceId::scope(trace_id, async move { Error::internal("boom") }).await;
    assert_eq!(error.trace_id(), Some(expected_trace_id.as_str()));
}

#[rstest]
#[tokio::test]
async fn deserialising_ignores_ambient_trace(expected_trace_id: String) {
    let trace_id: TraceId = expected_trace_id.parse().expect("fixture UUID");
    let payload = json!({ "code": "not_found", "message": "missing" });
    let error: Error = TraceId::scope(trace_id, async move {
        serde_json::from_value(payload).expect("valid payload")
    })
    .await;
    assert!(error.trace_id().is_none());
}

#[rstest]
fn rate_limited_errors_expose_wait_time() {
    let error = Error::too_many_requests("wait", 30).merge_details(json!({ "code": "cooldown" }));
    assert_eq!(error.retry_after_seconds(), Some(30));
    assert_eq!(
        error.details(),
        Some(&json!({ "retryAfterSeconds": 30, "code": "cooldown" }))
    );
}

#[rstest]
fn serialises_camel_case_payload(expected_trace_id: String) {
    let error = Error::conflict("taken")
        .with_trace_id(expected_trace_id.clone())
        .with_details(json!({ "field": "email" }));
    let value = serde_json::to_value(&error).expect("serialise");
    assert_eq!(
        value,
        json!({
            "code": "conflict",
            "message": "taken",
            "traceId": expected_trace_id,
            "details": { "field": "email" },
        })
    );
}

#[rstest]
fn deserialising_rejects_blank_messages() {
    let payload = json!({ "code": "internal_error", "message": " " });
    assert!(serde_json::from_value::<Error>(payload).is_err());
}
