//! Tests for HTTP error mapping.

use super::*;
use crate::domain::Error;
use actix_web::ResponseError;
use actix_web::body::to_bytes;
use actix_web::http::StatusCode;
use rstest::{fixture, rstest};
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[fixture]
fn expected_trace_id() -> String {
    TRACE_ID.to_owned()
}

#[rstest]
#[case::invalid(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
#[case::unauthorized(Error::unauthorized("no auth"), StatusCode::UNAUTHORIZED)]
#[case::forbidden(Error::forbidden("denied"), StatusCode::FORBIDDEN)]
#[case::not_found(Error::not_found("missing"), StatusCode::NOT_FOUND)]
#[case::conflict(Error::conflict("taken"), StatusCode::CONFLICT)]
#[case::rate_limited(Error::too_many_requests("wait", 30), StatusCode::TOO_MANY_REQUESTS)]
#[case::unavailable(Error::service_unavailable("db down"), StatusCode::SERVICE_UNAVAILABLE)]
#[case::internal(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
fn status_code_matches_error_code(#[case] err: Error, #[case] status: StatusCode) {
    assert_eq!(ResponseError::status_code(&err), status);
}

async fn body_of(error: &Error) -> Error {
    let response = ResponseError::error_response(error);
    let bytes = to_bytes(response.into_body())
        .await
        .expect("reading response body succeeds");
    serde_json::from_slice(&bytes).expect("Error JSON deserialisation succeeds")
}

#[rstest]
#[actix_web::test]
async fn internal_errors_are_redacted_but_keep_their_trace_id(expected_trace_id: String) {
    let error = Error::internal("connection string leaked")
        .with_trace_id(expected_trace_id.clone())
        .with_details(json!({"secret": "x"}));

    let response = ResponseError::error_response(&error);
    let header = response
        .headers()
        .get(TRACE_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    assert_eq!(header.as_deref(), Some(expected_trace_id.as_str()));

    let payload = body_of(&error).await;
    assert_eq!(payload.code(), ErrorCode::InternalError);
    assert_eq!(payload.message(), "Internal server error");
    assert_eq!(payload.trace_id(), Some(TRACE_ID));
    assert!(payload.details().is_none());
}

#[rstest]
#[actix_web::test]
async fn client_errors_keep_message_and_details() {
    let error = Error::invalid_request("bad").with_details(json!({"field": "email"}));

    let response = ResponseError::error_response(&error);
    assert!(response.headers().get(TRACE_ID_HEADER).is_none());

    let payload = body_of(&error).await;
    assert_eq!(payload.message(), "bad");
    assert_eq!(payload.details(), Some(&json!({"field": "email"})));
}

#[rstest]
fn rate_limited_errors_set_retry_after() {
    let error = Error::too_many_requests("locked", 1800)
        .merge_details(json!({"code": "account_locked"}));

    let response = ResponseError::error_response(&error);

    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok());
    assert_eq!(retry_after, Some("1800"));
}

#[rstest]
fn other_errors_omit_retry_after() {
    let response = ResponseError::error_response(&Error::conflict("taken"));

    assert!(response.headers().get(RETRY_AFTER).is_none());
}

#[rstest]
fn client_view_leaves_client_errors_untouched() {
    let error = Error::forbidden("not yours").with_trace_id(TRACE_ID);

    assert_eq!(client_view(&error), error);
}

#[test]
fn from_actix_error_is_redacted_internal_error() {
    let actix_err = actix_web::error::ErrorBadRequest("boom");
    let err: Error = actix_err.into();

    assert_eq!(err.code(), ErrorCode::InternalError);
    assert_eq!(err.message(), "Internal server error");
    assert_eq!(err.details(), None);
}
