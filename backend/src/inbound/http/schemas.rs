//! OpenAPI schema definitions for domain types.
//!
//! Domain types stay free of `utoipa` derives; the wrappers below mirror
//! their wire shape and register under the domain type's name.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// Missing or invalid credentials or bearer token.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Authenticated but acting on another user's resource.
    #[schema(rename = "forbidden")]
    Forbidden,
    #[schema(rename = "not_found")]
    NotFound,
    /// Duplicate email or similar state clash.
    #[schema(rename = "conflict")]
    Conflict,
    /// Lockout or passcode cooldown; see `Retry-After`.
    #[schema(rename = "too_many_requests")]
    TooManyRequests,
    /// Database or mail relay unavailable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error, rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    #[schema(example = "invalid_request")]
    code: ErrorCodeSchema,
    /// Human-readable message; redacted for internal errors.
    #[schema(example = "coordinates is required")]
    message: String,
    /// Correlation identifier, echoed in the `trace-id` header.
    #[schema(example = "01HZY8B2W6X5Y7Z9ABCD1234")]
    trace_id: Option<String>,
    /// Field-level context such as `field`, `code` or `retryAfterSeconds`.
    details: Option<serde_json::Value>,
}
