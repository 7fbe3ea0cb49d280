//! Like, flag and share handlers.
//!
//! ```text
//! POST /api/alertActions/alerts/{id}/like   (bearer)
//! POST /api/alertActions/alerts/{id}/flag   (bearer)
//! POST /api/alertActions/alerts/{id}/share  (bearer)
//! ```

use actix_web::{post, web};
use serde::Serialize;

use crate::domain::{AlertId, Error, ModerationStatus};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::auth::BearerUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_uuid};

const ALERT_ID: FieldName = FieldName::new("id");

/// Outcome of toggling a like.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LikeResponse {
    #[schema(example = "Alert liked")]
    pub message: String,
    pub liked: bool,
    pub likes_count: u32,
}

/// Outcome of flagging an alert.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlagResponse {
    pub message: String,
    pub flags_count: u32,
    /// Always `true`; flags cannot be withdrawn.
    pub flagged: bool,
    /// `verified`, `pending` or `rejected` after the flag was applied.
    #[schema(value_type = String, example = "verified")]
    pub status: ModerationStatus,
}

/// Outcome of sharing an alert.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShareResponse {
    pub message: String,
    pub shares_count: u32,
}

fn alert_id(path: &str) -> Result<AlertId, Error> {
    parse_uuid(path, ALERT_ID).map(AlertId::from_uuid)
}

/// Like an alert, or remove the caller's like.
#[utoipa::path(
    post,
    path = "/api/alertActions/alerts/{id}/like",
    params(("id" = String, Path, description = "Alert identifier")),
    responses(
        (status = 200, description = "Like toggled", body = LikeResponse),
        (status = 400, description = "Malformed alert id", body = ErrorSchema),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorSchema),
        (status = 404, description = "No such alert", body = ErrorSchema)
    ),
    tags = ["alert actions"],
    operation_id = "toggleLike",
    security(("bearer" = []))
)]
#[post("/alertActions/alerts/{id}/like")]
pub async fn toggle_like(
    state: web::Data<HttpState>,
    user: BearerUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<LikeResponse>> {
    let id = alert_id(&path)?;
    let toggle = state.engagement.toggle_like(id, user.user_id()).await?;
    let message = if toggle.liked {
        "Alert liked"
    } else {
        "Like removed"
    };
    Ok(web::Json(LikeResponse {
        message: message.to_owned(),
        liked: toggle.liked,
        likes_count: toggle.like_count,
    }))
}

/// Flag an alert for moderation. Repeat flags by the same user are no-ops.
#[utoipa::path(
    post,
    path = "/api/alertActions/alerts/{id}/flag",
    params(("id" = String, Path, description = "Alert identifier")),
    responses(
        (status = 200, description = "Alert flagged", body = FlagResponse),
        (status = 400, description = "Malformed alert id", body = ErrorSchema),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorSchema),
        (status = 404, description = "No such alert", body = ErrorSchema)
    ),
    tags = ["alert actions"],
    operation_id = "flagAlert",
    security(("bearer" = []))
)]
#[post("/alertActions/alerts/{id}/flag")]
pub async fn flag(
    state: web::Data<HttpState>,
    user: BearerUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<FlagResponse>> {
    let id = alert_id(&path)?;
    let outcome = state.engagement.flag(id, user.user_id()).await?;
    let message = if outcome.newly_flagged {
        "Alert flagged"
    } else {
        "Alert already flagged"
    };
    Ok(web::Json(FlagResponse {
        message: message.to_owned(),
        flags_count: outcome.flag_count,
        flagged: true,
        status: outcome.status,
    }))
}

/// Count a share of an alert.
#[utoipa::path(
    post,
    path = "/api/alertActions/alerts/{id}/share",
    params(("id" = String, Path, description = "Alert identifier")),
    responses(
        (status = 200, description = "Share recorded", body = ShareResponse),
        (status = 400, description = "Malformed alert id", body = ErrorSchema),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorSchema),
        (status = 404, description = "No such alert", body = ErrorSchema)
    ),
    tags = ["alert actions"],
    operation_id = "shareAlert",
    security(("bearer" = []))
)]
#[post("/alertActions/alerts/{id}/share")]
pub async fn share(
    state: web::Data<HttpState>,
    _user: BearerUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<ShareResponse>> {
    let id = alert_id(&path)?;
    let shares_count = state.engagement.share(id).await?;
    Ok(web::Json(ShareResponse {
        message: "Alert shared".to_owned(),
        shares_count,
    }))
}
