//! Notification handlers. Every route acts on the bearer's own inbox except
//! broadcast, which fans out to all users.
//!
//! ```text
//! GET    /api/notifications?cursor=&limit=
//! PATCH  /api/notifications/{id}/read
//! DELETE /api/notifications/{id}
//! POST   /api/notifications/broadcast   {"type","title","message","alertId"?}
//! POST   /api/notifications/show-less   {"notificationId"}
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, web};
use chrono::SecondsFormat;
use pagination::{Page, PageParams};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    AlertId, Error, Notification, NotificationCategory, NotificationContent, NotificationId,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::auth::BearerUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, parse_uuid, unknown_value_error,
};

const NOTIFICATION_ID: FieldName = FieldName::new("notificationId");
const ALERT_ID: FieldName = FieldName::new("alertId");
const CATEGORY: FieldName = FieldName::new("type");
const LIMIT: FieldName = FieldName::new("limit");

/// Notification as returned to its recipient.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    #[schema(example = "Weather Warning")]
    pub category: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub show_less: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    #[schema(example = "2026-05-01T08:00:00.000Z")]
    pub created_at: String,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.id().to_string(),
            category: notification.category().label().to_owned(),
            title: notification.title().to_owned(),
            message: notification.body().to_owned(),
            is_read: notification.is_read(),
            show_less: notification.show_less(),
            alert_id: notification.alert_id().map(|id| id.to_string()),
            created_at: notification
                .created_at()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// One page of the caller's inbox.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPageResponse {
    pub data: Vec<NotificationResponse>,
    pub limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl From<Page<Notification>> for NotificationPageResponse {
    fn from(page: Page<Notification>) -> Self {
        let page = page.map(NotificationResponse::from);
        Self {
            data: page.data,
            limit: page.limit,
            next_cursor: page.next_cursor,
        }
    }
}

/// Query string for `GET /notifications`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationListParams {
    /// Opaque cursor from a previous page.
    pub cursor: Option<String>,
    /// Page size, 1 to 100.
    pub limit: Option<usize>,
}

/// Broadcast request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    #[serde(rename = "type")]
    #[schema(example = "Weather Warning")]
    pub category: String,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub alert_id: Option<String>,
}

/// Result of a broadcast.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastResponse {
    pub message: String,
    pub delivered: usize,
    pub notifications: Vec<NotificationResponse>,
}

/// Show-less request body.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShowLessRequest {
    pub notification_id: String,
}

fn notification_id(raw: &str) -> Result<NotificationId, Error> {
    parse_uuid(raw, NOTIFICATION_ID).map(NotificationId::from_uuid)
}

impl BroadcastRequest {
    fn into_content(self) -> Result<NotificationContent, Error> {
        let category = NotificationCategory::from_label(&self.category)
            .ok_or_else(|| unknown_value_error(CATEGORY, &self.category))?;
        let alert_id = self
            .alert_id
            .as_deref()
            .map(|raw| parse_uuid(raw, ALERT_ID).map(AlertId::from_uuid))
            .transpose()?;
        NotificationContent::new(category, &self.title, &self.message, alert_id)
            .map_err(|err| invalid_value_error(FieldName::new(err.field()), err.to_string()))
    }
}

/// List the caller's notifications, newest first.
#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationListParams),
    responses(
        (status = 200, description = "Notifications", body = NotificationPageResponse),
        (status = 400, description = "Malformed cursor or limit", body = ErrorSchema),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "listNotifications",
    security(("bearer" = []))
)]
#[get("/notifications")]
pub async fn list(
    state: web::Data<HttpState>,
    user: BearerUser,
    params: web::Query<NotificationListParams>,
) -> ApiResult<web::Json<NotificationPageResponse>> {
    let NotificationListParams { cursor, limit } = params.into_inner();
    let page = PageParams::new(cursor, limit)
        .map_err(|err| invalid_value_error(LIMIT, err.to_string()))?;
    let notifications = state.notifications.list(user.user_id(), page).await?;
    Ok(web::Json(NotificationPageResponse::from(notifications)))
}

/// Mark one of the caller's notifications as read.
#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/read",
    params(("id" = String, Path, description = "Notification identifier")),
    responses(
        (status = 200, description = "Notification updated", body = NotificationResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorSchema),
        (status = 403, description = "Owned by another user", body = ErrorSchema),
        (status = 404, description = "No such notification", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "markNotificationRead",
    security(("bearer" = []))
)]
#[patch("/notifications/{id}/read")]
pub async fn mark_read(
    state: web::Data<HttpState>,
    user: BearerUser,
    path: web::Path<String>,
) -> ApiResult<web::Json<NotificationResponse>> {
    let id = notification_id(&path)?;
    let notification = state.notifications.mark_read(user.user_id(), id).await?;
    Ok(web::Json(NotificationResponse::from(notification)))
}

/// Delete one of the caller's notifications.
#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(("id" = String, Path, description = "Notification identifier")),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorSchema),
        (status = 403, description = "Owned by another user", body = ErrorSchema),
        (status = 404, description = "No such notification", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "deleteNotification",
    security(("bearer" = []))
)]
#[delete("/notifications/{id}")]
pub async fn remove(
    state: web::Data<HttpState>,
    user: BearerUser,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let id = notification_id(&path)?;
    state.notifications.delete(user.user_id(), id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Send the same notification to every user.
#[utoipa::path(
    post,
    path = "/api/notifications/broadcast",
    request_body = BroadcastRequest,
    responses(
        (status = 201, description = "Notifications created", body = BroadcastResponse),
        (status = 400, description = "Invalid notification", body = ErrorSchema),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorSchema),
        (status = 404, description = "Linked alert does not exist", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "broadcastNotification",
    security(("bearer" = []))
)]
#[post("/notifications/broadcast")]
pub async fn broadcast(
    state: web::Data<HttpState>,
    _user: BearerUser,
    payload: web::Json<BroadcastRequest>,
) -> ApiResult<HttpResponse> {
    let content = payload.into_inner().into_content()?;
    let created = state.notifications.broadcast(content).await?;
    let notifications: Vec<NotificationResponse> =
        created.into_iter().map(NotificationResponse::from).collect();
    Ok(HttpResponse::Created().json(BroadcastResponse {
        message: "Notification sent to all users".to_owned(),
        delivered: notifications.len(),
        notifications,
    }))
}

/// Ask for fewer notifications like this one.
#[utoipa::path(
    post,
    path = "/api/notifications/show-less",
    request_body = ShowLessRequest,
    responses(
        (status = 200, description = "Notification updated", body = NotificationResponse),
        (status = 400, description = "Malformed notification id", body = ErrorSchema),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorSchema),
        (status = 403, description = "Owned by another user", body = ErrorSchema),
        (status = 404, description = "No such notification", body = ErrorSchema)
    ),
    tags = ["notifications"],
    operation_id = "showLessNotification",
    security(("bearer" = []))
)]
#[post("/notifications/show-less")]
pub async fn show_less(
    state: web::Data<HttpState>,
    user: BearerUser,
    payload: web::Json<ShowLessRequest>,
) -> ApiResult<web::Json<NotificationResponse>> {
    let id = notification_id(&payload.notification_id)?;
    let notification = state.notifications.show_less(user.user_id(), id).await?;
    Ok(web::Json(NotificationResponse::from(notification)))
}

#[cfg(test)]
#[path = "notifications_tests.rs"]
mod tests;
