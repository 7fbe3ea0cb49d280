//! Alert posting and feed handlers.
//!
//! ```text
//! POST /api/alerts       multipart/form-data (bearer)
//! GET  /api/alerts/feed?alertTypes=Scam,Theft&timeRange={"max":24}&sortBy=Newest%20Alerts
//! ```

use actix_multipart::{Field, Multipart};
use actix_web::{HttpResponse, get, post, web};
use futures_util::TryStreamExt as _;
use serde_json::json;
use tracing::debug;

use crate::domain::{
    AlertSubmission, AlertValidationError, Error, ImageUpload, MAX_IMAGE_BYTES, MAX_IMAGES,
    alert_validation_error,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::auth::BearerUser;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, missing_field_error, parse_json_param};

pub use super::alerts_dto::{
    AlertFeedResponse, AlertResponse, FeedParams, PointResponse, PostAlertResponse,
};
use super::alerts_dto::CoordinatesParam;

/// Longest accepted text part; descriptions are far shorter.
const MAX_TEXT_FIELD_BYTES: usize = 16 * 1024;
const IMAGES_FIELD: &str = "images";
const COORDINATES: FieldName = FieldName::new("coordinates");

/// Multipart form accepted by `POST /alerts`; documented for OpenAPI only.
#[derive(utoipa::ToSchema)]
#[expect(dead_code, reason = "Used only for OpenAPI schema generation via utoipa")]
pub struct AlertForm {
    #[schema(example = "Scam")]
    incident_type: String,
    other_description: Option<String>,
    location: String,
    description: String,
    /// JSON `[longitude, latitude]` or a GeoJSON point.
    #[schema(example = "[-3.19, 55.95]")]
    coordinates: String,
    #[schema(value_type = Vec<String>, format = Binary, max_items = 5)]
    images: Vec<Vec<u8>>,
}

fn multipart_error(err: impl std::fmt::Display) -> Error {
    Error::invalid_request(format!("malformed multipart body: {err}"))
        .with_details(json!({ "code": "invalid_multipart" }))
}

async fn read_limited(
    field: &mut Field,
    limit: usize,
    too_large: impl FnOnce() -> Error,
) -> ApiResult<Vec<u8>> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
        if bytes.len() + chunk.len() > limit {
            return Err(too_large());
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_text(field: &mut Field, name: &str) -> ApiResult<String> {
    let field_name = name.to_owned();
    let bytes = read_limited(field, MAX_TEXT_FIELD_BYTES, || {
        Error::invalid_request(format!("{field_name} is too long"))
            .with_details(json!({ "field": field_name, "code": "too_long" }))
    })
    .await?;
    String::from_utf8(bytes).map_err(|_| {
        Error::invalid_request(format!("{name} must be UTF-8 text"))
            .with_details(json!({ "field": name, "code": "invalid_encoding" }))
    })
}

async fn read_image(field: &mut Field) -> ApiResult<ImageUpload> {
    let file_name = field
        .content_disposition()
        .and_then(|disposition| disposition.get_filename())
        .unwrap_or_default()
        .to_owned();
    let content_type = field.content_type().map(|mime| mime.essence_str().to_owned());
    let too_large_name = file_name.clone();
    let bytes = read_limited(field, MAX_IMAGE_BYTES, || {
        alert_validation_error(&AlertValidationError::ImageTooLarge {
            name: too_large_name,
            max: MAX_IMAGE_BYTES,
        })
    })
    .await?;
    ImageUpload::new(&file_name, content_type.as_deref(), bytes)
        .map_err(|err| alert_validation_error(&err))
}

/// Collected multipart parts before validation.
#[derive(Default)]
struct AlertParts {
    submission: AlertSubmission,
    coordinates: Option<String>,
    images: Vec<ImageUpload>,
}

async fn collect_parts(mut payload: Multipart) -> ApiResult<AlertParts> {
    let mut parts = AlertParts::default();
    while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            IMAGES_FIELD => {
                if parts.images.len() == MAX_IMAGES {
                    return Err(alert_validation_error(&AlertValidationError::TooManyImages {
                        max: MAX_IMAGES,
                    }));
                }
                parts.images.push(read_image(&mut field).await?);
            }
            "incidentType" => parts.submission.incident_type = Some(read_text(&mut field, &name).await?),
            "otherDescription" => {
                parts.submission.other_description = Some(read_text(&mut field, &name).await?);
            }
            "location" => parts.submission.location = Some(read_text(&mut field, &name).await?),
            "description" => parts.submission.description = Some(read_text(&mut field, &name).await?),
            "coordinates" => parts.coordinates = Some(read_text(&mut field, &name).await?),
            _ => {
                debug!(field = %name, "ignoring unknown multipart field");
                while field.try_next().await.map_err(multipart_error)?.is_some() {}
            }
        }
    }
    Ok(parts)
}

/// Post a new alert with up to five images.
#[utoipa::path(
    post,
    path = "/api/alerts",
    request_body(content = AlertForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Alert created", body = PostAlertResponse),
        (status = 400, description = "Invalid alert or image", body = ErrorSchema),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["alerts"],
    operation_id = "postAlert",
    security(("bearer" = []))
)]
#[post("/alerts")]
pub async fn post_alert(
    state: web::Data<HttpState>,
    user: BearerUser,
    payload: Multipart,
) -> ApiResult<HttpResponse> {
    let AlertParts {
        mut submission,
        coordinates,
        images,
    } = collect_parts(payload).await?;
    let raw = coordinates.ok_or_else(|| missing_field_error(COORDINATES))?;
    let (longitude, latitude) =
        parse_json_param::<CoordinatesParam>(&raw, COORDINATES)?.longitude_latitude();
    submission.longitude = longitude;
    submission.latitude = latitude;

    let item = state
        .alerts
        .post_alert(user.user_id(), submission, images)
        .await?;
    Ok(HttpResponse::Created().json(PostAlertResponse {
        message: "Alert posted successfully".to_owned(),
        alert: item.into(),
    }))
}

/// Verified alerts, filtered and ordered as requested.
#[utoipa::path(
    get,
    path = "/api/alerts/feed",
    params(FeedParams),
    responses(
        (status = 200, description = "Feed page", body = AlertFeedResponse),
        (status = 400, description = "Invalid filter, sort or cursor", body = ErrorSchema),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["alerts"],
    operation_id = "alertFeed",
    security([])
)]
#[get("/alerts/feed")]
pub async fn feed(
    state: web::Data<HttpState>,
    params: web::Query<FeedParams>,
) -> ApiResult<web::Json<AlertFeedResponse>> {
    let query = params.into_inner().into_query()?;
    let page = state.feed.feed(query).await?;
    Ok(web::Json(page.into()))
}

#[cfg(test)]
#[path = "alerts_tests.rs"]
mod tests;
