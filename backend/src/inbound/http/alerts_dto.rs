//! Alert DTOs and feed query parsing.

use chrono::SecondsFormat;
use pagination::{Page, PageParams};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    Error, FeedItem, FeedQuery, FeedQueryError, FeedSort, GeoPoint, IncidentCategory, TimeWindow,
};
use crate::inbound::http::validation::{
    FieldName, invalid_value_error, parse_json_param, unknown_value_error,
};

const ALERT_TYPES: FieldName = FieldName::new("alertTypes");
const TIME_RANGE: FieldName = FieldName::new("timeRange");
const DISTANCE: FieldName = FieldName::new("distance");
const COORDINATES: FieldName = FieldName::new("coordinates");
const SORT_BY: FieldName = FieldName::new("sortBy");
const LIMIT: FieldName = FieldName::new("limit");

/// GeoJSON point.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PointResponse {
    #[serde(rename = "type")]
    #[schema(example = "Point")]
    pub kind: &'static str,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

impl From<GeoPoint> for PointResponse {
    fn from(point: GeoPoint) -> Self {
        Self {
            kind: "Point",
            coordinates: [point.longitude(), point.latitude()],
        }
    }
}

/// Alert as rendered to clients. The owner appears only by display name.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertResponse {
    pub id: String,
    #[schema(example = "Scam")]
    pub incident_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_description: Option<String>,
    pub location: String,
    pub coordinates: PointResponse,
    pub description: String,
    /// Public paths under `/uploads`.
    pub images: Vec<String>,
    #[schema(example = "verified")]
    pub status: String,
    pub likes_count: u32,
    pub flags_count: u32,
    pub shares_count: u32,
    pub created_at: String,
    pub owner_name: Option<String>,
    /// Kilometres from the requested coordinates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

impl From<FeedItem> for AlertResponse {
    fn from(item: FeedItem) -> Self {
        let FeedItem {
            alert,
            owner_name,
            distance_km,
        } = item;
        Self {
            id: alert.id().to_string(),
            incident_type: alert.category().as_str().to_owned(),
            other_description: alert.other_description().map(str::to_owned),
            location: alert.location().to_owned(),
            coordinates: alert.point().into(),
            description: alert.description().to_owned(),
            images: alert.images().to_vec(),
            status: alert.status().as_str().to_owned(),
            likes_count: alert.like_count(),
            flags_count: alert.flag_count(),
            shares_count: alert.share_count(),
            created_at: alert.created_at().to_rfc3339_opts(SecondsFormat::Millis, true),
            owner_name: owner_name.map(String::from),
            distance_km,
        }
    }
}

/// Body returned by `POST /alerts`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PostAlertResponse {
    pub message: String,
    pub alert: AlertResponse,
}

/// One page of the feed.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AlertFeedResponse {
    pub data: Vec<AlertResponse>,
    pub limit: usize,
    /// Pass back as `cursor` to fetch the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl From<Page<FeedItem>> for AlertFeedResponse {
    fn from(page: Page<FeedItem>) -> Self {
        let page = page.map(AlertResponse::from);
        Self {
            data: page.data,
            limit: page.limit,
            next_cursor: page.next_cursor,
        }
    }
}

/// Query string for `GET /alerts/feed`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FeedParams {
    /// Comma separated categories, e.g. `Scam,Theft`.
    pub alert_types: Option<String>,
    /// JSON age bounds in hours, e.g. `{"min":0,"max":24}`.
    pub time_range: Option<String>,
    /// JSON distance bound in km, e.g. `{"max":5}`.
    pub distance: Option<String>,
    /// JSON `[longitude, latitude]` of the caller.
    pub coordinates: Option<String>,
    /// `Newest Alerts`, `Oldest Alerts`, `Most Reported`, `Most Relevant` or
    /// `Nearby Alerts`.
    pub sort_by: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TimeRangeParam {
    #[serde(default)]
    min: Option<f64>,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct DistanceParam {
    max: f64,
}

/// Coordinates as sent by clients: a bare pair or a GeoJSON point.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum CoordinatesParam {
    Pair([f64; 2]),
    Point { coordinates: [f64; 2] },
}

impl CoordinatesParam {
    pub(super) fn longitude_latitude(&self) -> (f64, f64) {
        match self {
            Self::Pair([lng, lat]) | Self::Point { coordinates: [lng, lat] } => (*lng, *lat),
        }
    }
}

fn feed_query_error(error: &FeedQueryError) -> Error {
    Error::invalid_request(error.to_string()).with_details(serde_json::json!({
        "field": error.field(),
        "code": "invalid_feed_query",
    }))
}

fn parse_categories(raw: &str) -> Result<Vec<IncidentCategory>, Error> {
    raw.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .map(|label| IncidentCategory::parse(label).ok_or_else(|| unknown_value_error(ALERT_TYPES, label)))
        .collect()
}

impl FeedParams {
    /// Validate the raw query into a [`FeedQuery`].
    pub fn into_query(self) -> Result<FeedQuery, Error> {
        let page = PageParams::new(self.cursor, self.limit)
            .map_err(|err| invalid_value_error(LIMIT, err.to_string()))?;
        let mut query = FeedQuery::new(page);

        if let Some(raw) = self.alert_types.as_deref() {
            query = query.with_categories(parse_categories(raw)?);
        }
        if let Some(raw) = self.time_range.as_deref() {
            let range: TimeRangeParam = parse_json_param(raw, TIME_RANGE)?;
            let window = TimeWindow::new(range.min.unwrap_or(0.0), range.max)
                .map_err(|err| feed_query_error(&err))?;
            query = query.with_window(window);
        }
        if let Some(raw) = self.coordinates.as_deref() {
            let param: CoordinatesParam = parse_json_param(raw, COORDINATES)?;
            let (longitude, latitude) = param.longitude_latitude();
            let origin = GeoPoint::new(longitude, latitude)
                .map_err(|err| invalid_value_error(COORDINATES, err.to_string()))?;
            query = query.with_origin(origin);
        }
        if let Some(raw) = self.distance.as_deref() {
            let distance: DistanceParam = parse_json_param(raw, DISTANCE)?;
            query = query
                .with_max_distance(distance.max)
                .map_err(|err| feed_query_error(&err))?;
        }
        if let Some(raw) = self.sort_by.as_deref().filter(|raw| !raw.trim().is_empty()) {
            let sort = FeedSort::from_label(raw).ok_or_else(|| unknown_value_error(SORT_BY, raw))?;
            query = query.with_sort(sort);
        }
        Ok(query)
    }
}
