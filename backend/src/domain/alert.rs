//! Alert aggregate: a geotagged incident report with engagement counters.
//!
//! Raw submissions are validated into an [`AlertDraft`] before anything is
//! stored. Alerts are never hard-deleted; moderation only moves the status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::UserId;

/// Flags at which a verified alert is pulled back for review.
pub const FLAG_REVIEW_THRESHOLD: u32 = 5;
/// Minimum description length after trimming.
pub const DESCRIPTION_MIN: usize = 10;
/// Maximum description length after trimming.
pub const DESCRIPTION_MAX: usize = 2_000;
/// Maximum location label length after trimming.
pub const LOCATION_MAX: usize = 200;
/// Maximum number of images attached to one alert.
pub const MAX_IMAGES: usize = 5;
/// Maximum size of one image upload in bytes.
pub const MAX_IMAGE_BYTES: usize = 5_000_000;

const EARTH_RADIUS_KM: f64 = 6_371.0;

/// Stable alert identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertId(Uuid);

impl AlertId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for AlertId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of incident categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IncidentCategory {
    Scam,
    Theft,
    Crime,
    Weather,
    PublicDisorder,
    Other,
}

impl IncidentCategory {
    pub const ALL: [Self; 6] = [
        Self::Scam,
        Self::Theft,
        Self::Crime,
        Self::Weather,
        Self::PublicDisorder,
        Self::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scam => "Scam",
            Self::Theft => "Theft",
            Self::Crime => "Crime",
            Self::Weather => "Weather",
            Self::PublicDisorder => "PublicDisorder",
            Self::Other => "Other",
        }
    }

    /// Parse a category label exactly as clients send it.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str() == value.trim())
    }
}

impl fmt::Display for IncidentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Moderation state of an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStatus {
    Pending,
    Verified,
    Rejected,
}

impl ModerationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "verified" => Some(Self::Verified),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Status after a new flag brings the total to `flag_count`.
    ///
    /// Only verified alerts move; pending and rejected alerts keep their state.
    pub fn after_flag(self, flag_count: u32) -> Self {
        match self {
            Self::Verified if flag_count >= FLAG_REVIEW_THRESHOLD => Self::Pending,
            other => other,
        }
    }
}

/// Latitude/longitude bounds used to pre-filter candidates in the store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

/// Validation errors for geographic points.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum GeoPointError {
    #[error("longitude must be between -180 and 180, got {0}")]
    Longitude(f64),
    #[error("latitude must be between -90 and 90, got {0}")]
    Latitude(f64),
}

/// WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    longitude: f64,
    latitude: f64,
}

impl GeoPoint {
    /// Validate a `(longitude, latitude)` pair.
    pub fn new(longitude: f64, latitude: f64) -> Result<Self, GeoPointError> {
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoPointError::Longitude(longitude));
        }
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoPointError::Latitude(latitude));
        }
        Ok(Self {
            longitude,
            latitude,
        })
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Great-circle distance in kilometres (haversine).
    ///
    /// # Examples
    /// ```
    /// use alertline::domain::GeoPoint;
    ///
    /// let a = GeoPoint::new(0.0, 0.0).unwrap();
    /// let b = GeoPoint::new(0.0, 1.0).unwrap();
    /// assert!((a.distance_km(&b) - 111.19).abs() < 0.01);
    /// ```
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.latitude.to_radians(), other.latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.longitude - self.longitude).to_radians();
        let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
    }

    /// Box enclosing every point within `radius_km`.
    ///
    /// Near the poles or across the antimeridian the longitude range widens
    /// to the full circle; callers still apply the exact distance check.
    pub fn bounding_box(&self, radius_km: f64) -> BoundingBox {
        let lat_delta = (radius_km / EARTH_RADIUS_KM).to_degrees();
        let min_latitude = (self.latitude - lat_delta).max(-90.0);
        let max_latitude = (self.latitude + lat_delta).min(90.0);

        let full = (-180.0, 180.0);
        let (min_longitude, max_longitude) = if min_latitude <= -90.0 || max_latitude >= 90.0 {
            full
        } else {
            let widest = self.latitude.abs() + lat_delta;
            let lng_delta = lat_delta / widest.to_radians().cos();
            let (low, high) = (self.longitude - lng_delta, self.longitude + lng_delta);
            if lng_delta >= 180.0 || low < -180.0 || high > 180.0 {
                full
            } else {
                (low, high)
            }
        };

        BoundingBox {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }
}

/// Validation errors for alert submissions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlertValidationError {
    #[error("incident type is required")]
    MissingCategory,
    #[error("unknown incident type: {0}")]
    UnknownCategory(String),
    #[error("a description of the incident is required when the type is Other")]
    MissingOtherDescription,
    #[error("location is required")]
    MissingLocation,
    #[error("location must be at most {max} characters")]
    LocationTooLong { max: usize },
    #[error("description must be at least {min} characters long")]
    DescriptionTooShort { min: usize },
    #[error("description must be at most {max} characters")]
    DescriptionTooLong { max: usize },
    #[error("invalid coordinates: {0}")]
    Coordinates(GeoPointError),
    #[error("at most {max} images may be attached")]
    TooManyImages { max: usize },
    #[error("image {name} exceeds {max} bytes")]
    ImageTooLarge { name: String, max: usize },
    #[error("only .jpeg, .jpg and .png images are accepted: {name}")]
    UnsupportedImage { name: String },
}

impl AlertValidationError {
    /// Request field the failure relates to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingCategory | Self::UnknownCategory(_) => "incidentType",
            Self::MissingOtherDescription => "otherDescription",
            Self::MissingLocation | Self::LocationTooLong { .. } => "location",
            Self::DescriptionTooShort { .. } | Self::DescriptionTooLong { .. } => "description",
            Self::Coordinates(_) => "coordinates",
            Self::TooManyImages { .. }
            | Self::ImageTooLarge { .. }
            | Self::UnsupportedImage { .. } => "images",
        }
    }

    /// Stable machine-readable failure code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCategory | Self::MissingLocation => "missing_field",
            Self::MissingOtherDescription => "missing_other_description",
            Self::UnknownCategory(_) => "unknown_incident_type",
            Self::LocationTooLong { .. } | Self::DescriptionTooLong { .. } => "too_long",
            Self::DescriptionTooShort { .. } => "too_short",
            Self::Coordinates(_) => "invalid_coordinates",
            Self::TooManyImages { .. } => "too_many_images",
            Self::ImageTooLarge { .. } => "image_too_large",
            Self::UnsupportedImage { .. } => "unsupported_image",
        }
    }
}

/// Raw alert fields as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertSubmission {
    pub incident_type: Option<String>,
    pub other_description: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub longitude: f64,
    pub latitude: f64,
}

/// Validated alert content, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    category: IncidentCategory,
    other_description: Option<String>,
    location: String,
    point: GeoPoint,
    description: String,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

impl AlertDraft {
    /// Validate a raw submission.
    pub fn validate(submission: &AlertSubmission) -> Result<Self, AlertValidationError> {
        let raw_category = non_blank(submission.incident_type.as_deref())
            .ok_or(AlertValidationError::MissingCategory)?;
        let category = IncidentCategory::parse(raw_category)
            .ok_or_else(|| AlertValidationError::UnknownCategory(raw_category.to_owned()))?;

        let other_description = match category {
            IncidentCategory::Other => Some(
                non_blank(submission.other_description.as_deref())
                    .ok_or(AlertValidationError::MissingOtherDescription)?
                    .to_owned(),
            ),
            _ => None,
        };

        let location = non_blank(submission.location.as_deref())
            .ok_or(AlertValidationError::MissingLocation)?;
        if location.chars().count() > LOCATION_MAX {
            return Err(AlertValidationError::LocationTooLong { max: LOCATION_MAX });
        }

        let description = submission.description.as_deref().unwrap_or_default().trim();
        let description_len = description.chars().count();
        if description_len < DESCRIPTION_MIN {
            return Err(AlertValidationError::DescriptionTooShort {
                min: DESCRIPTION_MIN,
            });
        }
        if description_len > DESCRIPTION_MAX {
            return Err(AlertValidationError::DescriptionTooLong {
                max: DESCRIPTION_MAX,
            });
        }

        let point = GeoPoint::new(submission.longitude, submission.latitude)
            .map_err(AlertValidationError::Coordinates)?;

        Ok(Self {
            category,
            other_description,
            location: location.to_owned(),
            point,
            description: description.to_owned(),
        })
    }

    pub fn category(&self) -> IncidentCategory {
        self.category
    }

    pub fn point(&self) -> GeoPoint {
        self.point
    }
}

/// Accepted image content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
}

impl ImageKind {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }
}

/// Image bytes that passed the type and size checks.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    kind: ImageKind,
    bytes: Vec<u8>,
}

impl ImageUpload {
    /// Accept an upload only when both the file extension and the declared
    /// content type name an allowed image format.
    pub fn new(
        file_name: &str,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Result<Self, AlertValidationError> {
        let unsupported = || AlertValidationError::UnsupportedImage {
            name: file_name.to_owned(),
        };
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .ok_or_else(unsupported)?;
        let by_extension = match extension.as_str() {
            "jpg" | "jpeg" => ImageKind::Jpeg,
            "png" => ImageKind::Png,
            _ => return Err(unsupported()),
        };
        let by_content_type = match content_type.map(str::to_ascii_lowercase).as_deref() {
            Some("image/jpeg" | "image/jpg") => ImageKind::Jpeg,
            Some("image/png") => ImageKind::Png,
            _ => return Err(unsupported()),
        };
        if by_extension != by_content_type {
            return Err(unsupported());
        }
        if bytes.len() > MAX_IMAGE_BYTES {
            return Err(AlertValidationError::ImageTooLarge {
                name: file_name.to_owned(),
                max: MAX_IMAGE_BYTES,
            });
        }
        Ok(Self {
            kind: by_extension,
            bytes,
        })
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Persisted alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    id: AlertId,
    owner: UserId,
    category: IncidentCategory,
    other_description: Option<String>,
    location: String,
    point: GeoPoint,
    description: String,
    images: Vec<String>,
    status: ModerationStatus,
    like_count: u32,
    flag_count: u32,
    share_count: u32,
    created_at: DateTime<Utc>,
}

/// Field bundle used to rebuild an [`Alert`] from storage.
#[derive(Debug, Clone)]
pub struct AlertRecord {
    pub id: AlertId,
    pub owner: UserId,
    pub category: IncidentCategory,
    pub other_description: Option<String>,
    pub location: String,
    pub point: GeoPoint,
    pub description: String,
    pub images: Vec<String>,
    pub status: ModerationStatus,
    pub like_count: u32,
    pub flag_count: u32,
    pub share_count: u32,
    pub created_at: DateTime<Utc>,
}

impl From<AlertRecord> for Alert {
    fn from(record: AlertRecord) -> Self {
        let AlertRecord {
            id,
            owner,
            category,
            other_description,
            location,
            point,
            description,
            images,
            status,
            like_count,
            flag_count,
            share_count,
            created_at,
        } = record;
        Self {
            id,
            owner,
            category,
            other_description,
            location,
            point,
            description,
            images,
            status,
            like_count,
            flag_count,
            share_count,
            created_at,
        }
    }
}

impl Alert {
    /// Create a new verified alert with zeroed counters.
    pub fn create(
        owner: UserId,
        draft: AlertDraft,
        images: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let AlertDraft {
            category,
            other_description,
            location,
            point,
            description,
        } = draft;
        Self {
            id: AlertId::random(),
            owner,
            category,
            other_description,
            location,
            point,
            description,
            images,
            status: ModerationStatus::Verified,
            like_count: 0,
            flag_count: 0,
            share_count: 0,
            created_at: now,
        }
    }

    pub fn id(&self) -> AlertId {
        self.id
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }

    pub fn category(&self) -> IncidentCategory {
        self.category
    }

    pub fn other_description(&self) -> Option<&str> {
        self.other_description.as_deref()
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn point(&self) -> GeoPoint {
        self.point
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn images(&self) -> &[String] {
        &self.images
    }

    pub fn status(&self) -> ModerationStatus {
        self.status
    }

    pub fn like_count(&self) -> u32 {
        self.like_count
    }

    pub fn flag_count(&self) -> u32 {
        self.flag_count
    }

    pub fn share_count(&self) -> u32 {
        self.share_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Result of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeToggle {
    pub liked: bool,
    pub like_count: u32,
}

/// Result of flagging an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagOutcome {
    pub newly_flagged: bool,
    pub flag_count: u32,
    pub status: ModerationStatus,
}
