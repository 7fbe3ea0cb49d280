//! Feed query engine.
//!
//! A feed request is turned into a [`FeedPlan`]: a store-side [`FeedFilter`]
//! (category, time window and bounding box pushed down) plus the in-process
//! distance check and ordering. Every sort mode goes through [`compare`], and
//! cursors carry the last item's [`SortKey`] so the next page starts strictly
//! after it. Orderings that need no distance also travel to the store as a
//! [`FeedSeek`], so only one page worth of rows is read.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use pagination::{Cursor, CursorError, Page, PageParams};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use super::alert::{Alert, BoundingBox, GeoPoint, IncidentCategory};
use super::user::DisplayName;

/// Distance cap applied to nearby sorting when no explicit bound is given.
pub const NEARBY_DEFAULT_RADIUS_KM: f64 = 1.0;
/// Largest accepted time window, ten years in hours.
pub const MAX_WINDOW_HOURS: f64 = 87_600.0;
/// Largest accepted distance bound in kilometres.
pub const MAX_DISTANCE_KM: f64 = 20_100.0;

/// Feed ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedSort {
    #[default]
    Newest,
    Oldest,
    MostReported,
    MostRelevant,
    NearbyAlerts,
}

impl FeedSort {
    /// Wire label used by the `sortBy` query parameter.
    pub fn label(self) -> &'static str {
        match self {
            Self::Newest => "Newest Alerts",
            Self::Oldest => "Oldest Alerts",
            Self::MostReported => "Most Reported",
            Self::MostRelevant => "Most Relevant",
            Self::NearbyAlerts => "Nearby Alerts",
        }
    }

    /// Parse a wire label.
    pub fn from_label(label: &str) -> Option<Self> {
        [
            Self::Newest,
            Self::Oldest,
            Self::MostReported,
            Self::MostRelevant,
            Self::NearbyAlerts,
        ]
        .into_iter()
        .find(|sort| sort.label().eq_ignore_ascii_case(label.trim()))
    }
}

/// Feed request validation failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedQueryError {
    #[error("time range bounds must be finite, non-negative hours with min <= max")]
    TimeWindow,
    #[error("distance must be a positive number of kilometres")]
    Distance,
    #[error("invalid cursor: {0}")]
    Cursor(#[from] CursorError),
    #[error("cursor was issued for a different sort order")]
    CursorSortMismatch,
}

impl FeedQueryError {
    /// Query parameter the failure relates to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::TimeWindow => "timeRange",
            Self::Distance => "distance",
            Self::Cursor(_) | Self::CursorSortMismatch => "cursor",
        }
    }
}

/// Age bounds in hours; alerts older than `max_hours` or younger than
/// `min_hours` are excluded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    min_hours: f64,
    max_hours: f64,
}

impl TimeWindow {
    pub fn new(min_hours: f64, max_hours: f64) -> Result<Self, FeedQueryError> {
        let in_range = |hours: f64| hours.is_finite() && (0.0..=MAX_WINDOW_HOURS).contains(&hours);
        if !in_range(min_hours) || !in_range(max_hours) || min_hours > max_hours {
            return Err(FeedQueryError::TimeWindow);
        }
        Ok(Self {
            min_hours,
            max_hours,
        })
    }

    /// Window reaching back `max_hours` from now.
    pub fn last_hours(max_hours: f64) -> Result<Self, FeedQueryError> {
        Self::new(0.0, max_hours)
    }

    fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        (now - hours(self.max_hours), now - hours(self.min_hours))
    }
}

// Bounded by MAX_WINDOW_HOURS, so the cast cannot overflow.
fn hours(value: f64) -> Duration {
    Duration::milliseconds((value * 3_600_000.0).round() as i64)
}

/// Validated feed request.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedQuery {
    categories: Vec<IncidentCategory>,
    window: Option<TimeWindow>,
    origin: Option<GeoPoint>,
    max_distance_km: Option<f64>,
    sort: FeedSort,
    page: PageParams,
}

impl FeedQuery {
    /// Feed of everything, newest first.
    pub fn new(page: PageParams) -> Self {
        Self {
            categories: Vec::new(),
            window: None,
            origin: None,
            max_distance_km: None,
            sort: FeedSort::default(),
            page,
        }
    }

    /// Restrict to the given categories; an empty list means all.
    #[must_use]
    pub fn with_categories(mut self, mut categories: Vec<IncidentCategory>) -> Self {
        categories.sort_by_key(|category| category.as_str());
        categories.dedup();
        self.categories = categories;
        self
    }

    #[must_use]
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = Some(window);
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: GeoPoint) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Hard distance bound, only applied when an origin is present.
    pub fn with_max_distance(mut self, km: f64) -> Result<Self, FeedQueryError> {
        if !km.is_finite() || km <= 0.0 || km > MAX_DISTANCE_KM {
            return Err(FeedQueryError::Distance);
        }
        self.max_distance_km = Some(km);
        Ok(self)
    }

    #[must_use]
    pub fn with_sort(mut self, sort: FeedSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn categories(&self) -> &[IncidentCategory] {
        &self.categories
    }

    pub fn origin(&self) -> Option<GeoPoint> {
        self.origin
    }

    pub fn sort(&self) -> FeedSort {
        self.sort
    }

    pub fn page(&self) -> &PageParams {
        &self.page
    }

    /// Sort actually applied: nearby without an origin falls back to newest.
    pub fn effective_sort(&self) -> FeedSort {
        match (self.sort, self.origin) {
            (FeedSort::NearbyAlerts, None) => FeedSort::Newest,
            (sort, _) => sort,
        }
    }

    /// Distance bound in force, if any.
    pub fn distance_cap_km(&self) -> Option<f64> {
        self.origin?;
        match (self.max_distance_km, self.sort) {
            (Some(km), _) => Some(km),
            (None, FeedSort::NearbyAlerts) => Some(NEARBY_DEFAULT_RADIUS_KM),
            (None, _) => None,
        }
    }

    /// Build the store filter and decode the cursor.
    pub fn plan(&self, now: DateTime<Utc>) -> Result<FeedPlan, FeedQueryError> {
        let sort = self.effective_sort();
        let after = self
            .page
            .cursor()
            .map(Cursor::<FeedCursorKey>::decode)
            .transpose()?
            .map(Cursor::into_key);
        if after.is_some_and(|key| key.sort != sort) {
            return Err(FeedQueryError::CursorSortMismatch);
        }

        let (created_after, created_before) = self
            .window
            .map(|window| window.bounds(now))
            .map_or((None, None), |(from, to)| (Some(from), Some(to)));
        let distance_cap = self.distance_cap_km();
        let bounding_box = self
            .origin
            .zip(distance_cap)
            .map(|(origin, km)| origin.bounding_box(km));

        let after = after.map(|key| key.position);
        let limit = self.page.limit();
        // Exact distance checks happen in process, so the store cannot stop early.
        let seek = (sort != FeedSort::NearbyAlerts && distance_cap.is_none()).then_some(FeedSeek {
            sort,
            after,
            limit: limit + 1,
        });

        Ok(FeedPlan {
            filter: FeedFilter {
                categories: self.categories.clone(),
                created_after,
                created_before,
                bounding_box,
                seek,
            },
            sort,
            origin: self.origin,
            distance_cap,
            after,
            limit,
        })
    }
}

/// Predicate pushed down to the alert store. Only verified alerts are
/// returned by stores regardless of the filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedFilter {
    pub categories: Vec<IncidentCategory>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub bounding_box: Option<BoundingBox>,
    /// Store-side ordering, keyset and row limit; `None` means read every
    /// matching row.
    pub seek: Option<FeedSeek>,
}

/// Keyset read for orderings that do not depend on distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedSeek {
    pub sort: FeedSort,
    /// Return only rows ordered strictly after this key.
    pub after: Option<SortKey>,
    /// Maximum rows to return, one more than the page size.
    pub limit: usize,
}

impl FeedSeek {
    /// In-memory evaluation of the seek, used by test doubles.
    pub fn apply(&self, mut entries: Vec<FeedEntry>) -> Vec<FeedEntry> {
        entries.retain(|entry| {
            self.after.is_none_or(|after| {
                compare(self.sort, &SortKey::of(&entry.alert, None), &after) == Ordering::Greater
            })
        });
        entries.sort_by(|a, b| {
            compare(
                self.sort,
                &SortKey::of(&a.alert, None),
                &SortKey::of(&b.alert, None),
            )
        });
        entries.truncate(self.limit);
        entries
    }
}

impl FeedFilter {
    /// In-memory evaluation of the filter, used by test doubles.
    pub fn matches(&self, alert: &Alert) -> bool {
        let category_ok =
            self.categories.is_empty() || self.categories.contains(&alert.category());
        let after_ok = self
            .created_after
            .is_none_or(|from| alert.created_at() >= from);
        let before_ok = self
            .created_before
            .is_none_or(|to| alert.created_at() <= to);
        let point = alert.point();
        let bbox_ok = self.bounding_box.is_none_or(|bbox| {
            (bbox.min_latitude..=bbox.max_latitude).contains(&point.latitude())
                && (bbox.min_longitude..=bbox.max_longitude).contains(&point.longitude())
        });
        category_ok && after_ok && before_ok && bbox_ok
    }
}

/// Alert joined with its owner's public display name.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub alert: Alert,
    pub owner_name: Option<DisplayName>,
}

/// Feed entry with its distance from the request origin.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedItem {
    pub alert: Alert,
    pub owner_name: Option<DisplayName>,
    pub distance_km: Option<f64>,
}

impl FeedItem {
    fn key(&self) -> SortKey {
        SortKey::of(&self.alert, self.distance_km)
    }
}

/// Values every ordering reads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortKey {
    pub created_at_micros: i64,
    pub flag_count: u32,
    pub like_count: u32,
    /// Carried as IEEE-754 bits so a decoded cursor compares equal to the
    /// item it was issued for.
    #[serde(
        default,
        rename = "distanceBits",
        skip_serializing_if = "Option::is_none",
        with = "distance_bits"
    )]
    pub distance_km: Option<f64>,
    pub id: Uuid,
}

impl SortKey {
    pub fn of(alert: &Alert, distance_km: Option<f64>) -> Self {
        Self {
            created_at_micros: alert.created_at().timestamp_micros(),
            flag_count: alert.flag_count(),
            like_count: alert.like_count(),
            distance_km,
            id: *alert.id().as_uuid(),
        }
    }

    /// Creation time at the key's microsecond precision.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_micros(self.created_at_micros)
    }
}

mod distance_bits {
    use super::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
        value.map(f64::to_bits).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(f64::from_bits))
    }
}

/// Cursor payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedCursorKey {
    pub sort: FeedSort,
    pub position: SortKey,
}

/// Total order for a sort mode. Ties end on the alert id.
pub fn compare(sort: FeedSort, a: &SortKey, b: &SortKey) -> Ordering {
    let newest = || b.created_at_micros.cmp(&a.created_at_micros);
    let primary = match sort {
        FeedSort::Newest => newest(),
        FeedSort::Oldest => a.created_at_micros.cmp(&b.created_at_micros),
        FeedSort::MostReported => b.flag_count.cmp(&a.flag_count).then_with(newest),
        FeedSort::MostRelevant => b.like_count.cmp(&a.like_count).then_with(newest),
        FeedSort::NearbyAlerts => {
            let distance = |key: &SortKey| key.distance_km.unwrap_or(f64::INFINITY);
            distance(a).total_cmp(&distance(b))
        }
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

/// Executable form of a [`FeedQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPlan {
    pub filter: FeedFilter,
    sort: FeedSort,
    origin: Option<GeoPoint>,
    distance_cap: Option<f64>,
    after: Option<SortKey>,
    limit: usize,
}

impl FeedPlan {
    pub fn sort(&self) -> FeedSort {
        self.sort
    }

    /// Measure, filter, order and page the candidates returned by the store.
    pub fn assemble(&self, candidates: Vec<FeedEntry>) -> Result<Page<FeedItem>, CursorError> {
        let mut items: Vec<(SortKey, FeedItem)> = candidates
            .into_iter()
            .filter(|entry| self.filter.matches(&entry.alert))
            .filter_map(|FeedEntry { alert, owner_name }| {
                let distance_km = self
                    .origin
                    .map(|origin| origin.distance_km(&alert.point()));
                let beyond_cap = distance_km
                    .zip(self.distance_cap)
                    .is_some_and(|(distance, cap)| distance > cap);
                if beyond_cap {
                    return None;
                }
                let item = FeedItem {
                    alert,
                    owner_name,
                    distance_km,
                };
                Some((item.key(), item))
            })
            .filter(|(key, _)| {
                self.after
                    .is_none_or(|after| compare(self.sort, key, &after) == Ordering::Greater)
            })
            .collect();
        items.sort_by(|(a, _), (b, _)| compare(self.sort, a, b));

        let has_more = items.len() > self.limit;
        items.truncate(self.limit);
        let next_cursor = match items.last() {
            Some((position, _)) if has_more => Some(
                Cursor::new(FeedCursorKey {
                    sort: self.sort,
                    position: *position,
                })
                .encode()?,
            ),
            _ => None,
        };
        let data = items.into_iter().map(|(_, item)| item).collect();
        Ok(Page::new(data, self.limit, next_cursor))
    }
}
