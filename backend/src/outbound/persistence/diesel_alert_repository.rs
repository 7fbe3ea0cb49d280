//! PostgreSQL-backed `AlertRepository`.
//!
//! Engagement mutations lock the alert row with `SELECT ... FOR UPDATE`, then
//! touch the membership table and the denormalised counter inside the same
//! transaction, so concurrent likes and flags serialise per alert and the
//! counters always equal the membership row counts.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, RunQueryDsl};
use uuid::Uuid;

use crate::domain::ports::{AlertPersistenceError, AlertRepository};
use crate::domain::{
    Alert, AlertId, AlertRecord, DisplayName, FeedEntry, FeedFilter, FeedSort,
    FlagOutcome, GeoPoint, IncidentCategory, LikeToggle, ModerationStatus, UserId,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::diesel_helpers::{count_for_db, count_from_db};
use super::models::{AlertRow, NewAlertFlagRow, NewAlertLikeRow, NewAlertRow};
use super::pool::{DbPool, PoolError};
use super::schema::{alert_flags, alert_likes, alerts, users};

/// Diesel-backed implementation of the alert repository port.
#[derive(Clone)]
pub struct DieselAlertRepository {
    pool: DbPool,
}

impl DieselAlertRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Failures inside an engagement transaction.
#[derive(Debug, thiserror::Error)]
enum EngagementTxError {
    #[error(transparent)]
    Diesel(#[from] diesel::result::Error),
    #[error("stored moderation status is invalid: {0}")]
    Status(String),
}

fn map_pool_error(error: PoolError) -> AlertPersistenceError {
    map_basic_pool_error(error, AlertPersistenceError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> AlertPersistenceError {
    map_basic_diesel_error(
        error,
        AlertPersistenceError::query,
        AlertPersistenceError::connection,
    )
}

fn map_tx_error(error: EngagementTxError) -> AlertPersistenceError {
    match error {
        EngagementTxError::Diesel(err) => map_diesel_error(err),
        other @ EngagementTxError::Status(_) => AlertPersistenceError::query(other.to_string()),
    }
}

fn row_to_alert(row: AlertRow) -> Result<Alert, AlertPersistenceError> {
    let category = IncidentCategory::parse(&row.incident_type).ok_or_else(|| {
        AlertPersistenceError::query(format!("unknown incident type: {}", row.incident_type))
    })?;
    let status = ModerationStatus::parse(&row.status).ok_or_else(|| {
        AlertPersistenceError::query(format!("unknown moderation status: {}", row.status))
    })?;
    let point = GeoPoint::new(row.longitude, row.latitude)
        .map_err(|err| AlertPersistenceError::query(format!("stored coordinates: {err}")))?;

    Ok(Alert::from(AlertRecord {
        id: AlertId::from_uuid(row.id),
        owner: UserId::from_uuid(row.owner_id),
        category,
        other_description: row.other_description,
        location: row.location,
        point,
        description: row.description,
        images: row.images,
        status,
        like_count: count_from_db(row.like_count),
        flag_count: count_from_db(row.flag_count),
        share_count: count_from_db(row.share_count),
        created_at: row.created_at,
    }))
}

fn row_to_entry(
    (row, owner_name): (AlertRow, Option<String>),
) -> Result<FeedEntry, AlertPersistenceError> {
    let alert = row_to_alert(row)?;
    // A name that no longer validates is dropped rather than failing the feed.
    let owner_name = owner_name.and_then(|name| DisplayName::new(name).ok());
    Ok(FeedEntry { alert, owner_name })
}

/// Result of a locked flag insert, converted to a [`FlagOutcome`] by the caller.
struct FlagWrite {
    newly_flagged: bool,
    flag_count: i32,
    status: ModerationStatus,
}

#[async_trait]
impl AlertRepository for DieselAlertRepository {
    async fn insert(&self, alert: &Alert) -> Result<(), AlertPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let point = alert.point();
        let row = NewAlertRow {
            id: *alert.id().as_uuid(),
            owner_id: *alert.owner().as_uuid(),
            incident_type: alert.category().as_str(),
            other_description: alert.other_description(),
            location: alert.location(),
            longitude: point.longitude(),
            latitude: point.latitude(),
            description: alert.description(),
            images: alert.images(),
            status: alert.status().as_str(),
            like_count: count_for_db(alert.like_count()),
            flag_count: count_for_db(alert.flag_count()),
            share_count: count_for_db(alert.share_count()),
            created_at: alert.created_at(),
        };

        diesel::insert_into(alerts::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_entry(&self, id: &AlertId) -> Result<Option<FeedEntry>, AlertPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        alerts::table
            .inner_join(users::table)
            .filter(alerts::id.eq(id.as_uuid()))
            .select((AlertRow::as_select(), users::display_name))
            .first::<(AlertRow, Option<String>)>(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_entry)
            .transpose()
    }

    async fn list_feed_candidates(
        &self,
        filter: &FeedFilter,
    ) -> Result<Vec<FeedEntry>, AlertPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = alerts::table
            .inner_join(users::table)
            .filter(alerts::status.eq(ModerationStatus::Verified.as_str()))
            .select((AlertRow::as_select(), users::display_name))
            .into_boxed();

        if !filter.categories.is_empty() {
            let labels: Vec<&str> = filter
                .categories
                .iter()
                .map(|category| category.as_str())
                .collect();
            query = query.filter(alerts::incident_type.eq_any(labels));
        }
        if let Some(from) = filter.created_after {
            query = query.filter(alerts::created_at.ge(from));
        }
        if let Some(to) = filter.created_before {
            query = query.filter(alerts::created_at.le(to));
        }
        if let Some(bbox) = filter.bounding_box {
            query = query
                .filter(alerts::latitude.between(bbox.min_latitude, bbox.max_latitude))
                .filter(alerts::longitude.between(bbox.min_longitude, bbox.max_longitude));
        }
        if let Some(seek) = filter.seek {
            // Orders mirror `domain::feed::compare`: the primary column, recency
            // for the engagement sorts, then ascending id.
            query = match seek.sort {
                FeedSort::Oldest => query.order((alerts::created_at.asc(), alerts::id.asc())),
                FeedSort::MostReported => query.order((
                    alerts::flag_count.desc(),
                    alerts::created_at.desc(),
                    alerts::id.asc(),
                )),
                FeedSort::MostRelevant => query.order((
                    alerts::like_count.desc(),
                    alerts::created_at.desc(),
                    alerts::id.asc(),
                )),
                FeedSort::Newest | FeedSort::NearbyAlerts => {
                    query.order((alerts::created_at.desc(), alerts::id.asc()))
                }
            };
            if let Some(after) = seek.after {
                let created = after
                    .created_at()
                    .ok_or_else(|| AlertPersistenceError::query("cursor timestamp out of range"))?;
                let id = after.id;
                let later = alerts::created_at
                    .lt(created)
                    .or(alerts::created_at.eq(created).and(alerts::id.gt(id)));
                query = match seek.sort {
                    FeedSort::Oldest => query.filter(
                        alerts::created_at
                            .gt(created)
                            .or(alerts::created_at.eq(created).and(alerts::id.gt(id))),
                    ),
                    FeedSort::MostReported => {
                        let flags = count_for_db(after.flag_count);
                        query.filter(
                            alerts::flag_count
                                .lt(flags)
                                .or(alerts::flag_count.eq(flags).and(later)),
                        )
                    }
                    FeedSort::MostRelevant => {
                        let likes = count_for_db(after.like_count);
                        query.filter(
                            alerts::like_count
                                .lt(likes)
                                .or(alerts::like_count.eq(likes).and(later)),
                        )
                    }
                    FeedSort::Newest | FeedSort::NearbyAlerts => query.filter(later),
                };
            }
            query = query.limit(i64::try_from(seek.limit).unwrap_or(i64::MAX));
        }

        let rows: Vec<(AlertRow, Option<String>)> = query
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_entry).collect()
    }

    async fn toggle_like(
        &self,
        alert_id: &AlertId,
        user_id: &UserId,
    ) -> Result<Option<LikeToggle>, AlertPersistenceError> {
        let alert = *alert_id.as_uuid();
        let user = *user_id.as_uuid();
        let now = Utc::now();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let toggled: Option<(bool, i32)> = conn
            .transaction(|conn| {
                async move {
                    if lock_alert(conn, alert).await?.is_none() {
                        return Ok(None);
                    }

                    let removed = diesel::delete(
                        alert_likes::table
                            .filter(alert_likes::alert_id.eq(alert))
                            .filter(alert_likes::user_id.eq(user)),
                    )
                    .execute(conn)
                    .await?;

                    let (liked, delta) = if removed > 0 {
                        (false, -1)
                    } else {
                        diesel::insert_into(alert_likes::table)
                            .values(NewAlertLikeRow {
                                alert_id: alert,
                                user_id: user,
                                created_at: now,
                            })
                            .execute(conn)
                            .await?;
                        (true, 1)
                    };

                    let like_count: i32 = diesel::update(alerts::table.find(alert))
                        .set(alerts::like_count.eq(alerts::like_count + delta))
                        .returning(alerts::like_count)
                        .get_result(conn)
                        .await?;

                    Ok(Some((liked, like_count)))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        Ok(toggled.map(|(liked, like_count)| LikeToggle {
            liked,
            like_count: count_from_db(like_count),
        }))
    }

    async fn add_flag(
        &self,
        alert_id: &AlertId,
        user_id: &UserId,
    ) -> Result<Option<FlagOutcome>, AlertPersistenceError> {
        let alert = *alert_id.as_uuid();
        let user = *user_id.as_uuid();
        let now = Utc::now();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let written: Option<FlagWrite> = conn
            .transaction(|conn| {
                async move {
                    let Some((flag_count, raw_status)) = lock_alert(conn, alert).await? else {
                        return Ok(None);
                    };
                    let status = ModerationStatus::parse(&raw_status)
                        .ok_or_else(|| EngagementTxError::Status(raw_status.clone()))?;

                    let inserted = diesel::insert_into(alert_flags::table)
                        .values(NewAlertFlagRow {
                            alert_id: alert,
                            user_id: user,
                            created_at: now,
                        })
                        .on_conflict_do_nothing()
                        .execute(conn)
                        .await?;
                    if inserted == 0 {
                        return Ok(Some(FlagWrite {
                            newly_flagged: false,
                            flag_count,
                            status,
                        }));
                    }

                    let next_count = flag_count.saturating_add(1);
                    let next_status = status.after_flag(count_from_db(next_count));
                    diesel::update(alerts::table.find(alert))
                        .set((
                            alerts::flag_count.eq(next_count),
                            alerts::status.eq(next_status.as_str()),
                        ))
                        .execute(conn)
                        .await?;

                    Ok(Some(FlagWrite {
                        newly_flagged: true,
                        flag_count: next_count,
                        status: next_status,
                    }))
                }
                .scope_boxed()
            })
            .await
            .map_err(map_tx_error)?;

        Ok(written.map(|write| FlagOutcome {
            newly_flagged: write.newly_flagged,
            flag_count: count_from_db(write.flag_count),
            status: write.status,
        }))
    }

    async fn increment_share(
        &self,
        alert_id: &AlertId,
    ) -> Result<Option<u32>, AlertPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let shares: Option<i32> = diesel::update(alerts::table.find(*alert_id.as_uuid()))
            .set(alerts::share_count.eq(alerts::share_count + 1))
            .returning(alerts::share_count)
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(shares.map(count_from_db))
    }
}

/// Lock the alert row for the rest of the transaction and return its flag
/// count and status, or `None` when the alert does not exist.
async fn lock_alert(
    conn: &mut diesel_async::AsyncPgConnection,
    alert: Uuid,
) -> Result<Option<(i32, String)>, diesel::result::Error> {
    alerts::table
        .find(alert)
        .select((alerts::flag_count, alerts::status))
        .for_update()
        .first(conn)
        .await
        .optional()
}

#[cfg(test)]
mod tests {
    //! Row mapping coverage; transactional paths run in the integration suite.

    use chrono::DateTime;
    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn row() -> AlertRow {
        AlertRow {
            id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            incident_type: "PublicDisorder".to_owned(),
            other_description: None,
            location: "Grassmarket".to_owned(),
            longitude: -3.1955,
            latitude: 55.9473,
            description: "Large crowd blocking the street".to_owned(),
            images: vec!["/uploads/a.jpg".to_owned()],
            status: "verified".to_owned(),
            like_count: 4,
            flag_count: 1,
            share_count: 9,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    #[rstest]
    fn row_converts_with_counters(row: AlertRow) {
        let alert = row_to_alert(row).expect("valid row");

        assert_eq!(alert.category(), IncidentCategory::PublicDisorder);
        assert_eq!(alert.status(), ModerationStatus::Verified);
        assert_eq!(
            (alert.like_count(), alert.flag_count(), alert.share_count()),
            (4, 1, 9)
        );
    }

    #[rstest]
    #[case::category("incident_type")]
    #[case::status("status")]
    #[case::coordinates("latitude")]
    fn corrupted_columns_are_query_errors(mut row: AlertRow, #[case] column: &str) {
        match column {
            "incident_type" => row.incident_type = "Volcano".to_owned(),
            "status" => row.status = "archived".to_owned(),
            _ => row.latitude = 123.0,
        }

        let err = row_to_alert(row).expect_err("corrupted row");

        assert!(matches!(err, AlertPersistenceError::Query { .. }));
    }

    #[rstest]
    fn invalid_owner_name_is_dropped(row: AlertRow) {
        let entry = row_to_entry((row, Some(String::new()))).expect("entry");

        assert!(entry.owner_name.is_none());
    }

    #[rstest]
    fn status_failures_inside_a_transaction_are_query_errors() {
        let mapped = map_tx_error(EngagementTxError::Status("archived".to_owned()));

        assert!(mapped.to_string().contains("archived"));
        assert!(matches!(mapped, AlertPersistenceError::Query { .. }));
    }
}
