//! PostgreSQL-backed `NotificationRepository`.
//!
//! Listing uses keyset pagination over `(created_at DESC, id DESC)`, backed
//! by the `notifications_recipient_created_idx` index.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{NotificationPersistenceError, NotificationRepository};
use crate::domain::{
    AlertId, Notification, NotificationCategory, NotificationId, NotificationListKey,
    NotificationRecord, UserId,
};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{NotificationRow, NotificationUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::notifications;

/// Diesel-backed implementation of the notification repository port.
#[derive(Clone)]
pub struct DieselNotificationRepository {
    pool: DbPool,
}

impl DieselNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> NotificationPersistenceError {
    map_basic_pool_error(error, NotificationPersistenceError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> NotificationPersistenceError {
    map_basic_diesel_error(
        error,
        NotificationPersistenceError::query,
        NotificationPersistenceError::connection,
    )
}

fn notification_to_row(notification: &Notification) -> NotificationRow {
    NotificationRow {
        id: *notification.id().as_uuid(),
        recipient_id: *notification.recipient().as_uuid(),
        category: notification.category().label().to_owned(),
        title: notification.title().to_owned(),
        body: notification.body().to_owned(),
        is_read: notification.is_read(),
        alert_id: notification.alert_id().map(|id| *id.as_uuid()),
        show_less: notification.show_less(),
        created_at: notification.created_at(),
    }
}

fn row_to_notification(row: NotificationRow) -> Result<Notification, NotificationPersistenceError> {
    let category = NotificationCategory::from_label(&row.category).ok_or_else(|| {
        NotificationPersistenceError::query(format!(
            "unknown notification category: {}",
            row.category
        ))
    })?;

    Ok(Notification::from(NotificationRecord {
        id: NotificationId::from_uuid(row.id),
        recipient: UserId::from_uuid(row.recipient_id),
        category,
        title: row.title,
        body: row.body,
        read: row.is_read,
        alert_id: row.alert_id.map(AlertId::from_uuid),
        show_less: row.show_less,
        created_at: row.created_at,
    }))
}

#[async_trait]
impl NotificationRepository for DieselNotificationRepository {
    async fn insert(
        &self,
        notification: &Notification,
    ) -> Result<(), NotificationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(notifications::table)
            .values(notification_to_row(notification))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, NotificationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        notifications::table
            .find(*id.as_uuid())
            .select(NotificationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
            .map(row_to_notification)
            .transpose()
    }

    async fn list_for_recipient(
        &self,
        recipient: &UserId,
        after: Option<NotificationListKey>,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut query = notifications::table
            .filter(notifications::recipient_id.eq(recipient.as_uuid()))
            .select(NotificationRow::as_select())
            .order((notifications::created_at.desc(), notifications::id.desc()))
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .into_boxed();

        if let Some(key) = after {
            query = query.filter(
                notifications::created_at.lt(key.created_at).or(notifications::created_at
                    .eq(key.created_at)
                    .and(notifications::id.lt(key.id))),
            );
        }

        let rows: Vec<NotificationRow> = query.load(&mut conn).await.map_err(map_diesel_error)?;
        rows.into_iter().map(row_to_notification).collect()
    }

    async fn update(
        &self,
        notification: &Notification,
    ) -> Result<(), NotificationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::update(notifications::table.find(*notification.id().as_uuid()))
            .set(NotificationUpdate {
                is_read: notification.is_read(),
                show_less: notification.show_less(),
            })
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(())
    }

    async fn delete(&self, id: &NotificationId) -> Result<bool, NotificationPersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let deleted = diesel::delete(notifications::table.find(*id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rstest::rstest;

    use super::*;
    use crate::domain::NotificationContent;

    fn delivered() -> Notification {
        let content = NotificationContent::new(
            NotificationCategory::WeatherWarning,
            "Storm warning",
            "Gusts of 70mph expected after 6pm",
            Some(AlertId::random()),
        )
        .expect("content");
        Notification::deliver(UserId::random(), &content, Utc::now())
    }

    #[rstest]
    fn notification_round_trips_through_its_row() {
        let mut notification = delivered();
        notification.mark_read();

        let restored = row_to_notification(notification_to_row(&notification)).expect("row");

        assert_eq!(restored, notification);
    }

    #[rstest]
    fn category_is_stored_as_its_label() {
        let row = notification_to_row(&delivered());

        assert_eq!(row.category, "Weather Warning");
    }

    #[rstest]
    fn unknown_category_is_a_query_error() {
        let mut row = notification_to_row(&delivered());
        row.category = "Newsletter".to_owned();

        assert!(matches!(
            row_to_notification(row),
            Err(NotificationPersistenceError::Query { .. })
        ));
    }
}
