//! Notification service: owner-scoped reads and mutations plus broadcast
//! fan-out.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::{Cursor, Page, PageParams};
use tracing::{info, warn};

use crate::domain::alert_service::map_alert_repository_error;
use crate::domain::ports::{
    AlertRepository, NotificationCommand, NotificationPersistenceError, NotificationRepository,
    UserPersistenceError, UserRepository,
};
use crate::domain::{
    Error, Notification, NotificationContent, NotificationId, NotificationListKey, UserId,
};

fn map_repository_error(error: NotificationPersistenceError) -> Error {
    match error {
        NotificationPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("notification repository unavailable: {message}"))
        }
        NotificationPersistenceError::Query { message } => {
            Error::internal(format!("notification repository error: {message}"))
        }
    }
}

fn map_user_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        other => Error::internal(format!("user repository error: {other}")),
    }
}

/// Notification service implementing [`NotificationCommand`].
#[derive(Clone)]
pub struct NotificationService<N, U, A> {
    notifications: Arc<N>,
    users: Arc<U>,
    alerts: Arc<A>,
    clock: Arc<dyn Clock>,
}

impl<N, U, A> NotificationService<N, U, A> {
    pub fn new(
        notifications: Arc<N>,
        users: Arc<U>,
        alerts: Arc<A>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            notifications,
            users,
            alerts,
            clock,
        }
    }
}

impl<N, U, A> NotificationService<N, U, A>
where
    N: NotificationRepository,
    U: UserRepository,
    A: AlertRepository,
{
    /// Load a notification the caller owns: 404 when missing, 403 when it
    /// belongs to someone else.
    async fn owned(&self, caller: UserId, id: NotificationId) -> Result<Notification, Error> {
        let notification = self
            .notifications
            .find_by_id(&id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::not_found(format!("notification {id} not found")))?;
        if !notification.is_owned_by(&caller) {
            return Err(Error::forbidden(
                "notification belongs to another user",
            ));
        }
        Ok(notification)
    }
}

#[async_trait]
impl<N, U, A> NotificationCommand for NotificationService<N, U, A>
where
    N: NotificationRepository,
    U: UserRepository,
    A: AlertRepository,
{
    async fn list(&self, caller: UserId, page: PageParams) -> Result<Page<Notification>, Error> {
        let after = page
            .cursor()
            .map(Cursor::<NotificationListKey>::decode)
            .transpose()
            .map_err(|err| Error::invalid_request(format!("invalid cursor: {err}")))?
            .map(Cursor::into_key);
        let limit = page.limit();
        let mut rows = self
            .notifications
            .list_for_recipient(&caller, after, limit + 1)
            .await
            .map_err(map_repository_error)?;

        let has_more = rows.len() > limit;
        rows.truncate(limit);
        let next_cursor = match rows.last() {
            Some(last) if has_more => Some(
                Cursor::new(last.list_key())
                    .encode()
                    .map_err(|err| Error::internal(err.to_string()))?,
            ),
            _ => None,
        };
        Ok(Page::new(rows, limit, next_cursor))
    }

    async fn mark_read(&self, caller: UserId, id: NotificationId) -> Result<Notification, Error> {
        let mut notification = self.owned(caller, id).await?;
        notification.mark_read();
        self.notifications
            .update(&notification)
            .await
            .map_err(map_repository_error)?;
        Ok(notification)
    }

    async fn show_less(&self, caller: UserId, id: NotificationId) -> Result<Notification, Error> {
        let mut notification = self.owned(caller, id).await?;
        notification.mark_show_less();
        self.notifications
            .update(&notification)
            .await
            .map_err(map_repository_error)?;
        Ok(notification)
    }

    async fn delete(&self, caller: UserId, id: NotificationId) -> Result<(), Error> {
        self.owned(caller, id).await?;
        let deleted = self
            .notifications
            .delete(&id)
            .await
            .map_err(map_repository_error)?;
        if !deleted {
            return Err(Error::not_found(format!("notification {id} not found")));
        }
        Ok(())
    }

    /// Fan out one notification per user once any linked alert is known to
    /// exist. Inserts are independent; the first failure stops the loop and
    /// earlier deliveries are kept.
    async fn broadcast(&self, content: NotificationContent) -> Result<Vec<Notification>, Error> {
        if let Some(alert_id) = content.alert_id() {
            self.alerts
                .find_entry(&alert_id)
                .await
                .map_err(map_alert_repository_error)?
                .ok_or_else(|| Error::not_found(format!("alert {alert_id} not found")))?;
        }
        let recipients = self.users.list_ids().await.map_err(map_user_error)?;
        let now = self.clock.utc();
        let mut delivered = Vec::with_capacity(recipients.len());
        for recipient in recipients {
            let notification = Notification::deliver(recipient, &content, now);
            if let Err(err) = self.notifications.insert(&notification).await {
                warn!(
                    delivered = delivered.len(),
                    error = %err,
                    "broadcast stopped after a failed insert"
                );
                return Err(map_repository_error(err));
            }
            delivered.push(notification);
        }
        info!(
            recipients = delivered.len(),
            category = content.category().label(),
            "notification broadcast"
        );
        Ok(delivered)
    }
}

#[cfg(test)]
#[path = "notification_service_tests.rs"]
mod tests;
