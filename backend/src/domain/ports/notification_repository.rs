//! Port for notification persistence.

use async_trait::async_trait;

use crate::domain::{Notification, NotificationId, NotificationListKey, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by notification repository adapters.
    pub enum NotificationPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "notification repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "notification repository query failed: {message}",
    }
}

/// Notification store port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: &Notification)
    -> Result<(), NotificationPersistenceError>;

    async fn find_by_id(
        &self,
        id: &NotificationId,
    ) -> Result<Option<Notification>, NotificationPersistenceError>;

    /// Recipient's notifications, newest first, strictly after `after`.
    async fn list_for_recipient(
        &self,
        recipient: &UserId,
        after: Option<NotificationListKey>,
        limit: usize,
    ) -> Result<Vec<Notification>, NotificationPersistenceError>;

    /// Persist the read and show-less flags.
    async fn update(&self, notification: &Notification)
    -> Result<(), NotificationPersistenceError>;

    /// Remove a notification, returning whether a row was deleted.
    async fn delete(&self, id: &NotificationId) -> Result<bool, NotificationPersistenceError>;
}

/// Empty store used when no database is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureNotificationRepository;

#[async_trait]
impl NotificationRepository for FixtureNotificationRepository {
    async fn insert(
        &self,
        _notification: &Notification,
    ) -> Result<(), NotificationPersistenceError> {
        Err(NotificationPersistenceError::connection(
            "no database configured",
        ))
    }

    async fn find_by_id(
        &self,
        _id: &NotificationId,
    ) -> Result<Option<Notification>, NotificationPersistenceError> {
        Ok(None)
    }

    async fn list_for_recipient(
        &self,
        _recipient: &UserId,
        _after: Option<NotificationListKey>,
        _limit: usize,
    ) -> Result<Vec<Notification>, NotificationPersistenceError> {
        Ok(Vec::new())
    }

    async fn update(
        &self,
        _notification: &Notification,
    ) -> Result<(), NotificationPersistenceError> {
        Ok(())
    }

    async fn delete(&self, _id: &NotificationId) -> Result<bool, NotificationPersistenceError> {
        Ok(false)
    }
}
