//! Driving port for notification use-cases.

use async_trait::async_trait;
use pagination::{Page, PageParams};

use crate::domain::{Error, Notification, NotificationContent, NotificationId, UserId};

/// Notification reads and mutations scoped to the calling user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationCommand: Send + Sync {
    /// Caller's notifications, newest first.
    async fn list(&self, caller: UserId, page: PageParams) -> Result<Page<Notification>, Error>;

    async fn mark_read(&self, caller: UserId, id: NotificationId) -> Result<Notification, Error>;

    async fn show_less(&self, caller: UserId, id: NotificationId) -> Result<Notification, Error>;

    async fn delete(&self, caller: UserId, id: NotificationId) -> Result<(), Error>;

    /// Deliver the content to every user.
    async fn broadcast(&self, content: NotificationContent) -> Result<Vec<Notification>, Error>;
}
