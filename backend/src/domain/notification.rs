//! Per-user notifications.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alert::AlertId;
use super::user::UserId;

/// Maximum title length.
pub const TITLE_MAX: usize = 120;
/// Maximum body length.
pub const BODY_MAX: usize = 1_000;

/// Stable notification identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(Uuid);

impl NotificationId {
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

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed set of notification categories, labelled as clients display them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationCategory {
    #[serde(rename = "Scam Alert")]
    ScamAlert,
    #[serde(rename = "Event Cancellation")]
    EventCancellation,
    #[serde(rename = "Weather Warning")]
    WeatherWarning,
    #[serde(rename = "Your Rewards")]
    Rewards,
    #[serde(rename = "You're Promoted")]
    Promotion,
}

impl NotificationCategory {
    pub const ALL: [Self; 5] = [
        Self::ScamAlert,
        Self::EventCancellation,
        Self::WeatherWarning,
        Self::Rewards,
        Self::Promotion,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::ScamAlert => "Scam Alert",
            Self::EventCancellation => "Event Cancellation",
            Self::WeatherWarning => "Weather Warning",
            Self::Rewards => "Your Rewards",
            Self::Promotion => "You're Promoted",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.label() == label)
    }
}

/// Validation errors for notification content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
    #[error("message must not be empty")]
    EmptyBody,
    #[error("message must be at most {max} characters")]
    BodyTooLong { max: usize },
}

impl NotificationValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyTitle | Self::TitleTooLong { .. } => "title",
            Self::EmptyBody | Self::BodyTooLong { .. } => "message",
        }
    }
}

/// Validated notification content shared by every recipient of a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    category: NotificationCategory,
    title: String,
    body: String,
    alert_id: Option<AlertId>,
}

impl NotificationContent {
    pub fn new(
        category: NotificationCategory,
        title: &str,
        body: &str,
        alert_id: Option<AlertId>,
    ) -> Result<Self, NotificationValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(NotificationValidationError::EmptyTitle);
        }
        if title.chars().count() > TITLE_MAX {
            return Err(NotificationValidationError::TitleTooLong { max: TITLE_MAX });
        }
        let body = body.trim();
        if body.is_empty() {
            return Err(NotificationValidationError::EmptyBody);
        }
        if body.chars().count() > BODY_MAX {
            return Err(NotificationValidationError::BodyTooLong { max: BODY_MAX });
        }
        Ok(Self {
            category,
            title: title.to_owned(),
            body: body.to_owned(),
            alert_id,
        })
    }

    pub fn category(&self) -> NotificationCategory {
        self.category
    }

    pub fn alert_id(&self) -> Option<AlertId> {
        self.alert_id
    }
}

/// Stored notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    id: NotificationId,
    recipient: UserId,
    category: NotificationCategory,
    title: String,
    body: String,
    read: bool,
    alert_id: Option<AlertId>,
    show_less: bool,
    created_at: DateTime<Utc>,
}

/// Field bundle used to rebuild a [`Notification`] from storage.
#[derive(Debug, Clone)]
pub struct NotificationRecord {
    pub id: NotificationId,
    pub recipient: UserId,
    pub category: NotificationCategory,
    pub title: String,
    pub body: String,
    pub read: bool,
    pub alert_id: Option<AlertId>,
    pub show_less: bool,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRecord> for Notification {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            recipient: record.recipient,
            category: record.category,
            title: record.title,
            body: record.body,
            read: record.read,
            alert_id: record.alert_id,
            show_less: record.show_less,
            created_at: record.created_at,
        }
    }
}

impl Notification {
    /// New unread notification for one recipient.
    pub fn deliver(recipient: UserId, content: &NotificationContent, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::random(),
            recipient,
            category: content.category,
            title: content.title.clone(),
            body: content.body.clone(),
            read: false,
            alert_id: content.alert_id,
            show_less: false,
            created_at: now,
        }
    }

    pub fn id(&self) -> NotificationId {
        self.id
    }

    pub fn recipient(&self) -> UserId {
        self.recipient
    }

    pub fn category(&self) -> NotificationCategory {
        self.category
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn is_read(&self) -> bool {
        self.read
    }

    pub fn alert_id(&self) -> Option<AlertId> {
        self.alert_id
    }

    pub fn show_less(&self) -> bool {
        self.show_less
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.recipient == user
    }

    pub fn mark_read(&mut self) {
        self.read = true;
    }

    pub fn mark_show_less(&mut self) {
        self.show_less = true;
    }

    /// Keyset position for newest-first listing.
    pub fn list_key(&self) -> NotificationListKey {
        NotificationListKey {
            created_at: self.created_at,
            id: *self.id.as_uuid(),
        }
    }
}

/// Cursor payload for notification listing: newest first, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListKey {
    pub created_at: DateTime<Utc>,
    pub id: Uuid,
}

impl NotificationListKey {
    /// Whether `other` is listed strictly after `self`.
    pub fn precedes(&self, other: &Self) -> bool {
        (other.created_at, other.id) < (self.created_at, self.id)
    }
}
