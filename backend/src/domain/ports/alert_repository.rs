//! Port for alert persistence, feed candidate reads and engagement
//! primitives.
//!
//! Like, flag and share mutations are atomic per call: adapters lock the
//! alert row, update the membership table and the denormalised counter in
//! one transaction. A `None` result means the alert does not exist.

use async_trait::async_trait;

use crate::domain::{Alert, AlertId, FeedEntry, FeedFilter, FlagOutcome, LikeToggle, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by alert repository adapters.
    pub enum AlertPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "alert repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "alert repository query failed: {message}",
    }
}

/// Alert store port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertRepository: Send + Sync {
    /// Persist a new alert.
    async fn insert(&self, alert: &Alert) -> Result<(), AlertPersistenceError>;

    /// Fetch an alert joined with its owner's display name.
    async fn find_entry(&self, id: &AlertId) -> Result<Option<FeedEntry>, AlertPersistenceError>;

    /// Verified alerts matching the pushed-down filter. Unordered unless the
    /// filter carries a seek, in which case rows come back in seek order,
    /// strictly after its key and at most its limit.
    async fn list_feed_candidates(
        &self,
        filter: &FeedFilter,
    ) -> Result<Vec<FeedEntry>, AlertPersistenceError>;

    /// Add or remove the user's like.
    async fn toggle_like(
        &self,
        alert_id: &AlertId,
        user_id: &UserId,
    ) -> Result<Option<LikeToggle>, AlertPersistenceError>;

    /// Record the user's flag once; repeated flags leave the counters alone.
    async fn add_flag(
        &self,
        alert_id: &AlertId,
        user_id: &UserId,
    ) -> Result<Option<FlagOutcome>, AlertPersistenceError>;

    /// Increment the share counter and return the new value.
    async fn increment_share(&self, alert_id: &AlertId)
    -> Result<Option<u32>, AlertPersistenceError>;
}

/// Empty store used when no database is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureAlertRepository;

#[async_trait]
impl AlertRepository for FixtureAlertRepository {
    async fn insert(&self, _alert: &Alert) -> Result<(), AlertPersistenceError> {
        Err(AlertPersistenceError::connection("no database configured"))
    }

    async fn find_entry(&self, _id: &AlertId) -> Result<Option<FeedEntry>, AlertPersistenceError> {
        Ok(None)
    }

    async fn list_feed_candidates(
        &self,
        _filter: &FeedFilter,
    ) -> Result<Vec<FeedEntry>, AlertPersistenceError> {
        Ok(Vec::new())
    }

    async fn toggle_like(
        &self,
        _alert_id: &AlertId,
        _user_id: &UserId,
    ) -> Result<Option<LikeToggle>, AlertPersistenceError> {
        Ok(None)
    }

    async fn add_flag(
        &self,
        _alert_id: &AlertId,
        _user_id: &UserId,
    ) -> Result<Option<FlagOutcome>, AlertPersistenceError> {
        Ok(None)
    }

    async fn increment_share(
        &self,
        _alert_id: &AlertId,
    ) -> Result<Option<u32>, AlertPersistenceError> {
        Ok(None)
    }
}
