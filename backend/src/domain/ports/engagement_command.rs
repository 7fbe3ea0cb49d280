//! Driving port for like, flag and share actions.

use async_trait::async_trait;

use crate::domain::{AlertId, Error, FlagOutcome, LikeToggle, UserId};

/// Engagement use-cases. Unknown alerts yield `not_found`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EngagementCommand: Send + Sync {
    async fn toggle_like(&self, alert_id: AlertId, user_id: UserId) -> Result<LikeToggle, Error>;

    async fn flag(&self, alert_id: AlertId, user_id: UserId) -> Result<FlagOutcome, Error>;

    async fn share(&self, alert_id: AlertId) -> Result<u32, Error>;
}
