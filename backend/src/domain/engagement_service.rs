//! Engagement mutator: like toggles, idempotent flags and share counts.
//!
//! Each action maps to one atomic repository primitive, so concurrent calls
//! never lose updates and the denormalised counters the feed sorts on stay
//! consistent with the membership tables.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::domain::alert_service::map_alert_repository_error;
use crate::domain::ports::{AlertRepository, EngagementCommand};
use crate::domain::{AlertId, Error, FlagOutcome, LikeToggle, UserId};

fn alert_not_found(alert_id: AlertId) -> Error {
    Error::not_found(format!("alert {alert_id} not found"))
}

/// Engagement service implementing [`EngagementCommand`].
#[derive(Clone)]
pub struct EngagementService<R> {
    alerts: Arc<R>,
}

impl<R> EngagementService<R> {
    pub fn new(alerts: Arc<R>) -> Self {
        Self { alerts }
    }
}

#[async_trait]
impl<R> EngagementCommand for EngagementService<R>
where
    R: AlertRepository,
{
    async fn toggle_like(&self, alert_id: AlertId, user_id: UserId) -> Result<LikeToggle, Error> {
        self.alerts
            .toggle_like(&alert_id, &user_id)
            .await
            .map_err(map_alert_repository_error)?
            .ok_or_else(|| alert_not_found(alert_id))
    }

    async fn flag(&self, alert_id: AlertId, user_id: UserId) -> Result<FlagOutcome, Error> {
        let outcome = self
            .alerts
            .add_flag(&alert_id, &user_id)
            .await
            .map_err(map_alert_repository_error)?
            .ok_or_else(|| alert_not_found(alert_id))?;
        if outcome.newly_flagged {
            info!(
                alert_id = %alert_id,
                flags = outcome.flag_count,
                status = outcome.status.as_str(),
                "alert flagged"
            );
        }
        Ok(outcome)
    }

    async fn share(&self, alert_id: AlertId) -> Result<u32, Error> {
        self.alerts
            .increment_share(&alert_id)
            .await
            .map_err(map_alert_repository_error)?
            .ok_or_else(|| alert_not_found(alert_id))
    }
}
