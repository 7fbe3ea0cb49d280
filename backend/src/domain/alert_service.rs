//! Alert posting and feed services.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use pagination::Page;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    AlertCommand, AlertFeedQuery, AlertPersistenceError, AlertRepository, ImageStore,
    ImageStoreError,
};
use crate::domain::{
    Alert, AlertDraft, AlertSubmission, AlertValidationError, Error, FeedItem, FeedQuery,
    FeedQueryError, ImageUpload, MAX_IMAGES, UserId,
};

pub(crate) fn map_alert_repository_error(error: AlertPersistenceError) -> Error {
    match error {
        AlertPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("alert repository unavailable: {message}"))
        }
        AlertPersistenceError::Query { message } => {
            Error::internal(format!("alert repository error: {message}"))
        }
    }
}

fn map_image_error(error: ImageStoreError) -> Error {
    Error::internal(error.to_string())
}

/// Turn an alert validation failure into a field-scoped request error.
pub fn alert_validation_error(error: &AlertValidationError) -> Error {
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": error.field(),
        "code": error.code(),
    }))
}

fn feed_query_error(error: &FeedQueryError) -> Error {
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": error.field(),
        "code": "invalid_feed_query",
    }))
}

/// Alert service implementing [`AlertCommand`] and [`AlertFeedQuery`].
#[derive(Clone)]
pub struct AlertService<R> {
    alerts: Arc<R>,
    images: Arc<dyn ImageStore>,
    clock: Arc<dyn Clock>,
}

impl<R> AlertService<R> {
    pub fn new(alerts: Arc<R>, images: Arc<dyn ImageStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            alerts,
            images,
            clock,
        }
    }

    /// Best-effort removal of images written for a post that did not land.
    async fn discard_images(&self, paths: &[String]) {
        for path in paths {
            if let Err(err) = self.images.remove(path).await {
                warn!(path = %path, error = %err, "orphaned alert image left behind");
            }
        }
    }
}

#[async_trait]
impl<R> AlertCommand for AlertService<R>
where
    R: AlertRepository,
{
    async fn post_alert(
        &self,
        owner: UserId,
        submission: AlertSubmission,
        images: Vec<ImageUpload>,
    ) -> Result<FeedItem, Error> {
        let draft = AlertDraft::validate(&submission).map_err(|err| alert_validation_error(&err))?;
        if images.len() > MAX_IMAGES {
            return Err(alert_validation_error(
                &AlertValidationError::TooManyImages { max: MAX_IMAGES },
            ));
        }

        let mut paths = Vec::with_capacity(images.len());
        for image in &images {
            match self.images.store(image).await {
                Ok(path) => paths.push(path),
                Err(err) => {
                    self.discard_images(&paths).await;
                    return Err(map_image_error(err));
                }
            }
        }

        let alert = Alert::create(owner, draft, paths, self.clock.utc());
        if let Err(err) = self.alerts.insert(&alert).await {
            self.discard_images(alert.images()).await;
            return Err(map_alert_repository_error(err));
        }
        info!(
            alert_id = %alert.id(),
            owner = %owner,
            category = alert.category().as_str(),
            "alert posted"
        );

        let entry = self
            .alerts
            .find_entry(&alert.id())
            .await
            .map_err(map_alert_repository_error)?
            .ok_or_else(|| Error::internal("posted alert could not be read back"))?;
        Ok(FeedItem {
            alert: entry.alert,
            owner_name: entry.owner_name,
            distance_km: None,
        })
    }
}

#[async_trait]
impl<R> AlertFeedQuery for AlertService<R>
where
    R: AlertRepository,
{
    async fn feed(&self, query: FeedQuery) -> Result<Page<FeedItem>, Error> {
        let plan = query
            .plan(self.clock.utc())
            .map_err(|err| feed_query_error(&err))?;
        let candidates = self
            .alerts
            .list_feed_candidates(&plan.filter)
            .await
            .map_err(map_alert_repository_error)?;
        debug!(
            candidates = candidates.len(),
            sort = plan.sort().label(),
            "feed candidates loaded"
        );
        plan.assemble(candidates)
            .map_err(|err| Error::internal(format!("feed cursor could not be encoded: {err}")))
    }
}

#[cfg(test)]
#[path = "alert_service_tests.rs"]
mod tests;
