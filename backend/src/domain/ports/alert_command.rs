//! Driving port for posting alerts.

use async_trait::async_trait;

use crate::domain::{AlertSubmission, Error, FeedItem, ImageUpload, UserId};

/// Alert creation use-case.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertCommand: Send + Sync {
    /// Validate the submission, store its images and persist the alert.
    async fn post_alert(
        &self,
        owner: UserId,
        submission: AlertSubmission,
        images: Vec<ImageUpload>,
    ) -> Result<FeedItem, Error>;
}
