//! Driving port for reading the alert feed.

use async_trait::async_trait;
use pagination::Page;

use crate::domain::{Error, FeedItem, FeedQuery};

/// Feed read use-case.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertFeedQuery: Send + Sync {
    async fn feed(&self, query: FeedQuery) -> Result<Page<FeedItem>, Error>;
}
