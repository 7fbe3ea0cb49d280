//! Page-size parameters and the response envelope.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page size used when the client does not ask for one.
pub const DEFAULT_LIMIT: usize = 20;
/// Largest page size a client may request; larger requests are clamped.
pub const MAX_LIMIT: usize = 100;

/// Errors raised while validating page parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PageParamsError {
    /// A limit of zero was requested.
    #[error("limit must be greater than zero")]
    ZeroLimit,
}

/// Validated page request: an optional cursor token and a bounded limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageParams {
    cursor: Option<String>,
    limit: usize,
}

impl PageParams {
    /// Validate raw page parameters.
    ///
    /// Missing limits fall back to [`DEFAULT_LIMIT`]; oversized limits are
    /// clamped to [`MAX_LIMIT`]. Blank cursor tokens are treated as absent.
    ///
    /// # Errors
    ///
    /// Returns [`PageParamsError::ZeroLimit`] when `limit` is zero.
    pub fn new(cursor: Option<String>, limit: Option<usize>) -> Result<Self, PageParamsError> {
        let limit = match limit {
            Some(0) => return Err(PageParamsError::ZeroLimit),
            Some(value) => value.min(MAX_LIMIT),
            None => DEFAULT_LIMIT,
        };
        let cursor = cursor.filter(|token| !token.trim().is_empty());
        Ok(Self { cursor, limit })
    }

    /// Cursor token supplied by the client, if any.
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    /// Effective page size.
    pub const fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            cursor: None,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Response envelope for a page of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Items on this page, in response order.
    pub data: Vec<T>,
    /// Page size that produced this page.
    pub limit: usize,
    /// Token for the next page; absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Build a page envelope.
    pub const fn new(data: Vec<T>, limit: usize, next_cursor: Option<String>) -> Self {
        Self {
            data,
            limit,
            next_cursor,
        }
    }

    /// Map the items while keeping paging metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            limit: self.limit,
            next_cursor: self.next_cursor,
        }
    }
}
