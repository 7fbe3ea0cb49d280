//! Opaque cursor and pagination envelope primitives shared by list endpoints.
//!
//! Endpoints expose keyset pagination: the server encodes the sort key of the
//! last item it returned into an opaque [`Cursor`] token, and clients echo the
//! token back to fetch the next page. Clients must treat tokens as opaque.
//!
//! ```
//! use pagination::{Cursor, PageParams};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Key {
//!     created_at: i64,
//!     id: String,
//! }
//!
//! let token = Cursor::new(Key { created_at: 10, id: "a".into() }).encode()?;
//! let decoded: Cursor<Key> = Cursor::decode(&token)?;
//! assert_eq!(decoded.key().created_at, 10);
//!
//! let params = PageParams::new(None, Some(500))?;
//! assert_eq!(params.limit(), pagination::MAX_LIMIT);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod cursor;
mod page;

pub use cursor::{Cursor, CursorError};
pub use page::{DEFAULT_LIMIT, MAX_LIMIT, Page, PageParams, PageParamsError};
