//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **security**: Argon2id password hashing and HS256 bearer tokens
//! - **mail**: SMTP and log-only passcode delivery
//! - **storage**: local filesystem image store
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod mail;
pub mod persistence;
pub mod security;
pub mod storage;
