//! Port abstraction for user account persistence adapters and their errors.

use async_trait::async_trait;

use crate::domain::{EmailAddress, UserAccount, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Another account already uses the email address.
        DuplicateEmail { email: String } => "email already registered: {email}",
    }
}

/// Credential store port.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account, failing with `DuplicateEmail` when taken.
    async fn create(&self, account: &UserAccount) -> Result<(), UserPersistenceError>;

    /// Persist every mutable field of an existing account.
    async fn update(&self, account: &UserAccount) -> Result<(), UserPersistenceError>;

    /// Fetch an account by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserAccount>, UserPersistenceError>;

    /// Fetch an account by normalised email.
    async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<UserAccount>, UserPersistenceError>;

    /// Identifiers of every account, used for broadcast fan-out.
    async fn list_ids(&self) -> Result<Vec<UserId>, UserPersistenceError>;
}

/// Empty store used when no database is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureUserRepository;

#[async_trait]
impl UserRepository for FixtureUserRepository {
    async fn create(&self, _account: &UserAccount) -> Result<(), UserPersistenceError> {
        Err(UserPersistenceError::connection("no database configured"))
    }

    async fn update(&self, _account: &UserAccount) -> Result<(), UserPersistenceError> {
        Err(UserPersistenceError::connection("no database configured"))
    }

    async fn find_by_id(&self, _id: &UserId) -> Result<Option<UserAccount>, UserPersistenceError> {
        Ok(None)
    }

    async fn find_by_email(
        &self,
        _email: &EmailAddress,
    ) -> Result<Option<UserAccount>, UserPersistenceError> {
        Ok(None)
    }

    async fn list_ids(&self) -> Result<Vec<UserId>, UserPersistenceError> {
        Ok(Vec::new())
    }
}
