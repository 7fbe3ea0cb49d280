//! Port for purpose-tagged one-time passcode records.

use async_trait::async_trait;

use crate::domain::{OtpPurpose, OtpRecord, OtpRedemption, OtpVerdict, UserId};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by OTP repository adapters.
    pub enum OtpPersistenceError {
        /// Repository connection could not be established.
        Connection { message: String } => "otp repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "otp repository query failed: {message}",
    }
}

/// OTP store keyed by `(user, purpose)`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Fetch the record for a user and purpose.
    async fn find(
        &self,
        user_id: &UserId,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpRecord>, OtpPersistenceError>;

    /// Insert or replace the record for its `(user, purpose)` key.
    async fn save(&self, record: &OtpRecord) -> Result<(), OtpPersistenceError>;

    /// Check a submitted code atomically.
    ///
    /// Adapters hold the record exclusively while applying the redemption,
    /// write back any change and, on a match, apply its acceptance to the
    /// owning account in the same unit of work. Nothing is written when any
    /// step fails.
    async fn redeem(&self, redemption: &OtpRedemption)
    -> Result<OtpVerdict, OtpPersistenceError>;
}

/// Empty store used when no database is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureOtpRepository;

#[async_trait]
impl OtpRepository for FixtureOtpRepository {
    async fn find(
        &self,
        _user_id: &UserId,
        _purpose: OtpPurpose,
    ) -> Result<Option<OtpRecord>, OtpPersistenceError> {
        Ok(None)
    }

    async fn save(&self, _record: &OtpRecord) -> Result<(), OtpPersistenceError> {
        Err(OtpPersistenceError::connection("no database configured"))
    }

    async fn redeem(
        &self,
        _redemption: &OtpRedemption,
    ) -> Result<OtpVerdict, OtpPersistenceError> {
        Err(OtpPersistenceError::connection("no database configured"))
    }
}
