//! Driving port for account and one-time passcode use-cases.
//!
//! Inbound adapters validate raw payloads into domain values and call this
//! port; the persistence, hashing, token and mail collaborators stay hidden
//! behind it.

use async_trait::async_trait;

use crate::domain::{
    AuthSession, EmailAddress, Error, LoginCredentials, NewPassword, OtpCode, OtpPurpose,
    OtpStatus, OtpVerification, SignupDetails,
};

/// Account lifecycle operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountCommand: Send + Sync {
    /// Register an unverified account and send its verification code.
    async fn signup(&self, details: SignupDetails) -> Result<AuthSession, Error>;

    /// Check credentials, applying the failed-login lockout.
    async fn login(&self, credentials: LoginCredentials) -> Result<AuthSession, Error>;

    /// Check a passcode for the given purpose.
    ///
    /// A verification code is consumed on success; a reset code is left for
    /// [`AccountCommand::reset_password`].
    async fn verify_otp(
        &self,
        email: &EmailAddress,
        code: &OtpCode,
        purpose: OtpPurpose,
    ) -> Result<OtpVerification, Error>;

    /// Send a password reset code.
    async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), Error>;

    /// Consume a reset code and store the new credential.
    async fn reset_password(
        &self,
        email: &EmailAddress,
        code: &OtpCode,
        password: NewPassword,
    ) -> Result<(), Error>;

    /// Reissue the verification code, honouring the resend interval.
    async fn resend_verification(&self, email: &EmailAddress) -> Result<(), Error>;

    /// Countdown view of the user's passcode for a purpose.
    async fn otp_status(&self, email: &EmailAddress, purpose: OtpPurpose)
    -> Result<OtpStatus, Error>;
}
