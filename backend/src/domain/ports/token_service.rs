//! Port for issuing and verifying bearer tokens.

use chrono::{DateTime, Utc};

use crate::domain::{AuthenticatedUser, EmailAddress, UserId};

use super::define_port_error;

define_port_error! {
    /// Failures raised by token adapters.
    pub enum TokenError {
        /// The token could not be signed.
        Issue { message: String } => "token could not be issued: {message}",
        /// The token is malformed, tampered with or carries bad claims.
        Invalid { message: String } => "token is invalid: {message}",
        /// The token is past its expiry.
        Expired => "token has expired",
    }
}

/// Bearer token issuer and verifier.
#[cfg_attr(test, mockall::automock)]
pub trait TokenService: Send + Sync {
    /// Sign a token for the user, valid from `now`.
    fn issue(
        &self,
        user_id: &UserId,
        email: &EmailAddress,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError>;

    /// Verify a token and recover the identity it carries.
    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AuthenticatedUser, TokenError>;
}
