//! HS256 JSON Web Token implementation of the [`TokenService`] port.
//!
//! Expiry is checked against the caller's `now` rather than the system clock
//! so services stay deterministic under a mocked clock.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::ports::{TokenError, TokenService};
use crate::domain::{AuthenticatedUser, EmailAddress, UserId};

/// Shortest signing secret accepted, in bytes.
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_LIFETIME_HOURS: i64 = 24;

/// Errors raised while configuring the signing key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenKeyError {
    #[error("token secret must be at least {min} bytes")]
    SecretTooShort { min: usize },
    #[error("token lifetime must be positive")]
    NonPositiveLifetime,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    email: String,
    iat: i64,
    exp: i64,
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct JwtTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl fmt::Debug for JwtTokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtTokenService")
            .field("secret", &"<redacted>")
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

impl JwtTokenService {
    /// Build a service from a shared secret. Tokens are valid for 24 hours
    /// unless overridden with [`JwtTokenService::with_lifetime`].
    ///
    /// # Errors
    ///
    /// Returns [`TokenKeyError::SecretTooShort`] for secrets under
    /// [`MIN_SECRET_LEN`] bytes.
    pub fn new(secret: &[u8]) -> Result<Self, TokenKeyError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(TokenKeyError::SecretTooShort {
                min: MIN_SECRET_LEN,
            });
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime: Duration::hours(DEFAULT_LIFETIME_HOURS),
        })
    }

    /// Override how long issued tokens stay valid.
    ///
    /// # Errors
    ///
    /// Returns [`TokenKeyError::NonPositiveLifetime`] for zero or negative
    /// durations.
    pub fn with_lifetime(mut self, lifetime: Duration) -> Result<Self, TokenKeyError> {
        if lifetime <= Duration::zero() {
            return Err(TokenKeyError::NonPositiveLifetime);
        }
        self.lifetime = lifetime;
        Ok(self)
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation
    }
}

impl TokenService for JwtTokenService {
    fn issue(
        &self,
        user_id: &UserId,
        email: &EmailAddress,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| TokenError::issue(err.to_string()))
    }

    fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<AuthenticatedUser, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &Self::validation()).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::expired(),
                _ => TokenError::invalid(err.to_string()),
            }
        })?;
        let claims = data.claims;
        if claims.exp <= now.timestamp() {
            return Err(TokenError::expired());
        }
        let user_id = UserId::new(&claims.sub)
            .map_err(|err| TokenError::invalid(format!("subject: {err}")))?;
        let email = EmailAddress::new(&claims.email)
            .map_err(|err| TokenError::invalid(format!("email: {err}")))?;
        Ok(AuthenticatedUser { user_id, email })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[fixture]
    fn service() -> JwtTokenService {
        JwtTokenService::new(SECRET).expect("secret")
    }

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0)
            .single()
            .expect("timestamp")
    }

    fn email() -> EmailAddress {
        EmailAddress::new("ada@example.com").expect("email")
    }

    #[rstest]
    fn issued_token_verifies_to_the_same_user(service: JwtTokenService, now: DateTime<Utc>) {
        let user_id = UserId::random();
        let token = service.issue(&user_id, &email(), now).expect("issue");

        let user = service
            .verify(&token, now + Duration::hours(23))
            .expect("verify");

        assert_eq!(user.user_id, user_id);
        assert_eq!(user.email, email());
    }

    #[rstest]
    fn token_expires_after_its_lifetime(service: JwtTokenService, now: DateTime<Utc>) {
        let token = service.issue(&UserId::random(), &email(), now).expect("issue");

        let err = service
            .verify(&token, now + Duration::hours(24))
            .expect_err("expired");

        assert_eq!(err, TokenError::Expired);
    }

    #[rstest]
    fn token_signed_with_another_secret_is_invalid(service: JwtTokenService, now: DateTime<Utc>) {
        let other = JwtTokenService::new(b"ffffffffffffffffffffffffffffffff").expect("secret");
        let token = other.issue(&UserId::random(), &email(), now).expect("issue");

        let err = service.verify(&token, now).expect_err("bad signature");

        assert!(matches!(err, TokenError::Invalid { .. }));
    }

    #[rstest]
    #[case::empty("")]
    #[case::garbage("not.a.token")]
    fn malformed_tokens_are_invalid(
        service: JwtTokenService,
        now: DateTime<Utc>,
        #[case] token: &str,
    ) {
        assert!(matches!(
            service.verify(token, now),
            Err(TokenError::Invalid { .. })
        ));
    }

    #[rstest]
    fn short_secret_is_rejected() {
        assert_eq!(
            JwtTokenService::new(b"short").map(|_| ()),
            Err(TokenKeyError::SecretTooShort {
                min: MIN_SECRET_LEN
            })
        );
    }

    #[rstest]
    fn custom_lifetime_applies(now: DateTime<Utc>) {
        let service = JwtTokenService::new(SECRET)
            .and_then(|s| s.with_lifetime(Duration::minutes(5)))
            .expect("service");
        let token = service.issue(&UserId::random(), &email(), now).expect("issue");

        assert!(service.verify(&token, now + Duration::minutes(4)).is_ok());
        assert_eq!(
            service.verify(&token, now + Duration::minutes(5)),
            Err(TokenError::Expired)
        );
    }
}
