//! User identity and account aggregate.
//!
//! `UserAccount` owns the credential hash and the login lockout counters.
//! One-time passcode state lives in separate [`crate::domain::OtpRecord`]s.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::time::remaining_seconds;

/// Validation errors for user identity values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    /// The identifier was blank.
    #[error("user id must not be empty")]
    EmptyId,
    /// The identifier was not a UUID.
    #[error("user id must be a valid UUID")]
    InvalidId,
    /// The email address was blank.
    #[error("email must not be empty")]
    EmptyEmail,
    /// The email address did not look like `local@domain.tld`.
    #[error("email must be a valid address")]
    InvalidEmail,
    /// The email address exceeded [`EMAIL_MAX`].
    #[error("email must be at most {max} characters")]
    EmailTooLong { max: usize },
    /// The display name was blank.
    #[error("display name must not be empty")]
    EmptyDisplayName,
    /// The display name exceeded [`DISPLAY_NAME_MAX`].
    #[error("display name must be at most {max} characters")]
    DisplayNameTooLong { max: usize },
}

/// Stable user identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(Uuid);

impl UserId {
    /// Validate and construct a [`UserId`] from a UUID string.
    pub fn new(id: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let id = id.as_ref();
        if id.is_empty() {
            return Err(UserValidationError::EmptyId);
        }
        Uuid::parse_str(id)
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }

    /// Generate a new random [`UserId`].
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<UserId> for String {
    fn from(value: UserId) -> Self {
        value.0.to_string()
    }
}

impl TryFrom<String> for UserId {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Maximum accepted email length.
pub const EMAIL_MAX: usize = 254;

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

fn email_regex() -> &'static Regex {
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$")
            .unwrap_or_else(|error| panic!("email regex failed to compile: {error}"))
    })
}

/// Email address normalised to trimmed lowercase.
///
/// # Examples
/// ```
/// use alertline::domain::EmailAddress;
///
/// let email = EmailAddress::new("  Ada@Example.COM ").unwrap();
/// assert_eq!(email.as_ref(), "ada@example.com");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Normalise and validate an email address.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let normalised = raw.as_ref().trim().to_lowercase();
        if normalised.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if normalised.chars().count() > EMAIL_MAX {
            return Err(UserValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        if !email_regex().is_match(&normalised) {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(normalised))
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Maximum allowed length for a display name.
pub const DISPLAY_NAME_MAX: usize = 64;

/// Human readable name shown next to a user's alerts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DisplayName(String);

impl DisplayName {
    /// Trim and validate a display name.
    pub fn new(display_name: impl AsRef<str>) -> Result<Self, UserValidationError> {
        let trimmed = display_name.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyDisplayName);
        }
        if trimmed.chars().count() > DISPLAY_NAME_MAX {
            return Err(UserValidationError::DisplayNameTooLong {
                max: DISPLAY_NAME_MAX,
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DisplayName> for String {
    fn from(value: DisplayName) -> Self {
        value.0
    }
}

impl TryFrom<String> for DisplayName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Failed-login lockout policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginLockoutPolicy {
    max_attempts: u32,
    lockout: Duration,
}

impl LoginLockoutPolicy {
    /// Build a policy locking the account for `lockout` after `max_attempts`
    /// consecutive failures.
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout,
        }
    }

    /// Consecutive failures that trigger a lockout.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Length of the lockout window.
    pub fn lockout(&self) -> Duration {
        self.lockout
    }
}

impl Default for LoginLockoutPolicy {
    fn default() -> Self {
        Self::new(5, Duration::minutes(30))
    }
}

/// Outcome of recording a failed login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedLogin {
    /// More attempts remain before lockout.
    AttemptsRemaining(u32),
    /// The account is now locked for the given number of seconds.
    LockedOut { retry_after_seconds: u64 },
}

/// Persisted user account.
///
/// ## Invariants
/// - `email` is unique across accounts (enforced by the store).
/// - `password_hash` is a PHC-format hash, never a plaintext password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAccount {
    id: UserId,
    email: EmailAddress,
    password_hash: String,
    display_name: Option<DisplayName>,
    email_verified: bool,
    login_attempts: u32,
    lockout_until: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Field bundle used to rebuild a [`UserAccount`] from storage.
#[derive(Debug, Clone)]
pub struct UserAccountDraft {
    pub id: UserId,
    pub email: EmailAddress,
    pub password_hash: String,
    pub display_name: Option<DisplayName>,
    pub email_verified: bool,
    pub login_attempts: u32,
    pub lockout_until: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserAccountDraft> for UserAccount {
    fn from(draft: UserAccountDraft) -> Self {
        let UserAccountDraft {
            id,
            email,
            password_hash,
            display_name,
            email_verified,
            login_attempts,
            lockout_until,
            created_at,
            updated_at,
        } = draft;
        Self {
            id,
            email,
            password_hash,
            display_name,
            email_verified,
            login_attempts,
            lockout_until,
            created_at,
            updated_at,
        }
    }
}

impl UserAccount {
    /// Create a fresh, unverified account.
    pub fn register(
        email: EmailAddress,
        password_hash: String,
        display_name: Option<DisplayName>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::random(),
            email,
            password_hash,
            display_name,
            email_verified: false,
            login_attempts: 0,
            lockout_until: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn display_name(&self) -> Option<&DisplayName> {
        self.display_name.as_ref()
    }

    pub fn is_email_verified(&self) -> bool {
        self.email_verified
    }

    pub fn login_attempts(&self) -> u32 {
        self.login_attempts
    }

    pub fn lockout_until(&self) -> Option<DateTime<Utc>> {
        self.lockout_until
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Seconds left on an active login lockout.
    pub fn lockout_remaining(&self, now: DateTime<Utc>) -> Option<u64> {
        self.lockout_until
            .map(|until| remaining_seconds(until, now))
            .filter(|seconds| *seconds > 0)
    }

    /// Count a failed login, locking the account once the policy limit is hit.
    ///
    /// An expired lockout starts a fresh attempt window.
    pub fn record_failed_login(
        &mut self,
        policy: &LoginLockoutPolicy,
        now: DateTime<Utc>,
    ) -> FailedLogin {
        if self.lockout_until.is_some_and(|until| until <= now) {
            self.lockout_until = None;
            self.login_attempts = 0;
        }
        self.login_attempts = self.login_attempts.saturating_add(1);
        self.updated_at = now;
        if self.login_attempts >= policy.max_attempts() {
            let until = now + policy.lockout();
            self.lockout_until = Some(until);
            FailedLogin::LockedOut {
                retry_after_seconds: remaining_seconds(until, now),
            }
        } else {
            FailedLogin::AttemptsRemaining(policy.max_attempts() - self.login_attempts)
        }
    }

    /// Reset login counters after a successful login.
    pub fn record_successful_login(&mut self, now: DateTime<Utc>) {
        self.login_attempts = 0;
        self.lockout_until = None;
        self.updated_at = now;
    }

    /// Mark the email address as verified.
    pub fn mark_email_verified(&mut self, now: DateTime<Utc>) {
        self.email_verified = true;
        self.updated_at = now;
    }

    /// Replace the credential hash and clear any login lockout.
    pub fn change_password_hash(&mut self, password_hash: String, now: DateTime<Utc>) {
        self.password_hash = password_hash;
        self.login_attempts = 0;
        self.lockout_until = None;
        self.updated_at = now;
    }
}
