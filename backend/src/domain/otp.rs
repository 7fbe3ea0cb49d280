//! One-time passcode lifecycle.
//!
//! An [`OtpRecord`] holds the passcode state for one `(user, purpose)` pair.
//! The record methods are pure state transitions driven by an explicit `now`.
//! Checking a submitted code is an [`OtpRedemption`]: stores apply it to the
//! locked record so concurrent guesses are counted one at a time.
//!
//! ```text
//! no-otp --issue--> active --verify ok--> cleared
//!                     |  \--expiry--> expired --issue--> active
//!                     \--max misses--> locked --cooldown elapsed--> active
//! ```

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::time::{remaining_seconds, whole_seconds_left};
use super::user::UserId;

/// What a passcode is for. Each purpose has an independent record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OtpPurpose {
    EmailVerification,
    PasswordReset,
}

impl OtpPurpose {
    /// Stable storage key.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmailVerification => "email_verification",
            Self::PasswordReset => "password_reset",
        }
    }

    /// Parse a storage key produced by [`OtpPurpose::as_str`].
    pub fn from_storage(value: &str) -> Option<Self> {
        match value {
            "email_verification" => Some(Self::EmailVerification),
            "password_reset" => Some(Self::PasswordReset),
            _ => None,
        }
    }
}

impl fmt::Display for OtpPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while building an [`OtpPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OtpPolicyError {
    #[error("passcode width must be 4 or 6 digits, got {0}")]
    UnsupportedWidth(u8),
    #[error("maximum attempts must be at least 1")]
    ZeroAttempts,
    #[error("durations must be positive")]
    NonPositiveDuration,
}

/// Tunable passcode rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpPolicy {
    width: u8,
    verification_ttl: Duration,
    reset_ttl: Duration,
    max_attempts: u32,
    cooldown: Duration,
    resend_interval: Duration,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            width: 6,
            verification_ttl: Duration::hours(1),
            reset_ttl: Duration::minutes(10),
            max_attempts: 3,
            cooldown: Duration::seconds(60),
            resend_interval: Duration::seconds(60),
        }
    }
}

impl OtpPolicy {
    /// Override the passcode width (4 or 6 digits).
    pub fn with_width(mut self, width: u8) -> Result<Self, OtpPolicyError> {
        if !matches!(width, 4 | 6) {
            return Err(OtpPolicyError::UnsupportedWidth(width));
        }
        self.width = width;
        Ok(self)
    }

    /// Override the maximum number of wrong guesses before cooldown.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Result<Self, OtpPolicyError> {
        if max_attempts == 0 {
            return Err(OtpPolicyError::ZeroAttempts);
        }
        self.max_attempts = max_attempts;
        Ok(self)
    }

    /// Override the lifetime of a passcode for `purpose`.
    pub fn with_ttl(mut self, purpose: OtpPurpose, ttl: Duration) -> Result<Self, OtpPolicyError> {
        let ttl = positive(ttl)?;
        match purpose {
            OtpPurpose::EmailVerification => self.verification_ttl = ttl,
            OtpPurpose::PasswordReset => self.reset_ttl = ttl,
        }
        Ok(self)
    }

    /// Override the cooldown applied after the last allowed miss.
    pub fn with_cooldown(mut self, cooldown: Duration) -> Result<Self, OtpPolicyError> {
        self.cooldown = positive(cooldown)?;
        Ok(self)
    }

    /// Override the minimum interval between passcode requests.
    pub fn with_resend_interval(mut self, interval: Duration) -> Result<Self, OtpPolicyError> {
        self.resend_interval = positive(interval)?;
        Ok(self)
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn ttl(&self, purpose: OtpPurpose) -> Duration {
        match purpose {
            OtpPurpose::EmailVerification => self.verification_ttl,
            OtpPurpose::PasswordReset => self.reset_ttl,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn resend_interval(&self) -> Duration {
        self.resend_interval
    }
}

fn positive(duration: Duration) -> Result<Duration, OtpPolicyError> {
    if duration <= Duration::zero() {
        return Err(OtpPolicyError::NonPositiveDuration);
    }
    Ok(duration)
}

/// Numeric passcode. Leading zeros are significant.
#[derive(Clone, PartialEq, Eq)]
pub struct OtpCode(String);

/// Errors raised when parsing a submitted passcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OtpCodeError {
    #[error("code must not be empty")]
    Empty,
    #[error("code must contain only digits")]
    NonDigit,
}

impl OtpCode {
    /// Parse a submitted passcode. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, OtpCodeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(OtpCodeError::Empty);
        }
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(OtpCodeError::NonDigit);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Draw a code of `width` digits uniformly at random.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, width: u8) -> Self {
        let code = (0..width)
            .map(|_| char::from(b'0' + rng.gen_range(0..10_u8)))
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(..)")
    }
}

impl From<OtpCode> for String {
    fn from(value: OtpCode) -> Self {
        value.0
    }
}

impl TryFrom<String> for OtpCode {
    type Error = OtpCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Why a verification attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpRejection {
    /// No passcode is on file.
    NoOtp,
    /// The passcode is past its expiry.
    Expired,
    /// Too many wrong guesses; wait for the cooldown.
    CoolingDown { retry_after_seconds: u64 },
    /// Wrong passcode; the record now holds one more attempt.
    Mismatch { remaining_attempts: u32 },
}

/// Countdown view of a passcode record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpStatus {
    pub purpose: OtpPurpose,
    pub active: bool,
    pub remaining_validity_seconds: u64,
    pub remaining_attempts: u32,
    pub remaining_cooldown_seconds: u64,
}

/// Result of an accepted passcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpVerification {
    pub email_verified: bool,
    pub remaining_attempts: u32,
}

/// Passcode state for one `(user, purpose)` pair.
///
/// ## Invariants
/// - `attempts` never exceeds the policy maximum without `cooldown_until`
///   being set.
/// - `code` and `expires_at` are set together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpRecord {
    user_id: UserId,
    purpose: OtpPurpose,
    code: Option<OtpCode>,
    expires_at: Option<DateTime<Utc>>,
    attempts: u32,
    last_requested_at: Option<DateTime<Utc>>,
    cooldown_until: Option<DateTime<Utc>>,
}

/// Field bundle used to rebuild an [`OtpRecord`] from storage.
#[derive(Debug, Clone)]
pub struct OtpRecordDraft {
    pub user_id: UserId,
    pub purpose: OtpPurpose,
    pub code: Option<OtpCode>,
    pub expires_at: Option<DateTime<Utc>>,
    pub attempts: u32,
    pub last_requested_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl From<OtpRecordDraft> for OtpRecord {
    fn from(draft: OtpRecordDraft) -> Self {
        let OtpRecordDraft {
            user_id,
            purpose,
            code,
            expires_at,
            attempts,
            last_requested_at,
            cooldown_until,
        } = draft;
        // A code without an expiry cannot be verified safely.
        let (code, expires_at) = match (code, expires_at) {
            (Some(code), Some(expires_at)) => (Some(code), Some(expires_at)),
            _ => (None, None),
        };
        Self {
            user_id,
            purpose,
            code,
            expires_at,
            attempts,
            last_requested_at,
            cooldown_until,
        }
    }
}

impl OtpRecord {
    /// Empty record for a user with no passcode history.
    pub fn empty(user_id: UserId, purpose: OtpPurpose) -> Self {
        Self {
            user_id,
            purpose,
            code: None,
            expires_at: None,
            attempts: 0,
            last_requested_at: None,
            cooldown_until: None,
        }
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn purpose(&self) -> OtpPurpose {
        self.purpose
    }

    pub fn code(&self) -> Option<&OtpCode> {
        self.code.as_ref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_requested_at(&self) -> Option<DateTime<Utc>> {
        self.last_requested_at
    }

    pub fn cooldown_until(&self) -> Option<DateTime<Utc>> {
        self.cooldown_until
    }

    fn cooldown_active(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }

    /// Store a freshly generated code.
    ///
    /// Attempts reset only when no cooldown is running, so requesting a new
    /// code cannot be used to skip a lockout.
    pub fn issue(&mut self, code: OtpCode, policy: &OtpPolicy, now: DateTime<Utc>) {
        self.code = Some(code);
        self.expires_at = Some(now + policy.ttl(self.purpose));
        self.last_requested_at = Some(now);
        if !self.cooldown_active(now) {
            self.attempts = 0;
            self.cooldown_until = None;
        }
    }

    /// Seconds until another code may be requested, if the caller is early.
    pub fn resend_wait(&self, policy: &OtpPolicy, now: DateTime<Utc>) -> Option<u64> {
        self.last_requested_at
            .map(|last| remaining_seconds(last + policy.resend_interval(), now))
            .filter(|seconds| *seconds > 0)
    }

    /// Check a submitted code.
    ///
    /// The record is mutated on a miss and when an elapsed cooldown is
    /// reset. A match leaves the code in place; [`OtpRedemption::apply`]
    /// decides whether to consume it.
    pub fn verify(
        &mut self,
        candidate: &OtpCode,
        policy: &OtpPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), OtpRejection> {
        let (Some(code), Some(expires_at)) = (self.code.as_ref(), self.expires_at) else {
            return Err(OtpRejection::NoOtp);
        };
        if now > expires_at {
            return Err(OtpRejection::Expired);
        }
        if self.attempts >= policy.max_attempts() {
            if let Some(until) = self.cooldown_until.filter(|until| *until > now) {
                return Err(OtpRejection::CoolingDown {
                    retry_after_seconds: remaining_seconds(until, now),
                });
            }
            self.attempts = 0;
            self.cooldown_until = None;
        }
        if code != candidate {
            self.attempts += 1;
            if self.attempts >= policy.max_attempts() {
                self.cooldown_until = Some(now + policy.cooldown());
            }
            return Err(OtpRejection::Mismatch {
                remaining_attempts: policy.max_attempts().saturating_sub(self.attempts),
            });
        }
        Ok(())
    }

    /// Drop all passcode state once it has been used.
    pub fn clear(&mut self) {
        self.code = None;
        self.expires_at = None;
        self.attempts = 0;
        self.last_requested_at = None;
        self.cooldown_until = None;
    }

    /// Countdown view; a pure read. Countdowns are whole seconds, rounded
    /// down.
    pub fn status(&self, policy: &OtpPolicy, now: DateTime<Utc>) -> OtpStatus {
        let remaining_validity_seconds = self
            .expires_at
            .map(|expires_at| whole_seconds_left(expires_at, now))
            .unwrap_or(0);
        let remaining_cooldown_seconds = self
            .cooldown_until
            .map(|until| whole_seconds_left(until, now))
            .unwrap_or(0);
        OtpStatus {
            purpose: self.purpose,
            active: self.code.is_some() && self.expires_at.is_some_and(|expires_at| now < expires_at),
            remaining_validity_seconds,
            remaining_attempts: policy.max_attempts().saturating_sub(self.attempts),
            remaining_cooldown_seconds,
        }
    }
}

/// Outcome of a redemption: remaining attempts on a match.
pub type OtpVerdict = Result<u32, OtpRejection>;

/// What a matching code unlocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpAcceptance {
    /// Leave the code on file for a later step.
    Keep,
    /// Consume the code and mark the owner's email verified.
    VerifyEmail,
    /// Consume the code and store a new password hash, lifting any login
    /// lockout.
    ResetPassword { password_hash: String },
}

impl OtpAcceptance {
    fn consumes(&self) -> bool {
        !matches!(self, Self::Keep)
    }
}

/// One submitted code, checked against the stored record.
///
/// Stores run [`OtpRedemption::apply`] while holding the record, persist the
/// returned record and, on a match, apply the acceptance to the account in
/// the same unit of work.
#[derive(Debug, Clone)]
pub struct OtpRedemption {
    pub user_id: UserId,
    pub purpose: OtpPurpose,
    pub candidate: OtpCode,
    pub policy: OtpPolicy,
    pub now: DateTime<Utc>,
    pub acceptance: OtpAcceptance,
}

impl OtpRedemption {
    /// Check the candidate against `stored`.
    ///
    /// Returns the record to write back, `None` when nothing changed, and the
    /// verdict.
    pub fn apply(&self, stored: Option<OtpRecord>) -> (Option<OtpRecord>, OtpVerdict) {
        let Some(before) = stored else {
            return (None, Err(OtpRejection::NoOtp));
        };
        let mut record = before.clone();
        let verdict = record
            .verify(&self.candidate, &self.policy, self.now)
            .map(|()| {
                if self.acceptance.consumes() {
                    record.clear();
                }
                self.policy.max_attempts().saturating_sub(record.attempts)
            });
        let changed = (record != before).then_some(record);
        (changed, verdict)
    }
}

#[cfg(test)]
mod tests;
