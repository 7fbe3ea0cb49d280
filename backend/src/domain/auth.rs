//! Authentication primitives: signup and login credentials, password rules
//! and the identity carried by bearer tokens.
//!
//! Handlers build these values from raw strings before talking to a service,
//! so validation failures never reach the stores.

use zeroize::Zeroizing;

use super::user::{DisplayName, EmailAddress, UserId, UserValidationError};

/// Minimum accepted password length in characters.
pub const PASSWORD_MIN: usize = 8;

/// Errors raised while validating credential payloads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsValidationError {
    /// The email address is malformed.
    #[error("{0}")]
    Email(UserValidationError),
    /// The display name is malformed.
    #[error("{0}")]
    DisplayName(UserValidationError),
    /// The password was blank.
    #[error("password must not be empty")]
    EmptyPassword,
    /// The password is shorter than [`PASSWORD_MIN`].
    #[error("password must be at least {min} characters")]
    PasswordTooShort { min: usize },
    /// The password lacks an uppercase letter, lowercase letter or digit.
    #[error("password must contain an uppercase letter, a lowercase letter and a digit")]
    PasswordTooWeak,
}

impl CredentialsValidationError {
    /// Request field the failure relates to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::DisplayName(_) => "name",
            Self::EmptyPassword | Self::PasswordTooShort { .. } | Self::PasswordTooWeak => {
                "password"
            }
        }
    }

    /// Stable machine-readable failure code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Email(_) => "invalid_email",
            Self::DisplayName(_) => "invalid_name",
            Self::EmptyPassword => "empty_password",
            Self::PasswordTooShort { .. } => "password_too_short",
            Self::PasswordTooWeak => "weak_password",
        }
    }
}

/// Password that satisfies the strength rules for new credentials.
///
/// # Examples
/// ```
/// use alertline::domain::NewPassword;
///
/// assert!(NewPassword::new("Str0ngPass").is_ok());
/// assert!(NewPassword::new("weakpass").is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct NewPassword(Zeroizing<String>);

impl NewPassword {
    /// Validate a candidate password.
    pub fn new(raw: &str) -> Result<Self, CredentialsValidationError> {
        if raw.is_empty() {
            return Err(CredentialsValidationError::EmptyPassword);
        }
        if raw.chars().count() < PASSWORD_MIN {
            return Err(CredentialsValidationError::PasswordTooShort { min: PASSWORD_MIN });
        }
        let has_upper = raw.chars().any(char::is_uppercase);
        let has_lower = raw.chars().any(char::is_lowercase);
        let has_digit = raw.chars().any(|c| c.is_ascii_digit());
        if !(has_upper && has_lower && has_digit) {
            return Err(CredentialsValidationError::PasswordTooWeak);
        }
        Ok(Self(Zeroizing::new(raw.to_owned())))
    }

    /// Plaintext password for hashing.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for NewPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NewPassword(..)")
    }
}

/// Validated signup payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignupDetails {
    email: EmailAddress,
    password: NewPassword,
    display_name: Option<DisplayName>,
}

impl SignupDetails {
    /// Validate raw signup fields. A blank name is treated as absent.
    pub fn try_from_parts(
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Self, CredentialsValidationError> {
        let email = EmailAddress::new(email).map_err(CredentialsValidationError::Email)?;
        let password = NewPassword::new(password)?;
        let display_name = display_name
            .filter(|name| !name.trim().is_empty())
            .map(DisplayName::new)
            .transpose()
            .map_err(CredentialsValidationError::DisplayName)?;
        Ok(Self {
            email,
            password,
            display_name,
        })
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn password(&self) -> &NewPassword {
        &self.password
    }

    pub fn display_name(&self) -> Option<&DisplayName> {
        self.display_name.as_ref()
    }
}

/// Validated login credentials.
///
/// The password keeps caller-provided whitespace so comparisons are exact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: EmailAddress,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Validate raw login fields.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        let email = EmailAddress::new(email).map_err(CredentialsValidationError::Email)?;
        if password.is_empty() {
            return Err(CredentialsValidationError::EmptyPassword);
        }
        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Identity carried by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub email: EmailAddress,
}

/// Token and account summary returned after signup or login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user_id: UserId,
    pub email_verified: bool,
}
