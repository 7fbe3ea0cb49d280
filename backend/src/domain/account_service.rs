//! Account service: signup, login lockout and the one-time passcode
//! lifecycle for email verification and password resets.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    AccountCommand, OtpDelivery, OtpDeliveryError, OtpMailer, OtpPersistenceError, OtpRepository,
    PasswordHashError, PasswordHasher, TokenError, TokenService, UserPersistenceError,
    UserRepository,
};
use crate::domain::{
    AuthSession, EmailAddress, Error, FailedLogin, LoginCredentials, LoginLockoutPolicy,
    NewPassword, OtpAcceptance, OtpCode, OtpPolicy, OtpPurpose, OtpRecord, OtpRedemption,
    OtpRejection, OtpStatus, OtpVerification, SignupDetails, UserAccount,
};

fn map_user_error(error: UserPersistenceError) -> Error {
    match error {
        UserPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserPersistenceError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserPersistenceError::DuplicateEmail { .. } => {
            Error::conflict("an account with this email already exists")
        }
    }
}

fn map_otp_error(error: OtpPersistenceError) -> Error {
    match error {
        OtpPersistenceError::Connection { message } => {
            Error::service_unavailable(format!("otp repository unavailable: {message}"))
        }
        OtpPersistenceError::Query { message } => {
            Error::internal(format!("otp repository error: {message}"))
        }
    }
}

fn map_hash_error(error: PasswordHashError) -> Error {
    Error::internal(error.to_string())
}

fn map_token_error(error: TokenError) -> Error {
    Error::internal(error.to_string())
}

fn map_delivery_error(error: OtpDeliveryError) -> Error {
    warn!(error = %error, "passcode delivery failed");
    Error::service_unavailable("the verification code could not be sent; try again later")
}

fn otp_detail(code: &str) -> serde_json::Value {
    json!({ "code": code })
}

fn map_rejection(rejection: OtpRejection) -> Error {
    match rejection {
        OtpRejection::NoOtp => Error::invalid_request("no verification code is on file")
            .with_details(otp_detail("no_otp")),
        OtpRejection::Expired => Error::invalid_request("the verification code has expired")
            .with_details(otp_detail("otp_expired")),
        OtpRejection::CoolingDown {
            retry_after_seconds,
        } => Error::too_many_requests(
            "too many incorrect attempts; wait before trying again",
            retry_after_seconds,
        ),
        OtpRejection::Mismatch { remaining_attempts } => {
            Error::invalid_request("the verification code is incorrect").with_details(json!({
                "code": "invalid_otp",
                "remainingAttempts": remaining_attempts,
            }))
        }
    }
}

fn already_verified() -> Error {
    Error::invalid_request("email is already verified").with_details(otp_detail("already_verified"))
}

fn invalid_login() -> Error {
    Error::unauthorized("invalid email or password")
}

/// Collaborators used by [`AccountService`] besides its stores.
#[derive(Clone)]
pub struct AccountCollaborators {
    pub hasher: Arc<dyn PasswordHasher>,
    pub tokens: Arc<dyn TokenService>,
    pub mailer: Arc<dyn OtpMailer>,
    pub clock: Arc<dyn Clock>,
}

/// Account service implementing [`AccountCommand`].
#[derive(Clone)]
pub struct AccountService<U, O> {
    users: Arc<U>,
    otps: Arc<O>,
    collaborators: AccountCollaborators,
    otp_policy: OtpPolicy,
    lockout: LoginLockoutPolicy,
}

impl<U, O> AccountService<U, O> {
    /// Create a service with default passcode and lockout policies.
    pub fn new(users: Arc<U>, otps: Arc<O>, collaborators: AccountCollaborators) -> Self {
        Self {
            users,
            otps,
            collaborators,
            otp_policy: OtpPolicy::default(),
            lockout: LoginLockoutPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_otp_policy(mut self, policy: OtpPolicy) -> Self {
        self.otp_policy = policy;
        self
    }

    #[must_use]
    pub fn with_lockout_policy(mut self, policy: LoginLockoutPolicy) -> Self {
        self.lockout = policy;
        self
    }
}

impl<U, O> AccountService<U, O>
where
    U: UserRepository,
    O: OtpRepository,
{
    async fn account_by_email(&self, email: &EmailAddress) -> Result<UserAccount, Error> {
        self.users
            .find_by_email(email)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found("no account exists for this email"))
    }

    async fn otp_record(
        &self,
        account: &UserAccount,
        purpose: OtpPurpose,
    ) -> Result<OtpRecord, Error> {
        Ok(self
            .otps
            .find(&account.id(), purpose)
            .await
            .map_err(map_otp_error)?
            .unwrap_or_else(|| OtpRecord::empty(account.id(), purpose)))
    }

    /// Generate, persist and send a fresh code. A failed send keeps the
    /// stored code.
    async fn issue_code(&self, account: &UserAccount, mut record: OtpRecord) -> Result<(), Error> {
        let now = self.collaborators.clock.utc();
        let purpose = record.purpose();
        let code = OtpCode::generate(&mut rand::thread_rng(), self.otp_policy.width());
        record.issue(code.clone(), &self.otp_policy, now);
        self.otps.save(&record).await.map_err(map_otp_error)?;

        let delivery = OtpDelivery {
            to: account.email().clone(),
            code,
            purpose,
            valid_for: self.otp_policy.ttl(purpose),
        };
        self.collaborators
            .mailer
            .send(&delivery)
            .await
            .map_err(map_delivery_error)?;
        info!(user_id = %account.id(), purpose = purpose.as_str(), "passcode issued");
        Ok(())
    }

    /// Check a code in the store and return the attempts left afterwards.
    async fn redeem(
        &self,
        account: &UserAccount,
        purpose: OtpPurpose,
        code: &OtpCode,
        acceptance: OtpAcceptance,
    ) -> Result<u32, Error> {
        let redemption = OtpRedemption {
            user_id: account.id(),
            purpose,
            candidate: code.clone(),
            policy: self.otp_policy,
            now: self.collaborators.clock.utc(),
            acceptance,
        };
        self.otps
            .redeem(&redemption)
            .await
            .map_err(map_otp_error)?
            .map_err(map_rejection)
    }

    fn session_for(&self, account: &UserAccount) -> Result<AuthSession, Error> {
        let token = self
            .collaborators
            .tokens
            .issue(&account.id(), account.email(), self.collaborators.clock.utc())
            .map_err(map_token_error)?;
        Ok(AuthSession {
            token,
            user_id: account.id(),
            email_verified: account.is_email_verified(),
        })
    }
}

#[async_trait]
impl<U, O> AccountCommand for AccountService<U, O>
where
    U: UserRepository,
    O: OtpRepository,
{
    async fn signup(&self, details: SignupDetails) -> Result<AuthSession, Error> {
        let hash = self
            .collaborators
            .hasher
            .hash(details.password().expose())
            .map_err(map_hash_error)?;
        let account = UserAccount::register(
            details.email().clone(),
            hash,
            details.display_name().cloned(),
            self.collaborators.clock.utc(),
        );
        self.users.create(&account).await.map_err(map_user_error)?;
        info!(user_id = %account.id(), "account registered");

        let record = OtpRecord::empty(account.id(), OtpPurpose::EmailVerification);
        self.issue_code(&account, record).await?;
        self.session_for(&account)
    }

    async fn login(&self, credentials: LoginCredentials) -> Result<AuthSession, Error> {
        let now = self.collaborators.clock.utc();
        let Some(mut account) = self
            .users
            .find_by_email(credentials.email())
            .await
            .map_err(map_user_error)?
        else {
            return Err(invalid_login());
        };

        if let Some(retry_after_seconds) = account.lockout_remaining(now) {
            return Err(Error::too_many_requests(
                "account is temporarily locked after repeated failed logins",
                retry_after_seconds,
            ));
        }

        let matches = self
            .collaborators
            .hasher
            .verify(credentials.password(), account.password_hash())
            .map_err(map_hash_error)?;
        if !matches {
            let outcome = account.record_failed_login(&self.lockout, now);
            self.users.update(&account).await.map_err(map_user_error)?;
            return Err(match outcome {
                FailedLogin::AttemptsRemaining(remaining) => {
                    invalid_login().with_details(json!({ "remainingAttempts": remaining }))
                }
                FailedLogin::LockedOut {
                    retry_after_seconds,
                } => {
                    warn!(user_id = %account.id(), "account locked after failed logins");
                    Error::too_many_requests(
                        "account is temporarily locked after repeated failed logins",
                        retry_after_seconds,
                    )
                }
            });
        }

        if account.login_attempts() > 0 || account.lockout_until().is_some() {
            account.record_successful_login(now);
            self.users.update(&account).await.map_err(map_user_error)?;
        }
        self.session_for(&account)
    }

    async fn verify_otp(
        &self,
        email: &EmailAddress,
        code: &OtpCode,
        purpose: OtpPurpose,
    ) -> Result<OtpVerification, Error> {
        let account = self.account_by_email(email).await?;
        match purpose {
            OtpPurpose::EmailVerification => {
                if account.is_email_verified() {
                    return Err(already_verified());
                }
                let remaining_attempts = self
                    .redeem(&account, purpose, code, OtpAcceptance::VerifyEmail)
                    .await?;
                info!(user_id = %account.id(), "email verified");
                Ok(OtpVerification {
                    email_verified: true,
                    remaining_attempts,
                })
            }
            // The reset code stays valid for reset-password.
            OtpPurpose::PasswordReset => {
                let remaining_attempts = self
                    .redeem(&account, purpose, code, OtpAcceptance::Keep)
                    .await?;
                Ok(OtpVerification {
                    email_verified: account.is_email_verified(),
                    remaining_attempts,
                })
            }
        }
    }

    async fn request_password_reset(&self, email: &EmailAddress) -> Result<(), Error> {
        let account = self.account_by_email(email).await?;
        let record = self.otp_record(&account, OtpPurpose::PasswordReset).await?;
        self.issue_code(&account, record).await
    }

    async fn reset_password(
        &self,
        email: &EmailAddress,
        code: &OtpCode,
        password: NewPassword,
    ) -> Result<(), Error> {
        let account = self.account_by_email(email).await?;
        let password_hash = self
            .collaborators
            .hasher
            .hash(password.expose())
            .map_err(map_hash_error)?;
        self.redeem(
            &account,
            OtpPurpose::PasswordReset,
            code,
            OtpAcceptance::ResetPassword { password_hash },
        )
        .await?;
        info!(user_id = %account.id(), "password reset");
        Ok(())
    }

    async fn resend_verification(&self, email: &EmailAddress) -> Result<(), Error> {
        let account = self.account_by_email(email).await?;
        if account.is_email_verified() {
            return Err(already_verified());
        }
        let record = self
            .otp_record(&account, OtpPurpose::EmailVerification)
            .await?;
        if let Some(wait) = record.resend_wait(&self.otp_policy, self.collaborators.clock.utc()) {
            return Err(Error::too_many_requests(
                "a code was sent recently; wait before requesting another",
                wait,
            ));
        }
        self.issue_code(&account, record).await
    }

    async fn otp_status(
        &self,
        email: &EmailAddress,
        purpose: OtpPurpose,
    ) -> Result<OtpStatus, Error> {
        let account = self.account_by_email(email).await?;
        let record = self.otp_record(&account, purpose).await?;
        Ok(record.status(&self.otp_policy, self.collaborators.clock.utc()))
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
