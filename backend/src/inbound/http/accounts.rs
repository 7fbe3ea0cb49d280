//! Account and one-time passcode handlers.
//!
//! ```text
//! POST /api/signup          {"email","password","name"?}
//! POST /api/login           {"email","password"}
//! POST /api/request-otp     {"email"}
//! POST /api/verify-otp      {"email","otp","purpose"?}
//! POST /api/reset-password  {"email","otp","newPassword"}
//! POST /api/resend-otp      {"email"}
//! GET  /api/otp-status?email=&purpose=
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::domain::{
    AuthSession, CredentialsValidationError, EmailAddress, Error, LoginCredentials, NewPassword,
    OtpCode, OtpPurpose, OtpStatus, OtpVerification, SignupDetails,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;

/// Signup request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Passw0rd!")]
    pub password: String,
    /// Optional public display name.
    #[serde(default)]
    pub name: Option<String>,
}

/// Login request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body carrying only an email address.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmailRequest {
    pub email: String,
}

/// Passcode check request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    pub email: String,
    #[schema(example = "482913")]
    pub otp: String,
    /// `emailVerification` (default) or `passwordReset`.
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "emailVerification")]
    pub purpose: Option<OtpPurpose>,
}

/// Password reset request body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

/// Query string for `GET /otp-status`.
#[derive(Debug, Deserialize, utoipa::IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct OtpStatusParams {
    pub email: String,
    /// `emailVerification` (default) or `passwordReset`.
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub purpose: Option<OtpPurpose>,
}

/// Returned by signup.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    pub token: String,
    pub user_id: String,
    pub require_verification: bool,
}

/// Returned by login.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
    pub email_verified: bool,
}

/// Plain acknowledgement.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_owned(),
        }
    }
}

/// Returned when a passcode is accepted.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub message: String,
    pub email_verified: bool,
    /// Attempts left on the code after this check.
    pub remaining_attempts: u32,
}

impl From<OtpVerification> for VerifyOtpResponse {
    fn from(verification: OtpVerification) -> Self {
        Self {
            message: "OTP verified successfully".to_owned(),
            email_verified: verification.email_verified,
            remaining_attempts: verification.remaining_attempts,
        }
    }
}

/// Countdown view of a passcode.
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpStatusResponse {
    #[schema(value_type = String)]
    pub purpose: OtpPurpose,
    pub active: bool,
    /// Seconds until the code expires.
    pub remaining_validity: u64,
    pub remaining_attempts: u32,
    /// Seconds until verification attempts are allowed again.
    pub cooldown_remaining: u64,
}

impl From<OtpStatus> for OtpStatusResponse {
    fn from(status: OtpStatus) -> Self {
        Self {
            purpose: status.purpose,
            active: status.active,
            remaining_validity: status.remaining_validity_seconds,
            remaining_attempts: status.remaining_attempts,
            cooldown_remaining: status.remaining_cooldown_seconds,
        }
    }
}

fn credentials_error(err: &CredentialsValidationError) -> Error {
    Error::invalid_request(err.to_string()).with_details(json!({
        "field": err.field(),
        "code": err.code(),
    }))
}

fn parse_email(raw: &str) -> ApiResult<EmailAddress> {
    EmailAddress::new(raw)
        .map_err(|err| credentials_error(&CredentialsValidationError::Email(err)))
}

fn parse_code(raw: &str) -> ApiResult<OtpCode> {
    OtpCode::parse(raw).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({
            "field": "otp",
            "code": "invalid_otp_format",
        }))
    })
}

/// Create an unverified account and email a verification code.
#[utoipa::path(
    post,
    path = "/api/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = SignupResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 409, description = "Email already registered", body = ErrorSchema),
        (status = 503, description = "Store or mail relay unavailable", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "signup",
    security([])
)]
#[post("/signup")]
pub async fn signup(
    state: web::Data<HttpState>,
    payload: web::Json<SignupRequest>,
) -> ApiResult<HttpResponse> {
    let SignupRequest {
        email,
        password,
        name,
    } = payload.into_inner();
    let details = SignupDetails::try_from_parts(&email, &password, name.as_deref())
        .map_err(|err| credentials_error(&err))?;
    let AuthSession { token, user_id, .. } = state.accounts.signup(details).await?;
    Ok(HttpResponse::Created().json(SignupResponse {
        token,
        user_id: user_id.to_string(),
        require_verification: true,
    }))
}

/// Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = LoginResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Invalid credentials", body = ErrorSchema),
        (status = 429, description = "Account locked", body = ErrorSchema,
            headers(("Retry-After" = u64, description = "Seconds until the lockout ends")))
    ),
    tags = ["accounts"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<LoginResponse>> {
    let LoginRequest { email, password } = payload.into_inner();
    let credentials =
        LoginCredentials::try_from_parts(&email, &password).map_err(|err| credentials_error(&err))?;
    let session = state.accounts.login(credentials).await?;
    Ok(web::Json(LoginResponse {
        token: session.token,
        user_id: session.user_id.to_string(),
        email_verified: session.email_verified,
    }))
}

/// Email a password reset code.
#[utoipa::path(
    post,
    path = "/api/request-otp",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code sent", body = MessageResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "No such account", body = ErrorSchema),
        (status = 503, description = "Mail relay unavailable", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "requestPasswordReset",
    security([])
)]
#[post("/request-otp")]
pub async fn request_otp(
    state: web::Data<HttpState>,
    payload: web::Json<EmailRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    let email = parse_email(&payload.email)?;
    state.accounts.request_password_reset(&email).await?;
    Ok(web::Json(MessageResponse::new("OTP sent to your email")))
}

/// Check a passcode.
#[utoipa::path(
    post,
    path = "/api/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted", body = VerifyOtpResponse),
        (status = 400, description = "Wrong, expired or missing code", body = ErrorSchema),
        (status = 404, description = "No such account", body = ErrorSchema),
        (status = 429, description = "Too many attempts", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "verifyOtp",
    security([])
)]
#[post("/verify-otp")]
pub async fn verify_otp(
    state: web::Data<HttpState>,
    payload: web::Json<VerifyOtpRequest>,
) -> ApiResult<web::Json<VerifyOtpResponse>> {
    let email = parse_email(&payload.email)?;
    let code = parse_code(&payload.otp)?;
    let purpose = payload.purpose.unwrap_or(OtpPurpose::EmailVerification);
    let verification = state.accounts.verify_otp(&email, &code, purpose).await?;
    Ok(web::Json(VerifyOtpResponse::from(verification)))
}

/// Consume a reset code and set a new password.
#[utoipa::path(
    post,
    path = "/api/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Invalid request or code", body = ErrorSchema),
        (status = 404, description = "No such account", body = ErrorSchema),
        (status = 429, description = "Too many attempts", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "resetPassword",
    security([])
)]
#[post("/reset-password")]
pub async fn reset_password(
    state: web::Data<HttpState>,
    payload: web::Json<ResetPasswordRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    let email = parse_email(&payload.email)?;
    let code = parse_code(&payload.otp)?;
    let password = NewPassword::new(&payload.new_password).map_err(|err| {
        credentials_error(&err).merge_details(json!({ "field": "newPassword" }))
    })?;
    state.accounts.reset_password(&email, &code, password).await?;
    Ok(web::Json(MessageResponse::new("Password updated successfully")))
}

/// Send a fresh verification code.
#[utoipa::path(
    post,
    path = "/api/resend-otp",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Code sent", body = MessageResponse),
        (status = 400, description = "Already verified", body = ErrorSchema),
        (status = 404, description = "No such account", body = ErrorSchema),
        (status = 429, description = "Resend interval not elapsed", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "resendOtp",
    security([])
)]
#[post("/resend-otp")]
pub async fn resend_otp(
    state: web::Data<HttpState>,
    payload: web::Json<EmailRequest>,
) -> ApiResult<web::Json<MessageResponse>> {
    let email = parse_email(&payload.email)?;
    state.accounts.resend_verification(&email).await?;
    Ok(web::Json(MessageResponse::new("OTP sent successfully")))
}

/// Report how long the current code stays valid and how many tries remain.
#[utoipa::path(
    get,
    path = "/api/otp-status",
    params(OtpStatusParams),
    responses(
        (status = 200, description = "Passcode status", body = OtpStatusResponse),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "No such account", body = ErrorSchema)
    ),
    tags = ["accounts"],
    operation_id = "otpStatus",
    security([])
)]
#[get("/otp-status")]
pub async fn otp_status(
    state: web::Data<HttpState>,
    query: web::Query<OtpStatusParams>,
) -> ApiResult<web::Json<OtpStatusResponse>> {
    let email = parse_email(&query.email)?;
    let purpose = query.purpose.unwrap_or(OtpPurpose::EmailVerification);
    let status = state.accounts.otp_status(&email, purpose).await?;
    Ok(web::Json(status.into()))
}

#[cfg(test)]
#[path = "accounts_tests.rs"]
mod tests;
