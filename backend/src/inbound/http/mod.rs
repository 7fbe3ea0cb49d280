//! HTTP inbound adapter exposing the REST endpoints under `/api`.

pub mod accounts;
pub mod alert_actions;
pub mod alerts;
mod alerts_dto;
pub mod auth;
pub mod error;
pub mod health;
pub mod notifications;
pub mod schemas;
pub mod state;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;

use actix_web::{Scope, web};

/// Every REST handler mounted under `/api`, with extractor failures
/// rendered as the error envelope.
///
/// # Examples
/// ```ignore
/// let app = App::new().app_data(http_state).service(api_scope());
/// ```
pub fn api_scope() -> Scope {
    web::scope("/api")
        .app_data(web::JsonConfig::default().error_handler(error::json_payload_error))
        .app_data(web::QueryConfig::default().error_handler(error::query_payload_error))
        .service(accounts::signup)
        .service(accounts::login)
        .service(accounts::request_otp)
        .service(accounts::verify_otp)
        .service(accounts::reset_password)
        .service(accounts::resend_otp)
        .service(accounts::otp_status)
        .service(alerts::post_alert)
        .service(alerts::feed)
        .service(alert_actions::toggle_like)
        .service(alert_actions::flag)
        .service(alert_actions::share)
        .service(notifications::list)
        .service(notifications::mark_read)
        .service(notifications::remove)
        .service(notifications::broadcast)
        .service(notifications::show_less)
}
