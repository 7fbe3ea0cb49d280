//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_web::web;
use chrono::{DateTime, Utc};
use mockable::DefaultClock;
use serde_json::Value;

use crate::domain::ports::{
    MockAccountCommand, MockAlertCommand, MockAlertFeedQuery, MockEngagementCommand,
    MockNotificationCommand, TokenError, TokenService,
};
use crate::domain::{AuthenticatedUser, EmailAddress, UserId};

use super::state::{HttpState, HttpStatePorts};

/// The only token [`StaticTokens`] accepts.
pub const VALID_TOKEN: &str = "valid-test-token";

const CALLER_ID: &str = "3fa85f64-5717-4562-b3fc-2c963f66afa6";

/// Identity carried by [`VALID_TOKEN`].
pub fn caller() -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: UserId::new(CALLER_ID).expect("fixture user id"),
        email: EmailAddress::new("caller@example.com").expect("fixture email"),
    }
}

/// `Authorization` header value for [`VALID_TOKEN`].
pub fn bearer() -> (&'static str, String) {
    ("Authorization", format!("Bearer {VALID_TOKEN}"))
}

/// Token service that recognises a single fixed token.
struct StaticTokens;

impl TokenService for StaticTokens {
    fn issue(
        &self,
        _user_id: &UserId,
        _email: &EmailAddress,
        _now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        Ok(VALID_TOKEN.to_owned())
    }

    fn verify(&self, token: &str, _now: DateTime<Utc>) -> Result<AuthenticatedUser, TokenError> {
        if token == VALID_TOKEN {
            Ok(caller())
        } else {
            Err(TokenError::invalid("unknown token"))
        }
    }
}

/// Mocked driving ports. Set expectations on the port under test and leave
/// the rest untouched so unexpected calls fail loudly.
#[derive(Default)]
pub struct TestState {
    pub accounts: MockAccountCommand,
    pub alerts: MockAlertCommand,
    pub feed: MockAlertFeedQuery,
    pub engagement: MockEngagementCommand,
    pub notifications: MockNotificationCommand,
}

impl TestState {
    pub fn into_data(self) -> web::Data<HttpState> {
        let ports = HttpStatePorts {
            accounts: Arc::new(self.accounts),
            alerts: Arc::new(self.alerts),
            feed: Arc::new(self.feed),
            engagement: Arc::new(self.engagement),
            notifications: Arc::new(self.notifications),
        };
        web::Data::new(HttpState::new(
            ports,
            Arc::new(StaticTokens),
            Arc::new(DefaultClock),
        ))
    }
}

/// Decode a response body as JSON.
pub async fn json_body(response: actix_web::dev::ServiceResponse) -> Value {
    let bytes = actix_web::test::read_body(response).await;
    serde_json::from_slice(&bytes).expect("JSON body")
}
