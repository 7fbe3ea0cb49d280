//! Bearer token extraction for protected handlers.
//!
//! Identity comes only from a verified token. Any failure (missing header,
//! wrong scheme, bad signature, expiry) is reported as `401` without saying
//! which check failed.

use actix_web::http::header::AUTHORIZATION;
use actix_web::{FromRequest, HttpRequest, dev::Payload, web};
use futures_util::future::{Ready, ready};
use tracing::debug;

use crate::domain::{AuthenticatedUser, Error, UserId};

use super::state::HttpState;

const BEARER_PREFIX: &str = "bearer ";

/// Caller identity recovered from the `Authorization: Bearer` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerUser(pub AuthenticatedUser);

impl BearerUser {
    pub fn user_id(&self) -> UserId {
        self.0.user_id
    }
}

fn unauthorised() -> Error {
    Error::unauthorized("a valid bearer token is required")
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_at_checked(BEARER_PREFIX.len())?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        return None;
    }
    Some(token.trim()).filter(|token| !token.is_empty())
}

fn authenticate(req: &HttpRequest) -> Result<BearerUser, Error> {
    let state = req
        .app_data::<web::Data<HttpState>>()
        .ok_or_else(|| Error::internal("http state is not configured"))?;
    let token = bearer_token(req).ok_or_else(unauthorised)?;
    state
        .tokens
        .verify(token, state.clock.utc())
        .map(BearerUser)
        .map_err(|err| {
            debug!(error = %err, "bearer token rejected");
            unauthorised()
        })
}

impl FromRequest for BearerUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
