//! Tests for the application bootstrap: readiness signalling and secret
//! resolution.

use std::ffi::OsString;
use std::net::SocketAddr;

use actix_web::web;
use alertline::inbound::http::health::HealthState;
use alertline::outbound::security::JwtTokenService;
use alertline::outbound::storage::LocalImageStore;
use alertline::settings::AppSettings;
use env_lock::lock_env;
use ortho_config::OrthoConfig as _;
use rstest::{fixture, rstest};

use super::{build_token_service, create_server, token_secret};
use crate::server::ServerConfig;

const SECRET: &str = "0123456789abcdef0123456789abcdef";

#[fixture]
fn health_state() -> web::Data<HealthState> {
    web::Data::new(HealthState::new())
}

fn settings_with_secret(secret: Option<&str>) -> AppSettings {
    let _guard = lock_env([
        ("ALERTLINE_JWT_SECRET", secret.map(str::to_owned)),
        ("ALERTLINE_TOKEN_LIFETIME_HOURS", None),
    ]);
    AppSettings::load_from_iter([OsString::from("alertline")]).expect("settings")
}

#[rstest]
#[actix_rt::test]
async fn create_server_marks_ready(health_state: web::Data<HealthState>) {
    let uploads = tempfile::tempdir().expect("tempdir");
    let bind_addr: SocketAddr = "127.0.0.1:0".parse().expect("address");
    let config = ServerConfig::new(
        bind_addr,
        JwtTokenService::new(SECRET.as_bytes()).expect("tokens"),
        LocalImageStore::open(uploads.path()).expect("uploads"),
    );

    assert!(!health_state.is_ready());
    let _server = create_server(health_state.clone(), config).expect("server");

    assert!(health_state.is_ready());
}

#[rstest]
fn configured_secret_is_used_verbatim() {
    let settings = settings_with_secret(Some(SECRET));

    let secret = token_secret(&settings).expect("secret");

    assert_eq!(secret.as_slice(), SECRET.as_bytes());
}

#[rstest]
fn debug_builds_fall_back_to_a_random_secret() {
    let settings = settings_with_secret(None);

    let first = token_secret(&settings).expect("secret");
    let second = token_secret(&settings).expect("secret");

    assert_eq!(first.len(), 64);
    assert_ne!(first.as_slice(), second.as_slice());
}

#[rstest]
fn short_configured_secret_is_rejected() {
    let settings = settings_with_secret(Some("too-short"));

    assert!(build_token_service(&settings).is_err());
}
