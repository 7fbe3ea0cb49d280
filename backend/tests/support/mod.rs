//! Shared harness for the HTTP integration tests.
//!
//! Wires the real services onto the in-memory doubles from
//! `alertline::test_support`, behind the same `/api` scope the server
//! mounts.

use std::sync::Arc;

use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{App, test as actix_test, web};
use chrono::{TimeZone, Utc};
use mockable::Clock;
use serde_json::Value;

use alertline::domain::{
    AccountCollaborators, AccountService, AlertService, EngagementService, NotificationService,
};
use alertline::Trace;
use alertline::inbound::http::api_scope;
use alertline::inbound::http::state::{HttpState, HttpStatePorts};
use alertline::outbound::security::{Argon2Hasher, JwtTokenService};
use alertline::test_support::{
    InMemoryAlertRepository, InMemoryImageStore, InMemoryNotificationRepository,
    InMemoryOtpRepository, InMemoryUserRepository, MutableClock, RecordingMailer,
};

const TOKEN_SECRET: &[u8] = b"integration-secret-integration-secret";

/// Stores and collaborators a test can reach into alongside the app.
pub struct Harness {
    pub clock: Arc<MutableClock>,
    pub users: Arc<InMemoryUserRepository>,
    pub alerts: Arc<InMemoryAlertRepository>,
    pub images: Arc<InMemoryImageStore>,
    pub mailer: Arc<RecordingMailer>,
    pub tokens: Arc<JwtTokenService>,
    state: web::Data<HttpState>,
}

impl Harness {
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2026, 6, 1, 9, 0, 0)
            .single()
            .expect("start time");
        let clock = Arc::new(MutableClock::new(start));
        let users = Arc::new(InMemoryUserRepository::default());
        let otps = Arc::new(InMemoryOtpRepository::new(users.clone()));
        let alerts = Arc::new(InMemoryAlertRepository::default());
        let notifications = Arc::new(InMemoryNotificationRepository::default());
        let images = Arc::new(InMemoryImageStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let tokens = Arc::new(JwtTokenService::new(TOKEN_SECRET).expect("token service"));
        let dyn_clock: Arc<dyn Clock> = clock.clone();

        let accounts = AccountService::new(
            users.clone(),
            otps,
            AccountCollaborators {
                hasher: Arc::new(Argon2Hasher::with_cost(8, 1, 1).expect("cheap argon2")),
                tokens: tokens.clone(),
                mailer: mailer.clone(),
                clock: dyn_clock.clone(),
            },
        );
        let alert_service = Arc::new(AlertService::new(
            alerts.clone(),
            images.clone(),
            dyn_clock.clone(),
        ));
        let ports = HttpStatePorts {
            accounts: Arc::new(accounts),
            alerts: alert_service.clone(),
            feed: alert_service,
            engagement: Arc::new(EngagementService::new(alerts.clone())),
            notifications: Arc::new(NotificationService::new(
                notifications,
                users.clone(),
                alerts.clone(),
                dyn_clock.clone(),
            )),
        };
        let state = web::Data::new(HttpState::new(ports, tokens.clone(), dyn_clock));

        Self {
            clock,
            users,
            alerts,
            images,
            mailer,
            tokens,
            state,
        }
    }

    /// Initialise the `/api` scope over this harness's state.
    pub async fn app(
        &self,
    ) -> impl Service<Request, Response = ServiceResponse, Error = actix_web::Error> {
        actix_test::init_service(
            App::new()
                .wrap(Trace)
                .app_data(self.state.clone())
                .service(api_scope()),
        )
        .await
    }
}

/// `Authorization` header carrying `token`.
pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

/// Read a response body as JSON, treating an empty body as `null`.
pub async fn json_body(response: ServiceResponse) -> Value {
    let bytes = actix_test::read_body(response).await;
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json body")
}
