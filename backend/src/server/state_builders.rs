//! Builders wiring repositories and collaborators into the HTTP state.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use alertline::domain::ports::{
    AlertRepository, FixtureAlertRepository, FixtureNotificationRepository, FixtureOtpRepository,
    FixtureUserRepository, NotificationRepository, OtpRepository, UserRepository,
};
use alertline::domain::{
    AccountCollaborators, AccountService, AlertService, EngagementService, NotificationService,
};
use alertline::inbound::http::state::{HttpState, HttpStatePorts};
use alertline::outbound::persistence::{
    DieselAlertRepository, DieselNotificationRepository, DieselOtpRepository,
    DieselUserRepository,
};
use alertline::outbound::security::Argon2Hasher;

use super::ServerConfig;

/// Store adapters shared by the services.
struct Stores<U, O, A, N> {
    users: Arc<U>,
    otps: Arc<O>,
    alerts: Arc<A>,
    notifications: Arc<N>,
}

fn build_ports<U, O, A, N>(
    stores: Stores<U, O, A, N>,
    config: &ServerConfig,
    clock: &Arc<dyn Clock>,
) -> HttpStatePorts
where
    U: UserRepository + 'static,
    O: OtpRepository + 'static,
    A: AlertRepository + 'static,
    N: NotificationRepository + 'static,
{
    let Stores {
        users,
        otps,
        alerts,
        notifications,
    } = stores;

    let accounts = AccountService::new(
        Arc::clone(&users),
        otps,
        AccountCollaborators {
            hasher: Arc::new(Argon2Hasher::new()),
            tokens: config.tokens.clone(),
            mailer: Arc::clone(&config.mailer),
            clock: Arc::clone(clock),
        },
    )
    .with_otp_policy(config.otp_policy)
    .with_lockout_policy(config.lockout);
    let alert_service = Arc::new(AlertService::new(
        Arc::clone(&alerts),
        config.images.clone(),
        Arc::clone(clock),
    ));

    HttpStatePorts {
        accounts: Arc::new(accounts),
        alerts: alert_service.clone(),
        feed: alert_service,
        engagement: Arc::new(EngagementService::new(Arc::clone(&alerts))),
        notifications: Arc::new(NotificationService::new(
            notifications,
            users,
            alerts,
            Arc::clone(clock),
        )),
    }
}

/// Build the HTTP state, backed by Diesel when a pool is configured and by
/// empty fixture stores otherwise.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let ports = match &config.db_pool {
        Some(pool) => build_ports(
            Stores {
                users: Arc::new(DieselUserRepository::new(pool.clone())),
                otps: Arc::new(DieselOtpRepository::new(pool.clone())),
                alerts: Arc::new(DieselAlertRepository::new(pool.clone())),
                notifications: Arc::new(DieselNotificationRepository::new(pool.clone())),
            },
            config,
            &clock,
        ),
        None => build_ports(
            Stores {
                users: Arc::new(FixtureUserRepository),
                otps: Arc::new(FixtureOtpRepository),
                alerts: Arc::new(FixtureAlertRepository),
                notifications: Arc::new(FixtureNotificationRepository),
            },
            config,
            &clock,
        ),
    };
    web::Data::new(HttpState::new(ports, config.tokens.clone(), clock))
}
