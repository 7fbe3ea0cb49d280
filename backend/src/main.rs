//! Backend entry-point: loads settings, prepares the database and serves the
//! REST API, uploaded images and OpenAPI docs.

mod server;

use std::io;
use std::sync::Arc;

use actix_web::web;
use ortho_config::OrthoConfig as _;
use rand::RngCore as _;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};
use zeroize::Zeroizing;

use alertline::domain::ports::OtpMailer;
use alertline::inbound::http::health::HealthState;
use alertline::outbound::mail::{SmtpOtpMailer, SmtpSettings, TracingOtpMailer};
use alertline::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use alertline::outbound::security::JwtTokenService;
use alertline::outbound::storage::LocalImageStore;
use alertline::settings::AppSettings;

use server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|err| io::Error::other(format!("failed to load settings: {err}")))?;
    let config = build_server_config(&settings).await?;

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config)?;
    server.await
}

/// Resolve the signing secret. Debug builds, or release builds with
/// `ALERTLINE_ALLOW_EPHEMERAL_SECRET=1`, fall back to a random secret that
/// invalidates every token on restart.
fn token_secret(settings: &AppSettings) -> io::Result<Zeroizing<Vec<u8>>> {
    if let Some(secret) = settings.jwt_secret.as_deref() {
        return Ok(Zeroizing::new(secret.as_bytes().to_vec()));
    }
    let allow_ephemeral =
        std::env::var("ALERTLINE_ALLOW_EPHEMERAL_SECRET").ok().as_deref() == Some("1");
    if cfg!(debug_assertions) || allow_ephemeral {
        warn!("using a temporary token secret (dev only)");
        let mut secret = Zeroizing::new(vec![0_u8; 64]);
        rand::thread_rng().fill_bytes(&mut secret);
        return Ok(secret);
    }
    Err(io::Error::other("ALERTLINE_JWT_SECRET must be set"))
}

fn build_token_service(settings: &AppSettings) -> io::Result<JwtTokenService> {
    let secret = token_secret(settings)?;
    let service = JwtTokenService::new(&secret)
        .map_err(|err| io::Error::other(format!("invalid token secret: {err}")))?;
    match settings.token_lifetime() {
        Some(lifetime) => service
            .with_lifetime(lifetime)
            .map_err(|err| io::Error::other(format!("invalid token lifetime: {err}"))),
        None => Ok(service),
    }
}

fn build_mailer(settings: &AppSettings) -> io::Result<Arc<dyn OtpMailer>> {
    let Some(host) = settings.smtp_host.as_deref() else {
        warn!("ALERTLINE_SMTP_HOST is not set; passcodes are only logged");
        return Ok(Arc::new(TracingOtpMailer));
    };
    let from = settings
        .smtp_from
        .clone()
        .ok_or_else(|| io::Error::other("ALERTLINE_SMTP_FROM is required with an SMTP host"))?;
    let mut smtp = SmtpSettings::new(host, from);
    smtp.port = settings.smtp_port();
    smtp.starttls = settings.smtp_starttls();
    smtp.username.clone_from(&settings.smtp_username);
    smtp.password = settings.smtp_password.clone().map(Zeroizing::new);
    let mailer = SmtpOtpMailer::new(&smtp)
        .map_err(|err| io::Error::other(format!("invalid SMTP settings: {err}")))?;
    info!(host, port = smtp.port, "sending passcodes over SMTP");
    Ok(Arc::new(mailer))
}

async fn connect_database(settings: &AppSettings) -> io::Result<Option<DbPool>> {
    let Some(url) = settings.database_url.as_deref() else {
        warn!("ALERTLINE_DATABASE_URL is not set; using empty fixture stores");
        return Ok(None);
    };
    run_pending_migrations(url)
        .await
        .map_err(|err| io::Error::other(err.to_string()))?;
    let pool = DbPool::new(PoolConfig::new(url).with_max_size(settings.db_max_connections()))
        .await
        .map_err(|err| io::Error::other(err.to_string()))?;
    Ok(Some(pool))
}

async fn build_server_config(settings: &AppSettings) -> io::Result<ServerConfig> {
    let tokens = build_token_service(settings)?;
    let images = LocalImageStore::open(settings.uploads_dir())?;
    let otp_policy = settings
        .otp_policy()
        .map_err(|err| io::Error::other(format!("invalid passcode policy: {err}")))?;

    let mut config = ServerConfig::new(settings.bind_addr(), tokens, images)
        .with_mailer(build_mailer(settings)?)
        .with_policies(otp_policy, settings.lockout_policy());
    if let Some(pool) = connect_database(settings).await? {
        config = config.with_db_pool(pool);
    }
    Ok(config)
}

#[cfg(test)]
mod tests;
