//! Application settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `ALERTLINE_*` environment variables and an
//! optional configuration file, in that order of precedence. Every field is
//! optional; the accessors supply defaults.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use chrono::Duration;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{LoginLockoutPolicy, OtpPolicy, OtpPolicyError};

const DEFAULT_BIND_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8080);
const DEFAULT_UPLOADS_DIR: &str = "uploads";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Runtime configuration for the `alertline` binary.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "ALERTLINE")]
pub struct AppSettings {
    /// Socket address the HTTP server listens on.
    pub bind_addr: Option<SocketAddr>,
    /// PostgreSQL connection URL. Without it the server runs on empty
    /// fixture stores.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub db_max_connections: Option<u32>,
    /// HS256 signing secret for bearer tokens, at least 32 bytes.
    pub jwt_secret: Option<String>,
    /// Bearer token lifetime in hours.
    pub token_lifetime_hours: Option<i64>,
    /// Directory receiving uploaded alert images.
    pub uploads_dir: Option<PathBuf>,
    /// SMTP relay host. Without it passcodes are written to the log.
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    /// Sender mailbox, for example `Alertline <no-reply@alertline.app>`.
    pub smtp_from: Option<String>,
    /// Disable STARTTLS for local relays.
    pub smtp_plaintext: Option<bool>,
    /// Wrong passcode entries allowed before the cooldown starts.
    pub otp_max_attempts: Option<u32>,
    /// Cooldown after the last allowed wrong entry, in seconds.
    pub otp_cooldown_seconds: Option<i64>,
    /// Failed logins allowed before the account is locked.
    pub login_max_attempts: Option<u32>,
    /// Account lockout length, in minutes.
    pub login_lockout_minutes: Option<i64>,
}

impl AppSettings {
    /// Listen address, defaulting to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr.unwrap_or(DEFAULT_BIND_ADDR)
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections.unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
    }

    pub fn token_lifetime(&self) -> Option<Duration> {
        self.token_lifetime_hours.map(Duration::hours)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.uploads_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOADS_DIR))
    }

    pub fn smtp_port(&self) -> u16 {
        self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT)
    }

    pub fn smtp_starttls(&self) -> bool {
        !self.smtp_plaintext.unwrap_or(false)
    }

    /// Passcode policy with any configured overrides applied.
    ///
    /// # Errors
    ///
    /// Returns [`OtpPolicyError`] when an override is out of range.
    pub fn otp_policy(&self) -> Result<OtpPolicy, OtpPolicyError> {
        let mut policy = OtpPolicy::default();
        if let Some(max_attempts) = self.otp_max_attempts {
            policy = policy.with_max_attempts(max_attempts)?;
        }
        if let Some(seconds) = self.otp_cooldown_seconds {
            policy = policy.with_cooldown(Duration::seconds(seconds))?;
        }
        Ok(policy)
    }

    pub fn lockout_policy(&self) -> LoginLockoutPolicy {
        let defaults = LoginLockoutPolicy::default();
        LoginLockoutPolicy::new(
            self.login_max_attempts.unwrap_or(defaults.max_attempts()),
            self.login_lockout_minutes
                .map_or(defaults.lockout(), Duration::minutes),
        )
    }
}
