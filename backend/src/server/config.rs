//! HTTP server configuration object and helpers.

use std::net::SocketAddr;
use std::sync::Arc;

use alertline::domain::ports::OtpMailer;
use alertline::domain::{LoginLockoutPolicy, OtpPolicy};
use alertline::outbound::mail::TracingOtpMailer;
use alertline::outbound::persistence::DbPool;
use alertline::outbound::security::JwtTokenService;
use alertline::outbound::storage::LocalImageStore;

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) bind_addr: SocketAddr,
    pub(crate) db_pool: Option<DbPool>,
    pub(crate) tokens: Arc<JwtTokenService>,
    pub(crate) images: Arc<LocalImageStore>,
    pub(crate) mailer: Arc<dyn OtpMailer>,
    pub(crate) otp_policy: OtpPolicy,
    pub(crate) lockout: LoginLockoutPolicy,
}

impl ServerConfig {
    /// Configuration with fixture stores, logged passcodes and default
    /// policies.
    #[must_use]
    pub fn new(bind_addr: SocketAddr, tokens: JwtTokenService, images: LocalImageStore) -> Self {
        Self {
            bind_addr,
            db_pool: None,
            tokens: Arc::new(tokens),
            images: Arc::new(images),
            mailer: Arc::new(TracingOtpMailer),
            otp_policy: OtpPolicy::default(),
            lockout: LoginLockoutPolicy::default(),
        }
    }

    /// Attach a database connection pool; every store then uses Diesel.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn OtpMailer>) -> Self {
        self.mailer = mailer;
        self
    }

    #[must_use]
    pub fn with_policies(mut self, otp_policy: OtpPolicy, lockout: LoginLockoutPolicy) -> Self {
        self.otp_policy = otp_policy;
        self.lockout = lockout;
        self
    }

    /// Return the socket address the server will bind to.
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }
}
