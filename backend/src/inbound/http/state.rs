//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::{
    AccountCommand, AlertCommand, AlertFeedQuery, EngagementCommand, NotificationCommand,
    TokenService,
};

/// Driving ports the handlers call.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub accounts: Arc<dyn AccountCommand>,
    pub alerts: Arc<dyn AlertCommand>,
    pub feed: Arc<dyn AlertFeedQuery>,
    pub engagement: Arc<dyn EngagementCommand>,
    pub notifications: Arc<dyn NotificationCommand>,
}

/// Dependency bundle for HTTP handlers.
///
/// `tokens` and `clock` back the bearer extractor; handlers never verify
/// tokens themselves.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn AccountCommand>,
    pub alerts: Arc<dyn AlertCommand>,
    pub feed: Arc<dyn AlertFeedQuery>,
    pub engagement: Arc<dyn EngagementCommand>,
    pub notifications: Arc<dyn NotificationCommand>,
    pub tokens: Arc<dyn TokenService>,
    pub clock: Arc<dyn Clock>,
}

impl HttpState {
    /// Construct state from the driving ports and the token verifier.
    ///
    /// # Examples
    /// ```ignore
    /// let state = HttpState::new(ports, Arc::new(tokens), Arc::new(DefaultClock));
    /// let _feed = state.feed.clone();
    /// ```
    pub fn new(ports: HttpStatePorts, tokens: Arc<dyn TokenService>, clock: Arc<dyn Clock>) -> Self {
        let HttpStatePorts {
            accounts,
            alerts,
            feed,
            engagement,
            notifications,
        } = ports;
        Self {
            accounts,
            alerts,
            feed,
            engagement,
            notifications,
            tokens,
            clock,
        }
    }
}
