//! lettre-backed SMTP implementation of the [`OtpMailer`] port.
//!
//! This adapter owns transport details only: sender parsing, message
//! assembly and mapping lettre failures onto [`OtpDeliveryError`].

use std::fmt;

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::template::render;
use crate::domain::ports::{OtpDelivery, OtpDeliveryError, OtpMailer};

const DEFAULT_SMTP_PORT: u16 = 587;

/// Connection settings for the outbound SMTP relay.
#[derive(Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
    /// Sender mailbox, e.g. `Alertline <no-reply@alertline.invalid>`.
    pub from: String,
    /// Upgrade the connection with STARTTLS. Disable only for local relays.
    pub starttls: bool,
}

impl SmtpSettings {
    /// Settings for an authenticated STARTTLS relay on the submission port.
    pub fn new(host: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_SMTP_PORT,
            username: None,
            password: None,
            from: from.into(),
            starttls: true,
        }
    }
}

impl fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("starttls", &self.starttls)
            .finish()
    }
}

/// Errors raised while building the SMTP adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SmtpSettingsError {
    #[error("invalid sender mailbox `{from}`: {message}")]
    InvalidSender { from: String, message: String },
    #[error("failed to configure smtp transport: {message}")]
    Transport { message: String },
}

/// Sends passcode emails through an SMTP relay.
#[derive(Clone)]
pub struct SmtpOtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpOtpMailer {
    /// Build the adapter. No connection is opened until the first send.
    ///
    /// # Errors
    ///
    /// Returns [`SmtpSettingsError`] when the sender is not a valid mailbox or
    /// the TLS parameters for `host` cannot be built.
    pub fn new(settings: &SmtpSettings) -> Result<Self, SmtpSettingsError> {
        let from = settings
            .from
            .parse::<Mailbox>()
            .map_err(|err| SmtpSettingsError::InvalidSender {
                from: settings.from.clone(),
                message: err.to_string(),
            })?;

        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host).map_err(
                |err| SmtpSettingsError::Transport {
                    message: err.to_string(),
                },
            )?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
        };
        let mut builder = builder.port(settings.port);
        if let (Some(username), Some(password)) = (&settings.username, &settings.password) {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                password.as_str().to_owned(),
            ));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

fn compose(from: &Mailbox, delivery: &OtpDelivery) -> Result<Message, OtpDeliveryError> {
    let to = delivery
        .to
        .to_string()
        .parse::<Mailbox>()
        .map_err(|err| OtpDeliveryError::compose(format!("recipient: {err}")))?;
    let email = render(delivery);
    Message::builder()
        .from(from.clone())
        .to(to)
        .subject(email.subject)
        .header(ContentType::TEXT_PLAIN)
        .body(email.body)
        .map_err(|err| OtpDeliveryError::compose(err.to_string()))
}

#[async_trait]
impl OtpMailer for SmtpOtpMailer {
    async fn send(&self, delivery: &OtpDelivery) -> Result<(), OtpDeliveryError> {
        let message = compose(&self.from, delivery)?;
        match self.transport.send(message).await {
            Ok(_) => {
                info!(to = %delivery.to, purpose = %delivery.purpose, "otp email sent");
                Ok(())
            }
            Err(err) => {
                warn!(
                    to = %delivery.to,
                    purpose = %delivery.purpose,
                    error = %err,
                    "otp email delivery failed"
                );
                Err(OtpDeliveryError::transport(err.to_string()))
            }
        }
    }
}
