//! Passcode delivery adapters.
//!
//! `SmtpOtpMailer` relays through an SMTP server with lettre. The
//! `TracingOtpMailer` only logs deliveries and is used when no SMTP host is
//! configured.

mod smtp_otp_mailer;
mod template;
mod tracing_otp_mailer;

pub use smtp_otp_mailer::{SmtpOtpMailer, SmtpSettings, SmtpSettingsError};
pub use tracing_otp_mailer::TracingOtpMailer;
