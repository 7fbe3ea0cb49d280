//! Port for delivering one-time passcodes to users.

use async_trait::async_trait;
use chrono::Duration;

use crate::domain::{EmailAddress, OtpCode, OtpPurpose};

use super::define_port_error;

define_port_error! {
    /// Failures raised by OTP delivery adapters.
    pub enum OtpDeliveryError {
        /// The message could not be built.
        Compose { message: String } => "otp message could not be built: {message}",
        /// The transport rejected or failed to send the message.
        Transport { message: String } => "otp message could not be sent: {message}",
    }
}

/// Passcode message handed to a delivery adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpDelivery {
    pub to: EmailAddress,
    pub code: OtpCode,
    pub purpose: OtpPurpose,
    pub valid_for: Duration,
}

/// Delivery channel for one-time passcodes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpMailer: Send + Sync {
    async fn send(&self, delivery: &OtpDelivery) -> Result<(), OtpDeliveryError>;
}
