//! Mailer that records deliveries in the log instead of sending them.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::domain::ports::{OtpDelivery, OtpDeliveryError, OtpMailer};

/// Logs each delivery. The code itself is only emitted at `debug` level so
/// local development can read it without it reaching production logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOtpMailer;

#[async_trait]
impl OtpMailer for TracingOtpMailer {
    async fn send(&self, delivery: &OtpDelivery) -> Result<(), OtpDeliveryError> {
        info!(
            to = %delivery.to,
            purpose = %delivery.purpose,
            valid_for_secs = delivery.valid_for.num_seconds(),
            "otp email suppressed: no smtp relay configured"
        );
        debug!(to = %delivery.to, code = delivery.code.as_str(), "otp code");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::{EmailAddress, OtpCode, OtpPurpose};

    #[tokio::test]
    async fn delivery_always_succeeds() {
        let delivery = OtpDelivery {
            to: EmailAddress::new("ada@example.com").expect("email"),
            code: OtpCode::parse("123456").expect("code"),
            purpose: OtpPurpose::EmailVerification,
            valid_for: Duration::minutes(15),
        };

        assert_eq!(TracingOtpMailer.send(&delivery).await, Ok(()));
    }
}
