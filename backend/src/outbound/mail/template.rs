//! Plain-text bodies for passcode emails.

use crate::domain::OtpPurpose;
use crate::domain::ports::OtpDelivery;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct OtpEmail {
    pub(super) subject: &'static str,
    pub(super) body: String,
}

pub(super) fn render(delivery: &OtpDelivery) -> OtpEmail {
    let minutes = delivery.valid_for.num_minutes().max(1);
    let unit = if minutes == 1 { "minute" } else { "minutes" };
    let code = delivery.code.as_str();
    match delivery.purpose {
        OtpPurpose::EmailVerification => OtpEmail {
            subject: "Welcome to Alertline! Verify your email",
            body: format!(
                "Thanks for signing up.\n\n\
                 Your verification code is {code}.\n\
                 It is valid for {minutes} {unit}.\n\n\
                 If you did not create an account you can ignore this email.\n"
            ),
        },
        OtpPurpose::PasswordReset => OtpEmail {
            subject: "Password Reset OTP",
            body: format!(
                "We received a request to reset your password.\n\n\
                 Your reset code is {code}.\n\
                 It is valid for {minutes} {unit}.\n\n\
                 If you did not ask for a reset, your password has not changed.\n"
            ),
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rstest::rstest;

    use super::*;
    use crate::domain::{EmailAddress, OtpCode};

    fn delivery(purpose: OtpPurpose, valid_for: Duration) -> OtpDelivery {
        OtpDelivery {
            to: EmailAddress::new("ada@example.com").expect("email"),
            code: OtpCode::parse("482913").expect("code"),
            purpose,
            valid_for,
        }
    }

    #[rstest]
    #[case::verification(OtpPurpose::EmailVerification, 15, "Verify your email", "15 minutes")]
    #[case::reset(OtpPurpose::PasswordReset, 10, "Password Reset OTP", "10 minutes")]
    fn body_names_the_code_and_its_validity(
        #[case] purpose: OtpPurpose,
        #[case] minutes: i64,
        #[case] subject_fragment: &str,
        #[case] validity: &str,
    ) {
        let email = render(&delivery(purpose, Duration::minutes(minutes)));

        assert!(email.subject.contains(subject_fragment));
        assert!(email.body.contains("482913"));
        assert!(email.body.contains(validity));
    }

    #[rstest]
    fn sub_minute_validity_rounds_up_to_one_minute() {
        let email = render(&delivery(OtpPurpose::PasswordReset, Duration::seconds(20)));

        assert!(email.body.contains("valid for 1 minute."));
    }
}
