//! Tests for the passcode state machine.

use super::*;
use chrono::TimeZone;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rstest::{fixture, rstest};

#[fixture]
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

#[fixture]
fn policy() -> OtpPolicy {
    OtpPolicy::default()
}

fn code(raw: &str) -> OtpCode {
    OtpCode::parse(raw).expect("valid code")
}

#[fixture]
fn issued(policy: OtpPolicy, now: DateTime<Utc>) -> OtpRecord {
    let mut record = OtpRecord::empty(UserId::random(), OtpPurpose::EmailVerification);
    record.issue(code("123456"), &policy, now);
    record
}

#[rstest]
#[case(4)]
#[case(6)]
fn generated_codes_have_the_configured_width(#[case] width: u8) {
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..100 {
        let generated = OtpCode::generate(&mut rng, width);
        assert_eq!(generated.as_str().len(), usize::from(width));
        assert!(generated.as_str().chars().all(|c| c.is_ascii_digit()));
    }
}

#[rstest]
fn generated_codes_can_start_with_zero() {
    let mut rng = StdRng::seed_from_u64(11);
    let leading_zero = (0..1_000)
        .map(|_| OtpCode::generate(&mut rng, 4))
        .any(|generated| generated.as_str().starts_with('0'));
    assert!(leading_zero);
}

#[rstest]
#[case("", OtpCodeError::Empty)]
#[case("12a4", OtpCodeError::NonDigit)]
fn malformed_codes_are_rejected(#[case] raw: &str, #[case] expected: OtpCodeError) {
    assert_eq!(OtpCode::parse(raw).map(|_| ()), Err(expected));
}

#[rstest]
fn policy_rejects_unsupported_width(policy: OtpPolicy) {
    assert_eq!(
        policy.with_width(5),
        Err(OtpPolicyError::UnsupportedWidth(5))
    );
    assert_eq!(policy.with_max_attempts(0), Err(OtpPolicyError::ZeroAttempts));
}

#[rstest]
fn issue_sets_expiry_from_purpose_ttl(policy: OtpPolicy, now: DateTime<Utc>) {
    let mut reset = OtpRecord::empty(UserId::random(), OtpPurpose::PasswordReset);
    reset.issue(code("000111"), &policy, now);
    assert_eq!(reset.expires_at(), Some(now + Duration::minutes(10)));
    assert_eq!(reset.last_requested_at(), Some(now));

    let mut verification = OtpRecord::empty(UserId::random(), OtpPurpose::EmailVerification);
    verification.issue(code("000111"), &policy, now);
    assert_eq!(verification.expires_at(), Some(now + Duration::hours(1)));
}

#[rstest]
fn matching_code_verifies_without_consuming(
    mut issued: OtpRecord,
    policy: OtpPolicy,
    now: DateTime<Utc>,
) {
    assert_eq!(issued.verify(&code("123456"), &policy, now), Ok(()));
    assert!(issued.code().is_some());
    issued.clear();
    assert!(issued.code().is_none());
    assert_eq!(issued.attempts(), 0);
}

#[rstest]
fn wrong_code_adds_exactly_one_attempt_and_keeps_code(
    mut issued: OtpRecord,
    policy: OtpPolicy,
    now: DateTime<Utc>,
) {
    assert_eq!(
        issued.verify(&code("654321"), &policy, now),
        Err(OtpRejection::Mismatch {
            remaining_attempts: 2
        })
    );
    assert_eq!(issued.attempts(), 1);
    assert!(issued.code().is_some());
    assert!(issued.cooldown_until().is_none());
}

#[rstest]
fn last_allowed_miss_starts_cooldown(mut issued: OtpRecord, policy: OtpPolicy, now: DateTime<Utc>) {
    for _ in 0..2 {
        let _ = issued.verify(&code("000000"), &policy, now);
    }
    assert_eq!(
        issued.verify(&code("000000"), &policy, now),
        Err(OtpRejection::Mismatch {
            remaining_attempts: 0
        })
    );
    assert_eq!(issued.cooldown_until(), Some(now + Duration::seconds(60)));

    // Even the right code is refused while cooling down.
    assert_eq!(
        issued.verify(&code("123456"), &policy, now + Duration::seconds(15)),
        Err(OtpRejection::CoolingDown {
            retry_after_seconds: 45
        })
    );
    assert_eq!(issued.attempts(), 3);
}

#[rstest]
fn elapsed_cooldown_resets_attempts(mut issued: OtpRecord, policy: OtpPolicy, now: DateTime<Utc>) {
    for _ in 0..3 {
        let _ = issued.verify(&code("000000"), &policy, now);
    }
    let later = now + Duration::seconds(61);
    assert_eq!(
        issued.verify(&code("000000"), &policy, later),
        Err(OtpRejection::Mismatch {
            remaining_attempts: 2
        })
    );
    assert_eq!(issued.attempts(), 1);
    assert!(issued.cooldown_until().is_none());
}

#[rstest]
fn expired_code_is_rejected(mut issued: OtpRecord, policy: OtpPolicy, now: DateTime<Utc>) {
    let later = now + Duration::hours(1) + Duration::seconds(1);
    assert_eq!(
        issued.verify(&code("123456"), &policy, later),
        Err(OtpRejection::Expired)
    );
    assert_eq!(issued.attempts(), 0);
}

#[rstest]
fn missing_code_is_rejected(policy: OtpPolicy, now: DateTime<Utc>) {
    let mut record = OtpRecord::empty(UserId::random(), OtpPurpose::EmailVerification);
    assert_eq!(
        record.verify(&code("123456"), &policy, now),
        Err(OtpRejection::NoOtp)
    );
}

#[rstest]
fn reissue_during_cooldown_keeps_attempts(
    mut issued: OtpRecord,
    policy: OtpPolicy,
    now: DateTime<Utc>,
) {
    for _ in 0..3 {
        let _ = issued.verify(&code("000000"), &policy, now);
    }
    issued.issue(code("999999"), &policy, now + Duration::seconds(10));
    assert_eq!(issued.attempts(), 3);
    assert!(issued.cooldown_until().is_some());

    issued.issue(code("888888"), &policy, now + Duration::seconds(120));
    assert_eq!(issued.attempts(), 0);
    assert!(issued.cooldown_until().is_none());
}

#[rstest]
fn resend_wait_counts_down(issued: OtpRecord, policy: OtpPolicy, now: DateTime<Utc>) {
    assert_eq!(
        issued.resend_wait(&policy, now + Duration::seconds(20)),
        Some(40)
    );
    assert_eq!(issued.resend_wait(&policy, now + Duration::seconds(60)), None);
}

#[rstest]
fn status_reports_countdowns(mut issued: OtpRecord, policy: OtpPolicy, now: DateTime<Utc>) {
    let _ = issued.verify(&code("000000"), &policy, now);
    let status = issued.status(&policy, now + Duration::minutes(10));
    assert_eq!(
        status,
        OtpStatus {
            purpose: OtpPurpose::EmailVerification,
            active: true,
            remaining_validity_seconds: 50 * 60,
            remaining_attempts: 2,
            remaining_cooldown_seconds: 0,
        }
    );

    let expired = issued.status(&policy, now + Duration::hours(2));
    assert!(!expired.active);
    assert_eq!(expired.remaining_validity_seconds, 0);
}

#[rstest]
fn drafts_without_expiry_drop_the_code(now: DateTime<Utc>) {
    let record = OtpRecord::from(OtpRecordDraft {
        user_id: UserId::random(),
        purpose: OtpPurpose::PasswordReset,
        code: Some(code("1234")),
        expires_at: None,
        attempts: 1,
        last_requested_at: Some(now),
        cooldown_until: None,
    });
    assert!(record.code().is_none());
    assert_eq!(record.attempts(), 1);
}

#[rstest]
#[case(OtpPurpose::EmailVerification)]
#[case(OtpPurpose::PasswordReset)]
fn purposes_round_trip_through_storage_keys(#[case] purpose: OtpPurpose) {
    assert_eq!(OtpPurpose::from_storage(purpose.as_str()), Some(purpose));
}

fn redemption(record: &OtpRecord, candidate: &str, acceptance: OtpAcceptance, now: DateTime<Utc>) -> OtpRedemption {
    OtpRedemption {
        user_id: record.user_id(),
        purpose: record.purpose(),
        candidate: code(candidate),
        policy: OtpPolicy::default(),
        now,
        acceptance,
    }
}

#[rstest]
fn status_countdowns_round_down(issued: OtpRecord, policy: OtpPolicy, now: DateTime<Utc>) {
    let status = issued.status(&policy, now + Duration::milliseconds(1_500));

    assert_eq!(status.remaining_validity_seconds, 3_598);
    assert!(issued.status(&policy, now + Duration::milliseconds(3_599_500)).active);
}

#[rstest]
fn consuming_redemption_clears_the_record(issued: OtpRecord, now: DateTime<Utc>) {
    let (changed, verdict) =
        redemption(&issued, "123456", OtpAcceptance::VerifyEmail, now).apply(Some(issued));

    assert_eq!(verdict, Ok(3));
    let cleared = changed.expect("record changed");
    assert!(cleared.code().is_none());
    assert_eq!(cleared.attempts(), 0);
}

#[rstest]
fn keeping_redemption_leaves_an_untouched_record_alone(issued: OtpRecord, now: DateTime<Utc>) {
    let (changed, verdict) =
        redemption(&issued, "123456", OtpAcceptance::Keep, now).apply(Some(issued));

    assert_eq!(verdict, Ok(3));
    assert!(changed.is_none());
}

#[rstest]
fn missed_redemption_returns_the_counted_record(issued: OtpRecord, now: DateTime<Utc>) {
    let (changed, verdict) =
        redemption(&issued, "000000", OtpAcceptance::VerifyEmail, now).apply(Some(issued));

    assert_eq!(
        verdict,
        Err(OtpRejection::Mismatch {
            remaining_attempts: 2
        })
    );
    let counted = changed.expect("attempt recorded");
    assert_eq!(counted.attempts(), 1);
    assert!(counted.code().is_some());
}

#[rstest]
fn sequential_misses_stop_at_the_cooldown(issued: OtpRecord, now: DateTime<Utc>) {
    let mut stored = issued;
    let mut verdicts = Vec::new();
    for _ in 0..5 {
        let (changed, verdict) =
            redemption(&stored, "000000", OtpAcceptance::Keep, now).apply(Some(stored.clone()));
        if let Some(record) = changed {
            stored = record;
        }
        verdicts.push(verdict);
    }
    let (_, late_match) =
        redemption(&stored, "123456", OtpAcceptance::VerifyEmail, now).apply(Some(stored));

    let misses = verdicts
        .iter()
        .filter(|verdict| matches!(verdict, Err(OtpRejection::Mismatch { .. })))
        .count();
    assert_eq!(misses, 3);
    assert!(matches!(late_match, Err(OtpRejection::CoolingDown { .. })));
}

#[rstest]
fn redemption_without_a_record_is_no_otp(now: DateTime<Utc>) {
    let empty = OtpRecord::empty(UserId::random(), OtpPurpose::PasswordReset);

    let (changed, verdict) =
        redemption(&empty, "123456", OtpAcceptance::Keep, now).apply(None);

    assert!(changed.is_none());
    assert_eq!(verdict, Err(OtpRejection::NoOtp));
}
