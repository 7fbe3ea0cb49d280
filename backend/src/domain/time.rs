//! Small helpers for deadline arithmetic. Rate-limit hints round up;
//! countdown displays round down.

use chrono::{DateTime, Utc};

/// Whole seconds until `deadline`, rounded up; zero once it has passed.
pub(crate) fn remaining_seconds(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    let millis = (deadline - now).num_milliseconds();
    match u64::try_from(millis) {
        Ok(millis) => millis.div_ceil(1000),
        Err(_) => 0,
    }
}

/// Whole seconds until `deadline`, rounded down; zero once it has passed.
pub(crate) fn whole_seconds_left(deadline: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((deadline - now).num_seconds()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    #[rstest]
    #[case(Duration::seconds(30), 30)]
    #[case(Duration::milliseconds(1), 1)]
    #[case(Duration::milliseconds(1_500), 2)]
    #[case(Duration::zero(), 0)]
    #[case(Duration::seconds(-5), 0)]
    fn rounds_up_and_floors_at_zero(#[case] offset: Duration, #[case] expected: u64) {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().expect("timestamp");
        assert_eq!(remaining_seconds(now + offset, now), expected);
    }

    #[rstest]
    #[case(Duration::seconds(30), 30)]
    #[case(Duration::milliseconds(999), 0)]
    #[case(Duration::milliseconds(1_500), 1)]
    #[case(Duration::seconds(-5), 0)]
    fn whole_seconds_round_down(#[case] offset: Duration, #[case] expected: u64) {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().expect("timestamp");
        assert_eq!(whole_seconds_left(now + offset, now), expected);
    }
}
