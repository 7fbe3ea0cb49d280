//! Conversions between Postgres integer columns and domain counters.

/// Widen a stored `int4` counter. Negative values never pass the table's
/// check constraints, so they clamp to zero.
pub(crate) fn count_from_db(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Narrow a domain counter for storage, saturating at `i32::MAX`.
pub(crate) fn count_for_db(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
