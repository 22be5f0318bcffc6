//! Lookback-window and staleness arithmetic.

use chrono::{DateTime, Duration, Utc};

/// Start of a lookback window of `days` days ending at `now`.
///
/// `None` when the window reaches past the earliest representable instant.
pub fn lookback_since(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    Duration::try_days(i64::from(days)).and_then(|window| now.checked_sub_signed(window))
}

/// Elapsed time from `then` to `now`, clamped at zero.
///
/// Timestamps in the future (clock skew on an author machine) count as
/// brand new rather than producing a negative age.
pub fn age(now: DateTime<Utc>, then: DateTime<Utc>) -> Duration {
    let delta = now.signed_duration_since(then);
    if delta < Duration::zero() {
        Duration::zero()
    } else {
        delta
    }
}
