//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Whole seconds elapsed since `then`, clamped at zero.
///
/// Used for the derived `age_sec` field on conversation listings;
/// clock skew must never produce a negative age.
pub fn age_sec(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - then).num_seconds().max(0)
}
