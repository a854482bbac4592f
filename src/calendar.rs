//! Calendar-day comparison for the lazy daily rollover.
//!
//! The running count resets when an accepted step lands on a different civil
//! day than the previous one. "Day" depends on a timezone policy: the
//! original behavior is device-local time, so [`DayBoundary::Local`] is the
//! default, but the policy is explicit so hosts can pin it.

use chrono::{FixedOffset, Local, NaiveDate, TimeZone, Utc};

/// Timezone policy used to decide where one day ends and the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayBoundary {
    /// Device-local civil day. Matches a user's intuition of "today", but
    /// shifts with timezone changes and DST.
    #[default]
    Local,
    /// UTC civil day. Stable across timezone changes.
    Utc,
    /// A fixed offset east of UTC, in seconds. Out-of-range offsets
    /// (beyond ±24h) fall back to UTC.
    FixedOffsetSecs(i32),
}

/// Civil date of a millisecond epoch timestamp under the given policy.
///
/// Returns `None` for timestamps outside chrono's representable range; the
/// caller treats that as "not the same day" without counting it as a
/// rollover.
fn civil_date(timestamp_ms: u64, policy: DayBoundary) -> Option<NaiveDate> {
    let utc = Utc.timestamp_millis_opt(timestamp_ms as i64).single()?;
    let date = match policy {
        DayBoundary::Local => utc.with_timezone(&Local).date_naive(),
        DayBoundary::Utc => utc.date_naive(),
        DayBoundary::FixedOffsetSecs(secs) => match FixedOffset::east_opt(secs) {
            Some(offset) => utc.with_timezone(&offset).date_naive(),
            None => utc.date_naive(),
        },
    };
    Some(date)
}

/// Whether two timestamps fall on the same civil day under `policy`.
pub fn same_calendar_day(t1_ms: u64, t2_ms: u64, policy: DayBoundary) -> bool {
    match (civil_date(t1_ms, policy), civil_date(t2_ms, policy)) {
        (Some(d1), Some(d2)) => d1 == d2,
        _ => false,
    }
}
