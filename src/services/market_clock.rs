//! NSE trading-session predicate.

use chrono::{DateTime, Datelike, FixedOffset, Timelike, Utc, Weekday};

// IST has no DST, so a fixed offset is exact.
const IST_OFFSET_SECS: i32 = 5 * 3600 + 1800;

const OPEN_MINUTE: u32 = 9 * 60 + 15;
const CLOSE_MINUTE: u32 = 15 * 60 + 30;

/// Whether the market is open at `now`: Monday-Friday, 09:15-15:30 IST
/// inclusive. Pure; whether a check cycle runs at all is the scheduler's call.
pub fn is_open(now: DateTime<Utc>) -> bool {
    let ist = now.with_timezone(&ist_offset());

    if matches!(ist.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }

    let minute = ist.hour() * 60 + ist.minute();
    (OPEN_MINUTE..=CLOSE_MINUTE).contains(&minute)
}

fn ist_offset() -> FixedOffset {
    // 5:30 east of UTC is always a valid offset.
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap()
}
