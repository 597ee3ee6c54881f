//! Exchange session calendar — pure predicates over timezone-aware instants.
//!
//! The reference exchange trades 09:30–11:30 and 13:00–15:00 local time,
//! Monday through Friday. The *session window* additionally includes the
//! midday recess: a timestamp inside lunch still belongs to the trading day.
//! Collaborators use the window predicate to gate intraday syncs; live
//! alerting uses the stricter continuous-trading predicate.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Asia::Shanghai;
use chrono_tz::Tz;

/// Timezone of the reference exchange.
pub const EXCHANGE_TZ: Tz = Shanghai;

fn is_weekend(at: DateTime<Tz>) -> bool {
    matches!(at.weekday(), Weekday::Sat | Weekday::Sun)
}

fn minute_of_day(at: DateTime<Tz>) -> u32 {
    at.hour() * 60 + at.minute()
}

/// True while the market is actively matching orders (lunch excluded).
pub fn in_continuous_trading(at: DateTime<Tz>) -> bool {
    if is_weekend(at) {
        return false;
    }
    let minutes = minute_of_day(at);
    let morning = (9 * 60 + 30..=11 * 60 + 30).contains(&minutes);
    let afternoon = (13 * 60..=15 * 60).contains(&minutes);
    morning || afternoon
}

/// True anywhere inside the trading day, INCLUDING the 11:30–13:00 recess.
pub fn in_session_window(at: DateTime<Tz>) -> bool {
    if is_weekend(at) {
        return false;
    }
    let minutes = minute_of_day(at);
    let lunch = (11 * 60 + 30..13 * 60).contains(&minutes);
    in_continuous_trading(at) || lunch
}

/// Convenience for callers holding UTC instants.
pub fn in_session_window_utc(at: DateTime<Utc>) -> bool {
    in_session_window(at.with_timezone(&EXCHANGE_TZ))
}
