//! Reference-date handling.
//!
//! Exchange feeds stamp rows as `DD-Mon-YYYY`. Rows are selected by exact
//! string equality with the reference date rendered the same way and
//! upper-cased, so `9-Jun-2025` in a feed never matches `09-JUN-2025`.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

/// Calendar day of `now` in `tz`.
pub fn reference_date(now: DateTime<Utc>, tz: Tz) -> NaiveDate {
    now.with_timezone(&tz).date_naive()
}

/// `09-JUN-2025`
pub fn feed_date_string(date: NaiveDate) -> String {
    date.format("%d-%b-%Y").to_string().to_uppercase()
}

/// `2025-06-09`
pub fn human_date_string(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
