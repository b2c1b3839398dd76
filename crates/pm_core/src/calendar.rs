//! Day-granularity date handling shared by the classifier and the plan store.
//!
//! Every comparison between a due date and "now" happens on calendar days in
//! the reference instant's zone. Time-of-day never takes part in the
//! difference.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

use crate::error::DueDateError;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Drops the sub-day component of `instant` in its own zone.
pub fn normalize_to_day<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveDate {
    instant.date_naive()
}

/// Signed number of calendar days from `today` until `due`.
///
/// Both arguments are midnight-normalized already, so the ceiling of the
/// duration in days is the exact day count.
pub fn day_delta(due: NaiveDate, today: NaiveDate) -> i64 {
    due.signed_duration_since(today).num_days()
}

/// Parses a stored due date into a calendar day.
///
/// Plain dates are taken as-is. Naive date-times lose their time of day.
/// RFC 3339 instants are first moved into `zone`, so an instant shortly after
/// UTC midnight can land on the previous local day.
pub fn parse_due_date<Tz: TimeZone>(raw: &str, zone: &Tz) -> Result<NaiveDate, DueDateError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DueDateError::Empty);
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }

    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(normalize_to_day(&instant.with_timezone(zone)));
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|value| value.date())
        .ok_or_else(|| DueDateError::Unparseable(trimmed.to_string()))
}

pub fn format_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
