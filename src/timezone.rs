//! Helpers for working with the configured local timezone.

use time::{Date, OffsetDateTime, UtcOffset};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Get the UTC offset for a canonical timezone name, e.g. "America/Sao_Paulo".
pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Get today's calendar date in the given timezone.
///
/// Ledger entries carry a calendar date with no time component, so "today"
/// must be computed in the church's local timezone rather than UTC.
///
/// # Errors
/// Returns [Error::InvalidTimezone] if `canonical_timezone` is not a valid
/// canonical timezone name.
pub fn today_in(canonical_timezone: &str) -> Result<Date, Error> {
    get_local_offset(canonical_timezone)
        .map(|offset| OffsetDateTime::now_utc().to_offset(offset).date())
        .ok_or_else(|| Error::InvalidTimezone(canonical_timezone.to_owned()))
}
