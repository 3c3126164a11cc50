//! Time range normalization
//!
//! Converts user-supplied, possibly open-ended date-like bounds into a
//! closed, UTC-normalized interval. Date-only end bounds are inclusive
//! through the end of that day. Used when resolving the `time_range`
//! open parameter against the indexed archive.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

/// Errors from parsing date or timestamp text
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeRangeError {
    /// Input matched none of the recognized textual formats
    #[error("Invalid date or timestamp: {0:?}")]
    Parse(String),
}

/// Sentinel lower bound used when no start is given: 2010-01-01T00:00:00Z.
pub fn min_time() -> DateTime<Utc> {
    sentinel(2010)
}

/// Sentinel upper bound used when no end is given: 2100-01-01T00:00:00Z.
pub fn max_time() -> DateTime<Utc> {
    sentinel(2100)
}

fn sentinel(year: i32) -> DateTime<Utc> {
    // Both sentinel dates are valid by construction
    NaiveDate::from_ymd_opt(year, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Normalize an open-ended pair of date-like bounds into closed UTC
/// timestamps.
///
/// A missing (or empty) start maps to [`min_time`], a missing end to
/// [`max_time`]. An end given as a bare calendar date is inclusive through
/// the end of that day: its resolved timestamp is the date's midnight plus
/// one day minus one microsecond. Malformed input propagates as
/// [`TimeRangeError::Parse`].
pub fn normalize_time_range(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), TimeRangeError> {
    let start_ts = match start {
        None | Some("") => min_time(),
        Some(text) => parse_timestamp(text)?,
    };
    let end_ts = match end {
        None | Some("") => max_time(),
        Some(text) => {
            let ts = parse_timestamp(text)?;
            if parse_bare_date(text).is_some() {
                ts + Duration::days(1) - Duration::microseconds(1)
            } else {
                ts
            }
        }
    };
    Ok((start_ts, end_ts))
}

/// Parse one of the recognized textual forms into a UTC timestamp.
///
/// Bare dates resolve to midnight; naive timestamps are taken as UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, TimeRangeError> {
    if let Some(date) = parse_bare_date(text) {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(ndt.and_utc());
        }
    }
    Err(TimeRangeError::Parse(text.to_string()))
}

fn parse_bare_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(text, "%Y/%m/%d"))
        .ok()
}
