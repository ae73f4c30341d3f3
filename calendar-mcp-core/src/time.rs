//! Timestamp parsing and formatting.
//!
//! Accepted input forms:
//! - RFC 3339 with offset: `2025-03-20T15:00:00+01:00`
//! - local date-time without offset: `2025-03-20T15:00` or `2025-03-20T15:00:00`
//!   (the given timezone supplies the offset)
//! - date only: `2025-03-20` (midnight, flagged as date-only)

use chrono::{
    DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, SecondsFormat,
    TimeZone,
};
use chrono_tz::Tz;

use crate::error::{CalendarError, CalendarResult};

/// A parsed caller timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timestamp {
    pub value: DateTime<FixedOffset>,
    /// True when the caller gave only a date.
    pub date_only: bool,
}

const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"];

pub fn parse_timestamp(s: &str, tz: Tz) -> CalendarResult<Timestamp> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Timestamp {
            value: dt,
            date_only: false,
        });
    }

    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Timestamp {
                value: localize(naive, tz)?,
                date_only: false,
            });
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Timestamp {
            value: localize(date.and_time(NaiveTime::MIN), tz)?,
            date_only: true,
        });
    }

    Err(CalendarError::validation(format!(
        "Invalid timestamp '{s}'. Expected ISO 8601, e.g. 2025-03-20T15:00:00+01:00, 2025-03-20T15:00 or 2025-03-20"
    )))
}

/// Attach the zone's offset to a wall-clock time. Ambiguous times (DST fall
/// back) take the earlier instant; skipped times (DST spring forward) are
/// rejected.
fn localize(naive: NaiveDateTime, tz: Tz) -> CalendarResult<DateTime<FixedOffset>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&dt.offset().fix()))
        .ok_or_else(|| {
            CalendarError::validation(format!(
                "{} does not exist in timezone {} (skipped by a DST change)",
                naive, tz
            ))
        })
}

/// Midnight at the start of `date`, in `offset`.
pub fn start_of_day(date: NaiveDate, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(NaiveTime::MIN);
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}

/// True when the time-of-day component is exactly midnight.
pub fn is_midnight(dt: &DateTime<FixedOffset>) -> bool {
    dt.time() == NaiveTime::MIN
}

/// RFC 3339 with seconds precision, keeping the value's own offset.
pub fn format_timestamp(dt: &DateTime<FixedOffset>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// "Hh Mm" breakdown of a minute count.
pub fn format_hours_minutes(minutes: i64) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}
