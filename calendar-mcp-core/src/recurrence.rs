//! Recurrence rules for repeating events.
//!
//! A [`RecurrenceRule`] is the validated, provider-neutral description of a
//! repeating pattern. Callers hand in a loosely typed [`RecurrenceInput`];
//! providers exchange [`NativeRecurrence`] records. Both conversions funnel
//! through the same invariants: interval >= 1, at most one end condition,
//! weekdays only for weekly rules.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CalendarError, CalendarResult};
use crate::store::native::NativeRecurrence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn parse(s: &str) -> CalendarResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" | "annually" => Ok(Frequency::Yearly),
            other => Err(CalendarError::validation(format!(
                "Unknown recurrence frequency '{other}'. Use one of: daily, weekly, monthly, yearly"
            ))),
        }
    }

    /// Frequency code used by native providers.
    pub fn native_code(self) -> i64 {
        match self {
            Frequency::Daily => 0,
            Frequency::Weekly => 1,
            Frequency::Monthly => 2,
            Frequency::Yearly => 3,
        }
    }

    pub fn from_native_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Frequency::Daily),
            1 => Some(Frequency::Weekly),
            2 => Some(Frequency::Monthly),
            3 => Some(Frequency::Yearly),
            _ => None,
        }
    }

    fn rrule_name(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }

    fn unit(self, plural: bool) -> &'static str {
        match (self, plural) {
            (Frequency::Daily, false) => "day",
            (Frequency::Daily, true) => "days",
            (Frequency::Weekly, false) => "week",
            (Frequency::Weekly, true) => "weeks",
            (Frequency::Monthly, false) => "month",
            (Frequency::Monthly, true) => "months",
            (Frequency::Yearly, false) => "year",
            (Frequency::Yearly, true) => "years",
        }
    }
}

/// Day of the week, ordered and numbered the way calendar providers do
/// (Sunday = 1 .. Saturday = 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_number(n: i64) -> Option<Self> {
        if (1..=7).contains(&n) {
            Some(Self::ALL[(n - 1) as usize])
        } else {
            None
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let day = match s.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" | "su" => Weekday::Sunday,
            "monday" | "mon" | "mo" => Weekday::Monday,
            "tuesday" | "tue" | "tues" | "tu" => Weekday::Tuesday,
            "wednesday" | "wed" | "we" => Weekday::Wednesday,
            "thursday" | "thu" | "thurs" | "th" => Weekday::Thursday,
            "friday" | "fri" | "fr" => Weekday::Friday,
            "saturday" | "sat" | "sa" => Weekday::Saturday,
            _ => return None,
        };
        Some(day)
    }

    fn mask_bit(self) -> u8 {
        1 << (self.number() - 1)
    }

    fn rrule_code(self) -> &'static str {
        match self {
            Weekday::Sunday => "SU",
            Weekday::Monday => "MO",
            Weekday::Tuesday => "TU",
            Weekday::Wednesday => "WE",
            Weekday::Thursday => "TH",
            Weekday::Friday => "FR",
            Weekday::Saturday => "SA",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        };
        f.write_str(name)
    }
}

/// How a recurring series ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecurrenceEnd {
    /// Repeats indefinitely.
    #[default]
    Never,
    /// Last possible occurrence date (inclusive).
    Until(NaiveDate),
    /// Total number of occurrences.
    Count(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceRule {
    pub frequency: Frequency,
    pub interval: u32,
    pub end: RecurrenceEnd,
    pub days_of_week: BTreeSet<Weekday>,
}

impl RecurrenceRule {
    /// A rule repeating every unit of `frequency`, forever.
    pub fn new(frequency: Frequency) -> Self {
        RecurrenceRule {
            frequency,
            interval: 1,
            end: RecurrenceEnd::Never,
            days_of_week: BTreeSet::new(),
        }
    }

    pub fn every(mut self, interval: u32) -> Self {
        self.interval = interval;
        self
    }

    pub fn until(mut self, date: NaiveDate) -> Self {
        self.end = RecurrenceEnd::Until(date);
        self
    }

    pub fn count(mut self, count: u32) -> Self {
        self.end = RecurrenceEnd::Count(count);
        self
    }

    pub fn on(mut self, days: impl IntoIterator<Item = Weekday>) -> Self {
        self.days_of_week.extend(days);
        self
    }

    pub fn validate(&self) -> CalendarResult<()> {
        if self.interval < 1 {
            return Err(CalendarError::validation(
                "Recurrence interval must be at least 1",
            ));
        }
        if self.end == RecurrenceEnd::Count(0) {
            return Err(CalendarError::validation(
                "Recurrence count must be at least 1",
            ));
        }
        if !self.days_of_week.is_empty() && self.frequency != Frequency::Weekly {
            return Err(CalendarError::validation(
                "days_of_week can only be used with a weekly frequency",
            ));
        }
        Ok(())
    }

    /// Whether the series stops before the day it starts on.
    pub fn ends_before(&self, first_day: NaiveDate) -> bool {
        matches!(self.end, RecurrenceEnd::Until(until) if until < first_day)
    }

    /// Encode for a native provider. Pure mapping; call on validated rules.
    pub fn to_native(&self) -> NativeRecurrence {
        let (end_date, occurrence_count) = match self.end {
            RecurrenceEnd::Never => (None, None),
            RecurrenceEnd::Until(date) => (Some(date), None),
            RecurrenceEnd::Count(n) => (None, Some(i64::from(n))),
        };

        let days_of_week = if self.frequency == Frequency::Weekly {
            self.days_of_week.iter().fold(0u8, |mask, d| mask | d.mask_bit())
        } else {
            0
        };

        NativeRecurrence {
            frequency: self.frequency.native_code(),
            interval: i64::from(self.interval),
            end_date,
            occurrence_count,
            days_of_week,
        }
    }

    /// Decode a native provider record.
    ///
    /// Open-ended records are fine. Records this model cannot represent
    /// (unknown frequency, bad interval or count, both end conditions) come
    /// back as `None`.
    pub fn from_native(native: &NativeRecurrence) -> Option<Self> {
        let Some(frequency) = Frequency::from_native_code(native.frequency) else {
            warn!(frequency = native.frequency, "Dropping recurrence with unknown frequency");
            return None;
        };

        let Ok(interval) = u32::try_from(native.interval) else {
            warn!(interval = native.interval, "Dropping recurrence with invalid interval");
            return None;
        };

        let end = match (native.end_date, native.occurrence_count) {
            (None, None) => RecurrenceEnd::Never,
            (Some(date), None) => RecurrenceEnd::Until(date),
            (None, Some(n)) => match u32::try_from(n) {
                Ok(n) => RecurrenceEnd::Count(n),
                Err(_) => {
                    warn!(count = n, "Dropping recurrence with invalid occurrence count");
                    return None;
                }
            },
            (Some(_), Some(_)) => {
                warn!("Dropping recurrence that sets both an end date and an occurrence count");
                return None;
            }
        };

        let days_of_week = if frequency == Frequency::Weekly {
            Weekday::ALL
                .into_iter()
                .filter(|d| native.days_of_week & d.mask_bit() != 0)
                .collect()
        } else {
            BTreeSet::new()
        };

        let rule = RecurrenceRule {
            frequency,
            interval,
            end,
            days_of_week,
        };

        match rule.validate() {
            Ok(()) => Some(rule),
            Err(e) => {
                warn!(error = %e, "Dropping invalid native recurrence");
                None
            }
        }
    }

    /// Human-readable description, e.g. "Every 2 weeks on Monday, Friday until 2025-12-31".
    pub fn describe(&self) -> String {
        let mut text = if self.interval == 1 {
            match self.frequency {
                Frequency::Daily => "Daily".to_string(),
                Frequency::Weekly => "Weekly".to_string(),
                Frequency::Monthly => "Monthly".to_string(),
                Frequency::Yearly => "Yearly".to_string(),
            }
        } else {
            format!("Every {} {}", self.interval, self.frequency.unit(true))
        };

        if !self.days_of_week.is_empty() {
            let days: Vec<String> = self.days_of_week.iter().map(|d| d.to_string()).collect();
            text.push_str(&format!(" on {}", days.join(", ")));
        }

        match self.end {
            RecurrenceEnd::Never => {}
            RecurrenceEnd::Until(date) => text.push_str(&format!(" until {}", date)),
            RecurrenceEnd::Count(1) => text.push_str(", once"),
            RecurrenceEnd::Count(n) => text.push_str(&format!(", {} times", n)),
        }

        text
    }

    /// iCalendar text (DTSTART + RRULE) for the `rrule` crate parser.
    ///
    /// Everything is expressed in UTC; `until` covers the whole day in the
    /// series' own offset.
    pub fn to_rrule(&self, dtstart: &DateTime<FixedOffset>) -> String {
        let start_utc = dtstart.with_timezone(&Utc);
        let mut parts = vec![
            format!("FREQ={}", self.frequency.rrule_name()),
            format!("INTERVAL={}", self.interval),
        ];

        match self.end {
            RecurrenceEnd::Never => {}
            RecurrenceEnd::Count(n) => parts.push(format!("COUNT={}", n)),
            RecurrenceEnd::Until(date) => {
                let end_of_day = dtstart
                    .offset()
                    .from_local_datetime(&date.and_time(chrono::NaiveTime::MIN))
                    .single()
                    .map(|dt| dt.with_timezone(&Utc) + Duration::days(1) - Duration::seconds(1))
                    .unwrap_or_else(|| date.and_time(chrono::NaiveTime::MIN).and_utc());
                parts.push(format!("UNTIL={}", end_of_day.format("%Y%m%dT%H%M%SZ")));
            }
        }

        if !self.days_of_week.is_empty() {
            let days: Vec<&str> = self.days_of_week.iter().map(|d| d.rrule_code()).collect();
            parts.push(format!("BYDAY={}", days.join(",")));
        }

        format!(
            "DTSTART:{}\nRRULE:{}",
            start_utc.format("%Y%m%dT%H%M%SZ"),
            parts.join(";")
        )
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// A weekday as callers send it: a name/abbreviation or a number (Sunday = 1).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WeekdayInput {
    Number(i64),
    Name(String),
}

/// Recurrence as received from a caller, before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecurrenceInput {
    pub frequency: String,
    #[serde(default)]
    pub interval: Option<i64>,
    #[serde(default, alias = "end_date")]
    pub until: Option<String>,
    #[serde(default, alias = "occurrence_count")]
    pub count: Option<i64>,
    #[serde(default)]
    pub days_of_week: Option<Vec<WeekdayInput>>,
}

impl RecurrenceInput {
    pub fn into_rule(self) -> CalendarResult<RecurrenceRule> {
        let frequency = Frequency::parse(&self.frequency)?;

        let interval = self.interval.unwrap_or(1);
        if interval < 1 {
            return Err(CalendarError::validation(format!(
                "Recurrence interval must be at least 1, got {interval}"
            )));
        }
        let interval = u32::try_from(interval).map_err(|_| {
            CalendarError::validation(format!("Recurrence interval {interval} is too large"))
        })?;

        let end = match (self.until, self.count) {
            (Some(_), Some(_)) => {
                return Err(CalendarError::validation(
                    "Only one of until (end_date) or count (occurrence_count) can be set on a recurrence",
                ));
            }
            (Some(until), None) => RecurrenceEnd::Until(parse_until(&until)?),
            (None, Some(count)) => {
                if count < 1 {
                    return Err(CalendarError::validation(format!(
                        "Recurrence count must be at least 1, got {count}"
                    )));
                }
                let count = u32::try_from(count).map_err(|_| {
                    CalendarError::validation(format!("Recurrence count {count} is too large"))
                })?;
                RecurrenceEnd::Count(count)
            }
            (None, None) => RecurrenceEnd::Never,
        };

        let mut days_of_week = BTreeSet::new();
        for day in self.days_of_week.unwrap_or_default() {
            let parsed = match &day {
                WeekdayInput::Number(n) => Weekday::from_number(*n),
                WeekdayInput::Name(name) => Weekday::parse(name),
            };
            let parsed = parsed.ok_or_else(|| {
                let shown = match day {
                    WeekdayInput::Number(n) => n.to_string(),
                    WeekdayInput::Name(name) => name,
                };
                CalendarError::validation(format!(
                    "Unknown weekday '{shown}'. Use names (monday) or numbers 1-7 with Sunday = 1"
                ))
            })?;
            days_of_week.insert(parsed);
        }

        let rule = RecurrenceRule {
            frequency,
            interval,
            end,
            days_of_week,
        };
        rule.validate()?;
        Ok(rule)
    }
}

fn parse_until(s: &str) -> CalendarResult<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    Err(CalendarError::validation(format!(
        "Invalid recurrence end date '{s}'. Expected YYYY-MM-DD"
    )))
}
