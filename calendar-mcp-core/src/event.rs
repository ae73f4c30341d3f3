//! Provider-neutral event types.
//!
//! These types represent calendar events independently of the backing store.
//! Store adapters convert their native records into these types, and the rest
//! of calendar-mcp works exclusively with them for validation, listing and
//! rendering.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, CalendarResult};
use crate::recurrence::RecurrenceRule;
use crate::time::{format_hours_minutes, format_timestamp, is_midnight, start_of_day};

/// Default number of characters of notes shown in previews.
pub const NOTES_PREVIEW_CHARS: usize = 100;

/// A calendar event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Absent until the store has persisted the event.
    pub id: Option<String>,
    pub title: String,
    pub start: DateTime<FixedOffset>,
    /// Exclusive for all-day events.
    pub end: DateTime<FixedOffset>,
    pub all_day: bool,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub url: Option<String>,
    pub calendar_id: Option<String>,
    /// Display name of the owning calendar (read-only)
    pub calendar_name: Option<String>,
    pub alarms: Vec<Alarm>,
    pub recurrence: Option<RecurrenceRule>,

    // Read-only, filled in by the provider
    pub attendees: Vec<Attendee>,
    pub organizer: Option<Attendee>,
}

/// A reminder relative to the event start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    /// Signed minutes relative to start; negative means before.
    pub offset_minutes: i64,
}

impl Alarm {
    pub fn minutes_before(minutes: i64) -> Self {
        Alarm {
            offset_minutes: -minutes,
        }
    }

    pub fn describe(&self) -> String {
        match self.offset_minutes {
            0 => "at start".to_string(),
            m if m < 0 => format!("{} minutes before", -m),
            m => format!("{} minutes after", m),
        }
    }
}

/// An event attendee (also used for the organizer).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub name: Option<String>,
    pub email: Option<String>,
    /// e.g. "accepted", "declined", "tentative", "pending"
    pub status: Option<String>,
}

impl Attendee {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("(unknown)")
    }
}

impl Event {
    pub fn validate(&self) -> CalendarResult<()> {
        if self.title.trim().is_empty() {
            return Err(CalendarError::validation("Event title must not be empty"));
        }
        if self.end < self.start {
            return Err(CalendarError::validation(format!(
                "Event end ({}) must not be before its start ({})",
                format_timestamp(&self.end),
                format_timestamp(&self.start)
            )));
        }
        if let Some(rule) = &self.recurrence {
            rule.validate()?;
            if rule.ends_before(self.start.date_naive()) {
                return Err(CalendarError::validation(format!(
                    "Recurrence ({}) ends before the event starts ({})",
                    rule.describe(),
                    format_timestamp(&self.start)
                )));
            }
        }
        Ok(())
    }

    /// Snap an all-day event onto whole-day boundaries.
    ///
    /// `start` drops its time of day; `end` moves up to the next midnight
    /// unless it already sits on one. The event always covers at least one
    /// day. Calling this twice changes nothing.
    pub fn normalize_all_day(&mut self) {
        if !self.all_day {
            return;
        }

        let offset = *self.start.offset();
        self.start = start_of_day(self.start.date_naive(), offset);

        let end_offset = *self.end.offset();
        let mut end = start_of_day(self.end.date_naive(), end_offset);
        if !is_midnight(&self.end) {
            end += Duration::days(1);
        }
        if end <= self.start {
            end = self.start + Duration::days(1);
        }
        self.end = end;
    }

    /// Whole minutes between start and end, never negative.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes().max(0)
    }

    /// Last calendar date covered by an all-day event (inclusive).
    pub fn last_all_day_date(&self) -> NaiveDate {
        let last = (self.end - Duration::days(1)).date_naive();
        last.max(self.start.date_naive())
    }

    pub fn notes_preview(&self, max_chars: usize) -> Option<String> {
        self.notes.as_deref().map(|notes| preview(notes, max_chars))
    }

    /// One line: start time (or "all day"), title and duration.
    pub fn to_summary_string(&self) -> String {
        let when = if self.all_day {
            "all day".to_string()
        } else {
            self.start.format("%H:%M").to_string()
        };
        format!("{} {} ({}m)", when, self.title, self.duration_minutes())
    }

    pub fn to_detail_string(&self) -> String {
        self.to_detail_string_with(NOTES_PREVIEW_CHARS)
    }

    pub fn to_detail_string_with(&self, notes_preview_chars: usize) -> String {
        let mut lines = vec![format!("Title: {}", self.title)];

        if let Some(id) = &self.id {
            lines.push(format!("ID: {}", id));
        }
        if let Some(calendar) = self.calendar_name.as_ref().or(self.calendar_id.as_ref()) {
            lines.push(format!("Calendar: {}", calendar));
        }

        if self.all_day {
            let first = self.start.date_naive();
            let last = self.last_all_day_date();
            if first == last {
                lines.push(format!("Date: {} (all day)", first));
            } else {
                lines.push(format!("Dates: {} to {} (all day)", first, last));
            }
        } else {
            lines.push(format!("Start: {}", format_timestamp(&self.start)));
            lines.push(format!("End: {}", format_timestamp(&self.end)));
        }

        let minutes = self.duration_minutes();
        lines.push(format!(
            "Duration: {} minutes ({})",
            minutes,
            format_hours_minutes(minutes)
        ));

        if let Some(location) = &self.location {
            lines.push(format!("Location: {}", location));
        }
        if let Some(notes) = self.notes_preview(notes_preview_chars) {
            lines.push(format!("Notes: {}", notes));
        }
        if let Some(url) = &self.url {
            lines.push(format!("URL: {}", url));
        }
        if !self.attendees.is_empty() {
            let names: Vec<&str> = self.attendees.iter().map(Attendee::display_name).collect();
            lines.push(format!("Attendees: {}", names.join(", ")));
        }
        if let Some(organizer) = &self.organizer {
            lines.push(format!("Organizer: {}", organizer.display_name()));
        }
        if let Some(rule) = &self.recurrence {
            lines.push(format!("Repeats: {}", rule.describe()));
        }
        if !self.alarms.is_empty() {
            let alarms: Vec<String> = self.alarms.iter().map(Alarm::describe).collect();
            lines.push(format!("Alarms: {}", alarms.join(", ")));
        }

        lines.join("\n")
    }
}

/// Truncate on a character boundary, marking the cut with "...".
fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}

/// A request to create an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub all_day: bool,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub url: Option<String>,
    pub calendar_id: Option<String>,
    pub alarms: Vec<Alarm>,
    pub recurrence: Option<RecurrenceRule>,
}

impl NewEvent {
    pub fn new(
        title: impl Into<String>,
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> Self {
        NewEvent {
            title: title.into(),
            start,
            end,
            all_day: false,
            location: None,
            notes: None,
            url: None,
            calendar_id: None,
            alarms: Vec::new(),
            recurrence: None,
        }
    }

    /// Build the event, normalizing all-day times before validating.
    pub fn into_event(self) -> CalendarResult<Event> {
        let mut event = Event {
            id: None,
            title: self.title.trim().to_string(),
            start: self.start,
            end: self.end,
            all_day: self.all_day,
            location: non_empty(self.location),
            notes: non_empty(self.notes),
            url: non_empty(self.url),
            calendar_id: self.calendar_id,
            calendar_name: None,
            alarms: self.alarms,
            recurrence: self.recurrence,
            attendees: Vec::new(),
            organizer: None,
        };
        event.normalize_all_day();
        event.validate()?;
        Ok(event)
    }
}

/// A partial update. `None` leaves a field alone; an empty string clears
/// `location`, `notes` or `url`.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub all_day: Option<bool>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub url: Option<String>,
    pub calendar_id: Option<String>,
    pub alarms: Option<Vec<Alarm>>,
    pub recurrence: Option<RecurrenceRule>,
    pub clear_recurrence: bool,
}

impl EventPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.start.is_none()
            && self.end.is_none()
            && self.all_day.is_none()
            && self.location.is_none()
            && self.notes.is_none()
            && self.url.is_none()
            && self.calendar_id.is_none()
            && self.alarms.is_none()
            && self.recurrence.is_none()
            && !self.clear_recurrence
    }

    /// Checks that don't need the existing event.
    pub fn validate(&self) -> CalendarResult<()> {
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(CalendarError::validation("Event title must not be empty"));
        }
        if self.recurrence.is_some() && self.clear_recurrence {
            return Err(CalendarError::validation(
                "Cannot set a recurrence and clear it in the same update",
            ));
        }
        if let Some(rule) = &self.recurrence {
            rule.validate()?;
        }
        Ok(())
    }

    /// Merge this patch into `event` and re-validate the result.
    pub fn apply(&self, mut event: Event) -> CalendarResult<Event> {
        self.validate()?;

        if let Some(title) = &self.title {
            event.title = title.trim().to_string();
        }
        if let Some(start) = self.start {
            event.start = start;
        }
        if let Some(end) = self.end {
            event.end = end;
        }
        if let Some(all_day) = self.all_day {
            event.all_day = all_day;
        }
        if let Some(location) = &self.location {
            event.location = non_empty(Some(location.clone()));
        }
        if let Some(notes) = &self.notes {
            event.notes = non_empty(Some(notes.clone()));
        }
        if let Some(url) = &self.url {
            event.url = non_empty(Some(url.clone()));
        }
        if let Some(calendar_id) = &self.calendar_id {
            event.calendar_id = Some(calendar_id.clone());
            event.calendar_name = None;
        }
        if let Some(alarms) = &self.alarms {
            event.alarms = alarms.clone();
        }
        if let Some(rule) = &self.recurrence {
            event.recurrence = Some(rule.clone());
        }
        if self.clear_recurrence {
            event.recurrence = None;
        }

        event.normalize_all_day();
        event.validate()?;
        Ok(event)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
