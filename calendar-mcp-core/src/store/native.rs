//! Native calendar records as providers exchange them.
//!
//! The shapes follow what desktop calendar frameworks expose: alarms are
//! relative offsets in seconds, recurrence rules are a list (usually of one),
//! weekdays are a bitmask with Sunday as the lowest bit. Conversion to and
//! from [`Event`] happens here and nowhere else.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CalendarError, CalendarResult};
use crate::event::{Alarm, Attendee, Event};
use crate::recurrence::RecurrenceRule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeRecurrence {
    /// 0 daily, 1 weekly, 2 monthly, 3 yearly
    pub frequency: i64,
    #[serde(default = "default_interval")]
    pub interval: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence_count: Option<i64>,
    /// Bit `n - 1` set for weekday number `n` (Sunday = 1)
    #[serde(default)]
    pub days_of_week: u8,
}

fn default_interval() -> i64 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeAlarm {
    /// Seconds relative to the event start; negative fires before.
    pub relative_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeParticipant {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    pub title: String,
    pub start_date: DateTime<FixedOffset>,
    pub end_date: DateTime<FixedOffset>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_title: Option<String>,
    #[serde(default)]
    pub alarms: Vec<NativeAlarm>,
    #[serde(default)]
    pub recurrence_rules: Vec<NativeRecurrence>,
    #[serde(default)]
    pub attendees: Vec<NativeParticipant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<NativeParticipant>,
}

impl From<&NativeParticipant> for Attendee {
    fn from(p: &NativeParticipant) -> Self {
        Attendee {
            name: p.name.clone(),
            email: p.email.clone(),
            status: p.status.clone(),
        }
    }
}

impl From<&Event> for NativeEvent {
    /// Attendees and organizer are read-only and never written back.
    fn from(event: &Event) -> Self {
        NativeEvent {
            identifier: event.id.clone(),
            title: event.title.clone(),
            start_date: event.start,
            end_date: event.end,
            all_day: event.all_day,
            location: event.location.clone(),
            notes: event.notes.clone(),
            url: event.url.clone(),
            calendar_id: event.calendar_id.clone(),
            calendar_title: None,
            alarms: event
                .alarms
                .iter()
                .map(|a| NativeAlarm {
                    relative_offset: a.offset_minutes * 60,
                })
                .collect(),
            recurrence_rules: event.recurrence.iter().map(RecurrenceRule::to_native).collect(),
            attendees: Vec::new(),
            organizer: None,
        }
    }
}

impl TryFrom<NativeEvent> for Event {
    type Error = CalendarError;

    fn try_from(native: NativeEvent) -> CalendarResult<Self> {
        if native.recurrence_rules.len() > 1 {
            warn!(
                id = native.identifier.as_deref().unwrap_or("-"),
                rules = native.recurrence_rules.len(),
                "Event has several recurrence rules; keeping the first"
            );
        }

        let mut event = Event {
            id: native.identifier,
            title: native.title,
            start: native.start_date,
            end: native.end_date,
            all_day: native.all_day,
            location: native.location,
            notes: native.notes,
            url: native.url,
            calendar_id: native.calendar_id,
            calendar_name: native.calendar_title,
            alarms: native
                .alarms
                .iter()
                .map(|a| Alarm {
                    offset_minutes: a.relative_offset.div_euclid(60),
                })
                .collect(),
            recurrence: native
                .recurrence_rules
                .first()
                .and_then(RecurrenceRule::from_native),
            attendees: native.attendees.iter().map(Attendee::from).collect(),
            organizer: native.organizer.as_ref().map(Attendee::from),
        };

        if event.end < event.start {
            return Err(CalendarError::provider(
                "decode_event",
                format!(
                    "malformed record '{}' ({}): end precedes start",
                    event.id.as_deref().unwrap_or("-"),
                    event.title
                ),
            ));
        }

        // Frameworks report an all-day end as 23:59:59 of the last day.
        event.normalize_all_day();
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NewEvent;
    use crate::recurrence::{Frequency, Weekday};

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    #[test]
    fn event_survives_native_round_trip() {
        let mut request = NewEvent::new(
            "Standup",
            ts("2025-03-03T09:00:00+01:00"),
            ts("2025-03-03T09:15:00+01:00"),
        );
        request.alarms = vec![Alarm::minutes_before(5)];
        request.recurrence = Some(
            RecurrenceRule::new(Frequency::Weekly)
                .on([Weekday::Monday, Weekday::Thursday])
                .count(20),
        );
        request.location = Some("Zoom".into());
        let mut event = request.into_event().unwrap();
        event.id = Some("abc".into());

        let native = NativeEvent::from(&event);
        assert_eq!(native.alarms[0].relative_offset, -300);
        assert_eq!(native.recurrence_rules.len(), 1);

        let back = Event::try_from(native).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn attendees_are_read_from_native_records() {
        let native: NativeEvent = serde_json::from_value(serde_json::json!({
            "identifier": "x1",
            "title": "Review",
            "start_date": "2025-03-03T10:00:00+00:00",
            "end_date": "2025-03-03T11:00:00+00:00",
            "calendar_title": "Work",
            "attendees": [{"name": "Alice", "status": "accepted"}],
            "organizer": {"email": "boss@example.com"}
        }))
        .unwrap();

        let event = Event::try_from(native).unwrap();
        assert_eq!(event.calendar_name.as_deref(), Some("Work"));
        assert_eq!(event.attendees[0].display_name(), "Alice");
        assert_eq!(
            event.organizer.as_ref().map(|o| o.display_name()),
            Some("boss@example.com")
        );
        assert!(event.recurrence.is_none());
    }

    #[test]
    fn inverted_native_record_is_a_provider_error() {
        let native: NativeEvent = serde_json::from_value(serde_json::json!({
            "identifier": "bad",
            "title": "Broken",
            "start_date": "2025-03-03T11:00:00+00:00",
            "end_date": "2025-03-03T10:00:00+00:00"
        }))
        .unwrap();

        let err = Event::try_from(native).unwrap_err();
        assert!(matches!(err, CalendarError::Provider { .. }));
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn all_day_end_before_midnight_rounds_up() {
        let native: NativeEvent = serde_json::from_value(serde_json::json!({
            "identifier": "h1",
            "title": "Holiday",
            "start_date": "2024-03-01T00:00:00+00:00",
            "end_date": "2024-03-01T23:59:59+00:00",
            "all_day": true
        }))
        .unwrap();

        let event = Event::try_from(native).unwrap();
        assert_eq!(event.end, ts("2024-03-02T00:00:00+00:00"));
        assert_eq!(event.duration_minutes(), 1440);
    }

    #[test]
    fn conflicting_native_recurrence_is_dropped_not_fatal() {
        let native: NativeEvent = serde_json::from_value(serde_json::json!({
            "title": "Odd",
            "start_date": "2025-03-03T10:00:00+00:00",
            "end_date": "2025-03-03T11:00:00+00:00",
            "recurrence_rules": [{
                "frequency": 0,
                "end_date": "2025-04-01",
                "occurrence_count": 3
            }]
        }))
        .unwrap();

        let event = Event::try_from(native).unwrap();
        assert!(event.recurrence.is_none());
    }
}
