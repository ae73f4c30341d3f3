//! Date-grouped, time-accounted event reports.
//!
//! [`build_report`] turns the flat event list a store returns into days with
//! subtotals and a grand total. Rendering to text happens in the binary.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};

use crate::date_range::DateRange;
use crate::event::Event;

/// One event as listed under one day.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    pub event: Event,
    /// False on the later days of a multi-day event; its duration is
    /// counted on the first day only.
    pub counted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub entries: Vec<ReportEntry>,
}

impl DayGroup {
    pub fn total_minutes(&self) -> i64 {
        self.entries
            .iter()
            .filter(|e| e.counted)
            .map(|e| e.event.duration_minutes())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub range: DateRange,
    pub days: Vec<DayGroup>,
    /// Every listed event counted exactly once.
    pub total_minutes: i64,
}

impl Report {
    pub fn empty(range: DateRange) -> Self {
        Report {
            range,
            days: Vec::new(),
            total_minutes: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn hours(&self) -> i64 {
        self.total_minutes / 60
    }

    pub fn minutes(&self) -> i64 {
        self.total_minutes % 60
    }

    /// Distinct events in the report.
    pub fn event_count(&self) -> usize {
        self.days
            .iter()
            .flat_map(|d| &d.entries)
            .filter(|e| e.counted)
            .count()
    }
}

/// Inclusive first and last day `event` occupies.
///
/// Timed events are placed in the range's offset; all-day events keep their
/// own dates.
fn occupied_days(event: &Event, range: &DateRange) -> (NaiveDate, NaiveDate) {
    if event.all_day {
        return (event.start.date_naive(), event.last_all_day_date());
    }

    let offset = range.offset();
    let first = event.start.with_timezone(&offset).date_naive();
    let last = if event.end > event.start {
        (event.end - Duration::minutes(1))
            .with_timezone(&offset)
            .date_naive()
    } else {
        first
    };
    (first, last.max(first))
}

pub fn build_report(range: &DateRange, events: Vec<Event>) -> Report {
    if range.is_empty() {
        return Report::empty(*range);
    }

    let (range_first, range_last) = (range.first_day(), range.last_day());
    let mut days: BTreeMap<NaiveDate, Vec<ReportEntry>> = BTreeMap::new();
    let mut total_minutes = 0;

    for event in events {
        let (first, last) = occupied_days(&event, range);
        let first = first.max(range_first);
        let last = last.min(range_last);
        if first > last {
            continue;
        }

        total_minutes += event.duration_minutes();
        for date in first.iter_days().take_while(|d| *d <= last) {
            days.entry(date).or_default().push(ReportEntry {
                event: event.clone(),
                counted: date == first,
            });
        }
    }

    let days = days
        .into_iter()
        .map(|(date, mut entries)| {
            entries.sort_by(|a, b| {
                a.event
                    .start
                    .cmp(&b.event.start)
                    .then_with(|| {
                        a.event
                            .title
                            .to_lowercase()
                            .cmp(&b.event.title.to_lowercase())
                    })
                    .then_with(|| a.event.id.cmp(&b.event.id))
            });
            DayGroup { date, entries }
        })
        .collect();

    Report {
        range: *range,
        days,
        total_minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NewEvent;
    use chrono::{DateTime, FixedOffset};

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn range(start: &str, end: &str) -> DateRange {
        DateRange::new(ts(start), ts(end)).unwrap()
    }

    fn make_test_event(id: &str, title: &str, start: &str, end: &str) -> Event {
        let mut event = NewEvent::new(title, ts(start), ts(end)).into_event().unwrap();
        event.id = Some(id.to_string());
        event
    }

    fn all_day(id: &str, title: &str, first: &str, end_exclusive: &str) -> Event {
        let mut request = NewEvent::new(title, ts(first), ts(end_exclusive));
        request.all_day = true;
        let mut event = request.into_event().unwrap();
        event.id = Some(id.to_string());
        event
    }

    #[test]
    fn three_events_on_one_day_sum_up() {
        let r = range("2025-03-03T00:00:00+00:00", "2025-03-04T00:00:00+00:00");
        let events = vec![
            make_test_event("a", "A", "2025-03-03T09:00:00+00:00", "2025-03-03T09:30:00+00:00"),
            make_test_event("b", "B", "2025-03-03T10:00:00+00:00", "2025-03-03T10:45:00+00:00"),
            make_test_event("c", "C", "2025-03-03T11:00:00+00:00", "2025-03-03T12:00:00+00:00"),
        ];

        let report = build_report(&r, events);
        assert_eq!(report.days.len(), 1);
        assert_eq!(report.days[0].total_minutes(), 135);
        assert_eq!(report.total_minutes, 135);
        assert_eq!((report.hours(), report.minutes()), (2, 15));
    }

    #[test]
    fn empty_range_has_no_days() {
        let r = range("2025-03-03T00:00:00+00:00", "2025-03-03T00:00:00+00:00");
        let events = vec![make_test_event(
            "a",
            "A",
            "2025-03-03T00:00:00+00:00",
            "2025-03-03T01:00:00+00:00",
        )];
        let report = build_report(&r, events);
        assert!(report.is_empty());
        assert_eq!(report.total_minutes, 0);
    }

    #[test]
    fn entries_sort_by_start_then_title_then_id() {
        let r = range("2025-03-03T00:00:00+00:00", "2025-03-04T00:00:00+00:00");
        let events = vec![
            make_test_event("z", "beta", "2025-03-03T09:00:00+00:00", "2025-03-03T10:00:00+00:00"),
            make_test_event("y", "Alpha", "2025-03-03T09:00:00+00:00", "2025-03-03T10:00:00+00:00"),
            make_test_event("x", "alpha", "2025-03-03T09:00:00+00:00", "2025-03-03T10:00:00+00:00"),
            make_test_event("w", "Early", "2025-03-03T08:00:00+00:00", "2025-03-03T08:10:00+00:00"),
        ];
        let report = build_report(&r, events);
        let ids: Vec<_> = report.days[0]
            .entries
            .iter()
            .map(|e| e.event.id.as_deref().unwrap())
            .collect();
        assert_eq!(ids, vec!["w", "x", "y", "z"]);
    }

    #[test]
    fn multi_day_event_counts_once_on_first_day() {
        let r = range("2025-03-01T00:00:00+00:00", "2025-03-08T00:00:00+00:00");
        let events = vec![
            all_day("trip", "Trip", "2025-03-02T00:00:00+00:00", "2025-03-05T00:00:00+00:00"),
            make_test_event("m", "Meeting", "2025-03-03T10:00:00+00:00", "2025-03-03T11:00:00+00:00"),
        ];
        let report = build_report(&r, events);

        let dates: Vec<String> = report.days.iter().map(|d| d.date.to_string()).collect();
        assert_eq!(dates, vec!["2025-03-02", "2025-03-03", "2025-03-04"]);

        assert_eq!(report.days[0].total_minutes(), 3 * 24 * 60);
        assert_eq!(report.days[1].total_minutes(), 60);
        assert!(!report.days[1].entries[0].counted);
        assert_eq!(report.days[2].total_minutes(), 0);

        assert_eq!(report.total_minutes, 3 * 24 * 60 + 60);
        assert_eq!(report.event_count(), 2);
    }

    #[test]
    fn event_starting_before_range_is_counted_on_first_visible_day() {
        let r = range("2025-03-03T00:00:00+00:00", "2025-03-05T00:00:00+00:00");
        let events = vec![make_test_event(
            "night",
            "Night shift",
            "2025-03-02T22:00:00+00:00",
            "2025-03-03T06:00:00+00:00",
        )];
        let report = build_report(&r, events);
        assert_eq!(report.days.len(), 1);
        assert_eq!(report.days[0].date.to_string(), "2025-03-03");
        assert!(report.days[0].entries[0].counted);
        assert_eq!(report.total_minutes, 480);
    }

    #[test]
    fn event_ending_at_midnight_stays_on_its_day() {
        let r = range("2025-03-03T00:00:00+00:00", "2025-03-05T00:00:00+00:00");
        let events = vec![make_test_event(
            "late",
            "Late",
            "2025-03-03T23:00:00+00:00",
            "2025-03-04T00:00:00+00:00",
        )];
        let report = build_report(&r, events);
        assert_eq!(report.days.len(), 1);
        assert_eq!(report.days[0].date.to_string(), "2025-03-03");
    }

    #[test]
    fn timed_events_are_placed_in_the_range_offset() {
        // 23:30 UTC is already the next day in +02:00.
        let r = range("2025-03-03T00:00:00+02:00", "2025-03-06T00:00:00+02:00");
        let events = vec![make_test_event(
            "a",
            "Call",
            "2025-03-03T23:30:00+00:00",
            "2025-03-03T23:45:00+00:00",
        )];
        let report = build_report(&r, events);
        assert_eq!(report.days[0].date.to_string(), "2025-03-04");
    }

    #[test]
    fn zero_duration_event_is_listed_with_no_time() {
        let r = range("2025-03-03T00:00:00+00:00", "2025-03-04T00:00:00+00:00");
        let events = vec![make_test_event(
            "d",
            "Deadline",
            "2025-03-03T17:00:00+00:00",
            "2025-03-03T17:00:00+00:00",
        )];
        let report = build_report(&r, events);
        assert_eq!(report.days[0].entries.len(), 1);
        assert_eq!(report.total_minutes, 0);
    }
}
