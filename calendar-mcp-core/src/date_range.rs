//! Half-open time ranges for event queries.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};

use crate::error::{CalendarError, CalendarResult};
use crate::event::Event;
use crate::time::format_timestamp;

/// Query range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
}

impl DateRange {
    /// Fails when `start > end`. Equal bounds are a valid, empty range.
    pub fn new(start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> CalendarResult<Self> {
        if start > end {
            return Err(CalendarError::validation(format!(
                "Range start ({}) must not be after its end ({})",
                format_timestamp(&start),
                format_timestamp(&end)
            )));
        }
        Ok(DateRange { start, end })
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The offset days are reckoned in for timed events.
    pub fn offset(&self) -> FixedOffset {
        *self.start.offset()
    }

    /// First calendar day touched by the range.
    pub fn first_day(&self) -> NaiveDate {
        self.start.date_naive()
    }

    /// Last calendar day touched by the range (end is exclusive).
    pub fn last_day(&self) -> NaiveDate {
        if self.is_empty() {
            return self.first_day();
        }
        (self.end - Duration::nanoseconds(1))
            .with_timezone(&self.offset())
            .date_naive()
    }

    /// Whether an event's interval intersects the range.
    ///
    /// Zero-length events count when their instant falls inside the range.
    pub fn overlaps(&self, event: &Event) -> bool {
        if event.start == event.end {
            return event.start >= self.start && event.start < self.end;
        }
        event.start < self.end && event.end > self.start
    }

    pub fn start_rfc3339(&self) -> String {
        format_timestamp(&self.start)
    }

    pub fn end_rfc3339(&self) -> String {
        format_timestamp(&self.end)
    }
}
