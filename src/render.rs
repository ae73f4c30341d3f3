//! Text rendering for tool results.
//!
//! Results go to an agent, not a terminal, so everything here is plain
//! text with stable line shapes.

use calendar_mcp_core::calendar::Calendar;
use calendar_mcp_core::error::CalendarError;
use calendar_mcp_core::report::{DayGroup, Report, ReportEntry};
use calendar_mcp_core::time::{format_hours_minutes, format_timestamp};

use crate::tools::ToolError;

/// Plain-text rendering for calendar-mcp types.
pub trait Render {
    fn render(&self) -> String;
}

impl Render for Calendar {
    fn render(&self) -> String {
        let mut line = format!("- {} (id: {}", self.name, self.id);
        if let Some(color) = &self.color {
            line.push_str(&format!(", color: {}", color));
        }
        line.push(')');
        if self.is_default {
            line.push_str(" [default]");
        }
        line
    }
}

impl Render for ReportEntry {
    fn render(&self) -> String {
        let mut line = format!("  - {}", self.event.to_summary_string());
        if let Some(id) = &self.event.id {
            line.push_str(&format!(" [id: {}]", id));
        }
        if !self.counted {
            line.push_str(" (continued)");
        }
        line
    }
}

pub fn render_calendars(calendars: &[Calendar]) -> String {
    if calendars.is_empty() {
        return "No calendars found".to_string();
    }

    let mut lines = vec!["Available calendars:".to_string()];
    lines.extend(calendars.iter().map(Calendar::render));
    lines.join("\n")
}

fn minutes_line(label: &str, minutes: i64) -> String {
    format!(
        "{}: {} minutes ({})",
        label,
        minutes,
        format_hours_minutes(minutes)
    )
}

fn render_day(day: &DayGroup, notes_preview_chars: usize, lines: &mut Vec<String>) {
    lines.push(format!("{} ({}):", day.date, day.date.format("%A")));
    for entry in &day.entries {
        lines.push(entry.render());
        if entry.counted {
            if let Some(notes) = entry.event.notes_preview(notes_preview_chars) {
                lines.push(format!("    Notes: {}", notes));
            }
        }
    }
    lines.push(format!("  {}", minutes_line("Daily total", day.total_minutes())));
}

pub fn render_report(report: &Report, notes_preview_chars: usize) -> String {
    if report.is_empty() {
        return format!(
            "No events found between {} and {}.\n{}",
            format_timestamp(&report.range.start),
            format_timestamp(&report.range.end),
            minutes_line("Total time", 0)
        );
    }

    let mut lines = Vec::new();
    for day in &report.days {
        render_day(day, notes_preview_chars, &mut lines);
        lines.push(String::new());
    }
    lines.push(minutes_line("Total time", report.total_minutes));
    lines.join("\n")
}

const PERMISSION_GUIDANCE: &str = "\
To grant calendar access:
1. Open System Settings
2. Go to Privacy & Security > Calendars
3. Enable full access for the app running this server (your terminal or MCP client)
4. Restart the MCP client and try again";

/// Caller-facing message for a failed tool call.
pub fn render_error(action: &str, error: &ToolError) -> String {
    match error {
        ToolError::Arguments(msg) => format!("Error {action}: invalid arguments: {msg}"),
        ToolError::Calendar(CalendarError::PermissionDenied(msg)) => {
            format!("Error {action}: calendar access not granted ({msg}).\n\n{PERMISSION_GUIDANCE}")
        }
        ToolError::Calendar(CalendarError::EventNotFound(id)) => {
            format!("Error {action}: Event with ID {id} not found")
        }
        ToolError::Calendar(e) => format!("Error {action}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calendar_mcp_core::date_range::DateRange;
    use calendar_mcp_core::event::{Event, NewEvent};
    use calendar_mcp_core::report::build_report;
    use chrono::{DateTime, FixedOffset};

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn make_test_event(id: &str, title: &str, start: &str, end: &str) -> Event {
        let mut event = NewEvent::new(title, ts(start), ts(end)).into_event().unwrap();
        event.id = Some(id.into());
        event
    }

    #[test]
    fn calendar_line_without_color() {
        let calendar = Calendar {
            id: "c1".into(),
            name: "Home".into(),
            source: None,
            color: None,
            is_default: false,
        };
        assert_eq!(calendar.render(), "- Home (id: c1)");
        assert_eq!(render_calendars(&[]), "No calendars found");
    }

    #[test]
    fn report_layout() {
        let range = DateRange::new(
            ts("2025-03-03T00:00:00+00:00"),
            ts("2025-03-05T00:00:00+00:00"),
        )
        .unwrap();
        let mut standup = make_test_event(
            "s1",
            "Standup",
            "2025-03-03T09:00:00+00:00",
            "2025-03-03T09:15:00+00:00",
        );
        standup.notes = Some("Agenda: blockers".into());
        let overnight = make_test_event(
            "o1",
            "Deploy",
            "2025-03-03T22:00:00+00:00",
            "2025-03-04T02:00:00+00:00",
        );

        let report = build_report(&range, vec![overnight, standup]);
        assert_eq!(
            render_report(&report, 100),
            "\
2025-03-03 (Monday):
  - 09:00 Standup (15m) [id: s1]
    Notes: Agenda: blockers
  - 22:00 Deploy (240m) [id: o1]
  Daily total: 255 minutes (4h 15m)

2025-03-04 (Tuesday):
  - 22:00 Deploy (240m) [id: o1] (continued)
  Daily total: 0 minutes (0h 0m)

Total time: 255 minutes (4h 15m)"
        );
    }

    #[test]
    fn permission_errors_include_guidance() {
        let text = render_error(
            "listing events",
            &ToolError::Calendar(CalendarError::PermissionDenied("denied".into())),
        );
        assert!(text.starts_with("Error listing events: calendar access not granted"));
        assert!(text.contains("Privacy & Security > Calendars"));
    }
}
