use calendar_mcp_core::event::{Alarm, NewEvent};
use calendar_mcp_core::recurrence::RecurrenceInput;
use chrono::Duration;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolError, parse_args, parse_recurrence, parse_time, recurrence_schema};
use crate::mcp::types::McpToolDef;

#[derive(Debug, Deserialize)]
struct Args {
    title: String,
    start_time: String,
    end_time: String,
    #[serde(default)]
    all_day: Option<bool>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    calendar_name: Option<String>,
    #[serde(default)]
    alarms_minutes_before: Option<Vec<i64>>,
    #[serde(default)]
    recurrence: Option<RecurrenceInput>,
}

pub fn definition() -> McpToolDef {
    McpToolDef {
        name: "create_event".into(),
        description: Some(
            "Create a calendar event, optionally recurring and with reminders.".into(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "start_time": {
                    "type": "string",
                    "description": "ISO 8601 start, e.g. 2025-03-20T15:00:00+01:00. A bare date makes an all-day event."
                },
                "end_time": {
                    "type": "string",
                    "description": "ISO 8601 end. For all-day events a bare date is the last day (inclusive)."
                },
                "all_day": { "type": "boolean" },
                "location": { "type": "string" },
                "notes": { "type": "string" },
                "url": { "type": "string" },
                "calendar_name": {
                    "type": "string",
                    "description": "Calendar name or id; the default calendar when omitted"
                },
                "alarms_minutes_before": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "Reminders, in minutes before the start"
                },
                "recurrence": recurrence_schema()
            },
            "required": ["title", "start_time", "end_time"]
        }),
    }
}

pub async fn run(ctx: &ToolContext, arguments: Value) -> Result<String, ToolError> {
    let args: Args = parse_args(arguments)?;

    let start = parse_time(ctx, &args.start_time)?;
    let end = parse_time(ctx, &args.end_time)?;
    let all_day = args.all_day.unwrap_or(start.date_only);

    // A bare end date on an all-day event names its last day.
    let end_value = if all_day && end.date_only {
        end.value + Duration::days(1)
    } else {
        end.value
    };

    let mut request = NewEvent::new(args.title, start.value, end_value);
    request.all_day = all_day;
    request.location = args.location;
    request.notes = args.notes;
    request.url = args.url;
    request.alarms = args
        .alarms_minutes_before
        .unwrap_or_default()
        .into_iter()
        .map(Alarm::minutes_before)
        .collect();
    request.recurrence = parse_recurrence(args.recurrence)?;

    let event = ctx
        .service
        .create_event(request, args.calendar_name.as_deref())
        .await?;

    Ok(format!(
        "Successfully created event: {} (ID: {})\n\n{}",
        event.title,
        event.id.as_deref().unwrap_or("-"),
        event.to_detail_string_with(ctx.notes_preview_chars)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::context;
    use calendar_mcp_core::error::CalendarError;

    #[tokio::test]
    async fn creates_event_with_details() {
        let (ctx, _) = context();
        let text = run(
            &ctx,
            json!({
                "title": "Dentist",
                "start_time": "2025-03-20T15:00:00+01:00",
                "end_time": "2025-03-20T15:45:00+01:00",
                "location": "Main St 1",
                "alarms_minutes_before": [15, 60]
            }),
        )
        .await
        .unwrap();

        assert!(text.starts_with("Successfully created event: Dentist (ID: "));
        assert!(text.contains("Calendar: Personal"));
        assert!(text.contains("Start: 2025-03-20T15:00:00+01:00"));
        assert!(text.contains("Location: Main St 1"));
        assert!(text.contains("Alarms: 15 minutes before, 60 minutes before"));
    }

    #[tokio::test]
    async fn all_day_times_are_normalized() {
        let (ctx, _) = context();
        let text = run(
            &ctx,
            json!({
                "title": "Offsite",
                "start_time": "2024-03-01T15:30",
                "end_time": "2024-03-01T17:00",
                "all_day": true
            }),
        )
        .await
        .unwrap();
        assert!(text.contains("Date: 2024-03-01 (all day)"), "{text}");
        assert!(text.contains("Duration: 1440 minutes"));
    }

    #[tokio::test]
    async fn bare_dates_make_inclusive_all_day_events() {
        let (ctx, _) = context();
        let text = run(
            &ctx,
            json!({"title": "Trip", "start_time": "2024-03-01", "end_time": "2024-03-03"}),
        )
        .await
        .unwrap();
        assert!(text.contains("Dates: 2024-03-01 to 2024-03-03 (all day)"), "{text}");
    }

    #[tokio::test]
    async fn recurrence_with_until_and_count_fails_before_the_store() {
        let (ctx, store) = context();
        store.deny_access();
        let err = run(
            &ctx,
            json!({
                "title": "Yoga",
                "start_time": "2025-03-03T18:00:00Z",
                "end_time": "2025-03-03T19:00:00Z",
                "recurrence": {"frequency": "weekly", "until": "2025-06-01", "count": 10}
            }),
        )
        .await
        .unwrap_err();

        let ToolError::Calendar(CalendarError::Validation(msg)) = err else {
            panic!("expected a validation error, got {err:?}");
        };
        assert!(msg.starts_with("Only one of until"));
        assert_eq!(store.access_requests(), 0);
    }

    #[tokio::test]
    async fn weekly_recurrence_is_described() {
        let (ctx, _) = context();
        let text = run(
            &ctx,
            json!({
                "title": "Running",
                "start_time": "2025-03-03T07:00:00Z",
                "end_time": "2025-03-03T08:00:00Z",
                "recurrence": {"frequency": "weekly", "days_of_week": ["monday", 5], "count": 8}
            }),
        )
        .await
        .unwrap();
        assert!(text.contains("Repeats: Weekly on Monday, Thursday, 8 times"), "{text}");
    }
}
