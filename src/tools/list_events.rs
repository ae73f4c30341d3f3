use calendar_mcp_core::date_range::DateRange;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolError, parse_args, parse_time};
use crate::mcp::types::McpToolDef;
use crate::render::render_report;

#[derive(Debug, Deserialize)]
struct Args {
    start_date: String,
    end_date: String,
    #[serde(default)]
    calendar_name: Option<String>,
    #[serde(default)]
    calendar_names: Option<Vec<String>>,
}

pub fn definition() -> McpToolDef {
    McpToolDef {
        name: "list_events".into(),
        description: Some(
            "List calendar events in a date range. Returns events grouped by date with time \
             totals. Use for daily summaries, weekly reviews, and planning."
                .into(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "start_date": {
                    "type": "string",
                    "description": "Range start (inclusive), ISO 8601: 2025-03-20 or 2025-03-20T09:00:00+01:00"
                },
                "end_date": {
                    "type": "string",
                    "description": "Range end (exclusive), ISO 8601"
                },
                "calendar_name": {
                    "type": "string",
                    "description": "Only this calendar (name or id)"
                },
                "calendar_names": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Only these calendars (names or ids)"
                }
            },
            "required": ["start_date", "end_date"]
        }),
    }
}

pub async fn run(ctx: &ToolContext, arguments: Value) -> Result<String, ToolError> {
    let args: Args = parse_args(arguments)?;
    let start = parse_time(ctx, &args.start_date)?;
    let end = parse_time(ctx, &args.end_date)?;
    let range = DateRange::new(start.value, end.value)?;

    let mut calendars = args.calendar_names.unwrap_or_default();
    calendars.extend(args.calendar_name);

    let report = ctx.service.list_events_report(range, &calendars).await?;
    Ok(render_report(&report, ctx.notes_preview_chars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{context, create};
    use calendar_mcp_core::error::CalendarError;

    #[tokio::test]
    async fn three_meetings_total_two_hours_fifteen() {
        let (ctx, _) = context();
        for (title, start, end) in [
            ("Standup", "2025-03-03T09:00:00Z", "2025-03-03T09:30:00Z"),
            ("Review", "2025-03-03T10:00:00Z", "2025-03-03T10:45:00Z"),
            ("Planning", "2025-03-03T13:00:00Z", "2025-03-03T14:00:00Z"),
        ] {
            create(
                &ctx,
                json!({"title": title, "start_time": start, "end_time": end}),
            )
            .await;
        }

        let text = run(
            &ctx,
            json!({"start_date": "2025-03-03", "end_date": "2025-03-04"}),
        )
        .await
        .unwrap();

        assert!(text.starts_with("2025-03-03 (Monday):"), "{text}");
        assert!(text.contains("Daily total: 135 minutes (2h 15m)"));
        assert!(text.ends_with("Total time: 135 minutes (2h 15m)"));
        let standup = text.find("09:00 Standup (30m)").unwrap();
        let planning = text.find("13:00 Planning (60m)").unwrap();
        assert!(standup < planning);
    }

    #[tokio::test]
    async fn equal_bounds_report_no_events() {
        let (ctx, _) = context();
        let text = run(
            &ctx,
            json!({"start_date": "2025-03-03", "end_date": "2025-03-03"}),
        )
        .await
        .unwrap();
        assert_eq!(
            text,
            "No events found between 2025-03-03T00:00:00+00:00 and 2025-03-03T00:00:00+00:00.\n\
             Total time: 0 minutes (0h 0m)"
        );
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let (ctx, _) = context();
        let err = run(
            &ctx,
            json!({"start_date": "2025-03-05", "end_date": "2025-03-03"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Calendar(CalendarError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn filters_by_calendar_name() {
        let (ctx, _) = context();
        create(
            &ctx,
            json!({"title": "Gym", "start_time": "2025-03-03T07:00:00Z", "end_time": "2025-03-03T08:00:00Z"}),
        )
        .await;
        create(
            &ctx,
            json!({"title": "Sprint", "start_time": "2025-03-03T09:00:00Z", "end_time": "2025-03-03T10:00:00Z", "calendar_name": "Work"}),
        )
        .await;

        let text = run(
            &ctx,
            json!({"start_date": "2025-03-03", "end_date": "2025-03-04", "calendar_name": "work"}),
        )
        .await
        .unwrap();
        assert!(text.contains("Sprint"));
        assert!(!text.contains("Gym"));
    }

    #[tokio::test]
    async fn unknown_calendar_lists_available() {
        let (ctx, _) = context();
        let err = run(
            &ctx,
            json!({"start_date": "2025-03-03", "end_date": "2025-03-04", "calendar_names": ["Gym"]}),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ToolError::Calendar(CalendarError::CalendarNotFound { .. })
        ));
    }
}
