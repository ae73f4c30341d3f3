use calendar_mcp_core::error::CalendarError;
use calendar_mcp_core::event::{Alarm, EventPatch};
use calendar_mcp_core::recurrence::RecurrenceInput;
use chrono::Duration;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolError, parse_args, parse_recurrence, parse_time, recurrence_schema};
use crate::mcp::types::McpToolDef;

#[derive(Debug, Deserialize)]
struct Args {
    event_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
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
    #[serde(default)]
    clear_recurrence: bool,
}

pub fn definition() -> McpToolDef {
    McpToolDef {
        name: "update_event".into(),
        description: Some(
            "Update an existing event. Only the given fields change; an empty string clears \
             location, notes or url."
                .into(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "event_id": { "type": "string", "description": "ID from list_events or create_event" },
                "title": { "type": "string" },
                "start_time": { "type": "string", "description": "ISO 8601" },
                "end_time": { "type": "string", "description": "ISO 8601" },
                "all_day": { "type": "boolean" },
                "location": { "type": "string" },
                "notes": { "type": "string" },
                "url": { "type": "string" },
                "calendar_name": { "type": "string", "description": "Move to this calendar (name or id)" },
                "alarms_minutes_before": {
                    "type": "array",
                    "items": { "type": "integer" },
                    "description": "Replaces all reminders; [] removes them"
                },
                "recurrence": recurrence_schema(),
                "clear_recurrence": { "type": "boolean", "description": "Stop the event repeating" }
            },
            "required": ["event_id"]
        }),
    }
}

pub async fn run(ctx: &ToolContext, arguments: Value) -> Result<String, ToolError> {
    let args: Args = parse_args(arguments)?;

    let start = args
        .start_time
        .as_deref()
        .map(|s| parse_time(ctx, s))
        .transpose()?;
    let end = args
        .end_time
        .as_deref()
        .map(|s| parse_time(ctx, s))
        .transpose()?;

    let mut patch = EventPatch {
        title: args.title,
        start: start.map(|t| t.value),
        end: end.map(|t| t.value),
        all_day: args.all_day,
        location: args.location,
        notes: args.notes,
        url: args.url,
        calendar_id: None,
        alarms: args
            .alarms_minutes_before
            .map(|alarms| alarms.into_iter().map(Alarm::minutes_before).collect()),
        recurrence: parse_recurrence(args.recurrence)?,
        clear_recurrence: args.clear_recurrence,
    };

    // A bare end date on an all-day event names its last day.
    if let Some(end) = end.filter(|e| e.date_only) {
        let all_day = match args.all_day {
            Some(all_day) => all_day,
            None => ctx
                .service
                .find_event(&args.event_id)
                .await?
                .ok_or_else(|| CalendarError::EventNotFound(args.event_id.clone()))?
                .all_day,
        };
        if all_day {
            patch.end = Some(end.value + Duration::days(1));
        }
    }

    let event = ctx
        .service
        .update_event(&args.event_id, patch, args.calendar_name.as_deref())
        .await?;

    Ok(format!(
        "Successfully updated event: {}\n\n{}",
        event.title,
        event.to_detail_string_with(ctx.notes_preview_chars)
    ))
}
