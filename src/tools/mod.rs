//! The tools the MCP server exposes.
//!
//! Each tool module provides a `definition()` (name, description and JSON
//! input schema) and a `run()` that parses arguments, calls the
//! [`CalendarService`] and renders a text result.

pub mod create_event;
pub mod delete_event;
pub mod list_calendars;
pub mod list_events;
pub mod update_event;

use calendar_mcp_core::error::CalendarError;
use calendar_mcp_core::recurrence::RecurrenceInput;
use calendar_mcp_core::service::CalendarService;
use calendar_mcp_core::time::{Timestamp, parse_timestamp};
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::mcp::types::McpToolDef;
use crate::render::render_error;

/// Everything a tool needs to serve a request.
pub struct ToolContext {
    pub service: CalendarService,
    /// Zone for timestamps given without an offset.
    pub timezone: Tz,
    pub notes_preview_chars: usize,
}

/// Why a tool call failed.
#[derive(Debug)]
pub enum ToolError {
    /// Arguments didn't match the tool's schema.
    Arguments(String),
    Calendar(CalendarError),
}

impl From<CalendarError> for ToolError {
    fn from(e: CalendarError) -> Self {
        ToolError::Calendar(e)
    }
}

/// Text result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(text: String) -> Self {
        ToolOutput {
            text,
            is_error: false,
        }
    }

    pub fn error(text: String) -> Self {
        ToolOutput {
            text,
            is_error: true,
        }
    }
}

pub fn definitions() -> Vec<McpToolDef> {
    vec![
        list_calendars::definition(),
        list_events::definition(),
        create_event::definition(),
        update_event::definition(),
        delete_event::definition(),
    ]
}

/// Run tool `name`. Returns `None` for an unknown tool.
pub async fn call(ctx: &ToolContext, name: &str, arguments: Value) -> Option<ToolOutput> {
    debug!(tool = name, "Calling tool");
    let (action, result) = match name {
        "list_calendars" => ("listing calendars", list_calendars::run(ctx, arguments).await),
        "list_events" => ("listing events", list_events::run(ctx, arguments).await),
        "create_event" => ("creating event", create_event::run(ctx, arguments).await),
        "update_event" => ("updating event", update_event::run(ctx, arguments).await),
        "delete_event" => ("deleting event", delete_event::run(ctx, arguments).await),
        _ => return None,
    };

    Some(match result {
        Ok(text) => ToolOutput::success(text),
        Err(e) => {
            if let ToolError::Calendar(err) = &e {
                debug!(tool = name, kind = ?err.kind(), error = %err, "Tool failed");
            }
            ToolOutput::error(render_error(action, &e))
        }
    })
}

/// Deserialize tool arguments; a missing arguments object counts as empty.
fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    serde_json::from_value(arguments).map_err(|e| ToolError::Arguments(e.to_string()))
}

fn parse_time(ctx: &ToolContext, value: &str) -> Result<Timestamp, ToolError> {
    Ok(parse_timestamp(value, ctx.timezone)?)
}

fn parse_recurrence(
    input: Option<RecurrenceInput>,
) -> Result<Option<calendar_mcp_core::RecurrenceRule>, ToolError> {
    Ok(input.map(RecurrenceInput::into_rule).transpose()?)
}

/// JSON schema for the recurrence argument, shared by create and update.
fn recurrence_schema() -> Value {
    json!({
        "type": "object",
        "description": "Repeat the event. Set at most one of until / count.",
        "properties": {
            "frequency": {
                "type": "string",
                "enum": ["daily", "weekly", "monthly", "yearly"]
            },
            "interval": {
                "type": "integer",
                "minimum": 1,
                "description": "Repeat every N periods (default 1)"
            },
            "until": {
                "type": "string",
                "description": "Last date of the series, YYYY-MM-DD (inclusive)"
            },
            "count": {
                "type": "integer",
                "minimum": 1,
                "description": "Number of occurrences"
            },
            "days_of_week": {
                "type": "array",
                "description": "Weekly only: day names (monday) or numbers 1-7 with Sunday = 1",
                "items": { "type": ["string", "integer"] }
            }
        },
        "required": ["frequency"]
    })
}


#[cfg(test)]
mod tests {
    use super::testing::context;
    use super::*;

    #[test]
    fn advertises_five_tools() {
        let names: Vec<String> = definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "list_calendars",
                "list_events",
                "create_event",
                "update_event",
                "delete_event"
            ]
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_none() {
        let (ctx, _) = context();
        assert!(call(&ctx, "send_email", json!({})).await.is_none());
    }

    #[tokio::test]
    async fn bad_arguments_are_error_results() {
        let (ctx, _) = context();
        let output = call(&ctx, "delete_event", json!({})).await.unwrap();
        assert!(output.is_error);
        assert!(output.text.contains("event_id"), "{}", output.text);
    }
}
