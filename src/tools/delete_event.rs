use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolError, parse_args};
use crate::mcp::types::McpToolDef;

#[derive(Debug, Deserialize)]
struct Args {
    event_id: String,
}

pub fn definition() -> McpToolDef {
    McpToolDef {
        name: "delete_event".into(),
        description: Some(
            "Delete an event. For a recurring event this removes the whole series.".into(),
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "event_id": { "type": "string", "description": "ID from list_events or create_event" }
            },
            "required": ["event_id"]
        }),
    }
}

pub async fn run(ctx: &ToolContext, arguments: Value) -> Result<String, ToolError> {
    let args: Args = parse_args(arguments)?;
    let event = ctx.service.delete_event(&args.event_id).await?;
    Ok(format!("Successfully deleted event: {}", event.title))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::call;
    use crate::tools::testing::{context, create};

    #[tokio::test]
    async fn deletes_and_then_reports_not_found() {
        let (ctx, _) = context();
        let id = create(
            &ctx,
            json!({"title": "Lunch", "start_time": "2025-03-03T12:00:00Z", "end_time": "2025-03-03T13:00:00Z"}),
        )
        .await;

        let text = run(&ctx, json!({"event_id": id})).await.unwrap();
        assert_eq!(text, "Successfully deleted event: Lunch");

        let output = call(&ctx, "delete_event", json!({"event_id": id}))
            .await
            .unwrap();
        assert!(output.is_error);
        assert_eq!(
            output.text,
            format!("Error deleting event: Event with ID {id} not found")
        );
    }
}
