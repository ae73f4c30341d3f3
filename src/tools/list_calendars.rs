use serde::Deserialize;
use serde_json::{Value, json};

use super::{ToolContext, ToolError, parse_args};
use crate::mcp::types::McpToolDef;
use crate::render::render_calendars;

#[derive(Debug, Deserialize)]
struct Args {}

pub fn definition() -> McpToolDef {
    McpToolDef {
        name: "list_calendars".into(),
        description: Some("List all calendars with their ids and colors.".into()),
        input_schema: json!({ "type": "object", "properties": {} }),
    }
}

pub async fn run(ctx: &ToolContext, arguments: Value) -> Result<String, ToolError> {
    let Args {} = parse_args(arguments)?;
    let calendars = ctx.service.list_calendars().await?;
    Ok(render_calendars(&calendars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::context;

    #[tokio::test]
    async fn lists_calendars_with_default_marker() {
        let (ctx, _) = context();
        let text = run(&ctx, Value::Null).await.unwrap();
        assert_eq!(
            text,
            "Available calendars:\n\
             - Personal (id: personal, color: #1badf8) [default]\n\
             - Work (id: work, color: #ff2968)"
        );
    }

    #[tokio::test]
    async fn denied_access_is_an_error() {
        let (ctx, store) = context();
        store.deny_access();
        assert!(matches!(
            run(&ctx, json!({})).await,
            Err(ToolError::Calendar(_))
        ));
    }
}
