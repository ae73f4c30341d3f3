//! Newline-delimited JSON-RPC server.
//!
//! Reads one message per line, handles requests strictly one at a time, and
//! writes one response line per request. Notifications get no response.

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use super::types::{
    INVALID_PARAMS, INVALID_REQUEST, InitializeResult, JsonRpcMessage, JsonRpcResponse,
    METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION, ServerCapabilities, ServerInfo, ToolContent,
    ToolsCallParams, ToolsCallResult, ToolsCapability, ToolsListResult,
};
use crate::tools::{self, ToolContext};

pub struct McpServer {
    tools: ToolContext,
}

impl McpServer {
    pub fn new(tools: ToolContext) -> Self {
        McpServer { tools }
    }

    /// Serve until `reader` reaches end of input.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            if line.trim().is_empty() {
                continue;
            }

            let Some(response) = self.handle_line(&line).await else {
                continue;
            };
            let mut out =
                serde_json::to_string(&response).context("Failed to serialize response")?;
            out.push('\n');
            writer
                .write_all(out.as_bytes())
                .await
                .context("Failed to write response")?;
            writer.flush().await.context("Failed to flush response")?;
        }

        info!("Input closed, shutting down");
        Ok(())
    }

    async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Unparseable message");
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ));
            }
        };

        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcMessage>(value) {
            Ok(message) => self.handle(message).await,
            Err(e) => Some(JsonRpcResponse::error(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                format!("Invalid request: {e}"),
            )),
        }
    }

    /// Handle one message. Returns `None` for notifications.
    pub async fn handle(&self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        debug!(method = %message.method, "Received message");

        let Some(id) = message.id else {
            if message.method != "notifications/initialized" {
                debug!(method = %message.method, "Ignoring notification");
            }
            return None;
        };

        let response = match message.method.as_str() {
            "initialize" => JsonRpcResponse::result(id, initialize_result()),
            "ping" => JsonRpcResponse::result(id, json!({})),
            "tools/list" => JsonRpcResponse::result(
                id,
                to_value(ToolsListResult {
                    tools: tools::definitions(),
                }),
            ),
            "tools/call" => self.call_tool(id, message.params).await,
            other => JsonRpcResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            ),
        };
        Some(response)
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolsCallParams =
            match serde_json::from_value(params.unwrap_or(Value::Null)) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        INVALID_PARAMS,
                        format!("Invalid tools/call params: {e}"),
                    );
                }
            };

        let Some(output) = tools::call(&self.tools, &params.name, params.arguments).await else {
            return JsonRpcResponse::error(
                id,
                INVALID_PARAMS,
                format!("Unknown tool: {}", params.name),
            );
        };

        if output.is_error {
            info!(tool = %params.name, "Tool call failed");
        }

        JsonRpcResponse::result(
            id,
            to_value(ToolsCallResult {
                content: vec![ToolContent::Text { text: output.text }],
                is_error: output.is_error,
            }),
        )
    }
}

fn initialize_result() -> Value {
    to_value(InitializeResult {
        protocol_version: PROTOCOL_VERSION.into(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {
                list_changed: false,
            }),
        },
        server_info: ServerInfo {
            name: env!("CARGO_PKG_NAME").into(),
            version: Some(env!("CARGO_PKG_VERSION").into()),
        },
    })
}

/// Protocol types are plain data; serialization can't fail.
fn to_value<T: serde::Serialize>(value: T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::context;

    fn server() -> McpServer {
        McpServer::new(context().0)
    }

    async fn exchange(server: &McpServer, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn initialize_then_list_tools() {
        let server = server();
        let responses = exchange(
            &server,
            concat!(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"0"}}}"#,
                "\n",
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                "\n",
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
                "\n",
            ),
        )
        .await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "calendar-mcp");
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 5);
        assert!(responses[1]["result"]["tools"][1]["inputSchema"].is_object());
    }

    #[tokio::test]
    async fn validation_failure_is_an_error_result() {
        let server = server();
        let responses = exchange(
            &server,
            concat!(
                r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"create_event","arguments":{"title":"X","start_time":"2025-03-03T10:00:00Z","end_time":"2025-03-03T09:00:00Z"}}}"#,
                "\n"
            ),
        )
        .await;

        let result = &responses[0]["result"];
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error creating event: Invalid input"), "{text}");
    }

    #[tokio::test]
    async fn successful_call_returns_text() {
        let server = server();
        let responses = exchange(
            &server,
            concat!(
                r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"list_calendars"}}"#,
                "\n"
            ),
        )
        .await;
        assert_eq!(responses[0]["result"]["isError"], false);
        assert!(
            responses[0]["result"]["content"][0]["text"]
                .as_str()
                .unwrap()
                .starts_with("Available calendars:")
        );
    }

    #[tokio::test]
    async fn protocol_errors() {
        let server = server();
        let responses = exchange(
            &server,
            concat!(
                "not json\n",
                r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#,
                "\n",
                r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"nope","arguments":{}}}"#,
                "\n",
                r#"{"jsonrpc":"2.0","id":6,"method":"ping"}"#,
                "\n",
            ),
        )
        .await;

        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[1]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(responses[2]["error"]["code"], INVALID_PARAMS);
        assert_eq!(responses[3]["result"], json!({}));
    }
}
