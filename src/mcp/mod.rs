//! MCP transport: JSON-RPC 2.0 over stdin/stdout.

pub mod server;
pub mod types;

use anyhow::Result;
use tokio::io::BufReader;
use tracing::info;

use crate::tools::{self, ToolContext};

/// Serve MCP on stdin/stdout until the client closes stdin.
pub async fn serve_stdio(context: ToolContext) -> Result<()> {
    info!(
        tools = tools::definitions().len(),
        timezone = %context.timezone,
        "Starting MCP server on stdio"
    );
    let server = server::McpServer::new(context);
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await
}
