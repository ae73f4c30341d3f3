mod config;
mod mcp;
mod render;
mod tools;

use std::path::PathBuf;

use anyhow::{Context, Result};
use calendar_mcp_core::service::CalendarService;
use calendar_mcp_core::store::{CalendarStore, MemoryStore, ProviderStore};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::{Settings, StoreKind, StoreSettings};
use crate::tools::ToolContext;

#[derive(Parser)]
#[command(name = "calendar-mcp", version)]
#[command(about = "Expose your calendar to AI agents over the Model Context Protocol")]
struct Cli {
    /// Config file (default: ~/.config/calendar-mcp/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the in-memory store instead of the calendar provider
    #[arg(long, global = true)]
    memory: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdin/stdout (default)
    Serve,
    /// Print available calendars
    Calendars,
    /// Print events in a date range, grouped by day
    Events {
        /// Range start (e.g. 2025-03-20 or 2025-03-20T09:00)
        #[arg(long)]
        from: String,

        /// Range end, exclusive
        #[arg(long)]
        to: String,

        /// Only these calendars (name or id)
        #[arg(short, long)]
        calendar: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if cli.memory {
        settings.store.kind = StoreKind::Memory;
    }

    init_tracing(&settings);

    let context = ToolContext {
        service: CalendarService::new(build_store(&settings.store)?),
        timezone: settings.timezone()?,
        notes_preview_chars: settings.notes_preview_chars,
    };

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => mcp::serve_stdio(context).await,
        Commands::Calendars => print_tool(&context, "list_calendars", json!({})).await,
        Commands::Events { from, to, calendar } => {
            print_tool(
                &context,
                "list_events",
                json!({"start_date": from, "end_date": to, "calendar_names": calendar}),
            )
            .await
        }
    }
}

/// Logs go to stderr; stdout carries the protocol.
fn init_tracing(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();
}

fn build_store(settings: &StoreSettings) -> Result<Box<dyn CalendarStore>> {
    match settings.kind {
        StoreKind::Memory => {
            let store = match settings.seed_path() {
                Some(path) => MemoryStore::from_seed_file(&path)
                    .with_context(|| format!("Could not load seed file {}", path.display()))?,
                None => MemoryStore::with_default_calendars(),
            };
            info!("Using in-memory calendar store");
            Ok(Box::new(store))
        }
        StoreKind::Provider => {
            let store = match &settings.command {
                Some(command) => {
                    let mut parts = command.split_whitespace();
                    let program = parts.next().context("store.command is empty")?;
                    ProviderStore::from_command(program, parts.map(String::from).collect())
                }
                None => ProviderStore::from_name(&settings.provider),
            };
            let store = store.with_timeout(settings.timeout()?);
            info!(provider = %store.name(), "Using calendar provider");
            Ok(Box::new(store))
        }
    }
}

/// Run a tool once and print its text, for manual checks from a shell.
async fn print_tool(context: &ToolContext, name: &str, arguments: serde_json::Value) -> Result<()> {
    let output = tools::call(context, name, arguments)
        .await
        .with_context(|| format!("Unknown tool {name}"))?;

    if output.is_error {
        anyhow::bail!(output.text);
    }
    println!("{}", output.text);
    Ok(())
}
