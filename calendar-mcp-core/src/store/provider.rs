//! Store backed by an external provider executable.
//!
//! Each call spawns the provider (`calendar-mcp-provider-<name>` on `PATH`,
//! or an explicit command), writes one JSON request line to its stdin and
//! reads one JSON response from its stdout. Any executable that speaks the
//! protocol in [`super::protocol`] can back the store, which is how the
//! native macOS calendar is reached.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::{debug, info};

use crate::calendar::Calendar;
use crate::date_range::DateRange;
use crate::error::{CalendarError, CalendarResult};
use crate::event::{Event, EventPatch};
use crate::store::CalendarStore;
use crate::store::native::NativeEvent;
use crate::store::protocol::{
    Command, CreateEvent, DefaultCalendar, DeleteEvent, GetEvent, ListCalendars, ListEvents,
    ProviderCommand, Request, RequestAccess, Response, UpdateEvent,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const BINARY_PREFIX: &str = "calendar-mcp-provider-";

#[derive(Debug, Clone)]
enum Executable {
    /// Looked up on `PATH` at call time.
    Named(String),
    Command { program: PathBuf, args: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct ProviderStore {
    executable: Executable,
    timeout: Duration,
}

impl ProviderStore {
    /// Provider `name`, run as `calendar-mcp-provider-<name>`.
    pub fn from_name(name: &str) -> Self {
        ProviderStore {
            executable: Executable::Named(name.to_string()),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_command(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        ProviderStore {
            executable: Executable::Command {
                program: program.into(),
                args,
            },
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> String {
        match &self.executable {
            Executable::Named(name) => name.clone(),
            Executable::Command { program, .. } => program.display().to_string(),
        }
    }

    fn resolve(&self) -> CalendarResult<(PathBuf, &[String])> {
        match &self.executable {
            Executable::Named(name) => {
                let binary_name = format!("{BINARY_PREFIX}{name}");
                let path = which::which(&binary_name).map_err(|_| {
                    CalendarError::ProviderNotInstalled(format!(
                        "{binary_name} (install it or set store.command in the config)"
                    ))
                })?;
                Ok((path, &[][..]))
            }
            Executable::Command { program, args } => Ok((program.clone(), args.as_slice())),
        }
    }

    /// Call a typed provider command and return its typed response.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> CalendarResult<C::Response> {
        let command = C::command();
        timeout(self.timeout, self.call_raw(command, cmd))
            .await
            .map_err(|_| CalendarError::ProviderTimeout {
                operation: command.as_str().to_string(),
                secs: self.timeout.as_secs(),
            })?
    }

    async fn call_raw<P: Serialize, R: DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> CalendarResult<R> {
        let params =
            serde_json::to_value(params).map_err(|e| CalendarError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| CalendarError::Serialization(e.to_string()))?;

        let (program, args) = self.resolve()?;
        debug!(provider = %program.display(), command = command.as_str(), "Calling provider");

        let mut child = TokioCommand::new(&program)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CalendarError::provider(
                    command.as_str(),
                    format!("failed to spawn {}: {}", program.display(), e),
                )
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            CalendarError::provider(command.as_str(), "provider stdin was not captured")
        })?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(CalendarError::provider(
                command.as_str(),
                format!(
                    "provider exited with status {}",
                    output.status.code().unwrap_or(-1)
                ),
            ));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        if response_str.trim().is_empty() {
            return Err(CalendarError::provider(
                command.as_str(),
                "provider returned no response",
            ));
        }

        let response: Response<R> = serde_json::from_str(response_str.trim()).map_err(|e| {
            CalendarError::provider(command.as_str(), format!("failed to parse response: {e}"))
        })?;

        response.into_result(command)
    }
}

fn decode_all(natives: Vec<NativeEvent>) -> CalendarResult<Vec<Event>> {
    natives.into_iter().map(Event::try_from).collect()
}

#[async_trait]
impl CalendarStore for ProviderStore {
    async fn request_access(&self) -> CalendarResult<()> {
        self.call(RequestAccess {}).await?;
        info!(provider = %self.name(), "Calendar access granted");
        Ok(())
    }

    async fn calendars(&self) -> CalendarResult<Vec<Calendar>> {
        self.call(ListCalendars {}).await
    }

    async fn default_calendar(&self) -> CalendarResult<Option<Calendar>> {
        self.call(DefaultCalendar {}).await
    }

    async fn events(
        &self,
        range: &DateRange,
        calendar_ids: Option<&[String]>,
    ) -> CalendarResult<Vec<Event>> {
        let natives = self
            .call(ListEvents {
                from: range.start_rfc3339(),
                to: range.end_rfc3339(),
                calendar_ids: calendar_ids.map(<[String]>::to_vec),
            })
            .await?;
        debug!(count = natives.len(), "Provider returned events");

        let mut events = decode_all(natives)?;
        events.retain(|e| range.overlaps(e));
        Ok(events)
    }

    async fn event(&self, id: &str) -> CalendarResult<Option<Event>> {
        let native = self
            .call(GetEvent {
                event_id: id.to_string(),
            })
            .await?;
        native.map(Event::try_from).transpose()
    }

    async fn create_event(&self, event: &Event) -> CalendarResult<Event> {
        let created = self
            .call(CreateEvent {
                event: NativeEvent::from(event),
            })
            .await?;
        let created = Event::try_from(created)?;
        info!(id = created.id.as_deref().unwrap_or("-"), title = %created.title, "Created event");
        Ok(created)
    }

    async fn update_event(&self, id: &str, patch: &EventPatch) -> CalendarResult<Event> {
        let current = self
            .event(id)
            .await?
            .ok_or_else(|| CalendarError::EventNotFound(id.to_string()))?;
        let merged = patch.apply(current)?;

        let updated = self
            .call(UpdateEvent {
                event_id: id.to_string(),
                event: NativeEvent::from(&merged),
            })
            .await?;
        info!(id, "Updated event");
        Event::try_from(updated)
    }

    async fn delete_event(&self, id: &str) -> CalendarResult<bool> {
        let deleted = self
            .call(DeleteEvent {
                event_id: id.to_string(),
            })
            .await?;
        if deleted {
            info!(id, "Deleted event");
        }
        Ok(deleted)
    }
}
