//! JSON protocol spoken between calendar-mcp and provider binaries over
//! stdin/stdout. One request line in, one response document out.

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::calendar::Calendar;
use crate::error::CalendarError;
use crate::store::native::NativeEvent;

pub trait ProviderCommand: Serialize {
    type Response: DeserializeOwned;
    fn command() -> Command;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    RequestAccess,
    ListCalendars,
    DefaultCalendar,
    ListEvents,
    GetEvent,
    CreateEvent,
    UpdateEvent,
    DeleteEvent,
}

impl Command {
    pub fn as_str(self) -> &'static str {
        match self {
            Command::RequestAccess => "request_access",
            Command::ListCalendars => "list_calendars",
            Command::DefaultCalendar => "default_calendar",
            Command::ListEvents => "list_events",
            Command::GetEvent => "get_event",
            Command::CreateEvent => "create_event",
            Command::UpdateEvent => "update_event",
            Command::DeleteEvent => "delete_event",
        }
    }
}

/// Request sent to the provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Request {
    pub command: Command,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Why a provider refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PermissionDenied,
    NotFound,
    Invalid,
    #[serde(other)]
    Other,
}

/// Response sent back by the provider.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response<T> {
    Success {
        data: T,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<FailureKind>,
    },
}

impl<T> Response<T> {
    /// Unwrap the payload, mapping provider failure kinds onto calendar errors.
    pub fn into_result(self, command: Command) -> Result<T, CalendarError> {
        match self {
            Response::Success { data } => Ok(data),
            Response::Error { error, kind } => Err(match kind {
                Some(FailureKind::PermissionDenied) => CalendarError::PermissionDenied(error),
                Some(FailureKind::NotFound) => CalendarError::EventNotFound(error),
                Some(FailureKind::Invalid) => CalendarError::Validation(error),
                Some(FailureKind::Other) | None => {
                    CalendarError::provider(command.as_str(), error)
                }
            }),
        }
    }
}

/// Trigger the platform permission prompt if needed.
#[derive(Debug, Serialize, Deserialize)]
pub struct RequestAccess {}

impl ProviderCommand for RequestAccess {
    type Response = ();
    fn command() -> Command {
        Command::RequestAccess
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListCalendars {}

impl ProviderCommand for ListCalendars {
    type Response = Vec<Calendar>;
    fn command() -> Command {
        Command::ListCalendars
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DefaultCalendar {}

impl ProviderCommand for DefaultCalendar {
    type Response = Option<Calendar>;
    fn command() -> Command {
        Command::DefaultCalendar
    }
}

/// List events intersecting `[from, to)`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ListEvents {
    pub from: String,
    pub to: String,
    /// Restrict to these calendars; all calendars when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_ids: Option<Vec<String>>,
}

impl ProviderCommand for ListEvents {
    type Response = Vec<NativeEvent>;
    fn command() -> Command {
        Command::ListEvents
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetEvent {
    pub event_id: String,
}

impl ProviderCommand for GetEvent {
    type Response = Option<NativeEvent>;
    fn command() -> Command {
        Command::GetEvent
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateEvent {
    pub event: NativeEvent,
}

impl ProviderCommand for CreateEvent {
    type Response = NativeEvent;
    fn command() -> Command {
        Command::CreateEvent
    }
}

/// Replace an existing event with the merged record.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateEvent {
    pub event_id: String,
    pub event: NativeEvent,
}

impl ProviderCommand for UpdateEvent {
    type Response = NativeEvent;
    fn command() -> Command {
        Command::UpdateEvent
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteEvent {
    pub event_id: String,
}

impl ProviderCommand for DeleteEvent {
    type Response = bool;
    fn command() -> Command {
        Command::DeleteEvent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_command_in_snake_case() {
        let request = Request {
            command: GetEvent::command(),
            params: serde_json::to_value(GetEvent {
                event_id: "e1".into(),
            })
            .unwrap(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"command":"get_event","params":{"event_id":"e1"}}"#);
    }

    #[test]
    fn error_kinds_map_to_calendar_errors() {
        let denied: Response<()> = serde_json::from_str(
            r#"{"status":"error","error":"no access","kind":"permission_denied"}"#,
        )
        .unwrap();
        assert!(matches!(
            denied.into_result(Command::ListEvents),
            Err(CalendarError::PermissionDenied(_))
        ));

        let missing: Response<()> =
            serde_json::from_str(r#"{"status":"error","error":"gone","kind":"not_found"}"#)
                .unwrap();
        assert!(matches!(
            missing.into_result(Command::GetEvent),
            Err(CalendarError::EventNotFound(_))
        ));

        let odd: Response<()> =
            serde_json::from_str(r#"{"status":"error","error":"boom","kind":"exploded"}"#)
                .unwrap();
        let err = odd.into_result(Command::CreateEvent).unwrap_err();
        assert_eq!(err.to_string(), "Provider error during create_event: boom");
    }

    #[test]
    fn unit_success_accepts_null_data() {
        let ok: Response<()> = serde_json::from_str(r#"{"status":"success","data":null}"#).unwrap();
        assert!(ok.into_result(Command::RequestAccess).is_ok());
    }
}
