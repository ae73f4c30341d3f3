//! Error types for calendar-mcp.

use thiserror::Error;

/// Errors that can occur in calendar operations.
#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Calendar access not granted: {0}")]
    PermissionDenied(String),

    #[error("Event with id '{0}' does not exist")]
    EventNotFound(String),

    #[error("Calendar '{name}' does not exist. Available: {}", available.join(", "))]
    CalendarNotFound { name: String, available: Vec<String> },

    #[error("Provider error during {operation}: {message}")]
    Provider { operation: String, message: String },

    #[error("Provider '{0}' not found in PATH")]
    ProviderNotInstalled(String),

    #[error("Provider request '{operation}' timed out after {secs}s")]
    ProviderTimeout { operation: String, secs: u64 },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by callers to pick a message style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Permission,
    NotFound,
    Failure,
}

impl CalendarError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CalendarError::Validation(msg.into())
    }

    pub fn provider(operation: &str, message: impl Into<String>) -> Self {
        CalendarError::Provider {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CalendarError::Validation(_) => ErrorKind::Validation,
            CalendarError::PermissionDenied(_) => ErrorKind::Permission,
            CalendarError::EventNotFound(_) | CalendarError::CalendarNotFound { .. } => {
                ErrorKind::NotFound
            }
            _ => ErrorKind::Failure,
        }
    }
}

/// Result type alias for calendar operations.
pub type CalendarResult<T> = Result<T, CalendarError>;
