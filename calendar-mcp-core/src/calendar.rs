//! Calendar snapshots as enumerated by a store.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A calendar the store exposes. Read-only; never persisted by calendar-mcp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calendar {
    pub id: String,
    pub name: String,
    /// Account the calendar belongs to (e.g. "iCloud", "Google")
    #[serde(default)]
    pub source: Option<String>,
    /// Display color as a hex string
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl fmt::Display for Calendar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
