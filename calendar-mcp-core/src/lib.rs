//! Core types for calendar-mcp.
//!
//! This crate holds everything that doesn't depend on the MCP transport:
//! - `Event`, `RecurrenceRule` and the request types that build them
//! - the `CalendarStore` contract with a provider-subprocess and an
//!   in-memory adapter
//! - the report engine that groups events by day and totals their time
//! - `CalendarService`, the entry point tool handlers call

pub mod calendar;
pub mod date_range;
pub mod error;
pub mod event;
pub mod recurrence;
pub mod report;
pub mod service;
pub mod store;
pub mod time;

pub use calendar::Calendar;
pub use date_range::DateRange;
pub use error::{CalendarError, CalendarResult, ErrorKind};
pub use event::{Alarm, Attendee, Event, EventPatch, NewEvent};
pub use recurrence::{RecurrenceInput, RecurrenceRule};
pub use report::{Report, build_report};
pub use service::CalendarService;
