//! The store contract and its adapters.
//!
//! A [`CalendarStore`] is the only way calendar-mcp reaches calendar data.
//! Adapters translate between [`Event`] and their native records at this
//! boundary; nothing above it sees provider-native types.

pub mod memory;
pub mod native;
pub mod protocol;
pub mod provider;

use std::sync::Arc;

use async_trait::async_trait;

use crate::calendar::Calendar;
use crate::date_range::DateRange;
use crate::error::CalendarResult;
use crate::event::{Event, EventPatch};

pub use memory::MemoryStore;
pub use provider::ProviderStore;

/// Access to a calendar store.
///
/// Every operation may fail with `PermissionDenied`; callers propagate it
/// unchanged.
#[async_trait]
pub trait CalendarStore: Send + Sync {
    /// Ask the platform for calendar access.
    async fn request_access(&self) -> CalendarResult<()>;

    async fn calendars(&self) -> CalendarResult<Vec<Calendar>>;

    async fn default_calendar(&self) -> CalendarResult<Option<Calendar>>;

    /// Events intersecting `range`, including all-day and recurring events
    /// that span into it. `calendar_ids` of `None` means every calendar.
    async fn events(
        &self,
        range: &DateRange,
        calendar_ids: Option<&[String]>,
    ) -> CalendarResult<Vec<Event>>;

    async fn event(&self, id: &str) -> CalendarResult<Option<Event>>;

    /// Persist a new event and return it with its id.
    async fn create_event(&self, event: &Event) -> CalendarResult<Event>;

    /// Fails with `EventNotFound` for an unknown id.
    async fn update_event(&self, id: &str, patch: &EventPatch) -> CalendarResult<Event>;

    /// Fails with `EventNotFound` for an unknown id.
    async fn delete_event(&self, id: &str) -> CalendarResult<bool>;
}

/// Shared handles are stores too, so a caller can keep one while a service
/// owns another.
#[async_trait]
impl<S: CalendarStore + ?Sized> CalendarStore for Arc<S> {
    async fn request_access(&self) -> CalendarResult<()> {
        (**self).request_access().await
    }

    async fn calendars(&self) -> CalendarResult<Vec<Calendar>> {
        (**self).calendars().await
    }

    async fn default_calendar(&self) -> CalendarResult<Option<Calendar>> {
        (**self).default_calendar().await
    }

    async fn events(
        &self,
        range: &DateRange,
        calendar_ids: Option<&[String]>,
    ) -> CalendarResult<Vec<Event>> {
        (**self).events(range, calendar_ids).await
    }

    async fn event(&self, id: &str) -> CalendarResult<Option<Event>> {
        (**self).event(id).await
    }

    async fn create_event(&self, event: &Event) -> CalendarResult<Event> {
        (**self).create_event(event).await
    }

    async fn update_event(&self, id: &str, patch: &EventPatch) -> CalendarResult<Event> {
        (**self).update_event(id, patch).await
    }

    async fn delete_event(&self, id: &str) -> CalendarResult<bool> {
        (**self).delete_event(id).await
    }
}
