//! The calendar service: the single entry point tool handlers talk to.
//!
//! It owns the long-lived store handle and runs the permission handshake on
//! first use. Requests are validated before the store is touched.

use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::calendar::Calendar;
use crate::date_range::DateRange;
use crate::error::{CalendarError, CalendarResult};
use crate::event::{Event, EventPatch, NewEvent};
use crate::report::{Report, build_report};
use crate::store::CalendarStore;

pub struct CalendarService {
    store: Box<dyn CalendarStore>,
    access: OnceCell<()>,
}

impl CalendarService {
    pub fn new(store: Box<dyn CalendarStore>) -> Self {
        CalendarService {
            store,
            access: OnceCell::new(),
        }
    }

    /// The store, once access has been granted.
    ///
    /// A refused handshake leaves the cell empty, so the next request asks
    /// again.
    async fn store(&self) -> CalendarResult<&dyn CalendarStore> {
        self.access
            .get_or_try_init(|| async {
                info!("Requesting calendar access");
                self.store.request_access().await
            })
            .await?;
        Ok(self.store.as_ref())
    }

    pub async fn list_calendars(&self) -> CalendarResult<Vec<Calendar>> {
        self.store().await?.calendars().await
    }

    /// Find a calendar by id, then exact name, then case-insensitive name.
    pub async fn resolve_calendar(&self, reference: &str) -> CalendarResult<Calendar> {
        let calendars = self.list_calendars().await?;
        find_calendar(&calendars, reference)
    }

    pub async fn resolve_calendars(&self, references: &[String]) -> CalendarResult<Vec<Calendar>> {
        let calendars = self.list_calendars().await?;
        references
            .iter()
            .map(|r| find_calendar(&calendars, r))
            .collect()
    }

    /// Events in `range`, grouped and totalled. An empty `calendar_refs`
    /// means every calendar.
    pub async fn list_events_report(
        &self,
        range: DateRange,
        calendar_refs: &[String],
    ) -> CalendarResult<Report> {
        if range.is_empty() {
            return Ok(Report::empty(range));
        }

        let calendar_ids = if calendar_refs.is_empty() {
            None
        } else {
            let calendars = self.resolve_calendars(calendar_refs).await?;
            Some(calendars.into_iter().map(|c| c.id).collect::<Vec<_>>())
        };

        let events = self
            .store()
            .await?
            .events(&range, calendar_ids.as_deref())
            .await?;
        debug!(count = events.len(), "Fetched events for report");

        let report = build_report(&range, events);
        debug!(
            listed = report.event_count(),
            minutes = report.total_minutes,
            "Built report"
        );
        Ok(report)
    }

    pub async fn find_event(&self, id: &str) -> CalendarResult<Option<Event>> {
        self.store().await?.event(id).await
    }

    /// Create an event in `calendar_ref`, or the store's default calendar.
    pub async fn create_event(
        &self,
        request: NewEvent,
        calendar_ref: Option<&str>,
    ) -> CalendarResult<Event> {
        let mut event = request.into_event()?;

        let calendar = match calendar_ref {
            Some(reference) => self.resolve_calendar(reference).await?,
            None => self.store().await?.default_calendar().await?.ok_or_else(|| {
                CalendarError::validation(
                    "No default calendar is set; pass calendar_name to choose one",
                )
            })?,
        };
        event.calendar_id = Some(calendar.id);

        self.store().await?.create_event(&event).await
    }

    pub async fn update_event(
        &self,
        id: &str,
        mut patch: EventPatch,
        calendar_ref: Option<&str>,
    ) -> CalendarResult<Event> {
        patch.validate()?;
        if patch.is_empty() && calendar_ref.is_none() {
            return Err(CalendarError::validation(
                "Nothing to update; pass at least one field to change",
            ));
        }

        if let Some(reference) = calendar_ref {
            patch.calendar_id = Some(self.resolve_calendar(reference).await?.id);
        }

        self.store().await?.update_event(id, &patch).await
    }

    /// Delete an event and return what was removed.
    pub async fn delete_event(&self, id: &str) -> CalendarResult<Event> {
        let store = self.store().await?;
        let event = store
            .event(id)
            .await?
            .ok_or_else(|| CalendarError::EventNotFound(id.to_string()))?;

        if !store.delete_event(id).await? {
            return Err(CalendarError::provider(
                "delete_event",
                format!("the store refused to delete '{id}'"),
            ));
        }
        Ok(event)
    }
}

fn find_calendar(calendars: &[Calendar], reference: &str) -> CalendarResult<Calendar> {
    calendars
        .iter()
        .find(|c| c.id == reference)
        .or_else(|| calendars.iter().find(|c| c.name == reference))
        .or_else(|| {
            calendars
                .iter()
                .find(|c| c.name.to_lowercase() == reference.to_lowercase())
        })
        .cloned()
        .ok_or_else(|| CalendarError::CalendarNotFound {
            name: reference.to_string(),
            available: calendars.iter().map(|c| c.name.clone()).collect(),
        })
}
