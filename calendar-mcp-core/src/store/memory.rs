//! In-process store.
//!
//! Keeps native records in memory and expands recurring series with the
//! `rrule` crate when queried. Used by the test suites and for running the
//! server without a platform calendar (optionally seeded from a JSON file).

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rrule::RRuleSet;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::calendar::Calendar;
use crate::date_range::DateRange;
use crate::error::{CalendarError, CalendarResult};
use crate::event::{Event, EventPatch};
use crate::store::CalendarStore;
use crate::store::native::NativeEvent;

/// Hard ceiling on occurrences `rrule` will produce for one series.
const MAX_OCCURRENCES: u16 = u16::MAX;

/// Contents of a seed file.
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub calendars: Vec<Calendar>,
    #[serde(default)]
    pub events: Vec<NativeEvent>,
}

#[derive(Debug, Default)]
struct State {
    calendars: Vec<Calendar>,
    events: Vec<NativeEvent>,
}

impl State {
    fn calendar(&self, id: &str) -> Option<&Calendar> {
        self.calendars.iter().find(|c| c.id == id)
    }

    fn default_calendar(&self) -> Option<&Calendar> {
        self.calendars
            .iter()
            .find(|c| c.is_default)
            .or_else(|| self.calendars.first())
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.events
            .iter()
            .position(|e| e.identifier.as_deref() == Some(id))
    }

    /// Store `event` under `id`, filling in its calendar.
    fn to_native(&self, id: &str, event: &Event) -> CalendarResult<NativeEvent> {
        let calendar = match &event.calendar_id {
            Some(calendar_id) => self.calendar(calendar_id).ok_or_else(|| {
                CalendarError::CalendarNotFound {
                    name: calendar_id.clone(),
                    available: self.calendars.iter().map(|c| c.name.clone()).collect(),
                }
            })?,
            None => self.default_calendar().ok_or_else(|| {
                CalendarError::validation("No calendars exist to hold the event")
            })?,
        };

        let mut native = NativeEvent::from(event);
        native.identifier = Some(id.to_string());
        native.calendar_id = Some(calendar.id.clone());
        native.calendar_title = Some(calendar.name.clone());
        Ok(native)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    denied: AtomicBool,
    access_requests: AtomicUsize,
}

impl MemoryStore {
    pub fn new(calendars: Vec<Calendar>) -> Self {
        MemoryStore {
            state: Mutex::new(State {
                calendars,
                events: Vec::new(),
            }),
            ..Default::default()
        }
    }

    /// A "Personal" (default) and a "Work" calendar, no events.
    pub fn with_default_calendars() -> Self {
        MemoryStore::new(vec![
            Calendar {
                id: "personal".into(),
                name: "Personal".into(),
                source: Some("Local".into()),
                color: Some("#1badf8".into()),
                is_default: true,
            },
            Calendar {
                id: "work".into(),
                name: "Work".into(),
                source: Some("Local".into()),
                color: Some("#ff2968".into()),
                is_default: false,
            },
        ])
    }

    pub fn from_seed(seed: Seed) -> Self {
        let store = if seed.calendars.is_empty() {
            MemoryStore::with_default_calendars()
        } else {
            MemoryStore::new(seed.calendars)
        };

        {
            let mut state = store.lock();
            for mut native in seed.events {
                if native.identifier.is_none() {
                    native.identifier = Some(uuid::Uuid::new_v4().to_string());
                }
                if native.calendar_title.is_none() {
                    let calendar = match &native.calendar_id {
                        Some(id) => state.calendar(id),
                        None => state.default_calendar(),
                    };
                    if let Some(calendar) = calendar {
                        native.calendar_id = Some(calendar.id.clone());
                        native.calendar_title = Some(calendar.name.clone());
                    }
                }
                state.events.push(native);
            }
        }

        store
    }

    /// Load calendars and events from a JSON seed file.
    pub fn from_seed_file(path: &Path) -> CalendarResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let seed: Seed = serde_json::from_str(&contents).map_err(|e| {
            CalendarError::Config(format!("Invalid seed file {}: {}", path.display(), e))
        })?;
        info!(
            path = %path.display(),
            calendars = seed.calendars.len(),
            events = seed.events.len(),
            "Loaded seed file"
        );
        Ok(MemoryStore::from_seed(seed))
    }

    /// Refuse every following request with `PermissionDenied`.
    pub fn deny_access(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }

    pub fn grant_access(&self) {
        self.denied.store(false, Ordering::SeqCst);
    }

    /// How many times the permission handshake ran.
    pub fn access_requests(&self) -> usize {
        self.access_requests.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_access(&self) -> CalendarResult<()> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(CalendarError::PermissionDenied(
                "Calendar access was denied".to_string(),
            ));
        }
        Ok(())
    }
}

/// Occurrences of a recurring event that intersect `range`.
///
/// Every occurrence keeps the series id and rule, as platform calendars
/// report them.
fn expand(master: &Event, range: &DateRange) -> CalendarResult<Vec<Event>> {
    let single = || {
        if range.overlaps(master) {
            vec![master.clone()]
        } else {
            Vec::new()
        }
    };

    let Some(rule) = &master.recurrence else {
        return Ok(single());
    };

    // DTSTART is always the first occurrence, even when UNTIL precedes it.
    if rule.ends_before(master.start.date_naive()) {
        warn!(
            id = master.id.as_deref().unwrap_or("-"),
            "Recurrence ends before its first occurrence; treating as a single event"
        );
        return Ok(single());
    }

    let rrule_set: RRuleSet = rule.to_rrule(&master.start).parse().map_err(|e| {
        CalendarError::provider(
            "expand_recurrence",
            format!(
                "invalid recurrence on '{}': {}",
                master.id.as_deref().unwrap_or("-"),
                e
            ),
        )
    })?;

    // after/before are exclusive; widen by a second and by the event length
    // so occurrences that start before the range but run into it are found.
    let duration = master.end - master.start;
    let tz: rrule::Tz = Utc.into();
    let after = (range.start - duration - Duration::seconds(1)).with_timezone(&tz);
    let before = (range.end + Duration::seconds(1)).with_timezone(&tz);

    // At most one occurrence per day for every frequency; the limit only
    // trips for windows longer than u16::MAX days.
    let window_days = (range.end - range.start + duration).num_days().saturating_add(3);
    let limit = u16::try_from(window_days).unwrap_or(MAX_OCCURRENCES);
    let result = rrule_set.after(after).before(before).all(limit);
    if result.limited {
        return Err(CalendarError::provider(
            "expand_recurrence",
            format!(
                "'{}' has more than {} occurrences in the requested range; use a shorter range",
                master.id.as_deref().unwrap_or("-"),
                limit
            ),
        ));
    }

    let offset = *master.start.offset();
    Ok(result
        .dates
        .iter()
        .map(|occurrence| {
            let start = occurrence.with_timezone(&offset);
            Event {
                start,
                end: start + duration,
                ..master.clone()
            }
        })
        .filter(|occurrence| range.overlaps(occurrence))
        .collect())
}

#[async_trait]
impl CalendarStore for MemoryStore {
    async fn request_access(&self) -> CalendarResult<()> {
        self.access_requests.fetch_add(1, Ordering::SeqCst);
        self.check_access()
    }

    async fn calendars(&self) -> CalendarResult<Vec<Calendar>> {
        self.check_access()?;
        Ok(self.lock().calendars.clone())
    }

    async fn default_calendar(&self) -> CalendarResult<Option<Calendar>> {
        self.check_access()?;
        Ok(self.lock().default_calendar().cloned())
    }

    async fn events(
        &self,
        range: &DateRange,
        calendar_ids: Option<&[String]>,
    ) -> CalendarResult<Vec<Event>> {
        self.check_access()?;
        let natives: Vec<NativeEvent> = {
            let state = self.lock();
            state
                .events
                .iter()
                .filter(|e| match (calendar_ids, &e.calendar_id) {
                    (None, _) => true,
                    (Some(ids), Some(id)) => ids.contains(id),
                    (Some(_), None) => false,
                })
                .cloned()
                .collect()
        };

        let mut events = Vec::new();
        for native in natives {
            let master = Event::try_from(native)?;
            events.extend(expand(&master, range)?);
        }
        debug!(count = events.len(), "Memory store matched events");
        Ok(events)
    }

    async fn event(&self, id: &str) -> CalendarResult<Option<Event>> {
        self.check_access()?;
        let native = {
            let state = self.lock();
            state.position(id).map(|i| state.events[i].clone())
        };
        native.map(Event::try_from).transpose()
    }

    async fn create_event(&self, event: &Event) -> CalendarResult<Event> {
        self.check_access()?;
        let id = uuid::Uuid::new_v4().to_string();
        let native = {
            let mut state = self.lock();
            let native = state.to_native(&id, event)?;
            state.events.push(native.clone());
            native
        };
        info!(id = %id, title = %native.title, "Created event");
        Event::try_from(native)
    }

    async fn update_event(&self, id: &str, patch: &EventPatch) -> CalendarResult<Event> {
        self.check_access()?;
        let native = {
            let mut state = self.lock();
            let index = state
                .position(id)
                .ok_or_else(|| CalendarError::EventNotFound(id.to_string()))?;
            let current = Event::try_from(state.events[index].clone())?;
            let merged = patch.apply(current)?;
            let native = state.to_native(id, &merged)?;
            state.events[index] = native.clone();
            native
        };
        info!(id, "Updated event");
        Event::try_from(native)
    }

    async fn delete_event(&self, id: &str) -> CalendarResult<bool> {
        self.check_access()?;
        let mut state = self.lock();
        let index = state
            .position(id)
            .ok_or_else(|| CalendarError::EventNotFound(id.to_string()))?;
        state.events.remove(index);
        info!(id, "Deleted event");
        Ok(true)
    }
}
