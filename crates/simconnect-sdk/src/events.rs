//! Process-wide registry of client events.
//!
//! Every event name gets one id for the lifetime of the process, handed out
//! in order starting at 1. Entries are never removed. The registry is shared
//! by all connections, so an [`Event`] can be mapped on several sessions
//! under the same id.
//!
//! ```
//! use simconnect_sdk::Event;
//!
//! let brakes = Event::get("BRAKES");
//! assert_eq!(Event::get("BRAKES"), brakes);
//! assert_eq!(Event::by_id(brakes.id()).unwrap().name(), "BRAKES");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, OnceLock, PoisonError};

use serde::{Deserialize, Serialize};
use simconnect_models::EventId;

use crate::error::{HostResult, SdkError};

#[derive(Default)]
struct EventRegistry {
    ids: HashMap<String, EventId>,
    names: Vec<String>,
}

fn registry() -> &'static Mutex<EventRegistry> {
    static REGISTRY: OnceLock<Mutex<EventRegistry>> = OnceLock::new();
    REGISTRY.get_or_init(Mutex::default)
}

/// A named client event with its process-wide id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    id: EventId,
    name: String,
}

impl Event {
    /// The event called `name`, registering it on first use.
    pub fn get(name: &str) -> Self {
        let mut registry = registry().lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = registry.ids.get(name) {
            return Self {
                id: *id,
                name: name.to_string(),
            };
        }
        registry.names.push(name.to_string());
        let id = EventId::try_from(registry.names.len()).unwrap_or(EventId::MAX);
        registry.ids.insert(name.to_string(), id);
        Self {
            id,
            name: name.to_string(),
        }
    }

    /// The event registered under `id`.
    ///
    /// # Errors
    ///
    /// [`SdkError::UnknownEventId`] if no event has that id.
    pub fn by_id(id: EventId) -> HostResult<Self> {
        let registry = registry().lock().unwrap_or_else(PoisonError::into_inner);
        let index = (id as usize).checked_sub(1).ok_or(SdkError::UnknownEventId(id))?;
        registry
            .names
            .get(index)
            .map(|name| Self {
                id,
                name: name.clone(),
            })
            .ok_or(SdkError::UnknownEventId(id))
    }

    /// The process-wide id.
    pub fn id(&self) -> EventId {
        self.id
    }

    /// The event name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Self::get(name)
    }
}

impl From<SystemEvent> for Event {
    fn from(event: SystemEvent) -> Self {
        event.event()
    }
}

// ── System events ────────────────────────────────────────────────────────

/// Events the host raises by itself. Subscribe to them through
/// [`SystemEventHandler`](crate::handlers::SystemEventHandler).
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum SystemEvent {
    /// Every second.
    #[strum(serialize = "1sec")]
    OneSec,
    /// Every four seconds.
    #[strum(serialize = "4sec")]
    FourSec,
    /// Six times a second.
    #[strum(serialize = "6Hz")]
    SixHz,
    /// An aircraft was loaded; carries the file name.
    AircraftLoaded,
    /// The user aircraft crashed.
    Crashed,
    /// The crash cut-scene finished.
    CrashReset,
    /// A mission action was executed (legacy).
    CustomMissionActionExecuted,
    /// A flight was loaded; carries the file name.
    FlightLoaded,
    /// A flight was saved; carries the file name.
    FlightSaved,
    /// A flight plan was activated; carries the file name.
    FlightPlanActivated,
    /// The active flight plan was removed.
    FlightPlanDeactivated,
    /// Every visual frame; carries frame rate and sim speed.
    Frame,
    /// An object was added.
    ObjectAdded,
    /// An object was removed.
    ObjectRemoved,
    /// Pause state changed.
    Pause,
    /// Pause state changed, with the full pause bit-field.
    #[strum(serialize = "Pause_EX1")]
    PauseEx1,
    /// The simulation paused.
    Paused,
    /// Every visual frame while paused.
    PauseFrame,
    /// The user changed the aircraft position.
    PositionChanged,
    /// The simulation started or stopped running.
    Sim,
    /// The simulation started running.
    SimStart,
    /// The simulation stopped running.
    SimStop,
    /// The master sound switch changed.
    Sound,
    /// The simulation resumed.
    Unpaused,
    /// The view changed.
    View,
    /// The weather mode changed (legacy).
    WeatherModeChanged,
}

impl SystemEvent {
    /// Host name of the event.
    pub fn name(self) -> &'static str {
        self.into()
    }

    /// The registered client event for this system event.
    pub fn event(self) -> Event {
        Event::get(self.name())
    }
}
