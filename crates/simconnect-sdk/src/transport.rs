//! The seam between the SDK and the host.
//!
//! A [`Transport`] performs the native calls: open, close, fetch the next
//! inbound message, and send one outbound [`Verb`]. The SDK never talks to
//! the host any other way, so a scripted implementation can stand in for
//! the simulator in tests and demos.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use simconnect_models::{
    DataDefinitionId, DataType, EventId, FacilityDefinitionId, FacilityListScope,
    FacilityListType, GroupId, InitPosition, InputGroupId, Period, RequestId, SendId,
    SimObjectId, SimObjectType,
};

use crate::error::HostResult;

// ── Notification ─────────────────────────────────────────────────────────

/// Auto-reset event the host signals when messages are waiting.
#[derive(Debug, Default)]
pub struct Notification {
    signaled: Mutex<bool>,
    cond: Condvar,
}

impl Notification {
    /// An unsignaled notification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake one waiter, or the next one to arrive.
    pub fn signal(&self) {
        let mut signaled = self.signaled.lock().unwrap_or_else(PoisonError::into_inner);
        *signaled = true;
        self.cond.notify_all();
    }

    /// Wait until signaled or `timeout` elapses. Returns `true` if the
    /// notification was signaled, and resets it.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.signaled.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut signaled, _) = self
            .cond
            .wait_timeout_while(guard, timeout, |signaled| !*signaled)
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *signaled, false)
    }

    /// Clear a pending signal.
    pub fn reset(&self) {
        *self.signaled.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

// ── Open parameters ──────────────────────────────────────────────────────

/// How the host announces waiting messages.
#[derive(Debug, Clone, Default)]
pub enum NotifyMode {
    /// No announcement; the client polls.
    #[default]
    None,
    /// Signal this notification.
    Event(std::sync::Arc<Notification>),
    /// Post `user_message` to the window `hwnd`.
    Window {
        /// Native window handle.
        hwnd: usize,
        /// Message id to post.
        user_message: u32,
    },
}

/// Arguments of an open call.
#[derive(Debug, Clone)]
pub struct OpenParams {
    /// Name the host shows for this client.
    pub client_name: String,
    /// How to announce waiting messages.
    pub notify: NotifyMode,
    /// Index of the configuration section to use.
    pub config_index: u32,
}

// ── Verbs ────────────────────────────────────────────────────────────────

/// One outbound host call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, strum::IntoStaticStr)]
pub enum Verb {
    // ── System events and state ──────────────────────────────────────
    /// Start receiving a system event.
    SubscribeToSystemEvent {
        /// Client id for the event.
        event_id: EventId,
        /// System event name.
        name: String,
    },
    /// Stop receiving a system event.
    UnsubscribeFromSystemEvent {
        /// Client id for the event.
        event_id: EventId,
    },
    /// Pause or resume a system event subscription.
    SetSystemEventState {
        /// Client id for the event.
        event_id: EventId,
        /// New state.
        on: bool,
    },
    /// Ask for a system state value.
    RequestSystemState {
        /// Correlation id for the reply.
        request_id: RequestId,
        /// State name.
        state: String,
    },

    // ── Client events and notification groups ───────────────────────
    /// Bind a client event id to a simulator event name.
    MapClientEventToSimEvent {
        /// Client id for the event.
        event_id: EventId,
        /// Simulator event name; empty for a private event.
        name: String,
    },
    /// Fire a client event.
    TransmitClientEvent {
        /// Target object.
        object_id: SimObjectId,
        /// Event to fire.
        event_id: EventId,
        /// Event parameters; only the first is used by plain events.
        data: [u32; 5],
        /// Group the event belongs to, or a priority.
        group_id: GroupId,
        /// Transmit flags.
        flags: u32,
    },
    /// Add a client event to a notification group.
    AddClientEventToNotificationGroup {
        /// Notification group.
        group_id: GroupId,
        /// Event to add.
        event_id: EventId,
        /// Whether this client may mask the event from lower priorities.
        maskable: bool,
    },
    /// Remove a client event from a notification group.
    RemoveClientEvent {
        /// Notification group.
        group_id: GroupId,
        /// Event to remove.
        event_id: EventId,
    },
    /// Set a notification group's priority.
    SetNotificationGroupPriority {
        /// Notification group.
        group_id: GroupId,
        /// Raw priority.
        priority: u32,
    },
    /// Remove every event from a notification group.
    ClearNotificationGroup {
        /// Notification group.
        group_id: GroupId,
    },
    /// Ask for the events of a notification group.
    RequestNotificationGroup {
        /// Notification group.
        group_id: GroupId,
    },

    // ── Data definitions ─────────────────────────────────────────────
    /// Append a variable to a data definition.
    AddToDataDefinition {
        /// Definition to extend.
        define_id: DataDefinitionId,
        /// Simulation variable name.
        name: String,
        /// Unit, empty for strings and structures.
        unit: String,
        /// Declared wire type.
        data_type: DataType,
        /// Change threshold for changed-only requests.
        epsilon: f32,
        /// Tag for tagged requests, or [`UNUSED`](simconnect_models::UNUSED).
        datum_id: u32,
    },
    /// Remove every variable from a data definition.
    ClearDataDefinition {
        /// Definition to clear.
        define_id: DataDefinitionId,
    },
    /// Request data about one object.
    RequestDataOnSimObject {
        /// Correlation id for the replies.
        request_id: RequestId,
        /// Layout of the replies.
        define_id: DataDefinitionId,
        /// Object to observe.
        object_id: SimObjectId,
        /// Delivery period; [`Period::Never`] stops the request.
        period: Period,
        /// Request flags.
        flags: u32,
        /// Periods to skip before the first delivery.
        origin: u32,
        /// Periods between deliveries.
        interval: u32,
        /// Maximum number of deliveries.
        limit: u32,
    },
    /// Request data about every object of a type within a radius.
    RequestDataOnSimObjectType {
        /// Correlation id for the replies.
        request_id: RequestId,
        /// Layout of the replies.
        define_id: DataDefinitionId,
        /// Radius in meters around the user.
        radius_meters: u32,
        /// Kind of objects.
        object_type: SimObjectType,
    },
    /// Write data to an object.
    SetDataOnSimObject {
        /// Layout of `data`.
        define_id: DataDefinitionId,
        /// Object to write.
        object_id: SimObjectId,
        /// Set flags.
        flags: u32,
        /// Marshalled record.
        data: Vec<u8>,
    },

    // ── Facilities ───────────────────────────────────────────────────
    /// Append a field to a facility definition.
    AddToFacilityDefinition {
        /// Definition to extend.
        define_id: FacilityDefinitionId,
        /// Field path (`OPEN AIRPORT`, `LATITUDE`, …).
        field: String,
    },
    /// Ask for facility data.
    RequestFacilityData {
        /// Layout of the replies.
        define_id: FacilityDefinitionId,
        /// Correlation id for the replies.
        request_id: RequestId,
        /// ICAO of the facility.
        icao: String,
        /// Region, empty when not needed.
        region: String,
    },
    /// Ask for a facility list.
    RequestFacilitiesList {
        /// Facility family.
        list_type: FacilityListType,
        /// Which facilities to include.
        scope: FacilityListScope,
        /// Correlation id for the replies.
        request_id: RequestId,
    },

    // ── SimObjects and AI ────────────────────────────────────────────
    /// Enumerate the available titles and liveries.
    EnumerateSimObjectsAndLiveries {
        /// Correlation id for the replies.
        request_id: RequestId,
        /// Kind of objects.
        object_type: SimObjectType,
    },
    /// Create an AI aircraft without ATC.
    AiCreateNonAtcAircraft {
        /// Aircraft title.
        title: String,
        /// Livery, empty for the default.
        livery: String,
        /// Tail number.
        tail_number: String,
        /// Starting position.
        position: InitPosition,
        /// Correlation id for the assigned object id.
        request_id: RequestId,
    },
    /// Create a parked AI aircraft under ATC control.
    AiCreateParkedAtcAircraft {
        /// Aircraft title.
        title: String,
        /// Livery, empty for the default.
        livery: String,
        /// Tail number.
        tail_number: String,
        /// ICAO of the airport to park at.
        airport: String,
        /// Correlation id for the assigned object id.
        request_id: RequestId,
    },
    /// Remove an AI object.
    AiRemoveObject {
        /// Object to remove.
        object_id: SimObjectId,
        /// Correlation id.
        request_id: RequestId,
    },

    // ── Input groups ─────────────────────────────────────────────────
    /// Set an input group's priority.
    SetInputGroupPriority {
        /// Input group.
        group_id: InputGroupId,
        /// Raw priority.
        priority: u32,
    },
    /// Enable or disable an input group.
    SetInputGroupState {
        /// Input group.
        group_id: InputGroupId,
        /// New state.
        on: bool,
    },
    /// Bind an input definition (`"Shift+K"`, `"joystick:0:button:3"`) to a client event.
    MapInputEventToClientEvent {
        /// Input group.
        group_id: InputGroupId,
        /// Input definition.
        definition: String,
        /// Event fired on press.
        down_event_id: EventId,
        /// Parameter for the press event.
        down_value: u32,
        /// Event fired on release, or [`UNUSED`](simconnect_models::UNUSED).
        up_event_id: EventId,
        /// Parameter for the release event.
        up_value: u32,
        /// Whether this client may mask the input from lower priorities.
        maskable: bool,
    },
    /// Remove an input binding.
    RemoveInputEvent {
        /// Input group.
        group_id: InputGroupId,
        /// Input definition.
        definition: String,
    },
    /// Remove every binding of an input group.
    ClearInputGroup {
        /// Input group.
        group_id: InputGroupId,
    },
}

impl Verb {
    /// Name of the host call, for logs and error messages.
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

// ── Transport ────────────────────────────────────────────────────────────

/// The native host interface.
///
/// Methods take `&self`; implementations synchronise internally so one
/// transport can be shared by the connection and the thread waiting on it.
pub trait Transport: Send + Sync {
    /// Open a session.
    fn open(&self, params: &OpenParams) -> HostResult<()>;

    /// Close the session. Closing a closed transport does nothing.
    fn close(&self);

    /// The next waiting message, or `None` when there is nothing to read.
    fn next_message(&self) -> HostResult<Option<Vec<u8>>>;

    /// Send one call and return the serial number the host gave it.
    fn send(&self, verb: &Verb) -> HostResult<SendId>;
}
