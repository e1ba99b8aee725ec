//! The scripted host: a [`Transport`] that keeps a [`World`] and answers
//! every verb the way the simulator does.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use simconnect_models::{
    AssignedObjectIdMessage, DataBlockBuilder, DataBlockReader,
    DataDefinitionId, DataType, EventFrameMessage, EventId, EventMessage,
    EventObjectAddRemoveMessage, ExceptionCode, ExceptionMessage, FacilityDataEndMessage,
    FacilityDataMessage, FacilityDataType, FacilityDefinitionId, FacilityListType, FacilityMinimal,
    FacilityMinimalListMessage, GroupId, Icao, InputGroupId, LatLonAlt, ListHeader, ListItem,
    ListMessage, OpenMessage, Period, QuitMessage, RawMessage, RequestId, SendId,
    SimObjectDataByTypeMessage, SimObjectDataMessage, SimObjectId, SimObjectType,
    SystemStateMessage, Version, WireMessage, UNUSED,
};
use simconnect_sdk::{HostResult, NotifyMode, OpenParams, SdkError, Transport, Verb};
use tracing::{debug, info, trace};

use crate::world::{AirportRecord, SimObject, SimValue, World, USER_OBJECT_ID};

const TARGET: &str = "mock_simconnect::host";

/// Items per list batch unless configured otherwise.
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// How the mock presents itself in the OPEN reply.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct HostProfile {
    /// Simulator name.
    pub application_name: String,
    /// Simulator version.
    pub application_version: Version,
    /// Host library version.
    pub simconnect_version: Version,
}

impl Default for HostProfile {
    fn default() -> Self {
        Self {
            application_name: "Mock Simulator".to_string(),
            application_version: Version {
                major: 11,
                minor: 0,
                build_major: 282_174,
                build_minor: 999,
            },
            simconnect_version: Version {
                major: 11,
                minor: 0,
                build_major: 62_651,
                build_minor: 3,
            },
        }
    }
}

#[derive(Debug, Clone)]
struct DataField {
    name: String,
    data_type: DataType,
}

#[derive(Debug, Clone)]
struct PeriodicRequest {
    define_id: DataDefinitionId,
    object_id: SimObjectId,
    flags: u32,
    origin: u32,
    interval: u32,
    limit: u32,
    ticks: u32,
    sent: u32,
}

#[derive(Debug, Clone)]
struct InputBinding {
    definition: String,
    down_event_id: EventId,
    down_value: u32,
    up_event_id: EventId,
    up_value: u32,
}

#[derive(Debug, Default)]
struct InputGroupState {
    enabled: bool,
    priority: u32,
    bindings: Vec<InputBinding>,
}

/// Everything that lives for one client session.
#[derive(Debug, Default)]
struct Session {
    client_name: String,
    notify: NotifyMode,
    subscriptions: HashMap<EventId, String>,
    paused: BTreeSet<EventId>,
    mapped_events: HashMap<EventId, String>,
    notification_groups: BTreeMap<GroupId, BTreeSet<EventId>>,
    group_priorities: HashMap<GroupId, u32>,
    data_definitions: HashMap<DataDefinitionId, Vec<DataField>>,
    facility_definitions: HashMap<FacilityDefinitionId, Vec<String>>,
    periodic: BTreeMap<RequestId, PeriodicRequest>,
    input_groups: BTreeMap<InputGroupId, InputGroupState>,
}

#[derive(Debug, Default)]
struct HostState {
    open: bool,
    refuse_open: bool,
    opens: usize,
    session: Session,
    inbox: VecDeque<Vec<u8>>,
    calls: Vec<Verb>,
    send_id: SendId,
    next_facility_record: u32,
}

/// In-process simulator host.
///
/// Outbound verbs are recorded and answered by queueing the messages the
/// real simulator would send. Control methods such as [`quit`](Self::quit),
/// [`tick`](Self::tick) and [`press`](Self::press) make the simulator act
/// on its own.
#[derive(Debug)]
pub struct MockHost {
    profile: HostProfile,
    batch_size: usize,
    world: Mutex<World>,
    state: Mutex<HostState>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self {
            profile: HostProfile::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            world: Mutex::new(World::default()),
            state: Mutex::new(HostState::default()),
        }
    }
}

impl MockHost {
    /// A host with the default world, shared so it can be handed to a
    /// connection and still be driven by the test.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A host over `world` presenting itself as `profile`, sending list
    /// results in batches of `batch_size` items.
    pub fn with_world(world: World, profile: HostProfile, batch_size: usize) -> Arc<Self> {
        Arc::new(Self {
            profile,
            batch_size: batch_size.max(1),
            world: Mutex::new(world),
            state: Mutex::new(HostState::default()),
        })
    }

    fn state(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The simulated world.
    pub fn world(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// How the host presents itself.
    pub fn profile(&self) -> &HostProfile {
        &self.profile
    }

    // ── Inspection ───────────────────────────────────────────────────────

    /// True while a client session is open.
    pub fn is_open(&self) -> bool {
        self.state().open
    }

    /// Name of the connected client.
    pub fn client_name(&self) -> Option<String> {
        let state = self.state();
        state.open.then(|| state.session.client_name.clone())
    }

    /// Number of successful opens.
    pub fn open_count(&self) -> usize {
        self.state().opens
    }

    /// Every verb received, oldest first.
    pub fn calls(&self) -> Vec<Verb> {
        self.state().calls.clone()
    }

    /// The received verbs named `name`.
    pub fn calls_named(&self, name: &str) -> Vec<Verb> {
        self.state()
            .calls
            .iter()
            .filter(|verb| verb.name() == name)
            .cloned()
            .collect()
    }

    /// Messages queued for the client.
    pub fn pending(&self) -> usize {
        self.state().inbox.len()
    }

    /// Number of data requests the host keeps delivering.
    pub fn periodic_requests(&self) -> usize {
        self.state().session.periodic.len()
    }

    /// Ids of the system events the client subscribed to.
    pub fn subscriptions(&self) -> Vec<String> {
        let state = self.state();
        let mut names: Vec<String> = state.session.subscriptions.values().cloned().collect();
        names.sort();
        names
    }

    // ── Control ──────────────────────────────────────────────────────────

    /// Make the next opens fail (or succeed again).
    pub fn refuse_open(&self, refuse: bool) {
        self.state().refuse_open = refuse;
    }

    /// Add an installed title and livery.
    pub fn add_livery(&self, object_type: SimObjectType, title: &str, livery: &str) {
        self.world()
            .liveries
            .entry(object_type)
            .or_default()
            .push(simconnect_models::SimObjectLivery {
                title: title.to_string(),
                livery: livery.to_string(),
            });
    }

    /// Add an airport.
    pub fn add_airport(&self, airport: AirportRecord) {
        self.world().airports.push(airport);
    }

    /// Set a variable of `object_id`. Unknown objects are ignored.
    pub fn set_variable(&self, object_id: SimObjectId, name: &str, value: impl Into<SimValue>) {
        if let Some(object) = self.world().object_mut(object_id) {
            object.set(name, value);
        }
    }

    /// Read a variable of `object_id`.
    pub fn variable(&self, object_id: SimObjectId, name: &str) -> Option<SimValue> {
        self.world().object(object_id).map(|object| object.get(name))
    }

    /// The host shuts down: queue QUIT.
    pub fn quit(&self) {
        info!(target: TARGET, "simulator quitting");
        let mut state = self.state();
        push(&mut state, &QuitMessage);
    }

    /// Fire system event `name` at every subscriber that has not paused it.
    /// Returns how many subscribers were notified.
    pub fn fire_system_event(&self, name: &str, data: u32) -> usize {
        let mut state = self.state();
        let targets = subscribers(&state.session, name);
        for event_id in &targets {
            push(
                &mut state,
                &EventMessage {
                    group_id: UNUSED,
                    event_id: *event_id,
                    data,
                },
            );
        }
        targets.len()
    }

    /// Advance the simulation one period: fire `Frame` and deliver every
    /// periodic data request that is due.
    pub fn tick(&self) {
        let mut state = self.state();
        let world = self.world();
        for event_id in subscribers(&state.session, "frame") {
            push(
                &mut state,
                &EventFrameMessage {
                    event: EventMessage {
                        group_id: UNUSED,
                        event_id,
                        data: 0,
                    },
                    frame_rate: 60.0,
                    sim_speed: 1.0,
                },
            );
        }

        let mut finished = Vec::new();
        let due: Vec<(RequestId, PeriodicRequest)> = state
            .session
            .periodic
            .iter_mut()
            .filter_map(|(request_id, periodic)| {
                periodic.ticks += 1;
                if periodic.ticks <= periodic.origin {
                    return None;
                }
                if (periodic.ticks - periodic.origin - 1) % (periodic.interval + 1) != 0 {
                    return None;
                }
                periodic.sent += 1;
                if periodic.limit != 0 && periodic.sent >= periodic.limit {
                    finished.push(*request_id);
                }
                Some((*request_id, periodic.clone()))
            })
            .collect();
        for request_id in finished {
            state.session.periodic.remove(&request_id);
        }
        for (request_id, periodic) in due {
            if let Some(message) = object_record(&world, &state.session, request_id, &periodic) {
                push(&mut state, &message);
            }
        }
    }

    /// Press the input `definition`: every enabled input group bound to it
    /// fires its press event, then its release event if it has one.
    /// Returns how many bindings fired.
    pub fn press(&self, definition: &str) -> usize {
        let mut state = self.state();
        let mut fired = Vec::new();
        for (group_id, group) in &state.session.input_groups {
            if !group.enabled {
                continue;
            }
            for binding in &group.bindings {
                if binding.definition.eq_ignore_ascii_case(definition) {
                    fired.push((*group_id, binding.clone()));
                }
            }
        }
        for (group_id, binding) in &fired {
            push(
                &mut state,
                &EventMessage {
                    group_id: *group_id,
                    event_id: binding.down_event_id,
                    data: binding.down_value,
                },
            );
            if binding.up_event_id != UNUSED {
                push(
                    &mut state,
                    &EventMessage {
                        group_id: *group_id,
                        event_id: binding.up_event_id,
                        data: binding.up_value,
                    },
                );
            }
        }
        fired.len()
    }

    // ── Verbs ────────────────────────────────────────────────────────────

    fn handle(&self, state: &mut HostState, verb: &Verb) {
        let send_id = state.send_id;
        match verb {
            Verb::SubscribeToSystemEvent { event_id, name } => {
                state.session.subscriptions.insert(*event_id, name.clone());
                state.session.paused.remove(event_id);
            }
            Verb::UnsubscribeFromSystemEvent { event_id } => {
                if state.session.subscriptions.remove(event_id).is_none() {
                    exception(state, ExceptionCode::UnrecognizedId, send_id, 1);
                }
                state.session.paused.remove(event_id);
            }
            Verb::SetSystemEventState { event_id, on } => {
                if *on {
                    state.session.paused.remove(event_id);
                } else {
                    state.session.paused.insert(*event_id);
                }
            }
            Verb::RequestSystemState { request_id, state: name } => {
                let reply = self.world().system_states.get(&name.to_lowercase()).cloned();
                match reply {
                    Some(reply) => push(
                        state,
                        &SystemStateMessage {
                            request_id: *request_id,
                            ..reply
                        },
                    ),
                    None => exception(state, ExceptionCode::NameUnrecognized, send_id, 2),
                }
            }

            Verb::MapClientEventToSimEvent { event_id, name } => {
                if state.session.mapped_events.contains_key(event_id) {
                    exception(state, ExceptionCode::EventIdDuplicate, send_id, 1);
                } else {
                    state.session.mapped_events.insert(*event_id, name.clone());
                }
            }
            Verb::TransmitClientEvent {
                event_id, data, ..
            } => {
                if !state.session.mapped_events.contains_key(event_id) {
                    exception(state, ExceptionCode::UnrecognizedId, send_id, 2);
                    return;
                }
                let groups: Vec<GroupId> = state
                    .session
                    .notification_groups
                    .iter()
                    .filter(|(_, events)| events.contains(event_id))
                    .map(|(group_id, _)| *group_id)
                    .collect();
                for group_id in groups {
                    push(
                        state,
                        &EventMessage {
                            group_id,
                            event_id: *event_id,
                            data: data[0],
                        },
                    );
                }
            }
            Verb::AddClientEventToNotificationGroup { group_id, event_id, .. } => {
                if !state.session.mapped_events.contains_key(event_id) {
                    exception(state, ExceptionCode::UnrecognizedId, send_id, 2);
                    return;
                }
                state
                    .session
                    .notification_groups
                    .entry(*group_id)
                    .or_default()
                    .insert(*event_id);
            }
            Verb::RemoveClientEvent { group_id, event_id } => {
                let removed = state
                    .session
                    .notification_groups
                    .get_mut(group_id)
                    .is_some_and(|events| events.remove(event_id));
                if !removed {
                    exception(state, ExceptionCode::UnrecognizedId, send_id, 2);
                }
            }
            Verb::SetNotificationGroupPriority { group_id, priority } => {
                state.session.group_priorities.insert(*group_id, *priority);
                state.session.notification_groups.entry(*group_id).or_default();
            }
            Verb::ClearNotificationGroup { group_id } => {
                if let Some(events) = state.session.notification_groups.get_mut(group_id) {
                    events.clear();
                }
            }
            Verb::RequestNotificationGroup { .. } => {}

            Verb::AddToDataDefinition {
                define_id,
                name,
                data_type,
                ..
            } => {
                if *data_type == DataType::Invalid {
                    exception(state, ExceptionCode::InvalidDataType, send_id, 4);
                    return;
                }
                state
                    .session
                    .data_definitions
                    .entry(*define_id)
                    .or_default()
                    .push(DataField {
                        name: name.to_uppercase(),
                        data_type: *data_type,
                    });
            }
            Verb::ClearDataDefinition { define_id } => {
                state.session.data_definitions.remove(define_id);
            }
            Verb::RequestDataOnSimObject {
                request_id,
                define_id,
                object_id,
                period,
                flags,
                origin,
                interval,
                limit,
            } => self.request_data(
                state,
                send_id,
                *request_id,
                PeriodicRequest {
                    define_id: *define_id,
                    object_id: *object_id,
                    flags: *flags,
                    origin: *origin,
                    interval: *interval,
                    limit: *limit,
                    ticks: 0,
                    sent: 0,
                },
                *period,
            ),
            Verb::RequestDataOnSimObjectType {
                request_id,
                define_id,
                object_type,
                ..
            } => self.request_data_by_type(state, send_id, *request_id, *define_id, *object_type),
            Verb::SetDataOnSimObject {
                define_id,
                object_id,
                data,
                ..
            } => self.set_data(state, send_id, *define_id, *object_id, data),

            Verb::AddToFacilityDefinition { define_id, field } => {
                state
                    .session
                    .facility_definitions
                    .entry(*define_id)
                    .or_default()
                    .push(field.to_uppercase());
            }
            Verb::RequestFacilityData {
                define_id,
                request_id,
                icao,
                region,
            } => self.facility_data(state, send_id, *define_id, *request_id, icao, region),
            Verb::RequestFacilitiesList {
                list_type,
                request_id,
                ..
            } => self.facilities_list(state, *list_type, *request_id),
            Verb::EnumerateSimObjectsAndLiveries {
                request_id,
                object_type,
            } => {
                let items = self.world().liveries_of(*object_type);
                self.send_list::<simconnect_models::SimObjectLivery>(state, *request_id, items);
            }

            Verb::AiCreateNonAtcAircraft {
                title,
                livery,
                tail_number,
                position,
                request_id,
            } => {
                let mut object = SimObject::new(SimObjectType::Aircraft, title.clone(), livery.clone());
                object.set("ATC ID", tail_number.clone());
                object.set("PLANE LATITUDE", position.latitude);
                object.set("PLANE LONGITUDE", position.longitude);
                object.set("PLANE ALTITUDE", position.altitude);
                self.create_object(state, send_id, *request_id, object);
            }
            Verb::AiCreateParkedAtcAircraft {
                title,
                livery,
                tail_number,
                airport,
                request_id,
            } => {
                let parked_at = self
                    .world()
                    .find_airports(airport, "")
                    .first()
                    .map(|record| record.facility.clone());
                let Some(parked_at) = parked_at else {
                    exception(state, ExceptionCode::CreateObjectFailed, send_id, 4);
                    return;
                };
                let mut object = SimObject::new(SimObjectType::Aircraft, title.clone(), livery.clone());
                object.set("ATC ID", tail_number.clone());
                object.set("PLANE LATITUDE", parked_at.latitude);
                object.set("PLANE LONGITUDE", parked_at.longitude);
                object.set("PLANE ALTITUDE", parked_at.altitude);
                self.create_object(state, send_id, *request_id, object);
            }
            Verb::AiRemoveObject { object_id, .. } => {
                let removed = if World::resolve(*object_id) == USER_OBJECT_ID {
                    None
                } else {
                    self.world().objects.remove(object_id)
                };
                match removed {
                    Some(object) => object_event(state, "objectremoved", *object_id, object.object_type),
                    None => exception(state, ExceptionCode::UnrecognizedId, send_id, 1),
                }
            }

            Verb::SetInputGroupPriority { group_id, priority } => {
                state.session.input_groups.entry(*group_id).or_default().priority = *priority;
            }
            Verb::SetInputGroupState { group_id, on } => {
                state.session.input_groups.entry(*group_id).or_default().enabled = *on;
            }
            Verb::MapInputEventToClientEvent {
                group_id,
                definition,
                down_event_id,
                down_value,
                up_event_id,
                up_value,
                ..
            } => {
                state
                    .session
                    .input_groups
                    .entry(*group_id)
                    .or_default()
                    .bindings
                    .push(InputBinding {
                        definition: definition.clone(),
                        down_event_id: *down_event_id,
                        down_value: *down_value,
                        up_event_id: *up_event_id,
                        up_value: *up_value,
                    });
            }
            Verb::RemoveInputEvent { group_id, definition } => {
                let removed = state.session.input_groups.get_mut(group_id).is_some_and(|group| {
                    let before = group.bindings.len();
                    group
                        .bindings
                        .retain(|binding| !binding.definition.eq_ignore_ascii_case(definition));
                    group.bindings.len() != before
                });
                if !removed {
                    exception(state, ExceptionCode::UnrecognizedId, send_id, 2);
                }
            }
            Verb::ClearInputGroup { group_id } => {
                if let Some(group) = state.session.input_groups.get_mut(group_id) {
                    group.bindings.clear();
                }
            }
        }
    }

    fn request_data(
        &self,
        state: &mut HostState,
        send_id: SendId,
        request_id: RequestId,
        request: PeriodicRequest,
        period: Period,
    ) {
        if period == Period::Never {
            state.session.periodic.remove(&request_id);
            return;
        }
        if !state.session.data_definitions.contains_key(&request.define_id) {
            exception(state, ExceptionCode::UnrecognizedId, send_id, 2);
            return;
        }
        let world = self.world();
        if world.object(request.object_id).is_none() {
            exception(state, ExceptionCode::UnrecognizedId, send_id, 3);
            return;
        }
        if period == Period::Once {
            if let Some(message) = object_record(&world, &state.session, request_id, &request) {
                push(state, &message);
            }
        } else {
            state.session.periodic.insert(request_id, request);
        }
    }

    fn request_data_by_type(
        &self,
        state: &mut HostState,
        send_id: SendId,
        request_id: RequestId,
        define_id: DataDefinitionId,
        object_type: SimObjectType,
    ) {
        let Some(fields) = state.session.data_definitions.get(&define_id).cloned() else {
            exception(state, ExceptionCode::UnrecognizedId, send_id, 2);
            return;
        };
        let world = self.world();
        let ids = world.objects_of(object_type);
        let out_of = count(ids.len());
        if ids.is_empty() {
            push(
                state,
                &SimObjectDataByTypeMessage {
                    data: SimObjectDataMessage {
                        request_id,
                        object_id: 0,
                        define_id,
                        out_of: 0,
                        ..SimObjectDataMessage::default()
                    },
                },
            );
            return;
        }
        for (entry, object_id) in ids.into_iter().enumerate() {
            let Some(object) = world.object(object_id) else {
                continue;
            };
            push(
                state,
                &SimObjectDataByTypeMessage {
                    data: SimObjectDataMessage {
                        request_id,
                        object_id,
                        define_id,
                        flags: 0,
                        entry_number: count(entry),
                        out_of,
                        define_count: count(fields.len()),
                        data: encode_fields(object, &fields),
                    },
                },
            );
        }
    }

    fn set_data(
        &self,
        state: &mut HostState,
        send_id: SendId,
        define_id: DataDefinitionId,
        object_id: SimObjectId,
        data: &[u8],
    ) {
        let Some(fields) = state.session.data_definitions.get(&define_id).cloned() else {
            exception(state, ExceptionCode::UnrecognizedId, send_id, 1);
            return;
        };
        let mut reader = DataBlockReader::new(data);
        let mut values = Vec::with_capacity(fields.len());
        for field in &fields {
            match SimValue::read(field.data_type, &mut reader) {
                Ok(value) => values.push((field.name.clone(), value)),
                Err(err) => {
                    debug!(target: TARGET, define_id, error = %err, "bad data block");
                    exception(state, ExceptionCode::DataError, send_id, 5);
                    return;
                }
            }
        }
        let mut world = self.world();
        let Some(object) = world.object_mut(object_id) else {
            exception(state, ExceptionCode::UnrecognizedId, send_id, 2);
            return;
        };
        for (name, value) in values {
            object.set(&name, value);
        }
    }

    fn facility_data(
        &self,
        state: &mut HostState,
        send_id: SendId,
        define_id: FacilityDefinitionId,
        request_id: RequestId,
        icao: &str,
        region: &str,
    ) {
        let Some(fields) = state.session.facility_definitions.get(&define_id).cloned() else {
            exception(state, ExceptionCode::UnrecognizedId, send_id, 1);
            return;
        };
        let matches: Vec<AirportRecord> = self
            .world()
            .find_airports(icao, region)
            .into_iter()
            .cloned()
            .collect();

        if matches.len() > 1 {
            let items = matches
                .iter()
                .map(|airport| FacilityMinimal {
                    icao: Icao {
                        kind: 'A',
                        ident: airport.facility.ident.clone(),
                        region: airport.facility.region.clone(),
                        airport: String::new(),
                    },
                    lat_lon_alt: LatLonAlt {
                        latitude: airport.facility.latitude,
                        longitude: airport.facility.longitude,
                        altitude: airport.facility.altitude,
                    },
                })
                .collect();
            push(
                state,
                &FacilityMinimalListMessage {
                    header: ListHeader {
                        request_id,
                        array_size: 0,
                        entry_number: 0,
                        out_of: 1,
                    },
                    items,
                },
            );
            return;
        }

        if let Some(airport) = matches.first() {
            let mut builder = DataBlockBuilder::new();
            for field in fields.iter().filter(|f| !f.starts_with("OPEN ") && !f.starts_with("CLOSE ")) {
                if !airport.write_field(field, &mut builder) {
                    builder.add_int32(0);
                }
            }
            state.next_facility_record += 1;
            let unique_request_id = state.next_facility_record;
            push(
                state,
                &FacilityDataMessage {
                    user_request_id: request_id,
                    unique_request_id,
                    parent_unique_request_id: 0,
                    data_type: FacilityDataType::Airport as u32,
                    is_list_item: 0,
                    item_index: 0,
                    list_size: 0,
                    data: builder.data().to_vec(),
                },
            );
        }
        push(state, &FacilityDataEndMessage { request_id });
    }

    fn facilities_list(&self, state: &mut HostState, list_type: FacilityListType, request_id: RequestId) {
        match list_type {
            FacilityListType::Airport => {
                let items = self
                    .world()
                    .airports
                    .iter()
                    .map(|airport| airport.facility.clone())
                    .collect();
                self.send_list::<simconnect_models::FacilityAirport>(state, request_id, items);
            }
            FacilityListType::Waypoint => {
                self.send_list::<simconnect_models::FacilityWaypoint>(state, request_id, Vec::new());
            }
            FacilityListType::Ndb => {
                self.send_list::<simconnect_models::FacilityNdb>(state, request_id, Vec::new());
            }
            FacilityListType::Vor => {
                self.send_list::<simconnect_models::FacilityVor>(state, request_id, Vec::new());
            }
        }
    }

    /// Queue `items` in batches. An empty result is one batch with
    /// `out_of == 0`.
    fn send_list<I: ListItem>(&self, state: &mut HostState, request_id: RequestId, items: Vec<I>) {
        if items.is_empty() {
            push(
                state,
                &ListMessage::<I> {
                    header: ListHeader {
                        request_id,
                        ..ListHeader::default()
                    },
                    items,
                },
            );
            return;
        }
        let mut batches: Vec<Vec<I>> = Vec::new();
        let mut items = items.into_iter().peekable();
        while items.peek().is_some() {
            batches.push(items.by_ref().take(self.batch_size).collect());
        }
        let out_of = count(batches.len());
        for (entry, batch) in batches.into_iter().enumerate() {
            push(
                state,
                &ListMessage::<I> {
                    header: ListHeader {
                        request_id,
                        array_size: count(batch.len()),
                        entry_number: count(entry),
                        out_of,
                    },
                    items: batch,
                },
            );
        }
    }

    fn create_object(&self, state: &mut HostState, send_id: SendId, request_id: RequestId, object: SimObject) {
        let installed = self.world().installed_kind(&object.title);
        let Some(kind) = installed else {
            debug!(target: TARGET, title = %object.title, "title not installed");
            exception(state, ExceptionCode::CreateObjectFailed, send_id, 1);
            return;
        };
        let object = SimObject {
            object_type: Some(kind),
            ..object
        };
        let object_id = self.world().spawn(object);
        debug!(target: TARGET, request_id, object_id, "object created");
        push(state, &AssignedObjectIdMessage { request_id, object_id });
        object_event(state, "objectadded", object_id, Some(kind));
    }
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

fn push<M: WireMessage>(state: &mut HostState, message: &M) {
    let bytes = RawMessage::from_message(message).as_bytes().to_vec();
    let kind = M::ID;
    trace!(target: TARGET, %kind, size = bytes.len(), "queued");
    state.inbox.push_back(bytes);
    if let NotifyMode::Event(notification) = &state.session.notify {
        notification.signal();
    }
}

fn exception(state: &mut HostState, code: ExceptionCode, send_id: SendId, index: u32) {
    debug!(target: TARGET, %code, send_id, index, "raising exception");
    push(
        state,
        &ExceptionMessage {
            exception: code as u32,
            send_id,
            index,
        },
    );
}

/// Active subscriptions to the system event `name`.
fn subscribers(session: &Session, name: &str) -> Vec<EventId> {
    let mut ids: Vec<EventId> = session
        .subscriptions
        .iter()
        .filter(|(id, subscribed)| subscribed.eq_ignore_ascii_case(name) && !session.paused.contains(id))
        .map(|(id, _)| *id)
        .collect();
    ids.sort_unstable();
    ids
}

fn object_event(state: &mut HostState, name: &str, object_id: SimObjectId, kind: Option<SimObjectType>) {
    for event_id in subscribers(&state.session, name) {
        push(
            state,
            &EventObjectAddRemoveMessage {
                event: EventMessage {
                    group_id: UNUSED,
                    event_id,
                    data: object_id,
                },
                object_type: kind.map_or(0, |kind| kind as u32),
            },
        );
    }
}

fn encode_fields(object: &SimObject, fields: &[DataField]) -> Vec<u8> {
    let mut builder = DataBlockBuilder::new();
    for field in fields {
        object.get(&field.name).write(field.data_type, &mut builder);
    }
    builder.data().to_vec()
}

fn object_record(
    world: &World,
    session: &Session,
    request_id: RequestId,
    request: &PeriodicRequest,
) -> Option<SimObjectDataMessage> {
    let fields = session.data_definitions.get(&request.define_id)?;
    let object = world.object(request.object_id)?;
    Some(SimObjectDataMessage {
        request_id,
        object_id: World::resolve(request.object_id),
        define_id: request.define_id,
        flags: request.flags,
        entry_number: 1,
        out_of: 1,
        define_count: count(fields.len()),
        data: encode_fields(object, fields),
    })
}

impl Transport for MockHost {
    fn open(&self, params: &OpenParams) -> HostResult<()> {
        let mut state = self.state();
        if state.refuse_open {
            debug!(target: TARGET, client = %params.client_name, "refusing connection");
            return Err(SdkError::transport("Open"));
        }
        if state.open {
            return Err(SdkError::Transport {
                hr: SdkError::E_FAIL,
                message: "a client is already connected".to_string(),
            });
        }
        state.open = true;
        state.opens += 1;
        state.inbox.clear();
        state.session = Session {
            client_name: params.client_name.clone(),
            notify: params.notify.clone(),
            ..Session::default()
        };
        info!(target: TARGET, client = %params.client_name, config_index = params.config_index, "client connected");
        push(
            &mut state,
            &OpenMessage {
                application_name: self.profile.application_name.clone(),
                application_version: self.profile.application_version,
                simconnect_version: self.profile.simconnect_version,
                reserved1: 0,
                reserved2: 0,
            },
        );
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state();
        if !state.open {
            return;
        }
        state.open = false;
        state.inbox.clear();
        let session = std::mem::take(&mut state.session);
        info!(target: TARGET, client = %session.client_name, "client disconnected");
    }

    fn next_message(&self) -> HostResult<Option<Vec<u8>>> {
        let mut state = self.state();
        if !state.open {
            return Err(SdkError::NotOpen);
        }
        Ok(state.inbox.pop_front())
    }

    fn send(&self, verb: &Verb) -> HostResult<SendId> {
        let mut state = self.state();
        if !state.open {
            return Err(SdkError::NotOpen);
        }
        state.send_id += 1;
        let send_id = state.send_id;
        state.calls.push(verb.clone());
        debug!(target: TARGET, verb = verb.name(), send_id, "received");
        self.handle(&mut state, verb);
        Ok(send_id)
    }
}

#[cfg(test)]
mod tests {
    use simconnect_models::SimObjectLiveryListMessage;

    use super::*;

    fn open(host: &MockHost) {
        host.open(&OpenParams {
            client_name: "unit".to_string(),
            notify: NotifyMode::None,
            config_index: 0,
        })
        .unwrap();
    }

    fn drain(host: &MockHost) -> Vec<RawMessage> {
        let mut out = Vec::new();
        while let Some(bytes) = host.next_message().unwrap() {
            out.push(RawMessage::new(bytes).unwrap());
        }
        out
    }

    #[test]
    fn open_queues_open_message() {
        let host = MockHost::new();
        open(&host);
        let messages = drain(&host);
        assert_eq!(messages.len(), 1);
        let open = messages[0].decode::<OpenMessage>().unwrap();
        assert_eq!(open.application_name, "Mock Simulator");
        assert_eq!(host.client_name().as_deref(), Some("unit"));
    }

    #[test]
    fn second_client_is_refused() {
        let host = MockHost::new();
        open(&host);
        let err = host
            .open(&OpenParams {
                client_name: "other".to_string(),
                notify: NotifyMode::None,
                config_index: 0,
            })
            .unwrap_err();
        assert!(matches!(err, SdkError::Transport { .. }));
        assert_eq!(host.open_count(), 1);
    }

    #[test]
    fn closed_host_rejects_calls() {
        let host = MockHost::new();
        assert!(matches!(host.next_message(), Err(SdkError::NotOpen)));
        assert!(matches!(
            host.send(&Verb::ClearInputGroup { group_id: 1 }),
            Err(SdkError::NotOpen)
        ));
    }

    #[test]
    fn unknown_state_raises_exception_with_send_id() {
        let host = MockHost::new();
        open(&host);
        drain(&host);
        let send_id = host
            .send(&Verb::RequestSystemState {
                request_id: 7,
                state: "UnknownState".to_string(),
            })
            .unwrap();
        let messages = drain(&host);
        let exception = messages[0].decode::<ExceptionMessage>().unwrap();
        assert_eq!(exception.code(), Some(ExceptionCode::NameUnrecognized));
        assert_eq!(exception.send_id, send_id);
    }

    #[test]
    fn lists_are_batched() {
        let world = World::default();
        let host = MockHost::with_world(world, HostProfile::default(), 2);
        open(&host);
        drain(&host);
        host.send(&Verb::EnumerateSimObjectsAndLiveries {
            request_id: 3,
            object_type: SimObjectType::Aircraft,
        })
        .unwrap();
        let batches: Vec<SimObjectLiveryListMessage> = drain(&host)
            .iter()
            .map(|raw| raw.decode().unwrap())
            .collect();
        assert_eq!(batches.len(), 3);
        assert!(batches.iter().all(|batch| batch.header.out_of == 3));
        assert!(batches[2].header.is_last());
        assert_eq!(batches[2].items.len(), 1);
    }

    #[test]
    fn empty_list_is_single_final_batch() {
        let host = MockHost::new();
        open(&host);
        drain(&host);
        host.send(&Verb::EnumerateSimObjectsAndLiveries {
            request_id: 4,
            object_type: SimObjectType::Boat,
        })
        .unwrap();
        let messages = drain(&host);
        assert_eq!(messages.len(), 1);
        let batch = messages[0].decode::<SimObjectLiveryListMessage>().unwrap();
        assert!(batch.items.is_empty());
        assert!(batch.header.is_last());
    }

    #[test]
    fn periodic_data_respects_interval_and_limit() {
        let host = MockHost::new();
        open(&host);
        host.send(&Verb::AddToDataDefinition {
            define_id: 1,
            name: "PLANE ALTITUDE".to_string(),
            unit: "feet".to_string(),
            data_type: DataType::Float64,
            epsilon: 0.0,
            datum_id: UNUSED,
        })
        .unwrap();
        host.send(&Verb::RequestDataOnSimObject {
            request_id: 9,
            define_id: 1,
            object_id: 0,
            period: Period::SimFrame,
            flags: 0,
            origin: 1,
            interval: 1,
            limit: 2,
        })
        .unwrap();
        drain(&host);
        let mut delivered = 0;
        for _ in 0..8 {
            host.tick();
            delivered += drain(&host).len();
        }
        assert_eq!(delivered, 2);
        assert_eq!(host.periodic_requests(), 0);
    }

    #[test]
    fn input_press_fires_enabled_groups_only() {
        let host = MockHost::new();
        open(&host);
        host.send(&Verb::MapInputEventToClientEvent {
            group_id: 5,
            definition: "Shift+B".to_string(),
            down_event_id: 40,
            down_value: 1,
            up_event_id: UNUSED,
            up_value: 0,
            maskable: false,
        })
        .unwrap();
        drain(&host);
        assert_eq!(host.press("shift+b"), 0);
        host.send(&Verb::SetInputGroupState { group_id: 5, on: true }).unwrap();
        assert_eq!(host.press("shift+b"), 1);
        let event = drain(&host)[0].decode::<EventMessage>().unwrap();
        assert_eq!((event.group_id, event.event_id, event.data), (5, 40, 1));
    }

    #[test]
    fn close_forgets_session() {
        let host = MockHost::new();
        open(&host);
        host.send(&Verb::SubscribeToSystemEvent {
            event_id: 1,
            name: "Pause".to_string(),
        })
        .unwrap();
        assert_eq!(host.subscriptions(), vec!["Pause".to_string()]);
        host.close();
        assert!(!host.is_open());
        assert!(host.subscriptions().is_empty());
        open(&host);
        assert_eq!(host.fire_system_event("Pause", 1), 0);
    }
}
