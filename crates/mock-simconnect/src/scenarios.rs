//! End-to-end runs of the SDK handlers against the mock host.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use simconnect_models::{
    AirportData, DataFrequency, EventMessage, EventObjectAddRemoveMessage, ExceptionCode, ExceptionMessage,
    FacilityAirport, FacilityListScope, FacilityRecord, InitPosition, PeriodLimits, RawMessage, SimObjectType, SystemStateMessage,
};
use simconnect_sdk::events::SystemEvent;
use simconnect_sdk::handlers::{
    AiHandler, EventGroupHandler, EventHandler, FacilityCallbacks, FacilityDefinitionBuilder, FacilityHandler,
    FacilityScope, SimObjectDataHandler, SimObjectEnumerationHandler, SystemEventHandler, SystemStateHandler,
};
use simconnect_sdk::runloop::{PollingLoop, RunLoop};
use simconnect_sdk::{BackgroundManager, Connection, DataDefinition, Dispatcher, Event, ManagerConfig, State};

use crate::{AirportRecord, MockHost, FIRST_SPAWNED_ID, USER_OBJECT_ID};

const WAIT: Duration = Duration::from_secs(2);

fn session() -> (Arc<MockHost>, Dispatcher) {
    let host = MockHost::new();
    let connection = Connection::with_event("scenario", host.clone());
    connection.open(0).unwrap();
    let dispatcher = Dispatcher::new(connection);
    dispatcher.drain_pending();
    (host, dispatcher)
}

fn run(dispatcher: &Dispatcher) -> PollingLoop {
    PollingLoop::new(dispatcher.clone()).with_step(Duration::from_millis(5))
}

fn counter() -> (Arc<AtomicUsize>, impl Fn() -> usize + Clone) {
    let count = Arc::new(AtomicUsize::new(0));
    let read = Arc::clone(&count);
    (count, move || read.load(Ordering::SeqCst))
}

fn eventually(mut condition: impl FnMut() -> bool, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Position {
    latitude: f64,
    longitude: f64,
    altitude: f64,
    tail: String,
}

fn position_definition() -> Arc<DataDefinition<Position>> {
    Arc::new(
        DataDefinition::new()
            .add_float64("PLANE LATITUDE", "degrees", |p: &Position| p.latitude, |p, v| p.latitude = v)
            .add_float64("PLANE LONGITUDE", "degrees", |p: &Position| p.longitude, |p, v| p.longitude = v)
            .add_float64("PLANE ALTITUDE", "feet", |p: &Position| p.altitude, |p, v| p.altitude = v)
            .add_string("ATC ID", 32, |p: &Position| p.tail.clone(), |p, v| p.tail = v)
            .unwrap(),
    )
}

// ── System state ─────────────────────────────────────────────────────────

#[test]
fn aircraft_loaded_reply_reaches_callback_once() {
    let (_host, dispatcher) = session();
    let states = SystemStateHandler::new(&dispatcher);
    let paths = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&paths);

    let request = states
        .request_string("AircraftLoaded", move |path| sink.lock().unwrap().push(path))
        .unwrap();
    let seen = Arc::clone(&paths);
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || seen.lock().unwrap().len() == 1, WAIT));
    assert_eq!(
        paths.lock().unwrap().as_slice(),
        ["SimObjects\\Airplanes\\Mock Trainer\\aircraft.cfg".to_string()]
    );
    assert_eq!(states.pending(), 0);

    // A second reply with the same id is no longer correlated.
    let (defaults, default_count) = counter();
    dispatcher.set_default_handler(move |_| {
        defaults.fetch_add(1, Ordering::SeqCst);
    });
    dispatcher.dispatch(&RawMessage::from_message(&SystemStateMessage {
        request_id: request.id(),
        ..SystemStateMessage::default()
    }));
    assert_eq!(default_count(), 1);
    assert_eq!(paths.lock().unwrap().len(), 1);
}

#[test]
fn unknown_state_raises_exception_without_callback() {
    let (host, dispatcher) = session();
    let states = SystemStateHandler::new(&dispatcher);
    let (replies, reply_count) = counter();
    let exceptions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&exceptions);
    dispatcher.register_typed(move |exception: &ExceptionMessage| sink.lock().unwrap().push(*exception));

    let _request = states
        .request("UnknownState", move |_| {
            replies.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let send_id = dispatcher.connection().last_send_id();
    let seen = Arc::clone(&exceptions);
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || !seen.lock().unwrap().is_empty(), WAIT));

    let exceptions = exceptions.lock().unwrap();
    assert_eq!(exceptions.len(), 1);
    assert_eq!(exceptions[0].code(), Some(ExceptionCode::NameUnrecognized));
    assert_eq!(exceptions[0].send_id, send_id);
    assert_eq!(reply_count(), 0);
    assert_eq!(host.calls_named("RequestSystemState").len(), 1);
}

#[test]
fn sim_state_as_bool() {
    let (_host, dispatcher) = session();
    let states = SystemStateHandler::new(&dispatcher);
    let running = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&running);
    let _request = states
        .request_bool("Sim", move |on| *sink.lock().unwrap() = Some(on))
        .unwrap();
    let seen = Arc::clone(&running);
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || seen.lock().unwrap().is_some(), WAIT));
    assert_eq!(*running.lock().unwrap(), Some(true));
}

// ── Background manager ───────────────────────────────────────────────────

#[test]
fn background_manager_lifecycle() {
    let host = MockHost::new();
    let manager = BackgroundManager::new(
        host.clone(),
        ManagerConfig::new("background").with_message_check_interval(Duration::from_millis(10)),
    );

    manager.start().unwrap();
    assert!(manager.wait_for_state(State::Started, Duration::from_millis(500)));
    assert!(!host.is_open());

    manager.connect();
    assert!(manager.wait_for_state(State::Connected, WAIT));
    assert!(host.is_open());
    assert_eq!(host.client_name().as_deref(), Some("background"));

    manager.stop();
    assert!(manager.wait_for_state(State::Stopped, Duration::from_millis(500)));
    assert!(!host.is_open());

    manager.start().unwrap();
    assert!(manager.wait_for_state(State::Started, Duration::from_millis(500)));
    manager.stop();
    manager.stop();
    assert_eq!(manager.state(), State::Stopped);
}

#[test]
fn background_manager_reconnects_after_quit() {
    let host = MockHost::new();
    let manager = BackgroundManager::new(
        host.clone(),
        ManagerConfig::new("reconnecting")
            .with_auto_reconnect(true)
            .with_reconnect_delay(Duration::from_millis(10))
            .with_message_check_interval(Duration::from_millis(10)),
    );
    manager.start().unwrap();
    manager.connect();
    assert!(manager.wait_for_state(State::Connected, WAIT));

    host.quit();
    assert!(eventually(|| host.open_count() == 2 && manager.is_connected(), WAIT));
    manager.stop();
}

#[test]
fn background_manager_serves_requests() {
    let host = MockHost::new();
    let manager = BackgroundManager::new(
        host.clone(),
        ManagerConfig::new("states").with_message_check_interval(Duration::from_millis(10)),
    );
    let states = SystemStateHandler::new(manager.dispatcher());
    manager.start().unwrap();
    manager.connect();
    assert!(manager.wait_for_state(State::Connected, WAIT));

    let flight = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&flight);
    let _request = states
        .request_string("FlightLoaded", move |name| *sink.lock().unwrap() = Some(name))
        .unwrap();
    assert!(eventually(|| flight.lock().unwrap().is_some(), WAIT));
    assert_eq!(flight.lock().unwrap().as_deref(), Some("flights\\mock\\Schiphol.FLT"));
    manager.stop();
}

// ── Facilities ───────────────────────────────────────────────────────────

fn airport_definition(facilities: &FacilityHandler) -> u32 {
    facilities
        .build_definition(
            &FacilityDefinitionBuilder::new()
                .open(FacilityScope::Airport)
                .all_fields::<AirportData>()
                .close(),
        )
        .unwrap()
}

#[test]
fn facility_data_then_end() {
    let (host, dispatcher) = session();
    let facilities = FacilityHandler::new(&dispatcher);
    let define_id = airport_definition(&facilities);
    assert_eq!(
        host.calls_named("AddToFacilityDefinition").len(),
        AirportData::FIELDS.len() + 2
    );

    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    let (ended, end_count) = counter();
    let _request = facilities
        .request_facility_data(
            define_id,
            "EGLL",
            "",
            FacilityCallbacks::new()
                .on_data(move |message| {
                    let airport = message.record::<AirportData>().unwrap().unwrap();
                    sink.lock().unwrap().push(airport);
                })
                .on_end(move || {
                    ended.fetch_add(1, Ordering::SeqCst);
                }),
        )
        .unwrap();
    let done = end_count.clone();
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || done() == 1, WAIT));
    let records = records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].icao, "EGLL");
    assert_eq!(records[0].name64, "London Heathrow");
    assert!(!records[0].is_closed);
    assert!((records[0].latitude - 51.4775).abs() < 1e-9);
    assert_eq!(records[0].counts.runways, 0);
}

#[test]
fn ambiguous_facility_reports_conflict() {
    let (host, dispatcher) = session();
    host.add_airport(AirportRecord::new("EGLL", "XX", "Elsewhere", 10.0, 10.0, 0.0));
    let facilities = FacilityHandler::new(&dispatcher);
    let define_id = airport_definition(&facilities);

    let candidates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&candidates);
    let _request = facilities
        .request_facility_data(
            define_id,
            "EGLL",
            "",
            FacilityCallbacks::new().on_conflict(move |list| {
                sink.lock()
                    .unwrap()
                    .extend(list.items.iter().map(|item| item.icao.region.clone()));
            }),
        )
        .unwrap();
    let seen = Arc::clone(&candidates);
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || !seen.lock().unwrap().is_empty(), WAIT));
    assert_eq!(candidates.lock().unwrap().as_slice(), ["EG".to_string(), "XX".to_string()]);
}

#[test]
fn unknown_facility_only_ends() {
    let (_host, dispatcher) = session();
    let facilities = FacilityHandler::new(&dispatcher);
    let define_id = airport_definition(&facilities);
    let (data, data_count) = counter();
    let (ended, end_count) = counter();
    let _request = facilities
        .request_facility_data(
            define_id,
            "ZZZZ",
            "",
            FacilityCallbacks::new()
                .on_data(move |_| {
                    data.fetch_add(1, Ordering::SeqCst);
                })
                .on_end(move || {
                    ended.fetch_add(1, Ordering::SeqCst);
                }),
        )
        .unwrap();
    let done = end_count.clone();
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || done() == 1, WAIT));
    assert_eq!(data_count(), 0);
}

#[test]
fn airport_list_arrives_in_batches() {
    let (_host, dispatcher) = session();
    let facilities = FacilityHandler::new(&dispatcher);
    let airports = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&airports);
    let (done, done_count) = counter();
    let _request = facilities
        .request_facilities_list::<FacilityAirport>(
            FacilityListScope::All,
            move |batch| {
                sink.lock()
                    .unwrap()
                    .extend(batch.iter().map(|airport| airport.ident.clone()));
            },
            move || {
                done.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();
    let finished = done_count.clone();
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || finished() == 1, WAIT));
    assert_eq!(airports.lock().unwrap().len(), 4);
}

// ── Enumeration and AI ───────────────────────────────────────────────────

#[test]
fn enumerate_all_aircraft() {
    let (_host, dispatcher) = session();
    let enumeration = SimObjectEnumerationHandler::new(&dispatcher);
    let result = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&result);
    let _request = enumeration
        .enumerate_all(SimObjectType::Aircraft, move |map| *sink.lock().unwrap() = Some(map))
        .unwrap();
    let seen = Arc::clone(&result);
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || seen.lock().unwrap().is_some(), WAIT));

    let map = result.lock().unwrap().take().unwrap();
    assert_eq!(map.len(), 3);
    assert_eq!(map["Mock Trainer"].len(), 2);
    assert!(map["Mock Jet"].contains("Night"));
}

#[test]
fn enumerate_empty_kind_still_completes() {
    let (_host, dispatcher) = session();
    let enumeration = SimObjectEnumerationHandler::new(&dispatcher);
    let result = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&result);
    let _request = enumeration
        .enumerate_all(SimObjectType::Boat, move |map| *sink.lock().unwrap() = Some(map))
        .unwrap();
    let seen = Arc::clone(&result);
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || seen.lock().unwrap().is_some(), WAIT));
    assert!(result.lock().unwrap().as_ref().unwrap().is_empty());
}

#[test]
fn ai_aircraft_is_created_and_announced() {
    let (host, dispatcher) = session();
    let ai = AiHandler::new(&dispatcher);
    let system_events = SystemEventHandler::new(&dispatcher);

    let added = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&added);
    let _subscription = system_events
        .subscribe(SystemEvent::ObjectAdded, move |message: &EventObjectAddRemoveMessage| {
            sink.lock()
                .unwrap()
                .push((message.event.data, message.simobject_type()));
        })
        .unwrap();

    let assigned = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&assigned);
    let _request = ai
        .create_non_atc_aircraft(
            "Mock Jet",
            "Night",
            "PH-AI1",
            &InitPosition::in_air_at(52.0, 4.5, 3000.0, 200),
            move |object_id| *slot.lock().unwrap() = Some(object_id),
        )
        .unwrap();
    let seen = Arc::clone(&added);
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || !seen.lock().unwrap().is_empty(), WAIT));

    assert_eq!(*assigned.lock().unwrap(), Some(FIRST_SPAWNED_ID));
    assert_eq!(
        added.lock().unwrap().as_slice(),
        [(FIRST_SPAWNED_ID, Some(SimObjectType::Aircraft))]
    );
    assert_eq!(ai.pending(), 0);
    assert_eq!(
        host.variable(FIRST_SPAWNED_ID, "ATC ID").map(|value| value.as_text()),
        Some("PH-AI1".to_string())
    );

    ai.remove_object(FIRST_SPAWNED_ID).unwrap();
    assert!(host.variable(FIRST_SPAWNED_ID, "ATC ID").is_none());
}

#[test]
fn unknown_title_is_not_created() {
    let (_host, dispatcher) = session();
    let ai = AiHandler::new(&dispatcher);
    let exceptions = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&exceptions);
    dispatcher.register_typed(move |exception: &ExceptionMessage| sink.lock().unwrap().push(exception.code()));

    let _request = ai
        .create_parked_atc_aircraft("Not Installed", "", "N1", "KJFK", |_| panic!("no object expected"))
        .unwrap();
    let seen = Arc::clone(&exceptions);
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || !seen.lock().unwrap().is_empty(), WAIT));
    assert_eq!(exceptions.lock().unwrap().as_slice(), [Some(ExceptionCode::CreateObjectFailed)]);
    assert_eq!(ai.pending(), 1);
}

// ── SimObject data ───────────────────────────────────────────────────────

#[test]
fn user_aircraft_data_once() {
    let (_host, dispatcher) = session();
    let data = SimObjectDataHandler::new(&dispatcher);
    let received = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&received);
    let _request = data
        .request_data_once(position_definition(), USER_OBJECT_ID, move |position| {
            *sink.lock().unwrap() = Some(position);
        })
        .unwrap();
    let seen = Arc::clone(&received);
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || seen.lock().unwrap().is_some(), WAIT));

    let position = received.lock().unwrap().take().unwrap();
    assert!((position.latitude - 52.3086).abs() < 1e-9);
    assert!((position.altitude - 2500.0).abs() < 1e-9);
    assert_eq!(position.tail, "PH-MCK");
}

#[test]
fn periodic_data_stops_when_request_dropped() {
    let (host, dispatcher) = session();
    let data = SimObjectDataHandler::new(&dispatcher);
    let (received, received_count) = counter();
    let request = data
        .request_data(
            position_definition(),
            USER_OBJECT_ID,
            DataFrequency::every(0).sim_frames(),
            PeriodLimits::none(),
            move |_| {
                received.fetch_add(1, Ordering::SeqCst);
            },
        )
        .unwrap();
    assert_eq!(host.periodic_requests(), 1);

    for _ in 0..3 {
        host.tick();
    }
    let seen = received_count.clone();
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || seen() == 3, WAIT));

    drop(request);
    assert_eq!(host.periodic_requests(), 0);
    host.tick();
    run(&dispatcher).dispatch();
    assert_eq!(received_count(), 3);
}

#[test]
fn set_data_updates_the_world() {
    let (host, dispatcher) = session();
    let data = SimObjectDataHandler::new(&dispatcher);
    let position = Position {
        latitude: 40.6413,
        longitude: -73.7781,
        altitude: 13.0,
        tail: "N123MK".to_string(),
    };
    data.set_data(&position_definition(), USER_OBJECT_ID, &position).unwrap();
    assert_eq!(
        host.variable(USER_OBJECT_ID, "PLANE LONGITUDE").map(|value| value.as_f64()),
        Some(-73.7781)
    );
    assert_eq!(
        host.variable(USER_OBJECT_ID, "ATC ID").map(|value| value.as_text()),
        Some("N123MK".to_string())
    );
}

#[test]
fn data_by_type_visits_every_object() {
    let (host, dispatcher) = session();
    let ai = AiHandler::new(&dispatcher);
    let _created = ai
        .create_non_atc_aircraft("Mock Airliner", "House", "PH-BIG", &InitPosition::on_ground_at(52.0, 4.0, 0.0), |_| {})
        .unwrap();
    run(&dispatcher).dispatch();

    let data = SimObjectDataHandler::new(&dispatcher);
    let tails = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&tails);
    let (done, done_count) = counter();
    let _request = data
        .request_data_by_type(
            position_definition(),
            SimObjectType::Aircraft,
            10_000,
            move |object_id, position| sink.lock().unwrap().push((object_id, position.tail)),
            Some(Box::new(move || {
                done.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .unwrap();
    let finished = done_count.clone();
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || finished() == 1, WAIT));
    assert_eq!(
        tails.lock().unwrap().as_slice(),
        [
            (USER_OBJECT_ID, "PH-MCK".to_string()),
            (FIRST_SPAWNED_ID, "PH-BIG".to_string())
        ]
    );
    assert_eq!(host.calls_named("RequestDataOnSimObjectType").len(), 1);
}

// ── Client events ────────────────────────────────────────────────────────

#[test]
fn notification_group_echoes_transmitted_event() {
    let (host, dispatcher) = session();
    let events = EventHandler::new(&dispatcher);
    let groups = EventGroupHandler::new(&dispatcher);
    let event = Event::get("Mock.ToggleBeacon");

    let group = events
        .notification_group()
        .with_highest_priority()
        .unwrap()
        .add_event(&event)
        .unwrap();
    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    groups.register_group_handler(
        group.id(),
        move |message: &EventMessage| sink.lock().unwrap().push((message.event_id, message.data)),
        false,
    );

    group.send_event(&event, 7).unwrap();
    let seen = Arc::clone(&received);
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || !seen.lock().unwrap().is_empty(), WAIT));
    assert_eq!(received.lock().unwrap().as_slice(), [(event.id(), 7)]);
    assert_eq!(host.calls_named("MapClientEventToSimEvent").len(), 1);
}

#[test]
fn input_group_fires_on_press() {
    let (host, dispatcher) = session();
    let events = EventHandler::new(&dispatcher);
    let groups = EventGroupHandler::new(&dispatcher);
    let brakes = Event::get("Mock.Brakes");

    let input = events
        .input_group()
        .with_highest_priority()
        .add_event(&brakes, "Shift+B")
        .unwrap()
        .enable()
        .unwrap();
    let (pressed, press_count) = counter();
    groups.register_group_handler(
        input.id(),
        move |_: &EventMessage| {
            pressed.fetch_add(1, Ordering::SeqCst);
        },
        false,
    );

    assert_eq!(host.press("shift+b"), 1);
    let seen = press_count.clone();
    assert!(run(&dispatcher).dispatch_until_or_timeout(move || seen() == 1, WAIT));

    let input = input.disable().unwrap();
    assert_eq!(host.press("shift+b"), 0);
    assert!(!input.is_enabled());
}

#[test]
fn paused_system_event_is_not_delivered() {
    let (host, dispatcher) = session();
    let system_events = SystemEventHandler::new(&dispatcher);
    let (pauses, pause_count) = counter();
    let subscription = system_events
        .subscribe(SystemEvent::Pause, move |_: &EventMessage| {
            pauses.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    assert_eq!(host.fire_system_event("Pause", 1), 1);
    run(&dispatcher).dispatch();
    assert_eq!(pause_count(), 1);

    system_events.set_state(SystemEvent::Pause, false).unwrap();
    assert_eq!(host.fire_system_event("Pause", 0), 0);

    drop(subscription);
    assert!(host.subscriptions().is_empty());
    assert!(!system_events.is_subscribed(SystemEvent::Pause));
}
