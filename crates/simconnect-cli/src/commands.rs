use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use mock_simconnect::MockHost;
use serde_json::{json, Value};
use simconnect_models::{ExceptionMessage, SimObjectType, SystemStateMessage};
use simconnect_sdk::events::SystemEvent;
use simconnect_sdk::handlers::{SimObjectEnumerationHandler, SystemStateHandler};
use simconnect_sdk::runloop::{EventWaitLoop, RunLoop};
use simconnect_sdk::{BackgroundManager, Connection, Dispatcher, IniFile, ManagerConfig, SimConnectConfig, State};
use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::{BackgroundArgs, ConfigArgs};

const CLIENT_NAME: &str = "simconnect-cli";

fn lock<T>(slot: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Open a session on a fresh mock host.
fn session() -> anyhow::Result<Dispatcher> {
    let host = MockHost::new();
    let connection = Connection::with_event(CLIENT_NAME, host);
    connection.open(0).context("opening the mock simulator")?;
    let dispatcher = Dispatcher::new(connection);
    dispatcher.register_typed(|exception: &ExceptionMessage| {
        warn!(code = ?exception.code(), send_id = exception.send_id, index = exception.index, "simulator rejected a call");
    });
    Ok(dispatcher)
}

pub fn system_state(name: &str, timeout: Duration) -> anyhow::Result<Value> {
    let dispatcher = session()?;
    let states = SystemStateHandler::new(&dispatcher);
    let reply = Arc::new(Mutex::new(None::<SystemStateMessage>));
    let sink = Arc::clone(&reply);
    let _request = states.request(name, move |message| *lock(&sink) = Some(message))?;

    let seen = Arc::clone(&reply);
    EventWaitLoop::new(dispatcher.clone()).dispatch_until_or_timeout(move || lock(&seen).is_some(), timeout);
    dispatcher.connection().close();

    let reply = lock(&reply).take().ok_or_else(|| anyhow!("no reply for system state '{name}'"))?;
    Ok(json!({
        "state": name,
        "integer": reply.integer,
        "float": reply.float,
        "string": reply.string,
    }))
}

pub fn events(filter: Option<&str>) -> Value {
    let filter = filter.map(str::to_lowercase);
    let names: Vec<&'static str> = SystemEvent::iter()
        .map(SystemEvent::name)
        .filter(|name| filter.as_ref().map_or(true, |filter| name.to_lowercase().contains(filter)))
        .collect();
    json!(names)
}

pub fn enumerate(object_type: SimObjectType, timeout: Duration) -> anyhow::Result<Value> {
    let dispatcher = session()?;
    let enumeration = SimObjectEnumerationHandler::new(&dispatcher);
    let result = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&result);
    let _request = enumeration.enumerate_all(object_type, move |map| *lock(&sink) = Some(map))?;

    let seen = Arc::clone(&result);
    EventWaitLoop::new(dispatcher.clone()).dispatch_until_or_timeout(move || lock(&seen).is_some(), timeout);
    dispatcher.connection().close();

    let map = lock(&result)
        .take()
        .ok_or_else(|| anyhow!("enumeration of {object_type} did not complete"))?;
    Ok(serde_json::to_value(map)?)
}

pub fn config(args: &ConfigArgs) -> anyhow::Result<Value> {
    let ini = IniFile::load(&args.path).with_context(|| format!("reading {}", args.path.display()))?;
    if let Some(index) = args.index {
        let config = SimConnectConfig::from_ini(&ini, index)?;
        return Ok(serde_json::to_value(config)?);
    }
    match (&args.section, &args.key) {
        (Some(section), Some(key)) => match ini.get(section, key) {
            Some(value) => Ok(json!(value)),
            None => bail!("no key '{key}' in section '{section}'"),
        },
        (Some(section), None) => {
            let section = ini
                .section(section)
                .ok_or_else(|| anyhow!("no section '{section}'"))?;
            Ok(serde_json::to_value(section)?)
        }
        _ => Ok(serde_json::to_value(ini.sections())?),
    }
}

pub fn background(args: &BackgroundArgs) -> anyhow::Result<Value> {
    let host = MockHost::new();
    let manager = BackgroundManager::new(
        host.clone(),
        ManagerConfig::from_env()
            .with_client_name(CLIENT_NAME)
            .with_auto_reconnect(args.quit)
            .with_reconnect_delay(Duration::from_millis(100)),
    );
    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    manager.on_state_change(move |state| lock(&sink).push(state));
    manager.on_error(|error| warn!(%error, "background manager error"));

    manager.start()?;
    manager.connect();
    if !manager.wait_for_state(State::Connected, Duration::from_secs(5)) {
        manager.stop();
        bail!("the background manager did not connect");
    }

    let total = Duration::from_secs(args.seconds);
    if args.quit {
        thread::sleep(total / 2);
        info!("making the simulator quit");
        host.quit();
        thread::sleep(total - total / 2);
    } else {
        thread::sleep(total);
    }
    manager.stop();

    let states: Vec<State> = lock(&states).clone();
    Ok(json!({
        "opens": host.open_count(),
        "states": states.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "final": manager.state().to_string(),
    }))
}
