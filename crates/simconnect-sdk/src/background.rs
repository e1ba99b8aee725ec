//! A connection driven from its own worker thread.
//!
//! ```text
//! Stopped --start--> Starting --> Started --connect--> Connecting --> Connected
//!                       |            ^                     |              |
//!                       v            +------- failure -----+              |
//!                     Failed         +------ quit / disconnect -----------+
//!
//! any running state --stop--> Stopping --joined--> Stopped
//! ```
//!
//! The worker is the only thread that dispatches. Application code may
//! still send host calls from any thread through [`BackgroundManager::dispatcher`].

use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ManagerConfig;
use crate::connection::Connection;
use crate::dispatch::Dispatcher;
use crate::error::{HostResult, SdkError};
use crate::runloop::{EventWaitLoop, RunLoop};
use crate::transport::Transport;

const TARGET: &str = "simconnect::background";

/// Lifecycle state of a [`BackgroundManager`].
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display,
)]
pub enum State {
    /// No worker thread.
    #[default]
    Stopped,
    /// Worker thread spawned, not yet running.
    Starting,
    /// Worker running, not connected.
    Started,
    /// Opening the connection.
    Connecting,
    /// Connected and dispatching.
    Connected,
    /// Stop requested, waiting for the worker to finish.
    Stopping,
    /// The worker could not be spawned or gave up reconnecting.
    Failed,
}

type StateHook = Arc<dyn Fn(State) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&SdkError) + Send + Sync>;

#[derive(Debug, Default)]
struct Control {
    state: State,
    run: bool,
    connect: bool,
    disconnect: bool,
}

struct Shared {
    config: ManagerConfig,
    dispatcher: Dispatcher,
    control: Mutex<Control>,
    changed: Condvar,
    state_hooks: Mutex<Vec<StateHook>>,
    error_hooks: Mutex<Vec<ErrorHook>>,
}

impl Shared {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn connection(&self) -> &Connection {
        self.dispatcher.connection()
    }

    fn wake_worker(&self) {
        self.changed.notify_all();
        if let Some(notification) = self.connection().notification() {
            notification.signal();
        }
    }

    fn publish(&self, state: State) {
        info!(target: TARGET, client = %self.config.client_name, %state, "state changed");
        let hooks = self
            .state_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks {
            hook(state);
        }
    }

    fn set_state(&self, state: State) {
        {
            let mut control = self.control();
            if control.state == state {
                return;
            }
            control.state = state;
        }
        self.changed.notify_all();
        self.publish(state);
    }

    /// Set `state` unless a stop is under way. Returns `false` when the
    /// worker should exit.
    fn transition(&self, state: State) -> bool {
        {
            let mut control = self.control();
            if !control.run {
                return false;
            }
            control.state = state;
        }
        self.changed.notify_all();
        self.publish(state);
        true
    }

    fn report(&self, err: &SdkError) {
        let hooks = self
            .error_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for hook in hooks {
            hook(err);
        }
    }

    fn leave_requested(&self) -> bool {
        let control = self.control();
        !control.run || control.disconnect
    }

    /// Block until a connect is requested. Returns `false` on stop.
    fn wait_for_connect(&self) -> bool {
        let guard = self.control();
        let mut control = self
            .changed
            .wait_while(guard, |c| c.run && !c.connect)
            .unwrap_or_else(PoisonError::into_inner);
        if !control.run {
            return false;
        }
        control.connect = false;
        control.disconnect = false;
        true
    }

    /// Sleep the reconnect delay, then queue a connect unless the
    /// application disconnected meanwhile. Returns `false` on stop.
    fn back_off(&self) -> bool {
        let delay = self.config.reconnect_delay;
        debug!(target: TARGET, delay_ms = delay.as_millis(), "waiting before reconnect");
        let guard = self.control();
        let (mut control, _) = self
            .changed
            .wait_timeout_while(guard, delay, |c| c.run && !c.connect && !c.disconnect)
            .unwrap_or_else(PoisonError::into_inner);
        if !control.run {
            return false;
        }
        if !control.disconnect {
            control.connect = true;
        }
        true
    }

    /// Dispatch until the connection closes or the application asks to
    /// leave. Returns `true` when the host ended the session.
    fn pump(&self) -> bool {
        let run = EventWaitLoop::new(self.dispatcher.clone())
            .with_wait_slice(self.config.message_check_interval);
        run.dispatch_until(|| self.leave_requested());
        !self.leave_requested()
    }
}

fn run_worker(shared: &Shared) {
    if !shared.transition(State::Started) {
        return;
    }
    let mut failures = 0_u32;
    while shared.wait_for_connect() {
        if !shared.transition(State::Connecting) {
            break;
        }
        match shared.connection().open(shared.config.config_index) {
            Ok(()) => {
                failures = 0;
                if !shared.transition(State::Connected) {
                    break;
                }
                let lost = shared.pump();
                shared.connection().close();
                if lost {
                    info!(target: TARGET, client = %shared.config.client_name, "host ended the session");
                }
                if !shared.transition(State::Started) {
                    break;
                }
                if lost && shared.config.auto_reconnect && !shared.back_off() {
                    break;
                }
            }
            Err(err) => {
                failures += 1;
                warn!(target: TARGET, error = %err, attempt = failures, "connect failed");
                shared.report(&err);
                if !shared.transition(State::Started) {
                    break;
                }
                if !shared.config.auto_reconnect {
                    continue;
                }
                let limit = shared.config.max_reconnect_attempts;
                if limit != 0 && failures >= limit {
                    error!(target: TARGET, fatal = true, attempts = failures, "giving up reconnecting");
                    shared.report(&SdkError::FailedAssertion(format!(
                        "no connection after {failures} attempts"
                    )));
                    shared.set_state(State::Failed);
                    break;
                }
                if !shared.back_off() {
                    break;
                }
            }
        }
    }
    debug!(target: TARGET, "worker finished");
}

/// Owns a connection and the thread that dispatches its messages.
pub struct BackgroundManager {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for BackgroundManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundManager")
            .field("client_name", &self.shared.config.client_name)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl BackgroundManager {
    /// A stopped manager for an event-driven connection over `transport`.
    pub fn new(transport: Arc<dyn Transport>, config: ManagerConfig) -> Self {
        let connection = Connection::with_event(config.client_name.clone(), transport);
        Self {
            shared: Arc::new(Shared {
                dispatcher: Dispatcher::new(connection),
                config,
                control: Mutex::new(Control::default()),
                changed: Condvar::new(),
                state_hooks: Mutex::new(Vec::new()),
                error_hooks: Mutex::new(Vec::new()),
            }),
            worker: Mutex::new(None),
        }
    }

    /// The settings this manager runs with.
    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    /// The dispatcher the worker drives. Handlers built on it receive
    /// their callbacks on the worker thread.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.shared.dispatcher
    }

    /// The managed connection.
    pub fn connection(&self) -> &Connection {
        self.shared.connection()
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.shared.control().state
    }

    /// True while connected.
    pub fn is_connected(&self) -> bool {
        self.state() == State::Connected
    }

    /// Wait until the state is `state`. Returns `false` on timeout.
    pub fn wait_for_state(&self, state: State, timeout: Duration) -> bool {
        let guard = self.shared.control();
        let (control, _) = self
            .shared
            .changed
            .wait_timeout_while(guard, timeout, |c| c.state != state)
            .unwrap_or_else(PoisonError::into_inner);
        control.state == state
    }

    /// Call `hook` on every state change. Hooks run on the thread making
    /// the change.
    pub fn on_state_change(&self, hook: impl Fn(State) + Send + Sync + 'static) {
        self.shared
            .state_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    /// Call `hook` with every error the worker runs into.
    pub fn on_error(&self, hook: impl Fn(&SdkError) + Send + Sync + 'static) {
        self.shared
            .error_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    /// Spawn the worker. Starting a running manager does nothing.
    ///
    /// # Errors
    ///
    /// [`SdkError::Io`] if the thread cannot be spawned; the state is then
    /// [`State::Failed`].
    pub fn start(&self) -> HostResult<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = worker.take() {
            if !handle.is_finished() {
                *worker = Some(handle);
                return Ok(());
            }
            if handle.join().is_err() {
                warn!(target: TARGET, "previous worker panicked");
            }
        }

        {
            let mut control = self.shared.control();
            *control = Control {
                state: State::Starting,
                run: true,
                ..Control::default()
            };
        }
        self.shared.changed.notify_all();
        self.shared.publish(State::Starting);

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name(format!("simconnect-{}", self.shared.config.client_name))
            .spawn(move || run_worker(&shared));
        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                Ok(())
            }
            Err(err) => Err(self.spawn_failed(err)),
        }
    }

    fn spawn_failed(&self, err: std::io::Error) -> SdkError {
        error!(target: TARGET, fatal = true, error = %err, "cannot spawn worker thread");
        self.shared.control().run = false;
        self.shared.set_state(State::Failed);
        let err = SdkError::Io(err);
        self.shared.report(&err);
        err
    }

    /// Ask the worker to open the connection.
    pub fn connect(&self) {
        {
            let mut control = self.shared.control();
            if !control.run {
                warn!(target: TARGET, state = %control.state, "connect ignored, manager not running");
                return;
            }
            control.connect = true;
            control.disconnect = false;
        }
        self.shared.changed.notify_all();
    }

    /// Ask the worker to close the connection. No reconnect follows until
    /// the next [`connect`](Self::connect).
    pub fn disconnect(&self) {
        {
            let mut control = self.shared.control();
            control.disconnect = true;
            control.connect = false;
        }
        self.shared.wake_worker();
    }

    /// Stop the worker, wait for it, and close the connection. Stopping a
    /// stopped manager does nothing.
    pub fn stop(&self) {
        let Some(handle) = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            self.shared.set_state(State::Stopped);
            return;
        };
        {
            let mut control = self.shared.control();
            control.run = false;
            control.state = State::Stopping;
        }
        self.shared.wake_worker();
        self.shared.publish(State::Stopping);

        if handle.thread().id() == thread::current().id() {
            warn!(target: TARGET, "stop called from the worker thread, not joining");
        } else if handle.join().is_err() {
            warn!(target: TARGET, "worker panicked");
        }
        self.shared.connection().close();
        self.shared.set_state(State::Stopped);
    }
}

impl Drop for BackgroundManager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use simconnect_models::QuitMessage;

    use super::*;
    use crate::testing::ScriptedTransport;

    const WAIT: Duration = Duration::from_millis(500);

    fn manager(config: ManagerConfig) -> (Arc<ScriptedTransport>, BackgroundManager) {
        let transport = ScriptedTransport::new();
        let manager = BackgroundManager::new(transport.clone(), config.with_message_check_interval(Duration::from_millis(5)));
        (transport, manager)
    }

    fn eventually(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        false
    }

    #[test]
    fn start_connect_stop_restart() {
        let (transport, manager) = manager(ManagerConfig::new("lifecycle"));
        assert_eq!(manager.state(), State::Stopped);

        manager.start().unwrap();
        assert!(manager.wait_for_state(State::Started, WAIT));
        manager.connect();
        assert!(manager.wait_for_state(State::Connected, WAIT));
        assert!(manager.connection().is_open());
        assert_eq!(transport.open_count(), 1);

        let begun = Instant::now();
        manager.stop();
        assert!(begun.elapsed() < WAIT);
        assert_eq!(manager.state(), State::Stopped);
        assert!(!manager.connection().is_open());

        manager.stop();
        assert_eq!(manager.state(), State::Stopped);

        manager.start().unwrap();
        assert!(manager.wait_for_state(State::Started, WAIT));
        manager.stop();
        assert_eq!(manager.state(), State::Stopped);
    }

    #[test]
    fn state_changes_are_published() {
        let (_transport, manager) = manager(ManagerConfig::new("hooks"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        manager.on_state_change(move |state| sink.lock().unwrap().push(state));

        manager.start().unwrap();
        assert!(manager.wait_for_state(State::Started, WAIT));
        manager.connect();
        assert!(manager.wait_for_state(State::Connected, WAIT));
        manager.stop();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                State::Starting,
                State::Started,
                State::Connecting,
                State::Connected,
                State::Stopping,
                State::Stopped,
            ]
        );
    }

    #[test]
    fn quit_returns_to_started() {
        let (transport, manager) = manager(ManagerConfig::new("quit"));
        manager.start().unwrap();
        assert!(manager.wait_for_state(State::Started, WAIT));
        manager.connect();
        assert!(manager.wait_for_state(State::Connected, WAIT));

        transport.push(&QuitMessage);
        assert!(eventually(|| !manager.connection().is_open()));
        assert!(manager.wait_for_state(State::Started, WAIT));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(transport.open_count(), 1);
        manager.stop();
    }

    #[test]
    fn quit_reconnects_when_enabled() {
        let config = ManagerConfig::new("reconnect")
            .with_auto_reconnect(true)
            .with_reconnect_delay(Duration::from_millis(10));
        let (transport, manager) = manager(config);
        manager.start().unwrap();
        assert!(manager.wait_for_state(State::Started, WAIT));
        manager.connect();
        assert!(manager.wait_for_state(State::Connected, WAIT));

        transport.push(&QuitMessage);
        assert!(eventually(|| transport.open_count() == 2));
        assert!(manager.wait_for_state(State::Connected, WAIT));
        manager.stop();
    }

    #[test]
    fn disconnect_does_not_reconnect() {
        let config = ManagerConfig::new("disconnect")
            .with_auto_reconnect(true)
            .with_reconnect_delay(Duration::from_millis(5));
        let (transport, manager) = manager(config);
        manager.start().unwrap();
        assert!(manager.wait_for_state(State::Started, WAIT));
        manager.connect();
        assert!(manager.wait_for_state(State::Connected, WAIT));

        manager.disconnect();
        assert!(manager.wait_for_state(State::Started, WAIT));
        assert!(eventually(|| !manager.connection().is_open()));
        thread::sleep(Duration::from_millis(30));
        assert_eq!(transport.open_count(), 1);
        assert_eq!(manager.state(), State::Started);

        manager.connect();
        assert!(manager.wait_for_state(State::Connected, WAIT));
        assert_eq!(transport.open_count(), 2);
        manager.stop();
    }

    #[test]
    fn failed_connects_give_up_after_limit() {
        let config = ManagerConfig::new("limit")
            .with_auto_reconnect(true)
            .with_reconnect_delay(Duration::from_millis(1))
            .with_max_reconnect_attempts(3);
        let (transport, manager) = manager(config);
        transport.fail_open();
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        manager.on_error(move |err| {
            if matches!(err, SdkError::Transport { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        manager.start().unwrap();
        assert!(manager.wait_for_state(State::Started, WAIT));
        manager.connect();
        assert!(manager.wait_for_state(State::Failed, Duration::from_secs(5)));
        assert_eq!(errors.load(Ordering::SeqCst), 3);

        manager.stop();
        assert_eq!(manager.state(), State::Stopped);
    }

    #[test]
    fn failed_connect_without_reconnect_stays_started() {
        let (transport, manager) = manager(ManagerConfig::new("once"));
        transport.fail_open();
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        manager.on_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        manager.start().unwrap();
        assert!(manager.wait_for_state(State::Started, WAIT));
        manager.connect();
        assert!(eventually(|| errors.load(Ordering::SeqCst) == 1));
        assert!(manager.wait_for_state(State::Started, WAIT));
        manager.stop();
    }

    #[test]
    fn stop_after_failed_spawn_ends_stopped() {
        let (_transport, manager) = manager(ManagerConfig::new("no thread"));
        let err = manager.spawn_failed(std::io::Error::other("no threads left"));
        assert!(matches!(err, SdkError::Io(_)));
        assert_eq!(manager.state(), State::Failed);
        manager.stop();
        assert_eq!(manager.state(), State::Stopped);
        manager.stop();
        assert_eq!(manager.state(), State::Stopped);
    }

    #[test]
    fn connect_before_start_is_ignored() {
        let (transport, manager) = manager(ManagerConfig::new("idle"));
        manager.connect();
        manager.disconnect();
        assert_eq!(manager.state(), State::Stopped);
        assert_eq!(transport.open_count(), 0);
    }

    #[test]
    fn drop_stops_worker() {
        let (transport, manager) = manager(ManagerConfig::new("drop"));
        manager.start().unwrap();
        assert!(manager.wait_for_state(State::Started, WAIT));
        manager.connect();
        assert!(manager.wait_for_state(State::Connected, WAIT));
        drop(manager);
        assert_eq!(transport.close_count(), 1);
    }

    #[test]
    fn state_display() {
        assert_eq!(State::Connecting.to_string(), "Connecting");
        assert_eq!(State::default(), State::Stopped);
        assert_eq!(serde_json::to_string(&State::Failed).unwrap(), "\"Failed\"");
    }
}
