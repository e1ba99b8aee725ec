//! A client session with the host.
//!
//! [`Connection`] is a cheap `Clone` handle; every handler and run loop
//! holds one. It owns the transport, the identifier allocators, and the
//! lock that serialises host calls. The last handle to go away closes the
//! session.
//!
//! ```
//! # use std::sync::Arc;
//! # use simconnect_sdk::{Connection, HostResult, OpenParams, SendId, Transport, Verb};
//! # struct Nothing;
//! # impl Transport for Nothing {
//! #     fn open(&self, _: &OpenParams) -> HostResult<()> { Ok(()) }
//! #     fn close(&self) {}
//! #     fn next_message(&self) -> HostResult<Option<Vec<u8>>> { Ok(None) }
//! #     fn send(&self, _: &Verb) -> HostResult<SendId> { Ok(1) }
//! # }
//! let connection = Connection::new("My client", Arc::new(Nothing));
//! connection.open(0)?;
//! assert!(connection.is_open());
//! connection.close();
//! # Ok::<(), simconnect_sdk::SdkError>(())
//! ```

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use simconnect_models::{OpenMessage, SendId, NO_ID};
use tracing::{debug, info, trace, warn};

use crate::error::{HostResult, SdkError};
use crate::events::Event;
use crate::transport::{Notification, NotifyMode, OpenParams, Transport, Verb};

const TARGET: &str = "simconnect::connection";

/// Source of session numbers, shared by every connection in the process.
static SESSIONS: AtomicU64 = AtomicU64::new(0);

// ── IdAllocator ──────────────────────────────────────────────────────────

/// Lock-free source of identifiers. Starts at 1, never hands out 0, and
/// never repeats a value until the counter wraps.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU32,
}

impl IdAllocator {
    /// An allocator whose first value is 1.
    pub const fn new() -> Self {
        Self {
            next: AtomicU32::new(1),
        }
    }

    /// Take the next identifier.
    pub fn next_id(&self) -> u32 {
        loop {
            let id = self.next.fetch_add(1, Ordering::Relaxed);
            if id != NO_ID {
                return id;
            }
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ── Connection ───────────────────────────────────────────────────────────

type CloseHook = Box<dyn Fn() -> bool + Send + Sync>;

struct ConnectionInner {
    client_name: String,
    transport: Arc<dyn Transport>,
    notify: NotifyMode,
    open: AtomicBool,
    generation: AtomicU64,
    last_send_id: AtomicU32,
    host_lock: Mutex<()>,
    open_info: Mutex<Option<OpenMessage>>,
    mapped_events: Mutex<HashSet<u32>>,
    close_hooks: Mutex<Vec<CloseHook>>,

    requests: IdAllocator,
    data_definitions: IdAllocator,
    facility_definitions: IdAllocator,
    notification_groups: IdAllocator,
    input_groups: IdAllocator,
}

impl ConnectionInner {
    fn close(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }
        {
            let _host = self.host_lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.transport.close();
        }
        self.mapped_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        let hooks = std::mem::take(
            &mut *self.close_hooks.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let alive: Vec<CloseHook> = hooks.into_iter().filter(|hook| hook()).collect();
        self.close_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(alive);
        info!(target: TARGET, client = %self.client_name, "connection closed");
    }
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle to a client session.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

/// Non-owning handle to a [`Connection`].
#[derive(Clone, Default)]
pub struct WeakConnection {
    inner: Weak<ConnectionInner>,
}

impl WeakConnection {
    /// The connection, if any handle to it is still alive.
    pub fn upgrade(&self) -> Option<Connection> {
        self.inner.upgrade().map(|inner| Connection { inner })
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("client_name", &self.inner.client_name)
            .field("open", &self.is_open())
            .finish_non_exhaustive()
    }
}

impl Connection {
    // ── Construction ─────────────────────────────────────────────────────

    fn with_notify(client_name: impl Into<String>, transport: Arc<dyn Transport>, notify: NotifyMode) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                client_name: client_name.into(),
                transport,
                notify,
                open: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                last_send_id: AtomicU32::new(0),
                host_lock: Mutex::new(()),
                open_info: Mutex::new(None),
                mapped_events: Mutex::new(HashSet::new()),
                close_hooks: Mutex::new(Vec::new()),
                requests: IdAllocator::new(),
                data_definitions: IdAllocator::new(),
                facility_definitions: IdAllocator::new(),
                notification_groups: IdAllocator::new(),
                input_groups: IdAllocator::new(),
            }),
        }
    }

    /// A connection the client polls.
    pub fn new(client_name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self::with_notify(client_name, transport, NotifyMode::None)
    }

    /// A connection whose host signals a [`Notification`] when messages
    /// are waiting.
    pub fn with_event(client_name: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        let notification = Arc::new(Notification::new());
        Self::with_notify(client_name, transport, NotifyMode::Event(notification))
    }

    /// A connection whose host posts `user_message` to the window `hwnd`.
    pub fn with_window(
        client_name: impl Into<String>,
        transport: Arc<dyn Transport>,
        hwnd: usize,
        user_message: u32,
    ) -> Self {
        Self::with_notify(client_name, transport, NotifyMode::Window { hwnd, user_message })
    }

    /// A handle that does not keep the connection alive.
    pub fn downgrade(&self) -> WeakConnection {
        WeakConnection {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ── Session ──────────────────────────────────────────────────────────

    /// Open the session using configuration section `config_index`.
    /// Opening an open connection does nothing.
    pub fn open(&self, config_index: u32) -> HostResult<()> {
        let _host = self.inner.host_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_open() {
            return Ok(());
        }
        let params = OpenParams {
            client_name: self.inner.client_name.clone(),
            notify: self.inner.notify.clone(),
            config_index,
        };
        self.inner.transport.open(&params).inspect_err(|err| {
            warn!(target: TARGET, client = %self.inner.client_name, error = %err, "open failed");
        })?;
        let session = SESSIONS.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.generation.store(session, Ordering::SeqCst);
        self.inner.open.store(true, Ordering::SeqCst);
        info!(target: TARGET, client = %self.inner.client_name, config_index, "connection opened");
        Ok(())
    }

    /// Close the session. Closing twice does nothing.
    pub fn close(&self) {
        self.inner.close();
    }

    /// True while the session is open.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// Name this client gave the host.
    pub fn client_name(&self) -> &str {
        &self.inner.client_name
    }

    /// The notification the host signals, for event-driven connections.
    pub fn notification(&self) -> Option<Arc<Notification>> {
        match &self.inner.notify {
            NotifyMode::Event(notification) => Some(Arc::clone(notification)),
            _ => None,
        }
    }

    /// Number of the current session, 0 before the first open. Every
    /// successful open gets a number no other session in the process has
    /// had, so host-side registrations (data definitions, mapped events)
    /// can be cached per generation.
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    /// Simulator information from the last OPEN message.
    pub fn open_info(&self) -> Option<OpenMessage> {
        self.inner
            .open_info
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_open_info(&self, info: OpenMessage) {
        *self.inner.open_info.lock().unwrap_or_else(PoisonError::into_inner) = Some(info);
    }

    /// Run `hook` when the connection closes. The hook returns `false` once
    /// it has nothing left to clean up; it is then forgotten.
    pub(crate) fn on_close(&self, hook: impl Fn() -> bool + Send + Sync + 'static) {
        self.inner
            .close_hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(hook));
    }

    // ── Messages ─────────────────────────────────────────────────────────

    /// Fetch the next waiting message.
    pub fn next_message(&self) -> HostResult<Option<Vec<u8>>> {
        if !self.is_open() {
            return Err(SdkError::NotOpen);
        }
        let _host = self.inner.host_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.transport.next_message()
    }

    /// Send one host call.
    pub fn send(&self, verb: Verb) -> HostResult<SendId> {
        if !self.is_open() {
            return Err(SdkError::NotOpen);
        }
        let _host = self.inner.host_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let send_id = self.inner.transport.send(&verb).inspect_err(|err| {
            debug!(target: TARGET, verb = verb.name(), error = %err, "host call failed");
        })?;
        self.inner.last_send_id.store(send_id, Ordering::SeqCst);
        trace!(target: TARGET, verb = verb.name(), send_id, "sent");
        Ok(send_id)
    }

    /// Serial number of the last packet sent, for matching EXCEPTION
    /// messages to the call that caused them.
    pub fn last_send_id(&self) -> SendId {
        self.inner.last_send_id.load(Ordering::SeqCst)
    }

    // ── Client events ────────────────────────────────────────────────────

    /// Map `event` to the simulator event of the same name. Each event is
    /// mapped at most once per open session.
    pub fn map_client_event(&self, event: &Event) -> HostResult<()> {
        {
            let mapped = self.inner.mapped_events.lock().unwrap_or_else(PoisonError::into_inner);
            if mapped.contains(&event.id()) {
                return Ok(());
            }
        }
        self.send(Verb::MapClientEventToSimEvent {
            event_id: event.id(),
            name: event.name().to_string(),
        })?;
        self.inner
            .mapped_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(event.id());
        debug!(target: TARGET, event_id = event.id(), name = event.name(), "mapped client event");
        Ok(())
    }

    /// True if `event` has been mapped on this session.
    pub fn is_mapped(&self, event: &Event) -> bool {
        self.inner
            .mapped_events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&event.id())
    }

    // ── Identifiers ──────────────────────────────────────────────────────

    /// Next request id.
    pub fn next_request_id(&self) -> u32 {
        self.inner.requests.next_id()
    }

    /// Next data definition id.
    pub fn next_data_definition_id(&self) -> u32 {
        self.inner.data_definitions.next_id()
    }

    /// Next facility definition id.
    pub fn next_facility_definition_id(&self) -> u32 {
        self.inner.facility_definitions.next_id()
    }

    /// Next notification group id.
    pub fn next_notification_group_id(&self) -> u32 {
        self.inner.notification_groups.next_id()
    }

    /// Next input group id.
    pub fn next_input_group_id(&self) -> u32 {
        self.inner.input_groups.next_id()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;
    use crate::testing::ScriptedTransport;

    #[test]
    fn allocator_starts_at_one() {
        let alloc = IdAllocator::new();
        assert_eq!(alloc.next_id(), 1);
        assert_eq!(alloc.next_id(), 2);
    }

    #[test]
    fn allocator_skips_zero_on_wrap() {
        let alloc = IdAllocator {
            next: AtomicU32::new(u32::MAX),
        };
        assert_eq!(alloc.next_id(), u32::MAX);
        assert_eq!(alloc.next_id(), 1);
    }

    #[test]
    fn allocator_is_unique_across_threads() {
        let alloc = Arc::new(IdAllocator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let alloc = Arc::clone(&alloc);
                thread::spawn(move || (0..1000).map(|_| alloc.next_id()).collect::<Vec<_>>())
            })
            .collect();
        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert_ne!(id, 0);
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 4000);
    }

    #[test]
    fn send_requires_open() {
        let transport = ScriptedTransport::new();
        let connection = Connection::new("test", transport.clone());
        let err = connection
            .send(Verb::ClearDataDefinition { define_id: 1 })
            .unwrap_err();
        assert!(matches!(err, SdkError::NotOpen));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn open_close_is_idempotent() {
        let transport = ScriptedTransport::new();
        let connection = Connection::new("test", transport.clone());
        connection.open(0).unwrap();
        connection.open(0).unwrap();
        assert_eq!(transport.open_count(), 1);
        let first = connection.generation();
        assert_ne!(first, 0);
        connection.close();
        connection.close();
        assert_eq!(transport.close_count(), 1);
        connection.open(0).unwrap();
        assert!(connection.generation() > first);
    }

    #[test]
    fn last_handle_closes() {
        let transport = ScriptedTransport::new();
        let connection = Connection::new("test", transport.clone());
        connection.open(0).unwrap();
        let weak = connection.downgrade();
        drop(connection);
        assert!(weak.upgrade().is_none());
        assert_eq!(transport.close_count(), 1);
    }

    #[test]
    fn send_records_send_id() {
        let transport = ScriptedTransport::new();
        let connection = Connection::new("test", transport.clone());
        connection.open(0).unwrap();
        let id = connection
            .send(Verb::RequestNotificationGroup { group_id: 3 })
            .unwrap();
        assert_eq!(connection.last_send_id(), id);
    }

    #[test]
    fn events_are_mapped_once_per_session() {
        let transport = ScriptedTransport::new();
        let connection = Connection::new("test", transport.clone());
        connection.open(0).unwrap();
        let event = Event::get("PARKING_BRAKES");
        connection.map_client_event(&event).unwrap();
        connection.map_client_event(&event).unwrap();
        assert!(connection.is_mapped(&event));
        assert_eq!(transport.sent_named("MapClientEventToSimEvent").len(), 1);

        connection.close();
        connection.open(0).unwrap();
        assert!(!connection.is_mapped(&event));
        connection.map_client_event(&event).unwrap();
        assert_eq!(transport.sent_named("MapClientEventToSimEvent").len(), 2);
    }

    #[test]
    fn close_runs_hooks_and_drops_finished_ones() {
        use std::sync::atomic::AtomicUsize;

        let transport = ScriptedTransport::new();
        let connection = Connection::new("test", transport);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        connection.on_close(move || counter.fetch_add(1, Ordering::SeqCst) == 0);

        connection.open(0).unwrap();
        connection.close();
        connection.open(0).unwrap();
        connection.close();
        connection.open(0).unwrap();
        connection.close();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn event_connection_exposes_notification() {
        let connection = Connection::with_event("test", ScriptedTransport::new());
        assert!(connection.notification().is_some());
        let polling = Connection::new("test", ScriptedTransport::new());
        assert!(polling.notification().is_none());
    }
}
