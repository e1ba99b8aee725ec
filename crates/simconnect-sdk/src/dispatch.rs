//! Routing inbound messages to handlers by message id.
//!
//! The [`Dispatcher`] keeps one [`HandlerPolicy`] per [`RecvId`] plus a
//! default policy for everything nobody claimed. Handlers are cloned out of
//! the table before they run, so a handler may register, unregister or swap
//! handlers (including itself) without deadlocking.
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
//! use simconnect_models::{RawMessage, RecvId, QuitMessage};
//! use simconnect_sdk::Dispatcher;
//!
//! let connection = Connection::new("demo", Arc::new(Nothing));
//! let dispatcher = Dispatcher::new(connection);
//! dispatcher.register_typed(|_: &QuitMessage| println!("simulator quit"));
//! dispatcher.dispatch(&RawMessage::from_message(&QuitMessage));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use simconnect_models::{OpenMessage, RawMessage, RecvId, WireMessage};
use strum::EnumCount;
use tracing::{debug, info, trace, warn};

use crate::connection::Connection;
use crate::error::{HostResult, SdkError};

const TARGET: &str = "simconnect::dispatch";

/// A message handler.
pub type HandlerProc = Arc<dyn Fn(&RawMessage) + Send + Sync>;

/// Token returned when registering a handler, used to remove it again.
pub type HandlerId = u32;

// ── HandlerPolicy ────────────────────────────────────────────────────────

/// How a handler cell treats a second registration.
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display,
)]
#[strum(serialize_all = "lowercase")]
pub enum PolicyKind {
    /// A new handler replaces the current one.
    Single,
    /// Handlers accumulate and run in registration order.
    #[default]
    Multi,
}

/// The handlers registered for one message id.
///
/// Cloning is cheap (the handlers are reference counted), which is how the
/// dispatcher snapshots a cell and how the correlation layer keeps the
/// handlers it displaced.
#[derive(Clone, Default)]
pub struct HandlerPolicy {
    kind: PolicyKind,
    handlers: Vec<(HandlerId, HandlerProc)>,
    next_id: HandlerId,
}

impl fmt::Debug for HandlerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerPolicy")
            .field("kind", &self.kind)
            .field("handlers", &self.handler_ids())
            .finish()
    }
}

impl HandlerPolicy {
    /// An empty policy of the given kind.
    pub fn new(kind: PolicyKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    /// An empty single-handler policy.
    pub fn single() -> Self {
        Self::new(PolicyKind::Single)
    }

    /// An empty multi-handler policy.
    pub fn multi() -> Self {
        Self::new(PolicyKind::Multi)
    }

    /// A policy holding just `proc`.
    pub fn with_proc(kind: PolicyKind, proc: HandlerProc) -> Self {
        let mut policy = Self::new(kind);
        policy.set_proc(proc);
        policy
    }

    /// Single or multi.
    pub fn kind(&self) -> PolicyKind {
        self.kind
    }

    /// Add `proc` (or replace the handler, for a single policy).
    pub fn set_proc(&mut self, proc: HandlerProc) -> HandlerId {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        if self.kind == PolicyKind::Single {
            self.handlers.clear();
        }
        self.handlers.push((id, proc));
        id
    }

    /// Remove the handler registered as `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: HandlerId) {
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
    }

    /// Remove every handler.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }

    /// The handler registered as `id`.
    pub fn proc(&self, id: HandlerId) -> Option<HandlerProc> {
        self.handlers
            .iter()
            .find(|(handler_id, _)| *handler_id == id)
            .map(|(_, proc)| Arc::clone(proc))
    }

    /// True if at least one handler is registered.
    pub fn has_handlers(&self) -> bool {
        !self.handlers.is_empty()
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Ids of the registered handlers, in call order.
    pub fn handler_ids(&self) -> Vec<HandlerId> {
        self.handlers.iter().map(|(id, _)| *id).collect()
    }

    /// True if both policies hold the very same handlers in the same order.
    pub fn same_handlers(&self, other: &Self) -> bool {
        self.handlers.len() == other.handlers.len()
            && self
                .handlers
                .iter()
                .zip(&other.handlers)
                .all(|((a_id, a), (b_id, b))| a_id == b_id && Arc::ptr_eq(a, b))
    }

    fn position(&self, proc: &HandlerProc) -> Option<usize> {
        self.handlers.iter().position(|(_, p)| Arc::ptr_eq(p, proc))
    }

    /// Put the handlers of `displaced` where the handler at `index` is. A
    /// cell holding nothing else becomes `displaced` exactly.
    fn splice(&mut self, index: usize, displaced: HandlerPolicy) {
        let next_id = self.next_id.max(displaced.next_id);
        if self.handlers.len() == 1 {
            *self = displaced;
        } else {
            self.handlers.splice(index..=index, displaced.handlers);
        }
        self.next_id = next_id;
    }

    /// Run every handler on `message`.
    pub fn call(&self, message: &RawMessage) {
        for (_, proc) in &self.handlers {
            proc(message);
        }
    }
}

// ── Dispatcher ───────────────────────────────────────────────────────────

struct DispatcherInner {
    connection: Connection,
    handlers: Mutex<Vec<HandlerPolicy>>,
    default_handler: Mutex<HandlerPolicy>,
    auto_closing: AtomicBool,
    displaced: Mutex<Vec<Weak<DisplacedHandlers>>>,
}

/// Handlers an interceptor took over, kept until it is released.
pub type DisplacedHandlers = Mutex<HandlerPolicy>;

fn lock_displaced(slot: &DisplacedHandlers) -> std::sync::MutexGuard<'_, HandlerPolicy> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Routes messages of one connection to their handlers.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

/// Non-owning handle to a [`Dispatcher`].
#[derive(Clone, Default)]
pub struct WeakDispatcher {
    inner: Weak<DispatcherInner>,
}

impl WeakDispatcher {
    /// The dispatcher, if it still exists.
    pub fn upgrade(&self) -> Option<Dispatcher> {
        self.inner.upgrade().map(|inner| Dispatcher { inner })
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("connection", &self.inner.connection)
            .field("auto_closing", &self.is_auto_closing())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// A dispatcher for `connection` with an empty multi-handler cell per
    /// message id. It closes the connection when the host quits.
    pub fn new(connection: Connection) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                connection,
                handlers: Mutex::new(vec![HandlerPolicy::multi(); RecvId::COUNT]),
                default_handler: Mutex::new(HandlerPolicy::single()),
                auto_closing: AtomicBool::new(true),
                displaced: Mutex::new(Vec::new()),
            }),
        }
    }

    /// A handle that does not keep the dispatcher alive.
    pub fn downgrade(&self) -> WeakDispatcher {
        WeakDispatcher {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// The connection messages are read from.
    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    /// Close the connection after dispatching a QUIT message.
    pub fn set_auto_closing(&self, auto_closing: bool) {
        self.inner.auto_closing.store(auto_closing, Ordering::SeqCst);
    }

    /// See [`set_auto_closing`](Self::set_auto_closing).
    pub fn is_auto_closing(&self) -> bool {
        self.inner.auto_closing.load(Ordering::SeqCst)
    }

    fn with_cell<R>(&self, id: RecvId, f: impl FnOnce(&mut HandlerPolicy) -> R) -> R {
        let mut handlers = self.inner.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut handlers[id as usize])
    }

    // ── Registration ─────────────────────────────────────────────────────

    /// Choose single or multi handling for `id`. Handlers already in the
    /// cell are kept.
    pub fn set_policy(&self, id: RecvId, kind: PolicyKind) {
        self.with_cell(id, |cell| cell.kind = kind);
    }

    /// Register `proc` for messages with id `id`.
    pub fn register_handler(
        &self,
        id: RecvId,
        proc: impl Fn(&RawMessage) + Send + Sync + 'static,
    ) -> HandlerId {
        let handler_id = self.with_cell(id, |cell| cell.set_proc(Arc::new(proc)));
        debug!(target: TARGET, kind = %id, handler_id, "registered handler");
        handler_id
    }

    /// Register a handler that receives the decoded record. Messages that do
    /// not decode are logged and skipped.
    pub fn register_typed<M>(&self, callback: impl Fn(&M) + Send + Sync + 'static) -> HandlerId
    where
        M: WireMessage + 'static,
    {
        self.register_handler(M::ID, move |raw| match raw.decode::<M>() {
            Ok(message) => callback(&message),
            Err(err) => warn!(target: TARGET, kind = %M::ID, error = %err, "dropping undecodable message"),
        })
    }

    /// Remove the handler registered as `handler_id` for `id`. Stale tokens
    /// are ignored.
    pub fn unregister_handler(&self, id: RecvId, handler_id: HandlerId) {
        self.with_cell(id, |cell| cell.remove(handler_id));
    }

    /// Handle every message no other handler claims.
    pub fn set_default_handler(&self, proc: impl Fn(&RawMessage) + Send + Sync + 'static) {
        self.inner
            .default_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .set_proc(Arc::new(proc));
    }

    /// Remove the default handler.
    pub fn clear_default_handler(&self) {
        self.inner
            .default_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Snapshot of the default handler.
    pub fn default_handler(&self) -> HandlerPolicy {
        self.inner
            .default_handler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Snapshot of the handlers for `id`.
    pub fn handler(&self, id: RecvId) -> HandlerPolicy {
        self.with_cell(id, |cell| cell.clone())
    }

    /// Replace the handlers for `id`, returning the previous ones.
    pub fn swap_handler(&self, id: RecvId, policy: HandlerPolicy) -> HandlerPolicy {
        self.with_cell(id, |cell| std::mem::replace(cell, policy))
    }

    /// Make `proc` the only handler for `id`. The handlers it displaces
    /// move into `slot` and come back with [`release`](Self::release).
    /// Handlers registered afterwards are appended next to `proc`.
    pub fn intercept(&self, id: RecvId, proc: HandlerProc, slot: &Arc<DisplacedHandlers>) {
        let mut handlers = self.inner.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let cell = &mut handlers[id as usize];
        let mut replacement = HandlerPolicy {
            next_id: cell.next_id,
            ..HandlerPolicy::multi()
        };
        replacement.set_proc(proc);
        *lock_displaced(slot) = std::mem::replace(cell, replacement);

        let mut displaced = self.inner.displaced.lock().unwrap_or_else(PoisonError::into_inner);
        displaced.retain(|weak| weak.strong_count() > 0);
        displaced.push(Arc::downgrade(slot));
    }

    /// Undo [`intercept`](Self::intercept): the handlers saved in `slot`
    /// take the place of `proc`, in the dispatcher or inside whichever
    /// interceptor displaced it in turn. Returns `false` if `proc` was
    /// removed by other means.
    pub fn release(&self, id: RecvId, proc: &HandlerProc, slot: &Arc<DisplacedHandlers>) -> bool {
        let mut handlers = self.inner.handlers.lock().unwrap_or_else(PoisonError::into_inner);
        let mut displaced = self.inner.displaced.lock().unwrap_or_else(PoisonError::into_inner);
        displaced.retain(|weak| weak.strong_count() > 0 && !std::ptr::eq(weak.as_ptr(), Arc::as_ptr(slot)));
        let saved = std::mem::take(&mut *lock_displaced(slot));

        let cell = &mut handlers[id as usize];
        if let Some(index) = cell.position(proc) {
            cell.splice(index, saved);
            return true;
        }
        for other in displaced.iter().filter_map(Weak::upgrade) {
            let mut other = lock_displaced(&other);
            if let Some(index) = other.position(proc) {
                other.splice(index, saved);
                return true;
            }
        }
        false
    }

    // ── Dispatch ─────────────────────────────────────────────────────────

    /// Run the handlers for `message`: the ones registered for its id, else
    /// the default handler.
    pub fn dispatch(&self, message: &RawMessage) {
        let id = message.id();

        if id == Some(RecvId::Open) {
            match message.decode::<OpenMessage>() {
                Ok(open) => {
                    info!(
                        target: TARGET,
                        application = %open.application_name,
                        version = %open.application_version,
                        "connected to simulator"
                    );
                    self.inner.connection.set_open_info(open);
                }
                Err(err) => warn!(target: TARGET, error = %err, "undecodable OPEN message"),
            }
        }

        let handlers = id.map(|id| self.handler(id)).filter(HandlerPolicy::has_handlers);
        match handlers {
            Some(handlers) => handlers.call(message),
            None => {
                let fallback = self.default_handler();
                if fallback.has_handlers() {
                    fallback.call(message);
                } else {
                    trace!(target: TARGET, message_id = message.raw_id(), "no handler for message");
                }
            }
        }

        if id == Some(RecvId::Quit) && self.is_auto_closing() {
            info!(target: TARGET, "simulator quit, closing connection");
            self.inner.connection.close();
        }
    }

    /// Dispatch every waiting message and return how many were handled.
    ///
    /// # Errors
    ///
    /// The transport error that ended the drain. Messages dispatched before
    /// it are not rolled back.
    pub fn try_drain(&self) -> HostResult<usize> {
        let mut count = 0;
        while let Some(bytes) = self.inner.connection.next_message()? {
            match RawMessage::new(bytes) {
                Ok(message) => {
                    self.dispatch(&message);
                    count += 1;
                }
                Err(err) => warn!(target: TARGET, error = %err, "dropping malformed message"),
            }
            if !self.inner.connection.is_open() {
                break;
            }
        }
        Ok(count)
    }

    /// Dispatch every waiting message. Errors are logged, never returned.
    pub fn drain_pending(&self) -> usize {
        match self.try_drain() {
            Ok(count) => count,
            Err(SdkError::NotOpen) => {
                trace!(target: TARGET, "connection closed, nothing to drain");
                0
            }
            Err(err) => {
                warn!(target: TARGET, error = %err, "failed to read messages");
                0
            }
        }
    }
}
