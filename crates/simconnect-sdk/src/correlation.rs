//! Routing messages to the request that caused them.
//!
//! A [`CorrelationLayer`] takes over a set of message ids on a
//! [`Dispatcher`]. For each message it extracts a correlation id (request
//! id, group id, event id, …) and calls the callback registered for that
//! id. Messages it has no callback for go to whatever handled the id before
//! the layer was enabled, then to the dispatcher's default handler.
//!
//! Enabling installs the layer as a handler token and keeps the displaced
//! handlers by value. Handlers registered on the dispatcher afterwards run
//! next to the layer. Disabling (explicitly or on drop) puts the displaced
//! handlers back where the token is, even when another layer stacked on top
//! has since taken the token over, so layers may be disabled in any order.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use simconnect_models::{RawMessage, RecvId};
use tracing::{debug, trace};

use crate::dispatch::{DisplacedHandlers, Dispatcher, HandlerPolicy, HandlerProc, WeakDispatcher};
use crate::request::Request;

const TARGET: &str = "simconnect::correlation";

/// Pulls the correlation id out of a message.
pub type Extractor = fn(&RawMessage) -> Option<u32>;

/// A correlated callback.
pub type CorrelationProc = Arc<dyn Fn(&RawMessage) + Send + Sync>;

struct Registration {
    proc: CorrelationProc,
    auto_remove: bool,
}

type Registry = Mutex<HashMap<u32, Registration>>;

fn lock(registry: &Registry) -> std::sync::MutexGuard<'_, HashMap<u32, Registration>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Weak handle to a layer's registrations, for teardowns that may outlive
/// the layer.
#[derive(Clone, Default)]
pub struct CorrelationHandle {
    registry: Weak<Registry>,
}

impl CorrelationHandle {
    /// Remove the registration for `correlation_id`. Returns `false` if
    /// there was none or the layer is gone.
    pub fn remove(&self, correlation_id: u32) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| lock(&registry).remove(&correlation_id).is_some())
    }

    /// True if `correlation_id` is still registered.
    pub fn contains(&self, correlation_id: u32) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| lock(&registry).contains_key(&correlation_id))
    }
}

/// The token a layer holds for one message id.
struct Installed {
    id: RecvId,
    proc: HandlerProc,
    displaced: Arc<DisplacedHandlers>,
}

/// Correlation-id based routing for a set of message ids.
pub struct CorrelationLayer {
    name: &'static str,
    ids: Vec<RecvId>,
    extractor: Extractor,
    registry: Arc<Registry>,
    installed: Mutex<Vec<Installed>>,
    dispatcher: Mutex<WeakDispatcher>,
    close_hook: AtomicBool,
}

impl fmt::Debug for CorrelationLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorrelationLayer")
            .field("name", &self.name)
            .field("ids", &self.ids)
            .field("registrations", &self.len())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Call the handlers that were displaced, else the dispatcher default.
fn fall_back(name: &str, previous: &HandlerPolicy, dispatcher: &WeakDispatcher, message: &RawMessage) {
    if previous.has_handlers() {
        previous.call(message);
        return;
    }
    if let Some(dispatcher) = dispatcher.upgrade() {
        let fallback = dispatcher.default_handler();
        if fallback.has_handlers() {
            fallback.call(message);
            return;
        }
    }
    trace!(target: TARGET, layer = name, message_id = message.raw_id(), "uncorrelated message dropped");
}

impl CorrelationLayer {
    /// A disabled layer for `ids`.
    pub fn new(name: &'static str, ids: &[RecvId], extractor: Extractor) -> Self {
        Self {
            name,
            ids: ids.to_vec(),
            extractor,
            registry: Arc::new(Mutex::new(HashMap::new())),
            installed: Mutex::new(Vec::new()),
            dispatcher: Mutex::new(WeakDispatcher::default()),
            close_hook: AtomicBool::new(false),
        }
    }

    /// Name used in logs.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The message ids this layer takes over.
    pub fn ids(&self) -> &[RecvId] {
        &self.ids
    }

    /// Take over this layer's message ids on `dispatcher`. Enabling an
    /// enabled layer does nothing.
    pub fn enable(&self, dispatcher: &Dispatcher) {
        let mut installed = self.installed.lock().unwrap_or_else(PoisonError::into_inner);
        if !installed.is_empty() {
            return;
        }
        let weak_dispatcher = dispatcher.downgrade();
        *self.dispatcher.lock().unwrap_or_else(PoisonError::into_inner) = weak_dispatcher.clone();

        for &id in &self.ids {
            let displaced: Arc<DisplacedHandlers> = Arc::default();
            let previous_slot = Arc::clone(&displaced);
            let registry = Arc::downgrade(&self.registry);
            let extractor = self.extractor;
            let name = self.name;
            let fallback_dispatcher = weak_dispatcher.clone();

            let proc: HandlerProc = Arc::new(move |message: &RawMessage| {
                let found = registry.upgrade().and_then(|registry| {
                    let correlation_id = extractor(message)?;
                    let registration = lock(&registry)
                        .get(&correlation_id)
                        .map(|r| (Arc::clone(&r.proc), r.auto_remove))?;
                    Some((registry, correlation_id, registration))
                });
                let Some((registry, correlation_id, (proc, auto_remove))) = found else {
                    let previous = previous_slot.lock().unwrap_or_else(PoisonError::into_inner).clone();
                    fall_back(name, &previous, &fallback_dispatcher, message);
                    return;
                };

                let outcome = catch_unwind(AssertUnwindSafe(|| proc(message)));
                if auto_remove {
                    let mut registrations = lock(&registry);
                    if registrations
                        .get(&correlation_id)
                        .is_some_and(|r| Arc::ptr_eq(&r.proc, &proc))
                    {
                        registrations.remove(&correlation_id);
                    }
                }
                if let Err(panic) = outcome {
                    resume_unwind(panic);
                }
            });

            dispatcher.intercept(id, Arc::clone(&proc), &displaced);
            installed.push(Installed { id, proc, displaced });
        }

        if !self.close_hook.swap(true, Ordering::SeqCst) {
            let registry = Arc::downgrade(&self.registry);
            dispatcher.connection().on_close(move || match registry.upgrade() {
                Some(registry) => {
                    lock(&registry).clear();
                    true
                }
                None => false,
            });
        }
        debug!(target: TARGET, layer = self.name, ids = ?self.ids, "correlation layer enabled");
    }

    /// Give the message ids back to the handlers that held them before
    /// [`enable`](Self::enable), keeping handlers registered since.
    /// Disabling a disabled layer does nothing.
    pub fn disable(&self) {
        let mut installed = self.installed.lock().unwrap_or_else(PoisonError::into_inner);
        if installed.is_empty() {
            return;
        }
        let dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade();
        while let Some(entry) = installed.pop() {
            let Some(dispatcher) = &dispatcher else {
                continue;
            };
            if !dispatcher.release(entry.id, &entry.proc, &entry.displaced) {
                debug!(target: TARGET, layer = self.name, kind = %entry.id, "handler was replaced while the layer was enabled");
            }
        }
        debug!(target: TARGET, layer = self.name, "correlation layer disabled");
    }

    /// True while the layer holds its message ids.
    pub fn is_enabled(&self) -> bool {
        !self
            .installed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Route messages carrying `correlation_id` to `proc`. With
    /// `auto_remove` the registration is dropped after the first call,
    /// even if `proc` panics.
    pub fn register(
        &self,
        correlation_id: u32,
        proc: impl Fn(&RawMessage) + Send + Sync + 'static,
        auto_remove: bool,
    ) {
        lock(&self.registry).insert(
            correlation_id,
            Registration {
                proc: Arc::new(proc),
                auto_remove,
            },
        );
        trace!(target: TARGET, layer = self.name, correlation_id, auto_remove, "registered");
    }

    /// Drop the registration for `correlation_id`.
    pub fn remove(&self, correlation_id: u32) -> bool {
        lock(&self.registry).remove(&correlation_id).is_some()
    }

    /// True if `correlation_id` is registered.
    pub fn contains(&self, correlation_id: u32) -> bool {
        lock(&self.registry).contains_key(&correlation_id)
    }

    /// Drop every registration.
    pub fn clear(&self) {
        lock(&self.registry).clear();
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        lock(&self.registry).len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Weak handle to the registrations.
    pub fn handle(&self) -> CorrelationHandle {
        CorrelationHandle {
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// A [`Request`] whose teardown removes the registration for
    /// `correlation_id`.
    pub fn request(&self, correlation_id: u32) -> Request {
        let handle = self.handle();
        Request::new(correlation_id, move || {
            handle.remove(correlation_id);
        })
    }
}

impl Drop for CorrelationLayer {
    fn drop(&mut self) {
        self.disable();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use simconnect_models::{AssignedObjectIdMessage, SystemStateMessage};

    use super::*;
    use crate::connection::Connection;
    use crate::testing::ScriptedTransport;

    fn request_id(message: &RawMessage) -> Option<u32> {
        message.body_u32(0)
    }

    fn open_dispatcher() -> Dispatcher {
        let connection = Connection::new("test", ScriptedTransport::new());
        connection.open(0).unwrap();
        Dispatcher::new(connection)
    }

    fn state(request_id: u32) -> RawMessage {
        RawMessage::from_message(&SystemStateMessage {
            request_id,
            ..SystemStateMessage::default()
        })
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&RawMessage) + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = Arc::clone(&count);
        (count, move |_: &RawMessage| {
            inner.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn routes_by_correlation_id() {
        let dispatcher = open_dispatcher();
        let layer = CorrelationLayer::new("state", &[RecvId::SystemState], request_id);
        layer.enable(&dispatcher);
        let (seven, on_seven) = counter();
        let (eight, on_eight) = counter();
        layer.register(7, on_seven, false);
        layer.register(8, on_eight, false);

        dispatcher.dispatch(&state(7));
        dispatcher.dispatch(&state(7));
        dispatcher.dispatch(&state(8));
        assert_eq!(seven.load(Ordering::SeqCst), 2);
        assert_eq!(eight.load(Ordering::SeqCst), 1);
        assert_eq!(layer.len(), 2);
    }

    #[test]
    fn auto_remove_after_first_call() {
        let dispatcher = open_dispatcher();
        let layer = CorrelationLayer::new("state", &[RecvId::SystemState], request_id);
        layer.enable(&dispatcher);
        let (count, on_message) = counter();
        layer.register(1, on_message, true);
        dispatcher.dispatch(&state(1));
        dispatcher.dispatch(&state(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(layer.is_empty());
    }

    #[test]
    fn auto_remove_survives_panics() {
        let dispatcher = open_dispatcher();
        let layer = CorrelationLayer::new("state", &[RecvId::SystemState], request_id);
        layer.enable(&dispatcher);
        layer.register(1, |_| panic!("callback failed"), true);
        let result = catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(&state(1))));
        assert!(result.is_err());
        assert!(!layer.contains(1));
    }

    #[test]
    fn misses_fall_back_to_previous_then_default() {
        let dispatcher = open_dispatcher();
        let (previous, on_previous) = counter();
        dispatcher.register_handler(RecvId::SystemState, on_previous);
        let (fallback, on_default) = counter();
        dispatcher.set_default_handler(on_default);

        let layer = CorrelationLayer::new("state", &[RecvId::SystemState, RecvId::AssignedObjectId], request_id);
        layer.enable(&dispatcher);
        dispatcher.dispatch(&state(99));
        assert_eq!(previous.load(Ordering::SeqCst), 1);

        dispatcher.dispatch(&RawMessage::from_message(&AssignedObjectIdMessage {
            request_id: 5,
            object_id: 10,
        }));
        assert_eq!(fallback.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disable_restores_exact_handlers() {
        let dispatcher = open_dispatcher();
        dispatcher.register_handler(RecvId::SystemState, |_| {});
        let before_state = dispatcher.handler(RecvId::SystemState);
        let before_assigned = dispatcher.handler(RecvId::AssignedObjectId);

        let layer = CorrelationLayer::new("state", &[RecvId::SystemState, RecvId::AssignedObjectId], request_id);
        layer.enable(&dispatcher);
        assert!(!dispatcher.handler(RecvId::SystemState).same_handlers(&before_state));
        layer.disable();
        layer.disable();
        assert!(dispatcher.handler(RecvId::SystemState).same_handlers(&before_state));
        assert!(dispatcher.handler(RecvId::AssignedObjectId).same_handlers(&before_assigned));
        assert!(!layer.is_enabled());
    }

    #[test]
    fn stacked_layers_unwind_lifo() {
        let dispatcher = open_dispatcher();
        let (original, on_original) = counter();
        dispatcher.register_handler(RecvId::SystemState, on_original);
        let before = dispatcher.handler(RecvId::SystemState);

        let outer = CorrelationLayer::new("outer", &[RecvId::SystemState], request_id);
        outer.enable(&dispatcher);
        let (outer_hits, on_outer) = counter();
        outer.register(1, on_outer, false);
        let after_outer = dispatcher.handler(RecvId::SystemState);

        let inner = CorrelationLayer::new("inner", &[RecvId::SystemState], request_id);
        inner.enable(&dispatcher);
        let (inner_hits, on_inner) = counter();
        inner.register(2, on_inner, false);

        // Misses in the inner layer fall through to the outer one.
        dispatcher.dispatch(&state(1));
        dispatcher.dispatch(&state(2));
        dispatcher.dispatch(&state(3));
        assert_eq!(outer_hits.load(Ordering::SeqCst), 1);
        assert_eq!(inner_hits.load(Ordering::SeqCst), 1);
        assert_eq!(original.load(Ordering::SeqCst), 1);

        inner.disable();
        assert!(dispatcher.handler(RecvId::SystemState).same_handlers(&after_outer));
        outer.disable();
        assert!(dispatcher.handler(RecvId::SystemState).same_handlers(&before));
    }

    #[test]
    fn handlers_registered_after_enable_run_alongside() {
        let dispatcher = open_dispatcher();
        let layer = CorrelationLayer::new("state", &[RecvId::SystemState], request_id);
        layer.enable(&dispatcher);
        let (correlated, on_correlated) = counter();
        layer.register(1, on_correlated, false);
        let (plain, on_plain) = counter();
        dispatcher.register_handler(RecvId::SystemState, on_plain);

        dispatcher.dispatch(&state(1));
        assert_eq!(correlated.load(Ordering::SeqCst), 1);
        assert_eq!(plain.load(Ordering::SeqCst), 1);

        layer.disable();
        assert_eq!(dispatcher.handler(RecvId::SystemState).handler_count(), 1);
        dispatcher.dispatch(&state(1));
        assert_eq!(correlated.load(Ordering::SeqCst), 1);
        assert_eq!(plain.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn lower_layer_disabled_first_keeps_upper_routing() {
        let dispatcher = open_dispatcher();
        let (original, on_original) = counter();
        dispatcher.register_handler(RecvId::SystemState, on_original);
        let before = dispatcher.handler(RecvId::SystemState);

        let lower = CorrelationLayer::new("lower", &[RecvId::SystemState], request_id);
        lower.enable(&dispatcher);
        let (lower_hits, on_lower) = counter();
        lower.register(1, on_lower, false);

        let upper = CorrelationLayer::new("upper", &[RecvId::SystemState], request_id);
        upper.enable(&dispatcher);
        let (upper_hits, on_upper) = counter();
        upper.register(2, on_upper, false);

        lower.disable();
        dispatcher.dispatch(&state(2));
        dispatcher.dispatch(&state(1));
        assert_eq!(upper_hits.load(Ordering::SeqCst), 1);
        assert_eq!(lower_hits.load(Ordering::SeqCst), 0);
        assert_eq!(original.load(Ordering::SeqCst), 1);

        upper.disable();
        assert!(dispatcher.handler(RecvId::SystemState).same_handlers(&before));
    }

    #[test]
    fn drop_disables() {
        let dispatcher = open_dispatcher();
        let before = dispatcher.handler(RecvId::SystemState);
        {
            let layer = CorrelationLayer::new("state", &[RecvId::SystemState], request_id);
            layer.enable(&dispatcher);
        }
        assert!(dispatcher.handler(RecvId::SystemState).same_handlers(&before));
    }

    #[test]
    fn request_teardown_removes_registration() {
        let dispatcher = open_dispatcher();
        let layer = CorrelationLayer::new("state", &[RecvId::SystemState], request_id);
        layer.enable(&dispatcher);
        layer.register(4, |_| {}, false);
        let request = layer.request(4);
        assert!(layer.contains(4));
        drop(request);
        assert!(!layer.contains(4));
    }

    #[test]
    fn request_outliving_layer_is_harmless() {
        let layer = CorrelationLayer::new("state", &[RecvId::SystemState], request_id);
        layer.register(4, |_| {}, false);
        let request = layer.request(4);
        drop(layer);
        drop(request);
    }

    #[test]
    fn connection_close_clears_registrations() {
        let dispatcher = open_dispatcher();
        let layer = CorrelationLayer::new("state", &[RecvId::SystemState], request_id);
        layer.enable(&dispatcher);
        layer.register(1, |_| {}, false);
        dispatcher.connection().close();
        assert!(layer.is_empty());
    }

    #[test]
    fn callbacks_may_register_follow_ups() {
        let dispatcher = open_dispatcher();
        let layer = Arc::new(CorrelationLayer::new("state", &[RecvId::SystemState], request_id));
        layer.enable(&dispatcher);
        let weak = Arc::downgrade(&layer);
        let (follow_up, on_follow_up) = counter();
        let on_follow_up = Arc::new(on_follow_up);
        layer.register(
            1,
            move |_| {
                if let Some(layer) = weak.upgrade() {
                    let on_follow_up = Arc::clone(&on_follow_up);
                    layer.register(1, move |m| on_follow_up(m), true);
                }
            },
            true,
        );
        dispatcher.dispatch(&state(1));
        assert!(layer.contains(1));
        dispatcher.dispatch(&state(1));
        assert_eq!(follow_up.load(Ordering::SeqCst), 1);
        assert!(!layer.contains(1));
    }
}
