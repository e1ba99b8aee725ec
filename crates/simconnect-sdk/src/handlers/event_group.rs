//! Routing events by the notification group they were sent to.
//!
//! Every event message starts with the group id, so one correlation layer
//! covers all eleven of them. Within a group, callbacks are kept per message
//! kind: a group can have an [`EventMessage`](simconnect_models::EventMessage)
//! callback and an [`EventFrameMessage`](simconnect_models::EventFrameMessage)
//! callback side by side.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use simconnect_models::{EventVariant, GroupId, RawMessage, RecvId};
use tracing::{debug, trace};

use crate::correlation::{CorrelationHandle, CorrelationLayer, CorrelationProc};
use crate::dispatch::Dispatcher;
use crate::handlers::typed;

const TARGET: &str = "simconnect::event_group";

const EVENT_IDS: [RecvId; 11] = [
    RecvId::Event,
    RecvId::EventEx1,
    RecvId::EventObjectAddRemove,
    RecvId::EventFilename,
    RecvId::EventFrame,
    RecvId::EventWeatherMode,
    RecvId::EventMultiplayerServerStarted,
    RecvId::EventMultiplayerClientStarted,
    RecvId::EventMultiplayerSessionEnded,
    RecvId::EventRaceLap,
    RecvId::EventRaceEnd,
];

fn group_id(message: &RawMessage) -> Option<u32> {
    message.body_u32(0)
}

struct Route {
    proc: CorrelationProc,
    auto_remove: bool,
}

/// Group id to message id to callback.
type Routes = Mutex<HashMap<GroupId, HashMap<u32, Route>>>;

fn lock(routes: &Routes) -> MutexGuard<'_, HashMap<GroupId, HashMap<u32, Route>>> {
    routes.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Calls typed callbacks for events sent to notification groups.
pub struct EventGroupHandler {
    layer: CorrelationLayer,
    routes: Arc<Routes>,
}

impl fmt::Debug for EventGroupHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut groups: Vec<GroupId> = lock(&self.routes).keys().copied().collect();
        groups.sort_unstable();
        f.debug_struct("EventGroupHandler")
            .field("layer", &self.layer)
            .field("groups", &groups)
            .finish()
    }
}

impl EventGroupHandler {
    /// A handler enabled on `dispatcher`.
    pub fn new(dispatcher: &Dispatcher) -> Self {
        let layer = CorrelationLayer::new("event_group", &EVENT_IDS, group_id);
        layer.enable(dispatcher);
        Self {
            layer,
            routes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The layer entry for one group: picks the route for the message kind.
    fn group_proc(
        routes: &Arc<Routes>,
        handle: CorrelationHandle,
        group_id: GroupId,
    ) -> impl Fn(&RawMessage) + Send + Sync + 'static {
        let routes = Arc::downgrade(routes);
        move |raw: &RawMessage| {
            let Some(routes) = routes.upgrade() else {
                return;
            };
            let message_id = raw.raw_id();
            let proc = {
                let mut groups = lock(&routes);
                let Some(group) = groups.get_mut(&group_id) else {
                    return;
                };
                let Some(route) = group.get(&message_id) else {
                    trace!(target: TARGET, group_id, message_id, "no callback for this event kind");
                    return;
                };
                let proc = Arc::clone(&route.proc);
                if route.auto_remove {
                    group.remove(&message_id);
                    if group.is_empty() {
                        groups.remove(&group_id);
                        handle.remove(group_id);
                    }
                }
                proc
            };
            proc(raw);
        }
    }

    /// Call `callback` for every `M` sent to `group_id`. A later
    /// registration for the same group and message kind replaces this one.
    /// With `auto_remove` the callback runs once.
    pub fn register_group_handler<M>(
        &self,
        group_id: GroupId,
        callback: impl Fn(&M) + Send + Sync + 'static,
        auto_remove: bool,
    ) -> &Self
    where
        M: EventVariant + 'static,
    {
        let message_id = M::ID;
        let mut groups = lock(&self.routes);
        groups.entry(group_id).or_default().insert(
            message_id.as_u32(),
            Route {
                proc: Arc::new(typed(callback)),
                auto_remove,
            },
        );
        if !self.layer.contains(group_id) {
            self.layer
                .register(group_id, Self::group_proc(&self.routes, self.layer.handle(), group_id), false);
        }
        debug!(target: TARGET, group_id, %message_id, auto_remove, "group handler registered");
        self
    }

    /// Forget every callback of `group_id`.
    pub fn remove_group_handler(&self, group_id: GroupId) -> &Self {
        lock(&self.routes).remove(&group_id);
        self.layer.remove(group_id);
        self
    }

    /// True if `group_id` has at least one callback.
    pub fn has_group_handler(&self, group_id: GroupId) -> bool {
        self.layer.contains(group_id) && lock(&self.routes).contains_key(&group_id)
    }
}
