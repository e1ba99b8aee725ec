//! Subscriptions to events the host raises by itself.

use simconnect_models::{EventVariant, RawMessage, RecvId};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::correlation::CorrelationLayer;
use crate::dispatch::Dispatcher;
use crate::error::HostResult;
use crate::events::Event;
use crate::handlers::typed;
use crate::request::Request;
use crate::transport::Verb;

const TARGET: &str = "simconnect::system_event";

fn event_id(message: &RawMessage) -> Option<u32> {
    message.body_u32(1)
}

/// Subscribes to system events and calls a typed callback for each one.
///
/// The message type `M` must be the record the event arrives as:
/// [`EventMessage`](simconnect_models::EventMessage) for most events,
/// [`EventFilenameMessage`](simconnect_models::EventFilenameMessage) for
/// the load and save events,
/// [`EventObjectAddRemoveMessage`](simconnect_models::EventObjectAddRemoveMessage)
/// for `ObjectAdded`/`ObjectRemoved` and
/// [`EventFrameMessage`](simconnect_models::EventFrameMessage) for `Frame`
/// and `PauseFrame`.
#[derive(Debug)]
pub struct SystemEventHandler {
    connection: Connection,
    layer: CorrelationLayer,
}

impl SystemEventHandler {
    /// A handler enabled on `dispatcher`.
    pub fn new(dispatcher: &Dispatcher) -> Self {
        let layer = CorrelationLayer::new(
            "system_event",
            &[
                RecvId::Event,
                RecvId::EventFilename,
                RecvId::EventObjectAddRemove,
                RecvId::EventFrame,
            ],
            event_id,
        );
        layer.enable(dispatcher);
        Self {
            connection: dispatcher.connection().clone(),
            layer,
        }
    }

    /// Subscribe to `event`. The subscription lasts until the returned
    /// request is dropped, which also unsubscribes on the host.
    ///
    /// # Errors
    ///
    /// The error of the `SubscribeToSystemEvent` call.
    pub fn subscribe<M>(
        &self,
        event: impl Into<Event>,
        callback: impl Fn(&M) + Send + Sync + 'static,
    ) -> HostResult<Request>
    where
        M: EventVariant + 'static,
    {
        let event = event.into();
        let event_id = event.id();
        self.layer.register(event_id, typed(callback), false);
        if let Err(err) = self.connection.send(Verb::SubscribeToSystemEvent {
            event_id,
            name: event.name().to_string(),
        }) {
            self.layer.remove(event_id);
            return Err(err);
        }
        debug!(target: TARGET, %event, "subscribed");

        let connection = self.connection.downgrade();
        let handle = self.layer.handle();
        Ok(Request::new(event_id, move || {
            handle.remove(event_id);
            let Some(connection) = connection.upgrade() else {
                return;
            };
            if !connection.is_open() {
                return;
            }
            match connection.send(Verb::UnsubscribeFromSystemEvent { event_id }) {
                Ok(_) => debug!(target: TARGET, event_id, "unsubscribed"),
                Err(err) => warn!(target: TARGET, event_id, error = %err, "unsubscribe failed"),
            }
        }))
    }

    /// Pause (`on == false`) or resume delivery of a subscribed event
    /// without dropping the subscription.
    ///
    /// # Errors
    ///
    /// The error of the `SetSystemEventState` call.
    pub fn set_state(&self, event: impl Into<Event>, on: bool) -> HostResult<()> {
        let event = event.into();
        self.connection.send(Verb::SetSystemEventState {
            event_id: event.id(),
            on,
        })?;
        debug!(target: TARGET, %event, on, "system event state changed");
        Ok(())
    }

    /// True while `event` has a callback.
    pub fn is_subscribed(&self, event: impl Into<Event>) -> bool {
        self.layer.contains(event.into().id())
    }
}
