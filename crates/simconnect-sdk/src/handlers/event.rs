//! Client events: mapping them to simulator events and firing them.

use simconnect_models::{object_id, transmit_flag, GroupId, Priority, SimObjectId};
use tracing::debug;

use crate::connection::Connection;
use crate::dispatch::Dispatcher;
use crate::error::HostResult;
use crate::events::Event;
use crate::handlers::input_group::InputGroup;
use crate::handlers::notification_group::NotificationGroup;
use crate::transport::Verb;

const TARGET: &str = "simconnect::event";

/// Maps and transmits client events, and creates the groups that receive
/// them.
#[derive(Debug, Clone)]
pub struct EventHandler {
    connection: Connection,
}

impl EventHandler {
    /// A handler for the connection behind `dispatcher`.
    pub fn new(dispatcher: &Dispatcher) -> Self {
        Self::for_connection(dispatcher.connection().clone())
    }

    /// A handler for `connection`.
    pub fn for_connection(connection: Connection) -> Self {
        Self { connection }
    }

    /// The connection events are sent on.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Map `event` to the simulator event with the same name. Mapping is
    /// sent once per event and session.
    ///
    /// # Errors
    ///
    /// The error of the `MapClientEventToSimEvent` call.
    pub fn map_event(&self, event: &Event) -> HostResult<()> {
        self.connection.map_client_event(event)
    }

    /// Fire `event` at the user aircraft with the highest priority.
    ///
    /// # Errors
    ///
    /// The error of the mapping or of the `TransmitClientEvent` call.
    pub fn send_event(&self, event: &Event, data: u32) -> HostResult<()> {
        self.send_event_to_object(object_id::USER, event, data)
    }

    /// Fire `event` at `object_id` with the highest priority.
    ///
    /// # Errors
    ///
    /// The error of the mapping or of the `TransmitClientEvent` call.
    pub fn send_event_to_object(&self, object_id: SimObjectId, event: &Event, data: u32) -> HostResult<()> {
        self.transmit(
            object_id,
            event,
            Priority::Highest.value(),
            transmit_flag::GROUP_ID_IS_PRIORITY,
            [data, 0, 0, 0, 0],
        )
    }

    /// Fire `event` at the user aircraft through notification group
    /// `group_id`.
    ///
    /// # Errors
    ///
    /// The error of the mapping or of the `TransmitClientEvent` call.
    pub fn send_event_to_group(&self, event: &Event, group_id: GroupId, data: u32) -> HostResult<()> {
        self.transmit(object_id::USER, event, group_id, transmit_flag::DEFAULT, [data, 0, 0, 0, 0])
    }

    /// Fire `event` with up to five parameters. `group_id` is a group id,
    /// or a priority when `flags` has
    /// [`GROUP_ID_IS_PRIORITY`](simconnect_models::transmit_flag::GROUP_ID_IS_PRIORITY).
    ///
    /// # Errors
    ///
    /// The error of the mapping or of the `TransmitClientEvent` call.
    pub fn transmit(
        &self,
        object_id: SimObjectId,
        event: &Event,
        group_id: GroupId,
        flags: u32,
        data: [u32; 5],
    ) -> HostResult<()> {
        self.map_event(event)?;
        self.connection.send(Verb::TransmitClientEvent {
            object_id,
            event_id: event.id(),
            data,
            group_id,
            flags,
        })?;
        debug!(target: TARGET, %event, object_id, group_id, flags, "event transmitted");
        Ok(())
    }

    /// A new notification group. Nothing is sent until it is configured.
    pub fn notification_group(&self) -> NotificationGroup {
        NotificationGroup::new(self.clone())
    }

    /// A new input group. Nothing is sent until the first binding.
    pub fn input_group(&self) -> InputGroup {
        InputGroup::new(self.clone())
    }
}
