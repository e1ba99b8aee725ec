//! Notification groups: sets of client events delivered with one priority.
//!
//! Configuration calls consume the group and hand it back inside a
//! [`HostResult`], so a chain stops at the first failing host call:
//!
//! ```
//! # use simconnect_sdk::handlers::EventHandler;
//! # use simconnect_sdk::{Event, HostResult};
//! # fn setup(events: &EventHandler) -> HostResult<()> {
//! let group = events
//!     .notification_group()
//!     .with_highest_priority()?
//!     .add_event(&Event::get("BRAKES"))?
//!     .add_maskable_event(&Event::get("PARKING_BRAKES"))?;
//! # let _ = group;
//! # Ok(())
//! # }
//! ```

use simconnect_models::{transmit_flag, GroupId, Priority, SimObjectId};
use tracing::debug;

use crate::error::HostResult;
use crate::events::Event;
use crate::handlers::event::EventHandler;
use crate::transport::Verb;

const TARGET: &str = "simconnect::notification_group";

/// A notification group on one connection.
#[derive(Debug, Clone)]
pub struct NotificationGroup {
    events: EventHandler,
    id: GroupId,
    priority: Option<Priority>,
}

impl NotificationGroup {
    pub(crate) fn new(events: EventHandler) -> Self {
        let id = events.connection().next_notification_group_id();
        Self {
            events,
            id,
            priority: None,
        }
    }

    /// The group id.
    pub fn id(&self) -> GroupId {
        self.id
    }

    /// The priority set on the host, or the default.
    pub fn priority(&self) -> Priority {
        self.priority.unwrap_or_default()
    }

    /// True once a priority has been sent.
    pub fn has_priority(&self) -> bool {
        self.priority.is_some()
    }

    /// Send `priority` for this group.
    ///
    /// # Errors
    ///
    /// The error of the `SetNotificationGroupPriority` call.
    pub fn with_priority(mut self, priority: Priority) -> HostResult<Self> {
        self.events.connection().send(Verb::SetNotificationGroupPriority {
            group_id: self.id,
            priority: priority.value(),
        })?;
        debug!(target: TARGET, group_id = self.id, %priority, "priority set");
        self.priority = Some(priority);
        Ok(self)
    }

    /// [`with_priority`](Self::with_priority) with [`Priority::Highest`].
    ///
    /// # Errors
    ///
    /// The error of the `SetNotificationGroupPriority` call.
    pub fn with_highest_priority(self) -> HostResult<Self> {
        self.with_priority(Priority::Highest)
    }

    /// [`with_priority`](Self::with_priority) with [`Priority::HighestMaskable`].
    ///
    /// # Errors
    ///
    /// The error of the `SetNotificationGroupPriority` call.
    pub fn with_maskable_priority(self) -> HostResult<Self> {
        self.with_priority(Priority::HighestMaskable)
    }

    /// [`with_priority`](Self::with_priority) with [`Priority::Standard`].
    ///
    /// # Errors
    ///
    /// The error of the `SetNotificationGroupPriority` call.
    pub fn with_standard_priority(self) -> HostResult<Self> {
        self.with_priority(Priority::Standard)
    }

    /// [`with_priority`](Self::with_priority) with [`Priority::Default`].
    ///
    /// # Errors
    ///
    /// The error of the `SetNotificationGroupPriority` call.
    pub fn with_default_priority(self) -> HostResult<Self> {
        self.with_priority(Priority::Default)
    }

    /// [`with_priority`](Self::with_priority) with [`Priority::Lowest`].
    ///
    /// # Errors
    ///
    /// The error of the `SetNotificationGroupPriority` call.
    pub fn with_lowest_priority(self) -> HostResult<Self> {
        self.with_priority(Priority::Lowest)
    }

    fn add(self, event: &Event, maskable: bool) -> HostResult<Self> {
        let group = if self.has_priority() {
            self
        } else {
            self.with_default_priority()?
        };
        group.events.map_event(event)?;
        group.events.connection().send(Verb::AddClientEventToNotificationGroup {
            group_id: group.id,
            event_id: event.id(),
            maskable,
        })?;
        debug!(target: TARGET, group_id = group.id, %event, maskable, "event added");
        Ok(group)
    }

    /// Map `event` and add it to the group. The first event sets the
    /// default priority if none was chosen.
    ///
    /// # Errors
    ///
    /// The error of the first failing host call.
    pub fn add_event(self, event: &Event) -> HostResult<Self> {
        self.add(event, false)
    }

    /// Like [`add_event`](Self::add_event), but this client may mask the
    /// event from lower priority groups.
    ///
    /// # Errors
    ///
    /// The error of the first failing host call.
    pub fn add_maskable_event(self, event: &Event) -> HostResult<Self> {
        self.add(event, true)
    }

    /// Remove `event` from the group.
    ///
    /// # Errors
    ///
    /// The error of the `RemoveClientEvent` call.
    pub fn remove_event(self, event: &Event) -> HostResult<Self> {
        self.events.connection().send(Verb::RemoveClientEvent {
            group_id: self.id,
            event_id: event.id(),
        })?;
        Ok(self)
    }

    /// Remove every event from the group.
    ///
    /// # Errors
    ///
    /// The error of the `ClearNotificationGroup` call.
    pub fn clear(&self) -> HostResult<()> {
        self.events
            .connection()
            .send(Verb::ClearNotificationGroup { group_id: self.id })?;
        Ok(())
    }

    /// Ask the host to deliver the events of this group held back by
    /// masking.
    ///
    /// # Errors
    ///
    /// The error of the `RequestNotificationGroup` call.
    pub fn request(&self) -> HostResult<()> {
        self.events
            .connection()
            .send(Verb::RequestNotificationGroup { group_id: self.id })?;
        Ok(())
    }

    /// Fire `event` at the user aircraft through this group.
    ///
    /// # Errors
    ///
    /// The error of the mapping or of the `TransmitClientEvent` call.
    pub fn send_event(&self, event: &Event, data: u32) -> HostResult<()> {
        self.events.send_event_to_group(event, self.id, data)
    }

    /// Fire `event` at `object_id` through this group.
    ///
    /// # Errors
    ///
    /// The error of the mapping or of the `TransmitClientEvent` call.
    pub fn send_event_to_object(&self, object_id: SimObjectId, event: &Event, data: u32) -> HostResult<()> {
        self.events.transmit(
            object_id,
            event,
            self.id,
            transmit_flag::DEFAULT,
            [data, 0, 0, 0, 0],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use crate::testing::connected;

    #[test]
    fn first_event_implies_default_priority() {
        let (transport, dispatcher) = connected();
        let events = EventHandler::new(&dispatcher);
        let brakes = Event::get("BRAKES");
        let group = events.notification_group().add_event(&brakes).unwrap();
        assert!(group.has_priority());
        assert_eq!(group.priority(), Priority::Default);

        let names: Vec<&str> = transport.sent().iter().map(Verb::name).collect();
        assert_eq!(
            names,
            vec![
                "SetNotificationGroupPriority",
                "MapClientEventToSimEvent",
                "AddClientEventToNotificationGroup",
            ]
        );
        assert_eq!(
            transport.sent_named("SetNotificationGroupPriority"),
            vec![Verb::SetNotificationGroupPriority {
                group_id: group.id(),
                priority: Priority::Default.value(),
            }]
        );
    }

    #[test]
    fn explicit_priority_is_sent_once() {
        let (transport, dispatcher) = connected();
        let events = EventHandler::new(&dispatcher);
        let group = events
            .notification_group()
            .with_highest_priority()
            .unwrap()
            .add_event(&Event::get("FLAPS_UP"))
            .unwrap()
            .add_maskable_event(&Event::get("FLAPS_DOWN"))
            .unwrap();
        assert_eq!(group.priority(), Priority::Highest);
        assert_eq!(transport.sent_named("SetNotificationGroupPriority").len(), 1);
        let added = transport.sent_named("AddClientEventToNotificationGroup");
        assert!(matches!(
            added.as_slice(),
            [
                Verb::AddClientEventToNotificationGroup { maskable: false, .. },
                Verb::AddClientEventToNotificationGroup { maskable: true, .. },
            ]
        ));
    }

    #[test]
    fn groups_get_distinct_ids() {
        let (_transport, dispatcher) = connected();
        let events = EventHandler::new(&dispatcher);
        let first = events.notification_group();
        let second = events.notification_group();
        assert_ne!(first.id(), second.id());
        assert!(!first.has_priority());
        assert_eq!(first.priority(), Priority::Default);
    }

    #[test]
    fn chain_stops_at_first_failure() {
        let (transport, dispatcher) = connected();
        transport.fail("SetNotificationGroupPriority");
        let events = EventHandler::new(&dispatcher);
        let err = events
            .notification_group()
            .add_event(&Event::get("notification_group::chain"))
            .unwrap_err();
        assert!(matches!(err, SdkError::Transport { .. }));
        assert!(transport.sent_named("AddClientEventToNotificationGroup").is_empty());
    }

    #[test]
    fn remove_clear_and_request() {
        let (transport, dispatcher) = connected();
        let events = EventHandler::new(&dispatcher);
        let event = Event::get("notification_group::remove");
        let group = events
            .notification_group()
            .add_event(&event)
            .unwrap()
            .remove_event(&event)
            .unwrap();
        group.clear().unwrap();
        group.request().unwrap();
        let id = group.id();
        assert_eq!(
            transport.sent_named("RemoveClientEvent"),
            vec![Verb::RemoveClientEvent {
                group_id: id,
                event_id: event.id(),
            }]
        );
        assert_eq!(
            transport.sent_named("ClearNotificationGroup"),
            vec![Verb::ClearNotificationGroup { group_id: id }]
        );
        assert_eq!(
            transport.sent_named("RequestNotificationGroup"),
            vec![Verb::RequestNotificationGroup { group_id: id }]
        );
    }
}
