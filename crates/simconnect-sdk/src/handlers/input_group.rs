//! Input groups: keyboard, joystick and mouse bindings that fire client
//! events.
//!
//! A group only exists on the host after its first binding. Until then the
//! priority and the enabled state are remembered and sent together with
//! that binding.

use simconnect_models::{InputGroupId, Priority, UNUSED};
use tracing::debug;

use crate::error::HostResult;
use crate::events::Event;
use crate::handlers::event::EventHandler;
use crate::transport::Verb;

const TARGET: &str = "simconnect::input_group";

/// An input group on one connection.
#[derive(Debug, Clone)]
pub struct InputGroup {
    events: EventHandler,
    id: InputGroupId,
    priority: Option<Priority>,
    enabled: bool,
    created: bool,
}

impl InputGroup {
    pub(crate) fn new(events: EventHandler) -> Self {
        let id = events.connection().next_input_group_id();
        Self {
            events,
            id,
            priority: None,
            enabled: false,
            created: false,
        }
    }

    /// The group id.
    pub fn id(&self) -> InputGroupId {
        self.id
    }

    /// The chosen priority, or the default.
    pub fn priority(&self) -> Priority {
        self.priority.unwrap_or_default()
    }

    /// True once a priority was chosen.
    pub fn has_priority(&self) -> bool {
        self.priority.is_some()
    }

    /// True if the group is (or will be) enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// True once the group exists on the host.
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Choose the priority sent when the group is created.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// [`with_priority`](Self::with_priority) with [`Priority::Highest`].
    #[must_use]
    pub fn with_highest_priority(self) -> Self {
        self.with_priority(Priority::Highest)
    }

    /// [`with_priority`](Self::with_priority) with [`Priority::HighestMaskable`].
    #[must_use]
    pub fn with_maskable_priority(self) -> Self {
        self.with_priority(Priority::HighestMaskable)
    }

    /// [`with_priority`](Self::with_priority) with [`Priority::Standard`].
    #[must_use]
    pub fn with_standard_priority(self) -> Self {
        self.with_priority(Priority::Standard)
    }

    /// [`with_priority`](Self::with_priority) with [`Priority::Default`].
    #[must_use]
    pub fn with_default_priority(self) -> Self {
        self.with_priority(Priority::Default)
    }

    /// [`with_priority`](Self::with_priority) with [`Priority::Lowest`].
    #[must_use]
    pub fn with_lowest_priority(self) -> Self {
        self.with_priority(Priority::Lowest)
    }

    fn set_state(mut self, on: bool) -> HostResult<Self> {
        self.enabled = on;
        if self.created {
            self.events
                .connection()
                .send(Verb::SetInputGroupState { group_id: self.id, on })?;
            debug!(target: TARGET, group_id = self.id, on, "input group state sent");
        }
        Ok(self)
    }

    /// Enable the group: now if it exists, otherwise on creation.
    ///
    /// # Errors
    ///
    /// The error of the `SetInputGroupState` call.
    pub fn enable(self) -> HostResult<Self> {
        self.set_state(true)
    }

    /// Disable the group: now if it exists, otherwise on creation.
    ///
    /// # Errors
    ///
    /// The error of the `SetInputGroupState` call.
    pub fn disable(self) -> HostResult<Self> {
        self.set_state(false)
    }

    fn create(mut self) -> HostResult<Self> {
        if self.created {
            return Ok(self);
        }
        let priority = *self.priority.get_or_insert_with(Priority::default);
        let connection = self.events.connection();
        connection.send(Verb::SetInputGroupPriority {
            group_id: self.id,
            priority: priority.value(),
        })?;
        connection.send(Verb::SetInputGroupState {
            group_id: self.id,
            on: self.enabled,
        })?;
        debug!(target: TARGET, group_id = self.id, %priority, enabled = self.enabled, "input group created");
        self.created = true;
        Ok(self)
    }

    /// Fire `event` when `definition` (`"Shift+K"`, `"joystick:0:button:3"`)
    /// is pressed. The first binding creates the group on the host.
    ///
    /// # Errors
    ///
    /// The error of the first failing host call; later steps are skipped.
    pub fn add_event(self, event: &Event, definition: &str) -> HostResult<Self> {
        self.add_event_with_values(event, definition, 0, None)
    }

    /// Like [`add_event`](Self::add_event) with a parameter for the press
    /// event and an optional event fired on release.
    ///
    /// # Errors
    ///
    /// The error of the first failing host call; later steps are skipped.
    pub fn add_event_with_values(
        self,
        event: &Event,
        definition: &str,
        down_value: u32,
        up: Option<(&Event, u32)>,
    ) -> HostResult<Self> {
        self.events.map_event(event)?;
        if let Some((up_event, _)) = up {
            self.events.map_event(up_event)?;
        }
        let (up_event_id, up_value) = up.map_or((UNUSED, 0), |(up_event, value)| (up_event.id(), value));
        self.events.connection().send(Verb::MapInputEventToClientEvent {
            group_id: self.id,
            definition: definition.to_string(),
            down_event_id: event.id(),
            down_value,
            up_event_id,
            up_value,
            maskable: false,
        })?;
        debug!(target: TARGET, group_id = self.id, %event, definition, "input bound");
        self.create()
    }

    /// Remove the binding for `definition`.
    ///
    /// # Errors
    ///
    /// The error of the `RemoveInputEvent` call.
    pub fn remove_event(self, definition: &str) -> HostResult<Self> {
        self.events.connection().send(Verb::RemoveInputEvent {
            group_id: self.id,
            definition: definition.to_string(),
        })?;
        Ok(self)
    }

    /// Remove every binding of the group.
    ///
    /// # Errors
    ///
    /// The error of the `ClearInputGroup` call.
    pub fn clear(&self) -> HostResult<()> {
        self.events
            .connection()
            .send(Verb::ClearInputGroup { group_id: self.id })?;
        Ok(())
    }
}
