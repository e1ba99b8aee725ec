//! Specialised handlers, one per request family, plus the SimObject
//! catalog the AI handler spawns from.
//!
//! Each handler owns a [`CorrelationLayer`](crate::correlation::CorrelationLayer)
//! enabled on the dispatcher it was built with, and disables it again when
//! dropped. Requests follow the same steps everywhere: take a fresh id from
//! the connection, register the callback under that id, send the host call,
//! and hand back a [`Request`] whose teardown undoes the registration.

pub mod ai;
pub mod enumeration;
pub mod event;
pub mod event_group;
pub mod facility;
pub mod facility_definition;
pub mod input_group;
pub mod notification_group;
pub mod simobject_data;
pub mod simobject_repository;
pub mod system_event;
pub mod system_state;

pub use ai::AiHandler;
pub use enumeration::{DoneCallback, LiveryMap, SimObjectEnumerationHandler};
pub use event::EventHandler;
pub use event_group::EventGroupHandler;
pub use facility::{FacilityCallbacks, FacilityHandler, FacilityListKind};
pub use facility_definition::{FacilityDefinitionBuilder, FacilityScope};
pub use input_group::InputGroup;
pub use notification_group::NotificationGroup;
pub use simobject_data::SimObjectDataHandler;
pub use simobject_repository::{SimObjectInfo, SimObjectRepository};
pub use system_event::SystemEventHandler;
pub use system_state::{SystemStateHandler, SystemStateName};

use std::sync::{Mutex, PoisonError};

use simconnect_models::{RawMessage, WireMessage};
use tracing::warn;

use crate::connection::Connection;
use crate::correlation::CorrelationLayer;
use crate::error::HostResult;
use crate::request::Request;
use crate::transport::Verb;

const TARGET: &str = "simconnect::handlers";

/// Wrap a typed callback as a raw message callback. Messages that do not
/// decode as `M` are logged and skipped.
pub(crate) fn typed<M>(callback: impl Fn(&M) + Send + Sync + 'static) -> impl Fn(&RawMessage) + Send + Sync + 'static
where
    M: WireMessage + 'static,
{
    move |raw: &RawMessage| match raw.decode::<M>() {
        Ok(message) => callback(&message),
        Err(err) => warn!(target: TARGET, kind = %M::ID, error = %err, "dropping undecodable message"),
    }
}

/// Wrap a callback that may run only once. Later calls are ignored.
pub(crate) fn once<M>(callback: impl FnOnce(M) + Send + 'static) -> impl Fn(&RawMessage) + Send + Sync + 'static
where
    M: WireMessage + 'static,
{
    let slot = Mutex::new(Some(callback));
    move |raw: &RawMessage| {
        let message = match raw.decode::<M>() {
            Ok(message) => message,
            Err(err) => {
                warn!(target: TARGET, kind = %M::ID, error = %err, "dropping undecodable message");
                return;
            }
        };
        let callback = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(callback) = callback {
            callback(message);
        }
    }
}

/// Send `verb` for a callback already registered under `request_id`. When
/// the call fails the registration is dropped again.
pub(crate) fn send_registered(
    connection: &Connection,
    layer: &CorrelationLayer,
    request_id: u32,
    verb: Verb,
) -> HostResult<Request> {
    match connection.send(verb) {
        Ok(_) => Ok(layer.request(request_id)),
        Err(err) => {
            layer.remove(request_id);
            Err(err)
        }
    }
}
