//! One-shot queries of the host's system state.

use serde::{Deserialize, Serialize};
use simconnect_models::{RawMessage, RecvId, SystemStateMessage};
use tracing::debug;

use crate::connection::Connection;
use crate::correlation::CorrelationLayer;
use crate::dispatch::Dispatcher;
use crate::error::HostResult;
use crate::handlers::{once, send_registered};
use crate::request::Request;
use crate::transport::Verb;

const TARGET: &str = "simconnect::system_state";

/// System states the host answers.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum SystemStateName {
    /// Path of the loaded aircraft (string).
    AircraftLoaded,
    /// Whether a dialog is open (bool).
    DialogMode,
    /// Path of the loaded flight (string).
    FlightLoaded,
    /// Path of the active flight plan (string).
    FlightPlan,
    /// Whether the user is in control (bool).
    Sim,
}

fn request_id(message: &RawMessage) -> Option<u32> {
    message.body_u32(0)
}

/// Requests system state values and routes each reply to its callback.
///
/// Every callback runs at most once and is forgotten afterwards. Unknown
/// state names get no reply; the host reports them with an EXCEPTION
/// message instead.
#[derive(Debug)]
pub struct SystemStateHandler {
    connection: Connection,
    layer: CorrelationLayer,
}

impl SystemStateHandler {
    /// A handler enabled on `dispatcher`.
    pub fn new(dispatcher: &Dispatcher) -> Self {
        let layer = CorrelationLayer::new("system_state", &[RecvId::SystemState], request_id);
        layer.enable(dispatcher);
        Self {
            connection: dispatcher.connection().clone(),
            layer,
        }
    }

    /// Ask for `state` and pass the whole reply to `on_reply`.
    ///
    /// # Errors
    ///
    /// The error of the `RequestSystemState` call.
    pub fn request(
        &self,
        state: impl AsRef<str>,
        on_reply: impl FnOnce(SystemStateMessage) + Send + 'static,
    ) -> HostResult<Request> {
        let state = state.as_ref();
        let request_id = self.connection.next_request_id();
        self.layer.register(request_id, once(on_reply), true);
        debug!(target: TARGET, request_id, state, "requesting system state");
        send_registered(
            &self.connection,
            &self.layer,
            request_id,
            Verb::RequestSystemState {
                request_id,
                state: state.to_string(),
            },
        )
    }

    /// Ask for a boolean state such as [`SystemStateName::Sim`].
    ///
    /// # Errors
    ///
    /// The error of the `RequestSystemState` call.
    pub fn request_bool(
        &self,
        state: impl AsRef<str>,
        on_value: impl FnOnce(bool) + Send + 'static,
    ) -> HostResult<Request> {
        self.request(state, move |reply| on_value(reply.integer != 0))
    }

    /// Ask for a text state such as [`SystemStateName::AircraftLoaded`].
    ///
    /// # Errors
    ///
    /// The error of the `RequestSystemState` call.
    pub fn request_string(
        &self,
        state: impl AsRef<str>,
        on_value: impl FnOnce(String) + Send + 'static,
    ) -> HostResult<Request> {
        self.request(state, move |reply| on_value(reply.string))
    }

    /// Ask for a floating point state.
    ///
    /// # Errors
    ///
    /// The error of the `RequestSystemState` call.
    pub fn request_float(
        &self,
        state: impl AsRef<str>,
        on_value: impl FnOnce(f32) + Send + 'static,
    ) -> HostResult<Request> {
        self.request(state, move |reply| on_value(reply.float))
    }

    /// Number of requests still waiting for a reply.
    pub fn pending(&self) -> usize {
        self.layer.len()
    }
}
