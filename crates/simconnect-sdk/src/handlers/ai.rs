//! Creating and removing AI objects.

use simconnect_models::{AssignedObjectIdMessage, InitPosition, RawMessage, RecvId, SimObjectId};
use tracing::{debug, info};

use crate::connection::Connection;
use crate::correlation::CorrelationLayer;
use crate::dispatch::Dispatcher;
use crate::error::HostResult;
use crate::handlers::simobject_repository::SimObjectInfo;
use crate::handlers::{once, send_registered};
use crate::request::Request;
use crate::transport::Verb;

const TARGET: &str = "simconnect::ai";

fn request_id(message: &RawMessage) -> Option<u32> {
    message.body_u32(0)
}

/// Creates AI objects and reports the object id the host assigns.
#[derive(Debug)]
pub struct AiHandler {
    connection: Connection,
    layer: CorrelationLayer,
}

impl AiHandler {
    /// A handler enabled on `dispatcher`.
    pub fn new(dispatcher: &Dispatcher) -> Self {
        let layer = CorrelationLayer::new("ai", &[RecvId::AssignedObjectId], request_id);
        layer.enable(dispatcher);
        Self {
            connection: dispatcher.connection().clone(),
            layer,
        }
    }

    fn assigned(
        &self,
        on_assigned: impl FnOnce(SimObjectId) + Send + 'static,
        verb: impl FnOnce(u32) -> Verb,
    ) -> HostResult<Request> {
        let request_id = self.connection.next_request_id();
        self.layer.register(
            request_id,
            once(move |message: AssignedObjectIdMessage| {
                info!(target: TARGET, request_id, object_id = message.object_id, "AI object created");
                on_assigned(message.object_id);
            }),
            true,
        );
        send_registered(&self.connection, &self.layer, request_id, verb(request_id))
    }

    /// Create an aircraft that flies without ATC. `on_assigned` gets the new
    /// object id.
    ///
    /// # Errors
    ///
    /// The error of the `AICreateNonATCAircraft` call.
    pub fn create_non_atc_aircraft(
        &self,
        title: &str,
        livery: &str,
        tail_number: &str,
        position: &InitPosition,
        on_assigned: impl FnOnce(SimObjectId) + Send + 'static,
    ) -> HostResult<Request> {
        debug!(target: TARGET, title, livery, tail_number, "creating non-ATC aircraft");
        self.assigned(on_assigned, |request_id| Verb::AiCreateNonAtcAircraft {
            title: title.to_string(),
            livery: livery.to_string(),
            tail_number: tail_number.to_string(),
            position: *position,
            request_id,
        })
    }

    /// Create a catalog entry as a non-ATC aircraft.
    ///
    /// # Errors
    ///
    /// As [`create_non_atc_aircraft`](Self::create_non_atc_aircraft).
    pub fn create_from_catalog(
        &self,
        info: &SimObjectInfo,
        tail_number: &str,
        position: &InitPosition,
        on_assigned: impl FnOnce(SimObjectId) + Send + 'static,
    ) -> HostResult<Request> {
        debug!(target: TARGET, id = %info.id, tag = ?info.tag, "spawning catalog entry");
        self.create_non_atc_aircraft(
            &info.title,
            info.livery.as_deref().unwrap_or_default(),
            tail_number,
            position,
            on_assigned,
        )
    }

    /// Create an aircraft parked at `airport` under ATC control.
    ///
    /// # Errors
    ///
    /// The error of the `AICreateParkedATCAircraft` call.
    pub fn create_parked_atc_aircraft(
        &self,
        title: &str,
        livery: &str,
        tail_number: &str,
        airport: &str,
        on_assigned: impl FnOnce(SimObjectId) + Send + 'static,
    ) -> HostResult<Request> {
        debug!(target: TARGET, title, livery, tail_number, airport, "creating parked ATC aircraft");
        self.assigned(on_assigned, |request_id| Verb::AiCreateParkedAtcAircraft {
            title: title.to_string(),
            livery: livery.to_string(),
            tail_number: tail_number.to_string(),
            airport: airport.to_string(),
            request_id,
        })
    }

    /// Remove an AI object created by this client.
    ///
    /// # Errors
    ///
    /// The error of the `AIRemoveObject` call.
    pub fn remove_object(&self, object_id: SimObjectId) -> HostResult<()> {
        let request_id = self.connection.next_request_id();
        self.connection.send(Verb::AiRemoveObject { object_id, request_id })?;
        debug!(target: TARGET, object_id, "AI object removal requested");
        Ok(())
    }

    /// Number of creations still waiting for an object id.
    pub fn pending(&self) -> usize {
        self.layer.len()
    }
}
