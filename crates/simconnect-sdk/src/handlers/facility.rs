//! Facility data and facility list requests.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use simconnect_models::{
    FacilityAirport, FacilityDataEndMessage, FacilityDataMessage, FacilityDefinitionId,
    FacilityListScope, FacilityListType, FacilityMinimalListMessage, FacilityNdb, FacilityVor,
    FacilityWaypoint, ListItem, ListMessage, RawMessage, RecvId,
};
use tracing::{debug, error, warn};

use crate::connection::Connection;
use crate::correlation::CorrelationLayer;
use crate::dispatch::Dispatcher;
use crate::error::HostResult;
use crate::handlers::facility_definition::FacilityDefinitionBuilder;
use crate::handlers::send_registered;
use crate::request::Request;
use crate::transport::Verb;

const TARGET: &str = "simconnect::facility";

type DataCallback = Box<dyn Fn(&FacilityDataMessage) + Send + Sync>;
type EndCallback = Box<dyn FnOnce() + Send>;
type ConflictCallback = Box<dyn FnOnce(&FacilityMinimalListMessage) + Send>;

/// Callbacks for one facility data request. Any of them may be left out;
/// a message arriving for a missing callback is logged.
#[derive(Default)]
pub struct FacilityCallbacks {
    on_data: Option<DataCallback>,
    on_end: Option<EndCallback>,
    on_conflict: Option<ConflictCallback>,
}

impl fmt::Debug for FacilityCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FacilityCallbacks")
            .field("on_data", &self.on_data.is_some())
            .field("on_end", &self.on_end.is_some())
            .field("on_conflict", &self.on_conflict.is_some())
            .finish()
    }
}

impl FacilityCallbacks {
    /// No callbacks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every data record; a facility with children sends several.
    #[must_use]
    pub fn on_data(mut self, callback: impl Fn(&FacilityDataMessage) + Send + Sync + 'static) -> Self {
        self.on_data = Some(Box::new(callback));
        self
    }

    /// Called once when the host has sent everything.
    #[must_use]
    pub fn on_end(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_end = Some(Box::new(callback));
        self
    }

    /// Called instead of the data callback when the ICAO and region match
    /// more than one facility. Receives the candidates.
    #[must_use]
    pub fn on_conflict(mut self, callback: impl FnOnce(&FacilityMinimalListMessage) + Send + 'static) -> Self {
        self.on_conflict = Some(Box::new(callback));
        self
    }
}

/// A facility family that can be listed with
/// [`FacilityHandler::request_facilities_list`].
pub trait FacilityListKind: ListItem + Send + 'static {
    /// The family requested from the host.
    const LIST_TYPE: FacilityListType;
}

impl FacilityListKind for FacilityAirport {
    const LIST_TYPE: FacilityListType = FacilityListType::Airport;
}

impl FacilityListKind for FacilityWaypoint {
    const LIST_TYPE: FacilityListType = FacilityListType::Waypoint;
}

impl FacilityListKind for FacilityNdb {
    const LIST_TYPE: FacilityListType = FacilityListType::Ndb;
}

impl FacilityListKind for FacilityVor {
    const LIST_TYPE: FacilityListType = FacilityListType::Vor;
}

fn data_request_id(message: &RawMessage) -> Option<u32> {
    match message.id()? {
        // user_request_id; the other two records start with request_id.
        RecvId::FacilityData | RecvId::FacilityDataEnd | RecvId::FacilityMinimalList => message.body_u32(0),
        _ => None,
    }
}

fn list_request_id(message: &RawMessage) -> Option<u32> {
    message.body_u32(0)
}

/// Defines facility layouts, requests facility data, and lists facilities.
#[derive(Debug)]
pub struct FacilityHandler {
    connection: Connection,
    data: CorrelationLayer,
    lists: CorrelationLayer,
}

impl FacilityHandler {
    /// A handler enabled on `dispatcher`.
    pub fn new(dispatcher: &Dispatcher) -> Self {
        let data = CorrelationLayer::new(
            "facility",
            &[RecvId::FacilityData, RecvId::FacilityDataEnd, RecvId::FacilityMinimalList],
            data_request_id,
        );
        let lists = CorrelationLayer::new(
            "facility_list",
            &[RecvId::AirportList, RecvId::VorList, RecvId::NdbList, RecvId::WaypointList],
            list_request_id,
        );
        data.enable(dispatcher);
        lists.enable(dispatcher);
        Self {
            connection: dispatcher.connection().clone(),
            data,
            lists,
        }
    }

    /// Send the fields of `builder` to the host as a new facility
    /// definition and return its id.
    ///
    /// # Errors
    ///
    /// [`SdkError::FailedAssertion`](crate::SdkError::FailedAssertion) for
    /// a malformed definition, or the first failing
    /// `AddToFacilityDefinition` call.
    pub fn build_definition(&self, builder: &FacilityDefinitionBuilder) -> HostResult<FacilityDefinitionId> {
        let fields = builder.finish()?;
        let define_id = self.connection.next_facility_definition_id();
        for field in fields {
            if let Err(err) = self.connection.send(Verb::AddToFacilityDefinition {
                define_id,
                field: field.clone(),
            }) {
                error!(target: TARGET, define_id, field = %field, error = %err, "failed to add field to facility definition");
                return Err(err);
            }
            debug!(target: TARGET, define_id, field = %field, "added field to facility definition");
        }
        Ok(define_id)
    }

    /// Request the facility `icao` (optionally narrowed by `region`) laid
    /// out by `define_id`.
    ///
    /// # Errors
    ///
    /// The error of the `RequestFacilityData` call.
    pub fn request_facility_data(
        &self,
        define_id: FacilityDefinitionId,
        icao: &str,
        region: &str,
        callbacks: FacilityCallbacks,
    ) -> HostResult<Request> {
        let request_id = self.connection.next_request_id();
        let FacilityCallbacks {
            on_data,
            on_end,
            on_conflict,
        } = callbacks;
        let on_end = Mutex::new(on_end);
        let on_conflict = Mutex::new(on_conflict);
        let handle = self.data.handle();

        self.data.register(
            request_id,
            move |raw: &RawMessage| match raw.id() {
                Some(RecvId::FacilityData) => match raw.decode::<FacilityDataMessage>() {
                    Ok(message) => match &on_data {
                        Some(on_data) => {
                            debug!(
                                target: TARGET,
                                request_id,
                                data_type = message.data_type,
                                unique_id = message.unique_request_id,
                                parent_id = message.parent_unique_request_id,
                                "facility data"
                            );
                            on_data(&message);
                        }
                        None => warn!(target: TARGET, request_id, "facility data arrived without a data callback"),
                    },
                    Err(err) => warn!(target: TARGET, request_id, error = %err, "undecodable facility data"),
                },
                Some(RecvId::FacilityDataEnd) => {
                    let callback = on_end.lock().unwrap_or_else(PoisonError::into_inner).take();
                    handle.remove(request_id);
                    match callback {
                        Some(on_end) => {
                            debug!(target: TARGET, request_id, "facility data complete");
                            on_end();
                        }
                        None => warn!(target: TARGET, request_id, "facility data ended without an end callback"),
                    }
                }
                Some(RecvId::FacilityMinimalList) => match raw.decode::<FacilityMinimalListMessage>() {
                    Ok(message) => {
                        let callback = on_conflict.lock().unwrap_or_else(PoisonError::into_inner).take();
                        match callback {
                            Some(on_conflict) => on_conflict(&message),
                            None => warn!(
                                target: TARGET,
                                request_id,
                                candidates = message.items.len(),
                                "ambiguous facility without a conflict callback"
                            ),
                        }
                    }
                    Err(err) => warn!(target: TARGET, request_id, error = %err, "undecodable facility list"),
                },
                _ => warn!(target: TARGET, request_id, message_id = raw.raw_id(), "unexpected message for facility request"),
            },
            false,
        );
        debug!(target: TARGET, request_id, define_id, icao, region, "requesting facility data");
        send_registered(
            &self.connection,
            &self.data,
            request_id,
            Verb::RequestFacilityData {
                define_id,
                request_id,
                icao: icao.to_string(),
                region: region.to_string(),
            },
        )
    }

    /// List every facility of kind `I` in `scope`. `on_batch` runs once
    /// per batch the host sends, then `on_done` runs once.
    ///
    /// # Errors
    ///
    /// The error of the `RequestFacilitiesList` call.
    pub fn request_facilities_list<I: FacilityListKind>(
        &self,
        scope: FacilityListScope,
        on_batch: impl FnMut(&[I]) + Send + 'static,
        on_done: impl FnOnce() + Send + 'static,
    ) -> HostResult<Request> {
        let request_id = self.connection.next_request_id();
        let on_batch = Mutex::new(on_batch);
        let on_done = Mutex::new(Some(on_done));
        let handle = self.lists.handle();

        self.lists.register(
            request_id,
            move |raw: &RawMessage| {
                let message = match raw.decode::<ListMessage<I>>() {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(target: TARGET, request_id, error = %err, "undecodable facility list");
                        return;
                    }
                };
                {
                    let mut batch = on_batch.lock().unwrap_or_else(PoisonError::into_inner);
                    (*batch)(&message.items);
                }
                if message.header.is_last() {
                    handle.remove(request_id);
                    let done = on_done.lock().unwrap_or_else(PoisonError::into_inner).take();
                    if let Some(done) = done {
                        done();
                    }
                }
            },
            false,
        );
        let list_type = I::LIST_TYPE;
        debug!(target: TARGET, request_id, list = %list_type, %scope, "requesting facility list");
        send_registered(
            &self.connection,
            &self.lists,
            request_id,
            Verb::RequestFacilitiesList {
                list_type,
                scope,
                request_id,
            },
        )
    }
}
