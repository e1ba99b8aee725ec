//! Enumerating the titles and liveries the host can spawn.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use simconnect_models::{RawMessage, RecvId, SimObjectLivery, SimObjectLiveryListMessage, SimObjectType};
use tracing::{debug, warn};

use crate::connection::Connection;
use crate::correlation::CorrelationLayer;
use crate::dispatch::Dispatcher;
use crate::error::HostResult;
use crate::handlers::send_registered;
use crate::request::Request;
use crate::transport::Verb;

const TARGET: &str = "simconnect::enumeration";

/// Title to liveries. The default livery shows up as an empty string.
pub type LiveryMap = BTreeMap<String, BTreeSet<String>>;

/// Callback for the end of an enumeration.
pub type DoneCallback = Box<dyn FnOnce() + Send>;

fn request_id(message: &RawMessage) -> Option<u32> {
    message.body_u32(0)
}

/// Requests SimObject and livery enumerations.
#[derive(Debug)]
pub struct SimObjectEnumerationHandler {
    connection: Connection,
    layer: CorrelationLayer,
}

impl SimObjectEnumerationHandler {
    /// A handler enabled on `dispatcher`.
    pub fn new(dispatcher: &Dispatcher) -> Self {
        let layer = CorrelationLayer::new(
            "enumeration",
            &[RecvId::EnumerateSimObjectAndLiveryList],
            request_id,
        );
        layer.enable(dispatcher);
        Self {
            connection: dispatcher.connection().clone(),
            layer,
        }
    }

    /// Enumerate every title and livery of `object_type`. `on_batch` runs
    /// per batch; `on_done` runs after the last one. An empty result still
    /// arrives as one (empty) batch.
    ///
    /// # Errors
    ///
    /// The error of the `EnumerateSimObjectsAndLiveries` call.
    pub fn enumerate(
        &self,
        object_type: SimObjectType,
        on_batch: impl FnMut(&[SimObjectLivery]) + Send + 'static,
        on_done: Option<DoneCallback>,
    ) -> HostResult<Request> {
        let request_id = self.connection.next_request_id();
        let on_batch = Mutex::new(on_batch);
        let on_done = Mutex::new(on_done);
        let handle = self.layer.handle();

        self.layer.register(
            request_id,
            move |raw: &RawMessage| {
                let message = match raw.decode::<SimObjectLiveryListMessage>() {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(target: TARGET, request_id, error = %err, "undecodable livery list");
                        return;
                    }
                };
                debug!(
                    target: TARGET,
                    request_id,
                    entry = message.header.entry_number,
                    out_of = message.header.out_of,
                    items = message.items.len(),
                    "livery batch"
                );
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
        debug!(target: TARGET, request_id, %object_type, "enumerating liveries");
        send_registered(
            &self.connection,
            &self.layer,
            request_id,
            Verb::EnumerateSimObjectsAndLiveries {
                request_id,
                object_type,
            },
        )
    }

    /// Enumerate `object_type` and hand the complete title to livery map
    /// to `on_complete` once the last batch arrived.
    ///
    /// # Errors
    ///
    /// The error of the `EnumerateSimObjectsAndLiveries` call.
    pub fn enumerate_all(
        &self,
        object_type: SimObjectType,
        on_complete: impl FnOnce(LiveryMap) + Send + 'static,
    ) -> HostResult<Request> {
        let collected = Arc::new(Mutex::new(LiveryMap::new()));
        let sink = Arc::clone(&collected);
        self.enumerate(
            object_type,
            move |batch| {
                let mut map = sink.lock().unwrap_or_else(PoisonError::into_inner);
                for item in batch {
                    map.entry(item.title.clone()).or_default().insert(item.livery.clone());
                }
            },
            Some(Box::new(move || {
                let map = std::mem::take(&mut *collected.lock().unwrap_or_else(PoisonError::into_inner));
                on_complete(map);
            })),
        )
    }
}
