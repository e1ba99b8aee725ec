//! Reading and writing SimObject variables through data definitions.

use std::sync::{Arc, Mutex, PoisonError};

use simconnect_models::{
    data_request_flag, DataFrequency, ModelError, Period, PeriodLimits, RawMessage, RecvId, SimObjectDataByTypeMessage,
    SimObjectDataMessage, SimObjectId, SimObjectType,
};
use tracing::{debug, trace, warn};

use crate::connection::Connection;
use crate::correlation::CorrelationLayer;
use crate::data_definition::DataDefinition;
use crate::dispatch::Dispatcher;
use crate::error::HostResult;
use crate::handlers::{send_registered, DoneCallback};
use crate::request::Request;
use crate::transport::Verb;

const TARGET: &str = "simconnect::simobject_data";

fn request_id(message: &RawMessage) -> Option<u32> {
    message.body_u32(0)
}

/// The data record inside either kind of data message.
fn record(raw: &RawMessage) -> Result<SimObjectDataMessage, ModelError> {
    if raw.id() == Some(RecvId::SimObjectDataByType) {
        raw.decode::<SimObjectDataByTypeMessage>().map(|message| message.data)
    } else {
        raw.decode::<SimObjectDataMessage>()
    }
}

/// Requests data about SimObjects and decodes it into application structs.
#[derive(Debug)]
pub struct SimObjectDataHandler {
    connection: Connection,
    layer: CorrelationLayer,
}

impl SimObjectDataHandler {
    /// A handler enabled on `dispatcher`.
    pub fn new(dispatcher: &Dispatcher) -> Self {
        let layer = CorrelationLayer::new(
            "simobject_data",
            &[RecvId::SimObjectData, RecvId::SimObjectDataByType],
            request_id,
        );
        layer.enable(dispatcher);
        Self {
            connection: dispatcher.connection().clone(),
            layer,
        }
    }

    /// Deliver `object_id`'s data to `on_data` at `frequency` until the
    /// request is dropped. Dropping it tells the host to stop.
    ///
    /// # Errors
    ///
    /// The error of registering the definition or of the
    /// `RequestDataOnSimObject` call.
    pub fn request_data<T>(
        &self,
        definition: Arc<DataDefinition<T>>,
        object_id: SimObjectId,
        frequency: DataFrequency,
        limits: PeriodLimits,
        on_data: impl Fn(T) + Send + Sync + 'static,
    ) -> HostResult<Request>
    where
        T: Default + Send + Sync + 'static,
    {
        self.request_data_with_flags(definition, object_id, frequency, limits, data_request_flag::DEFAULT, on_data)
    }

    /// [`request_data`](Self::request_data) with explicit
    /// [`data_request_flag`] bits, e.g. to only receive changed values.
    ///
    /// # Errors
    ///
    /// The error of registering the definition or of the
    /// `RequestDataOnSimObject` call.
    pub fn request_data_with_flags<T>(
        &self,
        definition: Arc<DataDefinition<T>>,
        object_id: SimObjectId,
        frequency: DataFrequency,
        limits: PeriodLimits,
        flags: u32,
        on_data: impl Fn(T) + Send + Sync + 'static,
    ) -> HostResult<Request>
    where
        T: Default + Send + Sync + 'static,
    {
        let define_id = definition.register(&self.connection)?;
        let request_id = self.connection.next_request_id();
        self.layer.register(
            request_id,
            move |raw: &RawMessage| match record(raw).and_then(|message| definition.from_bytes(&message.data)) {
                Ok(value) => on_data(value),
                Err(err) => warn!(target: TARGET, request_id, error = %err, "undecodable data record"),
            },
            frequency.period == Period::Once,
        );
        let period = frequency.period;
        debug!(target: TARGET, request_id, define_id, object_id, %period, "requesting data");
        let registered = send_registered(
            &self.connection,
            &self.layer,
            request_id,
            Verb::RequestDataOnSimObject {
                request_id,
                define_id,
                object_id,
                period,
                flags,
                origin: limits.origin,
                interval: frequency.interval,
                limit: limits.limit,
            },
        )?;
        if !frequency.is_periodic() {
            return Ok(registered);
        }

        let registered_id = registered.detach();
        let handle = self.layer.handle();
        let connection = self.connection.downgrade();
        let generation = self.connection.generation();
        Ok(Request::new(registered_id, move || {
            handle.remove(request_id);
            let Some(connection) = connection.upgrade() else {
                return;
            };
            if !connection.is_open() || connection.generation() != generation {
                return;
            }
            let stop = connection.send(Verb::RequestDataOnSimObject {
                request_id,
                define_id,
                object_id,
                period: Period::Never,
                flags: data_request_flag::DEFAULT,
                origin: 0,
                interval: 0,
                limit: 0,
            });
            match stop {
                Ok(_) => debug!(target: TARGET, request_id, "data request stopped"),
                Err(err) => warn!(target: TARGET, request_id, error = %err, "stopping data request failed"),
            }
        }))
    }

    /// Deliver `object_id`'s data a single time.
    ///
    /// # Errors
    ///
    /// The error of registering the definition or of the
    /// `RequestDataOnSimObject` call.
    pub fn request_data_once<T>(
        &self,
        definition: Arc<DataDefinition<T>>,
        object_id: SimObjectId,
        on_data: impl FnOnce(T) + Send + 'static,
    ) -> HostResult<Request>
    where
        T: Default + Send + Sync + 'static,
    {
        let slot = Mutex::new(Some(on_data));
        self.request_data(
            definition,
            object_id,
            DataFrequency::once(),
            PeriodLimits::none(),
            move |value| {
                let callback = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
                if let Some(callback) = callback {
                    callback(value);
                }
            },
        )
    }

    /// Deliver the data of every `object_type` object within
    /// `radius_meters` of the user, one record per object. `on_done` runs
    /// after the last record.
    ///
    /// # Errors
    ///
    /// The error of registering the definition or of the
    /// `RequestDataOnSimObjectType` call.
    pub fn request_data_by_type<T>(
        &self,
        definition: Arc<DataDefinition<T>>,
        object_type: SimObjectType,
        radius_meters: u32,
        on_record: impl FnMut(SimObjectId, T) + Send + 'static,
        on_done: Option<DoneCallback>,
    ) -> HostResult<Request>
    where
        T: Default + Send + Sync + 'static,
    {
        let define_id = definition.register(&self.connection)?;
        let request_id = self.connection.next_request_id();
        let on_record = Mutex::new(on_record);
        let on_done = Mutex::new(on_done);
        let handle = self.layer.handle();

        self.layer.register(
            request_id,
            move |raw: &RawMessage| {
                let message = match record(raw) {
                    Ok(message) => message,
                    Err(err) => {
                        warn!(target: TARGET, request_id, error = %err, "undecodable data record");
                        return;
                    }
                };
                trace!(
                    target: TARGET,
                    request_id,
                    entry = message.entry_number,
                    out_of = message.out_of,
                    "by-type record"
                );
                if message.out_of > 0 {
                    match definition.from_bytes(&message.data) {
                        Ok(value) => {
                            let mut on_record = on_record.lock().unwrap_or_else(PoisonError::into_inner);
                            (*on_record)(message.object_id, value);
                        }
                        Err(err) => warn!(target: TARGET, request_id, error = %err, "undecodable data record"),
                    }
                }
                if message.entry_number + 1 >= message.out_of {
                    handle.remove(request_id);
                    let done = on_done.lock().unwrap_or_else(PoisonError::into_inner).take();
                    if let Some(done) = done {
                        done();
                    }
                }
            },
            false,
        );
        debug!(target: TARGET, request_id, define_id, %object_type, radius_meters, "requesting data by type");
        send_registered(
            &self.connection,
            &self.layer,
            request_id,
            Verb::RequestDataOnSimObjectType {
                request_id,
                define_id,
                radius_meters,
                object_type,
            },
        )
    }

    /// Write `record` to `object_id`.
    ///
    /// # Errors
    ///
    /// A marshalling error, or the error of registering the definition or
    /// of the `SetDataOnSimObject` call.
    pub fn set_data<T: 'static>(&self, definition: &DataDefinition<T>, object_id: SimObjectId, record: &T) -> HostResult<()> {
        let define_id = definition.register(&self.connection)?;
        let data = definition.to_bytes(record)?;
        self.connection.send(Verb::SetDataOnSimObject {
            define_id,
            object_id,
            flags: 0,
            data,
        })?;
        debug!(target: TARGET, define_id, object_id, "data written");
        Ok(())
    }

    /// Number of data requests with a live callback.
    pub fn active(&self) -> usize {
        self.layer.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use simconnect_models::object_id;

    use super::*;
    use crate::testing::{connected, ScriptedTransport};

    #[derive(Default, Debug, Clone, PartialEq)]
    struct Altitude {
        feet: f64,
        on_ground: bool,
    }

    fn definition() -> Arc<DataDefinition<Altitude>> {
        Arc::new(
            DataDefinition::<Altitude>::new()
                .add_float64("PLANE ALTITUDE", "feet", |r| r.feet, |r, v| r.feet = v)
                .add_int32("SIM ON GROUND", "bool", |r| r.on_ground, |r, v| r.on_ground = v),
        )
    }

    fn data(request_id: u32, value: &Altitude) -> RawMessage {
        RawMessage::from_message(&SimObjectDataMessage {
            request_id,
            object_id: object_id::USER,
            define_id: 1,
            flags: 0,
            entry_number: 0,
            out_of: 1,
            define_count: 2,
            data: definition().to_bytes(value).unwrap(),
        })
    }

    fn by_type(request_id: u32, object_id: u32, entry_number: u32, out_of: u32, feet: f64) -> RawMessage {
        let data = if out_of == 0 {
            Vec::new()
        } else {
            definition()
                .to_bytes(&Altitude {
                    feet,
                    on_ground: false,
                })
                .unwrap()
        };
        RawMessage::from_message(&SimObjectDataByTypeMessage {
            data: SimObjectDataMessage {
                request_id,
                object_id,
                define_id: 1,
                flags: 0,
                entry_number,
                out_of,
                define_count: 2,
                data,
            },
        })
    }

    fn request_verbs(transport: &ScriptedTransport) -> Vec<Verb> {
        transport.sent_named("RequestDataOnSimObject")
    }

    #[test]
    fn periodic_data_until_dropped() {
        let (transport, dispatcher) = connected();
        let handler = SimObjectDataHandler::new(&dispatcher);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let request = handler
            .request_data(
                definition(),
                object_id::USER,
                DataFrequency::every(1).seconds(),
                PeriodLimits::none(),
                move |value: Altitude| sink.lock().unwrap().push(value),
            )
            .unwrap();
        assert_eq!(transport.sent_named("AddToDataDefinition").len(), 2);
        let id = request.id();

        let first = Altitude {
            feet: 1500.0,
            on_ground: false,
        };
        let second = Altitude {
            feet: 0.0,
            on_ground: true,
        };
        dispatcher.dispatch(&data(id, &first));
        dispatcher.dispatch(&data(id, &second));
        assert_eq!(*seen.lock().unwrap(), vec![first, second]);

        drop(request);
        let verbs = request_verbs(&transport);
        assert_eq!(verbs.len(), 2);
        assert!(matches!(
            &verbs[1],
            Verb::RequestDataOnSimObject { request_id, period: Period::Never, .. } if *request_id == id
        ));
        dispatcher.dispatch(&data(id, &Altitude::default()));
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert_eq!(handler.active(), 0);
    }

    #[test]
    fn definition_is_registered_once() {
        let (transport, dispatcher) = connected();
        let handler = SimObjectDataHandler::new(&dispatcher);
        let def = definition();
        let _a = handler
            .request_data(Arc::clone(&def), 0, DataFrequency::every(1).visual_frames(), PeriodLimits::none(), |_| {})
            .unwrap();
        let _b = handler
            .request_data(Arc::clone(&def), 0, DataFrequency::every(2).sim_frames(), PeriodLimits::stop_after(5), |_| {})
            .unwrap();
        assert_eq!(transport.sent_named("AddToDataDefinition").len(), 2);
        assert!(matches!(
            request_verbs(&transport).last(),
            Some(Verb::RequestDataOnSimObject { period: Period::SimFrame, interval: 2, limit: 5, .. })
        ));
    }

    #[test]
    fn once_fires_a_single_time() {
        let (transport, dispatcher) = connected();
        let handler = SimObjectDataHandler::new(&dispatcher);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let request = handler
            .request_data_once(definition(), object_id::USER, move |value: Altitude| {
                assert!((value.feet - 42.0).abs() < 1e-9);
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        let id = request.id();
        let sample = Altitude {
            feet: 42.0,
            on_ground: false,
        };
        dispatcher.dispatch(&data(id, &sample));
        dispatcher.dispatch(&data(id, &sample));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        drop(request);
        assert_eq!(request_verbs(&transport).len(), 1);
    }

    #[test]
    fn by_type_collects_every_object() {
        let (transport, dispatcher) = connected();
        let handler = SimObjectDataHandler::new(&dispatcher);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let done = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let finished = Arc::clone(&done);
        let request = handler
            .request_data_by_type(
                definition(),
                SimObjectType::Aircraft,
                10_000,
                move |object, value: Altitude| sink.lock().unwrap().push((object, value.feet)),
                Some(Box::new(move || {
                    finished.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();
        assert!(matches!(
            transport.sent_named("RequestDataOnSimObjectType").as_slice(),
            [Verb::RequestDataOnSimObjectType { radius_meters: 10_000, object_type: SimObjectType::Aircraft, .. }]
        ));
        let id = request.id();
        dispatcher.dispatch(&by_type(id, 11, 0, 2, 1000.0));
        assert_eq!(done.load(Ordering::SeqCst), 0);
        dispatcher.dispatch(&by_type(id, 12, 1, 2, 2000.0));
        assert_eq!(*seen.lock().unwrap(), vec![(11, 1000.0), (12, 2000.0)]);
        assert_eq!(done.load(Ordering::SeqCst), 1);
        assert_eq!(handler.active(), 0);
    }

    #[test]
    fn by_type_with_no_objects_completes() {
        let (_transport, dispatcher) = connected();
        let handler = SimObjectDataHandler::new(&dispatcher);
        let done = Arc::new(AtomicUsize::new(0));
        let finished = Arc::clone(&done);
        let request = handler
            .request_data_by_type(
                definition(),
                SimObjectType::Boat,
                0,
                |_, _: Altitude| panic!("no records expected"),
                Some(Box::new(move || {
                    finished.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap();
        dispatcher.dispatch(&by_type(request.id(), 0, 0, 0, 0.0));
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_data_marshals_record() {
        let (transport, dispatcher) = connected();
        let handler = SimObjectDataHandler::new(&dispatcher);
        let def = definition();
        let value = Altitude {
            feet: 3000.0,
            on_ground: false,
        };
        handler.set_data(&def, object_id::USER, &value).unwrap();
        let sent = transport.sent_named("SetDataOnSimObject");
        assert_eq!(sent.len(), 1);
        let Verb::SetDataOnSimObject { data, object_id: target, .. } = &sent[0] else {
            panic!("unexpected verb");
        };
        assert_eq!(*target, object_id::USER);
        assert_eq!(def.from_bytes(data).unwrap(), value);
    }

    #[test]
    fn stop_is_skipped_after_reconnect() {
        let (transport, dispatcher) = connected();
        let handler = SimObjectDataHandler::new(&dispatcher);
        let request = handler
            .request_data(definition(), 0, DataFrequency::every(1).seconds(), PeriodLimits::none(), |_| {})
            .unwrap();
        dispatcher.connection().close();
        dispatcher.connection().open(0).unwrap();
        drop(request);
        assert_eq!(request_verbs(&transport).len(), 1);
    }
}
