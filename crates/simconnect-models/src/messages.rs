//! Inbound host messages.
//!
//! A [`RawMessage`] owns the bytes of one message exactly as the host
//! delivered them. Typed views are produced with [`RawMessage::decode`],
//! which checks the header id against [`WireMessage::ID`] before handing the
//! body to the record's decoder. Every record can also encode itself, so a
//! scripted host can produce bit-exact messages.

use serde::{Deserialize, Serialize};

use crate::data_block_builder::DataBlockBuilder;
use crate::data_block_reader::DataBlockReader;
use crate::error::ModelError;
use crate::ids::{
    DataDefinitionId, EventId, ExceptionCode, GroupId, RecvId, RequestId, SendId, SimObjectId,
    SimObjectType,
};
use crate::position::LatLonAlt;

/// Size of the common header: size, version and id, one `u32` each.
pub const HEADER_SIZE: usize = 12;

/// Version word written by [`RawMessage::from_message`].
pub const HEADER_VERSION: u32 = 6;

/// Length of the host's `MAX_PATH` string fields.
const MAX_PATH: usize = 260;

// ── RawMessage ───────────────────────────────────────────────────────────

/// One inbound message with its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    bytes: Vec<u8>,
}

impl RawMessage {
    /// Wrap `bytes`, checking that the buffer holds at least the header and
    /// the full size the header announces.
    ///
    /// # Errors
    ///
    /// [`ModelError::Truncated`] when the buffer is shorter than either.
    pub fn new(bytes: Vec<u8>) -> Result<Self, ModelError> {
        if bytes.len() < HEADER_SIZE {
            return Err(ModelError::Truncated {
                message: "header".into(),
                expected: HEADER_SIZE,
                actual: bytes.len(),
            });
        }
        let msg = Self { bytes };
        let declared = msg.declared_size() as usize;
        if declared > msg.bytes.len() || declared < HEADER_SIZE {
            return Err(ModelError::Truncated {
                message: msg.raw_id().to_string(),
                expected: declared,
                actual: msg.bytes.len(),
            });
        }
        Ok(msg)
    }

    /// Encode `message` with a header.
    pub fn from_message<M: WireMessage>(message: &M) -> Self {
        let mut body = DataBlockBuilder::new();
        message.encode_body(&mut body);
        let size = u32::try_from(HEADER_SIZE + body.size()).unwrap_or(u32::MAX);
        let mut bytes = Vec::with_capacity(HEADER_SIZE + body.size());
        bytes.extend_from_slice(&size.to_le_bytes());
        bytes.extend_from_slice(&HEADER_VERSION.to_le_bytes());
        bytes.extend_from_slice(&M::ID.as_u32().to_le_bytes());
        bytes.extend_from_slice(body.data());
        Self { bytes }
    }

    fn header_word(&self, index: usize) -> u32 {
        let start = index * 4;
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.bytes[start..start + 4]);
        u32::from_le_bytes(word)
    }

    /// Size announced by the header.
    pub fn declared_size(&self) -> u32 {
        self.header_word(0)
    }

    /// Version word of the header.
    pub fn version(&self) -> u32 {
        self.header_word(1)
    }

    /// Message id as found in the header.
    pub fn raw_id(&self) -> u32 {
        self.header_word(2)
    }

    /// Message id, if it is one this crate knows.
    pub fn id(&self) -> Option<RecvId> {
        RecvId::from_repr(self.raw_id())
    }

    /// Everything after the header, up to the announced size.
    pub fn body(&self) -> &[u8] {
        &self.bytes[HEADER_SIZE..self.declared_size() as usize]
    }

    /// The whole message.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The `index`-th `u32` of the body, if present. Correlation extractors
    /// use this to read ids without decoding the whole record.
    pub fn body_u32(&self, index: usize) -> Option<u32> {
        let start = index * 4;
        let word = self.body().get(start..start + 4)?;
        let mut out = [0u8; 4];
        out.copy_from_slice(word);
        Some(u32::from_le_bytes(out))
    }

    /// Decode the typed record.
    ///
    /// # Errors
    ///
    /// [`ModelError::UnexpectedMessage`] when the header id is not `M::ID`,
    /// or the decoder's error when the body is too short.
    pub fn decode<M: WireMessage>(&self) -> Result<M, ModelError> {
        if self.raw_id() != M::ID.as_u32() {
            return Err(ModelError::UnexpectedMessage {
                expected: M::ID.to_string(),
                actual: self.raw_id(),
            });
        }
        let mut reader = DataBlockReader::new(self.body());
        M::decode_body(&mut reader)
    }
}

impl TryFrom<Vec<u8>> for RawMessage {
    type Error = ModelError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Self::new(bytes)
    }
}

// ── Traits ───────────────────────────────────────────────────────────────

/// A typed message record with a fixed header id.
pub trait WireMessage: Sized {
    /// Header id of this record.
    const ID: RecvId;

    /// Decode the body (the bytes after the header).
    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError>;

    /// Encode the body.
    fn encode_body(&self, builder: &mut DataBlockBuilder);
}

/// A message that starts with the common event prefix.
pub trait EventVariant: WireMessage {
    /// Notification group the event was sent to, or [`UNUSED`](crate::UNUSED).
    fn group_id(&self) -> GroupId;
    /// The client or system event id.
    fn event_id(&self) -> EventId;
}

// ── Session messages ─────────────────────────────────────────────────────

/// Two-part version number as the host reports it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Version {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Major build number.
    pub build_major: u32,
    /// Minor build number.
    pub build_minor: u32,
}

impl Version {
    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            major: reader.read_uint32()?,
            minor: reader.read_uint32()?,
            build_major: reader.read_uint32()?,
            build_minor: reader.read_uint32()?,
        })
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        builder
            .add_uint32(self.major)
            .add_uint32(self.minor)
            .add_uint32(self.build_major)
            .add_uint32(self.build_minor);
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build_major, self.build_minor
        )
    }
}

/// Reply to a successful open.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenMessage {
    /// Simulator name.
    pub application_name: String,
    /// Simulator version.
    pub application_version: Version,
    /// Host library version.
    pub simconnect_version: Version,
    /// Reserved.
    pub reserved1: u32,
    /// Reserved.
    pub reserved2: u32,
}

impl WireMessage for OpenMessage {
    const ID: RecvId = RecvId::Open;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            application_name: reader.read_string(256)?,
            application_version: Version::read(reader)?,
            simconnect_version: Version::read(reader)?,
            reserved1: reader.read_uint32()?,
            reserved2: reader.read_uint32()?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        builder.add_chars(&self.application_name, 256);
        self.application_version.write(builder);
        self.simconnect_version.write(builder);
        builder.add_uint32(self.reserved1).add_uint32(self.reserved2);
    }
}

/// The host is shutting down. No body.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuitMessage;

impl WireMessage for QuitMessage {
    const ID: RecvId = RecvId::Quit;

    fn decode_body(_reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self)
    }

    fn encode_body(&self, _builder: &mut DataBlockBuilder) {}
}

/// The host rejected an outbound packet.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExceptionMessage {
    /// Raw exception code.
    pub exception: u32,
    /// Send id of the offending packet.
    pub send_id: SendId,
    /// Index of the offending parameter, or [`UNUSED`](crate::UNUSED).
    pub index: u32,
}

impl ExceptionMessage {
    /// The exception code, if known.
    pub fn code(&self) -> Option<ExceptionCode> {
        ExceptionCode::from_repr(self.exception)
    }
}

impl WireMessage for ExceptionMessage {
    const ID: RecvId = RecvId::Exception;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            exception: reader.read_uint32()?,
            send_id: reader.read_uint32()?,
            index: reader.read_uint32()?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        builder
            .add_uint32(self.exception)
            .add_uint32(self.send_id)
            .add_uint32(self.index);
    }
}

/// Reply to a system state request. Which field is meaningful depends on
/// the state asked for.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SystemStateMessage {
    /// Id of the request this answers.
    pub request_id: RequestId,
    /// Integer (or boolean) value.
    pub integer: u32,
    /// Float value.
    pub float: f32,
    /// Text value.
    pub string: String,
}

impl WireMessage for SystemStateMessage {
    const ID: RecvId = RecvId::SystemState;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            request_id: reader.read_uint32()?,
            integer: reader.read_uint32()?,
            float: reader.read_float32()?,
            string: reader.read_string(MAX_PATH)?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        builder
            .add_uint32(self.request_id)
            .add_uint32(self.integer)
            .add_float32(self.float)
            .add_chars(&self.string, MAX_PATH);
    }
}

/// Object id the host assigned to a created AI object.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AssignedObjectIdMessage {
    /// Id of the creation request.
    pub request_id: RequestId,
    /// The new object.
    pub object_id: SimObjectId,
}

impl WireMessage for AssignedObjectIdMessage {
    const ID: RecvId = RecvId::AssignedObjectId;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            request_id: reader.read_uint32()?,
            object_id: reader.read_uint32()?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        builder.add_uint32(self.request_id).add_uint32(self.object_id);
    }
}

// ── Event variants ───────────────────────────────────────────────────────

/// Plain event: group, event and one data word.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventMessage {
    /// Notification group, or [`UNUSED`](crate::UNUSED) for system events.
    pub group_id: GroupId,
    /// Event id.
    pub event_id: EventId,
    /// Event parameter.
    pub data: u32,
}

impl EventMessage {
    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            group_id: reader.read_uint32()?,
            event_id: reader.read_uint32()?,
            data: reader.read_uint32()?,
        })
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        builder
            .add_uint32(self.group_id)
            .add_uint32(self.event_id)
            .add_uint32(self.data);
    }
}

/// Declares a message that is exactly [`EventMessage`] under another id.
macro_rules! plain_event_message {
    ($(#[$doc:meta])* $name:ident, $id:expr) => {
        $(#[$doc])*
        #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name {
            /// The common event fields.
            pub event: EventMessage,
        }

        impl WireMessage for $name {
            const ID: RecvId = $id;

            fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
                Ok(Self {
                    event: EventMessage::read(reader)?,
                })
            }

            fn encode_body(&self, builder: &mut DataBlockBuilder) {
                self.event.write(builder);
            }
        }

        impl EventVariant for $name {
            fn group_id(&self) -> GroupId {
                self.event.group_id
            }
            fn event_id(&self) -> EventId {
                self.event.event_id
            }
        }
    };
}

impl WireMessage for EventMessage {
    const ID: RecvId = RecvId::Event;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Self::read(reader)
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        self.write(builder);
    }
}

impl EventVariant for EventMessage {
    fn group_id(&self) -> GroupId {
        self.group_id
    }
    fn event_id(&self) -> EventId {
        self.event_id
    }
}

plain_event_message!(
    /// Weather mode changed; `event.data` holds the mode.
    EventWeatherModeMessage,
    RecvId::EventWeatherMode
);
plain_event_message!(
    /// The user started hosting a multiplayer session.
    EventMultiplayerServerStartedMessage,
    RecvId::EventMultiplayerServerStarted
);
plain_event_message!(
    /// The user joined a multiplayer session.
    EventMultiplayerClientStartedMessage,
    RecvId::EventMultiplayerClientStarted
);
plain_event_message!(
    /// The multiplayer session ended.
    EventMultiplayerSessionEndedMessage,
    RecvId::EventMultiplayerSessionEnded
);

/// Event with five data words.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventEx1Message {
    /// Notification group.
    pub group_id: GroupId,
    /// Event id.
    pub event_id: EventId,
    /// Event parameters.
    pub data: [u32; 5],
}

impl WireMessage for EventEx1Message {
    const ID: RecvId = RecvId::EventEx1;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        let group_id = reader.read_uint32()?;
        let event_id = reader.read_uint32()?;
        let mut data = [0u32; 5];
        for slot in &mut data {
            *slot = reader.read_uint32()?;
        }
        Ok(Self {
            group_id,
            event_id,
            data,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        builder.add_uint32(self.group_id).add_uint32(self.event_id);
        for value in self.data {
            builder.add_uint32(value);
        }
    }
}

impl EventVariant for EventEx1Message {
    fn group_id(&self) -> GroupId {
        self.group_id
    }
    fn event_id(&self) -> EventId {
        self.event_id
    }
}

/// An object was added to or removed from the simulation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventObjectAddRemoveMessage {
    /// The common event fields; `event.data` holds the object id.
    pub event: EventMessage,
    /// Raw object type.
    pub object_type: u32,
}

impl EventObjectAddRemoveMessage {
    /// The object type, if known.
    pub fn simobject_type(&self) -> Option<SimObjectType> {
        SimObjectType::from_repr(self.object_type)
    }
}

impl WireMessage for EventObjectAddRemoveMessage {
    const ID: RecvId = RecvId::EventObjectAddRemove;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            event: EventMessage::read(reader)?,
            object_type: reader.read_uint32()?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        self.event.write(builder);
        builder.add_uint32(self.object_type);
    }
}

impl EventVariant for EventObjectAddRemoveMessage {
    fn group_id(&self) -> GroupId {
        self.event.group_id
    }
    fn event_id(&self) -> EventId {
        self.event.event_id
    }
}

/// Event carrying a file name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct EventFilenameMessage {
    /// The common event fields.
    pub event: EventMessage,
    /// File name.
    pub file_name: String,
    /// Reserved flags.
    pub flags: u32,
}

impl WireMessage for EventFilenameMessage {
    const ID: RecvId = RecvId::EventFilename;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            event: EventMessage::read(reader)?,
            file_name: reader.read_string(MAX_PATH)?,
            flags: reader.read_uint32()?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        self.event.write(builder);
        builder.add_chars(&self.file_name, MAX_PATH).add_uint32(self.flags);
    }
}

impl EventVariant for EventFilenameMessage {
    fn group_id(&self) -> GroupId {
        self.event.group_id
    }
    fn event_id(&self) -> EventId {
        self.event.event_id
    }
}

/// Per-frame event.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct EventFrameMessage {
    /// The common event fields.
    pub event: EventMessage,
    /// Visual frame rate.
    pub frame_rate: f32,
    /// Simulation rate.
    pub sim_speed: f32,
}

impl WireMessage for EventFrameMessage {
    const ID: RecvId = RecvId::EventFrame;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            event: EventMessage::read(reader)?,
            frame_rate: reader.read_float32()?,
            sim_speed: reader.read_float32()?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        self.event.write(builder);
        builder.add_float32(self.frame_rate).add_float32(self.sim_speed);
    }
}

impl EventVariant for EventFrameMessage {
    fn group_id(&self) -> GroupId {
        self.event.group_id
    }
    fn event_id(&self) -> EventId {
        self.event.event_id
    }
}

/// Result block shared by the race messages.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RaceResult {
    /// Number of racers.
    pub number_of_racers: u32,
    /// Mission GUID, raw.
    pub mission_guid: [u8; 16],
    /// Player name.
    pub player_name: String,
    /// Session type.
    pub session_type: String,
    /// Aircraft title.
    pub aircraft: String,
    /// Player role.
    pub player_role: String,
    /// Total time in seconds.
    pub total_time: f64,
    /// Penalty time in seconds.
    pub penalty_time: f64,
    /// Non-zero if disqualified.
    pub is_disqualified: u32,
}

impl RaceResult {
    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        let number_of_racers = reader.read_uint32()?;
        let mut mission_guid = [0u8; 16];
        mission_guid.copy_from_slice(reader.read_bytes(16)?);
        Ok(Self {
            number_of_racers,
            mission_guid,
            player_name: reader.read_string(MAX_PATH)?,
            session_type: reader.read_string(MAX_PATH)?,
            aircraft: reader.read_string(MAX_PATH)?,
            player_role: reader.read_string(MAX_PATH)?,
            total_time: reader.read_float64()?,
            penalty_time: reader.read_float64()?,
            is_disqualified: reader.read_uint32()?,
        })
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        builder
            .add_uint32(self.number_of_racers)
            .add_bytes(&self.mission_guid)
            .add_chars(&self.player_name, MAX_PATH)
            .add_chars(&self.session_type, MAX_PATH)
            .add_chars(&self.aircraft, MAX_PATH)
            .add_chars(&self.player_role, MAX_PATH)
            .add_float64(self.total_time)
            .add_float64(self.penalty_time)
            .add_uint32(self.is_disqualified);
    }
}

/// A racer completed a lap.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct EventRaceLapMessage {
    /// The common event fields.
    pub event: EventMessage,
    /// Zero-based lap index.
    pub lap_index: u32,
    /// Standing after the lap.
    pub racer_data: RaceResult,
}

impl WireMessage for EventRaceLapMessage {
    const ID: RecvId = RecvId::EventRaceLap;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            event: EventMessage::read(reader)?,
            lap_index: reader.read_uint32()?,
            racer_data: RaceResult::read(reader)?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        self.event.write(builder);
        builder.add_uint32(self.lap_index);
        self.racer_data.write(builder);
    }
}

impl EventVariant for EventRaceLapMessage {
    fn group_id(&self) -> GroupId {
        self.event.group_id
    }
    fn event_id(&self) -> EventId {
        self.event.event_id
    }
}

/// A racer finished.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct EventRaceEndMessage {
    /// The common event fields.
    pub event: EventMessage,
    /// Index of the racer.
    pub racer_number: u32,
    /// Final standing.
    pub racer_data: RaceResult,
}

impl WireMessage for EventRaceEndMessage {
    const ID: RecvId = RecvId::EventRaceEnd;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            event: EventMessage::read(reader)?,
            racer_number: reader.read_uint32()?,
            racer_data: RaceResult::read(reader)?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        self.event.write(builder);
        builder.add_uint32(self.racer_number);
        self.racer_data.write(builder);
    }
}

impl EventVariant for EventRaceEndMessage {
    fn group_id(&self) -> GroupId {
        self.event.group_id
    }
    fn event_id(&self) -> EventId {
        self.event.event_id
    }
}

// ── SimObject data ───────────────────────────────────────────────────────

/// Record delivered for a data request. `data` is the marshalled record,
/// laid out by the data definition `define_id`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SimObjectDataMessage {
    /// Id of the data request.
    pub request_id: RequestId,
    /// Object the data describes.
    pub object_id: SimObjectId,
    /// Data definition used.
    pub define_id: DataDefinitionId,
    /// Request flags echoed back.
    pub flags: u32,
    /// Index of this record within a by-type batch.
    pub entry_number: u32,
    /// Number of records in the batch.
    pub out_of: u32,
    /// Number of fields in `data`.
    pub define_count: u32,
    /// Packed field values.
    pub data: Vec<u8>,
}

impl SimObjectDataMessage {
    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            request_id: reader.read_uint32()?,
            object_id: reader.read_uint32()?,
            define_id: reader.read_uint32()?,
            flags: reader.read_uint32()?,
            entry_number: reader.read_uint32()?,
            out_of: reader.read_uint32()?,
            define_count: reader.read_uint32()?,
            data: reader.read_rest().to_vec(),
        })
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        builder
            .add_uint32(self.request_id)
            .add_uint32(self.object_id)
            .add_uint32(self.define_id)
            .add_uint32(self.flags)
            .add_uint32(self.entry_number)
            .add_uint32(self.out_of)
            .add_uint32(self.define_count)
            .add_bytes(&self.data);
    }
}

impl WireMessage for SimObjectDataMessage {
    const ID: RecvId = RecvId::SimObjectData;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Self::read(reader)
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        self.write(builder);
    }
}

/// Record delivered for a by-type data request; same layout as
/// [`SimObjectDataMessage`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SimObjectDataByTypeMessage {
    /// The record.
    pub data: SimObjectDataMessage,
}

impl WireMessage for SimObjectDataByTypeMessage {
    const ID: RecvId = RecvId::SimObjectDataByType;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            data: SimObjectDataMessage::read(reader)?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        self.data.write(builder);
    }
}

// ── Facility data ────────────────────────────────────────────────────────

/// One record of a facility data request.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct FacilityDataMessage {
    /// Id the client chose for the request.
    pub user_request_id: RequestId,
    /// Id the host gave this record.
    pub unique_request_id: u32,
    /// Id of the parent record.
    pub parent_unique_request_id: u32,
    /// Facility data type of the record.
    pub data_type: u32,
    /// Non-zero if the record is an element of a list.
    pub is_list_item: u32,
    /// Index within the list.
    pub item_index: u32,
    /// Length of the list.
    pub list_size: u32,
    /// Packed field values.
    pub data: Vec<u8>,
}

impl WireMessage for FacilityDataMessage {
    const ID: RecvId = RecvId::FacilityData;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            user_request_id: reader.read_uint32()?,
            unique_request_id: reader.read_uint32()?,
            parent_unique_request_id: reader.read_uint32()?,
            data_type: reader.read_uint32()?,
            is_list_item: reader.read_uint32()?,
            item_index: reader.read_uint32()?,
            list_size: reader.read_uint32()?,
            data: reader.read_rest().to_vec(),
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        builder
            .add_uint32(self.user_request_id)
            .add_uint32(self.unique_request_id)
            .add_uint32(self.parent_unique_request_id)
            .add_uint32(self.data_type)
            .add_uint32(self.is_list_item)
            .add_uint32(self.item_index)
            .add_uint32(self.list_size)
            .add_bytes(&self.data);
    }
}

/// End of a facility data request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FacilityDataEndMessage {
    /// Id the client chose for the request.
    pub request_id: RequestId,
}

impl WireMessage for FacilityDataEndMessage {
    const ID: RecvId = RecvId::FacilityDataEnd;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            request_id: reader.read_uint32()?,
        })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        builder.add_uint32(self.request_id);
    }
}

// ── List messages ────────────────────────────────────────────────────────

/// Batch header shared by every list message.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListHeader {
    /// Id of the list request.
    pub request_id: RequestId,
    /// Items in this batch.
    pub array_size: u32,
    /// Zero-based index of this batch.
    pub entry_number: u32,
    /// Total number of batches.
    pub out_of: u32,
}

impl ListHeader {
    /// True for the final batch. An empty result arrives as a single batch
    /// with `out_of == 0`, which also counts as final.
    pub fn is_last(&self) -> bool {
        self.entry_number.saturating_add(1) >= self.out_of
    }
}

/// One element of a list message.
pub trait ListItem: Sized {
    /// Id of the list message carrying this item.
    const LIST_ID: RecvId;
    /// Wire size of one item.
    const WIRE_SIZE: usize;

    /// Decode one item.
    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError>;
    /// Encode one item.
    fn write(&self, builder: &mut DataBlockBuilder);
}

/// A batch of list items.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ListMessage<I> {
    /// Batch header. `array_size` is recomputed on encode.
    pub header: ListHeader,
    /// The items.
    pub items: Vec<I>,
}

impl<I: ListItem> WireMessage for ListMessage<I> {
    const ID: RecvId = I::LIST_ID;

    fn decode_body(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        let header = ListHeader {
            request_id: reader.read_uint32()?,
            array_size: reader.read_uint32()?,
            entry_number: reader.read_uint32()?,
            out_of: reader.read_uint32()?,
        };
        let count = header.array_size as usize;
        if count.saturating_mul(I::WIRE_SIZE) > reader.remaining() {
            return Err(ModelError::Truncated {
                message: I::LIST_ID.to_string(),
                expected: count.saturating_mul(I::WIRE_SIZE),
                actual: reader.remaining(),
            });
        }
        let items = (0..count)
            .map(|_| I::read(reader))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { header, items })
    }

    fn encode_body(&self, builder: &mut DataBlockBuilder) {
        builder
            .add_uint32(self.header.request_id)
            .add_uint32(u32::try_from(self.items.len()).unwrap_or(u32::MAX))
            .add_uint32(self.header.entry_number)
            .add_uint32(self.header.out_of);
        for item in &self.items {
            item.write(builder);
        }
    }
}

/// One title/livery pair from a SimObject enumeration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SimObjectLivery {
    /// Aircraft title.
    pub title: String,
    /// Livery name; empty for the default livery.
    pub livery: String,
}

impl ListItem for SimObjectLivery {
    const LIST_ID: RecvId = RecvId::EnumerateSimObjectAndLiveryList;
    const WIRE_SIZE: usize = 512;

    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            title: reader.read_string(256)?,
            livery: reader.read_string(256)?,
        })
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        builder.add_chars(&self.title, 256).add_chars(&self.livery, 256);
    }
}

/// ICAO identification of a facility.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Icao {
    /// Facility kind letter (`'A'`, `'W'`, `'V'`, `'N'`, …).
    pub kind: char,
    /// Identifier.
    pub ident: String,
    /// Region code.
    pub region: String,
    /// Owning airport, if any.
    pub airport: String,
}

impl Icao {
    const WIRE_SIZE: usize = 18;

    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        let kind = reader.read_bytes(1)?[0];
        Ok(Self {
            kind: if kind == 0 { ' ' } else { char::from(kind) },
            ident: reader.read_string(9)?,
            region: reader.read_string(3)?,
            airport: reader.read_string(5)?,
        })
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        let kind = u8::try_from(self.kind).unwrap_or(b' ');
        builder
            .add_bytes(&[kind])
            .add_chars(&self.ident, 9)
            .add_chars(&self.region, 3)
            .add_chars(&self.airport, 5);
    }
}

/// Minimal facility record: ICAO plus position.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FacilityMinimal {
    /// Identification.
    pub icao: Icao,
    /// Position.
    pub lat_lon_alt: LatLonAlt,
}

impl ListItem for FacilityMinimal {
    const LIST_ID: RecvId = RecvId::FacilityMinimalList;
    const WIRE_SIZE: usize = Icao::WIRE_SIZE + LatLonAlt::WIRE_SIZE;

    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            icao: Icao::read(reader)?,
            lat_lon_alt: reader.read_lat_lon_alt()?,
        })
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        self.icao.write(builder);
        builder.add_lat_lon_alt(&self.lat_lon_alt);
    }
}

/// Airport list entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FacilityAirport {
    /// ICAO identifier.
    pub ident: String,
    /// Region code.
    pub region: String,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Meters.
    pub altitude: f64,
}

impl FacilityAirport {
    const BASE_SIZE: usize = 6 + 3 + 24;

    fn read_fields(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            ident: reader.read_string(6)?,
            region: reader.read_string(3)?,
            latitude: reader.read_float64()?,
            longitude: reader.read_float64()?,
            altitude: reader.read_float64()?,
        })
    }

    fn write_fields(&self, builder: &mut DataBlockBuilder) {
        builder
            .add_chars(&self.ident, 6)
            .add_chars(&self.region, 3)
            .add_float64(self.latitude)
            .add_float64(self.longitude)
            .add_float64(self.altitude);
    }
}

impl ListItem for FacilityAirport {
    const LIST_ID: RecvId = RecvId::AirportList;
    const WIRE_SIZE: usize = Self::BASE_SIZE;

    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Self::read_fields(reader)
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        self.write_fields(builder);
    }
}

/// Waypoint list entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FacilityWaypoint {
    /// Identification and position.
    pub airport: FacilityAirport,
    /// Magnetic variation in degrees.
    pub mag_var: f32,
}

impl FacilityWaypoint {
    const BASE_SIZE: usize = FacilityAirport::BASE_SIZE + 4;

    fn read_fields(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            airport: FacilityAirport::read_fields(reader)?,
            mag_var: reader.read_float32()?,
        })
    }

    fn write_fields(&self, builder: &mut DataBlockBuilder) {
        self.airport.write_fields(builder);
        builder.add_float32(self.mag_var);
    }
}

impl ListItem for FacilityWaypoint {
    const LIST_ID: RecvId = RecvId::WaypointList;
    const WIRE_SIZE: usize = Self::BASE_SIZE;

    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Self::read_fields(reader)
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        self.write_fields(builder);
    }
}

/// NDB list entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FacilityNdb {
    /// Identification, position and variation.
    pub waypoint: FacilityWaypoint,
    /// Frequency in Hz.
    pub frequency: u32,
}

impl FacilityNdb {
    const BASE_SIZE: usize = FacilityWaypoint::BASE_SIZE + 4;

    fn read_fields(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            waypoint: FacilityWaypoint::read_fields(reader)?,
            frequency: reader.read_uint32()?,
        })
    }

    fn write_fields(&self, builder: &mut DataBlockBuilder) {
        self.waypoint.write_fields(builder);
        builder.add_uint32(self.frequency);
    }
}

impl ListItem for FacilityNdb {
    const LIST_ID: RecvId = RecvId::NdbList;
    const WIRE_SIZE: usize = Self::BASE_SIZE;

    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Self::read_fields(reader)
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        self.write_fields(builder);
    }
}

/// VOR list entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct FacilityVor {
    /// Identification, position, variation and frequency.
    pub ndb: FacilityNdb,
    /// Which of the optional fields are valid.
    pub flags: u32,
    /// Localizer heading in degrees.
    pub localizer: f32,
    /// Glide slope antenna latitude.
    pub glide_lat: f64,
    /// Glide slope antenna longitude.
    pub glide_lon: f64,
    /// Glide slope antenna altitude.
    pub glide_alt: f64,
    /// Glide slope angle in degrees.
    pub glide_slope_angle: f32,
}

impl ListItem for FacilityVor {
    const LIST_ID: RecvId = RecvId::VorList;
    const WIRE_SIZE: usize = FacilityNdb::BASE_SIZE + 4 + 4 + 24 + 4;

    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            ndb: FacilityNdb::read_fields(reader)?,
            flags: reader.read_uint32()?,
            localizer: reader.read_float32()?,
            glide_lat: reader.read_float64()?,
            glide_lon: reader.read_float64()?,
            glide_alt: reader.read_float64()?,
            glide_slope_angle: reader.read_float32()?,
        })
    }

    fn write(&self, builder: &mut DataBlockBuilder) {
        self.ndb.write_fields(builder);
        builder
            .add_uint32(self.flags)
            .add_float32(self.localizer)
            .add_float64(self.glide_lat)
            .add_float64(self.glide_lon)
            .add_float64(self.glide_alt)
            .add_float32(self.glide_slope_angle);
    }
}

/// Batch of title/livery pairs.
pub type SimObjectLiveryListMessage = ListMessage<SimObjectLivery>;
/// Batch of minimal facility records.
pub type FacilityMinimalListMessage = ListMessage<FacilityMinimal>;
/// Batch of airports.
pub type AirportListMessage = ListMessage<FacilityAirport>;
/// Batch of waypoints.
pub type WaypointListMessage = ListMessage<FacilityWaypoint>;
/// Batch of NDBs.
pub type NdbListMessage = ListMessage<FacilityNdb>;
/// Batch of VORs.
pub type VorListMessage = ListMessage<FacilityVor>;
