//! Mirror of the identifiers and enumerations of the host header.
//!
//! Values are bit-exact with the host so they can travel on the wire
//! unchanged. Each enum is `#[repr(u32)]` and derives `strum::FromRepr`,
//! so `RecvId::from_repr(raw)` is the checked conversion from a header field.

use serde::{Deserialize, Serialize};

/// Value the host uses for "not used" in id and index fields.
pub const UNUSED: u32 = u32::MAX;

/// Reserved "no id" value. Allocators never hand it out.
pub const NO_ID: u32 = 0;

/// Identifier of an outbound request, echoed by its replies.
pub type RequestId = u32;
/// Identifier of a registered data definition.
pub type DataDefinitionId = u32;
/// Identifier of a registered facility definition.
pub type FacilityDefinitionId = u32;
/// Identifier of a client event.
pub type EventId = u32;
/// Identifier of a notification (event) group.
pub type GroupId = u32;
/// Identifier of an input group.
pub type InputGroupId = u32;
/// Identifier of a SimObject instance.
pub type SimObjectId = u32;
/// Serial number the host assigns to every outbound packet.
pub type SendId = u32;

/// Well-known SimObject ids.
pub mod object_id {
    /// The user's own object.
    pub const USER: u32 = 0;
    /// The user's aircraft (same value as [`USER`]).
    pub const USER_AIRCRAFT: u32 = 0;
    /// The user's avatar.
    pub const USER_AVATAR: u32 = 1;
    /// Whatever the user currently controls.
    pub const USER_CURRENT: u32 = 2;
    /// Upper bound of the id space.
    pub const MAX: u32 = u32::MAX;
}

// ── RecvId ───────────────────────────────────────────────────────────────

/// Kind of an inbound message, found in the third header word.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumIter,
    strum::EnumCount,
    strum::FromRepr,
)]
#[repr(u32)]
pub enum RecvId {
    /// Empty message.
    Null = 0,
    /// The host rejected an earlier packet.
    Exception = 1,
    /// Reply to a successful open.
    Open = 2,
    /// The host is shutting down.
    Quit = 3,
    /// Plain client or system event.
    Event = 4,
    /// An object was added or removed.
    EventObjectAddRemove = 5,
    /// Event carrying a file name (flight loaded, saved, …).
    EventFilename = 6,
    /// Per-frame event with frame rate and sim speed.
    EventFrame = 7,
    /// Data for a SimObject request.
    SimObjectData = 8,
    /// Data for a SimObject-by-type request.
    SimObjectDataByType = 9,
    /// Weather observation (legacy).
    WeatherObservation = 10,
    /// Cloud state (legacy).
    CloudState = 11,
    /// Object id assigned to a created AI object.
    AssignedObjectId = 12,
    /// Reserved key notification.
    ReservedKey = 13,
    /// Custom mission action.
    CustomAction = 14,
    /// Reply to a system state request.
    SystemState = 15,
    /// Client data area contents.
    ClientData = 16,
    /// Weather mode changed.
    EventWeatherMode = 17,
    /// Airport facility list.
    AirportList = 18,
    /// VOR facility list.
    VorList = 19,
    /// NDB facility list.
    NdbList = 20,
    /// Waypoint facility list.
    WaypointList = 21,
    /// Multiplayer server started.
    EventMultiplayerServerStarted = 22,
    /// Multiplayer client started.
    EventMultiplayerClientStarted = 23,
    /// Multiplayer session ended.
    EventMultiplayerSessionEnded = 24,
    /// Race finished.
    EventRaceEnd = 25,
    /// Race lap completed.
    EventRaceLap = 26,
    /// Event with five data words.
    EventEx1 = 27,
    /// One record of a facility data request.
    FacilityData = 28,
    /// End marker of a facility data request.
    FacilityDataEnd = 29,
    /// Minimal facility list (also sent on ambiguous facility requests).
    FacilityMinimalList = 30,
    /// Jetway data.
    JetwayData = 31,
    /// Controllers list.
    ControllersList = 32,
    /// Action callback.
    ActionCallback = 33,
    /// Input event enumeration.
    EnumerateInputEvents = 34,
    /// Input event value.
    GetInputEvent = 35,
    /// Input event subscription notification.
    SubscribeInputEvent = 36,
    /// Input event parameter enumeration.
    EnumerateInputEventParams = 37,
    /// SimObject and livery enumeration batch.
    EnumerateSimObjectAndLiveryList = 38,
    /// Flow event.
    FlowEvent = 39,
}

impl RecvId {
    /// The raw header value.
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    /// True for the eleven messages that start with the common event prefix
    /// (group id, event id, data).
    pub fn is_event(self) -> bool {
        matches!(
            self,
            Self::Event
                | Self::EventEx1
                | Self::EventObjectAddRemove
                | Self::EventFilename
                | Self::EventFrame
                | Self::EventWeatherMode
                | Self::EventMultiplayerServerStarted
                | Self::EventMultiplayerClientStarted
                | Self::EventMultiplayerSessionEnded
                | Self::EventRaceLap
                | Self::EventRaceEnd
        )
    }
}

// ── ExceptionCode ────────────────────────────────────────────────────────

/// Reason code carried by an exception message.
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
    strum::EnumIter,
    strum::FromRepr,
)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum ExceptionCode {
    None = 0,
    Error = 1,
    SizeMismatch = 2,
    UnrecognizedId = 3,
    Unopened = 4,
    VersionMismatch = 5,
    TooManyGroups = 6,
    NameUnrecognized = 7,
    TooManyEventNames = 8,
    EventIdDuplicate = 9,
    TooManyMaps = 10,
    TooManyObjects = 11,
    TooManyRequests = 12,
    WeatherInvalidPort = 13,
    WeatherInvalidMetar = 14,
    WeatherUnableToGetObservation = 15,
    WeatherUnableToCreateStation = 16,
    WeatherUnableToRemoveStation = 17,
    InvalidDataType = 18,
    InvalidDataSize = 19,
    DataError = 20,
    InvalidArray = 21,
    CreateObjectFailed = 22,
    LoadFlightplanFailed = 23,
    OperationInvalidForObjectType = 24,
    IllegalOperation = 25,
    AlreadySubscribed = 26,
    InvalidEnum = 27,
    DefinitionError = 28,
    DuplicateId = 29,
    DatumId = 30,
    OutOfBounds = 31,
    AlreadyCreated = 32,
    ObjectOutsideRealityBubble = 33,
    ObjectContainer = 34,
    ObjectAi = 35,
    ObjectAtc = 36,
    ObjectSchedule = 37,
    JetwayData = 38,
    ActionNotFound = 39,
    NotAnAction = 40,
    IncorrectActionParams = 41,
    GetInputEventFailed = 42,
    SetInputEventFailed = 43,
    Internal = 44,
}

// ── DataType ─────────────────────────────────────────────────────────────

/// Declared type of a data-definition field.
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
    strum::EnumIter,
    strum::FromRepr,
)]
#[repr(u32)]
pub enum DataType {
    /// Not a valid type.
    Invalid = 0,
    /// 32-bit signed integer.
    Int32 = 1,
    /// 64-bit signed integer.
    Int64 = 2,
    /// 32-bit float.
    Float32 = 3,
    /// 64-bit float.
    Float64 = 4,
    /// Fixed 8-byte string.
    String8 = 5,
    /// Fixed 32-byte string.
    String32 = 6,
    /// Fixed 64-byte string.
    String64 = 7,
    /// Fixed 128-byte string.
    String128 = 8,
    /// Fixed 256-byte string.
    String256 = 9,
    /// Fixed 260-byte string.
    String260 = 10,
    /// Null-terminated string of variable length.
    StringV = 11,
    /// [`InitPosition`](crate::InitPosition) record.
    InitPosition = 12,
    /// [`MarkerState`](crate::MarkerState) record.
    MarkerState = 13,
    /// [`Waypoint`](crate::Waypoint) record.
    Waypoint = 14,
    /// [`LatLonAlt`](crate::LatLonAlt) record.
    LatLonAlt = 15,
    /// [`Xyz`](crate::Xyz) record.
    Xyz = 16,
}

/// Lengths the host accepts for fixed strings.
pub const FIXED_STRING_LENGTHS: [usize; 6] = [8, 32, 64, 128, 256, 260];

impl DataType {
    /// The fixed-string type for `length`, if the host defines one.
    pub fn fixed_string(length: usize) -> Option<Self> {
        match length {
            8 => Some(Self::String8),
            32 => Some(Self::String32),
            64 => Some(Self::String64),
            128 => Some(Self::String128),
            256 => Some(Self::String256),
            260 => Some(Self::String260),
            _ => None,
        }
    }

    /// On-wire width in bytes. `None` for variable-length and invalid types.
    pub fn size(self) -> Option<usize> {
        match self {
            Self::Int32 | Self::Float32 => Some(4),
            Self::Int64 | Self::Float64 => Some(8),
            Self::String8 => Some(8),
            Self::String32 => Some(32),
            Self::String64 => Some(64),
            Self::String128 => Some(128),
            Self::String256 => Some(256),
            Self::String260 => Some(260),
            Self::InitPosition => Some(crate::InitPosition::WIRE_SIZE),
            Self::MarkerState => Some(crate::MarkerState::WIRE_SIZE),
            Self::Waypoint => Some(crate::Waypoint::WIRE_SIZE),
            Self::LatLonAlt => Some(crate::LatLonAlt::WIRE_SIZE),
            Self::Xyz => Some(crate::Xyz::WIRE_SIZE),
            Self::StringV | Self::Invalid => None,
        }
    }

    /// True for the fixed-length and variable-length string types.
    pub fn is_string(self) -> bool {
        self == Self::StringV || self.string_length().is_some()
    }

    /// Length of a fixed-string type.
    pub fn string_length(self) -> Option<usize> {
        match self {
            Self::String8
            | Self::String32
            | Self::String64
            | Self::String128
            | Self::String256
            | Self::String260 => self.size(),
            _ => None,
        }
    }
}

// ── Period ───────────────────────────────────────────────────────────────

/// How often the host sends data for a SimObject request.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumIter,
    strum::FromRepr,
)]
#[repr(u32)]
#[strum(serialize_all = "snake_case")]
pub enum Period {
    /// Stop sending.
    Never = 0,
    /// Send once.
    #[default]
    Once = 1,
    /// Every visual frame.
    VisualFrame = 2,
    /// Every simulation frame.
    SimFrame = 3,
    /// Every second.
    Second = 4,
}

// ── SimObjectType ────────────────────────────────────────────────────────

/// Kind of SimObject, as used by enumeration and by-type requests.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::FromRepr,
)]
#[repr(u32)]
#[strum(serialize_all = "snake_case")]
pub enum SimObjectType {
    /// The user's object.
    User = 0,
    /// All object kinds.
    All = 1,
    /// Fixed-wing aircraft.
    Aircraft = 2,
    /// Helicopters.
    Helicopter = 3,
    /// Boats.
    Boat = 4,
    /// Ground vehicles.
    Ground = 5,
    /// Hot air balloons.
    HotAirBalloon = 6,
    /// Animals.
    Animal = 7,
    /// The user's avatar.
    UserAvatar = 8,
    /// Whatever the user currently controls.
    UserCurrent = 9,
}

// ── Priority ─────────────────────────────────────────────────────────────

/// Priority of a notification or input group.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::FromRepr,
)]
#[repr(u32)]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    /// Receives events first.
    Highest = 1,
    /// Highest priority that may still mask events.
    HighestMaskable = 10_000_000,
    /// Standard priority.
    Standard = 1_900_000_000,
    /// Default priority.
    #[default]
    Default = 2_000_000_000,
    /// Receives events last.
    Lowest = 4_000_000_000,
}

impl Priority {
    /// The raw host value.
    pub fn value(self) -> u32 {
        self as u32
    }
}

// ── Facility list kinds ──────────────────────────────────────────────────

/// Facility family for list requests.
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
    strum::FromRepr,
)]
#[repr(u32)]
#[strum(serialize_all = "lowercase")]
pub enum FacilityListType {
    /// Airports.
    Airport = 0,
    /// Waypoints.
    Waypoint = 1,
    /// Non-directional beacons.
    Ndb = 2,
    /// VOR stations.
    Vor = 3,
}

impl FacilityListType {
    /// The message id the host uses to answer a list request of this kind.
    pub fn recv_id(self) -> RecvId {
        match self {
            Self::Airport => RecvId::AirportList,
            Self::Waypoint => RecvId::WaypointList,
            Self::Ndb => RecvId::NdbList,
            Self::Vor => RecvId::VorList,
        }
    }
}

/// Which facilities a list request covers.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
    strum::FromRepr,
)]
#[repr(u32)]
#[strum(serialize_all = "lowercase")]
pub enum FacilityListScope {
    /// Everything the host knows.
    #[default]
    All = 0,
    /// Facilities inside the reality bubble.
    Bubble = 1,
    /// Facilities in the host's cache.
    Cache = 2,
}

/// Flags for SimObject data requests.
pub mod data_request_flag {
    /// Send every period.
    pub const DEFAULT: u32 = 0;
    /// Send only when a value changed.
    pub const CHANGED: u32 = 0x0000_0001;
    /// Send tagged records.
    pub const TAGGED: u32 = 0x0000_0002;
}

/// Flags for transmitting client events.
pub mod transmit_flag {
    /// No special handling.
    pub const DEFAULT: u32 = 0;
    /// Repeat with the fast timer (joystick emulation).
    pub const FAST_REPEAT_TIMER: u32 = 0x0000_0001;
    /// Repeat with the slow timer.
    pub const SLOW_REPEAT_TIMER: u32 = 0x0000_0002;
    /// The group id of the call is a priority, not a notification group.
    pub const GROUP_ID_IS_PRIORITY: u32 = 0x0000_0010;
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::{EnumCount, IntoEnumIterator};

    #[test]
    fn recv_ids_are_contiguous() {
        for (index, id) in RecvId::iter().enumerate() {
            assert_eq!(id.as_u32() as usize, index);
        }
        assert_eq!(RecvId::COUNT, 40);
    }

    #[test]
    fn recv_id_from_raw() {
        assert_eq!(RecvId::from_repr(15), Some(RecvId::SystemState));
        assert_eq!(RecvId::from_repr(1000), None);
    }

    #[test]
    fn eleven_event_variants() {
        assert_eq!(RecvId::iter().filter(|id| id.is_event()).count(), 11);
        assert!(!RecvId::SystemState.is_event());
    }

    #[test]
    fn fixed_string_types() {
        assert_eq!(DataType::fixed_string(8), Some(DataType::String8));
        assert_eq!(DataType::fixed_string(260), Some(DataType::String260));
        assert_eq!(DataType::fixed_string(10), None);
        assert_eq!(DataType::String64.string_length(), Some(64));
        assert!(DataType::StringV.is_string());
        assert_eq!(DataType::StringV.size(), None);
        assert_eq!(DataType::InitPosition.size(), Some(56));
    }

    #[test]
    fn priority_values() {
        assert_eq!(Priority::Highest.value(), 1);
        assert_eq!(Priority::Lowest.value(), 4_000_000_000);
        assert_eq!(Priority::default(), Priority::Default);
        assert_eq!("standard".parse::<Priority>().unwrap(), Priority::Standard);
    }

    #[test]
    fn simobject_type_display() {
        assert_eq!(SimObjectType::HotAirBalloon.to_string(), "hot_air_balloon");
        assert_eq!(
            "aircraft".parse::<SimObjectType>().unwrap(),
            SimObjectType::Aircraft
        );
    }
}
