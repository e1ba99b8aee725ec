//! What the mock simulator knows: objects and their variables, installed
//! liveries, airports, and system state values.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use simconnect_models::{
    DataBlockBuilder, DataBlockReader, DataType, FacilityAirport, ModelError, SimObjectId,
    SimObjectLivery, SimObjectType, SystemStateMessage,
};

/// Id of the user aircraft.
pub const USER_OBJECT_ID: SimObjectId = 1;

/// Id given to the first object created at run time.
pub const FIRST_SPAWNED_ID: SimObjectId = 100;

/// Value of a simulation variable.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum SimValue {
    /// Numeric variable.
    Number(f64),
    /// Text variable.
    Text(String),
}

impl Default for SimValue {
    fn default() -> Self {
        Self::Number(0.0)
    }
}

impl SimValue {
    /// Numeric reading; text parses or reads as 0.
    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse().unwrap_or(0.0),
        }
    }

    /// Text reading; numbers print without a trailing `.0`.
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(value) => value.to_string(),
            Self::Text(text) => text.clone(),
        }
    }

    /// Append this value to `builder` as `data_type`.
    #[allow(clippy::cast_possible_truncation)]
    pub fn write(&self, data_type: DataType, builder: &mut DataBlockBuilder) {
        match data_type {
            DataType::Int32 => {
                builder.add_int32(self.as_f64() as i32);
            }
            DataType::Int64 => {
                builder.add_int64(self.as_f64() as i64);
            }
            DataType::Float32 => {
                builder.add_float32(self.as_f64() as f32);
            }
            DataType::Float64 => {
                builder.add_float64(self.as_f64());
            }
            DataType::StringV => {
                builder.add_string_v(&self.as_text());
            }
            other => match (other.string_length(), other.size()) {
                (Some(length), _) => {
                    builder.add_chars(&self.as_text(), length);
                }
                (None, Some(size)) => {
                    builder.add_bytes(&vec![0; size]);
                }
                (None, None) => {}
            },
        }
    }

    /// Read a value of `data_type` from `reader`.
    #[allow(clippy::cast_precision_loss)]
    pub fn read(data_type: DataType, reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        let value = match data_type {
            DataType::Int32 => Self::Number(f64::from(reader.read_int32()?)),
            DataType::Int64 => Self::Number(reader.read_int64()? as f64),
            DataType::Float32 => Self::Number(f64::from(reader.read_float32()?)),
            DataType::Float64 => Self::Number(reader.read_float64()?),
            DataType::StringV => Self::Text(reader.read_string_v()?),
            other => match (other.string_length(), other.size()) {
                (Some(length), _) => Self::Text(reader.read_string(length)?),
                (None, Some(size)) => {
                    reader.skip(size)?;
                    Self::default()
                }
                (None, None) => {
                    return Err(ModelError::InvalidValue {
                        value: other.to_string(),
                        reason: "not a data definition type".to_string(),
                    })
                }
            },
        };
        Ok(value)
    }
}

impl From<f64> for SimValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for SimValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<bool> for SimValue {
    fn from(value: bool) -> Self {
        Self::Number(if value { 1.0 } else { 0.0 })
    }
}

impl From<&str> for SimValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for SimValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One object in the simulation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct SimObject {
    /// Kind of object.
    pub object_type: Option<SimObjectType>,
    /// Container title.
    pub title: String,
    /// Livery name.
    pub livery: String,
    /// Variables by upper-cased name.
    pub variables: HashMap<String, SimValue>,
}

impl SimObject {
    /// An object of `object_type` titled `title`.
    pub fn new(object_type: SimObjectType, title: impl Into<String>, livery: impl Into<String>) -> Self {
        let title = title.into();
        let mut object = Self {
            object_type: Some(object_type),
            livery: livery.into(),
            title: title.clone(),
            variables: HashMap::new(),
        };
        object.set("TITLE", title);
        object
    }

    /// The value of `name`, 0 when never set.
    pub fn get(&self, name: &str) -> SimValue {
        self.variables
            .get(&name.to_uppercase())
            .cloned()
            .unwrap_or_default()
    }

    /// Set `name` to `value`.
    pub fn set(&mut self, name: &str, value: impl Into<SimValue>) {
        self.variables.insert(name.to_uppercase(), value.into());
    }

    /// True if a by-type request for `wanted` includes this object.
    pub fn matches(&self, wanted: SimObjectType, is_user: bool) -> bool {
        match wanted {
            SimObjectType::All => true,
            SimObjectType::User | SimObjectType::UserAvatar | SimObjectType::UserCurrent => is_user,
            kind => self.object_type == Some(kind),
        }
    }
}

/// An airport with its display name.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AirportRecord {
    /// Full name.
    pub name: String,
    /// Ident, region and position.
    pub facility: FacilityAirport,
}

impl AirportRecord {
    /// An airport at the given position (degrees, meters).
    pub fn new(ident: &str, region: &str, name: &str, latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            name: name.to_string(),
            facility: FacilityAirport {
                ident: ident.to_string(),
                region: region.to_string(),
                latitude,
                longitude,
                altitude,
            },
        }
    }

    /// Append the value of a facility definition field to `builder`.
    /// Returns `false` for names the mock does not know.
    pub fn write_field(&self, field: &str, builder: &mut DataBlockBuilder) -> bool {
        let (data_type, value): (DataType, SimValue) = match field.to_uppercase().as_str() {
            "IS_CLOSED" => {
                builder.add_bytes(&[0]);
                return true;
            }
            "LATITUDE" | "TOWER_LATITUDE" => (DataType::Float64, self.facility.latitude.into()),
            "LONGITUDE" | "TOWER_LONGITUDE" => (DataType::Float64, self.facility.longitude.into()),
            "ALTITUDE" | "TOWER_ALTITUDE" => (DataType::Float64, self.facility.altitude.into()),
            "ICAO" => (DataType::String8, self.facility.ident.as_str().into()),
            "REGION" => (DataType::String8, self.facility.region.as_str().into()),
            "COUNTRY" | "CITY_STATE" => (DataType::String256, "".into()),
            "NAME" => (DataType::String32, self.name.as_str().into()),
            "NAME64" => (DataType::String64, self.name.as_str().into()),
            "MAGVAR" | "TRANSITION_ALTITUDE" | "TRANSITION_LEVEL" => (DataType::Float32, 0.0.into()),
            name if name.starts_with("N_") => (DataType::Int32, 0.0.into()),
            _ => return false,
        };
        value.write(data_type, builder);
        true
    }
}

/// Everything the mock simulator simulates.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct World {
    /// Live objects by id. The user aircraft is [`USER_OBJECT_ID`].
    pub objects: BTreeMap<SimObjectId, SimObject>,
    /// Installed titles and liveries by object kind.
    pub liveries: BTreeMap<SimObjectType, Vec<SimObjectLivery>>,
    /// Known airports.
    pub airports: Vec<AirportRecord>,
    /// System state replies by lower-cased state name.
    pub system_states: BTreeMap<String, SystemStateMessage>,
    next_object_id: SimObjectId,
}

fn livery(title: &str, livery: &str) -> SimObjectLivery {
    SimObjectLivery {
        title: title.to_string(),
        livery: livery.to_string(),
    }
}

fn state(integer: u32, float: f32, string: &str) -> SystemStateMessage {
    SystemStateMessage {
        request_id: 0,
        integer,
        float,
        string: string.to_string(),
    }
}

impl Default for World {
    fn default() -> Self {
        let mut user = SimObject::new(SimObjectType::Aircraft, "Mock Trainer", "Default");
        user.set("PLANE LATITUDE", 52.3086);
        user.set("PLANE LONGITUDE", 4.7639);
        user.set("PLANE ALTITUDE", 2500.0);
        user.set("AIRSPEED INDICATED", 110.0);
        user.set("ATC ID", "PH-MCK");

        let mut objects = BTreeMap::new();
        objects.insert(USER_OBJECT_ID, user);

        let mut liveries = BTreeMap::new();
        liveries.insert(
            SimObjectType::Aircraft,
            vec![
                livery("Mock Trainer", "Default"),
                livery("Mock Trainer", "Red Stripe"),
                livery("Mock Jet", "Default"),
                livery("Mock Jet", "Night"),
                livery("Mock Airliner", "House"),
            ],
        );
        liveries.insert(SimObjectType::Helicopter, vec![livery("Mock Rotor", "Default")]);
        liveries.insert(SimObjectType::Boat, Vec::new());

        let airports = vec![
            AirportRecord::new("EHAM", "EH", "Amsterdam Schiphol", 52.3086, 4.7639, -3.4),
            AirportRecord::new("EGLL", "EG", "London Heathrow", 51.4775, -0.4614, 25.0),
            AirportRecord::new("KJFK", "K6", "John F Kennedy Intl", 40.6398, -73.7789, 3.9),
            AirportRecord::new("KSEA", "K1", "Seattle Tacoma Intl", 47.4490, -122.3093, 131.7),
        ];

        let mut system_states = BTreeMap::new();
        system_states.insert(
            "aircraftloaded".to_string(),
            state(0, 0.0, "SimObjects\\Airplanes\\Mock Trainer\\aircraft.cfg"),
        );
        system_states.insert("flightloaded".to_string(), state(0, 0.0, "flights\\mock\\Schiphol.FLT"));
        system_states.insert("flightplan".to_string(), state(0, 0.0, ""));
        system_states.insert("dialogmode".to_string(), state(0, 0.0, ""));
        system_states.insert("sim".to_string(), state(1, 0.0, ""));

        Self {
            objects,
            liveries,
            airports,
            system_states,
            next_object_id: FIRST_SPAWNED_ID,
        }
    }
}

impl World {
    /// Resolve the well-known user ids onto the user aircraft.
    pub fn resolve(object_id: SimObjectId) -> SimObjectId {
        if object_id <= simconnect_models::object_id::USER_CURRENT {
            USER_OBJECT_ID
        } else {
            object_id
        }
    }

    /// The object `object_id` refers to.
    pub fn object(&self, object_id: SimObjectId) -> Option<&SimObject> {
        self.objects.get(&Self::resolve(object_id))
    }

    /// Mutable access to the object `object_id` refers to.
    pub fn object_mut(&mut self, object_id: SimObjectId) -> Option<&mut SimObject> {
        self.objects.get_mut(&Self::resolve(object_id))
    }

    /// Add `object` and return its new id.
    pub fn spawn(&mut self, object: SimObject) -> SimObjectId {
        let id = self.next_object_id;
        self.next_object_id += 1;
        self.objects.insert(id, object);
        id
    }

    /// The installed kind of `title`, if any.
    pub fn installed_kind(&self, title: &str) -> Option<SimObjectType> {
        self.liveries.iter().find_map(|(kind, items)| {
            items
                .iter()
                .any(|item| item.title.eq_ignore_ascii_case(title))
                .then_some(*kind)
        })
    }

    /// Installed liveries of `object_type`; [`SimObjectType::All`] lists
    /// every kind.
    pub fn liveries_of(&self, object_type: SimObjectType) -> Vec<SimObjectLivery> {
        match object_type {
            SimObjectType::All => self.liveries.values().flatten().cloned().collect(),
            kind => self.liveries.get(&kind).cloned().unwrap_or_default(),
        }
    }

    /// Airports with `ident`, narrowed to `region` unless it is empty.
    pub fn find_airports(&self, ident: &str, region: &str) -> Vec<&AirportRecord> {
        self.airports
            .iter()
            .filter(|airport| airport.facility.ident.eq_ignore_ascii_case(ident))
            .filter(|airport| region.is_empty() || airport.facility.region.eq_ignore_ascii_case(region))
            .collect()
    }

    /// Ids of the objects a by-type request for `object_type` covers.
    pub fn objects_of(&self, object_type: SimObjectType) -> Vec<SimObjectId> {
        self.objects
            .iter()
            .filter(|(id, object)| object.matches(object_type, **id == USER_OBJECT_ID))
            .map(|(id, _)| *id)
            .collect()
    }
}
