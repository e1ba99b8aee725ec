//! Typed facility records.
//!
//! A facility data reply carries the fields of one scope in the order they
//! were added to the definition. Each record here lists its fields in
//! [`FacilityRecord::FIELDS`]; a definition that requests exactly those
//! fields for the scope can be decoded with [`FacilityRecord::decode`].
//!
//! Only the layouts shared by both simulator generations are modelled.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data_block_reader::DataBlockReader;
use crate::error::ModelError;
use crate::messages::FacilityDataMessage;
use crate::position::LatLonAlt;

/// Width of an ICAO ident field.
pub const ICAO_LENGTH: usize = 8;
/// Width of a region field.
pub const REGION_LENGTH: usize = 8;
/// Width of the country and city/state fields.
pub const COUNTRY_LENGTH: usize = 256;
/// Width of a short name field.
pub const NAME_LENGTH: usize = 32;
/// Width of a long name field.
pub const NAME64_LENGTH: usize = 64;

/// Meters to feet.
pub const METERS_TO_FEET: f64 = 3.28084;

const EARTH_RADIUS_METERS: f64 = 6_378_137.0;

/// Kind of record in a facility data reply.
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
pub enum FacilityDataType {
    /// Airport.
    Airport = 0,
    /// Runway.
    Runway = 1,
    /// Start.
    Start = 2,
    /// Frequency.
    Frequency = 3,
    /// Helipad.
    Helipad = 4,
    /// Approach.
    Approach = 5,
    /// Approach transition.
    ApproachTransition = 6,
    /// Approach leg.
    ApproachLeg = 7,
    /// Final approach leg.
    FinalApproachLeg = 8,
    /// Missed approach leg.
    MissedApproachLeg = 9,
    /// Departure.
    Departure = 10,
    /// Arrival.
    Arrival = 11,
    /// Runway transition.
    RunwayTransition = 12,
    /// Enroute transition.
    EnrouteTransition = 13,
    /// Taxi point.
    TaxiPoint = 14,
    /// Taxi parking.
    TaxiParking = 15,
    /// Taxi path.
    TaxiPath = 16,
    /// Taxi name.
    TaxiName = 17,
    /// Jetway.
    Jetway = 18,
    /// VOR.
    Vor = 19,
    /// NDB.
    Ndb = 20,
    /// Waypoint.
    Waypoint = 21,
    /// Route.
    Route = 22,
    /// Pavement.
    Pavement = 23,
    /// Approach lights.
    ApproachLights = 24,
    /// VASI.
    Vasi = 25,
    /// Visual docking guidance system.
    Vdgs = 26,
    /// Holding pattern.
    HoldingPattern = 27,
    /// Taxi parking airline.
    TaxiParkingAirline = 28,
}

/// A record decoded from one facility data reply.
pub trait FacilityRecord: Sized {
    /// Record kind the host tags the reply with.
    const DATA_TYPE: FacilityDataType;
    /// Field names to request, in decode order.
    const FIELDS: &'static [&'static str];

    /// Read the record at the cursor.
    ///
    /// # Errors
    ///
    /// [`ModelError::OutOfRange`] when the data is short, and
    /// [`ModelError::InvalidValue`] for an enumeration value the host does
    /// not define.
    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError>;

    /// Decode a whole reply body.
    ///
    /// # Errors
    ///
    /// As [`read`](Self::read).
    fn decode(data: &[u8]) -> Result<Self, ModelError> {
        Self::read(&mut DataBlockReader::new(data))
    }

    /// True when `data_type` is the tag of this record.
    fn matches(data_type: u32) -> bool {
        FacilityDataType::from_repr(data_type) == Some(Self::DATA_TYPE)
    }
}

impl FacilityDataMessage {
    /// The reply body as `R`, or `None` when the reply is tagged as another
    /// record kind.
    pub fn record<R: FacilityRecord>(&self) -> Option<Result<R, ModelError>> {
        R::matches(self.data_type).then(|| R::decode(&self.data))
    }
}

fn read_i8(reader: &mut DataBlockReader<'_>) -> Result<i8, ModelError> {
    reader.read_bytes(1).map(|bytes| i8::from_le_bytes([bytes[0]]))
}

fn read_enum<T>(reader: &mut DataBlockReader<'_>, name: &str, from_repr: fn(i32) -> Option<T>) -> Result<T, ModelError> {
    let raw = reader.read_int32()?;
    from_repr(raw).ok_or_else(|| ModelError::InvalidValue {
        value: raw.to_string(),
        reason: format!("not a {name}"),
    })
}

// ── Airport ──────────────────────────────────────────────────────────────

/// Number of child records of each kind an airport has.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AirportChildCounts {
    /// Runways.
    pub runways: i32,
    /// Start positions.
    pub starts: i32,
    /// Radio frequencies.
    pub frequencies: i32,
    /// Helipads.
    pub helipads: i32,
    /// Approaches.
    pub approaches: i32,
    /// Departure procedures.
    pub departures: i32,
    /// Arrival procedures.
    pub arrivals: i32,
    /// Taxi network nodes.
    pub taxi_points: i32,
    /// Parking spots.
    pub taxi_parkings: i32,
    /// Taxi network edges.
    pub taxi_paths: i32,
    /// Taxiway names.
    pub taxi_names: i32,
    /// Jetways.
    pub jetways: i32,
    /// Docking guidance systems.
    pub vdgs: i32,
    /// Holding patterns.
    pub holding_patterns: i32,
}

/// Top-level airport fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AirportData {
    /// Closed to traffic.
    pub is_closed: bool,
    /// ICAO ident.
    pub icao: String,
    /// Region code.
    pub region: String,
    /// Country name.
    pub country: String,
    /// City and state.
    pub city_state: String,
    /// Short name.
    pub name: String,
    /// Full name.
    pub name64: String,
    /// Degrees.
    pub latitude: f64,
    /// Degrees.
    pub longitude: f64,
    /// Meters.
    pub altitude: f64,
    /// Degrees.
    pub mag_var: f32,
    /// Tower position, altitude in meters.
    pub tower: LatLonAlt,
    /// Feet.
    pub transition_altitude: f32,
    /// Feet.
    pub transition_level: f32,
    /// Child record counts.
    pub counts: AirportChildCounts,
}

impl AirportData {
    /// Airport position, altitude in meters.
    pub fn position(&self) -> LatLonAlt {
        LatLonAlt::new(self.latitude, self.longitude, self.altitude)
    }
}

impl FacilityRecord for AirportData {
    const DATA_TYPE: FacilityDataType = FacilityDataType::Airport;
    const FIELDS: &'static [&'static str] = &[
        "IS_CLOSED",
        "ICAO",
        "REGION",
        "COUNTRY",
        "CITY_STATE",
        "NAME",
        "NAME64",
        "LATITUDE",
        "LONGITUDE",
        "ALTITUDE",
        "MAGVAR",
        "TOWER_LATITUDE",
        "TOWER_LONGITUDE",
        "TOWER_ALTITUDE",
        "TRANSITION_ALTITUDE",
        "TRANSITION_LEVEL",
        "N_RUNWAYS",
        "N_STARTS",
        "N_FREQUENCIES",
        "N_HELIPADS",
        "N_APPROACHES",
        "N_DEPARTURES",
        "N_ARRIVALS",
        "N_TAXI_POINTS",
        "N_TAXI_PARKINGS",
        "N_TAXI_PATHS",
        "N_TAXI_NAMES",
        "N_JETWAYS",
        "N_VDGS",
        "N_HOLDING_PATTERNS",
    ];

    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            is_closed: read_i8(reader)? != 0,
            icao: reader.read_string(ICAO_LENGTH)?,
            region: reader.read_string(REGION_LENGTH)?,
            country: reader.read_string(COUNTRY_LENGTH)?,
            city_state: reader.read_string(COUNTRY_LENGTH)?,
            name: reader.read_string(NAME_LENGTH)?,
            name64: reader.read_string(NAME64_LENGTH)?,
            latitude: reader.read_float64()?,
            longitude: reader.read_float64()?,
            altitude: reader.read_float64()?,
            mag_var: reader.read_float32()?,
            tower: reader.read_lat_lon_alt()?,
            transition_altitude: reader.read_float32()?,
            transition_level: reader.read_float32()?,
            counts: AirportChildCounts {
                runways: reader.read_int32()?,
                starts: reader.read_int32()?,
                frequencies: reader.read_int32()?,
                helipads: reader.read_int32()?,
                approaches: reader.read_int32()?,
                departures: reader.read_int32()?,
                arrivals: reader.read_int32()?,
                taxi_points: reader.read_int32()?,
                taxi_parkings: reader.read_int32()?,
                taxi_paths: reader.read_int32()?,
                taxi_names: reader.read_int32()?,
                jetways: reader.read_int32()?,
                vdgs: reader.read_int32()?,
                holding_patterns: reader.read_int32()?,
            },
        })
    }
}

// ── Runway ───────────────────────────────────────────────────────────────

/// Runway surface material.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum RunwaySurface {
    /// Concrete.
    #[default]
    Concrete = 0,
    /// Grass.
    Grass = 1,
    /// Water FSX.
    #[strum(serialize = "Water FSX")]
    WaterFsx = 2,
    /// Grass bumpy.
    #[strum(serialize = "Grass Bumpy")]
    GrassBumpy = 3,
    /// Asphalt.
    Asphalt = 4,
    /// Short grass.
    #[strum(serialize = "Short Grass")]
    ShortGrass = 5,
    /// Long grass.
    #[strum(serialize = "Long Grass")]
    LongGrass = 6,
    /// Hard turf.
    #[strum(serialize = "Hard Turf")]
    HardTurf = 7,
    /// Snow.
    Snow = 8,
    /// Ice.
    Ice = 9,
    /// Urban.
    Urban = 10,
    /// Forest.
    Forest = 11,
    /// Dirt.
    Dirt = 12,
    /// Coral.
    Coral = 13,
    /// Gravel.
    Gravel = 14,
    /// Oil treated.
    #[strum(serialize = "Oil Treated")]
    OilTreated = 15,
    /// Steel mats.
    #[strum(serialize = "Steel Mats")]
    SteelMats = 16,
    /// Bituminus.
    Bituminus = 17,
    /// Brick.
    Brick = 18,
    /// Macadam.
    Macadam = 19,
    /// Planks.
    Planks = 20,
    /// Sand.
    Sand = 21,
    /// Shale.
    Shale = 22,
    /// Tarmac.
    Tarmac = 23,
    /// Wright flyer track.
    #[strum(serialize = "Wright Flyer Track")]
    WrightFlyerTrack = 24,
    /// Ocean.
    Ocean = 26,
    /// Water.
    Water = 27,
    /// Pond.
    Pond = 28,
    /// Lake.
    Lake = 29,
    /// River.
    River = 30,
    /// Waste water.
    #[strum(serialize = "Waste Water")]
    WasteWater = 31,
    /// Paint.
    Paint = 32,
    /// Unknown.
    Unknown = 254,
    /// Undefined.
    Undefined = 255,
}

/// Kind of facility an ILS reference points at.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum IlsType {
    /// None.
    #[default]
    None = 0,
    /// Airport.
    Airport = b'A' as i32,
    /// VOR.
    Vor = b'V' as i32,
    /// NDB.
    Ndb = b'N' as i32,
    /// Waypoint.
    Waypoint = b'W' as i32,
}

/// Runway end number: a heading in tens of degrees or a compass point.
///
/// Stored as the host value; 0 means none and 1 to 36 are headings.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RunwayNumber(pub i32);

impl RunwayNumber {
    const COMPASS: [&'static str; 8] = [
        "North",
        "NorthEast",
        "East",
        "SouthEast",
        "South",
        "SouthWest",
        "West",
        "NorthWest",
    ];

    /// True for 1 to 36.
    pub fn is_heading(self) -> bool {
        (1..=36).contains(&self.0)
    }
}

impl fmt::Display for RunwayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            0 => Ok(()),
            1..=36 => write!(f, "{:02}", self.0),
            37..=44 => f.write_str(Self::COMPASS[(self.0 - 37) as usize]),
            _ => f.write_str("Invalid"),
        }
    }
}

/// Runway designator letter.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum RunwayDesignator {
    /// None.
    #[default]
    #[strum(serialize = "")]
    None = 0,
    /// Left.
    #[strum(serialize = "L")]
    Left = 1,
    /// Right.
    #[strum(serialize = "R")]
    Right = 2,
    /// Center.
    #[strum(serialize = "C")]
    Center = 3,
    /// Water.
    Water = 4,
    /// A.
    A = 5,
    /// B.
    B = 6,
}

/// One end of a runway.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RunwayEnd {
    /// Ident of the ILS serving this end, empty for none.
    pub ils_icao: String,
    /// Region of the ILS.
    pub ils_region: String,
    /// Facility kind of the ILS.
    pub ils_type: IlsType,
    /// Heading number or compass point.
    pub number: RunwayNumber,
    /// Designator letter.
    pub designator: RunwayDesignator,
}

impl RunwayEnd {
    fn read_ils(reader: &mut DataBlockReader<'_>) -> Result<(String, String), ModelError> {
        Ok((reader.read_string(ICAO_LENGTH)?, reader.read_string(REGION_LENGTH)?))
    }

    fn read_rest(reader: &mut DataBlockReader<'_>, (ils_icao, ils_region): (String, String)) -> Result<Self, ModelError> {
        Ok(Self {
            ils_icao,
            ils_region,
            ils_type: read_enum(reader, "ILS type", IlsType::from_repr)?,
            number: RunwayNumber(reader.read_int32()?),
            designator: read_enum(reader, "runway designator", RunwayDesignator::from_repr)?,
        })
    }

    /// Number and designator, as painted on the runway: `09L`.
    pub fn label(&self) -> String {
        match self.designator {
            RunwayDesignator::None => self.number.to_string(),
            designator => format!("{}{designator}", self.number),
        }
    }
}

/// Runway fields. Both ends share the surface and dimensions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct RunwayData {
    /// Center of the runway, altitude in meters.
    pub position: LatLonAlt,
    /// Degrees true, primary end.
    pub heading: f32,
    /// Meters.
    pub length: f32,
    /// Meters.
    pub width: f32,
    /// Meters.
    pub pattern_altitude: f32,
    /// Degrees.
    pub slope: f32,
    /// Degrees.
    pub true_slope: f32,
    /// Surface material.
    pub surface: RunwaySurface,
    /// Primary end.
    pub primary: RunwayEnd,
    /// Opposite end.
    pub secondary: RunwayEnd,
}

impl RunwayData {
    /// Length in feet.
    pub fn length_feet(&self) -> f64 {
        f64::from(self.length) * METERS_TO_FEET
    }

    /// Width in feet.
    pub fn width_feet(&self) -> f64 {
        f64::from(self.width) * METERS_TO_FEET
    }

    /// Both end labels: `09L/27R`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.primary.label(), self.secondary.label())
    }
}

impl FacilityRecord for RunwayData {
    const DATA_TYPE: FacilityDataType = FacilityDataType::Runway;
    const FIELDS: &'static [&'static str] = &[
        "LATITUDE",
        "LONGITUDE",
        "ALTITUDE",
        "HEADING",
        "LENGTH",
        "WIDTH",
        "PATTERN_ALTITUDE",
        "SLOPE",
        "TRUE_SLOPE",
        "SURFACE",
        "PRIMARY_ILS_ICAO",
        "PRIMARY_ILS_REGION",
        "PRIMARY_ILS_TYPE",
        "PRIMARY_NUMBER",
        "PRIMARY_DESIGNATOR",
        "SECONDARY_ILS_ICAO",
        "SECONDARY_ILS_REGION",
        "SECONDARY_ILS_TYPE",
        "SECONDARY_NUMBER",
        "SECONDARY_DESIGNATOR",
    ];

    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        let position = reader.read_lat_lon_alt()?;
        let heading = reader.read_float32()?;
        let length = reader.read_float32()?;
        let width = reader.read_float32()?;
        let pattern_altitude = reader.read_float32()?;
        let slope = reader.read_float32()?;
        let true_slope = reader.read_float32()?;
        let surface = read_enum(reader, "runway surface", RunwaySurface::from_repr)?;
        let primary_ils = RunwayEnd::read_ils(reader)?;
        let primary = RunwayEnd::read_rest(reader, primary_ils)?;
        let secondary_ils = RunwayEnd::read_ils(reader)?;
        let secondary = RunwayEnd::read_rest(reader, secondary_ils)?;
        Ok(Self {
            position,
            heading,
            length,
            width,
            pattern_altitude,
            slope,
            true_slope,
            surface,
            primary,
            secondary,
        })
    }
}

// ── Taxi parking ─────────────────────────────────────────────────────────

/// Kind of parking spot.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum TaxiParkingType {
    /// None.
    #[default]
    None = 0,
    /// Ramp GA.
    RampGa = 1,
    /// Ramp GA small.
    RampGaSmall = 2,
    /// Ramp GA medium.
    RampGaMedium = 3,
    /// Ramp GA large.
    RampGaLarge = 4,
    /// Ramp cargo.
    RampCargo = 5,
    /// Military ramp, cargo.
    RampMilCargo = 6,
    /// Military ramp, combat.
    RampMilCombat = 7,
    /// Gate small.
    GateSmall = 8,
    /// Gate medium.
    GateMedium = 9,
    /// Gate heavy.
    GateHeavy = 10,
    /// Dock GA.
    DockGa = 11,
    /// Fuel.
    Fuel = 12,
    /// Vehicle.
    Vehicle = 13,
    /// Ramp GA extra.
    RampGaExtra = 14,
    /// Gate extra.
    GateExtra = 15,
}

/// Kind of taxi network node.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum TaxiPointType {
    /// None.
    #[default]
    None = 0,
    /// Normal.
    Normal = 1,
    /// Hold short.
    HoldShort = 2,
    /// ILS hold short.
    IlsHoldShort = 4,
    /// Hold short no draw.
    HoldShortNoDraw = 5,
    /// ILS hold short no draw.
    IlsHoldShortNoDraw = 6,
}

/// Parking name or suffix code. Codes 12 to 37 are `Gate A` to `Gate Z`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ParkingName(pub i32);

impl ParkingName {
    /// No name.
    pub const NONE: Self = Self(0);
    /// Plain `Parking`.
    pub const PARKING: Self = Self(1);
    /// Plain `Gate`.
    pub const GATE: Self = Self(10);
    /// `Dock`.
    pub const DOCK: Self = Self(11);

    const NAMES: [&'static str; 12] = [
        "",
        "Parking",
        "N Parking",
        "NE Parking",
        "E Parking",
        "SE Parking",
        "S Parking",
        "SW Parking",
        "W Parking",
        "NW Parking",
        "Gate",
        "Dock",
    ];

    /// `Gate A` to `Gate Z`; `None` for other letters.
    pub fn gate(letter: char) -> Option<Self> {
        letter
            .is_ascii_uppercase()
            .then(|| Self(12 + i32::from(letter as u8 - b'A')))
    }

    /// True for a valid code.
    pub fn is_known(self) -> bool {
        (0..=37).contains(&self.0)
    }
}

impl fmt::Display for ParkingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            code @ 0..=11 => f.write_str(Self::NAMES[code as usize]),
            code @ 12..=37 => write!(f, "Gate {}", char::from(b'A' + (code - 12) as u8)),
            _ => Ok(()),
        }
    }
}

/// Which way an aircraft faces when parked.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, strum::Display, strum::FromRepr)]
#[repr(i32)]
pub enum ParkingOrientation {
    /// Forward.
    #[default]
    Forward = 0,
    /// Reverse.
    Reverse = 1,
}

/// Parking spot fields. The position is an offset from the airport.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TaxiParkingData {
    /// Spot kind.
    pub kind: TaxiParkingType,
    /// Taxi node kind.
    pub taxi_point_type: TaxiPointType,
    /// Name code.
    pub name: ParkingName,
    /// Suffix letter code.
    pub suffix: ParkingName,
    /// Spot number, 0 for none.
    pub number: i32,
    /// Parking direction.
    pub orientation: ParkingOrientation,
    /// Degrees true.
    pub heading: f32,
    /// Meters.
    pub radius: f32,
    /// Meters north of the airport reference point.
    pub bias_x: f32,
    /// Meters east of the airport reference point.
    pub bias_z: f32,
}

/// Sort key that identifies a spot within its airport.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParkingKey {
    /// Name code.
    pub name: ParkingName,
    /// Spot number.
    pub number: i32,
    /// Suffix letter code.
    pub suffix: ParkingName,
}

impl TaxiParkingData {
    /// Display name: `Gate A 12 B`. Parts that are unset are left out.
    pub fn display_name(&self) -> String {
        let mut parts = Vec::with_capacity(3);
        let name = self.name.to_string();
        if !name.is_empty() {
            parts.push(name);
        }
        if self.number > 0 {
            parts.push(self.number.to_string());
        }
        if self.suffix != ParkingName::NONE {
            let letter = u8::try_from(self.suffix.0 - 1)
                .ok()
                .and_then(|offset| b'A'.checked_add(offset))
                .map_or('?', char::from);
            parts.push(letter.to_string());
        }
        parts.join(" ")
    }

    /// Key for ordering spots by name, number and suffix.
    pub fn key(&self) -> ParkingKey {
        ParkingKey {
            name: self.name,
            number: self.number,
            suffix: self.suffix,
        }
    }

    /// Spot latitude, given the airport reference point.
    pub fn latitude(&self, airport_latitude: f64) -> f64 {
        airport_latitude + (f64::from(self.bias_x) / EARTH_RADIUS_METERS).to_degrees()
    }

    /// Spot longitude, given the airport reference point.
    pub fn longitude(&self, airport_latitude: f64, airport_longitude: f64) -> f64 {
        let radius = EARTH_RADIUS_METERS * airport_latitude.to_radians().cos();
        airport_longitude + (f64::from(self.bias_z) / radius).to_degrees()
    }

    /// Spot position at the airport's altitude.
    pub fn position(&self, airport: &AirportData) -> LatLonAlt {
        LatLonAlt::new(
            self.latitude(airport.latitude),
            self.longitude(airport.latitude, airport.longitude),
            airport.altitude,
        )
    }
}

impl FacilityRecord for TaxiParkingData {
    const DATA_TYPE: FacilityDataType = FacilityDataType::TaxiParking;
    const FIELDS: &'static [&'static str] = &[
        "TYPE",
        "TAXI_POINT_TYPE",
        "NAME",
        "SUFFIX",
        "NUMBER",
        "ORIENTATION",
        "HEADING",
        "RADIUS",
        "BIAS_X",
        "BIAS_Z",
    ];

    fn read(reader: &mut DataBlockReader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            kind: read_enum(reader, "taxi parking type", TaxiParkingType::from_repr)?,
            taxi_point_type: read_enum(reader, "taxi point type", TaxiPointType::from_repr)?,
            name: ParkingName(reader.read_int32()?),
            suffix: ParkingName(reader.read_int32()?),
            number: reader.read_int32()?,
            orientation: read_enum(reader, "parking orientation", ParkingOrientation::from_repr)?,
            heading: reader.read_float32()?,
            radius: reader.read_float32()?,
            bias_x: reader.read_float32()?,
            bias_z: reader.read_float32()?,
        })
    }
}
