//! Positional value types exchanged with the host.
//!
//! All records here have a packed, bit-exact wire layout; `WIRE_SIZE` is the
//! number of bytes the host expects.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── LatLonAlt ────────────────────────────────────────────────────────────

/// Latitude and longitude in degrees, altitude in feet.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLonAlt {
    /// Degrees, positive north.
    pub latitude: f64,
    /// Degrees, positive east.
    pub longitude: f64,
    /// Feet.
    pub altitude: f64,
}

impl LatLonAlt {
    /// Wire size in bytes.
    pub const WIRE_SIZE: usize = 24;

    /// A position from its three components.
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    /// `'N'`, `'S'`, or `' '` on the equator.
    pub fn latitude_direction(&self) -> char {
        direction(self.latitude, 'N', 'S')
    }

    /// `'E'`, `'W'`, or `' '` on the prime meridian.
    pub fn longitude_direction(&self) -> char {
        direction(self.longitude, 'E', 'W')
    }
}

impl fmt::Display for LatLonAlt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:.6} {}{:.6} {:.0}ft",
            self.latitude_direction(),
            self.latitude.abs(),
            self.longitude_direction(),
            self.longitude.abs(),
            self.altitude
        )
    }
}

/// [`LatLonAlt`] plus the local magnetic variation, as facility records carry it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct LatLonAltMagVar {
    /// Degrees, positive north.
    pub latitude: f64,
    /// Degrees, positive east.
    pub longitude: f64,
    /// Feet.
    pub altitude: f64,
    /// Magnetic variation in degrees, positive east.
    pub mag_var: f32,
}

impl LatLonAltMagVar {
    /// A position with magnetic variation.
    pub fn new(latitude: f64, longitude: f64, altitude: f64, mag_var: f32) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            mag_var,
        }
    }

    /// `'N'`, `'S'`, or `' '` on the equator.
    pub fn latitude_direction(&self) -> char {
        direction(self.latitude, 'N', 'S')
    }

    /// `'E'`, `'W'`, or `' '` on the prime meridian.
    pub fn longitude_direction(&self) -> char {
        direction(self.longitude, 'E', 'W')
    }

    /// `'E'`, `'W'`, or `' '` when there is no variation.
    pub fn mag_var_direction(&self) -> char {
        direction(f64::from(self.mag_var), 'E', 'W')
    }

    /// The position without the variation.
    pub fn lat_lon_alt(&self) -> LatLonAlt {
        LatLonAlt::new(self.latitude, self.longitude, self.altitude)
    }
}

fn direction(value: f64, positive: char, negative: char) -> char {
    if value > 0.0 {
        positive
    } else if value < 0.0 {
        negative
    } else {
        ' '
    }
}

// ── Xyz ──────────────────────────────────────────────────────────────────

/// A three-component vector.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Xyz {
    /// X component.
    pub x: f64,
    /// Y component.
    pub y: f64,
    /// Z component.
    pub z: f64,
}

impl Xyz {
    /// Wire size in bytes.
    pub const WIRE_SIZE: usize = 24;

    /// A vector from its components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

// ── MarkerState ──────────────────────────────────────────────────────────

/// Named on/off marker.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct MarkerState {
    /// Marker name, at most 63 bytes on the wire.
    pub name: String,
    /// Whether the marker is shown.
    pub on: bool,
}

impl MarkerState {
    /// Wire size in bytes.
    pub const WIRE_SIZE: usize = 68;

    /// A marker with the given state.
    pub fn new(name: impl Into<String>, on: bool) -> Self {
        Self {
            name: name.into(),
            on,
        }
    }
}

// ── Waypoint ─────────────────────────────────────────────────────────────

/// One waypoint of an AI flight path.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct Waypoint {
    /// Degrees, positive north.
    pub latitude: f64,
    /// Degrees, positive east.
    pub longitude: f64,
    /// Feet.
    pub altitude: f64,
    /// Host waypoint flags.
    pub flags: u32,
    /// Speed in knots.
    pub kts_speed: f64,
    /// Throttle percentage.
    pub percent_throttle: f64,
}

impl Waypoint {
    /// Wire size in bytes.
    pub const WIRE_SIZE: usize = 44;
}

// ── InitPosition ─────────────────────────────────────────────────────────

/// Starting position and attitude of a created or repositioned object.
///
/// Setters are fluent and return a modified copy:
///
/// ```
/// use simconnect_models::InitPosition;
///
/// let pos = InitPosition::in_air_at(52.0, 4.0, 3000.0, 180)
///     .with_heading(90.0);
/// assert!(!pos.on_ground);
/// assert_eq!(pos.airspeed, 180);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct InitPosition {
    /// Degrees, positive north.
    pub latitude: f64,
    /// Degrees, positive east.
    pub longitude: f64,
    /// Feet.
    pub altitude: f64,
    /// Degrees.
    pub pitch: f64,
    /// Degrees.
    pub bank: f64,
    /// Degrees.
    pub heading: f64,
    /// Start on the ground.
    pub on_ground: bool,
    /// Knots, or one of the `AIRSPEED_*` markers.
    pub airspeed: u32,
}

impl Default for InitPosition {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            altitude: 0.0,
            pitch: 0.0,
            bank: 0.0,
            heading: 0.0,
            on_ground: true,
            airspeed: 0,
        }
    }
}

impl InitPosition {
    /// Wire size in bytes.
    pub const WIRE_SIZE: usize = 56;
    /// Airspeed marker: use the aircraft's cruise speed.
    pub const AIRSPEED_CRUISE: u32 = u32::MAX;
    /// Airspeed marker: keep the current airspeed.
    pub const AIRSPEED_KEEP: u32 = u32::MAX - 1;

    /// A grounded position at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// A grounded position at the given coordinates.
    pub fn on_ground_at(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            ..Self::default()
        }
    }

    /// An airborne position at the given coordinates and airspeed.
    pub fn in_air_at(latitude: f64, longitude: f64, altitude: f64, airspeed: u32) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            on_ground: false,
            airspeed,
            ..Self::default()
        }
    }

    /// A grounded position at `lla`.
    pub fn from_lat_lon_alt(lla: LatLonAlt) -> Self {
        Self::on_ground_at(lla.latitude, lla.longitude, lla.altitude)
    }

    /// Set the latitude.
    #[must_use]
    pub fn with_latitude(mut self, latitude: f64) -> Self {
        self.latitude = latitude;
        self
    }

    /// Set the longitude.
    #[must_use]
    pub fn with_longitude(mut self, longitude: f64) -> Self {
        self.longitude = longitude;
        self
    }

    /// Set the altitude.
    #[must_use]
    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    /// Set the pitch.
    #[must_use]
    pub fn with_pitch(mut self, pitch: f64) -> Self {
        self.pitch = pitch;
        self
    }

    /// Set the bank.
    #[must_use]
    pub fn with_bank(mut self, bank: f64) -> Self {
        self.bank = bank;
        self
    }

    /// Set the heading.
    #[must_use]
    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    /// Set whether the object starts on the ground.
    #[must_use]
    pub fn with_on_ground(mut self, on_ground: bool) -> Self {
        self.on_ground = on_ground;
        self
    }

    /// Set the airspeed in knots.
    #[must_use]
    pub fn with_airspeed(mut self, airspeed: u32) -> Self {
        self.airspeed = airspeed;
        self
    }

    /// Start at cruise speed.
    #[must_use]
    pub fn at_cruise_speed(self) -> Self {
        self.with_airspeed(Self::AIRSPEED_CRUISE)
    }

    /// Keep the current airspeed.
    #[must_use]
    pub fn keep_airspeed(self) -> Self {
        self.with_airspeed(Self::AIRSPEED_KEEP)
    }

    /// The coordinates without attitude.
    pub fn lat_lon_alt(&self) -> LatLonAlt {
        LatLonAlt::new(self.latitude, self.longitude, self.altitude)
    }
}
