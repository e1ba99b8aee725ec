//! Building facility definitions.
//!
//! A facility definition is a flat list of field paths: scopes are opened
//! with `OPEN <SCOPE>`, filled with field names, and closed with
//! `CLOSE <SCOPE>`. The builder checks that scopes nest the way the host
//! allows and are balanced before anything is sent.
//!
//! ```
//! use simconnect_sdk::handlers::{FacilityDefinitionBuilder, FacilityScope};
//!
//! let builder = FacilityDefinitionBuilder::new()
//!     .open(FacilityScope::Airport)
//!     .fields(["ICAO", "LATITUDE", "LONGITUDE"])
//!     .open(FacilityScope::Runway)
//!     .field("HEADING")
//!     .close()
//!     .close();
//! let fields = builder.finish().unwrap();
//! assert_eq!(fields.first().map(String::as_str), Some("OPEN AIRPORT"));
//! assert_eq!(fields.last().map(String::as_str), Some("CLOSE AIRPORT"));
//! ```
//!
//! For the typed records of `simconnect_models` the field list comes from
//! the record itself:
//!
//! ```
//! use simconnect_models::{AirportData, TaxiParkingData};
//! use simconnect_sdk::handlers::{FacilityDefinitionBuilder, FacilityScope};
//!
//! let fields = FacilityDefinitionBuilder::new()
//!     .open(FacilityScope::Airport)
//!     .all_fields::<AirportData>()
//!     .open(FacilityScope::TaxiParking)
//!     .all_fields::<TaxiParkingData>()
//!     .close()
//!     .close()
//!     .finish()
//!     .unwrap();
//! assert_eq!(fields[1], "IS_CLOSED");
//! ```

use serde::{Deserialize, Serialize};
use simconnect_models::{FacilityDataType, FacilityRecord};

use crate::error::{HostResult, SdkError};

/// A record type inside a facility definition.
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
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FacilityScope {
    /// Top level: airport.
    Airport,
    /// Top level: waypoint.
    Waypoint,
    /// Top level: NDB.
    Ndb,
    /// Top level: VOR.
    Vor,
    /// Airport child.
    Runway,
    /// Runway child.
    Pavement,
    /// Runway child.
    ApproachLights,
    /// Runway child.
    Vasi,
    /// Airport child.
    Start,
    /// Airport child.
    Frequency,
    /// Airport child.
    Helipad,
    /// Airport child.
    Approach,
    /// Approach child.
    ApproachTransition,
    /// Child of approaches, transitions and procedures.
    ApproachLeg,
    /// Approach child.
    FinalApproachLeg,
    /// Approach child.
    MissedApproachLeg,
    /// Airport child.
    Departure,
    /// Airport child.
    Arrival,
    /// Departure or arrival child.
    RunwayTransition,
    /// Departure or arrival child.
    EnrouteTransition,
    /// Airport child.
    TaxiPoint,
    /// Airport child.
    TaxiParking,
    /// Taxi parking child.
    Airline,
    /// Airport child.
    TaxiPath,
    /// Airport child.
    TaxiName,
    /// Airport child.
    Jetway,
    /// Airport child.
    Vdgs,
    /// Airport child.
    HoldingPattern,
    /// Waypoint child.
    Route,
}

impl FacilityScope {
    /// Scopes this one may be opened in. Empty for top-level scopes.
    pub fn parents(self) -> &'static [FacilityScope] {
        use FacilityScope::{
            Airport, Approach, ApproachTransition, Arrival, Departure, EnrouteTransition,
            Runway, RunwayTransition, TaxiParking, Waypoint,
        };
        match self {
            Self::Airport | Self::Waypoint | Self::Ndb | Self::Vor => &[],
            Self::Runway
            | Self::Start
            | Self::Frequency
            | Self::Helipad
            | Self::Approach
            | Self::Departure
            | Self::Arrival
            | Self::TaxiPoint
            | Self::TaxiParking
            | Self::TaxiPath
            | Self::TaxiName
            | Self::Jetway
            | Self::Vdgs
            | Self::HoldingPattern => &[Airport],
            Self::Pavement | Self::ApproachLights | Self::Vasi => &[Runway],
            Self::ApproachTransition | Self::FinalApproachLeg | Self::MissedApproachLeg => &[Approach],
            Self::ApproachLeg => &[ApproachTransition, RunwayTransition, EnrouteTransition, Departure, Arrival],
            Self::RunwayTransition | Self::EnrouteTransition => &[Departure, Arrival],
            Self::Airline => &[TaxiParking],
            Self::Route => &[Waypoint],
        }
    }

    /// Scope whose replies are tagged `data_type`.
    pub fn for_data_type(data_type: FacilityDataType) -> Self {
        use FacilityDataType as T;
        match data_type {
            T::Airport => Self::Airport,
            T::Runway => Self::Runway,
            T::Start => Self::Start,
            T::Frequency => Self::Frequency,
            T::Helipad => Self::Helipad,
            T::Approach => Self::Approach,
            T::ApproachTransition => Self::ApproachTransition,
            T::ApproachLeg => Self::ApproachLeg,
            T::FinalApproachLeg => Self::FinalApproachLeg,
            T::MissedApproachLeg => Self::MissedApproachLeg,
            T::Departure => Self::Departure,
            T::Arrival => Self::Arrival,
            T::RunwayTransition => Self::RunwayTransition,
            T::EnrouteTransition => Self::EnrouteTransition,
            T::TaxiPoint => Self::TaxiPoint,
            T::TaxiParking => Self::TaxiParking,
            T::TaxiPath => Self::TaxiPath,
            T::TaxiName => Self::TaxiName,
            T::Jetway => Self::Jetway,
            T::Vor => Self::Vor,
            T::Ndb => Self::Ndb,
            T::Waypoint => Self::Waypoint,
            T::Route => Self::Route,
            T::Pavement => Self::Pavement,
            T::ApproachLights => Self::ApproachLights,
            T::Vasi => Self::Vasi,
            T::Vdgs => Self::Vdgs,
            T::HoldingPattern => Self::HoldingPattern,
            T::TaxiParkingAirline => Self::Airline,
        }
    }

    /// True for scopes that can only appear at the top of a definition.
    pub fn is_top_level(self) -> bool {
        self.parents().is_empty()
    }
}

/// Fluent builder for facility definitions. The first mistake is kept and
/// reported by [`finish`](Self::finish); later calls are ignored.
#[derive(Debug, Clone, Default)]
pub struct FacilityDefinitionBuilder {
    fields: Vec<String>,
    open: Vec<FacilityScope>,
    error: Option<String>,
}

impl FacilityDefinitionBuilder {
    /// An empty definition.
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(mut self, message: String) -> Self {
        if self.error.is_none() {
            self.error = Some(message);
        }
        self
    }

    /// Open `scope` inside the current one.
    #[must_use]
    pub fn open(mut self, scope: FacilityScope) -> Self {
        if self.error.is_some() {
            return self;
        }
        let allowed = match self.open.last() {
            None => scope.is_top_level(),
            Some(parent) => scope.parents().contains(parent),
        };
        if !allowed {
            let parent = self
                .open
                .last()
                .map_or_else(|| "the top level".to_string(), ToString::to_string);
            return self.fail(format!("{scope} cannot be opened in {parent}"));
        }
        self.fields.push(format!("OPEN {scope}"));
        self.open.push(scope);
        self
    }

    /// Close the innermost open scope.
    #[must_use]
    pub fn close(mut self) -> Self {
        if self.error.is_some() {
            return self;
        }
        match self.open.pop() {
            Some(scope) => {
                self.fields.push(format!("CLOSE {scope}"));
                self
            }
            None => self.fail("close without an open scope".into()),
        }
    }

    /// Add one field to the innermost open scope.
    #[must_use]
    pub fn field(mut self, name: &str) -> Self {
        if self.error.is_some() {
            return self;
        }
        let name = name.trim();
        if self.open.is_empty() {
            return self.fail(format!("field {name} outside of any scope"));
        }
        if name.is_empty() || name.starts_with("OPEN ") || name.starts_with("CLOSE ") {
            return self.fail(format!("invalid field name '{name}'"));
        }
        self.fields.push(name.to_ascii_uppercase());
        self
    }

    /// Add several fields to the innermost open scope.
    #[must_use]
    pub fn fields<'a>(self, names: impl IntoIterator<Item = &'a str>) -> Self {
        names.into_iter().fold(self, Self::field)
    }

    /// Add every field `R` decodes, in decode order. The innermost open
    /// scope must be the one `R` is read from.
    #[must_use]
    pub fn all_fields<R: FacilityRecord>(self) -> Self {
        if self.error.is_some() {
            return self;
        }
        let wanted = FacilityScope::for_data_type(R::DATA_TYPE);
        match self.open.last().copied() {
            Some(scope) if scope == wanted => self.fields(R::FIELDS.iter().copied()),
            current => {
                let current = current.map_or_else(|| "the top level".to_string(), |scope| scope.to_string());
                self.fail(format!("{} fields cannot be added in {current}", R::DATA_TYPE))
            }
        }
    }

    /// Scopes currently open, innermost last.
    pub fn open_scopes(&self) -> &[FacilityScope] {
        &self.open
    }

    /// The field paths, in the order they are sent.
    ///
    /// # Errors
    ///
    /// [`SdkError::FailedAssertion`] for the first nesting mistake, an
    /// unclosed scope, or an empty definition.
    pub fn finish(&self) -> HostResult<Vec<String>> {
        if let Some(error) = &self.error {
            return Err(SdkError::FailedAssertion(error.clone()));
        }
        if let Some(scope) = self.open.last() {
            return Err(SdkError::FailedAssertion(format!("{scope} is never closed")));
        }
        if self.fields.is_empty() {
            return Err(SdkError::FailedAssertion("empty facility definition".into()));
        }
        Ok(self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use simconnect_models::{AirportData, RunwayData, TaxiParkingData};

    use super::*;

    #[test]
    fn scope_names() {
        assert_eq!(FacilityScope::TaxiParking.to_string(), "TAXI_PARKING");
        assert_eq!(FacilityScope::Vdgs.to_string(), "VDGS");
        assert_eq!("APPROACH_LEG".parse::<FacilityScope>().unwrap(), FacilityScope::ApproachLeg);
    }

    #[test]
    fn nested_definition() {
        let fields = FacilityDefinitionBuilder::new()
            .open(FacilityScope::Airport)
            .field("icao")
            .open(FacilityScope::Frequency)
            .fields(["TYPE", "FREQUENCY", "NAME"])
            .close()
            .close()
            .finish()
            .unwrap();
        assert_eq!(
            fields,
            vec![
                "OPEN AIRPORT",
                "ICAO",
                "OPEN FREQUENCY",
                "TYPE",
                "FREQUENCY",
                "NAME",
                "CLOSE FREQUENCY",
                "CLOSE AIRPORT",
            ]
        );
    }

    #[test]
    fn first_mistake_wins() {
        let err = FacilityDefinitionBuilder::new()
            .open(FacilityScope::Runway)
            .close()
            .close()
            .finish()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "failed assertion: RUNWAY cannot be opened in the top level"
        );
    }

    #[test]
    fn child_needs_matching_parent() {
        let err = FacilityDefinitionBuilder::new()
            .open(FacilityScope::Waypoint)
            .open(FacilityScope::Runway)
            .finish()
            .unwrap_err();
        assert!(err.to_string().contains("RUNWAY cannot be opened in WAYPOINT"));

        let ok = FacilityDefinitionBuilder::new()
            .open(FacilityScope::Waypoint)
            .open(FacilityScope::Route)
            .field("NAME")
            .close()
            .close();
        assert!(ok.finish().is_ok());
    }

    #[test]
    fn record_fields_follow_decode_order() {
        let fields = FacilityDefinitionBuilder::new()
            .open(FacilityScope::Airport)
            .all_fields::<AirportData>()
            .open(FacilityScope::Runway)
            .all_fields::<RunwayData>()
            .close()
            .open(FacilityScope::TaxiParking)
            .all_fields::<TaxiParkingData>()
            .close()
            .close()
            .finish()
            .unwrap();
        let airport = AirportData::FIELDS.len();
        let runway = RunwayData::FIELDS.len();
        assert_eq!(fields.len(), 2 + airport + 2 + runway + 2 + TaxiParkingData::FIELDS.len());
        assert_eq!(fields[1..=airport], *AirportData::FIELDS);
        assert_eq!(fields[airport + 1], "OPEN RUNWAY");
        assert_eq!(fields[airport + 2], "LATITUDE");
        assert_eq!(fields[airport + runway + 4], "TYPE");
    }

    #[test]
    fn record_fields_need_their_scope() {
        let err = FacilityDefinitionBuilder::new()
            .open(FacilityScope::Airport)
            .all_fields::<RunwayData>()
            .close()
            .finish()
            .unwrap_err();
        assert!(err.to_string().contains("Runway fields cannot be added in AIRPORT"));
        assert!(FacilityDefinitionBuilder::new().all_fields::<AirportData>().finish().is_err());
        assert_eq!(FacilityScope::for_data_type(FacilityDataType::TaxiParkingAirline), FacilityScope::Airline);
    }

    #[test]
    fn unbalanced_and_empty_definitions_fail() {
        let open = FacilityDefinitionBuilder::new().open(FacilityScope::Vor).field("LATITUDE");
        assert_eq!(open.open_scopes(), &[FacilityScope::Vor]);
        assert!(open.finish().unwrap_err().to_string().contains("VOR is never closed"));
        assert!(FacilityDefinitionBuilder::new().finish().is_err());
        assert!(FacilityDefinitionBuilder::new().close().finish().is_err());
        assert!(FacilityDefinitionBuilder::new().field("ICAO").finish().is_err());
    }
}
