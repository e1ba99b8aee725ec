//! Bit-field over SimObject kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::SimObjectType;

/// A set of SimObject kinds, one bit per kind.
///
/// `User` and `UserAircraft` are the same bit, as they are on the host.
///
/// ```
/// use simconnect_models::{SimObjectType, SimObjectTypeSet};
///
/// let set = SimObjectTypeSet::aircraft().or_helicopter();
/// let mut seen = Vec::new();
/// set.for_each(|t| seen.push(t));
/// assert_eq!(seen, vec![SimObjectType::Aircraft, SimObjectType::Helicopter]);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SimObjectTypeSet(u32);

const USER: u32 = 0b0_0000_0001;
const AIRCRAFT: u32 = 0b0_0000_0010;
const HELICOPTER: u32 = 0b0_0000_0100;
const BOAT: u32 = 0b0_0000_1000;
const GROUND: u32 = 0b0_0001_0000;
const HOT_AIR_BALLOON: u32 = 0b0_0010_0000;
const ANIMAL: u32 = 0b0_0100_0000;
const USER_AVATAR: u32 = 0b0_1000_0000;
const USER_CURRENT: u32 = 0b1_0000_0000;

/// Bit and host type for every kind, in host enumeration order.
const KINDS: [(u32, SimObjectType); 9] = [
    (USER, SimObjectType::User),
    (AIRCRAFT, SimObjectType::Aircraft),
    (HELICOPTER, SimObjectType::Helicopter),
    (BOAT, SimObjectType::Boat),
    (GROUND, SimObjectType::Ground),
    (HOT_AIR_BALLOON, SimObjectType::HotAirBalloon),
    (ANIMAL, SimObjectType::Animal),
    (USER_AVATAR, SimObjectType::UserAvatar),
    (USER_CURRENT, SimObjectType::UserCurrent),
];

impl SimObjectTypeSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Every kind.
    pub fn all() -> Self {
        Self(KINDS.iter().fold(0, |bits, (bit, _)| bits | bit))
    }

    /// The raw bits.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// True when no kind is set.
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Add `kind` to the set. `All` adds every kind.
    #[must_use]
    pub fn with(self, kind: SimObjectType) -> Self {
        Self(self.0 | Self::from(kind).0)
    }

    /// True if `kind` is in the set.
    pub fn contains(self, kind: SimObjectType) -> bool {
        let bits = Self::from(kind).0;
        bits != 0 && self.0 & bits == bits
    }

    /// Call `f` with the host type of every kind in the set, in host order.
    pub fn for_each(self, mut f: impl FnMut(SimObjectType)) {
        for (bit, kind) in KINDS {
            if self.0 & bit != 0 {
                f(kind);
            }
        }
    }

    /// The host types in the set, in host order.
    pub fn types(self) -> Vec<SimObjectType> {
        let mut types = Vec::new();
        self.for_each(|t| types.push(t));
        types
    }

    // ── Single-kind constructors ─────────────────────────────────────

    /// Only the user object.
    pub fn user() -> Self {
        Self(USER)
    }
    /// Only the user aircraft (same bit as [`user`](Self::user)).
    pub fn user_aircraft() -> Self {
        Self(USER)
    }
    /// Only aircraft.
    pub fn aircraft() -> Self {
        Self(AIRCRAFT)
    }
    /// Only helicopters.
    pub fn helicopter() -> Self {
        Self(HELICOPTER)
    }
    /// Only boats.
    pub fn boat() -> Self {
        Self(BOAT)
    }
    /// Only ground vehicles.
    pub fn ground() -> Self {
        Self(GROUND)
    }
    /// Only hot air balloons.
    pub fn hot_air_balloon() -> Self {
        Self(HOT_AIR_BALLOON)
    }
    /// Only animals.
    pub fn animal() -> Self {
        Self(ANIMAL)
    }
    /// Only the user avatar.
    pub fn user_avatar() -> Self {
        Self(USER_AVATAR)
    }
    /// Only the currently controlled object.
    pub fn user_current() -> Self {
        Self(USER_CURRENT)
    }

    // ── Combinators ──────────────────────────────────────────────────

    /// Add the user object.
    #[must_use]
    pub fn or_user(self) -> Self {
        Self(self.0 | USER)
    }
    /// Add the user aircraft.
    #[must_use]
    pub fn or_user_aircraft(self) -> Self {
        Self(self.0 | USER)
    }
    /// Add aircraft.
    #[must_use]
    pub fn or_aircraft(self) -> Self {
        Self(self.0 | AIRCRAFT)
    }
    /// Add helicopters.
    #[must_use]
    pub fn or_helicopter(self) -> Self {
        Self(self.0 | HELICOPTER)
    }
    /// Add boats.
    #[must_use]
    pub fn or_boat(self) -> Self {
        Self(self.0 | BOAT)
    }
    /// Add ground vehicles.
    #[must_use]
    pub fn or_ground(self) -> Self {
        Self(self.0 | GROUND)
    }
    /// Add hot air balloons.
    #[must_use]
    pub fn or_hot_air_balloon(self) -> Self {
        Self(self.0 | HOT_AIR_BALLOON)
    }
    /// Add animals.
    #[must_use]
    pub fn or_animal(self) -> Self {
        Self(self.0 | ANIMAL)
    }
    /// Add the user avatar.
    #[must_use]
    pub fn or_user_avatar(self) -> Self {
        Self(self.0 | USER_AVATAR)
    }
    /// Add the currently controlled object.
    #[must_use]
    pub fn or_user_current(self) -> Self {
        Self(self.0 | USER_CURRENT)
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Contains the user object.
    pub fn has_user(self) -> bool {
        self.0 & USER != 0
    }
    /// Contains the user aircraft.
    pub fn has_user_aircraft(self) -> bool {
        self.0 & USER != 0
    }
    /// Contains aircraft.
    pub fn has_aircraft(self) -> bool {
        self.0 & AIRCRAFT != 0
    }
    /// Contains helicopters.
    pub fn has_helicopter(self) -> bool {
        self.0 & HELICOPTER != 0
    }
    /// Contains boats.
    pub fn has_boat(self) -> bool {
        self.0 & BOAT != 0
    }
    /// Contains ground vehicles.
    pub fn has_ground(self) -> bool {
        self.0 & GROUND != 0
    }
    /// Contains hot air balloons.
    pub fn has_hot_air_balloon(self) -> bool {
        self.0 & HOT_AIR_BALLOON != 0
    }
    /// Contains animals.
    pub fn has_animal(self) -> bool {
        self.0 & ANIMAL != 0
    }
    /// Contains the user avatar.
    pub fn has_user_avatar(self) -> bool {
        self.0 & USER_AVATAR != 0
    }
    /// Contains the currently controlled object.
    pub fn has_user_current(self) -> bool {
        self.0 & USER_CURRENT != 0
    }
}

impl From<SimObjectType> for SimObjectTypeSet {
    fn from(kind: SimObjectType) -> Self {
        if kind == SimObjectType::All {
            return Self::all();
        }
        KINDS
            .iter()
            .find(|(_, k)| *k == kind)
            .map_or(Self::empty(), |(bit, _)| Self(*bit))
    }
}

impl FromIterator<SimObjectType> for SimObjectTypeSet {
    fn from_iter<I: IntoIterator<Item = SimObjectType>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl fmt::Display for SimObjectTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.types().iter().map(ToString::to_string).collect();
        write!(f, "{}", names.join("|"))
    }
}
