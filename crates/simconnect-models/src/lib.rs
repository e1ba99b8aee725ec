#![deny(missing_docs)]

//! # SimConnect Models
//!
//! Core data types shared by every SimConnect client crate in this
//! workspace. Nothing in here performs I/O or owns a thread; the crate is
//! the vocabulary the SDK and the mock host speak.
//!
//! ## Message layout
//!
//! ```text
//! RawMessage (owned bytes)
//! ├── header: size | version | id          (3 × u32, little-endian)
//! └── body:   decoded by a WireMessage impl selected by RecvId
//!     ├── SystemStateMessage / ExceptionMessage / OpenMessage / …
//!     ├── Event variants (EventMessage, EventFrameMessage, …)
//!     └── List templates (liveries, facilities) with item arrays
//! ```
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`ids`] | Host-header mirror: message ids, exception codes, data types, periods, object types, priorities |
//! | [`data_block`] | Growable byte buffer and per-field layout records |
//! | [`data_block_builder`] | Append-only little-endian encoder |
//! | [`data_block_reader`] | Positional, bounds-checked decoder |
//! | [`position`] | `InitPosition`, `LatLonAlt`, `Xyz`, `MarkerState`, `Waypoint` |
//! | [`frequency`] | `DataFrequency` and `PeriodLimits` for data requests |
//! | [`facility_record`] | Typed airport, runway and taxi parking records |
//! | [`simobject_type`] | `SimObjectTypeSet` bit-field |
//! | [`messages`] | `RawMessage`, the `WireMessage` trait and every typed record |
//! | [`error`] | [`ModelError`] |

pub mod data_block;
pub mod data_block_builder;
pub mod data_block_reader;
pub mod error;
pub mod facility_record;
pub mod frequency;
pub mod ids;
pub mod messages;
pub mod position;
pub mod simobject_type;

// Re-export all public types at crate root for convenience.
// Downstream crates can use `simconnect_models::RecvId` directly.
pub use data_block::*;
pub use data_block_builder::*;
pub use data_block_reader::*;
pub use error::*;
pub use facility_record::*;
pub use frequency::*;
pub use ids::*;
pub use messages::*;
pub use position::*;
pub use simobject_type::*;
