//! # Mock SimConnect
//!
//! An in-process simulator host implementing
//! [`simconnect_sdk::Transport`]. It keeps a small [`World`] of objects,
//! liveries, airports and system states, and answers every verb the way
//! the real host does: replies, list batches, exceptions naming the send
//! id of the failing call, and system events.
//!
//! ```rust,no_run
//! use simconnect_sdk::{Connection, Dispatcher};
//! use mock_simconnect::MockHost;
//!
//! let host = MockHost::new();
//! let connection = Connection::with_event("demo", host.clone());
//! connection.open(0).unwrap();
//! let dispatcher = Dispatcher::new(connection);
//! host.quit();
//! dispatcher.drain_pending();
//! ```

pub mod host;
pub mod world;

#[cfg(test)]
mod scenarios;

pub use host::{HostProfile, MockHost, DEFAULT_BATCH_SIZE};
pub use world::{AirportRecord, SimObject, SimValue, World, FIRST_SPAWNED_ID, USER_OBJECT_ID};
