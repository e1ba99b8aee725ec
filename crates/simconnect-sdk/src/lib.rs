//! # SimConnect SDK
//!
//! Typed, request-correlated client library for the SimConnect host
//! protocol.
//!
//! The SDK is layered:
//!
//! * [`Connection`]: one session with the host over a [`Transport`],
//!   owning the identifier allocators.
//! * [`DataDefinition`]: binds application struct fields to simulator
//!   variables and converts between the two.
//! * [`Dispatcher`]: routes every inbound message by kind.
//! * [`CorrelationLayer`](correlation::CorrelationLayer): routes one kind
//!   further by the correlation id it carries.
//! * [`handlers`]: one handler per request family (system state, system
//!   events, facilities, SimObject data, AI aircraft, input groups, …).
//! * [`runloop`] and [`BackgroundManager`]: drive the dispatcher from the
//!   calling thread or from a worker thread.
//!
//! Outbound calls return [`HostResult`] and cancel-on-drop [`Request`]
//! values.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use simconnect_sdk::handlers::SystemStateHandler;
//! use simconnect_sdk::runloop::{PollingLoop, RunLoop};
//! use simconnect_sdk::{Connection, Dispatcher, HostResult, Transport};
//!
//! fn run(transport: Arc<dyn Transport>) -> HostResult<()> {
//!     let connection = Connection::new("quick start", transport);
//!     connection.open(0)?;
//!     let dispatcher = Dispatcher::new(connection);
//!     let states = SystemStateHandler::new(&dispatcher);
//!
//!     let _request = states.request_string("AircraftLoaded", |path| println!("{path}"))?;
//!     PollingLoop::new(dispatcher).dispatch_for(Duration::from_secs(1));
//!     Ok(())
//! }
//! ```

pub mod background;
pub mod config;
pub mod connection;
pub mod correlation;
pub mod data_definition;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod handlers;
pub mod logging;
pub mod request;
pub mod runloop;
pub mod transport;

#[cfg(test)]
mod testing;

pub use background::{BackgroundManager, State};
pub use config::{IniFile, ManagerConfig, SimConnectConfig};
pub use connection::Connection;
pub use data_definition::DataDefinition;
pub use dispatch::Dispatcher;
pub use error::{HostResult, SdkError};
pub use events::Event;
pub use logging::LogLevel;
pub use request::Request;
pub use transport::{Notification, NotifyMode, OpenParams, Transport, Verb};

// Re-export the identifier aliases callers need to implement a transport.
pub use simconnect_models::SendId;
