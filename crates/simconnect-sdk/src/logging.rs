//! Log levels as configuration files name them.
//!
//! The SDK itself logs through `tracing`, each component under its own
//! target (`simconnect::dispatch`, `simconnect::background`, …). This module
//! only maps the level names used in configuration onto `tracing` filters.

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// Target prefix shared by every SDK component.
pub const TARGET_PREFIX: &str = "simconnect";

/// A named log level.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Everything, including initialisation chatter.
    Init,
    /// Fine-grained tracing.
    Trace,
    /// Debugging detail.
    Debug,
    /// Normal operation.
    #[default]
    Info,
    /// Something looks wrong.
    Warn,
    /// Something failed.
    Error,
    /// Something failed and the component cannot continue.
    Fatal,
    /// Nothing at all.
    Disabled,
}

impl LogLevel {
    /// The equivalent `tracing` filter.
    pub fn filter(self) -> LevelFilter {
        match self {
            Self::Init | Self::Trace => LevelFilter::TRACE,
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error | Self::Fatal => LevelFilter::ERROR,
            Self::Disabled => LevelFilter::OFF,
        }
    }

    /// An `EnvFilter`-style directive enabling SDK output at this level,
    /// e.g. `simconnect=debug`.
    pub fn directive(self) -> String {
        format!("{TARGET_PREFIX}={}", self.filter())
            .to_lowercase()
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        level.filter()
    }
}
