//! Configuration: INI files, `SimConnect.cfg` sections, and the background
//! manager settings.
//!
//! [`IniFile`] is a small, forgiving INI reader. Section and key names are
//! case-insensitive, `;` and `//` start comments, and values may be quoted.
//! [`SimConnectConfig`] reads one `[SimConnect]` / `[SimConnect.N]` section
//! from such a file. [`ManagerConfig`] collects the settings of the
//! [`BackgroundManager`](crate::BackgroundManager) and can be built from
//! environment variables.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HostResult, SdkError};

const TARGET: &str = "simconnect::config";

// ── IniFile ──────────────────────────────────────────────────────────────

/// Key/value pairs of one section, keyed by lower-cased key.
pub type IniSection = BTreeMap<String, String>;

/// Parsed INI file.
///
/// Lines before the first section header land in the section named `""`.
/// Lines without `=` are ignored; a repeated key keeps its last value.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct IniFile {
    sections: BTreeMap<String, IniSection>,
}

fn trim_quotes(text: &str) -> &str {
    text.trim_matches(|c: char| c.is_whitespace() || c == '"' || c == '\'')
}

fn strip_comment(line: &str) -> &str {
    let mut end = line.len();
    if let Some(pos) = line.find(';') {
        end = pos;
    }
    if let Some(pos) = line.find("//") {
        end = end.min(pos);
    }
    line[..end].trim()
}

impl IniFile {
    /// An empty file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Self {
        let mut ini = Self::default();
        let mut current = String::new();

        for raw in text.lines() {
            let line = strip_comment(raw.trim());
            if line.is_empty() {
                continue;
            }
            if line.len() >= 2 && line.starts_with('[') && line.ends_with(']') {
                current = trim_quotes(&line[1..line.len() - 1]).to_lowercase();
                ini.sections.entry(current.clone()).or_default();
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            ini.sections
                .entry(current.clone())
                .or_default()
                .insert(key.trim().to_lowercase(), trim_quotes(value).to_string());
        }
        ini
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// [`SdkError::Io`] if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> HostResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let ini = Self::parse(&text);
        debug!(target: TARGET, path = %path.display(), sections = ini.sections.len(), "loaded ini file");
        Ok(ini)
    }

    /// All sections, keyed by lower-cased name.
    pub fn sections(&self) -> &BTreeMap<String, IniSection> {
        &self.sections
    }

    /// One section.
    pub fn section(&self, section: &str) -> Option<&IniSection> {
        self.sections.get(&section.to_lowercase())
    }

    /// The value of `key` in `section`.
    pub fn get(&self, section: &str, key: &str) -> Option<String> {
        self.section(section)?.get(&key.to_lowercase()).cloned()
    }
}

impl std::str::FromStr for IniFile {
    type Err = std::convert::Infallible;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(text))
    }
}

// ── SimConnectConfig ─────────────────────────────────────────────────────

/// One connection section of a `SimConnect.cfg` file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SimConnectConfig {
    /// Section the values came from.
    pub section: String,
    /// `Pipe`, `IPv4` or `IPv6`.
    pub protocol: String,
    /// Host address, when the protocol needs one.
    pub address: Option<String>,
    /// Port or pipe name.
    pub port: Option<String>,
    /// Largest message the client accepts.
    pub max_receive_size: Option<u32>,
    /// Disable Nagle's algorithm on TCP connections.
    pub disable_nagle: bool,
}

impl SimConnectConfig {
    /// Name of the section used for `config_index`: `simconnect` for 0,
    /// `simconnect.N` otherwise.
    pub fn section_name(config_index: u32) -> String {
        if config_index == 0 {
            "simconnect".to_string()
        } else {
            format!("simconnect.{config_index}")
        }
    }

    /// Read the section for `config_index` from `ini`.
    ///
    /// # Errors
    ///
    /// [`SdkError::Config`] if the section is missing or a number does not
    /// parse.
    pub fn from_ini(ini: &IniFile, config_index: u32) -> HostResult<Self> {
        let section = Self::section_name(config_index);
        let values = ini
            .section(&section)
            .ok_or_else(|| SdkError::Config(format!("Unknown configuration section '{section}'")))?;

        let max_receive_size = values
            .get("maxreceivesize")
            .map(|v| {
                v.parse::<u32>().map_err(|_| {
                    SdkError::Config(format!("Invalid MaxReceiveSize '{v}' in section '{section}'"))
                })
            })
            .transpose()?;

        Ok(Self {
            protocol: values.get("protocol").cloned().unwrap_or_else(|| "Pipe".to_string()),
            address: values.get("address").cloned(),
            port: values.get("port").cloned(),
            max_receive_size,
            disable_nagle: values
                .get("disablenagle")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
            section,
        })
    }
}

// ── ManagerConfig ────────────────────────────────────────────────────────

/// Settings of the background connection manager.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Name the host shows for this client.
    pub client_name: String,
    /// Configuration section used at open.
    pub config_index: u32,
    /// Reconnect after the host quits or a connect attempt fails.
    pub auto_reconnect: bool,
    /// Pause between reconnect attempts.
    pub reconnect_delay: Duration,
    /// Longest wait for messages before the worker checks its state.
    pub message_check_interval: Duration,
    /// Give up after this many failed attempts in a row; 0 means never.
    pub max_reconnect_attempts: u32,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            client_name: "SimConnect client".to_string(),
            config_index: 0,
            auto_reconnect: false,
            reconnect_delay: Duration::from_millis(3000),
            message_check_interval: Duration::from_millis(50),
            max_reconnect_attempts: 0,
        }
    }
}

impl ManagerConfig {
    /// Defaults with the given client name.
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            ..Self::default()
        }
    }

    /// Build the configuration from environment variables.
    ///
    /// | Variable                        | Default             |
    /// |---------------------------------|---------------------|
    /// | `SIMCONNECT_CLIENT_NAME`        | `SimConnect client` |
    /// | `SIMCONNECT_CONFIG_INDEX`       | `0`                 |
    /// | `SIMCONNECT_AUTO_RECONNECT`     | `false`             |
    /// | `SIMCONNECT_RECONNECT_DELAY_MS` | `3000`              |
    ///
    /// Values that do not parse keep their default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            client_name: lookup("SIMCONNECT_CLIENT_NAME").unwrap_or(defaults.client_name),
            config_index: lookup("SIMCONNECT_CONFIG_INDEX")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.config_index),
            auto_reconnect: lookup("SIMCONNECT_AUTO_RECONNECT")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.auto_reconnect),
            reconnect_delay: lookup("SIMCONNECT_RECONNECT_DELAY_MS")
                .and_then(|v| v.parse().ok())
                .map_or(defaults.reconnect_delay, Duration::from_millis),
            ..defaults
        }
    }

    /// Set the client name.
    #[must_use]
    pub fn with_client_name(mut self, client_name: impl Into<String>) -> Self {
        self.client_name = client_name.into();
        self
    }

    /// Set the configuration section index.
    #[must_use]
    pub fn with_config_index(mut self, config_index: u32) -> Self {
        self.config_index = config_index;
        self
    }

    /// Enable or disable automatic reconnects.
    #[must_use]
    pub fn with_auto_reconnect(mut self, auto_reconnect: bool) -> Self {
        self.auto_reconnect = auto_reconnect;
        self
    }

    /// Set the pause between reconnect attempts.
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Set the message wait slice.
    #[must_use]
    pub fn with_message_check_interval(mut self, interval: Duration) -> Self {
        self.message_check_interval = interval;
        self
    }

    /// Limit consecutive reconnect attempts; 0 means unlimited.
    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}
