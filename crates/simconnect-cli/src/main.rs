//! simconnect-cli: exercises the SDK against the in-process mock host.

use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use simconnect_models::SimObjectType;
use simconnect_sdk::LogLevel;

mod commands;

/// SimConnect SDK harness.
#[derive(Parser, Debug)]
#[command(name = "simconnect-cli")]
#[command(author, version, about = "SimConnect SDK harness backed by a mock simulator", long_about = None)]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error, disabled). Overrides RUST_LOG.
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// How long to wait for replies, in milliseconds.
    #[arg(long, global = true, default_value_t = 2000)]
    pub timeout_ms: u64,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Request a system state such as AircraftLoaded or Sim
    SystemState {
        /// State name
        name: String,
    },
    /// List the system events clients can subscribe to
    Events(EventsArgs),
    /// Enumerate installed titles and liveries
    Enumerate(EnumerateArgs),
    /// Print an INI configuration file
    Config(ConfigArgs),
    /// Run the background connection manager for a while
    Background(BackgroundArgs),
}

#[derive(Args, Debug)]
pub struct EventsArgs {
    /// Only list events whose name contains this text (case-insensitive)
    #[arg(long)]
    pub filter: Option<String>,
}

#[derive(Args, Debug)]
pub struct EnumerateArgs {
    /// Object kind (aircraft, helicopter, boat, ground, all, ...)
    #[arg(long = "type", default_value = "aircraft")]
    pub object_type: SimObjectType,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Path of the INI file
    pub path: std::path::PathBuf,

    /// Only print this section
    #[arg(long)]
    pub section: Option<String>,

    /// Only print this key (requires --section)
    #[arg(long, requires = "section")]
    pub key: Option<String>,

    /// Print the connection settings of configuration number N
    #[arg(long, conflicts_with_all = ["section", "key"])]
    pub index: Option<u32>,
}

#[derive(Args, Debug)]
pub struct BackgroundArgs {
    /// How long to stay connected
    #[arg(long, default_value_t = 1)]
    pub seconds: u64,

    /// Make the simulator quit halfway and let the manager reconnect
    #[arg(long)]
    pub quit: bool,
}

fn init_logging(level: Option<LogLevel>) {
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::default().add_directive(level.filter().into()),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    let output = match &cli.command {
        Commands::SystemState { name } => commands::system_state(name, cli.timeout())?,
        Commands::Events(args) => commands::events(args.filter.as_deref()),
        Commands::Enumerate(args) => commands::enumerate(args.object_type, cli.timeout())?,
        Commands::Config(args) => commands::config(args)?,
        Commands::Background(args) => commands::background(args)?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_enumerate_type() {
        let cli = Cli::try_parse_from(["simconnect-cli", "enumerate", "--type", "helicopter"]).unwrap();
        match cli.command {
            Commands::Enumerate(args) => assert_eq!(args.object_type, SimObjectType::Helicopter),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn parses_global_log_level() {
        let cli = Cli::try_parse_from(["simconnect-cli", "system-state", "Sim", "--log-level", "debug"]).unwrap();
        assert_eq!(cli.log_level, Some(LogLevel::Debug));
    }

    #[test]
    fn key_requires_section() {
        assert!(Cli::try_parse_from(["simconnect-cli", "config", "a.ini", "--key", "port"]).is_err());
    }
}
