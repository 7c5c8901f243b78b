//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Hue Bridge - fan-out of hub sensor events to browser viewers
#[derive(Parser, Debug)]
#[command(
    name = "hue-bridge",
    author,
    version,
    about = "Hub event bridge",
    long_about = "Keeps one rotating subscription to the hub's event feed and \n\
                  re-serves every event to any number of viewers over \n\
                  Server-Sent Events."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "HUE_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "HUE_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bridge: hub subscription plus viewer endpoint
    Run(RunArgs),

    /// Connect to a running bridge and print what viewers see
    Watch(WatchArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),
}

/// Values that override the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct OverrideArgs {
    /// Hub IP or host name
    #[arg(long, env = "HUE_IP")]
    pub hub_address: Option<String>,

    /// Hub application key
    #[arg(long, env = "HUE_USERNAME", hide_env_values = true)]
    pub credential: Option<String>,

    /// Listen address for the viewer endpoint
    #[arg(long, env = "HUE_BRIDGE_BIND")]
    pub bind: Option<String>,
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "bridge.toml",
        env = "HUE_BRIDGE_CONFIG"
    )]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Start even if the hub rejects the credential at startup
    #[arg(long)]
    pub skip_auth_check: bool,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "HUE_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `watch` command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Bridge event stream URL (overrides `reader.url`)
    #[arg(long, env = "HUE_BRIDGE_URL")]
    pub url: Option<String>,

    /// Configuration file to take the `[reader]` section from
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print raw JSON payloads, one per line, without keepalives
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "bridge.toml")]
    pub config: PathBuf,

    #[command(flatten)]
    pub overrides: OverrideArgs,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
