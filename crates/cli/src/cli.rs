//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Concentrator - grid-telemetry component groups and frame dispatch
#[derive(Parser, Debug)]
#[command(
    name = "concentrator",
    author,
    version,
    about = "Grid-telemetry concentrator core",
    long_about = "Loads component groups from declarative descriptor tables, supervises \n\
                  their initialization and lifecycle, and reconstructs protocol frames \n\
                  from fragmented multi-channel byte streams."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "CONCENTRATOR_VERBOSE")]
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
        env = "CONCENTRATOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load the groups and run the frame dispatch demo
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "concentrator.toml",
        env = "CONCENTRATOR_CONFIG"
    )]
    pub config: PathBuf,

    /// Maximum number of data frames to generate (0 = unlimited)
    #[arg(long, default_value = "0", env = "CONCENTRATOR_MAX_FRAMES")]
    pub max_frames: u64,

    /// Run timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "CONCENTRATOR_TIMEOUT")]
    pub timeout: u64,

    /// Data frames generated per channel per second
    #[arg(long, default_value = "30", env = "CONCENTRATOR_FRAME_RATE")]
    pub frame_rate: u32,

    /// Administrative command sent to every group once started
    /// (e.g. "set-temporal-constraint *-1h *"); may be repeated
    #[arg(long = "admin", value_name = "COMMAND")]
    pub admin_commands: Vec<String>,

    /// Trace raw frame buffers through the echo queue
    #[arg(long)]
    pub echo: bool,

    /// Print the status of every group before shutting down
    #[arg(long)]
    pub status: bool,

    /// Validate configuration and exit without running
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "CONCENTRATOR_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "concentrator.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "concentrator.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show every descriptor row
    #[arg(long)]
    pub tables: bool,

    /// Show frame parser settings
    #[arg(long)]
    pub parser: bool,
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
