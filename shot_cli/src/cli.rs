//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "shotctl", version, about = "Shot sequencing controller")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the control plane and drive the shot loop until Ctrl-C
    Run {
        /// Override server.bind from the config
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,
        /// Initial shot count (-1 = unlimited)
        #[arg(long, value_name = "N", allow_hyphen_values = true)]
        shots: Option<i64>,
        /// Initial inter-shot delay in milliseconds
        #[arg(long = "delay-ms", value_name = "MS")]
        delay_ms: Option<f64>,
        /// Start firing immediately instead of waiting for a command
        #[arg(long, action = ArgAction::SetTrue)]
        start: bool,
        /// Accept the legacy substring command dialect
        #[arg(long, action = ArgAction::SetTrue)]
        legacy: bool,
    },
    /// Probe the power sensor once (hardware presence / sim ok)
    SelfCheck,
    /// Print the status snapshot for the configured parameters
    Status,
}
