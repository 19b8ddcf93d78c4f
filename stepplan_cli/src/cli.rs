//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

/// File sink guard; dropped by `main` before exit so buffered lines are flushed.
pub static FILE_GUARD: Mutex<Option<tracing_appender::non_blocking::WorkerGuard>> =
    Mutex::new(None);
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "stepplan", version, about = "Look-ahead motion planner CLI")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/stepplan.toml")]
    pub config: PathBuf,

    /// Log and report as JSON instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Plan a move program and execute it on the reference stepper
    Run {
        /// Move program CSV (header: x,y,z,duration_us,mm)
        #[arg(long, value_name = "FILE")]
        moves: PathBuf,
        /// Disable acceleration shaping (instant speed changes)
        #[arg(long = "no-accel", action = ArgAction::SetTrue)]
        no_accel: bool,
        /// Pace pulses against the wall clock instead of virtual time
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
    },
    /// Plan a move program without executing it and print the block table
    Plan {
        /// Move program CSV (header: x,y,z,duration_us,mm)
        #[arg(long, value_name = "FILE")]
        moves: PathBuf,
    },
    /// Validate the configuration and build a planner
    SelfCheck,
}
