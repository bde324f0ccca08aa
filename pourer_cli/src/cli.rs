//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use pourer_core::Pickup;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "pourer", version, about = "Pour cell CLI (simulated backends)")]
pub struct Cli {
    /// Path to config TOML; built-in demo cell when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Pour table CSV (strict header), replaces the configured table
    #[arg(long = "pour-table", value_name = "FILE")]
    pub pour_table: Option<PathBuf>,

    /// Log and print results as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to
    /// logging.level, then info
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Where the bottle is picked up from.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum PickupArg {
    Far,
    Mid,
    Scale,
}

impl From<PickupArg> for Pickup {
    fn from(p: PickupArg) -> Self {
        match p {
            PickupArg::Far => Pickup::Far,
            PickupArg::Mid => Pickup::Mid,
            PickupArg::Scale => Pickup::Scale,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pour into every detected cup, farthest first
    Pour {
        /// Bottle pickup location
        #[arg(long, value_enum)]
        pickup: PickupArg,
        /// Move the robot; without this the cycle is only planned
        #[arg(long, action = ArgAction::SetTrue)]
        execute: bool,
        /// Abort once this many ms have passed (overrides runner.deadline_ms)
        #[arg(long, value_name = "MS")]
        deadline_ms: Option<u64>,
    },
    /// Hover over the single cup, touch down, and retrace
    Touch,
    /// Touch, pour prep, pour, put back
    Demo,
    /// Read the smoothed bottle weight and the pour parameters it implies
    Weigh,
    /// Localize the cup repeatedly and report the spread
    Calibrate {
        #[arg(long, default_value_t = 5)]
        samples: usize,
    },
    /// Query every backend once without moving
    SelfCheck,
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pour { .. } => "pour",
            Self::Touch => "touch",
            Self::Demo => "demo",
            Self::Weigh => "weigh",
            Self::Calibrate { .. } => "calibrate",
            Self::SelfCheck => "self-check",
        }
    }
}
