//! Command-line argument surface.

use clap::{Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

/// Custom enum for log levels that can be used with clap's ValueEnum
#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    /// Errors only.
    Error,
    /// Warnings and errors.
    Warn,
    /// Batch milestones.
    Info,
    /// Per-ray detail.
    Debug,
    /// Everything.
    Trace,
}

/// Convert our custom LogLevel enum to log crate's LevelFilter
impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Command line arguments structure using clap derive macros
#[derive(Parser)]
#[command(name = "lumitrace")]
#[command(about = "Statistical photon path tracer for luminescent optics")]
pub struct Args {
    /// Set the logging level (defaults to "info")
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub debug_level: LogLevel,

    /// What to do.
    #[command(subcommand)]
    pub command: Command,
}

/// The query and simulation subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Trace a batch of rays through a scene and write the event log
    Simulate {
        /// Scene description file (YAML)
        scene: PathBuf,

        /// Number of rays to trace
        #[arg(short = 'n', long, default_value_t = 10_000)]
        rays: usize,

        /// Master random seed
        #[arg(long, default_value_t = 0)]
        seed: u64,

        /// Worker count (defaults to the number of CPU cores)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Directory receiving ray.csv and event.csv
        #[arg(short, long, default_value = "trace-log")]
        output: PathBuf,

        /// Maximum events per ray before a safety kill
        #[arg(long, default_value_t = 1000)]
        max_events: usize,

        /// Maximum cumulative distance per ray before a safety kill
        #[arg(long)]
        max_distance: Option<f64>,

        /// Killed fraction above which the run exits with status 3
        #[arg(long, default_value_t = 0.05)]
        kill_threshold: f64,
    },

    /// Count events of a stream at a node in a written log
    Count {
        /// One of reflected, entering, escaping, killed, lost
        stream: String,

        /// Node name the stream applies to
        node: String,

        /// Log directory written by simulate
        db: PathBuf,

        /// Only rays emitted by this source
        #[arg(long)]
        source: Option<String>,

        /// Only events whose surface normal has this x component
        #[arg(long)]
        nx: Option<f64>,

        /// Only events whose surface normal has this y component
        #[arg(long)]
        ny: Option<f64>,

        /// Only events whose surface normal has this z component
        #[arg(long)]
        nz: Option<f64>,
    },

    /// Histogram the wavelengths of a stream at a node
    Spectrum {
        /// One of reflected, entering, escaping, killed, lost
        stream: String,

        /// Node name the stream applies to
        node: String,

        /// Log directory written by simulate
        db: PathBuf,

        /// Only rays emitted by this source
        #[arg(long)]
        source: Option<String>,

        /// Number of histogram bins
        #[arg(long, default_value_t = 20)]
        bins: usize,
    },
}
