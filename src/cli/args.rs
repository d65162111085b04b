//! CLI argument definitions.

use crate::cli::validators::{parse_non_negative_secs, parse_positive_count, parse_threshold};
use crate::config::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Bat echolocation call detection for long or time-expanded recordings.
#[derive(Debug, Parser)]
#[command(name = "batdetect")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Input wave files or directories to analyze.
    pub inputs: Vec<PathBuf>,

    /// Common options for analysis.
    #[command(flatten)]
    pub analyze: AnalyzeArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for analysis runs.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct AnalyzeArgs {
    /// Output directory for individual and summary results.
    #[arg(short, long, env = "BATDETECT_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Detection threshold (0.0-1.0]; lower finds more calls.
    #[arg(short, long, value_parser = parse_threshold, env = "BATDETECT_THRESHOLD")]
    pub threshold: Option<f32>,

    /// Recordings are already in real time (not time expanded).
    #[arg(long)]
    pub no_time_expansion: bool,

    /// Per-file output formats (comma-separated: audiotagger,raven,json).
    #[arg(short, long, value_delimiter = ',', env = "BATDETECT_FORMAT")]
    pub format: Option<Vec<OutputFormat>>,

    /// Do not write per-file results.
    #[arg(long)]
    pub no_individual: bool,

    /// Do not write the aggregate results.csv.
    #[arg(long)]
    pub no_summary: bool,

    /// Sort detections and merge duplicates from overlapping chunks.
    #[arg(long)]
    pub dedup: bool,

    /// Merge distance for --dedup in seconds (default: detector window size).
    #[arg(long, value_parser = parse_non_negative_secs, env = "BATDETECT_DEDUP_TOLERANCE")]
    pub dedup_tolerance: Option<f64>,

    /// JSON file with detector parameters.
    #[arg(long, env = "BATDETECT_DETECTOR_PARAMS")]
    pub detector_params: Option<PathBuf>,

    /// Number of files processed concurrently.
    #[arg(short, long, value_parser = parse_positive_count, env = "BATDETECT_JOBS")]
    pub jobs: Option<usize>,

    /// Skip files that take longer than this many seconds.
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..), env = "BATDETECT_FILE_TIMEOUT")]
    pub file_timeout: Option<u64>,

    /// Threads used for the chunks of one file.
    #[arg(long, value_parser = parse_positive_count, env = "BATDETECT_CHUNK_WORKERS")]
    pub chunk_workers: Option<usize>,

    /// Peak-pick at full frame resolution.
    #[arg(long)]
    pub high_res: bool,

    /// Suppress progress output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable the progress bar.
    #[arg(long)]
    pub no_progress: bool,
}
