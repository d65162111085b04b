//! Batdetect - bat echolocation call detection CLI tool.
//!
//! Recordings of any length, optionally time expanded, are cut into
//! overlapping fixed-size chunks. A [`detector::Detector`] runs on each
//! chunk and the per-chunk calls are stitched back into one correctly timed
//! stream per file.

#![warn(missing_docs)]

pub mod audio;
pub mod cli;
pub mod config;
pub mod constants;
pub mod detector;
pub mod error;
pub mod output;
pub mod pipeline;

use clap::{CommandFactory, Parser};
use cli::{AnalyzeArgs, Cli, Command, ConfigAction};
use config::{
    Config, StitchMode, config_file_path, load_default_config, save_default_config,
    validate_config,
};
use constants::{DEFAULT_OUTPUT_DIR, threshold};
use detector::{Detector, DetectorConfig, EnergyDetector};
use pipeline::{
    BatchOptions, BatchReport, OutputOptions, ProcessOptions, StitchPolicy, collect_input_files,
    run_batch,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for batdetect CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.analyze.verbose, cli.analyze.quiet);

    // First Ctrl+C stops scheduling new files, second one exits
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130); // 128 + SIGINT(2)
        }
        warn!("Interrupted, finishing files in progress (Ctrl+C again to exit now)");
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    // Subcommands load the config themselves, if at all
    if let Some(command) = cli.command {
        return handle_command(command);
    }

    let config = load_default_config()?;

    if cli.inputs.is_empty() {
        Cli::command().print_help()?;
        return Err(Error::NoValidAudioFiles);
    }

    analyze_files(&cli.inputs, &cli.analyze, &config, cancel)
}

/// Analyze input files with the given options.
fn analyze_files(
    inputs: &[PathBuf],
    args: &AnalyzeArgs,
    file_config: &Config,
    cancel: Arc<AtomicBool>,
) -> Result<()> {
    let config = resolve_config(args, file_config);
    validate_config(&config)?;

    let params = match &config.detector.params {
        Some(path) => {
            info!("Loading detector parameters: {}", path.display());
            DetectorConfig::from_file(path)?
        }
        None => DetectorConfig::default(),
    };
    let detector = EnergyDetector::new(params)?;

    let threshold = config.defaults.threshold;
    if !(threshold::CALIBRATED_MIN..=threshold::CALIBRATED_MAX).contains(&threshold) {
        warn!(
            "Threshold {} is outside the calibrated range [{}, {}]",
            threshold,
            threshold::CALIBRATED_MIN,
            threshold::CALIBRATED_MAX
        );
    }

    let files = collect_input_files(inputs)?;
    if files.is_empty() {
        return Err(Error::NoValidAudioFiles);
    }

    let options = batch_options(&config, detector.config(), args);
    info!("Processing {} file(s)", files.len());
    info!(
        "Results directory {}",
        options.output.output_dir.display()
    );
    if !options.process.time_expansion {
        info!("Time expansion correction disabled");
    }

    let report = run_batch(&files, Arc::new(detector), &options, cancel)?;
    log_report(&report);

    if report.interrupted {
        return Err(Error::Interrupted {
            completed: report.completed(),
            total: report.total,
        });
    }
    if report.write_failures > 0 {
        return Err(Error::OutputWriteFailures {
            count: report.write_failures,
        });
    }
    Ok(())
}

/// Overlay CLI (and environment) settings on the config file.
fn resolve_config(args: &AnalyzeArgs, file_config: &Config) -> Config {
    let mut config = file_config.clone();
    let defaults = &mut config.defaults;

    if let Some(threshold) = args.threshold {
        defaults.threshold = threshold;
    }
    if args.no_time_expansion {
        defaults.time_expansion = false;
    }
    if let Some(formats) = &args.format {
        defaults.formats.clone_from(formats);
    }
    if args.no_individual {
        defaults.save_individual = false;
    }
    if args.no_summary {
        defaults.save_summary = false;
    }
    if let Some(dir) = &args.output_dir {
        defaults.output_dir = Some(dir.clone());
    }

    let processing = &mut config.processing;
    if let Some(jobs) = args.jobs {
        processing.jobs = jobs;
    }
    if let Some(secs) = args.file_timeout {
        processing.file_timeout_secs = Some(secs);
    }
    if let Some(workers) = args.chunk_workers {
        processing.chunk_workers = workers;
    }
    if args.high_res {
        processing.low_resolution = false;
    }

    if args.dedup {
        config.stitching.policy = StitchMode::Dedup;
    }
    if let Some(tolerance) = args.dedup_tolerance {
        config.stitching.dedup_tolerance = Some(tolerance);
    }
    if let Some(path) = &args.detector_params {
        config.detector.params = Some(path.clone());
    }

    config
}

/// Build batch options from a validated config.
fn batch_options(config: &Config, params: &DetectorConfig, args: &AnalyzeArgs) -> BatchOptions {
    let stitch_policy = match config.stitching.policy {
        StitchMode::Legacy => StitchPolicy::Legacy,
        StitchMode::Dedup => StitchPolicy::SortDedup {
            tolerance: config.stitching.dedup_tolerance.unwrap_or(params.win_size),
        },
    };

    BatchOptions {
        process: ProcessOptions {
            time_expansion: config.defaults.time_expansion,
            threshold: config.defaults.threshold,
            low_resolution: config.processing.low_resolution,
            stitch_policy,
            chunk_workers: config.processing.chunk_workers,
        },
        output: OutputOptions {
            output_dir: config
                .defaults
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            formats: config.defaults.formats.clone(),
            save_individual: config.defaults.save_individual,
            save_summary: config.defaults.save_summary,
            class_name: config.defaults.class_name.clone(),
        },
        jobs: config.processing.jobs,
        file_timeout: config.processing.file_timeout_secs.map(Duration::from_secs),
        show_progress: !args.quiet && !args.no_progress,
    }
}

fn log_report(report: &BatchReport) {
    info!(
        "Complete: {} processed, {} skipped, {} errors, {} total detections in {:.2}s",
        report.processed,
        report.skipped,
        report.failed,
        report.detections,
        report.elapsed.as_secs_f64()
    );
    info!(
        "{} of {} file(s) had calls",
        report.files_with_detections, report.processed
    );
    if report.failed > 0 {
        warn!("{} file(s) had errors", report.failed);
    }
    if report.write_failures > 0 {
        warn!(
            "{} file(s) could not have their results written",
            report.write_failures
        );
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // Decoder chatter is hidden unless tracing everything
    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info,symphonia=warn",
            1 => "debug,symphonia=warn",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).init();
}

fn handle_command(command: Command) -> Result<()> {
    match command {
        Command::Config { action } => handle_config_command(action),
    }
}

fn handle_config_command(action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let saved_path = save_default_config(&Config::default())?;
                println!("Created configuration file: {}", saved_path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            let contents = toml::to_string_pretty(&config)
                .map_err(|e| Error::ConfigSerialize { source: e })?;
            println!("{contents}");
            Ok(())
        }
        ConfigAction::Path => {
            println!("{}", config_file_path()?.display());
            Ok(())
        }
    }
}
