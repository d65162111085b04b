//! Single file processing pipeline.

use crate::audio::load_audio;
use crate::config::OutputFormat;
use crate::constants::TIME_EXPANSION_FACTOR;
use crate::detector::{Detector, DetectorConfig};
use crate::error::Result;
use crate::output::{
    AudioTaggerWriter, FileResult, JsonResultWriter, JsonSettings, OutputWriter, RavenWriter,
};
use crate::pipeline::{DetectionStitcher, InputFile, StitchPolicy, output_path_for};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Detection settings applied to every file of a batch.
#[derive(Debug, Clone)]
pub struct ProcessOptions {
    /// Treat recordings as time expanded.
    pub time_expansion: bool,
    /// Detection probability threshold.
    pub threshold: f32,
    /// Pool adjacent spectrogram frames before peak picking.
    pub low_resolution: bool,
    /// How overlapping chunk results are joined.
    pub stitch_policy: StitchPolicy,
    /// Threads used for the chunks of one file.
    pub chunk_workers: usize,
}

/// Where and how per-file results are written.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Root output directory.
    pub output_dir: PathBuf,
    /// Per-file formats.
    pub formats: Vec<OutputFormat>,
    /// Write per-file results.
    pub save_individual: bool,
    /// Write the aggregate summary.
    pub save_summary: bool,
    /// Label written into annotations.
    pub class_name: String,
}

/// Result of processing one file.
#[derive(Debug)]
pub enum FileOutcome {
    /// Detection ran; the result may hold zero detections.
    Detected(FileResult),
    /// The file could not be read and was skipped.
    Skipped {
        /// Why the file was skipped.
        reason: String,
    },
}

/// Load, chunk and run detection on one file.
///
/// Read failures come back as [`FileOutcome::Skipped`]; any other error is
/// returned for the caller to classify.
pub fn process_file(
    input: &InputFile,
    detector: &dyn Detector,
    options: &ProcessOptions,
) -> Result<FileOutcome> {
    let start_time = Instant::now();
    info!("Processing: {}", input.relative_name);

    let geometry = detector.config().geometry()?;
    let loaded = match load_audio(&input.path, options.time_expansion, &geometry) {
        Ok(loaded) => loaded,
        Err(e) if e.is_read_failure() => {
            let reason = error_chain(&e);
            warn!("Skipping {}: {}", input.relative_name, reason);
            return Ok(FileOutcome::Skipped { reason });
        }
        Err(e) => return Err(e),
    };

    let plan = geometry.plan(loaded.duration_secs);
    debug!(
        "{} chunk(s) over {:.3}s (padded {:.3}s) at {} Hz",
        plan.len(),
        loaded.duration_secs,
        loaded.padded_duration_secs,
        loaded.effective_rate()
    );

    let detections =
        DetectionStitcher::new(detector, options.threshold, options.low_resolution)
            .with_policy(options.stitch_policy)
            .with_chunk_workers(options.chunk_workers)
            .run(&plan, &loaded.buffer, &loaded.time_expansion)?;

    let elapsed = start_time.elapsed().as_secs_f64();
    let real_duration = loaded.real_duration_secs();
    let realtime_factor = if elapsed > 0.0 {
        real_duration / elapsed
    } else {
        0.0
    };
    info!(
        "{} call(s) found in {:.2}s ({:.1}x realtime)",
        detections.len(),
        elapsed,
        realtime_factor
    );

    Ok(FileOutcome::Detected(FileResult {
        name: input.relative_name.clone(),
        path: input.path.clone(),
        duration_secs: real_duration,
        sample_rate: loaded.original_rate(),
        time_expanded: loaded.time_expansion.is_enabled(),
        detections,
    }))
}

/// Write every configured per-file format for one result.
///
/// Files are written even when there are no detections.
pub fn write_file_outputs(
    input: &InputFile,
    result: &FileResult,
    output: &OutputOptions,
    options: &ProcessOptions,
    detector_config: &DetectorConfig,
) -> Result<()> {
    for &format in &output.formats {
        let output_path = output_path_for(input, &output.output_dir, format);
        debug!("Writing {} output: {}", format, output_path.display());

        let mut writer: Box<dyn OutputWriter> = match format {
            OutputFormat::AudioTagger => Box::new(AudioTaggerWriter::new(
                &output_path,
                &result.name,
                &output.class_name,
                result.sample_rate,
            )?),
            OutputFormat::Raven => Box::new(RavenWriter::new(
                &output_path,
                &result.path,
                &output.class_name,
                real_band_hz(detector_config, result),
            )?),
            OutputFormat::Json => Box::new(JsonResultWriter::new(
                &output_path,
                &result.name,
                result.duration_secs,
                result.sample_rate,
                JsonSettings {
                    threshold: options.threshold,
                    time_expansion: result.time_expanded,
                    low_resolution: options.low_resolution,
                    chunk_size: detector_config.chunk_size,
                    win_size: detector_config.win_size,
                },
            )),
        };

        writer.write_header()?;
        for detection in &result.detections {
            writer.write_detection(detection)?;
        }
        writer.finalize()?;
    }

    Ok(())
}

/// Detector band in real Hz for a processed file.
///
/// The band is defined at the effective rate; time expansion scales it back
/// up.
fn real_band_hz(config: &DetectorConfig, result: &FileResult) -> (f64, f64) {
    let (factor, effective_rate) = if result.time_expanded {
        (
            f64::from(TIME_EXPANSION_FACTOR),
            result.sample_rate / TIME_EXPANSION_FACTOR,
        )
    } else {
        (1.0, result.sample_rate)
    };
    let nyquist = f64::from(effective_rate) / 2.0;
    let low = config.min_freq * 1000.0;
    let high = (config.max_freq * 1000.0).min(nyquist);
    (low * factor, high * factor)
}

/// Error message with its source chain.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
