//! Configuration type definitions.

use crate::constants::{
    DEFAULT_CHUNK_WORKERS, DEFAULT_CLASS_NAME, DEFAULT_DETECTION_THRESHOLD, DEFAULT_JOBS,
    output_files,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Default analysis settings.
    pub defaults: DefaultsConfig,

    /// Batch processing settings.
    pub processing: ProcessingConfig,

    /// Chunk result stitching.
    pub stitching: StitchingConfig,

    /// Detector backend settings.
    pub detector: DetectorSection,
}

/// Default analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Detection probability threshold.
    pub threshold: f32,

    /// Treat recordings as time expanded by a factor of 10.
    pub time_expansion: bool,

    /// Per-file output formats.
    pub formats: Vec<OutputFormat>,

    /// Write per-file results.
    pub save_individual: bool,

    /// Write the aggregate summary.
    pub save_summary: bool,

    /// Output directory; relative to the working directory.
    pub output_dir: Option<PathBuf>,

    /// Label written into per-file annotations.
    pub class_name: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DETECTION_THRESHOLD,
            time_expansion: true,
            formats: vec![OutputFormat::AudioTagger],
            save_individual: true,
            save_summary: true,
            output_dir: None,
            class_name: DEFAULT_CLASS_NAME.to_string(),
        }
    }
}

/// Batch processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Files processed concurrently.
    pub jobs: usize,

    /// Per-file processing timeout in seconds.
    pub file_timeout_secs: Option<u64>,

    /// Threads used for the chunks of one file.
    pub chunk_workers: usize,

    /// Pool adjacent spectrogram frames before peak picking.
    pub low_resolution: bool,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            file_timeout_secs: None,
            chunk_workers: DEFAULT_CHUNK_WORKERS,
            low_resolution: true,
        }
    }
}

/// How per-chunk detections are joined.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StitchMode {
    /// Concatenate in chunk order, keeping overlap duplicates.
    #[default]
    Legacy,
    /// Sort by time and merge near-duplicates.
    Dedup,
}

/// Chunk result stitching.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchingConfig {
    /// Stitching mode.
    pub policy: StitchMode,

    /// Merge distance in seconds; defaults to the detector window size.
    pub dedup_tolerance: Option<f64>,
}

/// Detector backend settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorSection {
    /// JSON detector parameter file.
    pub params: Option<PathBuf>,
}

/// Supported per-file output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `AudioTagger` rectangle annotations.
    AudioTagger,
    /// Raven selection table.
    Raven,
    /// JSON result document.
    Json,
}

impl OutputFormat {
    /// File name suffix appended to the flattened input name.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::AudioTagger => output_files::AUDIOTAGGER,
            Self::Raven => output_files::RAVEN,
            Self::Json => output_files::JSON,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AudioTagger => write!(f, "audiotagger"),
            Self::Raven => write!(f, "raven"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "audiotagger" | "scenerect" => Ok(Self::AudioTagger),
            "raven" | "table" => Ok(Self::Raven),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}
