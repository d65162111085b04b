//! JSON output format writer.

use crate::error::{Error, Result};
use crate::output::{DetectionRecord, OutputWriter};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// JSON result file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonResultFile {
    /// Source audio file name.
    pub source_file: String,
    /// Analysis timestamp.
    pub analysis_date: DateTime<Utc>,
    /// Analysis settings.
    pub settings: JsonSettings,
    /// Detection results.
    pub detections: Vec<JsonDetection>,
    /// Summary statistics.
    pub summary: JsonSummary,
}

/// Analysis settings recorded alongside the detections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonSettings {
    /// Detection probability threshold.
    pub threshold: f32,
    /// Whether the recording was treated as time expanded.
    pub time_expansion: bool,
    /// Whether low-resolution peak picking was used.
    pub low_resolution: bool,
    /// Chunk length in seconds of the chunking timeline.
    pub chunk_size: f64,
    /// Chunk overlap in seconds of the chunking timeline.
    pub win_size: f64,
}

/// Single detection in JSON format.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonDetection {
    /// Call onset in seconds.
    pub time: f64,
    /// Detection probability.
    pub probability: f32,
}

/// Summary statistics.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonSummary {
    /// Total number of detections.
    pub total_detections: usize,
    /// Highest detection probability, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_probability: Option<f32>,
    /// Audio duration in seconds.
    pub audio_duration_seconds: f64,
    /// Native sample rate in Hz.
    pub sample_rate: u32,
}

/// Writer for JSON detection output files.
///
/// Detections are buffered and the document is written on `finalize`.
pub struct JsonResultWriter {
    detections: Vec<DetectionRecord>,
    output_path: PathBuf,
    source_file: String,
    settings: JsonSettings,
    audio_duration: f64,
    sample_rate: u32,
}

impl JsonResultWriter {
    /// Create a new JSON result writer.
    pub fn new(
        output_path: &Path,
        source_file: &str,
        audio_duration: f64,
        sample_rate: u32,
        settings: JsonSettings,
    ) -> Self {
        Self {
            detections: Vec::new(),
            output_path: output_path.to_path_buf(),
            source_file: source_file.to_string(),
            settings,
            audio_duration,
            sample_rate,
        }
    }

    fn compute_summary(&self) -> JsonSummary {
        JsonSummary {
            total_detections: self.detections.len(),
            max_probability: self
                .detections
                .iter()
                .map(|d| d.probability)
                .reduce(f32::max),
            audio_duration_seconds: self.audio_duration,
            sample_rate: self.sample_rate,
        }
    }
}

impl OutputWriter for JsonResultWriter {
    fn write_header(&mut self) -> Result<()> {
        Ok(())
    }

    fn write_detection(&mut self, detection: &DetectionRecord) -> Result<()> {
        self.detections.push(*detection);
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        let result = JsonResultFile {
            source_file: self.source_file.clone(),
            analysis_date: Utc::now(),
            settings: self.settings.clone(),
            detections: self
                .detections
                .iter()
                .map(|d| JsonDetection {
                    time: d.time,
                    probability: d.probability,
                })
                .collect(),
            summary: self.compute_summary(),
        };

        let file =
            File::create(&self.output_path).map_err(|e| Error::sink_write(&self.output_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &result)
            .map_err(|e| Error::sink_write(&self.output_path, e))?;
        writer
            .flush()
            .map_err(|e| Error::sink_write(&self.output_path, e))
    }
}
