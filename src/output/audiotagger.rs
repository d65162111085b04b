//! `AudioTagger` rectangle annotation writer.
//!
//! Each call becomes a fixed-width rectangle on a spectrogram with
//! `NSTEP` seconds per column, spanning the full frequency axis.

use crate::constants::{CALL_WIDTH_SECS, SUMMARY_DECIMAL_PLACES, audiotagger};
use crate::error::{Error, Result};
use crate::output::{DetectionRecord, OutputWriter, round_decimals};
use std::fs::File;
use std::path::{Path, PathBuf};

const HEADER: [&str; 12] = [
    "Filename",
    "Label",
    "LabelTimeStamp",
    "Spec_NStep",
    "Spec_NWin",
    "Spec_x1",
    "Spec_y1",
    "Spec_x2",
    "Spec_y2",
    "LabelStartTime_Seconds",
    "LabelEndTime_Seconds",
    "Score",
];

/// `AudioTagger` `-sceneRect.csv` writer.
pub struct AudioTaggerWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
    file_name: String,
    label: String,
    y_max: f64,
}

impl AudioTaggerWriter {
    /// Create a writer for detections from `file_name`.
    ///
    /// `sample_rate` is the native rate of the recording; it sets the
    /// rectangle height.
    pub fn new(path: &Path, file_name: &str, label: &str, sample_rate: u32) -> Result<Self> {
        let writer = csv::Writer::from_path(path).map_err(|e| Error::sink_write(path, e))?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
            label: label.to_string(),
            y_max: f64::from(sample_rate) * audiotagger::NWIN / 2.0,
        })
    }

    fn write_row(&mut self, row: &[String]) -> Result<()> {
        self.writer
            .write_record(row)
            .map_err(|e| Error::sink_write(&self.path, e))
    }
}

impl OutputWriter for AudioTaggerWriter {
    fn write_header(&mut self) -> Result<()> {
        let header: Vec<String> = HEADER.iter().map(ToString::to_string).collect();
        self.write_row(&header)
    }

    fn write_detection(&mut self, detection: &DetectionRecord) -> Result<()> {
        let start = detection.time;
        let end = start + CALL_WIDTH_SECS;
        let row = vec![
            self.file_name.clone(),
            self.label.clone(),
            start.to_string(),
            audiotagger::NSTEP.to_string(),
            audiotagger::NWIN.to_string(),
            (start / audiotagger::NSTEP).to_string(),
            "0".to_string(),
            (end / audiotagger::NSTEP).to_string(),
            self.y_max.to_string(),
            start.to_string(),
            end.to_string(),
            round_decimals(f64::from(detection.probability), SUMMARY_DECIMAL_PLACES).to_string(),
        ];
        self.write_row(&row)
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::sink_write(&self.path, e))
    }
}
