//! Detector parameters.

use crate::audio::ChunkGeometry;
use crate::constants::detector as defaults;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Immutable parameters shared by the detector and the chunk planner.
///
/// Loaded once per run from a JSON params file, or taken from the built-in
/// defaults. Unknown keys in the file are ignored so that params files
/// carrying extra model metadata still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Chunk length in seconds.
    pub chunk_size: f64,
    /// Overlap between consecutive chunks in seconds.
    pub win_size: f64,
    /// Lowest frequency kept in the spectrogram, kHz.
    pub min_freq: f64,
    /// Highest frequency kept in the spectrogram, kHz.
    pub max_freq: f64,
    /// FFT window length in seconds.
    pub slice_scale: f64,
    /// Fractional overlap between FFT frames.
    pub fft_overlap: f64,
    /// Score mapped to probability 0.5.
    pub score_scale: f64,
    /// Non-maximum suppression window in frames.
    pub nms_win_size: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            chunk_size: defaults::CHUNK_SIZE,
            win_size: defaults::WIN_SIZE,
            min_freq: defaults::MIN_FREQ_KHZ,
            max_freq: defaults::MAX_FREQ_KHZ,
            slice_scale: defaults::SLICE_SCALE,
            fft_overlap: defaults::FFT_OVERLAP,
            score_scale: defaults::SCORE_SCALE,
            nms_win_size: defaults::NMS_WIN_SIZE,
        }
    }
}

impl DetectorConfig {
    /// Load parameters from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::DetectorParamsRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self =
            serde_json::from_str(&contents).map_err(|e| Error::DetectorParamsParse {
                path: path.to_path_buf(),
                source: e,
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Chunk geometry derived from these parameters.
    pub fn geometry(&self) -> Result<ChunkGeometry> {
        ChunkGeometry::new(self.chunk_size, self.win_size)
    }

    /// Validate all parameters.
    ///
    /// Negated comparisons reject NaN as well as out-of-range values.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn validate(&self) -> Result<()> {
        self.geometry()?;

        if !(self.slice_scale > 0.0) {
            return Err(invalid(format!(
                "slice_scale must be positive, got {}",
                self.slice_scale
            )));
        }
        if !(0.0..1.0).contains(&self.fft_overlap) {
            return Err(invalid(format!(
                "fft_overlap must be in [0, 1), got {}",
                self.fft_overlap
            )));
        }
        if !(self.min_freq >= 0.0 && self.min_freq < self.max_freq) {
            return Err(invalid(format!(
                "frequency band must satisfy 0 <= min_freq < max_freq, got {}..{}",
                self.min_freq, self.max_freq
            )));
        }
        if !(self.score_scale > 0.0) {
            return Err(invalid(format!(
                "score_scale must be positive, got {}",
                self.score_scale
            )));
        }
        if self.nms_win_size == 0 {
            return Err(invalid("nms_win_size must be at least 1".to_string()));
        }

        Ok(())
    }
}

fn invalid(message: String) -> Error {
    Error::ConfigValidation { message }
}
