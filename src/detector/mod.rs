//! Call detection engine interface and built-in backend.
//!
//! The pipeline only talks to the [`Detector`] trait. A backend turns one
//! chunk of audio into a spectrogram pair and then into call onsets with
//! probabilities; everything about chunking, padding and timing stays out
//! of the backend.

mod config;
mod energy;
mod spectrogram;

pub use config::DetectorConfig;
pub use energy::EnergyDetector;
pub use spectrogram::{Spectrogram, SpectrogramPair};

use crate::error::Result;

/// A call detected inside one chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalDetection {
    /// Seconds from the start of the chunk.
    pub offset: f64,
    /// Detection probability (0.0 - 1.0).
    pub probability: f32,
}

/// Spectrogram-based call detector.
///
/// Implementations must be shareable across worker threads; chunks from the
/// same file may be processed concurrently.
pub trait Detector: Send + Sync {
    /// Parameters this detector was built with.
    fn config(&self) -> &DetectorConfig;

    /// Compute raw and processed spectrograms for a chunk of samples.
    fn create_spectrogram(&self, samples: &[f32], sample_rate: u32) -> Result<SpectrogramPair>;

    /// Find calls in a processed spectrogram.
    ///
    /// Returns detections with probability at or above `threshold`, in the
    /// detector's own order.
    fn detect(
        &self,
        processed: &Spectrogram,
        chunk_duration: f64,
        threshold: f32,
        low_res: bool,
    ) -> Result<Vec<LocalDetection>>;
}
