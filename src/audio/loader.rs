//! Audio loading: time-expansion correction and zero padding.

use crate::audio::chunker::ChunkGeometry;
use crate::audio::decode::{DecodedAudio, decode_audio_file};
use crate::constants::TIME_EXPANSION_FACTOR;
use crate::error::{Error, Result};
use std::path::Path;
use tracing::{debug, warn};

/// Time-expansion state chosen for one file.
///
/// Held constant from padding through detection, and undone exactly once
/// when detection times are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeExpansion {
    enabled: bool,
    original_rate: u32,
}

impl TimeExpansion {
    /// Create the state for a file recorded at `original_rate`.
    pub const fn new(enabled: bool, original_rate: u32) -> Self {
        Self {
            enabled,
            original_rate,
        }
    }

    /// Whether the recording is treated as time expanded.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Native sample rate of the file.
    pub const fn original_rate(&self) -> u32 {
        self.original_rate
    }

    /// Sample rate used for all chunk arithmetic.
    pub const fn effective_rate(&self) -> u32 {
        if self.enabled {
            self.original_rate / TIME_EXPANSION_FACTOR
        } else {
            self.original_rate
        }
    }

    /// Convert a real duration into the chunking timeline.
    pub fn stretch(&self, secs: f64) -> f64 {
        if self.enabled {
            secs * f64::from(TIME_EXPANSION_FACTOR)
        } else {
            secs
        }
    }

    /// Convert a chunking-timeline time back into real elapsed time.
    pub fn restore(&self, secs: f64) -> f64 {
        if self.enabled {
            secs / f64::from(TIME_EXPANSION_FACTOR)
        } else {
            secs
        }
    }
}

/// Mono sample buffer at a known rate.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Mono samples.
    pub samples: Vec<f32>,
}

/// Audio ready for chunked detection.
#[derive(Debug, Clone)]
pub struct LoadedAudio {
    /// Zero-padded buffer at the effective sample rate.
    pub buffer: AudioBuffer,
    /// Unpadded duration in the chunking timeline.
    pub duration_secs: f64,
    /// Padded duration in the chunking timeline.
    pub padded_duration_secs: f64,
    /// Time-expansion state for this file.
    pub time_expansion: TimeExpansion,
    /// Channel count of the source file.
    pub channels: usize,
}

impl LoadedAudio {
    /// Sample rate used for chunk arithmetic.
    pub const fn effective_rate(&self) -> u32 {
        self.time_expansion.effective_rate()
    }

    /// Native sample rate of the file.
    pub const fn original_rate(&self) -> u32 {
        self.time_expansion.original_rate()
    }

    /// Unpadded duration in real time.
    pub fn real_duration_secs(&self) -> f64 {
        self.time_expansion.restore(self.duration_secs)
    }
}

/// Decode a file and prepare it for chunked detection.
pub fn load_audio(
    path: &Path,
    time_expansion: bool,
    geometry: &ChunkGeometry,
) -> Result<LoadedAudio> {
    let decoded = decode_audio_file(path)?;
    if decoded.channels > 1 {
        warn!(
            "{}: {} channels, using the first channel only",
            path.display(),
            decoded.channels
        );
    }
    prepare_audio(path, decoded, time_expansion, geometry)
}

/// Apply time-expansion correction and padding to decoded audio.
pub fn prepare_audio(
    path: &Path,
    decoded: DecodedAudio,
    time_expansion: bool,
    geometry: &ChunkGeometry,
) -> Result<LoadedAudio> {
    let te = TimeExpansion::new(time_expansion, decoded.sample_rate);
    let rate = te.effective_rate();
    if rate == 0 {
        return Err(Error::InvalidSampleRate {
            path: path.to_path_buf(),
            rate,
        });
    }

    let duration_secs = te.stretch(decoded.duration_secs());
    debug!(
        "dur {:.3}s, fs {} Hz, effective fs {} Hz",
        decoded.duration_secs(),
        decoded.sample_rate,
        rate
    );

    let padded_duration_secs = geometry.padded_duration(duration_secs);
    let mut samples = decoded.samples;
    let pad = padding_samples(
        samples.len(),
        duration_secs,
        padded_duration_secs,
        rate,
        geometry,
    );
    samples.resize(samples.len() + pad, 0.0);

    Ok(LoadedAudio {
        buffer: AudioBuffer {
            sample_rate: rate,
            samples,
        },
        duration_secs,
        padded_duration_secs,
        time_expansion: te,
        channels: decoded.channels,
    })
}

/// Number of zero samples to append.
///
/// `floor((padded - duration) * rate)`, topped up when rounding would leave
/// the final planned chunk a sample or two short.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn padding_samples(
    len: usize,
    duration_secs: f64,
    padded_duration_secs: f64,
    rate: u32,
    geometry: &ChunkGeometry,
) -> usize {
    let nominal = ((padded_duration_secs - duration_secs) * f64::from(rate)).max(0.0) as usize;
    let required = geometry.plan(duration_secs).required_samples(rate);
    nominal.max(required.saturating_sub(len))
}
