//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "batdetect";

/// Default detection probability threshold.
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.68;

/// Default output directory when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "batdetect_results";

/// Default label written to per-file annotations.
pub const DEFAULT_CLASS_NAME: &str = "bat";

/// Default number of files processed concurrently.
pub const DEFAULT_JOBS: usize = 1;

/// Default number of chunk workers per file.
pub const DEFAULT_CHUNK_WORKERS: usize = 1;

/// Factor by which time-expanded recordings are slowed down.
pub const TIME_EXPANSION_FACTOR: u32 = 10;

/// Detection threshold bounds.
pub mod threshold {
    /// Lower end of the range the detector was calibrated for.
    pub const CALIBRATED_MIN: f32 = 0.43;
    /// Upper end of the range the detector was calibrated for.
    pub const CALIBRATED_MAX: f32 = 0.68;
    /// Maximum valid threshold.
    pub const MAX: f32 = 1.0;
}

/// Built-in detector parameter defaults.
pub mod detector {
    /// Chunk length in (possibly expanded) seconds.
    pub const CHUNK_SIZE: f64 = 4.0;
    /// Overlap between consecutive chunks in seconds.
    pub const WIN_SIZE: f64 = 0.23;
    /// Lowest spectrogram frequency kept, in kHz of the engine input.
    pub const MIN_FREQ_KHZ: f64 = 1.0;
    /// Highest spectrogram frequency kept, in kHz of the engine input.
    pub const MAX_FREQ_KHZ: f64 = 27.0;
    /// FFT window length in seconds.
    pub const SLICE_SCALE: f64 = 0.02322;
    /// Fractional overlap between FFT frames.
    pub const FFT_OVERLAP: f64 = 0.75;
    /// Score at which the mapped probability reaches 0.5.
    pub const SCORE_SCALE: f64 = 0.5;
    /// Non-maximum suppression window in spectrogram frames.
    pub const NMS_WIN_SIZE: usize = 21;
    /// Smallest FFT size the engine will use.
    pub const MIN_FFT_SIZE: usize = 16;
}

/// Output file names and suffixes.
pub mod output_files {
    /// Subdirectory for per-file results.
    pub const INDIVIDUAL_DIR: &str = "individual_results";
    /// Aggregate results file name.
    pub const SUMMARY: &str = "results.csv";
    /// AudioTagger rectangle annotation suffix.
    pub const AUDIOTAGGER: &str = "-sceneRect.csv";
    /// Raven selection table suffix.
    pub const RAVEN: &str = ".selection.table.txt";
    /// JSON results suffix.
    pub const JSON: &str = ".json";
}

/// AudioTagger annotation geometry.
pub mod audiotagger {
    /// Spectrogram step in seconds.
    pub const NSTEP: f64 = 0.001;
    /// Spectrogram window in seconds.
    pub const NWIN: f64 = 0.003;
}

/// Width written for each call, since the detector reports onsets only.
pub const CALL_WIDTH_SECS: f64 = 0.001;

/// Decimal places for times and probabilities in the summary file.
pub const SUMMARY_DECIMAL_PLACES: i32 = 3;

/// Decimal places for probabilities in per-file outputs.
pub const PROBABILITY_DECIMAL_PLACES: usize = 4;

/// Raven format constants.
pub mod raven {
    /// View column value.
    pub const VIEW: &str = "Spectrogram 1";
    /// Channel column value.
    pub const CHANNEL: u8 = 1;
}
