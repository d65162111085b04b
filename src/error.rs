//! Error types for batdetect.

/// Result type alias for batdetect operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for batdetect.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Configuration validation failed.
    ///
    /// Raised before any file is processed; the run never starts.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Failed to read detector parameter file.
    #[error("failed to read detector params '{path}'")]
    DetectorParamsRead {
        /// Path to the params file.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse detector parameter file.
    #[error("failed to parse detector params '{path}'")]
    DetectorParamsParse {
        /// Path to the params file.
        path: std::path::PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// No valid audio files found.
    #[error("no valid audio files found in the provided paths")]
    NoValidAudioFiles,

    /// Failed to open audio file.
    #[error("failed to open audio file '{path}'")]
    AudioOpen {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Failed to decode audio.
    #[error("failed to decode audio from '{path}'")]
    AudioDecode {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No audio tracks found.
    #[error("no audio tracks found in '{path}'")]
    NoAudioTracks {
        /// Path to the audio file.
        path: std::path::PathBuf,
    },

    /// Sample rate is unusable for chunking.
    #[error("unusable sample rate {rate} Hz in '{path}'")]
    InvalidSampleRate {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Effective sample rate after time-expansion correction.
        rate: u32,
    },

    /// Processing a file exceeded the per-file timeout.
    #[error("processing '{path}' exceeded {timeout_secs}s timeout")]
    FileTimeout {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },

    /// The worker processing one file died.
    #[error("processing '{path}' failed: {message}")]
    FileTask {
        /// Path to the audio file.
        path: std::path::PathBuf,
        /// What the worker reported.
        message: String,
    },

    /// A planned chunk reached past the padded buffer.
    ///
    /// Padding and planning disagree; this is a bug, not bad input.
    #[error(
        "chunk slice {start}..{end} overruns padded buffer of {len} samples (padding/planning mismatch)"
    )]
    ChunkSliceOverrun {
        /// First sample index of the chunk.
        start: usize,
        /// One past the last sample index of the chunk.
        end: usize,
        /// Length of the padded buffer.
        len: usize,
    },

    /// Detection engine failed.
    #[error("detection failed: {reason}")]
    Detector {
        /// Description of the detector failure.
        reason: String,
    },

    /// Failed to write an output artifact.
    #[error("failed to write output '{path}'")]
    SinkWrite {
        /// Path to the output file.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Per-file outputs failed for some files.
    #[error("{count} per-file output(s) could not be written")]
    OutputWriteFailures {
        /// Number of failed per-file writes.
        count: usize,
    },

    /// The run was interrupted before all files were processed.
    #[error("interrupted after {completed} of {total} file(s)")]
    Interrupted {
        /// Files completed before interruption.
        completed: usize,
        /// Files scheduled in total.
        total: usize,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Whether this error means the input file could not be read.
    ///
    /// Read failures skip the file and never abort a batch.
    pub const fn is_read_failure(&self) -> bool {
        matches!(
            self,
            Self::AudioOpen { .. }
                | Self::AudioDecode { .. }
                | Self::NoAudioTracks { .. }
                | Self::InvalidSampleRate { .. }
                | Self::FileTimeout { .. }
        )
    }

    /// Whether this error must abort the whole batch.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ChunkSliceOverrun { .. } | Self::ConfigValidation { .. } | Self::Internal { .. }
        )
    }

    /// Wrap any error as a sink write failure for `path`.
    pub fn sink_write(
        path: &std::path::Path,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::SinkWrite {
            path: path.to_path_buf(),
            source: source.into(),
        }
    }
}
