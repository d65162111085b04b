//! Output type definitions.

use std::path::PathBuf;

/// A single call detection in file-absolute real time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetectionRecord {
    /// Call onset in seconds from the start of the file.
    pub time: f64,
    /// Detection probability (0.0 - 1.0).
    pub probability: f32,
}

/// Detections and metadata for one processed file.
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Name relative to the input root it was found under.
    pub name: String,
    /// Path to the source audio file.
    pub path: PathBuf,
    /// Unpadded duration in real seconds.
    pub duration_secs: f64,
    /// Native sample rate of the file.
    pub sample_rate: u32,
    /// Whether the file was treated as time expanded.
    pub time_expanded: bool,
    /// Detections in stitching order.
    pub detections: Vec<DetectionRecord>,
}

impl FileResult {
    /// Number of detections.
    pub fn detection_count(&self) -> usize {
        self.detections.len()
    }

    /// Whether any call was detected.
    pub fn has_detections(&self) -> bool {
        !self.detections.is_empty()
    }
}
