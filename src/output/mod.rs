//! Output format writers.

mod audiotagger;
mod json;
pub mod progress;
mod raven;
mod summary;
mod types;
mod writer;

pub use audiotagger::AudioTaggerWriter;
pub use json::{JsonDetection, JsonResultFile, JsonResultWriter, JsonSettings, JsonSummary};
pub use raven::RavenWriter;
pub use summary::{SUMMARY_HEADER, write_summary};
pub use types::{DetectionRecord, FileResult};
pub use writer::OutputWriter;

/// Round to a fixed number of decimal places, half away from zero.
pub fn round_decimals(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}
