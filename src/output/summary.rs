//! Aggregate `results.csv` across all files with detections.

use crate::constants::SUMMARY_DECIMAL_PLACES;
use crate::error::{Error, Result};
use crate::output::{FileResult, round_decimals};
use std::path::Path;
use tracing::info;

/// Column names of the summary file.
pub const SUMMARY_HEADER: [&str; 3] = ["file_name", "detection_time", "detection_prob"];

/// Write one row per detection for every file that has detections.
///
/// Rows follow the order of `results`, then stitching order within a file.
/// Returns the number of rows written.
pub fn write_summary(path: &Path, results: &[FileResult]) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| Error::sink_write(path, e))?;
    writer
        .write_record(SUMMARY_HEADER)
        .map_err(|e| Error::sink_write(path, e))?;

    let mut rows = 0;
    for result in results.iter().filter(|r| r.has_detections()) {
        for detection in &result.detections {
            let time = round_decimals(detection.time, SUMMARY_DECIMAL_PLACES);
            let prob = round_decimals(f64::from(detection.probability), SUMMARY_DECIMAL_PLACES);
            let row = [result.name.clone(), time.to_string(), prob.to_string()];
            writer
                .write_record(&row)
                .map_err(|e| Error::sink_write(path, e))?;
            rows += 1;
        }
    }

    writer.flush().map_err(|e| Error::sink_write(path, e))?;
    info!("Saved {} detection(s) to {}", rows, path.display());
    Ok(rows)
}
