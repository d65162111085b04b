//! Chunk planning with overlap support.
//!
//! Long recordings are cut into fixed-size chunks that overlap by the
//! detector's window size, so that features spanning a chunk boundary are
//! seen whole by at least one chunk.

use crate::error::{Error, Result};
use std::ops::Range;

/// Validated chunk and window sizes, in seconds.
///
/// Both values are in the same timeline as the audio being planned: under
/// time expansion that is the stretched timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChunkGeometry {
    chunk_size: f64,
    win_size: f64,
}

impl ChunkGeometry {
    /// Create a geometry, rejecting sizes that would never terminate.
    pub fn new(chunk_size: f64, win_size: f64) -> Result<Self> {
        if !chunk_size.is_finite() || !win_size.is_finite() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "chunk_size and win_size must be finite, got {chunk_size} and {win_size}"
                ),
            });
        }
        if win_size <= 0.0 {
            return Err(Error::ConfigValidation {
                message: format!("win_size must be positive, got {win_size}"),
            });
        }
        if chunk_size <= win_size {
            return Err(Error::ConfigValidation {
                message: format!(
                    "chunk_size ({chunk_size}) must be greater than win_size ({win_size})"
                ),
            });
        }
        Ok(Self {
            chunk_size,
            win_size,
        })
    }

    /// Chunk length in seconds.
    pub const fn chunk_size(&self) -> f64 {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in seconds.
    pub const fn win_size(&self) -> f64 {
        self.win_size
    }

    /// Distance between consecutive chunk starts.
    pub fn step(&self) -> f64 {
        self.chunk_size - self.win_size
    }

    /// Number of chunks needed to start one inside every step of `duration`.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn chunk_count(&self, duration: f64) -> usize {
        if duration <= 0.0 {
            return 0;
        }
        (duration / self.step()).ceil() as usize
    }

    /// Duration the audio must be padded to so the last chunk fits.
    ///
    /// This is `ceil(duration / step) * step + win_size`.
    #[allow(clippy::cast_precision_loss)]
    pub fn padded_duration(&self, duration: f64) -> f64 {
        let multiplier = self.chunk_count(duration) as f64;
        multiplier.mul_add(self.step(), self.win_size)
    }

    /// Plan chunk start offsets covering `[0, duration)`.
    #[allow(clippy::cast_precision_loss)]
    pub fn plan(&self, duration: f64) -> ChunkPlan {
        let step = self.step();
        let starts = (0..self.chunk_count(duration))
            .map(|i| i as f64 * step)
            .collect();
        ChunkPlan {
            starts,
            chunk_size: self.chunk_size,
        }
    }
}

/// Ordered chunk start offsets for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkPlan {
    starts: Vec<f64>,
    chunk_size: f64,
}

impl ChunkPlan {
    /// Chunk start offsets in seconds, in visiting order.
    pub fn starts(&self) -> &[f64] {
        &self.starts
    }

    /// Number of planned chunks.
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    /// Whether there is nothing to process.
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Chunk length in seconds.
    pub const fn chunk_size(&self) -> f64 {
        self.chunk_size
    }

    /// Sample index range of the chunk starting at `start` seconds.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn sample_range(&self, start: f64, sample_rate: u32) -> Range<usize> {
        let rate = f64::from(sample_rate);
        let first = (start * rate) as usize;
        let len = (self.chunk_size * rate) as usize;
        first..first + len
    }

    /// Buffer length needed for every planned chunk to be sliced.
    pub fn required_samples(&self, sample_rate: u32) -> usize {
        self.starts
            .last()
            .map_or(0, |&start| self.sample_range(start, sample_rate).end)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_worked_example() {
        let geometry = ChunkGeometry::new(4.0, 1.0).unwrap();
        assert_eq!(geometry.step(), 3.0);

        let plan = geometry.plan(5.0);
        assert_eq!(plan.starts(), &[0.0, 3.0]);
        assert_eq!(geometry.padded_duration(5.0), 7.0);
    }

    #[test]
    fn test_plan_exact_multiple_excludes_end() {
        let geometry = ChunkGeometry::new(4.0, 1.0).unwrap();
        let plan = geometry.plan(6.0);
        assert_eq!(plan.starts(), &[0.0, 3.0]);
        assert_eq!(geometry.padded_duration(6.0), 7.0);
    }

    #[test]
    fn test_plan_empty_duration() {
        let geometry = ChunkGeometry::new(4.0, 1.0).unwrap();
        let plan = geometry.plan(0.0);
        assert!(plan.is_empty());
        assert_eq!(plan.required_samples(1000), 0);
        assert_eq!(geometry.padded_duration(0.0), 1.0);
    }

    #[test]
    fn test_plan_short_file_single_chunk() {
        let geometry = ChunkGeometry::new(4.0, 0.23).unwrap();
        let plan = geometry.plan(0.5);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.starts()[0], 0.0);
    }

    #[test]
    fn test_plan_coverage_and_spacing() {
        let geometry = ChunkGeometry::new(4.0, 0.23).unwrap();
        for &duration in &[0.01, 3.77, 3.78, 10.0, 123.456] {
            let plan = geometry.plan(duration);
            let starts = plan.starts();

            assert_eq!(starts[0], 0.0);
            for pair in starts.windows(2) {
                assert!((pair[1] - pair[0] - geometry.step()).abs() < 1e-9);
            }
            // Last start is inside the file and the last chunk reaches its end
            let last = *starts.last().unwrap();
            assert!(last < duration);
            assert!(last + geometry.chunk_size() >= duration);
            // Padded length covers the last chunk
            assert!(geometry.padded_duration(duration) >= last + geometry.chunk_size() - 1e-9);
        }
    }

    #[test]
    fn test_padded_duration_is_smallest_covering_value() {
        let geometry = ChunkGeometry::new(4.0, 1.0).unwrap();
        for &duration in &[0.5, 2.9, 3.0, 3.1, 8.99, 9.0, 9.01] {
            let padded = geometry.padded_duration(duration);
            assert!(padded >= duration);
            // One step less would leave the final start uncovered
            let k = geometry.chunk_count(duration);
            assert!((padded - (k as f64 * 3.0 + 1.0)).abs() < 1e-12);
            assert!(((k - 1) as f64) * 3.0 < duration);
        }
    }

    #[test]
    fn test_sample_range() {
        let plan = ChunkGeometry::new(4.0, 1.0).unwrap().plan(5.0);
        assert_eq!(plan.sample_range(0.0, 1000), 0..4000);
        assert_eq!(plan.sample_range(3.0, 1000), 3000..7000);
        assert_eq!(plan.required_samples(1000), 7000);
    }

    #[test]
    fn test_geometry_rejects_non_positive_step() {
        assert!(matches!(
            ChunkGeometry::new(1.0, 1.0),
            Err(Error::ConfigValidation { .. })
        ));
        assert!(ChunkGeometry::new(0.5, 1.0).is_err());
        assert!(ChunkGeometry::new(4.0, 0.0).is_err());
        assert!(ChunkGeometry::new(f64::NAN, 1.0).is_err());
    }
}
