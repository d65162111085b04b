//! Per-chunk detection and stitching into one file-level stream.

use crate::audio::{AudioBuffer, ChunkPlan, TimeExpansion};
use crate::detector::Detector;
use crate::error::{Error, Result};
use crate::output::DetectionRecord;
use std::cmp::Ordering;
use tracing::{debug, trace};

/// How detections from overlapping chunks are joined.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StitchPolicy {
    /// Concatenate in chunk order. Calls inside an overlap region may be
    /// reported once per chunk that saw them.
    #[default]
    Legacy,
    /// Sort by time and merge records closer than `tolerance` seconds,
    /// keeping the more probable one. Tolerance is in the chunking
    /// timeline.
    SortDedup {
        /// Merge distance in seconds.
        tolerance: f64,
    },
}

/// Runs a detector over every planned chunk of a file.
pub struct DetectionStitcher<'a> {
    detector: &'a dyn Detector,
    threshold: f32,
    low_res: bool,
    policy: StitchPolicy,
    chunk_workers: usize,
}

impl<'a> DetectionStitcher<'a> {
    /// Create a sequential stitcher with the legacy policy.
    pub fn new(detector: &'a dyn Detector, threshold: f32, low_res: bool) -> Self {
        Self {
            detector,
            threshold,
            low_res,
            policy: StitchPolicy::Legacy,
            chunk_workers: 1,
        }
    }

    /// Set the stitch policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: StitchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Spread chunks of one file across `workers` threads.
    #[must_use]
    pub fn with_chunk_workers(mut self, workers: usize) -> Self {
        self.chunk_workers = workers.max(1);
        self
    }

    /// Detect calls in every planned chunk and return file-level records.
    ///
    /// Records come out in chunk order, then detector order, with times in
    /// real seconds. Any chunk that reaches past `audio` is a planning bug
    /// and fails the whole call.
    pub fn run(
        &self,
        plan: &ChunkPlan,
        audio: &AudioBuffer,
        time_expansion: &TimeExpansion,
    ) -> Result<Vec<DetectionRecord>> {
        let ranges = plan
            .starts()
            .iter()
            .map(|&start| {
                let range = plan.sample_range(start, audio.sample_rate);
                if range.end > audio.samples.len() {
                    return Err(Error::ChunkSliceOverrun {
                        start: range.start,
                        end: range.end,
                        len: audio.samples.len(),
                    });
                }
                Ok((start, range))
            })
            .collect::<Result<Vec<_>>>()?;

        let workers = self.chunk_workers.min(ranges.len()).max(1);
        debug!(
            "Detecting in {} chunk(s) with {} worker(s)",
            ranges.len(),
            workers
        );

        let mut records = if workers == 1 {
            self.detect_chunks(&ranges, audio)?
        } else {
            self.detect_chunks_parallel(&ranges, audio, workers)?
        };

        if let StitchPolicy::SortDedup { tolerance } = self.policy {
            records = sort_dedup(records, tolerance);
        }

        for record in &mut records {
            record.time = time_expansion.restore(record.time);
        }
        Ok(records)
    }

    /// Detect in a contiguous run of chunks, in order.
    #[allow(clippy::cast_precision_loss)]
    fn detect_chunks(
        &self,
        ranges: &[(f64, std::ops::Range<usize>)],
        audio: &AudioBuffer,
    ) -> Result<Vec<DetectionRecord>> {
        let rate = f64::from(audio.sample_rate);
        let mut records = Vec::new();

        for (start, range) in ranges {
            let chunk = &audio.samples[range.clone()];
            let chunk_duration = chunk.len() as f64 / rate;

            let spec = self.detector.create_spectrogram(chunk, audio.sample_rate)?;
            let local = self.detector.detect(
                &spec.processed,
                chunk_duration,
                self.threshold,
                self.low_res,
            )?;
            trace!("chunk at {:.3}s: {} call(s)", start, local.len());

            records.extend(local.into_iter().map(|d| DetectionRecord {
                time: d.offset + start,
                probability: d.probability,
            }));
        }

        Ok(records)
    }

    /// Detect with contiguous blocks of chunks on scoped threads.
    ///
    /// Blocks are joined in order so the output matches a sequential run.
    fn detect_chunks_parallel(
        &self,
        ranges: &[(f64, std::ops::Range<usize>)],
        audio: &AudioBuffer,
        workers: usize,
    ) -> Result<Vec<DetectionRecord>> {
        let block = ranges.len().div_ceil(workers);

        std::thread::scope(|scope| {
            let handles: Vec<_> = ranges
                .chunks(block)
                .map(|part| scope.spawn(move || self.detect_chunks(part, audio)))
                .collect();

            let mut records = Vec::new();
            for handle in handles {
                let part = handle.join().map_err(|_| Error::Detector {
                    reason: "chunk worker panicked".to_string(),
                })??;
                records.extend(part);
            }
            Ok(records)
        })
    }
}

/// Sort by time and merge records within `tolerance` of the last kept one.
fn sort_dedup(mut records: Vec<DetectionRecord>, tolerance: f64) -> Vec<DetectionRecord> {
    records.sort_by(|a, b| a.time.partial_cmp(&b.time).unwrap_or(Ordering::Equal));

    let mut kept: Vec<DetectionRecord> = Vec::with_capacity(records.len());
    for record in records {
        match kept.last_mut() {
            Some(last) if record.time - last.time <= tolerance => {
                if record.probability > last.probability {
                    *last = record;
                }
            }
            _ => kept.push(record),
        }
    }
    kept
}
