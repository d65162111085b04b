//! Batch orchestration across many files.

use crate::detector::Detector;
use crate::error::{Error, Result};
use crate::output::{FileResult, progress, write_summary};
use crate::pipeline::{
    FileOutcome, InputFile, OutputOptions, ProcessOptions, individual_dir, process_file,
    summary_path, write_file_outputs,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, mpsc};
use tracing::{error, info, warn};

/// Settings for a whole batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Per-file detection settings.
    pub process: ProcessOptions,
    /// Output layout and formats.
    pub output: OutputOptions,
    /// Files processed concurrently.
    pub jobs: usize,
    /// Per-file processing limit.
    pub file_timeout: Option<Duration>,
    /// Show a progress bar over files.
    pub show_progress: bool,
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Files scheduled.
    pub total: usize,
    /// Files that went through detection.
    pub processed: usize,
    /// Files skipped because they could not be read.
    pub skipped: usize,
    /// Files that failed during detection.
    pub failed: usize,
    /// Files with at least one detection.
    pub files_with_detections: usize,
    /// Detections across all files.
    pub detections: usize,
    /// Per-file outputs that could not be written.
    pub write_failures: usize,
    /// Rows in the summary, if one was written.
    pub summary_rows: Option<usize>,
    /// Whether the run stopped before all files were scheduled.
    pub interrupted: bool,
    /// Wall-clock time of the batch.
    pub elapsed: Duration,
}

impl BatchReport {
    /// Files that finished in any way.
    pub const fn completed(&self) -> usize {
        self.processed + self.skipped + self.failed
    }
}

/// Run detection over `inputs` and write all outputs.
///
/// At most `jobs` files run detection on the blocking pool at once; a file
/// that timed out keeps its slot until its detection really returns.
/// Per-file outputs are written one file at a time on the receiving side,
/// and only for files whose detection finished within the timeout. The
/// summary is written once at the end, in input order. Setting `cancel`
/// stops scheduling new files. Only fatal errors abort the batch.
pub fn run_batch(
    inputs: &[InputFile],
    detector: Arc<dyn Detector>,
    options: &BatchOptions,
    cancel: Arc<AtomicBool>,
) -> Result<BatchReport> {
    let start = Instant::now();
    prepare_output_dirs(&options.output)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()
        .map_err(|e| Error::Internal {
            message: format!("Failed to create async runtime: {e}"),
        })?;

    let file_progress = progress::create_file_progress(inputs.len(), options.show_progress);
    let mut report = BatchReport {
        total: inputs.len(),
        ..BatchReport::default()
    };
    let mut results: Vec<(usize, FileResult)> = Vec::new();

    let fatal = runtime.block_on(async {
        let mut rx = schedule(inputs, &detector, options, &cancel);
        let mut fatal = None;

        while let Some((index, outcome)) = rx.recv().await {
            let input = &inputs[index];
            progress::inc_progress(file_progress.as_ref(), &input.relative_name);

            match outcome {
                Ok(FileOutcome::Detected(result)) => {
                    report.processed += 1;
                    report.detections += result.detection_count();
                    if result.has_detections() {
                        report.files_with_detections += 1;
                    }
                    if options.output.save_individual
                        && let Err(e) = write_file_outputs(
                            input,
                            &result,
                            &options.output,
                            &options.process,
                            detector.config(),
                        )
                    {
                        error!("Failed to write results for {}: {}", input.relative_name, e);
                        report.write_failures += 1;
                    }
                    results.push((index, result));
                }
                Ok(FileOutcome::Skipped { .. }) => report.skipped += 1,
                Err(e) if e.is_fatal() => {
                    error!("Aborting batch at {}: {}", input.relative_name, e);
                    cancel.store(true, Ordering::SeqCst);
                    fatal.get_or_insert(e);
                }
                Err(e) => {
                    error!("Failed to process {}: {}", input.relative_name, e);
                    report.failed += 1;
                }
            }
        }
        fatal
    });
    // Timed-out files may still be running on the blocking pool
    runtime.shutdown_background();

    if let Some(e) = fatal {
        progress::finish_progress(file_progress, "Aborted");
        return Err(e);
    }
    report.interrupted = report.completed() < report.total;
    progress::finish_progress(
        file_progress,
        if report.interrupted {
            "Interrupted"
        } else {
            "Complete"
        },
    );

    if options.output.save_summary {
        results.sort_by_key(|(index, _)| *index);
        let results: Vec<FileResult> = results.into_iter().map(|(_, r)| r).collect();
        if results.iter().any(FileResult::has_detections) {
            let path = summary_path(&options.output.output_dir);
            info!("Saving results to {}", path.display());
            report.summary_rows = Some(write_summary(&path, &results)?);
        } else {
            info!("no detections to save");
        }
    }

    report.elapsed = start.elapsed();
    Ok(report)
}

type Completion = (usize, Result<FileOutcome>);

/// Spawn the scheduler; completions arrive on the returned channel.
fn schedule(
    inputs: &[InputFile],
    detector: &Arc<dyn Detector>,
    options: &BatchOptions,
    cancel: &Arc<AtomicBool>,
) -> mpsc::UnboundedReceiver<Completion> {
    let (tx, rx) = mpsc::unbounded_channel();
    let semaphore = Arc::new(Semaphore::new(options.jobs.max(1)));
    let inputs = inputs.to_vec();
    let detector = Arc::clone(detector);
    let process = options.process.clone();
    let timeout = options.file_timeout;
    let cancel = Arc::clone(cancel);

    tokio::spawn(async move {
        for (index, input) in inputs.into_iter().enumerate() {
            if cancel.load(Ordering::SeqCst) {
                break;
            }
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            if cancel.load(Ordering::SeqCst) {
                break;
            }

            let tx = tx.clone();
            let detector = Arc::clone(&detector);
            let process = process.clone();
            tokio::spawn(async move {
                let outcome = run_one(input, detector, process, timeout, permit).await;
                // Receiver only goes away once the batch is over
                let _ = tx.send((index, outcome));
            });
        }
    });

    rx
}

/// Process one file on the blocking pool, with an optional time limit.
///
/// `permit` is held by the blocking work, not by the wait for it.
async fn run_one(
    input: InputFile,
    detector: Arc<dyn Detector>,
    process: ProcessOptions,
    timeout: Option<Duration>,
    permit: OwnedSemaphorePermit,
) -> Result<FileOutcome> {
    let path = input.path.clone();
    let task = tokio::task::spawn_blocking(move || {
        let outcome = process_file(&input, detector.as_ref(), &process);
        drop(permit);
        outcome
    });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                let e = Error::FileTimeout {
                    path,
                    timeout_secs: limit.as_secs(),
                };
                warn!("Skipping: {}", e);
                return Ok(FileOutcome::Skipped {
                    reason: e.to_string(),
                });
            }
        },
        None => task.await,
    };

    joined.map_err(|e| Error::FileTask {
        path,
        message: e.to_string(),
    })?
}

/// Create the output directory and, if needed, the per-file subdirectory.
fn prepare_output_dirs(output: &OutputOptions) -> Result<()> {
    let dir = if output.save_individual {
        individual_dir(&output.output_dir)
    } else {
        output.output_dir.clone()
    };
    std::fs::create_dir_all(&dir).map_err(|e| Error::sink_write(&dir, e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use crate::detector::{DetectorConfig, LocalDetection, Spectrogram, SpectrogramPair};
    use crate::pipeline::{StitchPolicy, output_path_for};
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use tempfile::tempdir;

    fn empty_pair() -> SpectrogramPair {
        SpectrogramPair {
            raw: Spectrogram::zeros(0, 0),
            processed: Spectrogram::zeros(0, 0),
        }
    }

    /// Sleeps per chunk and reports nothing, tracking how many chunks run at once.
    struct SlowDetector {
        config: DetectorConfig,
        delay: Duration,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowDetector {
        fn new(delay: Duration) -> Self {
            Self {
                config: DetectorConfig::default(),
                delay,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    impl Detector for SlowDetector {
        fn config(&self) -> &DetectorConfig {
            &self.config
        }

        fn create_spectrogram(&self, _: &[f32], _: u32) -> Result<SpectrogramPair> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(empty_pair())
        }

        fn detect(&self, _: &Spectrogram, _: f64, _: f32, _: bool) -> Result<Vec<LocalDetection>> {
            Ok(Vec::new())
        }
    }

    /// Reports one call per chunk, but crashes on 8 kHz audio.
    struct CrashOn8k {
        config: DetectorConfig,
    }

    impl Detector for CrashOn8k {
        fn config(&self) -> &DetectorConfig {
            &self.config
        }

        fn create_spectrogram(&self, _: &[f32], sample_rate: u32) -> Result<SpectrogramPair> {
            if sample_rate == 8_000 {
                panic!("backend crashed at {sample_rate} Hz");
            }
            Ok(empty_pair())
        }

        fn detect(&self, _: &Spectrogram, _: f64, _: f32, _: bool) -> Result<Vec<LocalDetection>> {
            Ok(vec![LocalDetection {
                offset: 0.25,
                probability: 0.9,
            }])
        }
    }

    fn write_wav(path: &Path, sample_rate: u32, secs: f32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..(sample_rate as f32 * secs) as usize {
            writer.write_sample(0_i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn options(output_dir: &Path, timeout: Option<Duration>) -> BatchOptions {
        BatchOptions {
            process: ProcessOptions {
                time_expansion: false,
                threshold: 0.68,
                low_resolution: true,
                stitch_policy: StitchPolicy::Legacy,
                chunk_workers: 1,
            },
            output: OutputOptions {
                output_dir: output_dir.to_path_buf(),
                formats: vec![OutputFormat::AudioTagger],
                save_individual: true,
                save_summary: true,
                class_name: "bat".to_string(),
            },
            jobs: 1,
            file_timeout: timeout,
            show_progress: false,
        }
    }

    #[test]
    fn test_timeout_is_a_skip() {
        let dir = tempdir().unwrap();
        let input_path = dir.path().join("slow.wav");
        write_wav(&input_path, 8_000, 0.5);
        let input = InputFile::new(input_path, dir.path());

        let detector: Arc<dyn Detector> = Arc::new(SlowDetector::new(Duration::from_secs(3)));
        let out = dir.path().join("out");
        let report = run_batch(
            std::slice::from_ref(&input),
            detector,
            &options(&out, Some(Duration::from_millis(200))),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.processed, 0);
        assert!(!report.interrupted);
        assert!(!out.join("results.csv").exists());
        // Timed-out files get no per-file outputs
        assert!(!output_path_for(&input, &out, OutputFormat::AudioTagger).exists());
    }

    #[test]
    fn test_timed_out_files_keep_their_job_slot() {
        let dir = tempdir().unwrap();
        let inputs: Vec<InputFile> = (0..3)
            .map(|i| {
                let path = dir.path().join(format!("slow{i}.wav"));
                write_wav(&path, 8_000, 0.5);
                InputFile::new(path, dir.path())
            })
            .collect();

        let detector = Arc::new(SlowDetector::new(Duration::from_millis(600)));
        let report = run_batch(
            &inputs,
            Arc::clone(&detector) as Arc<dyn Detector>,
            &options(&dir.path().join("out"), Some(Duration::from_millis(100))),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        assert_eq!(report.skipped, 3);
        assert_eq!(detector.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_crashing_file_does_not_abort_batch() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("a_good.wav");
        let bad = dir.path().join("b_bad.wav");
        write_wav(&good, 16_000, 1.0);
        write_wav(&bad, 8_000, 1.0);
        let inputs = vec![
            InputFile::new(good, dir.path()),
            InputFile::new(bad, dir.path()),
        ];

        let detector: Arc<dyn Detector> = Arc::new(CrashOn8k {
            config: DetectorConfig::default(),
        });
        let out = dir.path().join("out");
        let report = run_batch(
            &inputs,
            detector,
            &options(&out, None),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        assert_eq!(report.processed, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.summary_rows, Some(1));
        let summary = std::fs::read_to_string(out.join("results.csv")).unwrap();
        assert!(summary.contains("a_good.wav,0.25,0.9"));
        assert!(!summary.contains("b_bad.wav"));
    }

    #[test]
    fn test_per_file_write_failure_keeps_summary() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("night.wav");
        write_wav(&path, 16_000, 1.0);
        let input = InputFile::new(path, dir.path());

        // A directory where the annotation file should go
        let out = dir.path().join("out");
        std::fs::create_dir_all(output_path_for(&input, &out, OutputFormat::AudioTagger)).unwrap();

        let detector: Arc<dyn Detector> = Arc::new(CrashOn8k {
            config: DetectorConfig::default(),
        });
        let report = run_batch(
            std::slice::from_ref(&input),
            detector,
            &options(&out, None),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        assert_eq!(report.write_failures, 1);
        assert_eq!(report.processed, 1);
        assert_eq!(report.summary_rows, Some(1));
        let summary = std::fs::read_to_string(out.join("results.csv")).unwrap();
        assert!(summary.contains("night.wav,0.25,0.9"));
    }

    #[test]
    fn test_cancelled_before_start() {
        let dir = tempdir().unwrap();
        let input_path = dir.path().join("a.wav");
        write_wav(&input_path, 8_000, 0.5);
        let inputs = vec![InputFile::new(input_path, dir.path())];

        let detector: Arc<dyn Detector> = Arc::new(SlowDetector::new(Duration::ZERO));
        let report = run_batch(
            &inputs,
            detector,
            &options(&dir.path().join("out"), None),
            Arc::new(AtomicBool::new(true)),
        )
        .unwrap();

        assert!(report.interrupted);
        assert_eq!(report.completed(), 0);
    }

    #[test]
    fn test_report_completed() {
        let report = BatchReport {
            processed: 2,
            skipped: 1,
            failed: 1,
            ..BatchReport::default()
        };
        assert_eq!(report.completed(), 4);
    }
}
