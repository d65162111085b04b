//! Integration tests for the file pipeline through the public API.

#![allow(clippy::unwrap_used, clippy::float_cmp)]

use batdetect::config::OutputFormat;
use batdetect::detector::{Detector, DetectorConfig, LocalDetection, Spectrogram, SpectrogramPair};
use batdetect::pipeline::{
    BatchOptions, FileOutcome, InputFile, OutputOptions, ProcessOptions, StitchPolicy,
    collect_input_files, process_file, run_batch,
};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tempfile::tempdir;

/// Reports one call at a fixed offset in every chunk.
struct FixedDetector {
    config: DetectorConfig,
    offset: f64,
}

impl FixedDetector {
    fn new(offset: f64) -> Self {
        Self {
            config: DetectorConfig::default(),
            offset,
        }
    }
}

impl Detector for FixedDetector {
    fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn create_spectrogram(
        &self,
        samples: &[f32],
        _sample_rate: u32,
    ) -> batdetect::Result<SpectrogramPair> {
        let spec = Spectrogram::zeros(1, samples.len().min(8));
        Ok(SpectrogramPair {
            raw: spec.clone(),
            processed: spec,
        })
    }

    fn detect(
        &self,
        _processed: &Spectrogram,
        _chunk_duration: f64,
        _threshold: f32,
        _low_res: bool,
    ) -> batdetect::Result<Vec<LocalDetection>> {
        Ok(vec![LocalDetection {
            offset: self.offset,
            probability: 0.9,
        }])
    }
}

fn write_silent_wav(path: &Path, sample_rate: u32, samples: usize) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..samples {
        writer.write_sample(0_i16).unwrap();
    }
    writer.finalize().unwrap();
}

fn process_options(time_expansion: bool) -> ProcessOptions {
    ProcessOptions {
        time_expansion,
        threshold: 0.68,
        low_resolution: true,
        stitch_policy: StitchPolicy::Legacy,
        chunk_workers: 2,
    }
}

fn batch_options(output_dir: &Path, formats: Vec<OutputFormat>) -> BatchOptions {
    BatchOptions {
        process: process_options(true),
        output: OutputOptions {
            output_dir: output_dir.to_path_buf(),
            formats,
            save_individual: true,
            save_summary: true,
            class_name: "bat".to_string(),
        },
        jobs: 2,
        file_timeout: None,
        show_progress: false,
    }
}

#[test]
fn test_time_expanded_file_times_are_restored() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("te.wav");
    // One real second at 44.1 kHz is ten seconds once expanded: three chunks
    write_silent_wav(&path, 44_100, 44_100);
    let input = InputFile::new(path, dir.path());

    let outcome = process_file(&input, &FixedDetector::new(1.0), &process_options(true)).unwrap();
    let FileOutcome::Detected(result) = outcome else {
        panic!("expected detections");
    };

    assert!(result.time_expanded);
    assert_eq!(result.sample_rate, 44_100);
    assert!((result.duration_secs - 1.0).abs() < 1e-9);

    let times: Vec<f64> = result.detections.iter().map(|d| d.time).collect();
    assert_eq!(times.len(), 3);
    for (time, expected) in times.iter().zip([0.1, 0.477, 0.854]) {
        assert!((time - expected).abs() < 1e-9, "{time} != {expected}");
    }
}

#[test]
fn test_real_time_file_single_chunk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rt.wav");
    write_silent_wav(&path, 8_000, 8_000);
    let input = InputFile::new(path, dir.path());

    let outcome = process_file(&input, &FixedDetector::new(0.5), &process_options(false)).unwrap();
    let FileOutcome::Detected(result) = outcome else {
        panic!("expected detections");
    };

    assert!(!result.time_expanded);
    assert_eq!(result.detections.len(), 1);
    assert!((result.detections[0].time - 0.5).abs() < 1e-9);
}

#[test]
fn test_unreadable_file_is_skipped() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.wav");
    std::fs::write(&path, b"definitely not a wave file").unwrap();
    let input = InputFile::new(path, dir.path());

    let outcome = process_file(&input, &FixedDetector::new(0.5), &process_options(true)).unwrap();
    assert!(matches!(outcome, FileOutcome::Skipped { .. }));
}

#[test]
fn test_batch_isolates_bad_files() {
    let dir = tempdir().unwrap();
    let input_dir = dir.path().join("input");
    std::fs::create_dir_all(input_dir.join("site1")).unwrap();
    std::fs::write(input_dir.join("broken.wav"), b"RIFF garbage").unwrap();
    write_silent_wav(&input_dir.join("site1").join("good.wav"), 44_100, 44_100);

    let inputs = collect_input_files(&[input_dir]).unwrap();
    assert_eq!(inputs.len(), 2);

    let out = dir.path().join("out");
    let report = run_batch(
        &inputs,
        Arc::new(FixedDetector::new(1.0)),
        &batch_options(&out, vec![OutputFormat::AudioTagger, OutputFormat::Json]),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.detections, 3);
    assert_eq!(report.summary_rows, Some(3));
    assert!(!report.interrupted);

    let individual = out.join("individual_results");
    assert!(individual.join("site1_good-sceneRect.csv").exists());
    assert!(individual.join("site1_good.json").exists());
    assert!(!individual.join("broken-sceneRect.csv").exists());

    let summary = std::fs::read_to_string(out.join("results.csv")).unwrap();
    let lines: Vec<&str> = summary.lines().collect();
    assert_eq!(
        lines,
        vec![
            "file_name,detection_time,detection_prob",
            "site1/good.wav,0.1,0.9",
            "site1/good.wav,0.477,0.9",
            "site1/good.wav,0.854,0.9",
        ]
    );
}

#[test]
fn test_batch_without_detections_skips_summary() {
    struct NoCalls(DetectorConfig);

    impl Detector for NoCalls {
        fn config(&self) -> &DetectorConfig {
            &self.0
        }

        fn create_spectrogram(&self, _: &[f32], _: u32) -> batdetect::Result<SpectrogramPair> {
            Ok(SpectrogramPair {
                raw: Spectrogram::zeros(0, 0),
                processed: Spectrogram::zeros(0, 0),
            })
        }

        fn detect(
            &self,
            _: &Spectrogram,
            _: f64,
            _: f32,
            _: bool,
        ) -> batdetect::Result<Vec<LocalDetection>> {
            Ok(Vec::new())
        }
    }

    let dir = tempdir().unwrap();
    let path = dir.path().join("quiet.wav");
    write_silent_wav(&path, 44_100, 4_410);
    let inputs = collect_input_files(&[path]).unwrap();

    let out = dir.path().join("out");
    let report = run_batch(
        &inputs,
        Arc::new(NoCalls(DetectorConfig::default())),
        &batch_options(&out, vec![OutputFormat::AudioTagger]),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.files_with_detections, 0);
    assert_eq!(report.summary_rows, None);
    assert!(!out.join("results.csv").exists());

    // Per-file annotations are still written, header only
    let annotations =
        std::fs::read_to_string(out.join("individual_results").join("quiet-sceneRect.csv"))
            .unwrap();
    assert_eq!(annotations.lines().count(), 1);
}
