//! Built-in spectral energy detector.
//!
//! Scores each spectrogram frame by its strongest denoised bin inside the
//! detector band, maps the score to a probability and keeps local maxima.
//! This stands in for a trained classifier; any other backend can be used
//! through the [`Detector`] trait.

use super::{Detector, DetectorConfig, LocalDetection, Spectrogram, SpectrogramPair};
use crate::constants::detector::MIN_FFT_SIZE;
use crate::error::{Error, Result};
use realfft::RealFftPlanner;
use std::cell::RefCell;

thread_local! {
    static FFT_PLANNER: RefCell<RealFftPlanner<f32>> = RefCell::new(RealFftPlanner::new());
}

/// Spectral energy call detector.
#[derive(Debug, Clone)]
pub struct EnergyDetector {
    config: DetectorConfig,
}

impl EnergyDetector {
    /// Build a detector from validated parameters.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// FFT size and hop in samples for `sample_rate`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn fft_params(&self, sample_rate: u32) -> (usize, usize) {
        let nfft = ((self.config.slice_scale * f64::from(sample_rate)).round() as usize)
            .max(MIN_FFT_SIZE);
        let hop = ((nfft as f64 * (1.0 - self.config.fft_overlap)).round() as usize).max(1);
        (nfft, hop)
    }

    /// Inclusive FFT bin range inside the detector band, if any.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn band_bins(&self, nfft: usize, sample_rate: u32) -> Option<(usize, usize)> {
        let bin_hz = f64::from(sample_rate) / nfft as f64;
        let lo = (self.config.min_freq * 1000.0 / bin_hz).ceil() as usize;
        let hi = ((self.config.max_freq * 1000.0 / bin_hz).floor() as usize).min(nfft / 2);
        (lo <= hi).then_some((lo, hi))
    }
}

impl Detector for EnergyDetector {
    fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn create_spectrogram(&self, samples: &[f32], sample_rate: u32) -> Result<SpectrogramPair> {
        if sample_rate == 0 {
            return Err(Error::Detector {
                reason: "sample rate must be positive".to_string(),
            });
        }

        let (nfft, hop) = self.fft_params(sample_rate);
        let frames = if samples.len() >= nfft {
            (samples.len() - nfft) / hop + 1
        } else {
            0
        };
        let Some((lo, hi)) = self.band_bins(nfft, sample_rate) else {
            let raw = Spectrogram::zeros(0, frames);
            let processed = process_spectrogram(&raw);
            return Ok(SpectrogramPair { raw, processed });
        };

        let mut raw = Spectrogram::zeros(hi - lo + 1, frames);
        if frames > 0 {
            let fft = FFT_PLANNER.with(|p| p.borrow_mut().plan_fft_forward(nfft));
            let window = hann_window(nfft);
            let mut input = fft.make_input_vec();
            let mut spectrum = fft.make_output_vec();

            for col in 0..frames {
                let frame = &samples[col * hop..col * hop + nfft];
                for ((dst, &s), &w) in input.iter_mut().zip(frame).zip(&window) {
                    *dst = s * w;
                }
                fft.process(&mut input, &mut spectrum)
                    .map_err(|e| Error::Detector {
                        reason: format!("FFT failed: {e}"),
                    })?;
                for (row, bin) in (lo..=hi).enumerate() {
                    *raw.get_mut(row, col) = spectrum[bin].norm().ln_1p();
                }
            }
        }

        let processed = process_spectrogram(&raw);
        Ok(SpectrogramPair { raw, processed })
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn detect(
        &self,
        processed: &Spectrogram,
        chunk_duration: f64,
        threshold: f32,
        low_res: bool,
    ) -> Result<Vec<LocalDetection>> {
        if processed.is_empty() {
            return Ok(Vec::new());
        }

        let mut scores: Vec<f32> = (0..processed.cols())
            .map(|col| processed.column(col).fold(0.0_f32, f32::max))
            .collect();
        if low_res {
            scores = scores
                .chunks(2)
                .map(|pair| pair.iter().copied().fold(0.0_f32, f32::max))
                .collect();
        }

        let scale = self.config.score_scale as f32;
        let probs: Vec<f32> = scores.iter().map(|&s| s / (s + scale)).collect();
        let time_per_col = chunk_duration / probs.len() as f64;

        Ok(local_maxima(&probs, self.config.nms_win_size / 2)
            .filter(|&i| probs[i] >= threshold)
            .map(|i| LocalDetection {
                offset: i as f64 * time_per_col,
                probability: probs[i],
            })
            .collect())
    }
}

/// Denoise and halve the frequency resolution.
///
/// Each row has its mean over time removed and is clamped at zero, then
/// adjacent rows are averaged in pairs.
#[allow(clippy::cast_precision_loss)]
fn process_spectrogram(raw: &Spectrogram) -> Spectrogram {
    let mut denoised = raw.clone();
    if raw.cols() > 0 {
        for row in 0..denoised.rows() {
            let values = denoised.row_mut(row);
            let mean = values.iter().sum::<f32>() / values.len() as f32;
            for v in values.iter_mut() {
                *v = (*v - mean).max(0.0);
            }
        }
    }

    let rows = denoised.rows().div_ceil(2);
    let mut processed = Spectrogram::zeros(rows, denoised.cols());
    for row in 0..rows {
        let first = 2 * row;
        let pair = if first + 1 < denoised.rows() { 2 } else { 1 };
        for col in 0..denoised.cols() {
            let sum: f32 = (first..first + pair).map(|r| denoised.get(r, col)).sum();
            *processed.get_mut(row, col) = sum / pair as f32;
        }
    }
    processed
}

/// Indices that are maxima within `half` frames on either side.
///
/// Ties go to the earliest frame.
fn local_maxima(values: &[f32], half: usize) -> impl Iterator<Item = usize> + '_ {
    (0..values.len()).filter(move |&i| {
        let v = values[i];
        let lo = i.saturating_sub(half);
        let hi = (i + half).min(values.len() - 1);
        values[lo..i].iter().all(|&p| p < v) && values[i + 1..=hi].iter().all(|&p| p <= v)
    })
}

#[allow(clippy::cast_precision_loss)]
fn hann_window(size: usize) -> Vec<f32> {
    let denom = (size - 1) as f32;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / denom).cos()))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    const RATE: u32 = 44_100;

    fn tone_burst(len: usize, start: usize, width: usize, freq: f32) -> Vec<f32> {
        let mut samples = vec![0.0; len];
        for (i, s) in samples.iter_mut().enumerate().skip(start).take(width) {
            *s = 0.5 * (2.0 * std::f32::consts::PI * freq * i as f32 / RATE as f32).sin();
        }
        samples
    }

    #[test]
    fn test_spectrogram_shape() {
        let detector = EnergyDetector::new(DetectorConfig::default()).unwrap();
        let pair = detector
            .create_spectrogram(&vec![0.0; 22_050], RATE)
            .unwrap();

        // nfft 1024, hop 256: (22050 - 1024) / 256 + 1 frames
        assert_eq!(pair.raw.cols(), 83);
        assert_eq!(pair.processed.cols(), 83);
        assert_eq!(pair.processed.rows(), pair.raw.rows().div_ceil(2));
    }

    #[test]
    fn test_short_chunk_has_no_frames() {
        let detector = EnergyDetector::new(DetectorConfig::default()).unwrap();
        let pair = detector.create_spectrogram(&[0.0; 100], RATE).unwrap();
        assert_eq!(pair.raw.cols(), 0);

        let found = detector.detect(&pair.processed, 0.01, 0.5, true).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_silence_has_no_detections() {
        let detector = EnergyDetector::new(DetectorConfig::default()).unwrap();
        let pair = detector
            .create_spectrogram(&vec![0.0; 22_050], RATE)
            .unwrap();
        let found = detector.detect(&pair.processed, 0.5, 0.1, false).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_tone_burst_detected_near_onset() {
        let detector = EnergyDetector::new(DetectorConfig::default()).unwrap();
        // 10 ms burst at 15 kHz starting at 0.2 s
        let samples = tone_burst(22_050, 8_820, 441, 15_000.0);
        let pair = detector.create_spectrogram(&samples, RATE).unwrap();

        for low_res in [false, true] {
            let found = detector.detect(&pair.processed, 0.5, 0.68, low_res).unwrap();
            assert_eq!(found.len(), 1, "low_res={low_res}: {found:?}");
            assert!((found[0].offset - 0.2).abs() < 0.03);
            assert!(found[0].probability >= 0.68);
        }
    }

    #[test]
    fn test_out_of_band_tone_ignored() {
        let config = DetectorConfig {
            min_freq: 20.0,
            ..DetectorConfig::default()
        };
        let detector = EnergyDetector::new(config).unwrap();
        let samples = tone_burst(22_050, 8_820, 441, 5_000.0);
        let pair = detector.create_spectrogram(&samples, RATE).unwrap();

        let found = detector.detect(&pair.processed, 0.5, 0.68, false).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_detect_nms_and_timing() {
        let config = DetectorConfig {
            nms_win_size: 3,
            ..DetectorConfig::default()
        };
        let detector = EnergyDetector::new(config).unwrap();
        let processed = Spectrogram::from_rows(
            1,
            10,
            vec![0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 0.0],
        )
        .unwrap();

        let found = detector.detect(&processed, 1.0, 0.5, false).unwrap();
        assert_eq!(found.len(), 2);
        assert!((found[0].offset - 0.2).abs() < 1e-9);
        assert!((found[1].offset - 0.8).abs() < 1e-9);
        assert!((found[0].probability - 5.0 / 5.5).abs() < 1e-6);

        // Pairs pooled: frames 2 and 8 land in pooled columns 1 and 4 of 5
        let found = detector.detect(&processed, 1.0, 0.5, true).unwrap();
        assert_eq!(found.len(), 2);
        assert!((found[0].offset - 0.2).abs() < 1e-9);
        assert!((found[1].offset - 0.8).abs() < 1e-9);

        // Threshold above the weaker peak
        let found = detector.detect(&processed, 1.0, 0.88, false).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn test_wide_nms_keeps_strongest() {
        let detector = EnergyDetector::new(DetectorConfig::default()).unwrap();
        let processed = Spectrogram::from_rows(
            1,
            10,
            vec![0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 0.0],
        )
        .unwrap();

        let found = detector.detect(&processed, 1.0, 0.5, false).unwrap();
        assert_eq!(found.len(), 1);
        assert!((found[0].offset - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_local_maxima_tie_goes_to_earliest() {
        let values = [0.0, 1.0, 1.0, 0.0];
        let peaks: Vec<usize> = local_maxima(&values, 2).collect();
        assert_eq!(peaks, vec![1]);
    }

    #[test]
    fn test_process_spectrogram_denoises_rows() {
        let raw = Spectrogram::from_rows(2, 4, vec![1.0, 1.0, 1.0, 5.0, 2.0, 2.0, 2.0, 2.0])
            .unwrap();
        let processed = process_spectrogram(&raw);

        assert_eq!(processed.rows(), 1);
        // Row 0 mean is 2.0: [0, 0, 0, 3]; row 1 is flat and becomes zero
        assert_eq!(processed.row(0), &[0.0, 0.0, 0.0, 1.5]);
    }
}
