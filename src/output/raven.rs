//! Raven selection table output format writer.

use crate::constants::{CALL_WIDTH_SECS, PROBABILITY_DECIMAL_PLACES, raven};
use crate::error::{Error, Result};
use crate::output::{DetectionRecord, OutputWriter};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Raven selection table output writer.
///
/// Selections span the detector band, converted to real frequencies.
pub struct RavenWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    source_path: PathBuf,
    label: String,
    low_freq_hz: f64,
    high_freq_hz: f64,
    selection_id: u32,
}

impl RavenWriter {
    /// Create a new Raven writer.
    pub fn new(
        path: &Path,
        source_path: &Path,
        label: &str,
        band_hz: (f64, f64),
    ) -> Result<Self> {
        let file = File::create(path).map_err(|e| Error::sink_write(path, e))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path: path.to_path_buf(),
            source_path: source_path.to_path_buf(),
            label: label.replace(' ', "_"),
            low_freq_hz: band_hz.0,
            high_freq_hz: band_hz.1,
            selection_id: 0,
        })
    }
}

impl OutputWriter for RavenWriter {
    fn write_header(&mut self) -> Result<()> {
        writeln!(
            self.writer,
            "Selection\tView\tChannel\tBegin Time (s)\tEnd Time (s)\tLow Freq (Hz)\tHigh Freq (Hz)\tClass\tProbability\tBegin Path\tFile Offset (s)"
        )
        .map_err(|e| Error::sink_write(&self.path, e))
    }

    fn write_detection(&mut self, detection: &DetectionRecord) -> Result<()> {
        self.selection_id += 1;

        writeln!(
            self.writer,
            "{}\t{}\t{}\t{:.4}\t{:.4}\t{:.0}\t{:.0}\t{}\t{:.decimal$}\t{}\t{:.4}",
            self.selection_id,
            raven::VIEW,
            raven::CHANNEL,
            detection.time,
            detection.time + CALL_WIDTH_SECS,
            self.low_freq_hz,
            self.high_freq_hz,
            self.label,
            detection.probability,
            self.source_path.display(),
            detection.time,
            decimal = PROBABILITY_DECIMAL_PLACES,
        )
        .map_err(|e| Error::sink_write(&self.path, e))
    }

    fn finalize(&mut self) -> Result<()> {
        self.writer
            .flush()
            .map_err(|e| Error::sink_write(&self.path, e))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_raven_writer_basic() {
        let file = NamedTempFile::new().unwrap();
        let mut writer = RavenWriter::new(
            file.path(),
            Path::new("/data/site1/a.wav"),
            "bat",
            (10_000.0, 270_000.0),
        )
        .unwrap();

        writer.write_header().unwrap();
        writer
            .write_detection(&DetectionRecord {
                time: 1.25,
                probability: 0.8542,
            })
            .unwrap();
        writer
            .write_detection(&DetectionRecord {
                time: 2.5,
                probability: 0.71,
            })
            .unwrap();
        writer.finalize().unwrap();

        let contents = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("Selection\tView"));
        assert_eq!(
            lines[1],
            "1\tSpectrogram 1\t1\t1.2500\t1.2510\t10000\t270000\tbat\t0.8542\t/data/site1/a.wav\t1.2500"
        );
        assert!(lines[2].starts_with("2\t"));
    }
}
