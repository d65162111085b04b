//! Spectrogram storage.

/// Magnitude spectrogram stored row-major.
///
/// Row 0 is the lowest kept frequency; columns are time frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Spectrogram {
    /// Create a spectrogram from row-major data.
    ///
    /// Returns `None` if `data` does not hold `rows * cols` values.
    pub fn from_rows(rows: usize, cols: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { rows, cols, data })
    }

    /// Create an all-zero spectrogram.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Number of frequency rows.
    pub const fn rows(&self) -> usize {
        self.rows
    }

    /// Number of time frames.
    pub const fn cols(&self) -> usize {
        self.cols
    }

    /// Whether there are no values.
    pub const fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    /// Value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[row * self.cols + col]
    }

    /// Mutable reference to the value at `(row, col)`.
    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut f32 {
        &mut self.data[row * self.cols + col]
    }

    /// One frequency row across all frames.
    pub fn row(&self, row: usize) -> &[f32] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Mutable frequency row.
    pub fn row_mut(&mut self, row: usize) -> &mut [f32] {
        &mut self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Values of one frame, lowest frequency first.
    pub fn column(&self, col: usize) -> impl Iterator<Item = f32> + '_ {
        (0..self.rows).map(move |row| self.get(row, col))
    }
}

/// Raw and processed spectrograms for one chunk.
#[derive(Debug, Clone)]
pub struct SpectrogramPair {
    /// Log-magnitude spectrogram cropped to the detector band.
    pub raw: Spectrogram,
    /// Denoised, reduced-resolution spectrogram fed to detection.
    pub processed: Spectrogram,
}
