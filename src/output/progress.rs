//! Progress bar for batch runs.

use indicatif::{ProgressBar, ProgressStyle};

/// Create a progress bar over the files of a batch.
///
/// Returns `None` when disabled or when there is nothing to process.
pub fn create_file_progress(total_files: usize, enabled: bool) -> Option<ProgressBar> {
    if !enabled || total_files == 0 {
        return None;
    }

    let pb = ProgressBar::new(total_files as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} recordings ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    Some(pb)
}

/// Advance the bar by one file and show its name.
pub fn inc_progress(pb: Option<&ProgressBar>, file_name: &str) {
    if let Some(pb) = pb {
        pb.set_message(file_name.to_string());
        pb.inc(1);
    }
}

/// Finish the bar with a message.
pub fn finish_progress(pb: Option<ProgressBar>, message: &str) {
    if let Some(pb) = pb {
        pb.finish_with_message(message.to_string());
    }
}
