//! Processing pipeline components.

mod batch;
mod coordinator;
mod processor;
mod stitcher;

pub use batch::{BatchOptions, BatchReport, run_batch};
pub use coordinator::{
    InputFile, collect_input_files, flatten_name, individual_dir, output_path_for, summary_path,
};
pub use processor::{FileOutcome, OutputOptions, ProcessOptions, process_file, write_file_outputs};
pub use stitcher::{DetectionStitcher, StitchPolicy};
