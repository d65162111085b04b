//! CLI argument parsing.

mod args;
mod validators;

pub use args::{AnalyzeArgs, Cli, Command, ConfigAction};
pub use validators::{parse_non_negative_secs, parse_positive_count, parse_threshold};
