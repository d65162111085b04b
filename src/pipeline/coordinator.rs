//! Input discovery and output layout.

use crate::config::OutputFormat;
use crate::constants::output_files;
use crate::error::Result;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

/// An input recording and its name relative to the root it was found under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Path to the recording.
    pub path: PathBuf,
    /// Path relative to its input root, `/`-separated.
    pub relative_name: String,
}

impl InputFile {
    /// Create an input named relative to `root`.
    ///
    /// Falls back to the bare file name when `path` is not under `root`.
    pub fn new(path: PathBuf, root: &Path) -> Self {
        let relative_name = path.strip_prefix(root).map_or_else(
            |_| file_name_lossy(&path),
            |rel| {
                let parts: Vec<String> = rel
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                        _ => None,
                    })
                    .collect();
                if parts.is_empty() {
                    file_name_lossy(&path)
                } else {
                    parts.join("/")
                }
            },
        );
        Self {
            path,
            relative_name,
        }
    }

    /// Flattened output base name for this input.
    pub fn flattened_name(&self) -> String {
        flatten_name(&self.relative_name)
    }
}

fn file_name_lossy(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Turn a relative name into a single file name.
///
/// The `.wav` extension is dropped and path separators become `_`.
pub fn flatten_name(relative_name: &str) -> String {
    let stem = relative_name
        .len()
        .checked_sub(4)
        .filter(|&cut| {
            relative_name.is_char_boundary(cut)
                && relative_name[cut..].eq_ignore_ascii_case(".wav")
        })
        .map_or(relative_name, |cut| &relative_name[..cut]);
    stem.replace(['/', '\\'], "_")
}

/// Directory holding per-file results.
pub fn individual_dir(output_dir: &Path) -> PathBuf {
    output_dir.join(output_files::INDIVIDUAL_DIR)
}

/// Per-file output path for a given format.
pub fn output_path_for(input: &InputFile, output_dir: &Path, format: OutputFormat) -> PathBuf {
    individual_dir(output_dir).join(format!("{}{}", input.flattened_name(), format.suffix()))
}

/// Path of the aggregate summary.
pub fn summary_path(output_dir: &Path) -> PathBuf {
    output_dir.join(output_files::SUMMARY)
}

/// Collect input recordings from paths (files and directories).
///
/// Directories are walked recursively in name order. Explicit file paths
/// are kept only if they are wave files.
pub fn collect_input_files(paths: &[PathBuf]) -> Result<Vec<InputFile>> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            if is_wave_file(path) {
                let root = path.parent().unwrap_or_else(|| Path::new(""));
                files.push(InputFile::new(path.clone(), root));
            } else {
                warn!("Skipping non-wave file: {}", path.display());
            }
        } else if path.is_dir() {
            let mut found = Vec::new();
            collect_wave_files_recursive(path, &mut found)?;
            files.extend(found.into_iter().map(|p| InputFile::new(p, path)));
        } else {
            warn!("Skipping non-existent path: {}", path.display());
        }
    }

    Ok(files)
}

/// Recursively collect wave files from a directory.
fn collect_wave_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_wave_files_recursive(&path, files)?;
        } else if is_wave_file(&path) {
            files.push(path);
        }
    }

    Ok(())
}

/// Whether the path has a `.wav` extension, ignoring case.
fn is_wave_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(OsStr::new("wav")))
}
