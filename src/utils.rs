use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConvertError, Result};

/// Create a progress bar with the given length and label
pub fn create_progress_bar(len: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{}] [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})",
                label
            ))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );
    pb
}

/// Create an output directory if it is missing and return its path.
///
/// Existing directories and their contents are left in place, so a run can target a
/// directory filled by an earlier one.
pub fn create_output_directory(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        log::debug!("Reusing existing output directory {:?}", path);
    } else {
        fs::create_dir_all(path).map_err(|e| ConvertError::io(path, e))?;
    }
    Ok(path.to_path_buf())
}

/// File stem of `path` made safe for use as an output file name.
pub fn sanitized_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    sanitize_filename::sanitize(stem)
}

/// Lowercased extension of `path`, without the dot.
pub fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}
