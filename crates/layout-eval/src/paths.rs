//! Output artifact locations.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

/// Artifact base path for a prediction, without extension.
///
/// Starts from the prediction's directory. An absolute `output_path`
/// replaces it and a relative one is joined onto it. The prediction's file
/// stem is appended last.
pub fn output_base(prediction: &Path, output_path: Option<&Path>) -> PathBuf {
    let prediction_dir = prediction.parent().unwrap_or_else(|| Path::new(""));
    let dir = match output_path {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => prediction_dir.join(path),
        None => prediction_dir.to_path_buf(),
    };
    match prediction.file_stem() {
        Some(stem) => dir.join(stem),
        None => dir,
    }
}

fn with_suffix(base: &Path, suffix: &str) -> PathBuf {
    let mut path = OsString::from(base.as_os_str());
    path.push(suffix);
    PathBuf::from(path)
}

/// `<base>.visualization.png`
pub fn visualization_path(base: &Path) -> PathBuf {
    with_suffix(base, ".visualization.png")
}

/// `<base>.overlap.png`
pub fn overlap_path(base: &Path) -> PathBuf {
    with_suffix(base, ".overlap.png")
}
