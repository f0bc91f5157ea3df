//! Ground-truth / prediction pair discovery.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::image::{is_supported_image_format, ImageError, ImageResult};

/// A ground-truth file and the prediction sharing its file stem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePair {
    pub ground_truth: PathBuf,
    pub prediction: PathBuf,
}

fn stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Image files directly inside `dir`, sorted by file name.
fn image_files(dir: &Path) -> ImageResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ImageError::DirectoryReadError {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && is_supported_image_format(path) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// The candidate whose stem matches `ground_truth`.
fn matching_prediction<'a>(ground_truth: &Path, candidates: &'a [PathBuf]) -> Option<&'a PathBuf> {
    let wanted = stem(ground_truth)?;
    candidates
        .iter()
        .find(|candidate| stem(candidate) == Some(wanted))
}

/// Pairs every ground-truth image with the prediction of the same stem.
///
/// Ground truths without a prediction are skipped with a warning.
///
/// # Errors
///
/// Fails when a directory cannot be read or no pair is found.
pub fn collect_image_pairs(gt_dir: &Path, prediction_dir: &Path) -> ImageResult<Vec<ImagePair>> {
    let predictions = image_files(prediction_dir)?;
    let mut pairs = Vec::new();

    for ground_truth in image_files(gt_dir)? {
        match matching_prediction(&ground_truth, &predictions) {
            Some(prediction) => pairs.push(ImagePair {
                ground_truth,
                prediction: prediction.clone(),
            }),
            None => {
                tracing::warn!(path = %ground_truth.display(), "no prediction found for ground truth");
            }
        }
    }

    if pairs.is_empty() {
        return Err(ImageError::NoImagePairs {
            path: gt_dir.to_path_buf(),
        });
    }

    tracing::info!(
        pairs = pairs.len(),
        gt_dir = %gt_dir.display(),
        prediction_dir = %prediction_dir.display(),
        "found image pairs"
    );
    Ok(pairs)
}
