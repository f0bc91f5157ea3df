//! Image file loading and saving for layout evaluation.

use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use layout_eval_metric::LabelImage;
use thiserror::Error;

/// ImageError covers all file-facing failures of the evaluator.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to open image at '{path}': {source}")]
    ImageLoadError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to save image at '{path}': {source}")]
    ImageSaveError {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to read directory '{path}': {source}")]
    DirectoryReadError {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("unsupported image format: '{path}'")]
    UnsupportedFormat { path: PathBuf },

    #[error("no ground truth/prediction pairs found in '{path}'")]
    NoImagePairs { path: PathBuf },
}

/// Result type alias for ImageError
pub type ImageResult<T> = Result<T, ImageError>;

/// Returns true when the file extension names a format this build can read.
pub fn is_supported_image_format<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(is_extension_supported)
}

/// Returns true for readable image extensions, with or without a leading dot.
pub fn is_extension_supported(extension: &str) -> bool {
    let extension = extension.trim_start_matches('.');
    ImageFormat::from_extension(extension).is_some_and(|format| format.reading_enabled())
}

/// Packs an RGB raster into label pixels, `R << 16 | G << 8 | B`.
pub fn label_image_from_rgb(rgb: &RgbImage) -> LabelImage {
    let (width, height) = rgb.dimensions();
    LabelImage::from_fn(width, height, |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        u32::from(r) << 16 | u32::from(g) << 8 | u32::from(b)
    })
}

fn open(path: &Path) -> ImageResult<DynamicImage> {
    if !is_supported_image_format(path) {
        return Err(ImageError::UnsupportedFormat {
            path: path.to_path_buf(),
        });
    }
    image::open(path).map_err(|source| ImageError::ImageLoadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads a ground-truth or prediction image as packed label pixels.
///
/// Alpha is discarded. The file must be stored losslessly for the class bits
/// to survive.
pub fn load_label_image<P: AsRef<Path>>(path: P) -> ImageResult<LabelImage> {
    let path = path.as_ref();
    let rgb = open(path)?.to_rgb8();
    tracing::debug!(
        path = %path.display(),
        width = rgb.width(),
        height = rgb.height(),
        "loaded label image"
    );
    Ok(label_image_from_rgb(&rgb))
}

/// Loads the original page image used as the overlap background.
pub fn load_original<P: AsRef<Path>>(path: P) -> ImageResult<RgbaImage> {
    Ok(open(path.as_ref())?.to_rgba8())
}

/// Writes an image as PNG, whatever the extension of `path`.
pub fn save_png<P: AsRef<Path>>(image: impl Into<DynamicImage>, path: P) -> ImageResult<()> {
    let path = path.as_ref();
    image
        .into()
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| ImageError::ImageSaveError {
            path: path.to_path_buf(),
            source,
        })
}
