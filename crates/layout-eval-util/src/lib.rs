//! # Layout Evaluation Utilities
//!
//! File-facing helpers for the layout evaluator: decoding label images,
//! loading original pages, writing PNG artifacts and pairing ground truths
//! with predictions in dataset directories.

pub mod image;
pub mod pairs;

pub use image::{
    is_extension_supported, is_supported_image_format, label_image_from_rgb, load_label_image,
    load_original, save_png, ImageError, ImageResult,
};
pub use pairs::{collect_image_pairs, ImagePair};
