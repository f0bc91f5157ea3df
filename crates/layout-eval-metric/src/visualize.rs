//! Categorical rendering of per-pixel prediction correctness.
//!
//! Each pixel is re-derived from the raw label images; the boundary rewrite
//! of the accumulator is not applied. Boundaries only matter where the ground
//! truth is foreground and the prediction is background, which is rendered as
//! correct background.

use image::{Pixel, Rgb, RgbImage, Rgba, RgbaImage};
use rayon::prelude::*;

use crate::{
    codec::{decode_boundary, LabelVector, BACKGROUND},
    confusion::validate_class_count,
    error::{EvaluationError, MetricResult},
    label_image::LabelImage,
};

/// Opacity of the visualization when laid over the original image.
pub const OVERLAY_OPACITY: f32 = 0.57;

/// Correctness category of one pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Background predicted together with another class.
    InvalidPrediction,
    BackgroundCorrect,
    /// Background mis-predicted as foreground.
    FalseForeground,
    /// Foreground mis-predicted as background.
    FalseBackground,
    ForegroundCorrect,
    /// Foreground predicted with the wrong classes, e.g. text instead of comment.
    ForegroundWrongClass,
}

impl Outcome {
    pub const ALL: [Self; 6] = [
        Self::InvalidPrediction,
        Self::BackgroundCorrect,
        Self::FalseForeground,
        Self::FalseBackground,
        Self::ForegroundCorrect,
        Self::ForegroundWrongClass,
    ];

    /// Palette color of the category.
    pub const fn color(self) -> Rgb<u8> {
        match self {
            Self::InvalidPrediction => Rgb([0xFF, 0xFF, 0xFF]),
            Self::BackgroundCorrect => Rgb([0x00, 0x00, 0x00]),
            Self::FalseForeground => Rgb([0xFF, 0x00, 0x00]),
            Self::FalseBackground => Rgb([0x00, 0xFF, 0xFF]),
            Self::ForegroundCorrect => Rgb([0x00, 0x7F, 0x00]),
            Self::ForegroundWrongClass => Rgb([0xFF, 0xFF, 0x00]),
        }
    }

    /// Inverse of [`Outcome::color`].
    pub fn from_color(color: Rgb<u8>) -> Option<Self> {
        Self::ALL.into_iter().find(|outcome| outcome.color() == color)
    }

    /// Classifies decoded labels, first matching rule wins.
    pub fn classify(ground_truth: &LabelVector, prediction: &LabelVector, boundary: bool) -> Self {
        let gt_background = ground_truth.get(BACKGROUND);
        let predicted_background = prediction.get(BACKGROUND);

        if prediction.is_contradictory() {
            return Self::InvalidPrediction;
        }
        match (gt_background, predicted_background) {
            (true, true) => Self::BackgroundCorrect,
            (true, false) => Self::FalseForeground,
            (false, true) if boundary => Self::BackgroundCorrect,
            (false, true) => Self::FalseBackground,
            (false, false) if ground_truth.hamming_distance(prediction) == 0 => {
                Self::ForegroundCorrect
            }
            (false, false) => Self::ForegroundWrongClass,
        }
    }

    /// Classifies a raw ground-truth/prediction pixel pair.
    pub fn of_pixel(gt_value: u32, prediction_value: u32, nb_classes: usize) -> Self {
        Self::classify(
            &LabelVector::decode(gt_value, nb_classes),
            &LabelVector::decode(prediction_value, nb_classes),
            decode_boundary(gt_value),
        )
    }
}

/// Renders the correctness category of every pixel as a palette color.
///
/// # Errors
///
/// Fails on an invalid class count or mismatched image dimensions.
pub fn render(
    ground_truth: &LabelImage,
    prediction: &LabelImage,
    nb_classes: usize,
) -> MetricResult<RgbImage> {
    validate_class_count(nb_classes)?;
    ground_truth.ensure_same_dimensions(prediction)?;

    let (width, height) = ground_truth.dimensions();
    let mut raster = RgbImage::new(width, height);
    let row_len = width.max(1) as usize;
    let channels = usize::from(Rgb::<u8>::CHANNEL_COUNT);

    raster
        .par_chunks_mut(row_len * channels)
        .zip(ground_truth.pixels().par_chunks(row_len))
        .zip(prediction.pixels().par_chunks(row_len))
        .for_each(|((out_row, gt_row), prediction_row)| {
            let pixels = gt_row.iter().zip(prediction_row);
            for (out, (&gt_value, &prediction_value)) in out_row.chunks_exact_mut(channels).zip(pixels) {
                let color = Outcome::of_pixel(gt_value, prediction_value, nb_classes).color();
                out.copy_from_slice(&color.0);
            }
        });

    Ok(raster)
}

/// Lays the visualization over the original image at [`OVERLAY_OPACITY`].
///
/// # Errors
///
/// Returns [`EvaluationError::OverlayDimensionMismatch`] when the images
/// differ in size.
pub fn overlap(visualization: &RgbImage, original: &RgbaImage) -> MetricResult<RgbaImage> {
    if visualization.dimensions() != original.dimensions() {
        let (visualization_width, visualization_height) = visualization.dimensions();
        let (original_width, original_height) = original.dimensions();
        return Err(EvaluationError::OverlayDimensionMismatch {
            visualization_width,
            visualization_height,
            original_width,
            original_height,
        });
    }

    let alpha = (OVERLAY_OPACITY * f32::from(u8::MAX)).round() as u8;
    let mut composite = original.clone();
    for (dst, src) in composite.pixels_mut().zip(visualization.pixels()) {
        let [r, g, b] = src.0;
        dst.blend(&Rgba([r, g, b, alpha]));
    }
    Ok(composite)
}
