//! # Layout Evaluation Metrics
//!
//! Pixel-level evaluation of multi-label document layout predictions, as used
//! by the historical document layout analysis competitions.
//!
//! Both images are [`LabelImage`]s of packed pixel values (see [`codec`] for
//! the bit layout). [`evaluate`] scores a prediction against its ground truth
//! and returns an immutable [`EvaluationResult`]; [`visualize`] renders the
//! per-pixel correctness as a palette image and [`overlap`] lays that image
//! over the original page.
//!
//! ## Boundary tolerance
//!
//! Ground-truth pixels flagged as boundaries are ambiguous between adjacent
//! regions. At such a pixel background always counts as present in the
//! ground truth, and a prediction sharing at least one ground-truth label is
//! credited with all of them. Extra predicted labels still count as mistakes.
//!
//! ## Usage
//!
//! ```rust
//! use layout_eval_metric::{evaluate, EvaluationConfig, LabelImage};
//!
//! let gt = LabelImage::column(vec![0x1, 0x8, 0x8, 0x80_0002]).unwrap();
//! let prediction = LabelImage::column(vec![0x1, 0x8, 0x4, 0x1]).unwrap();
//!
//! let result = evaluate(&gt, &prediction, &EvaluationConfig::new(4)).unwrap();
//! println!("{}", result.headline());
//! println!("{result}");
//! ```

pub mod codec;
pub mod confusion;
pub mod error;
pub mod label_image;
pub mod report;
pub mod scores;
pub mod visualize;

#[cfg(feature = "burn")]
pub mod burn_metric;

pub use codec::{
    class_name, decode_boundary, DivaClass, LabelVector, BOUNDARY_BIT, BOUNDARY_MASK,
    DEFAULT_CLASS_COUNT, MAX_CLASSES,
};
pub use confusion::{accumulate, Accumulation, ClassConfusion, ConfusionMatrix};
pub use error::{EvaluationError, MetricResult};
pub use label_image::LabelImage;
pub use scores::{ClassMetrics, EvaluationResult, F1Formula, Score};
pub use visualize::{overlap, render as visualize, Outcome, OVERLAY_OPACITY};

#[cfg(feature = "burn")]
pub use burn_metric::{LayoutInput, LayoutJaccardMetric, LayoutJaccardMetricConfig};

/// Settings of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationConfig {
    /// Number of low-order class bits read from each pixel.
    pub nb_classes: usize,
    pub f1_formula: F1Formula,
}

impl EvaluationConfig {
    pub fn new(nb_classes: usize) -> Self {
        Self {
            nb_classes,
            f1_formula: F1Formula::default(),
        }
    }

    pub fn with_f1_formula(mut self, f1_formula: F1Formula) -> Self {
        self.f1_formula = f1_formula;
        self
    }
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CLASS_COUNT)
    }
}

/// Scores a prediction against its ground truth.
///
/// # Errors
///
/// Fails before scanning on an invalid class count or mismatched dimensions,
/// and after scanning when the images are empty or the ground truth carries
/// no label.
pub fn evaluate(
    ground_truth: &LabelImage,
    prediction: &LabelImage,
    config: &EvaluationConfig,
) -> MetricResult<EvaluationResult> {
    let accumulation = accumulate(ground_truth, prediction, config.nb_classes)?;
    EvaluationResult::from_accumulation(accumulation, config.f1_formula)
}

#[cfg(test)]
pub(crate) mod tests;
