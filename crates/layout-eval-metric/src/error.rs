use thiserror::Error;

/// Errors raised while scoring a prediction against its ground truth.
///
/// All of them are precondition failures detected before the pixel scan
/// starts, or degenerate divisors detected before the aggregate means are
/// computed. No partial result is ever returned alongside an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    /// The two label images do not share the same dimensions.
    #[error(
        "dimension mismatch between ground truth and prediction: ground truth={}x{}, prediction={}x{}",
        gt_width,
        gt_height,
        prediction_width,
        prediction_height
    )]
    DimensionMismatch {
        gt_width: u32,
        gt_height: u32,
        prediction_width: u32,
        prediction_height: u32,
    },

    /// The visualization and the original image do not share the same dimensions.
    #[error(
        "dimension mismatch between visualization and original image: visualization={}x{}, original={}x{}",
        visualization_width,
        visualization_height,
        original_width,
        original_height
    )]
    OverlayDimensionMismatch {
        visualization_width: u32,
        visualization_height: u32,
        original_width: u32,
        original_height: u32,
    },

    /// A label image was built from a pixel buffer of the wrong length.
    #[error("pixel count mismatch: expected {expected}, got {actual}")]
    PixelCountMismatch { expected: usize, actual: usize },

    /// A single column cannot be taller than `u32::MAX` pixels.
    #[error("{pixels} pixels do not fit in one column")]
    ColumnTooTall { pixels: usize },

    /// The class count is zero, so no mean can be formed.
    #[error("at least one class is required")]
    NoClasses,

    /// A packed pixel cannot carry more class bits than its own width.
    #[error("{requested} classes requested, packed pixels carry at most {max}")]
    TooManyClasses { requested: usize, max: usize },

    /// No ground-truth pixel carries any label, so class frequencies are undefined.
    #[error("ground truth contains no labels for the first {nb_classes} classes")]
    NoGroundTruthLabels { nb_classes: usize },

    /// The images have no pixels.
    #[error("cannot evaluate an empty image")]
    EmptyImage,

    /// Two accumulations over different class counts cannot be merged.
    #[error("cannot merge accumulations over {left} and {right} classes")]
    ClassCountMismatch { left: usize, right: usize },
}

/// A specialized `Result` type for evaluation operations.
pub type MetricResult<T> = Result<T, EvaluationError>;
