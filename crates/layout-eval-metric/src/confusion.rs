//! Per-class binary confusion matrix accumulation.
//!
//! Every pixel contributes one observation to each class: the multi-label
//! problem is decomposed into `nb_classes` independent binary problems. The
//! boundary rewrite is applied once per pixel before any counter moves.

use rayon::prelude::*;

use crate::{
    codec::{decode_pair, MAX_CLASSES},
    error::{EvaluationError, MetricResult},
    label_image::LabelImage,
};

/// Binary confusion counters of a single class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassConfusion {
    pub true_positives: u64,
    pub false_negatives: u64,
    pub false_positives: u64,
    pub true_negatives: u64,
}

impl ClassConfusion {
    /// Counts one observation of the class.
    pub fn record(&mut self, in_ground_truth: bool, in_prediction: bool) {
        match (in_ground_truth, in_prediction) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_negatives += 1,
            (false, true) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
        }
    }

    /// `TP + FN`: pixels where the ground truth carries the class.
    pub const fn ground_truth_count(&self) -> u64 {
        self.true_positives + self.false_negatives
    }

    /// `TP + FP`: pixels where the prediction carries the class.
    pub const fn predicted_count(&self) -> u64 {
        self.true_positives + self.false_positives
    }

    pub const fn total(&self) -> u64 {
        self.true_positives + self.false_negatives + self.false_positives + self.true_negatives
    }

    fn add(&mut self, other: &Self) {
        self.true_positives += other.true_positives;
        self.false_negatives += other.false_negatives;
        self.false_positives += other.false_positives;
        self.true_negatives += other.true_negatives;
    }
}

/// Confusion counters for every class, indexed by class bit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    classes: Vec<ClassConfusion>,
}

impl ConfusionMatrix {
    pub fn new(nb_classes: usize) -> Self {
        Self {
            classes: vec![ClassConfusion::default(); nb_classes],
        }
    }

    pub fn nb_classes(&self) -> usize {
        self.classes.len()
    }

    pub fn classes(&self) -> &[ClassConfusion] {
        &self.classes
    }

    pub fn class(&self, c: usize) -> Option<&ClassConfusion> {
        self.classes.get(c)
    }

    /// Total number of ground-truth label occurrences, `Σ (TP + FN)`.
    pub fn total_ground_truth_labels(&self) -> u64 {
        self.classes.iter().map(ClassConfusion::ground_truth_count).sum()
    }

    /// `Σ TP` over all classes.
    pub fn total_true_positives(&self) -> u64 {
        self.classes.iter().map(|c| c.true_positives).sum()
    }

    fn add(&mut self, other: &Self) {
        for (mine, theirs) in self.classes.iter_mut().zip(&other.classes) {
            mine.add(theirs);
        }
    }
}

/// Running totals of one or more evaluation passes.
///
/// The hamming loss is kept as an integer count of mismatched label bits so
/// that partial accumulations combine exactly in any order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accumulation {
    matrix: ConfusionMatrix,
    mismatched_labels: u64,
    exact_matches: u64,
    pixel_count: u64,
}

impl Accumulation {
    /// Empty accumulation, the identity of [`Accumulation::merge`].
    pub fn new(nb_classes: usize) -> Self {
        Self {
            matrix: ConfusionMatrix::new(nb_classes),
            mismatched_labels: 0,
            exact_matches: 0,
            pixel_count: 0,
        }
    }

    /// Records one ground-truth/prediction pixel pair.
    pub fn record(&mut self, gt_value: u32, prediction_value: u32) {
        let nb_classes = self.nb_classes();
        let (ground_truth, prediction) = decode_pair(gt_value, prediction_value, nb_classes);

        for (c, counters) in self.matrix.classes.iter_mut().enumerate() {
            counters.record(ground_truth.get(c), prediction.get(c));
        }

        let mismatched = ground_truth.hamming_distance(&prediction);
        self.mismatched_labels += mismatched as u64;
        if mismatched == 0 {
            self.exact_matches += 1;
        }
        self.pixel_count += 1;
    }

    /// Adds `other` into `self`.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::ClassCountMismatch`] when the two
    /// accumulations cover a different number of classes.
    pub fn merge(&mut self, other: &Self) -> MetricResult<()> {
        if self.nb_classes() != other.nb_classes() {
            return Err(EvaluationError::ClassCountMismatch {
                left: self.nb_classes(),
                right: other.nb_classes(),
            });
        }
        self.add(other);
        Ok(())
    }

    fn add(&mut self, other: &Self) {
        self.matrix.add(&other.matrix);
        self.mismatched_labels += other.mismatched_labels;
        self.exact_matches += other.exact_matches;
        self.pixel_count += other.pixel_count;
    }

    fn combined(mut self, other: Self) -> Self {
        self.add(&other);
        self
    }

    pub fn matrix(&self) -> &ConfusionMatrix {
        &self.matrix
    }

    pub fn nb_classes(&self) -> usize {
        self.matrix.nb_classes()
    }

    pub const fn pixel_count(&self) -> u64 {
        self.pixel_count
    }

    pub const fn exact_matches(&self) -> u64 {
        self.exact_matches
    }

    pub const fn mismatched_labels(&self) -> u64 {
        self.mismatched_labels
    }

    /// Sum of the per-pixel hamming losses.
    pub fn hamming_loss_sum(&self) -> f64 {
        self.mismatched_labels as f64 / self.nb_classes() as f64
    }

    /// Fraction of pixels whose label vectors match exactly.
    pub fn exact_match_ratio(&self) -> f64 {
        self.exact_matches as f64 / self.pixel_count as f64
    }

    /// `1 - mean hamming loss`.
    pub fn hamming_score(&self) -> f64 {
        1.0 - self.hamming_loss_sum() / self.pixel_count as f64
    }
}

/// Rejects class counts that cannot be evaluated.
///
/// # Errors
///
/// Returns [`EvaluationError::NoClasses`] for zero and
/// [`EvaluationError::TooManyClasses`] past [`MAX_CLASSES`].
pub fn validate_class_count(nb_classes: usize) -> MetricResult<()> {
    if nb_classes == 0 {
        return Err(EvaluationError::NoClasses);
    }
    if nb_classes > MAX_CLASSES {
        return Err(EvaluationError::TooManyClasses {
            requested: nb_classes,
            max: MAX_CLASSES,
        });
    }
    Ok(())
}

/// Accumulates the confusion counters of a ground-truth/prediction pair.
///
/// Rows are scanned in parallel and reduced with [`Accumulation::merge`]
/// semantics; the result equals a sequential scan.
///
/// # Errors
///
/// Fails before scanning when the class count is invalid or the images have
/// different dimensions.
pub fn accumulate(
    ground_truth: &LabelImage,
    prediction: &LabelImage,
    nb_classes: usize,
) -> MetricResult<Accumulation> {
    validate_class_count(nb_classes)?;
    ground_truth.ensure_same_dimensions(prediction)?;

    let row_len = ground_truth.width().max(1) as usize;
    let accumulation = ground_truth
        .pixels()
        .par_chunks(row_len)
        .zip(prediction.pixels().par_chunks(row_len))
        .map(|(gt_row, prediction_row)| {
            let mut row = Accumulation::new(nb_classes);
            for (&gt_value, &prediction_value) in gt_row.iter().zip(prediction_row) {
                row.record(gt_value, prediction_value);
            }
            row
        })
        .reduce(|| Accumulation::new(nb_classes), Accumulation::combined);

    tracing::debug!(
        pixels = accumulation.pixel_count,
        classes = nb_classes,
        exact_matches = accumulation.exact_matches,
        "accumulated confusion matrices"
    );

    Ok(accumulation)
}
