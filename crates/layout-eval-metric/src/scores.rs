//! Per-class and aggregate scores derived from a completed accumulation.
//!
//! Per-class ratios with a zero denominator are NaN. Every aggregate mean
//! skips NaN entries and renormalizes by the weight of the remaining ones;
//! when every entry is NaN the mean itself is NaN.

use crate::{
    confusion::{Accumulation, ClassConfusion, ConfusionMatrix},
    error::{EvaluationError, MetricResult},
};

/// How the per-class F1-score is derived.
///
/// Both formulas agree whenever precision and recall are defined and not
/// both zero. They differ on degenerate classes: with `TP = 0` and
/// `FN + FP > 0` the harmonic mean of a zero precision and zero recall is
/// NaN while the count formula gives 0, and with exactly one of precision or
/// recall undefined the harmonic mean is NaN while the count formula still
/// yields a value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum F1Formula {
    /// `2·P·R / (P + R)` from the per-class precision and recall.
    #[default]
    HarmonicMean,
    /// `2·TP / (2·TP + FN + FP)` straight from the confusion counters.
    MatrixCounts,
}

/// `numerator / denominator`, NaN when the denominator is zero.
fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        f64::NAN
    } else {
        numerator as f64 / denominator as f64
    }
}

pub fn jaccard(c: &ClassConfusion) -> f64 {
    ratio(
        c.true_positives,
        c.true_positives + c.false_negatives + c.false_positives,
    )
}

pub fn precision(c: &ClassConfusion) -> f64 {
    ratio(c.true_positives, c.predicted_count())
}

pub fn recall(c: &ClassConfusion) -> f64 {
    ratio(c.true_positives, c.ground_truth_count())
}

pub fn f1(c: &ClassConfusion, formula: F1Formula) -> f64 {
    match formula {
        F1Formula::HarmonicMean => {
            let (p, r) = (precision(c), recall(c));
            2.0 * p * r / (p + r)
        }
        F1Formula::MatrixCounts => ratio(
            2 * c.true_positives,
            2 * c.true_positives + c.false_negatives + c.false_positives,
        ),
    }
}

/// Class frequencies, each class's share of all ground-truth label occurrences.
///
/// # Errors
///
/// Returns [`EvaluationError::NoGroundTruthLabels`] when no ground-truth
/// pixel carries a label.
pub fn frequencies(matrix: &ConfusionMatrix) -> MetricResult<Vec<f64>> {
    let total = matrix.total_ground_truth_labels();
    if total == 0 {
        return Err(EvaluationError::NoGroundTruthLabels {
            nb_classes: matrix.nb_classes(),
        });
    }
    Ok(matrix
        .classes()
        .iter()
        .map(|c| c.ground_truth_count() as f64 / total as f64)
        .collect())
}

/// Global accuracy, `Σ TP / Σ (TP + FN)`.
pub fn accuracy(matrix: &ConfusionMatrix) -> f64 {
    ratio(
        matrix.total_true_positives(),
        matrix.total_ground_truth_labels(),
    )
}

/// Weighted mean over the non-NaN entries of `values`.
pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    debug_assert_eq!(values.len(), weights.len());
    let (sum, total_weight) = values
        .iter()
        .zip(weights)
        .filter(|(value, _)| !value.is_nan())
        .fold((0.0, 0.0), |(sum, total), (value, weight)| {
            (sum + value * weight, total + weight)
        });
    sum / total_weight
}

/// Unweighted mean over the non-NaN entries of `values`.
pub fn mean(values: &[f64]) -> f64 {
    weighted_mean(values, &vec![1.0; values.len()])
}

/// Per-class metric vectors, each indexed by class bit.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub frequency: Vec<f64>,
    pub jaccard: Vec<f64>,
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub f1: Vec<f64>,
}

impl ClassMetrics {
    /// Derives every per-class vector from the confusion counters.
    ///
    /// # Errors
    ///
    /// Propagates [`frequencies`] failures.
    pub fn from_matrix(matrix: &ConfusionMatrix, f1_formula: F1Formula) -> MetricResult<Self> {
        let per_class = |score: fn(&ClassConfusion) -> f64| -> Vec<f64> {
            matrix.classes().iter().map(score).collect()
        };
        Ok(Self {
            frequency: frequencies(matrix)?,
            jaccard: per_class(jaccard),
            precision: per_class(precision),
            recall: per_class(recall),
            f1: matrix.classes().iter().map(|c| f1(c, f1_formula)).collect(),
        })
    }

    pub fn nb_classes(&self) -> usize {
        self.frequency.len()
    }
}

/// Index of each score in the fixed-order result vector.
///
/// [`Score::Accuracy`] only exists in the extended eleven-entry layout; in
/// the ten-entry competition layout every later score moves down by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Score {
    ExactMatch,
    HammingScore,
    MeanJaccard,
    WeightedJaccard,
    Accuracy,
    MeanF1,
    MeanPrecision,
    MeanRecall,
    WeightedF1,
    WeightedPrecision,
    WeightedRecall,
}

impl Score {
    /// Competition order, without accuracy.
    pub const COMPETITION: [Self; 10] = [
        Self::ExactMatch,
        Self::HammingScore,
        Self::MeanJaccard,
        Self::WeightedJaccard,
        Self::MeanF1,
        Self::MeanPrecision,
        Self::MeanRecall,
        Self::WeightedF1,
        Self::WeightedPrecision,
        Self::WeightedRecall,
    ];

    /// Extended order, accuracy at index 4.
    pub const WITH_ACCURACY: [Self; 11] = [
        Self::ExactMatch,
        Self::HammingScore,
        Self::MeanJaccard,
        Self::WeightedJaccard,
        Self::Accuracy,
        Self::MeanF1,
        Self::MeanPrecision,
        Self::MeanRecall,
        Self::WeightedF1,
        Self::WeightedPrecision,
        Self::WeightedRecall,
    ];

    /// Identifier used in serialized results.
    pub const fn key(self) -> &'static str {
        match self {
            Self::ExactMatch => "exactmatch",
            Self::HammingScore => "hammingscore",
            Self::MeanJaccard => "meanjaccardindex",
            Self::WeightedJaccard => "jaccardindex",
            Self::Accuracy => "accuracy",
            Self::MeanF1 => "meanf1score",
            Self::MeanPrecision => "meanprecision",
            Self::MeanRecall => "meanrecall",
            Self::WeightedF1 => "f1score",
            Self::WeightedPrecision => "precision",
            Self::WeightedRecall => "recall",
        }
    }
}

/// Immutable outcome of one evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    pub exact_match: f64,
    pub hamming_score: f64,
    pub mean_jaccard: f64,
    pub weighted_jaccard: f64,
    pub accuracy: f64,
    pub mean_f1: f64,
    pub mean_precision: f64,
    pub mean_recall: f64,
    pub weighted_f1: f64,
    pub weighted_precision: f64,
    pub weighted_recall: f64,
    pub classes: ClassMetrics,
    pub accumulation: Accumulation,
}

impl EvaluationResult {
    /// Derives every score from a completed accumulation.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::NoClasses`] for a zero-class accumulation,
    /// [`EvaluationError::EmptyImage`] when no pixel was recorded and
    /// [`EvaluationError::NoGroundTruthLabels`] when the ground truth is unlabeled.
    pub fn from_accumulation(accumulation: Accumulation, f1_formula: F1Formula) -> MetricResult<Self> {
        if accumulation.nb_classes() == 0 {
            return Err(EvaluationError::NoClasses);
        }
        if accumulation.pixel_count() == 0 {
            return Err(EvaluationError::EmptyImage);
        }

        let matrix = accumulation.matrix();
        let classes = ClassMetrics::from_matrix(matrix, f1_formula)?;
        let weights = &classes.frequency;

        Ok(Self {
            exact_match: accumulation.exact_match_ratio(),
            hamming_score: accumulation.hamming_score(),
            mean_jaccard: mean(&classes.jaccard),
            weighted_jaccard: weighted_mean(&classes.jaccard, weights),
            accuracy: accuracy(matrix),
            mean_f1: mean(&classes.f1),
            mean_precision: mean(&classes.precision),
            mean_recall: mean(&classes.recall),
            weighted_f1: weighted_mean(&classes.f1, weights),
            weighted_precision: weighted_mean(&classes.precision, weights),
            weighted_recall: weighted_mean(&classes.recall, weights),
            classes,
            accumulation,
        })
    }

    pub fn get(&self, score: Score) -> f64 {
        match score {
            Score::ExactMatch => self.exact_match,
            Score::HammingScore => self.hamming_score,
            Score::MeanJaccard => self.mean_jaccard,
            Score::WeightedJaccard => self.weighted_jaccard,
            Score::Accuracy => self.accuracy,
            Score::MeanF1 => self.mean_f1,
            Score::MeanPrecision => self.mean_precision,
            Score::MeanRecall => self.mean_recall,
            Score::WeightedF1 => self.weighted_f1,
            Score::WeightedPrecision => self.weighted_precision,
            Score::WeightedRecall => self.weighted_recall,
        }
    }

    /// Scores in competition order.
    pub fn scores(&self) -> [f64; 10] {
        Score::COMPETITION.map(|s| self.get(s))
    }

    /// Scores in extended order, accuracy at index 4.
    pub fn scores_with_accuracy(&self) -> [f64; 11] {
        Score::WITH_ACCURACY.map(|s| self.get(s))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    fn class(tp: u64, fn_: u64, fp: u64, tn: u64) -> ClassConfusion {
        ClassConfusion {
            true_positives: tp,
            false_negatives: fn_,
            false_positives: fp,
            true_negatives: tn,
        }
    }

    #[test]
    fn ratios_with_zero_denominator_are_nan() {
        let absent = class(0, 0, 0, 10);
        assert!(jaccard(&absent).is_nan());
        assert!(precision(&absent).is_nan());
        assert!(recall(&absent).is_nan());
        assert!(f1(&absent, F1Formula::HarmonicMean).is_nan());
        assert!(f1(&absent, F1Formula::MatrixCounts).is_nan());
    }

    #[test]
    fn f1_formulas_agree_on_defined_classes() {
        let c = class(4, 2, 1, 3);
        assert_abs_diff_eq!(
            f1(&c, F1Formula::HarmonicMean),
            f1(&c, F1Formula::MatrixCounts),
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(f1(&c, F1Formula::MatrixCounts), 8.0 / 11.0, epsilon = 1e-12);
    }

    #[test]
    fn f1_formulas_diverge_on_zero_true_positives() {
        // precision and recall are both zero
        let missed = class(0, 3, 2, 5);
        assert!(f1(&missed, F1Formula::HarmonicMean).is_nan());
        assert_eq!(f1(&missed, F1Formula::MatrixCounts), 0.0);

        // never predicted: precision undefined, recall zero
        let never_predicted = class(0, 3, 0, 7);
        assert!(f1(&never_predicted, F1Formula::HarmonicMean).is_nan());
        assert_eq!(f1(&never_predicted, F1Formula::MatrixCounts), 0.0);
    }

    #[test]
    fn mean_skips_nan_entries() {
        assert_abs_diff_eq!(mean(&[0.5, f64::NAN, 1.0]), 0.75, epsilon = 1e-12);
        assert!(mean(&[f64::NAN, f64::NAN]).is_nan());
    }

    #[test]
    fn weighted_mean_renormalizes_over_defined_entries() {
        let value = weighted_mean(&[1.0, f64::NAN, 0.0], &[0.25, 0.5, 0.25]);
        assert_abs_diff_eq!(value, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn frequencies_sum_to_one() {
        let mut acc = Accumulation::new(3);
        for value in [0b001, 0b011, 0b110, 0b100] {
            acc.record(value, 0);
        }

        let freq = frequencies(acc.matrix()).unwrap();
        assert_abs_diff_eq!(freq.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(freq[0], 2.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn frequencies_without_ground_truth_labels_returns_error() {
        let mut acc = Accumulation::new(4);
        acc.record(0, 0x1);
        assert_eq!(
            frequencies(acc.matrix()).unwrap_err(),
            EvaluationError::NoGroundTruthLabels { nb_classes: 4 }
        );
    }

    #[test]
    fn from_accumulation_empty_returns_error() {
        assert_eq!(
            EvaluationResult::from_accumulation(Accumulation::new(4), F1Formula::default())
                .unwrap_err(),
            EvaluationError::EmptyImage
        );
        assert_eq!(
            EvaluationResult::from_accumulation(Accumulation::new(0), F1Formula::default())
                .unwrap_err(),
            EvaluationError::NoClasses
        );
    }

    #[test]
    fn score_layouts_place_accuracy_at_index_four() {
        assert_eq!(Score::WITH_ACCURACY[4], Score::Accuracy);
        assert!(!Score::COMPETITION.contains(&Score::Accuracy));
        assert_eq!(Score::COMPETITION[4], Score::MeanF1);
        assert_eq!(Score::WITH_ACCURACY[5], Score::MeanF1);
    }
}
