use approx::assert_abs_diff_eq;
use proptest::prelude::*;

use crate::{
    accumulate, evaluate, visualize, Accumulation, EvaluationConfig, EvaluationError, F1Formula,
    LabelImage, Outcome, Score, BOUNDARY_MASK,
};

/// Ten one-pixel rows covering every boundary and outcome case.
pub(crate) fn worked_ground_truth() -> LabelImage {
    LabelImage::column(vec![
        0x1, 0x1, 0x1, 0x1, 0xC, 0xC, 0xC, 0xC, 0x80_0002, 0x80_000C,
    ])
    .unwrap()
}

pub(crate) fn worked_prediction() -> LabelImage {
    LabelImage::column(vec![0x1, 0x8, 0xC, 0x5, 0x3, 0xA, 0x8, 0xC, 0x1, 0xA]).unwrap()
}

pub(crate) fn worked_scenario() -> (LabelImage, LabelImage) {
    (worked_ground_truth(), worked_prediction())
}

#[test]
fn evaluate_worked_scenario_scores() {
    let (gt, prediction) = worked_scenario();
    let result = evaluate(&gt, &prediction, &EvaluationConfig::new(4)).unwrap();

    let expected = [
        0.3, 0.65, 0.4196, 0.4684, 0.5747, 0.5541, 0.7166, 0.6248, 0.6401, 0.6470,
    ];
    for (score, (actual, expected)) in Score::COMPETITION
        .iter()
        .zip(result.scores().into_iter().zip(expected))
    {
        assert_abs_diff_eq!(actual, expected, epsilon = 1e-4);
        assert_eq!(result.get(*score), actual);
    }
}

#[test]
fn evaluate_worked_scenario_per_class_vectors() {
    let (gt, prediction) = worked_scenario();
    let result = evaluate(&gt, &prediction, &EvaluationConfig::new(4)).unwrap();
    let classes = &result.classes;

    let jaccard = [4.0 / 7.0, 0.25, 2.0 / 7.0, 4.0 / 7.0];
    let frequency = [6.0 / 17.0, 1.0 / 17.0, 5.0 / 17.0, 5.0 / 17.0];
    for c in 0..4 {
        assert_abs_diff_eq!(classes.jaccard[c], jaccard[c], epsilon = 1e-12);
        assert_abs_diff_eq!(classes.frequency[c], frequency[c], epsilon = 1e-12);
    }
    assert_eq!(classes.nb_classes(), 4);
}

#[test]
fn evaluate_worked_scenario_accuracy_layout() {
    let (gt, prediction) = worked_scenario();
    let result = evaluate(&gt, &prediction, &EvaluationConfig::new(4)).unwrap();
    let extended = result.scores_with_accuracy();

    assert_abs_diff_eq!(extended[4], 11.0 / 17.0, epsilon = 1e-12);
    assert_eq!(&extended[..4], &result.scores()[..4]);
    assert_eq!(&extended[5..], &result.scores()[4..]);
}

#[test]
fn evaluate_worked_scenario_f1_formulas_agree() {
    let (gt, prediction) = worked_scenario();
    let harmonic = evaluate(&gt, &prediction, &EvaluationConfig::new(4)).unwrap();
    let counts = evaluate(
        &gt,
        &prediction,
        &EvaluationConfig::new(4).with_f1_formula(F1Formula::MatrixCounts),
    )
    .unwrap();

    assert_abs_diff_eq!(harmonic.mean_f1, counts.mean_f1, epsilon = 1e-12);
    assert_abs_diff_eq!(harmonic.weighted_f1, counts.weighted_f1, epsilon = 1e-12);
}

#[test]
fn evaluate_prediction_equal_to_ground_truth_scores_one() {
    let gt = worked_ground_truth();
    let result = evaluate(&gt, &gt, &EvaluationConfig::default()).unwrap();
    for value in result.scores() {
        assert_abs_diff_eq!(value, 1.0, epsilon = 1e-12);
    }
}

#[test]
fn evaluate_unlabeled_ground_truth_returns_error() {
    let gt = LabelImage::column(vec![0x0, 0x10]).unwrap();
    assert_eq!(
        evaluate(&gt, &gt, &EvaluationConfig::new(4)).unwrap_err(),
        EvaluationError::NoGroundTruthLabels { nb_classes: 4 }
    );
}

#[test]
fn evaluate_empty_image_returns_error() {
    let empty = LabelImage::column(Vec::new()).unwrap();
    assert_eq!(
        evaluate(&empty, &empty, &EvaluationConfig::new(4)).unwrap_err(),
        EvaluationError::EmptyImage
    );
}

#[test]
fn evaluate_respects_class_count() {
    // bit 3 is invisible with three classes
    let gt = LabelImage::column(vec![0x1, 0x8]).unwrap();
    let prediction = LabelImage::column(vec![0x1, 0x0]).unwrap();
    let result = evaluate(&gt, &prediction, &EvaluationConfig::new(3)).unwrap();
    assert_eq!(result.exact_match, 1.0);
    assert_eq!(result.classes.nb_classes(), 3);
}

fn label_pixels(len: usize) -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(0u32..0x10, len).prop_flat_map(|labels| {
        let n = labels.len();
        (Just(labels), prop::collection::vec(any::<bool>(), n)).prop_map(|(labels, flags)| {
            labels
                .into_iter()
                .zip(flags)
                .map(|(l, b)| if b { l | BOUNDARY_MASK } else { l })
                .collect()
        })
    })
}

fn image_pair() -> impl Strategy<Value = (LabelImage, LabelImage)> {
    (1u32..8, 1u32..8).prop_flat_map(|(w, h)| {
        let n = (w * h) as usize;
        (label_pixels(n), prop::collection::vec(0u32..0x10, n)).prop_map(move |(g, p)| {
            (
                LabelImage::new(w, h, g).unwrap(),
                LabelImage::new(w, h, p).unwrap(),
            )
        })
    })
}

/// Images whose boundary pixels carry at least one label.
fn labeled_image() -> impl Strategy<Value = LabelImage> {
    image_pair().prop_map(|(gt, _)| {
        let pixels = gt
            .pixels()
            .iter()
            .map(|&v| if v & BOUNDARY_MASK != 0 && v & 0xF == 0 { v | 0x1 } else { v })
            .collect();
        LabelImage::new(gt.width(), gt.height(), pixels).unwrap()
    })
}

proptest! {
    #[test]
    fn accumulate_counts_each_pixel_once_per_class((gt, prediction) in image_pair()) {
        let acc = accumulate(&gt, &prediction, 4).unwrap();
        for class in acc.matrix().classes() {
            prop_assert_eq!(class.total(), gt.pixel_count() as u64);
        }
        prop_assert!(acc.exact_matches() <= acc.pixel_count());
        let hs = acc.hamming_score();
        prop_assert!((0.0..=1.0).contains(&hs));
    }

    #[test]
    fn frequencies_sum_to_one_when_defined((gt, prediction) in image_pair()) {
        match evaluate(&gt, &prediction, &EvaluationConfig::new(4)) {
            Ok(result) => {
                let sum: f64 = result.classes.frequency.iter().sum();
                prop_assert!((sum - 1.0).abs() < 1e-9);
            }
            Err(err) => prop_assert_eq!(err, EvaluationError::NoGroundTruthLabels { nb_classes: 4 }),
        }
    }

    #[test]
    fn evaluating_image_against_itself_scores_one(gt in labeled_image()) {
        match evaluate(&gt, &gt, &EvaluationConfig::new(4)) {
            Ok(result) => {
                prop_assert_eq!(result.exact_match, 1.0);
                prop_assert_eq!(result.hamming_score, 1.0);
                let classes = &result.classes;
                for value in classes
                    .jaccard
                    .iter()
                    .chain(&classes.precision)
                    .chain(&classes.recall)
                    .chain(&classes.f1)
                    .filter(|v| !v.is_nan())
                {
                    prop_assert_eq!(*value, 1.0);
                }
            }
            Err(err) => prop_assert_eq!(err, EvaluationError::NoGroundTruthLabels { nb_classes: 4 }),
        }
    }

    #[test]
    fn boundary_flag_never_removes_true_positives((gt, prediction) in image_pair()) {
        let plain = LabelImage::new(
            gt.width(),
            gt.height(),
            gt.pixels().iter().map(|v| v & !BOUNDARY_MASK).collect(),
        ).unwrap();
        let flagged = LabelImage::new(
            gt.width(),
            gt.height(),
            gt.pixels().iter().map(|v| v | BOUNDARY_MASK).collect(),
        ).unwrap();

        let without = accumulate(&plain, &prediction, 4).unwrap();
        let with = accumulate(&flagged, &prediction, 4).unwrap();
        for (a, b) in without.matrix().classes().iter().zip(with.matrix().classes()) {
            prop_assert!(b.true_positives >= a.true_positives);
        }
    }

    #[test]
    fn boundary_flag_never_worsens_sharing_pixel(gt in 0u32..0x10, prediction in 1u32..0x10) {
        // background counts as shared once the flag forces it into the ground truth
        prop_assume!((gt | 0x1) & prediction != 0);
        let mut plain = Accumulation::new(4);
        plain.record(gt, prediction);
        let mut flagged = Accumulation::new(4);
        flagged.record(gt | BOUNDARY_MASK, prediction);

        prop_assert!(flagged.mismatched_labels() <= plain.mismatched_labels());
        prop_assert!(flagged.exact_matches() >= plain.exact_matches());
    }

    #[test]
    fn visualization_uses_palette_only((gt, prediction) in image_pair()) {
        let raster = visualize(&gt, &prediction, 4).unwrap();
        prop_assert_eq!(raster.dimensions(), gt.dimensions());
        for pixel in raster.pixels() {
            prop_assert!(Outcome::from_color(*pixel).is_some());
        }
    }

    #[test]
    fn merge_is_order_independent(
        (a_gt, a_p) in image_pair(),
        (b_gt, b_p) in image_pair(),
        (c_gt, c_p) in image_pair(),
    ) {
        let a = accumulate(&a_gt, &a_p, 4).unwrap();
        let b = accumulate(&b_gt, &b_p, 4).unwrap();
        let c = accumulate(&c_gt, &c_p, 4).unwrap();

        let mut ab_c = a.clone();
        ab_c.merge(&b).unwrap();
        ab_c.merge(&c).unwrap();

        let mut bc = b.clone();
        bc.merge(&c).unwrap();
        let mut a_bc = a.clone();
        a_bc.merge(&bc).unwrap();

        let mut c_b_a = c.clone();
        c_b_a.merge(&b).unwrap();
        c_b_a.merge(&a).unwrap();

        prop_assert_eq!(&ab_c, &a_bc);
        prop_assert_eq!(&ab_c, &c_b_a);

        let mut identity = Accumulation::new(4);
        identity.merge(&a).unwrap();
        prop_assert_eq!(identity, a);
    }
}
