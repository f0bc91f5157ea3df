//! Training-loop adapter reporting the running mean Jaccard index.
//!
//! Each update converts the batch into label images and merges their
//! accumulations into a running total, so the reported value is the
//! dataset-level score over every pixel seen since the last `clear`.

use core::marker::PhantomData;

use burn::{
    prelude::*,
    tensor::backend::Backend,
    train::metric::{
        state::{FormatOptions, NumericMetricState},
        Metric, MetricEntry, MetricMetadata, Numeric,
    },
};

use crate::{
    codec::DEFAULT_CLASS_COUNT,
    confusion::{accumulate, Accumulation},
    error::{EvaluationError, MetricResult},
    label_image::LabelImage,
    scores::{EvaluationResult, F1Formula},
};

/// Layout metric input.
#[derive(Debug, Clone)]
pub struct LayoutInput<B: Backend> {
    /// Packed prediction pixels with shape `[batch_size, height, width]`.
    pub predictions: Tensor<B, 3, Int>,
    /// Packed ground-truth pixels with shape `[batch_size, height, width]`.
    pub targets: Tensor<B, 3, Int>,
}

impl<B: Backend> LayoutInput<B> {
    pub const fn new(predictions: Tensor<B, 3, Int>, targets: Tensor<B, 3, Int>) -> Self {
        Self {
            predictions,
            targets,
        }
    }
}

/// Configuration for the layout Jaccard metric.
#[derive(Config, Debug)]
pub struct LayoutJaccardMetricConfig {
    /// Number of class bits read from each pixel.
    #[config(default = 4)]
    pub nb_classes: usize,
}

/// Running mean Jaccard index over packed label tensors.
pub struct LayoutJaccardMetric<B: Backend> {
    state: NumericMetricState,
    accumulation: Accumulation,
    _b: PhantomData<B>,
}

impl LayoutJaccardMetricConfig {
    pub fn init<B: Backend>(&self) -> LayoutJaccardMetric<B> {
        LayoutJaccardMetric {
            state: NumericMetricState::default(),
            accumulation: Accumulation::new(self.nb_classes),
            _b: PhantomData,
        }
    }
}

impl<B: Backend> Default for LayoutJaccardMetric<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> LayoutJaccardMetric<B> {
    /// Creates the metric for the four competition classes.
    pub fn new() -> Self {
        LayoutJaccardMetricConfig::new()
            .with_nb_classes(DEFAULT_CLASS_COUNT)
            .init()
    }

    /// The running accumulation since the last clear.
    pub const fn accumulation(&self) -> &Accumulation {
        &self.accumulation
    }

    /// Merges one batch into the running accumulation.
    ///
    /// # Errors
    ///
    /// Fails when a batch item cannot be accumulated, e.g. on a shape
    /// mismatch between predictions and targets. The running accumulation
    /// is left untouched in that case.
    pub fn record(&mut self, item: &LayoutInput<B>) -> MetricResult<()> {
        let [gt_batch, gt_height, gt_width] = item.targets.dims();
        let [batch, height, width] = item.predictions.dims();
        if (gt_batch, gt_height, gt_width) != (batch, height, width) {
            return Err(EvaluationError::DimensionMismatch {
                gt_width: gt_width as u32,
                gt_height: (gt_batch * gt_height) as u32,
                prediction_width: width as u32,
                prediction_height: (batch * height) as u32,
            });
        }

        let nb_classes = self.accumulation.nb_classes();
        let targets = to_label_images(item.targets.clone())?;
        let predictions = to_label_images(item.predictions.clone())?;

        let mut batch = Accumulation::new(nb_classes);
        for (target, prediction) in targets.iter().zip(&predictions) {
            batch.merge(&accumulate(target, prediction, nb_classes)?)?;
        }

        self.accumulation.merge(&batch)?;
        tracing::debug!(
            batch = targets.len(),
            pixels = self.accumulation.pixel_count(),
            "merged layout metric batch"
        );
        Ok(())
    }

    /// Records `item` and folds the new mean into the running state.
    ///
    /// A rejected batch leaves the running state untouched.
    fn update_running(&mut self, item: &LayoutInput<B>) -> MetricEntry {
        if let Err(err) = self.record(item) {
            tracing::warn!(error = %err, "skipping layout metric batch");
            let current = Numeric::value(&self.state);
            return MetricEntry::new(
                self.name(),
                format!("batch skipped: {err}"),
                current.to_string(),
            );
        }

        let [batch_size, ..] = item.targets.dims();
        let value = self.mean_jaccard();
        self.state.update(
            value,
            batch_size,
            FormatOptions::new(self.name()).precision(5),
        )
    }

    /// Dataset-level mean Jaccard index, NaN before any labeled pixel was seen.
    pub fn mean_jaccard(&self) -> f64 {
        EvaluationResult::from_accumulation(self.accumulation.clone(), F1Formula::default())
            .map_or(f64::NAN, |result| result.mean_jaccard)
    }
}

impl<B: Backend> Metric for LayoutJaccardMetric<B> {
    type Input = LayoutInput<B>;

    fn name(&self) -> String {
        "Layout IU".to_owned()
    }

    fn update(&mut self, item: &Self::Input, _metadata: &MetricMetadata) -> MetricEntry {
        self.update_running(item)
    }

    fn clear(&mut self) {
        self.state.reset();
        self.accumulation = Accumulation::new(self.accumulation.nb_classes());
    }
}

impl<B: Backend> Numeric for LayoutJaccardMetric<B> {
    fn value(&self) -> f64 {
        self.mean_jaccard()
    }
}

/// Splits a `[batch_size, height, width]` tensor into label images.
fn to_label_images<B: Backend>(tensor: Tensor<B, 3, Int>) -> MetricResult<Vec<LabelImage>> {
    let [batch_size, height, width] = tensor.dims();
    let values: Vec<u32> = tensor.into_data().iter::<i64>().map(|v| v as u32).collect();
    let item_len = (height * width).max(1);

    values
        .chunks(item_len)
        .take(batch_size)
        .map(|item| LabelImage::new(width as u32, height as u32, item.to_vec()))
        .collect()
}

#[cfg(all(test, feature = "ndarray"))]
mod tests {
    use approx::assert_abs_diff_eq;
    use burn::{backend::NdArray, tensor::TensorData};

    use super::*;
    use crate::tests::{worked_ground_truth, worked_prediction};

    type B = NdArray;

    fn column_tensor(image: &LabelImage) -> Tensor<B, 3, Int> {
        let values: Vec<i64> = image.pixels().iter().map(|&v| i64::from(v)).collect();
        let shape = [1, image.height() as usize, image.width() as usize];
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    fn worked_input() -> LayoutInput<B> {
        LayoutInput::new(
            column_tensor(&worked_prediction()),
            column_tensor(&worked_ground_truth()),
        )
    }

    #[test]
    fn record_worked_scenario_matches_direct_evaluation() {
        let mut metric = LayoutJaccardMetric::<B>::new();
        metric.record(&worked_input()).unwrap();

        assert_eq!(metric.accumulation().pixel_count(), 10);
        assert_abs_diff_eq!(metric.value(), 0.419_642_857, epsilon = 1e-6);
    }

    #[test]
    fn record_repeated_batch_keeps_mean_jaccard() {
        let mut metric = LayoutJaccardMetric::<B>::new();
        metric.record(&worked_input()).unwrap();
        let single = metric.value();
        metric.record(&worked_input()).unwrap();

        assert_eq!(metric.accumulation().pixel_count(), 20);
        assert_abs_diff_eq!(metric.value(), single, epsilon = 1e-12);
    }

    #[test]
    fn clear_resets_running_accumulation() {
        let mut metric = LayoutJaccardMetric::<B>::new();
        metric.record(&worked_input()).unwrap();
        metric.clear();

        assert_eq!(metric.accumulation().pixel_count(), 0);
        assert!(metric.value().is_nan());
    }

    /// Parses the running and batch values of an `epoch X - batch Y` entry.
    fn running_and_batch(entry: &MetricEntry) -> (f64, f64) {
        let words: Vec<&str> = entry.formatted.split_whitespace().collect();
        (words[1].parse().unwrap(), words[4].parse().unwrap())
    }

    #[test]
    fn rejected_batch_leaves_running_average_unchanged() {
        let mut metric = LayoutJaccardMetric::<B>::new();
        let (first, _) = running_and_batch(&metric.update_running(&worked_input()));

        let truncated = LabelImage::column(worked_prediction().pixels()[..9].to_vec()).unwrap();
        let rejected = LayoutInput::new(
            column_tensor(&truncated),
            column_tensor(&worked_ground_truth()),
        );
        let skipped = metric.update_running(&rejected);
        assert!(skipped.formatted.starts_with("batch skipped"));
        assert_eq!(metric.accumulation().pixel_count(), 10);

        let identity = LayoutInput::new(
            column_tensor(&worked_ground_truth()),
            column_tensor(&worked_ground_truth()),
        );
        let (running, second) = running_and_batch(&metric.update_running(&identity));
        assert!(second > first);
        assert_abs_diff_eq!(running, (first + second) / 2.0, epsilon = 2e-5);
    }

    #[test]
    fn config_sets_class_count() {
        let metric = LayoutJaccardMetricConfig::new()
            .with_nb_classes(3)
            .init::<B>();
        assert_eq!(metric.accumulation().nb_classes(), 3);
    }
}
