use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use layout_eval_metric::{
    accumulate, overlap, visualize, Accumulation, EvaluationResult, LabelImage,
};
use layout_eval_util::{collect_image_pairs, load_label_image, load_original, save_png};

use crate::{
    config::EvaluatorConfig,
    output::DivaOutput,
    paths::{output_base, overlap_path, visualization_path},
};

/// Inputs of a single ground-truth/prediction evaluation.
#[derive(Debug, Clone)]
pub struct EvaluateRequest {
    pub ground_truth: PathBuf,
    pub prediction: PathBuf,
    /// Original page to overlay the visualization onto.
    pub original: Option<PathBuf>,
    /// DIVAServices JSON output file.
    pub json: Option<PathBuf>,
}

/// Inputs of a dataset evaluation.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub gt_dir: PathBuf,
    pub prediction_dir: PathBuf,
    pub json: Option<PathBuf>,
}

fn load_pair(ground_truth: &Path, prediction: &Path) -> Result<(LabelImage, LabelImage)> {
    let gt = load_label_image(ground_truth)?;
    let prediction = load_label_image(prediction)?;
    Ok((gt, prediction))
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Writes the visualization, and the overlap when an original is given.
fn write_artifacts(
    gt: &LabelImage,
    prediction: &LabelImage,
    prediction_path: &Path,
    original: Option<&Path>,
    config: &EvaluatorConfig,
) -> Result<()> {
    let base = output_base(prediction_path, config.output_path.as_deref());
    let raster = visualize(gt, prediction, config.nb_classes)?;

    let visualization_file = visualization_path(&base);
    ensure_parent(&visualization_file)?;
    save_png(raster.clone(), &visualization_file)?;
    tracing::info!(path = %visualization_file.display(), "saved visualization");
    println!("Visualization image written in: {}", visualization_file.display());

    if let Some(original) = original {
        let composite = overlap(&raster, &load_original(original)?)?;
        let overlap_file = overlap_path(&base);
        save_png(composite, &overlap_file)?;
        tracing::info!(path = %overlap_file.display(), "saved overlap");
        println!("Overlap image written in: {}", overlap_file.display());
    }
    Ok(())
}

/// Evaluates one prediction and prints the competition line and report.
///
/// # Errors
///
/// Returns an error if an image cannot be read, the images cannot be
/// evaluated together, or an output file cannot be written.
pub fn run_evaluate(request: &EvaluateRequest, config: &EvaluatorConfig) -> Result<EvaluationResult> {
    tracing::info!(
        ground_truth = %request.ground_truth.display(),
        prediction = %request.prediction.display(),
        classes = config.nb_classes,
        "evaluating prediction"
    );

    let (gt, prediction) = load_pair(&request.ground_truth, &request.prediction)?;
    let result = layout_eval_metric::evaluate(&gt, &prediction, &config.evaluation())
        .with_context(|| format!("failed to evaluate '{}'", request.prediction.display()))?;

    println!("{}", result.headline());
    println!("{result}");

    if config.visualize {
        write_artifacts(
            &gt,
            &prediction,
            &request.prediction,
            request.original.as_deref(),
            config,
        )?;
    } else if request.original.is_some() {
        tracing::warn!("overlap requested with visualization disabled, skipping");
    }

    if let Some(json) = &request.json {
        DivaOutput::from_result(&result, config.include_accuracy).write(json)?;
    }

    tracing::info!(mean_jaccard = result.mean_jaccard, "evaluation completed");
    Ok(result)
}

/// Evaluates one pair of a batch and returns its accumulation.
///
/// The accumulation is returned even when the pair cannot be scored on its
/// own, so its pixels still count towards the dataset result.
fn evaluate_batch_pair(
    ground_truth: &Path,
    prediction_path: &Path,
    config: &EvaluatorConfig,
) -> Result<Accumulation> {
    let (gt, prediction) = load_pair(ground_truth, prediction_path)?;
    let accumulation = accumulate(&gt, &prediction, config.nb_classes)?;

    let name = prediction_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("prediction");
    match EvaluationResult::from_accumulation(accumulation.clone(), config.f1_formula.into()) {
        Ok(result) => println!("{name}: {}", result.headline()),
        Err(e) => tracing::warn!(
            path = %prediction_path.display(),
            error = %e,
            "pair has no score of its own, merging its pixels anyway"
        ),
    }

    if config.visualize {
        write_artifacts(&gt, &prediction, prediction_path, None, config)?;
    }
    Ok(accumulation)
}

/// Evaluates every stem-matched pair of two directories.
///
/// Pairs that cannot be read or accumulated are logged and left out. Every
/// other pair is merged into the dataset result, including pairs without a
/// score of their own, so every pixel weighs the same.
///
/// # Errors
///
/// Returns an error if the directories cannot be paired, no pair could be
/// evaluated, or the JSON output cannot be written.
pub fn run_batch(request: &BatchRequest, config: &EvaluatorConfig) -> Result<EvaluationResult> {
    let pairs = collect_image_pairs(&request.gt_dir, &request.prediction_dir)?;
    let total = pairs.len();
    let mut dataset = Accumulation::new(config.nb_classes);
    let mut evaluated = 0usize;

    for (index, pair) in pairs.iter().enumerate() {
        tracing::info!(
            ground_truth = %pair.ground_truth.display(),
            prediction = %pair.prediction.display(),
            index = index + 1,
            total,
            "evaluating pair"
        );
        match evaluate_batch_pair(&pair.ground_truth, &pair.prediction, config) {
            Ok(accumulation) => {
                dataset.merge(&accumulation)?;
                evaluated += 1;
            }
            Err(e) => {
                tracing::error!(
                    path = %pair.prediction.display(),
                    error = %e,
                    "failed to evaluate pair"
                );
            }
        }
    }

    if evaluated == 0 {
        anyhow::bail!(
            "none of the {total} pairs in '{}' could be evaluated",
            request.gt_dir.display()
        );
    }

    let result = EvaluationResult::from_accumulation(dataset, config.f1_formula.into())?;
    println!("{}", result.headline());
    println!("{result}");

    if let Some(json) = &request.json {
        DivaOutput::from_result(&result, config.include_accuracy).write(json)?;
    }

    tracing::info!(
        evaluated,
        skipped = total - evaluated,
        mean_jaccard = result.mean_jaccard,
        "batch evaluation completed"
    );
    Ok(result)
}
