use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use layout_eval::{
    run_batch, run_evaluate, BatchRequest, EvaluateRequest, EvaluatorConfig, F1FormulaSetting,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "layout-eval")]
#[command(about = "Pixel-level evaluation of multi-label document layout analysis predictions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Flags shared by both subcommands, applied over the config file.
#[derive(Args)]
struct Overrides {
    /// JSON evaluator configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of class bits read from each pixel
    #[arg(long)]
    classes: Option<usize>,

    /// Formula used for the per-class F1-score
    #[arg(long, value_enum)]
    f1_formula: Option<F1FormulaSetting>,

    /// Do not write visualization images
    #[arg(long)]
    disable_visualization: bool,

    /// Output directory, absolute or relative to the prediction's directory
    #[arg(long)]
    output_path: Option<PathBuf>,

    /// Insert accuracy into the JSON output
    #[arg(long)]
    accuracy: bool,

    /// DIVAServices JSON output file
    #[arg(short, long)]
    json: Option<PathBuf>,
}

impl Overrides {
    fn resolve(&self) -> Result<EvaluatorConfig> {
        let mut config = EvaluatorConfig::load_or_default(self.config.as_deref())?;
        if let Some(classes) = self.classes {
            config.nb_classes = classes;
        }
        if let Some(f1_formula) = self.f1_formula {
            config.f1_formula = f1_formula;
        }
        if self.disable_visualization {
            config.visualize = false;
        }
        if self.accuracy {
            config.include_accuracy = true;
        }
        if let Some(output_path) = &self.output_path {
            config.output_path = Some(output_path.clone());
        }
        Ok(config)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single prediction against its ground truth
    Evaluate {
        /// Ground-truth image file
        #[arg(short, long)]
        gt: PathBuf,

        /// Prediction image file
        #[arg(short, long)]
        prediction: PathBuf,

        /// Original page image to overlay the visualization onto
        #[arg(short, long)]
        overlap: Option<PathBuf>,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Evaluate every prediction of a directory against the ground truths of another
    Batch {
        /// Ground-truth directory
        #[arg(long)]
        gt_dir: PathBuf,

        /// Prediction directory, files matched by stem
        #[arg(long)]
        prediction_dir: PathBuf,

        #[command(flatten)]
        overrides: Overrides,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Evaluate {
            gt,
            prediction,
            overlap,
            overrides,
        } => {
            let config = overrides.resolve()?;
            let request = EvaluateRequest {
                ground_truth: gt,
                prediction,
                original: overlap,
                json: overrides.json,
            };
            run_evaluate(&request, &config)?;
            Ok(())
        }

        Commands::Batch {
            gt_dir,
            prediction_dir,
            overrides,
        } => {
            let config = overrides.resolve()?;
            let request = BatchRequest {
                gt_dir,
                prediction_dir,
                json: overrides.json,
            };
            run_batch(&request, &config)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn evaluate_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "layout-eval",
            "evaluate",
            "--gt",
            "gt.png",
            "--prediction",
            "pred.png",
            "--classes",
            "3",
            "--f1-formula",
            "matrix-counts",
            "--disable-visualization",
            "--accuracy",
        ])
        .unwrap();

        let Commands::Evaluate { overrides, .. } = cli.command else {
            panic!("expected evaluate subcommand");
        };
        let config = overrides.resolve().unwrap();
        assert_eq!(config.nb_classes, 3);
        assert_eq!(config.f1_formula, F1FormulaSetting::MatrixCounts);
        assert!(!config.visualize);
        assert!(config.include_accuracy);
    }

    #[test]
    fn batch_requires_both_directories() {
        assert!(Cli::try_parse_from(["layout-eval", "batch", "--gt-dir", "gt"]).is_err());
    }
}
