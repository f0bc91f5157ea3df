use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::ValueEnum;
use layout_eval_metric::{EvaluationConfig, F1Formula, DEFAULT_CLASS_COUNT};
use serde::{Deserialize, Serialize};

/// F1 formula selectable from the command line and configuration files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum F1FormulaSetting {
    #[default]
    HarmonicMean,
    MatrixCounts,
}

impl From<F1FormulaSetting> for F1Formula {
    fn from(setting: F1FormulaSetting) -> Self {
        match setting {
            F1FormulaSetting::HarmonicMean => Self::HarmonicMean,
            F1FormulaSetting::MatrixCounts => Self::MatrixCounts,
        }
    }
}

/// Evaluator settings, loaded from JSON and overridden by command-line flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Number of class bits read from each pixel.
    pub nb_classes: usize,
    pub f1_formula: F1FormulaSetting,
    /// Write the visualization (and overlap) images.
    pub visualize: bool,
    /// Insert accuracy at index 4 of the JSON output.
    pub include_accuracy: bool,
    /// Artifact directory, absolute or relative to the prediction's directory.
    pub output_path: Option<PathBuf>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            nb_classes: DEFAULT_CLASS_COUNT,
            f1_formula: F1FormulaSetting::default(),
            visualize: true,
            include_accuracy: false,
            output_path: None,
        }
    }
}

impl EvaluatorConfig {
    /// Loads a JSON configuration file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config '{}'", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config '{}'", path.display()))?;
        tracing::info!(path = %path.display(), "loaded evaluator config");
        Ok(config)
    }

    /// Loads `path` when given, the defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn evaluation(&self) -> EvaluationConfig {
        EvaluationConfig::new(self.nb_classes).with_f1_formula(self.f1_formula.into())
    }
}
