//! DIVAServices JSON result output.
//!
//! ```json
//! {"output":[{"number":{"name":"exactmatch","value":0.3,"mime-type":"text/plain"}}, ...]}
//! ```

use std::{fs, path::Path};

use anyhow::{Context, Result};
use layout_eval_metric::{EvaluationResult, Score};
use serde::{Deserialize, Serialize};

const MIME_TYPE: &str = "text/plain";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivaNumber {
    pub name: String,
    /// `None` for undefined scores, serialized as `null`.
    pub value: Option<f64>,
    #[serde(rename = "mime-type")]
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivaEntry {
    pub number: DivaNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivaOutput {
    pub output: Vec<DivaEntry>,
}

impl DivaOutput {
    /// Scores in competition order, with accuracy at index 4 when requested.
    pub fn from_result(result: &EvaluationResult, include_accuracy: bool) -> Self {
        let scores: &[Score] = if include_accuracy {
            &Score::WITH_ACCURACY
        } else {
            &Score::COMPETITION
        };
        let output = scores
            .iter()
            .map(|&score| {
                let value = result.get(score);
                DivaEntry {
                    number: DivaNumber {
                        name: score.key().to_owned(),
                        value: value.is_finite().then_some(value),
                        mime_type: MIME_TYPE.to_owned(),
                    },
                }
            })
            .collect();
        Self { output }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize results")
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        fs::write(path, self.to_json()?)
            .with_context(|| format!("failed to write results to '{}'", path.display()))?;
        tracing::info!(path = %path.display(), "saved json results");
        Ok(())
    }
}
