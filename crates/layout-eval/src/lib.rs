//! Pixel-level evaluator for multi-label document layout analysis.
//!
//! This crate ties the metric core to the file system: it loads ground-truth
//! and prediction images, prints the competition scores, writes the
//! visualization and overlap artifacts, and exports DIVAServices JSON.

pub mod config;
pub mod evaluation;
pub mod output;
pub mod paths;

#[doc(inline)]
pub use layout_eval_metric as metric;
#[doc(inline)]
pub use layout_eval_util as util;

pub use config::{EvaluatorConfig, F1FormulaSetting};
pub use evaluation::{run_batch, run_evaluate, BatchRequest, EvaluateRequest};
pub use output::DivaOutput;
