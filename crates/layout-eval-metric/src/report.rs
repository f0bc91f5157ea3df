//! Compact human-readable rendering of evaluation results.

use std::fmt::{self, Display, Formatter};

use crate::scores::EvaluationResult;

/// `|`-separated per-class values.
struct PerClass<'a>(&'a [f64]);

impl Display for PerClass<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{value:.2}")?;
        }
        Ok(())
    }
}

impl EvaluationResult {
    /// The line used to rank submissions, e.g. `Mean IU (Jaccard index) = 0.41964`.
    pub fn headline(&self) -> String {
        format!("Mean IU (Jaccard index) = {:.5}", self.mean_jaccard)
    }
}

/// `EM=0.30 HS=0.65 IU=0.42,0.47[0.57|0.25|0.29|0.57] F1=... P=... R=... Freq:[...]`
///
/// Each metric group shows the unweighted and the frequency-weighted mean,
/// followed by the per-class values in class order.
impl Display for EvaluationResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let classes = &self.classes;
        write!(f, "EM={:.2}", self.exact_match)?;
        write!(f, " HS={:.2}", self.hamming_score)?;
        write!(
            f,
            " IU={:.2},{:.2}[{}]",
            self.mean_jaccard,
            self.weighted_jaccard,
            PerClass(&classes.jaccard)
        )?;
        write!(
            f,
            " F1={:.2},{:.2}[{}]",
            self.mean_f1,
            self.weighted_f1,
            PerClass(&classes.f1)
        )?;
        write!(
            f,
            " P={:.2},{:.2}[{}]",
            self.mean_precision,
            self.weighted_precision,
            PerClass(&classes.precision)
        )?;
        write!(
            f,
            " R={:.2},{:.2}[{}]",
            self.mean_recall,
            self.weighted_recall,
            PerClass(&classes.recall)
        )?;
        write!(f, " Freq:[{}]", PerClass(&classes.frequency))
    }
}
