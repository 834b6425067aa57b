use ndarray::Array2;
use thiserror::Error;

use crate::types::{CLASS_COUNT, DecisionMatrix, ProbabilityMatrix};

/// Per-class decision thresholds, indexed by `Label` order.
pub const DEFAULT_THRESHOLDS: [f32; CLASS_COUNT] = [0.5; CLASS_COUNT];

#[derive(Debug, Error)]
pub enum ThresholdError {
    #[error("Probability matrix has {got} classes; thresholds cover {expected}")]
    ClassCountMismatch { got: usize, expected: usize },
}

/// Per-frame, per-class boolean decisions.
///
/// The comparison is closed: a probability exactly at its class threshold
/// counts as a detection. NaN probabilities never do.
pub fn apply_threshold(
    probabilities: &ProbabilityMatrix,
    thresholds: &[f32; CLASS_COUNT],
) -> Result<DecisionMatrix, ThresholdError> {
    if probabilities.ncols() != thresholds.len() {
        return Err(ThresholdError::ClassCountMismatch {
            got: probabilities.ncols(),
            expected: thresholds.len(),
        });
    }
    let mut out = Array2::from_elem(probabilities.dim(), false);
    for (mut dst, src) in out.rows_mut().into_iter().zip(probabilities.rows()) {
        for ((slot, &p), &threshold) in dst.iter_mut().zip(src.iter()).zip(thresholds.iter()) {
            *slot = p >= threshold;
        }
    }
    Ok(out)
}
