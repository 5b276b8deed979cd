//! Dynamic time warping over feature-vector sequences
//!
//! Two-row dynamic program computing the minimum cumulative alignment
//! cost between two sequences of equal-width coefficient vectors. The
//! raw path cost is normalized by sequence length so scores stay
//! comparable across call durations.

use crate::error::EngineError;

/// Seam for substituting alternate alignment algorithms
pub trait Comparator: Send + Sync {
    /// Alignment distance between two non-empty sequences; lower is
    /// more similar.
    fn distance(&self, a: &[Vec<f32>], b: &[Vec<f32>]) -> Result<f32, EngineError>;
}

/// Default comparator: DTW with squared-Euclidean frame cost
#[derive(Debug, Default)]
pub struct DtwComparator;

impl Comparator for DtwComparator {
    fn distance(&self, a: &[Vec<f32>], b: &[Vec<f32>]) -> Result<f32, EngineError> {
        dtw_distance(a, b)
    }
}

/// Squared Euclidean distance between two equal-width vectors
fn frame_cost(v1: &[f32], v2: &[f32]) -> f32 {
    v1.iter()
        .zip(v2)
        .map(|(&x, &y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Normalized DTW distance between two feature sequences.
///
/// Allows diagonal, horizontal, and vertical steps; returns
/// sqrt(total path cost) / sqrt(n * m).
pub fn dtw_distance(a: &[Vec<f32>], b: &[Vec<f32>]) -> Result<f32, EngineError> {
    if a.is_empty() || b.is_empty() {
        return Err(EngineError::InsufficientData);
    }

    let width = a[0].len();
    if a.iter().chain(b.iter()).any(|v| v.len() != width) {
        return Err(EngineError::ProcessingError(
            "feature sequences have mismatched coefficient widths".into(),
        ));
    }

    let n = a.len();
    let m = b.len();

    // Only two rows of the cost matrix are live at a time.
    let mut prev = vec![f32::INFINITY; m + 1];
    let mut curr = vec![f32::INFINITY; m + 1];
    prev[0] = 0.0;

    for i in 1..=n {
        curr[0] = f32::INFINITY;
        for j in 1..=m {
            let cost = frame_cost(&a[i - 1], &b[j - 1]);
            let min_prev = prev[j].min(prev[j - 1]).min(curr[j - 1]);
            curr[j] = cost + min_prev;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let total = prev[m].sqrt();
    Ok(total / ((n * m) as f32).sqrt())
}

/// Map an alignment distance to a similarity score in (0, 1]
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}
