//! Priority vectors and consistency ratios.
//!
//! Weights come from the row geometric means of a comparison matrix,
//! normalized to sum to 1. Consistency follows Saaty: estimate the principal
//! eigenvalue `lambda_max` from `M w`, derive `CI = (lambda_max - n) / (n - 1)`
//! and divide by the random index `RI(n)` to get `CR`.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::AhpError;
use crate::matrix::ComparisonMatrix;

/// Saaty's random consistency index for n = 1..=10.
pub const RANDOM_INDEX: [f64; 10] = [0.0, 0.0, 0.58, 0.9, 1.12, 1.24, 1.32, 1.41, 1.45, 1.49];

/// Largest matrix dimension with a tabulated random index.
pub const MAX_SUPPORTED_DIM: usize = RANDOM_INDEX.len();

/// Conventional upper bound for an acceptable consistency ratio.
pub const DEFAULT_CONSISTENCY_THRESHOLD: f64 = 0.1;

pub fn random_index(n: usize) -> Result<f64, AhpError> {
    if n == 0 || n > MAX_SUPPORTED_DIM {
        return Err(AhpError::UnsupportedSize {
            n,
            max: MAX_SUPPORTED_DIM,
        });
    }
    Ok(RANDOM_INDEX[n - 1])
}

/// Normalized weights, one per item, in the order of the source matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriorityVector(Vec<f64>);

impl PriorityVector {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<f64> {
        self.0.get(idx).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.0
    }
}

/// Consistency ratio of one matrix. NaN when undefined (n <= 2).
///
/// Serialized as `null` when undefined. Comparisons follow `f64`, so two
/// undefined ratios are not equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub struct ConsistencyRatio(f64);

impl ConsistencyRatio {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn undefined() -> Self {
        Self(f64::NAN)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn is_defined(self) -> bool {
        self.0.is_finite()
    }

    pub fn as_option(self) -> Option<f64> {
        self.is_defined().then_some(self.0)
    }

    /// True when the ratio is defined and strictly above `threshold`.
    pub fn exceeds(self, threshold: f64) -> bool {
        self.is_defined() && self.0 > threshold
    }
}

impl From<Option<f64>> for ConsistencyRatio {
    fn from(value: Option<f64>) -> Self {
        value.map_or_else(Self::undefined, Self::new)
    }
}

impl From<ConsistencyRatio> for Option<f64> {
    fn from(cr: ConsistencyRatio) -> Self {
        cr.as_option()
    }
}

/// Full output of [`analyze`].
#[derive(Debug, Clone, Serialize)]
pub struct PriorityAnalysis {
    pub weights: PriorityVector,
    pub lambda_max: f64,
    /// NaN for a 1x1 matrix.
    pub consistency_index: f64,
    pub consistency_ratio: ConsistencyRatio,
}

/// Weights, principal eigenvalue estimate, CI and CR of `matrix`.
pub fn analyze(matrix: &ComparisonMatrix) -> Result<PriorityAnalysis, AhpError> {
    let n = matrix.dim();
    let ri = random_index(n)?;
    let m = matrix.as_dmatrix();
    let n_f = n as f64;

    // Row geometric means in log space.
    let geo = DVector::from_iterator(
        n,
        m.row_iter()
            .map(|row| (row.iter().map(|v| v.ln()).sum::<f64>() / n_f).exp()),
    );
    let weights = &geo / geo.sum();

    let mw = m * &weights;
    let lambda_max = (0..n).map(|i| mw[i] / weights[i]).sum::<f64>() / n_f;

    let consistency_index = if n > 1 {
        (lambda_max - n_f) / (n_f - 1.0)
    } else {
        f64::NAN
    };
    let consistency_ratio = if ri > 0.0 {
        ConsistencyRatio::new(consistency_index / ri)
    } else {
        ConsistencyRatio::undefined()
    };

    Ok(PriorityAnalysis {
        weights: PriorityVector(weights.iter().copied().collect()),
        lambda_max,
        consistency_index,
        consistency_ratio,
    })
}

pub fn compute_weights_and_consistency(
    matrix: &ComparisonMatrix,
) -> Result<(PriorityVector, ConsistencyRatio), AhpError> {
    let analysis = analyze(matrix)?;
    Ok((analysis.weights, analysis.consistency_ratio))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consistent_from_ratios(r: &[f64]) -> ComparisonMatrix {
        let rows: Vec<Vec<f64>> = r
            .iter()
            .map(|ri| r.iter().map(|rj| ri / rj).collect())
            .collect();
        ComparisonMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn random_index_table_bounds() {
        assert_eq!(random_index(1).unwrap(), 0.0);
        assert_eq!(random_index(3).unwrap(), 0.58);
        assert_eq!(random_index(10).unwrap(), 1.49);
        assert_eq!(
            random_index(11).unwrap_err(),
            AhpError::UnsupportedSize { n: 11, max: 10 }
        );
    }

    #[test]
    fn consistent_matrix_recovers_ratios_with_zero_cr() {
        let m = consistent_from_ratios(&[6.0, 3.0, 2.0, 1.0]);
        let a = analyze(&m).unwrap();

        let expected = [0.5, 0.25, 1.0 / 6.0, 1.0 / 12.0];
        for (w, e) in a.weights.iter().zip(expected) {
            assert!((w - e).abs() < 1e-12, "{w} vs {e}");
        }
        assert!((a.lambda_max - 4.0).abs() < 1e-12);
        assert!(a.consistency_ratio.is_defined());
        assert!(a.consistency_ratio.value().abs() < 1e-12);
    }

    #[test]
    fn inconsistent_matrix_has_positive_cr() {
        // a > b, b > c, but c > a
        let m = ComparisonMatrix::from_rows(&[
            vec![1.0, 3.0, 1.0 / 3.0],
            vec![1.0 / 3.0, 1.0, 3.0],
            vec![3.0, 1.0 / 3.0, 1.0],
        ])
        .unwrap();
        let a = analyze(&m).unwrap();
        assert!(a.lambda_max > 3.0);
        assert!(a.consistency_ratio.exceeds(DEFAULT_CONSISTENCY_THRESHOLD));
        // cyclic judgments are symmetric, so weights are uniform
        for w in a.weights.iter() {
            assert!((w - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn two_by_two_cr_is_undefined() {
        let m = ComparisonMatrix::from_rows(&[vec![1.0, 3.0], vec![1.0 / 3.0, 1.0]]).unwrap();
        let (w, cr) = compute_weights_and_consistency(&m).unwrap();
        assert!((w.get(0).unwrap() - 0.75).abs() < 1e-12);
        assert!((w.get(1).unwrap() - 0.25).abs() < 1e-12);
        assert!(!cr.is_defined());
        assert!(cr.value().is_nan());
        assert!(!cr.exceeds(DEFAULT_CONSISTENCY_THRESHOLD));
    }

    #[test]
    fn single_item_has_unit_weight_and_undefined_ci() {
        let m = ComparisonMatrix::neutral(1).unwrap();
        let a = analyze(&m).unwrap();
        assert_eq!(a.weights.as_slice(), &[1.0]);
        assert!(a.consistency_index.is_nan());
        assert!(!a.consistency_ratio.is_defined());
    }

    #[test]
    fn eleven_items_unsupported() {
        let m = ComparisonMatrix::neutral(11).unwrap();
        assert_eq!(
            compute_weights_and_consistency(&m).unwrap_err(),
            AhpError::UnsupportedSize { n: 11, max: 10 }
        );
    }

    #[test]
    fn consistency_ratio_serializes_undefined_as_null() {
        let json = serde_json::to_string(&ConsistencyRatio::undefined()).unwrap();
        assert_eq!(json, "null");
        let back: ConsistencyRatio = serde_json::from_str("null").unwrap();
        assert!(!back.is_defined());
        let back: ConsistencyRatio = serde_json::from_str("0.05").unwrap();
        assert_eq!(back.as_option(), Some(0.05));
    }
}
