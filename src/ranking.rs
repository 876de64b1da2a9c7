//! Composition of criteria weights and per-criterion alternative weights.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::AhpError;
use crate::matrix::{ComparisonMatrix, ItemOrder};
use crate::priority::{compute_weights_and_consistency, ConsistencyRatio, PriorityVector};

/// Final scores plus every consistency ratio computed along the way.
#[derive(Debug, Clone, Serialize)]
pub struct RankingResult {
    /// One score per alternative, in alternative order. Sums to 1.
    pub ranking: Vec<f64>,
    pub criteria_consistency: ConsistencyRatio,
    /// One ratio per criterion, in criterion order.
    pub alternative_consistency: Vec<ConsistencyRatio>,
    pub criteria_weights: PriorityVector,
    /// Alternative weights under each criterion, in criterion order.
    pub alternative_weights: Vec<PriorityVector>,
}

/// One alternative with its final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAlternative {
    pub name: String,
    pub score: f64,
}

impl RankingResult {
    /// `(n_alternatives + 1) x n_criteria`: row 0 holds the criteria weights,
    /// row `a + 1` holds the weight of alternative `a` under each criterion.
    pub fn composition_matrix(&self) -> DMatrix<f64> {
        let n_crit = self.criteria_weights.len();
        let n_alt = self.ranking.len();
        let mut out = DMatrix::<f64>::zeros(n_alt + 1, n_crit);
        for (c, w) in self.criteria_weights.iter().enumerate() {
            out[(0, c)] = w;
            for (a, aw) in self.alternative_weights[c].iter().enumerate() {
                out[(a + 1, c)] = aw;
            }
        }
        out
    }

    /// Alternatives sorted by score, best first. Ties keep caller order.
    pub fn ranked(&self, alternatives: &ItemOrder) -> Result<Vec<RankedAlternative>, AhpError> {
        if alternatives.len() != self.ranking.len() {
            return Err(AhpError::AlternativeCountMismatch {
                scores: self.ranking.len(),
                names: alternatives.len(),
            });
        }
        let mut out: Vec<RankedAlternative> = alternatives
            .names()
            .iter()
            .zip(&self.ranking)
            .map(|(name, score)| RankedAlternative {
                name: name.clone(),
                score: *score,
            })
            .collect();
        out.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(out)
    }
}

/// Rank alternatives from a criteria matrix and one alternative matrix per criterion.
pub fn compute_ranking(
    criteria: &ComparisonMatrix,
    alternatives: &[ComparisonMatrix],
) -> Result<RankingResult, AhpError> {
    let first = alternatives.first().ok_or(AhpError::NoAlternativeMatrices)?;
    if alternatives.len() != criteria.dim() {
        return Err(AhpError::DimensionMismatch {
            expected: criteria.dim(),
            got: alternatives.len(),
        });
    }
    let n_alt = first.dim();
    if let Some(bad) = alternatives.iter().find(|m| m.dim() != n_alt) {
        return Err(AhpError::DimensionMismatch {
            expected: n_alt,
            got: bad.dim(),
        });
    }

    let (criteria_weights, criteria_consistency) = compute_weights_and_consistency(criteria)?;

    let mut alternative_weights = Vec::with_capacity(alternatives.len());
    let mut alternative_consistency = Vec::with_capacity(alternatives.len());
    for m in alternatives {
        let (w, cr) = compute_weights_and_consistency(m)?;
        alternative_weights.push(w);
        alternative_consistency.push(cr);
    }

    // Column c holds the alternative weights under criterion c.
    let alt_block = DMatrix::from_fn(n_alt, alternatives.len(), |a, c| {
        alternative_weights[c].as_slice()[a]
    });
    let scores = alt_block * DVector::from_column_slice(criteria_weights.as_slice());

    Ok(RankingResult {
        ranking: scores.iter().copied().collect(),
        criteria_consistency,
        alternative_consistency,
        criteria_weights,
        alternative_weights,
    })
}
