//! Multi-agent consensus via element-wise geometric mean.
//!
//! The geometric mean keeps consensus matrices reciprocal:
//! `gm(1/x_1, ..., 1/x_k) == 1 / gm(x_1, ..., x_k)`. It is taken in log
//! space, like the row means in [`crate::priority`].
//!
//! [`AgentAggregator`] accumulates per-agent matrices; [`AgentAggregator::finish`]
//! turns it into an immutable [`Consensus`].

use std::collections::HashMap;

use nalgebra::DMatrix;
use serde::Serialize;

use crate::error::AhpError;
use crate::matrix::{ComparisonMatrix, ItemOrder};

/// Element-wise geometric mean of same-sized matrices.
///
/// Evaluated as `exp(mean ln)` over the upper triangle, with the lower
/// triangle set to the reciprocal, so any number of agents with extreme
/// judgments still yields a finite positive reciprocal matrix. A single
/// matrix is returned unchanged.
pub fn geometric_mean_matrix(matrices: &[&ComparisonMatrix]) -> Result<ComparisonMatrix, AhpError> {
    let first = matrices.first().ok_or(AhpError::NoAgents)?;
    let n = first.dim();
    if let Some(bad) = matrices.iter().find(|m| m.dim() != n) {
        return Err(AhpError::DimensionMismatch {
            expected: n,
            got: bad.dim(),
        });
    }
    if matrices.len() == 1 {
        return Ok((*first).clone());
    }

    let mut log_sum = DMatrix::<f64>::zeros(n, n);
    for m in matrices {
        log_sum += m.as_dmatrix().map(f64::ln);
    }
    let k = matrices.len() as f64;
    let mut values = DMatrix::<f64>::from_element(n, n, 1.0);
    for i in 0..n {
        for j in (i + 1)..n {
            let v = (log_sum[(i, j)] / k).exp();
            values[(i, j)] = v;
            values[(j, i)] = 1.0 / v;
        }
    }
    Ok(ComparisonMatrix::from_dmatrix_unchecked(values))
}

/// Accumulates criteria and alternative matrices from independent agents.
#[derive(Debug, Clone)]
pub struct AgentAggregator {
    criteria: ItemOrder,
    alternative_count: usize,
    criteria_matrices: Vec<ComparisonMatrix>,
    /// One entry per agent, each holding one matrix per criterion in criterion order.
    alternative_matrices: Vec<Vec<ComparisonMatrix>>,
}

impl AgentAggregator {
    pub fn new(criteria: ItemOrder, alternative_count: usize) -> Self {
        Self {
            criteria,
            alternative_count,
            criteria_matrices: Vec::new(),
            alternative_matrices: Vec::new(),
        }
    }

    pub fn criteria(&self) -> &ItemOrder {
        &self.criteria
    }

    /// Number of agents that contributed a criteria matrix.
    pub fn agent_count(&self) -> usize {
        self.criteria_matrices.len()
    }

    pub fn add_criteria_matrix(&mut self, matrix: ComparisonMatrix) -> Result<(), AhpError> {
        if matrix.dim() != self.criteria.len() {
            return Err(AhpError::DimensionMismatch {
                expected: self.criteria.len(),
                got: matrix.dim(),
            });
        }
        self.criteria_matrices.push(matrix);
        Ok(())
    }

    /// Add one agent's alternative matrices, keyed by criterion name.
    ///
    /// The key set must equal the criteria set and every matrix must cover
    /// all alternatives. Nothing is stored on error.
    pub fn add_alternative_matrices(
        &mut self,
        mut matrices: HashMap<String, ComparisonMatrix>,
    ) -> Result<(), AhpError> {
        let same_keys = matrices.len() == self.criteria.len()
            && self.criteria.names().iter().all(|c| matrices.contains_key(c));
        if !same_keys {
            let mut got: Vec<String> = matrices.keys().cloned().collect();
            got.sort();
            return Err(AhpError::CriterionSetMismatch {
                expected: self.criteria.names().to_vec(),
                got,
            });
        }
        if let Some(bad) = matrices.values().find(|m| m.dim() != self.alternative_count) {
            return Err(AhpError::DimensionMismatch {
                expected: self.alternative_count,
                got: bad.dim(),
            });
        }

        let ordered = self
            .criteria
            .names()
            .iter()
            .filter_map(|c| matrices.remove(c))
            .collect();
        self.alternative_matrices.push(ordered);
        Ok(())
    }

    pub fn mean_criteria_matrix(&self) -> Result<ComparisonMatrix, AhpError> {
        let refs: Vec<&ComparisonMatrix> = self.criteria_matrices.iter().collect();
        geometric_mean_matrix(&refs)
    }

    /// One consensus matrix per criterion, in criterion order.
    pub fn mean_alternative_matrices(&self) -> Result<Vec<ComparisonMatrix>, AhpError> {
        if self.alternative_matrices.is_empty() {
            return Err(AhpError::NoAgents);
        }
        (0..self.criteria.len())
            .map(|c| {
                let refs: Vec<&ComparisonMatrix> =
                    self.alternative_matrices.iter().map(|agent| &agent[c]).collect();
                geometric_mean_matrix(&refs)
            })
            .collect()
    }

    pub fn finish(self) -> Result<Consensus, AhpError> {
        Ok(Consensus {
            criteria: self.mean_criteria_matrix()?,
            alternatives: self.mean_alternative_matrices()?,
        })
    }
}

/// Consensus matrices ready for ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Consensus {
    pub criteria: ComparisonMatrix,
    /// One matrix per criterion, in criterion order.
    pub alternatives: Vec<ComparisonMatrix>,
}
