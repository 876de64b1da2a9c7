//! Pairwise comparison matrices built from sparse judgments.
//!
//! A [`ComparisonSet`] holds the judgments one agent made over one list of
//! items ("A is 3 times as preferred as B"). [`build_matrix`] expands it into
//! a dense reciprocal [`ComparisonMatrix`] indexed by a caller-supplied
//! [`ItemOrder`]. Pairs nobody judged default to 1 (equal importance) unless
//! the caller opts into [`MissingJudgmentPolicy::Reject`].

use std::collections::{HashMap, HashSet};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::AhpError;

/// Relative tolerance used by [`ComparisonMatrix::from_rows`].
pub const DEFAULT_RECIPROCITY_TOLERANCE: f64 = 1e-9;

/// Ordered, duplicate-free list of item names.
///
/// The position of a name is its row/column index in every matrix built
/// against this order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ItemOrder {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl ItemOrder {
    pub fn new<I, S>(names: I) -> Result<Self, AhpError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(AhpError::EmptyItemList);
        }
        let mut index = HashMap::with_capacity(names.len());
        for (idx, name) in names.iter().enumerate() {
            if let Some(_prev) = index.insert(name.clone(), idx) {
                return Err(AhpError::DuplicateItem { name: name.clone() });
            }
        }
        Ok(Self { names, index })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false; an order holds at least one item.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Index of `name`, or [`AhpError::UnknownItem`].
    pub fn require(&self, name: &str) -> Result<usize, AhpError> {
        self.index_of(name).ok_or_else(|| AhpError::UnknownItem {
            name: name.to_string(),
        })
    }
}

impl TryFrom<Vec<String>> for ItemOrder {
    type Error = AhpError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<ItemOrder> for Vec<String> {
    fn from(order: ItemOrder) -> Self {
        order.names
    }
}

/// "`item1` is `value` times as important as `item2`."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judgment {
    pub item1: String,
    pub item2: String,
    pub value: f64,
}

/// What to do with item pairs that received no judgment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingJudgmentPolicy {
    /// Unjudged pairs count as equal importance (value 1).
    #[default]
    Neutral,
    /// Every off-diagonal pair must be judged.
    Reject,
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Sparse judgments over one list of items.
///
/// A pair may be judged once, in either direction: `(A, B)` and `(B, A)`
/// describe the same comparison.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonSet {
    judgments: Vec<Judgment>,
    pairs: HashSet<(String, String)>,
}

impl ComparisonSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_judgments<I>(judgments: I) -> Result<Self, AhpError>
    where
        I: IntoIterator<Item = Judgment>,
    {
        let mut set = Self::new();
        for j in judgments {
            set.insert(j.item1, j.item2, j.value)?;
        }
        Ok(set)
    }

    pub fn insert(
        &mut self,
        item1: impl Into<String>,
        item2: impl Into<String>,
        value: f64,
    ) -> Result<(), AhpError> {
        let item1 = item1.into();
        let item2 = item2.into();
        if !value.is_finite() || value <= 0.0 {
            return Err(AhpError::InvalidJudgmentValue { item1, item2, value });
        }
        if !self.pairs.insert(pair_key(&item1, &item2)) {
            return Err(AhpError::DuplicateJudgment { item1, item2 });
        }
        self.judgments.push(Judgment { item1, item2, value });
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(
        mut self,
        item1: impl Into<String>,
        item2: impl Into<String>,
        value: f64,
    ) -> Result<Self, AhpError> {
        self.insert(item1, item2, value)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.judgments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.judgments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Judgment> {
        self.judgments.iter()
    }

    /// Off-diagonal pairs of `order` with no judgment, in row-major order.
    pub fn missing_pairs(&self, order: &ItemOrder) -> Vec<(String, String)> {
        let names = order.names();
        let mut out = Vec::new();
        for i in 0..names.len() {
            for j in (i + 1)..names.len() {
                if !self.pairs.contains(&pair_key(&names[i], &names[j])) {
                    out.push((names[i].clone(), names[j].clone()));
                }
            }
        }
        out
    }
}

/// Dense positive reciprocal matrix: `M[i][i] == 1`, `M[j][i] == 1 / M[i][j]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<f64>>", into = "Vec<Vec<f64>>")]
pub struct ComparisonMatrix {
    values: DMatrix<f64>,
}

impl ComparisonMatrix {
    /// All-ones matrix: every item equally important.
    pub fn neutral(n: usize) -> Result<Self, AhpError> {
        if n == 0 {
            return Err(AhpError::EmptyItemList);
        }
        Ok(Self {
            values: DMatrix::from_element(n, n, 1.0),
        })
    }

    /// Validate a raw row-major matrix with [`DEFAULT_RECIPROCITY_TOLERANCE`].
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, AhpError> {
        Self::from_rows_with_tolerance(rows, DEFAULT_RECIPROCITY_TOLERANCE)
    }

    /// Validate a raw row-major matrix; `tolerance` is relative and applies
    /// to both the diagonal and the reciprocal check.
    pub fn from_rows_with_tolerance(rows: &[Vec<f64>], tolerance: f64) -> Result<Self, AhpError> {
        let n = rows.len();
        if n == 0 {
            return Err(AhpError::InvalidMatrix {
                reason: "matrix has no rows".to_string(),
            });
        }
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n) {
            return Err(AhpError::InvalidMatrix {
                reason: format!("row {i} has {} entries, expected {n}", row.len()),
            });
        }
        let values = DMatrix::from_fn(n, n, |i, j| rows[i][j]);
        for i in 0..n {
            for j in 0..n {
                let v = values[(i, j)];
                if !v.is_finite() || v <= 0.0 {
                    return Err(AhpError::InvalidMatrix {
                        reason: format!("entry ({i}, {j}) is not a positive finite number: {v}"),
                    });
                }
            }
            if (values[(i, i)] - 1.0).abs() > tolerance {
                return Err(AhpError::InvalidMatrix {
                    reason: format!("diagonal entry ({i}, {i}) is {} instead of 1", values[(i, i)]),
                });
            }
            for j in (i + 1)..n {
                let product = values[(i, j)] * values[(j, i)];
                if (product - 1.0).abs() > tolerance {
                    return Err(AhpError::InvalidMatrix {
                        reason: format!(
                            "entries ({i}, {j}) = {} and ({j}, {i}) = {} are not reciprocal",
                            values[(i, j)],
                            values[(j, i)]
                        ),
                    });
                }
            }
        }
        Ok(Self { values })
    }

    /// Wrap values produced by reciprocity-preserving operations.
    pub(crate) fn from_dmatrix_unchecked(values: DMatrix<f64>) -> Self {
        debug_assert!(values.is_square() && values.nrows() > 0);
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.nrows()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[(row, col)]
    }

    pub fn as_dmatrix(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values
            .row_iter()
            .map(|row| row.iter().copied().collect())
            .collect()
    }
}

impl TryFrom<Vec<Vec<f64>>> for ComparisonMatrix {
    type Error = AhpError;

    fn try_from(rows: Vec<Vec<f64>>) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

impl From<ComparisonMatrix> for Vec<Vec<f64>> {
    fn from(matrix: ComparisonMatrix) -> Self {
        matrix.to_rows()
    }
}

/// Expand `set` into a dense matrix over `order`, defaulting unjudged pairs to 1.
pub fn build_matrix(set: &ComparisonSet, order: &ItemOrder) -> Result<ComparisonMatrix, AhpError> {
    build_matrix_with(set, order, MissingJudgmentPolicy::Neutral)
}

pub fn build_matrix_with(
    set: &ComparisonSet,
    order: &ItemOrder,
    policy: MissingJudgmentPolicy,
) -> Result<ComparisonMatrix, AhpError> {
    let n = order.len();
    // Self-pairs carry no information, so a set of only those counts as empty.
    if n >= 2 && set.iter().all(|j| j.item1 == j.item2) {
        return Err(AhpError::EmptyComparisonSet { item_count: n });
    }

    let mut values = DMatrix::<f64>::from_element(n, n, 1.0);
    for j in set.iter() {
        let a = order.require(&j.item1)?;
        let b = order.require(&j.item2)?;
        if a == b {
            continue;
        }
        values[(a, b)] = j.value;
        values[(b, a)] = 1.0 / j.value;
    }

    if policy == MissingJudgmentPolicy::Reject {
        if let Some((item1, item2)) = set.missing_pairs(order).into_iter().next() {
            return Err(AhpError::MissingJudgment { item1, item2 });
        }
    }

    Ok(ComparisonMatrix { values })
}
