//! Error types for the AHP engine.

use thiserror::Error;

/// Coarse error taxonomy, for callers that only care about the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or incomplete judgments, item lists, or matrices.
    InvalidInput,
    /// Matrices or criterion sets that disagree in shape.
    ShapeMismatch,
    /// Matrix dimension outside the random-index table.
    UnsupportedSize,
}

#[derive(Debug, Error, PartialEq)]
pub enum AhpError {
    #[error("item list must contain at least one name")]
    EmptyItemList,
    #[error("duplicate item name: {name}")]
    DuplicateItem { name: String },
    #[error("unknown item referenced by judgment: {name}")]
    UnknownItem { name: String },
    #[error("comparison set is empty for {item_count} items")]
    EmptyComparisonSet { item_count: usize },
    #[error("comparison between {item1} and {item2} already exists")]
    DuplicateJudgment { item1: String, item2: String },
    #[error("invalid judgment value for {item1} vs {item2}: {value}")]
    InvalidJudgmentValue {
        item1: String,
        item2: String,
        value: f64,
    },
    #[error("unparseable judgment value for {item1} vs {item2}: {raw:?}")]
    UnparseableJudgment {
        item1: String,
        item2: String,
        raw: String,
    },
    #[error("no judgment supplied for {item1} vs {item2}")]
    MissingJudgment { item1: String, item2: String },
    #[error("agent {agent} supplied no alternative comparisons for criterion {criterion}")]
    MissingCriterionComparisons { agent: usize, criterion: String },
    #[error("invalid comparison matrix: {reason}")]
    InvalidMatrix { reason: String },
    #[error("ranking requires at least one alternative matrix")]
    NoAlternativeMatrices,
    #[error("aggregation requires at least one agent")]
    NoAgents,
    #[error("matrix dimension {got} does not match expected {expected}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("ranking has {scores} scores but {names} alternative names were given")]
    AlternativeCountMismatch { scores: usize, names: usize },
    #[error("criterion set mismatch: expected {expected:?}, got {got:?}")]
    CriterionSetMismatch {
        expected: Vec<String>,
        got: Vec<String>,
    },
    #[error("matrix dimension {n} has no random index (supported: 1..={max})")]
    UnsupportedSize { n: usize, max: usize },
}

impl AhpError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AhpError::DimensionMismatch { .. }
            | AhpError::AlternativeCountMismatch { .. }
            | AhpError::CriterionSetMismatch { .. } => ErrorKind::ShapeMismatch,
            AhpError::UnsupportedSize { .. } => ErrorKind::UnsupportedSize,
            _ => ErrorKind::InvalidInput,
        }
    }

    pub fn is_invalid_input(&self) -> bool {
        self.kind() == ErrorKind::InvalidInput
    }

    pub fn is_shape_mismatch(&self) -> bool {
        self.kind() == ErrorKind::ShapeMismatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(AhpError::EmptyItemList.kind(), ErrorKind::InvalidInput);
        assert_eq!(AhpError::NoAgents.kind(), ErrorKind::InvalidInput);
        assert_eq!(
            AhpError::DimensionMismatch {
                expected: 3,
                got: 2
            }
            .kind(),
            ErrorKind::ShapeMismatch
        );
        assert_eq!(
            AhpError::UnsupportedSize { n: 11, max: 10 }.kind(),
            ErrorKind::UnsupportedSize
        );
    }

    #[test]
    fn duplicate_judgment_message_names_both_items() {
        let err = AhpError::DuplicateJudgment {
            item1: "A".to_string(),
            item2: "B".to_string(),
        };
        assert_eq!(err.to_string(), "comparison between A and B already exists");
    }
}
