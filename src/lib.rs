#![forbid(unsafe_code)]

//! # ahp-harness
//!
//! Analytic Hierarchy Process engine. Agents compare criteria pairwise
//! ("cost matters twice as much as quality") and, under each criterion,
//! compare alternatives pairwise. The engine turns those judgments into
//! reciprocal comparison matrices, merges multiple agents by element-wise
//! geometric mean, derives priority vectors and consistency ratios, and
//! composes everything into one score per alternative.
//!
//! Pipeline:
//! judgments -> [`matrix::build_matrix`] -> [`aggregate::AgentAggregator`]
//! -> [`ranking::compute_ranking`] (driving [`priority::analyze`]).
//! [`session::evaluate`] runs the whole pipeline over a JSON-friendly snapshot.

pub mod aggregate;
pub mod error;
pub mod matrix;
pub mod priority;
pub mod ranking;
pub mod session;

pub use aggregate::{geometric_mean_matrix, AgentAggregator, Consensus};
pub use error::{AhpError, ErrorKind};
pub use matrix::{
    build_matrix, build_matrix_with, ComparisonMatrix, ComparisonSet, ItemOrder, Judgment,
    MissingJudgmentPolicy,
};
pub use priority::{
    analyze, compute_weights_and_consistency, random_index, ConsistencyRatio, PriorityAnalysis,
    PriorityVector,
};
pub use ranking::{compute_ranking, RankedAlternative, RankingResult};
pub use session::{
    evaluate, AgentInput, DecisionSetup, EvaluationConfig, SessionReport, SessionSnapshot,
};
