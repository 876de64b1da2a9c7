//! Whole-session evaluation from an immutable snapshot.
//!
//! A [`SessionSnapshot`] carries the decision setup (alternatives and
//! criteria, in display order) plus every agent's raw judgments in the
//! nested `row -> column -> value` layout produced by comparison forms.
//! [`evaluate`] builds each agent's matrices, aggregates them and ranks the
//! alternatives.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::{AgentAggregator, Consensus};
use crate::error::AhpError;
use crate::matrix::{
    build_matrix_with, ComparisonMatrix, ComparisonSet, ItemOrder, MissingJudgmentPolicy,
};
use crate::priority::{ConsistencyRatio, DEFAULT_CONSISTENCY_THRESHOLD};
use crate::ranking::{compute_ranking, RankedAlternative, RankingResult};

/// Alternatives and criteria as entered by the session owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSetup {
    pub alternatives: Vec<String>,
    pub criteria: Vec<String>,
}

impl DecisionSetup {
    /// Validated `(alternatives, criteria)` orders.
    pub fn orders(&self) -> Result<(ItemOrder, ItemOrder), AhpError> {
        let alternatives = ItemOrder::new(self.alternatives.iter().cloned())?;
        let criteria = ItemOrder::new(self.criteria.iter().cloned())?;
        Ok((alternatives, criteria))
    }
}

/// A judgment value as submitted: a number, a numeric string, or `"p/q"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JudgmentValue {
    Number(f64),
    Text(String),
}

impl JudgmentValue {
    fn resolve(&self, item1: &str, item2: &str) -> Result<f64, AhpError> {
        let raw = match self {
            JudgmentValue::Number(v) => return Ok(*v),
            JudgmentValue::Text(raw) => raw,
        };
        let unparseable = || AhpError::UnparseableJudgment {
            item1: item1.to_string(),
            item2: item2.to_string(),
            raw: raw.clone(),
        };
        let text = raw.trim();
        match text.split_once('/') {
            Some((p, q)) => {
                let p: f64 = p.trim().parse().map_err(|_| unparseable())?;
                let q: f64 = q.trim().parse().map_err(|_| unparseable())?;
                Ok(p / q)
            }
            None => text.parse().map_err(|_| unparseable()),
        }
    }
}

impl From<f64> for JudgmentValue {
    fn from(v: f64) -> Self {
        JudgmentValue::Number(v)
    }
}

/// Nested `item1 -> item2 -> value` judgments over one item list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JudgmentTable(pub BTreeMap<String, BTreeMap<String, JudgmentValue>>);

impl JudgmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        item1: impl Into<String>,
        item2: impl Into<String>,
        value: impl Into<JudgmentValue>,
    ) -> Self {
        self.0
            .entry(item1.into())
            .or_default()
            .insert(item2.into(), value.into());
        self
    }

    pub fn to_comparison_set(&self) -> Result<ComparisonSet, AhpError> {
        let mut set = ComparisonSet::new();
        for (item1, row) in &self.0 {
            for (item2, value) in row {
                set.insert(item1.clone(), item2.clone(), value.resolve(item1, item2)?)?;
            }
        }
        Ok(set)
    }
}

/// One agent's submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentInput {
    #[serde(alias = "criteriaMatrix", default)]
    pub criteria_comparisons: JudgmentTable,
    /// Alternative judgments keyed by criterion name.
    #[serde(alias = "alternativeMatrices", default)]
    pub alternative_comparisons: BTreeMap<String, JudgmentTable>,
}

/// Evaluation knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Consistency ratios strictly above this are reported as inconsistent.
    pub consistency_threshold: f64,
    pub missing_judgments: MissingJudgmentPolicy,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            consistency_threshold: DEFAULT_CONSISTENCY_THRESHOLD,
            missing_judgments: MissingJudgmentPolicy::Neutral,
        }
    }
}

/// Everything needed for one evaluation, captured before the engine runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub setup: DecisionSetup,
    #[serde(default)]
    pub agents: Vec<AgentInput>,
    #[serde(default)]
    pub config: Option<EvaluationConfig>,
}

/// Which matrix a consistency flag refers to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatrixScope {
    Criteria,
    Alternatives { criterion: String },
}

/// A consensus matrix whose consistency ratio exceeds the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyFlag {
    pub scope: MatrixScope,
    pub consistency_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub alternatives: Vec<String>,
    pub criteria: Vec<String>,
    pub agent_count: usize,
    #[serde(flatten)]
    pub result: RankingResult,
    pub ranked: Vec<RankedAlternative>,
    pub consensus: Consensus,
    /// Unjudged pairs across all agents that defaulted to equal importance.
    pub defaulted_pairs: usize,
    pub inconsistent: Vec<ConsistencyFlag>,
}

struct AgentMatrices {
    criteria: ComparisonMatrix,
    alternatives: HashMap<String, ComparisonMatrix>,
    defaulted_pairs: usize,
}

fn build_one(
    set: &ComparisonSet,
    order: &ItemOrder,
    policy: MissingJudgmentPolicy,
) -> Result<(ComparisonMatrix, usize), AhpError> {
    let matrix = build_matrix_with(set, order, policy)?;
    Ok((matrix, set.missing_pairs(order).len()))
}

fn agent_matrices(
    agent_idx: usize,
    agent: &AgentInput,
    alternatives: &ItemOrder,
    criteria: &ItemOrder,
    policy: MissingJudgmentPolicy,
) -> Result<AgentMatrices, AhpError> {
    if let Some(unknown) = agent
        .alternative_comparisons
        .keys()
        .find(|c| !criteria.contains(c))
    {
        return Err(AhpError::UnknownItem {
            name: unknown.clone(),
        });
    }

    let criteria_set = agent.criteria_comparisons.to_comparison_set()?;
    let (criteria_matrix, mut defaulted_pairs) = build_one(&criteria_set, criteria, policy)?;
    if defaulted_pairs > 0 {
        warn!(
            agent = agent_idx,
            pairs = defaulted_pairs,
            "criteria pairs without judgment default to equal importance"
        );
    }

    let mut alt_matrices = HashMap::with_capacity(criteria.len());
    for criterion in criteria.names() {
        let table = agent.alternative_comparisons.get(criterion).ok_or_else(|| {
            AhpError::MissingCriterionComparisons {
                agent: agent_idx,
                criterion: criterion.clone(),
            }
        })?;
        let (matrix, missing) = build_one(&table.to_comparison_set()?, alternatives, policy)?;
        if missing > 0 {
            warn!(
                agent = agent_idx,
                criterion = %criterion,
                pairs = missing,
                "alternative pairs without judgment default to equal importance"
            );
        }
        defaulted_pairs += missing;
        alt_matrices.insert(criterion.clone(), matrix);
    }

    Ok(AgentMatrices {
        criteria: criteria_matrix,
        alternatives: alt_matrices,
        defaulted_pairs,
    })
}

fn aggregate_agents(
    alternatives: &ItemOrder,
    criteria: &ItemOrder,
    agents: &[AgentInput],
    policy: MissingJudgmentPolicy,
) -> Result<(Consensus, usize), AhpError> {
    if agents.is_empty() {
        return Err(AhpError::NoAgents);
    }
    let mut aggregator = AgentAggregator::new(criteria.clone(), alternatives.len());
    let mut defaulted_pairs = 0;
    for (idx, agent) in agents.iter().enumerate() {
        let built = agent_matrices(idx, agent, alternatives, criteria, policy)?;
        debug!(
            agent = idx,
            defaulted_pairs = built.defaulted_pairs,
            "built agent matrices"
        );
        defaulted_pairs += built.defaulted_pairs;
        aggregator.add_criteria_matrix(built.criteria)?;
        aggregator.add_alternative_matrices(built.alternatives)?;
    }
    Ok((aggregator.finish()?, defaulted_pairs))
}

/// Consensus matrices for a snapshot without ranking them.
pub fn aggregate_snapshot(snapshot: &SessionSnapshot) -> Result<Consensus, AhpError> {
    let cfg = snapshot.config.clone().unwrap_or_default();
    let (alternatives, criteria) = snapshot.setup.orders()?;
    let (consensus, _) =
        aggregate_agents(&alternatives, &criteria, &snapshot.agents, cfg.missing_judgments)?;
    Ok(consensus)
}

fn consistency_flags(
    result: &RankingResult,
    criteria: &ItemOrder,
    threshold: f64,
) -> Vec<ConsistencyFlag> {
    let mut out = Vec::new();
    let mut check = |scope: MatrixScope, cr: ConsistencyRatio| {
        if cr.exceeds(threshold) {
            warn!(
                scope = ?scope,
                consistency_ratio = cr.value(),
                threshold,
                "consistency ratio above threshold"
            );
            out.push(ConsistencyFlag {
                scope,
                consistency_ratio: cr.value(),
            });
        }
    };
    check(MatrixScope::Criteria, result.criteria_consistency);
    for (criterion, cr) in criteria.names().iter().zip(&result.alternative_consistency) {
        check(
            MatrixScope::Alternatives {
                criterion: criterion.clone(),
            },
            *cr,
        );
    }
    out
}

/// Build, aggregate and rank everything in `snapshot`.
pub fn evaluate(snapshot: &SessionSnapshot) -> Result<SessionReport, AhpError> {
    let cfg = snapshot.config.clone().unwrap_or_default();
    let (alternatives, criteria) = snapshot.setup.orders()?;

    let (consensus, defaulted_pairs) =
        aggregate_agents(&alternatives, &criteria, &snapshot.agents, cfg.missing_judgments)?;
    let result = compute_ranking(&consensus.criteria, &consensus.alternatives)?;
    let ranked = result.ranked(&alternatives)?;
    let inconsistent = consistency_flags(&result, &criteria, cfg.consistency_threshold);

    debug!(
        agents = snapshot.agents.len(),
        defaulted_pairs,
        inconsistent = inconsistent.len(),
        "session evaluated"
    );

    Ok(SessionReport {
        alternatives: alternatives.into(),
        criteria: criteria.into(),
        agent_count: snapshot.agents.len(),
        result,
        ranked,
        consensus,
        defaulted_pairs,
        inconsistent,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> DecisionSetup {
        DecisionSetup {
            alternatives: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            criteria: vec!["price".to_string(), "comfort".to_string()],
        }
    }

    fn agent(criteria_ratio: f64, price: [f64; 3], comfort: [f64; 3]) -> AgentInput {
        let table = |v: [f64; 3]| {
            JudgmentTable::new()
                .with("a", "b", v[0])
                .with("a", "c", v[1])
                .with("b", "c", v[2])
        };
        AgentInput {
            criteria_comparisons: JudgmentTable::new().with("price", "comfort", criteria_ratio),
            alternative_comparisons: BTreeMap::from([
                ("price".to_string(), table(price)),
                ("comfort".to_string(), table(comfort)),
            ]),
        }
    }

    #[test]
    fn judgment_value_parses_numbers_strings_and_fractions() {
        assert_eq!(JudgmentValue::Number(2.0).resolve("a", "b").unwrap(), 2.0);
        assert_eq!(
            JudgmentValue::Text(" 0.5 ".to_string()).resolve("a", "b").unwrap(),
            0.5
        );
        assert_eq!(
            JudgmentValue::Text("1/4".to_string()).resolve("a", "b").unwrap(),
            0.25
        );
        assert!(matches!(
            JudgmentValue::Text("lots".to_string()).resolve("a", "b"),
            Err(AhpError::UnparseableJudgment { .. })
        ));
    }

    #[test]
    fn judgment_table_rejects_both_directions() {
        let table = JudgmentTable::new().with("a", "b", 2.0).with("b", "a", 0.5);
        assert!(matches!(
            table.to_comparison_set(),
            Err(AhpError::DuplicateJudgment { .. })
        ));
    }

    #[test]
    fn evaluate_ranks_consistent_agents() {
        // a:b:c = 4:2:1 on price, 1:2:4 on comfort; price twice as important
        let snapshot = SessionSnapshot {
            setup: setup(),
            agents: vec![agent(2.0, [2.0, 4.0, 2.0], [0.5, 0.25, 0.5])],
            config: None,
        };
        let report = evaluate(&snapshot).unwrap();

        let expected = [
            2.0 / 3.0 * 4.0 / 7.0 + 1.0 / 3.0 * 1.0 / 7.0,
            2.0 / 7.0,
            2.0 / 3.0 * 1.0 / 7.0 + 1.0 / 3.0 * 4.0 / 7.0,
        ];
        for (got, want) in report.result.ranking.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} vs {want}");
        }
        assert_eq!(report.ranked[0].name, "a");
        assert_eq!(report.agent_count, 1);
        assert_eq!(report.defaulted_pairs, 0);
        assert!(report.inconsistent.is_empty());
    }

    #[test]
    fn evaluate_flags_inconsistent_alternative_matrix() {
        let snapshot = SessionSnapshot {
            setup: setup(),
            agents: vec![agent(1.0, [3.0, 1.0 / 3.0, 3.0], [1.0, 1.0, 1.0])],
            config: None,
        };
        let report = evaluate(&snapshot).unwrap();
        assert_eq!(report.inconsistent.len(), 1);
        assert_eq!(
            report.inconsistent[0].scope,
            MatrixScope::Alternatives {
                criterion: "price".to_string()
            }
        );
    }

    #[test]
    fn evaluate_counts_defaulted_pairs() {
        let mut sparse = agent(2.0, [2.0, 4.0, 2.0], [1.0, 1.0, 1.0]);
        sparse
            .alternative_comparisons
            .insert("comfort".to_string(), JudgmentTable::new().with("a", "b", 3.0));
        let snapshot = SessionSnapshot {
            setup: setup(),
            agents: vec![sparse.clone()],
            config: None,
        };
        assert_eq!(evaluate(&snapshot).unwrap().defaulted_pairs, 2);

        let strict = SessionSnapshot {
            config: Some(EvaluationConfig {
                missing_judgments: MissingJudgmentPolicy::Reject,
                ..EvaluationConfig::default()
            }),
            ..snapshot
        };
        assert!(matches!(
            evaluate(&strict),
            Err(AhpError::MissingJudgment { .. })
        ));
    }

    #[test]
    fn evaluate_requires_agents_and_all_criteria() {
        let empty = SessionSnapshot {
            setup: setup(),
            agents: Vec::new(),
            config: None,
        };
        assert_eq!(evaluate(&empty).unwrap_err(), AhpError::NoAgents);

        let mut partial = agent(2.0, [2.0, 4.0, 2.0], [1.0, 1.0, 1.0]);
        partial.alternative_comparisons.remove("comfort");
        let snapshot = SessionSnapshot {
            setup: setup(),
            agents: vec![partial],
            config: None,
        };
        assert_eq!(
            evaluate(&snapshot).unwrap_err(),
            AhpError::MissingCriterionComparisons {
                agent: 0,
                criterion: "comfort".to_string()
            }
        );
    }

    #[test]
    fn evaluate_rejects_unknown_criterion_and_empty_lists() {
        let mut extra = agent(2.0, [2.0, 4.0, 2.0], [1.0, 1.0, 1.0]);
        extra
            .alternative_comparisons
            .insert("speed".to_string(), JudgmentTable::new().with("a", "b", 2.0));
        let snapshot = SessionSnapshot {
            setup: setup(),
            agents: vec![extra],
            config: None,
        };
        assert_eq!(
            evaluate(&snapshot).unwrap_err(),
            AhpError::UnknownItem {
                name: "speed".to_string()
            }
        );

        let no_criteria = SessionSnapshot {
            setup: DecisionSetup {
                alternatives: vec!["a".to_string()],
                criteria: Vec::new(),
            },
            agents: vec![AgentInput::default()],
            config: None,
        };
        let err = evaluate(&no_criteria).unwrap_err();
        assert_eq!(err, AhpError::EmptyItemList);
        assert!(err.is_invalid_input());
    }

    #[test]
    fn snapshot_accepts_form_layout() {
        let raw = r#"{
            "alternatives": ["a", "b"],
            "criteria": ["cost", "quality"],
            "agents": [{
                "criteriaMatrix": {
                    "cost": {"cost": 1, "quality": "2"},
                    "quality": {"quality": 1}
                },
                "alternativeMatrices": {
                    "cost": {"a": {"a": 1, "b": "3"}, "b": {"b": 1}},
                    "quality": {"a": {"a": 1, "b": "0.333"}, "b": {"b": 1}}
                }
            }]
        }"#;
        let snapshot: SessionSnapshot = serde_json::from_str(raw).unwrap();
        assert_eq!(snapshot.setup.criteria, vec!["cost", "quality"]);
        let report = evaluate(&snapshot).unwrap();
        assert_eq!(report.ranked[0].name, "a");
    }
}
