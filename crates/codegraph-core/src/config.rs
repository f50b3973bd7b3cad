use crate::error::{CodeGraphError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

fn weights_sum_to_one(weights: &[f64]) -> bool {
    (weights.iter().sum::<f64>() - 1.0).abs() < 1e-3
}

/// The six weights that combine into a blast-radius risk score (§4.G). Kept separate
/// from `ExpertiseWeights` per §6 — the two scoring domains never share a config key.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RiskWeights {
    pub complexity: f64,
    pub centrality: f64,
    pub test_coverage: f64,
    pub dependency: f64,
    pub change_frequency: f64,
    pub bus_factor: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            complexity: 0.25,
            centrality: 0.20,
            test_coverage: 0.20,
            dependency: 0.15,
            change_frequency: 0.10,
            bus_factor: 0.10,
        }
    }
}

impl RiskWeights {
    pub fn validate(&self) -> Result<()> {
        let values = [
            self.complexity,
            self.centrality,
            self.test_coverage,
            self.dependency,
            self.change_frequency,
            self.bus_factor,
        ];
        if weights_sum_to_one(&values) {
            Ok(())
        } else {
            Err(CodeGraphError::ConfigurationError(format!(
                "risk weights must sum to 1.0 +/- 1e-3, got {}",
                values.iter().sum::<f64>()
            )))
        }
    }
}

/// The seven weights that combine into a developer's expertise score for a file (§4.I).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExpertiseWeights {
    pub commit_frequency: f64,
    pub lines_changed: f64,
    pub refactor_depth: f64,
    pub architectural_changes: f64,
    pub bug_fixes: f64,
    pub recency: f64,
    pub code_review_participation: f64,
}

impl Default for ExpertiseWeights {
    fn default() -> Self {
        Self {
            commit_frequency: 0.15,
            lines_changed: 0.10,
            refactor_depth: 0.25,
            architectural_changes: 0.20,
            bug_fixes: 0.15,
            recency: 0.10,
            code_review_participation: 0.05,
        }
    }
}

impl ExpertiseWeights {
    /// Unlike `RiskWeights::validate`, a violation here is reported, not fatal (§4.I):
    /// callers decide whether to surface the warning or proceed regardless.
    pub fn sums_to_one(&self) -> bool {
        weights_sum_to_one(&[
            self.commit_frequency,
            self.lines_changed,
            self.refactor_depth,
            self.architectural_changes,
            self.bug_fixes,
            self.recency,
            self.code_review_participation,
        ])
    }
}

/// Keyword lists driving commit classification (§4.I). Configuration, not code, so a
/// deployment can tune them without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CommitKeywords {
    pub architectural: Vec<String>,
    pub refactor: Vec<String>,
    pub bug_fix: Vec<String>,
    pub test: Vec<String>,
    pub documentation: Vec<String>,
    pub feature: Vec<String>,
}

impl Default for CommitKeywords {
    fn default() -> Self {
        Self {
            architectural: vec![
                "architect", "design", "structure", "module", "interface", "api", "layer",
                "service", "component", "framework", "pattern", "abstraction",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            refactor: vec![
                "refactor",
                "restructure",
                "cleanup",
                "reorganize",
                "simplify",
                "extract",
                "rename",
                "move",
                "split",
                "merge",
                "consolidate",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            bug_fix: vec![
                "fix", "bug", "patch", "hotfix", "issue", "resolve", "repair", "correct",
                "handle", "error", "crash", "failure",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            test: vec!["test", "spec", "unittest", "pytest", "coverage", "mock", "stub"]
                .into_iter()
                .map(String::from)
                .collect(),
            documentation: vec!["doc", "readme", "comment", "docstring", "documentation", "explain"]
                .into_iter()
                .map(String::from)
                .collect(),
            feature: vec!["add", "implement", "create", "new", "feature", "support"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Tunables for the expertise scorer beyond the per-factor weights (§4.I, §6).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExpertiseConfig {
    pub weights: ExpertiseWeights,
    pub keywords: CommitKeywords,
    pub recency_half_life_days: f64,
    pub min_commits_for_expertise: u32,
    pub expert_confidence_threshold: f64,
    pub bus_factor_warning_threshold: u32,
    pub knowledge_gap_threshold: f64,
}

impl Default for ExpertiseConfig {
    fn default() -> Self {
        Self {
            weights: ExpertiseWeights::default(),
            keywords: CommitKeywords::default(),
            recency_half_life_days: 180.0,
            min_commits_for_expertise: 3,
            expert_confidence_threshold: 0.6,
            bus_factor_warning_threshold: 2,
            knowledge_gap_threshold: 0.3,
        }
    }
}

/// The history window and recency window the git risk signals are computed over (§4.I).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
pub struct GitHistoryConfig {
    pub max_commits_scanned: usize,
    pub recent_change_window_days: i64,
}

impl Default for GitHistoryConfig {
    fn default() -> Self {
        Self {
            max_commits_scanned: 500,
            recent_change_window_days: 90,
        }
    }
}

/// Which graph store backend an adapter should wire up (§6 environment signal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GraphBackend {
    InMemory,
    Remote,
}

impl Default for GraphBackend {
    fn default() -> Self {
        GraphBackend::InMemory
    }
}
