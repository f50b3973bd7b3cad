//! Blast-radius impact assessment (§4.G): given a target entity, how much of the graph
//! transitively depends on it, and how risky is changing it.

use codegraph_core::{CodeGraphError, Deadline, EntityId, GraphStore, RelationType, Result, RiskWeights};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

/// Cyclomatic/cognitive complexity for the target, when the caller has it to hand. When
/// absent, [`ImpactAnalyzer`] falls back to whatever the graph node itself carries
/// (populated by the extraction pipeline), and finally to zero.
#[derive(Debug, Clone, Copy)]
pub struct ComplexityData {
    pub cyclomatic: f64,
    pub cognitive: f64,
}

/// The two git-history-driven risk signals (§4.I) fed into blast-radius scoring. When
/// absent, each factor falls back to a graph-shape proxy (§4.G).
#[derive(Debug, Clone, Copy)]
pub struct GitRiskData {
    pub change_frequency_risk: f64,
    pub bus_factor_risk: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskFactors {
    pub complexity_risk: f64,
    pub centrality_risk: f64,
    pub test_coverage_risk: f64,
    pub dependency_risk: f64,
    pub change_frequency_risk: f64,
    pub bus_factor_risk: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    fn from_score(score: f64) -> Self {
        if score < 0.2 {
            RiskLevel::Low
        } else if score < 0.5 {
            RiskLevel::Medium
        } else if score < 0.8 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }
}

/// Affected entities bucketed by the first relation type that connects them toward the
/// target (or toward another affected entity) — the three categories §4.G names.
#[derive(Debug, Clone, Default)]
pub struct AffectedByType {
    pub callers: Vec<EntityId>,
    pub inheritors: Vec<EntityId>,
    pub type_users: Vec<EntityId>,
}

#[derive(Debug, Clone)]
pub struct ImpactAssessment {
    pub target: EntityId,
    pub blast_radius: usize,
    pub direct_callers: Vec<EntityId>,
    pub indirect_callers: Vec<EntityId>,
    pub all_affected: Vec<EntityId>,
    pub affected_tests: Vec<EntityId>,
    pub affected_by_type: AffectedByType,
    pub risk_factors: RiskFactors,
    pub overall_risk_score: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

impl ImpactAssessment {
    /// §4.G step 1 and §7: an unknown target returns an empty assessment rather than an
    /// error.
    fn zero(target: EntityId) -> Self {
        Self {
            target,
            blast_radius: 0,
            direct_callers: Vec::new(),
            indirect_callers: Vec::new(),
            all_affected: Vec::new(),
            affected_tests: Vec::new(),
            affected_by_type: AffectedByType::default(),
            risk_factors: RiskFactors::default(),
            overall_risk_score: 0.0,
            risk_level: RiskLevel::Low,
            recommendations: vec!["target not found in graph; no risk to assess".to_string()],
        }
    }
}

/// Entry point `calculate_blast_radius` (§4.G), parameterised by the risk weights a
/// deployment configures.
pub struct ImpactAnalyzer {
    weights: RiskWeights,
}

impl Default for ImpactAnalyzer {
    fn default() -> Self {
        Self::new(RiskWeights::default())
    }
}

impl ImpactAnalyzer {
    pub fn new(weights: RiskWeights) -> Self {
        Self { weights }
    }

    pub async fn calculate_blast_radius(
        &self,
        store: &dyn GraphStore,
        target: &EntityId,
        complexity_data: Option<ComplexityData>,
        git_risk: Option<GitRiskData>,
    ) -> Result<ImpactAssessment> {
        self.calculate_blast_radius_cancellable(store, target, complexity_data, git_risk, None)
            .await
    }

    /// Cancellation-aware variant of [`Self::calculate_blast_radius`] (§5). The deadline
    /// is checked before the BFS traversal and again before the centrality pull, the two
    /// points most likely to touch a remote graph store over the network.
    pub async fn calculate_blast_radius_cancellable(
        &self,
        store: &dyn GraphStore,
        target: &EntityId,
        complexity_data: Option<ComplexityData>,
        git_risk: Option<GitRiskData>,
        deadline: Option<Deadline>,
    ) -> Result<ImpactAssessment> {
        if let Some(d) = deadline {
            d.check()?;
        }

        if !store.has_node(target).await? {
            return Ok(ImpactAssessment::zero(target.clone()));
        }

        let (all_affected_set, discovery_rel) = self.affected_with_discovery_type(store, target).await?;

        if let Some(d) = deadline {
            d.check()?;
        }

        let direct_callers: HashSet<EntityId> = store
            .edges_to(target, Some(RelationType::Calls))
            .await?
            .into_iter()
            .map(|e| e.source)
            .collect();

        let mut indirect_callers: Vec<EntityId> = all_affected_set
            .iter()
            .filter(|id| !direct_callers.contains(id))
            .cloned()
            .collect();
        indirect_callers.sort();

        let mut direct_callers_vec: Vec<EntityId> = direct_callers.iter().cloned().collect();
        direct_callers_vec.sort();

        let mut all_affected: Vec<EntityId> = all_affected_set.iter().cloned().collect();
        all_affected.sort();

        let mut affected_tests: Vec<EntityId> = all_affected
            .iter()
            .filter(|id| is_test_entity(id))
            .cloned()
            .collect();
        affected_tests.sort();

        let affected_by_type = bucket_by_type(&all_affected, &discovery_rel);

        let node = store.node(target).await?;
        let complexity = complexity_data.unwrap_or_else(|| ComplexityData {
            cyclomatic: node.as_ref().and_then(|n| n.cyclomatic_complexity).unwrap_or(0.0),
            cognitive: node.as_ref().and_then(|n| n.cognitive_complexity).unwrap_or(0.0),
        });

        let centrality_risk = self.centrality_risk(store, target).await?;

        let in_deg = store.in_degree(target).await? as f64;
        let out_deg = store.out_degree(target).await? as f64;

        let risk_factors = RiskFactors {
            complexity_risk: ((complexity.cyclomatic + complexity.cognitive / 2.0) / 15.0).min(1.0),
            centrality_risk,
            test_coverage_risk: 1.0 - (affected_tests.len() as f64 * 0.3).min(1.0),
            dependency_risk: ((direct_callers_vec.len() + indirect_callers.len()) as f64 / 10.0).min(1.0),
            change_frequency_risk: git_risk
                .map(|g| g.change_frequency_risk)
                .unwrap_or_else(|| ((in_deg + out_deg) / 20.0).min(1.0)),
            bus_factor_risk: git_risk.map(|g| g.bus_factor_risk).unwrap_or(0.5),
        };

        let overall_risk_score = (self.weights.complexity * risk_factors.complexity_risk
            + self.weights.centrality * risk_factors.centrality_risk
            + self.weights.test_coverage * risk_factors.test_coverage_risk
            + self.weights.dependency * risk_factors.dependency_risk
            + self.weights.change_frequency * risk_factors.change_frequency_risk
            + self.weights.bus_factor * risk_factors.bus_factor_risk)
            .min(1.0);

        let risk_level = RiskLevel::from_score(overall_risk_score);
        let recommendations = build_recommendations(&risk_factors);

        debug!(target = %target, blast_radius = all_affected.len(), score = overall_risk_score, "blast radius computed");

        Ok(ImpactAssessment {
            target: target.clone(),
            blast_radius: all_affected.len(),
            direct_callers: direct_callers_vec,
            indirect_callers,
            all_affected,
            affected_tests,
            affected_by_type,
            risk_factors,
            overall_risk_score,
            risk_level,
            recommendations,
        })
    }

    /// BFS backward from `target` over all edge types, recording for each newly
    /// discovered entity the relation type of the edge that first reached it — used to
    /// bucket `affected_by_type` (§4.G step 6).
    async fn affected_with_discovery_type(
        &self,
        store: &dyn GraphStore,
        target: &EntityId,
    ) -> Result<(HashSet<EntityId>, HashMap<EntityId, RelationType>)> {
        let mut visited = HashSet::new();
        let mut discovery = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(target.clone());

        while let Some(current) = queue.pop_front() {
            for edge in store.edges_to(&current, None).await? {
                if edge.source == *target {
                    continue;
                }
                if visited.insert(edge.source.clone()) {
                    discovery.insert(edge.source.clone(), edge.rel_type);
                    queue.push_back(edge.source.clone());
                }
            }
        }

        Ok((visited, discovery))
    }

    async fn centrality_risk(&self, store: &dyn GraphStore, target: &EntityId) -> Result<f64> {
        let centrality = store.betweenness_centrality().await?;
        let max_betweenness = centrality.values().cloned().fold(0.0_f64, f64::max);
        if max_betweenness > 0.0 {
            let value = centrality.get(target).copied().unwrap_or(0.0);
            return Ok(value / max_betweenness);
        }
        let in_deg = store.in_degree(target).await? as f64;
        let out_deg = store.out_degree(target).await? as f64;
        Ok(((in_deg + out_deg) / 20.0).min(1.0))
    }
}

fn is_test_entity(id: &EntityId) -> bool {
    let s = id.as_str();
    if s.contains("test") {
        return true;
    }
    let name = s.rsplit(['.', ':']).next().unwrap_or(s);
    name.starts_with("test_")
}

fn bucket_by_type(all_affected: &[EntityId], discovery: &HashMap<EntityId, RelationType>) -> AffectedByType {
    let mut out = AffectedByType::default();
    for id in all_affected {
        match discovery.get(id) {
            Some(RelationType::Calls) => out.callers.push(id.clone()),
            Some(RelationType::Inherits) | Some(RelationType::Implements) | Some(RelationType::Overrides) => {
                out.inheritors.push(id.clone())
            }
            Some(RelationType::UsesType) | Some(RelationType::ReturnsType) => out.type_users.push(id.clone()),
            _ => {}
        }
    }
    out
}

/// Rule-based canned recommendations (§4.G): advisory only, no effect on scoring.
fn build_recommendations(factors: &RiskFactors) -> Vec<String> {
    let mut out = Vec::new();
    if factors.complexity_risk > 0.7 {
        out.push("complexity is high; consider breaking this entity into smaller units before changing it".to_string());
    }
    if factors.centrality_risk > 0.7 {
        out.push("this entity sits at a highly central point of the dependency graph; changes here ripple broadly".to_string());
    }
    if factors.test_coverage_risk > 0.6 {
        out.push("few or no tests cover the affected entities; add coverage before making this change".to_string());
    }
    if factors.dependency_risk > 0.7 {
        out.push("a large number of entities depend on this target; stage the rollout and review call sites".to_string());
    }
    if factors.change_frequency_risk > 0.7 {
        out.push("this file changes frequently; recent churn increases the chance of regression".to_string());
    }
    if factors.bus_factor_risk > 0.7 {
        out.push("few developers have expertise on this file; pair with someone who has touched it before".to_string());
    }
    if out.is_empty() {
        out.push("risk factors are within acceptable bounds; proceed with standard review".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{EntityType, GraphEdgeView, GraphNode};
    use codegraph_graph::InMemoryGraphStore;

    fn node(id: &str, entity_type: EntityType) -> GraphNode {
        GraphNode::new(EntityId::from(id), entity_type, id)
    }

    #[tokio::test]
    async fn unknown_target_returns_zero_assessment() {
        let store = InMemoryGraphStore::new();
        let analyzer = ImpactAnalyzer::default();
        let assessment = analyzer
            .calculate_blast_radius(&store, &EntityId::from("nope"), None, None)
            .await
            .unwrap();
        assert_eq!(assessment.blast_radius, 0);
        assert_eq!(assessment.risk_level, RiskLevel::Low);
    }

    /// Scenario 3 (§8): three-function repo, only `caller` calls `helper`, `helper` calls
    /// nothing. `blast_radius(helper)` == 1, no affected tests, risk_level <= MEDIUM with
    /// default weights and low complexity.
    #[tokio::test]
    async fn three_function_chain_gives_blast_radius_one() {
        let mut store = InMemoryGraphStore::new();
        store.add_node(node("a.py:caller", EntityType::Function)).await.unwrap();
        store.add_node(node("a.py:helper", EntityType::Function)).await.unwrap();
        store.add_node(node("a.py:unrelated", EntityType::Function)).await.unwrap();
        store
            .add_edge(GraphEdgeView {
                source: EntityId::from("a.py:caller"),
                target: EntityId::from("a.py:helper"),
                rel_type: RelationType::Calls,
                weight: 1.0,
            })
            .await
            .unwrap();

        let analyzer = ImpactAnalyzer::default();
        let assessment = analyzer
            .calculate_blast_radius(
                &store,
                &EntityId::from("a.py:helper"),
                Some(ComplexityData { cyclomatic: 1.0, cognitive: 0.0 }),
                None,
            )
            .await
            .unwrap();

        assert_eq!(assessment.blast_radius, 1);
        assert_eq!(assessment.direct_callers, vec![EntityId::from("a.py:caller")]);
        assert!(assessment.indirect_callers.is_empty());
        assert!(assessment.affected_tests.is_empty());
        assert!(matches!(assessment.risk_level, RiskLevel::Low | RiskLevel::Medium));
    }

    #[tokio::test]
    async fn affected_test_entity_is_detected_by_name_prefix() {
        let mut store = InMemoryGraphStore::new();
        store.add_node(node("a.py:target", EntityType::Function)).await.unwrap();
        store.add_node(node("a.py:test_target_behavior", EntityType::Function)).await.unwrap();
        store
            .add_edge(GraphEdgeView {
                source: EntityId::from("a.py:test_target_behavior"),
                target: EntityId::from("a.py:target"),
                rel_type: RelationType::Calls,
                weight: 1.0,
            })
            .await
            .unwrap();

        let analyzer = ImpactAnalyzer::default();
        let assessment = analyzer
            .calculate_blast_radius(&store, &EntityId::from("a.py:target"), None, None)
            .await
            .unwrap();
        assert_eq!(assessment.affected_tests.len(), 1);
    }

    #[tokio::test]
    async fn risk_weights_cap_overall_score_at_one() {
        let mut store = InMemoryGraphStore::new();
        store.add_node(node("a.py:target", EntityType::Function)).await.unwrap();
        let analyzer = ImpactAnalyzer::default();
        let assessment = analyzer
            .calculate_blast_radius(
                &store,
                &EntityId::from("a.py:target"),
                Some(ComplexityData { cyclomatic: 100.0, cognitive: 100.0 }),
                Some(GitRiskData { change_frequency_risk: 1.0, bus_factor_risk: 1.0 }),
            )
            .await
            .unwrap();
        assert!(assessment.overall_risk_score <= 1.0);
    }

    #[tokio::test]
    async fn an_already_expired_deadline_cancels_blast_radius_calculation() {
        let mut store = InMemoryGraphStore::new();
        store.add_node(node("a.py:target", EntityType::Function)).await.unwrap();
        let analyzer = ImpactAnalyzer::default();
        let expired = Deadline::after(std::time::Duration::from_secs(0));
        std::thread::sleep(std::time::Duration::from_millis(5));

        let result = analyzer
            .calculate_blast_radius_cancellable(&store, &EntityId::from("a.py:target"), None, None, Some(expired))
            .await;
        assert!(matches!(result, Err(CodeGraphError::Cancelled)));
    }
}
