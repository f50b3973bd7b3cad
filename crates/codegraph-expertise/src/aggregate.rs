//! Aggregations over per-file expertise scores (§4.I): the expert recommendation for
//! a single target, and the repository-wide heatmap of module bus factor and
//! knowledge gaps.

use crate::scoring::ExpertiseScore;
use codegraph_core::ExpertiseConfig;
use std::collections::{HashMap, HashSet};

/// The primary expert for one target plus up to three alternates, ready to surface to
/// a caller asking "who should I ask about this?".
#[derive(Debug, Clone)]
pub struct ExpertRecommendation {
    pub target: String,
    pub primary_expert: Option<ExpertiseScore>,
    pub secondary_experts: Vec<ExpertiseScore>,
    pub recommendation_text: String,
    pub bus_factor: usize,
}

fn recommendation_text(score: &ExpertiseScore) -> String {
    let first_name = score
        .developer_name
        .split_whitespace()
        .next()
        .unwrap_or(&score.developer_name);
    let f = &score.factors;

    if f.architectural_changes > 0.5 {
        format!("Ask {first_name}, they architected this module")
    } else if f.refactor_depth > 0.5 {
        format!("Ask {first_name}, they deeply refactored this code")
    } else if f.bug_fixes > 0.5 {
        format!("Ask {first_name}, they've fixed many bugs here")
    } else if f.recency > 0.7 {
        format!("Ask {first_name}, they recently worked on this")
    } else if score.total_score > 0.6 {
        format!("Ask {first_name}, they're the primary expert on this code")
    } else {
        format!("Ask {first_name}, they're the most knowledgeable about this code")
    }
}

fn bus_factor(scores: &[ExpertiseScore], threshold: f64) -> usize {
    scores.iter().filter(|s| s.total_score >= threshold).count()
}

/// Builds a recommendation from a file's expertise scores, already sorted by
/// `total_score` descending. Scores 1..4 become the secondary experts (§4.I).
pub fn build_recommendation(target: &str, scores: &[ExpertiseScore], config: &ExpertiseConfig) -> ExpertRecommendation {
    let Some(primary) = scores.first() else {
        return ExpertRecommendation {
            target: target.to_string(),
            primary_expert: None,
            secondary_experts: Vec::new(),
            recommendation_text: format!("No experts found for {target}"),
            bus_factor: 0,
        };
    };

    let text = recommendation_text(primary);
    let secondary = scores.get(1..4.min(scores.len())).map(|s| s.to_vec()).unwrap_or_default();

    ExpertRecommendation {
        target: target.to_string(),
        primary_expert: Some(primary.clone()),
        secondary_experts: secondary,
        recommendation_text: text,
        bus_factor: bus_factor(scores, config.expert_confidence_threshold),
    }
}

/// A single module's (directory's) expertise snapshot within the heatmap.
#[derive(Debug, Clone)]
pub struct ModuleExpertise {
    pub module_path: String,
    pub experts: Vec<ExpertiseScore>,
    pub bus_factor: usize,
    pub top_expert_score: f64,
    pub has_knowledge_gap: bool,
}

#[derive(Debug, Clone)]
pub struct ExpertiseHeatmap {
    pub modules: HashMap<String, ModuleExpertise>,
    pub risk_areas: Vec<String>,
    pub knowledge_gaps: Vec<String>,
    pub total_files_analyzed: usize,
    pub total_developers: usize,
    pub average_bus_factor: f64,
}

fn directory_of(file_path: &str) -> String {
    match file_path.rfind('/') {
        Some(idx) => file_path[..idx].to_string(),
        None => String::new(),
    }
}

/// Builds the repository-wide heatmap (§4.I) from every file's expertise scores,
/// grouping files by their parent directory the way the teacher's in-memory store
/// groups module aggregates.
pub fn build_heatmap(scores_by_file: &HashMap<String, Vec<ExpertiseScore>>, config: &ExpertiseConfig) -> ExpertiseHeatmap {
    let mut dir_files: HashMap<String, Vec<&String>> = HashMap::new();
    for file_path in scores_by_file.keys() {
        dir_files.entry(directory_of(file_path)).or_default().push(file_path);
    }

    let mut modules = HashMap::new();
    let mut risk_areas = Vec::new();
    let mut knowledge_gaps = Vec::new();

    for (dir_path, files) in &dir_files {
        let mut dir_experts: Vec<ExpertiseScore> = files
            .iter()
            .flat_map(|f| scores_by_file.get(*f).into_iter().flatten().cloned())
            .collect();
        if dir_experts.is_empty() {
            continue;
        }
        dir_experts.sort_by(|a, b| b.total_score.partial_cmp(&a.total_score).unwrap());

        let significant: HashSet<&str> = dir_experts
            .iter()
            .filter(|s| s.total_score > config.expert_confidence_threshold)
            .map(|s| s.developer_email.as_str())
            .collect();
        let bus_factor = significant.len();

        let top_expert_score = dir_experts[0].total_score;
        let has_knowledge_gap = top_expert_score < config.knowledge_gap_threshold;

        if bus_factor <= config.bus_factor_warning_threshold as usize {
            risk_areas.push(dir_path.clone());
        }
        if has_knowledge_gap {
            knowledge_gaps.push(dir_path.clone());
        }

        dir_experts.truncate(5);
        modules.insert(
            dir_path.clone(),
            ModuleExpertise {
                module_path: dir_path.clone(),
                experts: dir_experts,
                bus_factor,
                top_expert_score,
                has_knowledge_gap,
            },
        );
    }

    let total_files_analyzed = scores_by_file.len();
    let total_developers: usize = scores_by_file
        .values()
        .flatten()
        .map(|s| s.developer_email.as_str())
        .collect::<HashSet<_>>()
        .len();
    let average_bus_factor = if modules.is_empty() {
        0.0
    } else {
        modules.values().map(|m| m.bus_factor as f64).sum::<f64>() / modules.len() as f64
    };

    ExpertiseHeatmap {
        modules,
        risk_areas,
        knowledge_gaps,
        total_files_analyzed,
        total_developers,
        average_bus_factor,
    }
}

/// Files whose best-scoring contributor still falls below the knowledge-gap
/// threshold — nobody has clear ownership (§4.I).
pub fn knowledge_gap_files(scores_by_file: &HashMap<String, Vec<ExpertiseScore>>, threshold: f64) -> Vec<String> {
    scores_by_file
        .iter()
        .filter(|(_, scores)| {
            scores.is_empty() || scores.iter().map(|s| s.total_score).fold(0.0, f64::max) < threshold
        })
        .map(|(path, _)| path.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::FactorScores;

    fn score(email: &str, name: &str, total: f64) -> ExpertiseScore {
        ExpertiseScore {
            developer_email: email.to_string(),
            developer_name: name.to_string(),
            target_path: "a.py".to_string(),
            total_score: total,
            factors: FactorScores::default(),
            confidence: 0.8,
            reasoning: String::new(),
            commit_count: 5,
            last_activity: None,
        }
    }

    #[test]
    fn top_scorer_becomes_primary_expert() {
        let config = ExpertiseConfig::default();
        let scores = vec![score("a@x.com", "Alice", 0.8), score("b@x.com", "Bob", 0.4)];
        let rec = build_recommendation("a.py", &scores, &config);
        assert_eq!(rec.primary_expert.unwrap().developer_email, "a@x.com");
        assert_eq!(rec.secondary_experts.len(), 1);
    }

    #[test]
    fn no_scores_yields_empty_recommendation() {
        let config = ExpertiseConfig::default();
        let rec = build_recommendation("a.py", &[], &config);
        assert!(rec.primary_expert.is_none());
        assert_eq!(rec.bus_factor, 0);
    }

    #[test]
    fn single_expert_directory_is_flagged_as_a_risk_area() {
        let config = ExpertiseConfig::default();
        let mut by_file = HashMap::new();
        by_file.insert("src/app/a.py".to_string(), vec![score("a@x.com", "Alice", 0.9)]);
        by_file.insert("src/app/b.py".to_string(), vec![score("a@x.com", "Alice", 0.85)]);

        let heatmap = build_heatmap(&by_file, &config);
        assert!(heatmap.risk_areas.contains(&"src/app".to_string()));
        assert_eq!(heatmap.total_developers, 1);
    }

    #[test]
    fn directory_with_no_strong_expert_is_a_knowledge_gap() {
        let config = ExpertiseConfig::default();
        let mut by_file = HashMap::new();
        by_file.insert("src/app/a.py".to_string(), vec![score("a@x.com", "Alice", 0.1)]);

        let heatmap = build_heatmap(&by_file, &config);
        assert!(heatmap.knowledge_gaps.contains(&"src/app".to_string()));
    }
}
