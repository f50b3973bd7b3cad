//! Expertise scoring (§4.I): seven weighted factors combine into a single score per
//! developer per file, plus a confidence estimate and a phrasebook-generated
//! explanation.

use crate::commit_type::{classify_commit, CommitType};
use chrono::{DateTime, Utc};
use codegraph_core::{CommitTouch, ExpertiseConfig};

/// A commit already tagged with its [`CommitType`] — the unit every scoring factor
/// consumes.
#[derive(Debug, Clone)]
pub struct ClassifiedCommit {
    pub touch: CommitTouch,
    pub kind: CommitType,
}

impl ClassifiedCommit {
    pub fn total_lines_changed(&self) -> u64 {
        self.touch.lines_added + self.touch.lines_deleted
    }
}

pub fn classify_commits(touches: Vec<CommitTouch>, config: &ExpertiseConfig) -> Vec<ClassifiedCommit> {
    touches
        .into_iter()
        .map(|touch| {
            let kind = classify_commit(&touch.message, &config.keywords);
            ClassifiedCommit { touch, kind }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FactorScores {
    pub commit_frequency: f64,
    pub lines_changed: f64,
    pub refactor_depth: f64,
    pub architectural_changes: f64,
    pub bug_fixes: f64,
    pub recency: f64,
    pub code_review_participation: f64,
}

#[derive(Debug, Clone)]
pub struct ExpertiseScore {
    pub developer_email: String,
    pub developer_name: String,
    pub target_path: String,
    pub total_score: f64,
    pub factors: FactorScores,
    pub confidence: f64,
    pub reasoning: String,
    pub commit_count: usize,
    pub last_activity: Option<DateTime<Utc>>,
}

fn commit_frequency(dev: &[ClassifiedCommit], all: &[ClassifiedCommit]) -> f64 {
    if all.is_empty() {
        return 0.0;
    }
    (dev.len() as f64 / all.len() as f64 * 2.0).min(1.0)
}

fn lines_changed(dev: &[ClassifiedCommit], all: &[ClassifiedCommit]) -> f64 {
    let total_lines: u64 = all.iter().map(|c| c.total_lines_changed()).sum();
    if total_lines == 0 {
        return 0.0;
    }
    let dev_lines: u64 = dev.iter().map(|c| c.total_lines_changed()).sum();
    (1.5 * (dev_lines as f64 / total_lines as f64).sqrt()).min(1.0)
}

fn refactor_depth(dev: &[ClassifiedCommit], all: &[ClassifiedCommit]) -> f64 {
    let dev_refactors: Vec<&ClassifiedCommit> = dev.iter().filter(|c| c.kind == CommitType::Refactor).collect();
    if dev_refactors.is_empty() {
        return 0.0;
    }
    let all_refactors: Vec<&ClassifiedCommit> = all.iter().filter(|c| c.kind == CommitType::Refactor).collect();
    let all_refactor_count = all_refactors.len().max(1) as f64;
    let all_refactor_lines = all_refactors.iter().map(|c| c.total_lines_changed()).sum::<u64>().max(1) as f64;

    let count_ratio = dev_refactors.len() as f64 / all_refactor_count;
    let size_ratio = dev_refactors.iter().map(|c| c.total_lines_changed()).sum::<u64>() as f64 / all_refactor_lines;

    (count_ratio * 0.4 + size_ratio * 0.6).min(1.0)
}

fn architectural_changes(dev: &[ClassifiedCommit], all: &[ClassifiedCommit]) -> f64 {
    let dev_arch = dev.iter().filter(|c| c.kind == CommitType::Architectural).count();
    if dev_arch == 0 {
        return 0.0;
    }
    let all_arch = all.iter().filter(|c| c.kind == CommitType::Architectural).count().max(1);
    (dev_arch as f64 / all_arch as f64 * 1.5).min(1.0)
}

fn bug_fixes(dev: &[ClassifiedCommit], all: &[ClassifiedCommit]) -> f64 {
    let dev_fixes = dev.iter().filter(|c| c.kind == CommitType::BugFix).count();
    if dev_fixes == 0 {
        return 0.0;
    }
    let all_fixes = all.iter().filter(|c| c.kind == CommitType::BugFix).count().max(1);
    (dev_fixes as f64 / all_fixes as f64).min(1.0)
}

fn recency(dev: &[ClassifiedCommit], now: DateTime<Utc>, half_life_days: f64) -> f64 {
    let Some(most_recent) = dev.iter().map(|c| c.touch.timestamp).max() else {
        return 0.0;
    };
    let days_since = (now - most_recent).num_days().max(0) as f64;
    let decay_rate = std::f64::consts::LN_2 / half_life_days;
    (-decay_rate * days_since).exp().clamp(0.0, 1.0)
}

fn code_review_participation(dev: &[ClassifiedCommit], all: &[ClassifiedCommit]) -> f64 {
    // No review metadata reaches the core through the git provider port (§6), so this
    // always takes the proxy branch: half credit for the developer's share of commits.
    if dev.is_empty() || all.is_empty() {
        return 0.0;
    }
    (dev.len() as f64 / all.len() as f64) * 0.5
}

fn confidence(dev: &[ClassifiedCommit], now: DateTime<Utc>, min_commits_for_expertise: u32) -> f64 {
    if dev.is_empty() {
        return 0.0;
    }
    let commit_factor = (dev.len() as f64 / (min_commits_for_expertise as f64 * 3.0)).min(1.0);

    let most_recent = dev.iter().map(|c| c.touch.timestamp).max().unwrap();
    let days_since = (now - most_recent).num_days() as f64;
    let recency_factor = (1.0 - days_since / 365.0).max(0.0);

    let mut kinds = 0;
    let has_refactor = dev.iter().any(|c| c.kind == CommitType::Refactor);
    let has_bug_fix = dev.iter().any(|c| c.kind == CommitType::BugFix);
    let has_architectural = dev.iter().any(|c| c.kind == CommitType::Architectural);
    let has_other = dev
        .iter()
        .any(|c| !matches!(c.kind, CommitType::Refactor | CommitType::BugFix | CommitType::Architectural));
    kinds += has_refactor as u8 as i32;
    kinds += has_bug_fix as u8 as i32;
    kinds += has_architectural as u8 as i32;
    kinds += has_other as u8 as i32;
    let diversity_factor = kinds as f64 / 4.0;

    (commit_factor * 0.5 + recency_factor * 0.3 + diversity_factor * 0.2).clamp(0.0, 1.0)
}

/// Builds the explanation text from a fixed phrasebook keyed on the top two factors
/// above 0.3 (§4.I).
fn reasoning_text(developer_name: &str, factors: &FactorScores, confidence: f64) -> String {
    let first_name = developer_name.split_whitespace().next().unwrap_or(developer_name);

    let mut scored: Vec<(&str, f64)> = vec![
        ("commit_frequency", factors.commit_frequency),
        ("lines_changed", factors.lines_changed),
        ("refactor_depth", factors.refactor_depth),
        ("architectural_changes", factors.architectural_changes),
        ("bug_fixes", factors.bug_fixes),
        ("recency", factors.recency),
        ("code_review_participation", factors.code_review_participation),
    ];
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    let top_factors: Vec<(&str, f64)> = scored.into_iter().filter(|(_, score)| *score > 0.3).collect();

    if top_factors.is_empty() {
        return if confidence < 0.3 {
            format!("insufficient data to determine {first_name}'s expertise level")
        } else {
            format!("{first_name} has limited involvement with this code")
        };
    }

    let mut reasons = Vec::new();
    for (name, score) in top_factors.iter().take(2) {
        let phrase = match (*name, *score) {
            ("refactor_depth", s) if s > 0.5 => Some("deeply refactored this code"),
            ("architectural_changes", s) if s > 0.5 => Some("made significant architectural contributions"),
            ("bug_fixes", s) if s > 0.4 => Some("fixed numerous bugs here"),
            ("commit_frequency", s) if s > 0.5 => Some("is a frequent contributor"),
            ("recency", s) if s > 0.7 => Some("has recent active involvement"),
            ("lines_changed", s) if s > 0.5 => Some("has made substantial code changes"),
            _ => None,
        };
        if let Some(phrase) = phrase {
            reasons.push(phrase);
        }
    }

    if reasons.is_empty() {
        format!("{first_name} has contributed to this code")
    } else {
        format!("{first_name} {}", reasons.join(" and "))
    }
}

/// Computes a developer's expertise score for one file (§4.I: seven weighted factors,
/// confidence, reasoning).
pub fn score_expertise(
    config: &ExpertiseConfig,
    developer_email: &str,
    developer_name: &str,
    target_path: &str,
    dev_commits: &[ClassifiedCommit],
    all_commits: &[ClassifiedCommit],
    now: DateTime<Utc>,
) -> ExpertiseScore {
    let factors = FactorScores {
        commit_frequency: commit_frequency(dev_commits, all_commits),
        lines_changed: lines_changed(dev_commits, all_commits),
        refactor_depth: refactor_depth(dev_commits, all_commits),
        architectural_changes: architectural_changes(dev_commits, all_commits),
        bug_fixes: bug_fixes(dev_commits, all_commits),
        recency: recency(dev_commits, now, config.recency_half_life_days),
        code_review_participation: code_review_participation(dev_commits, all_commits),
    };

    let w = &config.weights;
    let total_score = (factors.commit_frequency * w.commit_frequency
        + factors.lines_changed * w.lines_changed
        + factors.refactor_depth * w.refactor_depth
        + factors.architectural_changes * w.architectural_changes
        + factors.bug_fixes * w.bug_fixes
        + factors.recency * w.recency
        + factors.code_review_participation * w.code_review_participation)
        .min(1.0);

    let confidence_score = confidence(dev_commits, now, config.min_commits_for_expertise);
    let reasoning = reasoning_text(developer_name, &factors, confidence_score);
    let last_activity = dev_commits.iter().map(|c| c.touch.timestamp).max();

    ExpertiseScore {
        developer_email: developer_email.to_string(),
        developer_name: developer_name.to_string(),
        target_path: target_path.to_string(),
        total_score,
        factors,
        confidence: confidence_score,
        reasoning,
        commit_count: dev_commits.len(),
        last_activity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn commit(author: &str, kind_hint: &str, lines: u64, days_ago: i64) -> CommitTouch {
        CommitTouch {
            hash: "abc".to_string(),
            author_name: author.to_string(),
            author_email: format!("{author}@example.com"),
            timestamp: Utc::now() - Duration::days(days_ago),
            message: kind_hint.to_string(),
            files_changed: vec!["a.py".to_string()],
            lines_added: lines,
            lines_deleted: 0,
        }
    }

    #[test]
    fn sole_recent_refactorer_scores_high_with_confident_reasoning() {
        let config = ExpertiseConfig::default();
        let touches = vec![
            commit("alice", "refactor the module structure", 200, 1),
            commit("alice", "refactor again", 150, 5),
            commit("alice", "refactor cleanup", 100, 10),
        ];
        let classified = classify_commits(touches, &config);

        let score = score_expertise(
            &config,
            "alice@example.com",
            "Alice Smith",
            "a.py",
            &classified,
            &classified,
            Utc::now(),
        );

        assert!(score.total_score > 0.5, "expected high score, got {}", score.total_score);
        assert!(score.confidence > 0.0);
        assert!(score.reasoning.contains("Alice"));
    }

    #[test]
    fn developer_with_no_commits_scores_zero() {
        let config = ExpertiseConfig::default();
        let score = score_expertise(&config, "bob@example.com", "Bob", "a.py", &[], &[], Utc::now());
        assert_eq!(score.total_score, 0.0);
        assert_eq!(score.confidence, 0.0);
    }

    /// Spec scenario: recency factor decays by exactly half after one half-life.
    #[test]
    fn recency_factor_decays_to_half_at_half_life() {
        let config = ExpertiseConfig::default();
        let touches = vec![commit("alice", "fix bug", 10, config.recency_half_life_days as i64)];
        let classified = classify_commits(touches, &config);
        let score = score_expertise(
            &config,
            "alice@example.com",
            "Alice",
            "a.py",
            &classified,
            &classified,
            Utc::now(),
        );
        assert!((score.factors.recency - 0.5).abs() < 0.01);
    }
}
