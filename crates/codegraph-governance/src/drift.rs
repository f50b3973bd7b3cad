use crate::classifier::LayerClassifier;
use crate::config::GovernanceConfig;
use crate::validator::{validate_repository, RepositoryValidationResult};
use chrono::{DateTime, Utc};
use codegraph_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A point-in-time snapshot of architectural health (§4.H drift detector, §6 baseline
/// metrics file).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftMetrics {
    pub timestamp: DateTime<Utc>,
    pub coupling_score: f64,
    pub cohesion_score: f64,
    pub violation_count: usize,
    pub layer_balance: HashMap<String, f64>,
    pub dependency_depth: usize,
}

/// Per-field deltas between a baseline and the current snapshot.
#[derive(Debug, Clone, Default)]
pub struct DriftIndicators {
    pub coupling_increase: f64,
    pub cohesion_decrease: f64,
    pub violation_increase: i64,
    pub balance_drift: f64,
    pub depth_increase: i64,
}

#[derive(Debug, Clone)]
pub struct DriftReport {
    pub baseline: Option<DriftMetrics>,
    pub current: DriftMetrics,
    pub drift_score: f64,
    pub indicators: Option<DriftIndicators>,
    pub recommendations: Vec<String>,
}

fn compute_layer_balance(root: &Path, config: &GovernanceConfig, classifier: &LayerClassifier) -> (HashMap<String, f64>, usize) {
    let mut layer_files: HashMap<String, usize> = HashMap::new();
    let mut total_files = 0usize;

    let scan_config = codegraph_parser::ScanConfig {
        exclude_patterns: config.exclude_patterns.clone(),
    };
    let Ok(parsed_files) = codegraph_parser::scan_repository(root, &scan_config) else {
        return (HashMap::new(), 0);
    };

    for parsed in &parsed_files {
        let relative_path = std::path::PathBuf::from(&parsed.file_path)
            .strip_prefix(root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| parsed.file_path.replace('\\', "/"));

        if let Some(layer) = classifier.classify(&relative_path) {
            *layer_files.entry(layer).or_insert(0) += 1;
        }
        total_files += 1;
    }

    let mut layer_balance = HashMap::new();
    if total_files > 0 {
        for (layer, count) in layer_files {
            layer_balance.insert(layer, (count as f64 / total_files as f64 * 1000.0).round() / 1000.0);
        }
    }

    (layer_balance, total_files)
}

/// Count of distinct layers that appear on either side of any violation — a simplified
/// stand-in for maximum dependency-chain depth (§4.H).
fn dependency_depth(result: &RepositoryValidationResult) -> usize {
    let mut layers: HashSet<&str> = HashSet::new();
    for violation in result.all_violations() {
        layers.insert(&violation.from_layer);
        layers.insert(&violation.to_layer);
    }
    layers.len()
}

/// Computes a [`DriftMetrics`] snapshot for `root` under `config` (§4.H).
pub fn calculate_metrics(root: &Path, config: &GovernanceConfig, now: DateTime<Utc>) -> Result<DriftMetrics> {
    let classifier = LayerClassifier::new(config);
    let validation_result = validate_repository(root, config)?;
    let (layer_balance, _total_files) = compute_layer_balance(root, config, &classifier);

    let total_imports = validation_result.total_imports;
    let coupling_score = if total_imports > 0 {
        let violation_weight = validation_result.total_violations() as f64 + validation_result.total_warnings() as f64 * 0.5;
        (violation_weight / total_imports as f64).min(1.0)
    } else {
        0.0
    };
    let cohesion_score = 1.0 - coupling_score;

    Ok(DriftMetrics {
        timestamp: now,
        coupling_score: (coupling_score * 1000.0).round() / 1000.0,
        cohesion_score: (cohesion_score * 1000.0).round() / 1000.0,
        violation_count: validation_result.total_violations(),
        layer_balance,
        dependency_depth: dependency_depth(&validation_result),
    })
}

fn calculate_indicators(baseline: &DriftMetrics, current: &DriftMetrics) -> DriftIndicators {
    let coupling_increase = current.coupling_score - baseline.coupling_score;
    let cohesion_decrease = baseline.cohesion_score - current.cohesion_score;
    let violation_increase = current.violation_count as i64 - baseline.violation_count as i64;

    let mut all_layers: HashSet<&String> = baseline.layer_balance.keys().collect();
    all_layers.extend(current.layer_balance.keys());
    let balance_drift: f64 = all_layers
        .into_iter()
        .map(|layer| {
            let old = baseline.layer_balance.get(layer).copied().unwrap_or(0.0);
            let new = current.layer_balance.get(layer).copied().unwrap_or(0.0);
            (new - old).abs()
        })
        .sum();

    let depth_increase = current.dependency_depth as i64 - baseline.dependency_depth as i64;

    DriftIndicators {
        coupling_increase: (coupling_increase * 1000.0).round() / 1000.0,
        cohesion_decrease: (cohesion_decrease * 1000.0).round() / 1000.0,
        violation_increase,
        balance_drift: (balance_drift * 1000.0).round() / 1000.0,
        depth_increase,
    }
}

/// Weighted sum of normalised deltas (§4.H): violation-count deltas clip to [0, 10],
/// depth deltas clip to [0, 3]; all other deltas are already roughly 0-1.
fn drift_score(indicators: &DriftIndicators) -> f64 {
    let coupling = indicators.coupling_increase.max(0.0).min(1.0);
    let cohesion = indicators.cohesion_decrease.max(0.0).min(1.0);
    let violations = if indicators.violation_increase > 0 {
        (indicators.violation_increase as f64 / 10.0).min(1.0)
    } else {
        0.0
    };
    let balance = indicators.balance_drift.max(0.0).min(1.0);
    let depth = if indicators.depth_increase > 0 {
        (indicators.depth_increase as f64 / 3.0).min(1.0)
    } else {
        0.0
    };

    (coupling * 0.25 + cohesion * 0.20 + violations * 0.30 + balance * 0.15 + depth * 0.10).min(1.0)
}

fn recommendations_for(indicators: &DriftIndicators, current: &DriftMetrics) -> Vec<String> {
    let mut out = Vec::new();
    if indicators.coupling_increase > 0.1 {
        out.push("coupling has increased significantly; review new cross-layer imports".to_string());
    }
    if indicators.violation_increase > 0 {
        out.push(format!(
            "{} new architecture violations detected; address these before they accumulate",
            indicators.violation_increase
        ));
    }
    if indicators.balance_drift > 0.2 {
        out.push("code distribution across layers has shifted; ensure new code lands in the right layer".to_string());
    }
    if current.violation_count > 5 {
        out.push("consider refactoring to bring the violation count back under 5".to_string());
    }
    if out.is_empty() {
        out.push("architecture is stable; no significant drift detected".to_string());
    }
    out
}

/// Detects drift between `baseline` (if any) and the current state of `root` (§4.H).
/// A missing baseline reports the current snapshot only, with a zero drift score.
pub fn detect_drift(
    root: &Path,
    config: &GovernanceConfig,
    baseline: Option<DriftMetrics>,
    now: DateTime<Utc>,
) -> Result<DriftReport> {
    let current = calculate_metrics(root, config, now)?;

    let Some(baseline) = baseline else {
        return Ok(DriftReport {
            baseline: None,
            current,
            drift_score: 0.0,
            indicators: None,
            recommendations: vec!["no baseline found; save one to start tracking drift".to_string()],
        });
    };

    let indicators = calculate_indicators(&baseline, &current);
    let score = drift_score(&indicators);
    let recommendations = recommendations_for(&indicators, &current);

    Ok(DriftReport {
        baseline: Some(baseline),
        current,
        drift_score: (score * 1000.0).round() / 1000.0,
        indicators: Some(indicators),
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()
    }

    /// Spec scenario: identical baseline and current snapshots produce a zero drift score.
    #[test]
    fn identical_snapshots_give_zero_drift() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/api")).unwrap();
        fs::write(dir.path().join("app/api/routes.py"), "def handler():\n    pass\n").unwrap();

        let config = GovernanceConfig::clean_architecture().unwrap();
        let baseline = calculate_metrics(dir.path(), &config, ts()).unwrap();
        let report = detect_drift(dir.path(), &config, Some(baseline), ts()).unwrap();

        assert_eq!(report.drift_score, 0.0);
    }

    #[test]
    fn missing_baseline_reports_zero_score_with_note() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        let config = GovernanceConfig::clean_architecture().unwrap();
        let report = detect_drift(dir.path(), &config, None, ts()).unwrap();
        assert_eq!(report.drift_score, 0.0);
        assert!(report.baseline.is_none());
        assert_eq!(report.recommendations.len(), 1);
    }
}
