//! Git history risk signals (§4.I history analyzer): `change_frequency_risk` and
//! `bus_factor_risk` per file, computed once and cached — consumed directly by
//! `codegraph-impact` as the `GitRiskData` the blast-radius scorer prefers over its
//! graph-shape fallbacks.

use chrono::Utc;
use codegraph_core::{CodeGraphError, Deadline, GitHistoryConfig, GitProvider, Result};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileRiskMetrics {
    pub touches: usize,
    pub distinct_authors: usize,
    pub recent_touch_ratio: f64,
    pub days_since_last_change: i64,
}

/// Scans git history once (per `GitHistoryConfig::max_commits_scanned` commits per
/// file) and caches the resulting per-file risk signals; read-only thereafter (§5
/// shared-resources rule).
pub struct GitHistoryAnalyzer {
    config: GitHistoryConfig,
    cache: Mutex<HashMap<String, FileRiskMetrics>>,
    max_touches: Mutex<usize>,
}

impl GitHistoryAnalyzer {
    pub fn new(config: GitHistoryConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(HashMap::new()),
            max_touches: Mutex::new(1),
        }
    }

    /// Populates the cache for every file the provider tracks. Each file's touches are
    /// fetched independently through the `GitProvider` port (§6); `max_commits_scanned`
    /// bounds how deep each per-file scan goes.
    pub async fn analyze_repository(&self, provider: &dyn GitProvider) -> Result<()> {
        self.analyze_repository_cancellable(provider, None).await
    }

    /// Cancellation-aware variant of [`Self::analyze_repository`] (§5). The deadline is
    /// checked at each file's commit boundary; on expiry the partially populated cache
    /// is dropped by returning `Cancelled` before it is handed to a caller.
    pub async fn analyze_repository_cancellable(
        &self,
        provider: &dyn GitProvider,
        deadline: Option<Deadline>,
    ) -> Result<()> {
        let files = provider.all_tracked_files().await?;
        for file in files {
            if let Some(d) = deadline {
                if d.is_expired() {
                    return Err(CodeGraphError::Cancelled);
                }
            }
            self.analyze_file(provider, &file).await?;
        }
        debug!(files = self.cache.lock().unwrap().len(), "git history analysis complete");
        Ok(())
    }

    /// Computes and caches risk metrics for a single file, without requiring the rest
    /// of the repository to have been scanned.
    pub async fn analyze_file(&self, provider: &dyn GitProvider, file_path: &str) -> Result<FileRiskMetrics> {
        let touches = provider
            .commits_touching_file(file_path, self.config.max_commits_scanned)
            .await?;

        let total = touches.len();
        let now = Utc::now();
        let window = chrono::Duration::days(self.config.recent_change_window_days);

        let distinct_authors: HashSet<&str> = touches.iter().map(|t| t.author_email.as_str()).collect();
        let recent = touches.iter().filter(|t| now - t.timestamp <= window).count();
        let recent_touch_ratio = if total > 0 { recent as f64 / total as f64 } else { 0.0 };
        let days_since_last_change = touches
            .iter()
            .map(|t| (now - t.timestamp).num_days())
            .min()
            .unwrap_or(365);

        let metrics = FileRiskMetrics {
            touches: total,
            distinct_authors: distinct_authors.len(),
            recent_touch_ratio,
            days_since_last_change,
        };

        {
            let mut max_touches = self.max_touches.lock().unwrap();
            *max_touches = (*max_touches).max(total);
        }
        self.cache.lock().unwrap().insert(file_path.to_string(), metrics);

        Ok(metrics)
    }

    /// `change_frequency_risk(file)` (§4.I): 0.6 touches-share + 0.4 recency-ratio.
    /// Unknown files get the neutral default 0.3.
    pub fn change_frequency_risk(&self, file_path: &str) -> f64 {
        let cache = self.cache.lock().unwrap();
        let Some(metrics) = cache.get(file_path) else {
            return 0.3;
        };
        let max_touches = (*self.max_touches.lock().unwrap()).max(1) as f64;
        let frequency_score = (metrics.touches as f64 / max_touches).min(1.0);
        (frequency_score * 0.6 + metrics.recent_touch_ratio * 0.4).min(1.0)
    }

    /// `bus_factor_risk(file)` (§4.I): piecewise on distinct-author count. Unknown
    /// files get the neutral default 0.5.
    pub fn bus_factor_risk(&self, file_path: &str) -> f64 {
        let cache = self.cache.lock().unwrap();
        let Some(metrics) = cache.get(file_path) else {
            return 0.5;
        };
        match metrics.distinct_authors {
            0 | 1 => 1.0,
            2 => 0.7,
            3 => 0.4,
            4 => 0.2,
            _ => 0.1,
        }
    }

    pub fn metrics_for(&self, file_path: &str) -> Option<FileRiskMetrics> {
        self.cache.lock().unwrap().get(file_path).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration;
    use codegraph_core::{BlameLine, CommitTouch, DiffStats};

    struct FakeProvider {
        touches: Vec<CommitTouch>,
    }

    #[async_trait]
    impl GitProvider for FakeProvider {
        async fn commits_touching_file(&self, _file_path: &str, max_count: usize) -> Result<Vec<CommitTouch>> {
            Ok(self.touches.iter().take(max_count).cloned().collect())
        }
        async fn file_blame_by_line(&self, _file_path: &str) -> Result<Vec<BlameLine>> {
            Ok(vec![])
        }
        async fn commit_diff_stats(&self, _commit_hash: &str) -> Result<DiffStats> {
            Ok(DiffStats::default())
        }
        async fn all_tracked_files(&self) -> Result<Vec<String>> {
            Ok(vec!["a.py".to_string()])
        }
        async fn file_contents_at(&self, _file_path: &str, _commit_hash: Option<&str>) -> Result<String> {
            Ok(String::new())
        }
        async fn all_contributors(&self, _file_path: Option<&str>) -> Result<Vec<String>> {
            Ok(vec![])
        }
    }

    fn touch(author: &str, days_ago: i64) -> CommitTouch {
        CommitTouch {
            hash: "abc".to_string(),
            author_name: author.to_string(),
            author_email: author.to_string(),
            timestamp: Utc::now() - Duration::days(days_ago),
            message: "fix bug".to_string(),
            files_changed: vec!["a.py".to_string()],
            lines_added: 1,
            lines_deleted: 0,
        }
    }

    #[tokio::test]
    async fn single_author_file_has_max_bus_factor_risk() {
        let provider = FakeProvider {
            touches: vec![touch("alice", 1), touch("alice", 10)],
        };
        let analyzer = GitHistoryAnalyzer::new(GitHistoryConfig::default());
        analyzer.analyze_file(&provider, "a.py").await.unwrap();
        assert_eq!(analyzer.bus_factor_risk("a.py"), 1.0);
    }

    #[tokio::test]
    async fn unknown_file_gets_neutral_defaults() {
        let analyzer = GitHistoryAnalyzer::new(GitHistoryConfig::default());
        assert_eq!(analyzer.change_frequency_risk("nope.py"), 0.3);
        assert_eq!(analyzer.bus_factor_risk("nope.py"), 0.5);
    }

    #[tokio::test]
    async fn an_already_expired_deadline_cancels_repository_analysis() {
        let provider = FakeProvider {
            touches: vec![touch("alice", 1)],
        };
        let analyzer = GitHistoryAnalyzer::new(GitHistoryConfig::default());
        let expired = Deadline::after(std::time::Duration::from_secs(0));
        std::thread::sleep(std::time::Duration::from_millis(5));

        let result = analyzer.analyze_repository_cancellable(&provider, Some(expired)).await;
        assert!(matches!(result, Err(CodeGraphError::Cancelled)));
    }

    #[tokio::test]
    async fn four_distinct_authors_give_low_bus_factor_risk() {
        let provider = FakeProvider {
            touches: vec![touch("a", 1), touch("b", 2), touch("c", 3), touch("d", 4)],
        };
        let analyzer = GitHistoryAnalyzer::new(GitHistoryConfig::default());
        analyzer.analyze_file(&provider, "a.py").await.unwrap();
        assert_eq!(analyzer.bus_factor_risk("a.py"), 0.2);
    }
}
