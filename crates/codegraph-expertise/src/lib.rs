//! Ownership and expertise analysis (§4.I): git history risk signals, commit
//! classification, per-developer expertise scoring, and the repository-wide
//! heatmap/recommendation aggregations built on top of them.

pub mod aggregate;
pub mod commit_type;
pub mod history;
pub mod local_git;
pub mod scoring;

pub use aggregate::{build_heatmap, build_recommendation, knowledge_gap_files, ExpertRecommendation, ExpertiseHeatmap, ModuleExpertise};
pub use commit_type::{classify_commit, CommitType};
pub use history::{FileRiskMetrics, GitHistoryAnalyzer};
pub use local_git::LocalGitProvider;
pub use scoring::{classify_commits, score_expertise, ClassifiedCommit, ExpertiseScore, FactorScores};
