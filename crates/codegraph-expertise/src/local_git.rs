//! [`GitProvider`] adapter over `git2` (§4.I, §6). Mirrors the teacher's
//! `codegraph-git::GitRepository` in opening a repository by path and mapping `git2`
//! errors into the core's error type rather than leaking the `git2` error type upward.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use codegraph_core::{BlameLine, CodeGraphError, CommitTouch, DiffStats, GitProvider, Result};
use git2::{DiffOptions, Repository};
use std::path::{Path, PathBuf};

pub struct LocalGitProvider {
    path: PathBuf,
    repo: Repository,
}

fn to_external_error(provider: &str, cause: impl std::fmt::Display) -> CodeGraphError {
    CodeGraphError::ExternalProviderError {
        provider: provider.to_string(),
        cause: cause.to_string(),
    }
}

fn commit_timestamp(commit: &git2::Commit) -> DateTime<Utc> {
    let time = commit.time();
    Utc.timestamp_opt(time.seconds(), 0).single().unwrap_or_else(Utc::now)
}

impl LocalGitProvider {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let repo = Repository::discover(path_ref).map_err(|e| to_external_error("git", e))?;
        Ok(Self {
            path: path_ref.to_path_buf(),
            repo,
        })
    }

    fn diff_stats_for_path(&self, commit: &git2::Commit, file_path: &str) -> Result<(u64, u64)> {
        let tree = commit.tree().map_err(|e| to_external_error("git", e))?;
        let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());

        let mut opts = DiffOptions::new();
        opts.pathspec(file_path);

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))
            .map_err(|e| to_external_error("git", e))?;

        let stats = diff.stats().map_err(|e| to_external_error("git", e))?;
        Ok((stats.insertions() as u64, stats.deletions() as u64))
    }

    fn commit_touches_path(&self, commit: &git2::Commit, file_path: &str) -> Result<bool> {
        let tree = commit.tree().map_err(|e| to_external_error("git", e))?;
        let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());

        let mut opts = DiffOptions::new();
        opts.pathspec(file_path);

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut opts))
            .map_err(|e| to_external_error("git", e))?;
        Ok(diff.deltas().len() > 0)
    }
}

#[async_trait]
impl GitProvider for LocalGitProvider {
    async fn commits_touching_file(&self, file_path: &str, max_count: usize) -> Result<Vec<CommitTouch>> {
        let mut revwalk = self.repo.revwalk().map_err(|e| to_external_error("git", e))?;
        revwalk.push_head().map_err(|e| to_external_error("git", e))?;
        revwalk
            .set_sorting(git2::Sort::TIME)
            .map_err(|e| to_external_error("git", e))?;

        let mut touches = Vec::new();
        for oid in revwalk {
            if touches.len() >= max_count {
                break;
            }
            let oid = oid.map_err(|e| to_external_error("git", e))?;
            let commit = self.repo.find_commit(oid).map_err(|e| to_external_error("git", e))?;

            if !self.commit_touches_path(&commit, file_path)? {
                continue;
            }

            let (lines_added, lines_deleted) = self.diff_stats_for_path(&commit, file_path)?;
            let author = commit.author();

            touches.push(CommitTouch {
                hash: oid.to_string(),
                author_name: author.name().unwrap_or("unknown").to_string(),
                author_email: author.email().unwrap_or("unknown").to_string(),
                timestamp: commit_timestamp(&commit),
                message: commit.message().unwrap_or("").to_string(),
                files_changed: vec![file_path.to_string()],
                lines_added,
                lines_deleted,
            });
        }

        Ok(touches)
    }

    async fn file_blame_by_line(&self, file_path: &str) -> Result<Vec<BlameLine>> {
        let blame = self
            .repo
            .blame_file(Path::new(file_path), None)
            .map_err(|e| to_external_error("git", e))?;

        let mut lines = Vec::new();
        for hunk in blame.iter() {
            let commit_oid = hunk.final_commit_id();
            let commit = self.repo.find_commit(commit_oid).map_err(|e| to_external_error("git", e))?;
            let author_email = commit.author().email().unwrap_or("unknown").to_string();

            for offset in 0..hunk.lines_in_hunk() {
                lines.push(BlameLine {
                    line_number: hunk.final_start_line() as u32 + offset as u32,
                    commit_hash: commit_oid.to_string(),
                    author_email: author_email.clone(),
                });
            }
        }
        Ok(lines)
    }

    async fn commit_diff_stats(&self, commit_hash: &str) -> Result<DiffStats> {
        let oid = git2::Oid::from_str(commit_hash).map_err(|e| to_external_error("git", e))?;
        let commit = self.repo.find_commit(oid).map_err(|e| to_external_error("git", e))?;
        let tree = commit.tree().map_err(|e| to_external_error("git", e))?;
        let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());

        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(|e| to_external_error("git", e))?;
        let stats = diff.stats().map_err(|e| to_external_error("git", e))?;

        Ok(DiffStats {
            lines_added: stats.insertions() as u64,
            lines_deleted: stats.deletions() as u64,
            files_changed: stats.files_changed() as u64,
        })
    }

    async fn all_tracked_files(&self) -> Result<Vec<String>> {
        let head = self.repo.head().map_err(|e| to_external_error("git", e))?;
        let tree = head.peel_to_tree().map_err(|e| to_external_error("git", e))?;

        let mut files = Vec::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) {
                let name = entry.name().unwrap_or("");
                files.push(format!("{root}{name}"));
            }
            git2::TreeWalkResult::Ok
        })
        .map_err(|e| to_external_error("git", e))?;

        Ok(files)
    }

    async fn file_contents_at(&self, file_path: &str, commit_hash: Option<&str>) -> Result<String> {
        let tree = match commit_hash {
            Some(hash) => {
                let oid = git2::Oid::from_str(hash).map_err(|e| to_external_error("git", e))?;
                let commit = self.repo.find_commit(oid).map_err(|e| to_external_error("git", e))?;
                commit.tree().map_err(|e| to_external_error("git", e))?
            }
            None => {
                let head = self.repo.head().map_err(|e| to_external_error("git", e))?;
                head.peel_to_tree().map_err(|e| to_external_error("git", e))?
            }
        };

        let entry = tree.get_path(Path::new(file_path)).map_err(|e| to_external_error("git", e))?;
        let blob = entry
            .to_object(&self.repo)
            .map_err(|e| to_external_error("git", e))?
            .peel_to_blob()
            .map_err(|e| to_external_error("git", e))?;

        Ok(String::from_utf8_lossy(blob.content()).to_string())
    }

    async fn all_contributors(&self, file_path: Option<&str>) -> Result<Vec<String>> {
        let touches = match file_path {
            Some(path) => self.commits_touching_file(path, usize::MAX).await?,
            None => {
                let mut revwalk = self.repo.revwalk().map_err(|e| to_external_error("git", e))?;
                revwalk.push_head().map_err(|e| to_external_error("git", e))?;
                let mut touches = Vec::new();
                for oid in revwalk {
                    let oid = oid.map_err(|e| to_external_error("git", e))?;
                    let commit = self.repo.find_commit(oid).map_err(|e| to_external_error("git", e))?;
                    let author = commit.author();
                    touches.push(CommitTouch {
                        hash: oid.to_string(),
                        author_name: author.name().unwrap_or("unknown").to_string(),
                        author_email: author.email().unwrap_or("unknown").to_string(),
                        timestamp: commit_timestamp(&commit),
                        message: commit.message().unwrap_or("").to_string(),
                        files_changed: Vec::new(),
                        lines_added: 0,
                        lines_deleted: 0,
                    });
                }
                touches
            }
        };

        let mut emails: Vec<String> = touches.into_iter().map(|t| t.author_email).collect();
        emails.sort();
        emails.dedup();
        Ok(emails)
    }
}

impl LocalGitProvider {
    pub fn repo_path(&self) -> &Path {
        &self.path
    }
}
