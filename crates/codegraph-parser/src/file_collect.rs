use codegraph_core::{Language, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Directories that are never source, regardless of `.gitignore` contents.
const DEFAULT_EXCLUDES: [&str; 9] = [
    "**/target/**",
    "**/.git/**",
    "**/node_modules/**",
    "**/dist/**",
    "**/build/**",
    "**/.venv/**",
    "**/venv/**",
    "**/__pycache__/**",
    "**/.pytest_cache/**",
];

/// Extra glob exclusions a caller wants layered on top of [`DEFAULT_EXCLUDES`].
#[derive(Debug, Clone, Default)]
pub struct ScanConfig {
    pub exclude_patterns: Vec<String>,
}

/// Walks `root` respecting `.gitignore`/`.ignore` plus [`DEFAULT_EXCLUDES`], returning
/// every file whose extension maps to a known [`Language`].
pub fn collect_source_files(root: &Path, config: &ScanConfig) -> Result<Vec<(PathBuf, Language)>> {
    info!(dir = %root.display(), "collecting source files");

    let mut patterns: Vec<String> = DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect();
    patterns.extend(config.exclude_patterns.iter().cloned());
    let exclude_set = build_globset(&patterns);

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_exclude(true)
        .ignore(true)
        .build();

    let mut files = Vec::new();
    let mut seen = 0usize;
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("walker error: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        seen += 1;

        if let Some(set) = &exclude_set {
            if set.is_match(path) {
                continue;
            }
        }

        let Some(language) = language_for(path) else {
            continue;
        };
        files.push((path.to_path_buf(), language));
    }

    debug!(seen, collected = files.len(), "file collection complete");
    Ok(files)
}

fn language_for(path: &Path) -> Option<Language> {
    match path.extension().and_then(|e| e.to_str())? {
        "py" | "pyi" => Some(Language::Python),
        "rs" => Some(Language::Rust),
        _ => None,
    }
}

fn build_globset(patterns: &[String]) -> Option<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let mut added = false;
    for pattern in patterns {
        match Glob::new(pattern) {
            Ok(glob) => {
                builder.add(glob);
                added = true;
            }
            Err(e) => warn!("invalid glob pattern '{pattern}': {e}"),
        }
    }
    added.then(|| builder.build().ok()).flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn collects_python_files_and_skips_excluded_dirs() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        fs::create_dir_all(dir.path().join("__pycache__")).unwrap();
        fs::write(dir.path().join("__pycache__/a.pyc"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();

        let files = collect_source_files(dir.path(), &ScanConfig::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, Language::Python);
    }

    #[test]
    fn honors_extra_exclude_patterns() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/skip.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("keep.py"), "x = 1\n").unwrap();

        let config = ScanConfig {
            exclude_patterns: vec!["**/vendor/**".to_string()],
        };
        let files = collect_source_files(dir.path(), &config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].0.ends_with("keep.py"));
    }
}
