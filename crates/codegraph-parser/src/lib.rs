pub mod ast;
pub mod complexity;
pub mod file_collect;
pub mod python;
pub mod scope;

pub use ast::{AstProvider, TreeSitterAstProvider};
pub use file_collect::{collect_source_files, ScanConfig};
pub use python::PythonFileParser;

use codegraph_core::{CodeGraphError, Deadline, Language, ParsedFile};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Parses a single file through the injected [`AstProvider`], dispatching to the
/// language-specific collector. One source language is assumed per repository (§9
/// non-goal: no cross-language parsing) — the grammar is still an injected dependency,
/// so a repository of a different language only needs a different `AstProvider` wiring,
/// not a different call site.
pub fn parse_file(provider: &dyn AstProvider, path: &Path, language: Language) -> ParsedFile {
    let file_path = path.to_string_lossy().to_string();

    let source = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => return ParsedFile::failed(file_path, language, format!("failed to read file: {e}")),
    };

    match language {
        Language::Python => match provider.parse(language, source.as_bytes()) {
            Ok(tree) => PythonFileParser::parse(&tree, &source, &file_path),
            Err(e) => ParsedFile::failed(file_path, language, e),
        },
        Language::Rust => ParsedFile::failed(
            file_path,
            language,
            "cross-language parsing is out of scope: no Rust entity collector is wired up",
        ),
    }
}

/// Walks `root`, parsing every recognized source file. Per-file parsing is independent
/// and CPU-bound, so files are fanned out across a rayon pool rather than threaded
/// through an async scheduler.
pub fn scan_repository(root: &Path, config: &ScanConfig) -> codegraph_core::Result<Vec<ParsedFile>> {
    scan_repository_cancellable(root, config, None)
}

/// Cancellation-aware variant of [`scan_repository`] (§5). Every file checks the
/// deadline before parsing; once one file observes expiry the whole scan discards its
/// results and returns `Cancelled`, even though other in-flight files still complete.
pub fn scan_repository_cancellable(
    root: &Path,
    config: &ScanConfig,
    deadline: Option<Deadline>,
) -> codegraph_core::Result<Vec<ParsedFile>> {
    let files = collect_source_files(root, config)?;
    let provider = TreeSitterAstProvider;
    let cancelled = AtomicBool::new(false);

    let parsed: Vec<ParsedFile> = files
        .par_iter()
        .map(|(path, language)| {
            if deadline.map_or(false, |d| d.is_expired()) {
                cancelled.store(true, Ordering::Relaxed);
                return ParsedFile::failed(path.to_string_lossy().to_string(), *language, "cancelled".to_string());
            }
            parse_file(&provider, path, *language)
        })
        .collect();

    if cancelled.load(Ordering::Relaxed) {
        return Err(CodeGraphError::Cancelled);
    }

    let failed = parsed.iter().filter(|p| !p.parse_success).count();
    if failed > 0 {
        warn!(failed, total = parsed.len(), "some files failed to parse");
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn parses_a_single_python_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("m.py");
        fs::write(&path, "def f(x):\n    return x + 1\n").unwrap();

        let provider = TreeSitterAstProvider;
        let parsed = parse_file(&provider, &path, Language::Python);
        assert!(parsed.parse_success);
        assert_eq!(parsed.functions.len(), 1);
        assert_eq!(parsed.functions[0].name, "f");
    }

    #[test]
    fn scan_repository_collects_all_python_modules() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "def a():\n    pass\n").unwrap();
        fs::write(dir.path().join("b.py"), "def b():\n    pass\n").unwrap();

        let results = scan_repository(dir.path(), &ScanConfig::default()).unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|p| p.parse_success));
    }

    #[test]
    fn an_already_expired_deadline_cancels_the_scan() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "def a():\n    pass\n").unwrap();

        let expired = Deadline::after(std::time::Duration::from_secs(0));
        std::thread::sleep(std::time::Duration::from_millis(5));

        let result = scan_repository_cancellable(dir.path(), &ScanConfig::default(), Some(expired));
        assert!(matches!(result, Err(CodeGraphError::Cancelled)));
    }

    #[test]
    fn unreadable_file_produces_a_failed_parsed_file_not_a_panic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.py");
        let provider = TreeSitterAstProvider;
        let parsed = parse_file(&provider, &path, Language::Python);
        assert!(!parsed.parse_success);
        assert!(!parsed.parse_errors.is_empty());
    }
}
