use crate::classifier::LayerClassifier;
use crate::config::GovernanceConfig;
use crate::rule::{RuleAction, ViolationSeverity};
use crate::violation::{ValidationResult, Violation};
use codegraph_core::{CodeGraphError, Deadline, ImportEntity, ParsedFile, Result};
use codegraph_parser::{scan_repository, ScanConfig};
use std::path::{Path, PathBuf};

/// Validates one `(from_module, to_module)` import pair against the layer topology
/// (§4.H boundary-rule evaluation).
pub fn validate_import(
    config: &GovernanceConfig,
    classifier: &LayerClassifier,
    from_module: &str,
    to_module: &str,
    file_path: &str,
    line_number: u32,
) -> ValidationResult {
    let from_layer = classifier.classify(from_module);
    let to_layer = classifier.classify(to_module);

    let (from_layer, to_layer) = match (from_layer, to_layer) {
        (Some(f), Some(t)) => (f, t),
        _ => {
            return if config.strict_mode {
                ValidationResult::new(
                    false,
                    Violation {
                        file_path: file_path.to_string(),
                        line_number,
                        from_module: from_module.to_string(),
                        to_module: to_module.to_string(),
                        from_layer: "unknown".to_string(),
                        to_layer: "unknown".to_string(),
                        rule_name: "strict mode".to_string(),
                        severity: ViolationSeverity::Warning,
                        message: format!("unclassified import: {from_module} -> {to_module}"),
                    },
                )
            } else {
                ValidationResult::allowed()
            };
        }
    };

    if from_layer == to_layer {
        return ValidationResult::allowed();
    }

    for rule in &config.rules {
        if !rule.matches(&from_layer, &to_layer) {
            continue;
        }
        if rule.action == RuleAction::Allow {
            return ValidationResult::allowed();
        }

        let severity = if rule.action == RuleAction::Warn {
            ViolationSeverity::Warning
        } else {
            ViolationSeverity::Error
        };
        let message = if rule.message.is_empty() {
            format!("import from {from_layer} to {to_layer} violates rule '{}'", rule.name)
        } else {
            rule.message.clone()
        };

        return ValidationResult::new(
            rule.action == RuleAction::Warn,
            Violation {
                file_path: file_path.to_string(),
                line_number,
                from_module: from_module.to_string(),
                to_module: to_module.to_string(),
                from_layer,
                to_layer,
                rule_name: rule.name.clone(),
                severity,
                message,
            },
        );
    }

    if let Some(source_layer) = config.layers.iter().find(|l| l.name == from_layer) {
        if !source_layer.allowed_dependencies.is_empty() && !source_layer.allowed_dependencies.contains(&to_layer) {
            return ValidationResult::new(
                false,
                Violation {
                    file_path: file_path.to_string(),
                    line_number,
                    from_module: from_module.to_string(),
                    to_module: to_module.to_string(),
                    from_layer: from_layer.clone(),
                    to_layer,
                    rule_name: "allowed dependencies".to_string(),
                    severity: ViolationSeverity::Error,
                    message: format!("{from_layer} layer can only depend on: {:?}", source_layer.allowed_dependencies),
                },
            );
        }
    }

    ValidationResult::allowed()
}

/// Result of validating every import in a single file.
#[derive(Debug, Clone, Default)]
pub struct FileValidationResult {
    pub file_path: String,
    pub violations: Vec<Violation>,
    pub warnings: Vec<Violation>,
    pub imports_checked: usize,
}

impl FileValidationResult {
    pub fn has_errors(&self) -> bool {
        !self.violations.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Aggregated result of validating an entire repository (§4.H).
#[derive(Debug, Clone, Default)]
pub struct RepositoryValidationResult {
    pub root_path: String,
    pub file_results: Vec<FileValidationResult>,
    pub total_files: usize,
    pub total_imports: usize,
}

impl RepositoryValidationResult {
    pub fn total_violations(&self) -> usize {
        self.file_results.iter().map(|f| f.violations.len()).sum()
    }

    pub fn total_warnings(&self) -> usize {
        self.file_results.iter().map(|f| f.warnings.len()).sum()
    }

    pub fn all_violations(&self) -> Vec<&Violation> {
        self.file_results.iter().flat_map(|f| &f.violations).collect()
    }

    pub fn all_warnings(&self) -> Vec<&Violation> {
        self.file_results.iter().flat_map(|f| &f.warnings).collect()
    }
}

/// Resolves a relative import (`level` dots) to an absolute-ish module path rooted at
/// the importing file's directory, per §4.H.
fn resolve_relative_import(file_path: &str, module: &str, level: u32) -> String {
    if level == 0 {
        return module.to_string();
    }
    let parts: Vec<&str> = file_path.split('/').collect();
    if parts.len() > level as usize {
        let base = &parts[..parts.len() - level as usize];
        if module.is_empty() {
            base.join("/")
        } else {
            format!("{}/{}", base.join("/"), module.replace('.', "/"))
        }
    } else {
        module.to_string()
    }
}

/// Turns an import's module name into a slash-separated path comparable against layer
/// glob patterns. Relative imports resolve against the importing file's directory
/// (§4.H); absolute dotted imports (`app.data.models`) are flattened the same way so
/// layer patterns written against file paths also match module names.
fn import_target(file_path: &str, import: &ImportEntity) -> String {
    if import.is_relative {
        resolve_relative_import(file_path, &import.module, import.relative_level)
    } else {
        import.module.replace('.', "/")
    }
}

/// Validates one already-parsed file's imports against the layer topology.
pub fn validate_parsed_file(
    config: &GovernanceConfig,
    classifier: &LayerClassifier,
    parsed: &ParsedFile,
    repo_relative_path: &str,
) -> FileValidationResult {
    let mut result = FileValidationResult {
        file_path: repo_relative_path.to_string(),
        ..Default::default()
    };

    for import in &parsed.imports {
        result.imports_checked += 1;
        let to_module = import_target(repo_relative_path, import);
        let validation = validate_import(
            config,
            classifier,
            repo_relative_path,
            &to_module,
            repo_relative_path,
            import.line,
        );

        if let Some(violation) = validation.violation {
            match violation.severity {
                ViolationSeverity::Warning => result.warnings.push(violation),
                ViolationSeverity::Error => result.violations.push(violation),
            }
        }
    }

    result
}

/// Walks `root` (reusing the parser's repository scan and import extraction) and
/// validates every source file's imports against `config` (§4.H validator).
pub fn validate_repository(root: &Path, config: &GovernanceConfig) -> Result<RepositoryValidationResult> {
    validate_repository_cancellable(root, config, None)
}

/// Cancellation-aware variant of [`validate_repository`] (§5). The deadline is checked
/// at each file boundary; on expiry the accumulated `RepositoryValidationResult` is
/// discarded and `Cancelled` is returned instead.
pub fn validate_repository_cancellable(
    root: &Path,
    config: &GovernanceConfig,
    deadline: Option<Deadline>,
) -> Result<RepositoryValidationResult> {
    let scan_config = ScanConfig {
        exclude_patterns: config.exclude_patterns.clone(),
    };
    let parsed_files = scan_repository(root, &scan_config)?;
    let classifier = LayerClassifier::new(config);

    let mut result = RepositoryValidationResult {
        root_path: root.to_string_lossy().to_string(),
        ..Default::default()
    };

    for parsed in &parsed_files {
        if let Some(d) = deadline {
            if d.is_expired() {
                return Err(CodeGraphError::Cancelled);
            }
        }

        let relative_path = PathBuf::from(&parsed.file_path)
            .strip_prefix(root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| parsed.file_path.replace('\\', "/"));

        result.total_files += 1;
        let file_result = validate_parsed_file(config, &classifier, parsed, &relative_path);
        result.total_imports += file_result.imports_checked;

        if file_result.has_errors() || file_result.has_warnings() {
            result.file_results.push(file_result);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn same_layer_import_is_always_allowed() {
        let config = GovernanceConfig::clean_architecture().unwrap();
        let classifier = LayerClassifier::new(&config);
        let result = validate_import(&config, &classifier, "app/api/a.py", "app/api/b.py", "app/api/a.py", 1);
        assert!(result.valid);
        assert!(result.violation.is_none());
    }

    #[test]
    fn api_to_data_is_blocked() {
        let config = GovernanceConfig::clean_architecture().unwrap();
        let classifier = LayerClassifier::new(&config);
        let result = validate_import(
            &config,
            &classifier,
            "app/api/routes.py",
            "app/data/models.py",
            "app/api/routes.py",
            10,
        );
        assert!(!result.valid);
        let violation = result.violation.unwrap();
        assert_eq!(violation.severity, ViolationSeverity::Error);
        assert_eq!(violation.from_layer, "api");
        assert_eq!(violation.to_layer, "data");
    }

    #[test]
    fn unclassified_import_is_allowed_outside_strict_mode() {
        let config = GovernanceConfig::clean_architecture().unwrap();
        let classifier = LayerClassifier::new(&config);
        let result = validate_import(&config, &classifier, "scripts/run.py", "app/data/models.py", "scripts/run.py", 1);
        assert!(result.valid);
    }

    /// Spec scenario: a small repository with one deliberate API -> data import produces
    /// exactly one violation.
    #[test]
    fn repository_scan_detects_the_one_governance_violation() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/api")).unwrap();
        fs::create_dir_all(dir.path().join("app/data")).unwrap();
        fs::write(
            dir.path().join("app/api/routes.py"),
            "from app.data.models import User\n\ndef handler():\n    return User()\n",
        )
        .unwrap();
        fs::write(dir.path().join("app/data/models.py"), "class User:\n    pass\n").unwrap();

        let config = GovernanceConfig::clean_architecture().unwrap();
        let result = validate_repository(dir.path(), &config).unwrap();

        assert_eq!(result.total_violations(), 1);
        assert_eq!(result.total_warnings(), 0);
    }

    #[test]
    fn an_already_expired_deadline_cancels_repository_validation() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/api")).unwrap();
        fs::write(dir.path().join("app/api/routes.py"), "def handler():\n    pass\n").unwrap();

        let config = GovernanceConfig::clean_architecture().unwrap();
        let expired = Deadline::after(std::time::Duration::from_secs(0));
        std::thread::sleep(std::time::Duration::from_millis(5));

        let result = validate_repository_cancellable(dir.path(), &config, Some(expired));
        assert!(matches!(result, Err(CodeGraphError::Cancelled)));
    }
}
