//! Architectural governance (§4.H): layer classification, boundary-rule enforcement,
//! and drift detection against a baseline snapshot.

pub mod classifier;
pub mod config;
pub mod drift;
pub mod layer;
pub mod rule;
pub mod validator;

pub use classifier::LayerClassifier;
pub use config::GovernanceConfig;
pub use drift::{calculate_metrics, detect_drift, DriftIndicators, DriftMetrics, DriftReport};
pub use layer::Layer;
pub use rule::{BoundaryRule, RuleAction, ViolationSeverity};
pub use validator::{
    validate_import, validate_repository, validate_repository_cancellable, FileValidationResult,
    RepositoryValidationResult,
};
pub use violation::{ValidationResult, Violation};

mod violation;
