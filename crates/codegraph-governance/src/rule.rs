/// What to do when a [`BoundaryRule`] matches an import (§4.H).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAction {
    Allow,
    Warn,
    Block,
}

/// Severity a [`crate::violation::Violation`] is reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationSeverity {
    Warning,
    Error,
}

/// A declared boundary between two layers. Rules are evaluated in declaration order;
/// the first rule whose `(from_layer, to_layer)` matches wins (§4.H).
#[derive(Debug, Clone)]
pub struct BoundaryRule {
    pub name: String,
    pub from_layer: String,
    pub to_layer: String,
    pub action: RuleAction,
    pub message: String,
}

impl BoundaryRule {
    pub fn new(
        name: impl Into<String>,
        from_layer: impl Into<String>,
        to_layer: impl Into<String>,
        action: RuleAction,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            from_layer: from_layer.into(),
            to_layer: to_layer.into(),
            action,
            message: message.into(),
        }
    }

    pub fn matches(&self, from_layer: &str, to_layer: &str) -> bool {
        self.from_layer == from_layer && self.to_layer == to_layer
    }
}
