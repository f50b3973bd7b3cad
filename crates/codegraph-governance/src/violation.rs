use crate::rule::ViolationSeverity;

/// A single detected boundary violation, tied to the import statement that caused it
/// (§4.H).
#[derive(Debug, Clone)]
pub struct Violation {
    pub file_path: String,
    pub line_number: u32,
    pub from_module: String,
    pub to_module: String,
    pub from_layer: String,
    pub to_layer: String,
    pub rule_name: String,
    pub severity: ViolationSeverity,
    pub message: String,
}

/// The outcome of validating one `(from_module, to_module)` import pair.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub valid: bool,
    pub violation: Option<Violation>,
}

impl ValidationResult {
    pub fn allowed() -> Self {
        Self {
            valid: true,
            violation: None,
        }
    }

    pub fn new(valid: bool, violation: Violation) -> Self {
        Self {
            valid,
            violation: Some(violation),
        }
    }
}
