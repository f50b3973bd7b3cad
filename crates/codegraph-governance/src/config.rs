use crate::layer::Layer;
use crate::rule::{BoundaryRule, RuleAction};
use codegraph_core::Result;

/// File-walk exclusions layered on top of [`codegraph_parser::file_collect::DEFAULT_EXCLUDES`]
/// (§4.H: "cache dirs, virtualenv dirs, vcs metadata, test file naming").
pub const DEFAULT_GOVERNANCE_EXCLUDES: [&str; 2] = ["**/test_*.py", "**/*_test.py"];

/// The full architectural configuration: layers, boundary rules, and strictness (§4.H).
pub struct GovernanceConfig {
    pub layers: Vec<Layer>,
    pub rules: Vec<BoundaryRule>,
    pub strict_mode: bool,
    pub exclude_patterns: Vec<String>,
}

impl GovernanceConfig {
    pub fn new(layers: Vec<Layer>, rules: Vec<BoundaryRule>, strict_mode: bool) -> Self {
        Self {
            layers,
            rules,
            strict_mode,
            exclude_patterns: DEFAULT_GOVERNANCE_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// The classic three-layer clean-architecture default: api -> service -> data, with
    /// the two inverted-dependency rules blocked outright (§4.H example topology).
    pub fn clean_architecture() -> Result<Self> {
        let layers = vec![
            Layer::new(
                "api",
                vec![
                    "**/api/**".to_string(),
                    "**/routes/**".to_string(),
                    "**/endpoints/**".to_string(),
                    "**/controllers/**".to_string(),
                ],
                "API/controller layer",
                vec!["service".to_string()],
            )?,
            Layer::new(
                "service",
                vec![
                    "**/services/**".to_string(),
                    "**/core/**".to_string(),
                    "**/domain/**".to_string(),
                    "**/usecases/**".to_string(),
                ],
                "Business logic layer",
                vec!["data".to_string()],
            )?,
            Layer::new(
                "data",
                vec![
                    "**/data/**".to_string(),
                    "**/models/**".to_string(),
                    "**/storage/**".to_string(),
                    "**/repositories/**".to_string(),
                    "**/db/**".to_string(),
                ],
                "Data access layer",
                vec![],
            )?,
        ];

        let rules = vec![
            BoundaryRule::new(
                "API cannot access Data directly",
                "api",
                "data",
                RuleAction::Block,
                "API layer should not directly access the data layer. Use the service layer instead.",
            ),
            BoundaryRule::new(
                "Data cannot access Service",
                "data",
                "service",
                RuleAction::Block,
                "Data layer should not depend on the service layer (inverted dependency).",
            ),
            BoundaryRule::new(
                "Data cannot access API",
                "data",
                "api",
                RuleAction::Block,
                "Data layer should not depend on the API layer.",
            ),
        ];

        Ok(Self::new(layers, rules, false))
    }
}
