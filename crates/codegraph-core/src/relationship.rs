use crate::types::EntityId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The closed set of edge kinds the graph may contain (§3). Implemented as a tagged
/// sum rather than a class hierarchy per the polymorphism design note (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationType {
    Contains,
    Defines,
    Calls,
    Instantiates,
    Inherits,
    Implements,
    Overrides,
    Imports,
    ImportsFrom,
    Decorates,
    UsesType,
    ReturnsType,
    ReadsGlobal,
    WritesGlobal,
    Raises,
    Catches,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationType::Contains => "CONTAINS",
            RelationType::Defines => "DEFINES",
            RelationType::Calls => "CALLS",
            RelationType::Instantiates => "INSTANTIATES",
            RelationType::Inherits => "INHERITS",
            RelationType::Implements => "IMPLEMENTS",
            RelationType::Overrides => "OVERRIDES",
            RelationType::Imports => "IMPORTS",
            RelationType::ImportsFrom => "IMPORTS_FROM",
            RelationType::Decorates => "DECORATES",
            RelationType::UsesType => "USES_TYPE",
            RelationType::ReturnsType => "RETURNS_TYPE",
            RelationType::ReadsGlobal => "READS_GLOBAL",
            RelationType::WritesGlobal => "WRITES_GLOBAL",
            RelationType::Raises => "RAISES",
            RelationType::Catches => "CATCHES",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for RelationType {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "CONTAINS" => RelationType::Contains,
            "DEFINES" => RelationType::Defines,
            "CALLS" => RelationType::Calls,
            "INSTANTIATES" => RelationType::Instantiates,
            "INHERITS" => RelationType::Inherits,
            "IMPLEMENTS" => RelationType::Implements,
            "OVERRIDES" => RelationType::Overrides,
            "IMPORTS" => RelationType::Imports,
            "IMPORTS_FROM" => RelationType::ImportsFrom,
            "DECORATES" => RelationType::Decorates,
            "USES_TYPE" => RelationType::UsesType,
            "RETURNS_TYPE" => RelationType::ReturnsType,
            "READS_GLOBAL" => RelationType::ReadsGlobal,
            "WRITES_GLOBAL" => RelationType::WritesGlobal,
            "RAISES" => RelationType::Raises,
            "CATCHES" => RelationType::Catches,
            _ => return Err(()),
        })
    }
}

/// A typed, directed, weighted edge between two entity ids (§3).
///
/// `target` is a plain id rather than a guaranteed-registered one: unresolved call
/// targets still produce a `Relationship` whose `target` is the raw (unresolved) name,
/// so consumers can reason about the external world instead of losing the edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub source: EntityId,
    pub target: EntityId,
    pub rel_type: RelationType,
    pub weight: f64,
    pub line: Option<u32>,
    pub context: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl Relationship {
    pub fn new(source: EntityId, target: EntityId, rel_type: RelationType) -> Self {
        Self {
            source,
            target,
            rel_type,
            weight: 1.0,
            line: None,
            context: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
