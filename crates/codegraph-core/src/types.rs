use serde::{Deserialize, Serialize};
use std::fmt;

/// The source language a grammar was injected for. The core never hard-codes grammar
/// logic; this enum only tags which `AstProvider` implementation produced an AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    Rust,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::Python => write!(f, "python"),
            Language::Rust => write!(f, "rust"),
        }
    }
}

/// The stable, content-addressable identity of an entity: `file_path ":" [parent_class "."] name`.
///
/// Ids are the single key used everywhere downstream (§3): the registry, the graph store,
/// the impact analyzer and the governance engine all key off this type rather than any
/// process-local handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn module(file_path: &str) -> Self {
        EntityId(file_path.to_string())
    }

    pub fn top_level(file_path: &str, name: &str) -> Self {
        EntityId(format!("{file_path}:{name}"))
    }

    pub fn member(file_path: &str, parent_class: &str, name: &str) -> Self {
        EntityId(format!("{file_path}:{parent_class}.{name}"))
    }

    /// Build the id a method/function would have, given its optional parent class.
    pub fn function(file_path: &str, parent_class: Option<&str>, name: &str) -> Self {
        match parent_class {
            Some(class) => Self::member(file_path, class, name),
            None => Self::top_level(file_path, name),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The file path component of the id (everything before the first `:`).
    pub fn file_path(&self) -> &str {
        self.0.split(':').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        EntityId(s)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        EntityId(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_level_id_has_no_dot() {
        let id = EntityId::function("app/routes.py", None, "handle");
        assert_eq!(id.as_str(), "app/routes.py:handle");
    }

    #[test]
    fn member_id_embeds_parent_class() {
        let id = EntityId::function("app/models.py", Some("User"), "save");
        assert_eq!(id.as_str(), "app/models.py:User.save");
    }

    #[test]
    fn file_path_component_stops_at_first_colon() {
        let id = EntityId::function("app/models.py", Some("User"), "save");
        assert_eq!(id.file_path(), "app/models.py");
    }
}

/// Discriminator carried alongside each serialised entity dictionary (§6 output port).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Function,
    Class,
    Import,
    Module,
    Variable,
}
