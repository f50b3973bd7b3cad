use codegraph_core::{CodeGraphError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

/// An architectural layer: a named bucket of modules, recognised by glob pattern, that
/// declares which other layers it is allowed to depend on (§4.H).
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub patterns: Vec<String>,
    pub description: String,
    pub allowed_dependencies: Vec<String>,
    glob_set: GlobSet,
}

impl Layer {
    pub fn new(
        name: impl Into<String>,
        patterns: Vec<String>,
        description: impl Into<String>,
        allowed_dependencies: Vec<String>,
    ) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| CodeGraphError::ConfigurationError(format!("invalid layer pattern '{pattern}': {e}")))?;
            builder.add(glob);
        }
        let glob_set = builder
            .build()
            .map_err(|e| CodeGraphError::ConfigurationError(format!("failed to build layer glob set: {e}")))?;

        Ok(Self {
            name: name.into(),
            patterns,
            description: description.into(),
            allowed_dependencies,
            glob_set,
        })
    }

    /// A module path matches a layer if any of the layer's glob patterns matches the
    /// forward-slash-normalised path (§4.H).
    pub fn matches(&self, module_path: &str) -> bool {
        let normalized = module_path.replace('\\', "/");
        self.glob_set.is_match(&normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_matches_its_glob_patterns() {
        let layer = Layer::new("api", vec!["**/api/**".to_string()], "", vec![]).unwrap();
        assert!(layer.matches("app/api/routes.py"));
        assert!(!layer.matches("app/data/models.py"));
    }

    #[test]
    fn layer_matching_normalises_backslashes() {
        let layer = Layer::new("api", vec!["**/api/**".to_string()], "", vec![]).unwrap();
        assert!(layer.matches("app\\api\\routes.py"));
    }
}
