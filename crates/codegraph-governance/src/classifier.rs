use crate::config::GovernanceConfig;
use std::collections::HashMap;
use std::sync::Mutex;

/// Classifies a module path into a layer name, memoising results per path (§4.H).
/// Wrapped in a `Mutex` so the validator can classify files concurrently without
/// duplicating classification work across threads.
pub struct LayerClassifier<'a> {
    config: &'a GovernanceConfig,
    cache: Mutex<HashMap<String, Option<String>>>,
}

impl<'a> LayerClassifier<'a> {
    pub fn new(config: &'a GovernanceConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn classify(&self, module_path: &str) -> Option<String> {
        if let Some(cached) = self.cache.lock().unwrap().get(module_path) {
            return cached.clone();
        }

        let classified = self
            .config
            .layers
            .iter()
            .find(|layer| layer.matches(module_path))
            .map(|layer| layer.name.clone());

        self.cache
            .lock()
            .unwrap()
            .insert(module_path.to_string(), classified.clone());
        classified
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_and_memoises() {
        let config = GovernanceConfig::clean_architecture().unwrap();
        let classifier = LayerClassifier::new(&config);
        assert_eq!(classifier.classify("app/api/routes.py"), Some("api".to_string()));
        // second call exercises the cache path, same result
        assert_eq!(classifier.classify("app/api/routes.py"), Some("api".to_string()));
        assert_eq!(classifier.classify("app/unrelated/foo.py"), None);
    }
}
