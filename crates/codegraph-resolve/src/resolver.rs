use crate::registry::EntityRegistry;
use codegraph_core::{EntityId, FunctionEntity, ImportEntity};
use std::collections::{HashMap, HashSet};

/// How a file's imports map names into resolvable references (§4.D). Built once per
/// file from its `ImportEntity` list.
#[derive(Debug, Clone, Default)]
pub struct ImportMapping {
    /// alias/bare-module-root -> full module path, e.g. `import numpy as np` -> `np` -> `numpy`.
    pub module_aliases: HashMap<String, String>,
    /// imported name -> fully qualified path, e.g. `from utils import helper` -> `helper` -> `utils.helper`.
    pub name_imports: HashMap<String, String>,
    /// modules star-imported into this file.
    pub star_imports: Vec<String>,
}

impl ImportMapping {
    pub fn from_imports(imports: &[ImportEntity]) -> Self {
        let mut mapping = Self::default();
        for imp in imports {
            if let Some(alias) = &imp.alias {
                mapping.module_aliases.insert(alias.clone(), imp.module.clone());
            } else if !imp.imported_names.is_empty() {
                for name in &imp.imported_names {
                    if name == "*" {
                        mapping.star_imports.push(imp.module.clone());
                    } else {
                        let full_path = if imp.module.is_empty() {
                            name.clone()
                        } else {
                            format!("{}.{}", imp.module, name)
                        };
                        mapping.name_imports.insert(name.clone(), full_path);
                    }
                }
            } else {
                let root = imp.module.split('.').next().unwrap_or(&imp.module);
                mapping.module_aliases.insert(root.to_string(), root.to_string());
            }
        }
        mapping
    }
}

/// The outcome of resolving one raw call string (§4.D). `resolved_target` is `None`
/// only for `resolution_type == "unresolved"`; every other branch produces either a
/// registered entity id or a best-effort external reference string, preserved via
/// `metadata`.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub original_call: String,
    pub resolved_target: Option<EntityId>,
    pub resolution_type: &'static str,
    pub confidence: f64,
    pub metadata: HashMap<String, String>,
}

impl ResolvedCall {
    fn unresolved(original_call: &str, reason: &str) -> Self {
        Self {
            original_call: original_call.to_string(),
            resolved_target: None,
            resolution_type: "unresolved",
            confidence: 0.0,
            metadata: HashMap::from([("reason".to_string(), reason.to_string())]),
        }
    }
}

/// Maps raw call strings to entity ids with a confidence score (§4.D). First-match-wins
/// over a fixed branch order; nothing here can fail — every call either resolves or
/// degrades to `unresolved`, never an error.
pub struct CallResolver<'a> {
    registry: &'a EntityRegistry,
    import_cache: HashMap<String, ImportMapping>,
}

impl<'a> CallResolver<'a> {
    pub fn new(registry: &'a EntityRegistry) -> Self {
        Self {
            registry,
            import_cache: HashMap::new(),
        }
    }

    pub fn set_imports(&mut self, file_path: &str, imports: &[ImportEntity]) {
        self.import_cache
            .insert(file_path.to_string(), ImportMapping::from_imports(imports));
    }

    pub fn resolve(&self, call: &str, context: &FunctionEntity) -> ResolvedCall {
        let file_path = context.file_path.as_str();
        let parent_class = context.parent_class.as_deref();
        let empty = ImportMapping::default();
        let imports = self.import_cache.get(file_path).unwrap_or(&empty);

        if let Some(rest) = call.strip_prefix("self.") {
            return self.resolve_self_call(call, strip_call_args(rest), parent_class, file_path);
        }
        if call.starts_with("super(") {
            return self.resolve_super_call(call, parent_class);
        }
        if self.registry.get_class(call).is_some() {
            return self.resolve_instantiation(call);
        }
        if call.contains('.') {
            return self.resolve_qualified_call(call, imports);
        }
        self.resolve_direct_call(call, imports, file_path)
    }

    pub fn resolve_all(&self, context: &FunctionEntity) -> Vec<ResolvedCall> {
        context.calls.iter().map(|c| self.resolve(c, context)).collect()
    }

    fn resolve_self_call(
        &self,
        call: &str,
        method_name: &str,
        parent_class: Option<&str>,
        file_path: &str,
    ) -> ResolvedCall {
        let Some(parent_class) = parent_class else {
            return ResolvedCall::unresolved(call, "method not found in class hierarchy");
        };

        let target_id = EntityId::member(file_path, parent_class, method_name);
        if self.registry.find_by_id(&target_id).is_some() {
            return ResolvedCall {
                original_call: call.to_string(),
                resolved_target: Some(target_id),
                resolution_type: "method",
                confidence: 1.0,
                metadata: HashMap::new(),
            };
        }

        if let Some(cls) = self.registry.get_class(parent_class) {
            for base in &cls.bases {
                for entity in self.registry.find_by_name(method_name) {
                    if entity.parent_class() == Some(base.as_str()) {
                        return ResolvedCall {
                            original_call: call.to_string(),
                            resolved_target: Some(entity.unique_id()),
                            resolution_type: "inherited_method",
                            confidence: 0.9,
                            metadata: HashMap::new(),
                        };
                    }
                }
            }
        }

        ResolvedCall::unresolved(call, "method not found in class hierarchy")
    }

    fn resolve_super_call(&self, call: &str, parent_class: Option<&str>) -> ResolvedCall {
        let method_name = if let Some(idx) = call.find("().") {
            strip_call_args(&call[idx + 3..])
        } else {
            "__init__"
        };

        let Some(parent_class) = parent_class else {
            return ResolvedCall::unresolved(call, "super class method not found");
        };
        let Some(cls) = self.registry.get_class(parent_class) else {
            return ResolvedCall::unresolved(call, "super class method not found");
        };
        let Some(base_name) = cls.bases.first() else {
            return ResolvedCall::unresolved(call, "super class method not found");
        };

        for entity in self.registry.find_by_name(method_name) {
            if entity.parent_class() == Some(base_name.as_str()) {
                return ResolvedCall {
                    original_call: call.to_string(),
                    resolved_target: Some(entity.unique_id()),
                    resolution_type: "super",
                    confidence: 0.95,
                    metadata: HashMap::from([("base_class".to_string(), base_name.clone())]),
                };
            }
        }

        ResolvedCall::unresolved(call, "super class method not found")
    }

    fn resolve_instantiation(&self, call: &str) -> ResolvedCall {
        match self.registry.get_class(call) {
            Some(cls) => ResolvedCall {
                original_call: call.to_string(),
                resolved_target: Some(cls.unique_id()),
                resolution_type: "instantiation",
                confidence: 1.0,
                metadata: HashMap::new(),
            },
            None => ResolvedCall::unresolved(call, "class not found"),
        }
    }

    fn resolve_qualified_call(&self, call: &str, imports: &ImportMapping) -> ResolvedCall {
        let mut parts = call.splitn(2, '.');
        let first = parts.next().unwrap_or_default();
        let rest_raw = parts.next().unwrap_or_default();
        let rest = strip_call_args(rest_raw);

        if let Some(full_module) = imports.module_aliases.get(first) {
            for entity in self.registry.find_by_name(rest) {
                if entity.file_path().contains(full_module.as_str())
                    || entity.unique_id().as_str().contains(full_module.as_str())
                {
                    return ResolvedCall {
                        original_call: call.to_string(),
                        resolved_target: Some(entity.unique_id()),
                        resolution_type: "import_alias",
                        confidence: 0.9,
                        metadata: HashMap::new(),
                    };
                }
            }

            let full_call = format!("{full_module}.{rest}");
            return ResolvedCall {
                original_call: call.to_string(),
                resolved_target: Some(EntityId::from(full_call)),
                resolution_type: "external_module",
                confidence: 0.7,
                metadata: HashMap::from([
                    ("module".to_string(), full_module.clone()),
                    ("function".to_string(), rest.to_string()),
                ]),
            };
        }

        if let Some(entity) = self.registry.find_by_name(rest).into_iter().next() {
            return ResolvedCall {
                original_call: call.to_string(),
                resolved_target: Some(entity.unique_id()),
                resolution_type: "object_method",
                confidence: 0.6,
                metadata: HashMap::from([("object".to_string(), first.to_string())]),
            };
        }

        ResolvedCall::unresolved(call, "qualified name not found")
    }

    fn resolve_direct_call(&self, call: &str, imports: &ImportMapping, file_path: &str) -> ResolvedCall {
        let func_name = strip_call_args(call);

        if let Some(full_path) = imports.name_imports.get(func_name) {
            if let Some(entity) = self.registry.find_by_name(func_name).into_iter().next() {
                return ResolvedCall {
                    original_call: call.to_string(),
                    resolved_target: Some(entity.unique_id()),
                    resolution_type: "import",
                    confidence: 0.9,
                    metadata: HashMap::new(),
                };
            }
            return ResolvedCall {
                original_call: call.to_string(),
                resolved_target: Some(EntityId::from(full_path.clone())),
                resolution_type: "external_import",
                confidence: 0.7,
                metadata: HashMap::from([("imported_from".to_string(), full_path.clone())]),
            };
        }

        if let Some(entity) = self.registry.find_in_file(file_path, func_name) {
            return ResolvedCall {
                original_call: call.to_string(),
                resolved_target: Some(entity.unique_id()),
                resolution_type: "direct",
                confidence: 1.0,
                metadata: HashMap::new(),
            };
        }

        if let Some(entity) = self.registry.find_by_name(func_name).into_iter().next() {
            return ResolvedCall {
                original_call: call.to_string(),
                resolved_target: Some(entity.unique_id()),
                resolution_type: "global",
                confidence: 0.8,
                metadata: HashMap::new(),
            };
        }

        if self.registry.get_class(func_name).is_some() {
            return self.resolve_instantiation(func_name);
        }

        ResolvedCall::unresolved(call, "function not found in scope")
    }
}

fn strip_call_args(s: &str) -> &str {
    s.split('(').next().unwrap_or(s)
}

/// Distinct raw call strings referenced by a set of functions, for callers that want to
/// pre-warm or audit resolution without touching the full extraction pipeline.
pub fn distinct_calls(functions: &[FunctionEntity]) -> HashSet<String> {
    functions.iter().flat_map(|f| f.calls.iter().cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EntityRegistry;
    use codegraph_core::{ClassEntity, Language, ParsedFile};

    fn pf(file_path: &str, functions: Vec<FunctionEntity>, classes: Vec<ClassEntity>) -> ParsedFile {
        ParsedFile {
            file_path: file_path.to_string(),
            language: Language::Python,
            module: None,
            functions,
            classes,
            imports: Vec::new(),
            variables: Vec::new(),
            parse_success: true,
            parse_errors: Vec::new(),
        }
    }

    fn func(file_path: &str, name: &str, parent_class: Option<&str>, calls: Vec<&str>) -> FunctionEntity {
        FunctionEntity {
            name: name.to_string(),
            file_path: file_path.to_string(),
            parent_class: parent_class.map(|s| s.to_string()),
            calls: calls.into_iter().map(|s| s.to_string()).collect(),
            cyclomatic_complexity: 1,
            lines_of_code: 1,
            ..Default::default()
        }
    }

    #[test]
    fn resolves_super_call_to_base_method() {
        let base = ClassEntity {
            name: "B".to_string(),
            file_path: "a.py".to_string(),
            ..Default::default()
        };
        let derived = ClassEntity {
            name: "D".to_string(),
            file_path: "a.py".to_string(),
            bases: vec!["B".to_string()],
            ..Default::default()
        };
        let base_m = func("a.py", "m", Some("B"), vec![]);
        let derived_m = func("a.py", "m", Some("D"), vec!["super().m"]);

        let file = pf("a.py", vec![base_m, derived_m.clone()], vec![base, derived]);
        let registry = EntityRegistry::build(&[file]);
        let resolver = CallResolver::new(&registry);

        let resolved = resolver.resolve("super().m", &derived_m);
        assert_eq!(resolved.resolution_type, "super");
        assert_eq!(resolved.confidence, 0.95);
        assert_eq!(resolved.resolved_target.unwrap().as_str(), "a.py:B.m");
    }

    #[test]
    fn resolves_self_call_within_same_class() {
        let cls = ClassEntity {
            name: "A".to_string(),
            file_path: "a.py".to_string(),
            ..Default::default()
        };
        let validate = func("a.py", "validate", Some("A"), vec![]);
        let run = func("a.py", "run", Some("A"), vec!["self.validate"]);
        let file = pf("a.py", vec![validate, run.clone()], vec![cls]);
        let registry = EntityRegistry::build(&[file]);
        let resolver = CallResolver::new(&registry);

        let resolved = resolver.resolve("self.validate", &run);
        assert_eq!(resolved.resolution_type, "method");
        assert_eq!(resolved.confidence, 1.0);
    }

    #[test]
    fn unresolved_call_keeps_original_string_and_zero_confidence() {
        let caller = func("a.py", "run", None, vec!["mystery_call"]);
        let file = pf("a.py", vec![caller.clone()], vec![]);
        let registry = EntityRegistry::build(&[file]);
        let resolver = CallResolver::new(&registry);

        let resolved = resolver.resolve("mystery_call", &caller);
        assert_eq!(resolved.resolution_type, "unresolved");
        assert_eq!(resolved.confidence, 0.0);
        assert_eq!(resolved.original_call, "mystery_call");
        assert!(resolved.resolved_target.is_none());
    }
}
