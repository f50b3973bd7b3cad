use crate::registry::EntityRegistry;
use crate::resolver::CallResolver;
use codegraph_core::{
    ClassEntity, CodeGraphError, Deadline, EntityId, FunctionEntity, ParsedFile, RelationType, Relationship, Result,
};
use std::collections::{BTreeSet, HashSet};

const PRIMITIVE_TYPE_TOKENS: &[&str] = &[
    "int", "str", "float", "bool", "none", "any", "list", "dict", "set", "tuple", "optional",
    "union", "callable",
];

/// One sweep per `ParsedFile` producing the full typed-edge set (§4.E). The registry
/// and resolver are built once over the whole snapshot and shared across every file so
/// that a call in one file can resolve to an entity defined in another.
pub struct RelationshipExtractor<'a> {
    parsed_files: &'a [ParsedFile],
    registry: &'a EntityRegistry,
    resolver: CallResolver<'a>,
    relationships: Vec<Relationship>,
}

impl<'a> RelationshipExtractor<'a> {
    pub fn new(parsed_files: &'a [ParsedFile], registry: &'a EntityRegistry) -> Self {
        let mut resolver = CallResolver::new(registry);
        for pf in parsed_files {
            resolver.set_imports(&pf.file_path, &pf.imports);
        }
        Self {
            parsed_files,
            registry,
            resolver,
            relationships: Vec::new(),
        }
    }

    pub fn extract_all(self) -> Vec<Relationship> {
        self.extract_all_cancellable(None)
            .expect("no deadline means this cannot be cancelled")
    }

    /// Cancellation-aware variant of [`Self::extract_all`] (§5). The deadline is checked
    /// at each file boundary; on expiry the edges extracted so far are discarded.
    pub fn extract_all_cancellable(mut self, deadline: Option<Deadline>) -> Result<Vec<Relationship>> {
        for pf in self.parsed_files {
            if let Some(d) = deadline {
                if d.is_expired() {
                    return Err(CodeGraphError::Cancelled);
                }
            }
            self.extract_containment(pf);
            self.extract_imports(pf);
            self.extract_global_access(pf);
            for func in &pf.functions {
                self.extract_function_relationships(func);
            }
            for cls in &pf.classes {
                self.extract_class_relationships(cls, &pf.file_path);
            }
        }
        Ok(self.relationships)
    }

    fn extract_containment(&mut self, pf: &ParsedFile) {
        let file_id = EntityId::module(&pf.file_path);
        for func in &pf.functions {
            if func.parent_class.is_none() {
                self.relationships.push(
                    Relationship::new(file_id.clone(), func.unique_id(), RelationType::Contains)
                        .with_line(func.start_line),
                );
            }
        }
        for cls in &pf.classes {
            self.relationships.push(
                Relationship::new(file_id.clone(), cls.unique_id(), RelationType::Contains)
                    .with_line(cls.start_line),
            );
        }
    }

    fn extract_imports(&mut self, pf: &ParsedFile) {
        let file_id = EntityId::module(&pf.file_path);
        for imp in &pf.imports {
            if !imp.imported_names.is_empty() {
                for name in &imp.imported_names {
                    let target = if imp.module.is_empty() {
                        name.clone()
                    } else {
                        format!("{}.{}", imp.module, name)
                    };
                    let mut rel = Relationship::new(file_id.clone(), EntityId::from(target), RelationType::ImportsFrom)
                        .with_line(imp.line)
                        .with_metadata("module", imp.module.clone());
                    if let Some(alias) = &imp.alias {
                        rel = rel.with_metadata("alias", alias.clone());
                    }
                    self.relationships.push(rel);
                }
            } else {
                let mut rel = Relationship::new(file_id.clone(), EntityId::from(imp.module.clone()), RelationType::Imports)
                    .with_line(imp.line);
                if let Some(alias) = &imp.alias {
                    rel = rel.with_metadata("alias", alias.clone());
                }
                if imp.is_star {
                    rel = rel.with_metadata("star", "true");
                }
                self.relationships.push(rel);
            }
        }
    }

    fn extract_function_relationships(&mut self, func: &FunctionEntity) {
        let func_id = func.unique_id();

        for call in &func.calls {
            let resolved = self.resolver.resolve(call, func);
            match resolved.resolved_target {
                Some(target) => {
                    let rel_type = if resolved.resolution_type == "instantiation" {
                        RelationType::Instantiates
                    } else {
                        RelationType::Calls
                    };
                    self.relationships.push(
                        Relationship::new(func_id.clone(), target, rel_type)
                            .with_weight(resolved.confidence)
                            .with_metadata("resolution_type", resolved.resolution_type)
                            .with_metadata("original_call", resolved.original_call.clone()),
                    );
                }
                None => {
                    let reason = resolved
                        .metadata
                        .get("reason")
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string());
                    self.relationships.push(
                        Relationship::new(func_id.clone(), EntityId::from(call.clone()), RelationType::Calls)
                            .with_weight(0.5)
                            .with_metadata("resolution_type", "unresolved")
                            .with_metadata("reason", reason),
                    );
                }
            }
        }

        for decorator in &func.decorators {
            let mut rel = Relationship::new(
                EntityId::from(decorator.clone()),
                func_id.clone(),
                RelationType::Decorates,
            );
            if let Some(line) = func.start_line.checked_sub(1) {
                rel = rel.with_line(line);
            }
            self.relationships.push(rel);
        }

        if let Some(ret) = &func.return_type {
            self.extract_type_usage(&func_id, ret, RelationType::ReturnsType);
        }
        for param in &func.parameters {
            if let Some(hint) = &param.type_hint {
                self.extract_type_usage(&func_id, hint, RelationType::UsesType);
            }
        }
    }

    fn extract_type_usage(&mut self, source_id: &EntityId, type_str: &str, rel_type: RelationType) {
        for type_name in parse_type_string(type_str) {
            if PRIMITIVE_TYPE_TOKENS.contains(&type_name.to_lowercase().as_str()) {
                continue;
            }
            self.relationships.push(
                Relationship::new(source_id.clone(), EntityId::from(type_name), rel_type)
                    .with_metadata("type_annotation", type_str.to_string()),
            );
        }
    }

    fn extract_class_relationships(&mut self, cls: &ClassEntity, file_path: &str) {
        let cls_id = cls.unique_id();

        for base in &cls.bases {
            let base_id = match self.registry.find_by_name(base).into_iter().next() {
                Some(entity) => entity.unique_id(),
                None => EntityId::from(base.clone()),
            };
            let is_abstract_base = base == "ABC" || base == "Protocol";
            let rel_type = if is_abstract_base || base.ends_with("Protocol") {
                RelationType::Implements
            } else {
                RelationType::Inherits
            };
            self.relationships.push(
                Relationship::new(cls_id.clone(), base_id, rel_type)
                    .with_line(cls.start_line)
                    .with_metadata("is_abstract_base", is_abstract_base.to_string()),
            );
        }

        for decorator in &cls.decorators {
            let mut rel = Relationship::new(
                EntityId::from(decorator.clone()),
                cls_id.clone(),
                RelationType::Decorates,
            );
            if let Some(line) = cls.start_line.checked_sub(1) {
                rel = rel.with_line(line);
            }
            self.relationships.push(rel);
        }

        self.extract_overrides(cls, file_path);
    }

    fn extract_overrides(&mut self, cls: &ClassEntity, file_path: &str) {
        if cls.bases.is_empty() {
            return;
        }
        let class_methods: HashSet<&str> = cls.method_names.iter().map(|s| s.as_str()).collect();

        for base_name in &cls.bases {
            let Some(base_cls) = self.registry.get_class(base_name) else {
                continue;
            };
            let base_methods: HashSet<&str> = base_cls.method_names.iter().map(|s| s.as_str()).collect();
            let overridden: BTreeSet<&str> = class_methods.intersection(&base_methods).copied().collect();

            for method_name in overridden {
                if method_name.starts_with('_') && !method_name.starts_with("__") {
                    continue;
                }
                let child_id = EntityId::member(file_path, &cls.name, method_name);
                let parent_id = EntityId::member(&base_cls.file_path, base_name, method_name);
                self.relationships.push(
                    Relationship::new(child_id, parent_id, RelationType::Overrides)
                        .with_metadata("parent_class", base_name.clone()),
                );
            }
        }
    }

    fn extract_global_access(&mut self, pf: &ParsedFile) {
        for func in &pf.functions {
            let func_id = func.unique_id();
            for global_var in &func.reads_globals {
                self.relationships.push(
                    Relationship::new(func_id.clone(), EntityId::from(global_var.clone()), RelationType::ReadsGlobal)
                        .with_metadata("file", pf.file_path.clone()),
                );
            }
            for global_var in &func.writes_globals {
                self.relationships.push(
                    Relationship::new(func_id.clone(), EntityId::from(global_var.clone()), RelationType::WritesGlobal)
                        .with_metadata("file", pf.file_path.clone()),
                );
            }
        }
    }
}

fn parse_type_string(type_str: &str) -> Vec<String> {
    type_str
        .replace(['[', ']', ',', '|'], " ")
        .split_whitespace()
        .filter(|part| !part.starts_with("..."))
        .map(|part| part.to_string())
        .collect()
}

/// Convenience entry point mirroring the component contract: registry build, resolver
/// wiring and extraction in one call.
pub fn extract_relationships(parsed_files: &[ParsedFile]) -> Vec<Relationship> {
    let registry = EntityRegistry::build(parsed_files);
    RelationshipExtractor::new(parsed_files, &registry).extract_all()
}

/// Cancellation-aware variant of [`extract_relationships`] (§5), covering both the
/// registry build and the extraction sweep under a single deadline.
pub fn extract_relationships_cancellable(
    parsed_files: &[ParsedFile],
    deadline: Option<Deadline>,
) -> Result<Vec<Relationship>> {
    let registry = EntityRegistry::build_cancellable(parsed_files, deadline)?;
    RelationshipExtractor::new(parsed_files, &registry).extract_all_cancellable(deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{FunctionEntity, ImportEntity, Language, ModuleEntity};

    fn base_module(file_path: &str) -> ModuleEntity {
        ModuleEntity {
            file_path: file_path.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn plain_recursion_emits_one_self_call_edge() {
        let f = FunctionEntity {
            name: "f".to_string(),
            file_path: "a.py".to_string(),
            calls: vec!["f".to_string()],
            cyclomatic_complexity: 2,
            cognitive_complexity: 2,
            lines_of_code: 3,
            ..Default::default()
        };
        let pf = ParsedFile {
            file_path: "a.py".to_string(),
            language: Language::Python,
            module: Some(base_module("a.py")),
            functions: vec![f],
            classes: vec![],
            imports: vec![],
            variables: vec![],
            parse_success: true,
            parse_errors: vec![],
        };
        let rels = extract_relationships(&[pf]);
        let calls: Vec<_> = rels.iter().filter(|r| r.rel_type == RelationType::Calls).collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target.as_str(), "a.py:f");
        assert_eq!(calls[0].weight, 1.0);
    }

    #[test]
    fn method_override_chain_emits_inherits_overrides_and_super_call() {
        let base = ClassEntity {
            name: "B".to_string(),
            file_path: "a.py".to_string(),
            method_names: vec!["m".to_string()],
            ..Default::default()
        };
        let derived = ClassEntity {
            name: "D".to_string(),
            file_path: "a.py".to_string(),
            bases: vec!["B".to_string()],
            method_names: vec!["m".to_string()],
            ..Default::default()
        };
        let base_m = FunctionEntity {
            name: "m".to_string(),
            file_path: "a.py".to_string(),
            parent_class: Some("B".to_string()),
            cyclomatic_complexity: 1,
            lines_of_code: 1,
            ..Default::default()
        };
        let derived_m = FunctionEntity {
            name: "m".to_string(),
            file_path: "a.py".to_string(),
            parent_class: Some("D".to_string()),
            calls: vec!["super().m".to_string()],
            cyclomatic_complexity: 1,
            lines_of_code: 1,
            ..Default::default()
        };
        let pf = ParsedFile {
            file_path: "a.py".to_string(),
            language: Language::Python,
            module: Some(base_module("a.py")),
            functions: vec![base_m, derived_m],
            classes: vec![base, derived],
            imports: vec![],
            variables: vec![],
            parse_success: true,
            parse_errors: vec![],
        };
        let rels = extract_relationships(&[pf]);

        assert!(rels
            .iter()
            .any(|r| r.rel_type == RelationType::Inherits && r.source.as_str() == "a.py:D" && r.target.as_str() == "a.py:B"));
        assert!(rels.iter().any(|r| r.rel_type == RelationType::Overrides
            && r.source.as_str() == "a.py:D.m"
            && r.target.as_str() == "a.py:B.m"));
        let super_call = rels
            .iter()
            .find(|r| r.rel_type == RelationType::Calls && r.source.as_str() == "a.py:D.m")
            .unwrap();
        assert_eq!(super_call.target.as_str(), "a.py:B.m");
        assert_eq!(super_call.weight, 0.95);
    }

    #[test]
    fn imports_from_named_list_emit_one_edge_per_name() {
        let imp = ImportEntity {
            file_path: "a.py".to_string(),
            line: 1,
            module: "os.path".to_string(),
            imported_names: vec!["join".to_string(), "exists".to_string()],
            alias: None,
            is_relative: false,
            is_star: false,
            relative_level: 0,
        };
        let pf = ParsedFile {
            file_path: "a.py".to_string(),
            language: Language::Python,
            module: Some(base_module("a.py")),
            functions: vec![],
            classes: vec![],
            imports: vec![imp],
            variables: vec![],
            parse_success: true,
            parse_errors: vec![],
        };
        let rels = extract_relationships(&[pf]);
        let imports_from: Vec<_> = rels.iter().filter(|r| r.rel_type == RelationType::ImportsFrom).collect();
        assert_eq!(imports_from.len(), 2);
        assert!(imports_from.iter().any(|r| r.target.as_str() == "os.path.join"));
        assert!(imports_from.iter().any(|r| r.target.as_str() == "os.path.exists"));
    }

    #[test]
    fn an_already_expired_deadline_cancels_extraction() {
        let pf = ParsedFile {
            file_path: "a.py".to_string(),
            language: Language::Python,
            module: Some(base_module("a.py")),
            functions: vec![],
            classes: vec![],
            imports: vec![],
            variables: vec![],
            parse_success: true,
            parse_errors: vec![],
        };
        let expired = Deadline::after(std::time::Duration::from_secs(0));
        std::thread::sleep(std::time::Duration::from_millis(5));

        let result = extract_relationships_cancellable(&[pf], Some(expired));
        assert!(matches!(result, Err(CodeGraphError::Cancelled)));
    }
}
