use codegraph_core::{CodeGraphError, ClassEntity, Deadline, EntityId, FunctionEntity, ParsedFile, Result};
use std::collections::HashMap;

/// Either half of the two entity kinds the registry indexes (§4.C): functions/methods
/// and classes. Modules, imports and variables are not call-resolution targets and are
/// not registered here.
#[derive(Debug, Clone)]
pub enum RegisteredEntity {
    Function(FunctionEntity),
    Class(ClassEntity),
}

impl RegisteredEntity {
    pub fn unique_id(&self) -> EntityId {
        match self {
            RegisteredEntity::Function(f) => f.unique_id(),
            RegisteredEntity::Class(c) => c.unique_id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RegisteredEntity::Function(f) => &f.name,
            RegisteredEntity::Class(c) => &c.name,
        }
    }

    pub fn file_path(&self) -> &str {
        match self {
            RegisteredEntity::Function(f) => &f.file_path,
            RegisteredEntity::Class(c) => &c.file_path,
        }
    }

    pub fn parent_class(&self) -> Option<&str> {
        match self {
            RegisteredEntity::Function(f) => f.parent_class.as_deref(),
            RegisteredEntity::Class(_) => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionEntity> {
        match self {
            RegisteredEntity::Function(f) => Some(f),
            RegisteredEntity::Class(_) => None,
        }
    }
}

/// Three lookup indices over every function/method and class in a repository snapshot
/// (§4.C): by unique id (one-to-one), by simple name (one-to-many, order-preserving),
/// and by file path (one-to-many). Classes are additionally indexed by name, with the
/// last registration winning a name collision. The registry is write-once: it is built
/// in full from a `ParsedFile[]` and never mutated afterward.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    by_id: HashMap<EntityId, RegisteredEntity>,
    by_name: HashMap<String, Vec<EntityId>>,
    by_file: HashMap<String, Vec<EntityId>>,
    classes: HashMap<String, ClassEntity>,
}

impl EntityRegistry {
    pub fn build(parsed_files: &[ParsedFile]) -> Self {
        Self::build_cancellable(parsed_files, None).expect("no deadline means this cannot be cancelled")
    }

    /// Cancellation-aware variant of [`Self::build`] (§5). The deadline is checked at
    /// each file boundary; on expiry the partially built registry is discarded.
    pub fn build_cancellable(parsed_files: &[ParsedFile], deadline: Option<Deadline>) -> Result<Self> {
        let mut registry = Self::default();
        for pf in parsed_files {
            if let Some(d) = deadline {
                if d.is_expired() {
                    return Err(CodeGraphError::Cancelled);
                }
            }
            for func in &pf.functions {
                registry.register(RegisteredEntity::Function(func.clone()));
            }
            for cls in &pf.classes {
                registry.register(RegisteredEntity::Class(cls.clone()));
            }
        }
        Ok(registry)
    }

    fn register(&mut self, entity: RegisteredEntity) {
        let id = entity.unique_id();
        let name = entity.name().to_string();
        let file = entity.file_path().to_string();

        if let RegisteredEntity::Class(c) = &entity {
            self.classes.insert(c.name.clone(), c.clone());
        }

        self.by_name.entry(name).or_default().push(id.clone());
        self.by_file.entry(file).or_default().push(id.clone());
        self.by_id.insert(id, entity);
    }

    pub fn find_by_id(&self, id: &EntityId) -> Option<&RegisteredEntity> {
        self.by_id.get(id)
    }

    /// All entities sharing `name`, in registration order.
    pub fn find_by_name(&self, name: &str) -> Vec<&RegisteredEntity> {
        self.by_name
            .get(name)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    pub fn find_in_file(&self, file_path: &str, name: &str) -> Option<&RegisteredEntity> {
        self.by_file.get(file_path)?.iter().find_map(|id| {
            let entity = self.by_id.get(id)?;
            (entity.name() == name).then_some(entity)
        })
    }

    pub fn get_class(&self, name: &str) -> Option<&ClassEntity> {
        self.classes.get(name)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.by_id.contains_key(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::Language;

    fn file(path: &str, functions: Vec<FunctionEntity>, classes: Vec<ClassEntity>) -> ParsedFile {
        ParsedFile {
            file_path: path.to_string(),
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

    fn func(file_path: &str, name: &str, parent_class: Option<&str>) -> FunctionEntity {
        FunctionEntity {
            name: name.to_string(),
            file_path: file_path.to_string(),
            parent_class: parent_class.map(|s| s.to_string()),
            cyclomatic_complexity: 1,
            lines_of_code: 1,
            ..Default::default()
        }
    }

    #[test]
    fn finds_method_by_file_and_name_collisions_are_name_indexed() {
        let pf = file(
            "a.py",
            vec![func("a.py", "run", Some("A")), func("a.py", "run", Some("B"))],
            vec![],
        );
        let registry = EntityRegistry::build(&[pf]);
        assert_eq!(registry.find_by_name("run").len(), 2);
        assert!(registry
            .find_by_id(&EntityId::member("a.py", "A", "run"))
            .is_some());
    }

    #[test]
    fn last_class_registration_wins_name_collision() {
        let cls_a = ClassEntity {
            name: "Dup".to_string(),
            file_path: "a.py".to_string(),
            ..Default::default()
        };
        let cls_b = ClassEntity {
            name: "Dup".to_string(),
            file_path: "b.py".to_string(),
            ..Default::default()
        };
        let registry = EntityRegistry::build(&[
            file("a.py", vec![], vec![cls_a]),
            file("b.py", vec![], vec![cls_b]),
        ]);
        assert_eq!(registry.get_class("Dup").unwrap().file_path, "b.py");
    }

    #[test]
    fn an_already_expired_deadline_cancels_registry_build() {
        let pf = file("a.py", vec![func("a.py", "run", None)], vec![]);
        let expired = Deadline::after(std::time::Duration::from_secs(0));
        std::thread::sleep(std::time::Duration::from_millis(5));

        let result = EntityRegistry::build_cancellable(&[pf], Some(expired));
        assert!(matches!(result, Err(CodeGraphError::Cancelled)));
    }
}
