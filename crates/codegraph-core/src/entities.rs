use crate::types::{EntityId, Language};
use serde::{Deserialize, Serialize};

/// A single parameter of a function, in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub type_hint: Option<String>,
    pub default_value: Option<String>,
    pub is_variadic_positional: bool,
    pub is_variadic_keyword: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default_value: None,
            is_variadic_positional: false,
            is_variadic_keyword: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionEntity {
    pub name: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
    pub is_async: bool,
    pub is_generator: bool,
    pub is_method: bool,
    pub is_static: bool,
    pub is_classmethod: bool,
    pub is_property: bool,
    pub is_abstract: bool,
    pub parent_class: Option<String>,
    /// Always >= 1 (§3 invariant iii); nested functions do not contribute to this total.
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    pub lines_of_code: u32,
    pub calls: Vec<String>,
    pub reads_globals: Vec<String>,
    pub writes_globals: Vec<String>,
}

impl FunctionEntity {
    pub fn unique_id(&self) -> EntityId {
        EntityId::function(&self.file_path, self.parent_class.as_deref(), &self.name)
    }

    /// A Python-flavoured rendering of the callable's signature, mirroring the original
    /// implementation's presentation layer rather than anything the graph keys on.
    pub fn signature(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|p| {
                let mut s = String::new();
                if p.is_variadic_positional {
                    s.push('*');
                } else if p.is_variadic_keyword {
                    s.push_str("**");
                }
                s.push_str(&p.name);
                if let Some(hint) = &p.type_hint {
                    s.push_str(": ");
                    s.push_str(hint);
                }
                if let Some(default) = &p.default_value {
                    s.push_str(" = ");
                    s.push_str(default);
                }
                s
            })
            .collect::<Vec<_>>()
            .join(", ");
        match &self.return_type {
            Some(ret) => format!("def {}({}) -> {}", self.name, params, ret),
            None => format!("def {}({})", self.name, params),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClassEntity {
    pub name: String,
    pub file_path: String,
    pub start_line: u32,
    pub end_line: u32,
    pub bases: Vec<String>,
    pub metaclass: Option<String>,
    pub is_abstract: bool,
    pub is_dataclass: bool,
    pub is_protocol: bool,
    pub decorators: Vec<String>,
    pub docstring: Option<String>,
    pub method_names: Vec<String>,
    pub class_variables: Vec<String>,
    pub instance_variables: Vec<String>,
    pub nested_classes: Vec<String>,
}

impl ClassEntity {
    pub fn unique_id(&self) -> EntityId {
        EntityId::top_level(&self.file_path, &self.name)
    }

    pub fn inheritance_depth(&self) -> usize {
        self.bases.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportEntity {
    pub file_path: String,
    pub line: u32,
    pub module: String,
    pub imported_names: Vec<String>,
    pub alias: Option<String>,
    pub is_relative: bool,
    pub is_star: bool,
    pub relative_level: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModuleEntity {
    pub file_path: String,
    pub docstring: Option<String>,
    pub all_exports: Vec<String>,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    pub global_variables: Vec<String>,
    pub imports: Vec<String>,
    pub total_lines: u32,
    pub code_lines: u32,
    pub comment_lines: u32,
    pub blank_lines: u32,
}

impl ModuleEntity {
    pub fn unique_id(&self) -> EntityId {
        EntityId::module(&self.file_path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableEntity {
    pub name: String,
    pub file_path: String,
    pub line: u32,
    pub type_annotation: Option<String>,
    pub inferred_type: Option<String>,
    pub scope: String,
    pub parent: Option<String>,
    pub is_constant: bool,
    pub is_export: bool,
}

impl VariableEntity {
    pub fn unique_id(&self) -> EntityId {
        match &self.parent {
            Some(parent) => EntityId::member(&self.file_path, parent, &self.name),
            None => EntityId::top_level(&self.file_path, &self.name),
        }
    }
}

/// The record a single parsed source file reduces to (§4.A contract).
///
/// `parse_success = false` files still carry a populated `file_path` and language so
/// downstream stages can account for them without reading the (failed) entity lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedFile {
    pub file_path: String,
    pub language: Language,
    pub module: Option<ModuleEntity>,
    pub functions: Vec<FunctionEntity>,
    pub classes: Vec<ClassEntity>,
    pub imports: Vec<ImportEntity>,
    pub variables: Vec<VariableEntity>,
    pub parse_success: bool,
    pub parse_errors: Vec<String>,
}

impl ParsedFile {
    pub fn failed(file_path: impl Into<String>, language: Language, error: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            language,
            module: None,
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
            variables: Vec::new(),
            parse_success: false,
            parse_errors: vec![error.into()],
        }
    }

    /// All function- and class-level entities, for callers that want a flat listing
    /// without caring which kind they hold.
    pub fn all_callable_and_type_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.functions.iter().map(|f| f.unique_id()).collect();
        ids.extend(self.classes.iter().map(|c| c.unique_id()));
        ids
    }
}
