use crate::complexity::{
    calculate_cognitive_complexity, calculate_cyclomatic_complexity, contains_await, contains_yield,
};
use crate::scope::{extract_local_definitions, get_accessed_globals};
use codegraph_core::{
    ClassEntity, FunctionEntity, ImportEntity, Language, ModuleEntity, Parameter, ParsedFile,
    VariableEntity,
};
use tree_sitter::{Node, Tree};

/// Produces a complete `ParsedFile` from one Python source file in a single traversal,
/// in the spirit of the teacher's unified node+edge collector — except our collector
/// accumulates typed entities rather than generic nodes, since the data model here is
/// `FunctionEntity`/`ClassEntity`/... rather than a language-agnostic `CodeNode`.
pub struct PythonFileParser;

impl PythonFileParser {
    pub fn parse(tree: &Tree, source: &str, file_path: &str) -> ParsedFile {
        let bytes = source.as_bytes();
        let root = tree.root_node();
        let mut collector = Collector {
            source: bytes,
            file_path,
            functions: Vec::new(),
            classes: Vec::new(),
            imports: Vec::new(),
            variables: Vec::new(),
        };
        collector.walk_block(&root, None);

        let module = ModuleEntity {
            file_path: file_path.to_string(),
            docstring: first_string_statement(&root, bytes),
            all_exports: Vec::new(),
            functions: collector
                .functions
                .iter()
                .filter(|f| f.parent_class.is_none())
                .map(|f| f.name.clone())
                .collect(),
            classes: collector.classes.iter().map(|c| c.name.clone()).collect(),
            global_variables: collector
                .variables
                .iter()
                .filter(|v| v.parent.is_none())
                .map(|v| v.name.clone())
                .collect(),
            imports: collector.imports.iter().map(|i| i.module.clone()).collect(),
            total_lines: root.end_position().row as u32 + 1,
            code_lines: count_code_lines(source),
            comment_lines: count_comment_lines(source),
            blank_lines: count_blank_lines(source),
        };

        ParsedFile {
            file_path: file_path.to_string(),
            language: Language::Python,
            module: Some(module),
            functions: collector.functions,
            classes: collector.classes,
            imports: collector.imports,
            variables: collector.variables,
            parse_success: true,
            parse_errors: Vec::new(),
        }
    }
}

struct Collector<'a> {
    source: &'a [u8],
    file_path: &'a str,
    functions: Vec<FunctionEntity>,
    classes: Vec<ClassEntity>,
    imports: Vec<ImportEntity>,
    variables: Vec<VariableEntity>,
}

impl<'a> Collector<'a> {
    fn text(&self, n: &Node) -> String {
        n.utf8_text(self.source).unwrap_or("").to_string()
    }

    /// Walks the statements of a block (module body or class body), dispatching
    /// definitions and imports. `parent_class` is `Some(name)` while inside a class body.
    fn walk_block(&mut self, block: &Node, parent_class: Option<&str>) {
        let mut cursor = block.walk();
        if !cursor.goto_first_child() {
            return;
        }
        loop {
            let stmt = cursor.node();
            self.dispatch_statement(&stmt, parent_class, Vec::new());
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    fn dispatch_statement(&mut self, stmt: &Node, parent_class: Option<&str>, mut decorators: Vec<String>) {
        match stmt.kind() {
            "decorated_definition" => {
                let mut cursor = stmt.walk();
                if cursor.goto_first_child() {
                    loop {
                        let child = cursor.node();
                        match child.kind() {
                            "decorator" => decorators.push(decorator_name(&child, self.source)),
                            "function_definition" | "async_function_definition" => {
                                self.collect_function(&child, parent_class, decorators.clone());
                            }
                            "class_definition" => {
                                self.collect_class(&child, parent_class, decorators.clone());
                            }
                            _ => {}
                        }
                        if !cursor.goto_next_sibling() {
                            break;
                        }
                    }
                }
            }
            "function_definition" | "async_function_definition" => {
                self.collect_function(stmt, parent_class, decorators);
            }
            "class_definition" => {
                self.collect_class(stmt, parent_class, decorators);
            }
            "import_statement" | "import_from_statement" => {
                self.collect_import(stmt);
            }
            "expression_statement" => {
                self.collect_variable(stmt, parent_class);
            }
            _ => {}
        }
    }

    fn collect_function(&mut self, node: &Node, parent_class: Option<&str>, decorators: Vec<String>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(&name_node);
        let parameters = self.parse_parameters(node);
        let return_type = node
            .child_by_field_name("return_type")
            .map(|n| self.text(&n));

        let is_static = decorators.iter().any(|d| d == "staticmethod");
        let is_classmethod = decorators.iter().any(|d| d == "classmethod");
        let is_property = decorators.iter().any(|d| d == "property");
        let is_abstract = decorators
            .iter()
            .any(|d| d == "abstractmethod" || d == "abstractproperty" || d.ends_with(".abstractmethod"));

        let locals = extract_local_definitions(node, self.source);
        let (reads_globals, writes_globals) = get_accessed_globals(node, self.source, &locals);
        let calls = self.collect_calls(node);

        let entity = FunctionEntity {
            name: name.clone(),
            file_path: self.file_path.to_string(),
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            parameters,
            return_type,
            decorators,
            docstring: node
                .child_by_field_name("body")
                .and_then(|b| first_string_statement(&b, self.source)),
            is_async: node.kind() == "async_function_definition" || contains_await(node),
            is_generator: contains_yield(node),
            is_method: parent_class.is_some(),
            is_static,
            is_classmethod,
            is_property,
            is_abstract,
            parent_class: parent_class.map(|s| s.to_string()),
            cyclomatic_complexity: calculate_cyclomatic_complexity(node),
            cognitive_complexity: calculate_cognitive_complexity(node, self.source, &name),
            lines_of_code: crate::complexity::count_lines_of_code(node),
            calls,
            reads_globals,
            writes_globals,
        };

        if name == "__init__" {
            if let Some(class) = parent_class {
                self.collect_instance_variables(node, class);
            }
        }

        self.functions.push(entity);
    }

    fn parse_parameters(&self, func_node: &Node) -> Vec<Parameter> {
        let mut params = Vec::new();
        let Some(param_list) = func_node.child_by_field_name("parameters") else {
            return params;
        };
        let mut cursor = param_list.walk();
        if !cursor.goto_first_child() {
            return params;
        }
        loop {
            let p = cursor.node();
            match p.kind() {
                "identifier" => {
                    let name = self.text(&p);
                    if name != "self" && name != "cls" {
                        params.push(Parameter::new(name));
                    }
                }
                "typed_parameter" => {
                    let name = first_named_child(&p, "identifier")
                        .map(|n| self.text(&n))
                        .unwrap_or_default();
                    if name != "self" && name != "cls" {
                        let mut param = Parameter::new(name);
                        param.type_hint = p.child_by_field_name("type").map(|t| self.text(&t));
                        params.push(param);
                    }
                }
                "default_parameter" | "typed_default_parameter" => {
                    let name = p
                        .child_by_field_name("name")
                        .map(|n| self.text(&n))
                        .unwrap_or_default();
                    if name != "self" && name != "cls" {
                        let mut param = Parameter::new(name);
                        param.type_hint = p.child_by_field_name("type").map(|t| self.text(&t));
                        param.default_value = p.child_by_field_name("value").map(|v| self.text(&v));
                        params.push(param);
                    }
                }
                "list_splat_pattern" => {
                    if let Some(ident) = first_named_child(&p, "identifier") {
                        let mut param = Parameter::new(self.text(&ident));
                        param.is_variadic_positional = true;
                        params.push(param);
                    }
                }
                "dictionary_splat_pattern" => {
                    if let Some(ident) = first_named_child(&p, "identifier") {
                        let mut param = Parameter::new(self.text(&ident));
                        param.is_variadic_keyword = true;
                        params.push(param);
                    }
                }
                _ => {}
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
        params
    }

    /// Every call expression inside the function body, skipping nested function
    /// definitions (§4.A: calls are not attributed to the enclosing function).
    fn collect_calls(&self, func_node: &Node) -> Vec<String> {
        let mut calls = Vec::new();
        if let Some(body) = func_node.child_by_field_name("body") {
            self.walk_calls(&body, func_node, &mut calls);
        }
        calls
    }

    fn walk_calls(&self, n: &Node, root: &Node, calls: &mut Vec<String>) {
        if n.id() != root.id()
            && matches!(n.kind(), "function_definition" | "async_function_definition")
        {
            return;
        }
        if n.kind() == "call" {
            if let Some(target) = n.child_by_field_name("function") {
                calls.push(self.text(&target));
            }
        }
        let mut cursor = n.walk();
        if cursor.goto_first_child() {
            loop {
                self.walk_calls(&cursor.node(), root, calls);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }

    fn collect_instance_variables(&mut self, init_node: &Node, class_name: &str) {
        let Some(body) = init_node.child_by_field_name("body") else {
            return;
        };
        let mut names = Vec::new();
        self.walk_self_assignments(&body, init_node, &mut names);
        if let Some(class) = self.classes.iter_mut().find(|c| c.name == class_name) {
            for name in names {
                if !class.instance_variables.contains(&name) {
                    class.instance_variables.push(name);
                }
            }
        }
    }

    fn walk_self_assignments(&self, n: &Node, root: &Node, names: &mut Vec<String>) {
        if n.id() != root.id()
            && matches!(n.kind(), "function_definition" | "async_function_definition")
        {
            return;
        }
        if n.kind() == "assignment" {
            if let Some(target) = n.child_by_field_name("left") {
                if target.kind() == "attribute" {
                    if let (Some(obj), Some(attr)) = (
                        target.child_by_field_name("object"),
                        target.child_by_field_name("attribute"),
                    ) {
                        if self.text(&obj) == "self" {
                            names.push(self.text(&attr));
                        }
                    }
                }
            }
        }
        let mut cursor = n.walk();
        if cursor.goto_first_child() {
            loop {
                self.walk_self_assignments(&cursor.node(), root, names);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }

    fn collect_class(&mut self, node: &Node, parent_class: Option<&str>, decorators: Vec<String>) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(&name_node);

        let mut bases = Vec::new();
        let mut metaclass = None;
        if let Some(superclasses) = node.child_by_field_name("superclasses") {
            let mut cursor = superclasses.walk();
            if cursor.goto_first_child() {
                loop {
                    let arg = cursor.node();
                    match arg.kind() {
                        "identifier" | "attribute" => bases.push(self.text(&arg)),
                        "keyword_argument" => {
                            if let (Some(k), Some(v)) =
                                (arg.child_by_field_name("name"), arg.child_by_field_name("value"))
                            {
                                if self.text(&k) == "metaclass" {
                                    metaclass = Some(self.text(&v));
                                }
                            }
                        }
                        _ => {}
                    }
                    if !cursor.goto_next_sibling() {
                        break;
                    }
                }
            }
        }

        let is_dataclass = decorators.iter().any(|d| d == "dataclass");
        let is_abstract = bases.iter().any(|b| b.contains("ABC"))
            || metaclass.as_deref().map(|m| m.contains("ABCMeta")).unwrap_or(false);
        let is_protocol = bases.iter().any(|b| b.contains("Protocol"));

        let mut class_variables = Vec::new();
        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            if cursor.goto_first_child() {
                loop {
                    let stmt = cursor.node();
                    if stmt.kind() == "expression_statement" {
                        if let Some(expr) = stmt.named_child(0) {
                            match expr.kind() {
                                "assignment" => {
                                    if let Some(target) = expr.child_by_field_name("left") {
                                        if target.kind() == "identifier" {
                                            class_variables.push(self.text(&target));
                                        }
                                    }
                                }
                                "identifier" => {}
                                _ => {}
                            }
                        }
                    }
                    if !cursor.goto_next_sibling() {
                        break;
                    }
                }
            }
        }

        let entity = ClassEntity {
            name: name.clone(),
            file_path: self.file_path.to_string(),
            start_line: node.start_position().row as u32 + 1,
            end_line: node.end_position().row as u32 + 1,
            bases,
            metaclass,
            is_abstract,
            is_dataclass,
            is_protocol,
            decorators,
            docstring: node
                .child_by_field_name("body")
                .and_then(|b| first_string_statement(&b, self.source)),
            method_names: Vec::new(),
            class_variables,
            instance_variables: Vec::new(),
            nested_classes: Vec::new(),
        };
        self.classes.push(entity);
        let _ = parent_class;

        if let Some(body) = node.child_by_field_name("body") {
            let before = self.functions.len();
            self.walk_block(&body, Some(&name));
            let method_names: Vec<String> = self.functions[before..]
                .iter()
                .filter(|f| f.parent_class.as_deref() == Some(name.as_str()))
                .map(|f| f.name.clone())
                .collect();
            let nested: Vec<String> = self
                .classes
                .iter()
                .skip_while(|c| c.name != name)
                .skip(1)
                .map(|c| c.name.clone())
                .collect();
            if let Some(class) = self.classes.iter_mut().find(|c| c.name == name) {
                class.method_names = method_names;
                class.nested_classes = nested;
            }
        }
    }

    fn collect_import(&mut self, node: &Node) {
        let line = node.start_position().row as u32 + 1;
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                if cursor.goto_first_child() {
                    loop {
                        let child = cursor.node();
                        match child.kind() {
                            "dotted_name" => {
                                self.imports.push(ImportEntity {
                                    file_path: self.file_path.to_string(),
                                    line,
                                    module: self.text(&child),
                                    imported_names: Vec::new(),
                                    alias: None,
                                    is_relative: false,
                                    is_star: false,
                                    relative_level: 0,
                                });
                            }
                            "aliased_import" => {
                                let module = child
                                    .child_by_field_name("name")
                                    .map(|n| self.text(&n))
                                    .unwrap_or_default();
                                let alias = child.child_by_field_name("alias").map(|n| self.text(&n));
                                self.imports.push(ImportEntity {
                                    file_path: self.file_path.to_string(),
                                    line,
                                    module,
                                    imported_names: Vec::new(),
                                    alias,
                                    is_relative: false,
                                    is_star: false,
                                    relative_level: 0,
                                });
                            }
                            _ => {}
                        }
                        if !cursor.goto_next_sibling() {
                            break;
                        }
                    }
                }
            }
            "import_from_statement" => {
                let module_node = node.child_by_field_name("module_name");
                let is_relative = module_node
                    .map(|m| m.kind() == "relative_import")
                    .unwrap_or(false);
                let relative_level = module_node
                    .map(|m| self.text(&m).chars().take_while(|c| *c == '.').count() as u32)
                    .unwrap_or(0);
                let module = module_node.map(|n| self.text(&n)).unwrap_or_default();

                let mut imported_names = Vec::new();
                let mut is_star = false;
                let mut cursor = node.walk();
                if cursor.goto_first_child() {
                    loop {
                        let child = cursor.node();
                        match child.kind() {
                            "wildcard_import" => is_star = true,
                            "dotted_name" if child.id() != module_node.map(|m| m.id()).unwrap_or(0) => {
                                imported_names.push(self.text(&child));
                            }
                            "aliased_import" => {
                                if let Some(n) = child.child_by_field_name("name") {
                                    imported_names.push(self.text(&n));
                                }
                            }
                            _ => {}
                        }
                        if !cursor.goto_next_sibling() {
                            break;
                        }
                    }
                }

                self.imports.push(ImportEntity {
                    file_path: self.file_path.to_string(),
                    line,
                    module,
                    imported_names,
                    alias: None,
                    is_relative,
                    is_star,
                    relative_level,
                });
            }
            _ => {}
        }
    }

    fn collect_variable(&mut self, stmt: &Node, parent_class: Option<&str>) {
        // Only top-level (module scope) assignments are treated as module variables;
        // class-body assignments are handled as `class_variables` in `collect_class`.
        if parent_class.is_some() {
            return;
        }
        let Some(expr) = stmt.named_child(0) else {
            return;
        };
        let (target, type_annotation) = match expr.kind() {
            "assignment" => (expr.child_by_field_name("left"), expr.child_by_field_name("type")),
            _ => return,
        };
        let Some(target) = target else { return };
        if target.kind() != "identifier" {
            return;
        }
        let name = self.text(&target);
        let is_constant = name.chars().all(|c| c.is_uppercase() || c == '_' || c.is_numeric());
        self.variables.push(VariableEntity {
            name,
            file_path: self.file_path.to_string(),
            line: stmt.start_position().row as u32 + 1,
            type_annotation: type_annotation.map(|t| self.text(&t)),
            inferred_type: None,
            scope: "module".to_string(),
            parent: None,
            is_constant,
            is_export: false,
        });
    }
}

fn decorator_name(decorator: &Node, source: &[u8]) -> String {
    // A decorator's syntactic name with any call arguments stripped (§4.A).
    let mut cursor = decorator.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            match child.kind() {
                "identifier" | "attribute" => {
                    return child.utf8_text(source).unwrap_or("").to_string();
                }
                "call" => {
                    if let Some(f) = child.child_by_field_name("function") {
                        return f.utf8_text(source).unwrap_or("").to_string();
                    }
                }
                _ => {}
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    String::new()
}

fn first_named_child<'a>(n: &Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = n.walk();
    if cursor.goto_first_child() {
        loop {
            if cursor.node().kind() == kind {
                return Some(cursor.node());
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    None
}

/// The first expression-statement string literal of a body, quotes stripped and
/// trimmed (§4.A docstring rule).
fn first_string_statement(block: &Node, source: &[u8]) -> Option<String> {
    let first = block.named_child(0)?;
    if first.kind() != "expression_statement" {
        return None;
    }
    let expr = first.named_child(0)?;
    if expr.kind() != "string" {
        return None;
    }
    let raw = expr.utf8_text(source).ok()?;
    Some(strip_string_quotes(raw))
}

fn count_blank_lines(source: &str) -> u32 {
    source.lines().filter(|l| l.trim().is_empty()).count() as u32
}

/// A line counts as a comment line if, once trimmed, it starts with `#`. This is a
/// textual heuristic (it does not distinguish a `#` inside a string literal) matching
/// the line-oriented counters the original tooling uses for this metric.
fn count_comment_lines(source: &str) -> u32 {
    source
        .lines()
        .filter(|l| l.trim_start().starts_with('#'))
        .count() as u32
}

fn count_code_lines(source: &str) -> u32 {
    source
        .lines()
        .filter(|l| {
            let t = l.trim();
            !t.is_empty() && !t.starts_with('#')
        })
        .count() as u32
}

fn strip_string_quotes(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed
        .trim_start_matches("r\"\"\"")
        .trim_start_matches("\"\"\"")
        .trim_start_matches("'''")
        .trim_start_matches('"')
        .trim_start_matches('\'');
    let stripped = stripped
        .trim_end_matches("\"\"\"")
        .trim_end_matches("'''")
        .trim_end_matches('"')
        .trim_end_matches('\'');
    stripped.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(code: &str) -> Tree {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into()).unwrap();
        parser.parse(code, None).unwrap()
    }

    #[test]
    fn top_level_function_is_captured_with_complexity() {
        let code = "def helper(x):\n    if x:\n        return 1\n    return 0\n";
        let tree = parse(code);
        let parsed = PythonFileParser::parse(&tree, code, "mod.py");
        assert_eq!(parsed.functions.len(), 1);
        assert_eq!(parsed.functions[0].cyclomatic_complexity, 2);
        assert!(parsed.functions[0].parent_class.is_none());
    }

    #[test]
    fn method_has_parent_class_and_unique_id() {
        let code = "class Foo:\n    def bar(self):\n        return 1\n";
        let tree = parse(code);
        let parsed = PythonFileParser::parse(&tree, code, "mod.py");
        assert_eq!(parsed.classes.len(), 1);
        assert_eq!(parsed.classes[0].method_names, vec!["bar".to_string()]);
        let method = &parsed.functions[0];
        assert_eq!(method.parent_class.as_deref(), Some("Foo"));
        assert_eq!(method.unique_id().as_str(), "mod.py:Foo.bar");
    }

    #[test]
    fn docstring_quotes_are_stripped() {
        let code = "def f():\n    \"\"\"Does a thing.\"\"\"\n    return 1\n";
        let tree = parse(code);
        let parsed = PythonFileParser::parse(&tree, code, "mod.py");
        assert_eq!(parsed.functions[0].docstring.as_deref(), Some("Does a thing."));
    }

    #[test]
    fn import_from_statement_captures_names() {
        let code = "from os import path, getcwd\n";
        let tree = parse(code);
        let parsed = PythonFileParser::parse(&tree, code, "mod.py");
        assert_eq!(parsed.imports.len(), 1);
        assert_eq!(parsed.imports[0].module, "os");
        assert_eq!(parsed.imports[0].imported_names, vec!["path", "getcwd"]);
    }

    #[test]
    fn self_attribute_assignment_in_init_is_instance_variable() {
        let code = "class Foo:\n    def __init__(self):\n        self.x = 1\n";
        let tree = parse(code);
        let parsed = PythonFileParser::parse(&tree, code, "mod.py");
        assert_eq!(parsed.classes[0].instance_variables, vec!["x".to_string()]);
    }
}
