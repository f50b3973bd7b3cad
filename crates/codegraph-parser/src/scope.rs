use std::collections::HashSet;
use tree_sitter::Node;

/// Names the language defines for every scope; reads of these never count as a global
/// access. Configuration, in spirit (§4.B: "the set of language builtins is an injected
/// configuration") — kept as a constant here since this analyzer targets one grammar.
const PYTHON_BUILTINS: &[&str] = &[
    "self", "cls", "__init__", "__name__", "__file__", "__doc__", "__class__", "__dict__",
    "True", "False", "None", "print", "len", "range", "str", "int", "float", "bool", "list",
    "dict", "set", "tuple", "type", "isinstance", "issubclass", "super", "object", "enumerate",
    "zip", "map", "filter", "sorted", "reversed", "sum", "min", "max", "abs", "round", "open",
    "input", "format", "repr", "hash", "id", "vars", "dir", "getattr", "setattr", "hasattr",
    "delattr", "iter", "next", "callable", "staticmethod", "classmethod", "property",
    "Exception", "ValueError", "TypeError", "KeyError", "IndexError", "AttributeError",
    "StopIteration", "RuntimeError", "NotImplementedError", "ImportError", "OSError",
    "FileNotFoundError", "ZeroDivisionError", "ArithmeticError", "NameError",
];

fn is_builtin(name: &str) -> bool {
    PYTHON_BUILTINS.contains(&name)
}

/// Maintains a stack of defined-name sets plus the set of names explicitly declared
/// `global`/`nonlocal` in the current function (§4.B global-access analysis).
#[derive(Debug, Default)]
pub struct ScopeTracker {
    scopes: Vec<HashSet<String>>,
    global_declarations: HashSet<String>,
    nonlocal_declarations: HashSet<String>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self {
            scopes: vec![HashSet::new()],
            global_declarations: HashSet::new(),
            nonlocal_declarations: HashSet::new(),
        }
    }

    pub fn enter_scope(&mut self) {
        self.scopes.push(HashSet::new());
    }

    pub fn exit_scope(&mut self) {
        self.scopes.pop();
    }

    pub fn define_local(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string());
        }
    }

    pub fn declare_global(&mut self, name: &str) {
        self.global_declarations.insert(name.to_string());
    }

    pub fn declare_nonlocal(&mut self, name: &str) {
        self.nonlocal_declarations.insert(name.to_string());
    }

    pub fn is_local(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    pub fn is_explicitly_global(&self, name: &str) -> bool {
        self.global_declarations.contains(name) || self.nonlocal_declarations.contains(name)
    }
}

/// Parameters seeded into a function's scope before traversal, excluding `self`/`cls`
/// (§4.B rule 1). Names declared `global`/`nonlocal` are excluded even when they are
/// also assigned in the body — rule 5 makes those writes (and their RHS reads) global
/// accesses, not local definitions, so `get_accessed_globals` must not see them
/// pre-seeded as locals.
pub fn extract_local_definitions(func_node: &Node, source: &[u8]) -> HashSet<String> {
    let mut locals = HashSet::new();
    if let Some(params) = func_node.child_by_field_name("parameters") {
        let mut cursor = params.walk();
        if cursor.goto_first_child() {
            loop {
                collect_param_name(&cursor.node(), source, &mut locals);
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }
    if let Some(body) = func_node.child_by_field_name("body") {
        find_definitions(&body, func_node, source, &mut locals);
    }
    let declared = collect_global_nonlocal_names(func_node, source);
    for name in &declared {
        locals.remove(name);
    }
    locals
}

/// Names named in a `global`/`nonlocal` statement anywhere in the function's own body,
/// not descending into nested function/class definitions.
fn collect_global_nonlocal_names(func_node: &Node, source: &[u8]) -> HashSet<String> {
    let mut names = HashSet::new();
    if let Some(body) = func_node.child_by_field_name("body") {
        find_global_nonlocal_names(&body, func_node, source, &mut names);
    }
    names
}

fn find_global_nonlocal_names(n: &Node, root: &Node, source: &[u8], names: &mut HashSet<String>) {
    if n.id() != root.id() && matches!(n.kind(), "function_definition" | "async_function_definition" | "class_definition")
    {
        return;
    }
    if matches!(n.kind(), "global_statement" | "nonlocal_statement") {
        let mut cursor = n.walk();
        if cursor.goto_first_child() {
            loop {
                if cursor.node().kind() == "identifier" {
                    names.insert(text(&cursor.node(), source));
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
        return;
    }
    let mut cursor = n.walk();
    if cursor.goto_first_child() {
        loop {
            find_global_nonlocal_names(&cursor.node(), root, source, names);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

fn collect_param_name(n: &Node, source: &[u8], locals: &mut HashSet<String>) {
    let name = match n.kind() {
        "identifier" => Some(text(n, source)),
        "typed_parameter" | "default_parameter" | "typed_default_parameter" => n
            .child_by_field_name("name")
            .map(|c| text(&c, source))
            .or_else(|| first_child_of_kind(n, "identifier").map(|c| text(&c, source))),
        "list_splat_pattern" | "dictionary_splat_pattern" => {
            first_child_of_kind(n, "identifier").map(|c| text(&c, source))
        }
        _ => None,
    };
    if let Some(name) = name {
        if name != "self" && name != "cls" {
            locals.insert(name);
        }
    }
}

fn find_definitions(n: &Node, root: &Node, source: &[u8], locals: &mut HashSet<String>) {
    if n.id() != root.id() && matches!(n.kind(), "function_definition" | "async_function_definition" | "class_definition")
    {
        return;
    }
    match n.kind() {
        "assignment" => {
            if let Some(target) = n.child_by_field_name("left") {
                collect_assignment_targets(&target, source, locals);
            }
        }
        "for_statement" => {
            if let Some(target) = n.child_by_field_name("left") {
                collect_assignment_targets(&target, source, locals);
            }
        }
        "named_expression" => {
            if let Some(name_node) = n.child_by_field_name("name") {
                locals.insert(text(&name_node, source));
            }
        }
        _ => {}
    }
    let mut cursor = n.walk();
    if cursor.goto_first_child() {
        loop {
            find_definitions(&cursor.node(), root, source, locals);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

fn collect_assignment_targets(target: &Node, source: &[u8], locals: &mut HashSet<String>) {
    match target.kind() {
        "identifier" => {
            locals.insert(text(target, source));
        }
        "tuple_pattern" | "list_pattern" | "pattern_list" => {
            let mut cursor = target.walk();
            if cursor.goto_first_child() {
                loop {
                    collect_assignment_targets(&cursor.node(), source, locals);
                    if !cursor.goto_next_sibling() {
                        break;
                    }
                }
            }
        }
        _ => {}
    }
}

fn first_child_of_kind<'a>(n: &Node<'a>, kind: &str) -> Option<Node<'a>> {
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

fn text(n: &Node, source: &[u8]) -> String {
    n.utf8_text(source).unwrap_or("").to_string()
}

/// Reads and writes of names not local to the function (§4.B rules 5-7). Seeds the
/// tracker with `defined_locals` (the function's parameters) and walks the body.
pub fn get_accessed_globals(
    func_node: &Node,
    source: &[u8],
    defined_locals: &HashSet<String>,
) -> (Vec<String>, Vec<String>) {
    let mut tracker = ScopeTracker::new();
    for name in defined_locals {
        tracker.define_local(name);
    }
    let mut reads = Vec::new();
    let mut writes = Vec::new();

    if let Some(body) = func_node.child_by_field_name("body") {
        walk_for_globals(&body, func_node, source, &mut tracker, false, &mut reads, &mut writes);
    }

    reads.sort();
    reads.dedup();
    writes.sort();
    writes.dedup();
    (reads, writes)
}

#[allow(clippy::too_many_arguments)]
fn walk_for_globals(
    n: &Node,
    root: &Node,
    source: &[u8],
    tracker: &mut ScopeTracker,
    in_assignment_target: bool,
    reads: &mut Vec<String>,
    writes: &mut Vec<String>,
) {
    match n.kind() {
        "global_statement" | "nonlocal_statement" => {
            let mut cursor = n.walk();
            if cursor.goto_first_child() {
                loop {
                    if cursor.node().kind() == "identifier" {
                        let name = text(&cursor.node(), source);
                        if n.kind() == "global_statement" {
                            tracker.declare_global(&name);
                        } else {
                            tracker.declare_nonlocal(&name);
                        }
                    }
                    if !cursor.goto_next_sibling() {
                        break;
                    }
                }
            }
            return;
        }
        "function_definition" | "async_function_definition" | "class_definition" if n.id() != root.id() => {
            return;
        }
        "list_comprehension" | "dictionary_comprehension" | "set_comprehension" | "generator_expression" => {
            tracker.enter_scope();
            process_comprehension(n, source, tracker, reads, writes);
            tracker.exit_scope();
            return;
        }
        "for_statement" => {
            if let Some(target) = n.child_by_field_name("left") {
                let mut names = HashSet::new();
                collect_assignment_targets(&target, source, &mut names);
                for name in names {
                    tracker.define_local(&name);
                }
            }
        }
        "with_clause" => {
            // `as` bindings inside `with ... as name:` become locals.
            let mut cursor = n.walk();
            if cursor.goto_first_child() {
                loop {
                    if cursor.node().kind() == "as_pattern" {
                        if let Some(alias) = first_child_of_kind(&cursor.node(), "as_pattern_target") {
                            if let Some(ident) = first_child_of_kind(&alias, "identifier") {
                                tracker.define_local(&text(&ident, source));
                            }
                        }
                    }
                    if !cursor.goto_next_sibling() {
                        break;
                    }
                }
            }
        }
        "except_clause" => {
            if let Some(alias) = first_child_of_kind(n, "as_pattern") {
                if let Some(ident) = first_child_of_kind(&alias, "identifier")
                    .or_else(|| first_child_of_kind(&alias, "as_pattern_target"))
                {
                    tracker.define_local(&text(&ident, source));
                }
            }
        }
        "assignment" => {
            if let Some(target) = n.child_by_field_name("left") {
                record_assignment(&target, source, tracker, writes);
            }
            if let Some(value) = n.child_by_field_name("right") {
                walk_for_globals(&value, root, source, tracker, false, reads, writes);
            }
            return;
        }
        "augmented_assignment" => {
            if let Some(target) = n.child_by_field_name("left") {
                if target.kind() == "identifier" {
                    let name = text(&target, source);
                    if !tracker.is_local(&name) || tracker.is_explicitly_global(&name) {
                        reads.push(name.clone());
                        writes.push(name);
                    }
                }
            }
            if let Some(value) = n.child_by_field_name("right") {
                walk_for_globals(&value, root, source, tracker, false, reads, writes);
            }
            return;
        }
        "named_expression" => {
            if let Some(name_node) = n.child_by_field_name("name") {
                tracker.define_local(&text(&name_node, source));
            }
            if let Some(value) = n.child_by_field_name("value") {
                walk_for_globals(&value, root, source, tracker, false, reads, writes);
            }
            return;
        }
        "identifier" => {
            if !in_assignment_target {
                let name = text(n, source);
                if !tracker.is_local(&name) && !is_builtin(&name) {
                    reads.push(name);
                }
            }
            return;
        }
        "attribute" => {
            if let Some(obj) = n.child_by_field_name("object") {
                walk_for_globals(&obj, root, source, tracker, false, reads, writes);
            }
            return;
        }
        _ => {}
    }

    let mut cursor = n.walk();
    if cursor.goto_first_child() {
        loop {
            walk_for_globals(&cursor.node(), root, source, tracker, in_assignment_target, reads, writes);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

fn record_assignment(target: &Node, source: &[u8], tracker: &mut ScopeTracker, writes: &mut Vec<String>) {
    match target.kind() {
        "identifier" => {
            let name = text(target, source);
            if tracker.is_explicitly_global(&name) {
                writes.push(name);
            } else {
                tracker.define_local(&name);
            }
        }
        "tuple_pattern" | "list_pattern" | "pattern_list" => {
            let mut cursor = target.walk();
            if cursor.goto_first_child() {
                loop {
                    record_assignment(&cursor.node(), source, tracker, writes);
                    if !cursor.goto_next_sibling() {
                        break;
                    }
                }
            }
        }
        _ => {}
    }
}

fn process_comprehension(
    n: &Node,
    source: &[u8],
    tracker: &mut ScopeTracker,
    reads: &mut Vec<String>,
    writes: &mut Vec<String>,
) {
    let mut cursor = n.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if child.kind() == "for_in_clause" {
                if let Some(target) = child.child_by_field_name("left") {
                    let mut names = HashSet::new();
                    collect_assignment_targets(&target, source, &mut names);
                    for name in names {
                        tracker.define_local(&name);
                    }
                }
                if let Some(iterable) = child.child_by_field_name("right") {
                    walk_for_globals(&iterable, &child, source, tracker, false, reads, writes);
                }
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    // The body/condition expressions, after all `for ... in ...` clauses are seeded.
    let mut cursor = n.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            if child.kind() != "for_in_clause" {
                walk_for_globals(&child, &child, source, tracker, false, reads, writes);
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(code: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_python::LANGUAGE.into()).unwrap();
        parser.parse(code, None).unwrap()
    }

    fn first_function<'a>(tree: &'a tree_sitter::Tree) -> Node<'a> {
        let root = tree.root_node();
        let mut cursor = root.walk();
        cursor.goto_first_child();
        loop {
            if cursor.node().kind() == "function_definition" {
                return cursor.node();
            }
            if !cursor.goto_next_sibling() {
                panic!("no function found");
            }
        }
    }

    #[test]
    fn reads_a_module_level_name_not_assigned_locally() {
        let code = "def f():\n    return COUNT + 1\n";
        let tree = parse(code);
        let f = first_function(&tree);
        let locals = extract_local_definitions(&f, code.as_bytes());
        let (reads, writes) = get_accessed_globals(&f, code.as_bytes(), &locals);
        assert_eq!(reads, vec!["COUNT".to_string()]);
        assert!(writes.is_empty());
    }

    #[test]
    fn explicit_global_assignment_is_a_write_not_a_local() {
        let code = "def f():\n    global COUNT\n    COUNT = COUNT + 1\n";
        let tree = parse(code);
        let f = first_function(&tree);
        let locals = extract_local_definitions(&f, code.as_bytes());
        let (reads, writes) = get_accessed_globals(&f, code.as_bytes(), &locals);
        assert!(reads.contains(&"COUNT".to_string()));
        assert!(writes.contains(&"COUNT".to_string()));
    }

    #[test]
    fn loop_variable_is_local_not_a_global_read() {
        let code = "def f(items):\n    for item in items:\n        print(item)\n";
        let tree = parse(code);
        let f = first_function(&tree);
        let locals = extract_local_definitions(&f, code.as_bytes());
        let (reads, _writes) = get_accessed_globals(&f, code.as_bytes(), &locals);
        assert!(!reads.contains(&"item".to_string()));
    }
}
