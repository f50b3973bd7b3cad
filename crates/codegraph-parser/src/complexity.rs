use tree_sitter::Node;

const FUNCTION_KINDS: [&str; 2] = ["function_definition", "async_function_definition"];

fn is_nested_function(n: &Node, root: &Node) -> bool {
    FUNCTION_KINDS.contains(&n.kind()) && n.id() != root.id()
}

/// Cyclomatic complexity (§4.B): start at 1, add 1 for each decision point. Mirrors the
/// Python-flavoured decision-point set used throughout this analyzer (if/elif/for/while/
/// except/with/ternary/comprehension/comprehension-filter/boolean-combinator), scoped to
/// `node`'s own body — nested function definitions form their own analysis unit and do
/// not contribute to the enclosing function's count (§3 invariant iii).
pub fn calculate_cyclomatic_complexity(node: &Node) -> u32 {
    1 + count_decision_points(node, node)
}

fn count_decision_points(n: &Node, root: &Node) -> u32 {
    if is_nested_function(n, root) {
        return 0;
    }
    let mut count = if is_decision_point(n.kind()) { 1 } else { 0 };
    if n.kind() == "boolean_operator" {
        count += 1;
    }
    // Comprehension filter clauses (`if` inside a comprehension) each add a branch.
    if n.kind() == "if_clause" {
        count += 1;
    }

    let mut cursor = n.walk();
    if cursor.goto_first_child() {
        loop {
            count += count_decision_points(&cursor.node(), root);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    count
}

fn is_decision_point(kind: &str) -> bool {
    matches!(
        kind,
        "if_statement"
            | "elif_clause"
            | "for_statement"
            | "while_statement"
            | "except_clause"
            | "with_statement"
            | "assert_statement"
            | "conditional_expression"
            | "list_comprehension"
            | "dictionary_comprehension"
            | "set_comprehension"
            | "generator_expression"
    )
}

const NESTING_KINDS: [&str; 10] = [
    "if_statement",
    "elif_clause",
    "else_clause",
    "for_statement",
    "while_statement",
    "except_clause",
    "with_statement",
    "try_statement",
    "conditional_expression",
    "lambda",
];

fn increment_for(kind: &str) -> Option<u32> {
    match kind {
        "if_statement" | "elif_clause" | "else_clause" | "for_statement" | "while_statement"
        | "except_clause" | "with_statement" | "conditional_expression" | "lambda" => Some(1),
        _ => None,
    }
}

/// Cognitive complexity (§4.B): start at 0; each of
/// {if, elif, else, for, while, except, with, ternary, lambda} adds `1 + nesting_depth`;
/// boolean combinators and break/continue each add 1 flat; direct recursion (the
/// function calling itself, including via `self.<name>`) adds 1, counted at most once.
/// Nested function bodies do not contribute.
pub fn calculate_cognitive_complexity(node: &Node, source: &[u8], function_name: &str) -> u32 {
    let mut recursion_seen = false;
    traverse_cognitive(node, node, source, function_name, 0, &mut recursion_seen)
}

fn traverse_cognitive(
    n: &Node,
    root: &Node,
    source: &[u8],
    function_name: &str,
    nesting: u32,
    recursion_seen: &mut bool,
) -> u32 {
    if is_nested_function(n, root) {
        return 0;
    }

    let mut total = 0;
    if let Some(inc) = increment_for(n.kind()) {
        total += inc + nesting;
    }
    if n.kind() == "boolean_operator" {
        total += 1;
    }
    if matches!(n.kind(), "break_statement" | "continue_statement") {
        total += 1;
    }
    if n.kind() == "call" && !*recursion_seen && is_self_recursive_call(n, source, function_name) {
        total += 1;
        *recursion_seen = true;
    }

    let child_nesting = if NESTING_KINDS.contains(&n.kind()) {
        nesting + 1
    } else {
        nesting
    };

    let mut cursor = n.walk();
    if cursor.goto_first_child() {
        loop {
            total += traverse_cognitive(
                &cursor.node(),
                root,
                source,
                function_name,
                child_nesting,
                recursion_seen,
            );
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    total
}

fn is_self_recursive_call(call: &Node, source: &[u8], function_name: &str) -> bool {
    let Some(func_node) = call.child_by_field_name("function") else {
        return false;
    };
    let Ok(text) = func_node.utf8_text(source) else {
        return false;
    };
    text == function_name || text.ends_with(&format!(".{function_name}"))
}

/// Lines of code spanned by `node`, end-inclusive (§4.A metrics). This is a span-based
/// count, not a true blank/comment-aware count — callers that want the latter use
/// `crate::scope::count_total_lines` against the whole file.
pub fn count_lines_of_code(node: &Node) -> u32 {
    node.end_position().row as u32 - node.start_position().row as u32 + 1
}

/// True if `yield` appears anywhere in the body, not counting nested function defs.
pub fn contains_yield(node: &Node) -> bool {
    contains_kind(node, node, "yield")
}

/// True if an `await` expression appears anywhere in the body, not counting nested defs.
pub fn contains_await(node: &Node) -> bool {
    contains_kind(node, node, "await")
}

fn contains_kind(n: &Node, root: &Node, target_kind: &str) -> bool {
    if is_nested_function(n, root) {
        return false;
    }
    if n.kind() == target_kind {
        return true;
    }
    let mut cursor = n.walk();
    if cursor.goto_first_child() {
        loop {
            if contains_kind(&cursor.node(), root, target_kind) {
                return true;
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(code: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .unwrap();
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
    fn simple_function_has_complexity_one() {
        let tree = parse("def f():\n    return 1\n");
        let f = first_function(&tree);
        assert_eq!(calculate_cyclomatic_complexity(&f), 1);
    }

    #[test]
    fn single_if_has_complexity_two() {
        let tree = parse("def f(x):\n    if x > 0:\n        return 1\n    return 0\n");
        let f = first_function(&tree);
        assert_eq!(calculate_cyclomatic_complexity(&f), 2);
    }

    #[test]
    fn nested_function_not_summed_into_enclosing() {
        let code = "def outer():\n    def inner():\n        if True:\n            return 1\n    return inner\n";
        let tree = parse(code);
        let f = first_function(&tree);
        assert_eq!(calculate_cyclomatic_complexity(&f), 1);
    }

    #[test]
    fn plain_recursion_matches_scenario_one() {
        let code = "def f(n):\n    if n <= 1:\n        return 1\n    return f(n - 1) + f(n - 2)\n";
        let tree = parse(code);
        let f = first_function(&tree);
        assert_eq!(calculate_cyclomatic_complexity(&f), 2);
        let cognitive = calculate_cognitive_complexity(&f, code.as_bytes(), "f");
        assert_eq!(cognitive, 2);
    }
}
