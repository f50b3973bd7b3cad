use codegraph_core::Language;
use tree_sitter::{Parser, Tree};

/// The AST provider port (§6): `parse(language, bytes) -> AST`. The core's analyzers
/// never construct a `tree_sitter::Parser` themselves — the grammar is an injected
/// dependency, selected here by `Language`.
pub trait AstProvider: Send + Sync {
    fn parse(&self, language: Language, source: &[u8]) -> Result<Tree, String>;
}

/// The concrete tree-sitter-backed adapter. One `Parser` is built per call rather than
/// pooled: `tree_sitter::Parser` is cheap to construct and is not `Sync`, so pooling it
/// would just relocate the cost into a mutex.
#[derive(Debug, Default)]
pub struct TreeSitterAstProvider;

impl AstProvider for TreeSitterAstProvider {
    fn parse(&self, language: Language, source: &[u8]) -> Result<Tree, String> {
        let mut parser = Parser::new();
        let grammar = match language {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        };
        parser
            .set_language(&grammar)
            .map_err(|e| format!("failed to load {language} grammar: {e}"))?;
        parser
            .parse(source, None)
            .ok_or_else(|| format!("tree-sitter produced no tree for {language} source"))
    }
}
