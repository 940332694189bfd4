//! Parser module for converting Python source into a syntax tree.
//!
//! tree-sitter produces the concrete tree; [`lower`] turns it into the closed
//! [`ast`] representation the inferencers match on.

pub mod ast;
mod lower;

use std::path::Path;
use tree_sitter::{Node, Parser as TSParser, Tree};

use crate::error::{Error, Result};

pub use lower::lower;

/// The main parser struct that handles parsing source code.
pub struct Parser {
    /// The tree-sitter parser instance.
    parser: TSParser,
}

impl Parser {
    /// Creates a new parser for Python.
    pub fn new() -> Result<Self> {
        let mut parser = TSParser::new();

        let language = tree_sitter_python::language();

        parser
            .set_language(language)
            .map_err(|e| Error::parser_error(format!("Failed to load language: {}", e)))?;

        Ok(Self { parser })
    }

    /// Reads, parses and lowers a source file.
    pub fn parse_file(&mut self, path: &Path) -> Result<ast::Module> {
        let source_code = std::fs::read_to_string(path)?;
        self.parse_module(&source_code)
    }

    /// Parses a source code string into a syntax tree.
    ///
    /// tree-sitter recovers from syntax errors; a recovered tree is still
    /// reported as a failure so that malformed units are never analyzed.
    pub fn parse_string(&mut self, source: &str) -> Result<Tree> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or_else(|| Error::parser_error("Failed to parse source code".to_string()))?;

        let root = tree.root_node();
        if root.has_error() {
            let at = first_error(root).unwrap_or(root).start_position();
            return Err(Error::parser_error(format!(
                "syntax error at line {}, column {}",
                at.row + 1,
                at.column + 1
            )));
        }
        Ok(tree)
    }

    /// Parses and lowers a source string in one step.
    pub fn parse_module(&mut self, source: &str) -> Result<ast::Module> {
        let tree = self.parse_string(source)?;
        Ok(lower(&tree, source))
    }
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}
