//! Tree-sitter parser integration for Go test sources.

use anyhow::{Context, Result};
use tree_sitter::{Node, Parser, Tree};

/// Parse Go source code into a tree-sitter syntax tree.
pub fn parse_source(content: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    let language = tree_sitter_go::LANGUAGE.into();

    parser
        .set_language(&language)
        .context("Failed to set tree-sitter Go language")?;

    parser
        .parse(content, None)
        .context("Failed to parse Go source")
}

/// Check if a parse tree contains syntax errors.
pub fn has_parse_errors(tree: &Tree) -> bool {
    tree.root_node().has_error()
}

/// Get text for a tree-sitter node.
pub fn node_text<'a>(node: &Node, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

/// Get the line number for a tree-sitter node (1-indexed).
pub fn node_line(node: &Node) -> usize {
    node.start_position().row + 1
}

/// Get the last line of a tree-sitter node (1-indexed).
pub fn node_end_line(node: &Node) -> usize {
    node.end_position().row + 1
}

/// Extract the package clause identifier from a parsed file.
pub fn package_name(tree: &Tree, source: &str) -> Option<String> {
    let root = tree.root_node();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if child.kind() == "package_clause" {
            let mut inner = child.walk();
            for part in child.named_children(&mut inner) {
                if part.kind() == "package_identifier" {
                    return Some(node_text(&part, source).to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_go() {
        let tree = parse_source("package demo\n\nfunc TestA(t *testing.T) {}\n").unwrap();
        assert!(!has_parse_errors(&tree));
        assert_eq!(tree.root_node().kind(), "source_file");
    }

    #[test]
    fn flags_syntax_errors() {
        let tree = parse_source("package demo\n\nfunc TestA(t *testing.T) {\n").unwrap();
        assert!(has_parse_errors(&tree));
    }

    #[test]
    fn extracts_package_name() {
        let source = "package storetest\n";
        let tree = parse_source(source).unwrap();
        assert_eq!(package_name(&tree, source).as_deref(), Some("storetest"));
    }

    #[test]
    fn node_positions_are_one_indexed() {
        let source = "package demo\nfunc TestA(t *testing.T) {\n}\n";
        let tree = parse_source(source).unwrap();
        let root = tree.root_node();
        assert_eq!(node_line(&root), 1);
        let func = root.named_child(1).unwrap();
        assert_eq!(func.kind(), "function_declaration");
        assert_eq!(node_line(&func), 2);
        assert_eq!(node_end_line(&func), 3);
    }
}
