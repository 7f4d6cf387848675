//! JavaScript AST
//!
//! Thin tree-sitter front end shared by the registry, scanner and route
//! loaders. Sources are only ever parsed, never evaluated.

use tree_sitter::{Node, Parser, Tree};

use crate::error::{BundlerError, Result};

/// Reusable JavaScript parser. Not `Sync`; create one per worker.
pub struct JsParser {
    parser: Parser,
}

impl JsParser {
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_javascript::LANGUAGE.into())
            .map_err(|e| BundlerError::Grammar(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse a module. `None` only when tree-sitter gives up entirely.
    pub fn parse<'s>(&mut self, source: &'s str) -> Option<JsDocument<'s>> {
        let tree = self.parser.parse(source, None)?;
        Some(JsDocument { tree, source })
    }
}

/// A parsed source together with the text it was parsed from
pub struct JsDocument<'s> {
    tree: Tree,
    source: &'s str,
}

impl<'s> JsDocument<'s> {
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// 1-based line/column of the first syntax error, if any
    pub fn first_error(&self) -> Option<(usize, usize)> {
        let mut found = None;
        self.visit(|node| {
            if found.is_none() && (node.is_error() || node.is_missing()) {
                let pos = node.start_position();
                found = Some((pos.row + 1, pos.column + 1));
            }
        });
        found
    }

    /// Describe the first syntax error for a warning or fatal message
    pub fn error_message(&self) -> String {
        match self.first_error() {
            Some((line, column)) => format!("syntax error at line {}, column {}", line, column),
            None => "syntax error".to_string(),
        }
    }

    /// Pre-order traversal over every node in the tree
    pub fn visit<'a>(&'a self, mut visitor: impl FnMut(Node<'a>)) {
        let mut cursor = self.tree.walk();
        loop {
            visitor(cursor.node());
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    return;
                }
            }
        }
    }

    pub fn text(&self, node: Node<'_>) -> &'s str {
        &self.source[node.byte_range()]
    }

    /// Value of a string literal, or of a template literal without substitutions
    pub fn string_value(&self, node: Node<'_>) -> Option<String> {
        match node.kind() {
            "string" => {
                let raw = self.text(node);
                let inner = raw.get(1..raw.len().saturating_sub(1))?;
                Some(inner.to_string())
            }
            "template_string" => {
                let mut cursor = node.walk();
                let substituted = node
                    .named_children(&mut cursor)
                    .any(|child| child.kind() == "template_substitution");
                if substituted {
                    return None;
                }
                let raw = self.text(node);
                let inner = raw.get(1..raw.len().saturating_sub(1))?;
                Some(inner.to_string())
            }
            _ => None,
        }
    }

    /// Name of an object key: identifier, string or number
    pub fn key_name(&self, key: Node<'_>) -> Option<String> {
        match key.kind() {
            "property_identifier" | "number" => Some(self.text(key).to_string()),
            "string" => self.string_value(key),
            _ => None,
        }
    }

    /// `key: value` pairs of an object literal, in source order
    pub fn object_pairs<'a>(&'a self, object: Node<'a>) -> Vec<(String, Node<'a>)> {
        let mut cursor = object.walk();
        let children: Vec<Node<'a>> = object.named_children(&mut cursor).collect();
        children
            .into_iter()
            .filter(|child| child.kind() == "pair")
            .filter_map(|pair| {
                let key = pair.child_by_field_name("key")?;
                let value = pair.child_by_field_name("value")?;
                Some((self.key_name(key)?, value))
            })
            .collect()
    }

    /// Value node of the named property of an object literal
    pub fn property<'a>(&'a self, object: Node<'a>, name: &str) -> Option<Node<'a>> {
        self.object_pairs(object)
            .into_iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// String value of the named property of an object literal
    pub fn string_property(&self, object: Node<'_>, name: &str) -> Option<String> {
        self.property(object, name)
            .and_then(|value| self.string_value(value))
    }

    /// Named children of a node (array elements, call arguments, ...)
    pub fn named_children<'a>(&'a self, node: Node<'a>) -> Vec<Node<'a>> {
        let mut cursor = node.walk();
        node.named_children(&mut cursor).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn first_of_kind<'a>(doc: &'a JsDocument<'_>, kind: &str) -> Option<Node<'a>> {
        let mut found = None;
        doc.visit(|node| {
            if found.is_none() && node.kind() == kind {
                found = Some(node);
            }
        });
        found
    }

    #[test]
    fn test_object_pairs_in_order() {
        let mut parser = JsParser::new().unwrap();
        let doc = parser
            .parse(r#"const x = { path: '/docs', "component": "DocsPage", 3: `three` };"#)
            .unwrap();
        assert!(!doc.has_errors());

        let object = first_of_kind(&doc, "object").unwrap();
        let keys: Vec<String> = doc.object_pairs(object).into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["path", "component", "3"]);
        assert_eq!(doc.string_property(object, "path").as_deref(), Some("/docs"));
        assert_eq!(doc.string_property(object, "component").as_deref(), Some("DocsPage"));
        assert_eq!(doc.string_property(object, "3").as_deref(), Some("three"));
    }

    #[test]
    fn test_template_with_substitution_has_no_value() {
        let mut parser = JsParser::new().unwrap();
        let doc = parser.parse("const name = `Card${n}`;").unwrap();
        let template = first_of_kind(&doc, "template_string").unwrap();
        assert_eq!(doc.string_value(template), None);
    }

    #[test]
    fn test_syntax_error_is_located() {
        let mut parser = JsParser::new().unwrap();
        let doc = parser.parse("const a = {;\nfunction (").unwrap();
        assert!(doc.has_errors());
        assert!(doc.first_error().is_some());
        assert!(doc.error_message().starts_with("syntax error"));
    }
}
