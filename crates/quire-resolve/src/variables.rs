//! Variable substitution for `(=dotted.path=)` tokens.

use std::sync::LazyLock;

use quire_mdx::{AttrValue, Node, Root};
use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::diagnostic::{Diagnostic, DiagnosticKind, Location};

static VARIABLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\(=\s*([A-Za-z0-9_][A-Za-z0-9_.\-]*)\s*=\)").expect("Invalid variable regex")
});

/// Nested variables of one version, read-only during a build.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct VariableTable(Map<String, Value>);

impl VariableTable {
    pub fn new(variables: Map<String, Value>) -> Self {
        Self(variables)
    }

    /// Build a table from a JSON value; anything but an object is empty.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            _ => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Walk `path` segment by segment and stringify the leaf.
    ///
    /// Only strings, numbers and booleans resolve.
    pub fn lookup(&self, path: &str) -> Option<String> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        match current {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Replace every resolvable token in `text`.
///
/// Returns the new text and the literal tokens that did not resolve, which
/// are left in place.
pub fn substitute(text: &str, variables: &VariableTable) -> (String, Vec<String>) {
    let mut unresolved = Vec::new();
    let replaced = VARIABLE_REGEX.replace_all(text, |caps: &Captures| {
        match variables.lookup(&caps[1]) {
            Some(value) => value,
            None => {
                unresolved.push(caps[0].to_string());
                caps[0].to_string()
            }
        }
    });
    (replaced.into_owned(), unresolved)
}

/// Tokens in `text` that do not resolve.
pub fn unresolved_tokens(text: &str, variables: &VariableTable) -> Vec<String> {
    VARIABLE_REGEX
        .captures_iter(text)
        .filter(|caps| variables.lookup(&caps[1]).is_none())
        .map(|caps| caps[0].to_string())
        .collect()
}

fn message(token: &str) -> String {
    format!("Non existing variable name {token}")
}

/// Text-bearing fields of a node that may hold tokens.
fn fields_mut(node: &mut Node) -> Vec<&mut String> {
    match node {
        Node::Frontmatter { value, .. }
        | Node::Text { value, .. }
        | Node::InlineCode { value, .. }
        | Node::Raw { value, .. } => vec![value],
        Node::Code(code) => vec![&mut code.value],
        Node::Link { url, title, .. } | Node::Definition { url, title, .. } => {
            let mut fields = vec![url];
            fields.extend(title.as_mut());
            fields
        }
        Node::Image { url, title, alt, .. } => {
            let mut fields = vec![url, alt];
            fields.extend(title.as_mut());
            fields
        }
        Node::Component(component) => component
            .attributes
            .iter_mut()
            .filter_map(|attribute| match &mut attribute.value {
                AttrValue::Literal(value) => Some(value),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn fields(node: &Node) -> Vec<&str> {
    match node {
        Node::Frontmatter { value, .. }
        | Node::Text { value, .. }
        | Node::InlineCode { value, .. }
        | Node::Raw { value, .. } => vec![value.as_str()],
        Node::Code(code) => vec![code.value.as_str()],
        Node::Link { url, title, .. } | Node::Definition { url, title, .. } => {
            let mut fields = vec![url.as_str()];
            fields.extend(title.as_deref());
            fields
        }
        Node::Image { url, title, alt, .. } => {
            let mut fields = vec![url.as_str(), alt.as_str()];
            fields.extend(title.as_deref());
            fields
        }
        Node::Component(component) => component
            .attributes
            .iter()
            .filter_map(|attribute| match &attribute.value {
                AttrValue::Literal(value) => Some(value.as_str()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Substitute variables throughout a tree.
///
/// Unresolved tokens stay as literal text and are returned as warnings.
pub fn resolve(root: &mut Root, variables: &VariableTable, file: &std::path::Path) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    root.walk_mut(&mut |node| {
        let position = node.position();
        for field in fields_mut(node) {
            if !field.contains("(=") {
                continue;
            }
            let (replaced, unresolved) = substitute(field, variables);
            *field = replaced;
            for token in unresolved {
                tracing::warn!("{}: {}", Location::new(file, position), message(&token));
                diagnostics.push(Diagnostic::warning(
                    DiagnosticKind::UnresolvedVariable,
                    message(&token),
                    Location::new(file, position),
                ));
            }
        }
    });
    diagnostics
}

/// Report every token that does not resolve, without changing the tree.
pub fn lint(root: &Root, variables: &VariableTable, file: &std::path::Path) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    root.walk(&mut |node| {
        for field in fields(node) {
            for token in unresolved_tokens(field, variables) {
                diagnostics.push(Diagnostic::error(
                    DiagnosticKind::UnresolvedVariable,
                    message(&token),
                    Location::new(file, node.position()),
                ));
            }
        }
    });
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quire_mdx::parse_mdx;
    use serde_json::json;
    use std::path::Path;

    fn table() -> VariableTable {
        VariableTable::from_value(json!({
            "version": "1.0",
            "teleport": { "version": "1.0.1", "port": 3080, "cloud": true, "list": [1] },
        }))
    }

    #[test]
    fn looks_up_dotted_paths() {
        let table = table();

        assert_eq!(table.lookup("teleport.version").as_deref(), Some("1.0.1"));
        assert_eq!(table.lookup("teleport.port").as_deref(), Some("3080"));
        assert_eq!(table.lookup("teleport.cloud").as_deref(), Some("true"));
        assert_eq!(table.lookup("teleport"), None);
        assert_eq!(table.lookup("teleport.list"), None);
        assert_eq!(table.lookup("nonexistent"), None);
        assert_eq!(table.lookup("version.major"), None);
    }

    #[test]
    fn substitutes_without_rescanning() {
        let table = VariableTable::from_value(json!({ "a": "(=b=)", "b": "x" }));

        let (text, unresolved) = substitute("(=a=) and (= b =)", &table);

        assert_eq!(text, "(=b=) and x");
        assert!(unresolved.is_empty());
    }

    #[test]
    fn resolves_tree_and_keeps_unknown_tokens() {
        let mut root = parse_mdx(
            "Teleport (=teleport.version=) uses `tsh` (=version=).\n\n```code\n$ curl (=teleport.version=)\n```\n\nSee [docs](https://x/(=version=)/) and (=nonexistent=).\n",
        )
        .unwrap();

        let diagnostics = resolve(&mut root, &table(), Path::new("page.mdx"));

        assert_eq!(
            quire_mdx::serialize(&root),
            "Teleport 1.0.1 uses `tsh` 1.0.\n\n```code\n$ curl 1.0.1\n```\n\nSee [docs](https://x/1.0/) and (=nonexistent=).\n"
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "Non existing variable name (=nonexistent=)");
        assert!(!diagnostics[0].is_error());
    }

    #[test]
    fn lints_unresolved_tokens() {
        let root = parse_mdx("Value (=teleport.version=) and (=variable=).\n").unwrap();

        let diagnostics = lint(&root, &table(), Path::new("page.mdx"));

        let messages: Vec<&str> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["Non existing variable name (=variable=)"]);
        assert_eq!(diagnostics[0].position.unwrap().start.line, 1);
    }
}
