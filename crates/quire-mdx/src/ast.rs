//! Document tree.
//!
//! A closed set of node kinds covering what the resolution passes need to
//! see. Constructs the tree does not model are carried through as [`Node::Raw`]
//! with their original source text.

use serde::{Deserialize, Serialize};

use crate::codeblock::Snippet;

/// A 1-based line/column location in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub line: usize,
    pub column: usize,
}

impl Point {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Source range of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub start: Point,
    pub end: Point,
}

impl Position {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

/// Root of a parsed document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Root {
    pub children: Vec<Node>,
}

impl Root {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Visit every node depth-first, parents before children.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Mutable depth-first visit, parents before children.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }
}

/// How a reference-style construct points at its destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LinkKind {
    /// `[text](url)`
    Inline,
    /// `<https://example.com>`
    Autolink,
    /// `[text][label]`
    Reference { label: String },
    /// `[text][]`
    Collapsed,
    /// `[text]`
    Shortcut,
}

impl LinkKind {
    /// Whether the URL is written at the use site (as opposed to a definition).
    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline | Self::Autolink)
    }
}

/// A fenced or indented code block.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Code {
    pub lang: Option<String>,
    pub meta: Option<String>,
    pub value: String,
    /// Structured command expansion, set by the code-snippet pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<Snippet>,
    pub position: Option<Position>,
}

impl Code {
    pub fn new(lang: Option<&str>, value: impl Into<String>) -> Self {
        Self {
            lang: lang.map(str::to_string),
            value: value.into(),
            ..Default::default()
        }
    }
}

/// Attribute value of a custom component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum AttrValue {
    /// `name="value"`
    Literal(String),
    /// `name={expression}`
    Expression(String),
    /// `name`
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttrValue,
}

impl Attribute {
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttrValue::Literal(value.into()),
        }
    }
}

/// Whether a component's children sit on their own lines or inside the tag line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComponentLayout {
    #[default]
    Block,
    Inline,
}

/// A JSX-style custom component such as `<Details title="...">`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
    pub layout: ComponentLayout,
    pub position: Option<Position>,
}

impl Component {
    /// Look up a string attribute value.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find_map(|a| match &a.value {
            AttrValue::Literal(v) if a.name == name => Some(v.as_str()),
            _ => None,
        })
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    /// Leading YAML block, without its `---` fences.
    Frontmatter {
        value: String,
        position: Option<Position>,
    },
    Paragraph {
        children: Vec<Node>,
        position: Option<Position>,
    },
    Heading {
        depth: u8,
        children: Vec<Node>,
        position: Option<Position>,
    },
    Text {
        value: String,
        position: Option<Position>,
    },
    InlineCode {
        value: String,
        position: Option<Position>,
    },
    Code(Code),
    Link {
        url: String,
        title: Option<String>,
        kind: LinkKind,
        children: Vec<Node>,
        position: Option<Position>,
    },
    Image {
        url: String,
        title: Option<String>,
        alt: String,
        kind: LinkKind,
        position: Option<Position>,
    },
    Definition {
        label: String,
        url: String,
        title: Option<String>,
        position: Option<Position>,
    },
    Emphasis {
        children: Vec<Node>,
        position: Option<Position>,
    },
    Strong {
        children: Vec<Node>,
        position: Option<Position>,
    },
    Break {
        position: Option<Position>,
    },
    List {
        ordered: bool,
        start: Option<u64>,
        spread: bool,
        children: Vec<Node>,
        position: Option<Position>,
    },
    ListItem {
        children: Vec<Node>,
        position: Option<Position>,
    },
    BlockQuote {
        children: Vec<Node>,
        position: Option<Position>,
    },
    ThematicBreak {
        position: Option<Position>,
    },
    Component(Component),
    /// Source passed through untouched (tables, raw HTML, footnotes, ...).
    Raw {
        value: String,
        position: Option<Position>,
    },
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text {
            value: value.into(),
            position: None,
        }
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::Paragraph {
            children,
            position: None,
        }
    }

    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Frontmatter { position, .. }
            | Self::Paragraph { position, .. }
            | Self::Heading { position, .. }
            | Self::Text { position, .. }
            | Self::InlineCode { position, .. }
            | Self::Link { position, .. }
            | Self::Image { position, .. }
            | Self::Definition { position, .. }
            | Self::Emphasis { position, .. }
            | Self::Strong { position, .. }
            | Self::Break { position }
            | Self::List { position, .. }
            | Self::ListItem { position, .. }
            | Self::BlockQuote { position, .. }
            | Self::ThematicBreak { position }
            | Self::Raw { position, .. } => *position,
            Self::Code(code) => code.position,
            Self::Component(component) => component.position,
        }
    }

    pub fn children(&self) -> Option<&Vec<Node>> {
        match self {
            Self::Paragraph { children, .. }
            | Self::Heading { children, .. }
            | Self::Link { children, .. }
            | Self::Emphasis { children, .. }
            | Self::Strong { children, .. }
            | Self::List { children, .. }
            | Self::ListItem { children, .. }
            | Self::BlockQuote { children, .. } => Some(children),
            Self::Component(component) => Some(&component.children),
            Self::Frontmatter { .. }
            | Self::Text { .. }
            | Self::InlineCode { .. }
            | Self::Code(_)
            | Self::Image { .. }
            | Self::Definition { .. }
            | Self::Break { .. }
            | Self::ThematicBreak { .. }
            | Self::Raw { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Self::Paragraph { children, .. }
            | Self::Heading { children, .. }
            | Self::Link { children, .. }
            | Self::Emphasis { children, .. }
            | Self::Strong { children, .. }
            | Self::List { children, .. }
            | Self::ListItem { children, .. }
            | Self::BlockQuote { children, .. } => Some(children),
            Self::Component(component) => Some(&mut component.children),
            Self::Frontmatter { .. }
            | Self::Text { .. }
            | Self::InlineCode { .. }
            | Self::Code(_)
            | Self::Image { .. }
            | Self::Definition { .. }
            | Self::Break { .. }
            | Self::ThematicBreak { .. }
            | Self::Raw { .. } => None,
        }
    }

    /// Whether the node belongs inside a paragraph rather than at block level.
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::Text { .. }
                | Self::InlineCode { .. }
                | Self::Link { .. }
                | Self::Image { .. }
                | Self::Emphasis { .. }
                | Self::Strong { .. }
                | Self::Break { .. }
        )
    }

    /// Concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |node| match node {
            Self::Text { value, .. } | Self::InlineCode { value, .. } => out.push_str(value),
            Self::Image { alt, .. } => out.push_str(alt),
            _ => {}
        });
        out
    }

    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        if let Some(children) = self.children() {
            for child in children {
                child.walk(f);
            }
        }
    }

    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(self);
        if let Some(children) = self.children_mut() {
            for child in children {
                child.walk_mut(f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_depth_first() {
        let root = Root::new(vec![
            Node::paragraph(vec![Node::text("a"), Node::text("b")]),
            Node::text("c"),
        ]);

        let mut seen = Vec::new();
        root.walk(&mut |node| {
            if let Node::Text { value, .. } = node {
                seen.push(value.clone());
            }
        });

        assert_eq!(seen, vec!["a", "b", "c"]);
    }

    #[test]
    fn collects_text_content() {
        let node = Node::paragraph(vec![
            Node::text("Run "),
            Node::InlineCode {
                value: "tsh".to_string(),
                position: None,
            },
            Node::Strong {
                children: vec![Node::text(" now")],
                position: None,
            },
        ]);

        assert_eq!(node.text_content(), "Run tsh now");
    }

    #[test]
    fn reads_literal_attributes() {
        let component = Component {
            name: "Figure".to_string(),
            attributes: vec![
                Attribute::literal("src", "a.png"),
                Attribute {
                    name: "width".to_string(),
                    value: AttrValue::Expression("100".to_string()),
                },
            ],
            ..Default::default()
        };

        assert_eq!(component.attribute("src"), Some("a.png"));
        assert_eq!(component.attribute("width"), None);
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(Node::text("hi")).unwrap();
        assert_eq!(json["type"], "text");
        assert_eq!(json["value"], "hi");
    }
}
