//! Serialization of a document tree back to MDX text.

use crate::ast::{Code, Component, ComponentLayout, LinkKind, Node, Root};
use crate::component::format_attributes;

/// Render a document as MDX.
///
/// Blocks are separated by one blank line and the output ends with a newline.
pub fn serialize(root: &Root) -> String {
    let body = blocks(&root.children, "\n\n");
    if body.is_empty() {
        body
    } else {
        body + "\n"
    }
}

/// Render a sequence of block-level nodes.
///
/// Stray inline nodes are grouped into a single paragraph.
fn blocks(nodes: &[Node], separator: &str) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut run: Vec<&Node> = Vec::new();

    for node in nodes {
        if node.is_inline() {
            run.push(node);
            continue;
        }
        if !run.is_empty() {
            parts.push(run.drain(..).map(inline).collect());
        }
        parts.push(block(node));
    }
    if !run.is_empty() {
        parts.push(run.drain(..).map(inline).collect());
    }

    parts.join(separator)
}

fn block(node: &Node) -> String {
    match node {
        Node::Frontmatter { value, .. } if value.is_empty() => "---\n---".to_string(),
        Node::Frontmatter { value, .. } => format!("---\n{value}\n---"),
        Node::Paragraph { children, .. } => inlines(children),
        Node::Heading {
            depth, children, ..
        } => format!("{} {}", "#".repeat(usize::from(*depth)), inlines(children)),
        Node::Code(code) => fenced(code),
        Node::Definition {
            label, url, title, ..
        } => format!("[{label}]: {}{}", destination(url), title_suffix(title.as_deref())),
        Node::List {
            ordered,
            start,
            spread,
            children,
            ..
        } => list(*ordered, start.unwrap_or(1), *spread, children),
        Node::ListItem { children, .. } => blocks(children, "\n\n"),
        Node::BlockQuote { children, .. } => blocks(children, "\n\n")
            .lines()
            .map(|line| if line.is_empty() { ">".to_string() } else { format!("> {line}") })
            .collect::<Vec<_>>()
            .join("\n"),
        Node::ThematicBreak { .. } => "***".to_string(),
        Node::Component(component) => component_block(component),
        Node::Raw { value, .. } => value.clone(),
        _ => inline(node),
    }
}

fn inlines(nodes: &[Node]) -> String {
    nodes.iter().map(inline).collect()
}

fn inline(node: &Node) -> String {
    match node {
        Node::Text { value, .. } => value.clone(),
        Node::InlineCode { value, .. } => inline_code(value),
        Node::Emphasis { children, .. } => format!("*{}*", inlines(children)),
        Node::Strong { children, .. } => format!("**{}**", inlines(children)),
        Node::Break { .. } => "\\\n".to_string(),
        Node::Link {
            url,
            title,
            kind,
            children,
            ..
        } => {
            let text = inlines(children);
            match kind {
                LinkKind::Autolink => format!("<{text}>"),
                _ => format!("[{text}]{}", target(url, title.as_deref(), kind)),
            }
        }
        Node::Image {
            url,
            title,
            alt,
            kind,
            ..
        } => format!("![{alt}]{}", target(url, title.as_deref(), kind)),
        Node::Component(component) => component_block(component),
        Node::Raw { value, .. } => value.clone(),
        _ => block(node),
    }
}

/// The part of a link or image after its bracketed text.
fn target(url: &str, title: Option<&str>, kind: &LinkKind) -> String {
    match kind {
        LinkKind::Inline | LinkKind::Autolink => {
            format!("({}{})", destination(url), title_suffix(title))
        }
        LinkKind::Reference { label } => format!("[{label}]"),
        LinkKind::Collapsed => "[]".to_string(),
        LinkKind::Shortcut => String::new(),
    }
}

fn destination(url: &str) -> String {
    if url.is_empty() || url.contains([' ', '(', ')']) {
        format!("<{url}>")
    } else {
        url.to_string()
    }
}

fn title_suffix(title: Option<&str>) -> String {
    match title {
        Some(title) => format!(" \"{}\"", title.replace('"', "\\\"")),
        None => String::new(),
    }
}

fn inline_code(value: &str) -> String {
    let ticks = "`".repeat(longest_run(value, '`') + 1);
    if value.starts_with('`') || value.ends_with('`') {
        format!("{ticks} {value} {ticks}")
    } else {
        format!("{ticks}{value}{ticks}")
    }
}

fn fenced(code: &Code) -> String {
    let fence = "`".repeat(3.max(longest_run(&code.value, '`') + 1));
    let info = match (&code.lang, &code.meta) {
        (Some(lang), Some(meta)) => format!("{lang} {meta}"),
        (Some(lang), None) => lang.clone(),
        (None, Some(meta)) => meta.clone(),
        (None, None) => String::new(),
    };

    if code.value.is_empty() {
        format!("{fence}{info}\n{fence}")
    } else {
        format!("{fence}{info}\n{}\n{fence}", code.value)
    }
}

fn longest_run(text: &str, c: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == c {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn list(ordered: bool, start: u64, spread: bool, items: &[Node]) -> String {
    let item_separator = if spread { "\n\n" } else { "\n" };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let marker = if ordered {
                format!("{}. ", start + i as u64)
            } else {
                "- ".to_string()
            };
            let content = match item {
                Node::ListItem { children, .. } => blocks(children, item_separator),
                other => block(other),
            };
            prefix_lines(&content, &marker, &" ".repeat(marker.len()))
        })
        .collect::<Vec<_>>()
        .join(item_separator)
}

/// Prefix the first line with `first` and indent the rest with `rest`.
fn prefix_lines(content: &str, first: &str, rest: &str) -> String {
    let mut out = String::with_capacity(content.len() + first.len());
    for (i, line) in content.split('\n').enumerate() {
        if i == 0 {
            out.push_str(first);
            out.push_str(line);
            continue;
        }
        out.push('\n');
        if !line.is_empty() {
            out.push_str(rest);
            out.push_str(line);
        }
    }
    out
}

fn component_block(component: &Component) -> String {
    let name = &component.name;
    let attributes = format_attributes(&component.attributes);

    if component.children.is_empty() {
        return format!("<{name}{attributes} />");
    }

    if component.layout == ComponentLayout::Inline {
        return format!("<{name}{attributes}>{}</{name}>", inlines(&component.children));
    }

    let inner = blocks(&component.children, "\n\n");
    if component.children.len() == 1 && !inner.contains("\n\n") {
        format!(
            "<{name}{attributes}>\n{}\n</{name}>",
            prefix_lines(&inner, "  ", "  ")
        )
    } else {
        format!("<{name}{attributes}>\n\n{inner}\n\n</{name}>")
    }
}
