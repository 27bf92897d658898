//! MDX document parser.
//!
//! Block and inline structure comes from pulldown-cmark. HTML blocks that
//! hold JSX-style tags are turned into [`Component`] nodes, and their inner
//! lines are parsed again as markdown.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, LinkType, Options, Parser, Tag};

use crate::ast::{Code, Component, ComponentLayout, LinkKind, Node, Point, Position, Root};
use crate::codeblock::FenceInfo;
use crate::component::{closing_tag, scan_open_tag};
use crate::frontmatter::{split_frontmatter, FrontmatterError};

/// Errors that can occur when parsing MDX.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Frontmatter error: {0}")]
    Frontmatter(#[from] FrontmatterError),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Parse an MDX document into a tree.
pub fn parse_mdx(source: &str) -> Result<Root, ParseError> {
    let index = LineIndex::new(source);
    let mut children = Vec::new();

    let body_start = match split_frontmatter(source)? {
        Some(raw) => {
            children.push(Node::Frontmatter {
                value: raw.yaml.to_string(),
                position: Some(Position::new(index.point(0), index.point(raw.end))),
            });
            raw.end
        }
        None => 0,
    };

    let map = SourceMap::new(&index, body_start);
    children.extend(parse_fragment(&source[body_start..], &map));

    Ok(Root { children })
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

/// Parse a piece of markdown whose offsets are translated through `map`.
fn parse_fragment(text: &str, map: &SourceMap<'_>) -> Vec<Node> {
    let parser = Parser::new_ext(text, options());

    let definitions: Vec<Node> = parser
        .reference_definitions()
        .iter()
        .map(|(_, def)| {
            definition_node(text, def.span.clone(), &def.dest, def.title.as_deref(), map)
        })
        .collect();

    let mut builder = TreeBuilder::new(text, map);
    for (event, range) in parser.into_offset_iter() {
        builder.event(event, range);
    }

    let mut nodes = builder.finish();
    for definition in definitions {
        insert_in_order(&mut nodes, definition);
    }
    nodes
}

fn definition_node(
    text: &str,
    span: Range<usize>,
    dest: &str,
    title: Option<&str>,
    map: &SourceMap<'_>,
) -> Node {
    let source = &text[span.clone()];
    let label = source
        .trim_start()
        .strip_prefix('[')
        .and_then(|rest| rest.find("]:").map(|end| rest[..end].to_string()))
        .unwrap_or_default();

    Node::Definition {
        label,
        url: dest.to_string(),
        title: title.map(str::to_string),
        position: Some(map.position(span)),
    }
}

/// Insert a block before the first sibling that starts after it.
fn insert_in_order(nodes: &mut Vec<Node>, node: Node) {
    let start = node.position().map(|p| p.start);
    let index = nodes
        .iter()
        .position(|n| match (n.position(), start) {
            (Some(p), Some(s)) => p.start > s,
            _ => false,
        })
        .unwrap_or(nodes.len());
    nodes.insert(index, node);
}

/// Byte offset to line/column lookup for a whole source file.
#[derive(Debug)]
struct LineIndex {
    text: String,
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            line_starts: line_starts(text),
        }
    }

    fn point(&self, offset: usize) -> Point {
        let offset = offset.min(self.text.len());
        let line = self.line_starts.partition_point(|&s| s <= offset) - 1;
        let start = self.line_starts[line];
        let column = self
            .text
            .get(start..offset)
            .map_or(offset - start, |s| s.chars().count());
        Point::new(line + 1, column + 1)
    }
}

fn line_starts(text: &str) -> Vec<usize> {
    std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect()
}

/// One level of text extracted from its parent (possibly dedented).
#[derive(Debug, Clone)]
struct Layer {
    /// Offset of the layer text within its parent
    base: usize,
    line_starts: Vec<usize>,
    /// Bytes removed from the start of each line, cumulative
    removed: Vec<usize>,
}

impl Layer {
    fn to_parent(&self, offset: usize) -> usize {
        let line = self.line_starts.partition_point(|&s| s <= offset).saturating_sub(1);
        self.base + offset + self.removed.get(line).copied().unwrap_or(0)
    }
}

/// Maps offsets of a nested fragment back to the document source.
#[derive(Debug, Clone)]
struct SourceMap<'a> {
    index: &'a LineIndex,
    layers: Vec<Layer>,
}

impl<'a> SourceMap<'a> {
    fn new(index: &'a LineIndex, base: usize) -> Self {
        Self {
            index,
            layers: vec![Layer {
                base,
                line_starts: vec![0],
                removed: vec![0],
            }],
        }
    }

    /// A map for `text` found at `base` in the current fragment, where
    /// `removed[i]` bytes were stripped from the start of line `i`.
    fn nested(&self, base: usize, text: &str, removed: &[usize]) -> Self {
        let mut total = 0;
        let cumulative = removed
            .iter()
            .map(|r| {
                total += r;
                total
            })
            .collect();
        let mut layers = self.layers.clone();
        layers.push(Layer {
            base,
            line_starts: line_starts(text),
            removed: cumulative,
        });
        Self {
            index: self.index,
            layers,
        }
    }

    fn offset(&self, local: usize) -> usize {
        self.layers
            .iter()
            .rev()
            .fold(local, |offset, layer| layer.to_parent(offset))
    }

    fn position(&self, range: Range<usize>) -> Position {
        Position::new(
            self.index.point(self.offset(range.start)),
            self.index.point(self.offset(range.end)),
        )
    }
}

/// Container being filled while its events stream in.
#[derive(Debug)]
enum Container {
    Paragraph,
    Heading(u8),
    Emphasis,
    Strong,
    Link {
        url: String,
        title: Option<String>,
        kind: LinkKind,
    },
    List {
        ordered: bool,
        start: Option<u64>,
        spread: bool,
    },
    ListItem,
    BlockQuote,
}

#[derive(Debug)]
enum Frame {
    Container {
        container: Container,
        start: usize,
        children: Vec<Node>,
    },
    /// Component opened by one HTML block and closed by a later one.
    Component { component: Component, start: usize },
    Code {
        info: FenceInfo,
        start: usize,
        value: String,
    },
    Image {
        url: String,
        title: Option<String>,
        kind: LinkKind,
        range: Range<usize>,
        alt: String,
        depth: usize,
    },
    Html { range: Range<usize> },
    /// Construct kept as source text; nested events are skipped.
    Raw { range: Range<usize>, depth: usize },
}

/// What the previous event left behind, for merging text runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Last {
    Text(usize),
    Break,
    Other,
}

struct TreeBuilder<'t, 'm> {
    text: &'t str,
    map: &'m SourceMap<'m>,
    stack: Vec<Frame>,
    root: Vec<Node>,
    last: Last,
}

impl<'t, 'm> TreeBuilder<'t, 'm> {
    fn new(text: &'t str, map: &'m SourceMap<'m>) -> Self {
        Self {
            text,
            map,
            stack: Vec::new(),
            root: Vec::new(),
            last: Last::Other,
        }
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        // Frames that swallow their nested events
        match self.stack.last_mut() {
            Some(Frame::Raw { depth, .. }) => {
                match event {
                    Event::Start(_) => *depth += 1,
                    Event::End(_) if *depth == 0 => self.close_raw(),
                    Event::End(_) => *depth -= 1,
                    _ => {}
                }
                return;
            }
            Some(Frame::Html { .. }) => {
                if let Event::End(_) = event {
                    if let Some(Frame::Html { range }) = self.stack.pop() {
                        self.html_block(range);
                    }
                }
                return;
            }
            Some(Frame::Code { value, .. }) => {
                match event {
                    Event::Text(text) => value.push_str(&text),
                    Event::End(_) => self.close_code(range),
                    _ => {}
                }
                return;
            }
            Some(Frame::Image { alt, depth, .. }) => {
                match event {
                    Event::Text(text) | Event::Code(text) => alt.push_str(&text),
                    Event::Start(_) => *depth += 1,
                    Event::End(_) if *depth == 0 => self.close_image(),
                    Event::End(_) => *depth -= 1,
                    _ => {}
                }
                return;
            }
            _ => {}
        }

        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(_) => self.end(range),
            Event::Text(_) => self.text_run(range),
            Event::Code(code) => self.push(Node::InlineCode {
                value: code.to_string(),
                position: Some(self.map.position(range)),
            }),
            Event::SoftBreak => {
                let joined = self.last != Last::Other;
                let position = Some(self.map.position(range));
                let children = self.current_children();
                match children.last_mut() {
                    Some(Node::Text { value, .. }) if joined => value.push('\n'),
                    _ => children.push(Node::Text {
                        value: "\n".to_string(),
                        position,
                    }),
                }
                self.last = Last::Break;
            }
            Event::HardBreak => self.push(Node::Break {
                position: Some(self.map.position(range)),
            }),
            Event::Rule => self.push(Node::ThematicBreak {
                position: Some(self.map.position(range)),
            }),
            Event::TaskListMarker(checked) => self.push(Node::Raw {
                value: if checked { "[x] " } else { "[ ] " }.to_string(),
                position: Some(self.map.position(range)),
            }),
            // Inline HTML, footnote references, math
            _ => {
                let node = Node::Raw {
                    value: self.text[range.clone()].to_string(),
                    position: Some(self.map.position(range)),
                };
                self.push(node);
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
        self.last = Last::Other;
        let start = range.start;
        let container = match tag {
            Tag::Paragraph => {
                self.mark_spread();
                Container::Paragraph
            }
            Tag::Heading { level, .. } => Container::Heading(level as u8),
            Tag::Emphasis => Container::Emphasis,
            Tag::Strong => Container::Strong,
            Tag::BlockQuote(..) => Container::BlockQuote,
            Tag::List(first) => Container::List {
                ordered: first.is_some(),
                start: first,
                spread: false,
            },
            Tag::Item => Container::ListItem,
            Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            } => Container::Link {
                url: dest_url.to_string(),
                title: non_empty(&title),
                kind: link_kind(link_type, &id),
            },
            Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            } => {
                self.stack.push(Frame::Image {
                    url: dest_url.to_string(),
                    title: non_empty(&title),
                    kind: link_kind(link_type, &id),
                    range,
                    alt: String::new(),
                    depth: 0,
                });
                return;
            }
            Tag::CodeBlock(kind) => {
                let info = match kind {
                    CodeBlockKind::Fenced(info) => FenceInfo::parse(&info),
                    CodeBlockKind::Indented => FenceInfo::default(),
                };
                self.stack.push(Frame::Code {
                    info,
                    start,
                    value: String::new(),
                });
                return;
            }
            Tag::HtmlBlock => {
                self.stack.push(Frame::Html { range });
                return;
            }
            _ => {
                self.stack.push(Frame::Raw { range, depth: 0 });
                return;
            }
        };

        self.stack.push(Frame::Container {
            container,
            start,
            children: Vec::new(),
        });
    }

    /// A paragraph directly inside a list item makes the list loose.
    fn mark_spread(&mut self) {
        let len = self.stack.len();
        if len < 2 {
            return;
        }
        if let Frame::Container {
            container: Container::ListItem,
            ..
        } = &self.stack[len - 1]
        {
            if let Frame::Container {
                container: Container::List { spread, .. },
                ..
            } = &mut self.stack[len - 2]
            {
                *spread = true;
            }
        }
    }

    fn end(&mut self, range: Range<usize>) {
        self.last = Last::Other;

        // Components left open inside this container end with it
        while matches!(self.stack.last(), Some(Frame::Component { .. })) {
            self.close_component_frame(range.end);
        }

        let Some(Frame::Container {
            container,
            start,
            children,
        }) = self.stack.pop()
        else {
            return;
        };

        let position = Some(self.map.position(start..range.end));
        let node = match container {
            Container::Paragraph => Node::Paragraph { children, position },
            Container::Heading(depth) => Node::Heading {
                depth,
                children,
                position,
            },
            Container::Emphasis => Node::Emphasis { children, position },
            Container::Strong => Node::Strong { children, position },
            Container::BlockQuote => Node::BlockQuote { children, position },
            Container::List {
                ordered,
                start,
                spread,
            } => Node::List {
                ordered,
                start,
                spread,
                children,
                position,
            },
            Container::ListItem => Node::ListItem {
                children: wrap_inline(children),
                position,
            },
            Container::Link { url, title, kind } => Node::Link {
                url,
                title,
                kind,
                children,
                position,
            },
        };
        self.push(node);
    }

    fn text_run(&mut self, range: Range<usize>) {
        let last = self.last;
        let text = self.text;
        let map = self.map;
        self.last = Last::Text(range.end);

        let from = match last {
            Last::Text(prev_end) => Some(prev_end),
            Last::Break => Some(range.start),
            Last::Other => None,
        };

        let children = self.current_children();
        if let (Some(from), Some(Node::Text { value, position })) = (from, children.last_mut()) {
            value.push_str(&text[from..range.end]);
            if let Some(p) = position {
                p.end = map.position(from..range.end).end;
            }
            return;
        }

        // Keep the backslash of an escape that opens the run
        let mut start = range.start;
        if start > 0
            && text.as_bytes()[start - 1] == b'\\'
            && text.as_bytes()[start].is_ascii_punctuation()
        {
            start -= 1;
        }
        children.push(Node::Text {
            value: text[start..range.end].to_string(),
            position: Some(map.position(start..range.end)),
        });
    }

    fn close_raw(&mut self) {
        if let Some(Frame::Raw { range, .. }) = self.stack.pop() {
            let node = Node::Raw {
                value: self.text[range.clone()].trim_end().to_string(),
                position: Some(self.map.position(range)),
            };
            self.push(node);
        }
    }

    fn close_code(&mut self, range: Range<usize>) {
        if let Some(Frame::Code { info, start, value }) = self.stack.pop() {
            let value = value.strip_suffix('\n').unwrap_or(&value).to_string();
            let node = Node::Code(Code {
                lang: info.lang,
                meta: info.meta,
                value,
                snippet: None,
                position: Some(self.map.position(start..range.end)),
            });
            self.push(node);
        }
    }

    fn close_image(&mut self) {
        if let Some(Frame::Image {
            url,
            title,
            kind,
            range,
            alt,
            ..
        }) = self.stack.pop()
        {
            let node = Node::Image {
                url,
                title,
                alt,
                kind,
                position: Some(self.map.position(range)),
            };
            self.push(node);
        }
    }

    fn close_component_frame(&mut self, end: usize) {
        if let Some(Frame::Component {
            mut component,
            start,
        }) = self.stack.pop()
        {
            component.position = Some(self.map.position(start..end));
            self.push(Node::Component(component));
        }
    }

    /// Close the innermost open component named `name`, if any.
    fn close_component(&mut self, name: &str, end: usize) -> bool {
        let open = self.stack.iter().rposition(|frame| match frame {
            Frame::Component { component, .. } => component.name == name,
            _ => false,
        });
        let Some(index) = open else {
            return false;
        };
        // Never close across a markdown container
        if self.stack[index + 1..]
            .iter()
            .any(|frame| !matches!(frame, Frame::Component { .. }))
        {
            return false;
        }
        while self.stack.len() > index {
            self.close_component_frame(end);
        }
        true
    }

    /// Turn an HTML block into components, nested markdown, or raw HTML.
    fn html_block(&mut self, range: Range<usize>) {
        let text = self.text;
        let block = &text[range.clone()];
        let mut offset = 0;

        while offset < block.len() {
            let rest = &block[offset..];
            let lead = rest.len() - rest.trim_start().len();
            if rest.trim().is_empty() {
                break;
            }
            let tag_start = offset + lead;
            let trimmed = &block[tag_start..];
            let line_len = line_length(trimmed);
            let abs = range.start + tag_start;

            let line = trimmed[..line_len].trim_end();
            if let Some(name) = closing_tag(line) {
                let end = abs + line.len();
                if !self.close_component(name, end) {
                    self.push(Node::Raw {
                        value: line.to_string(),
                        position: Some(self.map.position(abs..end)),
                    });
                }
                offset = tag_start + line_len;
                continue;
            }

            let Some(tag) = scan_open_tag(trimmed) else {
                if trimmed.starts_with('<') {
                    self.push(Node::Raw {
                        value: trimmed.trim_end().to_string(),
                        position: Some(self.map.position(abs..range.end)),
                    });
                    return;
                }
                // Markdown lines between tags
                let len = markdown_run(trimmed);
                for child in self.nested(abs, &trimmed[..len]) {
                    self.push(child);
                }
                offset = tag_start + len;
                continue;
            };

            let after = &trimmed[tag.len..];
            let after_len = line_length(after);
            let after_line = after[..after_len].trim();
            let tag_line_end = tag_start + tag.len + after_len;
            let mut component = Component {
                name: tag.name.clone(),
                attributes: tag.attributes.clone(),
                ..Default::default()
            };

            if tag.self_closing && after_line.is_empty() {
                component.position = Some(self.map.position(abs..range.start + tag_line_end));
                self.push(Node::Component(component));
                offset = tag_line_end;
                continue;
            }

            if !tag.self_closing && after_line.is_empty() {
                let inner_start = tag_line_end;
                match find_close_line(&block[inner_start..], &tag.name) {
                    Some((inner_len, close_end)) => {
                        let inner = &block[inner_start..inner_start + inner_len];
                        component.children = self.nested(range.start + inner_start, inner);
                        let end = inner_start + close_end;
                        component.position = Some(self.map.position(abs..range.start + end));
                        self.push(Node::Component(component));
                        offset = end;
                    }
                    None => {
                        self.last = Last::Other;
                        self.stack.push(Frame::Component {
                            component,
                            start: abs,
                        });
                        offset = inner_start;
                    }
                }
                continue;
            }

            let closing = format!("</{}>", tag.name);
            if let Some(inner) = after_line.strip_suffix(closing.as_str()) {
                if !tag.self_closing {
                    let inner_offset = tag_start + tag.len + (after.len() - after.trim_start().len());
                    let mut children = self.nested(range.start + inner_offset, inner);
                    component.layout = ComponentLayout::Inline;
                    if let [Node::Paragraph { .. }] = children.as_slice() {
                        if let Some(Node::Paragraph { children: inline, .. }) = children.pop() {
                            children = inline;
                        }
                    } else if !children.is_empty() {
                        component.layout = ComponentLayout::Block;
                    }
                    component.children = children;
                    component.position = Some(self.map.position(abs..range.start + tag_line_end));
                    self.push(Node::Component(component));
                    offset = tag_line_end;
                    continue;
                }
            }

            self.push(Node::Raw {
                value: trimmed.trim_end().to_string(),
                position: Some(self.map.position(abs..range.end)),
            });
            return;
        }
    }

    /// Parse lines nested inside a component, dedenting them first.
    fn nested(&self, base: usize, inner: &str) -> Vec<Node> {
        let indent = inner
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.len() - line.trim_start().len())
            .min()
            .unwrap_or(0);

        let mut dedented = String::with_capacity(inner.len());
        let mut removed = Vec::new();
        for line in inner.split_inclusive('\n') {
            let strip = (line.len() - line.trim_start_matches([' ', '\t']).len()).min(indent);
            removed.push(strip);
            dedented.push_str(&line[strip..]);
        }

        let map = self.map.nested(base, &dedented, &removed);
        parse_fragment(&dedented, &map)
    }

    fn current_children(&mut self) -> &mut Vec<Node> {
        for frame in self.stack.iter_mut().rev() {
            match frame {
                Frame::Container { children, .. } => return children,
                Frame::Component { component, .. } => return &mut component.children,
                _ => {}
            }
        }
        &mut self.root
    }

    fn push(&mut self, node: Node) {
        self.last = Last::Other;
        self.current_children().push(node);
    }

    fn finish(mut self) -> Vec<Node> {
        let end = self.text.len();
        while let Some(frame) = self.stack.last() {
            match frame {
                Frame::Component { .. } => self.close_component_frame(end),
                Frame::Container { .. } => self.end(end..end),
                _ => {
                    self.stack.pop();
                }
            }
        }
        self.root
    }
}

/// Length of the first line of `text`, including its newline.
fn line_length(text: &str) -> usize {
    text.find('\n').map_or(text.len(), |i| i + 1)
}

/// Length of the leading lines of `text` up to the next line opening a tag.
fn markdown_run(text: &str) -> usize {
    let mut len = 0;
    for line in text.split_inclusive('\n') {
        if len > 0 && line.trim_start().starts_with('<') {
            break;
        }
        len += line.len();
    }
    len
}

/// Find the line closing tag `name` in `text`, accounting for nesting.
///
/// Returns the length of the inner content and the end offset of the closing line.
fn find_close_line(text: &str, name: &str) -> Option<(usize, usize)> {
    let open_prefix = format!("<{name}");
    let mut depth = 0usize;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if closing_tag(trimmed) == Some(name) {
            if depth == 0 {
                return Some((offset, offset + line.len()));
            }
            depth -= 1;
        } else if let Some(rest) = trimmed.strip_prefix(open_prefix.as_str()) {
            let continues_name = rest
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
            let closes_inline = trimmed.ends_with("/>") || trimmed.ends_with(&format!("</{name}>"));
            if !continues_name && !closes_inline {
                depth += 1;
            }
        }
        offset += line.len();
    }
    None
}

/// Wrap runs of inline nodes (tight list items) into paragraphs.
fn wrap_inline(children: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    let mut run: Vec<Node> = Vec::new();

    for child in children {
        if child.is_inline() || (matches!(child, Node::Raw { .. }) && !run.is_empty()) {
            run.push(child);
        } else {
            if !run.is_empty() {
                out.push(Node::paragraph(std::mem::take(&mut run)));
            }
            out.push(child);
        }
    }
    if !run.is_empty() {
        out.push(Node::paragraph(run));
    }
    out
}

fn link_kind(link_type: LinkType, id: &str) -> LinkKind {
    match link_type {
        LinkType::Autolink | LinkType::Email => LinkKind::Autolink,
        LinkType::Reference | LinkType::ReferenceUnknown => LinkKind::Reference {
            label: id.to_string(),
        },
        LinkType::Collapsed | LinkType::CollapsedUnknown => LinkKind::Collapsed,
        LinkType::Shortcut | LinkType::ShortcutUnknown => LinkKind::Shortcut,
        _ => LinkKind::Inline,
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(node: &Node) -> Vec<String> {
        let mut out = Vec::new();
        node.walk(&mut |n| {
            if let Node::Text { value, .. } = n {
                out.push(value.clone());
            }
        });
        out
    }

    #[test]
    fn parses_frontmatter_and_blocks() {
        let source = "---\ntitle: Intro\n---\n\n# Intro\n\nSome text.\n";

        let root = parse_mdx(source).unwrap();

        assert!(matches!(&root.children[0], Node::Frontmatter { value, .. } if value == "title: Intro"));
        assert!(matches!(&root.children[1], Node::Heading { depth: 1, .. }));
        assert!(matches!(&root.children[2], Node::Paragraph { .. }));
        assert_eq!(root.children[2].position().unwrap().start, Point::new(7, 1));
    }

    #[test]
    fn keeps_escapes_in_text() {
        let source = r#"(!error.mdx message="Type \"final\" now"!)"#;

        let root = parse_mdx(source).unwrap();

        assert_eq!(texts(&root.children[0]), vec![source.to_string()]);
    }

    #[test]
    fn merges_soft_breaks_into_text() {
        let root = parse_mdx("first line\nsecond line\n").unwrap();

        assert_eq!(texts(&root.children[0]), vec!["first line\nsecond line"]);
    }

    #[test]
    fn parses_code_blocks() {
        let root = parse_mdx("```code var\n$ tsh login\n\nok\n```\n").unwrap();

        let Node::Code(code) = &root.children[0] else {
            panic!("expected code block");
        };
        assert_eq!(code.lang.as_deref(), Some("code"));
        assert_eq!(code.meta.as_deref(), Some("var"));
        assert_eq!(code.value, "$ tsh login\n\nok");
    }

    #[test]
    fn parses_links_images_and_definitions() {
        let source = "See [the guide](../guide.mdx) and [setup].\n\n![Diagram](./img/a.png \"Arch\")\n\n[setup]: ./setup.mdx\n";

        let root = parse_mdx(source).unwrap();

        let mut urls = Vec::new();
        root.walk(&mut |node| match node {
            Node::Link { url, kind, .. } if kind.is_inline() => urls.push(url.clone()),
            Node::Image { url, title, alt, .. } => {
                assert_eq!(alt, "Diagram");
                assert_eq!(title.as_deref(), Some("Arch"));
                urls.push(url.clone());
            }
            Node::Definition { label, url, .. } => {
                assert_eq!(label, "setup");
                urls.push(url.clone());
            }
            _ => {}
        });

        assert_eq!(urls, vec!["../guide.mdx", "./img/a.png", "./setup.mdx"]);
        assert!(matches!(root.children.last(), Some(Node::Definition { .. })));
    }

    #[test]
    fn definitions_keep_title_and_position() {
        let source = "Intro [setup].\n\n[setup]: ./setup.mdx \"Setup guide\"\n";

        let root = parse_mdx(source).unwrap();

        let Some(Node::Definition { label, url, title, position }) = root.children.last() else {
            panic!("expected definition");
        };
        assert_eq!(label, "setup");
        assert_eq!(url, "./setup.mdx");
        assert_eq!(title.as_deref(), Some("Setup guide"));
        assert_eq!(position.map(|p| p.start.line), Some(3));
    }

    #[test]
    fn parses_component_with_nested_markdown() {
        let source = "<Figure>\n  ![IAM user](../img/iam.png)\n</Figure>\n";

        let root = parse_mdx(source).unwrap();

        let Node::Component(figure) = &root.children[0] else {
            panic!("expected component");
        };
        assert_eq!(figure.name, "Figure");
        assert_eq!(figure.layout, ComponentLayout::Block);
        let Node::Paragraph { children, .. } = &figure.children[0] else {
            panic!("expected paragraph");
        };
        assert!(matches!(&children[0], Node::Image { url, .. } if url == "../img/iam.png"));
        assert_eq!(children[0].position().unwrap().start, Point::new(2, 3));
    }

    #[test]
    fn parses_component_spanning_blocks() {
        let source = "<Details title=\"More\">\n\nFirst paragraph.\n\n(!partial.mdx!)\n\n</Details>\n\nAfter.\n";

        let root = parse_mdx(source).unwrap();

        assert_eq!(root.children.len(), 2);
        let Node::Component(details) = &root.children[0] else {
            panic!("expected component");
        };
        assert_eq!(details.attribute("title"), Some("More"));
        assert_eq!(details.children.len(), 2);
        assert_eq!(texts(&details.children[1]), vec!["(!partial.mdx!)"]);
        assert_eq!(details.position.unwrap().end.line, 7);
    }

    #[test]
    fn splits_summary_from_following_lines() {
        let source = "<details>\n<summary>Show more</summary>\n(!partial.mdx!)\n</details>\n";

        let root = parse_mdx(source).unwrap();

        let Node::Component(details) = &root.children[0] else {
            panic!("expected component");
        };
        let Node::Component(summary) = &details.children[0] else {
            panic!("expected summary");
        };
        assert_eq!(summary.name, "summary");
        assert_eq!(summary.layout, ComponentLayout::Inline);
        assert!(matches!(&details.children[1], Node::Paragraph { .. }));
    }

    #[test]
    fn keeps_unknown_html_raw() {
        let root = parse_mdx("<!-- note -->\n\ntext\n").unwrap();

        assert!(matches!(&root.children[0], Node::Raw { value, .. } if value == "<!-- note -->"));
    }

    #[test]
    fn tight_list_items_get_paragraphs() {
        let root = parse_mdx("- one\n- two\n").unwrap();

        let Node::List {
            spread, children, ..
        } = &root.children[0]
        else {
            panic!("expected list");
        };
        assert!(!spread);
        assert!(matches!(&children[0], Node::ListItem { children, .. } if matches!(children[0], Node::Paragraph { .. })));
    }

    #[test]
    fn tables_pass_through_raw() {
        let source = "| a | b |\n| - | - |\n| 1 | 2 |\n";

        let root = parse_mdx(source).unwrap();

        assert!(matches!(&root.children[0], Node::Raw { value, .. } if value == source.trim_end()));
    }
}
