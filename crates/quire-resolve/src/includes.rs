//! Inclusion resolution: inlining `(!path key="value"!)` partials.
//!
//! Marker sites in a child list are resolved in document order, then spliced
//! back-to-front so earlier splices never shift the indices of later ones.
//! Markers inside code blocks and inline code are replaced textually by the
//! partial's body.

use std::path::{Path, PathBuf};

use quire_mdx::{Component, ComponentLayout, DocumentCodec, Node, Point, Position, Root};

use crate::context::ResolutionContext;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Location};
use crate::error::{ParamError, ResolveError};
use crate::loader::PartialLoader;
use crate::params::{find_markers, split_defaults, substitute_placeholders, Inclusion};
use crate::paths::{normalize, rewrite_reference};

/// Inlines partials into documents.
pub struct InclusionResolver<'a> {
    codec: &'a dyn DocumentCodec,
    loader: &'a dyn PartialLoader,
}

/// State of one resolution, threaded through the recursion.
struct Walk {
    /// Documents currently being resolved, outermost first
    stack: Vec<PathBuf>,
    diagnostics: Vec<Diagnostic>,
}

/// One source line of a paragraph that carries an inclusion marker.
#[derive(Debug)]
enum Line {
    Content(Vec<Node>),
    Marker {
        marker: String,
        position: Option<Position>,
    },
    /// A marker sharing its line with other content
    Mixed { position: Option<Position> },
    /// An opening `(!` that is never closed
    Unclosed {
        text: String,
        position: Option<Position>,
    },
}

impl Line {
    /// Why the line cannot be resolved, if it cannot.
    fn error(&self, doc: &Path) -> Option<ResolveError> {
        match self {
            Line::Mixed { position } => Some(ResolveError::StructuralViolation {
                location: Location::new(doc, *position),
            }),
            Line::Unclosed { text, position } => Some(unclosed(text, Location::new(doc, *position))),
            Line::Content(_) | Line::Marker { .. } => None,
        }
    }
}

impl<'a> InclusionResolver<'a> {
    pub fn new(codec: &'a dyn DocumentCodec, loader: &'a dyn PartialLoader) -> Self {
        Self { codec, loader }
    }

    /// Replace every inclusion marker in `root` with the resolved partial.
    ///
    /// Returns soft diagnostics (unbound parameters). Missing partials,
    /// malformed markers, markers sharing a line and cycles are errors.
    pub fn resolve(
        &self,
        root: &mut Root,
        ctx: &ResolutionContext,
    ) -> Result<Vec<Diagnostic>, ResolveError> {
        let mut walk = Walk {
            stack: vec![normalize(&ctx.doc_path)],
            diagnostics: Vec::new(),
        };
        self.resolve_children(&mut root.children, ctx, &mut walk)?;
        Ok(walk.diagnostics)
    }

    /// Check markers without changing the tree or reading partials' content.
    pub fn lint(&self, root: &Root, ctx: &ResolutionContext) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        self.lint_nodes(&root.children, ctx, &mut diagnostics);
        diagnostics
    }

    fn resolve_children(
        &self,
        children: &mut Vec<Node>,
        ctx: &ResolutionContext,
        walk: &mut Walk,
    ) -> Result<(), ResolveError> {
        let mut splices = Vec::new();
        for (index, node) in children.iter_mut().enumerate() {
            if let Some(replacement) = self.resolve_node(node, ctx, walk)? {
                splices.push((index, replacement));
            }
        }
        for (index, nodes) in splices.into_iter().rev() {
            children.splice(index..=index, nodes);
        }
        Ok(())
    }

    /// Resolve markers under `node` in place, or return the nodes replacing it.
    fn resolve_node(
        &self,
        node: &mut Node,
        ctx: &ResolutionContext,
        walk: &mut Walk,
    ) -> Result<Option<Vec<Node>>, ResolveError> {
        match node {
            Node::Paragraph { children, position } => match self.marker_lines(children, *position) {
                Some(lines) => self.resolve_lines(lines, ctx, walk).map(Some),
                None => {
                    self.resolve_children(children, ctx, walk)?;
                    Ok(None)
                }
            },
            Node::Component(component) => {
                match self.sole_marker(component) {
                    Some(marker) => {
                        let location = Location::new(&ctx.doc_path, component.position);
                        component.children = self.include(&marker, location, ctx, walk)?;
                        component.layout = ComponentLayout::Block;
                    }
                    None => self.resolve_children(&mut component.children, ctx, walk)?,
                }
                Ok(None)
            }
            Node::Code(code) => {
                if has_marker(&code.value) {
                    let location = Location::new(&ctx.doc_path, code.position);
                    code.value = self.expand_text(&code.value, &location, ctx, walk)?;
                }
                Ok(None)
            }
            Node::InlineCode { value, position } => {
                if has_marker(value) {
                    let location = Location::new(&ctx.doc_path, *position);
                    *value = self.expand_text(value, &location, ctx, walk)?;
                }
                Ok(None)
            }
            Node::Text { value, position } if value.contains("(!") => {
                Err(stray_marker(value, Location::new(&ctx.doc_path, *position)))
            }
            other => {
                if let Some(children) = other.children_mut() {
                    self.resolve_children(children, ctx, walk)?;
                }
                Ok(None)
            }
        }
    }

    /// Rebuild a paragraph around its marker lines.
    fn resolve_lines(
        &self,
        lines: Vec<Line>,
        ctx: &ResolutionContext,
        walk: &mut Walk,
    ) -> Result<Vec<Node>, ResolveError> {
        if let Some(error) = lines.iter().find_map(|line| line.error(&ctx.doc_path)) {
            return Err(error);
        }

        let mut out = Vec::new();
        let mut pending: Vec<Vec<Node>> = Vec::new();
        for line in lines {
            match line {
                Line::Content(nodes) => {
                    if !nodes.is_empty() {
                        pending.push(nodes);
                    }
                }
                Line::Marker { marker, position } => {
                    self.flush_paragraph(&mut pending, &mut out, ctx, walk)?;
                    let location = Location::new(&ctx.doc_path, position);
                    out.extend(self.include(&marker, location, ctx, walk)?);
                }
                Line::Mixed { .. } | Line::Unclosed { .. } => {}
            }
        }
        self.flush_paragraph(&mut pending, &mut out, ctx, walk)?;
        Ok(out)
    }

    fn flush_paragraph(
        &self,
        pending: &mut Vec<Vec<Node>>,
        out: &mut Vec<Node>,
        ctx: &ResolutionContext,
        walk: &mut Walk,
    ) -> Result<(), ResolveError> {
        if pending.is_empty() {
            return Ok(());
        }
        let mut children = join_lines(std::mem::take(pending));
        self.resolve_children(&mut children, ctx, walk)?;
        out.push(Node::paragraph(children));
        Ok(())
    }

    /// Load, bind, parse and recursively resolve one partial.
    fn include(
        &self,
        marker: &str,
        location: Location,
        ctx: &ResolutionContext,
        walk: &mut Walk,
    ) -> Result<Vec<Node>, ResolveError> {
        let (inclusion, path) = self.locate(marker, &location, ctx, walk)?;
        let body = self.bind(&inclusion, &path, &location, walk)?;

        let mut tree = self.codec.parse(&body).map_err(|source| ResolveError::InPartial {
            location: location.clone(),
            source: Box::new(ResolveError::Syntax {
                path: path.clone(),
                source,
            }),
        })?;

        tracing::debug!("Including {} into {}", path.display(), ctx.doc_path.display());

        let child = ctx.for_partial(&path);
        walk.stack.push(path.clone());
        let resolved = self.resolve_children(&mut tree.children, &child, walk);
        walk.stack.pop();
        resolved.map_err(|source| ResolveError::InPartial {
            location,
            source: Box::new(source),
        })?;

        rewrite_references(&mut tree, &path, &ctx.doc_path);

        Ok(tree
            .children
            .into_iter()
            .filter(|node| !matches!(node, Node::Frontmatter { .. }))
            .collect())
    }

    /// Replace every marker in a code text by the partial's raw body.
    fn expand_text(
        &self,
        text: &str,
        location: &Location,
        ctx: &ResolutionContext,
        walk: &mut Walk,
    ) -> Result<String, ResolveError> {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for range in find_markers(text) {
            out.push_str(&text[last..range.start]);
            out.push_str(&self.include_text(&text[range.clone()], location, ctx, walk)?);
            last = range.end;
        }
        out.push_str(&text[last..]);
        Ok(out)
    }

    fn include_text(
        &self,
        marker: &str,
        location: &Location,
        ctx: &ResolutionContext,
        walk: &mut Walk,
    ) -> Result<String, ResolveError> {
        let (inclusion, path) = self.locate(marker, location, ctx, walk)?;
        let body = self.bind(&inclusion, &path, location, walk)?;

        tracing::debug!("Including {} as text into {}", path.display(), ctx.doc_path.display());

        let child = ctx.for_partial(&path);
        walk.stack.push(path.clone());
        let expanded = self.expand_text(
            body.trim_end_matches('\n'),
            &Location::new(&path, None),
            &child,
            walk,
        );
        walk.stack.pop();
        expanded.map_err(|source| ResolveError::InPartial {
            location: location.clone(),
            source: Box::new(source),
        })
    }

    /// Parse a marker and find its partial, guarding against cycles.
    fn locate(
        &self,
        marker: &str,
        location: &Location,
        ctx: &ResolutionContext,
        walk: &Walk,
    ) -> Result<(Inclusion, PathBuf), ResolveError> {
        let inclusion = Inclusion::parse(marker).map_err(|source| ResolveError::Parse {
            location: location.clone(),
            source,
        })?;
        let path = normalize(&ctx.root_dir.join(&inclusion.path));

        let depth = walk.stack.len();
        if walk.stack.contains(&path) || depth > ctx.max_depth {
            return Err(ResolveError::InclusionCycle {
                location: location.clone(),
                path,
                depth,
            });
        }
        if !self.loader.exists(&path) {
            return Err(ResolveError::MissingPartial {
                location: location.clone(),
                path: inclusion.path,
            });
        }
        Ok((inclusion, path))
    }

    /// Read a partial and substitute its bound parameters.
    fn bind(
        &self,
        inclusion: &Inclusion,
        path: &Path,
        location: &Location,
        walk: &mut Walk,
    ) -> Result<String, ResolveError> {
        let source = self.loader.load(path).map_err(|source| ResolveError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let partial = split_defaults(&source).map_err(|source| ResolveError::Parse {
            location: location.clone(),
            source,
        })?;

        let bound = inclusion.params.over(&partial.defaults);
        let (body, unbound) = substitute_placeholders(partial.body, &bound);
        for name in unbound {
            let message = format!("Parameter {name} has no value in {}", inclusion.path);
            tracing::warn!("{location}: {message}");
            walk.diagnostics.push(Diagnostic::warning(
                DiagnosticKind::UnboundParameter,
                message,
                location.clone(),
            ));
        }
        Ok(body)
    }

    fn lint_nodes(&self, nodes: &[Node], ctx: &ResolutionContext, out: &mut Vec<Diagnostic>) {
        for node in nodes {
            self.lint_node(node, ctx, out);
        }
    }

    fn lint_node(&self, node: &Node, ctx: &ResolutionContext, out: &mut Vec<Diagnostic>) {
        match node {
            Node::Paragraph { children, position } => match self.marker_lines(children, *position) {
                Some(lines) => {
                    for line in lines {
                        match line {
                            Line::Content(nodes) => self.lint_nodes(&nodes, ctx, out),
                            Line::Marker { marker, position } => {
                                self.check(&marker, Location::new(&ctx.doc_path, position), ctx, out)
                            }
                            invalid => {
                                if let Some(error) = invalid.error(&ctx.doc_path) {
                                    out.push(error.to_diagnostic(&ctx.doc_path));
                                }
                            }
                        }
                    }
                }
                None => self.lint_nodes(children, ctx, out),
            },
            Node::Component(component) => match self.sole_marker(component) {
                Some(marker) => self.check(
                    &marker,
                    Location::new(&ctx.doc_path, component.position),
                    ctx,
                    out,
                ),
                None => self.lint_nodes(&component.children, ctx, out),
            },
            Node::Code(code) => self.check_text(&code.value, code.position, ctx, out),
            Node::InlineCode { value, position } => self.check_text(value, *position, ctx, out),
            Node::Text { value, position } if value.contains("(!") => out.push(
                stray_marker(value, Location::new(&ctx.doc_path, *position))
                    .to_diagnostic(&ctx.doc_path),
            ),
            other => {
                if let Some(children) = other.children() {
                    self.lint_nodes(children, ctx, out);
                }
            }
        }
    }

    fn check_text(
        &self,
        text: &str,
        position: Option<Position>,
        ctx: &ResolutionContext,
        out: &mut Vec<Diagnostic>,
    ) {
        for range in find_markers(text) {
            self.check(&text[range], Location::new(&ctx.doc_path, position), ctx, out);
        }
    }

    /// Validate one marker: syntax and target existence.
    fn check(
        &self,
        marker: &str,
        location: Location,
        ctx: &ResolutionContext,
        out: &mut Vec<Diagnostic>,
    ) {
        let error = match Inclusion::parse(marker) {
            Err(source) => ResolveError::Parse { location, source },
            Ok(inclusion) => {
                let path = normalize(&ctx.root_dir.join(&inclusion.path));
                if self.loader.exists(&path) {
                    return;
                }
                ResolveError::MissingPartial {
                    location,
                    path: inclusion.path,
                }
            }
        };
        out.push(error.to_diagnostic(&ctx.doc_path));
    }
}

fn has_marker(text: &str) -> bool {
    text.contains("(!") && !find_markers(text).is_empty()
}

/// Whether any text under `nodes` opens a marker. Inline code is expanded
/// on its own and does not count.
fn opens_marker(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| match node {
        Node::Text { value, .. } => value.contains("(!"),
        Node::InlineCode { .. } => false,
        other => other.children().is_some_and(|children| opens_marker(children)),
    })
}

/// Whether the trimmed text is exactly one marker.
fn sole_marker_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    match find_markers(trimmed).as_slice() {
        [range] if range.start == 0 && range.end == trimmed.len() => Some(trimmed.to_string()),
        _ => None,
    }
}

fn unclosed(text: &str, location: Location) -> ResolveError {
    ResolveError::Parse {
        location,
        source: ParamError::UnclosedMarker {
            input: text.trim().to_string(),
        },
    }
}

/// Error for marker text found outside a line of its own.
fn stray_marker(text: &str, location: Location) -> ResolveError {
    if has_marker(text) {
        ResolveError::StructuralViolation { location }
    } else {
        unclosed(text, location)
    }
}

impl InclusionResolver<'_> {
    /// Markdown source of a run of inline nodes. With `mask_code`, markers
    /// inside inline code are hidden.
    fn line_source(&self, nodes: &[Node], mask_code: bool) -> String {
        let mut root = Root {
            children: vec![Node::paragraph(nodes.to_vec())],
        };
        if mask_code {
            root.walk_mut(&mut |node| {
                if let Node::InlineCode { value, .. } = node {
                    *value = value.replace("(!", "( ");
                }
            });
        }
        self.codec.serialize(&root).trim().to_string()
    }

    /// The marker of a component whose only content is an inclusion marker.
    fn sole_marker(&self, component: &Component) -> Option<String> {
        let inline = match component.children.as_slice() {
            [Node::Paragraph { children, .. }] => children.as_slice(),
            children if !children.is_empty() && children.iter().all(Node::is_inline) => children,
            _ => return None,
        };
        if !opens_marker(inline) {
            return None;
        }
        sole_marker_text(&self.line_source(inline, true))?;
        sole_marker_text(&self.line_source(inline, false))
    }

    /// Split a paragraph into source lines when any of its text opens a marker.
    ///
    /// Lines are classified on their markdown source, so emphasis, code or
    /// links inside a marker's values do not hide it.
    fn marker_lines(&self, children: &[Node], position: Option<Position>) -> Option<Vec<Line>> {
        if !opens_marker(children) {
            return None;
        }

        let lines = split_lines(children);
        let single = lines.len() == 1;
        Some(
            lines
                .into_iter()
                .enumerate()
                .map(|(index, nodes)| {
                    let line_position = if single {
                        position
                    } else {
                        position.map(|p| {
                            let line = p.start.line + index;
                            let column = if index == 0 { p.start.column } else { 1 };
                            Position::new(Point::new(line, column), Point::new(line, column))
                        })
                    };
                    self.classify_line(nodes, line_position)
                })
                .collect(),
        )
    }

    fn classify_line(&self, nodes: Vec<Node>, position: Option<Position>) -> Line {
        if !opens_marker(&nodes) {
            return Line::Content(nodes);
        }

        let masked = self.line_source(&nodes, true);
        if find_markers(&masked).is_empty() {
            return Line::Unclosed {
                text: masked,
                position,
            };
        }
        if sole_marker_text(&masked).is_none() {
            return Line::Mixed { position };
        }
        match sole_marker_text(&self.line_source(&nodes, false)) {
            Some(marker) => Line::Marker { marker, position },
            None => Line::Mixed { position },
        }
    }
}

fn split_lines(children: &[Node]) -> Vec<Vec<Node>> {
    let mut lines: Vec<Vec<Node>> = vec![Vec::new()];
    for child in children {
        match child {
            Node::Text { value, .. } => {
                for (i, part) in value.split('\n').enumerate() {
                    if i > 0 {
                        lines.push(Vec::new());
                    }
                    match lines.last_mut() {
                        Some(line) if !part.is_empty() => line.push(Node::text(part)),
                        _ => {}
                    }
                }
            }
            Node::Break { .. } => {
                if let Some(line) = lines.last_mut() {
                    line.push(child.clone());
                }
                lines.push(Vec::new());
            }
            other => {
                if let Some(line) = lines.last_mut() {
                    line.push(other.clone());
                }
            }
        }
    }
    lines
}

/// Rejoin source lines into paragraph content.
fn join_lines(lines: Vec<Vec<Node>>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    for (i, line) in lines.into_iter().enumerate() {
        if i > 0 && !matches!(out.last(), Some(Node::Break { .. })) {
            push_inline(&mut out, Node::text("\n"));
        }
        for node in line {
            push_inline(&mut out, node);
        }
    }
    out
}

fn push_inline(out: &mut Vec<Node>, node: Node) {
    if let (Node::Text { value: next, .. }, Some(Node::Text { value, .. })) = (&node, out.last_mut()) {
        value.push_str(next);
        return;
    }
    out.push(node);
}

/// Re-point relative references of an inlined partial at its new home.
fn rewrite_references(root: &mut Root, partial: &Path, doc: &Path) {
    root.walk_mut(&mut |node| match node {
        Node::Link { url, kind, .. } | Node::Image { url, kind, .. } if kind.is_inline() => {
            *url = rewrite_reference(url, partial, doc);
        }
        Node::Definition { url, .. } => *url = rewrite_reference(url, partial, doc),
        _ => {}
    });
}
