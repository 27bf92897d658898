//! Command snippet expansion inside fenced code blocks.
//!
//! In a snippet block, lines starting with `$ ` are commands, `# ` lines are
//! comments and everything else is output. A command ending in `\` continues
//! on the next line; a command containing `<<DELIM` is followed by a heredoc
//! body running up to a line holding only `DELIM`.

use std::sync::LazyLock;

use quire_mdx::{has_flag, Code, Node, Point, Position, Root, Snippet, SnippetItem};
use regex::Regex;

use crate::context::ResolutionContext;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Location};
use crate::error::SnippetError;
use crate::variables::{substitute, VariableTable};

static HEREDOC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[^<])<<-?\s*['"]?(\w+)['"]?"#).expect("Invalid heredoc regex")
});

const PROMPT: &str = "$ ";
const COMMENT: &str = "# ";

/// Parse the text of a snippet block.
pub fn parse_snippet(text: &str) -> Result<Snippet, SnippetError> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut items: Vec<SnippetItem> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if line.starts_with(PROMPT) {
            let start = i;
            let mut display = vec![line.to_string()];
            while display.last().is_some_and(|l| l.trim_end().ends_with('\\')) {
                i += 1;
                match lines.get(i) {
                    Some(next) if !next.trim().is_empty() => display.push(next.to_string()),
                    _ => return Err(SnippetError::UnfinishedCommand { line: start }),
                }
            }

            let logical = logical_command(&display);
            match HEREDOC_REGEX.captures(&logical) {
                Some(caps) => {
                    let delimiter = caps[1].to_string();
                    let body_start = i + 1;
                    let close = lines[body_start.min(lines.len())..]
                        .iter()
                        .position(|l| l.trim() == delimiter)
                        .map(|offset| body_start + offset)
                        .ok_or_else(|| SnippetError::UnclosedHeredoc {
                            line: start,
                            delimiter: delimiter.clone(),
                        })?;
                    items.push(SnippetItem::Heredoc {
                        opening: display,
                        body: lines[body_start..close].iter().map(|l| l.to_string()).collect(),
                        closing: lines[close].to_string(),
                        delimiter,
                    });
                    i = close;
                }
                None => items.push(SnippetItem::Command {
                    lines: display,
                    logical,
                }),
            }
        } else if line.starts_with(COMMENT) {
            items.push(SnippetItem::Comment(line.to_string()));
        } else {
            match items.last_mut() {
                Some(SnippetItem::Output(output)) => output.push(line.to_string()),
                _ => items.push(SnippetItem::Output(vec![line.to_string()])),
            }
        }
        i += 1;
    }

    Ok(Snippet { items })
}

/// A multi-line command as one line, prompt and continuations removed.
fn logical_command(display: &[String]) -> String {
    display
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let line = if i == 0 {
                line.strip_prefix(PROMPT).unwrap_or(line)
            } else {
                line.as_str()
            };
            let line = line.trim();
            line.strip_suffix('\\').unwrap_or(line).trim()
        })
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether variables are substituted inside this block.
fn is_variable_aware(code: &Code) -> bool {
    code.lang.as_deref() == Some("var") || has_flag(code.meta.as_deref(), "var")
}

fn is_snippet(code: &Code, ctx: &ResolutionContext) -> bool {
    code.lang
        .as_deref()
        .is_some_and(|lang| ctx.is_snippet_lang(lang))
}

/// Expand one code block in place.
///
/// On error the block is left untouched.
pub fn expand(code: &mut Code, variables: &VariableTable) -> Result<(), SnippetError> {
    let mut snippet = parse_snippet(&code.value)?;

    if is_variable_aware(code) {
        substitute_items(&mut snippet, variables);
    }

    code.value = snippet.to_text();
    code.snippet = Some(snippet);
    Ok(())
}

fn substitute_items(snippet: &mut Snippet, variables: &VariableTable) {
    let mut apply = |text: &mut String| {
        if text.contains("(=") {
            *text = substitute(text, variables).0;
        }
    };

    for item in &mut snippet.items {
        match item {
            SnippetItem::Command { lines, logical } => {
                lines.iter_mut().for_each(&mut apply);
                apply(logical);
            }
            SnippetItem::Heredoc {
                opening,
                body,
                closing,
                ..
            } => {
                opening.iter_mut().chain(body.iter_mut()).for_each(&mut apply);
                apply(closing);
            }
            SnippetItem::Comment(line) => apply(line),
            SnippetItem::Output(lines) => lines.iter_mut().for_each(&mut apply),
        }
    }
}

/// Location of a line inside a code block; the fence takes the first line.
fn line_location(ctx: &ResolutionContext, code: &Code, error: &SnippetError) -> Location {
    let position = code.position.map(|p| {
        let line = p.start.line + 1 + error.line();
        Position::new(Point::new(line, 1), Point::new(line, 1))
    });
    Location::new(&ctx.doc_path, position)
}

/// Expand every snippet block of the document.
///
/// Malformed blocks are left unexpanded and reported as warnings.
pub fn resolve(root: &mut Root, ctx: &ResolutionContext) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    root.walk_mut(&mut |node| {
        let Node::Code(code) = node else {
            return;
        };
        if !is_snippet(code, ctx) {
            return;
        }
        if let Err(error) = expand(code, &ctx.variables) {
            let location = line_location(ctx, code, &error);
            tracing::warn!("{location}: {error}");
            diagnostics.push(Diagnostic::warning(
                DiagnosticKind::MalformedDirective,
                error.to_string(),
                location,
            ));
        }
    });
    diagnostics
}

/// Report malformed snippet blocks.
pub fn lint(root: &Root, ctx: &ResolutionContext) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    root.walk(&mut |node| {
        if let Node::Code(code) = node {
            if !is_snippet(code, ctx) {
                return;
            }
            if let Err(error) = parse_snippet(&code.value) {
                diagnostics.push(Diagnostic::error(
                    DiagnosticKind::MalformedDirective,
                    error.to_string(),
                    line_location(ctx, code, &error),
                ));
            }
        }
    });
    diagnostics
}
