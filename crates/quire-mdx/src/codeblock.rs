//! Code fence info strings and expanded command snippets.

use serde::{Deserialize, Serialize};

/// Parsed code fence info string: ```` ```lang meta ````.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FenceInfo {
    /// Language tag (first word)
    pub lang: Option<String>,

    /// Everything after the language tag
    pub meta: Option<String>,
}

impl FenceInfo {
    /// Parse a code fence info string.
    pub fn parse(info: &str) -> Self {
        let info = info.trim();
        if info.is_empty() {
            return Self::default();
        }

        match info.split_once(char::is_whitespace) {
            Some((lang, meta)) => {
                let meta = meta.trim();
                Self {
                    lang: Some(lang.to_string()),
                    meta: (!meta.is_empty()).then(|| meta.to_string()),
                }
            }
            None => Self {
                lang: Some(info.to_string()),
                meta: None,
            },
        }
    }
}

/// Check whether a meta string carries a bare flag such as `var`.
pub fn has_flag(meta: Option<&str>, flag: &str) -> bool {
    meta.is_some_and(|m| m.split_whitespace().any(|word| word == flag))
}

/// Structured result of expanding a command snippet block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snippet {
    pub items: Vec<SnippetItem>,
}

impl Snippet {
    /// Number of commands (plain and heredoc) in the snippet.
    pub fn command_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| {
                matches!(
                    item,
                    SnippetItem::Command { .. } | SnippetItem::Heredoc { .. }
                )
            })
            .count()
    }

    /// Literal text of the snippet, one entry per source line.
    pub fn lines(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for item in &self.items {
            match item {
                SnippetItem::Command { lines, .. } => out.extend(lines.iter().map(String::as_str)),
                SnippetItem::Heredoc {
                    opening,
                    body,
                    closing,
                    ..
                } => {
                    out.extend(opening.iter().map(String::as_str));
                    out.extend(body.iter().map(String::as_str));
                    out.push(closing.as_str());
                }
                SnippetItem::Comment(line) => out.push(line.as_str()),
                SnippetItem::Output(lines) => out.extend(lines.iter().map(String::as_str)),
            }
        }
        out
    }

    /// Reassemble the literal text of the snippet.
    pub fn to_text(&self) -> String {
        self.lines().join("\n")
    }
}

/// One piece of a command snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SnippetItem {
    /// A command, displayed over one or more lines.
    Command {
        /// Display lines, prompt included
        lines: Vec<String>,
        /// The command as a single line, prompt and continuations removed
        logical: String,
    },
    /// A command feeding a heredoc body.
    Heredoc {
        /// Display lines of the command up to the heredoc opener
        opening: Vec<String>,
        /// Body lines, verbatim
        body: Vec<String>,
        /// The closing delimiter line
        closing: String,
        delimiter: String,
    },
    /// A `# ` comment line.
    Comment(String),
    /// Command output, verbatim including blank lines.
    Output(Vec<String>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fence_info() {
        assert_eq!(
            FenceInfo::parse("code var"),
            FenceInfo {
                lang: Some("code".to_string()),
                meta: Some("var".to_string()),
            }
        );
        assert_eq!(FenceInfo::parse("bash").lang.as_deref(), Some("bash"));
        assert_eq!(FenceInfo::parse("  "), FenceInfo::default());
    }

    #[test]
    fn detects_flags() {
        assert!(has_flag(Some("title=x var"), "var"));
        assert!(!has_flag(Some("variable"), "var"));
        assert!(!has_flag(None, "var"));
    }

    #[test]
    fn snippet_reassembles_text() {
        let snippet = Snippet {
            items: vec![
                SnippetItem::Comment("# Log in".to_string()),
                SnippetItem::Command {
                    lines: vec!["$ tsh login \\".to_string(), "  --proxy=x".to_string()],
                    logical: "tsh login --proxy=x".to_string(),
                },
                SnippetItem::Output(vec!["ok".to_string(), String::new(), "done".to_string()]),
            ],
        };

        assert_eq!(snippet.command_count(), 1);
        assert_eq!(
            snippet.to_text(),
            "# Log in\n$ tsh login \\\n  --proxy=x\nok\n\ndone"
        );
    }
}
