//! Frontmatter extraction and parsing.

use serde::Deserialize;

/// Parsed frontmatter from a docs page.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct Frontmatter {
    /// Page title
    #[serde(default)]
    pub title: String,

    /// Page description for SEO
    #[serde(default)]
    pub description: Option<String>,

    /// Label shown in the sidebar instead of the title
    #[serde(default)]
    pub sidebar_label: Option<String>,

    /// Order in navigation (lower = first)
    #[serde(default)]
    pub sidebar_position: Option<i32>,

    #[serde(default)]
    pub tags: Vec<String>,
}

/// A frontmatter block located in the source, not yet parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrontmatter<'a> {
    /// YAML between the fences
    pub yaml: &'a str,

    /// Byte offset just past the closing fence line
    pub end: usize,
}

/// Locate a leading `---` block.
pub fn split_frontmatter(source: &str) -> Result<Option<RawFrontmatter<'_>>, FrontmatterError> {
    let Some(after_open) = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))
    else {
        return Ok(None);
    };
    let open_len = source.len() - after_open.len();

    // Find the closing ---
    let mut offset = 0;
    for line in after_open.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = after_open[..offset].trim_end_matches(['\n', '\r']);
            return Ok(Some(RawFrontmatter {
                yaml,
                end: open_len + offset + line.len(),
            }));
        }
        offset += line.len();
    }

    Err(FrontmatterError::Unclosed)
}

/// Parse the YAML of a frontmatter block.
pub fn parse_frontmatter(yaml: &str) -> Result<Frontmatter, FrontmatterError> {
    if yaml.trim().is_empty() {
        return Ok(Frontmatter::default());
    }
    serde_yaml::from_str(yaml).map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))
}

/// Errors that can occur when parsing frontmatter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed frontmatter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_frontmatter() {
        let source = r#"---
title: Database Access
description: Connect to databases through the proxy
sidebar_position: 1
---

# Database Access
"#;

        let raw = split_frontmatter(source).unwrap().unwrap();
        let fm = parse_frontmatter(raw.yaml).unwrap();

        assert_eq!(fm.title, "Database Access");
        assert_eq!(
            fm.description,
            Some("Connect to databases through the proxy".to_string())
        );
        assert_eq!(fm.sidebar_position, Some(1));
        assert!(source[raw.end..].trim_start().starts_with("# Database Access"));
    }

    #[test]
    fn handles_no_frontmatter() {
        let source = "# Just Markdown\n\nNo frontmatter here.";

        assert!(split_frontmatter(source).unwrap().is_none());
    }

    #[test]
    fn locates_raw_block() {
        let source = "---\ntitle: A\n---\nbody\n";

        let raw = split_frontmatter(source).unwrap().unwrap();

        assert_eq!(raw.yaml, "title: A");
        assert_eq!(&source[raw.end..], "body\n");
    }

    #[test]
    fn errors_on_unclosed_frontmatter() {
        let source = "---\ntitle: Test\n# No closing";

        let result = split_frontmatter(source);

        assert!(matches!(result, Err(FrontmatterError::Unclosed)));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let result = parse_frontmatter("title: [invalid yaml");

        assert!(matches!(result, Err(FrontmatterError::InvalidYaml(_))));
    }

    #[test]
    fn empty_block_is_default() {
        assert_eq!(parse_frontmatter("  \n").unwrap(), Frontmatter::default());
    }
}
