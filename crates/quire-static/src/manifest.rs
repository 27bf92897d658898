//! Build manifest written next to the resolved pages.

use std::path::Path;

use quire_mdx::{parse_frontmatter, Node, Root};
use quire_resolve::Diagnostic;
use serde::Serialize;

/// Summary of one build, serialized to `manifest.json`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Manifest {
    /// Version served by default
    pub latest: Option<String>,
    pub versions: Vec<String>,
    pub pages: Vec<ManifestPage>,
    pub warnings: Vec<Diagnostic>,
}

/// One resolved page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestPage {
    pub version: String,
    /// Output path relative to the version directory, `/`-separated
    pub path: String,
    pub source: String,
    pub title: String,
}

impl Manifest {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Title from the page's frontmatter, else its file stem.
pub fn page_title(root: &Root, path: &Path) -> String {
    let from_frontmatter = root.children.iter().find_map(|node| match node {
        Node::Frontmatter { value, .. } => match parse_frontmatter(value) {
            Ok(frontmatter) if !frontmatter.title.is_empty() => Some(frontmatter.title),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Invalid frontmatter in {}: {}", path.display(), e);
                None
            }
        },
        _ => None,
    });

    from_frontmatter.unwrap_or_else(|| {
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled")
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use quire_mdx::{DocumentCodec, MdxCodec};

    fn parse(source: &str) -> Root {
        MdxCodec::new().parse(source).unwrap()
    }

    #[test]
    fn title_comes_from_frontmatter() {
        let root = parse("---\ntitle: Server Access\ndescription: SSH\n---\n\n# Heading\n");

        assert_eq!(page_title(&root, Path::new("server-access.mdx")), "Server Access");
    }

    #[test]
    fn title_falls_back_to_file_stem() {
        assert_eq!(page_title(&parse("# Heading\n"), Path::new("a/installation.mdx")), "installation");
        assert_eq!(
            page_title(&parse("---\ndescription: none\n---\n\nBody\n"), Path::new("faq.md")),
            "faq"
        );
    }

    #[test]
    fn serializes_pages_and_warnings() {
        let manifest = Manifest {
            latest: Some("4.0".to_string()),
            versions: vec!["4.0".to_string()],
            pages: vec![ManifestPage {
                version: "4.0".to_string(),
                path: "guide.mdx".to_string(),
                source: "content/4.0/docs/pages/guide.mdx".to_string(),
                title: "Guide".to_string(),
            }],
            warnings: Vec::new(),
        };

        let value: serde_json::Value = serde_json::from_str(&manifest.to_json().unwrap()).unwrap();

        assert_eq!(value["latest"], "4.0");
        assert_eq!(value["pages"][0]["title"], "Guide");
        assert_eq!(value["warnings"].as_array().map(Vec::len), Some(0));
    }
}
