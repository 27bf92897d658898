//! Parsing and serialization behind one interface.

use crate::ast::Root;
use crate::parser::{parse_mdx, ParseError};
use crate::serialize::serialize;

/// Converts between document source text and trees.
///
/// The resolution passes only see documents through this trait, so partials
/// and pages are always read and written the same way.
pub trait DocumentCodec: Send + Sync {
    /// Format identifier (e.g., "mdx")
    fn name(&self) -> &'static str;

    /// Parse source text into a tree.
    fn parse(&self, source: &str) -> Result<Root, ParseError>;

    /// Render a tree back to source text.
    fn serialize(&self, root: &Root) -> String;
}

/// Codec for MDX documents with YAML frontmatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct MdxCodec;

impl MdxCodec {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentCodec for MdxCodec {
    fn name(&self) -> &'static str {
        "mdx"
    }

    fn parse(&self, source: &str) -> Result<Root, ParseError> {
        parse_mdx(source)
    }

    fn serialize(&self, root: &Root) -> String {
        serialize(root)
    }
}
