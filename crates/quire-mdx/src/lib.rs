//! MDX document tree with a markdown parser and serializer.
//!
//! This crate parses MDX files into a closed node tree, keeps YAML
//! frontmatter and JSX-style components, and renders trees back to text.

pub mod ast;
pub mod codec;
pub mod codeblock;
pub mod component;
pub mod frontmatter;
pub mod parser;
pub mod serialize;

pub use ast::{
    AttrValue, Attribute, Code, Component, ComponentLayout, LinkKind, Node, Point, Position, Root,
};
pub use codec::{DocumentCodec, MdxCodec};
pub use codeblock::{has_flag, FenceInfo, Snippet, SnippetItem};
pub use frontmatter::{parse_frontmatter, Frontmatter, FrontmatterError};
pub use parser::{parse_mdx, ParseError};
pub use serialize::serialize;
