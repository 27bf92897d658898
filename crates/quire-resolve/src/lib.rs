//! Template resolution for versioned documentation.
//!
//! Pages reference reusable partials with `(!path key="value"!)` markers,
//! per-version variables with `(=dotted.path=)` tokens and shell examples in
//! snippet code blocks. This crate resolves all three into a self-contained
//! document tree, or lints them without changing anything.

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod error;
pub mod includes;
pub mod loader;
pub mod params;
pub mod paths;
pub mod pipeline;
pub mod snippet;
pub mod variables;

pub use config::{Config, VersionConfig};
pub use context::{
    ContentLayout, DocumentIdentity, FsVariableSource, ResolutionContext, VariableSource,
    VersionResolver,
};
pub use diagnostic::{error_count, Diagnostic, DiagnosticKind, Location, Severity};
pub use error::{ConfigError, ParamError, ResolveError, SnippetError};
pub use includes::InclusionResolver;
pub use loader::{FsLoader, MemoryLoader, PartialLoader};
pub use params::{parse_assignments, Assignments, Inclusion};
pub use paths::{rewrite_asset_reference, rewrite_reference};
pub use pipeline::{Mode, PassReport, Pipeline};
pub use variables::VariableTable;
