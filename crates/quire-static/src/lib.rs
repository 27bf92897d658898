//! Versioned documentation corpus builder.
//!
//! Resolves every page of every supported version with the quire pipeline
//! and writes self-contained copies into per-version output directories.

pub mod assets;
pub mod builder;
pub mod lint;
pub mod manifest;

pub use builder::{BuildConfig, BuildError, BuildResult, StaticBuilder};
pub use lint::LintReport;
pub use manifest::{Manifest, ManifestPage};
