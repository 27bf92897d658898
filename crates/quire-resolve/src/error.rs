//! Error types for the resolution pipeline.

use std::path::PathBuf;

use quire_mdx::ParseError;

use crate::diagnostic::{Diagnostic, DiagnosticKind, Location};

/// Errors in parameter lists, inclusion markers and defaults blocks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("Duplicate parameter \"{key}\" in `{input}`")]
    DuplicateKey { key: String, input: String },

    #[error("Parameter values must be wrapped in double quotes: `{input}`")]
    SingleQuoted { input: String },

    #[error("Unterminated parameter value: `{input}`")]
    Unterminated { input: String },

    #[error("Quoted value with no key: `{input}`")]
    MissingKey { input: String },

    #[error("Expected key=\"value\" assignments: `{input}`")]
    Malformed { input: String },

    #[error("Not an inclusion expression: `{input}`")]
    NotInclusion { input: String },

    #[error("Inclusion marker has no closing `!)`: `{input}`")]
    UnclosedMarker { input: String },

    #[error("Partial is empty")]
    EmptySource,
}

/// Malformed command snippets. `line` is 0-based within the code block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SnippetError {
    #[error("No closing line for heredoc format")]
    UnclosedHeredoc { line: usize, delimiter: String },

    #[error("The last string in the multiline command has to be without symbol \\")]
    UnfinishedCommand { line: usize },
}

impl SnippetError {
    pub fn line(&self) -> usize {
        match self {
            Self::UnclosedHeredoc { line, .. } | Self::UnfinishedCommand { line } => *line,
        }
    }
}

/// Errors that stop a document from being resolved.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("{location}: {source}")]
    Parse {
        location: Location,
        #[source]
        source: ParamError,
    },

    #[error("{location}: Wrong import path {path} in file {}.", .location.file.display())]
    MissingPartial { location: Location, path: String },

    #[error("{location}: Includes only works if they are the only content on the line")]
    StructuralViolation { location: Location },

    #[error("{location}: Inclusion cycle through {} at depth {depth}", .path.display())]
    InclusionCycle {
        location: Location,
        path: PathBuf,
        depth: usize,
    },

    /// A page or partial that is not a valid document.
    #[error("Failed to parse {}: {source}", .path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An error raised inside an included partial, reported at the marker
    /// that included it.
    #[error("{location}: {source}")]
    InPartial {
        location: Location,
        #[source]
        source: Box<ResolveError>,
    },
}

impl ResolveError {
    /// The error at the bottom of a chain of nested partials.
    pub fn innermost(&self) -> &ResolveError {
        match self {
            Self::InPartial { source, .. } => source.innermost(),
            other => other,
        }
    }

    pub fn kind(&self) -> DiagnosticKind {
        match self.innermost() {
            Self::MissingPartial { .. } => DiagnosticKind::MissingPartial,
            Self::StructuralViolation { .. } => DiagnosticKind::StructuralViolation,
            Self::InclusionCycle { .. } => DiagnosticKind::InclusionCycle,
            _ => DiagnosticKind::Parse,
        }
    }

    /// Where the error should be reported: the outermost authored marker.
    pub fn location(&self) -> Option<&Location> {
        match self {
            Self::Parse { location, .. }
            | Self::MissingPartial { location, .. }
            | Self::StructuralViolation { location }
            | Self::InclusionCycle { location, .. }
            | Self::InPartial { location, .. } => Some(location),
            Self::Syntax { .. } | Self::Io { .. } => None,
        }
    }

    /// The user-facing message, without the location prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Parse { source, .. } => source.to_string(),
            Self::MissingPartial { location, path } => {
                format!("Wrong import path {path} in file {}.", location.file.display())
            }
            Self::StructuralViolation { .. } => {
                "Includes only works if they are the only content on the line".to_string()
            }
            Self::InclusionCycle { path, depth, .. } => {
                format!("Inclusion cycle through {} at depth {depth}", path.display())
            }
            Self::Syntax { .. } | Self::Io { .. } => self.to_string(),
            Self::InPartial { source, .. } => match source.location() {
                Some(inner) => format!("{} (at {inner})", source.innermost().message()),
                None => source.message(),
            },
        }
    }

    /// Convert into a diagnostic reported against `file`.
    pub fn to_diagnostic(&self, file: &std::path::Path) -> Diagnostic {
        let location = self
            .location()
            .cloned()
            .unwrap_or_else(|| Location::new(file, None));
        Diagnostic::error(self.kind(), self.message(), location)
    }
}

/// Errors loading configuration, versions and variables.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Unable to extract a version from file path {}", .path.display())]
    UnknownVersion { path: PathBuf },

    #[error("No supported versions configured")]
    NoVersions,
}
