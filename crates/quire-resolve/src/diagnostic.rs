//! Diagnostics reported by the resolution passes.

use std::fmt;
use std::path::{Path, PathBuf};

use quire_mdx::Position;
use serde::Serialize;

/// What kind of problem a diagnostic describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// Malformed marker, parameter list or defaults block
    Parse,
    /// Inclusion target does not exist
    MissingPartial,
    /// Inclusion marker shares its line with other content
    StructuralViolation,
    InclusionCycle,
    UnresolvedVariable,
    /// `{{name}}` placeholder with no bound value
    UnboundParameter,
    /// Unterminated heredoc or multi-line command
    MalformedDirective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A file and an optional position within it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub position: Option<Position>,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, position: Option<Position>) -> Self {
        Self {
            file: file.into(),
            position,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "{}:{}", self.file.display(), position),
            None => write!(f, "{}", self.file.display()),
        }
    }
}

/// A problem found in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub file: PathBuf,
    pub position: Option<Position>,
    pub severity: Severity,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, message: impl Into<String>, location: Location) -> Self {
        Self::new(kind, Severity::Error, message, location)
    }

    pub fn warning(kind: DiagnosticKind, message: impl Into<String>, location: Location) -> Self {
        Self::new(kind, Severity::Warning, message, location)
    }

    fn new(
        kind: DiagnosticKind,
        severity: Severity,
        message: impl Into<String>,
        location: Location,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            file: location.file,
            position: location.position,
            severity,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn location(&self) -> Location {
        Location::new(&self.file, self.position)
    }

    /// Whether the diagnostic was raised for `file`.
    pub fn is_for(&self, file: &Path) -> bool {
        self.file == file
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location(), self.message)
    }
}

/// Count error-severity diagnostics.
pub fn error_count(diagnostics: &[Diagnostic]) -> usize {
    diagnostics.iter().filter(|d| d.is_error()).count()
}
