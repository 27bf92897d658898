//! Corpus-wide lint.

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;

use quire_resolve::{
    error_count, Diagnostic, DiagnosticKind, Location, VariableTable, VersionResolver,
};

use crate::builder::{find_pages, BuildError, StaticBuilder};

/// Diagnostics from linting a set of pages.
#[derive(Debug, Default)]
pub struct LintReport {
    /// Number of files linted
    pub files: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl LintReport {
    pub fn error_count(&self) -> usize {
        error_count(&self.diagnostics)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

impl StaticBuilder {
    /// Lint pages without writing anything.
    ///
    /// `paths` may name files or directories; when empty, every page of
    /// every configured version is linted. Problems in one page never stop
    /// its siblings from being checked.
    pub fn lint(&self, paths: &[PathBuf]) -> Result<LintReport, BuildError> {
        let files = self.lint_targets(paths)?;

        let versions: BTreeSet<String> = files
            .iter()
            .filter_map(|file| self.layout().identify(file).ok())
            .map(|identity| identity.version)
            .collect();

        let mut variables = HashMap::new();
        let mut unloadable = HashMap::new();
        for version in &versions {
            match self.load_variables([version]) {
                Ok(tables) => variables.extend(tables),
                Err(e) => {
                    tracing::warn!("Cannot lint version {}: {}", version, e);
                    unloadable.insert(version.clone(), e.to_string());
                }
            }
        }

        let diagnostics: Vec<Vec<Diagnostic>> = files
            .par_iter()
            .map(|file| self.lint_file(file, &variables, &unloadable))
            .collect();

        let report = LintReport {
            files: files.len(),
            diagnostics: diagnostics.into_iter().flatten().collect(),
        };
        tracing::info!(
            "Linted {} files: {} errors, {} warnings",
            report.files,
            report.error_count(),
            report.diagnostics.len() - report.error_count()
        );
        Ok(report)
    }

    /// Lint one page. Anything that keeps it from being linted is reported
    /// against the page itself.
    fn lint_file(
        &self,
        file: &Path,
        variables: &HashMap<String, Arc<VariableTable>>,
        unloadable: &HashMap<String, String>,
    ) -> Vec<Diagnostic> {
        let failure = |message: String| {
            vec![Diagnostic::error(
                DiagnosticKind::Parse,
                message,
                Location::new(file, None),
            )]
        };

        let ctx = match self.context(file, variables) {
            Ok(ctx) => ctx,
            Err(e) => return failure(e.to_string()),
        };
        if let Some(message) = unloadable.get(&ctx.version) {
            return failure(message.clone());
        }

        match fs::read_to_string(file) {
            Ok(source) => self.pipeline().lint_source(&source, &ctx),
            Err(e) => failure(format!("Failed to read {}: {}", file.display(), e)),
        }
    }

    fn lint_targets(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, BuildError> {
        if paths.is_empty() {
            return Ok(self
                .config()
                .versions
                .iter()
                .map(|version| self.layout().pages_dir(version))
                .filter(|dir| dir.exists())
                .flat_map(|dir| find_pages(&dir))
                .collect());
        }

        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                files.extend(find_pages(path));
            } else if path.is_file() {
                files.push(path.clone());
            } else {
                return Err(BuildError::ReadError(format!(
                    "No such file or directory: {}",
                    path.display()
                )));
            }
        }
        Ok(files)
    }
}
