//! The three resolution passes run in order over one document.

use quire_mdx::{DocumentCodec, MdxCodec, Root};

use crate::context::ResolutionContext;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Location};
use crate::error::ResolveError;
use crate::includes::InclusionResolver;
use crate::loader::{FsLoader, PartialLoader};
use crate::{snippet, variables};

/// Whether a run reports problems or rewrites the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Report diagnostics, leave the tree unchanged
    Lint,
    /// Inline partials, substitute variables and expand snippets
    Resolve,
}

/// Result of running the pipeline over one document.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub root: Root,
    pub diagnostics: Vec<Diagnostic>,
}

/// Inclusion, variable and code-snippet passes over a codec and a partial loader.
pub struct Pipeline<C = MdxCodec, L = FsLoader> {
    codec: C,
    loader: L,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(MdxCodec::new(), FsLoader::new())
    }
}

impl<C: DocumentCodec, L: PartialLoader> Pipeline<C, L> {
    pub fn new(codec: C, loader: L) -> Self {
        Self { codec, loader }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    fn includes(&self) -> InclusionResolver<'_> {
        InclusionResolver::new(&self.codec, &self.loader)
    }

    /// Resolve a document in place.
    ///
    /// Partials are inlined first so their variables and snippets are
    /// processed too. Soft problems come back as warnings.
    pub fn resolve(
        &self,
        root: &mut Root,
        ctx: &ResolutionContext,
    ) -> Result<Vec<Diagnostic>, ResolveError> {
        let mut diagnostics = self.includes().resolve(root, ctx)?;
        diagnostics.extend(variables::resolve(root, &ctx.variables, &ctx.doc_path));
        diagnostics.extend(snippet::resolve(root, ctx));

        tracing::debug!(
            "Resolved {} ({} warnings)",
            ctx.doc_path.display(),
            diagnostics.len()
        );
        Ok(diagnostics)
    }

    /// Run every pass in lint mode. Never fails.
    pub fn lint(&self, root: &Root, ctx: &ResolutionContext) -> Vec<Diagnostic> {
        let mut diagnostics = self.includes().lint(root, ctx);
        diagnostics.extend(variables::lint(root, &ctx.variables, &ctx.doc_path));
        diagnostics.extend(snippet::lint(root, ctx));
        diagnostics
    }

    /// Parse a document's source.
    pub fn parse(&self, source: &str, ctx: &ResolutionContext) -> Result<Root, ResolveError> {
        self.codec
            .parse(source)
            .map_err(|source| ResolveError::Syntax {
                path: ctx.doc_path.clone(),
                source,
            })
    }

    /// Parse, resolve and serialize a document.
    pub fn resolve_source(
        &self,
        source: &str,
        ctx: &ResolutionContext,
    ) -> Result<(String, Vec<Diagnostic>), ResolveError> {
        let mut root = self.parse(source, ctx)?;
        let diagnostics = self.resolve(&mut root, ctx)?;
        Ok((self.codec.serialize(&root), diagnostics))
    }

    /// Parse and lint a document; a parse failure becomes a diagnostic.
    pub fn lint_source(&self, source: &str, ctx: &ResolutionContext) -> Vec<Diagnostic> {
        match self.parse(source, ctx) {
            Ok(root) => self.lint(&root, ctx),
            Err(error) => vec![Diagnostic::error(
                DiagnosticKind::Parse,
                error.to_string(),
                Location::new(&ctx.doc_path, None),
            )],
        }
    }

    /// Run the pipeline in `mode` over an owned tree.
    ///
    /// In resolve mode the returned tree is the resolved one; in lint mode it
    /// is the input, unchanged.
    pub fn run(
        &self,
        mode: Mode,
        mut root: Root,
        ctx: &ResolutionContext,
    ) -> Result<PassReport, ResolveError> {
        let diagnostics = match mode {
            Mode::Lint => self.lint(&root, ctx),
            Mode::Resolve => self.resolve(&mut root, ctx)?,
        };
        Ok(PassReport { root, diagnostics })
    }
}
