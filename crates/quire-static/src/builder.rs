//! Versioned corpus builder.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use walkdir::WalkDir;

use quire_mdx::{DocumentCodec, MdxCodec, Root};
use quire_resolve::{
    Config, ConfigError, ContentLayout, Diagnostic, FsLoader, FsVariableSource, Pipeline,
    ResolutionContext, ResolveError, VariableSource, VariableTable, VersionResolver,
};

use crate::assets::update_asset_paths;
use crate::manifest::{page_title, Manifest, ManifestPage};

/// Configuration for building a versioned corpus.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Directory holding one subdirectory per version
    pub content_dir: PathBuf,

    /// Output directory
    pub output_dir: PathBuf,

    /// Versions to build, oldest first
    pub versions: Vec<String>,

    /// Version served by default
    pub latest: Option<String>,

    /// Code fence languages scanned for command snippets
    pub langs: Vec<String>,

    /// Deepest allowed nesting of partials
    pub max_depth: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl BuildConfig {
    /// Build settings for the supported versions of a project.
    pub fn from_config(config: &Config) -> Self {
        Self {
            content_dir: config.content.dir.clone(),
            output_dir: config.output.dir.clone(),
            versions: config.supported_versions().map(|v| v.name.clone()).collect(),
            latest: config.latest_version().map(|v| v.name.clone()),
            langs: config.snippets.langs.clone(),
            max_depth: config.includes.max_depth,
        }
    }

    /// The version whose pages may live under a bare `docs/` directory.
    pub fn current_version(&self) -> Option<&str> {
        self.versions.last().map(String::as_str)
    }

    pub fn layout(&self) -> ContentLayout {
        ContentLayout::new(&self.content_dir, self.current_version().map(str::to_string))
    }
}

/// Result of a build operation.
#[derive(Debug)]
pub struct BuildResult {
    /// Number of pages written
    pub pages: usize,

    /// Number of versions built
    pub versions: usize,

    /// Soft diagnostics from every page
    pub warnings: Vec<Diagnostic>,

    /// Total build time in milliseconds
    pub duration_ms: u64,

    /// Output directory
    pub output_dir: PathBuf,
}

/// Errors that can occur during build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No supported versions configured")]
    NoVersions,

    #[error("Failed to read docs directory: {0}")]
    ReadError(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to resolve {}: {source}", .path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: ResolveError,
    },

    #[error("Failed to write output: {0}")]
    WriteError(String),
}

impl BuildError {
    /// The resolution error behind a failed page, if any.
    pub fn resolve_error(&self) -> Option<&ResolveError> {
        match self {
            Self::Resolve { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A page to be built.
#[derive(Debug, Clone)]
pub(crate) struct PageInfo {
    /// Version the page belongs to
    pub version: String,

    /// Source file path
    pub source_path: PathBuf,

    /// Relative path from the version's pages dir
    pub relative_path: PathBuf,

    /// Output path
    pub output_path: PathBuf,
}

/// A page after resolution.
struct BuiltPage {
    entry: ManifestPage,
    warnings: Vec<Diagnostic>,
}

/// Resolves every page of every configured version into the output directory.
pub struct StaticBuilder {
    config: BuildConfig,
    layout: ContentLayout,
    pipeline: Pipeline<MdxCodec, FsLoader>,
}

impl StaticBuilder {
    /// Create a new builder.
    pub fn new(config: BuildConfig) -> Self {
        Self {
            layout: config.layout(),
            config,
            pipeline: Pipeline::default(),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Build the corpus.
    pub async fn build(&self) -> Result<BuildResult, BuildError> {
        let start = Instant::now();

        if self.config.versions.is_empty() {
            return Err(BuildError::NoVersions);
        }

        fs::create_dir_all(&self.config.output_dir)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        let variables = self.load_variables(&self.config.versions)?;
        let pages = self.discover_pages()?;
        tracing::info!(
            "Resolving {} pages across {} versions",
            pages.len(),
            self.config.versions.len()
        );

        // Resolve and write pages in parallel
        let results: Vec<Result<BuiltPage, BuildError>> = pages
            .par_iter()
            .map(|page| self.build_page(page, &variables))
            .collect();

        let mut manifest = Manifest {
            latest: self.config.latest.clone(),
            versions: self.config.versions.clone(),
            ..Default::default()
        };
        for result in results {
            let page = result?;
            manifest.pages.push(page.entry);
            manifest.warnings.extend(page.warnings);
        }

        self.write_manifest(&manifest)?;

        let duration = start.elapsed();

        Ok(BuildResult {
            pages: manifest.pages.len(),
            versions: self.config.versions.len(),
            warnings: manifest.warnings,
            duration_ms: duration.as_millis() as u64,
            output_dir: self.config.output_dir.clone(),
        })
    }

    /// Load the variable table of each version once.
    pub(crate) fn load_variables<'a>(
        &self,
        versions: impl IntoIterator<Item = &'a String>,
    ) -> Result<HashMap<String, Arc<VariableTable>>, BuildError> {
        let source = FsVariableSource::new(&self.config.content_dir);
        let mut tables = HashMap::new();
        for version in versions {
            let table = source.load(version)?;
            tables.insert(version.clone(), Arc::new(table));
        }
        Ok(tables)
    }

    /// Discover all pages of the configured versions.
    fn discover_pages(&self) -> Result<Vec<PageInfo>, BuildError> {
        let mut pages = Vec::new();

        for version in &self.config.versions {
            let pages_dir = self.layout.pages_dir(version);
            if !pages_dir.exists() {
                return Err(BuildError::ReadError(format!(
                    "Pages directory not found: {}",
                    pages_dir.display()
                )));
            }

            for source_path in find_pages(&pages_dir) {
                let relative_path = source_path
                    .strip_prefix(&pages_dir)
                    .unwrap_or(&source_path)
                    .to_path_buf();
                let output_path = self.config.output_dir.join(version).join(&relative_path);

                pages.push(PageInfo {
                    version: version.clone(),
                    source_path,
                    relative_path,
                    output_path,
                });
            }
        }

        Ok(pages)
    }

    /// Resolve, relocate and write a single page.
    fn build_page(
        &self,
        page: &PageInfo,
        variables: &HashMap<String, Arc<VariableTable>>,
    ) -> Result<BuiltPage, BuildError> {
        let source = fs::read_to_string(&page.source_path)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", page.source_path.display(), e)))?;

        let ctx = self.context(&page.source_path, variables)?;
        let resolve_error = |source| BuildError::Resolve {
            path: page.source_path.clone(),
            source,
        };

        let mut root = self.pipeline.parse(&source, &ctx).map_err(resolve_error)?;
        let warnings = self.pipeline.resolve(&mut root, &ctx).map_err(resolve_error)?;
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        let updated = update_asset_paths(&mut root, &page.source_path, &page.output_path);
        if updated > 0 {
            tracing::debug!(
                "Updated {} asset paths in {}",
                updated,
                page.output_path.display()
            );
        }

        if let Some(parent) = page.output_path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::WriteError(e.to_string()))?;
        }
        fs::write(&page.output_path, self.pipeline.codec().serialize(&root))
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        Ok(BuiltPage {
            entry: ManifestPage {
                version: page.version.clone(),
                path: to_slash(&page.relative_path),
                source: to_slash(&page.source_path),
                title: page_title(&root, &page.relative_path),
            },
            warnings,
        })
    }

    /// Resolve one page in memory, leaving its references as written.
    pub fn resolve_page(&self, path: &Path) -> Result<(Root, Vec<Diagnostic>), BuildError> {
        let source = fs::read_to_string(path)
            .map_err(|e| BuildError::ReadError(format!("{}: {}", path.display(), e)))?;

        let identity = self.layout.identify(path)?;
        let variables = self.load_variables([&identity.version])?;
        let ctx = self.context(path, &variables)?;
        let resolve_error = |source| BuildError::Resolve {
            path: path.to_path_buf(),
            source,
        };

        let mut root = self.pipeline.parse(&source, &ctx).map_err(resolve_error)?;
        let warnings = self.pipeline.resolve(&mut root, &ctx).map_err(resolve_error)?;
        Ok((root, warnings))
    }

    /// Resolution context for a page of the content tree.
    pub(crate) fn context(
        &self,
        path: &Path,
        variables: &HashMap<String, Arc<VariableTable>>,
    ) -> Result<ResolutionContext, ConfigError> {
        let identity = self.layout.identify(path)?;
        let table = variables
            .get(&identity.version)
            .cloned()
            .unwrap_or_default();

        Ok(ResolutionContext::for_document(path, identity, table)
            .with_langs(self.config.langs.iter().cloned())
            .with_max_depth(self.config.max_depth))
    }

    pub(crate) fn pipeline(&self) -> &Pipeline<MdxCodec, FsLoader> {
        &self.pipeline
    }

    pub(crate) fn layout(&self) -> &ContentLayout {
        &self.layout
    }

    /// Write the build manifest.
    fn write_manifest(&self, manifest: &Manifest) -> Result<(), BuildError> {
        let json = manifest
            .to_json()
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        fs::write(self.config.output_dir.join("manifest.json"), json)
            .map_err(|e| BuildError::WriteError(e.to_string()))?;

        Ok(())
    }
}

/// Find `.md` and `.mdx` files under `dir`, in a stable order.
pub(crate) fn find_pages(dir: &Path) -> Vec<PathBuf> {
    let mut pages: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            ext == "mdx" || ext == "md"
        })
        .collect();
    pages.sort();
    pages
}

fn to_slash(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quire_resolve::DiagnosticKind;
    use tempfile::{tempdir, TempDir};

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn corpus() -> TempDir {
        let temp = tempdir().unwrap();
        let root = temp.path();
        for (version, release) in [("3.0", "3.0.7"), ("4.0", "4.0.1")] {
            write(
                root,
                &format!("content/{version}/docs/config.json"),
                &format!(r#"{{ "variables": {{ "teleport": {{ "version": "{release}" }} }} }}"#),
            );
            write(
                root,
                &format!("content/{version}/docs/pages/includes/install.mdx"),
                "Install Teleport (=teleport.version=).\n",
            );
            write(
                root,
                &format!("content/{version}/docs/pages/index.mdx"),
                "---\ntitle: Home\n---\n\n(!docs/pages/includes/install.mdx!)\n\n![Logo](./img/logo.png)\n",
            );
        }
        temp
    }

    fn config(temp: &TempDir) -> BuildConfig {
        BuildConfig {
            content_dir: temp.path().join("content"),
            output_dir: temp.path().join("build"),
            versions: vec!["3.0".to_string(), "4.0".to_string()],
            latest: Some("4.0".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn builds_every_version() {
        let temp = corpus();
        let out = temp.path().join("build");

        let result = StaticBuilder::new(config(&temp)).build().await.unwrap();

        assert_eq!(result.pages, 4);
        assert_eq!(result.versions, 2);
        assert!(result.warnings.is_empty());
        assert_eq!(
            fs::read_to_string(out.join("3.0/index.mdx")).unwrap(),
            "---\ntitle: Home\n---\n\nInstall Teleport 3.0.7.\n\n![Logo](../../content/3.0/docs/pages/img/logo.png)\n"
        );
        assert_eq!(
            fs::read_to_string(out.join("4.0/includes/install.mdx")).unwrap(),
            "Install Teleport 4.0.1.\n"
        );
    }

    #[tokio::test]
    async fn writes_manifest() {
        let temp = corpus();
        let out = temp.path().join("build");

        StaticBuilder::new(config(&temp)).build().await.unwrap();

        let manifest: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("manifest.json")).unwrap()).unwrap();
        assert_eq!(manifest["latest"], "4.0");
        let pages: Vec<(String, String, String)> = manifest["pages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| {
                (
                    p["version"].as_str().unwrap().to_string(),
                    p["path"].as_str().unwrap().to_string(),
                    p["title"].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(
            pages,
            vec![
                ("3.0".into(), "includes/install.mdx".into(), "install".into()),
                ("3.0".into(), "index.mdx".into(), "Home".into()),
                ("4.0".into(), "includes/install.mdx".into(), "install".into()),
                ("4.0".into(), "index.mdx".into(), "Home".into()),
            ]
        );
    }

    #[tokio::test]
    async fn collects_soft_warnings() {
        let temp = corpus();
        write(
            temp.path(),
            "content/4.0/docs/pages/vars.mdx",
            "Unknown (=teleport.edition=).\n",
        );

        let result = StaticBuilder::new(config(&temp)).build().await.unwrap();

        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, DiagnosticKind::UnresolvedVariable);
        assert!(!result.warnings[0].is_error());
    }

    #[tokio::test]
    async fn missing_partial_aborts_build() {
        let temp = corpus();
        write(
            temp.path(),
            "content/3.0/docs/pages/broken.mdx",
            "(!docs/pages/includes/missing.mdx!)\n",
        );

        let error = StaticBuilder::new(config(&temp)).build().await.unwrap_err();

        assert_eq!(
            error.resolve_error().map(ResolveError::kind),
            Some(DiagnosticKind::MissingPartial)
        );
        assert!(!temp.path().join("build/manifest.json").exists());
    }

    #[tokio::test]
    async fn requires_versions_and_variables() {
        let temp = corpus();

        let none = StaticBuilder::new(BuildConfig {
            versions: Vec::new(),
            ..config(&temp)
        })
        .build()
        .await;
        let unknown = StaticBuilder::new(BuildConfig {
            versions: vec!["9.0".to_string()],
            ..config(&temp)
        })
        .build()
        .await;

        assert!(matches!(none, Err(BuildError::NoVersions)));
        assert!(matches!(unknown, Err(BuildError::Config(ConfigError::Read { .. }))));
    }

    #[test]
    fn resolves_single_page_without_relocating() {
        let temp = corpus();
        let page = temp.path().join("content/3.0/docs/pages/index.mdx");
        let builder = StaticBuilder::new(config(&temp));

        let (root, warnings) = builder.resolve_page(&page).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(
            builder.pipeline().codec().serialize(&root),
            "---\ntitle: Home\n---\n\nInstall Teleport 3.0.7.\n\n![Logo](./img/logo.png)\n"
        );
        assert!(!temp.path().join("build").exists());
    }

    #[test]
    fn config_follows_supported_versions() {
        let config = Config::parse(
            "[[versions]]\nname = \"2.0\"\ndeprecated = true\n\n[[versions]]\nname = \"3.0\"\nis_default = true\n\n[[versions]]\nname = \"4.0\"\n",
            Path::new("quire.toml"),
        )
        .unwrap();

        let build = BuildConfig::from_config(&config);

        assert_eq!(build.versions, vec!["3.0", "4.0"]);
        assert_eq!(build.latest.as_deref(), Some("3.0"));
        assert_eq!(build.current_version(), Some("4.0"));
    }
}
