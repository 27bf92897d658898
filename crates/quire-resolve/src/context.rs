//! Per-document resolution context and the collaborators that build it.

use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Deserialize;

use crate::config::Config;
use crate::error::ConfigError;
use crate::variables::VariableTable;

static VERSIONED_DOCS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|/)versioned_docs/version-([^/]+)/").expect("Invalid versioned docs regex")
});

/// Everything a pass needs to know about the document being resolved.
///
/// Built explicitly for every document; nothing is looked up from ambient state.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    /// Path of the document being resolved
    pub doc_path: PathBuf,

    /// Directory inclusion paths are relative to
    pub root_dir: PathBuf,

    pub version: String,

    pub variables: Arc<VariableTable>,

    /// Code fence languages scanned for command snippets
    pub langs: Vec<String>,

    /// Deepest allowed nesting of partials
    pub max_depth: usize,
}

impl ResolutionContext {
    pub fn new(doc_path: impl Into<PathBuf>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            doc_path: doc_path.into(),
            root_dir: root_dir.into(),
            version: String::new(),
            variables: Arc::new(VariableTable::default()),
            langs: vec!["code".to_string(), "bash".to_string(), "var".to_string()],
            max_depth: 32,
        }
    }

    /// Context for a document whose version has been identified.
    pub fn for_document(
        doc_path: &Path,
        identity: DocumentIdentity,
        variables: Arc<VariableTable>,
    ) -> Self {
        Self {
            version: identity.version,
            variables,
            ..Self::new(doc_path, identity.root_dir)
        }
    }

    pub fn with_variables(mut self, variables: Arc<VariableTable>) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_langs<S: Into<String>>(mut self, langs: impl IntoIterator<Item = S>) -> Self {
        self.langs = langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Apply snippet and inclusion settings from the project config.
    pub fn with_config(self, config: &Config) -> Self {
        self.with_langs(config.snippets.langs.iter().cloned())
            .with_max_depth(config.includes.max_depth)
    }

    /// The same context, resolving a partial at `partial_path` instead.
    pub fn for_partial(&self, partial_path: &Path) -> Self {
        Self {
            doc_path: partial_path.to_path_buf(),
            ..self.clone()
        }
    }

    pub fn is_snippet_lang(&self, lang: &str) -> bool {
        self.langs.iter().any(|l| l == lang)
    }
}

/// Version and inclusion root of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIdentity {
    pub version: String,
    pub root_dir: PathBuf,
}

/// Works out which version a document belongs to.
pub trait VersionResolver: Send + Sync {
    fn identify(&self, doc_path: &Path) -> Result<DocumentIdentity, ConfigError>;
}

/// Directory conventions of a versioned content tree.
///
/// - `<content>/<version>/docs/...` belongs to `<version>`
/// - `versioned_docs/version-<version>/...` belongs to `<version>`
/// - `docs/...` belongs to the current version
#[derive(Debug, Clone)]
pub struct ContentLayout {
    content_dir: PathBuf,
    current_version: Option<String>,
}

impl ContentLayout {
    pub fn new(content_dir: impl Into<PathBuf>, current_version: Option<String>) -> Self {
        Self {
            content_dir: content_dir.into(),
            current_version,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.content.dir,
            config.current_version().map(|v| v.name.clone()),
        )
    }

    pub fn content_dir(&self) -> &Path {
        &self.content_dir
    }

    /// Root directory of one version, where partial paths start.
    pub fn version_root(&self, version: &str) -> PathBuf {
        self.content_dir.join(version)
    }

    /// Directory holding the pages of one version.
    pub fn pages_dir(&self, version: &str) -> PathBuf {
        self.version_root(version).join("docs").join("pages")
    }

    /// Find `<content>/<version>` anywhere in the path, for absolute paths.
    fn find_content_root(&self, doc_path: &Path) -> Option<DocumentIdentity> {
        let marker = self.content_dir.file_name()?;
        let components: Vec<Component<'_>> = doc_path.components().collect();

        let index = components
            .windows(3)
            .position(|w| w[0].as_os_str() == marker && w[2].as_os_str() == "docs")?;
        let version = components[index + 1].as_os_str().to_str()?.to_string();
        let root_dir: PathBuf = components[..index + 2].iter().collect();

        Some(DocumentIdentity { version, root_dir })
    }
}

impl VersionResolver for ContentLayout {
    fn identify(&self, doc_path: &Path) -> Result<DocumentIdentity, ConfigError> {
        if let Ok(rest) = doc_path.strip_prefix(&self.content_dir) {
            if let Some(Component::Normal(version)) = rest.components().next() {
                if let Some(version) = version.to_str() {
                    return Ok(DocumentIdentity {
                        version: version.to_string(),
                        root_dir: self.version_root(version),
                    });
                }
            }
        }

        if let Some(identity) = self.find_content_root(doc_path) {
            return Ok(identity);
        }

        let unknown = || ConfigError::UnknownVersion {
            path: doc_path.to_path_buf(),
        };
        let normalized = doc_path.to_string_lossy().replace('\\', "/");

        if let Some(caps) = VERSIONED_DOCS_REGEX.captures(&normalized) {
            let version = caps[1].to_string();
            return Ok(DocumentIdentity {
                root_dir: self.version_root(&version),
                version,
            });
        }

        if doc_path.starts_with("docs") {
            let version = self.current_version.clone().ok_or_else(unknown)?;
            return Ok(DocumentIdentity {
                root_dir: self.version_root(&version),
                version,
            });
        }

        Err(unknown())
    }
}

/// Loads the variable table of a version.
pub trait VariableSource: Send + Sync {
    fn load(&self, version: &str) -> Result<VariableTable, ConfigError>;
}

/// Per-version `config.json` file.
#[derive(Debug, Deserialize)]
struct VersionFile {
    #[serde(default)]
    variables: VariableTable,
}

/// Reads variables from `<content>/<version>/docs/config.json`.
#[derive(Debug, Clone)]
pub struct FsVariableSource {
    content_dir: PathBuf,
}

impl FsVariableSource {
    pub fn new(content_dir: impl Into<PathBuf>) -> Self {
        Self {
            content_dir: content_dir.into(),
        }
    }

    pub fn config_path(&self, version: &str) -> PathBuf {
        self.content_dir
            .join(version)
            .join("docs")
            .join("config.json")
    }
}

impl VariableSource for FsVariableSource {
    fn load(&self, version: &str) -> Result<VariableTable, ConfigError> {
        let path = self.config_path(version);
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let file: VersionFile = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        tracing::debug!("Loaded variables for version {} from {}", version, path.display());
        Ok(file.variables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn layout() -> ContentLayout {
        ContentLayout::new("content", Some("17.x".to_string()))
    }

    #[test]
    fn identifies_content_pages() {
        let identity = layout()
            .identify(Path::new("content/16.x/docs/pages/database-access/intro.mdx"))
            .unwrap();

        assert_eq!(
            identity,
            DocumentIdentity {
                version: "16.x".to_string(),
                root_dir: PathBuf::from("content/16.x"),
            }
        );
    }

    #[test]
    fn identifies_absolute_content_pages() {
        let identity = layout()
            .identify(Path::new("/repo/content/4.0/docs/pages/filename.mdx"))
            .unwrap();

        assert_eq!(identity.version, "4.0");
        assert_eq!(identity.root_dir, PathBuf::from("/repo/content/4.0"));
    }

    #[test]
    fn identifies_versioned_and_current_docs() {
        assert_eq!(
            layout()
                .identify(Path::new("versioned_docs/version-15.x/intro.mdx"))
                .unwrap()
                .version,
            "15.x"
        );
        let current = layout().identify(Path::new("docs/intro.mdx")).unwrap();
        assert_eq!(current.version, "17.x");
        assert_eq!(current.root_dir, PathBuf::from("content/17.x"));
    }

    #[test]
    fn rejects_unknown_paths() {
        assert!(matches!(
            layout().identify(Path::new("elsewhere/page.mdx")),
            Err(ConfigError::UnknownVersion { .. })
        ));
    }

    #[test]
    fn loads_variables_from_version_config() {
        let dir = tempfile::tempdir().unwrap();
        let docs = dir.path().join("4.0").join("docs");
        fs::create_dir_all(&docs).unwrap();
        fs::write(
            docs.join("config.json"),
            r#"{ "variables": { "teleport": { "version": "4.0.1" } }, "navigation": [] }"#,
        )
        .unwrap();

        let variables = FsVariableSource::new(dir.path()).load("4.0").unwrap();

        assert_eq!(variables.lookup("teleport.version").as_deref(), Some("4.0.1"));
    }

    #[test]
    fn missing_version_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        let result = FsVariableSource::new(dir.path()).load("4.0");

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn partial_context_keeps_settings() {
        let ctx = ResolutionContext::new("docs/pages/a.mdx", "content/1.0")
            .with_langs(["code"])
            .with_max_depth(4);

        let child = ctx.for_partial(Path::new("content/1.0/includes/b.mdx"));

        assert_eq!(child.doc_path, PathBuf::from("content/1.0/includes/b.mdx"));
        assert_eq!(child.root_dir, ctx.root_dir);
        assert_eq!(child.max_depth, 4);
        assert!(child.is_snippet_lang("code"));
        assert!(!child.is_snippet_lang("bash"));
    }
}
