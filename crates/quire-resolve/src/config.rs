//! Project configuration (quire.toml).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Configuration file structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub content: ContentConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub snippets: SnippetConfig,
    #[serde(default)]
    pub includes: IncludeConfig,
    #[serde(default)]
    pub versions: Vec<VersionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    /// Directory holding one subdirectory per version
    #[serde(default = "default_content_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SnippetConfig {
    /// Code fence languages scanned for command snippets
    #[serde(default = "default_langs")]
    pub langs: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncludeConfig {
    /// Deepest allowed nesting of partials
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

/// One documented release.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct VersionConfig {
    pub name: String,
    #[serde(default)]
    pub branch: Option<String>,
    /// Served as the default version
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub deprecated: bool,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}
fn default_langs() -> Vec<String> {
    vec!["code".to_string(), "bash".to_string(), "var".to_string()]
}
fn default_max_depth() -> usize {
    32
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir: default_content_dir(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

impl Default for SnippetConfig {
    fn default() -> Self {
        Self {
            langs: default_langs(),
        }
    }
}

impl Default for IncludeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

impl Config {
    /// Load configuration from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content, path)?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load configuration from `path` if it exists, defaults otherwise.
    /// Returns an error if the file exists but is malformed.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }
        tracing::debug!("No config at {}, using defaults", path.display());
        Ok(Self::default())
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Versions that are not deprecated, in configuration order.
    pub fn supported_versions(&self) -> impl Iterator<Item = &VersionConfig> {
        self.versions.iter().filter(|v| !v.deprecated)
    }

    /// The version served by default: the `is_default` one, else the last supported.
    pub fn latest_version(&self) -> Option<&VersionConfig> {
        self.supported_versions()
            .find(|v| v.is_default)
            .or_else(|| self.supported_versions().last())
    }

    /// The edge version, whose pages live under `docs/`.
    pub fn current_version(&self) -> Option<&VersionConfig> {
        self.supported_versions().last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_config() {
        let toml = r#"
[content]
dir = "site/content"

[snippets]
langs = ["code", "shell"]

[[versions]]
name = "14.x"
branch = "branch/v14"
deprecated = true

[[versions]]
name = "16.x"
is_default = true

[[versions]]
name = "17.x"
"#;

        let config = Config::parse(toml, Path::new("quire.toml")).unwrap();

        assert_eq!(config.content.dir, PathBuf::from("site/content"));
        assert_eq!(config.output.dir, PathBuf::from("build"));
        assert_eq!(config.snippets.langs, vec!["code", "shell"]);
        assert_eq!(config.includes.max_depth, 32);
        assert_eq!(config.versions[0].branch.as_deref(), Some("branch/v14"));
        assert_eq!(config.latest_version().map(|v| v.name.as_str()), Some("16.x"));
        assert_eq!(config.current_version().map(|v| v.name.as_str()), Some("17.x"));
        assert_eq!(config.supported_versions().count(), 2);
    }

    #[test]
    fn defaults_when_empty() {
        let config = Config::parse("", Path::new("quire.toml")).unwrap();

        assert_eq!(config.snippets.langs, vec!["code", "bash", "var"]);
        assert_eq!(config.content.dir, PathBuf::from("content"));
        assert!(config.latest_version().is_none());
    }

    #[test]
    fn reports_malformed_config() {
        let result = Config::parse("[content\ndir = 1", Path::new("quire.toml"));

        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let config = Config::load_or_default(&dir.path().join("quire.toml")).unwrap();

        assert_eq!(config.includes.max_depth, 32);
    }
}
