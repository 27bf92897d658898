//! CLI subcommands.

pub mod build;
pub mod init;
pub mod lint;
pub mod resolve;

use std::path::Path;

use anyhow::{Context, Result};
use quire_resolve::Config;
use quire_static::BuildConfig;

/// Load quire.toml, or defaults when it does not exist.
pub(crate) fn load_build_config(path: &Path) -> Result<BuildConfig> {
    let config = Config::load_or_default(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(BuildConfig::from_config(&config))
}
