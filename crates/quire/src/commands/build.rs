//! Corpus build command.

use std::path::{Path, PathBuf};

use anyhow::Result;
use quire_static::StaticBuilder;

/// Run the build command.
pub async fn run(config_path: &Path, output: Option<PathBuf>) -> Result<()> {
    tracing::info!("Building documentation...");

    let mut config = super::load_build_config(config_path)?;
    if let Some(output) = output {
        config.output_dir = output;
    }

    let result = StaticBuilder::new(config).build().await?;

    tracing::info!(
        "Resolved {} pages across {} versions in {}ms",
        result.pages,
        result.versions,
        result.duration_ms
    );
    if !result.warnings.is_empty() {
        tracing::warn!("{} warnings", result.warnings.len());
    }

    tracing::info!("Output: {}", result.output_dir.display());

    Ok(())
}
