//! Lint command.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use quire_static::StaticBuilder;

/// Run the lint command, failing when any error was found.
pub async fn run(config_path: &Path, paths: Vec<PathBuf>) -> Result<()> {
    let builder = StaticBuilder::new(super::load_build_config(config_path)?);

    let report = tokio::task::spawn_blocking(move || builder.lint(&paths))
        .await
        .context("Lint task panicked")??;

    for diagnostic in &report.diagnostics {
        println!("{}", diagnostic);
    }

    let errors = report.error_count();
    if errors > 0 {
        bail!("Found {} errors in {} files", errors, report.files);
    }

    tracing::info!("No problems found in {} files", report.files);
    Ok(())
}
