//! Print a single resolved page.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quire_mdx::{DocumentCodec, MdxCodec};
use quire_static::StaticBuilder;

/// Run the resolve command.
pub async fn run(config_path: &Path, file: PathBuf, json: bool) -> Result<()> {
    let builder = StaticBuilder::new(super::load_build_config(config_path)?);

    let (root, warnings) = builder.resolve_page(&file)?;
    for warning in &warnings {
        tracing::warn!("{}", warning);
    }

    if json {
        let tree = serde_json::to_string_pretty(&root).context("Failed to serialize tree")?;
        println!("{}", tree);
    } else {
        print!("{}", MdxCodec::new().serialize(&root));
    }

    Ok(())
}
