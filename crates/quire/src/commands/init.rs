//! Initialize a versioned docs project.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Run the init command.
pub async fn run(yes: bool) -> Result<()> {
    tracing::info!("Initializing quire...");

    let created = scaffold(Path::new("."), yes)?;
    if created.is_empty() {
        tracing::warn!("Project files already exist. Use --yes to overwrite.");
        return Ok(());
    }

    tracing::info!("Initialization complete!");
    tracing::info!("Run 'quire build' to resolve the documentation.");

    Ok(())
}

/// Starter files, relative to the project directory.
const STARTER_FILES: [(&str, &str); 4] = [
    ("quire.toml", DEFAULT_CONFIG),
    ("content/1.0/docs/config.json", DEFAULT_VARIABLES),
    ("content/1.0/docs/pages/index.mdx", DEFAULT_INDEX),
    ("content/1.0/docs/pages/includes/install.mdx", DEFAULT_PARTIAL),
];

/// Write the starter project under `dir`, returning the files written.
/// Existing files are kept unless `overwrite` is set.
fn scaffold(dir: &Path, overwrite: bool) -> Result<Vec<PathBuf>> {
    let mut created = Vec::new();

    for (relative, content) in STARTER_FILES {
        let path = dir.join(relative);
        if path.exists() && !overwrite {
            continue;
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, content).with_context(|| format!("Failed to write {}", relative))?;
        tracing::info!("Created {}", relative);
        created.push(path);
    }

    Ok(created)
}

const DEFAULT_CONFIG: &str = r#"# Quire Configuration

[content]
# One directory per version, pages under <dir>/<version>/docs/pages
dir = "content"

[output]
# Resolved pages are written to <dir>/<version>/
dir = "build"

[snippets]
# Code fence languages checked for command snippets
langs = ["code", "bash", "var"]

[includes]
# Deepest allowed nesting of partials
max_depth = 32

[[versions]]
name = "1.0"
is_default = true
"#;

const DEFAULT_VARIABLES: &str = r#"{
  "variables": {
    "product": {
      "name": "Example",
      "version": "1.0.0"
    }
  }
}
"#;

const DEFAULT_INDEX: &str = r#"---
title: Welcome
---

# Welcome to (=product.name=)

These pages document (=product.name=) (=product.version=).

(!docs/pages/includes/install.mdx edition="community"!)
"#;

const DEFAULT_PARTIAL: &str = r#"{{ edition="enterprise" }}
## Installation

Download the {{ edition }} edition:

```bash
$ curl -O https://example.com/downloads/(=product.version=)/{{ edition }}.tar.gz
$ tar -xzf {{ edition }}.tar.gz
```
"#;
