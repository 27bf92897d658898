//! Quire CLI - template resolution for versioned documentation.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "quire")]
#[command(about = "Resolve partials, variables and snippets in versioned docs")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to quire.toml config file
    #[arg(short, long, default_value = "quire.toml")]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a starter project in the current directory
    Init {
        /// Overwrite existing files
        #[arg(short, long)]
        yes: bool,
    },

    /// Check pages for broken includes, variables and snippets
    Lint {
        /// Files or directories to lint (defaults to every version)
        paths: Vec<PathBuf>,
    },

    /// Resolve every page of every supported version
    Build {
        /// Output directory (defaults to config or "build")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print one resolved page
    Resolve {
        /// Page to resolve
        file: PathBuf,

        /// Print the document tree as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Execute command
    match cli.command {
        Commands::Init { yes } => {
            commands::init::run(yes).await?;
        }
        Commands::Lint { paths } => {
            commands::lint::run(&cli.config, paths).await?;
        }
        Commands::Build { output } => {
            commands::build::run(&cli.config, output).await?;
        }
        Commands::Resolve { file, json } => {
            commands::resolve::run(&cli.config, file, json).await?;
        }
    }

    Ok(())
}
