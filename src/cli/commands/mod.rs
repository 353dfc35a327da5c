//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod process;
mod tools;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{LoadOptions, Settings};

#[derive(Parser)]
#[command(name = "routeai")]
#[command(about = "Extract transport routes from permit documents")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides ~/.config/routeai/config.toml)
    #[arg(short, long, global = true, env = "ROUTEAI_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the route from a permit document and print it as JSON
    Process {
        /// Permit document (PDF)
        file: PathBuf,
        /// Minimum characters of text for a strategy to be accepted
        #[arg(short, long)]
        threshold: Option<usize>,
        /// Delete the file afterwards, whatever the outcome
        #[arg(long)]
        consume: bool,
    },

    /// Run only the text extraction cascade and print the text with its provenance
    Extract {
        /// Permit document (PDF)
        file: PathBuf,
        /// Minimum characters of text for a strategy to be accepted
        #[arg(short, long)]
        threshold: Option<usize>,
    },

    /// Check if the external extraction tools are installed
    Tools,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(&LoadOptions {
        config_path: cli.config,
        ignore_env: false,
    })?;

    match cli.command {
        Commands::Process {
            file,
            threshold,
            consume,
        } => {
            apply_threshold(&mut settings, threshold);
            process::cmd_process(&settings, &file, consume).await
        }
        Commands::Extract { file, threshold } => {
            apply_threshold(&mut settings, threshold);
            process::cmd_extract(&settings, &file).await
        }
        Commands::Tools => tools::cmd_tools(),
    }
}

fn apply_threshold(settings: &mut Settings, threshold: Option<usize>) {
    if let Some(n) = threshold {
        settings.extraction.quality_threshold = n;
    }
}
