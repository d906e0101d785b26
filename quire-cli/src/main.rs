//! # quire CLI
//!
//! Command-line interface for the quire article pipeline.

mod commands;

use clap::{Parser, Subcommand};
use quire_core::BuildMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, global = true, default_value = "quire.yml")]
    config: PathBuf,

    /// Build mode (publish or development), overriding the config file
    #[arg(long, global = true, env = "QUIRE_MODE")]
    mode: Option<BuildMode>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the artifact set (default)
    Build,

    /// Run the pipeline without writing artifacts and report failures
    Check {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command.unwrap_or(Commands::Build) {
        Commands::Build => commands::build_site(&cli.config, cli.mode),
        Commands::Check { json } => commands::check_site(&cli.config, cli.mode, json),
    }
}
