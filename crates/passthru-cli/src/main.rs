//! ptsim - build and self-test PassThru simulations from shim logs

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use passthru_expr::PatternRegistry;

use crate::config::Config;
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "ptsim")]
#[command(author, version, about = "PassThru log extraction and simulation playback")]
#[command(propagate_version = true)]
struct Cli {
    /// Pattern registry YAML file
    #[arg(short, long, env = "PTSIM_REGISTRY")]
    registry: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, env = "PTSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum)]
    output: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract expressions from a shim log
    Extract {
        /// Shim log file
        log: PathBuf,

        /// Expressions file to write (defaults to the log path with .ptExp)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Re-import an expressions file
    Import {
        /// Expressions file
        file: PathBuf,
    },

    /// Build a simulation file from logs or expressions files
    Build {
        /// Shim logs or .ptExp files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Simulation file to write (defaults to the first input with .ptSim)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Replay a simulation against the mock device
    Selftest {
        /// Simulation file
        file: PathBuf,

        /// Playback preset name or protocol
        #[arg(long)]
        preset: Option<String>,

        /// Match requests without sending responses
        #[arg(long)]
        no_responses: bool,
    },

    /// List the built-in playback presets
    Presets,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    // Load config file
    let config = if let Some(config_path) = &cli.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    // Merge CLI args with config
    let merged = config.merge_with_args(
        cli.registry.as_deref(),
        cli.output.map(OutputFormat::as_str),
        cli.no_color,
    );

    // Create output context
    let ctx = OutputContext::new(
        OutputFormat::from_config(&merged.output),
        merged.no_color,
        cli.quiet,
    );

    // Execute command
    match &cli.command {
        Commands::Extract { log, out } => {
            let registry = load_registry(merged.registry.as_deref())?;
            commands::extract(registry, log, out.as_deref(), &ctx)?;
        }

        Commands::Import { file } => {
            let registry = load_registry(merged.registry.as_deref())?;
            commands::import(registry, file, &ctx)?;
        }

        Commands::Build { inputs, out } => {
            let registry = load_registry(merged.registry.as_deref())?;
            commands::build(registry, inputs, out.as_deref(), &ctx)?;
        }

        Commands::Selftest {
            file,
            preset,
            no_responses,
        } => {
            let preset = preset.as_deref().or(merged.preset.as_deref());
            commands::selftest(file, preset, *no_responses, &ctx).await?;
        }

        Commands::Presets => {
            commands::presets(&ctx)?;
        }
    }

    Ok(())
}

/// Load the pattern registry from a file, or use the bundled one
fn load_registry(path: Option<&Path>) -> Result<Arc<PatternRegistry>> {
    let registry = match path {
        Some(path) => PatternRegistry::from_file(path)
            .with_context(|| format!("Failed to load pattern registry: {}", path.display()))?,
        None => PatternRegistry::builtin().context("Failed to load bundled pattern registry")?,
    };
    Ok(Arc::new(registry))
}
