//! Remap CLI
//!
//! Developer tool for scaffolding, validating and inspecting mapping projects.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// Remap - verified declarative record mappings
#[derive(Parser)]
#[command(name = "remap")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Project directory or remap.yaml path
    #[arg(short, long, default_value = "remap.yaml", env = "REMAP_CONFIG")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new Remap project
    Init {
        /// Directory to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,

        /// Project name (defaults to directory name)
        #[arg(short, long)]
        name: Option<String>,
    },

    /// Seal every mapping and report the ones that fail
    Validate,

    /// Print the sealed rules of one mapping
    Rules {
        /// Mapping name
        mapping: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Init { path, name } => {
            commands::init::run(&path, name.as_deref())?;
        }
        Commands::Validate => {
            commands::validate::run(&cli.config)?;
        }
        Commands::Rules { mapping, json } => {
            commands::rules::run(&cli.config, &mapping, json)?;
        }
    }

    Ok(())
}
