//! dae-export - COLLADA character export tool
//!
//! Converts a rigged COLLADA (.dae) character into runtime mesh (.obj/.mtl),
//! skeleton (.skl), and animation (.anm) files.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use dae_export::{convert, manifest};

#[derive(Parser)]
#[command(name = "dae-export")]
#[command(about = "COLLADA character export tool")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single .dae character
    Convert {
        /// Input COLLADA document
        #[arg(default_value = "Walking.dae")]
        input: PathBuf,

        /// Output basename (defaults to the input file stem)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Build characters from a manifest file
    Build {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,

        /// Output directory (overrides manifest)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Validate manifest without building
    Check {
        /// Path to assets.toml manifest
        #[arg(default_value = "assets.toml")]
        manifest: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert { input, output } => {
            let output = output.unwrap_or_else(|| input.with_extension(""));
            tracing::info!("Converting {:?} -> {:?}", input, output);
            convert::convert_dae(&input, &output)?;
            tracing::info!("Done!");
        }

        Commands::Build {
            manifest,
            output,
            verbose,
        } => {
            if verbose {
                tracing::info!("Building characters from {:?}", manifest);
            }
            let config = manifest::load_manifest(&manifest)?;
            manifest::build_all(&config, output.as_deref())?;
            tracing::info!("Build complete!");
        }

        Commands::Check { manifest } => {
            tracing::info!("Checking manifest {:?}", manifest);
            let config = manifest::load_manifest(&manifest)?;
            manifest::validate(&config)?;
            tracing::info!("Manifest is valid!");
        }
    }

    Ok(())
}
