//! Modpack Unpacker CLI
//!
//! Verifies CurseForge modpack archives and unpacks them into a mods directory.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Modpack Unpacker - download the mods of a CurseForge modpack export
#[derive(Parser)]
#[command(name = "modpack-unpacker")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Hide progress and log errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that an archive is a readable modpack
    Verify {
        /// Modpack .zip file
        archive: PathBuf,

        /// Print the full pack description
        #[arg(short, long)]
        details: bool,
    },

    /// Download every mod of a modpack
    Unpack(UnpackArgs),
}

#[derive(clap::Args)]
pub struct UnpackArgs {
    /// Modpack .zip file
    pub archive: PathBuf,

    /// Output directory
    pub output: PathBuf,

    /// Also extract the overrides folder; mods then go to <OUTPUT>/mods
    #[arg(long)]
    pub overrides: bool,

    /// Number of concurrent downloads
    #[arg(short, long, default_value_t = unpacker::downloader::config::DEFAULT_WORKERS)]
    pub workers: usize,

    /// Metadata request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Deadline for a single mod file download in seconds
    #[arg(long, default_value_t = 600)]
    pub download_timeout: u64,

    /// Retries for network errors and 5xx/429 responses
    #[arg(long, default_value_t = 2)]
    pub retries: usize,

    /// Skip mods marked as optional in the manifest
    #[arg(long)]
    pub skip_optional: bool,

    /// CurseForge API key; defaults to $CURSEFORGE_API_KEY (a .env file is read too)
    #[arg(long)]
    pub api_key: Option<String>,

    /// JSON file containing {"api_key": "..."}
    #[arg(long, conflicts_with = "api_key")]
    pub secrets: Option<PathBuf>,

    /// Override the CurseForge API base URL
    #[arg(long)]
    pub api_base: Option<String>,

    /// Override the file download base URL
    #[arg(long)]
    pub download_base: Option<String>,
}

fn init_tracing(verbose: u8, quiet: bool) {
    let default_level = match (quiet, verbose) {
        (true, _) => "error",
        // Event output already goes to stdout
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "unpacker={default_level},modpack_unpacker={default_level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let success = match cli.command {
        Commands::Verify { archive, details } => commands::verify(&archive, details).await?,
        Commands::Unpack(args) => commands::unpack(args, cli.quiet).await?,
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}
