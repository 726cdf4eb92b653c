//! LookOut CLI: the main entry point.
//!
//! Commands:
//! - `onboard`: Write a default config file
//! - `doctor`: Diagnose configuration
//! - `directions`: One-shot walking directions lookup
//! - `replay`: Stream a folder of frames through a local session

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "lookout",
    about = "LookOut — a camera-aware walking assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Onboard,

    /// Diagnose configuration and credentials
    Doctor,

    /// Look up walking directions
    Directions {
        /// Starting point, or "current location" together with --lat/--lng
        #[arg(long)]
        from: String,

        /// Destination address or place name
        #[arg(long)]
        to: String,

        /// Latitude to use for "current location"
        #[arg(long, requires = "lng", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// Longitude to use for "current location"
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lng: Option<f64>,
    },

    /// Replay a directory of image files as camera frames
    Replay {
        /// Directory containing .png/.jpg/.gif/.webp frames
        dir: PathBuf,

        /// Delay between frames
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
        Commands::Directions { from, to, lat, lng } => {
            commands::directions::run(from, to, lat.zip(lng)).await?
        }
        Commands::Replay { dir, interval_ms } => commands::replay::run(dir, interval_ms).await?,
    }

    Ok(())
}
