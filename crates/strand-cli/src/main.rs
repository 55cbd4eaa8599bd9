//! Strand CLI - Headless Playback Client
//!
//! Features:
//! - Stream playability probing
//! - Simulated playback sessions with transport control
//! - Built-in DASH test stream catalog

use clap::{Parser, Subcommand};

mod commands;

/// Strand CLI - playback readiness toolkit
#[derive(Parser)]
#[command(name = "strand-cli")]
#[command(version)]
#[command(about = "Probe and play manifest-described media streams", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe a source for playability
    Probe {
        /// URL of the manifest (defaults to the first built-in test stream)
        source: Option<String>,

        /// Output the resolution report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Play a source in a simulated session
    Play {
        /// URL of the manifest (defaults to the first built-in test stream)
        source: Option<String>,

        /// Simulated content duration in seconds
        #[arg(short, long, default_value = "30")]
        duration: f64,

        /// Play once more from the start after the natural end
        #[arg(long)]
        replay: bool,
    },

    /// List the built-in test streams
    Streams,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .init();

    match cli.command {
        Commands::Probe { source, json } => {
            let source = source.unwrap_or_else(|| commands::TEST_STREAMS[0].to_string());
            commands::probe(&source, json).await?;
        }
        Commands::Play { source, duration, replay } => {
            let source = source.unwrap_or_else(|| commands::TEST_STREAMS[0].to_string());
            commands::play(&source, duration, replay).await?;
        }
        Commands::Streams => {
            commands::streams();
        }
    }

    Ok(())
}
