//! # Clarion
//!
//! Command-line front end for the Clarion sound library: load named sounds,
//! play them, mute them, and crossfade between music tracks.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use commands::Session;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clarion=info,clarion_audio=info".into()),
        )
        .init();

    let cli = Cli::parse();
    info!("Starting Clarion v{}", env!("CARGO_PKG_VERSION"));

    if matches!(cli.command, Commands::Devices) {
        return commands::devices();
    }

    let session = Session::open(&cli)?;
    let result = match cli.command {
        Commands::Devices => Ok(()),
        Commands::Load { ids, group } => commands::load(&session, ids, group).await,
        Commands::Play {
            ids,
            volume,
            looping,
            seconds,
        } => commands::play(&session, ids, volume, looping, seconds).await,
        Commands::Crossfade { from, to, duration } => {
            commands::crossfade(&session, &from, &to, duration).await
        }
        Commands::Demo => commands::demo(&session).await,
    };
    session.report_events();
    result
}
