//! Affinity CLI - Headless Recommendation Engine Driver
//!
//! Features:
//! - Personalised recommendations with cold-start fallback
//! - Similar items and similar users
//! - Engine statistics
//! - Model refresh

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

/// Affinity CLI - Hybrid recommendation toolkit
#[derive(Parser)]
#[command(name = "affinity-cli")]
#[command(author = "Affinity Contributors")]
#[command(version)]
#[command(about = "Run the hybrid recommendation engine over a JSON dataset", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Output format (text, json, table)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Dataset file ({"items": [...], "interactions": [...]})
    #[arg(short, long)]
    data: PathBuf,

    /// Engine config file (JSON, partial allowed)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend items for a user
    Recommend {
        /// User id
        user: i64,

        /// Number of items
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// Keep items the user already interacted with
        #[arg(long)]
        include_seen: bool,
    },

    /// Find items similar to an item
    Similar {
        /// Item id
        item: i64,

        /// Number of items
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Find users with similar interactions
    Users {
        /// User id
        user: i64,

        /// Number of users
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show engine statistics
    Stats,

    /// Rebuild the model
    Refresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_writer(std::io::stderr)
        .init();

    affinity_core::init();
    let engine = commands::load_engine(&cli.data, cli.config.as_deref()).await?;

    match cli.command {
        Commands::Recommend { user, limit, include_seen } => {
            commands::recommend(&engine, user, limit, include_seen, &cli.format).await?;
        }
        Commands::Similar { item, limit } => {
            commands::similar(&engine, item, limit, &cli.format).await?;
        }
        Commands::Users { user, limit } => {
            commands::users(&engine, user, limit, &cli.format).await?;
        }
        Commands::Stats => {
            commands::stats(&engine, &cli.format).await?;
        }
        Commands::Refresh => {
            commands::refresh(&engine, &cli.format).await?;
        }
    }

    Ok(())
}
