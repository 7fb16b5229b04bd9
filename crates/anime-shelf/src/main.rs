//! anime-shelf - keep track of watched episodes and anime saved for later.
//!
//! Records the last-watched episode per anime and a personal list in durable
//! local storage. Titles and posters are looked up in the Jikan catalog unless
//! given on the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shared::{Config, LogConfig, PersistedStateStore};
use std::path::PathBuf;
use tracing::{info, warn};

mod commands;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging (also echoes logs to stderr)
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Record that an episode was watched
    Watch {
        anime_id: i64,

        #[arg(value_parser = clap::value_parser!(u32).range(1..))]
        episode: u32,

        /// Title to record instead of looking it up
        #[arg(long)]
        title: Option<String>,

        /// Poster URL to record
        #[arg(long)]
        image: Option<String>,
    },

    /// Show the watch history, most recent first
    History {
        #[arg(long)]
        json: bool,
    },

    /// Delete the whole watch history
    ClearHistory,

    /// Save an anime for later
    Add {
        anime_id: i64,

        /// Title to record instead of looking it up
        #[arg(long)]
        title: Option<String>,

        /// Poster URL to record
        #[arg(long)]
        image: Option<String>,
    },

    /// Remove an anime from the saved list
    Remove { anime_id: i64 },

    /// Check whether an anime is in the saved list
    Contains { anime_id: i64 },

    /// Show the saved list, most recently added first
    List {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Initialize logging
    let mut log_config = LogConfig::from_config(&config, "anime-shelf");
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
        log_config.console = true;
    }
    if let Err(e) = shared::logging::init(log_config.clone()) {
        // Unwritable log directory: keep going without the file layer
        shared::logging::init(LogConfig {
            file: false,
            ..log_config
        })?;
        warn!(error = %format!("{:#}", e), "File logging disabled");
    }

    info!(
        config_file = %args.config.display(),
        command = ?args.command,
        "anime-shelf starting"
    );

    let mut store = PersistedStateStore::new(commands::open_storage_or_memory(&config));

    let output = commands::run(args.command, &mut store, &config).await?;
    if !output.is_empty() {
        println!("{}", output);
    }

    Ok(())
}
