//! # marksync
//!
//! CLI tool for exercising a marksync server.
//!
//! ## Commands
//!
//! - `info`: Show server version, status and limits
//! - `create`: Create a new collection
//! - `get`, `version`, `last-updated`: Read a collection
//! - `update`: Replace a collection's payload
//!
//! ## Example
//!
//! ```bash
//! # Create a collection and remember its id
//! marksync create
//!
//! # Push encrypted data, guarded by the version we last saw
//! marksync update <ID> --file bookmarks.enc --expected-version 1
//!
//! # Poll cheaply, then fetch
//! marksync version <ID>
//! marksync get <ID>
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use sync_types::{CollectionId, Version};

mod client;
mod commands;

use client::SyncClient;
use commands::{create, get, info, update};

/// CLI tool for exercising a marksync server.
#[derive(Parser, Debug)]
#[command(name = "marksync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Base URL of the server
    #[arg(long, global = true, default_value = "http://127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show server information
    Info,

    /// Create a new, empty collection
    Create,

    /// Print a collection's payload
    Get {
        /// Collection id
        id: CollectionId,
    },

    /// Print a collection's current version
    Version {
        /// Collection id
        id: CollectionId,
    },

    /// Print when a collection was last written
    LastUpdated {
        /// Collection id
        id: CollectionId,
    },

    /// Replace a collection's payload
    Update {
        /// Collection id
        id: CollectionId,

        /// New payload (or use --file)
        data: Option<String>,

        /// Read the new payload from a file
        #[arg(long, short, conflicts_with = "data")]
        file: Option<PathBuf>,

        /// Only apply if the collection is still at this version
        #[arg(long)]
        expected_version: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = SyncClient::new(&cli.server);

    match cli.command {
        Commands::Info => info::run(&client).await?,
        Commands::Create => create::run(&client).await?,
        Commands::Get { id } => get::payload(&client, &id).await?,
        Commands::Version { id } => get::version(&client, &id).await?,
        Commands::LastUpdated { id } => get::last_updated(&client, &id).await?,
        Commands::Update {
            id,
            data,
            file,
            expected_version,
        } => {
            let data = if let Some(data) = data {
                data
            } else if let Some(path) = file {
                tokio::fs::read_to_string(&path)
                    .await
                    .context("Failed to read file")?
            } else {
                anyhow::bail!("Must specify data or --file");
            };
            update::run(&client, &id, data, expected_version.map(Version::new)).await?;
        }
    }

    Ok(())
}
