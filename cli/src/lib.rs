//! Command-line front end for the relay.
//!
//! ## Commands
//!
//! - `ytqf add <ITEM_ID> [COLLECTION]`
//! - `ytqf remove <ITEM_ID> [COLLECTION]`
//! - `ytqf favorites list|add|pin|move|rename|remove`

pub mod favorites_cmd;
pub mod mutate_cmd;

use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use ytqf_core::ConfigLoadError;
use ytqf_core::ConfigLoader;
use ytqf_core::RelayConfig;
use ytqf_protocol::Operation;

use crate::favorites_cmd::FavoritesCli;
use crate::mutate_cmd::MutateArgs;

/// Add or remove an item from a favorite collection through the relay.
#[derive(Debug, Parser)]
#[command(name = "ytqf", version)]
pub struct Cli {
    /// Read configuration from this file instead of `$YTQF_HOME/config.toml`.
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(long = "verbose", short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add an item to a collection.
    Add(MutateArgs),
    /// Remove an item from a collection.
    Remove(MutateArgs),
    /// Manage favorite collections.
    Favorites(FavoritesCli),
}

impl Cli {
    pub fn load_config(&self) -> Result<RelayConfig, ConfigLoadError> {
        let mut loader = ConfigLoader::new();
        if let Some(path) = &self.config {
            loader = loader.with_config_file(path.clone());
        }
        loader.load()
    }

    pub async fn run(self) -> anyhow::Result<()> {
        let config = self.load_config()?;
        tracing::debug!(?config, "configuration loaded");
        match self.command {
            Command::Add(args) => mutate_cmd::run(Operation::Add, &args, &config).await,
            Command::Remove(args) => mutate_cmd::run(Operation::Remove, &args, &config).await,
            Command::Favorites(cli) => cli.run(&config),
        }
    }
}
