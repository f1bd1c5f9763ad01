//! `ytqf favorites` subcommands.

use anyhow::bail;
use clap::Parser;
use clap::Subcommand;
use ytqf_core::FavoriteCollection;
use ytqf_core::FavoritesStore;
use ytqf_core::RelayConfig;

#[derive(Debug, Parser)]
pub struct FavoritesCli {
    #[command(subcommand)]
    pub command: FavoritesSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum FavoritesSubcommand {
    /// List favorites in order.
    List {
        /// Output as JSON.
        #[arg(long = "json", short = 'j')]
        json: bool,
    },
    /// Add a favorite, or update one with the same ID.
    Add {
        /// Playlist URL or ID.
        input: String,
        /// Display title. Defaults to the ID.
        #[arg(long = "title", short = 't')]
        title: Option<String>,
        /// Make this the pinned favorite.
        #[arg(long = "pin")]
        pin: bool,
    },
    /// Pin a favorite, unpinning every other one.
    Pin { id: String },
    /// Move the favorite at POSITION (1-based) by DELTA places.
    Move {
        position: usize,
        #[arg(allow_negative_numbers = true)]
        delta: isize,
    },
    /// Rename a favorite. An empty title resets it to the ID.
    Rename { id: String, title: String },
    /// Remove a favorite.
    Remove { id: String },
}

impl FavoritesCli {
    pub fn run(&self, config: &RelayConfig) -> anyhow::Result<()> {
        let store = FavoritesStore::open(config.favorites_file.clone())?;
        match &self.command {
            FavoritesSubcommand::List { json } => list(&store, *json),
            FavoritesSubcommand::Add { input, title, pin } => {
                let favorite = store.upsert(input, title.as_deref(), *pin)?;
                tracing::debug!(id = %favorite.id, "favorite saved");
                println!("Playlist saved.");
                Ok(())
            }
            FavoritesSubcommand::Pin { id } => {
                if !store.set_pinned(id)? {
                    bail!("No favorite playlist with ID {id}.");
                }
                println!("Pinned playlist updated.");
                Ok(())
            }
            FavoritesSubcommand::Move { position, delta } => {
                let Some(index) = position.checked_sub(1) else {
                    bail!("Positions start at 1.");
                };
                if !store.move_entry(index, *delta)? {
                    bail!("Cannot move position {position} by {delta}.");
                }
                println!("Playlist order updated.");
                Ok(())
            }
            FavoritesSubcommand::Rename { id, title } => {
                if !store.rename(id, title)? {
                    bail!("No favorite playlist with ID {id}.");
                }
                println!("Playlist label updated.");
                Ok(())
            }
            FavoritesSubcommand::Remove { id } => {
                if !store.remove(id)? {
                    bail!("No favorite playlist with ID {id}.");
                }
                println!("Playlist removed.");
                Ok(())
            }
        }
    }
}

fn list(store: &FavoritesStore, json: bool) -> anyhow::Result<()> {
    let favorites = store.list()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&favorites)?);
        return Ok(());
    }
    if favorites.is_empty() {
        println!("No favorites yet.");
        return Ok(());
    }
    for (index, favorite) in favorites.iter().enumerate() {
        println!("{}", format_row(index + 1, favorite));
    }
    Ok(())
}

fn format_row(position: usize, favorite: &FavoriteCollection) -> String {
    let marker = if favorite.pinned { "★" } else { " " };
    format!("{position:>2}. {marker} {}  {}", favorite.title, favorite.id)
}
