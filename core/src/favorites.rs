//! Persisted list of favorite collections.
//!
//! Storage location: `<relay home>/favorites.json`, shaped as
//! `{ "favoritePlaylists": [{ "id", "title", "pinned" }, ...] }`.

use std::fs;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex_lite::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use url::Url;

use crate::value::is_truthy;

const STORAGE_KEY: &str = "favoritePlaylists";

#[derive(Debug, Error)]
pub enum FavoritesError {
    #[error("Please enter a playlist URL or ID.")]
    EmptyInput,

    #[error("That does not look like a valid YouTube playlist ID.")]
    InvalidId,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteCollection {
    pub id: String,
    pub title: String,
    pub pinned: bool,
}

/// Keeps entries with a string `id`; a missing or empty title becomes the
/// id and `pinned` follows truthiness.
pub fn normalize(value: &Value) -> Vec<FavoriteCollection> {
    let Some(items) = value.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id")?.as_str()?.to_string();
            let title = item
                .get("title")
                .filter(|title| is_truthy(title))
                .and_then(Value::as_str)
                .map_or_else(|| id.clone(), str::to_string);
            let pinned = item.get("pinned").is_some_and(is_truthy);
            Some(FavoriteCollection { id, title, pinned })
        })
        .collect()
}

/// Extracts a collection id from a bare id or a URL with a `list` query
/// parameter.
pub fn parse_collection_id(input: &str) -> Result<String, FavoritesError> {
    let normalized = input.trim();
    if normalized.is_empty() {
        return Err(FavoritesError::EmptyInput);
    }

    if let Ok(url) = Url::parse(normalized)
        && let Some((_, list)) = url
            .query_pairs()
            .find(|(key, value)| key == "list" && !value.is_empty())
    {
        return validate_collection_id(&list);
    }
    validate_collection_id(normalized)
}

fn validate_collection_id(id: &str) -> Result<String, FavoritesError> {
    static ID_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let candidate = id.trim();
    let valid = ID_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{10,}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(candidate));
    if valid {
        Ok(candidate.to_string())
    } else {
        Err(FavoritesError::InvalidId)
    }
}

/// The pinned favorite, or the first one when none is pinned.
pub fn default_target(favorites: &[FavoriteCollection]) -> Option<&FavoriteCollection> {
    favorites
        .iter()
        .find(|favorite| favorite.pinned)
        .or_else(|| favorites.first())
}

#[derive(Debug, Serialize)]
struct StoreFile<'a> {
    #[serde(rename = "favoritePlaylists")]
    favorites: &'a [FavoriteCollection],
}

/// File-backed favorites with change notification.
///
/// Every mutation rewrites the file and publishes the new list to
/// [`FavoritesStore::subscribe`] receivers.
pub struct FavoritesStore {
    file_path: PathBuf,
    changes: watch::Sender<Vec<FavoriteCollection>>,
}

impl FavoritesStore {
    /// Opens the store at `path`, loading the current list. A missing file
    /// is an empty list.
    pub fn open(path: PathBuf) -> Result<Self, FavoritesError> {
        let initial = read_list(&path)?;
        let (changes, _) = watch::channel(initial);
        Ok(Self {
            file_path: path,
            changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Receiver that observes the list after every persisted change.
    pub fn subscribe(&self) -> watch::Receiver<Vec<FavoriteCollection>> {
        self.changes.subscribe()
    }

    pub fn list(&self) -> Result<Vec<FavoriteCollection>, FavoritesError> {
        read_list(&self.file_path)
    }

    /// Adds `input` or updates the existing entry with the same id.
    ///
    /// An existing entry keeps its title unless a non-empty one is given,
    /// and stays pinned once pinned. Pinning makes it the only pinned entry.
    pub fn upsert(
        &self,
        input: &str,
        title: Option<&str>,
        pin: bool,
    ) -> Result<FavoriteCollection, FavoritesError> {
        let id = parse_collection_id(input)?;
        let title = title.map(str::trim).filter(|title| !title.is_empty());

        let mut favorites = self.list()?;
        match favorites.iter_mut().find(|favorite| favorite.id == id) {
            Some(existing) => {
                if let Some(title) = title {
                    existing.title = title.to_string();
                } else if existing.title.is_empty() {
                    existing.title = id.clone();
                }
                existing.pinned = pin || existing.pinned;
            }
            None => favorites.push(FavoriteCollection {
                id: id.clone(),
                title: title.map_or_else(|| id.clone(), str::to_string),
                pinned: pin,
            }),
        }
        if pin {
            pin_only(&mut favorites, &id);
        }

        self.persist(favorites.clone())?;
        favorites
            .into_iter()
            .find(|favorite| favorite.id == id)
            .ok_or(FavoritesError::InvalidId)
    }

    /// Pins `id` and unpins every other entry. Returns `false`, leaving the
    /// list untouched, when `id` is not a favorite.
    pub fn set_pinned(&self, id: &str) -> Result<bool, FavoritesError> {
        let mut favorites = self.list()?;
        if !favorites.iter().any(|favorite| favorite.id == id) {
            return Ok(false);
        }
        pin_only(&mut favorites, id);
        self.persist(favorites)?;
        Ok(true)
    }

    /// Moves the entry at `index` by `delta` places. Returns `false`, leaving
    /// the list untouched, when either position is out of range.
    pub fn move_entry(&self, index: usize, delta: isize) -> Result<bool, FavoritesError> {
        let mut favorites = self.list()?;
        let Some(target) = index.checked_add_signed(delta) else {
            return Ok(false);
        };
        if index >= favorites.len() || target >= favorites.len() {
            return Ok(false);
        }
        let entry = favorites.remove(index);
        favorites.insert(target, entry);
        self.persist(favorites)?;
        Ok(true)
    }

    /// Renames `id`; an empty title resets it to the id.
    pub fn rename(&self, id: &str, title: &str) -> Result<bool, FavoritesError> {
        let mut favorites = self.list()?;
        let Some(entry) = favorites.iter_mut().find(|favorite| favorite.id == id) else {
            return Ok(false);
        };
        let title = title.trim();
        entry.title = if title.is_empty() {
            entry.id.clone()
        } else {
            title.to_string()
        };
        self.persist(favorites)?;
        Ok(true)
    }

    pub fn remove(&self, id: &str) -> Result<bool, FavoritesError> {
        let mut favorites = self.list()?;
        let before = favorites.len();
        favorites.retain(|favorite| favorite.id != id);
        if favorites.len() == before {
            return Ok(false);
        }
        self.persist(favorites)?;
        Ok(true)
    }

    fn persist(&self, favorites: Vec<FavoriteCollection>) -> Result<(), FavoritesError> {
        write_list(&self.file_path, &favorites)?;
        tracing::debug!(path = %self.file_path.display(), count = favorites.len(), "favorites saved");
        self.changes.send_replace(favorites);
        Ok(())
    }
}

fn pin_only(favorites: &mut [FavoriteCollection], id: &str) {
    for favorite in favorites {
        favorite.pinned = favorite.id == id;
    }
}

fn read_list(path: &Path) -> Result<Vec<FavoriteCollection>, FavoritesError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    Ok(value.get(STORAGE_KEY).map(normalize).unwrap_or_default())
}

fn write_list(path: &Path, favorites: &[FavoriteCollection]) -> Result<(), FavoritesError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(&StoreFile { favorites })?;
    fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}
