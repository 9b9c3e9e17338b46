//! # Catalog and library models
//!
//! Two representations of a game cross the wire:
//!
//! | Struct | Source | Identified by |
//! |--------|--------|---------------|
//! | [`CatalogGame`] | the metadata provider (search, details, home feed) | provider id (`id`) |
//! | [`LibraryGame`] | the backend's copy, embedded in a [`LibraryEntry`] | local `_id`, plus `igdbGameId` |
//!
//! [`GameRef`] is the sum of both, used wherever either may appear (e.g. the
//! result list carried by a navigation context).
//!
//! A [`LibraryEntry`] is one user's record for one game. It is created from a
//! [`NewLibraryEntry`] (catalog data plus form fields) and edited with a
//! [`LibraryEntryPatch`]. Patch fields are wide integers so out-of-range user
//! input (negative hours) can be represented and rejected before dispatch.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::review::Review;

/// Play status of a library entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayStatus {
    #[default]
    #[serde(rename = "Want to Play")]
    WantToPlay,
    #[serde(rename = "Playing")]
    Playing,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "On Hold")]
    OnHold,
    #[serde(rename = "Dropped")]
    Dropped,
}

impl PlayStatus {
    pub const ALL: [PlayStatus; 5] = [
        PlayStatus::WantToPlay,
        PlayStatus::Playing,
        PlayStatus::Completed,
        PlayStatus::OnHold,
        PlayStatus::Dropped,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PlayStatus::WantToPlay => "Want to Play",
            PlayStatus::Playing => "Playing",
            PlayStatus::Completed => "Completed",
            PlayStatus::OnHold => "On Hold",
            PlayStatus::Dropped => "Dropped",
        }
    }
}

impl fmt::Display for PlayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// `{ name }` objects used by the provider for genres and platforms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cover {
    #[serde(default)]
    pub url: String,
}

/// A game record from the metadata provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogGame {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover: Option<Cover>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_release_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rating: Option<f64>,
    #[serde(default)]
    pub genres: Vec<Named>,
    #[serde(default)]
    pub platforms: Vec<Named>,
}

impl CatalogGame {
    pub fn cover_url(&self) -> Option<&str> {
        self.cover
            .as_ref()
            .map(|c| c.url.as_str())
            .filter(|url| !url.is_empty())
    }
}

/// Rebuild a provider-shaped record from a library copy, so a game seen in
/// someone else's library can be added to one's own.
impl From<&LibraryGame> for CatalogGame {
    fn from(game: &LibraryGame) -> Self {
        Self {
            id: game.igdb_game_id,
            name: game.title.clone(),
            cover: Some(Cover {
                url: game.cover_url.clone(),
            }),
            summary: Some(game.summary.clone()),
            first_release_date: None,
            total_rating: None,
            genres: game.genre.iter().map(|g| Named { name: g.clone() }).collect(),
            platforms: game
                .platform
                .iter()
                .map(|p| Named { name: p.clone() })
                .collect(),
        }
    }
}

/// The backend's copy of a game, embedded in library entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryGame {
    #[serde(rename = "_id", default)]
    pub id: String,
    pub igdb_game_id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub platform: Vec<String>,
    #[serde(default)]
    pub genre: Vec<String>,
}

/// The `gameId` field of a library entry: populated with the game, or a bare
/// reference when the server did not expand it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LinkedGame {
    Populated(LibraryGame),
    Reference(String),
}

impl LinkedGame {
    pub fn populated(&self) -> Option<&LibraryGame> {
        match self {
            LinkedGame::Populated(game) => Some(game),
            LinkedGame::Reference(_) => None,
        }
    }

    /// Provider id, when the game is populated.
    pub fn igdb_id(&self) -> Option<u64> {
        self.populated().map(|g| g.igdb_game_id)
    }
}

/// A user's record for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "gameId")]
    pub game: LinkedGame,
    #[serde(default)]
    pub status: PlayStatus,
    #[serde(default)]
    pub hours_played: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub owned: bool,
}

impl LibraryEntry {
    pub fn title(&self) -> &str {
        self.game.populated().map(|g| g.title.as_str()).unwrap_or("")
    }
}

/// Editable fields of a library entry, as submitted by the entry form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntryPatch {
    pub status: PlayStatus,
    pub hours_played: i64,
    pub notes: String,
    pub owned: bool,
}

impl Default for LibraryEntryPatch {
    fn default() -> Self {
        Self {
            status: PlayStatus::WantToPlay,
            hours_played: 0,
            notes: String::new(),
            owned: false,
        }
    }
}

/// Prefill the edit form from an existing entry.
impl From<&LibraryEntry> for LibraryEntryPatch {
    fn from(entry: &LibraryEntry) -> Self {
        Self {
            status: entry.status,
            hours_played: i64::from(entry.hours_played),
            notes: entry.notes.clone(),
            owned: entry.owned,
        }
    }
}

/// Body of `POST /games`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLibraryEntry {
    pub igdb_game_id: u64,
    pub title: String,
    pub cover_url: String,
    pub summary: String,
    pub platform: Vec<String>,
    pub genre: Vec<String>,
    #[serde(flatten)]
    pub fields: LibraryEntryPatch,
}

impl NewLibraryEntry {
    /// Build the create body for `game` with the submitted form `fields`.
    pub fn from_catalog(game: &CatalogGame, fields: LibraryEntryPatch) -> Self {
        Self {
            igdb_game_id: game.id,
            title: game.name.clone(),
            cover_url: game.cover_url().unwrap_or_default().to_string(),
            summary: game.summary.clone().unwrap_or_default(),
            platform: game.platforms.iter().map(|p| p.name.clone()).collect(),
            genre: game.genres.iter().map(|g| g.name.clone()).collect(),
            fields,
        }
    }
}

/// Either representation of a game.
#[derive(Debug, Clone, PartialEq)]
pub enum GameRef {
    Catalog(CatalogGame),
    Library(LibraryGame),
}

impl GameRef {
    /// The provider-assigned id, which both representations carry.
    pub fn provider_id(&self) -> u64 {
        match self {
            GameRef::Catalog(game) => game.id,
            GameRef::Library(game) => game.igdb_game_id,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            GameRef::Catalog(game) => &game.name,
            GameRef::Library(game) => &game.title,
        }
    }

    /// Local collection id, once the game is in a library.
    pub fn local_id(&self) -> Option<&str> {
        match self {
            GameRef::Catalog(_) => None,
            GameRef::Library(game) => Some(&game.id),
        }
    }
}

impl From<CatalogGame> for GameRef {
    fn from(game: CatalogGame) -> Self {
        GameRef::Catalog(game)
    }
}

impl From<LibraryGame> for GameRef {
    fn from(game: LibraryGame) -> Self {
        GameRef::Library(game)
    }
}

/// Body of `GET /games/details/:igdbId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDetails {
    #[serde(default)]
    pub igdb: Option<CatalogGame>,
    #[serde(default)]
    pub library_item: Option<LibraryEntry>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

/// Body of `GET /games/home`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HomeFeed {
    #[serde(default)]
    pub upcoming: Vec<CatalogGame>,
    #[serde(default)]
    pub trending: Vec<CatalogGame>,
    #[serde(default)]
    pub popular: Vec<CatalogGame>,
}
