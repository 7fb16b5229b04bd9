//! Data models for the persisted per-user state.
//!
//! Field names serialize as camelCase so the stored JSON matches the
//! `watchHistory` / `myList` record layout.

use serde::{Deserialize, Serialize};

/// Storage key of the watch history record
pub const WATCH_HISTORY_KEY: &str = "watchHistory";

/// Storage key of the saved list record
pub const MY_LIST_KEY: &str = "myList";

/// Last-viewed episode of one anime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchHistoryEntry {
    pub anime_id: i64,
    pub anime_title: String,
    pub anime_image: String,
    pub episode: u32,
    pub timestamp: i64, // Milliseconds since epoch, set at write time
}

/// Watch event as reported by a caller (timestamp is stamped by the store)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWatchHistory {
    pub anime_id: i64,
    pub anime_title: String,
    pub anime_image: String,
    pub episode: u32,
}

impl NewWatchHistory {
    pub(crate) fn stamp(self, timestamp: i64) -> WatchHistoryEntry {
        WatchHistoryEntry {
            anime_id: self.anime_id,
            anime_title: self.anime_title,
            anime_image: self.anime_image,
            episode: self.episode,
            timestamp,
        }
    }
}

/// Anime saved for later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyListEntry {
    pub anime_id: i64,
    pub anime_title: String,
    pub anime_image: String,
    pub added_at: i64, // Set once at insertion, never updated
}

/// Item to be saved (added_at is stamped by the store)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMyListItem {
    pub anime_id: i64,
    pub anime_title: String,
    pub anime_image: String,
}

impl NewMyListItem {
    pub(crate) fn stamp(self, added_at: i64) -> MyListEntry {
        MyListEntry {
            anime_id: self.anime_id,
            anime_title: self.anime_title,
            anime_image: self.anime_image,
            added_at,
        }
    }
}
