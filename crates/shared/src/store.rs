//! Persisted per-user state: watch history and the saved list.
//!
//! Both collections live as JSON arrays in a [`KeyValueStorage`], most recent
//! entry first. The store is best-effort: storage failures are logged and
//! absorbed, reads degrade to empty collections and writes to no-ops.
//!
//! History is keyed by anime id and re-ranked on every update, bounded to
//! [`WATCH_HISTORY_LIMIT`] entries. The saved list is keyed by anime id too,
//! but keeps pure insertion order and has no bound.

use crate::error::StorageError;
use crate::models::*;
use crate::storage::KeyValueStorage;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

/// Maximum number of watch history entries kept
pub const WATCH_HISTORY_LIMIT: usize = 20;

/// Source of write timestamps
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Owner of the `watchHistory` and `myList` records
pub struct PersistedStateStore<S, C = SystemClock> {
    storage: S,
    clock: C,
}

impl<S: KeyValueStorage> PersistedStateStore<S> {
    /// Create a store stamping entries with the wall clock
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: KeyValueStorage, C: Clock> PersistedStateStore<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self { storage, clock }
    }

    // ========== Watch history ==========

    /// Record that `entry.episode` of an anime was watched
    ///
    /// Replaces any previous entry for the same anime, moves it to the front
    /// and evicts the least recently updated entries beyond the limit.
    pub fn record_watch_history(&mut self, entry: NewWatchHistory) {
        let Some(mut history) = self.load_for_update::<WatchHistoryEntry>(WATCH_HISTORY_KEY) else {
            return;
        };

        let anime_id = entry.anime_id;
        let episode = entry.episode;

        history.retain(|h| h.anime_id != anime_id);
        history.insert(0, entry.stamp(self.clock.now_millis()));
        history.truncate(WATCH_HISTORY_LIMIT);

        if self.persist_logged(WATCH_HISTORY_KEY, &history) {
            debug!(
                anime_id = anime_id,
                episode = episode,
                entries = history.len(),
                "Recorded watch history"
            );
        }
    }

    /// Watch history, most recently updated first
    pub fn list_watch_history(&self) -> Vec<WatchHistoryEntry> {
        self.load_or_empty(WATCH_HISTORY_KEY)
    }

    /// Delete the whole watch history
    pub fn clear_watch_history(&mut self) {
        match self.storage.delete(WATCH_HISTORY_KEY) {
            Ok(()) => debug!("Cleared watch history"),
            Err(e) => warn!(key = WATCH_HISTORY_KEY, error = %e, "Failed to clear watch history"),
        }
    }

    // ========== Saved list ==========

    /// Save an anime for later
    ///
    /// Returns `true` when the item was inserted and persisted, `false` when
    /// the anime is already saved (or storage could not be written).
    pub fn add_to_my_list(&mut self, item: NewMyListItem) -> bool {
        let Some(mut list) = self.load_for_update::<MyListEntry>(MY_LIST_KEY) else {
            return false;
        };

        if list.iter().any(|i| i.anime_id == item.anime_id) {
            debug!(anime_id = item.anime_id, "Anime already in list");
            return false;
        }

        let anime_id = item.anime_id;
        list.insert(0, item.stamp(self.clock.now_millis()));

        let persisted = self.persist_logged(MY_LIST_KEY, &list);
        if persisted {
            debug!(anime_id = anime_id, entries = list.len(), "Added anime to list");
        }
        persisted
    }

    /// Remove an anime from the list; absent ids are ignored
    pub fn remove_from_my_list(&mut self, anime_id: i64) {
        let Some(mut list) = self.load_for_update::<MyListEntry>(MY_LIST_KEY) else {
            return;
        };

        let before = list.len();
        list.retain(|i| i.anime_id != anime_id);

        if list.len() == before {
            debug!(anime_id = anime_id, "Anime not in list, nothing to remove");
            return;
        }

        if self.persist_logged(MY_LIST_KEY, &list) {
            debug!(anime_id = anime_id, entries = list.len(), "Removed anime from list");
        }
    }

    pub fn is_in_my_list(&self, anime_id: i64) -> bool {
        self.load_or_empty::<MyListEntry>(MY_LIST_KEY)
            .iter()
            .any(|i| i.anime_id == anime_id)
    }

    /// Saved list, most recently added first
    pub fn list_my_list(&self) -> Vec<MyListEntry> {
        self.load_or_empty(MY_LIST_KEY)
    }

    // ========== Record I/O ==========

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StorageError> {
        match self.storage.get(key)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|source| StorageError::CorruptRecord {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn persist<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(items).map_err(|source| StorageError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.storage.set(key, &raw)
    }

    /// Read path: any failure reads as an empty collection
    fn load_or_empty<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        self.load(key).unwrap_or_else(|e| {
            warn!(key = key, error = %e, "Reading record failed, treating as empty");
            Vec::new()
        })
    }

    /// Write path: a corrupt record is replaced, an unreadable one aborts
    /// the mutation so the stored value is never clobbered blindly
    fn load_for_update<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        match self.load(key) {
            Ok(items) => Some(items),
            Err(e @ StorageError::CorruptRecord { .. }) => {
                warn!(key = key, error = %e, "Replacing corrupt record");
                Some(Vec::new())
            }
            Err(e) => {
                warn!(key = key, error = %e, "Storage unavailable, skipping write");
                None
            }
        }
    }

    fn persist_logged<T: Serialize>(&mut self, key: &str, items: &[T]) -> bool {
        match self.persist(key, items) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = key, error = %e, "Persisting record failed");
                false
            }
        }
    }
}
