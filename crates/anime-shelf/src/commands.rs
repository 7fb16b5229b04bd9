//! Command handlers and plain-text rendering.

use crate::Command;
use anyhow::{Context, Result};
use catalog::JikanClient;
use chrono::{Local, TimeZone};
use shared::{
    open_storage, Clock, Config, KeyValueStorage, MemoryStorage, MyListEntry, NewMyListItem,
    NewWatchHistory, PersistedStateStore, WatchHistoryEntry,
};
use tracing::{info, warn};

/// Open the configured storage, or a throwaway in-memory one when it cannot
/// be opened
pub fn open_storage_or_memory(config: &Config) -> Box<dyn KeyValueStorage> {
    match open_storage(config) {
        Ok(storage) => storage,
        Err(e) => {
            warn!(
                error = %format!("{:#}", e),
                "Durable storage unavailable, changes will not be kept"
            );
            Box::new(MemoryStorage::new())
        }
    }
}

/// Execute one command and return what should be printed
pub async fn run<S, C>(
    command: Command,
    store: &mut PersistedStateStore<S, C>,
    config: &Config,
) -> Result<String>
where
    S: KeyValueStorage,
    C: Clock,
{
    let output = match command {
        Command::Watch {
            anime_id,
            episode,
            title,
            image,
        } => {
            let (anime_title, anime_image) =
                resolve_metadata(anime_id, title, image, config).await?;
            store.record_watch_history(NewWatchHistory {
                anime_id,
                anime_title: anime_title.clone(),
                anime_image,
                episode,
            });
            info!(anime_id = anime_id, episode = episode, "Watch recorded");
            format!("Watching {} - episode {}", anime_title, episode)
        }

        Command::History { json } => {
            let history = store.list_watch_history();
            if json {
                serde_json::to_string_pretty(&history).context("Failed to encode history")?
            } else {
                render_history(&history)
            }
        }

        Command::ClearHistory => {
            store.clear_watch_history();
            "Watch history cleared".to_string()
        }

        Command::Add {
            anime_id,
            title,
            image,
        } => {
            if store.is_in_my_list(anime_id) {
                format!("Anime {} is already in your list", anime_id)
            } else {
                let (anime_title, anime_image) =
                    resolve_metadata(anime_id, title, image, config).await?;
                let added = store.add_to_my_list(NewMyListItem {
                    anime_id,
                    anime_title: anime_title.clone(),
                    anime_image,
                });
                if added {
                    format!("Added {} to your list", anime_title)
                } else {
                    format!("{} was not added to your list", anime_title)
                }
            }
        }

        Command::Remove { anime_id } => {
            if !store.is_in_my_list(anime_id) {
                format!("Anime {} was not in your list", anime_id)
            } else {
                store.remove_from_my_list(anime_id);
                if store.is_in_my_list(anime_id) {
                    format!("Anime {} could not be removed from your list", anime_id)
                } else {
                    format!("Removed anime {} from your list", anime_id)
                }
            }
        }

        Command::Contains { anime_id } => {
            if store.is_in_my_list(anime_id) {
                "yes".to_string()
            } else {
                "no".to_string()
            }
        }

        Command::List { json } => {
            let list = store.list_my_list();
            if json {
                serde_json::to_string_pretty(&list).context("Failed to encode list")?
            } else {
                render_list(&list)
            }
        }
    };

    Ok(output)
}

/// Title and poster for an anime: given values win, otherwise the catalog
async fn resolve_metadata(
    anime_id: i64,
    title: Option<String>,
    image: Option<String>,
    config: &Config,
) -> Result<(String, String)> {
    if let Some(title) = title {
        return Ok((title, image.unwrap_or_default()));
    }

    let mut client = JikanClient::from_config(&config.catalog)?;
    let summary = client.get_anime(anime_id).await.with_context(|| {
        format!(
            "Could not look up anime {}; pass --title to record it anyway",
            anime_id
        )
    })?;

    Ok((summary.title, image.unwrap_or(summary.image)))
}

fn format_timestamp(millis: i64) -> String {
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M").to_string(),
        None => "unknown time".to_string(),
    }
}

fn render_history(history: &[WatchHistoryEntry]) -> String {
    if history.is_empty() {
        return "No watch history yet".to_string();
    }

    history
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "{:>2}. {} - episode {} ({}) [{}]",
                i + 1,
                entry.anime_title,
                entry.episode,
                format_timestamp(entry.timestamp),
                entry.anime_id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_list(list: &[MyListEntry]) -> String {
    if list.is_empty() {
        return "Your list is empty".to_string();
    }

    list.iter()
        .map(|entry| {
            format!(
                "{} [{}] added {}",
                entry.anime_title,
                entry.anime_id,
                format_timestamp(entry.added_at)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::config::StorageBackend;
    use shared::StorageError;
    use tempfile::TempDir;

    /// Storage that reads fine but rejects every write
    #[derive(Default)]
    struct ReadOnlyStorage {
        inner: MemoryStorage,
    }

    impl KeyValueStorage for ReadOnlyStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key)
        }

        fn set(&mut self, _key: &str, _value: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only filesystem".to_string()))
        }

        fn delete(&mut self, _key: &str) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("read-only filesystem".to_string()))
        }
    }

    fn store() -> PersistedStateStore<MemoryStorage> {
        PersistedStateStore::new(MemoryStorage::new())
    }

    fn watch(anime_id: i64, episode: u32, title: &str) -> Command {
        Command::Watch {
            anime_id,
            episode,
            title: Some(title.to_string()),
            image: None,
        }
    }

    fn add(anime_id: i64, title: &str) -> Command {
        Command::Add {
            anime_id,
            title: Some(title.to_string()),
            image: Some(format!("https://cdn.example/{}.jpg", anime_id)),
        }
    }

    #[tokio::test]
    async fn test_watch_then_history() -> anyhow::Result<()> {
        let config = Config::default();
        let mut store = store();
        let fma = "Fullmetal Alchemist: Brotherhood";

        let out = run(watch(5114, 1, fma), &mut store, &config).await?;
        assert_eq!(out, "Watching Fullmetal Alchemist: Brotherhood - episode 1");
        run(watch(1, 4, "Cowboy Bebop"), &mut store, &config).await?;
        run(watch(5114, 2, fma), &mut store, &config).await?;

        let out = run(Command::History { json: false }, &mut store, &config).await?;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(" 1. Fullmetal Alchemist: Brotherhood - episode 2"));
        assert!(lines[1].starts_with(" 2. Cowboy Bebop - episode 4"));

        let out = run(Command::History { json: true }, &mut store, &config).await?;
        let value: serde_json::Value = serde_json::from_str(&out)?;
        assert_eq!(value[0]["animeId"], 5114);
        assert_eq!(value[0]["episode"], 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_clear_history() -> anyhow::Result<()> {
        let config = Config::default();
        let mut store = store();

        run(watch(1, 1, "Cowboy Bebop"), &mut store, &config).await?;
        run(Command::ClearHistory, &mut store, &config).await?;

        let out = run(Command::History { json: false }, &mut store, &config).await?;
        assert_eq!(out, "No watch history yet");

        Ok(())
    }

    #[tokio::test]
    async fn test_list_commands() -> anyhow::Result<()> {
        let config = Config::default();
        let mut store = store();

        let out = run(add(21, "One Piece"), &mut store, &config).await?;
        assert_eq!(out, "Added One Piece to your list");
        let out = run(add(21, "One Piece"), &mut store, &config).await?;
        assert_eq!(out, "Anime 21 is already in your list");
        let out = run(Command::Contains { anime_id: 21 }, &mut store, &config).await?;
        assert_eq!(out, "yes");

        let out = run(Command::List { json: false }, &mut store, &config).await?;
        assert!(out.starts_with("One Piece [21] added "));

        let out = run(Command::Remove { anime_id: 21 }, &mut store, &config).await?;
        assert_eq!(out, "Removed anime 21 from your list");
        let out = run(Command::Remove { anime_id: 999 }, &mut store, &config).await?;
        assert_eq!(out, "Anime 999 was not in your list");

        let out = run(Command::Contains { anime_id: 21 }, &mut store, &config).await?;
        assert_eq!(out, "no");
        let out = run(Command::List { json: false }, &mut store, &config).await?;
        assert_eq!(out, "Your list is empty");

        Ok(())
    }

    #[tokio::test]
    async fn test_remove_reports_failed_write() -> anyhow::Result<()> {
        let config = Config::default();
        let seeded = r#"[{"animeId":21,"animeTitle":"One Piece","animeImage":"","addedAt":1}]"#;
        let storage = ReadOnlyStorage {
            inner: MemoryStorage::with_entries([(shared::MY_LIST_KEY, seeded)]),
        };
        let mut store = PersistedStateStore::new(storage);

        let out = run(Command::Remove { anime_id: 21 }, &mut store, &config).await?;
        assert_eq!(out, "Anime 21 could not be removed from your list");

        let out = run(add(5, "Monster"), &mut store, &config).await?;
        assert_eq!(out, "Monster was not added to your list");

        Ok(())
    }

    #[tokio::test]
    async fn test_unusable_data_dir_falls_back_to_memory() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        // A regular file where the data directory should be
        let blocker = temp_dir.path().join("not-a-dir");
        std::fs::write(&blocker, "")?;

        let mut config = Config::default();
        config.data.root_dir = blocker.to_string_lossy().to_string();

        for backend in [StorageBackend::Sqlite, StorageBackend::File] {
            config.storage.backend = backend;
            let mut store = PersistedStateStore::new(open_storage_or_memory(&config));

            let out = run(Command::Contains { anime_id: 1 }, &mut store, &config).await?;
            assert_eq!(out, "no");

            // Changes still work for the lifetime of the process
            let out = run(add(1, "Cowboy Bebop"), &mut store, &config).await?;
            assert_eq!(out, "Added Cowboy Bebop to your list");
            let out = run(Command::Contains { anime_id: 1 }, &mut store, &config).await?;
            assert_eq!(out, "yes");
        }

        assert!(blocker.is_file());

        Ok(())
    }

    #[test]
    fn test_format_timestamp_out_of_range() {
        assert_eq!(format_timestamp(i64::MAX), "unknown time");
    }
}
