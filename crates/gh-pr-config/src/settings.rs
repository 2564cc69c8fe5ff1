//! User settings persisted next to the API cache
//!
//! Settings share the storage document with cache entries but live under the
//! `settings:` prefix, which cache purges and invalidations never touch.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use gh_api_cache::{KeyValueStorage, SETTINGS_PREFIX};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const RECENT_REPOSITORIES: &str = "recent-repositories";

/// Recent repositories kept in settings
pub const MAX_RECENT_REPOSITORIES: usize = 10;

/// A recently used repository entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentRepository {
    /// "owner/name"
    pub repo: String,
    /// GitHub host (None = github.com)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub last_used: DateTime<Utc>,
}

/// Typed access to the `settings:` keys of a storage
pub struct SettingsStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    fn key(name: &str) -> String {
        format!("{}{}", SETTINGS_PREFIX, name)
    }

    /// Read a setting; unreadable values count as unset
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let raw = self.storage.get_item(&Self::key(name))?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring unreadable setting {}: {}", name, e);
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize setting {}", name))?;
        self.storage
            .set_item(&Self::key(name), &raw)
            .with_context(|| format!("Failed to store setting {}", name))
    }

    pub fn remove(&self, name: &str) {
        self.storage.remove_item(&Self::key(name));
    }

    /// Recently used repositories, most recent first
    pub fn recent_repositories(&self) -> Vec<RecentRepository> {
        self.get(RECENT_REPOSITORIES).unwrap_or_default()
    }

    /// Move `repo` to the front of the recent list
    pub fn remember_repository(&self, repo: &str, host: Option<&str>) -> Result<()> {
        let host = host.map(str::to_string);
        let mut recent = self.recent_repositories();
        recent.retain(|r| !(r.repo.eq_ignore_ascii_case(repo) && r.host == host));
        recent.insert(
            0,
            RecentRepository {
                repo: repo.to_string(),
                host,
                last_used: Utc::now(),
            },
        );
        recent.truncate(MAX_RECENT_REPOSITORIES);
        self.set(RECENT_REPOSITORIES, &recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gh_api_cache::{CacheStore, FileStorage, MemoryStorage};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn store() -> (SettingsStore, Arc<dyn KeyValueStorage>) {
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        (SettingsStore::new(storage.clone()), storage)
    }

    #[test]
    fn test_settings_round_trip_under_prefix() {
        let (settings, storage) = store();
        settings.set("theme", &"dark").unwrap();

        assert_eq!(settings.get::<String>("theme").as_deref(), Some("dark"));
        assert_eq!(storage.keys(), vec!["settings:theme".to_string()]);

        settings.remove("theme");
        assert_eq!(settings.get::<String>("theme"), None);
    }

    #[test]
    fn test_settings_survive_cache_purge() {
        let (settings, storage) = store();
        let cache = CacheStore::new(storage);
        settings.set("theme", &"dark").unwrap();
        cache.set("github:/repos/o/r", &1, Duration::from_secs(60));

        cache.purge();
        cache.invalidate_by_prefix("");

        assert_eq!(settings.get::<String>("theme").as_deref(), Some("dark"));
    }

    #[test]
    fn test_recent_repositories_are_deduplicated_and_bounded() {
        let (settings, _) = store();
        for n in 0..12 {
            settings
                .remember_repository(&format!("o/repo-{}", n), None)
                .unwrap();
        }
        settings.remember_repository("o/repo-5", None).unwrap();

        let recent = settings.recent_repositories();
        assert_eq!(recent.len(), MAX_RECENT_REPOSITORIES);
        assert_eq!(recent[0].repo, "o/repo-5");
        assert_eq!(recent.iter().filter(|r| r.repo == "o/repo-5").count(), 1);
    }

    #[test]
    fn test_settings_persist_in_file_storage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage.json");

        let settings = SettingsStore::new(Arc::new(FileStorage::open(&path, None)));
        settings
            .remember_repository("rust-lang/rust", Some("github.example.com"))
            .unwrap();

        let reopened = SettingsStore::new(Arc::new(FileStorage::open(&path, None)));
        let recent = reopened.recent_repositories();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].host.as_deref(), Some("github.example.com"));
    }
}
