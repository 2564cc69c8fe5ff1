//! Cache store on top of key/value storage
//!
//! The store is deliberately forgiving: a corrupt or expired entry reads as a
//! miss, and a write that cannot be stored is dropped. Nothing the cache does
//! may fail the caller.

use crate::entry::CacheEntry;
use crate::storage::{KeyValueStorage, MemoryStorage, StorageError};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Key prefix for all cache entries
pub const CACHE_PREFIX: &str = "gh-cache:";

/// Key prefix for user settings; never touched by purge or invalidation
pub const SETTINGS_PREFIX: &str = "settings:";

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache entries (valid or not yet detected as expired)
    pub entries: usize,
    /// Bytes used by the whole storage, settings included
    pub storage_bytes: usize,
}

/// TTL cache for API responses
///
/// Shared across clients as `Arc<CacheStore>`. Read-then-write is not atomic;
/// concurrent writers of the same key race and the last write wins.
pub struct CacheStore {
    storage: Arc<dyn KeyValueStorage>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("entries", &self.stats().entries)
            .finish()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl CacheStore {
    /// Create a cache store on the given storage
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Create a cache store on fresh in-memory storage
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// The underlying storage (shared with the settings store)
    pub fn storage(&self) -> &Arc<dyn KeyValueStorage> {
        &self.storage
    }

    fn storage_key(key: &str) -> String {
        format!("{}{}", CACHE_PREFIX, key)
    }

    /// Read a valid entry
    ///
    /// Expired and undecodable entries are removed and reported as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = Self::storage_key(key);
        let raw = self.storage.get_item(&storage_key)?;

        match serde_json::from_str::<CacheEntry<T>>(&raw) {
            Ok(entry) if entry.is_valid() => {
                debug!("Cache HIT for {}", key);
                Some(entry.data)
            }
            Ok(_) => {
                debug!("Cache entry for {} expired", key);
                self.storage.remove_item(&storage_key);
                None
            }
            Err(e) => {
                debug!("Evicting corrupt cache entry for {}: {}", key, e);
                self.storage.remove_item(&storage_key);
                None
            }
        }
    }

    /// Write an entry with the given time-to-live
    ///
    /// On quota exhaustion all cache entries are purged and the write is
    /// retried exactly once. If that fails too the write is dropped.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) {
        let entry = CacheEntry::new(data, ttl);
        let json = match serde_json::to_string(&entry) {
            Ok(json) => json,
            Err(e) => {
                debug!("Failed to encode cache entry for {}: {}", key, e);
                return;
            }
        };

        let storage_key = Self::storage_key(key);
        match self.storage.set_item(&storage_key, &json) {
            Ok(()) => {}
            Err(StorageError::QuotaExceeded { required, limit }) => {
                debug!(
                    "Cache quota exceeded writing {} ({} > {} bytes), purging",
                    key, required, limit
                );
                self.purge();
                if let Err(e) = self.storage.set_item(&storage_key, &json) {
                    debug!("Dropping cache write for {} after purge: {}", key, e);
                }
            }
            Err(e) => debug!("Dropping cache write for {}: {}", key, e),
        }
    }

    /// Remove every cache entry whose key starts with `prefix`
    ///
    /// Runs in O(number of stored keys). An empty prefix clears the whole
    /// cache. Returns the number of removed entries.
    pub fn invalidate_by_prefix(&self, prefix: &str) -> usize {
        let full_prefix = Self::storage_key(prefix);
        let doomed: Vec<String> = self
            .storage
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&full_prefix))
            .collect();

        let removed = self.storage.remove_items(&doomed);
        debug!(
            "Invalidated {} cache entries with prefix '{}'",
            removed, prefix
        );
        removed
    }

    /// Remove all cache entries, leaving settings untouched
    pub fn purge(&self) -> usize {
        self.invalidate_by_prefix("")
    }

    /// Current occupancy
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self
                .storage
                .keys()
                .iter()
                .filter(|k| k.starts_with(CACHE_PREFIX))
                .count(),
            storage_bytes: self.storage.size_in_bytes(),
        }
    }
}
