//! Key/value storage backends
//!
//! Cache entries and user settings share one storage and are told apart only
//! by key prefix, so backends never interpret keys themselves.
//!
//! - `MemoryStorage` - process-local map, used by tests and `--no-persist` runs
//! - `FileStorage` - a single JSON document on disk, written through on every change
//!
//! Both backends accept an optional byte quota. Exceeding it yields
//! `StorageError::QuotaExceeded`, which the cache store reacts to by purging.

use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// Writing the value would grow the storage beyond its quota
    #[error("storage quota exceeded: {required} bytes required, limit is {limit} bytes")]
    QuotaExceeded { required: usize, limit: usize },

    /// The backing file could not be read or written
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing document could not be encoded
    #[error("storage encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Persistent string key/value storage
///
/// Modelled after browser local storage: string keys, string values and a
/// way to enumerate keys. Implementations use interior mutability so a single
/// storage can be shared between the cache and the settings store.
pub trait KeyValueStorage: Send + Sync {
    /// Read the raw value stored under `key`
    fn get_item(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key` if present
    fn remove_item(&self, key: &str);

    /// Remove every key in `keys`, returning how many were present
    ///
    /// Persistent backends write once for the whole batch.
    fn remove_items(&self, keys: &[String]) -> usize {
        keys.iter()
            .filter(|key| {
                let present = self.get_item(key).is_some();
                self.remove_item(key);
                present
            })
            .count()
    }

    /// All keys currently stored
    fn keys(&self) -> Vec<String>;

    /// Total size of keys and values in bytes
    fn size_in_bytes(&self) -> usize;
}

type Items = BTreeMap<String, String>;

fn lock_items(items: &Mutex<Items>) -> MutexGuard<'_, Items> {
    items.lock().unwrap_or_else(PoisonError::into_inner)
}

fn total_size(items: &Items) -> usize {
    items.iter().map(|(k, v)| k.len() + v.len()).sum()
}

/// Size the map would have after storing `value` under `key`
fn projected_size(items: &Items, key: &str, value: &str) -> usize {
    let replaced = items.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
    total_size(items) - replaced + key.len() + value.len()
}

fn check_quota(items: &Items, quota: Option<usize>, key: &str, value: &str) -> Result<(), StorageError> {
    if let Some(limit) = quota {
        let required = projected_size(items, key, value);
        if required > limit {
            return Err(StorageError::QuotaExceeded { required, limit });
        }
    }
    Ok(())
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<Items>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create an unbounded in-memory storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an in-memory storage that rejects writes beyond `quota` bytes
    pub fn with_quota(quota: usize) -> Self {
        Self {
            items: Mutex::new(Items::new()),
            quota: Some(quota),
        }
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        lock_items(&self.items).get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = lock_items(&self.items);
        check_quota(&items, self.quota, key, value)?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        lock_items(&self.items).remove(key);
    }

    fn keys(&self) -> Vec<String> {
        lock_items(&self.items).keys().cloned().collect()
    }

    fn size_in_bytes(&self) -> usize {
        total_size(&lock_items(&self.items))
    }
}

/// File-backed storage
///
/// The whole map is kept in memory and written to `path` as one JSON object
/// after every change. A missing or unreadable document starts out empty.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    items: Mutex<Items>,
    quota: Option<usize>,
    writes: AtomicUsize,
}

impl FileStorage {
    /// Open (or lazily create) the storage document at `path`
    pub fn open(path: impl Into<PathBuf>, quota: Option<usize>) -> Self {
        let path = path.into();
        let items = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                debug!("Discarding corrupt storage document {}: {}", path.display(), e);
                Items::new()
            }),
            Err(_) => Items::new(),
        };
        debug!(
            "Opened storage {} with {} keys",
            path.display(),
            items.len()
        );

        Self {
            path,
            items: Mutex::new(items),
            quota,
            writes: AtomicUsize::new(0),
        }
    }

    /// Location of the backing document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// How often the document has been written since opening
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    fn persist(&self, items: &Items) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(items)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        lock_items(&self.items).get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut items = lock_items(&self.items);
        check_quota(&items, self.quota, key, value)?;

        let previous = items.insert(key.to_string(), value.to_string());
        if let Err(e) = self.persist(&items) {
            // Keep memory and disk in agreement
            match previous {
                Some(old) => items.insert(key.to_string(), old),
                None => items.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        let mut items = lock_items(&self.items);
        if items.remove(key).is_some() {
            if let Err(e) = self.persist(&items) {
                debug!("Failed to persist removal of {}: {}", key, e);
            }
        }
    }

    fn remove_items(&self, keys: &[String]) -> usize {
        let mut items = lock_items(&self.items);
        let removed = keys.iter().filter(|key| items.remove(*key).is_some()).count();
        if removed > 0 {
            if let Err(e) = self.persist(&items) {
                debug!("Failed to persist removal of {} keys: {}", removed, e);
            }
        }
        removed
    }

    fn keys(&self) -> Vec<String> {
        lock_items(&self.items).keys().cloned().collect()
    }

    fn size_in_bytes(&self) -> usize {
        total_size(&lock_items(&self.items))
    }
}
