//! Best-effort TTL cache for GitHub API responses
//!
//! Entries live in a [`KeyValueStorage`] under the `gh-cache:` prefix, next to
//! user settings stored under `settings:`. The cache never fails its caller:
//! corrupt entries are evicted on read, and writes that exceed the storage
//! quota trigger a purge of cache entries (settings survive) and one retry.
//!
//! ```rust
//! use gh_api_cache::CacheStore;
//! use std::time::Duration;
//!
//! let cache = CacheStore::in_memory();
//! cache.set("github:/repos/o/r/issues", &vec![1, 2, 3], Duration::from_secs(300));
//! assert_eq!(cache.get::<Vec<u32>>("github:/repos/o/r/issues"), Some(vec![1, 2, 3]));
//!
//! // Any successful write elsewhere invalidates everything cached
//! cache.purge();
//! assert_eq!(cache.get::<Vec<u32>>("github:/repos/o/r/issues"), None);
//! ```

pub mod entry;
pub mod storage;
pub mod store;

pub use entry::CacheEntry;
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage, StorageError};
pub use store::{CacheStats, CacheStore, CACHE_PREFIX, SETTINGS_PREFIX};
