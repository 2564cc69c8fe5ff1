//! Cache entry with timestamp and time-to-live

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cached value together with the time it was written and how long it stays valid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// When the entry was written
    pub timestamp: DateTime<Utc>,

    /// The cached payload
    pub data: T,

    /// Time-to-live in milliseconds
    pub ttl_ms: u64,
}

impl<T> CacheEntry<T> {
    /// Create an entry stamped with the current time
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            timestamp: Utc::now(),
            data,
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Time-to-live of this entry
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// An entry is valid iff `now - timestamp < ttl`
    ///
    /// Entries stamped in the future (clock skew) count as fresh.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let age_ms = now.signed_duration_since(self.timestamp).num_milliseconds();
        age_ms < 0 || (age_ms as u64) < self.ttl_ms
    }

    /// Validity against the current wall clock
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}
