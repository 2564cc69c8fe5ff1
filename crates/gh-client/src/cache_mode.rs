//! How the gateway uses the response cache

use serde::{Deserialize, Serialize};

/// Cache behavior of a gateway
///
/// Fixed when the gateway is built. Per-request `fresh` reads override the
/// read side only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    /// Never read or write cached responses
    None,

    /// Always hit the network, but keep the cache warm
    WriteOnly,

    /// Serve from the cache when possible, never update it
    ReadOnly,

    /// Read through and write back
    #[default]
    ReadWrite,
}

impl CacheMode {
    /// Mode for a run where the user asked to bypass (`--no-cache`) or
    /// refresh (`--refresh`) cached data
    pub fn from_flags(no_cache: bool, refresh: bool) -> Self {
        match (no_cache, refresh) {
            (true, _) => CacheMode::None,
            (false, true) => CacheMode::WriteOnly,
            (false, false) => CacheMode::ReadWrite,
        }
    }

    /// May a GET be answered from the cache?
    pub fn should_read(&self) -> bool {
        matches!(self, CacheMode::ReadOnly | CacheMode::ReadWrite)
    }

    /// May a fetched GET response be stored?
    pub fn should_write(&self) -> bool {
        matches!(self, CacheMode::WriteOnly | CacheMode::ReadWrite)
    }
}
