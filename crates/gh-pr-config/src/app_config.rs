//! Application configuration
//!
//! Configuration loaded from .gh-repo-steward.toml file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Application configuration loaded from .gh-repo-steward.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Repository used when `--repo` is not given ("owner/name")
    #[serde(default)]
    pub default_repo: Option<String>,

    /// GitHub host (None = github.com)
    #[serde(default)]
    pub host: Option<String>,

    /// How long cached API responses stay valid
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Size limit of the storage document shared by cache and settings
    #[serde(default = "default_storage_quota_bytes")]
    pub storage_quota_bytes: usize,

    /// Deadline for a single request attempt
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Also treat 403 "secondary rate limit" responses as rate limits
    #[serde(default)]
    pub detect_secondary_rate_limits: bool,

    /// Newest pull requests enriched per listing
    #[serde(default = "default_max_enriched")]
    pub max_enriched: usize,

    /// Concurrent enrichments per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Fresh re-reads while GitHub computes mergeability
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,

    #[serde(default = "default_poll_delay_ms")]
    pub poll_delay_ms: u64,

    /// Base branches that require passing tests before merging
    #[serde(default = "default_protected_branches")]
    pub protected_branches: Vec<String>,
}

fn default_cache_ttl_secs() -> u64 {
    5 * 60
}

fn default_storage_quota_bytes() -> usize {
    5 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_enriched() -> usize {
    50
}

fn default_batch_size() -> usize {
    3
}

fn default_batch_pause_ms() -> u64 {
    1000
}

fn default_poll_attempts() -> u32 {
    3
}

fn default_poll_delay_ms() -> u64 {
    2000
}

fn default_protected_branches() -> Vec<String> {
    ["leader", "main", "master", "develop"]
        .iter()
        .map(|b| b.to_string())
        .collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_repo: None,
            host: None,
            cache_ttl_secs: default_cache_ttl_secs(),
            storage_quota_bytes: default_storage_quota_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
            detect_secondary_rate_limits: false,
            max_enriched: default_max_enriched(),
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
            poll_attempts: default_poll_attempts(),
            poll_delay_ms: default_poll_delay_ms(),
            protected_branches: default_protected_branches(),
        }
    }
}

impl AppConfig {
    /// Load the first config file found, or use defaults
    ///
    /// An unparsable file is reported and ignored.
    pub fn load() -> Self {
        if let Some((path, content)) = crate::load_config_file() {
            match Self::from_toml(&content) {
                Ok(config) => {
                    log::info!("Loaded app config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    log::warn!("{}: {:#}", path.display(), e);
                }
            }
        }

        log::debug!("Using default app config");
        Self::default()
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Per-attempt deadline; `0` disables it
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    pub fn poll_delay(&self) -> Duration {
        Duration::from_millis(self.poll_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.default_repo, None);
        assert_eq!(config.cache_ttl(), Duration::from_secs(300));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.max_enriched, 50);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.poll_delay(), Duration::from_secs(2));
        assert!(!config.detect_secondary_rate_limits);
        assert_eq!(
            config.protected_branches,
            vec!["leader", "main", "master", "develop"]
        );
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml = r#"
            default_repo = "rust-lang/rust"
            cache_ttl_secs = 60
            protected_branches = ["trunk"]
        "#;
        let config = AppConfig::from_toml(toml).unwrap();
        assert_eq!(config.default_repo.as_deref(), Some("rust-lang/rust"));
        assert_eq!(config.cache_ttl(), Duration::from_secs(60));
        assert_eq!(config.protected_branches, vec!["trunk"]);
        // Other fields should use defaults
        assert_eq!(config.batch_pause(), Duration::from_secs(1));
        assert_eq!(config.poll_attempts, 3);
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = AppConfig::from_toml("request_timeout_secs = 0").unwrap();
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let err = AppConfig::from_toml("batch_size = \"three\"").unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
