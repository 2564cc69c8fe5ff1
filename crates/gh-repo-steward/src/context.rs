//! Wiring shared by all commands: config, storage, gateways and the target
//! repository

use anyhow::{Context as _, Result};
use gh_api_cache::{CacheStore, FileStorage, KeyValueStorage, MemoryStorage};
use gh_client::{
    api_base_for_host, CacheMode, Credentials, Gateway, GatewayConfig, GitHubClient,
    OctocrabTransport, RepoRef, RestGitHubClient, RetryPolicy, SessionClient, TokenResolver,
};
use gh_pr_config::{paths, AppConfig, SettingsStore};
use gh_pr_triage::{Enricher, EnrichmentConfig, PollConfig};
use std::sync::Arc;

/// Environment variables holding the session API key, in lookup order
const SESSION_KEY_VARS: &[&str] = &["JULES_API_KEY", "GEMINI_API_KEY"];

/// Options that apply to every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub repo: Option<String>,
    pub host: Option<String>,
    pub no_persist: bool,
    pub no_cache: bool,
    pub refresh: bool,
}

pub struct AppContext {
    pub config: AppConfig,
    pub cache: Arc<CacheStore>,
    pub settings: SettingsStore,
    gateway_config: GatewayConfig,
    host: Option<String>,
    repo: Option<String>,
}

impl AppContext {
    pub fn new(options: &GlobalOptions, config: AppConfig) -> Result<Self> {
        let storage: Arc<dyn KeyValueStorage> = if options.no_persist {
            log::debug!("Using in-memory storage");
            Arc::new(MemoryStorage::with_quota(config.storage_quota_bytes))
        } else {
            let path = paths::storage_path()?;
            log::debug!("Using storage at {}", path.display());
            Arc::new(FileStorage::open(path, Some(config.storage_quota_bytes)))
        };

        let gateway_config = GatewayConfig {
            cache_mode: CacheMode::from_flags(options.no_cache, options.refresh),
            cache_ttl: config.cache_ttl(),
            retry: RetryPolicy::default(),
            detect_secondary_rate_limits: config.detect_secondary_rate_limits,
            request_timeout: config.request_timeout(),
            ..GatewayConfig::default()
        };

        Ok(Self {
            host: options.host.clone().or_else(|| config.host.clone()),
            repo: options.repo.clone().or_else(|| config.default_repo.clone()),
            cache: Arc::new(CacheStore::new(storage.clone())),
            settings: SettingsStore::new(storage),
            gateway_config,
            config,
        })
    }

    /// Repository from `--repo` or the configured default
    pub fn repo(&self) -> Result<RepoRef> {
        let raw = self.repo.as_deref().context(
            "No repository specified. Use --repo owner/name or set default_repo in .gh-repo-steward.toml",
        )?;
        let repo: RepoRef = raw
            .parse()
            .with_context(|| format!("Invalid repository '{}'", raw))?;

        if let Err(e) = self
            .settings
            .remember_repository(&repo.to_string(), self.host.as_deref())
        {
            log::debug!("Could not record recent repository: {:#}", e);
        }
        Ok(repo)
    }

    /// GitHub accessors, authenticated when a token can be found
    pub async fn github(&self) -> Result<Arc<dyn GitHubClient>> {
        let token = match TokenResolver::new().get_token(self.host.as_deref()).await {
            Ok(token) => Some(token),
            Err(e) => {
                log::warn!("{:#}. Continuing unauthenticated (low rate limit)", e);
                None
            }
        };

        let credentials = Credentials::from_optional_token(token.as_deref());
        let base_url = api_base_for_host(self.host.as_deref());
        let transport = OctocrabTransport::build(&credentials, Some(&base_url))
            .context("Failed to create GitHub client")?;

        let gateway = Gateway::new(
            Arc::new(transport),
            self.cache.clone(),
            self.gateway_config.clone(),
        );
        Ok(Arc::new(RestGitHubClient::new(gateway)))
    }

    pub fn enricher(&self, client: Arc<dyn GitHubClient>) -> Enricher {
        Enricher::new(client, enrichment_config(&self.config))
    }

    /// Session API client keyed by `JULES_API_KEY` (or `GEMINI_API_KEY`)
    pub fn sessions(&self) -> Result<SessionClient> {
        let key = SESSION_KEY_VARS
            .iter()
            .find_map(|var| std::env::var(var).ok().filter(|k| !k.trim().is_empty()))
            .with_context(|| format!("No session API key found. Set {}", SESSION_KEY_VARS[0]))?;

        Ok(SessionClient::with_api_key(
            &key,
            self.cache.clone(),
            self.gateway_config.clone(),
        ))
    }
}

pub fn enrichment_config(config: &AppConfig) -> EnrichmentConfig {
    EnrichmentConfig {
        max_items: config.max_enriched,
        batch_size: config.batch_size,
        batch_pause: config.batch_pause(),
        poll: PollConfig {
            max_attempts: config.poll_attempts,
            delay: config.poll_delay(),
        },
        protected_branches: config.protected_branches.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn in_memory(repo: Option<&str>) -> AppContext {
        let options = GlobalOptions {
            repo: repo.map(str::to_string),
            no_persist: true,
            refresh: true,
            ..GlobalOptions::default()
        };
        AppContext::new(&options, AppConfig::default()).unwrap()
    }

    #[test]
    fn test_repo_is_parsed_and_remembered() {
        let ctx = in_memory(Some("https://github.com/rust-lang/rust.git"));
        let repo = ctx.repo().unwrap();
        assert_eq!(repo.to_string(), "rust-lang/rust");
        assert_eq!(ctx.settings.recent_repositories()[0].repo, "rust-lang/rust");
    }

    #[test]
    fn test_missing_repo_is_an_error() {
        let err = in_memory(None).repo().unwrap_err();
        assert!(err.to_string().contains("--repo"));
    }

    #[test]
    fn test_flags_and_config_shape_the_gateway() {
        let ctx = in_memory(None);
        assert_eq!(ctx.gateway_config.cache_mode, CacheMode::WriteOnly);
        assert_eq!(ctx.gateway_config.cache_ttl, Duration::from_secs(300));
        assert_eq!(
            ctx.gateway_config.request_timeout,
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_enrichment_config_from_app_config() {
        let config = AppConfig::from_toml(
            "max_enriched = 10\nbatch_size = 2\npoll_delay_ms = 500\nprotected_branches = [\"trunk\"]",
        )
        .unwrap();
        let enrichment = enrichment_config(&config);
        assert_eq!(enrichment.max_items, 10);
        assert_eq!(enrichment.batch_size, 2);
        assert_eq!(enrichment.poll.delay, Duration::from_millis(500));
        assert_eq!(enrichment.protected_branches, vec!["trunk"]);
    }
}
