//! Credentials and token resolution
//!
//! Tokens are trimmed before use. Copy-pasted tokens commonly carry a
//! trailing newline, and sending one verbatim produces an opaque header
//! error deep in the HTTP stack instead of a useful message.

use crate::DEFAULT_HOST;
use anyhow::{Context, Result};
use log::debug;

/// How a transport authenticates
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credentials {
    /// No authentication (low rate limit)
    #[default]
    Anonymous,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// A custom API-key header, e.g. `X-Goog-Api-Key`
    ApiKey { header: String, key: String },
}

impl Credentials {
    /// Bearer credentials from a possibly untidy token
    ///
    /// A token that is empty after trimming yields `Anonymous`.
    pub fn bearer(token: impl AsRef<str>) -> Self {
        let token = token.as_ref().trim();
        if token.is_empty() {
            Credentials::Anonymous
        } else {
            Credentials::Bearer(token.to_string())
        }
    }

    /// API-key credentials sent in `header`
    pub fn api_key(header: impl Into<String>, key: impl AsRef<str>) -> Self {
        Credentials::ApiKey {
            header: header.into(),
            key: key.as_ref().trim().to_string(),
        }
    }

    /// Bearer credentials from an optional token
    pub fn from_optional_token(token: Option<&str>) -> Self {
        token.map(Credentials::bearer).unwrap_or_default()
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }
}

// Never print secrets
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Anonymous => write!(f, "Anonymous"),
            Credentials::Bearer(_) => write!(f, "Bearer(***)"),
            Credentials::ApiKey { header, .. } => write!(f, "ApiKey({}: ***)", header),
        }
    }
}

/// Where a GitHub token may come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
    /// Host-specific variable, e.g. `GITHUB_TOKEN_GHE_EXAMPLE_COM`
    HostEnv(String),
    /// `gh auth token --hostname {host}`
    GhCli,
    /// `GITHUB_TOKEN` or `GH_TOKEN`, github.com only
    DefaultEnv,
}

impl std::fmt::Display for TokenSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenSource::HostEnv(var) => write!(f, "env var {}", var),
            TokenSource::GhCli => write!(f, "gh CLI"),
            TokenSource::DefaultEnv => write!(f, "GITHUB_TOKEN/GH_TOKEN"),
        }
    }
}

/// Finds a GitHub token for a host by trying [`TokenSource`]s in order
#[derive(Debug, Clone)]
pub struct TokenResolver {
    /// `GITHUB_TOKEN`/`GH_TOKEN`, captured at construction
    fallback: Option<String>,
}

impl Default for TokenResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenResolver {
    pub fn new() -> Self {
        let fallback = ["GITHUB_TOKEN", "GH_TOKEN"]
            .iter()
            .find_map(|var| std::env::var(var).ok());
        Self { fallback }
    }

    /// Environment variable consulted first for `host`
    pub fn host_env_key(host: &str) -> String {
        let suffix: String = host
            .chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();
        format!("GITHUB_TOKEN_{}", suffix)
    }

    /// Lookup order for `host`
    pub fn sources(host: &str) -> Vec<TokenSource> {
        let mut sources = vec![TokenSource::HostEnv(Self::host_env_key(host)), TokenSource::GhCli];
        if host == DEFAULT_HOST {
            sources.push(TokenSource::DefaultEnv);
        }
        sources
    }

    /// Get a trimmed token for `host` (default github.com)
    pub async fn get_token(&self, host: Option<&str>) -> Result<String> {
        let host = host.unwrap_or(DEFAULT_HOST);

        for source in Self::sources(host) {
            let token = match &source {
                TokenSource::HostEnv(var) => std::env::var(var).ok(),
                TokenSource::GhCli => gh_cli_token(host).await?,
                TokenSource::DefaultEnv => self.fallback.clone(),
            };
            if let Some(token) = token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
                debug!("Using token from {} for {}", source, host);
                return Ok(token);
            }
        }

        anyhow::bail!(
            "No token found for host '{}'. Set {} or run 'gh auth login --hostname {}'",
            host,
            Self::host_env_key(host),
            host
        )
    }
}

/// Token printed by the gh CLI; a missing or failing CLI is not an error
async fn gh_cli_token(host: &str) -> Result<Option<String>> {
    let output = match tokio::process::Command::new("gh")
        .args(["auth", "token", "--hostname", host])
        .output()
        .await
    {
        Ok(output) => output,
        Err(e) => {
            debug!("gh CLI not available: {}", e);
            return Ok(None);
        }
    };
    if !output.status.success() {
        debug!("gh auth token found nothing for {}", host);
        return Ok(None);
    }
    let token = String::from_utf8(output.stdout).context("Invalid UTF-8 in gh auth token output")?;
    Ok(Some(token))
}
