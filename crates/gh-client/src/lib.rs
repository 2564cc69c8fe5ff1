//! GitHub API access with caching, retry and rate-limit handling
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              GitHubClient trait                 │
//! │  - fetch_issues() / fetch_pull_requests()       │
//! │  - fetch_branches() / delete_branch()           │
//! │  - mark_ready_for_review() ...                  │
//! └─────────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!             ┌─────────────────────┐      ┌───────────────┐
//!             │  RestGitHubClient   │      │ SessionClient │
//!             └─────────────────────┘      └───────────────┘
//!                        │                         │
//!                        ▼                         ▼
//!             ┌─────────────────────────────────────────┐
//!             │ Gateway (cache, retry, rate limits)     │
//!             └─────────────────────────────────────────┘
//!                        │                         │
//!                        ▼                         ▼
//!             ┌───────────────────┐      ┌──────────────────┐
//!             │ OctocrabTransport │      │ ReqwestTransport │
//!             └───────────────────┘      └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use gh_api_cache::CacheStore;
//! use gh_client::{
//!     Credentials, Gateway, GatewayConfig, GitHubClient, OctocrabTransport, RepoRef,
//!     RestGitHubClient, StateFilter,
//! };
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let transport = OctocrabTransport::build(&Credentials::bearer("ghp_token\n"), None)?;
//! let gateway = Gateway::new(
//!     Arc::new(transport),
//!     Arc::new(CacheStore::in_memory()),
//!     GatewayConfig::default(),
//! );
//! let client = RestGitHubClient::new(gateway);
//!
//! let repo: RepoRef = "rust-lang/rust".parse()?;
//! let _issues = client.fetch_issues(&repo, StateFilter::Open).await?;
//! # Ok(())
//! # }
//! ```

pub mod cache_mode;
pub mod client;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod graphql;
pub mod octocrab_transport;
pub mod rate_limit;
pub mod reqwest_transport;
pub mod rest_client;
pub mod retry;
pub mod sessions;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

/// Default GitHub host (public GitHub)
pub const DEFAULT_HOST: &str = "github.com";

pub use cache_mode::CacheMode;
pub use client::{GitHubClient, RepoRef};
pub use credentials::{Credentials, TokenResolver, TokenSource};
pub use error::{GatewayError, RATE_LIMIT_MESSAGE};
pub use gateway::{Gateway, GatewayConfig, RequestOptions};
pub use octocrab_transport::{api_base_for_host, OctocrabTransport};
pub use rate_limit::RateLimitSignal;
pub use reqwest_transport::ReqwestTransport;
pub use rest_client::RestGitHubClient;
pub use retry::{RetryPolicy, RetryState};
pub use sessions::{NewSession, Session, SessionClient, SessionSource};
pub use transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
pub use types::{
    Branch, BranchRef, CheckRun, Comment, ContentEntry, IssueUpdate, Label, NewIssue, RawIssue,
    RawPullRequest, RepoContent, RepoStats, Review, StateFilter, User, Velocity, WorkflowJob,
    WorkflowRun,
};

// Re-export cache types for convenience
pub use gh_api_cache::{CacheStats, CacheStore};
