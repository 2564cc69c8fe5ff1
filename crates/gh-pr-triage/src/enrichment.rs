//! Pull request enrichment pipeline
//!
//! Turns raw pull requests into a decision-ready view. Work is bounded: only
//! the newest `max_items` pull requests are enriched, in batches of
//! `batch_size` concurrent tasks with a pause between batches.

use crate::mergeable_poll::{resolve_mergeable, PollConfig};
use crate::readiness::{
    default_protected_branches, is_approved, is_big, is_protected_branch, is_ready_to_merge,
};
use crate::test_status::{test_status_from_comments, TestStatus};
use gh_client::error::Result;
use gh_client::{CheckRun, GitHubClient, RawPullRequest, RepoRef, StateFilter};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// A pull request with derived triage fields
///
/// Derived fields are recomputed on every refresh and never stored on their
/// own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPullRequest {
    #[serde(flatten)]
    pub pull_request: RawPullRequest,
    pub test_status: TestStatus,
    pub is_big: bool,
    pub is_leader_branch: bool,
    pub is_ready_to_merge: bool,
    pub is_approved: bool,
    /// Check runs of the head commit
    pub check_results: Vec<CheckRun>,
    /// Why enrichment fell back to defaults
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enrichment_error: Option<String>,
}

impl EnrichedPullRequest {
    /// Derive all fields from a detailed snapshot and its review signals
    pub fn derive(
        pull_request: RawPullRequest,
        test_status: TestStatus,
        is_approved: bool,
        check_results: Vec<CheckRun>,
        protected: &[String],
    ) -> Self {
        let is_leader_branch = is_protected_branch(&pull_request.base.ref_name, protected);
        Self {
            is_approved,
            check_results,
            test_status,
            is_big: is_big(&pull_request),
            is_leader_branch,
            is_ready_to_merge: is_ready_to_merge(
                pull_request.mergeable,
                test_status,
                is_leader_branch,
            ),
            enrichment_error: None,
            pull_request,
        }
    }

    /// Raw fields with least-favorable derived values
    pub fn degraded(pull_request: RawPullRequest, error: impl Into<String>) -> Self {
        Self {
            pull_request,
            test_status: TestStatus::Unknown,
            is_big: false,
            is_leader_branch: false,
            is_ready_to_merge: false,
            is_approved: false,
            check_results: Vec::new(),
            enrichment_error: Some(error.into()),
        }
    }

    pub fn number(&self) -> u64 {
        self.pull_request.number
    }
}

/// Enrichment bounds and policy
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentConfig {
    /// Newest pull requests enriched per run
    pub max_items: usize,
    /// Concurrent enrichments per batch
    pub batch_size: usize,
    /// Pause between batches
    pub batch_pause: Duration,
    pub poll: PollConfig,
    /// Base branches needing passing tests before merge
    pub protected_branches: Vec<String>,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            max_items: 50,
            batch_size: 3,
            batch_pause: Duration::from_secs(1),
            poll: PollConfig::default(),
            protected_branches: default_protected_branches(),
        }
    }
}

/// Runs the enrichment pipeline against a client
#[derive(Clone)]
pub struct Enricher {
    client: Arc<dyn GitHubClient>,
    config: Arc<EnrichmentConfig>,
}

impl Enricher {
    pub fn new(client: Arc<dyn GitHubClient>, config: EnrichmentConfig) -> Self {
        Self {
            client,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &EnrichmentConfig {
        &self.config
    }

    /// Fetch open pull requests and enrich them
    ///
    /// Only a failing list fetch is an error; per-item failures degrade.
    pub async fn fetch_enriched_pull_requests(
        &self,
        repo: &RepoRef,
    ) -> Result<Vec<EnrichedPullRequest>> {
        let raw = self
            .client
            .fetch_pull_requests(repo, StateFilter::Open)
            .await?;
        info!("Enriching {} open pull requests of {}", raw.len(), repo);
        Ok(self.enrich(repo, raw).await)
    }

    /// Enrich the newest `max_items` pull requests, newest first
    pub async fn enrich(
        &self,
        repo: &RepoRef,
        mut raw: Vec<RawPullRequest>,
    ) -> Vec<EnrichedPullRequest> {
        raw.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        raw.truncate(self.config.max_items);

        let batch_size = self.config.batch_size.max(1);
        let batch_count = raw.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(raw.len());

        for (index, batch) in raw.chunks(batch_size).enumerate() {
            results.extend(self.enrich_batch(repo, batch).await);

            if index + 1 < batch_count {
                debug!(
                    "Enriched batch {}/{}, pausing {:?}",
                    index + 1,
                    batch_count,
                    self.config.batch_pause
                );
                tokio::time::sleep(self.config.batch_pause).await;
            }
        }

        results
    }

    async fn enrich_batch(
        &self,
        repo: &RepoRef,
        batch: &[RawPullRequest],
    ) -> Vec<EnrichedPullRequest> {
        let mut tasks = JoinSet::new();
        for (slot, pr) in batch.iter().cloned().enumerate() {
            let client = Arc::clone(&self.client);
            let config = Arc::clone(&self.config);
            let repo = repo.clone();
            tasks.spawn(async move { (slot, enrich_one(client.as_ref(), &repo, pr, &config).await) });
        }

        let mut slots: Vec<Option<EnrichedPullRequest>> = vec![None; batch.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, enriched)) => slots[slot] = Some(enriched),
                Err(e) => warn!("Enrichment task failed: {}", e),
            }
        }

        slots
            .into_iter()
            .zip(batch)
            .map(|(enriched, raw)| {
                enriched.unwrap_or_else(|| {
                    EnrichedPullRequest::degraded(raw.clone(), "enrichment task failed")
                })
            })
            .collect()
    }
}

async fn enrich_one(
    client: &dyn GitHubClient,
    repo: &RepoRef,
    pr: RawPullRequest,
    config: &EnrichmentConfig,
) -> EnrichedPullRequest {
    match try_enrich(client, repo, pr.number, config).await {
        Ok(enriched) => enriched,
        Err(e) => {
            warn!("Enrichment of PR #{} degraded: {}", pr.number, e);
            EnrichedPullRequest::degraded(pr, e.to_string())
        }
    }
}

async fn try_enrich(
    client: &dyn GitHubClient,
    repo: &RepoRef,
    number: u64,
    config: &EnrichmentConfig,
) -> Result<EnrichedPullRequest> {
    let detail = client.fetch_pull_request(repo, number, false).await?;
    let detail = resolve_mergeable(client, repo, detail, &config.poll).await;
    let (comments, reviews, check_results) = tokio::try_join!(
        client.fetch_issue_comments(repo, number),
        client.fetch_pull_request_reviews(repo, number),
        client.fetch_check_runs(repo, &detail.head.sha),
    )?;

    Ok(EnrichedPullRequest::derive(
        detail,
        test_status_from_comments(&comments),
        is_approved(&reviews),
        check_results,
        &config.protected_branches,
    ))
}
