//! GitHub client trait and repository reference
//!
//! `GitHubClient` is the seam between the accessors and their consumers
//! (enrichment, bulk actions, CLI). Tests substitute hand-written fakes.

use crate::error::{GatewayError, Result};
use crate::types::{
    Branch, CheckRun, Comment, IssueUpdate, Label, NewIssue, RawIssue, RawPullRequest,
    RepoContent, RepoStats, Review, StateFilter, Velocity, WorkflowJob, WorkflowRun,
};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// An `owner/name` repository reference
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// `/repos/{owner}/{name}`
    pub fn api_path(&self) -> String {
        format!("/repos/{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = GatewayError;

    /// Accepts `owner/name` and GitHub URLs such as
    /// `https://github.com/owner/name.git`
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            GatewayError::InvalidRequest(format!(
                "invalid repository '{}', expected owner/name",
                s
            ))
        };

        let trimmed = s.trim();
        let segments: Vec<String> = if trimmed.contains("://") {
            let parsed = Url::parse(trimmed).map_err(|_| invalid())?;
            parsed
                .path_segments()
                .ok_or_else(invalid)?
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            trimmed
                .split('/')
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        };

        match segments.as_slice() {
            [owner, name] => {
                let name = name.strip_suffix(".git").unwrap_or(name);
                if name.is_empty() {
                    return Err(invalid());
                }
                Ok(RepoRef::new(owner.as_str(), name))
            }
            _ => Err(invalid()),
        }
    }
}

/// GitHub API client trait
///
/// Implementations must be `Send + Sync` so one client can be shared by
/// concurrently enriched pull requests.
#[async_trait]
pub trait GitHubClient: Send + Sync {
    // === Reads ===

    /// Star, fork and open issue/PR counts
    async fn fetch_repo_stats(&self, repo: &RepoRef) -> Result<RepoStats>;

    /// Issues in `state`, pull requests excluded
    async fn fetch_issues(&self, repo: &RepoRef, state: StateFilter) -> Result<Vec<RawIssue>>;

    async fn fetch_pull_requests(
        &self,
        repo: &RepoRef,
        state: StateFilter,
    ) -> Result<Vec<RawPullRequest>>;

    /// Full pull request detail (`mergeable`, `additions`, ...)
    ///
    /// `fresh` bypasses the cache, which is needed while GitHub is still
    /// computing mergeability.
    async fn fetch_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
        fresh: bool,
    ) -> Result<RawPullRequest>;

    /// Unified diff of a pull request (never cached)
    async fn fetch_pull_request_diff(&self, repo: &RepoRef, number: u64) -> Result<String>;

    async fn fetch_pull_request_reviews(&self, repo: &RepoRef, number: u64) -> Result<Vec<Review>>;

    /// Conversation comments of an issue or pull request, oldest first
    ///
    /// Follows pagination up to a fixed page ceiling.
    async fn fetch_issue_comments(&self, repo: &RepoRef, number: u64) -> Result<Vec<Comment>>;

    /// Line comments of a pull request review
    async fn fetch_review_comments(&self, repo: &RepoRef, number: u64) -> Result<Vec<Comment>>;

    async fn fetch_check_runs(&self, repo: &RepoRef, git_ref: &str) -> Result<Vec<CheckRun>>;

    async fn fetch_workflow_runs(&self, repo: &RepoRef) -> Result<Vec<WorkflowRun>>;

    async fn fetch_workflow_run_jobs(&self, repo: &RepoRef, run_id: u64)
        -> Result<Vec<WorkflowJob>>;

    /// All branches, following pagination up to a fixed page ceiling
    async fn fetch_branches(&self, repo: &RepoRef) -> Result<Vec<Branch>>;

    /// Issues and pull requests opened and closed after `since`
    async fn fetch_velocity(&self, repo: &RepoRef, since: NaiveDate) -> Result<Velocity>;

    /// Velocity over the last `days` days (UTC)
    async fn fetch_recent_velocity(&self, repo: &RepoRef, days: u32) -> Result<Velocity> {
        let since = (Utc::now() - Duration::days(days.into())).date_naive();
        self.fetch_velocity(repo, since).await
    }

    /// A file (decoded) or directory listing; `None` when the path does not exist
    async fn fetch_repo_content(&self, repo: &RepoRef, path: &str) -> Result<Option<RepoContent>>;

    // === Writes ===

    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<RawIssue>;

    async fn update_issue(
        &self,
        repo: &RepoRef,
        number: u64,
        update: &IssueUpdate,
    ) -> Result<RawIssue>;

    async fn close_issue(&self, repo: &RepoRef, number: u64) -> Result<RawIssue> {
        self.update_issue(repo, number, &IssueUpdate::close()).await
    }

    async fn add_labels(&self, repo: &RepoRef, number: u64, labels: &[String])
        -> Result<Vec<Label>>;

    async fn remove_label(&self, repo: &RepoRef, number: u64, label: &str) -> Result<()>;

    async fn add_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<Comment>;

    async fn close_pull_request(&self, repo: &RepoRef, number: u64) -> Result<()>;

    /// Delete `refs/heads/{branch}`
    async fn delete_branch(&self, repo: &RepoRef, branch: &str) -> Result<()>;

    /// Take a draft pull request out of draft
    ///
    /// Looks the node id up when `node_id` is `None`.
    async fn mark_ready_for_review(
        &self,
        repo: &RepoRef,
        number: u64,
        node_id: Option<&str>,
    ) -> Result<()>;
}
