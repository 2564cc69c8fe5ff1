//! REST implementation of [`GitHubClient`] on top of the gateway

use crate::client::{GitHubClient, RepoRef};
use crate::error::{GatewayError, Result};
use crate::gateway::{Gateway, RequestOptions};
use crate::graphql;
use crate::octocrab_transport::GITHUB_DIFF_ACCEPT;
use crate::types::{
    Branch, CheckRun, CheckRunList, Comment, ContentEntry, ContentResponse, IssueUpdate, Label,
    NewIssue, RawIssue, RawPullRequest, RepoContent, RepoMetadata, RepoStats, Review,
    SearchCount, StateFilter, Velocity, WorkflowJob, WorkflowJobList, WorkflowRun,
    WorkflowRunList,
};
use async_trait::async_trait;
use base64::Engine;
use chrono::NaiveDate;
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::{form_urlencoded, Url};

/// Page size for paginated listings
pub const PAGE_SIZE: usize = 100;

/// Pagination stops after this many pages even if more exist
pub const MAX_PAGES: usize = 10;

/// Workflow runs fetched per listing
pub const WORKFLOW_RUNS_PER_PAGE: usize = 50;

/// GitHub REST client
#[derive(Debug, Clone)]
pub struct RestGitHubClient {
    gateway: Gateway,
}

impl RestGitHubClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.gateway.request(endpoint, RequestOptions::get()).await
    }

    /// Follow `page=1..` until a short page or [`MAX_PAGES`]
    ///
    /// `endpoint` must not carry a query string.
    async fn get_paged<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();

        for page in 1..=MAX_PAGES {
            let paged = format!("{}?per_page={}&page={}", endpoint, PAGE_SIZE, page);
            let batch: Vec<T> = self.get(&paged).await?;
            let short_page = batch.len() < PAGE_SIZE;
            items.extend(batch);

            if short_page {
                return Ok(items);
            }
        }

        info!(
            "Stopped following {} after {} pages ({} items)",
            endpoint,
            MAX_PAGES,
            items.len()
        );
        Ok(items)
    }

    async fn search_count(&self, query: &str) -> Result<u64> {
        let endpoint = format!("/search/issues?q={}&per_page=1", encode_query(query));
        let count: SearchCount = self.get(&endpoint).await?;
        Ok(count.total_count)
    }
}

fn encode_query(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Text of a file entry from the contents API
pub fn decode_content(entry: &ContentEntry) -> Result<String> {
    let content = match (entry.encoding.as_deref(), entry.content.as_deref()) {
        (Some("base64"), Some(content)) => content,
        _ => {
            return Err(GatewayError::Decode(format!(
                "{} has no inline base64 content",
                entry.path
            )))
        }
    };

    // GitHub wraps the encoded body at 60 columns
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| GatewayError::Decode(format!("{}: {}", entry.path, e)))?;
    String::from_utf8(bytes).map_err(|e| GatewayError::Decode(format!("{}: {}", entry.path, e)))
}

/// Percent-encode each `/`-separated segment, keeping the separators
pub fn encode_path_segments(path: &str) -> Result<String> {
    encode_segments(path.split('/'))
}

/// Percent-encode `segment` as a single path segment (`/` included)
pub fn encode_path_segment(segment: &str) -> Result<String> {
    encode_segments([segment])
}

fn encode_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> Result<String> {
    let mut url = Url::parse("https://api.github.com/")
        .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| GatewayError::InvalidRequest("cannot encode path".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.path().trim_start_matches('/').to_string())
}

#[async_trait]
impl GitHubClient for RestGitHubClient {
    async fn fetch_repo_stats(&self, repo: &RepoRef) -> Result<RepoStats> {
        let metadata: RepoMetadata = self.get(&repo.api_path()).await?;

        // open_issues_count includes pull requests; subtract them when the
        // search endpoint cooperates
        let search = format!("/search/issues?q=repo:{}+type:pr+state:open&per_page=1", repo);
        let open_pull_requests = match self.get::<SearchCount>(&search).await {
            Ok(count) => count.total_count,
            Err(e) => {
                debug!("Open PR count unavailable for {}: {}", repo, e);
                0
            }
        };

        Ok(RepoStats {
            open_issues: metadata
                .open_issues_count
                .saturating_sub(open_pull_requests),
            open_pull_requests,
            stars: metadata.stargazers_count,
            forks: metadata.forks_count,
            last_updated: metadata.updated_at,
        })
    }

    async fn fetch_issues(&self, repo: &RepoRef, state: StateFilter) -> Result<Vec<RawIssue>> {
        let endpoint = format!(
            "{}/issues?state={}&per_page={}",
            repo.api_path(),
            state,
            PAGE_SIZE
        );
        let items: Vec<RawIssue> = self.get(&endpoint).await?;
        Ok(items
            .into_iter()
            .filter(|item| !item.is_pull_request())
            .collect())
    }

    async fn fetch_pull_requests(
        &self,
        repo: &RepoRef,
        state: StateFilter,
    ) -> Result<Vec<RawPullRequest>> {
        let endpoint = format!(
            "{}/pulls?state={}&per_page={}",
            repo.api_path(),
            state,
            PAGE_SIZE
        );
        self.get(&endpoint).await
    }

    async fn fetch_pull_request(
        &self,
        repo: &RepoRef,
        number: u64,
        fresh: bool,
    ) -> Result<RawPullRequest> {
        let endpoint = format!("{}/pulls/{}", repo.api_path(), number);
        self.gateway
            .request(&endpoint, RequestOptions::get().fresh_if(fresh))
            .await
    }

    async fn fetch_pull_request_diff(&self, repo: &RepoRef, number: u64) -> Result<String> {
        let endpoint = format!("{}/pulls/{}", repo.api_path(), number);
        self.gateway
            .request_text(&endpoint, RequestOptions::get().accept(GITHUB_DIFF_ACCEPT))
            .await
    }

    async fn fetch_pull_request_reviews(&self, repo: &RepoRef, number: u64) -> Result<Vec<Review>> {
        self.get(&format!("{}/pulls/{}/reviews", repo.api_path(), number))
            .await
    }

    async fn fetch_issue_comments(&self, repo: &RepoRef, number: u64) -> Result<Vec<Comment>> {
        self.get_paged(&format!("{}/issues/{}/comments", repo.api_path(), number))
            .await
    }

    async fn fetch_review_comments(&self, repo: &RepoRef, number: u64) -> Result<Vec<Comment>> {
        self.get(&format!("{}/pulls/{}/comments", repo.api_path(), number))
            .await
    }

    async fn fetch_check_runs(&self, repo: &RepoRef, git_ref: &str) -> Result<Vec<CheckRun>> {
        let endpoint = format!(
            "{}/commits/{}/check-runs",
            repo.api_path(),
            encode_path_segments(git_ref)?
        );
        let list: CheckRunList = self.get(&endpoint).await?;
        Ok(list.check_runs)
    }

    async fn fetch_workflow_runs(&self, repo: &RepoRef) -> Result<Vec<WorkflowRun>> {
        let endpoint = format!(
            "{}/actions/runs?per_page={}",
            repo.api_path(),
            WORKFLOW_RUNS_PER_PAGE
        );
        let list: WorkflowRunList = self.get(&endpoint).await?;
        Ok(list.workflow_runs)
    }

    async fn fetch_workflow_run_jobs(
        &self,
        repo: &RepoRef,
        run_id: u64,
    ) -> Result<Vec<WorkflowJob>> {
        let endpoint = format!("{}/actions/runs/{}/jobs", repo.api_path(), run_id);
        let list: WorkflowJobList = self.get(&endpoint).await?;
        Ok(list.jobs)
    }

    async fn fetch_branches(&self, repo: &RepoRef) -> Result<Vec<Branch>> {
        self.get_paged(&format!("{}/branches", repo.api_path())).await
    }

    async fn fetch_velocity(&self, repo: &RepoRef, since: NaiveDate) -> Result<Velocity> {
        let day = since.format("%Y-%m-%d");
        let opened = self
            .search_count(&format!("repo:{} created:>{}", repo, day))
            .await?;
        let closed = self
            .search_count(&format!("repo:{} closed:>{}", repo, day))
            .await?;
        Ok(Velocity {
            since,
            opened,
            closed,
        })
    }

    async fn fetch_repo_content(&self, repo: &RepoRef, path: &str) -> Result<Option<RepoContent>> {
        let endpoint = format!(
            "{}/contents/{}",
            repo.api_path(),
            encode_path_segments(path.trim_matches('/'))?
        );
        let response = match self.get::<ContentResponse>(&endpoint).await {
            Ok(response) => response,
            Err(e) if e.status() == Some(404) => return Ok(None),
            Err(e) => return Err(e),
        };

        let content = match response {
            ContentResponse::Directory(entries) => RepoContent::Directory { entries },
            ContentResponse::File(entry) => RepoContent::File {
                text: decode_content(&entry)?,
                path: entry.path,
            },
        };
        Ok(Some(content))
    }

    async fn create_issue(&self, repo: &RepoRef, issue: &NewIssue) -> Result<RawIssue> {
        let body = serde_json::to_value(issue).map_err(|e| GatewayError::Decode(e.to_string()))?;
        self.gateway
            .request(
                &format!("{}/issues", repo.api_path()),
                RequestOptions::post(body),
            )
            .await
    }

    async fn update_issue(
        &self,
        repo: &RepoRef,
        number: u64,
        update: &IssueUpdate,
    ) -> Result<RawIssue> {
        let body = serde_json::to_value(update).map_err(|e| GatewayError::Decode(e.to_string()))?;
        self.gateway
            .request(
                &format!("{}/issues/{}", repo.api_path(), number),
                RequestOptions::patch(body),
            )
            .await
    }

    async fn add_labels(
        &self,
        repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<Vec<Label>> {
        self.gateway
            .request(
                &format!("{}/issues/{}/labels", repo.api_path(), number),
                RequestOptions::post(json!({ "labels": labels })),
            )
            .await
    }

    async fn remove_label(&self, repo: &RepoRef, number: u64, label: &str) -> Result<()> {
        let endpoint = format!(
            "{}/issues/{}/labels/{}",
            repo.api_path(),
            number,
            encode_path_segment(label)?
        );
        self.gateway
            .request::<Value>(&endpoint, RequestOptions::delete())
            .await?;
        Ok(())
    }

    async fn add_comment(&self, repo: &RepoRef, number: u64, body: &str) -> Result<Comment> {
        self.gateway
            .request(
                &format!("{}/issues/{}/comments", repo.api_path(), number),
                RequestOptions::post(json!({ "body": body })),
            )
            .await
    }

    async fn close_pull_request(&self, repo: &RepoRef, number: u64) -> Result<()> {
        self.gateway
            .request::<Value>(
                &format!("{}/pulls/{}", repo.api_path(), number),
                RequestOptions::patch(json!({ "state": "closed" })),
            )
            .await?;
        Ok(())
    }

    async fn delete_branch(&self, repo: &RepoRef, branch: &str) -> Result<()> {
        let endpoint = format!(
            "{}/git/refs/heads/{}",
            repo.api_path(),
            encode_path_segments(branch)?
        );
        self.gateway
            .request::<Value>(&endpoint, RequestOptions::delete())
            .await?;
        Ok(())
    }

    async fn mark_ready_for_review(
        &self,
        repo: &RepoRef,
        number: u64,
        node_id: Option<&str>,
    ) -> Result<()> {
        let node_id = match node_id {
            Some(id) => id.to_string(),
            None => self
                .fetch_pull_request(repo, number, false)
                .await?
                .node_id
                .ok_or_else(|| {
                    GatewayError::InvalidRequest(format!("pull request #{} has no node id", number))
                })?,
        };
        graphql::mark_ready_for_review(&self.gateway, &node_id).await?;
        Ok(())
    }
}
