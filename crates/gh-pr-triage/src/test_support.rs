//! In-memory `GitHubClient` for enrichment and bulk tests

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use gh_client::error::Result;
use gh_client::{
    Branch, BranchRef, CheckRun, Comment, GatewayError, GitHubClient, IssueUpdate, Label,
    NewIssue, RawIssue, RawPullRequest, RepoContent, RepoRef, RepoStats, Review, StateFilter,
    User, Velocity, WorkflowJob, WorkflowRun,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Pull request `number` created `age_hours` before a fixed instant
pub(crate) fn pr(number: u64, base: &str, age_hours: i64) -> RawPullRequest {
    let created = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap() - ChronoDuration::hours(age_hours);
    RawPullRequest {
        id: number,
        node_id: Some(format!("PR_{}", number)),
        number,
        title: format!("PR {}", number),
        body: None,
        state: "open".to_string(),
        user: Some(User {
            login: "octocat".to_string(),
        }),
        head: BranchRef {
            ref_name: format!("feature-{}", number),
            sha: format!("sha{}", number),
        },
        base: BranchRef {
            ref_name: base.to_string(),
            sha: String::new(),
        },
        labels: vec![],
        html_url: String::new(),
        created_at: created,
        updated_at: created,
        draft: Some(false),
        mergeable: None,
        mergeable_state: None,
        changed_files: None,
        additions: None,
        deletions: None,
    }
}

pub(crate) fn comment(id: u64, age_hours: i64, body: &str) -> Comment {
    Comment {
        id,
        body: Some(body.to_string()),
        user: None,
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
            - ChronoDuration::hours(age_hours),
        html_url: String::new(),
        path: None,
    }
}

pub(crate) fn review(login: &str, state: &str) -> Review {
    Review {
        id: 0,
        user: Some(User {
            login: login.to_string(),
        }),
        state: state.to_string(),
        body: None,
        submitted_at: None,
    }
}

pub(crate) fn check_run(name: &str, status: &str, conclusion: Option<&str>) -> CheckRun {
    CheckRun {
        name: name.to_string(),
        status: status.to_string(),
        conclusion: conclusion.map(str::to_string),
        html_url: None,
    }
}

fn not_found() -> GatewayError {
    GatewayError::Api {
        status: 404,
        message: "Not Found".to_string(),
    }
}

/// Scripted GitHub
///
/// Detail reads answer from a per-PR queue whose last element sticks, and
/// fall back to the listed pull request. Every call is recorded.
#[derive(Default)]
pub(crate) struct FakeGitHub {
    pub pull_requests: Mutex<Vec<RawPullRequest>>,
    pub list_error: Mutex<Option<GatewayError>>,
    pub details: Mutex<HashMap<u64, VecDeque<RawPullRequest>>>,
    pub comments: Mutex<HashMap<u64, Vec<Comment>>>,
    pub reviews: Mutex<HashMap<u64, Vec<Review>>>,
    /// Check runs by head sha
    pub check_runs: Mutex<HashMap<String, Vec<CheckRun>>>,
    pub failing_checks: Mutex<HashSet<String>>,
    pub failing_details: Mutex<HashSet<u64>>,
    /// `(number, n)`: the n-th fresh read of that pull request fails
    pub failing_fresh_reads: Mutex<HashSet<(u64, usize)>>,
    pub failing_comments: Mutex<HashSet<u64>>,
    /// Issue/PR numbers or branch names whose writes fail
    pub failing_writes: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<String>>,
    pub latency: Option<Duration>,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl FakeGitHub {
    pub(crate) fn with_pull_requests(prs: Vec<RawPullRequest>) -> Self {
        Self {
            pull_requests: Mutex::new(prs),
            ..Self::default()
        }
    }

    /// Detail reads take `latency` (to observe overlap)
    pub(crate) fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub(crate) fn script_details(&self, number: u64, details: Vec<RawPullRequest>) {
        self.details
            .lock()
            .unwrap()
            .insert(number, details.into_iter().collect());
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count_calls(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn write(&self, call: String, key: &str) -> Result<()> {
        self.record(call);
        if self.failing_writes.lock().unwrap().contains(key) {
            return Err(GatewayError::Api {
                status: 422,
                message: "Validation Failed".to_string(),
            });
        }
        Ok(())
    }

    fn issue(number: u64, state: &str) -> RawIssue {
        let now = Utc::now();
        RawIssue {
            id: number,
            number,
            title: format!("Issue {}", number),
            body: None,
            state: state.to_string(),
            user: None,
            labels: vec![],
            comments: 0,
            html_url: String::new(),
            created_at: now,
            updated_at: now,
            pull_request: None,
        }
    }
}

#[async_trait]
impl GitHubClient for FakeGitHub {
    async fn fetch_repo_stats(&self, _repo: &RepoRef) -> Result<RepoStats> {
        Ok(RepoStats::default())
    }

    async fn fetch_issues(&self, _repo: &RepoRef, _state: StateFilter) -> Result<Vec<RawIssue>> {
        Ok(vec![])
    }

    async fn fetch_pull_requests(
        &self,
        _repo: &RepoRef,
        _state: StateFilter,
    ) -> Result<Vec<RawPullRequest>> {
        self.record("fetch_pull_requests".to_string());
        if let Some(err) = self.list_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.pull_requests.lock().unwrap().clone())
    }

    async fn fetch_pull_request(
        &self,
        _repo: &RepoRef,
        number: u64,
        fresh: bool,
    ) -> Result<RawPullRequest> {
        self.record(format!("fetch_pull_request #{} fresh={}", number, fresh));

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_details.lock().unwrap().contains(&number) {
            return Err(GatewayError::Network("connection reset".to_string()));
        }
        if fresh {
            let nth = self.count_calls(&format!("fetch_pull_request #{} fresh=true", number));
            if self.failing_fresh_reads.lock().unwrap().contains(&(number, nth)) {
                return Err(GatewayError::Network("connection reset".to_string()));
            }
        }

        let scripted = {
            let mut details = self.details.lock().unwrap();
            details.get_mut(&number).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };
        if let Some(detail) = scripted {
            return Ok(detail);
        }

        self.pull_requests
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.number == number)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn fetch_pull_request_diff(&self, _repo: &RepoRef, _number: u64) -> Result<String> {
        Ok(String::new())
    }

    async fn fetch_pull_request_reviews(
        &self,
        _repo: &RepoRef,
        number: u64,
    ) -> Result<Vec<Review>> {
        self.record(format!("fetch_pull_request_reviews #{}", number));
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_issue_comments(&self, _repo: &RepoRef, number: u64) -> Result<Vec<Comment>> {
        self.record(format!("fetch_issue_comments #{}", number));
        if self.failing_comments.lock().unwrap().contains(&number) {
            return Err(GatewayError::Decode("expected a sequence".to_string()));
        }
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_review_comments(&self, _repo: &RepoRef, _number: u64) -> Result<Vec<Comment>> {
        Ok(vec![])
    }

    async fn fetch_check_runs(&self, _repo: &RepoRef, git_ref: &str) -> Result<Vec<CheckRun>> {
        self.record(format!("fetch_check_runs {}", git_ref));
        if self.failing_checks.lock().unwrap().contains(git_ref) {
            return Err(GatewayError::RateLimited);
        }
        Ok(self
            .check_runs
            .lock()
            .unwrap()
            .get(git_ref)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_workflow_runs(&self, _repo: &RepoRef) -> Result<Vec<WorkflowRun>> {
        Ok(vec![])
    }

    async fn fetch_workflow_run_jobs(
        &self,
        _repo: &RepoRef,
        _run_id: u64,
    ) -> Result<Vec<WorkflowJob>> {
        Ok(vec![])
    }

    async fn fetch_branches(&self, _repo: &RepoRef) -> Result<Vec<Branch>> {
        Ok(vec![])
    }

    async fn fetch_velocity(&self, _repo: &RepoRef, since: NaiveDate) -> Result<Velocity> {
        Ok(Velocity {
            since,
            opened: 0,
            closed: 0,
        })
    }

    async fn fetch_repo_content(
        &self,
        _repo: &RepoRef,
        _path: &str,
    ) -> Result<Option<RepoContent>> {
        Ok(None)
    }

    async fn create_issue(&self, _repo: &RepoRef, issue: &NewIssue) -> Result<RawIssue> {
        self.write(format!("create_issue {}", issue.title), &issue.title)?;
        Ok(Self::issue(100, "open"))
    }

    async fn update_issue(
        &self,
        _repo: &RepoRef,
        number: u64,
        update: &IssueUpdate,
    ) -> Result<RawIssue> {
        self.write(
            format!("update_issue #{} {:?}", number, update.state),
            &number.to_string(),
        )?;
        Ok(Self::issue(number, update.state.as_deref().unwrap_or("open")))
    }

    async fn add_labels(
        &self,
        _repo: &RepoRef,
        number: u64,
        labels: &[String],
    ) -> Result<Vec<Label>> {
        self.write(
            format!("add_labels #{} {}", number, labels.join(",")),
            &number.to_string(),
        )?;
        Ok(labels
            .iter()
            .map(|name| Label {
                name: name.clone(),
                color: None,
            })
            .collect())
    }

    async fn remove_label(&self, _repo: &RepoRef, number: u64, label: &str) -> Result<()> {
        self.write(
            format!("remove_label #{} {}", number, label),
            &number.to_string(),
        )
    }

    async fn add_comment(&self, _repo: &RepoRef, number: u64, body: &str) -> Result<Comment> {
        self.write(format!("add_comment #{} {}", number, body), &number.to_string())?;
        Ok(comment(1, 0, body))
    }

    async fn close_pull_request(&self, _repo: &RepoRef, number: u64) -> Result<()> {
        self.write(format!("close_pull_request #{}", number), &number.to_string())
    }

    async fn delete_branch(&self, _repo: &RepoRef, branch: &str) -> Result<()> {
        self.write(format!("delete_branch {}", branch), branch)
    }

    async fn mark_ready_for_review(
        &self,
        _repo: &RepoRef,
        number: u64,
        node_id: Option<&str>,
    ) -> Result<()> {
        self.write(
            format!("mark_ready_for_review #{} {:?}", number, node_id),
            &number.to_string(),
        )
    }
}
