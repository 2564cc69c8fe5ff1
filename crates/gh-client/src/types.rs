//! GitHub API data transfer objects
//!
//! Field names follow the REST payloads so responses decode directly.
//! Optional and defaulted fields absorb the differences between list and
//! detail endpoints (the pulls list omits `mergeable`, `additions` etc.).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A GitHub account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub login: String,
}

/// An issue or pull request label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

/// Head or base of a pull request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    #[serde(rename = "ref")]
    pub ref_name: String,
    #[serde(default)]
    pub sha: String,
}

/// An issue as returned by the issues endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawIssue {
    pub id: u64,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub comments: u64,
    #[serde(default)]
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Present when the "issue" is really a pull request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<serde_json::Value>,
}

impl RawIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// A pull request snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPullRequest {
    pub id: u64,
    #[serde(default)]
    pub node_id: Option<String>,
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub user: Option<User>,
    pub head: BranchRef,
    pub base: BranchRef,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub html_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub draft: Option<bool>,
    /// `None` until GitHub has computed mergeability
    #[serde(default)]
    pub mergeable: Option<bool>,
    #[serde(default)]
    pub mergeable_state: Option<String>,
    #[serde(default)]
    pub changed_files: Option<u64>,
    #[serde(default)]
    pub additions: Option<u64>,
    #[serde(default)]
    pub deletions: Option<u64>,
}

impl RawPullRequest {
    /// Author login, or an empty string for deleted accounts
    pub fn author(&self) -> &str {
        self.user.as_ref().map(|u| u.login.as_str()).unwrap_or("")
    }
}

/// A branch from `/branches`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    #[serde(default)]
    pub protected: bool,
    #[serde(default)]
    pub commit: Option<BranchCommit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchCommit {
    pub sha: String,
}

/// An issue comment or a review comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub html_url: String,
    /// Review comments only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// A pull request review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    #[serde(default)]
    pub user: Option<User>,
    /// `APPROVED`, `CHANGES_REQUESTED`, `COMMENTED`, ...
    pub state: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

/// A CI check run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub name: String,
    /// `queued`, `in_progress` or `completed`
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl CheckRun {
    pub fn is_failure(&self) -> bool {
        matches!(self.conclusion.as_deref(), Some("failure" | "timed_out"))
    }

    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }
}

/// Envelope of `/commits/{ref}/check-runs`
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct CheckRunList {
    #[serde(default)]
    pub check_runs: Vec<CheckRun>,
}

/// A GitHub Actions workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub head_branch: Option<String>,
    #[serde(default)]
    pub head_sha: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub html_url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WorkflowRunList {
    #[serde(default)]
    pub workflow_runs: Vec<WorkflowRun>,
}

/// A job of a workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowJob {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct WorkflowJobList {
    #[serde(default)]
    pub jobs: Vec<WorkflowJob>,
}

/// Repository metadata used for stats
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct RepoMetadata {
    #[serde(default)]
    pub open_issues_count: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct SearchCount {
    #[serde(default)]
    pub total_count: u64,
}

/// Issues and pull requests opened and closed since a date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Velocity {
    pub since: NaiveDate,
    pub opened: u64,
    pub closed: u64,
}

/// One item of the repository contents API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    pub path: String,
    /// `file`, `dir`, `symlink` or `submodule`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Raw contents response: a listing for directories, one entry for files
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContentResponse {
    Directory(Vec<ContentEntry>),
    File(ContentEntry),
}

/// Repository content with file bodies decoded
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepoContent {
    File { path: String, text: String },
    Directory { entries: Vec<ContentEntry> },
}

/// Headline numbers of a repository
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoStats {
    /// Open issues, pull requests excluded
    pub open_issues: u64,
    pub open_pull_requests: u64,
    pub stars: u64,
    pub forks: u64,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Issue/PR state filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StateFilter {
    #[default]
    Open,
    Closed,
    All,
}

impl StateFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateFilter::Open => "open",
            StateFilter::Closed => "closed",
            StateFilter::All => "all",
        }
    }
}

impl std::fmt::Display for StateFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields of a new issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// Partial update of an issue; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
}

impl IssueUpdate {
    /// Update that closes the issue (or pull request)
    pub fn close() -> Self {
        Self {
            state: Some("closed".to_string()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_pull_request_list_item_decodes_without_detail_fields() {
        let pr: RawPullRequest = serde_json::from_value(json!({
            "id": 1,
            "node_id": "PR_kw1",
            "number": 42,
            "title": "Add feature",
            "state": "open",
            "user": {"login": "octocat"},
            "head": {"ref": "feature", "sha": "abc"},
            "base": {"ref": "main", "sha": "def"},
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-02T00:00:00Z"
        }))
        .unwrap();

        assert_eq!(pr.base.ref_name, "main");
        assert_eq!(pr.author(), "octocat");
        assert_eq!(pr.mergeable, None);
        assert_eq!(pr.changed_files, None);
    }

    #[test]
    fn test_check_run_failure_conclusions() {
        let run = |conclusion: Option<&str>| CheckRun {
            name: "ci".to_string(),
            status: "completed".to_string(),
            conclusion: conclusion.map(str::to_string),
            html_url: None,
        };
        assert!(run(Some("failure")).is_failure());
        assert!(run(Some("timed_out")).is_failure());
        assert!(!run(Some("success")).is_failure());
        assert!(!run(None).is_failure());
    }

    #[test]
    fn test_issue_update_serializes_only_set_fields() {
        assert_eq!(
            serde_json::to_value(IssueUpdate::close()).unwrap(),
            json!({"state": "closed"})
        );
    }

    #[test]
    fn test_new_issue_omits_missing_body() {
        let issue = NewIssue {
            title: "Flaky test".to_string(),
            ..NewIssue::default()
        };
        assert_eq!(
            serde_json::to_value(&issue).unwrap(),
            json!({"title": "Flaky test"})
        );
    }
}
