//! Bulk action executor
//!
//! Applies a user-approved list of write operations one at a time. Each item
//! carries its own status, so a failed item never stops the run and a rerun
//! only retries what has not succeeded yet.

use async_trait::async_trait;
use gh_client::error::Result;
use gh_client::{GitHubClient, NewIssue, RepoRef};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Progress of one bulk item
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    #[default]
    Idle,
    Processing,
    Success,
    Error,
}

/// A proposed action and how far it got
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkActionItem<T> {
    pub action: T,
    pub status: ItemStatus,
    /// Last failure message, cleared on success
    pub error: Option<String>,
}

impl<T> BulkActionItem<T> {
    pub fn new(action: T) -> Self {
        Self {
            action,
            status: ItemStatus::Idle,
            error: None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == ItemStatus::Success
    }
}

/// Items still worth showing or running (everything not yet successful)
pub fn pending_items<T>(items: &[BulkActionItem<T>]) -> impl Iterator<Item = &BulkActionItem<T>> {
    items.iter().filter(|item| !item.is_done())
}

/// Outcome counts of one executor run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkSummary {
    pub succeeded: usize,
    pub failed: usize,
    /// Already successful before the run
    pub skipped: usize,
}

impl fmt::Display for BulkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// Maps an action to its upstream request
#[async_trait]
pub trait ActionRunner<T: Sync>: Send + Sync {
    async fn run(&self, action: &T) -> Result<()>;
}

/// Called with the item index after every status change
pub type ProgressObserver<'a, T> = &'a mut (dyn FnMut(usize, &BulkActionItem<T>) + Send);

/// Run every item that has not succeeded yet, strictly in order
///
/// Each item goes `processing` and then `success` or `error`; a failure is
/// recorded on the item and the run continues.
pub async fn execute_bulk<T: Sync>(
    items: &mut [BulkActionItem<T>],
    runner: &dyn ActionRunner<T>,
    mut observer: Option<ProgressObserver<'_, T>>,
) -> BulkSummary {
    let mut summary = BulkSummary::default();

    for (index, item) in items.iter_mut().enumerate() {
        if item.is_done() {
            summary.skipped += 1;
            continue;
        }

        item.status = ItemStatus::Processing;
        if let Some(notify) = observer.as_mut() {
            notify(index, item);
        }

        match runner.run(&item.action).await {
            Ok(()) => {
                item.status = ItemStatus::Success;
                item.error = None;
                summary.succeeded += 1;
            }
            Err(e) => {
                warn!("Bulk item {} failed: {}", index + 1, e);
                item.status = ItemStatus::Error;
                item.error = Some(e.to_string());
                summary.failed += 1;
            }
        }
        if let Some(notify) = observer.as_mut() {
            notify(index, item);
        }
    }

    info!("Bulk run finished: {}", summary);
    summary
}

/// Write operations the maintainer can approve in bulk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RepoAction {
    /// Close an issue, optionally explaining why first
    CloseIssue {
        number: u64,
        comment: Option<String>,
    },
    Comment {
        number: u64,
        body: String,
    },
    AddLabels {
        number: u64,
        labels: Vec<String>,
    },
    RemoveLabel {
        number: u64,
        label: String,
    },
    ClosePullRequest {
        number: u64,
    },
    DeleteBranch {
        branch: String,
    },
    /// Take a draft pull request out of draft
    PublishPullRequest {
        number: u64,
        node_id: Option<String>,
    },
    CreateIssue(NewIssue),
}

impl fmt::Display for RepoAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoAction::CloseIssue { number, .. } => write!(f, "close issue #{}", number),
            RepoAction::Comment { number, .. } => write!(f, "comment on #{}", number),
            RepoAction::AddLabels { number, labels } => {
                write!(f, "label #{} with {}", number, labels.join(", "))
            }
            RepoAction::RemoveLabel { number, label } => {
                write!(f, "remove label {} from #{}", label, number)
            }
            RepoAction::ClosePullRequest { number } => write!(f, "close pull request #{}", number),
            RepoAction::DeleteBranch { branch } => write!(f, "delete branch {}", branch),
            RepoAction::PublishPullRequest { number, .. } => {
                write!(f, "publish pull request #{}", number)
            }
            RepoAction::CreateIssue(issue) => write!(f, "create issue \"{}\"", issue.title),
        }
    }
}

/// Perform one action through the accessors
pub async fn apply_repo_action(
    client: &dyn GitHubClient,
    repo: &RepoRef,
    action: &RepoAction,
) -> Result<()> {
    match action {
        RepoAction::CloseIssue { number, comment } => {
            if let Some(body) = comment.as_deref().filter(|b| !b.trim().is_empty()) {
                client.add_comment(repo, *number, body).await?;
            }
            client.close_issue(repo, *number).await?;
        }
        RepoAction::Comment { number, body } => {
            client.add_comment(repo, *number, body).await?;
        }
        RepoAction::AddLabels { number, labels } => {
            client.add_labels(repo, *number, labels).await?;
        }
        RepoAction::RemoveLabel { number, label } => {
            client.remove_label(repo, *number, label).await?;
        }
        RepoAction::ClosePullRequest { number } => {
            client.close_pull_request(repo, *number).await?;
        }
        RepoAction::DeleteBranch { branch } => {
            client.delete_branch(repo, branch).await?;
        }
        RepoAction::PublishPullRequest { number, node_id } => {
            client
                .mark_ready_for_review(repo, *number, node_id.as_deref())
                .await?;
        }
        RepoAction::CreateIssue(issue) => {
            client.create_issue(repo, issue).await?;
        }
    }
    Ok(())
}

/// Runs [`RepoAction`]s against one repository
#[derive(Clone)]
pub struct RepoActionRunner {
    client: Arc<dyn GitHubClient>,
    repo: RepoRef,
}

impl RepoActionRunner {
    pub fn new(client: Arc<dyn GitHubClient>, repo: RepoRef) -> Self {
        Self { client, repo }
    }
}

#[async_trait]
impl ActionRunner<RepoAction> for RepoActionRunner {
    async fn run(&self, action: &RepoAction) -> Result<()> {
        apply_repo_action(self.client.as_ref(), &self.repo, action).await
    }
}
