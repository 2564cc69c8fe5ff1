//! Polling for GitHub's asynchronously computed `mergeable` field
//!
//! GitHub answers `mergeable: null` until a background job has test-merged
//! the pull request. The poll re-reads the pull request (bypassing the cache)
//! a bounded number of times and otherwise leaves the value unknown.

use gh_client::{GitHubClient, RawPullRequest, RepoRef};
use log::{debug, warn};
use std::time::Duration;

/// Poll bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Fresh re-reads before giving up
    pub max_attempts: u32,
    /// Wait before each re-read
    pub delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// Where the mergeability lookup stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeablePoll {
    /// Nothing observed yet
    Unknown,
    /// Still `null` after `n` fresh re-reads
    Polling(u32),
    Resolved(bool),
    GaveUp,
}

impl MergeablePoll {
    /// Fold in one observation of the `mergeable` field
    ///
    /// The first observation (from the initial read) moves `Unknown` on;
    /// every later one counts as a re-read.
    pub fn advance(self, observed: Option<bool>, max_attempts: u32) -> Self {
        match (self, observed) {
            (MergeablePoll::Resolved(_) | MergeablePoll::GaveUp, _) => self,
            (_, Some(mergeable)) => MergeablePoll::Resolved(mergeable),
            (MergeablePoll::Unknown, None) if max_attempts == 0 => MergeablePoll::GaveUp,
            (MergeablePoll::Unknown, None) => MergeablePoll::Polling(0),
            (MergeablePoll::Polling(n), None) if n + 1 >= max_attempts => MergeablePoll::GaveUp,
            (MergeablePoll::Polling(n), None) => MergeablePoll::Polling(n + 1),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MergeablePoll::Resolved(_) | MergeablePoll::GaveUp)
    }

    /// Known mergeability (`None` while polling or after giving up)
    pub fn mergeable(&self) -> Option<bool> {
        match self {
            MergeablePoll::Resolved(mergeable) => Some(*mergeable),
            _ => None,
        }
    }
}

/// Re-read `pr` until `mergeable` is known or the poll gives up
///
/// Returns the latest snapshot read. A failed re-read counts as another
/// `null` observation and keeps the previous snapshot.
pub async fn resolve_mergeable(
    client: &dyn GitHubClient,
    repo: &RepoRef,
    pr: RawPullRequest,
    config: &PollConfig,
) -> RawPullRequest {
    let number = pr.number;
    let mut current = pr;
    let mut state = MergeablePoll::Unknown.advance(current.mergeable, config.max_attempts);

    while !state.is_terminal() {
        tokio::time::sleep(config.delay).await;
        let observed = match client.fetch_pull_request(repo, number, true).await {
            Ok(fresh) => {
                current = fresh;
                current.mergeable
            }
            Err(e) => {
                warn!("PR #{} mergeable re-read failed: {}", number, e);
                None
            }
        };
        state = state.advance(observed, config.max_attempts);
        debug!("PR #{} mergeable poll: {:?}", number, state);
    }

    current
}
