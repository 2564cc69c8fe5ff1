//! Triage workflows for a single repository
//!
//! - [`enrichment`]: decision-ready pull request views (test status, size,
//!   target branch, merge readiness), fetched with bounded concurrency
//! - [`bulk`]: sequential execution of user-approved write operations with
//!   per-item status

pub mod bulk;
pub mod enrichment;
pub mod mergeable_poll;
pub mod readiness;
pub mod test_status;

#[cfg(test)]
mod test_support;

pub use bulk::{
    apply_repo_action, execute_bulk, pending_items, ActionRunner, BulkActionItem, BulkSummary,
    ItemStatus, RepoAction, RepoActionRunner,
};
pub use enrichment::{EnrichedPullRequest, Enricher, EnrichmentConfig};
pub use mergeable_poll::{resolve_mergeable, MergeablePoll, PollConfig};
pub use readiness::{
    default_protected_branches, is_approved, is_big, is_protected_branch, is_ready_to_merge,
};
pub use test_status::{classify_comment, test_status_from_comments, TestStatus};
