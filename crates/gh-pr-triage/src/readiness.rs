//! Size, target-branch and merge-readiness derivations

use crate::test_status::TestStatus;
use gh_client::{RawPullRequest, Review};
use std::collections::HashMap;

/// A pull request touching more files than this is big
pub const BIG_CHANGED_FILES: u64 = 15;

/// A pull request adding more lines than this is big
pub const BIG_ADDITIONS: u64 = 500;

/// Branches that need explicit test evidence before merging
pub const DEFAULT_PROTECTED_BRANCHES: &[&str] = &["leader", "main", "master", "develop"];

pub fn default_protected_branches() -> Vec<String> {
    DEFAULT_PROTECTED_BRANCHES
        .iter()
        .map(|b| b.to_string())
        .collect()
}

pub fn is_big(pr: &RawPullRequest) -> bool {
    pr.changed_files.unwrap_or(0) > BIG_CHANGED_FILES || pr.additions.unwrap_or(0) > BIG_ADDITIONS
}

/// Case-insensitive membership in the protected set
pub fn is_protected_branch(base_ref: &str, protected: &[String]) -> bool {
    protected.iter().any(|b| b.eq_ignore_ascii_case(base_ref))
}

/// Approved by someone, with no reviewer still requesting changes
///
/// Each reviewer counts with their latest `APPROVED`, `CHANGES_REQUESTED`
/// or `DISMISSED` review; comments leave their standing unchanged.
/// `reviews` must be in submission order, as GitHub lists them.
pub fn is_approved(reviews: &[Review]) -> bool {
    let mut standing: HashMap<&str, &str> = HashMap::new();
    for review in reviews {
        let Some(user) = review.user.as_ref() else {
            continue;
        };
        if matches!(
            review.state.as_str(),
            "APPROVED" | "CHANGES_REQUESTED" | "DISMISSED"
        ) {
            standing.insert(user.login.as_str(), review.state.as_str());
        }
    }

    standing.values().any(|state| *state == "APPROVED")
        && !standing.values().any(|state| *state == "CHANGES_REQUESTED")
}

/// Merge readiness, evaluated in order:
///
/// 1. conflicts (`mergeable == Some(false)`) → not ready
/// 2. failed tests → not ready
/// 3. unprotected target → ready
/// 4. protected target → ready only with passing tests
pub fn is_ready_to_merge(
    mergeable: Option<bool>,
    test_status: TestStatus,
    targets_protected_branch: bool,
) -> bool {
    if mergeable == Some(false) {
        return false;
    }
    if test_status == TestStatus::Failed {
        return false;
    }
    if !targets_protected_branch {
        return true;
    }
    test_status == TestStatus::Passed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{pr, review};

    const ALL_STATUSES: [TestStatus; 4] = [
        TestStatus::Passed,
        TestStatus::Failed,
        TestStatus::Pending,
        TestStatus::Unknown,
    ];

    #[test]
    fn test_conflicts_are_never_ready() {
        for status in ALL_STATUSES {
            for protected in [true, false] {
                assert!(!is_ready_to_merge(Some(false), status, protected));
            }
        }
    }

    #[test]
    fn test_failed_tests_are_never_ready() {
        for mergeable in [Some(true), None] {
            for protected in [true, false] {
                assert!(!is_ready_to_merge(mergeable, TestStatus::Failed, protected));
            }
        }
    }

    #[test]
    fn test_readiness_table() {
        let protected = default_protected_branches();
        let cases = [
            (Some(true), TestStatus::Passed, "feature", true),
            (Some(true), TestStatus::Unknown, "feature", true),
            (Some(true), TestStatus::Pending, "feature", true),
            (Some(true), TestStatus::Unknown, "main", false),
            (Some(true), TestStatus::Pending, "main", false),
            (Some(true), TestStatus::Passed, "main", true),
            (Some(true), TestStatus::Passed, "MAIN", true),
            (None, TestStatus::Passed, "leader", true),
            (None, TestStatus::Unknown, "leader", false),
            (None, TestStatus::Unknown, "feature", true),
        ];

        for (mergeable, status, base, expected) in cases {
            let targets_protected = is_protected_branch(base, &protected);
            assert_eq!(
                is_ready_to_merge(mergeable, status, targets_protected),
                expected,
                "mergeable={:?} status={} base={}",
                mergeable,
                status,
                base
            );
        }
    }

    #[test]
    fn test_is_big_thresholds() {
        let sized = |changed_files: Option<u64>, additions: Option<u64>| RawPullRequest {
            changed_files,
            additions,
            ..pr(1, "main", 0)
        };
        assert!(!is_big(&sized(Some(15), Some(500))));
        assert!(is_big(&sized(Some(16), Some(0))));
        assert!(is_big(&sized(Some(1), Some(501))));
        assert!(!is_big(&sized(None, None)));
    }

    #[test]
    fn test_protected_branch_match_is_case_insensitive() {
        let protected = default_protected_branches();
        assert!(is_protected_branch("Develop", &protected));
        assert!(is_protected_branch("leader", &protected));
        assert!(!is_protected_branch("release/1.0", &protected));
    }

    #[test]
    fn test_latest_review_per_user_decides_approval() {
        assert!(!is_approved(&[]));
        assert!(is_approved(&[review("alice", "APPROVED")]));
        assert!(!is_approved(&[
            review("alice", "APPROVED"),
            review("bob", "CHANGES_REQUESTED"),
        ]));
        assert!(is_approved(&[
            review("bob", "CHANGES_REQUESTED"),
            review("alice", "APPROVED"),
            review("bob", "APPROVED"),
        ]));
        assert!(is_approved(&[
            review("alice", "APPROVED"),
            review("alice", "COMMENTED"),
        ]));
        assert!(!is_approved(&[
            review("alice", "APPROVED"),
            review("alice", "DISMISSED"),
        ]));
    }
}
