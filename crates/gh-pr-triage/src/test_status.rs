//! Test status from comment history
//!
//! CI bots and operators post status lines like "Tests failed" or "Build
//! succeeded". The newest comment carrying such a phrase decides the status.

use gh_client::Comment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// CI signal derived from comments
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    Pending,
    #[default]
    Unknown,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Pending => "pending",
            TestStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const FAILURE_PHRASES: &[&str] = &[
    "tests failed",
    "test failed",
    "build failed",
    "ci failed",
    "checks failed",
    "failing tests",
];

const SUCCESS_PHRASES: &[&str] = &[
    "tests passed",
    "all tests passed",
    "build success",
    "build succeeded",
    "ci passed",
    "checks passed",
];

const PENDING_PHRASES: &[&str] = &[
    "tests running",
    "build started",
    "ci running",
    "build pending",
];

/// Status announced by a single comment body, if any
///
/// Failure phrases win over success phrases, which win over pending ones.
pub fn classify_comment(body: &str) -> Option<TestStatus> {
    let body = body.to_lowercase();
    let mentions = |phrases: &[&str]| phrases.iter().any(|p| body.contains(p));

    if mentions(FAILURE_PHRASES) {
        Some(TestStatus::Failed)
    } else if mentions(SUCCESS_PHRASES) {
        Some(TestStatus::Passed)
    } else if mentions(PENDING_PHRASES) {
        Some(TestStatus::Pending)
    } else {
        None
    }
}

/// Status from the newest comment that announces one
pub fn test_status_from_comments(comments: &[Comment]) -> TestStatus {
    let mut newest_first: Vec<&Comment> = comments.iter().collect();
    newest_first.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    newest_first
        .into_iter()
        .filter_map(|c| c.body.as_deref().and_then(classify_comment))
        .next()
        .unwrap_or_default()
}
