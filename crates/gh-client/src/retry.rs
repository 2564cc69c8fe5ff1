//! Retry policy for GET-like requests
//!
//! Connectivity failures and 5xx responses are retried with exponential
//! backoff; rate limits and other 4xx responses fail fast.

use std::time::Duration;

/// Outcome of one attempt, as seen by the retry state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response was received
    Connectivity,
    /// A 5xx response
    Protocol,
    /// 429, or 403 with an exhausted quota
    RateLimited,
    /// Any other 4xx
    Client,
}

impl FailureKind {
    /// Classify a non-success status code
    pub fn from_status(status: u16) -> Self {
        if status >= 500 {
            FailureKind::Protocol
        } else {
            FailureKind::Client
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureKind::Connectivity | FailureKind::Protocol)
    }
}

/// State of a request as it moves through its attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    /// Attempt `n` (1-based) is in flight
    Attempting(u32),
    Succeeded,
    /// Not retried: rate limit or client error
    FailedFast,
    /// All attempts used up
    FailedAfterRetries,
}

/// Backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Base delay after a 5xx response
    pub protocol_base_delay: Duration,
    /// Base delay after a connectivity failure
    pub connectivity_base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            protocol_base_delay: Duration::from_secs(1),
            connectivity_base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries (mutating requests)
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after failed attempt `attempt` (1-based)
    ///
    /// `base * 2^(max_attempts - retries_left)` where
    /// `retries_left = max_attempts - attempt`, so with the defaults the
    /// waits are `2·base` then `4·base`.
    pub fn backoff_delay(&self, kind: FailureKind, attempt: u32) -> Duration {
        let base = match kind {
            FailureKind::Connectivity => self.connectivity_base_delay,
            _ => self.protocol_base_delay,
        };
        let retries_left = self.max_attempts.saturating_sub(attempt);
        let exponent = self.max_attempts.saturating_sub(retries_left);
        base * 2u32.saturating_pow(exponent)
    }

    /// Next state after attempt `attempt` failed with `kind`
    pub fn after_failure(&self, kind: FailureKind, attempt: u32) -> RetryState {
        if !kind.is_retryable() {
            RetryState::FailedFast
        } else if attempt >= self.max_attempts {
            RetryState::FailedAfterRetries
        } else {
            RetryState::Attempting(attempt + 1)
        }
    }
}
