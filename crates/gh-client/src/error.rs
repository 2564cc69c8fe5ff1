//! Error taxonomy for gateway calls

use thiserror::Error;

/// User-facing message for rate-limited requests
pub const RATE_LIMIT_MESSAGE: &str = "GitHub API rate limit exceeded. \
     Provide a personal access token (or one with a higher quota) and try again.";

/// Result type for gateway and accessor calls
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors surfaced by the gateway
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    /// 429, or 403 with an exhausted quota. Never retried.
    #[error("{}", RATE_LIMIT_MESSAGE)]
    RateLimited,

    /// No response was received, even after retrying
    #[error("network error: {0}")]
    Network(String),

    /// The upstream answered with an error status
    ///
    /// `message` is the upstream error message when one was sent, otherwise
    /// `"Error: {status}"`.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// The response body could not be decoded into the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The GraphQL endpoint answered 200 with an `errors` array
    #[error("GraphQL error: {0}")]
    GraphQl(String),

    /// The request could not be built (bad endpoint, bad credentials)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GatewayError {
    /// Whether this error is the rate-limit signal
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, GatewayError::RateLimited)
    }

    /// HTTP status of an upstream error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_upstream_message_verbatim() {
        let err = GatewayError::Api {
            status: 422,
            message: "Validation Failed".to_string(),
        };
        assert_eq!(err.to_string(), "Validation Failed");
        assert_eq!(err.status(), Some(422));
    }

    #[test]
    fn test_rate_limit_message_is_actionable() {
        let err = GatewayError::RateLimited;
        assert!(err.is_rate_limit());
        assert!(err.to_string().contains("personal access token"));
    }

    #[test]
    fn test_network_error_prefix() {
        let err = GatewayError::Network("connection refused".to_string());
        assert_eq!(err.to_string(), "network error: connection refused");
    }
}
