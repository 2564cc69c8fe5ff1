//! Transport abstraction underneath the gateway
//!
//! A transport performs exactly one HTTP exchange and reports either a
//! response (any status) or a connectivity failure. Retrying, caching and
//! error classification all live in the gateway, so transports stay dumb and
//! tests can script them.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;

/// HTTP method of a gateway request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    /// GET-like requests are cacheable and safe to retry
    pub fn is_get_like(&self) -> bool {
        matches!(self, Method::Get)
    }

    /// Mutating requests are never cached and invalidate the cache on success
    pub fn is_mutating(&self) -> bool {
        !self.is_get_like()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One outbound request, relative to the transport's base URL
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    /// Path plus query, e.g. `/repos/o/r/issues?state=open`
    pub endpoint: String,
    /// Overrides the transport's default `Accept` header
    pub accept: Option<String>,
    pub body: Option<serde_json::Value>,
}

/// A received response, whatever its status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are stored lowercased
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    /// Build a response with no headers
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    /// Add a header (name is lowercased)
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// No response was received (DNS, TLS, connection reset, deadline)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Performs single HTTP exchanges for the gateway
///
/// Implementations must be `Send + Sync` so one transport can be shared
/// across concurrently enriched pull requests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_classification() {
        assert!(Method::Get.is_get_like());
        for method in [Method::Post, Method::Patch, Method::Put, Method::Delete] {
            assert!(method.is_mutating(), "{} should be mutating", method);
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let response = HttpResponse::new(403, "").with_header("X-RateLimit-Remaining", "0");
        assert_eq!(response.header("x-ratelimit-remaining"), Some("0"));
        assert_eq!(response.header("X-RATELIMIT-REMAINING"), Some("0"));
        assert!(!response.is_success());
    }
}
