//! HTTP request gateway
//!
//! Every upstream call goes through [`Gateway`]: cache lookup for GET-like
//! requests, retry with exponential backoff, rate-limit detection, error
//! normalization and cache invalidation after successful writes.
//!
//! ```text
//!  accessor ──► Gateway ──► CacheStore (hit? return)
//!                  │
//!                  ▼
//!             Transport ──► upstream
//!                  │
//!        success: cache (GET) / invalidate (write)
//! ```

use crate::cache_mode::CacheMode;
use crate::error::{GatewayError, Result};
use crate::rate_limit;
use crate::retry::{FailureKind, RetryPolicy, RetryState};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use gh_api_cache::CacheStore;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of cached responses
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Default per-attempt deadline
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Cache key namespace, e.g. `github` or `sessions`
    pub namespace: String,
    pub cache_mode: CacheMode,
    pub cache_ttl: Duration,
    pub retry: RetryPolicy,
    /// Also treat 403 "secondary rate limit" bodies as rate limits
    pub detect_secondary_rate_limits: bool,
    /// Deadline per attempt; an elapsed deadline counts as a connectivity failure
    pub request_timeout: Option<Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            namespace: "github".to_string(),
            cache_mode: CacheMode::default(),
            cache_ttl: DEFAULT_CACHE_TTL,
            retry: RetryPolicy::default(),
            detect_secondary_rate_limits: false,
            request_timeout: Some(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

impl GatewayConfig {
    /// Default settings under a different cache namespace
    pub fn for_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }
}

/// Per-request options
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    /// Skip the cache read (the response is still cached)
    pub fresh: bool,
    /// Override the `Accept` header, e.g. to negotiate a diff
    pub accept: Option<String>,
}

impl RequestOptions {
    fn with_method(method: Method, body: Option<Value>) -> Self {
        Self {
            method,
            body,
            fresh: false,
            accept: None,
        }
    }

    pub fn get() -> Self {
        Self::with_method(Method::Get, None)
    }

    pub fn post(body: Value) -> Self {
        Self::with_method(Method::Post, Some(body))
    }

    pub fn patch(body: Value) -> Self {
        Self::with_method(Method::Patch, Some(body))
    }

    pub fn put(body: Value) -> Self {
        Self::with_method(Method::Put, Some(body))
    }

    pub fn delete() -> Self {
        Self::with_method(Method::Delete, None)
    }

    pub fn fresh(mut self) -> Self {
        self.fresh = true;
        self
    }

    /// Set `fresh` conditionally
    pub fn fresh_if(mut self, fresh: bool) -> Self {
        self.fresh = fresh;
        self
    }

    pub fn accept(mut self, accept: impl Into<String>) -> Self {
        self.accept = Some(accept.into());
        self
    }
}

/// Cached, retrying access to one upstream API
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    cache: Arc<CacheStore>,
    config: GatewayConfig,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<CacheStore>, config: GatewayConfig) -> Self {
        Self {
            transport,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Cache key of an endpoint: `{namespace}:{endpoint}`
    pub fn cache_key(&self, endpoint: &str) -> String {
        format!("{}:{}", self.config.namespace, endpoint)
    }

    /// Perform a JSON request and decode the response
    pub async fn request<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let value = self.request_value(endpoint, options).await?;
        serde_json::from_value(value)
            .map_err(|e| GatewayError::Decode(format!("{}: {}", endpoint, e)))
    }

    /// Perform a JSON request and return the undecoded value
    ///
    /// A 204 or empty body yields an empty object.
    pub async fn request_value(&self, endpoint: &str, options: RequestOptions) -> Result<Value> {
        let cacheable = options.method.is_get_like();
        let key = self.cache_key(endpoint);

        if cacheable && !options.fresh && self.config.cache_mode.should_read() {
            if let Some(value) = self.cache.get::<Value>(&key) {
                return Ok(value);
            }
            debug!("Cache MISS for {}", key);
        }

        let response = self.execute(endpoint, &options).await?;
        // The write has landed upstream even if its body does not decode
        if !cacheable {
            self.invalidate_after_write(options.method, endpoint);
        }

        let value = parse_json_body(&response)?;
        if cacheable && self.config.cache_mode.should_write() {
            self.cache.set(&key, &value, self.config.cache_ttl);
        }

        Ok(value)
    }

    /// Perform a request and return the raw response text
    ///
    /// Text responses are never cached.
    pub async fn request_text(&self, endpoint: &str, options: RequestOptions) -> Result<String> {
        let response = self.execute(endpoint, &options).await?;
        if options.method.is_mutating() {
            self.invalidate_after_write(options.method, endpoint);
        }
        Ok(response.body)
    }

    fn invalidate_after_write(&self, method: Method, endpoint: &str) {
        let removed = self.cache.invalidate_by_prefix("");
        debug!(
            "{} {} succeeded, invalidated {} cached responses",
            method, endpoint, removed
        );
    }

    /// Run the attempt loop until success or a terminal state
    async fn execute(&self, endpoint: &str, options: &RequestOptions) -> Result<HttpResponse> {
        let request = HttpRequest {
            method: options.method,
            endpoint: endpoint.to_string(),
            accept: options.accept.clone(),
            body: options.body.clone(),
        };
        let policy = if options.method.is_get_like() {
            self.config.retry
        } else {
            RetryPolicy::no_retry()
        };

        let mut attempt = 1;
        loop {
            let (kind, error) = match self.send_once(&request).await {
                Ok(response) if response.is_success() => {
                    debug!(
                        "{} {} -> {} ({:?})",
                        request.method,
                        endpoint,
                        response.status,
                        RetryState::Succeeded
                    );
                    return Ok(response);
                }
                Ok(response) => self.classify_failure(&response),
                Err(e) => (FailureKind::Connectivity, GatewayError::Network(e.message)),
            };

            match policy.after_failure(kind, attempt) {
                RetryState::Attempting(next) => {
                    let delay = policy.backoff_delay(kind, attempt);
                    debug!(
                        "{} {} attempt {} failed ({}), retrying in {:?}",
                        request.method, endpoint, attempt, error, delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                state => {
                    if error.is_rate_limit() {
                        warn!("Rate limited on {} {}", request.method, endpoint);
                    }
                    debug!(
                        "{} {} gave up after {} attempt(s): {:?}",
                        request.method, endpoint, attempt, state
                    );
                    return Err(error);
                }
            }
        }
    }

    async fn send_once(&self, request: &HttpRequest) -> std::result::Result<HttpResponse, TransportError> {
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, self.transport.send(request))
                .await
                .unwrap_or_else(|_| {
                    Err(TransportError::new(format!(
                        "request timed out after {}s",
                        limit.as_secs_f32()
                    )))
                }),
            None => self.transport.send(request).await,
        }
    }

    fn classify_failure(&self, response: &HttpResponse) -> (FailureKind, GatewayError) {
        if let Some(signal) = rate_limit::classify(response, self.config.detect_secondary_rate_limits)
        {
            debug!("Rate limit signal: {:?}", signal);
            return (FailureKind::RateLimited, GatewayError::RateLimited);
        }
        (
            FailureKind::from_status(response.status),
            GatewayError::Api {
                status: response.status,
                message: extract_error_message(response.status, &response.body),
            },
        )
    }
}

fn parse_json_body(response: &HttpResponse) -> Result<Value> {
    if response.status == 204 || response.body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(&response.body).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Upstream error message, or `"Error: {status}"`
///
/// Understands both `{"message": ...}` and `{"error": {"message": ...}}`.
pub fn extract_error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(Value::as_str)
                .or_else(|| value.pointer("/error/message").and_then(Value::as_str))
                .map(str::to_string)
        })
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| format!("Error: {}", status))
}
