//! Octocrab-based transport for the GitHub API
//!
//! Uses octocrab's raw request methods so the gateway sees every status code
//! and header (octocrab's typed helpers turn error statuses into opaque
//! errors and hide `x-ratelimit-remaining`).

use crate::credentials::Credentials;
use crate::error::GatewayError;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use http::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT};
use http::Uri;
use log::debug;
use octocrab::Octocrab;
use std::collections::HashMap;
use std::sync::Arc;

/// Public GitHub API base URL
pub const GITHUB_API_BASE: &str = "https://api.github.com";

/// Default `Accept` header for JSON endpoints
pub const GITHUB_JSON_ACCEPT: &str = "application/vnd.github.v3+json";

/// `Accept` header negotiating a unified diff
pub const GITHUB_DIFF_ACCEPT: &str = "application/vnd.github.v3.diff";

/// GitHub transport backed by octocrab
#[derive(Debug, Clone)]
pub struct OctocrabTransport {
    octocrab: Arc<Octocrab>,
}

impl OctocrabTransport {
    /// Wrap an existing octocrab instance
    pub fn new(octocrab: Arc<Octocrab>) -> Self {
        Self { octocrab }
    }

    /// Build an octocrab instance for the given credentials
    ///
    /// `base_url` defaults to the public API; GitHub Enterprise hosts use
    /// `https://{host}/api/v3`.
    pub fn build(credentials: &Credentials, base_url: Option<&str>) -> Result<Self, GatewayError> {
        let mut builder = Octocrab::builder();

        match credentials {
            Credentials::Anonymous => {}
            Credentials::Bearer(token) => builder = builder.personal_token(token.clone()),
            Credentials::ApiKey { header, key } => {
                let name = HeaderName::from_bytes(header.as_bytes()).map_err(|e| {
                    GatewayError::InvalidRequest(format!("invalid header name {}: {}", header, e))
                })?;
                builder = builder.add_header(name, key.clone());
            }
        }

        if let Some(base) = base_url {
            builder = builder.base_uri(base).map_err(|e| {
                GatewayError::InvalidRequest(format!("invalid base URL {}: {}", base, e))
            })?;
        }

        let octocrab = builder
            .build()
            .map_err(|e| GatewayError::InvalidRequest(format!("failed to build client: {}", e)))?;
        Ok(Self::new(Arc::new(octocrab)))
    }

    /// Get a reference to the underlying octocrab instance
    pub fn octocrab(&self) -> &Octocrab {
        &self.octocrab
    }
}

/// Base URL for a host (`None` or `github.com` → public API)
pub fn api_base_for_host(host: Option<&str>) -> String {
    match host {
        Some(h) if h != crate::DEFAULT_HOST => format!("https://{}/api/v3", h),
        _ => GITHUB_API_BASE.to_string(),
    }
}

#[async_trait]
impl Transport for OctocrabTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let uri: Uri = request
            .endpoint
            .parse()
            .map_err(|e| TransportError::new(format!("invalid endpoint {}: {}", request.endpoint, e)))?;

        debug!("{} {}", request.method, request.endpoint);

        let result = match request.method {
            Method::Get => {
                let accept = request.accept.as_deref().unwrap_or(GITHUB_JSON_ACCEPT);
                let mut headers = HeaderMap::new();
                if let Ok(value) = HeaderValue::from_str(accept) {
                    headers.insert(ACCEPT, value);
                }
                self.octocrab._get_with_headers(uri, Some(headers)).await
            }
            Method::Post => self.octocrab._post(uri, request.body.as_ref()).await,
            Method::Patch => self.octocrab._patch(uri, request.body.as_ref()).await,
            Method::Put => self.octocrab._put(uri, request.body.as_ref()).await,
            Method::Delete => self.octocrab._delete(uri, request.body.as_ref()).await,
        };
        let response = result.map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = self
            .octocrab
            .body_to_string(response)
            .await
            .map_err(|e| TransportError::new(format!("failed to read response body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_base_for_host() {
        assert_eq!(api_base_for_host(None), GITHUB_API_BASE);
        assert_eq!(api_base_for_host(Some("github.com")), GITHUB_API_BASE);
        assert_eq!(
            api_base_for_host(Some("ghe.example.com")),
            "https://ghe.example.com/api/v3"
        );
    }

    #[test]
    fn test_build_rejects_invalid_header_name() {
        let credentials = Credentials::api_key("bad header", "key");
        let err = OctocrabTransport::build(&credentials, None).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidRequest(_)));
    }
}
