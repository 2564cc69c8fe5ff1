//! Plain reqwest transport for non-GitHub JSON APIs (the session API)

use crate::credentials::Credentials;
use crate::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;

/// Transport sending requests to `{base_url}{endpoint}`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self::with_client(Client::new(), base_url, credentials)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.endpoint);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(Self::method(request.method), &url)
            .header(
                ACCEPT,
                request.accept.as_deref().unwrap_or("application/json"),
            )
            .header(CONTENT_TYPE, "application/json");

        match &self.credentials {
            Credentials::Anonymous => {}
            Credentials::Bearer(token) => builder = builder.bearer_auth(token),
            Credentials::ApiKey { header, key } => {
                builder = builder.header(header.as_str(), key.as_str())
            }
        }

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::new(format!("failed to read response body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
