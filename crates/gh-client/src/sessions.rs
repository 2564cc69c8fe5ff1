//! Client for the autonomous coding-session API
//!
//! Sessions run against a connected source (a GitHub repository) and are
//! managed through the same gateway as GitHub calls, so they share retry,
//! caching and invalidation behavior.

use crate::credentials::Credentials;
use crate::error::Result;
use crate::gateway::{Gateway, GatewayConfig, RequestOptions};
use crate::reqwest_transport::ReqwestTransport;
use gh_api_cache::CacheStore;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use url::form_urlencoded;

/// Base URL of the session API
pub const SESSION_API_BASE: &str = "https://jules.googleapis.com/v1alpha";

/// Header carrying the API key
pub const SESSION_API_KEY_HEADER: &str = "X-Goog-Api-Key";

/// Cache namespace of session responses
pub const SESSION_NAMESPACE: &str = "sessions";

/// `list_sessions` follows at most this many pages
pub const MAX_SESSION_PAGES: usize = 5;

/// Branch new sessions start from unless told otherwise
pub const DEFAULT_STARTING_BRANCH: &str = "leader";

/// A coding session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Resource name, `sessions/{id}`
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source_context: Option<Value>,
    #[serde(default)]
    pub outputs: Vec<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

/// A connected repository sessions can run against
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSource {
    /// Resource name, e.g. `sources/github/owner/repo`
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionPage {
    #[serde(default)]
    sessions: Vec<Session>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SourceList {
    #[serde(default)]
    sources: Vec<SessionSource>,
}

/// Parameters of a new session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub prompt: String,
    /// Source resource name
    pub source: String,
    pub starting_branch: String,
    pub title: Option<String>,
}

impl NewSession {
    pub fn new(prompt: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source: source.into(),
            starting_branch: DEFAULT_STARTING_BRANCH.to_string(),
            title: None,
        }
    }

    pub fn branch(mut self, branch: impl Into<String>) -> Self {
        self.starting_branch = branch.into();
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    fn payload(&self) -> Value {
        let mut payload = json!({
            "prompt": self.prompt,
            "sourceContext": {
                "source": self.source,
                "githubRepoContext": { "startingBranch": self.starting_branch },
            },
        });
        if let Some(title) = &self.title {
            payload["title"] = json!(title);
        }
        payload
    }
}

/// Session API client
#[derive(Debug, Clone)]
pub struct SessionClient {
    gateway: Gateway,
}

fn encode_query(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// `sessions/{id}` for either a bare id or a full resource name
fn session_path(name: &str) -> String {
    let id = name.trim().trim_start_matches("sessions/");
    format!("/sessions/{}", id)
}

impl SessionClient {
    pub fn new(gateway: Gateway) -> Self {
        Self { gateway }
    }

    /// Client for the public endpoint authenticated with `api_key`
    pub fn with_api_key(api_key: &str, cache: Arc<CacheStore>, mut config: GatewayConfig) -> Self {
        config.namespace = SESSION_NAMESPACE.to_string();
        let transport = ReqwestTransport::new(
            SESSION_API_BASE,
            Credentials::api_key(SESSION_API_KEY_HEADER, api_key),
        );
        Self::new(Gateway::new(Arc::new(transport), cache, config))
    }

    /// Connected sources, optionally narrowed by an API filter expression
    pub async fn list_sources(&self, filter: Option<&str>) -> Result<Vec<SessionSource>> {
        let endpoint = match filter {
            Some(filter) => format!("/sources?filter={}", encode_query(filter)),
            None => "/sources".to_string(),
        };
        let list: SourceList = self.gateway.request(&endpoint, RequestOptions::get()).await?;
        Ok(list.sources)
    }

    /// All sessions, following `nextPageToken` for a bounded number of pages
    pub async fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut sessions = Vec::new();
        let mut token: Option<String> = None;

        for _ in 0..MAX_SESSION_PAGES {
            let endpoint = match &token {
                Some(token) => format!("/sessions?pageToken={}", encode_query(token)),
                None => "/sessions".to_string(),
            };
            let page: SessionPage = self.gateway.request(&endpoint, RequestOptions::get()).await?;
            sessions.extend(page.sessions);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => token = Some(next),
                None => return Ok(sessions),
            }
        }

        debug!(
            "Stopped listing sessions after {} pages ({} sessions)",
            MAX_SESSION_PAGES,
            sessions.len()
        );
        Ok(sessions)
    }

    pub async fn get_session(&self, name: &str) -> Result<Session> {
        self.gateway
            .request(&session_path(name), RequestOptions::get())
            .await
    }

    pub async fn create_session(&self, session: &NewSession) -> Result<Session> {
        self.gateway
            .request("/sessions", RequestOptions::post(session.payload()))
            .await
    }

    /// Send a follow-up prompt to a running session
    pub async fn send_message(&self, name: &str, prompt: &str) -> Result<Value> {
        let endpoint = format!("{}:sendMessage", session_path(name));
        self.gateway
            .request(&endpoint, RequestOptions::post(json!({ "prompt": prompt })))
            .await
    }

    pub async fn delete_session(&self, name: &str) -> Result<()> {
        self.gateway
            .request::<Value>(&session_path(name), RequestOptions::delete())
            .await?;
        Ok(())
    }

    /// Source whose name ends with or contains `repo` (e.g. `owner/name`)
    ///
    /// Lookup failures read as "no source".
    pub async fn find_source_for_repo(&self, repo: &str) -> Option<String> {
        match self.list_sources(None).await {
            Ok(sources) => sources
                .into_iter()
                .find(|s| s.name.ends_with(repo) || s.name.contains(repo))
                .map(|s| s.name),
            Err(e) => {
                debug!("Source lookup for {} failed: {}", repo, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fake_gateway, FakeTransport};
    use crate::transport::{HttpResponse, Method};
    use pretty_assertions::assert_eq;

    fn client_with(transport: &Arc<FakeTransport>) -> SessionClient {
        SessionClient::new(fake_gateway(transport.clone()))
    }

    #[tokio::test]
    async fn test_list_sessions_follows_page_tokens() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_json(
            Method::Get,
            "/sessions",
            json!({"sessions": [{"name": "sessions/1"}], "nextPageToken": "p2"}),
        );
        transport.respond_json(
            Method::Get,
            "/sessions?pageToken=p2",
            json!({"sessions": [{"name": "sessions/2"}]}),
        );
        let client = client_with(&transport);

        let sessions = client.list_sessions().await.unwrap();
        let names: Vec<&str> = sessions.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["sessions/1", "sessions/2"]);
    }

    #[tokio::test]
    async fn test_list_sessions_stops_after_page_ceiling() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_json(
            Method::Get,
            "/sessions",
            json!({"sessions": [{"name": "sessions/0"}], "nextPageToken": "more"}),
        );
        transport.respond_json(
            Method::Get,
            "/sessions?pageToken=more",
            json!({"sessions": [{"name": "sessions/n"}], "nextPageToken": "more"}),
        );
        let client = client_with(&transport);

        let sessions = client.list_sessions().await.unwrap();
        assert_eq!(sessions.len(), MAX_SESSION_PAGES);
    }

    #[tokio::test]
    async fn test_create_session_payload() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_json(Method::Post, "/sessions", json!({"name": "sessions/9"}));
        let client = client_with(&transport);

        let session = client
            .create_session(&NewSession::new("Fix the build", "sources/github/o/r").title("Build"))
            .await
            .unwrap();

        assert_eq!(session.name, "sessions/9");
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({
                "prompt": "Fix the build",
                "title": "Build",
                "sourceContext": {
                    "source": "sources/github/o/r",
                    "githubRepoContext": {"startingBranch": "leader"}
                }
            }))
        );
    }

    #[tokio::test]
    async fn test_send_message_and_delete_accept_resource_names() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_json(Method::Post, "/sessions/42:sendMessage", json!({}));
        transport.respond(Method::Delete, "/sessions/42", HttpResponse::new(204, ""));
        let client = client_with(&transport);

        client.send_message("sessions/42", "continue").await.unwrap();
        client.delete_session("42").await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].body, Some(json!({"prompt": "continue"})));
        assert_eq!(requests[1].endpoint, "/sessions/42");
    }

    #[tokio::test]
    async fn test_find_source_for_repo() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_json(
            Method::Get,
            "/sources",
            json!({"sources": [
                {"name": "sources/github/other/thing"},
                {"name": "sources/github/o/r"}
            ]}),
        );
        let client = client_with(&transport);

        assert_eq!(
            client.find_source_for_repo("o/r").await.as_deref(),
            Some("sources/github/o/r")
        );
        assert_eq!(client.find_source_for_repo("missing/repo").await, None);
    }

    #[tokio::test]
    async fn test_list_sources_encodes_filter() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond_json(
            Method::Get,
            "/sources?filter=name%3Dsources%2Fgithub%2Fo%2Fr",
            json!({"sources": [{"name": "sources/github/o/r"}]}),
        );
        let client = client_with(&transport);

        let sources = client
            .list_sources(Some("name=sources/github/o/r"))
            .await
            .unwrap();
        assert_eq!(sources.len(), 1);
    }

    #[tokio::test]
    async fn test_nested_error_message_is_surfaced() {
        let transport = Arc::new(FakeTransport::new());
        transport.respond(
            Method::Get,
            "/sessions/404",
            HttpResponse::new(404, r#"{"error":{"code":404,"message":"Session not found"}}"#),
        );
        let client = client_with(&transport);

        let err = client.get_session("404").await.unwrap_err();
        assert_eq!(err.to_string(), "Session not found");
    }
}
