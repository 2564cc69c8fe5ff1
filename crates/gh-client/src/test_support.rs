//! Scripted transport shared by the gateway and accessor tests

use crate::cache_mode::CacheMode;
use crate::gateway::{Gateway, GatewayConfig};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use gh_api_cache::CacheStore;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Scripted = Result<HttpResponse, TransportError>;

/// Transport answering from per-route queues
///
/// A route's queued responses are handed out in order; the last one sticks.
/// Unknown routes answer 404.
#[derive(Default)]
pub(crate) struct FakeTransport {
    routes: Mutex<HashMap<(Method, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Option<Duration>,
}

impl FakeTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Every exchange takes `latency` (for deadline tests)
    pub(crate) fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub(crate) fn respond(&self, method: Method, endpoint: &str, response: HttpResponse) {
        self.push(method, endpoint, Ok(response));
    }

    pub(crate) fn respond_json(&self, method: Method, endpoint: &str, body: serde_json::Value) {
        self.respond(method, endpoint, HttpResponse::new(200, body.to_string()));
    }

    pub(crate) fn fail(&self, method: Method, endpoint: &str, message: &str) {
        self.push(method, endpoint, Err(TransportError::new(message)));
    }

    fn push(&self, method: Method, endpoint: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry((method, endpoint.to_string()))
            .or_default()
            .push_back(scripted);
    }

    pub(crate) fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self, method: Method, endpoint: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method && r.endpoint == endpoint)
            .count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&(request.method, request.endpoint.clone())) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) if !queue.is_empty() => queue[0].clone(),
            _ => Ok(HttpResponse::new(404, r#"{"message":"Not Found"}"#)),
        }
    }
}

/// Gateway over a fake transport and an in-memory cache
pub(crate) fn fake_gateway(transport: Arc<FakeTransport>) -> Gateway {
    Gateway::new(
        transport,
        Arc::new(CacheStore::in_memory()),
        GatewayConfig {
            cache_mode: CacheMode::ReadWrite,
            ..GatewayConfig::default()
        },
    )
}
