//! Scripted [`HttpTransport`] for tests.
//!
//! Routes are registered per exact URL. Unregistered URLs answer 404, and
//! the whole transport can be switched offline to make every request fail
//! at the network layer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use super::{AssetRequest, AssetResponse, FetchError, HttpTransport};

#[derive(Debug, Clone)]
enum Route {
    Respond(AssetResponse),
    Fail(String),
}

#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, Route>>,
    requests: Mutex<Vec<AssetRequest>>,
    offline: AtomicBool,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: AssetResponse) {
        self.set_route(url, Route::Respond(response));
    }

    pub fn json(&self, url: &str, body: Value) {
        self.respond(
            url,
            AssetResponse::new(200, Some("application/json".to_string()), body.to_string().into_bytes()),
        );
    }

    pub fn bytes(&self, url: &str, content_type: &str, body: &'static [u8]) {
        self.respond(
            url,
            AssetResponse::new(200, Some(content_type.to_string()), Bytes::from_static(body)),
        );
    }

    /// Make `url` fail at the network layer.
    pub fn fail(&self, url: &str) {
        self.set_route(url, Route::Fail("connection refused".to_string()));
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of requests sent for `url`.
    pub fn calls(&self, url: &str) -> usize {
        self.lock_requests().iter().filter(|r| r.url == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.lock_requests().len()
    }

    pub fn last_request(&self, url: &str) -> Option<AssetRequest> {
        self.lock_requests().iter().rev().find(|r| r.url == url).cloned()
    }

    fn set_route(&self, url: &str, route: Route) {
        self.routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), route);
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<AssetRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn send(&self, request: &AssetRequest) -> Result<AssetResponse, FetchError> {
        self.lock_requests().push(request.clone());

        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::network(&request.url, "network unreachable"));
        }

        let route = self
            .routes
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&request.url)
            .cloned();
        match route {
            Some(Route::Respond(response)) => Ok(response),
            Some(Route::Fail(message)) => Err(FetchError::network(&request.url, message)),
            None => Ok(AssetResponse::text(404, "Not Found")),
        }
    }
}
