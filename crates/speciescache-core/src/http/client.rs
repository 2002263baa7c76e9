//! reqwest-backed [`HttpTransport`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use tracing::debug;

use super::{AssetRequest, AssetResponse, CacheMode, FetchError, HttpTransport};

/// Connect timeout in seconds. No overall request timeout is applied since
/// media payloads vary widely in size.
const CONNECT_TIMEOUT_SECS: u64 = 15;

/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| FetchError::network("<client>", e))?;
        Ok(Self { client })
    }

    fn cache_headers(mode: CacheMode) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        match mode {
            CacheMode::Default => {}
            CacheMode::NoStore => {
                headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-store"));
                headers.insert(header::PRAGMA, header::HeaderValue::from_static("no-cache"));
            }
            CacheMode::NoCache => {
                headers.insert(header::CACHE_CONTROL, header::HeaderValue::from_static("no-cache"));
            }
        }
        headers
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &AssetRequest) -> Result<AssetResponse, FetchError> {
        let url = request.url.as_str();
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(Self::cache_headers(request.cache));
        if let Some(ref accept) = request.accept {
            builder = builder.header(header::ACCEPT, accept.as_str());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        debug!(url = url, status, bytes = body.len(), "HTTP response received");
        Ok(AssetResponse::new(status, content_type, body))
    }
}
