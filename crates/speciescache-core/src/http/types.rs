//! Request and response values exchanged with an [`HttpTransport`](super::HttpTransport).

use bytes::Bytes;
use reqwest::Method;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// How the request interacts with intermediate HTTP caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    #[default]
    Default,
    /// Bypass caches entirely and do not let them store the response.
    NoStore,
    /// Revalidate with the origin before using a cached copy.
    NoCache,
}

/// What initiated the request, as far as the asset cache cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
    Navigate,
    #[default]
    SameOrigin,
    Cors,
    NoCors,
}

/// The kind of resource the request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    #[default]
    Other,
}

#[derive(Debug, Clone)]
pub struct AssetRequest {
    pub url: String,
    pub method: Method,
    pub mode: RequestMode,
    pub destination: Destination,
    pub cache: CacheMode,
    pub accept: Option<String>,
}

impl AssetRequest {
    /// A plain GET for `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::GET,
            mode: RequestMode::default(),
            destination: Destination::default(),
            cache: CacheMode::default(),
            accept: None,
        }
    }

    /// A top-level page navigation.
    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::Navigate,
            destination: Destination::Document,
            ..Self::get(url)
        }
    }

    /// An image load, e.g. from an `<img>` element.
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            mode: RequestMode::NoCors,
            destination: Destination::Image,
            ..Self::get(url)
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn with_cache(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_accept(mut self, accept: &str) -> Self {
        self.accept = Some(accept.to_string());
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == Method::GET
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl AssetResponse {
    pub fn new(status: u16, content_type: Option<String>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
        }
    }

    /// A `text/plain` response with the given status.
    pub fn text(status: u16, body: &str) -> Self {
        Self::new(
            status,
            Some("text/plain; charset=utf-8".to_string()),
            Bytes::copy_from_slice(body.as_bytes()),
        )
    }

    /// A response with no body and no content type.
    pub fn empty(status: u16) -> Self {
        Self::new(status, None, Bytes::new())
    }

    /// True for any 2xx status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Body as text, lossy for invalid UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let nav = AssetRequest::navigate("http://localhost/specie.html");
        assert!(nav.is_navigation());
        assert_eq!(nav.destination, Destination::Document);
        assert!(nav.is_get());

        let img = AssetRequest::image("http://localhost/a.png").with_cache(CacheMode::NoStore);
        assert!(!img.is_navigation());
        assert_eq!(img.destination, Destination::Image);
        assert_eq!(img.cache, CacheMode::NoStore);

        let post = AssetRequest::get("http://localhost/api/login").with_method(Method::POST);
        assert!(!post.is_get());
    }

    #[test]
    fn test_response_ok_range() {
        assert!(AssetResponse::empty(200).ok());
        assert!(AssetResponse::empty(204).ok());
        assert!(!AssetResponse::empty(304).ok());
        assert!(!AssetResponse::text(503, "Offline").ok());
    }

    #[test]
    fn test_response_json() {
        let resp = AssetResponse::new(200, None, r#"{"version": 3}"#.as_bytes().to_vec());
        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["version"], 3);
    }
}
