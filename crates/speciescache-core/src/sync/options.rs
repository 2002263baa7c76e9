use std::fmt;
use std::sync::Arc;

use reqwest::Url;

use super::{ProgressCallback, SyncProgress};
use crate::config::{DEFAULT_BASE_URL, DEFAULT_BUNDLE_PATH, DEFAULT_MEDIA_CONCURRENCY};
use crate::http::FetchError;

/// Parameters for one sync invocation.
#[derive(Clone)]
pub struct SyncOptions {
    pub base_url: String,
    pub bundle_path: String,
    /// Number of concurrent media download lanes.
    pub media_concurrency: usize,
    /// Apply the bundle even when the local version matches.
    pub force: bool,
    pub on_progress: Option<ProgressCallback>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            bundle_path: DEFAULT_BUNDLE_PATH.to_string(),
            media_concurrency: DEFAULT_MEDIA_CONCURRENCY,
            force: false,
            on_progress: None,
        }
    }
}

impl SyncOptions {
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&SyncProgress) + Send + Sync + 'static,
    {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    /// `bundle_path` resolved against `base_url`.
    pub fn bundle_url(&self) -> Result<String, FetchError> {
        let base = Url::parse(&self.base_url)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", self.base_url, e)))?;
        base.join(&self.bundle_path)
            .map(String::from)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", self.bundle_path, e)))
    }
}

impl fmt::Debug for SyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("base_url", &self.base_url)
            .field("bundle_path", &self.bundle_path)
            .field("media_concurrency", &self.media_concurrency)
            .field("force", &self.force)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}
