//! Asset cache controller.
//!
//! Owns one named cache generation and moves through three phases:
//!
//! - **install**: best-effort precache of the asset manifest
//! - **activate**: delete every other generation, then take control
//! - **fetch**: per-request cache-first policy with network fallback and
//!   offline substitutes
//!
//! It also accepts [`CacheMessage`]s asking it to cache extra URLs.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use reqwest::Url;
use tracing::{debug, info, warn};

use super::{AssetCache, CacheError, CacheMessage, CacheStorage};
use crate::config::{DEFAULT_CACHE_NAME, DEFAULT_NAVIGATION_FALLBACKS, DEFAULT_PRECACHE_MANIFEST, DEFAULT_SCOPE};
use crate::http::{AssetRequest, AssetResponse, CacheMode, Destination, FetchError, HttpTransport};

/// Body of the synthetic response for failed non-image requests.
const OFFLINE_BODY: &str = "Offline";

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Name of the current cache generation. Any other generation is
    /// deleted on activation.
    pub cache_name: String,
    /// Base URL of the application. Its origin decides which requests are
    /// intercepted and relative manifest entries resolve against it.
    pub scope: String,
    pub manifest: Vec<String>,
    /// Documents served, in order of preference, for offline navigations.
    pub navigation_fallbacks: Vec<String>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cache_name: DEFAULT_CACHE_NAME.to_string(),
            scope: DEFAULT_SCOPE.to_string(),
            manifest: DEFAULT_PRECACHE_MANIFEST.iter().map(|s| s.to_string()).collect(),
            navigation_fallbacks: DEFAULT_NAVIGATION_FALLBACKS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    New,
    Installed,
    Activated,
}

impl LifecyclePhase {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LifecyclePhase::Installed,
            2 => LifecyclePhase::Activated,
            _ => LifecyclePhase::New,
        }
    }
}

/// Where a response handed back by [`AssetCacheController::handle_fetch`]
/// came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    /// Stored home/index document served for an offline navigation.
    NavigationFallback,
    /// Empty 204 for an offline image request.
    OfflinePlaceholder,
    /// Synthetic 503 for any other offline request.
    OfflineUnavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchDecision {
    /// Not intercepted; the caller performs the request itself.
    Passthrough,
    Respond {
        response: AssetResponse,
        source: ResponseSource,
    },
}

impl FetchDecision {
    fn respond(response: AssetResponse, source: ResponseSource) -> Self {
        FetchDecision::Respond { response, source }
    }

    pub fn response(&self) -> Option<&AssetResponse> {
        match self {
            FetchDecision::Passthrough => None,
            FetchDecision::Respond { response, .. } => Some(response),
        }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchDecision::Passthrough => None,
            FetchDecision::Respond { source, .. } => Some(*source),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub cached: usize,
    pub failed: usize,
    /// The new generation activates without waiting for the old one to
    /// stop serving.
    pub skip_waiting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateReport {
    pub deleted: Vec<String>,
    /// In-scope clients are controlled immediately.
    pub clients_claimed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmReport {
    pub cached: usize,
    pub failed: usize,
}

pub struct AssetCacheController {
    config: ControllerConfig,
    scope: Url,
    storage: Arc<dyn CacheStorage>,
    http: Arc<dyn HttpTransport>,
    phase: AtomicU8,
}

impl AssetCacheController {
    pub fn new(
        config: ControllerConfig,
        storage: Arc<dyn CacheStorage>,
        http: Arc<dyn HttpTransport>,
    ) -> Result<Self, FetchError> {
        let scope = Url::parse(&config.scope)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", config.scope, e)))?;
        Ok(Self {
            config,
            scope,
            storage,
            http,
            phase: AtomicU8::new(0),
        })
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_name
    }

    pub fn phase(&self) -> LifecyclePhase {
        LifecyclePhase::from_u8(self.phase.load(Ordering::SeqCst))
    }

    /// Precache the manifest into the current generation.
    ///
    /// Entries that fail to resolve, fetch, or store are skipped. Only a
    /// failure to open the generation itself fails the install.
    pub async fn install(&self) -> Result<InstallReport, CacheError> {
        let cache = self.storage.open(&self.config.cache_name).await?;
        info!(cache = %self.config.cache_name, entries = self.config.manifest.len(), "Installing asset cache");

        let mut seen = HashSet::new();
        let mut failed = 0;
        let mut urls = Vec::new();
        for entry in &self.config.manifest {
            match self.resolve(entry) {
                Some(url) => {
                    if seen.insert(url.clone()) {
                        urls.push(url);
                    }
                }
                None => {
                    warn!(entry = %entry, "Unresolvable manifest entry");
                    failed += 1;
                }
            }
        }

        let results = join_all(urls.iter().map(|url| self.precache(cache.as_ref(), url))).await;
        let cached = results.iter().filter(|ok| **ok).count();
        failed += results.len() - cached;

        self.phase.store(1, Ordering::SeqCst);
        info!(cached, failed, "Asset cache installed");
        Ok(InstallReport {
            cached,
            failed,
            skip_waiting: true,
        })
    }

    async fn precache(&self, cache: &dyn AssetCache, url: &str) -> bool {
        let request = AssetRequest::get(url).with_cache(CacheMode::NoCache);
        let response = match self.http.send(&request).await {
            Ok(response) if response.ok() => response,
            Ok(response) => {
                debug!(url, status = response.status, "Precache skipped non-success response");
                return false;
            }
            Err(e) => {
                debug!(url, error = %e, "Precache fetch failed");
                return false;
            }
        };
        match cache.put(url, response).await {
            Ok(()) => true,
            Err(e) => {
                debug!(url, error = %e, "Precache store failed");
                false
            }
        }
    }

    /// Delete every generation other than the current one and take control.
    pub async fn activate(&self) -> Result<ActivateReport, CacheError> {
        let mut deleted = Vec::new();
        for name in self.storage.keys().await? {
            if name != self.config.cache_name && self.storage.delete(&name).await? {
                deleted.push(name);
            }
        }
        self.phase.store(2, Ordering::SeqCst);
        info!(cache = %self.config.cache_name, deleted = deleted.len(), "Asset cache activated");
        Ok(ActivateReport {
            deleted,
            clients_claimed: true,
        })
    }

    /// Decide how to answer one request.
    ///
    /// Cross-origin requests, and every request before activation, pass
    /// through. Same-origin requests are served cache-first, then from the
    /// network (caching successful GETs), then from an offline substitute.
    /// This never fails: cache errors degrade to network, network errors to
    /// substitutes.
    pub async fn handle_fetch(&self, request: &AssetRequest) -> FetchDecision {
        if self.phase() != LifecyclePhase::Activated {
            return FetchDecision::Passthrough;
        }
        let Some(key) = self.intercept_key(&request.url) else {
            return FetchDecision::Passthrough;
        };

        let cache = match self.storage.open(&self.config.cache_name).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!(error = %e, "Asset cache unavailable, using network only");
                None
            }
        };

        if request.is_get() {
            if let Some(ref cache) = cache {
                match cache.match_url(&key).await {
                    Ok(Some(hit)) => {
                        debug!(url = %key, "Served from cache");
                        return FetchDecision::respond(hit, ResponseSource::Cache);
                    }
                    Ok(None) => {}
                    Err(e) => warn!(url = %key, error = %e, "Cache lookup failed"),
                }
            }
        }

        match self.http.send(request).await {
            Ok(fresh) => {
                if fresh.ok() && request.is_get() {
                    if let Some(ref cache) = cache {
                        if let Err(e) = cache.put(&key, fresh.clone()).await {
                            debug!(url = %key, error = %e, "Failed to store network response");
                        }
                    }
                }
                FetchDecision::respond(fresh, ResponseSource::Network)
            }
            Err(e) => {
                debug!(url = %key, error = %e, "Network failed, using offline fallback");
                self.offline_fallback(request, cache.as_deref()).await
            }
        }
    }

    async fn offline_fallback(
        &self,
        request: &AssetRequest,
        cache: Option<&dyn AssetCache>,
    ) -> FetchDecision {
        if request.is_navigation() {
            if let Some(cache) = cache {
                for fallback in &self.config.navigation_fallbacks {
                    let Some(url) = self.resolve(fallback) else {
                        continue;
                    };
                    if let Ok(Some(doc)) = cache.match_url(&url).await {
                        return FetchDecision::respond(doc, ResponseSource::NavigationFallback);
                    }
                }
            }
            warn!(url = %request.url, "No offline navigation document cached");
        } else if request.destination == Destination::Image {
            return FetchDecision::respond(
                AssetResponse::empty(204),
                ResponseSource::OfflinePlaceholder,
            );
        }
        FetchDecision::respond(
            AssetResponse::text(503, OFFLINE_BODY),
            ResponseSource::OfflineUnavailable,
        )
    }

    /// Handle a message from the page side.
    pub async fn handle_message(&self, message: CacheMessage) -> Result<WarmReport, CacheError> {
        match message {
            CacheMessage::CacheMedia { urls } => self.cache_urls(&urls).await,
        }
    }

    async fn cache_urls(&self, urls: &[String]) -> Result<WarmReport, CacheError> {
        let cache = self.storage.open(&self.config.cache_name).await?;
        let mut report = WarmReport::default();
        for url in urls {
            let Some(key) = self.resolve(url) else {
                report.failed += 1;
                continue;
            };
            if self.precache(cache.as_ref(), &key).await {
                report.cached += 1;
            } else {
                report.failed += 1;
            }
        }
        debug!(cached = report.cached, failed = report.failed, "Media URLs cached");
        Ok(report)
    }

    /// Resolve `entry` against the scope and drop any fragment.
    fn resolve(&self, entry: &str) -> Option<String> {
        let mut url = self.scope.join(entry).ok()?;
        url.set_fragment(None);
        Some(url.into())
    }

    /// Cache key for `url` if it belongs to this controller's origin.
    fn intercept_key(&self, url: &str) -> Option<String> {
        let mut parsed = Url::parse(url).ok()?;
        if parsed.origin() != self.scope.origin() {
            return None;
        }
        parsed.set_fragment(None);
        Some(parsed.into())
    }
}
