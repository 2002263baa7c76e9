//! Bundle synchronization engine.
//!
//! One `sync` call runs, in order: local version read, bundle fetch, version
//! gate, record replacement, media normalization, cache warm-up notice,
//! bounded-concurrency media downloads, version commit. The version is only
//! written after everything before it has been attempted, so an aborted sync
//! leaves the previous version in place and the next run retries.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{MediaWarmer, ProgressReporter, SyncError, SyncOptions, SyncPhase, SyncProgress};
use crate::http::{AssetRequest, AssetResponse, CacheMode, FetchError, HttpTransport};
use crate::models::{
    has_cached_blob, parse_version, Bundle, MediaItem, MediaRecord, BUNDLE_VERSION_KEY,
};
use crate::pool::run_pool;
use crate::store::{LocalStore, Partition, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    /// Local and remote versions matched; nothing was written.
    UpToDate,
    /// The bundle was applied and the version committed.
    Applied,
}

/// Summary of one sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct SyncReport {
    pub local_version: Option<i64>,
    pub remote_version: i64,
    pub outcome: SyncOutcome,
    pub records_en: usize,
    pub records_tet: usize,
    /// Media items left after normalization.
    pub media_total: usize,
    pub downloaded: usize,
    /// Items whose link already had a stored blob.
    pub skipped: usize,
    pub failed: usize,
}

impl SyncReport {
    fn new(local_version: Option<i64>, remote_version: i64) -> Self {
        Self {
            local_version,
            remote_version,
            outcome: SyncOutcome::UpToDate,
            records_en: 0,
            records_tet: 0,
            media_total: 0,
            downloaded: 0,
            skipped: 0,
            failed: 0,
        }
    }
}

#[derive(Default)]
struct MediaTally {
    downloaded: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

pub struct SyncEngine {
    store: Arc<dyn LocalStore>,
    http: Arc<dyn HttpTransport>,
    warmer: Option<Arc<dyn MediaWarmer>>,
}

impl SyncEngine {
    pub fn new(store: Arc<dyn LocalStore>, http: Arc<dyn HttpTransport>) -> Self {
        Self {
            store,
            http,
            warmer: None,
        }
    }

    /// Attach an asset cache to notify with media links before downloading.
    pub fn with_warmer(mut self, warmer: Arc<dyn MediaWarmer>) -> Self {
        self.warmer = Some(warmer);
        self
    }

    /// Reconcile the local store against the remote bundle.
    ///
    /// Fails only when the bundle cannot be fetched or the store rejects an
    /// operation. Individual media download failures are recorded in the
    /// store and counted in the report.
    pub async fn sync(&self, options: &SyncOptions) -> Result<SyncReport, SyncError> {
        let progress = ProgressReporter::new(options.on_progress.clone());
        let bundle_url = options.bundle_url()?;

        let stored_version = self.store.meta_get(BUNDLE_VERSION_KEY).await?;
        let local_version = stored_version.as_ref().and_then(parse_version);
        let local_display = local_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string());
        info!(url = %bundle_url, local = %local_display, force = options.force, "Starting bundle sync");
        progress.emit(SyncProgress::message(
            SyncPhase::Version,
            format!("Local: {}", local_display),
        ));

        let bundle = self.fetch_bundle(&bundle_url).await?;
        let remote_version = bundle.remote_version();
        progress.emit(SyncProgress::message(
            SyncPhase::Version,
            format!("Remote: {}", remote_version),
        ));

        let mut report = SyncReport::new(local_version, remote_version);

        if !options.force && local_version == Some(remote_version) {
            info!(version = remote_version, "Bundle unchanged, skipping sync");
            progress.emit(SyncProgress::message(SyncPhase::Done, "No changes detected."));
            return Ok(report);
        }

        let Bundle {
            species_en,
            species_tet,
            media,
            ..
        } = bundle;

        report.records_en = species_en.len();
        report.records_tet = species_tet.len();
        self.store.put_many(Partition::SpeciesEn, species_en).await?;
        self.store.put_many(Partition::SpeciesTet, species_tet).await?;
        debug!(en = report.records_en, tet = report.records_tet, "Species records replaced");

        let items: Vec<MediaItem> = media
            .iter()
            .enumerate()
            .filter_map(|(idx, raw)| MediaItem::normalize(raw, idx as i64 + 1))
            .collect();
        report.media_total = items.len();
        debug!(raw = media.len(), normalized = items.len(), "Media descriptors normalized");

        if let Some(ref warmer) = self.warmer {
            if !items.is_empty() {
                warmer.warm(items.iter().map(|m| m.download_link.clone()).collect());
            }
        }

        let tally = MediaTally::default();
        let total = items.len();
        run_pool(&items, options.media_concurrency, |item, _| {
            self.cache_media(item, total, &tally, &progress)
        })
        .await?;

        report.downloaded = tally.downloaded.load(Ordering::SeqCst);
        report.skipped = tally.skipped.load(Ordering::SeqCst);
        report.failed = tally.failed.load(Ordering::SeqCst);

        self.store
            .meta_set(BUNDLE_VERSION_KEY, json!(remote_version))
            .await?;
        report.outcome = SyncOutcome::Applied;

        info!(
            version = remote_version,
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            "Bundle sync finished"
        );
        progress.emit(SyncProgress::message(SyncPhase::Done, "Bundle sync finished"));
        Ok(report)
    }

    async fn fetch_bundle(&self, url: &str) -> Result<Bundle, FetchError> {
        let request = AssetRequest::get(url).with_accept("application/json");
        let response = self.http.send(&request).await?;
        if !response.ok() {
            return Err(FetchError::from_status(url, response.status, &response.body_text()));
        }
        response.json().map_err(|e| FetchError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    async fn download(&self, url: &str) -> Result<AssetResponse, FetchError> {
        let request = AssetRequest::get(url).with_cache(CacheMode::NoStore);
        let response = self.http.send(&request).await?;
        if !response.ok() {
            return Err(FetchError::from_status(url, response.status, ""));
        }
        Ok(response)
    }

    /// Download and persist one item. Download failures become a persisted
    /// failure record; store failures propagate.
    async fn cache_media(
        &self,
        item: &MediaItem,
        total: usize,
        tally: &MediaTally,
        progress: &ProgressReporter,
    ) -> Result<(), StoreError> {
        let stored = self.store.get_index(Partition::Media).await?;
        if has_cached_blob(&stored, &item.download_link) {
            debug!(media_id = %item.media_id, url = %item.download_link, "Media already cached");
            tally.skipped.fetch_add(1, Ordering::SeqCst);
            return Ok(());
        }

        let record = match self.download(&item.download_link).await {
            Ok(response) => {
                let content_type = response.content_type.filter(|ct| !ct.is_empty());
                MediaRecord::cached(item.clone(), response.body, content_type)
            }
            Err(e) => {
                warn!(
                    media_id = %item.media_id,
                    url = %item.download_link,
                    status = ?e.status(),
                    error = %e,
                    "Media download failed"
                );
                MediaRecord::failed(item.clone(), e.to_string())
            }
        };

        let cached = record.has_blob();
        self.store.put(Partition::Media, record.to_value()?).await?;

        if cached {
            let current = tally.downloaded.fetch_add(1, Ordering::SeqCst) + 1;
            progress.emit(SyncProgress::media(current, total));
        } else {
            tally.failed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::http::testing::FakeTransport;
    use crate::store::MemoryStore;

    const BUNDLE_URL: &str = "http://127.0.0.1:5000/api/bundle";

    struct RecordingWarmer(Mutex<Vec<Vec<String>>>);

    impl MediaWarmer for RecordingWarmer {
        fn warm(&self, urls: Vec<String>) {
            self.0.lock().unwrap().push(urls);
        }
    }

    fn engine(store: &Arc<MemoryStore>, http: &Arc<FakeTransport>) -> SyncEngine {
        SyncEngine::new(store.clone(), http.clone())
    }

    fn recording_options() -> (SyncOptions, Arc<Mutex<Vec<SyncProgress>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let opts = SyncOptions::default().with_progress(move |p| sink.lock().unwrap().push(p.clone()));
        (opts, events)
    }

    #[tokio::test]
    async fn test_progress_sequence_on_apply() {
        let store = Arc::new(MemoryStore::new());
        let http = Arc::new(FakeTransport::new());
        http.json(
            BUNDLE_URL,
            json!({
                "version": 2,
                "species_en": [{"species_id": 1}],
                "species_tet": [{"species_id": 1}],
                "media": [{"media_id": 1, "download_link": "http://cdn/a.png"}],
            }),
        );
        http.bytes("http://cdn/a.png", "image/png", b"PNG");

        let (opts, events) = recording_options();
        let report = engine(&store, &http).sync(&opts).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Applied);

        let events = events.lock().unwrap();
        let phases: Vec<SyncPhase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![SyncPhase::Version, SyncPhase::Version, SyncPhase::Media, SyncPhase::Done]
        );
        assert_eq!(events[0].message.as_deref(), Some("Local: none"));
        assert_eq!(events[1].message.as_deref(), Some("Remote: 2"));
        assert_eq!(events[2].current, Some(1));
        assert_eq!(events[2].total, Some(1));
        assert_eq!(events[3].message.as_deref(), Some("Bundle sync finished"));
    }

    #[tokio::test]
    async fn test_bundle_request_asks_for_json() {
        let store = Arc::new(MemoryStore::new());
        let http = Arc::new(FakeTransport::new());
        http.json(BUNDLE_URL, json!({"version": 1}));

        engine(&store, &http).sync(&SyncOptions::default()).await.unwrap();
        let request = http.last_request(BUNDLE_URL).unwrap();
        assert_eq!(request.accept.as_deref(), Some("application/json"));
    }

    #[tokio::test]
    async fn test_media_downloads_bypass_cache() {
        let store = Arc::new(MemoryStore::new());
        let http = Arc::new(FakeTransport::new());
        http.json(
            BUNDLE_URL,
            json!({"version": 1, "media": [{"url": "http://cdn/a.png"}]}),
        );
        http.bytes("http://cdn/a.png", "", b"PNG");

        engine(&store, &http).sync(&SyncOptions::default()).await.unwrap();
        let request = http.last_request("http://cdn/a.png").unwrap();
        assert_eq!(request.cache, CacheMode::NoStore);

        // Empty content-type header falls back.
        let stored = store.get(Partition::Media, "1").await.unwrap().unwrap();
        assert_eq!(stored["contentType"], "application/octet-stream");
    }

    #[tokio::test]
    async fn test_warmer_receives_resolved_links() {
        let store = Arc::new(MemoryStore::new());
        let http = Arc::new(FakeTransport::new());
        http.json(
            BUNDLE_URL,
            json!({"version": 1, "media": [
                {"media_id": 1, "download_link": "http://cdn/a.png"},
                {"media_id": 2},
                {"media_id": 3, "media_url": "http://cdn/c.png"},
            ]}),
        );
        let warmer = Arc::new(RecordingWarmer(Mutex::new(Vec::new())));

        engine(&store, &http)
            .with_warmer(warmer.clone())
            .sync(&SyncOptions::default())
            .await
            .unwrap();

        let calls = warmer.0.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["http://cdn/a.png", "http://cdn/c.png"]);
    }

    #[tokio::test]
    async fn test_warmer_not_called_without_media() {
        let store = Arc::new(MemoryStore::new());
        let http = Arc::new(FakeTransport::new());
        http.json(BUNDLE_URL, json!({"version": 1, "media": [{"alt_text": "no link"}]}));
        let warmer = Arc::new(RecordingWarmer(Mutex::new(Vec::new())));

        engine(&store, &http)
            .with_warmer(warmer.clone())
            .sync(&SyncOptions::default())
            .await
            .unwrap();
        assert!(warmer.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bundle_status_error_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        store.meta_set(BUNDLE_VERSION_KEY, json!(1)).await.unwrap();
        store.reset_write_count();
        let http = Arc::new(FakeTransport::new());
        http.respond(BUNDLE_URL, AssetResponse::text(500, "boom"));

        let err = engine(&store, &http)
            .sync(&SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Fetch(FetchError::Status { status: 500, .. })));
        assert_eq!(store.write_count(), 0);
        assert_eq!(store.meta_get(BUNDLE_VERSION_KEY).await.unwrap(), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_bundle_not_json_is_decode_error() {
        let store = Arc::new(MemoryStore::new());
        let http = Arc::new(FakeTransport::new());
        http.respond(BUNDLE_URL, AssetResponse::text(200, "<html>"));

        let err = engine(&store, &http)
            .sync(&SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Fetch(FetchError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let http = Arc::new(FakeTransport::new());
        http.json(BUNDLE_URL, json!({"version": 1}));

        let err = engine(&store, &http)
            .sync(&SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Store(StoreError::Unavailable(_))));
        // Store failed before the bundle was requested.
        assert_eq!(http.calls(BUNDLE_URL), 0);
    }

    #[tokio::test]
    async fn test_invalid_record_aborts_before_version_commit() {
        let store = Arc::new(MemoryStore::new());
        let http = Arc::new(FakeTransport::new());
        http.json(
            BUNDLE_URL,
            json!({"version": 5, "species_en": [{"name": "no id"}]}),
        );

        let err = engine(&store, &http)
            .sync(&SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Store(StoreError::MissingKey { .. })));
        assert!(store.meta_get(BUNDLE_VERSION_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_panicking_progress_callback_does_not_break_sync() {
        let store = Arc::new(MemoryStore::new());
        let http = Arc::new(FakeTransport::new());
        http.json(BUNDLE_URL, json!({"version": 3}));

        let opts = SyncOptions::default().with_progress(|_| {
            panic!("ui bug");
        });
        let report = engine(&store, &http).sync(&opts).await.unwrap();
        assert_eq!(report.outcome, SyncOutcome::Applied);
        assert_eq!(store.meta_get(BUNDLE_VERSION_KEY).await.unwrap(), Some(json!(3)));
    }

    #[tokio::test]
    async fn test_non_numeric_local_version_forces_sync() {
        let store = Arc::new(MemoryStore::new());
        store.meta_set(BUNDLE_VERSION_KEY, json!("corrupt")).await.unwrap();
        let http = Arc::new(FakeTransport::new());
        http.json(BUNDLE_URL, json!({}));

        let report = engine(&store, &http).sync(&SyncOptions::default()).await.unwrap();
        assert_eq!(report.local_version, None);
        assert_eq!(report.remote_version, 1);
        assert_eq!(report.outcome, SyncOutcome::Applied);
        assert_eq!(store.meta_get(BUNDLE_VERSION_KEY).await.unwrap(), Some(json!(1)));
    }

    /// Delegates to a [`MemoryStore`] but rejects one media key.
    struct RejectingMediaStore {
        inner: MemoryStore,
        media_id: &'static str,
    }

    #[async_trait::async_trait]
    impl LocalStore for RejectingMediaStore {
        async fn put(&self, partition: Partition, value: serde_json::Value) -> Result<(), StoreError> {
            if partition == Partition::Media && partition.key_of(&value)? == self.media_id {
                return Err(StoreError::Rejected {
                    partition,
                    reason: "quota exceeded".to_string(),
                });
            }
            self.inner.put(partition, value).await
        }

        async fn get(
            &self,
            partition: Partition,
            key: &str,
        ) -> Result<Option<serde_json::Value>, StoreError> {
            self.inner.get(partition, key).await
        }

        async fn get_all(&self, partition: Partition) -> Result<Vec<serde_json::Value>, StoreError> {
            self.inner.get_all(partition).await
        }
    }

    #[tokio::test]
    async fn test_media_write_failure_aborts_before_version_commit() {
        let store = Arc::new(RejectingMediaStore {
            inner: MemoryStore::new(),
            media_id: "2",
        });
        let http = Arc::new(FakeTransport::new());
        http.json(
            BUNDLE_URL,
            json!({
                "version": 6,
                "species_en": [{"species_id": 1}],
                "media": [
                    {"media_id": 1, "download_link": "http://cdn/1.png"},
                    {"media_id": 2, "download_link": "http://cdn/2.png"},
                    {"media_id": 3, "download_link": "http://cdn/3.png"},
                ],
            }),
        );
        for url in ["http://cdn/1.png", "http://cdn/2.png", "http://cdn/3.png"] {
            http.bytes(url, "image/png", b"PNG");
        }

        let options = SyncOptions {
            media_concurrency: 1,
            ..SyncOptions::default()
        };
        let err = SyncEngine::new(store.clone(), http.clone())
            .sync(&options)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SyncError::Store(StoreError::Rejected { partition: Partition::Media, .. })
        ));
        assert!(store.meta_get(BUNDLE_VERSION_KEY).await.unwrap().is_none());
        assert!(store.inner.get(Partition::Media, "1").await.unwrap().is_some());
    }
}

