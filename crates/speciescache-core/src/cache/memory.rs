use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AssetCache, CacheError, CacheStorage};
use crate::http::AssetResponse;

#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, AssetResponse>>,
}

impl MemoryCache {
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl AssetCache for MemoryCache {
    async fn match_url(&self, url: &str) -> Result<Option<AssetResponse>, CacheError> {
        Ok(self.entries.lock().await.get(url).cloned())
    }

    async fn put(&self, url: &str, response: AssetResponse) -> Result<(), CacheError> {
        self.entries.lock().await.insert(url.to_string(), response);
        Ok(())
    }
}

/// In-process cache storage.
#[derive(Default)]
pub struct MemoryCacheStorage {
    generations: Mutex<BTreeMap<String, Arc<MemoryCache>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete handle to a generation, if it exists.
    pub async fn generation(&self, name: &str) -> Option<Arc<MemoryCache>> {
        self.generations.lock().await.get(name).cloned()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn AssetCache>, CacheError> {
        let mut generations = self.generations.lock().await;
        let cache: Arc<dyn AssetCache> = generations.entry(name.to_string()).or_default().clone();
        Ok(cache)
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.generations.lock().await.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        Ok(self.generations.lock().await.remove(name).is_some())
    }
}
