use std::sync::Arc;

use async_trait::async_trait;

use super::CacheError;
use crate::http::AssetResponse;

/// One named cache generation: request URL → stored response.
#[async_trait]
pub trait AssetCache: Send + Sync {
    async fn match_url(&self, url: &str) -> Result<Option<AssetResponse>, CacheError>;

    async fn put(&self, url: &str, response: AssetResponse) -> Result<(), CacheError>;
}

/// The set of cache generations. Generations are created on `open` and
/// removed wholesale by `delete`.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn open(&self, name: &str) -> Result<Arc<dyn AssetCache>, CacheError>;

    async fn keys(&self) -> Result<Vec<String>, CacheError>;

    /// Returns whether a generation with that name existed.
    async fn delete(&self, name: &str) -> Result<bool, CacheError>;
}
