//! Directory-backed cache storage.
//!
//! Layout under the root:
//!
//! ```text
//! <generation>/index.json   url -> { file, status, content_type }
//! <generation>/<n>.body     raw response body
//! ```
//!
//! Deleting a generation removes its directory.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::{AssetCache, CacheError, CacheStorage};
use crate::http::AssetResponse;

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Index {
    next_file: u64,
    entries: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexEntry {
    file: String,
    status: u16,
    content_type: Option<String>,
}

pub struct DiskCache {
    dir: PathBuf,
    index: Mutex<Option<Index>>,
}

impl DiskCache {
    fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            index: Mutex::new(None),
        }
    }

    async fn load_index(&self) -> Result<Index, CacheError> {
        match tokio::fs::read(self.dir.join(INDEX_FILE)).await {
            Ok(contents) => Ok(serde_json::from_slice(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Index::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save_index(&self, index: &Index) -> Result<(), CacheError> {
        let path = self.dir.join(INDEX_FILE);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(index)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl AssetCache for DiskCache {
    async fn match_url(&self, url: &str) -> Result<Option<AssetResponse>, CacheError> {
        // Held across the body read so a concurrent put cannot swap the file.
        let mut guard = self.index.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_index().await?);
        }
        let Some(entry) = guard.as_ref().and_then(|index| index.entries.get(url)).cloned() else {
            return Ok(None);
        };

        match tokio::fs::read(self.dir.join(&entry.file)).await {
            Ok(body) => Ok(Some(AssetResponse::new(
                entry.status,
                entry.content_type,
                Bytes::from(body),
            ))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(url, file = %entry.file, "Cache body missing, treating as miss");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every put writes a new body file; the index only ever points at a
    /// complete one.
    async fn put(&self, url: &str, response: AssetResponse) -> Result<(), CacheError> {
        let mut guard = self.index.lock().await;
        let mut index = match guard.take() {
            Some(index) => index,
            None => self.load_index().await?,
        };

        index.next_file += 1;
        let file = format!("{}.body", index.next_file);
        tokio::fs::write(self.dir.join(&file), &response.body).await?;

        let replaced = index.entries.insert(
            url.to_string(),
            IndexEntry {
                file,
                status: response.status,
                content_type: response.content_type,
            },
        );
        self.save_index(&index).await?;
        *guard = Some(index);

        if let Some(old) = replaced {
            if let Err(e) = tokio::fs::remove_file(self.dir.join(&old.file)).await {
                debug!(url, file = %old.file, error = %e, "Failed to remove replaced body");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for DiskCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn AssetCache>, CacheError> {
        let dir = self.generation_dir(name)?;
        let mut open = self.open.lock().await;
        if let Some(cache) = open.get(name) {
            if dir.exists() {
                let cache: Arc<dyn AssetCache> = cache.clone();
                return Ok(cache);
            }
        }
        tokio::fs::create_dir_all(&dir).await?;
        let cache = Arc::new(DiskCache::new(dir));
        open.insert(name.to_string(), cache.clone());
        Ok(cache as Arc<dyn AssetCache>)
    }

    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let mut names = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        let dir = self.generation_dir(name)?;
        self.open.lock().await.remove(name);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_entries_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let storage = DiskCacheStorage::open_root(dir.path()).unwrap();
            let cache = storage.open("species-app-v1").await.unwrap();
            cache
                .put(
                    "http://app/icons/icon-192x192.png",
                    AssetResponse::new(200, Some("image/png".into()), vec![1u8, 2, 3]),
                )
                .await
                .unwrap();
        }

        let storage = DiskCacheStorage::open_root(dir.path()).unwrap();
        let cache = storage.open("species-app-v1").await.unwrap();
        let hit = cache
            .match_url("http://app/icons/icon-192x192.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.content_type.as_deref(), Some("image/png"));
        assert_eq!(&hit.body[..], &[1, 2, 3]);
    }

    fn body_files(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".body"))
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_overwrite_writes_fresh_body_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open_root(dir.path()).unwrap();
        let cache = storage.open("v1").await.unwrap();
        cache.put("http://app/a", AssetResponse::text(200, "one")).await.unwrap();
        assert_eq!(body_files(&dir.path().join("v1")), vec!["1.body"]);

        cache.put("http://app/a", AssetResponse::text(200, "two")).await.unwrap();
        let hit = cache.match_url("http://app/a").await.unwrap().unwrap();
        assert_eq!(hit.body_text(), "two");
        assert_eq!(body_files(&dir.path().join("v1")), vec!["2.body"]);
    }

    #[tokio::test]
    async fn test_reads_during_overwrite_see_whole_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open_root(dir.path()).unwrap();
        let cache = storage.open("v1").await.unwrap();
        let old = vec![b'a'; 256 * 1024];
        let new = vec![b'b'; 512 * 1024];
        cache
            .put("http://app/clip.mp4", AssetResponse::new(200, None, old.clone()))
            .await
            .unwrap();

        let writer = {
            let cache = cache.clone();
            let new = new.clone();
            tokio::spawn(async move {
                for _ in 0..4 {
                    cache
                        .put("http://app/clip.mp4", AssetResponse::new(200, None, new.clone()))
                        .await
                        .unwrap();
                }
            })
        };
        for _ in 0..16 {
            let hit = cache.match_url("http://app/clip.mp4").await.unwrap().unwrap();
            assert!(hit.body[..] == old[..] || hit.body[..] == new[..]);
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();

        let hit = cache.match_url("http://app/clip.mp4").await.unwrap().unwrap();
        assert_eq!(hit.body.len(), new.len());
        assert_eq!(body_files(&dir.path().join("v1")).len(), 1);
    }

    #[tokio::test]
    async fn test_keys_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open_root(dir.path()).unwrap();
        storage.open("species-app-v0").await.unwrap();
        storage.open("species-app-v1").await.unwrap();
        assert_eq!(
            storage.keys().await.unwrap(),
            vec!["species-app-v0", "species-app-v1"]
        );

        assert!(storage.delete("species-app-v0").await.unwrap());
        assert!(!dir.path().join("species-app-v0").exists());
        assert_eq!(storage.keys().await.unwrap(), vec!["species-app-v1"]);
    }

    #[tokio::test]
    async fn test_rejects_path_like_names() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskCacheStorage::open_root(dir.path()).unwrap();
        assert!(matches!(storage.open("../escape").await, Err(CacheError::InvalidName(_))));
        assert!(matches!(storage.open("").await, Err(CacheError::InvalidName(_))));
    }
}
