//! In-process [`LocalStore`] for tests and embedders that handle
//! persistence themselves.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{LocalStore, Partition, StoreError};

#[derive(Default)]
pub struct MemoryStore {
    partitions: Mutex<HashMap<Partition, BTreeMap<String, Value>>>,
    writes: AtomicUsize,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls since creation or the last reset.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn reset_write_count(&self) {
        self.writes.store(0, Ordering::SeqCst);
    }

    /// Simulate the backing storage going away. Every operation fails with
    /// `StoreError::Unavailable` until set back to `true`.
    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn put(&self, partition: Partition, value: Value) -> Result<(), StoreError> {
        self.check_available()?;
        let key = partition.key_of(&value)?;
        let mut partitions = self.partitions.lock().await;
        partitions.entry(partition).or_default().insert(key, value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>, StoreError> {
        self.check_available()?;
        let partitions = self.partitions.lock().await;
        Ok(partitions.get(&partition).and_then(|p| p.get(key)).cloned())
    }

    async fn get_all(&self, partition: Partition) -> Result<Vec<Value>, StoreError> {
        self.check_available()?;
        let partitions = self.partitions.lock().await;
        Ok(partitions
            .get(&partition)
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_index(&self, partition: Partition) -> Result<Vec<Value>, StoreError> {
        self.check_available()?;
        let partitions = self.partitions.lock().await;
        Ok(partitions
            .get(&partition)
            .map(|p| p.values().map(|v| partition.index_entry(v)).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_put_is_upsert() {
        let store = MemoryStore::new();
        store
            .put(Partition::SpeciesEn, json!({"species_id": 1, "name": "Turtle"}))
            .await
            .unwrap();
        store
            .put(Partition::SpeciesEn, json!({"species_id": 1, "name": "Green Turtle"}))
            .await
            .unwrap();

        let all = store.get_all(Partition::SpeciesEn).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0]["name"], "Green Turtle");
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_partitions_are_independent() {
        let store = MemoryStore::new();
        store
            .put(Partition::SpeciesEn, json!({"species_id": 1}))
            .await
            .unwrap();
        assert!(store.get(Partition::SpeciesTet, "1").await.unwrap().is_none());
        assert!(store.get(Partition::SpeciesEn, "1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_meta_roundtrip_and_missing() {
        let store = MemoryStore::new();
        assert!(store.meta_get("bundle_version").await.unwrap().is_none());

        store.meta_set("bundle_version", json!(4)).await.unwrap();
        assert_eq!(store.meta_get("bundle_version").await.unwrap(), Some(json!(4)));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails() {
        let store = MemoryStore::new();
        store.set_available(false);
        let err = store.meta_get("bundle_version").await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));

        let err = store
            .put(Partition::Media, json!({"media_id": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_put_without_key_is_rejected() {
        let store = MemoryStore::new();
        let err = store
            .put(Partition::Media, json!({"download_link": "http://x/a.png"}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingKey { field: "media_id", .. }));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_index_leaves_stored_blobs_intact() {
        let store = MemoryStore::new();
        store
            .put(Partition::Media, json!({"media_id": 1, "blob": "UE5H"}))
            .await
            .unwrap();

        let index = store.get_index(Partition::Media).await.unwrap();
        assert_eq!(index, vec![json!({"media_id": 1, "blob": true})]);
        let full = store.get(Partition::Media, "1").await.unwrap().unwrap();
        assert_eq!(full["blob"], "UE5H");
    }
}
