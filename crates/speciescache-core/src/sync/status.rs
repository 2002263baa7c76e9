use serde::Serialize;

use crate::models::{parse_version, BUNDLE_VERSION_KEY};
use crate::store::{LocalStore, Partition, StoreError};

/// What the offline mirror currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LocalStatus {
    pub bundle_version: Option<i64>,
    pub species_en: usize,
    pub species_tet: usize,
    /// Media records with a stored blob.
    pub media_cached: usize,
    /// Media records whose last download failed.
    pub media_failed: usize,
}

impl LocalStatus {
    pub fn version_display(&self) -> String {
        self.bundle_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    }
}

pub async fn local_status(store: &dyn LocalStore) -> Result<LocalStatus, StoreError> {
    let bundle_version = store
        .meta_get(BUNDLE_VERSION_KEY)
        .await?
        .as_ref()
        .and_then(parse_version);
    let media = store.get_index(Partition::Media).await?;
    let media_cached = media
        .iter()
        .filter(|m| m.get("blob").is_some_and(|b| !b.is_null()))
        .count();

    Ok(LocalStatus {
        bundle_version,
        species_en: store.get_all(Partition::SpeciesEn).await?.len(),
        species_tet: store.get_all(Partition::SpeciesTet).await?.len(),
        media_cached,
        media_failed: media.len() - media_cached,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_store_status() {
        let store = MemoryStore::new();
        let status = local_status(&store).await.unwrap();
        assert_eq!(status, LocalStatus::default());
        assert_eq!(status.version_display(), "none");
    }

    #[tokio::test]
    async fn test_status_counts() {
        let store = MemoryStore::new();
        store.meta_set(BUNDLE_VERSION_KEY, json!(6)).await.unwrap();
        store.put(Partition::SpeciesEn, json!({"species_id": 1})).await.unwrap();
        store.put(Partition::SpeciesEn, json!({"species_id": 2})).await.unwrap();
        store.put(Partition::SpeciesTet, json!({"species_id": 1})).await.unwrap();
        store
            .put(Partition::Media, json!({"media_id": 1, "blob": "AAAA"}))
            .await
            .unwrap();
        store
            .put(Partition::Media, json!({"media_id": 2, "blob": null, "error": "404"}))
            .await
            .unwrap();

        let status = local_status(&store).await.unwrap();
        assert_eq!(status.bundle_version, Some(6));
        assert_eq!(status.species_en, 2);
        assert_eq!(status.species_tet, 1);
        assert_eq!(status.media_cached, 1);
        assert_eq!(status.media_failed, 1);
        assert_eq!(status.version_display(), "6");
    }
}
