use async_trait::async_trait;
use serde_json::{json, Value};

use super::{Partition, StoreError};

/// Persistent keyed collections backing the offline mirror.
///
/// Every operation is atomic with respect to its own partition. Nothing
/// spans partitions, and callers never expect it to.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Insert or replace `value`, keyed by the partition's key field.
    async fn put(&self, partition: Partition, value: Value) -> Result<(), StoreError>;

    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>, StoreError>;

    /// All values in the partition, ordered by key.
    async fn get_all(&self, partition: Partition) -> Result<Vec<Value>, StoreError>;

    /// All values ordered by key, without blob payloads (see
    /// [`Partition::index_entry`]). Backends that keep blobs apart override
    /// this so lookups never read them.
    async fn get_index(&self, partition: Partition) -> Result<Vec<Value>, StoreError> {
        let values = self.get_all(partition).await?;
        Ok(values.iter().map(|v| partition.index_entry(v)).collect())
    }

    /// Upsert each value in order, stopping at the first failure.
    async fn put_many(&self, partition: Partition, values: Vec<Value>) -> Result<(), StoreError> {
        for value in values {
            self.put(partition, value).await?;
        }
        Ok(())
    }

    async fn meta_get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let row = self.get(Partition::Metadata, key).await?;
        Ok(row
            .and_then(|mut r| r.get_mut("value").map(Value::take))
            .filter(|v| !v.is_null()))
    }

    async fn meta_set(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.put(Partition::Metadata, json!({ "key": key, "value": value }))
            .await
    }
}
