//! Directory-backed [`LocalStore`].
//!
//! Layout under the root:
//!
//! ```text
//! <partition>.json               key -> value, blob fields as file references
//! <partition>.blobs/<key>.blob   contents of one value's blob field
//! ```
//!
//! Every file is written to a temp path and renamed over the original, so a
//! crash leaves either the old or the new copy. A put rewrites the partition
//! file plus at most one blob file.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::{LocalStore, Partition, StoreError};

type Entries = BTreeMap<String, Value>;

/// Key of the reference object that stands in for a blob in the partition
/// file: `{"$file": "<name>.blob"}`.
const BLOB_REF: &str = "$file";

pub struct JsonFileStore {
    root: PathBuf,
    partitions: HashMap<Partition, Mutex<Option<Entries>>>,
}

/// Blob file name for `key`. Hex keeps arbitrary keys path-safe.
fn blob_file_name(key: &str) -> String {
    let mut name: String = key.bytes().map(|b| format!("{:02x}", b)).collect();
    name.push_str(".blob");
    name
}

fn blob_ref<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field)?.get(BLOB_REF)?.as_str()
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, contents).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

impl JsonFileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let partitions = Partition::ALL
            .iter()
            .map(|p| (*p, Mutex::new(None)))
            .collect();
        Ok(Self { root, partitions })
    }

    fn partition_path(&self, partition: Partition) -> PathBuf {
        self.root.join(format!("{}.json", partition.name()))
    }

    fn blob_dir(&self, partition: Partition) -> PathBuf {
        self.root.join(format!("{}.blobs", partition.name()))
    }

    fn slot(&self, partition: Partition) -> Result<&Mutex<Option<Entries>>, StoreError> {
        self.partitions
            .get(&partition)
            .ok_or_else(|| StoreError::Unavailable(format!("partition {} not opened", partition)))
    }

    async fn load(&self, partition: Partition) -> Result<Entries, StoreError> {
        let path = self.partition_path(partition);
        match tokio::fs::read(&path).await {
            Ok(contents) => Ok(serde_json::from_slice(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn persist(&self, partition: Partition, entries: &Entries) -> Result<(), StoreError> {
        let contents = serde_json::to_vec(entries)?;
        write_atomic(&self.partition_path(partition), &contents).await?;
        debug!(partition = %partition, entries = entries.len(), "Partition persisted");
        Ok(())
    }

    /// Move a string blob field into its own file and leave a reference.
    async fn externalize(
        &self,
        partition: Partition,
        key: &str,
        mut value: Value,
    ) -> Result<Value, StoreError> {
        let Some(field) = partition.blob_field() else {
            return Ok(value);
        };
        let Some(Value::String(data)) = value.get(field) else {
            return Ok(value);
        };
        let dir = self.blob_dir(partition);
        let file = blob_file_name(key);
        tokio::fs::create_dir_all(&dir).await?;
        write_atomic(&dir.join(&file), data.as_bytes()).await?;
        value[field] = json!({ BLOB_REF: file });
        Ok(value)
    }

    /// Replace a blob reference with the file's contents. A missing file
    /// reads as a null blob.
    async fn hydrate(&self, partition: Partition, mut value: Value) -> Result<Value, StoreError> {
        let Some(field) = partition.blob_field() else {
            return Ok(value);
        };
        let Some(file) = blob_ref(&value, field).map(str::to_string) else {
            return Ok(value);
        };
        let blob = match tokio::fs::read_to_string(self.blob_dir(partition).join(&file)).await {
            Ok(data) => Value::String(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(partition = %partition, file = %file, "Blob file missing");
                Value::Null
            }
            Err(e) => return Err(e.into()),
        };
        value[field] = blob;
        Ok(value)
    }

    async fn loaded<'a>(
        &self,
        partition: Partition,
        guard: &'a mut Option<Entries>,
    ) -> Result<&'a Entries, StoreError> {
        if guard.is_none() {
            *guard = Some(self.load(partition).await?);
        }
        Ok(guard.get_or_insert_with(Entries::new))
    }
}

#[async_trait]
impl LocalStore for JsonFileStore {
    async fn put(&self, partition: Partition, value: Value) -> Result<(), StoreError> {
        let key = partition.key_of(&value)?;
        let rejected = |e: StoreError| StoreError::Rejected {
            partition,
            reason: e.to_string(),
        };

        let mut guard = self.slot(partition)?.lock().await;
        let mut entries = match guard.take() {
            Some(entries) => entries,
            None => self.load(partition).await?,
        };
        let stored = self
            .externalize(partition, &key, value)
            .await
            .map_err(rejected)?;
        let replaced = entries.insert(key.clone(), stored);

        // Only adopt the new map once it is on disk.
        self.persist(partition, &entries).await.map_err(rejected)?;

        if let Some(field) = partition.blob_field() {
            let dropped = replaced.as_ref().and_then(|old| blob_ref(old, field));
            let kept = entries.get(&key).and_then(|new| blob_ref(new, field));
            if let Some(file) = dropped.filter(|_| kept.is_none()) {
                if let Err(e) = tokio::fs::remove_file(self.blob_dir(partition).join(file)).await {
                    debug!(partition = %partition, file, error = %e, "Failed to remove stale blob");
                }
            }
        }
        *guard = Some(entries);
        Ok(())
    }

    async fn get(&self, partition: Partition, key: &str) -> Result<Option<Value>, StoreError> {
        let mut guard = self.slot(partition)?.lock().await;
        let entry = self.loaded(partition, &mut guard).await?.get(key).cloned();
        match entry {
            Some(value) => Ok(Some(self.hydrate(partition, value).await?)),
            None => Ok(None),
        }
    }

    async fn get_all(&self, partition: Partition) -> Result<Vec<Value>, StoreError> {
        let mut guard = self.slot(partition)?.lock().await;
        let values: Vec<Value> = self
            .loaded(partition, &mut guard)
            .await?
            .values()
            .cloned()
            .collect();
        let mut all = Vec::with_capacity(values.len());
        for value in values {
            all.push(self.hydrate(partition, value).await?);
        }
        Ok(all)
    }

    async fn get_index(&self, partition: Partition) -> Result<Vec<Value>, StoreError> {
        let mut guard = self.slot(partition)?.lock().await;
        Ok(self
            .loaded(partition, &mut guard)
            .await?
            .values()
            .map(|v| partition.index_entry(v))
            .collect())
    }
}
