//! Media descriptors: normalization from heterogeneous upstream shapes and
//! the persisted record written to the `media` partition.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RecordId;

/// Content type recorded when the server does not send one.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Canonical media descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub media_id: RecordId,
    pub species_id: Option<RecordId>,
    pub species_name: String,
    pub media_type: String,
    pub download_link: String,
    pub streaming_link: String,
    pub alt_text: String,
}

impl MediaItem {
    /// Normalize a raw descriptor. `fallback_id` is used when no id field is
    /// present. Returns `None` when no download link can be resolved.
    pub fn normalize(raw: &Value, fallback_id: i64) -> Option<Self> {
        let download_link = first_text(raw, &["download_link", "media_url", "url"])
            .filter(|link| !link.is_empty())?;

        let media_id = first_present(raw, &["media_id", "id"])
            .and_then(RecordId::from_value)
            .unwrap_or(RecordId::Int(fallback_id));

        let streaming_link = first_text(raw, &["streaming_link", "stream_url"])
            .unwrap_or_else(|| download_link.clone());

        Some(Self {
            media_id,
            species_id: raw.get("species_id").and_then(RecordId::from_value),
            species_name: first_text(raw, &["species_name", "scientific_name"]).unwrap_or_default(),
            media_type: first_text(raw, &["media_type", "type"])
                .unwrap_or_else(|| "Unknown".to_string()),
            download_link,
            streaming_link,
            alt_text: first_text(raw, &["alt_text", "alt"]).unwrap_or_default(),
        })
    }
}

/// First of `fields` that is present and not null.
fn first_present<'a>(raw: &'a Value, fields: &[&str]) -> Option<&'a Value> {
    fields
        .iter()
        .filter_map(|field| raw.get(*field))
        .find(|v| !v.is_null())
}

/// Like [`first_present`] but rendered as text. Non-scalar values count as
/// absent.
fn first_text(raw: &Value, fields: &[&str]) -> Option<String> {
    match first_present(raw, fields)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A media item as persisted in the `media` partition: either with its
/// downloaded payload, or with `blob: null` and the download error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRecord {
    #[serde(flatten)]
    pub item: MediaItem,
    #[serde(default, with = "blob_base64")]
    pub blob: Option<Bytes>,
    #[serde(rename = "contentType", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "cachedAt", default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MediaRecord {
    pub fn cached(item: MediaItem, blob: Bytes, content_type: Option<String>) -> Self {
        Self {
            item,
            blob: Some(blob),
            content_type: Some(content_type.unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())),
            cached_at: Some(Utc::now()),
            error: None,
        }
    }

    pub fn failed(item: MediaItem, error: impl Into<String>) -> Self {
        Self {
            item,
            blob: None,
            content_type: None,
            cached_at: None,
            error: Some(error.into()),
        }
    }

    pub fn has_blob(&self) -> bool {
        self.blob.is_some()
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// True if any stored media value for `download_link` already carries a blob.
///
/// Deduplication is by link, not by `media_id`: two descriptors sharing a
/// link resolve to the same cached payload. Index entries from
/// [`LocalStore::get_index`](crate::store::LocalStore::get_index) are enough.
pub fn has_cached_blob(stored: &[Value], download_link: &str) -> bool {
    stored.iter().any(|record| {
        record.get("download_link").and_then(Value::as_str) == Some(download_link)
            && record.get("blob").is_some_and(|blob| !blob.is_null())
    })
}

mod blob_base64 {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(blob: &Option<Bytes>, serializer: S) -> Result<S::Ok, S::Error> {
        match blob {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Bytes>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|encoded| STANDARD.decode(encoded).map(Bytes::from).map_err(D::Error::custom))
            .transpose()
    }
}
