use std::fmt;

use serde_json::Value;

use super::StoreError;

/// A logical keyed collection in the local store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Partition {
    /// Species records, English locale.
    SpeciesEn,
    /// Species records, Tetum locale.
    SpeciesTet,
    /// Media descriptors and their downloaded blobs.
    Media,
    /// Scalar key/value metadata such as `bundle_version`.
    Metadata,
}

impl Partition {
    pub const ALL: [Partition; 4] = [
        Partition::SpeciesEn,
        Partition::SpeciesTet,
        Partition::Media,
        Partition::Metadata,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Partition::SpeciesEn => "species_en",
            Partition::SpeciesTet => "species_tet",
            Partition::Media => "media",
            Partition::Metadata => "metadata",
        }
    }

    /// Field of a stored value that holds its primary key.
    pub fn key_field(&self) -> &'static str {
        match self {
            Partition::SpeciesEn | Partition::SpeciesTet => "species_id",
            Partition::Media => "media_id",
            Partition::Metadata => "key",
        }
    }

    /// Field holding a large payload that index reads leave out.
    pub fn blob_field(&self) -> Option<&'static str> {
        match self {
            Partition::Media => Some("blob"),
            _ => None,
        }
    }

    /// Copy of `value` with the blob field reduced to `true` when it holds
    /// data. Other fields are kept as they are.
    pub fn index_entry(&self, value: &Value) -> Value {
        let (Some(field), Value::Object(map)) = (self.blob_field(), value) else {
            return value.clone();
        };
        let entry = map
            .iter()
            .map(|(k, v)| {
                if k == field && !v.is_null() {
                    (k.clone(), Value::Bool(true))
                } else {
                    (k.clone(), v.clone())
                }
            })
            .collect();
        Value::Object(entry)
    }

    /// Extract the primary key of `value`, canonicalized to a string.
    ///
    /// Integer and string keys are accepted, so `7` and `"7"` address the
    /// same entry.
    pub fn key_of(&self, value: &Value) -> Result<String, StoreError> {
        let field = self.key_field();
        match value.get(field) {
            None | Some(Value::Null) => Err(StoreError::MissingKey {
                partition: *self,
                field,
            }),
            Some(key) => canonical_key(key).ok_or(StoreError::InvalidKey {
                partition: *self,
                field,
            }),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// String form of a scalar JSON key, or `None` for null, arrays and objects.
pub fn canonical_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
