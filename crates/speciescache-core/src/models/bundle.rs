//! The remote bundle payload served at `{base_url}{bundle_path}`.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Version assumed when the bundle carries neither `version` nor
/// `bundle_version`.
pub const DEFAULT_BUNDLE_VERSION: i64 = 1;

/// Metadata key holding the last applied bundle version.
pub const BUNDLE_VERSION_KEY: &str = "bundle_version";

/// A versioned snapshot of species records and media descriptors.
///
/// Records and descriptors are kept as raw JSON: records are replaced
/// wholesale and descriptors are normalized by
/// [`MediaItem::normalize`](super::MediaItem::normalize).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub bundle_version: Option<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub species_en: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub species_tet: Vec<Value>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub media: Vec<Value>,
}

impl Bundle {
    /// Version of this bundle: `version`, then `bundle_version`, then
    /// [`DEFAULT_BUNDLE_VERSION`]. A field that is present but not numeric
    /// is skipped.
    pub fn remote_version(&self) -> i64 {
        for (field, value) in [("version", &self.version), ("bundle_version", &self.bundle_version)] {
            match value {
                None | Some(Value::Null) => continue,
                Some(v) => match parse_version(v) {
                    Some(version) => return version,
                    None => warn!(field, value = %v, "Ignoring non-numeric bundle version"),
                },
            }
        }
        DEFAULT_BUNDLE_VERSION
    }
}

/// Numeric reading of a stored or remote version value.
///
/// Integers, integral floats and numeric strings are versions; anything
/// else (including null) is "no version", which never equals a real one.
pub fn parse_version(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && f.fract() == 0.0)
                        .map(|f| f as i64)
                })
        }
        _ => None,
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bundle(value: Value) -> Bundle {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_version_field_wins() {
        let b = bundle(json!({"version": 5, "bundle_version": 9}));
        assert_eq!(b.remote_version(), 5);
    }

    #[test]
    fn test_bundle_version_alias() {
        let b = bundle(json!({"bundle_version": "7"}));
        assert_eq!(b.remote_version(), 7);
    }

    #[test]
    fn test_missing_version_defaults_to_one() {
        assert_eq!(bundle(json!({})).remote_version(), 1);
        assert_eq!(bundle(json!({"version": null})).remote_version(), 1);
    }

    #[test]
    fn test_non_numeric_version_falls_through() {
        let b = bundle(json!({"version": "latest", "bundle_version": 3}));
        assert_eq!(b.remote_version(), 3);
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version(&json!(4)), Some(4));
        assert_eq!(parse_version(&json!(4.0)), Some(4));
        assert_eq!(parse_version(&json!(" 12 ")), Some(12));
        assert_eq!(parse_version(&json!(4.5)), None);
        assert_eq!(parse_version(&json!("none")), None);
        assert_eq!(parse_version(&json!(null)), None);
        assert_eq!(parse_version(&json!(true)), None);
    }

    #[test]
    fn test_collections_default_empty() {
        let b = bundle(json!({"version": 2, "species_en": null}));
        assert!(b.species_en.is_empty());
        assert!(b.species_tet.is_empty());
        assert!(b.media.is_empty());
    }
}
