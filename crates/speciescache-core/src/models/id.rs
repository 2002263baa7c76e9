use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier as it appears upstream: usually an integer, sometimes a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Read an id from a scalar JSON value. Integral floats such as `3.0`
    /// are integers; other numbers keep their JSON spelling as text. Null,
    /// arrays and objects are not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(
                n.as_i64()
                    .or_else(|| {
                        n.as_f64()
                            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                            .map(|f| f as i64)
                    })
                    .map(RecordId::Int)
                    .unwrap_or_else(|| RecordId::Text(n.to_string())),
            ),
            Value::String(s) => Some(RecordId::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Text(s) => f.write_str(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        assert_eq!(RecordId::from_value(&json!(5)), Some(RecordId::Int(5)));
        assert_eq!(RecordId::from_value(&json!("m-5")), Some(RecordId::Text("m-5".into())));
        assert_eq!(RecordId::from_value(&json!(null)), None);
        assert_eq!(RecordId::from_value(&json!({"id": 1})), None);
    }

    #[test]
    fn test_from_value_keeps_unusual_numbers() {
        assert_eq!(RecordId::from_value(&json!(3.0)), Some(RecordId::Int(3)));
        assert_eq!(
            RecordId::from_value(&json!(18446744073709551615u64)),
            Some(RecordId::Text("18446744073709551615".into()))
        );
        assert_eq!(RecordId::from_value(&json!(1.5)), Some(RecordId::Text("1.5".into())));
    }

    #[test]
    fn test_serializes_as_scalar() {
        assert_eq!(serde_json::to_value(RecordId::Int(3)).unwrap(), json!(3));
        assert_eq!(serde_json::to_value(RecordId::Text("a".into())).unwrap(), json!("a"));
    }
}
