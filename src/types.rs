use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

use crate::error::SqlAccessorError;

/// Values that can be stored in a database row or used as query parameters.
///
/// ```rust
/// use pg_crud_accessor::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether `update` writes this value into its SET list.
    ///
    /// Truthy values are written, and so are exactly `""` and exactly `false`, which lets a
    /// caller clear a field. `NULL`, zero and NaN are skipped.
    #[must_use]
    pub fn is_update_candidate(&self) -> bool {
        match self {
            RowValues::Null => false,
            RowValues::Int(i) => *i != 0,
            RowValues::Float(f) => *f != 0.0 && !f.is_nan(),
            RowValues::Text(_) | RowValues::Bool(_) => true,
            RowValues::Timestamp(_) | RowValues::Blob(_) => true,
            RowValues::JSON(json) => match json {
                JsonValue::Null => false,
                JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
                _ => true,
            },
        }
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_json(&self) -> Option<&JsonValue> {
        if let RowValues::JSON(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Render this value as JSON, used when rows are serialized.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            RowValues::Int(i) => JsonValue::from(*i),
            RowValues::Float(f) => JsonValue::from(*f),
            RowValues::Text(s) => JsonValue::from(s.as_str()),
            RowValues::Bool(b) => JsonValue::from(*b),
            RowValues::Timestamp(dt) => JsonValue::from(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            RowValues::Null => JsonValue::Null,
            RowValues::JSON(json) => json.clone(),
            RowValues::Blob(bytes) => JsonValue::from(bytes.clone()),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Scalars map onto their natural variant; arrays and objects stay JSON.
impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => RowValues::Null,
            JsonValue::Bool(b) => RowValues::Bool(b),
            JsonValue::String(s) => RowValues::Text(s),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => RowValues::Int(i),
                None => n.as_f64().map_or(RowValues::JSON(JsonValue::Number(n)), RowValues::Float),
            },
            other => RowValues::JSON(other),
        }
    }
}

/// An ordered column -> value mapping used as the payload of `insert` and `update`.
///
/// Iteration follows insertion order, which becomes the column order of the generated SQL.
///
/// ```rust
/// use pg_crud_accessor::prelude::*;
///
/// let record = Record::new().with("name", "Ann").with("active", false);
/// assert_eq!(record.keys().collect::<Vec<_>>(), vec!["name", "active"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<(String, RowValues)>,
}

impl Record {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`. An existing key keeps its position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<RowValues>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key, value));
        }
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<RowValues>) -> Self {
        self.insert(key, value);
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&RowValues> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Build a record from a JSON object, keeping the object's key order.
    ///
    /// # Errors
    /// Returns `SqlAccessorError::ParameterError` if `value` is not an object.
    pub fn from_json(value: JsonValue) -> Result<Self, SqlAccessorError> {
        match value {
            JsonValue::Object(map) => Ok(map.into_iter().collect()),
            other => Err(SqlAccessorError::ParameterError(format!(
                "record must be a JSON object, got {other}"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<RowValues>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a (String, RowValues);
    type IntoIter = std::slice::Iter<'a, (String, RowValues)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_predicate_keeps_empty_string_and_false() {
        assert!(RowValues::Text(String::new()).is_update_candidate());
        assert!(RowValues::Bool(false).is_update_candidate());
        assert!(RowValues::Bool(true).is_update_candidate());
        assert!(RowValues::Text("x".into()).is_update_candidate());
        assert!(RowValues::Int(-1).is_update_candidate());
        assert!(RowValues::JSON(json!({})).is_update_candidate());
    }

    #[test]
    fn update_predicate_skips_null_zero_and_nan() {
        assert!(!RowValues::Null.is_update_candidate());
        assert!(!RowValues::Int(0).is_update_candidate());
        assert!(!RowValues::Float(0.0).is_update_candidate());
        assert!(!RowValues::Float(f64::NAN).is_update_candidate());
        assert!(!RowValues::JSON(json!(null)).is_update_candidate());
        assert!(!RowValues::JSON(json!(0)).is_update_candidate());
    }

    #[test]
    fn record_replaces_in_place() {
        let mut record = Record::new().with("a", 1).with("b", 2);
        record.insert("a", 3);
        let pairs: Vec<_> = record.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), RowValues::Int(3)),
                ("b".to_string(), RowValues::Int(2))
            ]
        );
    }

    #[test]
    fn record_from_json_preserves_key_order() {
        let record =
            Record::from_json(json!({"zeta": 1, "alpha": "x", "mid": null, "f": 1.5})).unwrap();
        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["zeta", "alpha", "mid", "f"]);
        assert_eq!(record.get("mid"), Some(&RowValues::Null));
        assert_eq!(record.get("f"), Some(&RowValues::Float(1.5)));
        assert!(Record::from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn optional_values_become_null() {
        assert_eq!(RowValues::from(None::<i64>), RowValues::Null);
        assert_eq!(RowValues::from(Some("x")), RowValues::Text("x".into()));
    }
}
