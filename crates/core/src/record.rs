//! Record model shared by training and serving
//!
//! A record is one customer's attribute set: field name to scalar value.
//! Fields are kept in a `BTreeMap` so iteration never depends on the order
//! in which a client or CSV happened to list them.

use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{CoreError, Result};

/// Scalar value carried by a record field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl FieldValue {
    /// Numeric view of the value; strings are accepted when they parse as numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Float(v) => Some(*v),
            FieldValue::Str(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldValue::Int(_) | FieldValue::Float(_))
    }

    /// Categorical view of the value.
    pub fn as_category(&self) -> String {
        match self {
            FieldValue::Str(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

/// One customer's attributes keyed by normalized field name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with<K: Into<String>, V: Into<FieldValue>>(mut self, key: K, value: V) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert<K: Into<String>, V: Into<FieldValue>>(&mut self, key: K, value: V) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    /// Convert a decoded JSON object into a record.
    ///
    /// Strings and numbers are accepted; any other JSON type is rejected with
    /// an error naming the offending field.
    pub fn from_json_object(object: &Map<String, Value>) -> Result<Self> {
        let mut record = Record::new();
        for (key, value) in object {
            let field = match value {
                Value::String(s) => FieldValue::Str(s.clone()),
                Value::Number(n) => {
                    if let Some(i) = n.as_i64() {
                        FieldValue::Int(i)
                    } else if let Some(f) = n.as_f64() {
                        FieldValue::Float(f)
                    } else {
                        return Err(CoreError::invalid_field(key, "number out of range"));
                    }
                }
                Value::Null => return Err(CoreError::invalid_field(key, "null value")),
                Value::Bool(_) => {
                    return Err(CoreError::invalid_field(key, "expected string or number, got bool"))
                }
                Value::Array(_) | Value::Object(_) => {
                    return Err(CoreError::invalid_field(
                        key,
                        "expected string or number, got nested value",
                    ))
                }
            };
            record.fields.insert(key.clone(), field);
        }
        Ok(record)
    }

    /// Convert any JSON value into a record; the value must be an object.
    pub fn from_json_value(value: &Value) -> Result<Self> {
        match value {
            Value::Object(map) => Self::from_json_object(map),
            _ => Err(CoreError::invalid_field("<body>", "expected a JSON object")),
        }
    }
}

impl FromIterator<(String, FieldValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, FieldValue)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_object_converts_scalars() {
        let value = json!({"gender": "female", "tenure": 1, "monthlycharges": 29.85});
        let record = Record::from_json_value(&value).unwrap();

        assert_eq!(record.get("gender"), Some(&FieldValue::Str("female".into())));
        assert_eq!(record.get("tenure"), Some(&FieldValue::Int(1)));
        assert_eq!(record.get("monthlycharges"), Some(&FieldValue::Float(29.85)));
    }

    #[test]
    fn json_rejects_nested_and_bool_values() {
        let err = Record::from_json_value(&json!({"partner": true})).unwrap_err();
        assert!(matches!(err, CoreError::InvalidField { ref field, .. } if field == "partner"));

        let err = Record::from_json_value(&json!({"tags": ["a"]})).unwrap_err();
        assert!(matches!(err, CoreError::InvalidField { ref field, .. } if field == "tags"));

        assert!(Record::from_json_value(&json!([1, 2])).is_err());
    }

    #[test]
    fn numeric_view_parses_strings() {
        assert_eq!(FieldValue::from("29.85").as_f64(), Some(29.85));
        assert_eq!(FieldValue::from(" ").as_f64(), None);
        assert_eq!(FieldValue::from("nan").as_f64(), None);
        assert_eq!(FieldValue::Int(3).as_f64(), Some(3.0));
    }

    #[test]
    fn field_order_is_irrelevant() {
        let a = Record::new().with("a", 1i64).with("b", "x");
        let b = Record::new().with("b", "x").with("a", 1i64);
        assert_eq!(a, b);
    }
}
