//! Runtime value types for campaign contexts
//!
//! The `Value` enum represents every scalar or simple value a caller can put
//! into an evaluation context. It mirrors JSON but keeps numbers as `f64` so
//! rule comparisons never have to juggle integer and float representations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Runtime value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// Number value (f64 handles both int and float)
    Number(f64),
    /// String value
    String(String),
    /// Array of values
    Array(Vec<Value>),
    /// Object (key-value map)
    Object(HashMap<String, Value>),
}

impl Value {
    /// Numeric view of the value, if it is a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String view of the value, if it is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Array view of the value, if it is an array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type name used in log and error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// Convert into a `serde_json::Value`
    ///
    /// Non-finite numbers have no JSON representation and become `null`.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s),
            Value::Array(items) => {
                serde_json::Value::Array(items.into_iter().map(Value::into_json).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.into_iter().map(|(k, v)| (k, v.into_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_json_object() {
        let json = serde_json::json!({
            "industry": "technology",
            "budget": 1000,
            "active": true,
            "audience_age": [25, 45]
        });

        match Value::from(json) {
            Value::Object(map) => {
                assert_eq!(map.get("industry"), Some(&Value::String("technology".into())));
                assert_eq!(map.get("budget"), Some(&Value::Number(1000.0)));
                assert_eq!(map.get("active"), Some(&Value::Bool(true)));
                assert_eq!(
                    map.get("audience_age"),
                    Some(&Value::Array(vec![Value::Number(25.0), Value::Number(45.0)]))
                );
            }
            other => panic!("Expected Object, got {:?}", other),
        }
    }

    #[test]
    fn test_value_into_json() {
        let val = Value::Array(vec![Value::Number(1.5), Value::String("a".into()), Value::Null]);
        assert_eq!(val.into_json(), serde_json::json!([1.5, "a", null]));
    }

    #[test]
    fn test_non_finite_number_becomes_null() {
        assert_eq!(Value::Number(f64::NAN).into_json(), serde_json::Value::Null);
    }

    #[test]
    fn test_value_accessors() {
        assert_eq!(Value::Number(2.0).as_f64(), Some(2.0));
        assert_eq!(Value::String("x".into()).as_f64(), None);
        assert_eq!(Value::String("x".into()).as_str(), Some("x"));
        assert!(Value::Null.is_null());
        assert_eq!(Value::Bool(true).type_name(), "bool");
    }

    #[test]
    fn test_value_serde_untagged() {
        let val: Value = serde_json::from_str(r#"{"ctr": 0.08}"#).unwrap();
        match val {
            Value::Object(map) => assert_eq!(map.get("ctr"), Some(&Value::Number(0.08))),
            _ => panic!("Expected Object"),
        }
    }
}
