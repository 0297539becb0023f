//! Dynamic attribute values exchanged with the host runtime
//!
//! The host models every attribute as one of three states: absent (`Null`),
//! not yet computed (`Unknown`), or a known value. `Value` is the untyped
//! tree the runtime hands to the controller for configuration, plans and
//! state. Typed models are produced from it with [`Value::decode`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::path::{AttrPath, PathStep};

/// Key used to carry `Unknown` through JSON (`{"$unknown": true}`)
pub const UNKNOWN_MARKER: &str = "$unknown";

static NULL: Value = Value::Null;

/// A dynamically typed attribute value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Unknown,
    Bool(bool),
    Number(i64),
    String(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Build an object from key/value pairs
    pub fn object<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Value::Unknown)
    }

    /// Neither null nor unknown
    pub fn is_known(&self) -> bool {
        !self.is_null() && !self.is_unknown()
    }

    /// True when no `Unknown` appears anywhere in the tree
    pub fn is_wholly_known(&self) -> bool {
        match self {
            Value::Unknown => false,
            Value::List(items) => items.iter().all(Value::is_wholly_known),
            Value::Object(fields) => fields.values().all(Value::is_wholly_known),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Get an object field; missing fields and non-objects read as `Null`
    pub fn get(&self, name: &str) -> &Value {
        match self {
            Value::Object(fields) => fields.get(name).unwrap_or(&NULL),
            _ => &NULL,
        }
    }

    /// Walk a path; anything missing along the way reads as `Null`
    pub fn at(&self, path: &AttrPath) -> &Value {
        let mut current = self;
        for step in path.steps() {
            current = match (step, current) {
                (PathStep::Attribute(name), Value::Object(fields)) => {
                    fields.get(name).unwrap_or(&NULL)
                }
                (PathStep::Index(index), Value::List(items)) => items.get(*index).unwrap_or(&NULL),
                (_, Value::Unknown) => return current,
                _ => return &NULL,
            };
        }
        current
    }

    /// Set the value at a path, creating intermediate objects as needed
    pub fn set(&mut self, path: &AttrPath, value: Value) -> Result<()> {
        let steps = path.steps();
        if steps.is_empty() {
            *self = value;
            return Ok(());
        }

        let mut current = self;
        for (i, step) in steps.iter().enumerate() {
            let last = i + 1 == steps.len();
            current = match step {
                PathStep::Attribute(name) => {
                    if !matches!(current, Value::Object(_)) {
                        *current = Value::Object(BTreeMap::new());
                    }
                    let Value::Object(fields) = current else {
                        unreachable!("current was just made an object");
                    };
                    let slot = fields.entry(name.clone()).or_default();
                    if last {
                        *slot = value;
                        return Ok(());
                    }
                    slot
                }
                PathStep::Index(index) => {
                    let Value::List(items) = current else {
                        return Err(CoreError::InvalidPath {
                            path: path.to_string(),
                            reason: "index applied to a non-list value".to_string(),
                        });
                    };
                    let len = items.len();
                    let slot = items.get_mut(*index).ok_or_else(|| CoreError::InvalidPath {
                        path: path.to_string(),
                        reason: format!("index {} out of bounds (len {})", index, len),
                    })?;
                    if last {
                        *slot = value;
                        return Ok(());
                    }
                    slot
                }
            };
        }
        Ok(())
    }

    /// Convert from JSON; `{"$unknown": true}` becomes `Unknown`
    ///
    /// Numbers that are not whole `i64` values keep their decimal text, so
    /// schema conformance can reject them instead of truncating.
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Number(i),
                None => match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                        Value::Number(f as i64)
                    }
                    _ => Value::String(n.to_string()),
                },
            },
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(fields) => {
                if is_unknown_marker(json) {
                    return Value::Unknown;
                }
                Value::Object(
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }

    /// Convert to JSON; `Unknown` becomes `{"$unknown": true}`
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Unknown => unknown_marker(),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::from(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(fields) => serde_json::Value::Object(
                fields.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Decode into a typed model
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.to_json()).map_err(|e| CoreError::Conversion {
            path: "(root)".to_string(),
            message: e.to_string(),
        })
    }

    /// Encode a typed model
    pub fn encode<T: Serialize>(model: &T) -> Result<Self> {
        let json = serde_json::to_value(model).map_err(|e| CoreError::Conversion {
            path: "(root)".to_string(),
            message: e.to_string(),
        })?;
        Ok(Value::from_json(&json))
    }
}

pub(crate) fn unknown_marker() -> serde_json::Value {
    let mut marker = serde_json::Map::new();
    marker.insert(UNKNOWN_MARKER.to_string(), serde_json::Value::Bool(true));
    serde_json::Value::Object(marker)
}

pub(crate) fn is_unknown_marker(json: &serde_json::Value) -> bool {
    json.as_object().is_some_and(|fields| {
        fields.len() == 1 && fields.get(UNKNOWN_MARKER) == Some(&serde_json::Value::Bool(true))
    })
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Value::from_json(&json))
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

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Unknown => write!(f, "(known after apply)"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Object(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_round_trip_keeps_unknown() {
        let value = Value::object([
            ("id", Value::Unknown),
            ("name", Value::string("X Authority")),
            ("admin_emails", Value::List(vec![Value::string("a@x")])),
        ]);

        let json = value.to_json();
        assert_eq!(json["id"], json!({"$unknown": true}));
        assert_eq!(Value::from_json(&json), value);
    }

    #[test]
    fn test_fractional_numbers_are_not_truncated() {
        assert_eq!(Value::from_json(&json!(2.0)), Value::Number(2));
        assert_eq!(Value::from_json(&json!(1.5)), Value::string("1.5"));
        assert_eq!(Value::from_json(&json!(u64::MAX)), Value::string(u64::MAX.to_string()));
    }

    #[test]
    fn test_at_missing_reads_null() {
        let value = Value::from_json(&json!({"claims": {"enable_ssh_ca": true}}));
        assert_eq!(
            value.at(&AttrPath::root("claims").attr("enable_ssh_ca")),
            &Value::Bool(true)
        );
        assert!(value.at(&AttrPath::root("claims").attr("missing")).is_null());
        assert!(value.at(&AttrPath::root("options").attr("x509")).is_null());
    }

    #[test]
    fn test_at_through_unknown_stays_unknown() {
        let value = Value::object([("claims", Value::Unknown)]);
        assert!(value.at(&AttrPath::root("claims").attr("disable_renewal")).is_unknown());
    }

    #[test]
    fn test_set_creates_intermediate_objects() {
        let mut value = Value::Null;
        value
            .set(&AttrPath::root("options").attr("x509").attr("template"), Value::string("{}"))
            .unwrap();
        assert_eq!(value.to_json(), json!({"options": {"x509": {"template": "{}"}}}));
    }

    #[test]
    fn test_set_index_out_of_bounds() {
        let mut value = Value::object([("sans", Value::List(vec![]))]);
        let result = value.set(&AttrPath::root("sans").index(0), Value::string("a"));
        assert!(result.is_err());
    }

    #[test]
    fn test_wholly_known() {
        assert!(Value::from_json(&json!({"a": [1, 2], "b": null})).is_wholly_known());
        assert!(!Value::object([("a", Value::List(vec![Value::Unknown]))]).is_wholly_known());
    }

    #[test]
    fn test_display() {
        let value = Value::object([("id", Value::Unknown), ("n", Value::Number(3))]);
        insta::assert_snapshot!(value.to_string(), @"{id = (known after apply), n = 3}");
    }
}
