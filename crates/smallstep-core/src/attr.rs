//! Typed three-state attribute used by resource models

use serde::de::{DeserializeOwned, Error as _};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::{UNKNOWN_MARKER, is_unknown_marker};

/// A model attribute: absent, not yet known, or a known value
///
/// Model structs use `#[serde(default)]` so that attributes missing from a
/// `Value` decode as `Null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr<T> {
    Null,
    Unknown,
    Known(T),
}

impl<T> Default for Attr<T> {
    fn default() -> Self {
        Attr::Null
    }
}

impl<T> Attr<T> {
    pub fn known(value: T) -> Self {
        Attr::Known(value)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Null)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Attr::Unknown)
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Attr::Known(_))
    }

    pub fn as_known(&self) -> Option<&T> {
        match self {
            Attr::Known(value) => Some(value),
            _ => None,
        }
    }

    /// Known values become `Some`; null and unknown both become `None`
    pub fn into_option(self) -> Option<T> {
        match self {
            Attr::Known(value) => Some(value),
            _ => None,
        }
    }

    pub fn from_option(value: Option<T>) -> Self {
        value.map_or(Attr::Null, Attr::Known)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Attr<U> {
        match self {
            Attr::Null => Attr::Null,
            Attr::Unknown => Attr::Unknown,
            Attr::Known(value) => Attr::Known(f(value)),
        }
    }

    pub fn as_ref(&self) -> Attr<&T> {
        match self {
            Attr::Null => Attr::Null,
            Attr::Unknown => Attr::Unknown,
            Attr::Known(value) => Attr::Known(value),
        }
    }
}

impl<T: Clone> Attr<T> {
    /// Pointer-optional view for API requests
    pub fn to_option(&self) -> Option<T> {
        self.as_known().cloned()
    }
}

impl Attr<String> {
    pub fn as_deref(&self) -> Option<&str> {
        self.as_known().map(String::as_str)
    }
}

impl<T> From<Option<T>> for Attr<T> {
    fn from(value: Option<T>) -> Self {
        Attr::from_option(value)
    }
}

impl<T: Serialize> Serialize for Attr<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Attr::Null => serializer.serialize_none(),
            Attr::Unknown => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(UNKNOWN_MARKER, &true)?;
                map.end()
            }
            Attr::Known(value) => value.serialize(serializer),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Attr<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        if raw.is_null() {
            return Ok(Attr::Null);
        }
        if is_unknown_marker(&raw) {
            return Ok(Attr::Unknown);
        }
        T::deserialize(raw).map(Attr::Known).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::collections::BTreeSet;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(default)]
    struct Sample {
        id: Attr<String>,
        name: Attr<String>,
        count: Attr<i64>,
        tags: Attr<BTreeSet<String>>,
    }

    #[test]
    fn test_decode_three_states() {
        let value = Value::object([
            ("id", Value::Unknown),
            ("name", Value::string("x")),
            ("count", Value::Null),
        ]);

        let sample: Sample = value.decode().unwrap();
        assert!(sample.id.is_unknown());
        assert_eq!(sample.name, Attr::Known("x".to_string()));
        assert!(sample.count.is_null());
        assert!(sample.tags.is_null(), "missing attributes decode as null");
    }

    #[test]
    fn test_encode_round_trip() {
        let sample = Sample {
            id: Attr::Unknown,
            name: Attr::Known("x".to_string()),
            count: Attr::Known(3),
            tags: Attr::Known(["b".to_string(), "a".to_string()].into_iter().collect()),
        };

        let value = Value::encode(&sample).unwrap();
        assert!(value.get("id").is_unknown());
        assert_eq!(
            value.get("tags"),
            &Value::List(vec![Value::string("a"), Value::string("b")])
        );
        assert_eq!(value.decode::<Sample>().unwrap(), sample);
    }

    #[test]
    fn test_type_mismatch_is_an_error() {
        let value = Value::object([("count", Value::string("three"))]);
        assert!(value.decode::<Sample>().is_err());
    }

    #[test]
    fn test_option_views() {
        let unknown: Attr<String> = Attr::Unknown;
        assert_eq!(unknown.to_option(), None);
        assert_eq!(Attr::Known(2).to_option(), Some(2));
        assert_eq!(Attr::from_option(None::<i64>), Attr::Null);
        assert_eq!(Attr::Known("a".to_string()).as_deref(), Some("a"));
    }
}
