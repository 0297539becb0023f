//! Payloads of `oneOf` schemas
//!
//! The API describes polymorphic payloads (provisioner configuration, device
//! type configuration, ...) as a `oneOf` selected by a sibling discriminator.
//! A [`Union`] keeps the raw JSON object until the caller projects it into the
//! variant the discriminator names.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Union(serde_json::Map<String, serde_json::Value>);

impl Union {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a typed variant, which must serialize to an object
    pub fn from_variant<T: Serialize>(variant: &T) -> Result<Self> {
        match serde_json::to_value(variant) {
            Ok(serde_json::Value::Object(fields)) => Ok(Self(fields)),
            Ok(other) => Err(ClientError::Encode {
                message: format!("union variant must be an object, got {}", other),
            }),
            Err(e) => Err(ClientError::Encode {
                message: e.to_string(),
            }),
        }
    }

    /// Project into a typed variant
    pub fn as_variant<T: DeserializeOwned>(&self, variant: &str) -> Result<T> {
        serde_json::from_value(serde_json::Value::Object(self.0.clone())).map_err(|e| {
            ClientError::Union {
                variant: variant.to_string(),
                message: e.to_string(),
            }
        })
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields_mut(&mut self) -> &mut serde_json::Map<String, serde_json::Value> {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Aws {
        accounts: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        disable_custom_sans: Option<bool>,
    }

    #[test]
    fn test_project_variant() {
        let union: Union = serde_json::from_value(json!({"accounts": ["0123456789"]})).unwrap();
        let aws: Aws = union.as_variant("aws").unwrap();
        assert_eq!(aws.accounts, vec!["0123456789"]);
    }

    #[test]
    fn test_projection_failure_names_variant() {
        let union: Union = serde_json::from_value(json!({"tenantID": "t"})).unwrap();
        let err = union.as_variant::<Aws>("aws").unwrap_err();
        assert!(err.to_string().starts_with("Payload is not a valid aws"));
    }

    #[test]
    fn test_from_variant_requires_object() {
        let union = Union::from_variant(&Aws {
            accounts: vec!["1".into()],
            disable_custom_sans: None,
        })
        .unwrap();
        assert!(union.contains_key("accounts"));
        assert!(!union.contains_key("disableCustomSans"));
        assert!(Union::from_variant(&"scalar").is_err());
    }
}
