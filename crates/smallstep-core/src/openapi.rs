//! Descriptions from the bundled OpenAPI document
//!
//! The Smallstep API document ships inside the binary and is parsed once, on
//! first use. Resource schemas pull their user-facing documentation from it,
//! so the descriptions published to the host always match the API contract.

use once_cell::sync::Lazy;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};

const BUNDLED: &str = include_str!("../openapi/smallstep.yaml");

const REF_PREFIX: &str = "#/components/schemas/";

/// Upper bound on `$ref` / `allOf` nesting
const MAX_DEPTH: usize = 16;

/// Parsed once; a broken bundled document is a build defect, so it aborts.
static DOCUMENT: Lazy<OpenApiDocument> = Lazy::new(|| {
    OpenApiDocument::parse(BUNDLED).expect("bundled OpenAPI document must parse")
});

/// Description of one OpenAPI component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentDescription {
    pub name: String,
    pub description: String,
    /// Property name (camelCase, as in the API) to description
    pub properties: BTreeMap<String, String>,
}

impl ComponentDescription {
    /// Description of a property, empty when undocumented
    pub fn prop(&self, name: &str) -> &str {
        self.properties.get(name).map(String::as_str).unwrap_or("")
    }
}

/// A parsed OpenAPI document
#[derive(Debug, Clone)]
pub struct OpenApiDocument {
    schemas: serde_json::Map<String, JsonValue>,
}

impl OpenApiDocument {
    /// Parse a YAML (or JSON) OpenAPI document
    pub fn parse(content: &str) -> Result<Self> {
        let root: JsonValue = serde_yaml::from_str(content)?;
        let schemas = root
            .get("components")
            .and_then(|c| c.get("schemas"))
            .and_then(JsonValue::as_object)
            .cloned()
            .ok_or_else(|| CoreError::InvalidDocument {
                message: "missing components.schemas".to_string(),
            })?;
        Ok(Self { schemas })
    }

    pub fn component_names(&self) -> Vec<String> {
        self.schemas.keys().cloned().collect()
    }

    /// Describe a component, following `$ref` and `allOf`
    pub fn describe(&self, component: &str) -> Result<ComponentDescription> {
        let schema = self
            .schemas
            .get(component)
            .ok_or_else(|| CoreError::UnknownComponent {
                name: component.to_string(),
            })?;

        let mut out = ComponentDescription {
            name: component.to_string(),
            ..Default::default()
        };
        self.collect(schema, &mut out, 0)?;
        Ok(out)
    }

    fn resolve<'a>(&'a self, reference: &str) -> Result<&'a JsonValue> {
        let name = reference
            .strip_prefix(REF_PREFIX)
            .ok_or_else(|| CoreError::InvalidDocument {
                message: format!("unsupported reference '{}'", reference),
            })?;
        self.schemas
            .get(name)
            .ok_or_else(|| CoreError::UnknownComponent {
                name: name.to_string(),
            })
    }

    fn collect(&self, schema: &JsonValue, out: &mut ComponentDescription, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(CoreError::InvalidDocument {
                message: format!("reference chain too deep while describing '{}'", out.name),
            });
        }

        if let Some(reference) = schema.get("$ref").and_then(JsonValue::as_str) {
            return self.collect(self.resolve(reference)?, out, depth + 1);
        }

        if out.description.is_empty() {
            if let Some(description) = schema.get("description").and_then(JsonValue::as_str) {
                out.description = description.trim().to_string();
            }
        }

        // own properties win over inherited ones
        if let Some(properties) = schema.get("properties").and_then(JsonValue::as_object) {
            for (name, property) in properties {
                let description = self.property_description(property, depth)?;
                out.properties.insert(name.clone(), description);
            }
        }

        if let Some(members) = schema.get("allOf").and_then(JsonValue::as_array) {
            for member in members {
                let mut inherited = ComponentDescription {
                    name: out.name.clone(),
                    ..Default::default()
                };
                self.collect(member, &mut inherited, depth + 1)?;
                if out.description.is_empty() {
                    out.description = inherited.description;
                }
                for (name, description) in inherited.properties {
                    out.properties.entry(name).or_insert(description);
                }
            }
        }

        Ok(())
    }

    fn property_description(&self, property: &JsonValue, depth: usize) -> Result<String> {
        if let Some(description) = property.get("description").and_then(JsonValue::as_str) {
            return Ok(description.trim().to_string());
        }
        if depth > MAX_DEPTH {
            return Ok(String::new());
        }
        if let Some(reference) = property.get("$ref").and_then(JsonValue::as_str) {
            return self.property_description(self.resolve(reference)?, depth + 1);
        }
        if let Some(first) = property
            .get("allOf")
            .and_then(JsonValue::as_array)
            .and_then(|members| members.first())
        {
            return self.property_description(first, depth + 1);
        }
        if let Some(items) = property.get("items") {
            return self.property_description(items, depth + 1);
        }
        Ok(String::new())
    }
}

/// Describe a component of the bundled document
pub fn describe(component: &str) -> Result<ComponentDescription> {
    DOCUMENT.describe(component)
}

/// Names of all components in the bundled document
pub fn component_names() -> Vec<String> {
    DOCUMENT.component_names()
}

/// Description of a single property of a bundled component
pub fn property(component: &str, name: &str) -> Result<String> {
    Ok(describe(component)?.prop(name).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r##"
openapi: 3.0.3
components:
  schemas:
    base:
      description: Base object
      properties:
        id:
          type: string
          description: Server-assigned identifier
        name:
          type: string
          description: Inherited name
    derived:
      allOf:
        - $ref: "#/components/schemas/base"
        - type: object
          properties:
            name:
              type: string
              description: Overridden name
            owner:
              $ref: "#/components/schemas/owner"
    owner:
      description: The owning team
      type: object
    alias:
      $ref: "#/components/schemas/base"
    broken:
      $ref: "#/components/schemas/missing"
"##;

    #[test]
    fn test_describe_plain_component() {
        let doc = OpenApiDocument::parse(DOC).unwrap();
        let base = doc.describe("base").unwrap();
        assert_eq!(base.description, "Base object");
        assert_eq!(base.prop("id"), "Server-assigned identifier");
        assert_eq!(base.prop("missing"), "");
    }

    #[test]
    fn test_describe_resolves_all_of() {
        let doc = OpenApiDocument::parse(DOC).unwrap();
        let derived = doc.describe("derived").unwrap();
        assert_eq!(derived.description, "Base object");
        assert_eq!(derived.prop("id"), "Server-assigned identifier");
        assert_eq!(derived.prop("owner"), "The owning team");
    }

    #[test]
    fn test_describe_follows_ref() {
        let doc = OpenApiDocument::parse(DOC).unwrap();
        assert_eq!(doc.describe("alias").unwrap().prop("name"), "Inherited name");
    }

    #[test]
    fn test_unknown_component() {
        let doc = OpenApiDocument::parse(DOC).unwrap();
        assert!(matches!(
            doc.describe("nope"),
            Err(CoreError::UnknownComponent { .. })
        ));
        assert!(matches!(
            doc.describe("broken"),
            Err(CoreError::UnknownComponent { .. })
        ));
    }

    #[test]
    fn test_document_without_components() {
        assert!(OpenApiDocument::parse("openapi: 3.0.3\n").is_err());
    }

    #[test]
    fn test_bundled_document_describes_every_resource() {
        for component in [
            "authority",
            "provisioner",
            "agentConfiguration",
            "endpointConfiguration",
            "managedConfiguration",
            "collection",
            "collectionInstance",
            "deviceCollection",
            "deviceCollectionAccount",
            "attestationAuthority",
            "deviceInventoryIntegration",
            "strategy",
            "workload",
        ] {
            let description = describe(component).unwrap();
            assert!(!description.description.is_empty(), "{} has no description", component);
        }
        assert!(component_names().len() > 13);
    }
}
