//! Read-only lookups
//!
//! Each data source publishes its resource's schema with every attribute
//! computed except the lookup keys, and fills state through the resource codec.

pub mod attestation_authority;
pub mod authority;
pub mod collection;
pub mod provisioner;

use std::sync::Arc;

use smallstep_client::Client;
use smallstep_core::{AttrPath, Attribute, Diagnostic, ErrorKind, Requiredness, Schema, Value};

use crate::resource::{DataSource, StepResult};

/// Every data source, bound to `client`
pub fn all(client: &Client) -> Vec<Arc<dyn DataSource>> {
    vec![
        Arc::new(authority::AuthorityDataSource::new(client.clone())),
        Arc::new(provisioner::ProvisionerDataSource::new(client.clone())),
        Arc::new(collection::CollectionDataSource::new(client.clone())),
        Arc::new(attestation_authority::AttestationAuthorityDataSource::new(
            client.clone(),
        )),
    ]
}

fn read_only(mut attribute: Attribute) -> Attribute {
    attribute.requiredness = Requiredness::Computed;
    attribute.plan_modifiers.clear();
    attribute.validators.clear();
    attribute
}

/// Resource schema turned into a lookup: `required` must be written, one of
/// `keys` may be written, everything else is filled by the read
pub(crate) fn lookup_schema(resource: Schema, required: &[&str], keys: &[&str]) -> Schema {
    let attributes = resource
        .attributes
        .into_iter()
        .map(|(name, attribute)| {
            let mut attribute = read_only(attribute);
            if required.contains(&name.as_str()) {
                attribute.requiredness = Requiredness::Required;
            } else if keys.contains(&name.as_str()) {
                attribute.requiredness = Requiredness::OptionalComputed;
            }
            (name, attribute)
        })
        .collect();
    Schema {
        description: resource.description,
        attributes,
    }
}

/// The first lookup key written in `config`
pub(crate) fn lookup_key<'a>(config: &'a Value, keys: &[&'static str]) -> StepResult<(&'static str, &'a str)> {
    keys.iter()
        .find_map(|key| {
            config
                .get(key)
                .as_str()
                .filter(|v| !v.is_empty())
                .map(|v| (*key, v))
        })
        .ok_or_else(|| {
            Diagnostic::error(
                "Missing lookup attribute",
                format!("one of [{}] must be set", keys.join(", ")),
            )
            .with_kind(ErrorKind::ParseError)
            .into()
        })
}

pub(crate) fn not_found(kind: &str, key: &str, value: &str) -> Diagnostic {
    Diagnostic::error(
        format!("{} not found", kind),
        format!("no {} with {} \"{}\"", kind.to_lowercase(), key, value),
    )
    .with_kind(ErrorKind::ResponseError)
    .at(&AttrPath::root(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use smallstep_core::PlanModifier;

    #[test]
    fn test_lookup_schema_marks_keys() {
        let resource = Schema::new("thing")
            .attribute("id", Attribute::string().computed().use_state_for_unknown())
            .attribute("name", Attribute::string().required().requires_replace())
            .attribute("kind", Attribute::string().required().one_of(["a", "b"]))
            .attribute("parent_id", Attribute::string().required());
        let schema = lookup_schema(resource, &["parent_id"], &["id", "name"]);

        assert_eq!(schema.get("id").unwrap().requiredness, Requiredness::OptionalComputed);
        assert_eq!(schema.get("name").unwrap().requiredness, Requiredness::OptionalComputed);
        assert_eq!(schema.get("parent_id").unwrap().requiredness, Requiredness::Required);
        let kind = schema.get("kind").unwrap();
        assert_eq!(kind.requiredness, Requiredness::Computed);
        assert!(kind.validators.is_empty());
        assert!(!schema.get("name").unwrap().has_modifier(PlanModifier::RequiresReplace));
    }

    #[test]
    fn test_lookup_key_order() {
        let config = Value::from_json(&json!({"id": null, "domain": "a.ca.smallstep.com"}));
        assert_eq!(
            lookup_key(&config, &["id", "domain"]).unwrap(),
            ("domain", "a.ca.smallstep.com")
        );

        let empty = Value::from_json(&json!({"id": ""}));
        let diags = lookup_key(&empty, &["id", "domain"]).unwrap_err();
        assert!(diags.to_string().contains("one of [id, domain] must be set"));
    }
}
