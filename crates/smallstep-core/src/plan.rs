//! Plan computation
//!
//! Given a schema, the prior state and the user's config, decide what the
//! host runtime would do with one resource and which values it would hand to
//! the controller. Plan modifiers are applied here:
//!
//! - computed attributes the user did not write keep their prior value when
//!   nothing else changed, or when marked `UseStateForUnknown`; otherwise they
//!   are planned as unknown
//! - a change to an attribute marked `RequiresReplace` turns the update into
//!   a destroy-then-create

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::diagnostics::Diagnostics;
use crate::path::AttrPath;
use crate::schema::{Attribute, AttributeKind, PlanModifier, Schema};
use crate::value::Value;

/// What the runtime will do with one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanAction {
    Create,
    Update,
    Replace,
    NoOp,
    Delete,
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanAction::Create => write!(f, "create"),
            PlanAction::Update => write!(f, "update in-place"),
            PlanAction::Replace => write!(f, "destroy and then create replacement"),
            PlanAction::NoOp => write!(f, "no changes"),
            PlanAction::Delete => write!(f, "destroy"),
        }
    }
}

/// Result of planning one resource
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub action: PlanAction,
    /// Planned new state; `None` for deletes
    pub planned: Option<Value>,
    /// Attributes that forced a replacement
    pub replace_paths: Vec<AttrPath>,
    pub diagnostics: Diagnostics,
}

impl Plan {
    pub fn is_noop(&self) -> bool {
        self.action == PlanAction::NoOp
    }
}

/// Plan a single resource
///
/// `config` must already be conformed to the schema.
pub fn plan(schema: &Schema, prior: Option<&Value>, config: Option<&Value>) -> Plan {
    let Some(config) = config else {
        let action = if prior.is_some() {
            PlanAction::Delete
        } else {
            PlanAction::NoOp
        };
        return Plan {
            action,
            planned: None,
            replace_paths: Vec::new(),
            diagnostics: Diagnostics::new(),
        };
    };

    let diagnostics = schema.validate(config);

    let Some(prior) = prior else {
        return Plan {
            action: PlanAction::Create,
            planned: Some(plan_create(&schema.attributes, config)),
            replace_paths: Vec::new(),
            diagnostics,
        };
    };

    let proposed = propose(&schema.attributes, config, prior);
    if attrs_equal(&schema.attributes, &proposed, prior) {
        return Plan {
            action: PlanAction::NoOp,
            planned: Some(prior.clone()),
            replace_paths: Vec::new(),
            diagnostics,
        };
    }

    let planned = plan_update(&schema.attributes, config, &proposed);

    let mut replace_paths = Vec::new();
    collect_replacements(
        &schema.attributes,
        &planned,
        prior,
        &AttrPath::default(),
        &mut replace_paths,
    );

    if replace_paths.is_empty() {
        Plan {
            action: PlanAction::Update,
            planned: Some(planned),
            replace_paths,
            diagnostics,
        }
    } else {
        Plan {
            action: PlanAction::Replace,
            planned: Some(plan_create(&schema.attributes, config)),
            replace_paths,
            diagnostics,
        }
    }
}

fn join(parent: &AttrPath, name: &str) -> AttrPath {
    if parent.is_empty() {
        AttrPath::root(name)
    } else {
        parent.child(name)
    }
}

/// Computed attributes left null by the user become unknown
fn plan_create(attrs: &BTreeMap<String, Attribute>, config: &Value) -> Value {
    if !config.is_known() {
        return config.clone();
    }
    Value::Object(
        attrs
            .iter()
            .map(|(name, attr)| {
                let configured = config.get(name);
                let planned = if configured.is_null() && attr.is_computed() {
                    Value::Unknown
                } else {
                    map_nested(attr, configured, |nested, item| plan_create(nested, item))
                };
                (name.clone(), planned)
            })
            .collect(),
    )
}

/// Apply `f` to nested objects; other kinds are cloned
fn map_nested(
    attr: &Attribute,
    value: &Value,
    f: impl Fn(&BTreeMap<String, Attribute>, &Value) -> Value,
) -> Value {
    match (&attr.kind, value) {
        (AttributeKind::Object(nested), Value::Object(_)) => f(nested, value),
        (AttributeKind::ListNested(nested) | AttributeKind::SetNested(nested), Value::List(items)) => {
            Value::List(items.iter().map(|item| f(nested, item)).collect())
        }
        _ => value.clone(),
    }
}

/// Config with unconfigured computed attributes taken from prior state
fn propose(attrs: &BTreeMap<String, Attribute>, config: &Value, prior: &Value) -> Value {
    if !config.is_known() {
        return config.clone();
    }
    Value::Object(
        attrs
            .iter()
            .map(|(name, attr)| {
                let configured = config.get(name);
                let previous = prior.get(name);
                let value = if configured.is_null() && attr.is_computed() {
                    previous.clone()
                } else {
                    propose_nested(attr, configured, previous)
                };
                (name.clone(), value)
            })
            .collect(),
    )
}

fn propose_nested(attr: &Attribute, configured: &Value, previous: &Value) -> Value {
    match (&attr.kind, configured) {
        (AttributeKind::Object(nested), Value::Object(_)) => propose(nested, configured, previous),
        (AttributeKind::ListNested(nested), Value::List(items)) => Value::List(
            items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let previous_item = previous.as_list().and_then(|p| p.get(i)).unwrap_or(&Value::Null);
                    propose(nested, item, previous_item)
                })
                .collect(),
        ),
        (AttributeKind::SetNested(nested), Value::List(items)) => {
            let previous_items = previous.as_list().unwrap_or_default();
            Value::List(
                items
                    .iter()
                    .map(|item| {
                        let matched = previous_items
                            .iter()
                            .find(|p| configured_fields_match(nested, item, p))
                            .unwrap_or(&Value::Null);
                        propose(nested, item, matched)
                    })
                    .collect(),
            )
        }
        _ => configured.clone(),
    }
}

/// Set elements are matched to prior elements by what the user wrote
fn configured_fields_match(attrs: &BTreeMap<String, Attribute>, config: &Value, prior: &Value) -> bool {
    attrs.iter().all(|(name, attr)| {
        let configured = config.get(name);
        if configured.is_null() && attr.is_computed() {
            return true;
        }
        let proposed = propose_nested(attr, configured, prior.get(name));
        values_equal(attr, &proposed, prior.get(name))
    })
}

/// Unconfigured computed attributes without `UseStateForUnknown` become unknown
fn plan_update(attrs: &BTreeMap<String, Attribute>, config: &Value, proposed: &Value) -> Value {
    if !proposed.is_known() {
        return proposed.clone();
    }
    Value::Object(
        attrs
            .iter()
            .map(|(name, attr)| {
                let configured = config.get(name);
                let value = proposed.get(name);
                let planned = if configured.is_null() && attr.is_computed() {
                    if attr.has_modifier(PlanModifier::UseStateForUnknown) {
                        value.clone()
                    } else {
                        Value::Unknown
                    }
                } else {
                    match (&attr.kind, configured, value) {
                        (AttributeKind::Object(nested), _, _) if configured.is_known() => {
                            plan_update(nested, configured, value)
                        }
                        (
                            AttributeKind::ListNested(nested) | AttributeKind::SetNested(nested),
                            Value::List(configured_items),
                            Value::List(proposed_items),
                        ) => Value::List(
                            configured_items
                                .iter()
                                .zip(proposed_items)
                                .map(|(c, p)| plan_update(nested, c, p))
                                .collect(),
                        ),
                        _ => value.clone(),
                    }
                };
                (name.clone(), planned)
            })
            .collect(),
    )
}

fn collect_replacements(
    attrs: &BTreeMap<String, Attribute>,
    planned: &Value,
    prior: &Value,
    path: &AttrPath,
    out: &mut Vec<AttrPath>,
) {
    for (name, attr) in attrs {
        let attr_path = join(path, name);
        let (after, before) = (planned.get(name), prior.get(name));
        if attr.has_modifier(PlanModifier::RequiresReplace) {
            if !values_equal(attr, after, before) {
                out.push(attr_path);
            }
            continue;
        }
        if let (AttributeKind::Object(nested), true) = (&attr.kind, after.is_known() && before.is_known()) {
            collect_replacements(nested, after, before, &attr_path, out);
        }
    }
}

fn attrs_equal(attrs: &BTreeMap<String, Attribute>, a: &Value, b: &Value) -> bool {
    attrs
        .iter()
        .all(|(name, attr)| values_equal(attr, a.get(name), b.get(name)))
}

/// Schema-aware equality; sets compare without regard to order
pub fn values_equal(attr: &Attribute, a: &Value, b: &Value) -> bool {
    match (&attr.kind, a, b) {
        (AttributeKind::Set(_), Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().all(|item| y.contains(item)) && y.iter().all(|item| x.contains(item))
        }
        (AttributeKind::Object(nested), Value::Object(_), Value::Object(_)) => attrs_equal(nested, a, b),
        (AttributeKind::ListNested(nested), Value::List(x), Value::List(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(p, q)| attrs_equal(nested, p, q))
        }
        (AttributeKind::SetNested(nested), Value::List(x), Value::List(y)) => {
            x.len() == y.len()
                && x.iter().all(|p| y.iter().any(|q| attrs_equal(nested, p, q)))
                && y.iter().all(|q| x.iter().any(|p| attrs_equal(nested, p, q)))
        }
        _ => a == b,
    }
}

/// Attribute-level differences between two states, for plan output
pub fn changed_paths(schema: &Schema, before: &Value, after: &Value) -> Vec<AttrPath> {
    schema
        .attributes
        .iter()
        .filter(|(name, attr)| !values_equal(attr, before.get(name), after.get(name)))
        .map(|(name, _)| AttrPath::root(name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ElementKind, Schema};
    use serde_json::json;

    fn schema() -> Schema {
        let endpoint = BTreeMap::from([
            (
                "id".to_string(),
                Attribute::string().computed().use_state_for_unknown(),
            ),
            ("name".to_string(), Attribute::string().required()),
        ]);
        Schema::new("test")
            .attribute("id", Attribute::string().computed().use_state_for_unknown())
            .attribute("slug", Attribute::string().required().requires_replace())
            .attribute("display_name", Attribute::string().optional())
            .attribute("updated_at", Attribute::string().computed())
            .attribute(
                "active_revocation",
                Attribute::bool().optional_computed().use_state_for_unknown(),
            )
            .attribute("admin_emails", Attribute::set(ElementKind::String).optional())
            .attribute("endpoints", Attribute::set_nested(endpoint).optional())
    }

    fn value(json: serde_json::Value) -> Value {
        schema().conform(&Value::from_json(&json)).unwrap()
    }

    fn state() -> Value {
        value(json!({
            "id": "7f6c",
            "slug": "tfprovider-a",
            "display_name": "A",
            "updated_at": "2024-01-01T00:00:00Z",
            "active_revocation": false,
            "admin_emails": ["a@x", "b@x"],
            "endpoints": [{"id": "e1", "name": "web"}, {"id": "e2", "name": "db"}]
        }))
    }

    #[test]
    fn test_create_marks_computed_unknown() {
        let config = value(json!({"slug": "s", "endpoints": [{"name": "web"}]}));
        let plan = plan(&schema(), None, Some(&config));
        assert_eq!(plan.action, PlanAction::Create);
        let planned = plan.planned.unwrap();
        assert!(planned.get("id").is_unknown());
        assert!(planned.get("active_revocation").is_unknown());
        assert!(planned.get("display_name").is_null());
        assert!(planned.at(&AttrPath::root("endpoints").index(0).attr("id")).is_unknown());
    }

    #[test]
    fn test_unchanged_config_is_noop() {
        let config = value(json!({
            "slug": "tfprovider-a",
            "display_name": "A",
            "admin_emails": ["b@x", "a@x"],
            "endpoints": [{"name": "db"}, {"name": "web"}]
        }));
        let prior = state();
        let plan = plan(&schema(), Some(&prior), Some(&config));
        assert_eq!(plan.action, PlanAction::NoOp, "{:?}", plan.planned);
        assert_eq!(plan.planned, Some(prior));
    }

    #[test]
    fn test_update_keeps_state_for_marked_attributes() {
        let config = value(json!({
            "slug": "tfprovider-a",
            "display_name": "B",
            "admin_emails": ["a@x", "b@x"],
            "endpoints": [{"name": "web"}, {"name": "db"}]
        }));
        let plan = plan(&schema(), Some(&state()), Some(&config));
        assert_eq!(plan.action, PlanAction::Update);
        let planned = plan.planned.unwrap();
        assert_eq!(planned.get("id"), &Value::string("7f6c"));
        assert_eq!(planned.get("active_revocation"), &Value::Bool(false));
        assert!(planned.get("updated_at").is_unknown());
        assert_eq!(planned.get("display_name"), &Value::string("B"));
        assert_eq!(
            planned.at(&AttrPath::root("endpoints").index(1).attr("id")),
            &Value::string("e2")
        );
    }

    #[test]
    fn test_requires_replace() {
        let config = value(json!({
            "slug": "tfprovider-b",
            "display_name": "A",
            "admin_emails": ["a@x", "b@x"],
            "endpoints": [{"name": "web"}, {"name": "db"}]
        }));
        let plan = plan(&schema(), Some(&state()), Some(&config));
        assert_eq!(plan.action, PlanAction::Replace);
        assert_eq!(plan.replace_paths, vec![AttrPath::root("slug")]);
        assert!(plan.planned.unwrap().get("id").is_unknown());
    }

    #[test]
    fn test_removed_config_is_delete() {
        let plan = plan(&schema(), Some(&state()), None);
        assert_eq!(plan.action, PlanAction::Delete);
        assert!(plan.planned.is_none());
    }

    #[test]
    fn test_validation_is_reported() {
        let config = value(json!({"display_name": "A"}));
        let plan = plan(&schema(), None, Some(&config));
        assert!(plan.diagnostics.has_error());
    }

    #[test]
    fn test_changed_paths() {
        let mut after = state();
        after
            .set(&AttrPath::root("display_name"), Value::string("B"))
            .unwrap();
        assert_eq!(
            changed_paths(&schema(), &state(), &after),
            vec![AttrPath::root("display_name")]
        );
    }
}
