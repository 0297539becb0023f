//! Resource schemas
//!
//! A [`Schema`] declares the attribute tree of one resource or data source:
//! which attributes the user writes, which the server computes, how they are
//! nested and which plan modifiers apply. Schemas are published to the host
//! runtime, drive [`crate::plan`], and are rendered by the CLI.
//!
//! Descriptions are taken from the bundled OpenAPI document through
//! [`SchemaBuilder::for_component`], so user-facing docs stay in sync with the
//! API contract.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::diagnostics::{Diagnostic, Diagnostics, ErrorKind};
use crate::error::Result;
use crate::openapi::{ComponentDescription, describe};
use crate::path::AttrPath;
use crate::value::Value;

/// Element type of a primitive list or set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    String,
    Int,
    Bool,
}

/// Shape of an attribute
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    String,
    Int,
    Bool,
    List(ElementKind),
    Set(ElementKind),
    Object(BTreeMap<String, Attribute>),
    ListNested(BTreeMap<String, Attribute>),
    SetNested(BTreeMap<String, Attribute>),
}

impl AttributeKind {
    /// Nested attributes for object-like kinds
    pub fn nested(&self) -> Option<&BTreeMap<String, Attribute>> {
        match self {
            AttributeKind::Object(attrs)
            | AttributeKind::ListNested(attrs)
            | AttributeKind::SetNested(attrs) => Some(attrs),
            _ => None,
        }
    }

    /// Short type name used in docs (`string`, `set of string`, ...)
    pub fn type_name(&self) -> String {
        fn element(kind: ElementKind) -> &'static str {
            match kind {
                ElementKind::String => "string",
                ElementKind::Int => "number",
                ElementKind::Bool => "bool",
            }
        }
        match self {
            AttributeKind::String => "string".to_string(),
            AttributeKind::Int => "number".to_string(),
            AttributeKind::Bool => "bool".to_string(),
            AttributeKind::List(e) => format!("list of {}", element(*e)),
            AttributeKind::Set(e) => format!("set of {}", element(*e)),
            AttributeKind::Object(_) => "object".to_string(),
            AttributeKind::ListNested(_) => "list of object".to_string(),
            AttributeKind::SetNested(_) => "set of object".to_string(),
        }
    }
}

/// Who supplies the attribute value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requiredness {
    Required,
    Optional,
    Computed,
    OptionalComputed,
}

/// Plan-time behaviour attached to an attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanModifier {
    /// Keep the prior state value instead of planning unknown
    UseStateForUnknown,
    /// Any change destroys and recreates the resource
    RequiresReplace,
}

/// Config-time validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// String must be one of the listed values
    OneOf(Vec<String>),
    /// Exactly one attribute of the group (this one and the listed siblings) is set
    ExactlyOneOf(Vec<String>),
}

/// One attribute in a schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub kind: AttributeKind,
    pub requiredness: Requiredness,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub plan_modifiers: Vec<PlanModifier>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
}

impl Attribute {
    fn new(kind: AttributeKind) -> Self {
        Self {
            kind,
            requiredness: Requiredness::Optional,
            description: String::new(),
            sensitive: false,
            plan_modifiers: Vec::new(),
            validators: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(AttributeKind::String)
    }

    pub fn int() -> Self {
        Self::new(AttributeKind::Int)
    }

    pub fn bool() -> Self {
        Self::new(AttributeKind::Bool)
    }

    pub fn list(element: ElementKind) -> Self {
        Self::new(AttributeKind::List(element))
    }

    pub fn set(element: ElementKind) -> Self {
        Self::new(AttributeKind::Set(element))
    }

    pub fn object(attributes: BTreeMap<String, Attribute>) -> Self {
        Self::new(AttributeKind::Object(attributes))
    }

    pub fn list_nested(attributes: BTreeMap<String, Attribute>) -> Self {
        Self::new(AttributeKind::ListNested(attributes))
    }

    pub fn set_nested(attributes: BTreeMap<String, Attribute>) -> Self {
        Self::new(AttributeKind::SetNested(attributes))
    }

    pub fn required(mut self) -> Self {
        self.requiredness = Requiredness::Required;
        self
    }

    pub fn optional(mut self) -> Self {
        self.requiredness = Requiredness::Optional;
        self
    }

    pub fn computed(mut self) -> Self {
        self.requiredness = Requiredness::Computed;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.requiredness = Requiredness::OptionalComputed;
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn use_state_for_unknown(mut self) -> Self {
        self.plan_modifiers.push(PlanModifier::UseStateForUnknown);
        self
    }

    pub fn requires_replace(mut self) -> Self {
        self.plan_modifiers.push(PlanModifier::RequiresReplace);
        self
    }

    pub fn one_of<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.validators
            .push(Validator::OneOf(values.into_iter().map(Into::into).collect()));
        self
    }

    pub fn exactly_one_of<S: Into<String>>(mut self, siblings: impl IntoIterator<Item = S>) -> Self {
        self.validators.push(Validator::ExactlyOneOf(
            siblings.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Server may supply the value
    pub fn is_computed(&self) -> bool {
        matches!(
            self.requiredness,
            Requiredness::Computed | Requiredness::OptionalComputed
        )
    }

    pub fn is_required(&self) -> bool {
        self.requiredness == Requiredness::Required
    }

    /// User may write the value
    pub fn is_configurable(&self) -> bool {
        self.requiredness != Requiredness::Computed
    }

    pub fn has_modifier(&self, modifier: PlanModifier) -> bool {
        self.plan_modifiers.contains(&modifier)
    }
}

/// Attribute tree of one resource or data source
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Schema {
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Look up a nested attribute; list indices are skipped
    pub fn at(&self, path: &AttrPath) -> Option<&Attribute> {
        let mut attrs = &self.attributes;
        let mut found = None;
        for step in path.steps() {
            match step {
                crate::path::PathStep::Attribute(name) => {
                    let attr = attrs.get(name)?;
                    found = Some(attr);
                    if let Some(nested) = attr.kind.nested() {
                        attrs = nested;
                    }
                }
                crate::path::PathStep::Index(_) => {}
            }
        }
        found
    }

    /// State with every attribute null
    pub fn empty_state(&self) -> Value {
        Value::Object(
            self.attributes
                .keys()
                .map(|name| (name.clone(), Value::Null))
                .collect(),
        )
    }

    /// Bring a user config into schema shape
    ///
    /// Missing attributes become null; unknown arguments and type mismatches
    /// are reported as diagnostics.
    pub fn conform(&self, config: &Value) -> std::result::Result<Value, Diagnostics> {
        let mut diags = Diagnostics::new();
        let value = conform_object(&self.attributes, config, &AttrPath::default(), &mut diags);
        diags.into_result(value)
    }

    /// Validate a conformed config
    pub fn validate(&self, config: &Value) -> Diagnostics {
        let mut diags = Diagnostics::new();
        validate_object(&self.attributes, config, &AttrPath::default(), &mut diags);
        diags
    }
}

static EMPTY_OBJECT: BTreeMap<String, Value> = BTreeMap::new();

fn join(parent: &AttrPath, name: &str) -> AttrPath {
    if parent.is_empty() {
        AttrPath::root(name)
    } else {
        parent.child(name)
    }
}

fn conform_object(
    attrs: &BTreeMap<String, Attribute>,
    value: &Value,
    path: &AttrPath,
    diags: &mut Diagnostics,
) -> Value {
    let fields = match value {
        Value::Unknown => return Value::Unknown,
        Value::Null => &EMPTY_OBJECT,
        Value::Object(fields) => fields,
        other => {
            diags.push(
                Diagnostic::error("Incorrect attribute value type", format!("expected an object, got {}", other))
                    .at(path),
            );
            return Value::Null;
        }
    };

    for name in fields.keys() {
        if !attrs.contains_key(name) {
            let candidates: Vec<&str> = attrs.keys().map(String::as_str).collect();
            diags.push(
                Diagnostic::error(
                    "Unsupported argument",
                    format!(
                        "An argument named \"{}\" is not expected here (expected one of: {})",
                        name,
                        candidates.join(", ")
                    ),
                )
                .at(&join(path, name)),
            );
        }
    }

    Value::Object(
        attrs
            .iter()
            .map(|(name, attr)| {
                let field = fields.get(name).unwrap_or(&Value::Null);
                let field_path = join(path, name);
                (name.clone(), conform_value(&attr.kind, field, &field_path, diags))
            })
            .collect(),
    )
}

fn conform_value(kind: &AttributeKind, value: &Value, path: &AttrPath, diags: &mut Diagnostics) -> Value {
    if !value.is_known() {
        return value.clone();
    }

    let mismatch = |diags: &mut Diagnostics, expected: &str| {
        diags.push(
            Diagnostic::error(
                "Incorrect attribute value type",
                format!("expected {}, got {}", expected, value),
            )
            .at(path),
        );
        Value::Null
    };

    match kind {
        AttributeKind::String => match value {
            Value::String(_) => value.clone(),
            Value::Number(n) => Value::String(n.to_string()),
            Value::Bool(b) => Value::String(b.to_string()),
            _ => mismatch(diags, "a string"),
        },
        AttributeKind::Int => match value {
            Value::Number(_) => value.clone(),
            Value::String(s) => match s.parse::<i64>() {
                Ok(n) => Value::Number(n),
                Err(_) if s.parse::<f64>().is_ok() => mismatch(diags, "a whole number"),
                Err(_) => mismatch(diags, "a number"),
            },
            _ => mismatch(diags, "a number"),
        },
        AttributeKind::Bool => match value {
            Value::Bool(_) => value.clone(),
            _ => mismatch(diags, "a bool"),
        },
        AttributeKind::List(element) | AttributeKind::Set(element) => match value {
            Value::List(items) => Value::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        let kind = match element {
                            ElementKind::String => AttributeKind::String,
                            ElementKind::Int => AttributeKind::Int,
                            ElementKind::Bool => AttributeKind::Bool,
                        };
                        conform_value(&kind, item, &path.element(i), diags)
                    })
                    .collect(),
            ),
            _ => mismatch(diags, "a list"),
        },
        AttributeKind::Object(attrs) => conform_object(attrs, value, path, diags),
        AttributeKind::ListNested(attrs) | AttributeKind::SetNested(attrs) => match value {
            Value::List(items) => Value::List(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| conform_object(attrs, item, &path.element(i), diags))
                    .collect(),
            ),
            _ => mismatch(diags, "a list of objects"),
        },
    }
}

fn validate_object(
    attrs: &BTreeMap<String, Attribute>,
    value: &Value,
    path: &AttrPath,
    diags: &mut Diagnostics,
) {
    let mut groups_checked: BTreeSet<Vec<String>> = BTreeSet::new();

    for (name, attr) in attrs {
        let field = value.get(name);
        let field_path = join(path, name);

        if attr.is_required() && field.is_null() {
            diags.push(
                Diagnostic::error(
                    "Missing required argument",
                    format!("The argument \"{}\" is required, but no definition was found.", field_path),
                )
                .at(&field_path),
            );
        }

        if !attr.is_configurable() && !field.is_null() {
            diags.push(
                Diagnostic::error(
                    "Invalid configuration for read-only attribute",
                    format!("Cannot set value for \"{}\": it is computed by the server.", field_path),
                )
                .at(&field_path),
            );
        }

        for validator in &attr.validators {
            match validator {
                Validator::OneOf(allowed) => {
                    if let Some(s) = field.as_str() {
                        if !allowed.iter().any(|a| a == s) {
                            diags.push(
                                Diagnostic::error(
                                    "Invalid attribute value",
                                    format!(
                                        "{} must be one of [{}], got \"{}\"",
                                        field_path,
                                        allowed.join(", "),
                                        s
                                    ),
                                )
                                .at(&field_path),
                            );
                        }
                    }
                }
                Validator::ExactlyOneOf(siblings) => {
                    let mut group: Vec<String> = siblings.clone();
                    group.push(name.clone());
                    group.sort();
                    group.dedup();
                    if !groups_checked.insert(group.clone()) {
                        continue;
                    }
                    let set: Vec<&String> = group.iter().filter(|n| !value.get(n).is_null()).collect();
                    if set.len() != 1 {
                        diags.push(
                            Diagnostic::error(
                                "Invalid attribute combination",
                                format!(
                                    "Exactly one of [{}] must be set at {}, found {}",
                                    group.join(", "),
                                    if path.is_empty() { "the top level".to_string() } else { path.to_string() },
                                    set.len()
                                ),
                            )
                            .with_kind(ErrorKind::ParseError)
                            .at(&field_path),
                        );
                    }
                }
            }
        }

        if field.is_known() {
            match &attr.kind {
                AttributeKind::Object(nested) => validate_object(nested, field, &field_path, diags),
                AttributeKind::ListNested(nested) | AttributeKind::SetNested(nested) => {
                    for (i, item) in field.as_list().unwrap_or_default().iter().enumerate() {
                        if item.is_known() {
                            validate_object(nested, item, &field_path.element(i), diags);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// Converts `admin_emails` into `adminEmails`
pub fn api_property_name(attribute: &str) -> String {
    let mut out = String::with_capacity(attribute.len());
    let mut upper = false;
    for c in attribute.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Builds attribute maps whose descriptions come from an OpenAPI component
pub struct SchemaBuilder {
    component: ComponentDescription,
    attributes: BTreeMap<String, Attribute>,
}

impl SchemaBuilder {
    /// Start from a component of the bundled document
    pub fn for_component(component: &str) -> Result<Self> {
        Ok(Self {
            component: describe(component)?,
            attributes: BTreeMap::new(),
        })
    }

    /// Add an attribute described by the same-named (camelCase) property
    pub fn attr(self, name: &str, attribute: Attribute) -> Self {
        let property = api_property_name(name);
        self.attr_as(name, &property, attribute)
    }

    /// Add an attribute described by an explicitly named property
    pub fn attr_as(mut self, name: &str, property: &str, mut attribute: Attribute) -> Self {
        if attribute.description.is_empty() {
            attribute.description = self.component.prop(property).to_string();
        }
        self.attributes.insert(name.to_string(), attribute);
        self
    }

    pub fn description(&self) -> &str {
        &self.component.description
    }

    /// Finish as a nested attribute map
    pub fn attributes(self) -> BTreeMap<String, Attribute> {
        self.attributes
    }

    /// Finish as a top-level schema
    pub fn build(self) -> Schema {
        Schema {
            description: self.component.description,
            attributes: self.attributes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn collection_schema() -> Schema {
        Schema::new("collection")
            .attribute("slug", Attribute::string().required().requires_replace())
            .attribute("display_name", Attribute::string().optional_computed().use_state_for_unknown())
            .attribute("instance_count", Attribute::int().computed())
    }

    fn branch_schema() -> Schema {
        let jwk = BTreeMap::from([("key".to_string(), Attribute::string().required())]);
        let oidc = BTreeMap::from([("client_id".to_string(), Attribute::string().required())]);
        Schema::new("provisioner")
            .attribute("type", Attribute::string().required().one_of(["JWK", "OIDC"]))
            .attribute("jwk", Attribute::object(jwk).exactly_one_of(["oidc"]))
            .attribute("oidc", Attribute::object(oidc).exactly_one_of(["jwk"]))
    }

    #[test]
    fn test_conform_fills_missing_and_rejects_unknown() {
        let schema = collection_schema();
        let conformed = schema
            .conform(&Value::from_json(&json!({"slug": "tfprovider-a"})))
            .unwrap();
        assert!(conformed.get("display_name").is_null());
        assert_eq!(conformed.as_object().unwrap().len(), 3);

        let err = schema
            .conform(&Value::from_json(&json!({"slug": "a", "colour": "red"})))
            .unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn test_conform_rejects_fractional_int() {
        let schema = Schema::new("endpoint").attribute("uid", Attribute::int().optional());
        let err = schema
            .conform(&Value::from_json(&json!({"uid": 1.5})))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("uid"), "{message}");
        assert!(message.contains("expected a whole number"), "{message}");

        let conformed = schema.conform(&Value::from_json(&json!({"uid": 1000}))).unwrap();
        assert_eq!(conformed.get("uid"), &Value::Number(1000));
    }

    #[test]
    fn test_validate_required_and_read_only() {
        let schema = collection_schema();
        let config = schema
            .conform(&Value::from_json(&json!({"instance_count": 3})))
            .unwrap();
        let diags = schema.validate(&config);
        let messages: Vec<String> = diags.iter().map(|d| d.summary.clone()).collect();
        assert!(messages.contains(&"Missing required argument".to_string()));
        assert!(messages.contains(&"Invalid configuration for read-only attribute".to_string()));
    }

    #[test]
    fn test_validate_one_of() {
        let schema = branch_schema();
        let config = schema
            .conform(&Value::from_json(&json!({"type": "SAML", "jwk": {"key": "k"}})))
            .unwrap();
        let diags = schema.validate(&config);
        assert_eq!(diags.len(), 1);
        assert!(diags.to_string().contains("must be one of [JWK, OIDC]"));
    }

    #[test]
    fn test_validate_exactly_one_branch() {
        let schema = branch_schema();

        let none = schema.conform(&Value::from_json(&json!({"type": "JWK"}))).unwrap();
        let diags = schema.validate(&none);
        assert_eq!(diags.len(), 1, "one diagnostic per group: {}", diags);
        assert_eq!(diags.error_kind(), Some(ErrorKind::ParseError));

        let both = schema
            .conform(&Value::from_json(&json!({
                "type": "JWK",
                "jwk": {"key": "k"},
                "oidc": {"client_id": "c"}
            })))
            .unwrap();
        assert!(schema.validate(&both).has_error());

        let one = schema
            .conform(&Value::from_json(&json!({"type": "JWK", "jwk": {"key": "k"}})))
            .unwrap();
        assert!(!schema.validate(&one).has_error());
    }

    #[test]
    fn test_nested_lookup() {
        let schema = branch_schema();
        let attr = schema.at(&AttrPath::root("oidc").attr("client_id")).unwrap();
        assert!(attr.is_required());
        assert!(schema.at(&AttrPath::root("oidc").attr("missing")).is_none());
    }

    #[test]
    fn test_api_property_name() {
        assert_eq!(api_property_name("admin_emails"), "adminEmails");
        assert_eq!(api_property_name("min_tls_cert_duration"), "minTlsCertDuration");
        assert_eq!(api_property_name("name"), "name");
    }

    #[test]
    fn test_builder_pulls_descriptions() {
        let schema = SchemaBuilder::for_component("collection")
            .unwrap()
            .attr("slug", Attribute::string().required())
            .attr("display_name", Attribute::string().optional().describe("Custom text"))
            .build();
        assert!(!schema.description.is_empty());
        assert!(!schema.get("slug").unwrap().description.is_empty());
        assert_eq!(schema.get("display_name").unwrap().description, "Custom text");
    }
}
