//! Declared resources and `${...}` references between them

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use smallstep_core::{AttrPath, Value};

use crate::error::HarnessError;

/// `${<type>.<name>.<attribute path>}`
static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([a-z0-9_]+\.[A-Za-z0-9_-]+)\.([A-Za-z0-9_.\[\]]+)\}")
        .expect("reference pattern is valid")
});

/// One declared resource
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub type_name: String,
    pub name: String,
    pub config: serde_json::Value,
}

impl Declaration {
    /// `type.name`
    pub fn address(&self) -> String {
        format!("{}.{}", self.type_name, self.name)
    }
}

/// A configuration: resources in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub declarations: Vec<Declaration>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(
        mut self,
        type_name: impl Into<String>,
        name: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        self.declarations.push(Declaration {
            type_name: type_name.into(),
            name: name.into(),
            config,
        });
        self
    }

    pub fn addresses(&self) -> Vec<String> {
        self.declarations.iter().map(Declaration::address).collect()
    }
}

/// Where references are looked up
pub trait Lookup {
    /// State of the resource at `address`, if it has one
    fn state(&self, address: &str) -> Option<&Value>;
    /// Whether `address` is declared and will get a state when applied
    fn is_pending(&self, address: &str) -> bool;
}

impl Lookup for IndexMap<String, (String, Value)> {
    fn state(&self, address: &str) -> Option<&Value> {
        self.get(address).map(|(_, value)| value)
    }

    fn is_pending(&self, _address: &str) -> bool {
        false
    }
}

fn reference_value(
    lookup: &dyn Lookup,
    reference: &str,
    address: &str,
    path: &str,
) -> Result<Value, HarnessError> {
    let unresolved = |reason: &str| HarnessError::UnresolvedReference {
        reference: reference.to_string(),
        reason: reason.to_string(),
    };
    match lookup.state(address) {
        Some(state) => Ok(state.at(&AttrPath::parse(path)?).clone()),
        None if lookup.is_pending(address) => Ok(Value::Unknown),
        None => Err(unresolved("no such resource")),
    }
}

/// Substitute references inside string values
///
/// A string holding exactly one reference takes the referenced value as is;
/// references embedded in longer strings are interpolated and must be known
/// strings. Anything referring to a declared but not yet created resource is
/// unknown.
pub fn resolve(value: &serde_json::Value, lookup: &dyn Lookup) -> Result<Value, HarnessError> {
    match value {
        serde_json::Value::String(text) => resolve_string(text, lookup),
        serde_json::Value::Array(items) => Ok(Value::List(
            items
                .iter()
                .map(|item| resolve(item, lookup))
                .collect::<Result<_, _>>()?,
        )),
        serde_json::Value::Object(fields) => Ok(Value::Object(
            fields
                .iter()
                .map(|(key, item)| Ok((key.clone(), resolve(item, lookup)?)))
                .collect::<Result<_, HarnessError>>()?,
        )),
        other => Ok(Value::from_json(other)),
    }
}

fn resolve_string(text: &str, lookup: &dyn Lookup) -> Result<Value, HarnessError> {
    if let Some(caps) = REFERENCE.captures(text)
        && caps[0].len() == text.len()
    {
        return reference_value(lookup, &caps[0], &caps[1], &caps[2]);
    }

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in REFERENCE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        match reference_value(lookup, whole.as_str(), &caps[1], &caps[2])? {
            Value::Unknown => return Ok(Value::Unknown),
            Value::String(s) => out.push_str(&s),
            Value::Number(n) => out.push_str(&n.to_string()),
            Value::Bool(b) => out.push_str(&b.to_string()),
            _ => {
                return Err(HarnessError::UnresolvedReference {
                    reference: whole.as_str().to_string(),
                    reason: "only strings, numbers and bools can be interpolated".to_string(),
                });
            }
        }
        last = whole.end();
    }
    out.push_str(&text[last..]);
    Ok(Value::String(out))
}

/// Addresses `value` refers to
pub fn references(value: &serde_json::Value) -> Vec<String> {
    let mut found = Vec::new();
    collect_references(value, &mut found);
    found
}

fn collect_references(value: &serde_json::Value, found: &mut Vec<String>) {
    match value {
        serde_json::Value::String(text) => {
            for caps in REFERENCE.captures_iter(text) {
                let address = caps[1].to_string();
                if !found.contains(&address) {
                    found.push(address);
                }
            }
        }
        serde_json::Value::Array(items) => items.iter().for_each(|i| collect_references(i, found)),
        serde_json::Value::Object(fields) => {
            fields.values().for_each(|i| collect_references(i, found))
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Pending<'a>(&'a IndexMap<String, (String, Value)>, &'a [&'a str]);

    impl Lookup for Pending<'_> {
        fn state(&self, address: &str) -> Option<&Value> {
            self.0.state(address)
        }

        fn is_pending(&self, address: &str) -> bool {
            self.1.contains(&address)
        }
    }

    fn state() -> IndexMap<String, (String, Value)> {
        let mut state = IndexMap::new();
        state.insert(
            "smallstep_authority.main".to_string(),
            (
                "smallstep_authority".to_string(),
                Value::from_json(&json!({
                    "id": "a1",
                    "domain": "tfp.ca.smallstep.com",
                    "admin_emails": ["a@x"]
                })),
            ),
        );
        state
    }

    #[test]
    fn test_whole_reference_keeps_type() {
        let state = state();
        let resolved = resolve(
            &json!({
                "authority_id": "${smallstep_authority.main.id}",
                "emails": "${smallstep_authority.main.admin_emails}",
                "url": "https://${smallstep_authority.main.domain}/acme"
            }),
            &state,
        )
        .unwrap();
        assert_eq!(resolved.get("authority_id").as_str(), Some("a1"));
        assert_eq!(resolved.get("emails").as_list().map(<[Value]>::len), Some(1));
        assert_eq!(
            resolved.get("url").as_str(),
            Some("https://tfp.ca.smallstep.com/acme")
        );
    }

    #[test]
    fn test_pending_reference_is_unknown() {
        let state = state();
        let lookup = Pending(&state, &["smallstep_provisioner.jwk"]);
        let resolved = resolve(&json!("${smallstep_provisioner.jwk.name}"), &lookup).unwrap();
        assert!(resolved.is_unknown());

        let err = resolve(&json!("${smallstep_provisioner.other.name}"), &lookup).unwrap_err();
        assert!(err.to_string().contains("no such resource"));
    }

    #[test]
    fn test_references_in_declaration() {
        let found = references(&json!({
            "authority_id": "${smallstep_authority.main.id}",
            "nested": ["${smallstep_provisioner.jwk.name}", "${smallstep_authority.main.domain}"]
        }));
        assert_eq!(found, vec!["smallstep_authority.main", "smallstep_provisioner.jwk"]);
    }
}
