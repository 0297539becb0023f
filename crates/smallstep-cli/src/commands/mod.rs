//! CLI commands

pub mod describe;
pub mod docs;
pub mod schema;
pub mod sweep;

use smallstep_client::{Client, ClientConfig};
use smallstep_core::{Attribute, PlanModifier, Requiredness, Schema};
use smallstep_provider::{ProviderSchema, SmallstepProvider};

use crate::error::{CliError, Result};
use crate::suggest::did_you_mean;

/// Prefix shared by every type name
pub const TYPE_PREFIX: &str = "smallstep_";

/// Prefix selecting a data source when a resource has the same name
pub const DATA_PREFIX: &str = "data.";

/// Provider bound to the default gateway; schema commands never send requests
pub fn offline_provider() -> Result<SmallstepProvider> {
    let client = Client::from_config(&ClientConfig::default())
        .map_err(|e| CliError::internal(e.to_string()))?;
    Ok(SmallstepProvider::with_client(client))
}

/// Whether a schema belongs to a resource or a data source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaKind {
    Resource,
    DataSource,
}

impl SchemaKind {
    pub fn label(self) -> &'static str {
        match self {
            SchemaKind::Resource => "Resource",
            SchemaKind::DataSource => "Data Source",
        }
    }
}

/// Find a schema by type name
///
/// The `smallstep_` prefix may be left out. Resources win over data sources
/// of the same name unless the name starts with `data.`.
pub fn find_schema<'a>(
    schemas: &'a ProviderSchema,
    name: &str,
) -> Result<(String, SchemaKind, &'a Schema)> {
    let (data_only, bare) = match name.strip_prefix(DATA_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, name),
    };
    let full = if bare.starts_with(TYPE_PREFIX) {
        bare.to_string()
    } else {
        format!("{}{}", TYPE_PREFIX, bare)
    };

    if !data_only && let Some(schema) = schemas.resources.get(&full) {
        return Ok((full, SchemaKind::Resource, schema));
    }
    if let Some(schema) = schemas.data_sources.get(&full) {
        return Ok((full, SchemaKind::DataSource, schema));
    }

    let candidates: Vec<&str> = schemas
        .resources
        .keys()
        .chain(schemas.data_sources.keys())
        .map(String::as_str)
        .collect();
    Err(CliError::UnknownType {
        name: name.to_string(),
        help: did_you_mean(&full, &candidates)
            .or_else(|| Some("Run `smallstep-provider schema` to list every type".to_string())),
    })
}

/// `required`, `optional`, `computed` or `optional, computed`
pub fn requiredness_label(requiredness: Requiredness) -> &'static str {
    match requiredness {
        Requiredness::Required => "required",
        Requiredness::Optional => "optional",
        Requiredness::Computed => "computed",
        Requiredness::OptionalComputed => "optional, computed",
    }
}

/// Extra notes shown next to an attribute
pub fn attribute_flags(attribute: &Attribute) -> Vec<&'static str> {
    let mut flags = Vec::new();
    if attribute.sensitive {
        flags.push("sensitive");
    }
    if attribute.has_modifier(PlanModifier::RequiresReplace) {
        flags.push("forces replacement");
    }
    flags
}
