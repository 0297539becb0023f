//! Schema command - show resource and data source schemas

use console::style;
use std::collections::BTreeMap;

use smallstep_core::Attribute;

use super::{attribute_flags, find_schema, offline_provider, requiredness_label};
use crate::error::Result;

pub fn run(type_name: Option<&str>, json: bool) -> Result<()> {
    let provider = offline_provider()?;
    let schemas = provider.schemas()?;

    let Some(type_name) = type_name else {
        if json {
            println!("{}", serde_json::to_string_pretty(&schemas)?);
            return Ok(());
        }
        println!("{}", style("Resources").bold());
        for name in provider.resource_types() {
            println!("  {}", name);
        }
        println!();
        println!("{}", style("Data Sources").bold());
        for name in provider.data_source_types() {
            println!("  {}", name);
        }
        return Ok(());
    };

    let (name, kind, schema) = find_schema(&schemas, type_name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(schema)?);
        return Ok(());
    }

    println!("{} {}", style(&name).cyan().bold(), style(format!("({})", kind.label())).dim());
    if !schema.description.is_empty() {
        println!();
        println!("{}", schema.description);
    }
    println!();
    print_attributes(&schema.attributes, 1);
    Ok(())
}

fn print_attributes(attributes: &BTreeMap<String, Attribute>, depth: usize) {
    let indent = "  ".repeat(depth);
    for (name, attribute) in attributes {
        let mut notes = vec![attribute.kind.type_name(), requiredness_label(attribute.requiredness).to_string()];
        notes.extend(attribute_flags(attribute).into_iter().map(String::from));
        println!(
            "{}{} {}",
            indent,
            style(name).bold(),
            style(format!("({})", notes.join(", "))).dim()
        );
        if !attribute.description.is_empty() {
            println!("{}  {}", indent, attribute.description);
        }
        if let Some(nested) = attribute.kind.nested() {
            print_attributes(nested, depth + 1);
        }
    }
}
