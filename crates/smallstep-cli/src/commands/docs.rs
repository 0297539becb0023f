//! Docs command - markdown reference for every resource and data source

use console::style;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use smallstep_core::{Attribute, Schema};

use super::{SchemaKind, TYPE_PREFIX, attribute_flags, offline_provider};
use crate::error::Result;

pub fn run(output_dir: &Path) -> Result<()> {
    let provider = offline_provider()?;
    let schemas = provider.schemas()?;

    let mut written = 0;
    for (dir, kind, entries) in [
        ("resources", SchemaKind::Resource, &schemas.resources),
        ("data-sources", SchemaKind::DataSource, &schemas.data_sources),
    ] {
        let dir = output_dir.join(dir);
        fs::create_dir_all(&dir)?;
        for (name, schema) in entries {
            let file = dir.join(format!("{}.md", short_name(name)));
            fs::write(&file, render(name, kind, schema))?;
            tracing::debug!(file = %file.display(), "wrote");
            written += 1;
        }
    }

    println!(
        "{} Wrote {} files to {}",
        style("✓").green().bold(),
        written,
        output_dir.display()
    );
    Ok(())
}

fn short_name(name: &str) -> &str {
    name.strip_prefix(TYPE_PREFIX).unwrap_or(name)
}

/// Markdown page for one schema
pub fn render(name: &str, kind: SchemaKind, schema: &Schema) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {} ({})", name, kind.label());
    if !schema.description.is_empty() {
        let _ = writeln!(out, "\n{}", schema.description);
    }
    let _ = writeln!(out, "\n## Schema");
    render_block(&mut out, &schema.attributes, None);
    out
}

fn render_block(out: &mut String, attributes: &BTreeMap<String, Attribute>, parent: Option<&str>) {
    let sections: [(&str, fn(&Attribute) -> bool); 3] = [
        ("Required", |a| a.is_required()),
        ("Optional", |a| a.is_configurable() && !a.is_required()),
        ("Read-Only", |a| !a.is_configurable()),
    ];
    let mut nested = Vec::new();

    if let Some(parent) = parent {
        let _ = writeln!(out, "\n<a id=\"nestedschema--{}\"></a>", parent.replace('.', "--"));
        let _ = writeln!(out, "### Nested Schema for `{}`", parent);
    }
    for (title, belongs) in sections {
        let members: Vec<(&String, &Attribute)> =
            attributes.iter().filter(|(_, a)| belongs(a)).collect();
        if members.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n### {}\n", title);
        for (name, attribute) in members {
            let path = match parent {
                Some(parent) => format!("{}.{}", parent, name),
                None => name.clone(),
            };
            let mut notes = vec![attribute.kind.type_name()];
            notes.extend(attribute_flags(attribute).into_iter().map(String::from));
            let _ = write!(out, "- `{}` ({})", name, notes.join(", "));
            if !attribute.description.is_empty() {
                let _ = write!(out, " {}", attribute.description);
            }
            if attribute.kind.nested().is_some() {
                let _ = write!(
                    out,
                    " (see [below for nested schema](#nestedschema--{}))",
                    path.replace('.', "--")
                );
                nested.push((path, attribute));
            }
            out.push('\n');
        }
    }

    for (path, attribute) in nested {
        if let Some(children) = attribute.kind.nested() {
            render_block(out, children, Some(&path));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallstep_core::ElementKind;

    #[test]
    fn test_render_sections_and_nested_blocks() {
        let claims = BTreeMap::from([(
            "min_tls_cert_duration".to_string(),
            Attribute::string().optional().describe("Shortest TLS certificate lifetime."),
        )]);
        let schema = Schema::new("A provisioner.")
            .attribute("id", Attribute::string().computed().describe("Identifier."))
            .attribute(
                "name",
                Attribute::string().required().requires_replace().describe("Unique name."),
            )
            .attribute("claims", Attribute::object(claims).optional())
            .attribute("admins", Attribute::set(ElementKind::String).optional().sensitive());

        insta::assert_snapshot!(render("smallstep_provisioner", SchemaKind::Resource, &schema), @r#"
        # smallstep_provisioner (Resource)

        A provisioner.

        ## Schema

        ### Required

        - `name` (string, forces replacement) Unique name.

        ### Optional

        - `admins` (set of string, sensitive)
        - `claims` (object) (see [below for nested schema](#nestedschema--claims))

        ### Read-Only

        - `id` (string) Identifier.

        <a id="nestedschema--claims"></a>
        ### Nested Schema for `claims`

        ### Optional

        - `min_tls_cert_duration` (string) Shortest TLS certificate lifetime.
        "#);
    }

    #[test]
    fn test_short_name() {
        assert_eq!(short_name("smallstep_authority"), "authority");
        assert_eq!(short_name("other"), "other");
    }
}
