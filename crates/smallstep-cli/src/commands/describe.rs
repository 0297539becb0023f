//! Describe command - descriptions from the bundled OpenAPI document

use console::style;

use smallstep_core::{CoreError, openapi};

use crate::error::{CliError, Result};
use crate::suggest::did_you_mean;

pub fn run(component: Option<&str>) -> Result<()> {
    let Some(component) = component else {
        for name in openapi::component_names() {
            println!("{}", name);
        }
        return Ok(());
    };

    let description = openapi::describe(component).map_err(|e| match e {
        CoreError::UnknownComponent { .. } => {
            let names = openapi::component_names();
            let candidates: Vec<&str> = names.iter().map(String::as_str).collect();
            CliError::UnknownComponent {
                name: component.to_string(),
                help: did_you_mean(component, &candidates),
            }
        }
        other => CliError::from(other),
    })?;

    println!("{}", style(&description.name).cyan().bold());
    if !description.description.is_empty() {
        println!();
        println!("{}", description.description);
    }
    if !description.properties.is_empty() {
        println!();
        println!("{}:", style("Properties").bold());
        let width = description.properties.keys().map(String::len).max().unwrap_or(0);
        for (name, text) in &description.properties {
            println!("  {:<width$}  {}", name, text, width = width);
        }
    }
    Ok(())
}
