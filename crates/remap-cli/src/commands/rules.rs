//! Show the sealed rules of a mapping

use anyhow::{Context, Result};
use remap_core::{FunctionRegistry, Project, TransformationRule};

/// Run the rules command
pub fn run(config_path: &str, name: &str, json: bool) -> Result<()> {
    let project = Project::load(config_path).context("Failed to load project")?;
    let mapper = project
        .seal(name, &FunctionRegistry::with_builtins())
        .with_context(|| format!("Failed to seal mapping '{name}'"))?;

    if json {
        let output = serde_json::json!({
            "name": name,
            "from": mapper.source_type(),
            "to": mapper.destination_type(),
            "rules": mapper.rules().iter().map(TransformationRule::summary).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{mapper}");
    }
    Ok(())
}
