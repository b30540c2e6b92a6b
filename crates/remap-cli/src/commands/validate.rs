//! Validate configuration command

use anyhow::{Context, Result};
use remap_core::{FunctionRegistry, Project};

/// Run the validate command
pub fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating project: {}", config_path);

    let project = Project::load(config_path).context("Failed to load project")?;
    let functions = FunctionRegistry::with_builtins();

    tracing::info!("✓ Project: {}", project.name());
    tracing::info!("✓ Version: {}", project.config().project.version);
    tracing::info!("✓ Types: {}", project.config().project.types.len());

    let mut failures = 0;
    for mapping in project.mappings() {
        match project.seal(&mapping.name, &functions) {
            Ok(mapper) => tracing::info!(
                "✓ {} ({}, {} rules)",
                mapping.name,
                mapper.type_pair(),
                mapper.rules().len()
            ),
            Err(e) => {
                failures += 1;
                tracing::error!("✗ {e}");
            }
        }
    }

    if failures > 0 {
        anyhow::bail!(
            "{failures} of {} mappings failed to seal",
            project.mappings().len()
        );
    }
    tracing::info!("✓ All {} mappings are valid", project.mappings().len());
    Ok(())
}
