//! Initialize a new Remap project

use anyhow::Result;
use remap_core::config::{MAPPINGS_DIR, PROJECT_FILE};
use std::fs;
use std::path::Path;

/// Run the init command
pub fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    // Get absolute path for deriving name
    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    // Check if already initialized
    if project_dir.join(PROJECT_FILE).exists() {
        anyhow::bail!(
            "Directory '{}' already contains a {PROJECT_FILE}",
            project_dir.display()
        );
    }

    tracing::info!("Creating new Remap project: {}", project_name);

    fs::create_dir_all(project_dir.join(MAPPINGS_DIR))?;

    let config = format!(
        r#"# Remap Project Configuration
name: {project_name}
version: "0.1.0"

# Same-named properties without a rule are mapped automatically
options:
  implicit_mapping: true

# Record types: property name -> type (bool, char, int, float, string,
# a record type name, T?, list<T>, set<T>, collection<T>, map<T>)
types:
  Person:
    name: string
    age: int
    nickname: string?
    internal_id:
      type: string
      writable: false

  PersonView:
    full_name: string
    age_group: string
    nickname: string?
"#
    );
    fs::write(project_dir.join(PROJECT_FILE), config)?;

    let example_mapping = r#"# Example mapping
name: person_view
description: Present a person to API clients

from: Person
to: PersonView

rules:
  - reassign: { from: name, to: full_name }
  - replace: { from: age, to: age_group, function: to_string }
  - omit_in_source: internal_id
  # nickname is mapped implicitly
"#;
    fs::write(
        project_dir.join(MAPPINGS_DIR).join("person_view.yaml"),
        example_mapping,
    )?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  remap validate               # Seal every mapping");
    tracing::info!("  remap rules person_view      # Show the sealed rules");

    Ok(())
}
