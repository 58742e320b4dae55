// CLI subcommands

pub mod run;
pub mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use flowline_engine::{ProcessDefinition, ProcessModel};
use serde::de::DeserializeOwned;

/// Read a YAML or JSON file, picking the parser from the extension
pub fn load_file<T: DeserializeOwned>(path: &str) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))?;

    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON: {}", path))
    } else {
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse YAML: {}", path))
    }
}

/// Load and build a process definition
pub fn load_definition(path: &str) -> Result<ProcessDefinition> {
    let model: ProcessModel = load_file(path)?;
    model
        .build()
        .with_context(|| format!("Invalid process definition: {}", path))
}
