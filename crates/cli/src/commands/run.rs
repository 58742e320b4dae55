// Run a command script through one partition engine

use std::sync::Arc;

use anyhow::{Context, Result};
use flowline_engine::{
    Command, Engine, EngineConfig, InMemoryRecordLog, ProcessCache, ProcessingResult, Record,
};
use serde::Serialize;

use super::{load_definition, load_file};
use crate::output::{print_field, print_record, print_table_header, OutputFormat, RECORD_COLUMNS};

pub struct RunOptions {
    pub definitions: Vec<String>,
    pub commands: String,
    pub partition_id: Option<u16>,
    pub max_steps: Option<usize>,
    pub strict: bool,
}

/// Outcome of one scripted command
#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: Command,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    records: Vec<PositionedRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejected: Option<String>,
}

#[derive(Debug, Serialize)]
struct PositionedRecord {
    position: u64,
    #[serde(flatten)]
    record: Record,
}

fn positioned(result: ProcessingResult) -> Vec<PositionedRecord> {
    let Some(last) = result.position else {
        return Vec::new();
    };
    let first = last + 1 - result.records.len() as u64;
    result
        .records
        .into_iter()
        .zip(first..)
        .map(|(record, position)| PositionedRecord { position, record })
        .collect()
}

/// Command-line flags take precedence over the environment
fn engine_config(base: EngineConfig, options: &RunOptions) -> Result<EngineConfig> {
    let mut config = base;
    if let Some(partition_id) = options.partition_id {
        config = config.with_partition_id(partition_id);
    }
    if let Some(max_steps) = options.max_steps {
        config = config.with_max_steps_per_command(max_steps);
    }
    config.validate().context("Invalid engine configuration")?;
    Ok(config)
}

pub fn run(output: OutputFormat, quiet: bool, options: RunOptions) -> Result<()> {
    let config = engine_config(EngineConfig::from_env(), &options)?;

    let processes = Arc::new(ProcessCache::new());
    for path in &options.definitions {
        let definition = processes.deploy(load_definition(path)?);
        tracing::info!(
            process_id = definition.process_id(),
            version = definition.version(),
            "deployed process definition"
        );
    }

    let script: Vec<Command> = load_file(&options.commands)?;
    let mut engine = Engine::with_config(processes, InMemoryRecordLog::new(), config);

    if output.is_text() {
        print_table_header(&RECORD_COLUMNS);
    }

    let mut outcomes = Vec::with_capacity(script.len());
    for (index, command) in script.into_iter().enumerate() {
        let name = command.name();
        match engine.process(command.clone()) {
            Ok(result) => {
                let records = positioned(result);
                if output.is_text() {
                    for entry in &records {
                        print_record(Some(entry.position), &entry.record);
                    }
                }
                outcomes.push(CommandOutcome {
                    command,
                    records,
                    rejected: None,
                });
            }
            Err(err) if !err.is_defect() && !options.strict => {
                if output.is_text() && !quiet {
                    println!("# command {} ({}) rejected: {}", index + 1, name, err);
                }
                outcomes.push(CommandOutcome {
                    command,
                    records: Vec::new(),
                    rejected: Some(err.to_string()),
                });
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Command {} ({}) failed", index + 1, name));
            }
        }
    }

    if !output.is_text() {
        return output.print_value(&outcomes);
    }

    if !quiet {
        let state = engine.state();
        println!();
        print_field("Records", &engine.writer().len().to_string());
        print_field("Live", &state.instances().len().to_string());
        print_field("Incidents", &state.incidents().len().to_string());
        for incident in state.incidents().iter() {
            print_field(
                &format!("Incident {}", incident.key),
                &format!("{} ({})", incident.failure, incident.element_id),
            );
        }
    }
    Ok(())
}
