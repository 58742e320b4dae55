// Validate process definition files

use anyhow::Result;
use flowline_engine::ProcessDefinition;
use serde::Serialize;

use super::load_definition;
use crate::output::{print_field, print_table_header, print_table_row, OutputFormat};

#[derive(Debug, Serialize)]
struct DefinitionSummary {
    file: String,
    process_id: String,
    version: u32,
    elements: Vec<ElementSummary>,
}

#[derive(Debug, Serialize)]
struct ElementSummary {
    id: String,
    #[serde(rename = "type")]
    element_type: String,
    flow_scope: String,
    incoming: usize,
    outgoing: usize,
}

fn summarize(file: &str, definition: &ProcessDefinition) -> DefinitionSummary {
    DefinitionSummary {
        file: file.to_string(),
        process_id: definition.process_id().to_string(),
        version: definition.version(),
        elements: definition
            .elements()
            .iter()
            .map(|element| ElementSummary {
                id: element.id.clone(),
                element_type: element.element_type.to_string(),
                flow_scope: element.flow_scope.clone().unwrap_or_default(),
                incoming: element.incoming.len(),
                outgoing: element.outgoing.len(),
            })
            .collect(),
    }
}

pub fn run(output: OutputFormat, quiet: bool, files: &[String]) -> Result<()> {
    let summaries = files
        .iter()
        .map(|file| load_definition(file).map(|definition| summarize(file, &definition)))
        .collect::<Result<Vec<_>>>()?;

    if !output.is_text() {
        return output.print_value(&summaries);
    }

    for summary in &summaries {
        print_field("File", &summary.file);
        print_field("Process", &summary.process_id);
        print_field("Version", &summary.version.to_string());
        if quiet {
            continue;
        }
        println!();
        print_table_header(&[("ID", 20), ("TYPE", 18), ("SCOPE", 20), ("IN", 3), ("OUT", 3)]);
        for element in &summary.elements {
            print_table_row(&[
                (&element.id, 20),
                (&element.element_type, 18),
                (&element.flow_scope, 20),
                (&element.incoming.to_string(), 3),
                (&element.outgoing.to_string(), 3),
            ]);
        }
        println!();
    }
    Ok(())
}
