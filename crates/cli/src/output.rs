// Output formatting for CLI

use anyhow::Result;
use flowline_engine::{Record, RecordValue};
use serde::Serialize;

#[derive(Clone, Copy)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn from_str(s: &str) -> Self {
        match s {
            "json" => OutputFormat::Json,
            "yaml" => OutputFormat::Yaml,
            _ => OutputFormat::Text,
        }
    }

    pub fn print_value<T: Serialize>(&self, value: &T) -> Result<()> {
        match self {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(value)?);
            }
            OutputFormat::Yaml => {
                println!("{}", serde_yaml::to_string(value)?);
            }
            OutputFormat::Text => {
                // Text format is handled by each command
            }
        }
        Ok(())
    }

    pub fn is_text(&self) -> bool {
        matches!(self, OutputFormat::Text)
    }
}

/// Print a simple key-value pair for text output
pub fn print_field(label: &str, value: &str) {
    println!("{:<14} {}", format!("{}:", label), value);
}

/// Print a table header
pub fn print_table_header(columns: &[(&str, usize)]) {
    let header: String = columns
        .iter()
        .map(|(name, width)| format!("{:<width$}", name, width = width))
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", header);
}

/// Print a table row
pub fn print_table_row(values: &[(&str, usize)]) {
    let row: String = values
        .iter()
        .map(|(val, width)| {
            let s = if val.len() > *width && *width > 3 {
                let cut = (0..=(width - 3))
                    .rev()
                    .find(|idx| val.is_char_boundary(*idx))
                    .unwrap_or(0);
                format!("{}...", &val[..cut])
            } else {
                val.to_string()
            };
            format!("{:<width$}", s, width = width)
        })
        .collect::<Vec<_>>()
        .join("  ");
    println!("{}", row);
}

pub const RECORD_COLUMNS: [(&str, usize); 5] = [
    ("POSITION", 8),
    ("KEY", 18),
    ("INTENT", 18),
    ("ELEMENT", 20),
    ("DETAIL", 40),
];

/// Print one record as a table row
pub fn print_record(position: Option<u64>, record: &Record) {
    let position = position.map(|p| p.to_string()).unwrap_or_default();
    let key = record.key.to_string();
    let intent = record.intent.to_string();
    let detail = match &record.value {
        RecordValue::ElementInstance(value) => value.element_type.to_string(),
        RecordValue::Incident(value) => format!(
            "instance {}: {}",
            value.element_instance_key, value.error_message
        ),
    };

    print_table_row(&[
        (&position, RECORD_COLUMNS[0].1),
        (&key, RECORD_COLUMNS[1].1),
        (&intent, RECORD_COLUMNS[2].1),
        (record.element_id(), RECORD_COLUMNS[3].1),
        (&detail, RECORD_COLUMNS[4].1),
    ]);
}
