//! JSON Lines input and output.

use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

use topicmap_core::{PipelineError, Result, Table};

/// Read one JSON object per line. Blank lines are skipped; record indices in
/// errors count non-blank lines from zero.
pub fn read_jsonl(path: impl AsRef<Path>) -> Result<Table> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut records: Vec<Map<String, Value>> = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let index = records.len();
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(record)) => records.push(record),
            Ok(other) => {
                return Err(PipelineError::Records {
                    index,
                    reason: format!("expected a JSON object, got {}", json_kind(&other)),
                })
            }
            Err(e) => {
                return Err(PipelineError::Records {
                    index,
                    reason: e.to_string(),
                })
            }
        }
    }

    debug!("Read {} records from {}", records.len(), path.display());
    Table::from_records(&records)
}

/// Write every row of `table` as one JSON object per line.
pub fn write_jsonl(path: impl AsRef<Path>, table: &Table) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    for record in table.to_records() {
        serde_json::to_writer(&mut writer, &record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
