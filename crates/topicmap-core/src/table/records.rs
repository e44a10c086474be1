//! Conversion between tables and JSON records.

use serde_json::{Map, Number, Value};
use std::collections::BTreeSet;

use super::{Column, Table};
use crate::error::{PipelineError, Result};

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Text,
    Number,
    Vector,
}

impl Table {
    /// Build a table from JSON objects, one per row.
    ///
    /// Column types are inferred from the first non-null value of each key:
    /// strings become text, numbers become numbers, numeric arrays become
    /// vectors. A key absent from a record reads as null. Columns are ordered
    /// by key name.
    pub fn from_records(records: &[Map<String, Value>]) -> Result<Table> {
        let keys: BTreeSet<&str> = records
            .iter()
            .flat_map(|r| r.keys().map(String::as_str))
            .collect();

        let mut table = Table::new();
        for key in keys {
            let cells: Vec<&Value> = records
                .iter()
                .map(|r| r.get(key).unwrap_or(&Value::Null))
                .collect();
            table = table.with_column(key, column_from_cells(key, &cells)?)?;
        }
        if table.n_columns() == 0 && !records.is_empty() {
            return Err(PipelineError::Records {
                index: 0,
                reason: "records have no fields".to_string(),
            });
        }
        Ok(table)
    }

    /// Convert the table back into JSON objects, one per row.
    pub fn to_records(&self) -> Vec<Map<String, Value>> {
        (0..self.n_rows())
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| (c.name.clone(), cell_to_value(&c.column, row)))
                    .collect()
            })
            .collect()
    }
}

fn column_from_cells(key: &str, cells: &[&Value]) -> Result<Column> {
    let mut kind = None;
    for (index, cell) in cells.iter().enumerate() {
        let this = match cell {
            Value::Null => continue,
            Value::String(_) => Kind::Text,
            Value::Number(_) => Kind::Number,
            Value::Array(_) => Kind::Vector,
            other => {
                return Err(PipelineError::Records {
                    index,
                    reason: format!("field '{}' has unsupported value {}", key, other),
                })
            }
        };
        match kind {
            None => kind = Some(this),
            Some(k) if k != this => {
                return Err(PipelineError::Records {
                    index,
                    reason: format!("field '{}' mixes value types", key),
                })
            }
            _ => {}
        }
    }

    let column = match kind.unwrap_or(Kind::Text) {
        Kind::Text => Column::Text(
            cells
                .iter()
                .map(|c| c.as_str().map(str::to_string))
                .collect(),
        ),
        Kind::Number => Column::Number(cells.iter().map(|c| c.as_f64()).collect()),
        Kind::Vector => {
            let mut vectors = Vec::with_capacity(cells.len());
            for (index, cell) in cells.iter().enumerate() {
                vectors.push(vector_from_value(key, index, cell)?);
            }
            Column::Vector(vectors)
        }
    };
    Ok(column)
}

fn vector_from_value(key: &str, index: usize, value: &Value) -> Result<Vec<f32>> {
    let items = value.as_array().ok_or_else(|| PipelineError::Records {
        index,
        reason: format!("field '{}' is null where a vector is required", key),
    })?;
    items
        .iter()
        .map(|v| {
            v.as_f64().map(|f| f as f32).ok_or_else(|| PipelineError::Records {
                index,
                reason: format!("field '{}' contains a non-numeric element", key),
            })
        })
        .collect()
}

fn cell_to_value(column: &Column, row: usize) -> Value {
    match column {
        Column::Text(v) => v[row].clone().map(Value::String).unwrap_or(Value::Null),
        Column::Number(v) => v[row]
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Column::Vector(v) => Value::Array(
            v[row]
                .iter()
                .map(|&f| {
                    Number::from_f64(f as f64)
                        .map(Value::Number)
                        .unwrap_or(Value::Null)
                })
                .collect(),
        ),
    }
}
