//! In-memory tabular dataset.
//!
//! Row identity is row position. Every stage that derives a per-row sequence
//! (embeddings, coordinates, labels) goes through [`RowAligned`] before the
//! sequence is written back, so no stage can drop, reorder or duplicate rows.

mod align;
mod column;
mod records;

pub use align::RowAligned;
pub use column::Column;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedColumn {
    pub name: String,
    pub column: Column,
}

/// Ordered collection of equal-length named columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRepr")]
pub struct Table {
    columns: Vec<NamedColumn>,
    n_rows: usize,
}

/// Serialized form of [`Table`]; rebuilt through [`Table::from_columns`] so
/// ragged payloads are rejected.
#[derive(Deserialize)]
struct TableRepr {
    columns: Vec<NamedColumn>,
    #[serde(default)]
    n_rows: Option<usize>,
}

impl TryFrom<TableRepr> for Table {
    type Error = PipelineError;

    fn try_from(repr: TableRepr) -> Result<Self> {
        if repr.columns.is_empty() {
            return Ok(Table {
                columns: Vec::new(),
                n_rows: repr.n_rows.unwrap_or(0),
            });
        }
        let table = Table::from_columns(repr.columns.into_iter().map(|c| (c.name, c.column)))?;
        match repr.n_rows {
            Some(n_rows) if n_rows != table.n_rows => Err(PipelineError::ColumnLength {
                name: table.columns[0].name.clone(),
                expected: n_rows,
                actual: table.n_rows,
            }),
            _ => Ok(table),
        }
    }
}

impl Table {
    /// Create an empty table (no columns, no rows).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from named columns. All columns must have the same length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let mut table = Table::new();
        for (name, column) in columns {
            let name = name.into();
            if table.contains(&name) {
                return Err(PipelineError::DuplicateColumn(name));
            }
            table = table.with_column(name, column)?;
        }
        Ok(table)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Named columns in table order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|c| (c.name.as_str(), &c.column))
    }

    pub fn into_columns(self) -> impl Iterator<Item = (String, Column)> {
        self.columns.into_iter().map(|c| (c.name, c.column))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|i| &self.columns[i].column)
    }

    /// Like [`Table::column`], but a missing column is an error.
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
    }

    pub fn text(&self, name: &str) -> Result<&[Option<String>]> {
        match self.require(name)? {
            Column::Text(values) => Ok(values),
            other => Err(type_error(name, "text", other)),
        }
    }

    pub fn numbers(&self, name: &str) -> Result<&[Option<f64>]> {
        match self.require(name)? {
            Column::Number(values) => Ok(values),
            other => Err(type_error(name, "number", other)),
        }
    }

    pub fn vectors(&self, name: &str) -> Result<&[Vec<f32>]> {
        match self.require(name)? {
            Column::Vector(values) => Ok(values),
            other => Err(type_error(name, "vector", other)),
        }
    }

    /// Add a column, or replace an existing column of the same name in place.
    ///
    /// The first column of a fresh table fixes the row count. Dropping every
    /// column keeps the row count.
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        let name = name.into();
        let fresh = self.columns.is_empty() && self.n_rows == 0;
        if !fresh && column.len() != self.n_rows {
            return Err(PipelineError::ColumnLength {
                name,
                expected: self.n_rows,
                actual: column.len(),
            });
        }
        if fresh {
            self.n_rows = column.len();
        }
        match self.position(&name) {
            Some(i) => self.columns[i].column = column,
            None => self.columns.push(NamedColumn { name, column }),
        }
        Ok(self)
    }

    /// Write a row-aligned sequence back as a column.
    pub fn with_aligned<T>(self, name: impl Into<String>, values: RowAligned<T>) -> Result<Self>
    where
        Column: From<Vec<T>>,
    {
        self.with_column(name, Column::from(values.into_inner()))
    }

    /// Remove a column, returning it if it existed.
    pub fn drop_column(&mut self, name: &str) -> Option<Column> {
        let i = self.position(name)?;
        Some(self.columns.remove(i).column)
    }

    /// Remove every column whose name matches `pred`; returns the removed names.
    pub fn drop_columns_where(&mut self, pred: impl Fn(&str) -> bool) -> Vec<String> {
        let names: Vec<String> = self
            .column_names()
            .filter(|n| pred(*n))
            .map(str::to_string)
            .collect();
        for name in &names {
            self.drop_column(name);
        }
        names
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

fn type_error(name: &str, expected: &'static str, actual: &Column) -> PipelineError {
    PipelineError::ColumnType {
        name: name.to_string(),
        expected,
        actual: actual.kind(),
    }
}
