use serde::{Deserialize, Serialize};

/// A single typed column. All columns of a table have the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "snake_case")]
pub enum Column {
    /// Free text, nullable
    Text(Vec<Option<String>>),
    /// Scalar numbers, nullable
    Number(Vec<Option<f64>>),
    /// Fixed-length vectors (embeddings)
    Vector(Vec<Vec<f32>>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Text(v) => v.len(),
            Column::Number(v) => v.len(),
            Column::Vector(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Short name of the value type, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Column::Text(_) => "text",
            Column::Number(_) => "number",
            Column::Vector(_) => "vector",
        }
    }

    /// Display form of a cell, `None` for nulls.
    pub fn display(&self, row: usize) -> Option<String> {
        match self {
            Column::Text(v) => v.get(row).cloned().flatten(),
            Column::Number(v) => v.get(row).copied().flatten().map(|n| n.to_string()),
            Column::Vector(v) => v.get(row).map(|vec| format!("{:?}", vec)),
        }
    }
}

impl From<Vec<String>> for Column {
    fn from(values: Vec<String>) -> Self {
        Column::Text(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<String>>> for Column {
    fn from(values: Vec<Option<String>>) -> Self {
        Column::Text(values)
    }
}

impl From<Vec<&str>> for Column {
    fn from(values: Vec<&str>) -> Self {
        Column::Text(values.into_iter().map(|s| Some(s.to_string())).collect())
    }
}

impl From<Vec<f64>> for Column {
    fn from(values: Vec<f64>) -> Self {
        Column::Number(values.into_iter().map(Some).collect())
    }
}

impl From<Vec<Vec<f32>>> for Column {
    fn from(values: Vec<Vec<f32>>) -> Self {
        Column::Vector(values)
    }
}
