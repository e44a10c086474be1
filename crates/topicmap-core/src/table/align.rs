use crate::error::{PipelineError, Result, Stage};

use super::Table;

/// A per-row sequence whose length has been checked against a table.
///
/// Positional identity is the only join key in the pipeline, so this is the
/// one place where "same length" is established.
#[derive(Debug, Clone, PartialEq)]
pub struct RowAligned<T> {
    values: Vec<T>,
}

impl<T> RowAligned<T> {
    /// Check that `values` has exactly one entry per row of `table`.
    pub fn new(stage: Stage, table: &Table, values: Vec<T>) -> Result<Self> {
        Self::with_len(stage, table.n_rows(), values)
    }

    /// Check that `values` has exactly `n_rows` entries.
    pub fn with_len(stage: Stage, n_rows: usize, values: Vec<T>) -> Result<Self> {
        if values.len() != n_rows {
            return Err(PipelineError::shape(stage, n_rows, values.len()));
        }
        Ok(Self { values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn into_inner(self) -> Vec<T> {
        self.values
    }

    /// Transform each value; length and order are unchanged.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> RowAligned<U> {
        RowAligned {
            values: self.values.into_iter().map(f).collect(),
        }
    }
}
