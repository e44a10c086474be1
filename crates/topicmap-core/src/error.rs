//! Error types for the topic pipeline.

use std::fmt;
use thiserror::Error;

/// Pipeline stage that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Reduction,
    Clustering,
    LabelAttachment,
    CoordinateMerge,
    Visualization,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::Reduction => "reduction",
            Stage::Clustering => "clustering",
            Stage::LabelAttachment => "label attachment",
            Stage::CoordinateMerge => "coordinate merge",
            Stage::Visualization => "visualization",
        };
        f.write_str(name)
    }
}

/// Errors that abort a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A derived sequence does not line up with the table it belongs to
    #[error("{stage}: row count mismatch: expected {expected} rows, got {actual}")]
    ShapeMismatch {
        stage: Stage,
        expected: usize,
        actual: usize,
    },

    /// Empty dataset or too few distinct points for the requested output
    #[error("{stage}: degenerate input: {reason}")]
    DegenerateInput { stage: Stage, reason: String },

    /// Null or blank text value
    #[error("embedding: row {row} has no embeddable text")]
    UnembeddableText { row: usize },

    /// The embedder failed on a batch of rows
    #[error("embedding: rows {first_row}..={last_row} failed: {reason}")]
    Embedding {
        first_row: usize,
        last_row: usize,
        reason: String,
    },

    /// An external capability (reducer, clusterer) failed
    #[error("{stage} backend error: {message}")]
    Backend { stage: Stage, message: String },

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("column '{name}' holds {actual} values, expected {expected}")]
    ColumnType {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("column '{name}' has {actual} values, table has {expected} rows")]
    ColumnLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    /// Invalid configuration value
    #[error("configuration error: {0}")]
    Config(String),

    /// Input records could not be turned into a table
    #[error("invalid record {index}: {reason}")]
    Records { index: usize, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn shape(stage: Stage, expected: usize, actual: usize) -> Self {
        PipelineError::ShapeMismatch {
            stage,
            expected,
            actual,
        }
    }

    pub(crate) fn degenerate(stage: Stage, reason: impl Into<String>) -> Self {
        PipelineError::DegenerateInput {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn backend(stage: Stage, err: BackendError) -> Self {
        PipelineError::Backend {
            stage,
            message: err.0,
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failure reported by an external capability (embedder, reducer, clusterer).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BackendError(pub String);

impl From<String> for BackendError {
    fn from(message: String) -> Self {
        BackendError(message)
    }
}

impl From<&str> for BackendError {
    fn from(message: &str) -> Self {
        BackendError(message.to_string())
    }
}

/// Result type returned by capability implementations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_names_stage_and_counts() {
        let err = PipelineError::shape(Stage::CoordinateMerge, 4, 3);
        assert_eq!(
            err.to_string(),
            "coordinate merge: row count mismatch: expected 4 rows, got 3"
        );
    }

    #[test]
    fn backend_error_keeps_message() {
        let err = PipelineError::backend(Stage::Clustering, "empty dataset".into());
        assert_eq!(err.to_string(), "clustering backend error: empty dataset");
    }
}
