//! Embedding stage: one vector per row of a text column.

use std::time::Instant;
use tracing::{debug, info};

use crate::error::{BackendResult, PipelineError, Result, Stage};
use crate::table::{RowAligned, Table};

/// Maps text to a fixed-length vector.
///
/// Implementations are constructed explicitly and passed in, so several
/// models can coexist and tests can use fakes.
pub trait Embedder {
    /// Embed a single text.
    fn embed(&self, text: &str) -> BackendResult<Vec<f32>>;

    /// Embed several texts, one vector per text in input order.
    fn embed_batch(&self, texts: &[&str]) -> BackendResult<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Output dimensionality, when known before the first call.
    fn dimensions(&self) -> Option<usize> {
        None
    }
}

/// Applies an [`Embedder`] row-wise over a table's text column.
pub struct EmbeddingStage<'a> {
    embedder: &'a dyn Embedder,
    batch_size: usize,
}

impl<'a> EmbeddingStage<'a> {
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self {
            embedder,
            batch_size: 32,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Embed every text, preserving order.
    ///
    /// A null or blank text is an error for its row; nothing is skipped or
    /// zero-filled.
    pub fn embed_texts(&self, texts: &[Option<String>]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<&str> = texts
            .iter()
            .enumerate()
            .map(|(row, text)| match text.as_deref() {
                Some(t) if !t.trim().is_empty() => Ok(t),
                _ => Err(PipelineError::UnembeddableText { row }),
            })
            .collect::<Result<_>>()?;

        let start = Instant::now();
        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(texts.len());
        let mut dimensions = self.embedder.dimensions();

        for (chunk_index, chunk) in texts.chunks(self.batch_size).enumerate() {
            let first_row = chunk_index * self.batch_size;
            let last_row = first_row + chunk.len() - 1;
            let fail = |reason: String| PipelineError::Embedding {
                first_row,
                last_row,
                reason,
            };

            let vectors = self.embedder.embed_batch(chunk).map_err(|e| fail(e.0))?;
            if vectors.len() != chunk.len() {
                return Err(fail(format!(
                    "embedder returned {} vectors for {} texts",
                    vectors.len(),
                    chunk.len()
                )));
            }
            for vector in &vectors {
                let expected = *dimensions.get_or_insert(vector.len());
                if vector.is_empty() || vector.len() != expected {
                    return Err(fail(format!(
                        "embedding has {} dimensions, expected {}",
                        vector.len(),
                        expected
                    )));
                }
            }
            embeddings.extend(vectors);
            debug!("Embedded {}/{} rows", embeddings.len(), texts.len());
        }

        info!(
            "Embedded {} rows in {}ms",
            embeddings.len(),
            start.elapsed().as_millis()
        );
        Ok(embeddings)
    }

    /// Add `output_column` holding the embedding of each `text_column` value.
    pub fn run(&self, table: Table, text_column: &str, output_column: &str) -> Result<Table> {
        let embeddings = self.embed_texts(table.text(text_column)?)?;
        let aligned = RowAligned::new(Stage::Embedding, &table, embeddings)?;
        table.with_aligned(output_column, aligned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::table::Column;
    use std::cell::Cell;

    /// Embeds text as [length, vowel count]; counts batch calls.
    struct LengthEmbedder {
        calls: Cell<usize>,
    }

    impl Embedder for LengthEmbedder {
        fn embed(&self, text: &str) -> BackendResult<Vec<f32>> {
            let vowels = text.chars().filter(|c| "aeiou".contains(*c)).count();
            Ok(vec![text.len() as f32, vowels as f32])
        }

        fn embed_batch(&self, texts: &[&str]) -> BackendResult<Vec<Vec<f32>>> {
            self.calls.set(self.calls.get() + 1);
            texts.iter().map(|t| self.embed(t)).collect()
        }
    }

    struct FailingEmbedder;

    impl Embedder for FailingEmbedder {
        fn embed(&self, _text: &str) -> BackendResult<Vec<f32>> {
            Err(BackendError::from("model exploded"))
        }
    }

    fn table(texts: Vec<Option<&str>>) -> Table {
        Table::from_columns([(
            "body",
            Column::Text(texts.into_iter().map(|t| t.map(str::to_string)).collect()),
        )])
        .unwrap()
    }

    #[test]
    fn adds_one_embedding_per_row_in_order() {
        let embedder = LengthEmbedder { calls: Cell::new(0) };
        let out = EmbeddingStage::new(&embedder)
            .run(table(vec![Some("a"), Some("bee"), Some("cat")]), "body", "body_emb")
            .unwrap();

        assert_eq!(out.n_rows(), 3);
        assert_eq!(
            out.vectors("body_emb").unwrap(),
            &[vec![1.0, 1.0], vec![3.0, 2.0], vec![3.0, 1.0]]
        );
        assert!(out.contains("body"));
    }

    #[test]
    fn batches_rows() {
        let embedder = LengthEmbedder { calls: Cell::new(0) };
        let texts: Vec<Option<String>> = (0..5).map(|i| Some(format!("doc {}", i))).collect();
        let out = EmbeddingStage::new(&embedder)
            .with_batch_size(2)
            .embed_texts(&texts)
            .unwrap();
        assert_eq!(out.len(), 5);
        assert_eq!(embedder.calls.get(), 3);
    }

    #[test]
    fn null_text_fails_with_row() {
        let embedder = LengthEmbedder { calls: Cell::new(0) };
        let err = EmbeddingStage::new(&embedder)
            .run(table(vec![Some("a"), None]), "body", "body_emb")
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnembeddableText { row: 1 }));
        assert_eq!(embedder.calls.get(), 0);
    }

    #[test]
    fn blank_text_fails() {
        let embedder = LengthEmbedder { calls: Cell::new(0) };
        let err = EmbeddingStage::new(&embedder)
            .run(table(vec![Some("   ")]), "body", "body_emb")
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnembeddableText { row: 0 }));
    }

    #[test]
    fn backend_failure_reports_rows() {
        let err = EmbeddingStage::new(&FailingEmbedder)
            .with_batch_size(2)
            .run(table(vec![Some("a"), Some("b"), Some("c")]), "body", "body_emb")
            .unwrap_err();
        match err {
            PipelineError::Embedding {
                first_row,
                last_row,
                reason,
            } => {
                assert_eq!((first_row, last_row), (0, 1));
                assert_eq!(reason, "model exploded");
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
