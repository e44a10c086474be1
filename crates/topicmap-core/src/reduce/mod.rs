//! Reduction stage: joint projection of all embeddings to a few dimensions.

mod pca;

pub use pca::PcaReducer;

use ndarray::{Array2, ArrayView1, Axis};
use std::collections::HashSet;
use std::time::Instant;
use tracing::info;

use crate::config::{DEFAULT_N_COMPONENTS, DEFAULT_SEED};
use crate::error::{BackendResult, PipelineError, Result, Stage};

/// Contract for dimensionality reduction backends.
///
/// Reduction is global: every call receives the whole embedding set and
/// returns one coordinate row per input row, in input order. There is no
/// incremental transform.
pub trait DimensionReducer {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Project `vectors` to `n_components` dimensions. Randomized internals
    /// must be driven by `seed`.
    fn reduce(
        &self,
        vectors: &[Vec<f32>],
        n_components: usize,
        seed: u64,
    ) -> BackendResult<Vec<Vec<f32>>>;
}

/// Reduced coordinates, one row per document.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    data: Array2<f32>,
}

impl Coordinates {
    /// Build from rows that must all have `n_components` values.
    pub fn from_rows(rows: Vec<Vec<f32>>, n_components: usize) -> Result<Self> {
        let n_points = rows.len();
        let mut flat = Vec::with_capacity(n_points * n_components);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_components {
                return Err(PipelineError::degenerate(
                    Stage::Reduction,
                    format!(
                        "coordinate row {} has {} components, expected {}",
                        i,
                        row.len(),
                        n_components
                    ),
                ));
            }
            flat.extend(row);
        }
        let data = Array2::from_shape_vec((n_points, n_components), flat)
            .map_err(|e| PipelineError::degenerate(Stage::Reduction, e.to_string()))?;
        Ok(Self { data })
    }

    pub fn n_points(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_components(&self) -> usize {
        self.data.ncols()
    }

    pub fn row(&self, i: usize) -> ArrayView1<'_, f32> {
        self.data.row(i)
    }

    /// Values of one axis across all points.
    pub fn axis(&self, j: usize) -> ArrayView1<'_, f32> {
        self.data.index_axis(Axis(1), j)
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        self.data.rows().into_iter().map(|r| r.to_vec()).collect()
    }

    pub fn as_array(&self) -> &Array2<f32> {
        &self.data
    }
}

/// Runs a [`DimensionReducer`] over the full embedding collection.
pub struct ReductionStage<'a> {
    reducer: &'a dyn DimensionReducer,
    n_components: usize,
    seed: u64,
}

impl<'a> ReductionStage<'a> {
    pub fn new(reducer: &'a dyn DimensionReducer) -> Self {
        Self {
            reducer,
            n_components: DEFAULT_N_COMPONENTS,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_components(mut self, n_components: usize) -> Self {
        self.n_components = n_components;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Reduce all embeddings jointly. Either every row gets coordinates or the
    /// call fails.
    pub fn run(&self, embeddings: &[Vec<f32>]) -> Result<Coordinates> {
        if self.n_components == 0 {
            return Err(PipelineError::Config(
                "n_components must be at least 1".to_string(),
            ));
        }
        validate_embeddings(embeddings, self.n_components)?;

        let start = Instant::now();
        let rows = self
            .reducer
            .reduce(embeddings, self.n_components, self.seed)
            .map_err(|e| PipelineError::backend(Stage::Reduction, e))?;

        if rows.len() != embeddings.len() {
            return Err(PipelineError::shape(
                Stage::Reduction,
                embeddings.len(),
                rows.len(),
            ));
        }
        if rows.iter().flatten().any(|v| !v.is_finite()) {
            return Err(PipelineError::Backend {
                stage: Stage::Reduction,
                message: format!("{} produced non-finite coordinates", self.reducer.name()),
            });
        }
        let coordinates = Coordinates::from_rows(rows, self.n_components)?;

        info!(
            "{} reduced {} points to {} dimensions in {}ms",
            self.reducer.name(),
            coordinates.n_points(),
            coordinates.n_components(),
            start.elapsed().as_millis()
        );
        Ok(coordinates)
    }
}

fn validate_embeddings(embeddings: &[Vec<f32>], n_components: usize) -> Result<()> {
    let first = embeddings
        .first()
        .ok_or_else(|| PipelineError::degenerate(Stage::Reduction, "no embeddings to reduce"))?;

    let dims = first.len();
    if let Some((i, e)) = embeddings.iter().enumerate().find(|(_, e)| e.len() != dims) {
        return Err(PipelineError::degenerate(
            Stage::Reduction,
            format!(
                "embedding {} has {} dimensions, expected {}",
                i,
                e.len(),
                dims
            ),
        ));
    }

    let distinct: HashSet<Vec<u32>> = embeddings
        .iter()
        .map(|e| e.iter().map(|v| v.to_bits()).collect())
        .collect();
    if distinct.len() < n_components {
        return Err(PipelineError::degenerate(
            Stage::Reduction,
            format!(
                "{} distinct points cannot span {} components",
                distinct.len(),
                n_components
            ),
        ));
    }
    Ok(())
}
