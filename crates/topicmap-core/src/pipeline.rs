//! End-to-end orchestration: embed, reduce, cluster, label, merge.
//!
//! Stages run strictly in sequence over the whole dataset; any error aborts
//! the run. The capabilities are borrowed, so one loaded model can serve many
//! runs.

use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

use crate::cluster::{ClusterAssignment, ClusteringStage, DensityClusterer};
use crate::config::PipelineConfig;
use crate::embed::{Embedder, EmbeddingStage};
use crate::error::{PipelineError, Result, Stage};
use crate::labels::attach_labels;
use crate::reduce::{Coordinates, DimensionReducer, ReductionStage};
use crate::table::Table;
use crate::viz::{make_3d_scatter, prep_for_viz, Figure, RenderOptions};

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct TopicModel {
    /// Input table plus embedding, label and axis columns; same rows, same order
    pub table: Table,
    pub coordinates: Coordinates,
    pub clusters: ClusterAssignment,
    pub embedding_column: String,
    pub cluster_column: String,
}

impl TopicModel {
    /// Render the enriched table; see [`make_3d_scatter`].
    pub fn render(&self, options: &RenderOptions) -> Result<Figure> {
        make_3d_scatter(&self.table, &self.cluster_column, options)
    }

    /// Rows per cluster label, ordered by label, `-1` included.
    pub fn topic_sizes(&self) -> BTreeMap<i32, usize> {
        self.clusters.sizes()
    }
}

/// Embedding, reduction and clustering capabilities plus configuration.
pub struct TopicPipeline<'a> {
    embedder: &'a dyn Embedder,
    reducer: &'a dyn DimensionReducer,
    clusterer: &'a dyn DensityClusterer,
    config: PipelineConfig,
}

impl<'a> TopicPipeline<'a> {
    pub fn new(
        embedder: &'a dyn Embedder,
        reducer: &'a dyn DimensionReducer,
        clusterer: &'a dyn DensityClusterer,
    ) -> Self {
        Self {
            embedder,
            reducer,
            clusterer,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Embed `table[text_column]`, reduce, cluster, and return the enriched
    /// table with everything needed to plot it. A table without rows is
    /// rejected before any capability runs.
    pub fn run(&self, table: Table, text_column: &str) -> Result<TopicModel> {
        self.config.validate()?;
        let start = Instant::now();
        let n_rows = table.n_rows();
        if n_rows == 0 {
            return Err(PipelineError::degenerate(Stage::Embedding, "empty dataset"));
        }
        info!("Topic pipeline starting on {} rows of '{}'", n_rows, text_column);

        let embedding_column = self.config.embedding_column_name(text_column);
        let cluster_column = self.config.cluster_column_name(text_column);

        let table = EmbeddingStage::new(self.embedder)
            .with_batch_size(self.config.embedding_batch_size)
            .run(table, text_column, &embedding_column)?;

        let coordinates = ReductionStage::new(self.reducer)
            .with_components(self.config.n_components)
            .with_seed(self.config.seed)
            .run(table.vectors(&embedding_column)?)?;

        let clusters = ClusteringStage::new(self.clusterer)
            .with_policy(self.config.cluster_policy.clone())
            .run(&coordinates, self.config.min_cluster_size)?;

        let table = attach_labels(table, &cluster_column, &clusters.labels)?;
        let table = prep_for_viz(table, &coordinates)?;

        info!(
            "Topic pipeline finished: {} rows, {} clusters, {} noise in {}ms",
            table.n_rows(),
            clusters.n_clusters,
            clusters.n_noise(),
            start.elapsed().as_millis()
        );

        Ok(TopicModel {
            table,
            coordinates,
            clusters,
            embedding_column,
            cluster_column,
        })
    }
}
