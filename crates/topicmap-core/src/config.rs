//! Pipeline configuration.
//!
//! Business-policy constants (the cluster-size heuristic and the recommended
//! cluster-count range) live in [`ClusterPolicy`] so callers and tests can
//! override them.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Default number of reduced dimensions.
pub const DEFAULT_N_COMPONENTS: usize = 3;
/// Default seed for randomized reducer internals.
pub const DEFAULT_SEED: u64 = 42;

/// Heuristic and advisory thresholds for the clustering stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterPolicy {
    /// Fraction of the point count used as the minimum cluster size when the
    /// caller does not supply one
    pub min_cluster_fraction: f64,
    /// Smallest minimum cluster size the heuristic will produce
    pub min_cluster_floor: usize,
    /// Exclusive lower bound of the recommended distinct-label count
    pub recommended_min: usize,
    /// Exclusive upper bound of the recommended distinct-label count
    pub recommended_max: usize,
}

impl Default for ClusterPolicy {
    fn default() -> Self {
        Self {
            min_cluster_fraction: 0.05,
            min_cluster_floor: 2,
            recommended_min: 5,
            recommended_max: 40,
        }
    }
}

impl ClusterPolicy {
    /// Minimum cluster size for `n_points` when none is given.
    ///
    /// A fractional threshold is rounded up: a density clusterer keeps a
    /// cluster whose size is at least the threshold, so 2.5 behaves as 3. The
    /// product is snapped to 1e-6 first so float noise (0.05 * 60) does not
    /// round 3 up to 4.
    pub fn default_min_cluster_size(&self, n_points: usize) -> usize {
        let raw = self.min_cluster_fraction * n_points as f64;
        let snapped = (raw * 1e6).round() / 1e6;
        (snapped.ceil() as usize).max(self.min_cluster_floor)
    }

    /// Whether `n_labels` lies strictly inside the recommended range.
    pub fn is_recommended(&self, n_labels: usize) -> bool {
        self.recommended_min < n_labels && n_labels < self.recommended_max
    }

    fn validate(&self) -> Result<()> {
        if !(self.min_cluster_fraction > 0.0 && self.min_cluster_fraction <= 1.0) {
            return Err(PipelineError::Config(format!(
                "min_cluster_fraction must be in (0, 1], got {}",
                self.min_cluster_fraction
            )));
        }
        if self.min_cluster_floor < 2 {
            return Err(PipelineError::Config(format!(
                "min_cluster_floor must be at least 2, got {}",
                self.min_cluster_floor
            )));
        }
        if self.recommended_max <= self.recommended_min.saturating_add(1) {
            return Err(PipelineError::Config(format!(
                "recommended range ({}, {}) is empty",
                self.recommended_min, self.recommended_max
            )));
        }
        Ok(())
    }
}

/// Configuration for a full pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target dimensionality of the reduced coordinates
    pub n_components: usize,
    /// Seed passed to the reducer
    pub seed: u64,
    /// Explicit minimum cluster size; `None` applies the policy heuristic
    pub min_cluster_size: Option<usize>,
    /// Number of texts handed to the embedder per call
    pub embedding_batch_size: usize,
    /// Suffix appended to the text column name for the embedding column
    pub embedding_suffix: String,
    /// Suffix appended to the text column name for the cluster-label column
    pub cluster_suffix: String,
    pub cluster_policy: ClusterPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            n_components: DEFAULT_N_COMPONENTS,
            seed: DEFAULT_SEED,
            min_cluster_size: None,
            embedding_batch_size: 32,
            embedding_suffix: "_emb".to_string(),
            cluster_suffix: "_cluster".to_string(),
            cluster_policy: ClusterPolicy::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_components == 0 {
            return Err(PipelineError::Config(
                "n_components must be at least 1".to_string(),
            ));
        }
        if self.embedding_batch_size == 0 {
            return Err(PipelineError::Config(
                "embedding_batch_size must be at least 1".to_string(),
            ));
        }
        if let Some(size) = self.min_cluster_size {
            if size < 2 {
                return Err(PipelineError::Config(format!(
                    "min_cluster_size must be at least 2, got {}",
                    size
                )));
            }
        }
        if self.embedding_suffix.is_empty()
            || self.cluster_suffix.is_empty()
            || self.embedding_suffix == self.cluster_suffix
        {
            return Err(PipelineError::Config(
                "embedding and cluster suffixes must be non-empty and distinct".to_string(),
            ));
        }
        self.cluster_policy.validate()
    }

    /// Name of the embedding column derived from `text_column`.
    pub fn embedding_column_name(&self, text_column: &str) -> String {
        format!("{}{}", text_column, self.embedding_suffix)
    }

    /// Name of the cluster-label column derived from `text_column`.
    pub fn cluster_column_name(&self, text_column: &str) -> String {
        format!("{}{}", text_column, self.cluster_suffix)
    }
}
