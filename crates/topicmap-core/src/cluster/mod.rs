//! Clustering stage: density clustering of reduced coordinates with an
//! adaptive minimum cluster size and an advisory cluster-count check.

mod density;

pub use density::HdbscanClusterer;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::ClusterPolicy;
use crate::error::{BackendResult, PipelineError, Result, Stage};
use crate::reduce::Coordinates;

/// Label assigned to points that belong to no cluster.
pub const NOISE_LABEL: i32 = -1;

/// Partitions low-dimensional points into clusters.
pub trait DensityClusterer {
    /// Return one label per point, `-1` for noise.
    fn fit(&self, points: &[Vec<f32>], min_cluster_size: usize) -> BackendResult<Vec<i32>>;
}

/// Non-fatal notice that the number of distinct labels is outside the
/// recommended range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterCountAdvisory {
    pub observed: usize,
    pub recommended_min: usize,
    pub recommended_max: usize,
}

impl fmt::Display for ClusterCountAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} is outside the recommended range of {}-{}; consider tuning your min_cluster_size.",
            self.observed, self.recommended_min, self.recommended_max
        )
    }
}

/// Output of the clustering stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterAssignment {
    /// One label per point, in point order
    pub labels: Vec<i32>,
    /// Minimum cluster size the clusterer was run with
    pub min_cluster_size: usize,
    /// Distinct label values, including `-1` when any point is noise
    pub n_distinct_labels: usize,
    /// Clusters proper (labels >= 0)
    pub n_clusters: usize,
    pub advisory: Option<ClusterCountAdvisory>,
}

impl ClusterAssignment {
    pub fn n_noise(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE_LABEL).count()
    }

    /// Number of points per label, ordered by label.
    pub fn sizes(&self) -> BTreeMap<i32, usize> {
        let mut sizes = BTreeMap::new();
        for &label in &self.labels {
            *sizes.entry(label).or_insert(0) += 1;
        }
        sizes
    }
}

/// Selects a minimum cluster size, runs a [`DensityClusterer`] and checks the
/// resulting label count against a [`ClusterPolicy`].
pub struct ClusteringStage<'a> {
    clusterer: &'a dyn DensityClusterer,
    policy: ClusterPolicy,
}

impl<'a> ClusteringStage<'a> {
    pub fn new(clusterer: &'a dyn DensityClusterer) -> Self {
        Self {
            clusterer,
            policy: ClusterPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ClusterPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cluster `coordinates`. When `min_cluster_size` is `None` the policy
    /// heuristic picks it from the point count.
    ///
    /// The advisory counts every distinct label value, so `-1` counts as one
    /// value when noise is present. It never fails the call.
    pub fn run(
        &self,
        coordinates: &Coordinates,
        min_cluster_size: Option<usize>,
    ) -> Result<ClusterAssignment> {
        let n_points = coordinates.n_points();
        if n_points == 0 {
            return Err(PipelineError::degenerate(
                Stage::Clustering,
                "no points to cluster",
            ));
        }
        let min_cluster_size =
            min_cluster_size.unwrap_or_else(|| self.policy.default_min_cluster_size(n_points));

        let start = Instant::now();
        let labels = self
            .clusterer
            .fit(&coordinates.to_rows(), min_cluster_size)
            .map_err(|e| PipelineError::backend(Stage::Clustering, e))?;
        if labels.len() != n_points {
            return Err(PipelineError::shape(Stage::Clustering, n_points, labels.len()));
        }

        let distinct: BTreeSet<i32> = labels.iter().copied().collect();
        let n_distinct_labels = distinct.len();
        let n_clusters = distinct.iter().filter(|&&l| l >= 0).count();

        info!(
            "Clustered {} points into {} clusters (min_cluster_size={}) in {}ms",
            n_points,
            n_clusters,
            min_cluster_size,
            start.elapsed().as_millis()
        );

        let advisory = if self.policy.is_recommended(n_distinct_labels) {
            None
        } else {
            let advisory = ClusterCountAdvisory {
                observed: n_distinct_labels,
                recommended_min: self.policy.recommended_min,
                recommended_max: self.policy.recommended_max,
            };
            warn!("{}", advisory);
            Some(advisory)
        };

        Ok(ClusterAssignment {
            labels,
            min_cluster_size,
            n_distinct_labels,
            n_clusters,
            advisory,
        })
    }
}
