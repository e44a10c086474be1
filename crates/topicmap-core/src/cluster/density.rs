use hdbscan::{Center, Hdbscan, HdbscanHyperParams};

use super::DensityClusterer;
use crate::error::{BackendError, BackendResult};

/// HDBSCAN over reduced coordinates.
///
/// `min_samples` defaults to the minimum cluster size, matching the usual
/// HDBSCAN convention.
#[derive(Debug, Clone, Default)]
pub struct HdbscanClusterer {
    pub min_samples: Option<usize>,
    pub allow_single_cluster: bool,
}

impl HdbscanClusterer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = Some(min_samples);
        self
    }

    fn params(&self, min_cluster_size: usize) -> HdbscanHyperParams {
        HdbscanHyperParams::builder()
            .min_cluster_size(min_cluster_size)
            .min_samples(self.min_samples.unwrap_or(min_cluster_size))
            .allow_single_cluster(self.allow_single_cluster)
            .build()
    }

    /// Mean position of each cluster, indexed by label. Noise has no centroid.
    pub fn centroids(&self, points: &[Vec<f32>], labels: &[i32]) -> BackendResult<Vec<Vec<f32>>> {
        if !labels.iter().any(|&l| l >= 0) {
            return Ok(Vec::new());
        }
        let data = to_f64(points, labels.len())?;
        // Centroids depend only on data and labels; the size parameter is unused here.
        let clusterer = Hdbscan::new(&data, self.params(2));
        let centers = clusterer
            .calc_centers(Center::Centroid, labels)
            .map_err(|e| BackendError(format!("centroid computation failed: {:?}", e)))?;
        Ok(centers
            .into_iter()
            .map(|c| c.into_iter().map(|v| v as f32).collect())
            .collect())
    }
}

impl DensityClusterer for HdbscanClusterer {
    fn fit(&self, points: &[Vec<f32>], min_cluster_size: usize) -> BackendResult<Vec<i32>> {
        if points.len() < 2 {
            return Err(BackendError(format!(
                "need at least 2 points, got {}",
                points.len()
            )));
        }
        if min_cluster_size < 2 {
            return Err(BackendError(format!(
                "min_cluster_size must be at least 2, got {}",
                min_cluster_size
            )));
        }

        if min_cluster_size > points.len() {
            return Err(BackendError(format!(
                "min_cluster_size {} exceeds the {} points to cluster",
                min_cluster_size,
                points.len()
            )));
        }
        let min_samples = self.min_samples.unwrap_or(min_cluster_size);
        if min_samples == 0 || min_samples > points.len() {
            return Err(BackendError(format!(
                "min_samples {} must be between 1 and the {} points to cluster",
                min_samples,
                points.len()
            )));
        }

        // hdbscan expects f64
        let data = to_f64(points, points.len())?;
        let clusterer = Hdbscan::new(&data, self.params(min_cluster_size));
        clusterer
            .cluster()
            .map_err(|e| BackendError(format!("HDBSCAN failed: {:?}", e)))
    }
}

fn to_f64(points: &[Vec<f32>], expected: usize) -> BackendResult<Vec<Vec<f64>>> {
    if points.len() != expected {
        return Err(BackendError(format!(
            "{} points but {} labels",
            points.len(),
            expected
        )));
    }
    Ok(points
        .iter()
        .map(|p| p.iter().map(|&v| v as f64).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f32>> {
        // Two well-separated clusters of 10 points each in 2D
        let mut points = Vec::new();
        for i in 0..10 {
            points.push(vec![0.0 + (i as f32) * 0.01, 0.0 + (i as f32) * 0.01]);
        }
        for i in 0..10 {
            points.push(vec![10.0 + (i as f32) * 0.01, 10.0 + (i as f32) * 0.01]);
        }
        points
    }

    #[test]
    fn finds_separated_blobs() {
        let labels = HdbscanClusterer::new().with_min_samples(3).fit(&blobs(), 3).unwrap();
        assert_eq!(labels.len(), 20);
        let clusters: std::collections::BTreeSet<i32> =
            labels.iter().copied().filter(|&l| l >= 0).collect();
        assert_eq!(clusters.len(), 2, "expected 2 clusters, got {:?}", labels);
        // Points of the same blob share a label.
        assert!(labels[..10].iter().all(|&l| l == labels[0]));
        assert!(labels[10..].iter().all(|&l| l == labels[10]));
    }

    #[test]
    fn centroids_have_point_dimensionality() {
        let clusterer = HdbscanClusterer::new().with_min_samples(3);
        let points = blobs();
        let labels = clusterer.fit(&points, 3).unwrap();
        let centroids = clusterer.centroids(&points, &labels).unwrap();
        assert_eq!(centroids.len(), 2);
        assert!(centroids.iter().all(|c| c.len() == 2));
    }

    #[test]
    fn too_few_points() {
        assert!(HdbscanClusterer::new().fit(&[vec![1.0, 2.0]], 2).is_err());
    }

    #[test]
    fn size_above_point_count_is_rejected() {
        let err = HdbscanClusterer::new().fit(&blobs(), 50).unwrap_err();
        assert!(err.0.contains("50"), "{}", err);
        assert!(err.0.contains("20"), "{}", err);

        let err = HdbscanClusterer::new().with_min_samples(21).fit(&blobs(), 3).unwrap_err();
        assert!(err.0.contains("min_samples 21"), "{}", err);
    }

    #[test]
    fn size_below_two_is_rejected() {
        assert!(HdbscanClusterer::new().fit(&blobs(), 1).is_err());
    }
}
