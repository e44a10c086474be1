//! Clustering stage tests against the HDBSCAN backend

mod common;

use common::blobs;
use topicmap_core::{ClusterPolicy, ClusteringStage, HdbscanClusterer, NOISE_LABEL};

#[test]
fn test_three_blobs_trigger_advisory() {
    // 100 points in 3 groups
    let coords = {
        let mut rows = blobs(3, 33).to_rows();
        rows.push(vec![100.05, 0.05, 0.05]);
        topicmap_core::Coordinates::from_rows(rows, 3).unwrap()
    };
    assert_eq!(coords.n_points(), 100);

    let clusterer = HdbscanClusterer::new();
    let result = ClusteringStage::new(&clusterer).run(&coords, None).unwrap();

    assert_eq!(result.labels.len(), 100);
    assert!(result.n_distinct_labels <= 5);
    let advisory = result.advisory.expect("3 clusters are below the recommended range");
    assert_eq!(advisory.observed, result.n_distinct_labels);
}

#[test]
fn test_ten_blobs_are_within_range() {
    let coords = blobs(10, 10);
    let clusterer = HdbscanClusterer::new();
    let result = ClusteringStage::new(&clusterer).run(&coords, None).unwrap();

    assert_eq!(result.min_cluster_size, 5);
    assert_eq!(result.n_clusters, 10, "labels: {:?}", result.labels);
    assert!(result.advisory.is_none());
}

#[test]
fn test_unset_size_matches_explicit_five_percent() {
    let coords = blobs(10, 10);
    let clusterer = HdbscanClusterer::new();
    let stage = ClusteringStage::new(&clusterer);

    let implicit = stage.run(&coords, None).unwrap();
    let explicit = stage.run(&coords, Some(5)).unwrap();
    assert_eq!(implicit.labels, explicit.labels);
}

#[test]
fn test_blob_members_share_labels() {
    let coords = blobs(10, 10);
    let clusterer = HdbscanClusterer::new();
    let result = ClusteringStage::new(&clusterer).run(&coords, None).unwrap();

    for blob in result.labels.chunks(10) {
        let clustered: Vec<i32> = blob.iter().copied().filter(|&l| l != NOISE_LABEL).collect();
        assert!(
            clustered.windows(2).all(|w| w[0] == w[1]),
            "blob split across labels: {:?}",
            blob
        );
    }
}

#[test]
fn test_policy_override_silences_advisory() {
    let coords = blobs(3, 20);
    let clusterer = HdbscanClusterer::new();
    let policy = ClusterPolicy {
        recommended_min: 1,
        recommended_max: 10,
        ..ClusterPolicy::default()
    };
    let result = ClusteringStage::new(&clusterer)
        .with_policy(policy)
        .run(&coords, None)
        .unwrap();
    assert!(result.advisory.is_none());
}
