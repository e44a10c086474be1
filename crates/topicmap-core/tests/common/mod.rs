//! Deterministic capability fakes shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use topicmap_core::{
    BackendError, BackendResult, Column, Coordinates, DensityClusterer, DimensionReducer,
    Embedder, Table,
};

/// Embeds "topic <k> doc <i>" near a per-topic center so topics form tight,
/// well-separated groups.
pub struct TopicEmbedder;

impl Embedder for TopicEmbedder {
    fn embed(&self, text: &str) -> BackendResult<Vec<f32>> {
        let words: Vec<&str> = text.split_whitespace().collect();
        let number = |key: &str| -> BackendResult<f32> {
            words
                .iter()
                .position(|w| *w == key)
                .and_then(|p| words.get(p + 1))
                .and_then(|w| w.parse::<f32>().ok())
                .ok_or_else(|| BackendError(format!("no '{}' in '{}'", key, text)))
        };
        let topic = number("topic")?;
        let doc = number("doc")?;
        Ok(vec![
            topic * 100.0 + (doc % 3.0) * 0.1,
            (doc % 5.0) * 0.1,
            topic * -50.0 + (doc % 7.0) * 0.1,
            1.0,
        ])
    }

    fn dimensions(&self) -> Option<usize> {
        Some(4)
    }
}

/// Keeps the first `n_components` values of each vector.
pub struct TruncatingReducer;

impl DimensionReducer for TruncatingReducer {
    fn name(&self) -> &str {
        "truncate"
    }

    fn reduce(
        &self,
        vectors: &[Vec<f32>],
        n_components: usize,
        _seed: u64,
    ) -> BackendResult<Vec<Vec<f32>>> {
        vectors
            .iter()
            .map(|v| {
                v.get(..n_components)
                    .map(<[f32]>::to_vec)
                    .ok_or_else(|| BackendError::from("vector too short"))
            })
            .collect()
    }
}

/// Labels every point with the integer part of its first coordinate / 100,
/// and marks points whose second coordinate is above `noise_above` as noise.
/// Records every minimum cluster size it is called with.
pub struct BandClusterer {
    pub noise_above: f32,
    pub sizes: RefCell<Vec<usize>>,
}

impl BandClusterer {
    pub fn new() -> Self {
        Self {
            noise_above: f32::INFINITY,
            sizes: RefCell::new(Vec::new()),
        }
    }
}

impl DensityClusterer for BandClusterer {
    fn fit(&self, points: &[Vec<f32>], min_cluster_size: usize) -> BackendResult<Vec<i32>> {
        self.sizes.borrow_mut().push(min_cluster_size);
        Ok(points
            .iter()
            .map(|p| {
                if p[1] > self.noise_above {
                    -1
                } else {
                    (p[0] / 100.0).round() as i32
                }
            })
            .collect())
    }
}

/// `n_topics * per_topic` documents, interleaved so that consecutive rows
/// belong to different topics.
pub fn corpus(n_topics: usize, per_topic: usize) -> Table {
    let n = n_topics * per_topic;
    let bodies: Vec<String> = (0..n)
        .map(|i| format!("topic {} doc {}", i % n_topics, i / n_topics))
        .collect();
    let titles: Vec<String> = (0..n).map(|i| format!("Document {}", i)).collect();
    Table::from_columns([("title", Column::from(titles)), ("body", Column::from(bodies))])
        .expect("corpus columns have equal length")
}

/// `n_blobs` tight groups of `per_blob` points each, far apart, in 3D.
pub fn blobs(n_blobs: usize, per_blob: usize) -> Coordinates {
    let rows = (0..n_blobs)
        .flat_map(|b| {
            (0..per_blob).map(move |i| {
                vec![
                    b as f32 * 100.0 + (i % 3) as f32 * 0.1,
                    ((i / 3) % 3) as f32 * 0.1,
                    (i / 9) as f32 * 0.1,
                ]
            })
        })
        .collect();
    Coordinates::from_rows(rows, 3).expect("blob rows have three components")
}
