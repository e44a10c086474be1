//! End-to-end pipeline tests with deterministic capabilities

mod common;

use common::{corpus, BandClusterer, TopicEmbedder, TruncatingReducer};
use pretty_assertions::assert_eq;
use topicmap_core::{
    merge_coordinates, Column, HdbscanClusterer, PcaReducer, PipelineConfig, PipelineError,
    RenderOptions, Stage, Table, TopicPipeline,
};

#[test]
fn test_enriched_table_keeps_rows_and_order() {
    let input = corpus(8, 10);
    let clusterer = BandClusterer::new();
    let model = TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .run(input.clone(), "body")
        .unwrap();

    assert_eq!(model.table.n_rows(), 80);
    assert_eq!(model.table.text("title").unwrap(), input.text("title").unwrap());
    assert_eq!(model.table.text("body").unwrap(), input.text("body").unwrap());

    let names: Vec<&str> = model.table.column_names().collect();
    assert_eq!(
        names,
        vec!["title", "body", "body_emb", "body_cluster", "x", "y", "z"]
    );
}

#[test]
fn test_labels_follow_their_rows() {
    let clusterer = BandClusterer::new();
    let model = TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .run(corpus(8, 10), "body")
        .unwrap();

    // Row i is topic i % 8, and the band clusterer labels by topic.
    let labels = model.table.text("body_cluster").unwrap();
    for (i, label) in labels.iter().enumerate() {
        assert_eq!(label.as_deref(), Some((i % 8).to_string().as_str()));
    }
    assert_eq!(model.clusters.n_clusters, 8);
    assert!(model.clusters.advisory.is_none());
}

#[test]
fn test_default_min_cluster_size_is_applied() {
    let clusterer = BandClusterer::new();
    TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .run(corpus(8, 25), "body")
        .unwrap();
    // 0.05 * 200
    assert_eq!(*clusterer.sizes.borrow(), vec![10]);
}

#[test]
fn test_config_overrides_min_cluster_size_and_components() {
    let clusterer = BandClusterer::new();
    let config = PipelineConfig {
        n_components: 2,
        min_cluster_size: Some(7),
        ..PipelineConfig::default()
    };
    let model = TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .with_config(config)
        .run(corpus(8, 10), "body")
        .unwrap();

    assert_eq!(*clusterer.sizes.borrow(), vec![7]);
    assert_eq!(model.coordinates.n_components(), 2);
    assert!(model.table.contains("y"));
    assert!(!model.table.contains("z"));
}

#[test]
fn test_render_hides_noise_but_keeps_table() {
    let clusterer = BandClusterer {
        noise_above: 0.35,
        ..BandClusterer::new()
    };
    let model = TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .run(corpus(8, 10), "body")
        .unwrap();

    // doc % 5 == 4 lands above the noise threshold: docs 4 and 9 of each topic.
    assert_eq!(model.clusters.n_noise(), 16);
    assert_eq!(model.topic_sizes().get(&-1), Some(&16));

    let hidden = model.render(&RenderOptions::default()).unwrap();
    assert_eq!(hidden.n_points(), 64);
    assert!(!hidden.labels().contains(&"-1"));

    let shown = model
        .render(&RenderOptions {
            unclustered: true,
            ..RenderOptions::default()
        })
        .unwrap();
    assert_eq!(shown.n_points(), 80);
    assert_eq!(model.table.n_rows(), 80);
}

#[test]
fn test_merge_is_idempotent_after_pipeline() {
    let clusterer = BandClusterer::new();
    let model = TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .run(corpus(8, 10), "body")
        .unwrap();
    let again = merge_coordinates(model.table.clone(), &model.coordinates).unwrap();
    assert_eq!(again, model.table);
}

#[test]
fn test_null_text_aborts_run() {
    let table = Table::from_columns([(
        "body",
        Column::Text(vec![
            Some("topic 0 doc 0".to_string()),
            None,
            Some("topic 1 doc 0".to_string()),
        ]),
    )])
    .unwrap();
    let clusterer = BandClusterer::new();
    let err = TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .run(table, "body")
        .unwrap_err();
    assert!(matches!(err, PipelineError::UnembeddableText { row: 1 }));
    assert!(clusterer.sizes.borrow().is_empty());
}

#[test]
fn test_empty_table_is_degenerate() {
    let table = Table::from_columns([("body", Column::Text(Vec::new()))]).unwrap();
    let clusterer = BandClusterer::new();
    let err = TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .run(table, "body")
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::DegenerateInput {
            stage: Stage::Embedding,
            ..
        }
    ));
    assert!(clusterer.sizes.borrow().is_empty());
}

#[test]
fn test_empty_records_are_degenerate_not_missing_column() {
    let table = Table::from_records(&[]).unwrap();
    let clusterer = BandClusterer::new();
    let err = TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .run(table, "body")
        .unwrap_err();
    assert!(matches!(
        err,
        PipelineError::DegenerateInput {
            stage: Stage::Embedding,
            ..
        }
    ));
}

#[test]
fn test_missing_text_column() {
    let clusterer = BandClusterer::new();
    let err = TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .run(corpus(2, 3), "abstract")
        .unwrap_err();
    assert!(matches!(err, PipelineError::MissingColumn(name) if name == "abstract"));
}

#[test]
fn test_invalid_config_is_rejected_before_work() {
    let clusterer = BandClusterer::new();
    let config = PipelineConfig {
        n_components: 0,
        ..PipelineConfig::default()
    };
    let err = TopicPipeline::new(&TopicEmbedder, &TruncatingReducer, &clusterer)
        .with_config(config)
        .run(corpus(2, 3), "body")
        .unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn test_native_backends_end_to_end() {
    let reducer = PcaReducer::new();
    let clusterer = HdbscanClusterer::new();
    let pipeline = TopicPipeline::new(&TopicEmbedder, &reducer, &clusterer);

    let first = pipeline.run(corpus(8, 12), "body").unwrap();
    let second = pipeline.run(corpus(8, 12), "body").unwrap();

    assert_eq!(first.table.n_rows(), 96);
    assert_eq!(first.clusters.labels.len(), 96);
    // Fixed seed: identical runs give identical coordinates and labels.
    assert_eq!(first.coordinates, second.coordinates);
    assert_eq!(first.clusters.labels, second.clusters.labels);
}
