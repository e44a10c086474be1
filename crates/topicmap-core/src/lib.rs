//! topicmap core
//!
//! Turns a table of text documents into a visualizable topic model: each row
//! is embedded, the embeddings are jointly reduced to a few coordinates, the
//! coordinates are density-clustered into topics, and labels plus coordinates
//! are merged back onto the table by row position.
//!
//! The embedder, reducer and clusterer are traits so backends can be swapped
//! and faked in tests. [`PcaReducer`] and [`HdbscanClusterer`] are the native
//! backends shipped here.
//!
//! # Example
//!
//! ```rust,ignore
//! use topicmap_core::{HdbscanClusterer, PcaReducer, RenderOptions, TopicPipeline};
//!
//! let model = TopicPipeline::new(&embedder, &PcaReducer::new(), &HdbscanClusterer::new())
//!     .run(table, "body")?;
//! if let Some(advisory) = &model.clusters.advisory {
//!     eprintln!("{}", advisory);
//! }
//! model.render(&RenderOptions::default())?.export("topics.html")?;
//! ```

pub mod cluster;
pub mod config;
pub mod embed;
pub mod error;
pub mod labels;
pub mod merge;
pub mod pipeline;
pub mod reduce;
pub mod table;
pub mod viz;

// Re-export main types at crate root
pub use cluster::{
    ClusterAssignment, ClusterCountAdvisory, ClusteringStage, DensityClusterer, HdbscanClusterer,
    NOISE_LABEL,
};
pub use config::{ClusterPolicy, PipelineConfig};
pub use embed::{Embedder, EmbeddingStage};
pub use error::{BackendError, BackendResult, PipelineError, Result, Stage};
pub use labels::attach_labels;
pub use merge::{axis_names, coordinate_table, merge_coordinates};
pub use pipeline::{TopicModel, TopicPipeline};
pub use reduce::{Coordinates, DimensionReducer, PcaReducer, ReductionStage};
pub use table::{Column, RowAligned, Table};
pub use viz::{make_3d_scatter, prep_for_viz, visible_rows, Figure, RenderOptions};
