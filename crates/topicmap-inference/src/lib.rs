//! topicmap inference
//!
//! Local sentence embeddings from ONNX sentence-transformer models
//! (`all-MiniLM-L6-v2` and relatives). [`SentenceEmbedder`] implements
//! [`topicmap_core::Embedder`] and plugs straight into the topic pipeline.

pub mod engine;

pub use engine::{EngineConfig, EngineError, ModelInfo, Result, SentenceEmbedder};
