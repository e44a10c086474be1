//! Sentence-transformer embedder backed by ONNX Runtime.
//!
//! The engine is created empty and loaded explicitly; it can be unloaded and
//! reloaded with another model. Several engines can coexist.

use ndarray::{Array2, ArrayView1, ArrayView2};
use ort::session::{builder::GraphOptimizationLevel, Session};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use topicmap_core::{BackendError, BackendResult, Embedder};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("model not loaded")]
    ModelNotLoaded,

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("failed to load tokenizer: {0}")]
    TokenizerLoad(String),

    #[error("tokenization failed: {0}")]
    Tokenization(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Configuration for the embedding engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the ONNX model file
    pub model_path: String,
    /// Path to the tokenizer.json file
    pub tokenizer_path: String,
    /// Display name of the model
    pub model_name: String,
    /// Tokens per text; longer texts are truncated
    pub max_length: usize,
    /// L2-normalise output embeddings
    pub normalize: bool,
    /// Intra-op threads (0 = runtime default)
    pub num_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            tokenizer_path: String::new(),
            model_name: "all-MiniLM-L6-v2".to_string(),
            max_length: 256,
            normalize: true,
            num_threads: 0,
        }
    }
}

/// Information about the loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    /// Known after the first embedding
    pub dimensions: Option<usize>,
    pub max_sequence_length: usize,
}

struct LoadedModel {
    session: Session,
    tokenizer: Tokenizer,
    config: EngineConfig,
    needs_token_types: bool,
    dimensions: RwLock<Option<usize>>,
}

/// ONNX sentence-transformer embedder.
pub struct SentenceEmbedder {
    model: RwLock<Option<LoadedModel>>,
}

impl SentenceEmbedder {
    /// Create an engine with no model loaded.
    pub fn new() -> Self {
        Self {
            model: RwLock::new(None),
        }
    }

    /// Create an engine and load `config` into it.
    pub fn from_config(config: EngineConfig) -> Result<Self> {
        let engine = Self::new();
        engine.load(config)?;
        Ok(engine)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.read().is_some()
    }

    pub fn model_info(&self) -> Option<ModelInfo> {
        self.model.read().as_ref().map(|m| ModelInfo {
            name: m.config.model_name.clone(),
            dimensions: *m.dimensions.read(),
            max_sequence_length: m.config.max_length,
        })
    }

    /// Load a model, replacing any model already loaded.
    pub fn load(&self, config: EngineConfig) -> Result<()> {
        info!(
            "Loading model {} from {} with tokenizer {}",
            config.model_name, config.model_path, config.tokenizer_path
        );

        if config.max_length == 0 {
            return Err(EngineError::InvalidInput(
                "max_length must be at least 1".to_string(),
            ));
        }
        if !Path::new(&config.model_path).exists() {
            return Err(EngineError::ModelLoad(format!(
                "model file not found: {}",
                config.model_path
            )));
        }
        if !Path::new(&config.tokenizer_path).exists() {
            return Err(EngineError::TokenizerLoad(format!(
                "tokenizer file not found: {}",
                config.tokenizer_path
            )));
        }

        let tokenizer = Tokenizer::from_file(&config.tokenizer_path)
            .map_err(|e| EngineError::TokenizerLoad(e.to_string()))?;

        let mut session_builder = Session::builder()
            .map_err(|e| EngineError::ModelLoad(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| EngineError::ModelLoad(e.to_string()))?;

        if config.num_threads > 0 {
            session_builder = session_builder
                .with_intra_threads(config.num_threads)
                .map_err(|e| EngineError::ModelLoad(e.to_string()))?;
        }

        let session = session_builder
            .commit_from_file(&config.model_path)
            .map_err(|e| EngineError::ModelLoad(e.to_string()))?;

        let needs_token_types = session.inputs.iter().any(|i| i.name == "token_type_ids");
        info!(
            "Model loaded ({} inputs, token_type_ids: {})",
            session.inputs.len(),
            needs_token_types
        );

        *self.model.write() = Some(LoadedModel {
            session,
            tokenizer,
            config,
            needs_token_types,
            dimensions: RwLock::new(None),
        });

        Ok(())
    }

    pub fn unload(&self) {
        info!("Unloading model");
        *self.model.write() = None;
    }

    /// Embed a batch of texts, one vector per text in input order.
    pub fn embed_texts(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let model = self.model.read();
        let model = model.as_ref().ok_or(EngineError::ModelNotLoaded)?;

        if texts.is_empty() {
            return Err(EngineError::InvalidInput("empty input".to_string()));
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let encodings = model
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EngineError::Tokenization(e.to_string()))?;

        let sequences: Vec<(&[u32], &[u32])> = encodings
            .iter()
            .map(|e| (e.get_ids(), e.get_attention_mask()))
            .collect();
        let (input_ids, attention_mask) = pad_batch(&sequences, model.config.max_length)?;
        let token_type_ids = Array2::<i64>::zeros(input_ids.raw_dim());

        let inputs = if model.needs_token_types {
            ort::inputs! {
                "input_ids" => input_ids,
                "attention_mask" => attention_mask.clone(),
                "token_type_ids" => token_type_ids
            }
        } else {
            ort::inputs! {
                "input_ids" => input_ids,
                "attention_mask" => attention_mask.clone()
            }
        }
        .map_err(|e| EngineError::Inference(e.to_string()))?;

        let outputs = model
            .session
            .run(inputs)
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        let output = outputs
            .get("sentence_embedding")
            .or_else(|| outputs.get("last_hidden_state"))
            .ok_or_else(|| EngineError::Inference("no embedding output found".to_string()))?;

        let output: ndarray::ArrayViewD<f32> = output
            .try_extract_tensor()
            .map_err(|e| EngineError::Inference(e.to_string()))?;

        let batch_size = texts.len();
        let mut result = Vec::with_capacity(batch_size);
        match output.ndim() {
            // [batch, hidden] - already pooled
            2 => {
                for i in 0..batch_size {
                    result.push(output.slice(ndarray::s![i, ..]).to_vec());
                }
            }
            // [batch, seq, hidden] - mean pool over the mask
            3 => {
                for i in 0..batch_size {
                    let tokens: ArrayView2<f32> = output
                        .slice(ndarray::s![i, .., ..])
                        .into_dimensionality()
                        .map_err(|e| EngineError::Inference(e.to_string()))?;
                    result.push(mean_pool(tokens, attention_mask.row(i)));
                }
            }
            _ => {
                return Err(EngineError::Inference(format!(
                    "unexpected output shape: {:?}",
                    output.shape()
                )))
            }
        }

        if model.config.normalize {
            result = result.iter().map(|v| normalize_vector(v)).collect();
        }
        if let Some(first) = result.first() {
            model.dimensions.write().get_or_insert(first.len());
        }

        Ok(result)
    }

    /// Embed a single text.
    pub fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_texts(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Inference("no embedding generated".to_string()))
    }
}

impl Default for SentenceEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

impl Embedder for SentenceEmbedder {
    fn embed(&self, text: &str) -> BackendResult<Vec<f32>> {
        self.embed_one(text).map_err(|e| BackendError(e.to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> BackendResult<Vec<Vec<f32>>> {
        self.embed_texts(texts).map_err(|e| BackendError(e.to_string()))
    }

    fn dimensions(&self) -> Option<usize> {
        self.model_info().and_then(|info| info.dimensions)
    }
}

/// Pad (and truncate) token id / mask sequences to the longest sequence in
/// the batch, capped at `max_length`.
fn pad_batch(sequences: &[(&[u32], &[u32])], max_length: usize) -> Result<(Array2<i64>, Array2<i64>)> {
    let width = sequences
        .iter()
        .map(|(ids, _)| ids.len())
        .max()
        .unwrap_or(0)
        .min(max_length);
    if width == 0 {
        return Err(EngineError::InvalidInput(
            "tokenizer produced no tokens".to_string(),
        ));
    }

    let mut input_ids = Array2::<i64>::zeros((sequences.len(), width));
    let mut attention_mask = Array2::<i64>::zeros((sequences.len(), width));
    for (row, (ids, mask)) in sequences.iter().enumerate() {
        for (col, (&id, &m)) in ids.iter().zip(mask.iter()).take(width).enumerate() {
            input_ids[[row, col]] = id as i64;
            attention_mask[[row, col]] = m as i64;
        }
    }
    Ok((input_ids, attention_mask))
}

/// Mean pooling over token embeddings with attention mask.
fn mean_pool(tokens: ArrayView2<f32>, attention_mask: ArrayView1<i64>) -> Vec<f32> {
    let hidden_size = tokens.ncols();
    let mut sum = vec![0.0f32; hidden_size];
    let mut count = 0.0f32;

    for (i, &mask) in attention_mask.iter().enumerate().take(tokens.nrows()) {
        if mask == 1 {
            for (j, val) in tokens.row(i).iter().enumerate() {
                sum[j] += val;
            }
            count += 1.0;
        }
    }

    if count > 0.0 {
        for val in &mut sum {
            *val /= count;
        }
    }

    sum
}

/// L2 normalize a vector.
fn normalize_vector(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
