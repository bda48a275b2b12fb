//! sentvec sentence encoder
//!
//! Turns an ordered list of sentences into fixed-width vectors using a pre-trained
//! sentence-embedding model. Loading resolves the model's `model.onnx` and
//! `tokenizer.json` (downloading them from the Hugging Face Hub on first use), then
//! encoding runs the whole list as one padded batch and pools token states into
//! sentence vectors the way sentence-transformers does.
//!
//! Two backends:
//!
//! - **ONNX mode** - the real model, through ONNX Runtime. Default.
//! - **Fast mode** - deterministic hash-based vectors for offline tests. Never used
//!   as a fallback: if the real model cannot be loaded, [`SentenceEncoder::load`] fails.
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{SemanticConfig, SentenceEncoder};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), semantic::SemanticError> {
//!     let cfg = SemanticConfig::for_model("paraphrase-MiniLM-L6-v2");
//!     let encoder = SentenceEncoder::load(&cfg).await?;
//!
//!     let vectors = encoder.encode(&["This is an example sentence.", "Another one."])?;
//!     assert_eq!(vectors.len(), 2);
//!     assert_eq!(vectors[0].len(), encoder.dimension().unwrap_or(384));
//!     Ok(())
//! }
//! ```
//!
//! The encoder keeps its ONNX session in a `RefCell`, so it is meant to be used from one
//! thread.

pub mod config;
pub mod error;

mod assets;
mod model;
mod normalize;
mod onnx;
mod pooling;
mod stub;

pub use crate::config::{
    EncoderMode, PoolingStrategy, SemanticConfig, DEFAULT_EMBEDDING_DIM,
    DEFAULT_MAX_SEQUENCE_LENGTH, DEFAULT_MODEL_NAME,
};
pub use crate::error::SemanticError;

use std::cell::Cell;

use crate::assets::resolve_model_assets;
use crate::model::LoadedModel;
use crate::normalize::l2_normalize_in_place;
use crate::onnx::run_onnx_embeddings;
use crate::stub::make_stub_vector;

enum Backend {
    Onnx(LoadedModel),
    Stub { dimension: usize },
}

/// A loaded sentence-embedding model.
///
/// Built once with [`SentenceEncoder::load`], then [`encode`](Self::encode) maps sentences
/// to vectors.
pub struct SentenceEncoder {
    backend: Backend,
    model_name: String,
    max_sequence_length: usize,
    pooling: PoolingStrategy,
    normalize: bool,
    // Learned from the first ONNX batch; the stub knows it up front.
    dimension: Cell<Option<usize>>,
}

impl std::fmt::Debug for SentenceEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.backend {
            Backend::Onnx(_) => "onnx",
            Backend::Stub { .. } => "fast",
        };
        f.debug_struct("SentenceEncoder")
            .field("backend", &backend)
            .field("model_name", &self.model_name)
            .field("dimension", &self.dimension.get())
            .finish()
    }
}

impl SentenceEncoder {
    /// Obtains the model named in `cfg` and prepares it for encoding.
    ///
    /// In ONNX mode this resolves (and if needed downloads) the model assets, parses the
    /// tokenizer and builds the inference session. Any failure is returned as-is; there is
    /// no retry and no fallback backend.
    pub async fn load(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        validate(cfg)?;

        let backend = match cfg.mode {
            EncoderMode::Fast => Backend::Stub {
                dimension: cfg.stub_dimension,
            },
            EncoderMode::Onnx => {
                let assets = resolve_model_assets(cfg).await?;
                let model = LoadedModel::load(&assets, cfg.max_sequence_length)?;
                tracing::debug!(inputs = ?model.input_names(), "onnx session ready");
                Backend::Onnx(model)
            }
        };

        let dimension = match backend {
            Backend::Stub { dimension } => Some(dimension),
            Backend::Onnx(_) => None,
        };

        tracing::info!(model = %cfg.model_name, mode = ?cfg.mode, "sentence encoder loaded");

        Ok(Self {
            backend,
            model_name: cfg.model_name.clone(),
            max_sequence_length: cfg.max_sequence_length,
            pooling: cfg.pooling,
            normalize: cfg.normalize,
            dimension: Cell::new(dimension),
        })
    }

    /// Encodes `texts` in a single batch. Output `i` is the vector for `texts[i]`.
    pub fn encode<T>(&self, texts: &[T]) -> Result<Vec<Vec<f32>>, SemanticError>
    where
        T: AsRef<str>,
    {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = match &self.backend {
            Backend::Stub { dimension } => texts
                .iter()
                .map(|text| make_stub_vector(text.as_ref(), *dimension))
                .collect(),
            Backend::Onnx(model) => {
                run_onnx_embeddings(model, texts, self.max_sequence_length, self.pooling)?
            }
        };

        ensure_one_per_input(vectors.len(), texts.len())?;

        if self.normalize {
            for vector in &mut vectors {
                l2_normalize_in_place(vector);
            }
        }

        if let Some(first) = vectors.first() {
            self.dimension.set(Some(first.len()));
        }

        Ok(vectors)
    }

    /// Vector width, once known. Always known for the stub; for ONNX after the first batch.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension.get()
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn is_normalized(&self) -> bool {
        self.normalize
    }
}

/// A batch must yield exactly one vector per input, or ids would point at the wrong text.
fn ensure_one_per_input(produced: usize, inputs: usize) -> Result<(), SemanticError> {
    if produced != inputs {
        return Err(SemanticError::Inference(format!(
            "model returned {produced} embeddings for {inputs} inputs"
        )));
    }
    Ok(())
}

fn validate(cfg: &SemanticConfig) -> Result<(), SemanticError> {
    if cfg.model_name.trim().is_empty() {
        return Err(SemanticError::InvalidConfig("model_name is empty".into()));
    }
    if cfg.max_sequence_length == 0 {
        return Err(SemanticError::InvalidConfig(
            "max_sequence_length must be >= 1".into(),
        ));
    }
    if cfg.mode == EncoderMode::Fast && cfg.stub_dimension == 0 {
        return Err(SemanticError::InvalidConfig(
            "stub_dimension must be >= 1".into(),
        ));
    }
    Ok(())
}
