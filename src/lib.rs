//! sentvec: sentence embeddings to JSON.
//!
//! Loads a pre-trained sentence-embedding model (by default
//! `paraphrase-MiniLM-L6-v2`), encodes an ordered list of sentences in one batch and
//! writes `[{ "id": "sentence_<i>", "vector": [...] }, ...]` to a JSON file. A written
//! document can then be searched by cosine similarity with [`query`].
//!
//! The straight-line flow is model load, one encode call, one file write. Any failure
//! along the way is returned to the caller; nothing is retried.
//!
//! ```no_run
//! use sentvec::{run, SentvecConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), sentvec::PipelineError> {
//!     let cfg = SentvecConfig::default();
//!     let summary = run(&cfg).await?;
//!     println!("wrote {} records to {}", summary.records, summary.output_path.display());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod record;
pub mod search;

pub use crate::config::{
    ConfigLoadError, InputConfig, LogFormat, LoggingConfig, ModelConfig, OutputConfig,
    QueryConfig, SentvecConfig, DEFAULT_SENTENCES,
};
pub use crate::record::{
    build_records, check_vectors, read_embeddings, write_embeddings, EmbeddingRecord,
};
pub use crate::search::{cosine_similarity, EmbeddingIndex, Match};
pub use semantic::{EncoderMode, PoolingStrategy, SemanticConfig, SemanticError, SentenceEncoder};

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use thiserror::Error;

/// Errors that can occur during a run or a query.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("encoder error: {0}")]
    Semantic(#[from] SemanticError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid embeddings: {0}")]
    InvalidEmbeddings(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub output_path: PathBuf,
    pub records: usize,
    pub dimension: usize,
}

/// Loads the configured model, encodes every configured sentence and writes the document.
pub async fn run(cfg: &SentvecConfig) -> Result<RunSummary, PipelineError> {
    tracing::info!(
        model = %cfg.model.name,
        sentences = cfg.input.sentences.len(),
        output = %cfg.output.path.display(),
        "starting encode run"
    );
    let encoder = SentenceEncoder::load(&cfg.model.to_semantic_config()).await?;
    encode_and_write(&encoder, &cfg.input.sentences, &cfg.output)
}

/// Encodes `sentences` with an already loaded encoder and writes them per `output`.
///
/// Vectors are checked (count, shared dimension, finiteness) before the file is opened,
/// so a bad batch never clobbers an existing document.
pub fn encode_and_write<T>(
    encoder: &SentenceEncoder,
    sentences: &[T],
    output: &OutputConfig,
) -> Result<RunSummary, PipelineError>
where
    T: AsRef<str>,
{
    let started = Instant::now();
    let vectors = encoder.encode(sentences)?;
    let dimension = check_vectors(&vectors, sentences.len())?;
    let records = build_records(vectors, &output.id_prefix);
    write_embeddings(&output.path, &records, output.pretty)?;

    tracing::info!(
        records = records.len(),
        dimension,
        elapsed_ms = started.elapsed().as_millis() as u64,
        path = %output.path.display(),
        "embeddings written"
    );

    Ok(RunSummary {
        output_path: output.path.clone(),
        records: records.len(),
        dimension,
    })
}

/// Encodes `text` and returns the `top_k` closest records from the document at
/// `cfg.output.path`.
pub async fn query(
    cfg: &SentvecConfig,
    text: &str,
    top_k: usize,
) -> Result<Vec<Match>, PipelineError> {
    // Read the document first so a missing file fails before any model download.
    let mut index = EmbeddingIndex::load(&cfg.output.path, cfg.query.cache_capacity)?;
    let encoder = SentenceEncoder::load(&cfg.model.to_semantic_config()).await?;
    query_with(&encoder, &mut index, text, top_k)
}

/// Same as [`query`] with a caller-owned encoder and index.
pub fn query_with(
    encoder: &SentenceEncoder,
    index: &mut EmbeddingIndex,
    text: &str,
    top_k: usize,
) -> Result<Vec<Match>, PipelineError> {
    let vector = encoder
        .encode(&[text])?
        .pop()
        .ok_or_else(|| PipelineError::InvalidEmbeddings("encoder returned no vector".into()))?;
    index.query(&vector, top_k)
}
