//! Embedding records and the JSON document they are written to.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// One encoded sentence as it appears in the output document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    pub vector: Vec<f32>,
}

/// Pairs each vector with `{id_prefix}{index}`, keeping input order.
pub fn build_records(vectors: Vec<Vec<f32>>, id_prefix: &str) -> Vec<EmbeddingRecord> {
    vectors
        .into_iter()
        .enumerate()
        .map(|(i, vector)| EmbeddingRecord {
            id: format!("{id_prefix}{i}"),
            vector,
        })
        .collect()
}

/// Checks the invariants a document must satisfy before it is written: one vector per
/// sentence, one shared dimension, finite values only. Returns the dimension.
pub fn check_vectors(vectors: &[Vec<f32>], expected_count: usize) -> Result<usize, PipelineError> {
    if vectors.len() != expected_count {
        return Err(PipelineError::InvalidEmbeddings(format!(
            "expected {expected_count} vectors, got {}",
            vectors.len()
        )));
    }

    let dimension = vectors.first().map_or(0, Vec::len);
    for (i, vector) in vectors.iter().enumerate() {
        if vector.len() != dimension {
            return Err(PipelineError::InvalidEmbeddings(format!(
                "vector {i} has {} dimensions, vector 0 has {dimension}",
                vector.len()
            )));
        }
        if let Some(pos) = vector.iter().position(|x| !x.is_finite()) {
            return Err(PipelineError::InvalidEmbeddings(format!(
                "vector {i} has a non-finite value at position {pos}"
            )));
        }
    }
    Ok(dimension)
}

/// Writes `records` as one JSON array to `path`, replacing any existing file.
///
/// Not atomic: a failure part-way leaves a truncated file behind.
pub fn write_embeddings(
    path: &Path,
    records: &[EmbeddingRecord],
    pretty: bool,
) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // File::create truncates, so nothing of a previous document survives.
    let mut writer = BufWriter::new(File::create(path)?);
    if pretty {
        serde_json::to_writer_pretty(&mut writer, records)?;
    } else {
        serde_json::to_writer(&mut writer, records)?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads a document written by [`write_embeddings`].
pub fn read_embeddings(path: &Path) -> Result<Vec<EmbeddingRecord>, PipelineError> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}
