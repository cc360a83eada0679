//! Vector index abstraction and implementations.
//!
//! This module defines the interface the ranking engine uses to find the
//! projects nearest to a query embedding, and the interface the indexing
//! pipeline uses to write project embeddings. Two backends are provided:
//!
//! - [`pinecone::PineconeIndex`]: the hosted index the catalog is published to
//! - [`memory::InMemoryIndex`]: brute-force cosine search, for local runs and tests

pub mod memory;
pub mod pinecone;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur during vector index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Network or connection error
    #[error("Index request failed: {0}")]
    RequestError(String),

    /// The index answered with something we could not interpret
    #[error("Malformed index response: {0}")]
    ResponseError(String),

    /// Query or record vector does not match the index dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Missing credentials or host
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// One nearest-neighbour hit returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorMatch {
    /// Project number the vector was stored under
    pub id: String,

    /// Similarity reported by the index (cosine, higher is closer)
    pub score: f32,
}

/// A vector to be written to the index.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    /// Project number
    pub id: String,

    /// Embedding values
    pub values: Vec<f32>,

    /// Display metadata stored alongside the vector
    pub metadata: Value,
}

/// Trait for vector index backends.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` matches ordered by descending similarity.
    ///
    /// # Errors
    /// Returns `IndexError` if the index cannot be reached or rejects the query
    async fn query(&self, vector: &[f32], top_k: usize) -> IndexResult<Vec<VectorMatch>>;

    /// Insert or replace records by id.
    ///
    /// # Returns
    /// The number of records the index reports as written
    async fn upsert(&self, records: &[VectorRecord]) -> IndexResult<usize>;

    /// Human-readable backend name, for logging.
    fn name(&self) -> &str;
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 when either vector has zero magnitude. Callers are expected to
/// have checked that the lengths agree; extra trailing components of the
/// longer vector are ignored.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
