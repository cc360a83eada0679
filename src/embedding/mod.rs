//! Query and document embeddings.
//!
//! The ranking engine embeds the raw query text and the indexing pipeline
//! embeds one document per project. Both go through [`EmbeddingProvider`], so
//! the hosted model can be swapped and tests can plug in deterministic fakes.
//! Vectors written to the index and vectors used to query it must come from the
//! same model; [`EmbeddingProvider::model_name`] is logged on both sides.

pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

/// Failure to obtain an embedding.
///
/// None of these fail a search: the engine logs them and ranks lexically.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The provider could not be reached or answered with an error status
    #[error("API request failed: {0}")]
    ApiError(String),

    /// Text the provider refuses (blank input)
    #[error("Invalid input text: {0}")]
    InvalidInput(String),

    /// Missing or unusable credentials or endpoint
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// The provider answered, but not with one vector per input
    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// A model that turns text into fixed-length vectors.
///
/// ```ignore
/// let provider = OpenAIEmbedding::new(api_key, None)?;
/// let vector = provider.embed("machine learning for robotics").await?;
/// assert_eq!(vector.len(), provider.dimension());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    /// Embed several texts, returning vectors in input order.
    ///
    /// The default calls [`embed`](Self::embed) once per text and stops at the
    /// first failure. Hosted providers override it with a single request.
    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    /// Length of every vector this provider returns.
    fn dimension(&self) -> usize;

    /// Model identifier, e.g. "text-embedding-ada-002".
    fn model_name(&self) -> &str;
}
