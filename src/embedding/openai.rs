//! OpenAI embedding provider implementation.
//!
//! This module provides an implementation of the `EmbeddingProvider` trait
//! using OpenAI's text embedding API over HTTP.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbeddingError, EmbeddingProvider, EmbeddingResult};

/// Model used to build the project index.
pub const DEFAULT_MODEL: &str = "text-embedding-ada-002";

/// Public OpenAI API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Request body for the embeddings endpoint
#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

/// Response from the embeddings endpoint
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

/// Error envelope returned by the API on non-2xx responses
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// OpenAI embedding provider.
///
/// Holds a pooled HTTP client; cloning is cheap and shares the pool.
#[derive(Debug, Clone)]
pub struct OpenAIEmbedding {
    client: reqwest::Client,

    /// OpenAI API key for authentication
    api_key: String,

    /// Model identifier (e.g., "text-embedding-ada-002")
    model: String,

    /// API root, without a trailing slash
    base_url: String,

    /// Expected dimension of the embedding vectors
    embedding_dimension: usize,
}

impl OpenAIEmbedding {
    /// Create a new OpenAI embedding provider against the public endpoint.
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API key
    /// * `model` - Model name (defaults to [`DEFAULT_MODEL`] if None)
    ///
    /// # Errors
    /// Returns `EmbeddingError::ConfigError` if the key is empty or the HTTP
    /// client cannot be built
    pub fn new(api_key: String, model: Option<String>) -> EmbeddingResult<Self> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL, Duration::from_secs(30))
    }

    /// Create a provider against a custom endpoint (proxies, Azure-compatible gateways, tests).
    ///
    /// # Arguments
    /// * `api_key` - API key sent as a bearer token
    /// * `model` - Model name (defaults to [`DEFAULT_MODEL`] if None)
    /// * `base_url` - API root such as `https://api.openai.com/v1`
    /// * `timeout` - Per-request timeout
    pub fn with_base_url(
        api_key: String,
        model: Option<String>,
        base_url: &str,
        timeout: Duration,
    ) -> EmbeddingResult<Self> {
        if api_key.trim().is_empty() {
            return Err(EmbeddingError::ConfigError(
                "OpenAI API key is required".to_string(),
            ));
        }

        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let embedding_dimension = match model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536, // ada-002 and 3-small
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            embedding_dimension,
        })
    }

    async fn request(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        debug!("Requesting {} embeddings from {}", texts.len(), url);

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::ApiError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|b| b.error.message)
                .unwrap_or(text);
            return Err(EmbeddingError::ApiError(format!("HTTP {}: {}", status, message)));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::ApiError(format!("Malformed response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::MalformedResponse(format!(
                "Expected {} embeddings, received {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbedding {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("Text cannot be empty".to_string()));
        }

        self.request(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::MalformedResponse("no embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidInput("All texts must be non-empty".to_string()));
        }

        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.embedding_dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
