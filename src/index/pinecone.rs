//! Pinecone vector index client.
//!
//! Talks to the data-plane REST API of a single serverless index. The index
//! host is the per-index URL shown in the Pinecone console
//! (e.g. `https://project-finder-index-abc123.svc.gcp-starter.pinecone.io`).

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{IndexError, IndexResult, VectorIndex, VectorMatch, VectorRecord};

/// Largest `topK` the query endpoint accepts.
pub const MAX_TOP_K: usize = 10_000;

const API_VERSION: &str = "2024-07";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

/// Client for one Pinecone index.
#[derive(Debug, Clone)]
pub struct PineconeIndex {
    client: reqwest::Client,
    api_key: String,
    host: String,
}

impl PineconeIndex {
    /// Create a client for the index served at `host`.
    ///
    /// # Arguments
    /// * `api_key` - Pinecone API key
    /// * `host` - Index host, with or without the `https://` scheme
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    /// Returns `IndexError::ConfigError` if the key or host is empty
    pub fn new(api_key: String, host: &str, timeout: Duration) -> IndexResult<Self> {
        if api_key.trim().is_empty() {
            return Err(IndexError::ConfigError("Pinecone API key is required".to_string()));
        }
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(IndexError::ConfigError("Pinecone index host is required".to_string()));
        }
        let host = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, api_key, host })
    }

    /// The resolved index URL.
    pub fn host(&self) -> &str {
        &self.host
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> IndexResult<R> {
        let url = format!("{}{}", self.host, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| IndexError::RequestError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(IndexError::RequestError(format!("HTTP {}: {}", status, text)));
        }

        response
            .json()
            .await
            .map_err(|e| IndexError::ResponseError(e.to_string()))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> IndexResult<Vec<VectorMatch>> {
        let top_k = top_k.clamp(1, MAX_TOP_K);
        debug!("Querying Pinecone with topK={}", top_k);

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: false,
            include_values: false,
        };
        let response: QueryResponse = self.post("/query", &request).await?;

        Ok(response.matches)
    }

    async fn upsert(&self, records: &[VectorRecord]) -> IndexResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let response: UpsertResponse = self
            .post("/vectors/upsert", &UpsertRequest { vectors: records })
            .await?;

        Ok(response.upserted_count)
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
