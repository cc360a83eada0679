//! Provider configuration shared by the binaries.
//!
//! [`ProviderSettings`] is a `clap` argument group whose fields fall back to
//! environment variables, so `--openai-api-key` and `OPENAI_API_KEY` are
//! interchangeable. Semantic search is only wired up when the embedding key and
//! both Pinecone settings are present; anything less runs lexical-only.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use thiserror::Error;
use tracing::info;

use crate::catalog::Catalog;
use crate::embedding::openai::{OpenAIEmbedding, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::embedding::EmbeddingError;
use crate::index::pinecone::PineconeIndex;
use crate::index::IndexError;
use crate::query::{RankingEngine, SemanticStrategy};

/// Errors raised while turning settings into providers.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent
    #[error("Missing setting: {0}")]
    Missing(&'static str),

    /// Embedding provider could not be created
    #[error("Embedding configuration error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Vector index client could not be created
    #[error("Index configuration error: {0}")]
    Index(#[from] IndexError),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Credentials and endpoints of the external capabilities.
#[derive(Debug, Clone, Args)]
pub struct ProviderSettings {
    /// OpenAI API key used to embed queries
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Embedding model; must match the model the index was built with
    #[arg(long, env = "EMBEDDING_MODEL", default_value = DEFAULT_MODEL)]
    pub embedding_model: String,

    /// OpenAI-compatible API root
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", hide_env_values = true)]
    pub pinecone_api_key: Option<String>,

    /// Pinecone index host (e.g. fyp-abc123.svc.us-east-1.pinecone.io)
    #[arg(long, env = "PINECONE_INDEX_HOST")]
    pub pinecone_index_host: Option<String>,

    /// Seconds the semantic strategy may take before falling back
    #[arg(long, env = "SEMANTIC_TIMEOUT_SECS", default_value_t = 5)]
    pub semantic_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            embedding_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            pinecone_api_key: None,
            pinecone_index_host: None,
            semantic_timeout_secs: 5,
        }
    }
}

/// Treat blank values the same as missing ones.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl ProviderSettings {
    /// Time budget for one semantic ranking call.
    pub fn semantic_timeout(&self) -> Duration {
        Duration::from_secs(self.semantic_timeout_secs)
    }

    /// Whether every setting semantic search needs is present.
    pub fn semantic_enabled(&self) -> bool {
        present(&self.openai_api_key).is_some()
            && present(&self.pinecone_api_key).is_some()
            && present(&self.pinecone_index_host).is_some()
    }

    /// Build the OpenAI embedding provider.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` without an API key
    pub fn embedding(&self) -> ConfigResult<OpenAIEmbedding> {
        let api_key = present(&self.openai_api_key).ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;
        Ok(OpenAIEmbedding::with_base_url(
            api_key.to_string(),
            Some(self.embedding_model.clone()),
            &self.openai_base_url,
            self.semantic_timeout(),
        )?)
    }

    /// Build the Pinecone index client.
    ///
    /// # Errors
    /// Returns `ConfigError::Missing` without an API key or host
    pub fn index(&self) -> ConfigResult<PineconeIndex> {
        let api_key = present(&self.pinecone_api_key).ok_or(ConfigError::Missing("PINECONE_API_KEY"))?;
        let host = present(&self.pinecone_index_host).ok_or(ConfigError::Missing("PINECONE_INDEX_HOST"))?;
        Ok(PineconeIndex::new(api_key.to_string(), host, self.semantic_timeout())?)
    }

    /// Build the semantic strategy, or None when it is not configured.
    ///
    /// # Errors
    /// Returns `ConfigError` if the settings are present but a client cannot be built
    pub fn semantic_strategy(&self) -> ConfigResult<Option<SemanticStrategy>> {
        if !self.semantic_enabled() {
            info!("Semantic search not configured, using lexical ranking only");
            return Ok(None);
        }

        let embedding = self.embedding()?;
        let index = self.index()?;
        info!("Semantic search enabled: model={}, index={}", self.embedding_model, index.host());
        Ok(Some(SemanticStrategy::new(Arc::new(embedding), Arc::new(index))))
    }

    /// Build a ranking engine over `catalog` using these settings.
    ///
    /// # Errors
    /// Returns `ConfigError` if the semantic strategy cannot be built
    pub fn ranking_engine(&self, catalog: Arc<Catalog>) -> ConfigResult<RankingEngine> {
        Ok(RankingEngine::new(catalog, self.semantic_strategy()?)
            .with_semantic_timeout(self.semantic_timeout()))
    }
}
