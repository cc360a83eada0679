//! Indexing pipeline module.
//!
//! This module handles the offline pipeline that publishes the catalog to the
//! vector index used by semantic search: every project is turned into a text
//! document, embedded, and upserted together with display metadata.
//!
//! # Usage
//!
//! ```ignore
//! use project_finder::ingestion::IndexingPipeline;
//!
//! let pipeline = IndexingPipeline::new(embedding, index)
//!     .with_embed_batch_size(50)
//!     .with_upsert_batch_size(100);
//!
//! let stats = pipeline.run(&catalog).await?;
//! println!("Upserted: {}, Failed: {}", stats.upserted, stats.failed);
//! ```
//!
//! A batch that fails to embed is counted and skipped; a batch that fails to
//! upsert is retried in smaller chunks before its records are counted as failed.
//! Only a configuration problem (such as a zero batch size) aborts the run.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::embedding::EmbeddingProvider;
use crate::index::{VectorIndex, VectorRecord};
use crate::models::{EmbeddingConfig, ProjectRecord};

/// Default number of projects embedded per request.
pub const DEFAULT_EMBED_BATCH_SIZE: usize = 50;

/// Default number of vectors written per upsert request.
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 100;

/// Chunk size used when retrying a failed upsert batch.
pub const RETRY_CHUNK_SIZE: usize = 10;

/// Errors that abort an indexing run.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Invalid pipeline settings
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ingestion operations.
pub type IngestionResult<T> = Result<T, IngestionError>;

/// Statistics from an indexing run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexingStats {
    /// Number of catalog records considered
    pub total: usize,

    /// Number of records that received an embedding
    pub embedded: usize,

    /// Number of vectors the index reported as written
    pub upserted: usize,

    /// Number of records skipped because they cannot be indexed
    pub skipped: usize,

    /// Number of records that failed to embed or upsert
    pub failed: usize,
}

impl IndexingStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Build the document embedded for a project.
///
/// Title, summary and keywords are concatenated with spaces and lowercased so
/// that the index matches the text the original dataset was embedded from.
pub fn prepare_text(project: &ProjectRecord) -> String {
    let text = format!(
        "{} {} {}",
        project.title,
        project.summary,
        project.keywords.join(" ")
    );
    text.to_lowercase().trim().to_string()
}

/// Metadata stored next to each vector.
pub fn project_metadata(project: &ProjectRecord) -> serde_json::Value {
    json!({
        "title": project.title,
        "supervisor": project.supervisor,
        "category": project.category,
        "type": project.project_type,
        "keywords": project.keywords,
        "isJointOrURECA": project.is_joint_or_ureca,
    })
}

/// Indexing pipeline coordinator.
pub struct IndexingPipeline {
    embedding: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    embed_batch_size: usize,
    upsert_batch_size: usize,
}

impl IndexingPipeline {
    /// Create a pipeline with default batch sizes.
    pub fn new(embedding: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedding,
            index,
            embed_batch_size: DEFAULT_EMBED_BATCH_SIZE,
            upsert_batch_size: DEFAULT_UPSERT_BATCH_SIZE,
        }
    }

    pub fn with_embed_batch_size(mut self, size: usize) -> Self {
        self.embed_batch_size = size;
        self
    }

    pub fn with_upsert_batch_size(mut self, size: usize) -> Self {
        self.upsert_batch_size = size;
        self
    }

    /// Model and dimension the index is being built with.
    pub fn embedding_config(&self) -> EmbeddingConfig {
        EmbeddingConfig {
            model_name: self.embedding.model_name().to_string(),
            dimension: self.embedding.dimension(),
        }
    }

    /// Embed and upsert every project in the catalog.
    ///
    /// # Errors
    /// Returns `IngestionError::InvalidConfig` if a batch size is zero
    pub async fn run(&self, catalog: &Catalog) -> IngestionResult<IndexingStats> {
        self.run_with_progress(catalog, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_batch` with the running statistics
    /// after every embedding batch.
    pub async fn run_with_progress<F>(
        &self,
        catalog: &Catalog,
        mut on_batch: F,
    ) -> IngestionResult<IndexingStats>
    where
        F: FnMut(&IndexingStats) + Send,
    {
        if self.embed_batch_size == 0 || self.upsert_batch_size == 0 {
            return Err(IngestionError::InvalidConfig(
                "batch sizes must be at least 1".to_string(),
            ));
        }

        let config = self.embedding_config();
        info!(
            "Indexing {} projects with {} (dimension {}) into {}",
            catalog.len(),
            config.model_name,
            config.dimension,
            self.index.name()
        );

        let mut stats = IndexingStats::new();
        let mut pending: Vec<VectorRecord> = Vec::new();

        for chunk in catalog.projects().chunks(self.embed_batch_size) {
            stats.total += chunk.len();

            let texts: Vec<(&ProjectRecord, String)> = chunk
                .iter()
                .filter_map(|p| {
                    let text = prepare_text(p);
                    if text.is_empty() {
                        warn!("Project {} has no text to embed, skipping", p.project_no);
                        None
                    } else {
                        Some((p, text))
                    }
                })
                .collect();
            stats.skipped += chunk.len() - texts.len();

            if !texts.is_empty() {
                match self.embed_chunk(&texts).await {
                    Some(records) => {
                        stats.embedded += records.len();
                        pending.extend(records);
                    }
                    None => stats.failed += texts.len(),
                }
            }

            while pending.len() >= self.upsert_batch_size {
                let batch: Vec<VectorRecord> = pending.drain(..self.upsert_batch_size).collect();
                self.upsert_with_retry(&batch, &mut stats).await;
            }

            on_batch(&stats);
        }

        if !pending.is_empty() {
            self.upsert_with_retry(&pending, &mut stats).await;
        }

        info!(
            "Indexing finished: {} upserted, {} skipped, {} failed",
            stats.upserted, stats.skipped, stats.failed
        );
        Ok(stats)
    }

    /// Embed one chunk, returning None if the provider fails or misbehaves.
    async fn embed_chunk(&self, texts: &[(&ProjectRecord, String)]) -> Option<Vec<VectorRecord>> {
        let inputs: Vec<&str> = texts.iter().map(|(_, t)| t.as_str()).collect();

        let embeddings = match self.embedding.embed_batch(&inputs).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!("Embedding batch of {} failed: {}", inputs.len(), e);
                return None;
            }
        };

        let expected = self.embedding.dimension();
        if embeddings.len() != texts.len() || embeddings.iter().any(|e| e.len() != expected) {
            warn!(
                "Embedding batch returned unexpected shape (expected {} vectors of dimension {})",
                texts.len(),
                expected
            );
            return None;
        }

        Some(
            texts
                .iter()
                .zip(embeddings)
                .map(|((project, _), values)| VectorRecord {
                    id: project.project_no.clone(),
                    values,
                    metadata: project_metadata(project),
                })
                .collect(),
        )
    }

    async fn upsert_with_retry(&self, batch: &[VectorRecord], stats: &mut IndexingStats) {
        match self.index.upsert(batch).await {
            Ok(written) => {
                debug!("Upserted batch of {}", written);
                stats.upserted += written;
                return;
            }
            Err(e) => warn!("Upsert of {} vectors failed, retrying in chunks: {}", batch.len(), e),
        }

        for chunk in batch.chunks(RETRY_CHUNK_SIZE) {
            match self.index.upsert(chunk).await {
                Ok(written) => stats.upserted += written,
                Err(e) => {
                    warn!("Upsert retry of {} vectors failed: {}", chunk.len(), e);
                    stats.failed += chunk.len();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::{EmbeddingError, EmbeddingResult};
    use crate::index::memory::InMemoryIndex;
    use crate::index::{IndexError, IndexResult, VectorMatch};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Embeds text by length, failing any batch that contains `poison`.
    struct LengthEmbedding {
        poison: Option<&'static str>,
        batches: AtomicUsize,
    }

    impl LengthEmbedding {
        fn new() -> Self {
            Self { poison: None, batches: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LengthEmbedding {
        async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }

        async fn embed_batch(&self, texts: &[&str]) -> EmbeddingResult<Vec<Vec<f32>>> {
            self.batches.fetch_add(1, Ordering::SeqCst);
            if let Some(poison) = self.poison {
                if texts.iter().any(|t| t.contains(poison)) {
                    return Err(EmbeddingError::ApiError("rate limited".to_string()));
                }
            }
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "length"
        }
    }

    /// Rejects any upsert larger than `max_batch`.
    struct PickyIndex {
        max_batch: usize,
        written: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl VectorIndex for PickyIndex {
        async fn query(&self, _vector: &[f32], _top_k: usize) -> IndexResult<Vec<VectorMatch>> {
            Ok(Vec::new())
        }

        async fn upsert(&self, records: &[VectorRecord]) -> IndexResult<usize> {
            if records.len() > self.max_batch {
                return Err(IndexError::RequestError("payload too large".to_string()));
            }
            self.written
                .lock()
                .unwrap()
                .extend(records.iter().map(|r| r.id.clone()));
            Ok(records.len())
        }

        fn name(&self) -> &str {
            "picky"
        }
    }

    fn project(no: &str, title: &str) -> ProjectRecord {
        serde_json::from_value(json!({
            "projectNo": no,
            "title": title,
            "summary": "Summary",
            "supervisor": "Prof X",
            "keywords": ["Artificial Intelligence", "Web"],
        }))
        .unwrap()
    }

    fn catalog(n: usize) -> Catalog {
        Catalog::from_projects((0..n).map(|i| project(&format!("P-{:03}", i), "Title")).collect())
            .unwrap()
    }

    #[test]
    fn test_prepare_text() {
        let record = project("P-1", "  VIS4AI: Visual Analytics");
        assert_eq!(
            prepare_text(&record),
            "vis4ai: visual analytics summary artificial intelligence web"
        );
    }

    #[test]
    fn test_project_metadata_uses_wire_names() {
        let metadata = project_metadata(&project("P-1", "T"));
        assert_eq!(metadata["type"], "");
        assert_eq!(metadata["isJointOrURECA"], "No");
        assert_eq!(metadata["keywords"][0], "Artificial Intelligence");
    }

    #[tokio::test]
    async fn test_run_indexes_whole_catalog_in_batches() {
        let embedding = Arc::new(LengthEmbedding::new());
        let index = Arc::new(InMemoryIndex::new());
        let pipeline = IndexingPipeline::new(embedding.clone(), index.clone())
            .with_embed_batch_size(4)
            .with_upsert_batch_size(3);

        let mut progress_calls = 0;
        let stats = pipeline
            .run_with_progress(&catalog(10), |_| progress_calls += 1)
            .await
            .unwrap();

        assert_eq!(
            stats,
            IndexingStats { total: 10, embedded: 10, upserted: 10, skipped: 0, failed: 0 }
        );
        assert_eq!(embedding.batches.load(Ordering::SeqCst), 3);
        assert_eq!(progress_calls, 3);
        assert_eq!(index.len().await, 10);
    }

    #[tokio::test]
    async fn test_failed_embedding_batch_is_counted_and_skipped() {
        let embedding = Arc::new(LengthEmbedding { poison: Some("poison"), batches: AtomicUsize::new(0) });
        let index = Arc::new(InMemoryIndex::new());
        let pipeline = IndexingPipeline::new(embedding, index.clone()).with_embed_batch_size(2);

        let catalog = Catalog::from_projects(vec![
            project("P-1", "Fine"),
            project("P-2", "Fine"),
            project("P-3", "Poison pill"),
            project("P-4", "Fine"),
        ])
        .unwrap();

        let stats = pipeline.run(&catalog).await.unwrap();
        assert_eq!(stats.embedded, 2);
        assert_eq!(stats.failed, 2);
        assert_eq!(stats.upserted, 2);
        assert_eq!(index.len().await, 2);
    }

    #[tokio::test]
    async fn test_failed_upsert_is_retried_in_chunks() {
        let index = Arc::new(PickyIndex { max_batch: RETRY_CHUNK_SIZE, written: Mutex::new(Vec::new()) });
        let pipeline = IndexingPipeline::new(Arc::new(LengthEmbedding::new()), index.clone())
            .with_upsert_batch_size(25);

        let stats = pipeline.run(&catalog(25)).await.unwrap();
        assert_eq!(stats.upserted, 25);
        assert_eq!(stats.failed, 0);
        assert_eq!(index.written.lock().unwrap().len(), 25);
    }

    #[tokio::test]
    async fn test_chunks_that_still_fail_are_counted() {
        let index = Arc::new(PickyIndex { max_batch: 0, written: Mutex::new(Vec::new()) });
        let pipeline = IndexingPipeline::new(Arc::new(LengthEmbedding::new()), index);

        let stats = pipeline.run(&catalog(12)).await.unwrap();
        assert_eq!(stats.upserted, 0);
        assert_eq!(stats.failed, 12);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_rejected() {
        let pipeline = IndexingPipeline::new(Arc::new(LengthEmbedding::new()), Arc::new(InMemoryIndex::new()))
            .with_embed_batch_size(0);
        assert!(matches!(
            pipeline.run(&catalog(1)).await,
            Err(IngestionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_embedding_config_reflects_provider() {
        let pipeline = IndexingPipeline::new(Arc::new(LengthEmbedding::new()), Arc::new(InMemoryIndex::new()));
        assert_eq!(
            pipeline.embedding_config(),
            EmbeddingConfig { model_name: "length".to_string(), dimension: 2 }
        );
    }
}
