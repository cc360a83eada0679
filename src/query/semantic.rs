//! Semantic ranking through an embedding provider and a vector index.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{top_results, QueryResult, RankingStrategy, SearchQuery};
use crate::embedding::EmbeddingProvider;
use crate::index::pinecone::MAX_TOP_K;
use crate::index::VectorIndex;
use crate::models::{ProjectRecord, ScoredResult};

/// Highest score given to permitted projects the index did not return.
///
/// Lowered to the weakest match's score when a match falls below it.
pub const UNMATCHED_SCORE: f32 = 0.25;

/// Candidates requested from the index per requested result.
pub const CANDIDATE_MULTIPLIER: usize = 3;

/// Minimum number of extra candidates requested beyond the limit.
pub const CANDIDATE_MARGIN: usize = 10;

/// Number of index candidates to request for `limit` results.
///
/// The index is not aware of the local filters, so it is asked for more
/// neighbours than will be returned.
pub fn candidate_pool_size(limit: usize) -> usize {
    limit
        .saturating_mul(CANDIDATE_MULTIPLIER)
        .max(limit.saturating_add(CANDIDATE_MARGIN))
        .min(MAX_TOP_K)
}

/// Map an index similarity to a presentation score.
///
/// Squaring spreads scores that cluster near the top of the cosine range.
/// Similarities are clamped to `[0, 1]` first so the transform is monotonic.
pub fn presentation_score(similarity: f32) -> f32 {
    let s = similarity.clamp(0.0, 1.0);
    s * s
}

/// Embedding + vector index ranking.
#[derive(Clone)]
pub struct SemanticStrategy {
    embedding: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
}

impl SemanticStrategy {
    pub fn new(embedding: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedding, index }
    }
}

impl std::fmt::Debug for SemanticStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticStrategy")
            .field("model", &self.embedding.model_name())
            .field("index", &self.index.name())
            .finish()
    }
}

#[async_trait]
impl RankingStrategy for SemanticStrategy {
    async fn rank(
        &self,
        query: &SearchQuery,
        candidates: &[&ProjectRecord],
    ) -> QueryResult<Vec<ScoredResult>> {
        let vector = self.embedding.embed(&query.query).await?;
        let top_k = candidate_pool_size(query.limit);
        let matches = self.index.query(&vector, top_k).await?;
        debug!("{} returned {} matches for topK={}", self.index.name(), matches.len(), top_k);

        let permitted: HashMap<&str, usize> = candidates
            .iter()
            .enumerate()
            .map(|(i, p)| (p.project_no.as_str(), i))
            .collect();

        let mut seen = vec![false; candidates.len()];
        let mut scored: Vec<(usize, f32)> = Vec::with_capacity(candidates.len());

        // Index order first, so ties between matches keep the index's ordering
        for m in &matches {
            if let Some(&i) = permitted.get(m.id.as_str()) {
                if !seen[i] {
                    seen[i] = true;
                    scored.push((i, presentation_score(m.score)));
                }
            }
        }

        // Fillers never outrank a real match: they sit at or below the weakest
        // match and follow every match under the stable sort
        let filler = scored
            .iter()
            .map(|&(_, score)| score)
            .fold(UNMATCHED_SCORE, f32::min);
        for (i, _) in candidates.iter().enumerate().filter(|(i, _)| !seen[*i]) {
            scored.push((i, filler));
        }

        Ok(top_results(candidates, scored, query.limit))
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FilterSpec;
    use crate::embedding::{EmbeddingError, EmbeddingResult};
    use crate::index::{IndexError, IndexResult, VectorMatch, VectorRecord};
    use crate::query::QueryError;
    use serde_json::json;
    use std::sync::Mutex;

    struct RecordingEmbedding {
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EmbeddingProvider for RecordingEmbedding {
        async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(vec![1.0, 0.0])
        }

        fn dimension(&self) -> usize {
            2
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    struct ScriptedIndex {
        matches: Vec<VectorMatch>,
        requested_top_k: Mutex<Option<usize>>,
    }

    impl ScriptedIndex {
        fn new(matches: &[(&str, f32)]) -> Self {
            Self {
                matches: matches
                    .iter()
                    .map(|(id, score)| VectorMatch { id: id.to_string(), score: *score })
                    .collect(),
                requested_top_k: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl VectorIndex for ScriptedIndex {
        async fn query(&self, _vector: &[f32], top_k: usize) -> IndexResult<Vec<VectorMatch>> {
            *self.requested_top_k.lock().unwrap() = Some(top_k);
            Ok(self.matches.clone())
        }

        async fn upsert(&self, records: &[VectorRecord]) -> IndexResult<usize> {
            Ok(records.len())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingIndex;

    #[async_trait]
    impl VectorIndex for FailingIndex {
        async fn query(&self, _vector: &[f32], _top_k: usize) -> IndexResult<Vec<VectorMatch>> {
            Err(IndexError::RequestError("HTTP 503".to_string()))
        }

        async fn upsert(&self, _records: &[VectorRecord]) -> IndexResult<usize> {
            Err(IndexError::RequestError("HTTP 503".to_string()))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn recording() -> Arc<RecordingEmbedding> {
        Arc::new(RecordingEmbedding { seen: Mutex::new(Vec::new()) })
    }

    fn records(ids: &[&str]) -> Vec<ProjectRecord> {
        ids.iter()
            .map(|id| serde_json::from_value(json!({ "projectNo": id })).unwrap())
            .collect()
    }

    fn query(limit: usize) -> SearchQuery {
        SearchQuery::new("Explainable AI for LLMs".to_string(), Some(limit), FilterSpec::default())
    }

    #[test]
    fn test_candidate_pool_exceeds_limit() {
        assert_eq!(candidate_pool_size(1), 11);
        assert_eq!(candidate_pool_size(20), 60);
        assert_eq!(candidate_pool_size(usize::MAX), MAX_TOP_K);
        for limit in 1..200 {
            assert!(candidate_pool_size(limit) > limit);
        }
    }

    #[test]
    fn test_presentation_score_is_monotonic_square() {
        assert!((presentation_score(0.9) - 0.81).abs() < 1e-6);
        assert_eq!(presentation_score(-0.4), 0.0);
        assert_eq!(presentation_score(1.3), 1.0);
        assert!(presentation_score(0.8) > presentation_score(0.7));
    }

    #[tokio::test]
    async fn test_matches_are_intersected_and_squared() {
        let embedding = recording();
        let index = Arc::new(ScriptedIndex::new(&[
            ("X-9", 0.99), // not in the catalog
            ("P-2", 0.9),
            ("P-1", 0.8),
            ("P-2", 0.1), // duplicate, ignored
        ]));
        let strategy = SemanticStrategy::new(embedding.clone(), index.clone());

        let records = records(&["P-1", "P-2", "P-3"]);
        let candidates: Vec<&ProjectRecord> = records.iter().collect();
        let results = strategy.rank(&query(10), &candidates).await.unwrap();

        let ids: Vec<_> = results.iter().map(|r| r.project.project_no.as_str()).collect();
        assert_eq!(ids, vec!["P-2", "P-1", "P-3"]);
        assert!((results[0].score - 0.81).abs() < 1e-6);
        assert!((results[1].score - 0.64).abs() < 1e-6);
        assert_eq!(results[2].score, UNMATCHED_SCORE);

        assert_eq!(*index.requested_top_k.lock().unwrap(), Some(30));
        assert_eq!(embedding.seen.lock().unwrap().as_slice(), ["Explainable AI for LLMs"]);
    }

    #[tokio::test]
    async fn test_unmatched_fill_up_to_limit_in_catalog_order() {
        let strategy = SemanticStrategy::new(recording(), Arc::new(ScriptedIndex::new(&[("P-4", 0.7)])));
        let records = records(&["P-1", "P-2", "P-3", "P-4"]);
        let candidates: Vec<&ProjectRecord> = records.iter().collect();

        let results = strategy.rank(&query(3), &candidates).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.project.project_no.as_str()).collect();
        assert_eq!(ids, vec!["P-4", "P-1", "P-2"]);
    }

    #[tokio::test]
    async fn test_weak_match_still_beats_unmatched_projects() {
        // 0.45 squares to ~0.2, below the usual unmatched score
        let strategy = SemanticStrategy::new(recording(), Arc::new(ScriptedIndex::new(&[("P-9", 0.45)])));
        let records = records(&["P-1", "P-2", "P-9"]);
        let candidates: Vec<&ProjectRecord> = records.iter().collect();

        let results = strategy.rank(&query(2), &candidates).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.project.project_no.as_str()).collect();

        assert_eq!(ids, vec!["P-9", "P-1"]);
        assert!((results[0].score - 0.2025).abs() < 1e-6);
        assert!(results[1].score <= results[0].score);
    }

    #[tokio::test]
    async fn test_matches_always_precede_unmatched() {
        let strategy = SemanticStrategy::new(
            recording(),
            Arc::new(ScriptedIndex::new(&[("P-4", 0.3), ("P-3", 0.1), ("P-5", -0.2)])),
        );
        let records = records(&["P-1", "P-2", "P-3", "P-4", "P-5"]);
        let candidates: Vec<&ProjectRecord> = records.iter().collect();

        let results = strategy.rank(&query(5), &candidates).await.unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.project.project_no.as_str()).collect();

        assert_eq!(ids, vec!["P-4", "P-3", "P-5", "P-1", "P-2"]);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_index_failure_is_reported() {
        let strategy = SemanticStrategy::new(recording(), Arc::new(FailingIndex));
        let records = records(&["P-1"]);
        let candidates: Vec<&ProjectRecord> = records.iter().collect();

        assert!(matches!(
            strategy.rank(&query(5), &candidates).await,
            Err(QueryError::IndexError(_))
        ));
    }

    #[tokio::test]
    async fn test_embedding_failure_is_reported() {
        struct Unconfigured;

        #[async_trait]
        impl EmbeddingProvider for Unconfigured {
            async fn embed(&self, _text: &str) -> EmbeddingResult<Vec<f32>> {
                Err(EmbeddingError::ConfigError("OPENAI_API_KEY not set".to_string()))
            }

            fn dimension(&self) -> usize {
                0
            }

            fn model_name(&self) -> &str {
                "unconfigured"
            }
        }

        let strategy = SemanticStrategy::new(Arc::new(Unconfigured), Arc::new(FailingIndex));
        let records = records(&["P-1"]);
        let candidates: Vec<&ProjectRecord> = records.iter().collect();

        assert!(matches!(
            strategy.rank(&query(5), &candidates).await,
            Err(QueryError::EmbeddingError(EmbeddingError::ConfigError(_)))
        ));
    }
}
