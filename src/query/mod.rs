//! Query processing and ranking module.
//!
//! This module turns a [`SearchQuery`] into an ordered, truncated list of
//! [`ScoredResult`]s. Ranking is done by one of two [`RankingStrategy`]
//! implementations:
//!
//! - [`SemanticStrategy`]: embeds the query and asks a vector index for the
//!   nearest projects
//! - [`LexicalStrategy`]: local keyword-overlap scoring, always available
//!
//! [`RankingEngine`] filters the catalog once, tries the semantic strategy when
//! one is configured, and falls back to the lexical strategy on any error or
//! timeout. A search therefore only fails on invalid input.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use project_finder::catalog::{Catalog, FilterSpec};
//! use project_finder::query::{RankingEngine, SearchQuery};
//!
//! # async fn example(catalog: Catalog) -> Result<(), Box<dyn std::error::Error>> {
//! let engine = RankingEngine::lexical_only(Arc::new(catalog));
//!
//! let query = SearchQuery::new("machine learning".to_string(), Some(5), FilterSpec::default());
//! let outcome = engine.search(&query).await?;
//!
//! for result in outcome.results {
//!     println!("{} - Score: {:.3}", result.project.title, result.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod lexical;
pub mod semantic;

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{Catalog, FilterSpec};
use crate::embedding::EmbeddingError;
use crate::index::IndexError;
use crate::models::{ProjectRecord, ScoredResult};

pub use lexical::LexicalStrategy;
pub use semantic::SemanticStrategy;

/// Number of results returned when the caller does not ask for a specific count.
pub const DEFAULT_LIMIT: usize = 20;

/// How long the semantic strategy may take before the lexical fallback runs.
pub const DEFAULT_SEMANTIC_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during query processing.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    EmbeddingError(#[from] EmbeddingError),

    /// Vector index lookup failed
    #[error("Index error: {0}")]
    IndexError(#[from] IndexError),

    /// Invalid query parameters
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Search query parameters.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Free-text query; may be blank in browse mode
    pub query: String,

    /// Predicates applied before scoring
    pub filters: FilterSpec,

    /// Maximum number of results to return (at least 1)
    pub limit: usize,

    /// Skip scoring and list the filtered catalog by project number
    pub initial_load: bool,
}

impl SearchQuery {
    /// Create a new search query.
    ///
    /// # Arguments
    /// * `query` - The search query text
    /// * `limit` - Maximum number of results to return (default: 20)
    /// * `filters` - Filters applied before scoring
    pub fn new(query: String, limit: Option<usize>, filters: FilterSpec) -> Self {
        Self {
            query,
            filters,
            limit: limit.unwrap_or(DEFAULT_LIMIT),
            initial_load: false,
        }
    }

    /// Mark this query as the initial listing request.
    pub fn with_initial_load(mut self, initial_load: bool) -> Self {
        self.initial_load = initial_load;
        self
    }

    /// Whether this query lists the catalog instead of ranking it.
    pub fn is_browse(&self) -> bool {
        self.initial_load || self.query.trim().is_empty()
    }

    fn validate(&self) -> QueryResult<()> {
        if self.limit == 0 {
            return Err(QueryError::InvalidQuery("limit must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// The answer to one search call.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Results in ranking order
    pub results: Vec<ScoredResult>,

    /// Number of results, or the size of the whole filtered set in browse mode
    pub total: usize,

    /// True only if the semantic strategy produced `results`
    pub using_semantic: bool,
}

/// A way of scoring the filtered candidates for a query.
#[async_trait]
pub trait RankingStrategy: Send + Sync {
    /// Score `candidates` and return at most `query.limit` results, best first.
    ///
    /// `candidates` has already been filtered and is in catalog order.
    ///
    /// # Errors
    /// Returns `QueryError` if an external capability the strategy relies on fails
    async fn rank(
        &self,
        query: &SearchQuery,
        candidates: &[&ProjectRecord],
    ) -> QueryResult<Vec<ScoredResult>>;

    /// Strategy name, for logging.
    fn name(&self) -> &'static str;
}

/// Order `(candidate index, score)` pairs by descending score, keep the first
/// `limit`, and materialize them.
///
/// The sort is stable, so equal scores keep the order in which they were
/// produced.
pub(crate) fn top_results(
    candidates: &[&ProjectRecord],
    mut scored: Vec<(usize, f32)>,
    limit: usize,
) -> Vec<ScoredResult> {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(limit);
    scored
        .into_iter()
        .map(|(i, score)| ScoredResult::new(candidates[i].clone(), score))
        .collect()
}

/// Chooses a ranking strategy per call and degrades to lexical scoring.
///
/// The engine is immutable and cheap to share behind an `Arc`.
pub struct RankingEngine {
    catalog: Arc<Catalog>,
    semantic: Option<SemanticStrategy>,
    lexical: LexicalStrategy,
    semantic_timeout: Duration,
}

impl RankingEngine {
    /// Create an engine with an optional semantic strategy.
    pub fn new(catalog: Arc<Catalog>, semantic: Option<SemanticStrategy>) -> Self {
        Self {
            catalog,
            semantic,
            lexical: LexicalStrategy,
            semantic_timeout: DEFAULT_SEMANTIC_TIMEOUT,
        }
    }

    /// Create an engine that only ever uses the lexical strategy.
    pub fn lexical_only(catalog: Arc<Catalog>) -> Self {
        Self::new(catalog, None)
    }

    /// Bound the time the semantic strategy may take.
    pub fn with_semantic_timeout(mut self, timeout: Duration) -> Self {
        self.semantic_timeout = timeout;
        self
    }

    /// The catalog this engine searches.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Whether a semantic strategy is configured (not whether it is reachable).
    pub fn semantic_configured(&self) -> bool {
        self.semantic.is_some()
    }

    /// Execute a search.
    ///
    /// # Errors
    /// Returns `QueryError::InvalidQuery` for a zero limit. Failures of the
    /// semantic strategy are logged and never returned.
    pub async fn search(&self, query: &SearchQuery) -> QueryResult<SearchOutcome> {
        query.validate()?;

        let candidates = self.catalog.filtered(&query.filters);
        debug!(
            "{} of {} projects pass filters",
            candidates.len(),
            self.catalog.len()
        );

        if query.is_browse() {
            return Ok(SearchOutcome {
                total: candidates.len(),
                results: lexical::browse(&candidates, query.limit),
                using_semantic: false,
            });
        }

        if let Some(semantic) = &self.semantic {
            match tokio::time::timeout(self.semantic_timeout, semantic.rank(query, &candidates)).await {
                Ok(Ok(results)) => {
                    return Ok(SearchOutcome {
                        total: results.len(),
                        results,
                        using_semantic: true,
                    });
                }
                Ok(Err(e)) => warn!("{} ranking failed, using lexical fallback: {}", semantic.name(), e),
                Err(_) => warn!(
                    "{} ranking timed out after {:?}, using lexical fallback",
                    semantic.name(),
                    self.semantic_timeout
                ),
            }
        }

        let results = self.lexical.rank(query, &candidates).await?;
        Ok(SearchOutcome {
            total: results.len(),
            results,
            using_semantic: false,
        })
    }
}
