//! Lexical fallback ranking.
//!
//! Scores projects by literal substring overlap between query tokens and the
//! title, summary and keywords of each project. No external service is
//! involved, so this strategy is always available.

use async_trait::async_trait;

use super::{top_results, QueryResult, RankingStrategy, SearchQuery};
use crate::models::{ProjectRecord, ScoredResult, NEUTRAL_SCORE};

/// Tokens shorter than this many characters are ignored.
pub const MIN_TOKEN_CHARS: usize = 3;

/// Added per token found in the title.
pub const TITLE_WEIGHT: f32 = 0.10;

/// Added per token found in the summary.
pub const SUMMARY_WEIGHT: f32 = 0.05;

/// Added per token found in any keyword.
pub const KEYWORD_WEIGHT: f32 = 0.08;

/// Upper bound on a lexical score.
pub const MAX_SCORE: f32 = 1.0;

/// Split a query into lowercased tokens, dropping the short ones.
pub fn tokenize(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
        .collect()
}

/// Score one project against already-tokenized query terms.
///
/// Starts from the project's baseline hint (or the neutral 0.5), adds the
/// weight of every field each token appears in, and caps the total at
/// [`MAX_SCORE`]. Repeated tokens count once per occurrence.
pub fn lexical_score(project: &ProjectRecord, tokens: &[String]) -> f32 {
    let title = project.title.to_lowercase();
    let summary = project.summary.to_lowercase();
    let keywords: Vec<String> = project.keywords.iter().map(|k| k.to_lowercase()).collect();

    let mut relevance = project.baseline.unwrap_or(NEUTRAL_SCORE);
    for token in tokens {
        if title.contains(token.as_str()) {
            relevance += TITLE_WEIGHT;
        }
        if summary.contains(token.as_str()) {
            relevance += SUMMARY_WEIGHT;
        }
        if keywords.iter().any(|k| k.contains(token.as_str())) {
            relevance += KEYWORD_WEIGHT;
        }
    }

    relevance.min(MAX_SCORE)
}

/// List candidates by ascending project number with the neutral score.
pub fn browse(candidates: &[&ProjectRecord], limit: usize) -> Vec<ScoredResult> {
    let mut sorted: Vec<&ProjectRecord> = candidates.to_vec();
    sorted.sort_by(|a, b| a.project_no.cmp(&b.project_no));
    sorted
        .into_iter()
        .take(limit)
        .map(|p| ScoredResult::new(p.clone(), NEUTRAL_SCORE))
        .collect()
}

/// Keyword-overlap ranking.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexicalStrategy;

#[async_trait]
impl RankingStrategy for LexicalStrategy {
    async fn rank(
        &self,
        query: &SearchQuery,
        candidates: &[&ProjectRecord],
    ) -> QueryResult<Vec<ScoredResult>> {
        if query.query.trim().is_empty() {
            return Ok(browse(candidates, query.limit));
        }

        let tokens = tokenize(&query.query);
        let scored = candidates
            .iter()
            .enumerate()
            .map(|(i, project)| (i, lexical_score(project, &tokens)))
            .collect();

        Ok(top_results(candidates, scored, query.limit))
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}
