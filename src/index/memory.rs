//! In-memory vector index.
//!
//! Keeps every vector in a `Vec` and answers queries by scoring all of them
//! with cosine similarity. Suitable for catalogs of a few thousand projects.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{cosine_similarity, IndexError, IndexResult, VectorIndex, VectorMatch, VectorRecord};

/// Brute-force cosine index.
///
/// The dimension is fixed by the first record written; later records and
/// queries of a different length are rejected.
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    entries: RwLock<Vec<(String, Vec<f32>)>>,
}

impl InMemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored vectors.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the index holds no vectors.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

fn check_dimension(entries: &[(String, Vec<f32>)], actual: usize) -> IndexResult<()> {
    match entries.first() {
        Some((_, existing)) if existing.len() != actual => Err(IndexError::DimensionMismatch {
            expected: existing.len(),
            actual,
        }),
        _ => Ok(()),
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn query(&self, vector: &[f32], top_k: usize) -> IndexResult<Vec<VectorMatch>> {
        let entries = self.entries.read().await;
        check_dimension(&entries, vector.len())?;

        let mut matches: Vec<VectorMatch> = entries
            .iter()
            .map(|(id, values)| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(vector, values),
            })
            .collect();

        // Stable: equal scores keep insertion order
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        matches.truncate(top_k);

        Ok(matches)
    }

    async fn upsert(&self, records: &[VectorRecord]) -> IndexResult<usize> {
        let mut entries = self.entries.write().await;

        for record in records {
            check_dimension(&entries, record.values.len())?;
            match entries.iter_mut().find(|(id, _)| *id == record.id) {
                Some(existing) => existing.1 = record.values.clone(),
                None => entries.push((record.id.clone(), record.values.clone())),
            }
        }

        Ok(records.len())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
