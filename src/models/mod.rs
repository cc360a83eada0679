//! Core data models for the project finder.
//!
//! This module contains the fundamental data structures used across the application:
//! catalog entries for final-year projects and the scored results produced by a search.

use serde::{Deserialize, Serialize};

/// Score assigned when a record is returned without being ranked
/// (browse mode, or a lexical record with no baseline hint).
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Scores below this value are considered low-confidence for display purposes.
///
/// The engine never drops results on this basis; it only drives the
/// [`RelevanceLevel`] label attached to each result.
pub const RELEVANCE_FLOOR: f32 = 0.3;

/// Value of `isJointOrURECA` for projects that are neither joint nor URECA.
pub const NOT_JOINT: &str = "No";

fn default_not_joint() -> String {
    NOT_JOINT.to_string()
}

/// A single final-year-project listing.
///
/// Records are loaded once from the catalog dataset and never modified afterwards.
/// Field names on the wire follow the dataset's camelCase convention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    /// Unique project identifier (e.g. "CCDS25-0001"), also the stable sort key
    pub project_no: String,

    /// Project title
    #[serde(default)]
    pub title: String,

    /// Free-text project summary
    #[serde(default)]
    pub summary: String,

    /// Supervising staff member
    #[serde(default)]
    pub supervisor: String,

    /// Project category (e.g. "Software Only")
    #[serde(default)]
    pub category: String,

    /// Project type (e.g. "Research & Development")
    #[serde(default, rename = "type")]
    pub project_type: String,

    /// "Yes", "No", or another marker; anything other than "No" counts as joint/URECA
    #[serde(default = "default_not_joint", rename = "isJointOrURECA")]
    pub is_joint_or_ureca: String,

    /// Ordered keyword tags
    #[serde(default)]
    pub keywords: Vec<String>,

    /// Optional pre-seeded rank hint used by the lexical fallback
    #[serde(default, rename = "score", skip_serializing)]
    pub baseline: Option<f32>,
}

impl ProjectRecord {
    /// Whether this project is a joint or URECA project.
    pub fn is_joint(&self) -> bool {
        self.is_joint_or_ureca != NOT_JOINT
    }
}

/// Display classification for a result score.
///
/// Scores are relative ranking signals rather than probabilities, so the
/// levels are coarse on purpose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelevanceLevel {
    /// Score of at least 0.7
    Strong,

    /// Score between the relevance floor and 0.7
    Moderate,

    /// Score below [`RELEVANCE_FLOOR`]
    Low,
}

impl RelevanceLevel {
    /// Determine the relevance level for a score.
    ///
    /// # Arguments
    /// * `score` - Result score, higher is more relevant
    pub fn from_score(score: f32) -> Self {
        if score >= 0.7 {
            RelevanceLevel::Strong
        } else if score >= RELEVANCE_FLOOR {
            RelevanceLevel::Moderate
        } else {
            RelevanceLevel::Low
        }
    }

    /// Label used in table output.
    pub fn as_str(&self) -> &'static str {
        match self {
            RelevanceLevel::Strong => "STRONG",
            RelevanceLevel::Moderate => "MODERATE",
            RelevanceLevel::Low => "LOW",
        }
    }
}

/// A catalog record together with the score it received for one search.
///
/// Created fresh for every search call; re-scoring builds a new value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredResult {
    /// The project being ranked
    pub project: ProjectRecord,

    /// Ranking score (higher is more relevant)
    pub score: f32,

    /// Display classification derived from the score
    pub relevance: RelevanceLevel,
}

impl ScoredResult {
    /// Create a new scored result.
    ///
    /// # Arguments
    /// * `project` - The project record
    /// * `score` - Score assigned by the ranking strategy
    pub fn new(project: ProjectRecord, score: f32) -> Self {
        Self {
            project,
            score,
            relevance: RelevanceLevel::from_score(score),
        }
    }

    /// Whether this result falls below the relevance floor.
    pub fn is_low_confidence(&self) -> bool {
        self.relevance == RelevanceLevel::Low
    }
}

/// Configuration for the embedding model.
///
/// Logged by the indexer so the model used to build the vector index can be
/// matched with the model used at query time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmbeddingConfig {
    /// Name/identifier of the embedding model (e.g., "text-embedding-ada-002")
    pub model_name: String,

    /// Dimension of the embedding vectors
    pub dimension: usize,
}
