//! Project Finder - search over final-year-project listings.
//!
//! This library provides the core functionality for the project finder, which
//! lets students search a university's project catalog by free text and a few
//! structured filters. Ranking is semantic (query embeddings matched against a
//! vector index) when the external services are configured and reachable, and
//! lexical (keyword overlap) otherwise.
//!
//! # Architecture
//!
//! The system is organized into several key modules:
//!
//! - **models**: Core data structures (ProjectRecord, ScoredResult, RelevanceLevel)
//! - **catalog**: The immutable project catalog and its filters
//! - **embedding**: Text embedding generation (OpenAI)
//! - **index**: Vector index clients (Pinecone, in-memory)
//! - **query**: Ranking strategies and the engine that selects between them
//! - **ingestion**: Offline pipeline that publishes the catalog to the vector index
//! - **config**: Provider settings shared by the binaries
//! - **server**: HTTP search API
//!
//! # Workflow
//!
//! ## Offline Indexing
//!
//! 1. Load the catalog from a JSON file
//! 2. Build one document per project from its title, summary and keywords
//! 3. Embed the documents in batches
//! 4. Upsert the vectors with display metadata into the index
//!
//! ## Online Search
//!
//! 1. Receive a query and filters over HTTP or the CLI
//! 2. Filter the catalog
//! 3. Rank semantically, falling back to lexical scoring on any failure
//! 4. Return the top results with their scores
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use project_finder::{
//!     catalog::{json::JsonFileSource, Catalog, FilterSpec},
//!     query::{RankingEngine, SearchQuery},
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let catalog = Catalog::load(&JsonFileSource::new("projects.json")).await?;
//!     let engine = RankingEngine::lexical_only(Arc::new(catalog));
//!
//!     let query = SearchQuery::new("machine learning".to_string(), Some(10), FilterSpec::default());
//!     let outcome = engine.search(&query).await?;
//!
//!     for result in outcome.results {
//!         println!("{}: {}", result.project.title, result.score);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Public modules
pub mod catalog;
pub mod config;
pub mod embedding;
pub mod index;
pub mod ingestion;
pub mod models;
pub mod query;
pub mod server;

// Re-export commonly used types at the crate root
pub use catalog::{Catalog, CatalogSource, FilterSpec};
pub use embedding::EmbeddingProvider;
pub use index::VectorIndex;
pub use models::{EmbeddingConfig, ProjectRecord, RelevanceLevel, ScoredResult};
pub use query::{RankingEngine, RankingStrategy, SearchOutcome, SearchQuery};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
