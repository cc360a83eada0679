//! Project catalog.
//!
//! The catalog is the entire universe of searchable projects. It is loaded once
//! at startup from a [`CatalogSource`] and is read-only afterwards, so it can be
//! shared across concurrent searches behind an `Arc` without locking.
//!
//! The `CatalogSource` trait abstracts where the records come from, so the
//! server, the CLI and the indexer can all load the same dataset, and tests can
//! build catalogs directly with [`Catalog::from_projects`].

pub mod filter;
pub mod json;

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::models::ProjectRecord;

pub use filter::{apply_filters, FilterSpec};

/// Errors that can occur while loading the catalog.
///
/// All of them are fatal: a process without a catalog has nothing to search.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read from the data source
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse the data format
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A record violates a catalog invariant (e.g. duplicate project number)
    #[error("Invalid catalog: {0}")]
    Invalid(String),

    /// The source holds no projects at all
    #[error("Catalog is empty: {0}")]
    Empty(String),
}

/// Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Trait for sourcing project records.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch every project record from this source.
    ///
    /// # Errors
    /// Returns `CatalogError` if the records cannot be read or parsed
    async fn fetch_projects(&self) -> CatalogResult<Vec<ProjectRecord>>;

    /// Human-readable description of this source, for logging.
    fn name(&self) -> &str;
}

/// The immutable set of project records.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    projects: Vec<ProjectRecord>,
}

impl Catalog {
    /// Load the catalog from a source.
    ///
    /// # Errors
    /// Returns `CatalogError` if the source fails or the records contain a
    /// duplicate project number
    pub async fn load(source: &dyn CatalogSource) -> CatalogResult<Self> {
        let projects = source.fetch_projects().await?;
        let catalog = Self::from_projects(projects)?;
        info!("Loaded {} projects from {}", catalog.len(), source.name());
        Ok(catalog)
    }

    /// Build a catalog from records already in memory.
    ///
    /// # Errors
    /// Returns `CatalogError::Invalid` if a project number is empty or repeated
    pub fn from_projects(projects: Vec<ProjectRecord>) -> CatalogResult<Self> {
        let mut seen = HashSet::with_capacity(projects.len());
        for project in &projects {
            if project.project_no.trim().is_empty() {
                return Err(CatalogError::Invalid(format!(
                    "project titled '{}' has no projectNo",
                    project.title
                )));
            }
            if !seen.insert(project.project_no.as_str()) {
                return Err(CatalogError::Invalid(format!(
                    "duplicate projectNo '{}'",
                    project.project_no
                )));
            }
        }

        Ok(Self { projects })
    }

    /// Reject a catalog with no projects. `origin` names the source in the error.
    ///
    /// # Errors
    /// Returns `CatalogError::Empty` when there is nothing to search
    pub fn require_projects(self, origin: &str) -> CatalogResult<Self> {
        if self.is_empty() {
            return Err(CatalogError::Empty(format!("{} contains no projects", origin)));
        }
        Ok(self)
    }

    /// All projects, in dataset order.
    pub fn projects(&self) -> &[ProjectRecord] {
        &self.projects
    }

    /// Iterate over all projects in dataset order.
    pub fn iter(&self) -> impl Iterator<Item = &ProjectRecord> {
        self.projects.iter()
    }

    /// Projects passing `filters`, in dataset order.
    pub fn filtered(&self, filters: &FilterSpec) -> Vec<&ProjectRecord> {
        apply_filters(self.projects.iter(), filters)
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
