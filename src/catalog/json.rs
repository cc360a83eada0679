//! JSON file catalog source.
//!
//! Reads the dataset exported by the project listing scraper: a single JSON
//! array of project objects.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::{CatalogError, CatalogResult, CatalogSource};
use crate::models::ProjectRecord;

/// Catalog source backed by a JSON file on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    display_name: String,
}

impl JsonFileSource {
    /// Create a source for the file at `path`. The file is read on each fetch.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let display_name = format!("json:{}", path.display());
        Self { path, display_name }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CatalogSource for JsonFileSource {
    async fn fetch_projects(&self) -> CatalogResult<Vec<ProjectRecord>> {
        debug!("Reading catalog from {}", self.path.display());
        let bytes = tokio::fs::read(&self.path).await?;

        serde_json::from_slice(&bytes).map_err(|e| {
            CatalogError::ParseError(format!("{}: {}", self.path.display(), e))
        })
    }

    fn name(&self) -> &str {
        &self.display_name
    }
}
