//! Local CSV file store.

use std::path::PathBuf;

use async_trait::async_trait;
use patrol_map_incident_models::IncidentRecord;

use crate::dataset::DatasetDefinition;
use crate::parsing::parse_csv;
use crate::{RecordStore, SourceError};

/// Reads incident rows from a CSV file on disk, using a dataset
/// definition for the delimiter and column mapping.
pub struct FileStore {
    id: String,
    path: PathBuf,
    dataset: DatasetDefinition,
}

impl FileStore {
    /// Creates a store for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, dataset: DatasetDefinition) -> Self {
        let path = path.into();
        Self {
            id: format!("file://{}", path.display()),
            path,
            dataset,
        }
    }
}

#[async_trait]
impl RecordStore for FileStore {
    fn id(&self) -> &str {
        &self.id
    }

    async fn load(&self) -> Result<Vec<IncidentRecord>, SourceError> {
        log::info!("Reading {}", self.path.display());
        let bytes = tokio::fs::read(&self.path).await?;
        #[allow(clippy::cast_precision_loss)] // display-only MB value
        let mb = bytes.len() as f64 / 1_048_576.0;
        log::debug!("  read {mb:.1} MB");
        parse_csv(&bytes, &self.dataset)
    }
}
