//! Config-driven dataset definition.
//!
//! A [`DatasetDefinition`] names where an incident CSV lives and which of
//! its columns hold the coordinates and category. Definitions are written
//! in TOML and embedded at compile time (see [`crate::registry`]).

use serde::Deserialize;

use crate::SourceError;

/// Where a dataset lives and how to read it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetDefinition {
    /// Unique identifier (e.g. `"fir_details"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Object store bucket.
    pub bucket: String,
    /// Object key within the bucket.
    pub key: String,
    /// Field delimiter (default: comma).
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Header names for the interpreted columns.
    #[serde(default)]
    pub columns: ColumnMapping,
}

fn default_delimiter() -> String {
    ",".to_string()
}

/// Header names of the columns the pipeline interprets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnMapping {
    /// Latitude column.
    pub latitude: String,
    /// Longitude column.
    pub longitude: String,
    /// Crime category column.
    pub category: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            latitude: "Latitude".to_string(),
            longitude: "Longitude".to_string(),
            category: "CrimeHead_Name".to_string(),
        }
    }
}

impl DatasetDefinition {
    /// Returns the delimiter as a single byte.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Config`] if the delimiter is not exactly one
    /// byte.
    pub fn delimiter_byte(&self) -> Result<u8, SourceError> {
        match self.delimiter.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(SourceError::Config {
                message: format!(
                    "dataset '{}': delimiter must be a single byte, got {:?}",
                    self.id, self.delimiter
                ),
            }),
        }
    }

    /// Returns the `s3://bucket/key` URI of the dataset.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }
}

/// Parses a TOML string into a [`DatasetDefinition`].
///
/// # Errors
///
/// Returns [`SourceError::Config`] if the TOML is malformed or a required
/// field is missing.
pub fn parse_dataset_toml(toml_str: &str) -> Result<DatasetDefinition, SourceError> {
    toml::from_str(toml_str).map_err(|e| SourceError::Config {
        message: e.to_string(),
    })
}
