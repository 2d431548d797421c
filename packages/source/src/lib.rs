#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident record store.
//!
//! Every place incident rows can come from implements the [`RecordStore`]
//! trait. Stores fetch a delimited text blob (from an S3-compatible object
//! store or a local file), parse it with the column mapping from a
//! [`DatasetDefinition`](dataset::DatasetDefinition), and hand back raw
//! [`IncidentRecord`]s. Cleaning is left to the pipeline.
//!
//! A retrieval that the object store answers with a non-success status
//! yields an empty dataset rather than an error. Transport and I/O failures
//! still propagate.

pub mod cache;
pub mod config;
pub mod dataset;
pub mod file;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod s3;

use async_trait::async_trait;
use patrol_map_incident_models::IncidentRecord;

/// Errors that can occur while loading incident records.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Missing required environment variable.
    #[error("Missing environment variable: {name}")]
    MissingEnv {
        /// Name of the missing environment variable.
        name: String,
    },

    /// S3 `GetObject` failed before a response was received, or the body
    /// could not be read.
    #[error("Failed to download s3://{bucket}/{key}: {source}")]
    Download {
        /// Bucket name.
        bucket: String,
        /// Object key.
        key: String,
        /// Underlying SDK error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// CSV parsing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A required column is not present in the header row.
    #[error("Missing column '{column}' in header row")]
    MissingColumn {
        /// Header name that was expected.
        column: String,
    },

    /// A dataset definition could not be parsed or found.
    #[error("Dataset config error: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// I/O error reading local files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A place incident rows can be loaded from.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Identity of the underlying data (e.g. `"s3://bucket/key"`), used as
    /// the load cache key.
    fn id(&self) -> &str;

    /// Fetches and parses every row.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if retrieval or parsing fails.
    async fn load(&self) -> Result<Vec<IncidentRecord>, SourceError>;
}
