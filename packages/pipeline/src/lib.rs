#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Load → clean → cluster → bound pipeline for patrol planning maps.
//!
//! The pipeline turns raw incident rows into a [`RenderSet`]:
//!
//! 1. [`dedup::clean`] drops rows without coordinates and exact duplicates
//!    on `(latitude, longitude, category)`.
//! 2. [`cluster::cluster`] partitions the cleaned points into `k` groups
//!    with seeded k-means and computes one center per group.
//! 3. [`bound::bound`] caps the number of points handed to the map.
//!
//! Every call recomputes from scratch. Nothing is cached or persisted here.

pub mod bound;
pub mod cluster;
pub mod dedup;
pub mod kmeans;

use patrol_map_incident_models::{IncidentRecord, RenderSet};

pub use bound::bound;
pub use cluster::{Clustering, cluster};
pub use dedup::clean;
pub use kmeans::KmeansConfig;

/// Smallest cluster count offered to users.
pub const MIN_CLUSTERS: usize = 3;

/// Largest cluster count offered to users.
pub const MAX_CLUSTERS: usize = 20;

/// Cluster count used when none is requested.
pub const DEFAULT_CLUSTERS: usize = 10;

/// Maximum number of incident markers forwarded to the map.
pub const DEFAULT_RENDER_LIMIT: usize = 10_000;

/// Errors that can occur while running the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The record store produced no rows.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// More clusters were requested than there are cleaned points.
    #[error("Not enough data for {requested} clusters: only {available} points available")]
    InsufficientData {
        /// Requested cluster count.
        requested: usize,
        /// Number of cleaned points.
        available: usize,
    },

    /// A cluster count of zero was requested.
    #[error("Invalid cluster count {requested}: must be at least 1")]
    InvalidClusterCount {
        /// Requested cluster count.
        requested: usize,
    },
}

/// What the driver does when `k` exceeds the number of cleaned points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClusterPolicy {
    /// Surface [`PipelineError::InsufficientData`].
    #[default]
    Strict,
    /// Lower `k` to the number of cleaned points before clustering.
    ClampToAvailable,
}

/// Settings for a single pipeline invocation.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Requested number of clusters.
    pub clusters: usize,
    /// Maximum number of points in the render set.
    pub render_limit: usize,
    /// Handling of `clusters` larger than the cleaned dataset.
    pub policy: ClusterPolicy,
    /// Seed and convergence settings for k-means.
    pub kmeans: KmeansConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            clusters: DEFAULT_CLUSTERS,
            render_limit: DEFAULT_RENDER_LIMIT,
            policy: ClusterPolicy::default(),
            kmeans: KmeansConfig::default(),
        }
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Points and centers for the map.
    pub render: RenderSet,
    /// Number of input rows.
    pub input: usize,
    /// Number of rows left after deduplication.
    pub cleaned: usize,
    /// Cluster count actually used.
    pub clusters: usize,
    /// Number of k-means iterations run.
    pub iterations: usize,
    /// Sum of squared distances from each point to its center.
    pub inertia: f64,
}

impl PipelineOutput {
    /// Number of points in the render set.
    #[must_use]
    pub fn rendered(&self) -> usize {
        self.render.points.len()
    }
}

/// Clamps a user-supplied cluster count into
/// [`MIN_CLUSTERS`]`..=`[`MAX_CLUSTERS`].
#[must_use]
pub fn clamp_clusters(requested: usize) -> usize {
    requested.clamp(MIN_CLUSTERS, MAX_CLUSTERS)
}

/// Lowers `requested` to `available` when there are fewer points than
/// clusters.
#[must_use]
pub fn clamp_to_available(requested: usize, available: usize) -> usize {
    requested.min(available)
}

/// Runs clean → cluster → bound over `records`.
///
/// # Errors
///
/// * [`PipelineError::EmptyDataset`] if `records` is empty or no row has
///   a usable coordinate.
/// * [`PipelineError::InsufficientData`] if the strict policy is in effect
///   and fewer cleaned points remain than requested clusters.
/// * [`PipelineError::InvalidClusterCount`] if the effective cluster count
///   is zero.
pub fn run(
    records: impl IntoIterator<Item = IncidentRecord>,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    let mut records = records.into_iter().peekable();
    if records.peek().is_none() {
        return Err(PipelineError::EmptyDataset);
    }

    let mut input = 0usize;
    let cleaned = clean(records.inspect(|_| input += 1));
    let available = cleaned.len();

    if available == 0 {
        log::warn!("None of the {input} rows has a usable coordinate");
        return Err(PipelineError::EmptyDataset);
    }

    let clusters = match config.policy {
        ClusterPolicy::Strict => config.clusters,
        ClusterPolicy::ClampToAvailable => {
            let k = clamp_to_available(config.clusters, available);
            if k < config.clusters {
                log::warn!(
                    "Only {available} points available, reducing clusters from {} to {k}",
                    config.clusters
                );
            }
            k
        }
    };

    let clustering = cluster(cleaned, clusters, &config.kmeans)?;
    let iterations = clustering.iterations;
    let inertia = clustering.inertia;

    let render = bound(clustering.points, clustering.centers, config.render_limit);

    log::info!(
        "Pipeline complete: {input} rows -> {available} cleaned -> {} rendered in {clusters} clusters",
        render.points.len()
    );

    Ok(PipelineOutput {
        render,
        input,
        cleaned: available,
        clusters,
        iterations,
        inertia,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(lat: f64, lng: f64, category: &str, count: usize) -> Vec<IncidentRecord> {
        (0..count)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let offset = i as f64 * 0.001;
                IncidentRecord::new(Some(lat + offset), Some(lng - offset), category)
            })
            .collect()
    }

    #[test]
    fn empty_input_halts_before_cleaning() {
        let err = run(Vec::<IncidentRecord>::new(), &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }

    #[test]
    fn accepts_borrowed_records_without_consuming_them() {
        let records = region(12.97, 77.59, "Theft", 8);
        let config = PipelineConfig {
            clusters: 3,
            ..PipelineConfig::default()
        };

        let output = run(records.iter().cloned(), &config).unwrap();
        assert_eq!(output.input, 8);
        assert_eq!(output.cleaned, 8);
        assert_eq!(records.len(), 8);
    }

    #[test]
    fn strict_policy_surfaces_insufficient_data() {
        let records = region(12.97, 77.59, "Theft", 4);
        let config = PipelineConfig {
            clusters: 10,
            ..PipelineConfig::default()
        };

        let err = run(records, &config).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InsufficientData {
                requested: 10,
                available: 4
            }
        ));
    }

    #[test]
    fn clamp_policy_reduces_clusters_to_available_points() {
        let records = region(12.97, 77.59, "Theft", 4);
        let config = PipelineConfig {
            clusters: 10,
            policy: ClusterPolicy::ClampToAvailable,
            ..PipelineConfig::default()
        };

        let output = run(records, &config).unwrap();
        assert_eq!(output.clusters, 4);
        assert_eq!(output.render.centers.len(), 4);
        assert_eq!(output.render.points.len(), 4);
    }

    #[test]
    fn all_rows_missing_coordinates_is_an_empty_dataset() {
        let records = vec![
            IncidentRecord::new(None, Some(77.5), "Theft"),
            IncidentRecord::new(Some(12.9), None, "Theft"),
        ];

        for policy in [ClusterPolicy::Strict, ClusterPolicy::ClampToAvailable] {
            let config = PipelineConfig {
                clusters: 3,
                policy,
                ..PipelineConfig::default()
            };

            let err = run(records.clone(), &config).unwrap_err();
            assert!(
                matches!(err, PipelineError::EmptyDataset),
                "{policy:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn run_reports_counts_through_each_stage() {
        let mut records = region(12.97, 77.59, "Theft", 30);
        records.extend(region(28.61, 77.20, "Robbery", 30));
        records.push(records[0].clone());
        records.push(IncidentRecord::new(None, None, "Theft"));

        let config = PipelineConfig {
            clusters: 3,
            render_limit: 25,
            ..PipelineConfig::default()
        };

        let output = run(records, &config).unwrap();
        assert_eq!(output.input, 62);
        assert_eq!(output.cleaned, 60);
        assert_eq!(output.clusters, 3);
        assert_eq!(output.render.points.len(), 25);
        assert_eq!(output.render.centers.len(), 3);
        assert!(output.iterations >= 1);
        assert!(output.inertia >= 0.0);
    }

    #[test]
    fn clamps_user_cluster_count_into_range() {
        assert_eq!(clamp_clusters(0), MIN_CLUSTERS);
        assert_eq!(clamp_clusters(7), 7);
        assert_eq!(clamp_clusters(99), MAX_CLUSTERS);
        assert_eq!(clamp_to_available(10, 4), 4);
        assert_eq!(clamp_to_available(3, 4), 3);
    }
}
