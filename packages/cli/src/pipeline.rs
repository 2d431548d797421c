//! Load, cluster, and output flow shared by the subcommands and the
//! interactive menu.
//!
//! Raw loads go through a [`LoadCache`], so re-running with a different
//! cluster count in the same session does not fetch the dataset again.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use patrol_map_cli_utils::{IndicatifProgress, MultiProgress};
use patrol_map_incident_models::ClusterCenter;
use patrol_map_pipeline::{
    ClusterPolicy, DEFAULT_CLUSTERS, DEFAULT_RENDER_LIMIT, PipelineConfig, PipelineError,
    PipelineOutput, clamp_clusters,
};
use patrol_map_render::RenderError;
use patrol_map_source::cache::LoadCache;
use patrol_map_source::config::StoreConfig;
use patrol_map_source::file::FileStore;
use patrol_map_source::progress::ProgressCallback;
use patrol_map_source::registry::{self, DEFAULT_DATASET};
use patrol_map_source::s3::S3Store;
use patrol_map_source::{RecordStore, SourceError};

/// Default GeoJSON output path.
pub const DEFAULT_OUTPUT: &str = "patrol_map.geojson";

/// User-facing errors from a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The store failed to produce rows.
    #[error("Failed to load data: {0}")]
    Load(#[from] SourceError),

    /// The store produced no rows.
    #[error("Failed to load data: the dataset is empty")]
    EmptyDataset,

    /// Fewer usable incidents than requested clusters.
    #[error("Not enough data for {requested} clusters: only {available} usable incidents")]
    NotEnoughData {
        /// Requested cluster count.
        requested: usize,
        /// Incidents left after cleaning.
        available: usize,
    },

    /// No embedded dataset has this id.
    #[error("Unknown dataset '{0}' (run `patrol_map datasets` to list them)")]
    UnknownDataset(String),

    /// Any other pipeline failure.
    #[error(transparent)]
    Pipeline(PipelineError),

    /// Writing the map failed.
    #[error("Failed to write map: {0}")]
    Render(#[from] RenderError),
}

impl From<PipelineError> for RunError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::EmptyDataset => Self::EmptyDataset,
            PipelineError::InsufficientData {
                requested,
                available,
            } => Self::NotEnoughData {
                requested,
                available,
            },
            other @ PipelineError::InvalidClusterCount { .. } => Self::Pipeline(other),
        }
    }
}

/// Where to load incidents from and how to cluster them.
#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    /// Dataset definition id (see `patrol_map datasets`)
    #[arg(long, default_value = DEFAULT_DATASET)]
    pub dataset: String,

    /// Read the dataset from a local CSV file instead of S3
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Number of patrol centers (clamped to 3-20)
    #[arg(long, default_value_t = DEFAULT_CLUSTERS)]
    pub clusters: usize,

    /// Maximum number of incidents drawn on the map
    #[arg(long, default_value_t = DEFAULT_RENDER_LIMIT)]
    pub limit: usize,

    /// Use fewer clusters instead of failing when there are fewer usable
    /// incidents than clusters
    #[arg(long)]
    pub clamp: bool,
}

impl LoadArgs {
    /// Builds the pipeline settings, clamping the cluster count into the
    /// supported range.
    #[must_use]
    pub fn pipeline_config(&self) -> PipelineConfig {
        let clusters = clamp_clusters(self.clusters);
        if clusters != self.clusters {
            log::warn!(
                "Cluster count {} is out of range, using {clusters}",
                self.clusters
            );
        }

        PipelineConfig {
            clusters,
            render_limit: self.limit,
            policy: if self.clamp {
                ClusterPolicy::ClampToAvailable
            } else {
                ClusterPolicy::Strict
            },
            ..PipelineConfig::default()
        }
    }

    /// Resolves the record store for these arguments.
    ///
    /// # Errors
    ///
    /// * [`RunError::UnknownDataset`] if `dataset` is not embedded.
    /// * [`RunError::Load`] if S3 credentials are missing from the
    ///   environment.
    pub fn store(&self) -> Result<Box<dyn RecordStore>, RunError> {
        let dataset = registry::find_dataset(&self.dataset)
            .ok_or_else(|| RunError::UnknownDataset(self.dataset.clone()))?;

        Ok(match &self.file {
            Some(path) => Box::new(FileStore::new(path, dataset)),
            None => Box::new(S3Store::new(&StoreConfig::from_env()?, dataset)),
        })
    }
}

/// Loads records (through `cache`) and runs the pipeline, advancing
/// `progress` once per stage.
///
/// # Errors
///
/// Returns [`RunError`] if loading or clustering fails.
pub async fn execute(
    cache: &LoadCache,
    args: &LoadArgs,
    progress: &dyn ProgressCallback,
) -> Result<PipelineOutput, RunError> {
    let store = args.store()?;

    progress.set_message(format!("Loading {}", store.id()));
    let records = cache.get_or_load(store.as_ref()).await?;
    progress.inc(1);

    progress.set_message(format!("Clustering {} incidents", records.len()));
    let output = patrol_map_pipeline::run(records.iter().cloned(), &args.pipeline_config())?;
    progress.inc(1);

    Ok(output)
}

/// Runs the pipeline and writes the map to `output`.
///
/// # Errors
///
/// Returns [`RunError`] if loading, clustering, or the file write fails.
pub async fn render(
    cache: &LoadCache,
    args: &LoadArgs,
    output: &Path,
    multi: &MultiProgress,
) -> Result<PipelineOutput, RunError> {
    let start = Instant::now();
    let progress = IndicatifProgress::steps_bar(multi, "Rendering", 3);

    let result = execute(cache, args, progress.as_ref()).await?;

    progress.set_message(format!("Writing {}", output.display()));
    patrol_map_render::write_geojson(&result.render, output)?;
    progress.inc(1);
    progress.finish(format!(
        "Rendered {} incidents around {} patrol centers",
        result.rendered(),
        result.render.centers.len()
    ));

    print_summary(&result);
    println!("Map written to {}", output.display());
    log::info!("Render finished in {:.1}s", start.elapsed().as_secs_f64());

    Ok(result)
}

/// Runs the pipeline and prints the patrol centers.
///
/// # Errors
///
/// Returns [`RunError`] if loading or clustering fails.
pub async fn centers(
    cache: &LoadCache,
    args: &LoadArgs,
    multi: &MultiProgress,
) -> Result<PipelineOutput, RunError> {
    let progress = IndicatifProgress::steps_bar(multi, "Clustering", 2);

    let result = execute(cache, args, progress.as_ref()).await?;
    progress.finish(format!("Found {} patrol centers", result.render.centers.len()));

    print_summary(&result);
    print_centers(&result.render.centers);

    Ok(result)
}

fn print_summary(output: &PipelineOutput) {
    println!();
    println!("Incidents loaded:   {}", output.input);
    println!("After cleaning:     {}", output.cleaned);
    println!("Drawn on map:       {}", output.rendered());
    println!(
        "Patrol centers:     {} ({} iterations, inertia {:.6})",
        output.clusters, output.iterations, output.inertia
    );
}

/// Prints one row per center.
pub fn print_centers(centers: &[ClusterCenter]) {
    println!();
    println!(
        "{:<8} {:>12} {:>12} {:>8}",
        "CLUSTER", "LATITUDE", "LONGITUDE", "MEMBERS"
    );
    println!("{}", "-".repeat(43));
    for center in centers {
        println!(
            "{:<8} {:>12.6} {:>12.6} {:>8}",
            center.cluster_id, center.latitude, center.longitude, center.members
        );
    }
}

/// Prints the embedded dataset definitions.
pub fn print_datasets() {
    let datasets = registry::all_datasets();
    println!("{:<20} {:<24} OBJECT", "ID", "NAME");
    println!("{}", "-".repeat(70));
    for dataset in &datasets {
        println!("{:<20} {:<24} {}", dataset.id, dataset.name, dataset.uri());
    }
}
