//! Interactive menu for rendering patrol maps.
//!
//! Prompts for a data source and output path once, then lets the user
//! re-render with different cluster counts. Reloads are served from the
//! session's [`LoadCache`].

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, Select};
use patrol_map_cli_utils::MultiProgress;
use patrol_map_pipeline::{DEFAULT_CLUSTERS, DEFAULT_RENDER_LIMIT, MAX_CLUSTERS, MIN_CLUSTERS};
use patrol_map_source::cache::LoadCache;
use patrol_map_source::registry::{self, DEFAULT_DATASET};

use crate::pipeline::{self, DEFAULT_OUTPUT, LoadArgs};

fn validate_clusters(k: &usize) -> Result<(), String> {
    if (MIN_CLUSTERS..=MAX_CLUSTERS).contains(k) {
        Ok(())
    } else {
        Err(format!(
            "Choose between {MIN_CLUSTERS} and {MAX_CLUSTERS} patrol centers"
        ))
    }
}

/// Runs the interactive render loop.
///
/// Pipeline failures (empty dataset, too few incidents) are printed and the
/// user may try again.
///
/// # Errors
///
/// Returns an error if a prompt fails.
#[allow(clippy::future_not_send)]
pub async fn run(
    cache: &LoadCache,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Patrol Map");
    println!();

    let datasets = registry::all_datasets();
    let mut labels: Vec<String> = datasets
        .iter()
        .map(|d| format!("{} ({})", d.name, d.uri()))
        .collect();
    labels.push("Local CSV file".to_string());

    let idx = Select::new()
        .with_prompt("Where should incidents be loaded from?")
        .items(&labels)
        .default(0)
        .interact()?;

    let (dataset, file) = match datasets.get(idx) {
        Some(dataset) => (dataset.id.clone(), None),
        None => {
            let path: String = Input::new()
                .with_prompt("CSV file path")
                .interact_text()?;
            (DEFAULT_DATASET.to_string(), Some(PathBuf::from(path)))
        }
    };

    let output: String = Input::new()
        .with_prompt("Output GeoJSON path")
        .default(DEFAULT_OUTPUT.to_string())
        .interact_text()?;

    let mut clusters = DEFAULT_CLUSTERS;

    loop {
        clusters = Input::new()
            .with_prompt(format!(
                "Number of patrol centers ({MIN_CLUSTERS}-{MAX_CLUSTERS})"
            ))
            .default(clusters)
            .validate_with(validate_clusters)
            .interact_text()?;

        let args = LoadArgs {
            dataset: dataset.clone(),
            file: file.clone(),
            clusters,
            limit: DEFAULT_RENDER_LIMIT,
            clamp: false,
        };

        if let Err(e) = pipeline::render(cache, &args, Path::new(&output), multi).await {
            eprintln!("Error: {e}");
        }

        let again = Confirm::new()
            .with_prompt("Try a different number of patrol centers?")
            .default(false)
            .interact()?;

        if !again {
            break;
        }
    }

    Ok(())
}
