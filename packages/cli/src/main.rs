#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the patrol map toolchain.
//!
//! Loads incidents, groups them into patrol centers, and writes a GeoJSON
//! map or prints the centers. With no subcommand it falls back to an
//! interactive menu.
//!
//! Uses `indicatif-log-bridge` (via [`patrol_map_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod interactive;
mod pipeline;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use patrol_map_cli_utils::MultiProgress;
use patrol_map_source::cache::LoadCache;

use crate::pipeline::{DEFAULT_OUTPUT, LoadArgs};

#[derive(Parser)]
#[command(
    name = "patrol_map",
    about = "Cluster incident locations into patrol centers"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster incidents and write a GeoJSON map
    Render {
        #[command(flatten)]
        load: LoadArgs,
        /// Output GeoJSON path
        #[arg(long, default_value = DEFAULT_OUTPUT)]
        output: PathBuf,
    },
    /// Cluster incidents and print the patrol centers
    Centers {
        #[command(flatten)]
        load: LoadArgs,
    },
    /// List the embedded dataset definitions
    Datasets,
}

#[allow(clippy::future_not_send)]
async fn dispatch(
    command: Option<Commands>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let cache = LoadCache::new();

    let Some(command) = command else {
        return interactive::run(&cache, multi).await;
    };

    match command {
        Commands::Render { load, output } => {
            pipeline::render(&cache, &load, &output, multi).await?;
        }
        Commands::Centers { load } => {
            pipeline::centers(&cache, &load, multi).await?;
        }
        Commands::Datasets => pipeline::print_datasets(),
    }

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let multi = patrol_map_cli_utils::init_logger();
    let cli = Cli::parse();

    match dispatch(cli.command, &multi).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
