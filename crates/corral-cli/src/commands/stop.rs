//! `crl stop` — Stop containers and clean up their resources.

use std::path::PathBuf;

use clap::Args;
use corral_engine::{Engine, StopOptions};

use super::BulkArgs;
use crate::output;

/// Arguments for the `stop` command.
#[derive(Args, Debug)]
pub struct StopArgs {
    /// Container names or IDs to stop.
    pub containers: Vec<String>,

    /// Selection flags.
    #[command(flatten)]
    pub bulk: BulkArgs,

    /// Seconds to wait before killing the container.
    #[arg(short, long)]
    pub time: Option<u32>,

    /// Read a container ID from this file.
    #[arg(long = "cidfile")]
    pub cidfiles: Vec<PathBuf>,
}

/// Executes the `stop` command.
///
/// # Errors
///
/// Returns an error if the selection is invalid or any container failed.
pub async fn execute(engine: &Engine, args: StopArgs) -> anyhow::Result<()> {
    let opts = StopOptions {
        bulk: args.bulk.into(),
        timeout: args.time,
        cidfiles: args.cidfiles,
    };
    let reports = engine.container_stop(&args.containers, &opts).await?;
    output::print_reports(&reports)
}
