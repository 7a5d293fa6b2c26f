//! `crl restart` — Restart containers.

use clap::Args;
use corral_engine::{Engine, RestartOptions};

use super::BulkArgs;
use crate::output;

/// Arguments for the `restart` command.
#[derive(Args, Debug)]
pub struct RestartArgs {
    /// Container names or IDs to restart.
    pub containers: Vec<String>,

    /// Selection flags.
    #[command(flatten)]
    pub bulk: BulkArgs,

    /// Seconds to wait before killing the container.
    #[arg(short, long)]
    pub time: Option<u32>,

    /// Only restart running containers.
    #[arg(long)]
    pub running: bool,
}

/// Executes the `restart` command.
///
/// # Errors
///
/// Returns an error if the selection is invalid or any container failed.
pub async fn execute(engine: &Engine, args: RestartArgs) -> anyhow::Result<()> {
    let opts = RestartOptions {
        bulk: args.bulk.into(),
        timeout: args.time,
        running: args.running,
    };
    let reports = engine.container_restart(&args.containers, &opts).await?;
    output::print_reports(&reports)
}
