//! `crl pause` / `crl unpause` — Freeze and thaw containers.

use clap::Args;
use corral_engine::Engine;

use super::BulkArgs;
use crate::output;

/// Arguments for the `pause` and `unpause` commands.
#[derive(Args, Debug)]
pub struct PauseArgs {
    /// Container names or IDs.
    pub containers: Vec<String>,

    /// Selection flags.
    #[command(flatten)]
    pub bulk: BulkArgs,
}

/// Executes the `pause` command.
///
/// # Errors
///
/// Returns an error if the selection is invalid or any container failed.
pub async fn pause(engine: &Engine, args: PauseArgs) -> anyhow::Result<()> {
    let reports = engine
        .container_pause(&args.containers, &args.bulk.into())
        .await?;
    output::print_reports(&reports)
}

/// Executes the `unpause` command.
///
/// # Errors
///
/// Returns an error if the selection is invalid or any container failed.
pub async fn unpause(engine: &Engine, args: PauseArgs) -> anyhow::Result<()> {
    let reports = engine
        .container_unpause(&args.containers, &args.bulk.into())
        .await?;
    output::print_reports(&reports)
}
