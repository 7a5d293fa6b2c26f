//! `crl rm` — Remove containers.

use clap::Args;
use corral_engine::{Engine, RmOptions};

use super::BulkArgs;
use crate::output;

/// Arguments for the `rm` command.
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Container names or IDs to remove.
    pub containers: Vec<String>,

    /// Selection flags.
    #[command(flatten)]
    pub bulk: BulkArgs,

    /// Remove running containers too.
    #[arg(short, long)]
    pub force: bool,

    /// Remove anonymous volumes of the containers.
    #[arg(short, long)]
    pub volumes: bool,

    /// Remove containers that depend on the named ones first.
    #[arg(long)]
    pub depend: bool,

    /// Seconds to wait before killing a running container.
    #[arg(short, long)]
    pub time: Option<u32>,
}

/// Executes the `rm` command.
///
/// # Errors
///
/// Returns an error if the selection is invalid or any container failed.
pub async fn execute(engine: &Engine, args: RmArgs) -> anyhow::Result<()> {
    let opts = RmOptions {
        bulk: args.bulk.into(),
        force: args.force,
        volumes: args.volumes,
        depend: args.depend,
        timeout: args.time,
    };
    let reports = engine.container_rm(&args.containers, &opts).await?;
    output::print_reports(&reports)
}
