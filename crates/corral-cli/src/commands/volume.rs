//! `crl volume` — Bulk operations on volumes.

use clap::{Args, Subcommand};
use corral_engine::{Engine, VolumeRmOptions};

use super::BulkArgs;
use super::prune::PruneArgs;
use crate::output;

/// Arguments for the `volume` command.
#[derive(Args, Debug)]
pub struct VolumeArgs {
    /// Volume subcommand.
    #[command(subcommand)]
    pub command: VolumeCommand,
}

/// Volume subcommands.
#[derive(Subcommand, Debug)]
pub enum VolumeCommand {
    /// List volumes.
    Ls(PruneArgs),
    /// Remove volumes.
    Rm(VolumeRmArgs),
    /// Remove every unused volume.
    Prune(PruneArgs),
}

/// Arguments for `volume rm`.
#[derive(Args, Debug)]
pub struct VolumeRmArgs {
    /// Volume names.
    pub volumes: Vec<String>,

    /// Selection flags.
    #[command(flatten)]
    pub bulk: BulkArgs,

    /// Remove volumes in use, along with the containers using them.
    #[arg(short, long)]
    pub force: bool,
}

/// Executes a `volume` subcommand.
///
/// # Errors
///
/// Returns an error if the selection is invalid or any volume failed.
pub async fn execute(engine: &Engine, args: VolumeArgs) -> anyhow::Result<()> {
    match args.command {
        VolumeCommand::Ls(args) => {
            let volumes = engine.volume_list(&args.filters).await?;
            output::print_volumes(&volumes);
            Ok(())
        }
        VolumeCommand::Rm(args) => {
            let opts = VolumeRmOptions {
                bulk: args.bulk.into(),
                force: args.force,
            };
            output::print_reports(&engine.volume_rm(&args.volumes, &opts).await?)
        }
        VolumeCommand::Prune(args) => {
            output::print_prune(&engine.volume_prune(&args.filters).await?)
        }
    }
}
