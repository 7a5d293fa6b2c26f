//! `crl pod` — Bulk operations on pods.

use clap::{Args, Subcommand};
use corral_engine::{Engine, PodRmOptions, PodStopOptions};

use super::BulkArgs;
use super::kill::KillArgs;
use super::prune::PruneArgs;
use crate::output;

/// Arguments for the `pod` command.
#[derive(Args, Debug)]
pub struct PodArgs {
    /// Pod subcommand.
    #[command(subcommand)]
    pub command: PodCommand,
}

/// Pod subcommands.
#[derive(Subcommand, Debug)]
pub enum PodCommand {
    /// List pods.
    Ps(PruneArgs),
    /// Stop every container of the pods.
    Stop(PodStopArgs),
    /// Signal the running containers of the pods.
    Kill(KillArgs),
    /// Pause the running containers of the pods.
    Pause(PodTargetArgs),
    /// Unpause the paused containers of the pods.
    Unpause(PodTargetArgs),
    /// Restart every container of the pods.
    Restart(PodStopArgs),
    /// Remove pods and their containers.
    Rm(PodRmArgs),
    /// Remove every stopped pod.
    Prune(PruneArgs),
}

/// Pod names or IDs plus selection flags.
#[derive(Args, Debug)]
pub struct PodTargetArgs {
    /// Pod names or IDs.
    pub pods: Vec<String>,

    /// Selection flags.
    #[command(flatten)]
    pub bulk: BulkArgs,
}

/// Arguments for `pod stop` and `pod restart`.
#[derive(Args, Debug)]
pub struct PodStopArgs {
    /// Pods to act on.
    #[command(flatten)]
    pub target: PodTargetArgs,

    /// Seconds to wait before killing each container.
    #[arg(short, long)]
    pub time: Option<u32>,
}

impl PodStopArgs {
    fn into_options(self) -> (Vec<String>, PodStopOptions) {
        let opts = PodStopOptions {
            bulk: self.target.bulk.into(),
            timeout: self.time,
        };
        (self.target.pods, opts)
    }
}

/// Arguments for `pod rm`.
#[derive(Args, Debug)]
pub struct PodRmArgs {
    /// Pods to remove.
    #[command(flatten)]
    pub target: PodTargetArgs,

    /// Remove pods with running containers.
    #[arg(short, long)]
    pub force: bool,

    /// Seconds to wait before killing running containers.
    #[arg(short, long)]
    pub time: Option<u32>,
}

/// Executes a `pod` subcommand.
///
/// # Errors
///
/// Returns an error if the selection is invalid or any pod failed.
pub async fn execute(engine: &Engine, args: PodArgs) -> anyhow::Result<()> {
    match args.command {
        PodCommand::Ps(args) => {
            let pods = engine.pod_list(&args.filters).await?;
            output::print_pods(&pods);
            Ok(())
        }
        PodCommand::Stop(args) => {
            let (names, opts) = args.into_options();
            output::print_reports(&engine.pod_stop(&names, &opts).await?)
        }
        PodCommand::Kill(args) => {
            let (names, opts) = args.into_options();
            output::print_reports(&engine.pod_kill(&names, &opts).await?)
        }
        PodCommand::Pause(args) => {
            output::print_reports(&engine.pod_pause(&args.pods, &args.bulk.into()).await?)
        }
        PodCommand::Unpause(args) => {
            output::print_reports(&engine.pod_unpause(&args.pods, &args.bulk.into()).await?)
        }
        PodCommand::Restart(args) => {
            let (names, opts) = args.into_options();
            output::print_reports(&engine.pod_restart(&names, &opts).await?)
        }
        PodCommand::Rm(args) => {
            let opts = PodRmOptions {
                bulk: args.target.bulk.into(),
                force: args.force,
                timeout: args.time,
            };
            output::print_reports(&engine.pod_rm(&args.target.pods, &opts).await?)
        }
        PodCommand::Prune(args) => output::print_prune(&engine.pod_prune(&args.filters).await?),
    }
}
