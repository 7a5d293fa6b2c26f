//! `crl prune` — Remove every stopped container.

use clap::Args;
use corral_engine::Engine;

use crate::output;

/// Arguments for prune commands.
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Only prune objects matching `key=value` filters.
    #[arg(long = "filter")]
    pub filters: Vec<String>,
}

/// Executes the container `prune` command.
///
/// # Errors
///
/// Returns an error if a filter is invalid or any container failed.
pub async fn execute(engine: &Engine, args: PruneArgs) -> anyhow::Result<()> {
    let reports = engine.container_prune(&args.filters).await?;
    output::print_prune(&reports)
}
