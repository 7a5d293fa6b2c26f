//! `crl ps` — List containers.

use clap::Args;
use corral_engine::{Engine, ListOptions};

use crate::output;

/// Arguments for the `ps` command.
#[derive(Args, Debug)]
pub struct PsArgs {
    /// Show all containers (including stopped).
    #[arg(short, long)]
    pub all: bool,

    /// Only show containers matching `key=value` filters.
    #[arg(long = "filter")]
    pub filters: Vec<String>,

    /// Only print container IDs.
    #[arg(short, long)]
    pub quiet: bool,
}

/// Executes the `ps` command.
///
/// # Errors
///
/// Returns an error if a filter is invalid or the store cannot be read.
pub async fn execute(engine: &Engine, args: PsArgs) -> anyhow::Result<()> {
    let opts = ListOptions {
        all: args.all,
        filters: args.filters,
    };
    let containers = engine.container_list(&opts).await?;
    output::print_containers(&containers, args.quiet);
    Ok(())
}
