//! CLI command definitions and dispatch.

pub mod kill;
pub mod pause;
pub mod pod;
pub mod prune;
pub mod ps;
pub mod restart;
pub mod rm;
pub mod stop;
pub mod volume;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use corral_common::config::EngineConfig;
use corral_common::constants;
use corral_engine::{BulkOptions, Engine};
use corral_runtime::backend::memory::MemoryRuntime;

/// corral — bulk lifecycle operations for containers, pods, and volumes.
#[derive(Parser, Debug)]
#[command(name = "crl", version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Path to the engine configuration file.
    #[arg(long, global = true, env = "CORRAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Path to the object store state file.
    #[arg(long, global = true, env = "CORRAL_STATE_FILE")]
    pub state_file: Option<PathBuf>,

    /// Maximum number of objects worked on at once.
    #[arg(long, global = true, env = "CORRAL_PARALLELISM")]
    pub parallelism: Option<usize>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List containers.
    Ps(ps::PsArgs),
    /// Stop containers.
    Stop(stop::StopArgs),
    /// Send a signal to containers.
    Kill(kill::KillArgs),
    /// Pause containers.
    Pause(pause::PauseArgs),
    /// Unpause containers.
    Unpause(pause::PauseArgs),
    /// Restart containers.
    Restart(restart::RestartArgs),
    /// Remove containers.
    Rm(rm::RmArgs),
    /// Remove all stopped containers.
    Prune(prune::PruneArgs),
    /// Manage pods.
    Pod(pod::PodArgs),
    /// Manage volumes.
    Volume(volume::VolumeArgs),
}

/// Selection flags shared by bulk commands.
#[derive(Args, Debug, Clone, Default)]
pub struct BulkArgs {
    /// Apply to every object.
    #[arg(short, long)]
    pub all: bool,

    /// Apply to the most recently created object.
    #[arg(short, long)]
    pub latest: bool,

    /// Ignore names that do not exist.
    #[arg(short, long)]
    pub ignore: bool,

    /// Narrow the selection with `key=value` filters.
    #[arg(long = "filter")]
    pub filters: Vec<String>,
}

impl From<BulkArgs> for BulkOptions {
    fn from(args: BulkArgs) -> Self {
        Self {
            all: args.all,
            latest: args.latest,
            ignore: args.ignore,
            filters: args.filters,
        }
    }
}

/// Dispatches the parsed CLI command to its handler.
///
/// The engine is shut down, and the object store flushed, whether or not
/// the command succeeds.
///
/// # Errors
///
/// Returns an error if setup fails, the command fails as a whole, or any
/// object failed.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let store = MemoryRuntime::open(&config.state_file)
        .with_context(|| format!("failed to open {}", config.state_file.display()))?;
    let engine = Engine::new(Arc::new(store), config);

    let token = engine.cancellation_token();
    ctrlc::set_handler(move || {
        tracing::warn!("interrupted, waiting for in-flight operations");
        token.cancel();
    })
    .context("failed to set Ctrl+C handler")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let result = runtime.block_on(dispatch(&engine, cli.command));
    let shutdown = engine.shutdown();
    result?;
    shutdown.context("failed to shut down engine")
}

async fn dispatch(engine: &Engine, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Ps(args) => ps::execute(engine, args).await,
        Command::Stop(args) => stop::execute(engine, args).await,
        Command::Kill(args) => kill::execute(engine, args).await,
        Command::Pause(args) => pause::pause(engine, args).await,
        Command::Unpause(args) => pause::unpause(engine, args).await,
        Command::Restart(args) => restart::execute(engine, args).await,
        Command::Rm(args) => rm::execute(engine, args).await,
        Command::Prune(args) => prune::execute(engine, args).await,
        Command::Pod(args) => pod::execute(engine, args).await,
        Command::Volume(args) => volume::execute(engine, args).await,
    }
}

/// Loads the config file, then applies command-line overrides.
fn load_config(cli: &Cli) -> anyhow::Result<EngineConfig> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(constants::default_config_file);
    let mut config = EngineConfig::load(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    if let Some(state_file) = &cli.state_file {
        config.state_file.clone_from(state_file);
    }
    if cli.parallelism.is_some() {
        config.parallelism = cli.parallelism;
    }
    config.validate()?;
    tracing::debug!(?config, "effective configuration");
    Ok(config)
}
