//! `crl kill` — Send a signal to containers.

use clap::Args;
use corral_engine::{Engine, KillOptions};

use super::BulkArgs;
use crate::output;

/// Arguments for the `kill` command.
#[derive(Args, Debug)]
pub struct KillArgs {
    /// Names or IDs to signal.
    pub containers: Vec<String>,

    /// Selection flags.
    #[command(flatten)]
    pub bulk: BulkArgs,

    /// Signal to send, by number or name (`KILL`, `SIGTERM`, ...).
    #[arg(short, long, value_parser = parse_signal)]
    pub signal: Option<i32>,
}

impl KillArgs {
    /// Converts the arguments into engine options.
    pub fn into_options(self) -> (Vec<String>, KillOptions) {
        let opts = KillOptions {
            bulk: self.bulk.into(),
            signal: self.signal,
        };
        (self.containers, opts)
    }
}

/// Executes the `kill` command.
///
/// # Errors
///
/// Returns an error if the selection is invalid or any container failed.
pub async fn execute(engine: &Engine, args: KillArgs) -> anyhow::Result<()> {
    let (names, opts) = args.into_options();
    let reports = engine.container_kill(&names, &opts).await?;
    output::print_reports(&reports)
}

const SIGNALS: &[(&str, i32)] = &[
    ("HUP", 1),
    ("INT", 2),
    ("QUIT", 3),
    ("KILL", 9),
    ("USR1", 10),
    ("USR2", 12),
    ("TERM", 15),
    ("CONT", 18),
    ("STOP", 19),
];

/// Parses a signal number or name, with or without the `SIG` prefix.
fn parse_signal(raw: &str) -> Result<i32, String> {
    if let Ok(number) = raw.parse::<i32>() {
        return Ok(number);
    }
    let upper = raw.to_ascii_uppercase();
    let name = upper.strip_prefix("SIG").unwrap_or(&upper);
    SIGNALS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, number)| *number)
        .ok_or_else(|| format!("invalid signal: {raw}"))
}
