//! System-wide constants and default paths.

use std::path::PathBuf;
use std::sync::OnceLock;

/// Default base directory for corral data on Linux with root access.
pub const SYSTEM_DATA_DIR: &str = "/var/lib/corral";

/// Returns the data directory, preferring `$HOME/.corral` for non-root
/// environments and falling back to `/var/lib/corral`.
fn resolve_data_dir() -> PathBuf {
    if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
        let user_dir = PathBuf::from(home).join(".corral");
        if std::fs::create_dir_all(&user_dir).is_ok() {
            return user_dir;
        }
    }
    PathBuf::from(SYSTEM_DATA_DIR)
}

static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Returns the resolved data directory for this session.
pub fn data_dir() -> &'static PathBuf {
    DATA_DIR.get_or_init(resolve_data_dir)
}

/// Returns the default state file path.
pub fn default_state_file() -> PathBuf {
    data_dir().join("state.json")
}

/// Returns the default engine configuration file path.
pub fn default_config_file() -> PathBuf {
    data_dir().join("engine.json")
}

/// Seconds a container gets between the stop signal and `SIGKILL`.
pub const DEFAULT_STOP_TIMEOUT_SECS: u32 = 10;

/// Signal sent by `kill` when none is given (`SIGKILL`).
pub const DEFAULT_KILL_SIGNAL: i32 = 9;

/// Signal sent first by a graceful stop (`SIGTERM`).
pub const STOP_SIGNAL: i32 = 15;

/// Bulk-operation workers started per host CPU.
pub const WORKERS_PER_CPU: usize = 3;

/// SHA-256 digest length in hex characters.
pub const SHA256_HEX_LENGTH: usize = 64;

/// Prefix of a network mode that joins another container's namespace.
pub const CONTAINER_NETWORK_MODE_PREFIX: &str = "container:";

/// Image tag implied when a reference has none.
pub const DEFAULT_IMAGE_TAG: &str = "latest";

/// Application name used in CLI output and state files.
pub const APP_NAME: &str = "corral";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "crl";
