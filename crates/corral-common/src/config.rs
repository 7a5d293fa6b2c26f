//! Engine configuration model.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{CorralError, Result};

/// Root configuration for the corral engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Path to the object store snapshot.
    pub state_file: PathBuf,
    /// Maximum number of objects a bulk operation works on at once.
    ///
    /// `None` sizes the pool from the host CPU count.
    pub parallelism: Option<usize>,
    /// Default grace period for stop and restart, in seconds.
    pub stop_timeout_secs: u32,
    /// Signal used by `kill` when the caller gives none.
    pub kill_signal: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_file: constants::default_state_file(),
            parallelism: None,
            stop_timeout_secs: constants::DEFAULT_STOP_TIMEOUT_SECS,
            kill_signal: constants::DEFAULT_KILL_SIGNAL,
        }
    }
}

impl EngineConfig {
    /// Loads the configuration from a JSON file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// contains invalid values.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no engine config, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| CorralError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), ?config, "engine config loaded");
        Ok(config)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`CorralError::Config`] for a zero parallelism or a signal
    /// outside `1..=64`.
    pub fn validate(&self) -> Result<()> {
        if self.parallelism == Some(0) {
            return Err(CorralError::Config {
                message: "parallelism must be at least 1".into(),
            });
        }
        if !(1..=64).contains(&self.kill_signal) {
            return Err(CorralError::Config {
                message: format!("kill signal {} is out of range", self.kill_signal),
            });
        }
        Ok(())
    }

    /// Returns the effective worker-pool size for bulk operations.
    #[must_use]
    pub fn worker_limit(&self) -> usize {
        self.parallelism.map_or_else(
            || {
                std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
                    * constants::WORKERS_PER_CPU
            },
            |n| n.max(1),
        )
    }
}
