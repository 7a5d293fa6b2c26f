//! Options for engine commands.

use std::path::PathBuf;

/// Object selection shared by bulk commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkOptions {
    /// Apply to every object of the kind.
    pub all: bool,
    /// Apply to the most recently created object.
    pub latest: bool,
    /// Drop names that do not resolve instead of failing.
    pub ignore: bool,
    /// `key=value` filters narrowing the selection.
    pub filters: Vec<String>,
}

/// Options for stopping containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopOptions {
    /// Object selection.
    pub bulk: BulkOptions,
    /// Grace period in seconds; the engine default when unset.
    pub timeout: Option<u32>,
    /// Files whose first line is a container ID to stop.
    pub cidfiles: Vec<PathBuf>,
}

/// Options for signalling containers or pods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KillOptions {
    /// Object selection.
    pub bulk: BulkOptions,
    /// Signal number; the engine default when unset.
    pub signal: Option<i32>,
}

/// Options for restarting containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestartOptions {
    /// Object selection.
    pub bulk: BulkOptions,
    /// Grace period in seconds; the engine default when unset.
    pub timeout: Option<u32>,
    /// Only restart containers that are currently running.
    pub running: bool,
}

/// Options for removing containers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RmOptions {
    /// Object selection.
    pub bulk: BulkOptions,
    /// Remove running containers, and evict names that fail to resolve.
    pub force: bool,
    /// Also remove anonymous volumes.
    pub volumes: bool,
    /// Remove dependent containers first.
    pub depend: bool,
    /// Grace period for forced removal, in seconds.
    pub timeout: Option<u32>,
}

/// Options for stopping pods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodStopOptions {
    /// Object selection.
    pub bulk: BulkOptions,
    /// Grace period in seconds; the engine default when unset.
    pub timeout: Option<u32>,
}

/// Options for removing pods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodRmOptions {
    /// Object selection.
    pub bulk: BulkOptions,
    /// Remove pods with running containers.
    pub force: bool,
    /// Grace period for forced removal, in seconds.
    pub timeout: Option<u32>,
}

/// Options for removing volumes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeRmOptions {
    /// Object selection.
    pub bulk: BulkOptions,
    /// Remove volumes in use, together with the containers using them.
    pub force: bool,
}

/// Options for listing objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Include containers that are not running.
    pub all: bool,
    /// `key=value` filters.
    pub filters: Vec<String>,
}
