//! Per-object transitions and benign-error classification.
//!
//! These functions are blocking and run on worker threads, one object
//! each. They decide which runtime failures count as success.

use corral_common::error::{CorralError, ErrorKind, Result};
use corral_runtime::backend::Runtime;
use corral_runtime::container::Container;

/// A container state transition requested in bulk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stop, followed by cleanup.
    Stop,
    /// Deliver a signal.
    Kill,
    /// Freeze.
    Pause,
    /// Thaw.
    Unpause,
    /// Stop if needed, then start.
    Restart,
    /// Release runtime resources after stop.
    Cleanup,
    /// Remove from the store.
    Remove,
}

impl Transition {
    /// Progressive form used in messages, e.g. `stopping`.
    #[must_use]
    pub const fn progressive(self) -> &'static str {
        match self {
            Self::Stop => "stopping",
            Self::Kill => "killing",
            Self::Pause => "pausing",
            Self::Unpause => "unpausing",
            Self::Restart => "restarting",
            Self::Cleanup => "cleaning up",
            Self::Remove => "removing",
        }
    }
}

/// Returns `true` if `kind` counts as success for `transition`.
///
/// `all` is set when the caller selected every object rather than
/// naming them.
#[must_use]
pub const fn is_benign(transition: Transition, kind: ErrorKind, all: bool) -> bool {
    match (transition, kind) {
        (Transition::Stop, ErrorKind::ContainerStopped)
        | (
            Transition::Cleanup | Transition::Remove,
            ErrorKind::NoSuchContainer | ErrorKind::ContainerRemoved,
        ) => true,
        (_, ErrorKind::ContainerStateInvalid) => all,
        _ => false,
    }
}

/// Passes benign failures through as success and annotates the rest.
fn classify(ctr: &Container, transition: Transition, all: bool, result: Result<()>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) if is_benign(transition, err.kind(), all) => {
            tracing::debug!(id = %ctr.id, operation = transition.progressive(), %err, "ignoring benign error");
            Ok(())
        }
        Err(err) => Err(err.context(format!("{} container {}", transition.progressive(), ctr.id))),
    }
}

/// Stops a container and always cleans it up afterwards.
///
/// # Errors
///
/// Returns the stop or cleanup failure unless it is benign.
pub fn stop(runtime: &dyn Runtime, ctr: &Container, timeout: Option<u32>, all: bool) -> Result<()> {
    classify(ctr, Transition::Stop, all, runtime.stop_container(&ctr.id, timeout))?;
    match runtime.cleanup_container(&ctr.id) {
        Err(err) if err.is_container_gone() && ctr.auto_remove => {
            tracing::debug!(id = %ctr.id, "auto-removed container already gone after stop");
            Ok(())
        }
        result => classify(ctr, Transition::Cleanup, all, result),
    }
}

/// Sends `signal` to a container.
///
/// # Errors
///
/// Returns the runtime failure unless it is benign.
pub fn kill(runtime: &dyn Runtime, ctr: &Container, signal: i32, all: bool) -> Result<()> {
    classify(ctr, Transition::Kill, all, runtime.kill_container(&ctr.id, signal))
}

/// Pauses a container.
///
/// # Errors
///
/// Returns the runtime failure unless it is benign.
pub fn pause(runtime: &dyn Runtime, ctr: &Container, all: bool) -> Result<()> {
    classify(ctr, Transition::Pause, all, runtime.pause_container(&ctr.id))
}

/// Unpauses a container.
///
/// # Errors
///
/// Returns the runtime failure unless it is benign.
pub fn unpause(runtime: &dyn Runtime, ctr: &Container, all: bool) -> Result<()> {
    classify(ctr, Transition::Unpause, all, runtime.unpause_container(&ctr.id))
}

/// Restarts a container.
///
/// # Errors
///
/// Returns the runtime failure unless it is benign.
pub fn restart(runtime: &dyn Runtime, ctr: &Container, timeout: Option<u32>, all: bool) -> Result<()> {
    classify(ctr, Transition::Restart, all, runtime.restart_container(&ctr.id, timeout))
}

/// Collects member failures of a pod transition into one error.
///
/// # Errors
///
/// Returns [`CorralError::PodPartialFailure`] when `failures` is not empty.
pub fn pod_outcome(
    pod: &str,
    transition: Transition,
    mut failures: Vec<(String, CorralError)>,
) -> Result<()> {
    if failures.is_empty() {
        return Ok(());
    }
    failures.sort_by(|a, b| a.0.cmp(&b.0));
    Err(CorralError::PodPartialFailure {
        pod: pod.to_string(),
        operation: transition.progressive(),
        failures,
    })
}
