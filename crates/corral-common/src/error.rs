//! Unified error types for the corral workspace.
//!
//! Every failure carries an [`ErrorKind`] so that callers classify errors
//! with a `match` over kinds instead of comparing messages. Wrapping an
//! error with [`CorralError::context`] keeps its kind visible.

use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::ResourceKind;

/// Closed classification of every error the workspace produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No container matches the given name or ID.
    NoSuchContainer,
    /// No pod matches the given name or ID.
    NoSuchPod,
    /// No volume matches the given name.
    NoSuchVolume,
    /// No network matches the given name or ID.
    NoSuchNetwork,
    /// No image matches the given reference.
    NoSuchImage,
    /// The container was removed while the operation was in flight.
    ContainerRemoved,
    /// The pod was removed while the operation was in flight.
    PodRemoved,
    /// The volume was removed while the operation was in flight.
    VolumeRemoved,
    /// The container is already stopped.
    ContainerStopped,
    /// The container is in a state where the transition does not apply.
    ContainerStateInvalid,
    /// Other containers still depend on the container.
    ContainerExists,
    /// The volume is still referenced by containers.
    VolumeInUse,
    /// Some containers of a pod failed the requested transition.
    PodPartialFailure,
    /// A filter key is not supported for the object kind.
    InvalidFilter,
    /// A caller-supplied value could not be parsed or is out of range.
    InvalidArgument,
    /// The backing store failed.
    Storage,
    /// The engine has been shut down.
    EngineStopped,
    /// The operation was cancelled before the object was dispatched.
    Cancelled,
    /// An I/O operation failed.
    Io,
    /// A configuration value is invalid.
    Config,
    /// Serialization or deserialization failed.
    Serialization,
}

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CorralError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A required object was not found.
    #[error("no such {kind}: {id}")]
    NotFound {
        /// Kind of the missing object.
        kind: ResourceKind,
        /// Name or ID the caller asked for.
        id: String,
    },

    /// The object existed but has been removed.
    #[error("{kind} {id} has already been removed")]
    Removed {
        /// Kind of the removed object.
        kind: ResourceKind,
        /// ID of the removed object.
        id: String,
    },

    /// The container is already stopped.
    #[error("container {id} is already stopped")]
    AlreadyStopped {
        /// Container ID.
        id: String,
    },

    /// The container's state does not allow the requested transition.
    #[error("container {id} is {state}, cannot {operation}")]
    InvalidState {
        /// Container ID.
        id: String,
        /// Current state, as displayed to users.
        state: String,
        /// Operation that was refused.
        operation: &'static str,
    },

    /// Other containers depend on this one.
    #[error("container {id} has dependent containers which must be removed before it: {}", .dependents.join(", "))]
    HasDependents {
        /// Container ID.
        id: String,
        /// IDs of the dependent containers.
        dependents: Vec<String>,
    },

    /// The volume is referenced by containers.
    #[error("volume {name} is being used by the following container(s): {}", .users.join(", "))]
    VolumeInUse {
        /// Volume name.
        name: String,
        /// IDs of the containers using it.
        users: Vec<String>,
    },

    /// One or more containers of a pod failed a transition.
    #[error("error {operation} some containers of pod {pod}:{}", format_failures(.failures))]
    PodPartialFailure {
        /// Pod ID.
        pod: String,
        /// Operation in progressive form, e.g. `stopping`.
        operation: &'static str,
        /// Container ID and error for every failed member.
        failures: Vec<(String, CorralError)>,
    },

    /// A filter key is not supported for the object kind.
    #[error("{key} is an invalid filter")]
    InvalidFilter {
        /// The rejected filter key.
        key: String,
    },

    /// A caller-supplied value is invalid.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the invalid value.
        message: String,
    },

    /// The backing store failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the failure.
        message: String,
    },

    /// The engine was shut down.
    #[error("engine has been shut down")]
    EngineStopped,

    /// Cancellation arrived before the object was dispatched.
    #[error("operation on {id} cancelled")]
    Cancelled {
        /// ID of the object that was never attempted.
        id: String,
    },

    /// Another error annotated with the object and operation it concerns.
    #[error("{context}: {source}")]
    Context {
        /// Human-readable context.
        context: String,
        /// Wrapped error.
        source: Box<CorralError>,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

impl CorralError {
    /// Returns the classification of this error, looking through any
    /// [`CorralError::Context`] wrappers.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::Config { .. } => ErrorKind::Config,
            Self::NotFound { kind, .. } => match kind {
                ResourceKind::Container => ErrorKind::NoSuchContainer,
                ResourceKind::Pod => ErrorKind::NoSuchPod,
                ResourceKind::Volume => ErrorKind::NoSuchVolume,
                ResourceKind::Network => ErrorKind::NoSuchNetwork,
                ResourceKind::Image => ErrorKind::NoSuchImage,
            },
            Self::Removed { kind, .. } => match kind {
                ResourceKind::Container => ErrorKind::ContainerRemoved,
                ResourceKind::Pod => ErrorKind::PodRemoved,
                ResourceKind::Volume => ErrorKind::VolumeRemoved,
                ResourceKind::Network => ErrorKind::NoSuchNetwork,
                ResourceKind::Image => ErrorKind::NoSuchImage,
            },
            Self::AlreadyStopped { .. } => ErrorKind::ContainerStopped,
            Self::InvalidState { .. } => ErrorKind::ContainerStateInvalid,
            Self::HasDependents { .. } => ErrorKind::ContainerExists,
            Self::VolumeInUse { .. } => ErrorKind::VolumeInUse,
            Self::PodPartialFailure { .. } => ErrorKind::PodPartialFailure,
            Self::InvalidFilter { .. } => ErrorKind::InvalidFilter,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::EngineStopped => ErrorKind::EngineStopped,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Context { source, .. } => source.kind(),
            Self::Serialization { .. } => ErrorKind::Serialization,
        }
    }

    /// Returns `true` if this error is of the given kind.
    #[must_use]
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// Returns `true` for any "no such object" kind.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NoSuchContainer
                | ErrorKind::NoSuchPod
                | ErrorKind::NoSuchVolume
                | ErrorKind::NoSuchNetwork
                | ErrorKind::NoSuchImage
        )
    }

    /// Returns `true` when the container is gone, whether it never existed
    /// or was removed concurrently.
    #[must_use]
    pub fn is_container_gone(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::NoSuchContainer | ErrorKind::ContainerRemoved
        )
    }

    /// Wraps this error with additional context.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a [`CorralError::NotFound`] error.
    #[must_use]
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Shorthand for a [`CorralError::InvalidArgument`] error.
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Adds context to the error side of a [`Result`].
pub trait ResultExt<T> {
    /// Wraps the error, if any, with lazily built context.
    ///
    /// # Errors
    ///
    /// Returns the original error wrapped in [`CorralError::Context`].
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|e| e.context(f()))
    }
}

fn format_failures(failures: &[(String, CorralError)]) -> String {
    let mut out = String::new();
    for (id, err) in failures {
        let _ = write!(out, "\n  {id}: {err}");
    }
    out
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CorralError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_kind_follows_resource() {
        let err = CorralError::not_found(ResourceKind::Pod, "web");
        assert_eq!(err.kind(), ErrorKind::NoSuchPod);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "no such pod: web");
    }

    #[test]
    fn context_preserves_kind() {
        let err = CorralError::AlreadyStopped { id: "abc".into() }
            .context("stopping container abc")
            .context("bulk stop");
        assert!(err.is(ErrorKind::ContainerStopped));
        assert!(err.to_string().starts_with("bulk stop: stopping container abc"));
    }

    #[test]
    fn invalid_filter_message() {
        let err = CorralError::InvalidFilter { key: "foo".into() };
        assert_eq!(err.to_string(), "foo is an invalid filter");
        assert_eq!(err.kind(), ErrorKind::InvalidFilter);
    }

    #[test]
    fn removed_and_missing_containers_are_gone() {
        let removed = CorralError::Removed {
            kind: ResourceKind::Container,
            id: "a".into(),
        };
        let missing = CorralError::not_found(ResourceKind::Container, "b");
        let pod_missing = CorralError::not_found(ResourceKind::Pod, "c");
        assert!(removed.is_container_gone());
        assert!(missing.is_container_gone());
        assert!(!pod_missing.is_container_gone());
    }

    #[test]
    fn pod_partial_failure_lists_members() {
        let err = CorralError::PodPartialFailure {
            pod: "p1".into(),
            operation: "stopping",
            failures: vec![(
                "c1".into(),
                CorralError::Storage {
                    message: "disk full".into(),
                },
            )],
        };
        let msg = err.to_string();
        assert!(msg.contains("error stopping some containers of pod p1"));
        assert!(msg.contains("c1: storage error: disk full"));
    }

    #[test]
    fn result_ext_wraps_errors_only() {
        let ok: Result<u8> = Ok(1);
        assert_eq!(ok.with_context(|| "unused").unwrap(), 1);

        let err: Result<u8> = Err(CorralError::EngineStopped);
        let wrapped = err.with_context(|| "listing pods").unwrap_err();
        assert_eq!(wrapped.kind(), ErrorKind::EngineStopped);
        assert_eq!(wrapped.to_string(), "listing pods: engine has been shut down");
    }
}
