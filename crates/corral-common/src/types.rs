//! Domain primitive types used across the corral workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::CorralError;

/// Derives a fresh 64-character hex identifier.
fn generate_hex_id() -> String {
    let digest = Sha256::digest(uuid::Uuid::new_v4().as_bytes());
    format!("{digest:x}")
}

/// Unique identifier for a container instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a new container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random 64-character hex container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_hex_id())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a pod.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PodId(String);

impl PodId {
    /// Creates a new pod ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random 64-character hex pod ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_hex_id())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kinds of object the engine manages or refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// A container.
    Container,
    /// A pod.
    Pod,
    /// A named volume.
    Volume,
    /// A network.
    Network,
    /// An image.
    Image,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Container => "container",
            Self::Pod => "pod",
            Self::Volume => "volume",
            Self::Network => "network",
            Self::Image => "image",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// State could not be determined.
    Unknown,
    /// Configured in the store but not yet created in the OCI runtime.
    Configured,
    /// Created in the OCI runtime but never started.
    Created,
    /// Actively running.
    Running,
    /// Stopped but not yet cleaned up.
    Stopped,
    /// Processes are frozen.
    Paused,
    /// Exited and cleaned up.
    Exited,
    /// Being removed.
    Removing,
}

impl ContainerState {
    /// Name used when matching `status` filters.
    ///
    /// `configured` is presented as `created` and `stopped` as `exited`.
    #[must_use]
    pub const fn filter_name(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Configured | Self::Created => "created",
            Self::Running => "running",
            Self::Stopped | Self::Exited => "exited",
            Self::Paused => "paused",
            Self::Removing => "removing",
        }
    }

    /// Returns `true` for running or paused containers.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Paused)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Configured | Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Paused => "paused",
            Self::Exited => "exited",
            Self::Removing => "removing",
        };
        f.write_str(name)
    }
}

impl FromStr for ContainerState {
    type Err = CorralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "created" => Ok(Self::Created),
            "running" => Ok(Self::Running),
            "stopped" => Ok(Self::Stopped),
            "paused" => Ok(Self::Paused),
            "exited" => Ok(Self::Exited),
            other => Err(CorralError::invalid_argument(format!(
                "{other} is not a valid container status"
            ))),
        }
    }
}

/// Aggregate status of a pod, derived from its member containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodStatus {
    /// No member has started yet, or the pod is empty.
    Created,
    /// Every member is running.
    Running,
    /// Some but not all members are running.
    Degraded,
    /// Every member is paused.
    Paused,
    /// Some members exited, none are running.
    Stopped,
    /// Every member exited.
    Exited,
    /// Members are in states that do not fit any other status.
    Dead,
}

impl PodStatus {
    /// Derives the pod status from its members' states.
    #[must_use]
    pub fn derive(states: impl IntoIterator<Item = ContainerState>) -> Self {
        let (mut total, mut running, mut paused, mut exited, mut other) = (0, 0, 0, 0, 0);
        for state in states {
            total += 1;
            match state {
                ContainerState::Running => running += 1,
                ContainerState::Paused => paused += 1,
                ContainerState::Exited | ContainerState::Stopped => exited += 1,
                ContainerState::Created | ContainerState::Configured => {}
                ContainerState::Unknown | ContainerState::Removing => other += 1,
            }
        }
        if total == 0 {
            Self::Created
        } else if running == total {
            Self::Running
        } else if running > 0 {
            Self::Degraded
        } else if paused == total {
            Self::Paused
        } else if exited == total {
            Self::Exited
        } else if exited > 0 {
            Self::Stopped
        } else if other > 0 {
            Self::Dead
        } else {
            Self::Created
        }
    }
}

impl fmt::Display for PodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Degraded => "degraded",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Exited => "exited",
            Self::Dead => "dead",
        };
        f.write_str(name)
    }
}

impl FromStr for PodStatus {
    type Err = CorralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "running" => Ok(Self::Running),
            "degraded" => Ok(Self::Degraded),
            "paused" => Ok(Self::Paused),
            "stopped" => Ok(Self::Stopped),
            "exited" => Ok(Self::Exited),
            "dead" => Ok(Self::Dead),
            other => Err(CorralError::invalid_argument(format!(
                "{other} is not a valid pod status"
            ))),
        }
    }
}

/// Restart policy configured on a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    /// No policy was set.
    #[default]
    None,
    /// Explicitly never restart.
    No,
    /// Restart when the process exits non-zero.
    OnFailure,
    /// Always restart.
    Always,
    /// Restart unless explicitly stopped.
    UnlessStopped,
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::No => "no",
            Self::OnFailure => "on-failure",
            Self::Always => "always",
            Self::UnlessStopped => "unless-stopped",
        };
        f.write_str(name)
    }
}

impl FromStr for RestartPolicy {
    type Err = CorralError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "" => Ok(Self::None),
            "no" => Ok(Self::No),
            "on-failure" => Ok(Self::OnFailure),
            "always" => Ok(Self::Always),
            "unless-stopped" => Ok(Self::UnlessStopped),
            other => Err(CorralError::invalid_argument(format!(
                "{other} is not a valid restart policy"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_hex_and_unique() {
        let a = ContainerId::generate();
        let b = ContainerId::generate();
        assert_eq!(a.as_str().len(), crate::constants::SHA256_HEX_LENGTH);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn configured_displays_as_created() {
        assert_eq!(ContainerState::Configured.to_string(), "created");
        assert_eq!(ContainerState::Configured.filter_name(), "created");
    }

    #[test]
    fn stopped_filters_as_exited() {
        assert_eq!(ContainerState::Stopped.to_string(), "stopped");
        assert_eq!(ContainerState::Stopped.filter_name(), "exited");
    }

    #[test]
    fn container_state_rejects_unknown_names() {
        assert!("running".parse::<ContainerState>().is_ok());
        let err = "sleeping".parse::<ContainerState>().unwrap_err();
        assert!(err.to_string().contains("sleeping"));
    }

    #[test]
    fn internal_states_are_not_user_statuses() {
        for internal in ["configured", "removing"] {
            assert!(internal.parse::<ContainerState>().is_err(), "{internal}");
        }
        for public in ["created", "running", "paused", "stopped", "exited", "unknown"] {
            assert!(public.parse::<ContainerState>().is_ok(), "{public}");
        }
    }

    #[test]
    fn pod_status_empty_is_created() {
        assert_eq!(PodStatus::derive([]), PodStatus::Created);
    }

    #[test]
    fn pod_status_mixed_running_is_degraded() {
        let status = PodStatus::derive([ContainerState::Running, ContainerState::Exited]);
        assert_eq!(status, PodStatus::Degraded);
    }

    #[test]
    fn pod_status_all_states() {
        use ContainerState as S;
        assert_eq!(PodStatus::derive([S::Running, S::Running]), PodStatus::Running);
        assert_eq!(PodStatus::derive([S::Paused]), PodStatus::Paused);
        assert_eq!(PodStatus::derive([S::Exited, S::Stopped]), PodStatus::Exited);
        assert_eq!(PodStatus::derive([S::Exited, S::Created]), PodStatus::Stopped);
        assert_eq!(PodStatus::derive([S::Unknown, S::Created]), PodStatus::Dead);
        assert_eq!(PodStatus::derive([S::Configured, S::Created]), PodStatus::Created);
    }

    #[test]
    fn restart_policy_none_aliases() {
        assert_eq!("none".parse::<RestartPolicy>().unwrap(), RestartPolicy::None);
        assert_eq!("".parse::<RestartPolicy>().unwrap(), RestartPolicy::None);
        assert_eq!("no".parse::<RestartPolicy>().unwrap(), RestartPolicy::No);
        assert!("sometimes".parse::<RestartPolicy>().is_err());
    }
}
