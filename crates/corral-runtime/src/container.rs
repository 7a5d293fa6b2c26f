//! Container snapshot and its configuration.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use corral_common::constants::{
    CONTAINER_NETWORK_MODE_PREFIX, DEFAULT_IMAGE_TAG, DEFAULT_STOP_TIMEOUT_SECS,
};
use corral_common::types::{ContainerId, ContainerState, PodId, ResourceKind, RestartPolicy};
use serde::{Deserialize, Serialize};

use crate::object::ManagedObject;

/// A bind or tmpfs mount in the container's spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mount {
    /// Host path or source name.
    pub source: String,
    /// Path inside the container.
    pub destination: String,
}

/// A named volume mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedVolume {
    /// Volume name.
    pub name: String,
    /// Path inside the container.
    pub dest: String,
}

/// A container snapshot with its configuration and runtime state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Unique identifier.
    pub id: ContainerId,
    /// Human-readable name.
    pub name: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// User-defined labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Current lifecycle state.
    pub state: ContainerState,
    /// Exit code of the last run, meaningful when `exited` is set.
    #[serde(default)]
    pub exit_code: i32,
    /// Whether the container has exited at least once.
    #[serde(default)]
    pub exited: bool,
    /// Pod the container belongs to.
    #[serde(default)]
    pub pod_id: Option<PodId>,
    /// Whether this is its pod's infra container.
    #[serde(default)]
    pub is_infra: bool,
    /// Containers that must be started and stopped alongside this one.
    #[serde(default)]
    pub dependencies: Vec<ContainerId>,
    /// ID of the root filesystem image.
    #[serde(default)]
    pub image_id: String,
    /// Reference the image was requested by, e.g. `alpine:latest`.
    #[serde(default)]
    pub image_name: String,
    /// Bind and tmpfs mounts.
    #[serde(default)]
    pub mounts: Vec<Mount>,
    /// Named volumes.
    #[serde(default)]
    pub named_volumes: Vec<NamedVolume>,
    /// Names of the networks the container is attached to.
    #[serde(default)]
    pub networks: Vec<String>,
    /// Network mode, e.g. `bridge`, `host`, or `container:<id>`.
    #[serde(default)]
    pub network_mode: String,
    /// Restart policy.
    #[serde(default)]
    pub restart_policy: RestartPolicy,
    /// Health-check status, if a health check is configured.
    #[serde(default)]
    pub health: Option<String>,
    /// Whether the container is removed once it exits.
    #[serde(default)]
    pub auto_remove: bool,
    /// Grace period between the stop signal and `SIGKILL`, in seconds.
    #[serde(default = "default_stop_timeout")]
    pub stop_timeout: u32,
    /// Size of the writable layer in bytes, if known.
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

const fn default_stop_timeout() -> u32 {
    DEFAULT_STOP_TIMEOUT_SECS
}

impl Container {
    /// Creates a configured container with a fresh ID.
    #[must_use]
    pub fn new(name: impl Into<String>, image_name: impl Into<String>) -> Self {
        Self::with_id(ContainerId::generate(), name, image_name)
    }

    /// Creates a configured container with the given ID.
    #[must_use]
    pub fn with_id(id: ContainerId, name: impl Into<String>, image_name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            created: Utc::now(),
            labels: BTreeMap::new(),
            state: ContainerState::Configured,
            exit_code: 0,
            exited: false,
            pod_id: None,
            is_infra: false,
            dependencies: Vec::new(),
            image_id: String::new(),
            image_name: image_name.into(),
            mounts: Vec::new(),
            named_volumes: Vec::new(),
            networks: Vec::new(),
            network_mode: "bridge".into(),
            restart_policy: RestartPolicy::None,
            health: None,
            auto_remove: false,
            stop_timeout: DEFAULT_STOP_TIMEOUT_SECS,
            size_bytes: None,
        }
    }

    /// Sets the lifecycle state.
    #[must_use]
    pub const fn in_state(mut self, state: ContainerState) -> Self {
        self.state = state;
        self
    }

    /// Marks the container as exited with the given code.
    #[must_use]
    pub const fn exited_with(mut self, code: i32) -> Self {
        self.state = ContainerState::Exited;
        self.exit_code = code;
        self.exited = true;
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub const fn created_at(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.labels.insert(key.into(), value.into());
        self
    }

    /// Places the container in a pod, optionally as its infra container.
    #[must_use]
    pub fn in_pod(mut self, pod: PodId, infra: bool) -> Self {
        self.pod_id = Some(pod);
        self.is_infra = infra;
        self
    }

    /// Declares a dependency on another container.
    #[must_use]
    pub fn depends_on(mut self, id: ContainerId) -> Self {
        self.dependencies.push(id);
        self
    }

    /// Attaches the container to a network.
    #[must_use]
    pub fn on_network(mut self, network: impl Into<String>) -> Self {
        self.networks.push(network.into());
        self
    }

    /// Mounts a named volume.
    #[must_use]
    pub fn with_volume(mut self, name: impl Into<String>, dest: impl Into<String>) -> Self {
        self.named_volumes.push(NamedVolume {
            name: name.into(),
            dest: dest.into(),
        });
        self
    }

    /// Returns the tag of the image reference, if it has one.
    ///
    /// A colon inside a registry host (`host:5000/img`) is not a tag.
    #[must_use]
    pub fn image_tag(&self) -> Option<&str> {
        let (_, tag) = self.image_name.rsplit_once(':')?;
        (!tag.contains('/')).then_some(tag)
    }

    /// Returns the image reference without its tag.
    #[must_use]
    pub fn image_repository(&self) -> &str {
        match self.image_tag() {
            Some(tag) => &self.image_name[..self.image_name.len() - tag.len() - 1],
            None => &self.image_name,
        }
    }

    /// Returns `true` if the image reference carries the default tag.
    #[must_use]
    pub fn has_default_tag(&self) -> bool {
        self.image_tag() == Some(DEFAULT_IMAGE_TAG)
    }

    /// Returns the container whose network namespace this one joins.
    #[must_use]
    pub fn network_namespace_owner(&self) -> Option<&str> {
        self.network_mode
            .strip_prefix(CONTAINER_NETWORK_MODE_PREFIX)
            .filter(|id| !id.is_empty())
    }
}

impl ManagedObject for Container {
    const KIND: ResourceKind = ResourceKind::Container;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }

    fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }
}
