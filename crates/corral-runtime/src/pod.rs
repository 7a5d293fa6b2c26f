//! Pod snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use corral_common::types::{ContainerId, ContainerState, PodId, PodStatus, ResourceKind};
use serde::{Deserialize, Serialize};

use crate::object::ManagedObject;

/// A member container as seen from its pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodMember {
    /// Container ID.
    pub id: ContainerId,
    /// Container name.
    pub name: String,
    /// Container state at snapshot time.
    pub state: ContainerState,
}

/// A pod snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    /// Unique identifier.
    pub id: PodId,
    /// Human-readable name.
    pub name: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// User-defined labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Infra container owning the shared namespaces.
    #[serde(default)]
    pub infra_container_id: Option<ContainerId>,
    /// Member containers, filled in when the snapshot is taken.
    #[serde(skip)]
    pub members: Vec<PodMember>,
    /// Networks of the infra container, filled in when the snapshot is taken.
    #[serde(skip)]
    pub networks: Vec<String>,
}

impl Pod {
    /// Creates an empty pod with a fresh ID.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(PodId::generate(), name)
    }

    /// Creates an empty pod with the given ID.
    #[must_use]
    pub fn with_id(id: PodId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            created: Utc::now(),
            labels: BTreeMap::new(),
            infra_container_id: None,
            members: Vec::new(),
            networks: Vec::new(),
        }
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

    /// Aggregate status of the member containers.
    #[must_use]
    pub fn status(&self) -> PodStatus {
        PodStatus::derive(self.members.iter().map(|m| m.state))
    }

    /// Returns `true` if any member is running or paused.
    #[must_use]
    pub fn has_active_members(&self) -> bool {
        self.members.iter().any(|m| m.state.is_active())
    }
}

impl ManagedObject for Pod {
    const KIND: ResourceKind = ResourceKind::Pod;

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
