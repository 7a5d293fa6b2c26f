//! Named volume snapshot.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use corral_common::types::{ContainerId, ResourceKind};
use serde::{Deserialize, Serialize};

use crate::object::ManagedObject;

/// A named volume snapshot. Its name is its identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    /// Volume name.
    pub name: String,
    /// Creation timestamp.
    pub created: DateTime<Utc>,
    /// User-defined labels.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Volume driver.
    #[serde(default = "default_local")]
    pub driver: String,
    /// Volume scope.
    #[serde(default = "default_local")]
    pub scope: String,
    /// Driver options.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
    /// Whether the volume was created implicitly for a single container.
    #[serde(default)]
    pub anonymous: bool,
    /// Bytes used on disk.
    #[serde(default)]
    pub size_bytes: u64,
    /// Containers referencing the volume, filled in when the snapshot is taken.
    #[serde(skip)]
    pub users: Vec<ContainerId>,
}

fn default_local() -> String {
    "local".into()
}

impl Volume {
    /// Creates a local volume.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: Utc::now(),
            labels: BTreeMap::new(),
            driver: default_local(),
            scope: default_local(),
            options: BTreeMap::new(),
            anonymous: false,
            size_bytes: 0,
            users: Vec::new(),
        }
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds a driver option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.options.insert(key.into(), value.into());
        self
    }

    /// Sets the creation timestamp.
    #[must_use]
    pub const fn created_at(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    /// Returns `true` if no container references the volume.
    #[must_use]
    pub fn is_dangling(&self) -> bool {
        self.users.is_empty()
    }
}

impl ManagedObject for Volume {
    const KIND: ResourceKind = ResourceKind::Volume;

    fn id(&self) -> &str {
        &self.name
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
