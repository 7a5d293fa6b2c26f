//! Network records as returned by network inspection.

use serde::{Deserialize, Serialize};

/// A network known to the network backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    /// Unique identifier.
    pub id: String,
    /// Canonical name.
    pub name: String,
    /// Backend driver, e.g. `bridge`.
    #[serde(default)]
    pub driver: String,
}

impl Network {
    /// Creates a bridge network record.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            driver: "bridge".into(),
        }
    }
}
