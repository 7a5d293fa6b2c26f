//! The capability shared by every object kind the engine manages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use corral_common::types::ResourceKind;

/// Identity, creation time, and labels of a container, pod, or volume.
///
/// Implementors are immutable snapshots, cheap enough to clone into
/// worker tasks.
pub trait ManagedObject: Clone + Send + Sync + 'static {
    /// Kind reported in errors and logs.
    const KIND: ResourceKind;

    /// Stable, unique identifier.
    fn id(&self) -> &str;

    /// Human-readable name, unique among live objects of the same kind.
    fn name(&self) -> &str;

    /// Creation timestamp.
    fn created(&self) -> DateTime<Utc>;

    /// User-defined labels.
    fn labels(&self) -> &BTreeMap<String, String>;

    /// Kind of the object.
    fn kind(&self) -> ResourceKind {
        Self::KIND
    }
}
