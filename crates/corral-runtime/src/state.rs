//! Persistent state management.
//!
//! Maintains a local JSON index of every container, pod, volume, and
//! network, enabling daemon-less lifecycle management.

use std::path::Path;

use corral_common::error::{CorralError, Result};
use serde::{Deserialize, Serialize};

use crate::container::Container;
use crate::network::Network;
use crate::pod::Pod;
use crate::volume::Volume;

/// Everything the object store persists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreState {
    /// All containers.
    pub containers: Vec<Container>,
    /// All pods.
    pub pods: Vec<Pod>,
    /// All named volumes.
    pub volumes: Vec<Volume>,
    /// All networks.
    pub networks: Vec<Network>,
}

/// Loads the state index from disk.
///
/// Returns an empty state if the file does not exist yet.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_state(path: &Path) -> Result<StoreState> {
    tracing::debug!(path = %path.display(), "loading state index");
    if !path.exists() {
        return Ok(StoreState::default());
    }
    let content = std::fs::read_to_string(path).map_err(|e| CorralError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(serde_json::from_str(&content)?)
}

/// Persists the state index to disk atomically.
///
/// Writes to a sibling temporary file and renames it over the target.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn save_state(path: &Path, state: &StoreState) -> Result<()> {
    tracing::debug!(path = %path.display(), "saving state index");
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CorralError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    let tmp = path.with_extension("json.tmp");
    let content = serde_json::to_string_pretty(state)?;
    std::fs::write(&tmp, content).map_err(|e| CorralError::Io {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| CorralError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use corral_common::types::ContainerState;

    use super::*;

    #[test]
    fn missing_file_loads_empty_state() {
        let dir = tempfile::tempdir().expect("tempdir");
        let state = load_state(&dir.path().join("state.json")).expect("load");
        assert_eq!(state, StoreState::default());
    }

    #[test]
    fn save_and_load_preserves_objects() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("state.json");

        let state = StoreState {
            containers: vec![
                Container::new("web", "nginx:latest").in_state(ContainerState::Running),
            ],
            pods: vec![Pod::new("frontend")],
            volumes: vec![Volume::new("data")],
            networks: vec![Network::new("n1", "corral")],
        };
        save_state(&path, &state).expect("save");

        let loaded = load_state(&path).expect("load");
        assert_eq!(loaded, state);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_a_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{ not json").expect("write");

        let err = load_state(&path).unwrap_err();
        assert_eq!(err.kind(), corral_common::error::ErrorKind::Serialization);
    }
}
