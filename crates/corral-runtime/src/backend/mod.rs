//! Runtime abstraction the engine orchestrates.
//!
//! The trait is the narrow seam between the engine and the object store,
//! OCI runtime, and network backend. Every method is blocking; the engine
//! runs them on worker threads.

pub mod memory;

use corral_common::error::{CorralError, Result};
use corral_common::types::{ContainerId, PodId, ResourceKind};

use crate::container::Container;
use crate::network::Network;
use crate::pod::Pod;
use crate::volume::Volume;

/// Flags for the removal primitives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Stop running or paused objects first instead of refusing.
    pub force: bool,
    /// Also remove anonymous volumes used only by the removed container.
    pub volumes: bool,
    /// Stop timeout override in seconds.
    pub timeout: Option<u32>,
    /// The removal is part of removing the container's pod, which lifts
    /// the infra-container protection.
    pub as_part_of_pod: bool,
}

/// Lookups, enumeration, and transition primitives over the object store.
///
/// Failures carry an [`ErrorKind`](corral_common::error::ErrorKind): lookups
/// fail with a `NoSuch*` kind when nothing matches, transitions with
/// `ContainerStopped`, `ContainerStateInvalid`, `ContainerExists`, and so on.
pub trait Runtime: Send + Sync {
    /// Looks up a container by full ID, name, or unique ID prefix.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuchContainer` error if nothing matches.
    fn lookup_container(&self, name_or_id: &str) -> Result<Container>;

    /// Looks up a pod by full ID, name, or unique ID prefix.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuchPod` error if nothing matches.
    fn lookup_pod(&self, name_or_id: &str) -> Result<Pod>;

    /// Looks up a volume by name.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuchVolume` error if nothing matches.
    fn lookup_volume(&self, name: &str) -> Result<Volume>;

    /// Returns every container.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn all_containers(&self) -> Result<Vec<Container>>;

    /// Returns every pod.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn all_pods(&self) -> Result<Vec<Pod>>;

    /// Returns every volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn all_volumes(&self) -> Result<Vec<Volume>>;

    /// Returns the containers belonging to a pod.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuchPod` error if the pod does not exist.
    fn pod_containers(&self, pod: &PodId) -> Result<Vec<Container>>;

    /// Returns the IDs of containers that declare `id` as a dependency.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuchContainer` error if `id` does not exist.
    fn container_dependents(&self, id: &ContainerId) -> Result<Vec<ContainerId>>;

    /// Inspects a network by name or ID.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuchNetwork` error if nothing matches.
    fn network_inspect(&self, name_or_id: &str) -> Result<Network>;

    /// Stops a running or paused container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerStopped` if it already stopped and
    /// `ContainerStateInvalid` if it never ran.
    fn stop_container(&self, id: &ContainerId, timeout: Option<u32>) -> Result<()>;

    /// Releases the runtime resources of a stopped container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerStateInvalid` for running containers and
    /// `NoSuchContainer` if it is gone.
    fn cleanup_container(&self, id: &ContainerId) -> Result<()>;

    /// Sends a signal to a running container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerStateInvalid` if it is not running.
    fn kill_container(&self, id: &ContainerId, signal: i32) -> Result<()>;

    /// Freezes a running container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerStateInvalid` if it is not running.
    fn pause_container(&self, id: &ContainerId) -> Result<()>;

    /// Thaws a paused container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerStateInvalid` if it is not paused.
    fn unpause_container(&self, id: &ContainerId) -> Result<()>;

    /// Stops the container if needed and starts it again.
    ///
    /// # Errors
    ///
    /// Returns `ContainerStateInvalid` if it is being removed.
    fn restart_container(&self, id: &ContainerId, timeout: Option<u32>) -> Result<()>;

    /// Removes a container.
    ///
    /// # Errors
    ///
    /// Returns `ContainerExists` while dependents remain,
    /// `ContainerStateInvalid` for active containers without `force`, and
    /// `NoSuchContainer` if it is gone.
    fn remove_container(&self, id: &ContainerId, opts: &RemoveOptions) -> Result<()>;

    /// Removes a pod. Members left behind are removed only with `force`.
    ///
    /// # Errors
    ///
    /// Returns `NoSuchPod` if it is gone, or an error while members remain
    /// and `force` is unset.
    fn remove_pod(&self, id: &PodId, opts: &RemoveOptions) -> Result<()>;

    /// Removes a volume. Containers using it are removed only with `force`.
    ///
    /// # Errors
    ///
    /// Returns `VolumeInUse` while it is referenced and `force` is unset.
    fn remove_volume(&self, name: &str, opts: &RemoveOptions) -> Result<()>;

    /// Resolves a container reference to its full ID.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuchContainer` error if nothing matches.
    fn lookup_container_id(&self, name_or_id: &str) -> Result<ContainerId> {
        self.lookup_container(name_or_id).map(|c| c.id)
    }

    /// Returns the most recently created container.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuchContainer` error if there are no containers.
    fn latest_container(&self) -> Result<Container> {
        self.all_containers()?
            .into_iter()
            .max_by_key(|c| c.created)
            .ok_or_else(|| CorralError::not_found(ResourceKind::Container, "latest"))
    }

    /// Returns the most recently created pod.
    ///
    /// # Errors
    ///
    /// Returns a `NoSuchPod` error if there are no pods.
    fn latest_pod(&self) -> Result<Pod> {
        self.all_pods()?
            .into_iter()
            .max_by_key(|p| p.created)
            .ok_or_else(|| CorralError::not_found(ResourceKind::Pod, "latest"))
    }

    /// Returns every running container.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn running_containers(&self) -> Result<Vec<Container>> {
        Ok(self
            .all_containers()?
            .into_iter()
            .filter(|c| c.state == corral_common::types::ContainerState::Running)
            .collect())
    }

    /// Releases runtime resources at engine shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if state cannot be flushed.
    fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}
