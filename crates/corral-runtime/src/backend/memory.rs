//! In-process object store implementing [`Runtime`].
//!
//! State lives behind a single `RwLock` so every transition is atomic
//! with respect to lookups. When opened from a file, the state is written
//! back by [`MemoryRuntime::save`] and at shutdown.

use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use corral_common::constants::DEFAULT_KILL_SIGNAL;
use corral_common::error::{CorralError, Result};
use corral_common::types::{ContainerId, ContainerState, PodId, ResourceKind};

use super::{RemoveOptions, Runtime};
use crate::container::Container;
use crate::network::Network;
use crate::pod::{Pod, PodMember};
use crate::state::{self, StoreState};
use crate::volume::Volume;

/// Signals that end the container's main process.
const TERMINATING_SIGNALS: [i32; 4] = [2, 3, 9, 15];

/// Object store held in memory, optionally persisted to a JSON file.
#[derive(Debug, Default)]
pub struct MemoryRuntime {
    state: RwLock<StoreState>,
    state_file: Option<PathBuf>,
}

impl MemoryRuntime {
    /// Creates an empty, unpersisted store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an unpersisted store seeded with `state`.
    #[must_use]
    pub fn from_state(state: StoreState) -> Self {
        Self {
            state: RwLock::new(state),
            state_file: None,
        }
    }

    /// Opens the store persisted at `path`, creating an empty one if the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: &Path) -> Result<Self> {
        let state = state::load_state(path)?;
        tracing::info!(
            path = %path.display(),
            containers = state.containers.len(),
            pods = state.pods.len(),
            volumes = state.volumes.len(),
            "object store opened"
        );
        Ok(Self {
            state: RwLock::new(state),
            state_file: Some(path.to_path_buf()),
        })
    }

    /// Writes the current state back to the file it was opened from.
    ///
    /// Does nothing for unpersisted stores.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.state_file else {
            return Ok(());
        };
        let state = self.read()?;
        state::save_state(path, &state)
    }

    /// Returns a copy of the raw stored state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn snapshot(&self) -> Result<StoreState> {
        Ok(self.read()?.clone())
    }

    /// Adds a container to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken, or the pod or a dependency
    /// does not exist.
    pub fn insert_container(&self, container: Container) -> Result<ContainerId> {
        let mut state = self.write()?;
        if state.containers.iter().any(|c| c.name == container.name) {
            return Err(CorralError::invalid_argument(format!(
                "container name {} is already in use",
                container.name
            )));
        }
        for dep in &container.dependencies {
            if !state.containers.iter().any(|c| c.id == *dep) {
                return Err(CorralError::not_found(ResourceKind::Container, dep.as_str()));
            }
        }
        if let Some(pod_id) = &container.pod_id {
            let pod = state
                .pods
                .iter_mut()
                .find(|p| p.id == *pod_id)
                .ok_or_else(|| CorralError::not_found(ResourceKind::Pod, pod_id.as_str()))?;
            if container.is_infra {
                pod.infra_container_id = Some(container.id.clone());
            }
        }
        let id = container.id.clone();
        tracing::debug!(id = %id, name = %container.name, "container added to store");
        state.containers.push(container);
        Ok(id)
    }

    /// Adds a pod to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken.
    pub fn insert_pod(&self, pod: Pod) -> Result<PodId> {
        let mut state = self.write()?;
        if state.pods.iter().any(|p| p.name == pod.name) {
            return Err(CorralError::invalid_argument(format!(
                "pod name {} is already in use",
                pod.name
            )));
        }
        let id = pod.id.clone();
        state.pods.push(pod);
        Ok(id)
    }

    /// Adds a volume to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken.
    pub fn insert_volume(&self, volume: Volume) -> Result<()> {
        let mut state = self.write()?;
        if state.volumes.iter().any(|v| v.name == volume.name) {
            return Err(CorralError::invalid_argument(format!(
                "volume name {} is already in use",
                volume.name
            )));
        }
        state.volumes.push(volume);
        Ok(())
    }

    /// Adds a network to the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn insert_network(&self, network: Network) -> Result<()> {
        self.write()?.networks.push(network);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state.read().map_err(|_| CorralError::Storage {
            message: "object store lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| CorralError::Storage {
            message: "object store lock poisoned".into(),
        })
    }
}

/// Finds an object by exact ID or name, then by unique ID prefix.
fn locate<T>(items: &[T], query: &str, key: impl Fn(&T) -> (&str, &str)) -> Result<Option<usize>> {
    if query.is_empty() {
        return Ok(None);
    }
    if let Some(i) = items.iter().position(|item| {
        let (id, name) = key(item);
        id == query || name == query
    }) {
        return Ok(Some(i));
    }
    let mut prefixed = items
        .iter()
        .enumerate()
        .filter(|(_, item)| key(item).0.starts_with(query))
        .map(|(i, _)| i);
    match (prefixed.next(), prefixed.next()) {
        (Some(i), None) => Ok(Some(i)),
        (Some(_), Some(_)) => Err(CorralError::invalid_argument(format!(
            "more than one result for ID prefix {query}"
        ))),
        (None, _) => Ok(None),
    }
}

fn hydrate_pod(state: &StoreState, pod: &Pod) -> Pod {
    let mut pod = pod.clone();
    pod.members = state
        .containers
        .iter()
        .filter(|c| c.pod_id.as_ref() == Some(&pod.id))
        .map(|c| PodMember {
            id: c.id.clone(),
            name: c.name.clone(),
            state: c.state,
        })
        .collect();
    pod.networks = pod
        .infra_container_id
        .as_ref()
        .and_then(|infra| state.containers.iter().find(|c| c.id == *infra))
        .map(|c| c.networks.clone())
        .unwrap_or_default();
    pod
}

fn hydrate_volume(state: &StoreState, volume: &Volume) -> Volume {
    let mut volume = volume.clone();
    volume.users = state
        .containers
        .iter()
        .filter(|c| c.named_volumes.iter().any(|nv| nv.name == volume.name))
        .map(|c| c.id.clone())
        .collect();
    volume
}

fn container_mut<'a>(state: &'a mut StoreState, id: &ContainerId) -> Result<&'a mut Container> {
    state
        .containers
        .iter_mut()
        .find(|c| c.id == *id)
        .ok_or_else(|| CorralError::not_found(ResourceKind::Container, id.as_str()))
}

fn invalid_state(id: &ContainerId, state: ContainerState, operation: &'static str) -> CorralError {
    CorralError::InvalidState {
        id: id.to_string(),
        state: state.to_string(),
        operation,
    }
}

/// Removes a container from `state`, refusing infra containers outside
/// pod removal, containers with dependents, and active containers
/// without force.
fn remove_from(state: &mut StoreState, id: &ContainerId, opts: &RemoveOptions) -> Result<()> {
    let ctr = state
        .containers
        .iter()
        .find(|c| c.id == *id)
        .cloned()
        .ok_or_else(|| CorralError::not_found(ResourceKind::Container, id.as_str()))?;

    if ctr.is_infra && !opts.as_part_of_pod {
        let pod = ctr.pod_id.as_ref().map_or("", PodId::as_str);
        return Err(CorralError::invalid_argument(format!(
            "container {id} is the infra container of pod {pod} and cannot be removed without removing the pod"
        )));
    }

    let dependents: Vec<String> = state
        .containers
        .iter()
        .filter(|c| c.dependencies.contains(id))
        .map(|c| c.id.to_string())
        .collect();
    if !dependents.is_empty() {
        return Err(CorralError::HasDependents {
            id: id.to_string(),
            dependents,
        });
    }

    if ctr.state.is_active() {
        if !opts.force {
            return Err(invalid_state(id, ctr.state, "remove without force"));
        }
        tracing::debug!(id = %id, timeout = ?opts.timeout, "stopping container before removal");
    }

    state.containers.retain(|c| c.id != *id);
    tracing::debug!(id = %id, "container removed");

    if opts.volumes {
        for nv in &ctr.named_volumes {
            let still_used = state
                .containers
                .iter()
                .any(|c| c.named_volumes.iter().any(|v| v.name == nv.name));
            let anonymous = state
                .volumes
                .iter()
                .any(|v| v.name == nv.name && v.anonymous);
            if anonymous && !still_used {
                state.volumes.retain(|v| v.name != nv.name);
                tracing::debug!(volume = %nv.name, "removed anonymous volume");
            }
        }
    }
    Ok(())
}

fn mark_exited(ctr: &mut Container, exit_code: i32) {
    ctr.state = ContainerState::Stopped;
    ctr.exited = true;
    ctr.exit_code = exit_code;
}

impl Runtime for MemoryRuntime {
    fn lookup_container(&self, name_or_id: &str) -> Result<Container> {
        let state = self.read()?;
        locate(&state.containers, name_or_id, |c| (c.id.as_str(), c.name.as_str()))?
            .map(|i| state.containers[i].clone())
            .ok_or_else(|| CorralError::not_found(ResourceKind::Container, name_or_id))
    }

    fn lookup_pod(&self, name_or_id: &str) -> Result<Pod> {
        let state = self.read()?;
        locate(&state.pods, name_or_id, |p| (p.id.as_str(), p.name.as_str()))?
            .map(|i| hydrate_pod(&state, &state.pods[i]))
            .ok_or_else(|| CorralError::not_found(ResourceKind::Pod, name_or_id))
    }

    fn lookup_volume(&self, name: &str) -> Result<Volume> {
        let state = self.read()?;
        state
            .volumes
            .iter()
            .find(|v| v.name == name)
            .map(|v| hydrate_volume(&state, v))
            .ok_or_else(|| CorralError::not_found(ResourceKind::Volume, name))
    }

    fn all_containers(&self) -> Result<Vec<Container>> {
        Ok(self.read()?.containers.clone())
    }

    fn all_pods(&self) -> Result<Vec<Pod>> {
        let state = self.read()?;
        Ok(state.pods.iter().map(|p| hydrate_pod(&state, p)).collect())
    }

    fn all_volumes(&self) -> Result<Vec<Volume>> {
        let state = self.read()?;
        Ok(state
            .volumes
            .iter()
            .map(|v| hydrate_volume(&state, v))
            .collect())
    }

    fn pod_containers(&self, pod: &PodId) -> Result<Vec<Container>> {
        let state = self.read()?;
        if !state.pods.iter().any(|p| p.id == *pod) {
            return Err(CorralError::not_found(ResourceKind::Pod, pod.as_str()));
        }
        Ok(state
            .containers
            .iter()
            .filter(|c| c.pod_id.as_ref() == Some(pod))
            .cloned()
            .collect())
    }

    fn container_dependents(&self, id: &ContainerId) -> Result<Vec<ContainerId>> {
        let state = self.read()?;
        if !state.containers.iter().any(|c| c.id == *id) {
            return Err(CorralError::not_found(ResourceKind::Container, id.as_str()));
        }
        Ok(state
            .containers
            .iter()
            .filter(|c| c.dependencies.contains(id))
            .map(|c| c.id.clone())
            .collect())
    }

    fn network_inspect(&self, name_or_id: &str) -> Result<Network> {
        let state = self.read()?;
        locate(&state.networks, name_or_id, |n| (n.id.as_str(), n.name.as_str()))?
            .map(|i| state.networks[i].clone())
            .ok_or_else(|| CorralError::not_found(ResourceKind::Network, name_or_id))
    }

    fn stop_container(&self, id: &ContainerId, timeout: Option<u32>) -> Result<()> {
        let mut state = self.write()?;
        let ctr = container_mut(&mut state, id)?;
        match ctr.state {
            ContainerState::Running | ContainerState::Paused => {
                let grace = timeout.unwrap_or(ctr.stop_timeout);
                let code = if grace == 0 { 128 + DEFAULT_KILL_SIGNAL } else { 0 };
                mark_exited(ctr, code);
                tracing::debug!(id = %id, grace, "container stopped");
                Ok(())
            }
            ContainerState::Stopped | ContainerState::Exited => Err(CorralError::AlreadyStopped {
                id: id.to_string(),
            }),
            other => Err(invalid_state(id, other, "stop")),
        }
    }

    fn cleanup_container(&self, id: &ContainerId) -> Result<()> {
        let mut state = self.write()?;
        let ctr = container_mut(&mut state, id)?;
        let current = ctr.state;
        match current {
            ContainerState::Running | ContainerState::Paused => {
                return Err(invalid_state(id, current, "clean up"));
            }
            ContainerState::Stopped => ctr.state = ContainerState::Exited,
            _ => {}
        }
        if ctr.auto_remove && ctr.state == ContainerState::Exited {
            state.containers.retain(|c| c.id != *id);
            tracing::debug!(id = %id, "auto-removed container during cleanup");
        }
        Ok(())
    }

    fn kill_container(&self, id: &ContainerId, signal: i32) -> Result<()> {
        let mut state = self.write()?;
        let ctr = container_mut(&mut state, id)?;
        let deliverable = ctr.state == ContainerState::Running
            || (ctr.state == ContainerState::Paused && signal == DEFAULT_KILL_SIGNAL);
        if !deliverable {
            return Err(invalid_state(id, ctr.state, "kill"));
        }
        if TERMINATING_SIGNALS.contains(&signal) {
            mark_exited(ctr, 128 + signal);
        }
        tracing::debug!(id = %id, signal, "signal delivered");
        Ok(())
    }

    fn pause_container(&self, id: &ContainerId) -> Result<()> {
        let mut state = self.write()?;
        let ctr = container_mut(&mut state, id)?;
        if ctr.state != ContainerState::Running {
            return Err(invalid_state(id, ctr.state, "pause"));
        }
        ctr.state = ContainerState::Paused;
        Ok(())
    }

    fn unpause_container(&self, id: &ContainerId) -> Result<()> {
        let mut state = self.write()?;
        let ctr = container_mut(&mut state, id)?;
        if ctr.state != ContainerState::Paused {
            return Err(invalid_state(id, ctr.state, "unpause"));
        }
        ctr.state = ContainerState::Running;
        Ok(())
    }

    fn restart_container(&self, id: &ContainerId, timeout: Option<u32>) -> Result<()> {
        let mut state = self.write()?;
        let ctr = container_mut(&mut state, id)?;
        if matches!(ctr.state, ContainerState::Unknown | ContainerState::Removing) {
            return Err(invalid_state(id, ctr.state, "restart"));
        }
        let grace = timeout.unwrap_or(ctr.stop_timeout);
        ctr.state = ContainerState::Running;
        tracing::debug!(id = %id, grace, "container restarted");
        Ok(())
    }

    fn remove_container(&self, id: &ContainerId, opts: &RemoveOptions) -> Result<()> {
        let mut state = self.write()?;
        remove_from(&mut state, id, opts)
    }

    fn remove_pod(&self, id: &PodId, opts: &RemoveOptions) -> Result<()> {
        let mut state = self.write()?;
        if !state.pods.iter().any(|p| p.id == *id) {
            return Err(CorralError::not_found(ResourceKind::Pod, id.as_str()));
        }
        let members = state
            .containers
            .iter()
            .filter(|c| c.pod_id.as_ref() == Some(id))
            .count();
        if members > 0 {
            if !opts.force {
                return Err(CorralError::invalid_argument(format!(
                    "pod {id} still has {members} container(s); remove them first or force removal"
                )));
            }
            state.containers.retain(|c| c.pod_id.as_ref() != Some(id));
        }
        state.pods.retain(|p| p.id != *id);
        tracing::debug!(id = %id, "pod removed");
        Ok(())
    }

    fn remove_volume(&self, name: &str, opts: &RemoveOptions) -> Result<()> {
        let mut state = self.write()?;
        if !state.volumes.iter().any(|v| v.name == name) {
            return Err(CorralError::not_found(ResourceKind::Volume, name));
        }
        let users: Vec<ContainerId> = state
            .containers
            .iter()
            .filter(|c| c.named_volumes.iter().any(|v| v.name == name))
            .map(|c| c.id.clone())
            .collect();
        if !users.is_empty() {
            if !opts.force {
                return Err(CorralError::VolumeInUse {
                    name: name.to_string(),
                    users: users.iter().map(ToString::to_string).collect(),
                });
            }
            tracing::debug!(volume = name, users = users.len(), "removing containers using volume");
            let user_opts = RemoveOptions {
                force: true,
                as_part_of_pod: false,
                ..*opts
            };
            let mut staged = state.clone();
            let mut pending = users;
            while !pending.is_empty() {
                let before = pending.len();
                let mut last_err = None;
                pending.retain(|id| match remove_from(&mut staged, id, &user_opts) {
                    Ok(()) => false,
                    Err(err) => {
                        last_err = Some(err);
                        true
                    }
                });
                if pending.len() == before {
                    match last_err {
                        Some(err) => {
                            return Err(err.context(format!("removing containers using volume {name}")));
                        }
                        None => break,
                    }
                }
            }
            *state = staged;
        }
        state.volumes.retain(|v| v.name != name);
        tracing::debug!(volume = name, "volume removed");
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        self.save()
    }
}
