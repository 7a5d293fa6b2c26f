//! Dependency-aware removal.
//!
//! Dependents go before the object they depend on, pod members go before
//! the infra container, and the infra container goes before its pod. A
//! [`RemovalSession`] threads through the whole batch so that every
//! object is removed at most once, however many targets reach it.

use corral_common::error::{CorralError, Result};
use corral_common::types::{ContainerId, ResourceKind};
use corral_runtime::backend::{RemoveOptions, Runtime};
use corral_runtime::container::Container;
use corral_runtime::pod::Pod;
use corral_runtime::volume::Volume;
use dashmap::DashSet;

use crate::lifecycle::{Transition, is_benign};
use crate::report::OperationReport;

/// Objects removed or being removed during one bulk removal.
#[derive(Debug, Default)]
pub struct RemovalSession {
    removed: DashSet<String>,
    in_progress: DashSet<String>,
}

impl RemovalSession {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `id` is gone. Returns `false` if it was already recorded.
    pub fn mark_removed(&self, id: &str) -> bool {
        let _ = self.in_progress.remove(id);
        self.removed.insert(id.to_string())
    }

    /// Returns `true` if `id` was removed earlier in the session.
    #[must_use]
    pub fn is_removed(&self, id: &str) -> bool {
        self.removed.contains(id)
    }

    fn enter(&self, kind: ResourceKind, id: &str) -> Result<()> {
        if self.in_progress.insert(id.to_string()) {
            Ok(())
        } else {
            Err(CorralError::invalid_argument(format!(
                "dependency cycle detected at {kind} {id}"
            )))
        }
    }

    fn leave(&self, id: &str) {
        let _ = self.in_progress.remove(id);
    }
}

/// Returns `true` if a removal failure means the container is already gone.
pub fn already_gone(err: &CorralError) -> bool {
    is_benign(Transition::Remove, err.kind(), false)
}

/// Removes one container, treating an already-gone container as removed.
///
/// Does not touch dependents; the runtime refuses if any remain.
///
/// # Errors
///
/// Returns the runtime failure.
pub fn remove_container(
    runtime: &dyn Runtime,
    session: &RemovalSession,
    ctr: &Container,
    opts: &RemoveOptions,
) -> Result<()> {
    if session.is_removed(ctr.id.as_str()) {
        return Ok(());
    }
    match runtime.remove_container(&ctr.id, opts) {
        Ok(()) => {}
        Err(err) if already_gone(&err) => {
            tracing::debug!(id = %ctr.id, "container already removed");
        }
        Err(err) => return Err(err.context(format!("removing container {}", ctr.id))),
    }
    let _ = session.mark_removed(ctr.id.as_str());
    Ok(())
}

/// Removes a container after everything that depends on it.
///
/// An infra container is removed by removing its pod. Reports for every
/// removed object are appended to `reports` in removal order; the
/// target's own report is last and carries `raw_input`.
///
/// # Errors
///
/// Returns the first failure. A dependent's failure aborts the chain
/// before the target is touched.
pub fn remove_container_with_dependents(
    runtime: &dyn Runtime,
    session: &RemovalSession,
    ctr: &Container,
    raw_input: &str,
    opts: &RemoveOptions,
    reports: &mut Vec<OperationReport>,
) -> Result<()> {
    if session.is_removed(ctr.id.as_str()) {
        return Ok(());
    }

    if ctr.is_infra && !opts.as_part_of_pod {
        if let Some(pod_id) = &ctr.pod_id {
            tracing::debug!(id = %ctr.id, pod = %pod_id, "infra container removal removes its pod");
            return match runtime.lookup_pod(pod_id.as_str()) {
                Ok(pod) => remove_pod_with_dependents(runtime, session, &pod, raw_input, opts, reports),
                Err(err) if err.is_not_found() => {
                    remove_leaf(runtime, session, ctr, raw_input, opts, reports)
                }
                Err(err) => Err(err),
            };
        }
    }

    session.enter(ResourceKind::Container, ctr.id.as_str())?;
    let result = remove_dependents(runtime, session, &ctr.id, opts, reports)
        .and_then(|()| remove_leaf(runtime, session, ctr, raw_input, opts, reports));
    session.leave(ctr.id.as_str());
    result
}

fn remove_dependents(
    runtime: &dyn Runtime,
    session: &RemovalSession,
    id: &ContainerId,
    opts: &RemoveOptions,
    reports: &mut Vec<OperationReport>,
) -> Result<()> {
    let dependents = match runtime.container_dependents(id) {
        Ok(deps) => deps,
        Err(err) if already_gone(&err) => return Ok(()),
        Err(err) => return Err(err),
    };
    let nested = RemoveOptions {
        as_part_of_pod: false,
        ..*opts
    };
    for dep_id in dependents {
        if session.is_removed(dep_id.as_str()) {
            continue;
        }
        let dep = match runtime.lookup_container(dep_id.as_str()) {
            Ok(dep) => dep,
            Err(err) if already_gone(&err) => {
                let _ = session.mark_removed(dep_id.as_str());
                continue;
            }
            Err(err) => return Err(err),
        };
        tracing::debug!(id = %id, dependent = %dep_id, "removing dependent first");
        remove_container_with_dependents(runtime, session, &dep, dep_id.as_str(), &nested, reports)
            .map_err(|e| e.context(format!("removing dependent container {dep_id} of {id}")))?;
    }
    Ok(())
}

fn remove_leaf(
    runtime: &dyn Runtime,
    session: &RemovalSession,
    ctr: &Container,
    raw_input: &str,
    opts: &RemoveOptions,
    reports: &mut Vec<OperationReport>,
) -> Result<()> {
    remove_container(runtime, session, ctr, opts)?;
    reports.push(OperationReport::ok(ctr.id.as_str(), raw_input).with_size(ctr.size_bytes));
    Ok(())
}

/// Removes every container using `volume`, with their dependents and,
/// for an infra container, its whole pod.
///
/// # Errors
///
/// Returns the first failure; the volume itself is left alone.
pub fn remove_volume_users(
    runtime: &dyn Runtime,
    session: &RemovalSession,
    volume: &Volume,
    opts: &RemoveOptions,
) -> Result<()> {
    let user_opts = RemoveOptions {
        force: true,
        as_part_of_pod: false,
        ..*opts
    };
    for id in &volume.users {
        if session.is_removed(id.as_str()) {
            continue;
        }
        let ctr = match runtime.lookup_container(id.as_str()) {
            Ok(ctr) => ctr,
            Err(err) if already_gone(&err) => continue,
            Err(err) => return Err(err),
        };
        let mut removed = Vec::new();
        remove_container_with_dependents(runtime, session, &ctr, id.as_str(), &user_opts, &mut removed)
            .map_err(|e| e.context(format!("removing container {id} using volume {}", volume.name)))?;
        tracing::debug!(volume = %volume.name, user = %id, removed = removed.len(), "removed volume user");
    }
    Ok(())
}

/// Removes a pod: its ordinary members first, then the infra container,
/// then the pod itself.
///
/// # Errors
///
/// Returns the first failure; the pod is not removed if any member fails.
pub fn remove_pod_with_dependents(
    runtime: &dyn Runtime,
    session: &RemovalSession,
    pod: &Pod,
    raw_input: &str,
    opts: &RemoveOptions,
    reports: &mut Vec<OperationReport>,
) -> Result<()> {
    let pod_id = pod.id.as_str();
    if session.is_removed(pod_id) {
        return Ok(());
    }
    session.enter(ResourceKind::Pod, pod_id)?;
    let result = remove_pod_members(runtime, session, pod, opts, reports);
    session.leave(pod_id);
    result?;

    match runtime.remove_pod(&pod.id, opts) {
        Ok(()) => {}
        Err(err) if err.is_not_found() => {
            tracing::debug!(pod = pod_id, "pod already removed");
        }
        Err(err) => return Err(err.context(format!("removing pod {pod_id}"))),
    }
    let _ = session.mark_removed(pod_id);
    reports.push(OperationReport::ok(pod_id, raw_input));
    Ok(())
}

fn remove_pod_members(
    runtime: &dyn Runtime,
    session: &RemovalSession,
    pod: &Pod,
    opts: &RemoveOptions,
    reports: &mut Vec<OperationReport>,
) -> Result<()> {
    let members = match runtime.pod_containers(&pod.id) {
        Ok(members) => members,
        Err(err) if err.is_not_found() => return Ok(()),
        Err(err) => return Err(err),
    };
    let (infra, ordinary): (Vec<Container>, Vec<Container>) =
        members.into_iter().partition(|c| c.is_infra);

    let member_opts = RemoveOptions {
        as_part_of_pod: false,
        ..*opts
    };
    for ctr in &ordinary {
        remove_container_with_dependents(
            runtime,
            session,
            ctr,
            ctr.id.as_str(),
            &member_opts,
            reports,
        )?;
    }

    let infra_opts = RemoveOptions {
        as_part_of_pod: true,
        ..*opts
    };
    for ctr in &infra {
        remove_container_with_dependents(runtime, session, ctr, ctr.id.as_str(), &infra_opts, reports)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use corral_common::error::ErrorKind;
    use corral_common::types::ContainerState;
    use corral_runtime::backend::memory::MemoryRuntime;

    use super::*;

    fn force() -> RemoveOptions {
        RemoveOptions {
            force: true,
            ..RemoveOptions::default()
        }
    }

    #[test]
    fn session_marks_once() {
        let session = RemovalSession::new();
        assert!(!session.is_removed("a"));
        assert!(session.mark_removed("a"));
        assert!(!session.mark_removed("a"));
        assert!(session.is_removed("a"));
    }

    #[test]
    fn dependents_are_removed_first() {
        let rt = MemoryRuntime::new();
        let base = rt.insert_container(Container::new("base", "x")).unwrap();
        let dep = rt
            .insert_container(Container::new("dep", "x").depends_on(base.clone()))
            .unwrap();
        let target = rt.lookup_container("base").unwrap();

        let session = RemovalSession::new();
        let mut reports = Vec::new();
        remove_container_with_dependents(&rt, &session, &target, "base", &force(), &mut reports)
            .unwrap();
        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![dep.as_str(), base.as_str()]);
        assert_eq!(reports[1].raw_input, "base");
        assert!(rt.all_containers().unwrap().is_empty());
    }

    #[test]
    fn removal_is_idempotent() {
        let rt = MemoryRuntime::new();
        let _ = rt.insert_container(Container::new("x", "img")).unwrap();
        let target = rt.lookup_container("x").unwrap();

        let session = RemovalSession::new();
        let mut reports = Vec::new();
        remove_container_with_dependents(&rt, &session, &target, "x", &force(), &mut reports)
            .unwrap();
        remove_container_with_dependents(&rt, &session, &target, "x", &force(), &mut reports)
            .unwrap();
        assert_eq!(reports.len(), 1);

        let fresh = RemovalSession::new();
        let mut again = Vec::new();
        remove_container_with_dependents(&rt, &fresh, &target, "x", &force(), &mut again).unwrap();
        assert_eq!(again.len(), 1);
        assert!(again[0].is_ok());
    }

    #[test]
    fn failing_dependent_aborts_the_chain() {
        let rt = MemoryRuntime::new();
        let base = rt.insert_container(Container::new("base", "x")).unwrap();
        let _ = rt
            .insert_container(
                Container::new("busy", "x")
                    .in_state(ContainerState::Running)
                    .depends_on(base),
            )
            .unwrap();
        let target = rt.lookup_container("base").unwrap();

        let session = RemovalSession::new();
        let mut reports = Vec::new();
        let err = remove_container_with_dependents(
            &rt,
            &session,
            &target,
            "base",
            &RemoveOptions::default(),
            &mut reports,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContainerStateInvalid);
        assert!(err.to_string().starts_with("removing dependent container"));
        assert!(reports.is_empty());
        assert_eq!(rt.all_containers().unwrap().len(), 2);
    }

    #[test]
    fn infra_container_takes_its_pod_along() {
        let rt = MemoryRuntime::new();
        let pod = rt.insert_pod(Pod::new("p")).unwrap();
        let infra = rt
            .insert_container(Container::new("p-infra", "pause").in_pod(pod.clone(), true))
            .unwrap();
        let member = rt
            .insert_container(
                Container::new("app", "x")
                    .in_pod(pod.clone(), false)
                    .depends_on(infra.clone()),
            )
            .unwrap();
        let target = rt.lookup_container("p-infra").unwrap();

        let session = RemovalSession::new();
        let mut reports = Vec::new();
        remove_container_with_dependents(&rt, &session, &target, "p-infra", &force(), &mut reports)
            .unwrap();
        let ids: Vec<&str> = reports.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![member.as_str(), infra.as_str(), pod.as_str()]);
        assert!(rt.all_pods().unwrap().is_empty());
        assert!(session.is_removed(pod.as_str()));
    }

    #[test]
    fn volume_users_go_with_their_dependents_and_pods() {
        let rt = MemoryRuntime::new();
        rt.insert_volume(Volume::new("data")).unwrap();
        let pod = rt.insert_pod(Pod::new("p")).unwrap();
        let _ = rt
            .insert_container(
                Container::new("p-infra", "pause")
                    .in_pod(pod.clone(), true)
                    .with_volume("data", "/data"),
            )
            .unwrap();
        let base = rt
            .insert_container(Container::new("base", "x").with_volume("data", "/data"))
            .unwrap();
        let _ = rt
            .insert_container(Container::new("dep", "x").depends_on(base))
            .unwrap();
        let volume = rt.lookup_volume("data").unwrap();

        let session = RemovalSession::new();
        remove_volume_users(&rt, &session, &volume, &RemoveOptions::default()).unwrap();
        assert!(rt.all_containers().unwrap().is_empty());
        assert!(rt.all_pods().unwrap().is_empty());
        assert!(rt.lookup_volume("data").unwrap().is_dangling());
        assert!(session.is_removed(pod.as_str()));
    }

    #[test]
    fn gone_means_missing_or_removed_only() {
        assert!(already_gone(&CorralError::not_found(ResourceKind::Container, "x")));
        assert!(!already_gone(&CorralError::not_found(ResourceKind::Pod, "x")));
        assert!(!already_gone(&CorralError::invalid_argument("busy")));
    }

    #[test]
    fn cycles_are_reported_not_followed() {
        let rt = MemoryRuntime::new();
        let a = rt.insert_container(Container::new("a", "x")).unwrap();
        let b = rt
            .insert_container(Container::new("b", "x").depends_on(a.clone()))
            .unwrap();
        let mut state = rt.snapshot().unwrap();
        for ctr in &mut state.containers {
            if ctr.id == a {
                ctr.dependencies.push(b.clone());
            }
        }
        let cyclic = MemoryRuntime::from_state(state);
        let target = cyclic.lookup_container("a").unwrap();

        let mut reports = Vec::new();
        let err = remove_container_with_dependents(
            &cyclic,
            &RemovalSession::new(),
            &target,
            "a",
            &force(),
            &mut reports,
        )
        .unwrap_err();
        assert!(err.to_string().contains("dependency cycle"));
    }
}
