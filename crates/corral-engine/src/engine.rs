//! The engine handle and its bulk commands.
//!
//! Every command follows the same path: resolve the selection, narrow it
//! with filters, apply the transition through the coordinator, and return
//! one report per attempted object. A command fails as a whole only when
//! its inputs are invalid or the selection cannot be resolved.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use corral_common::config::EngineConfig;
use corral_common::error::{CorralError, Result};
use corral_common::types::{ContainerState, PodStatus};
use corral_runtime::backend::{RemoveOptions, Runtime};
use corral_runtime::container::Container;
use corral_runtime::object::ManagedObject;
use corral_runtime::pod::Pod;
use corral_runtime::volume::Volume;
use tokio_util::sync::CancellationToken;

use crate::filter::FilterSet;
use crate::lifecycle::{self, Transition};
use crate::options::{
    BulkOptions, KillOptions, ListOptions, PodRmOptions, PodStopOptions, RestartOptions,
    RmOptions, StopOptions, VolumeRmOptions,
};
use crate::parallel::{Coordinator, ExecutionMode, blocking};
use crate::removal::{self, RemovalSession};
use crate::report::{self, OperationReport};
use crate::resolve::{Resolution, Resolvable, Selector, resolve};

/// Resolved and filtered targets of a bulk command.
struct Selection<T> {
    targets: Vec<(T, String)>,
    all: bool,
}

impl<T: Clone> Selection<T> {
    fn objects(&self) -> Vec<T> {
        self.targets.iter().map(|(o, _)| o.clone()).collect()
    }

    fn retain(&mut self, keep: impl Fn(&T) -> bool) {
        self.targets.retain(|(o, _)| keep(o));
    }
}

/// Parsed filters and selector of a bulk command.
struct Plan<T: Resolvable> {
    filters: FilterSet<T::Filter>,
    selector: Selector,
}

/// Handle to the lifecycle engine.
///
/// Owns the runtime for its lifetime. [`Engine::shutdown`] is idempotent;
/// afterwards every command fails with [`CorralError::EngineStopped`].
pub struct Engine {
    runtime: Arc<dyn Runtime>,
    config: EngineConfig,
    cancel: CancellationToken,
    shut_down: AtomicBool,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("shut_down", &self.shut_down)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Creates an engine over `runtime`.
    #[must_use]
    pub fn new(runtime: Arc<dyn Runtime>, config: EngineConfig) -> Self {
        Self {
            runtime,
            config,
            cancel: CancellationToken::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// The runtime the engine drives.
    #[must_use]
    pub fn runtime(&self) -> &Arc<dyn Runtime> {
        &self.runtime
    }

    /// The engine configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Token that stops dispatch of further objects when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Returns `true` once [`Engine::shutdown`] has run.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Shuts the engine down. Only the first call has an effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime fails to release its resources.
    pub fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::debug!("engine already shut down");
            return Ok(());
        }
        tracing::info!("shutting down engine");
        self.cancel.cancel();
        self.runtime.shutdown()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(CorralError::EngineStopped);
        }
        Ok(())
    }

    fn coordinator(&self) -> Coordinator {
        Coordinator::new(self.config.worker_limit(), self.cancel.clone())
    }

    fn stop_timeout(&self, timeout: Option<u32>) -> Option<u32> {
        Some(timeout.unwrap_or(self.config.stop_timeout_secs))
    }

    fn kill_signal(&self, signal: Option<i32>) -> Result<i32> {
        let signal = signal.unwrap_or(self.config.kill_signal);
        if (1..=64).contains(&signal) {
            Ok(signal)
        } else {
            Err(CorralError::invalid_argument(format!(
                "signal {signal} is out of range"
            )))
        }
    }

    async fn select<T: Resolvable>(
        &self,
        names: &[String],
        bulk: &BulkOptions,
    ) -> Result<Selection<T>> {
        let plan = self.plan::<T>(names, bulk).await?;
        let (resolution, all) = self.resolve_plan(plan).await?;
        Ok(Selection {
            targets: resolution.into_pairs(bulk.ignore)?,
            all,
        })
    }

    /// Builds filters and the selector. Every error here is fatal to the
    /// call and comes back before any object is looked up.
    async fn plan<T: Resolvable>(&self, names: &[String], bulk: &BulkOptions) -> Result<Plan<T>> {
        let runtime = Arc::clone(&self.runtime);
        let names = names.to_vec();
        let bulk = bulk.clone();
        blocking(move || {
            let filters = FilterSet::<T::Filter>::parse(&bulk.filters, runtime.as_ref())?;
            let all = bulk.all || (names.is_empty() && !bulk.latest && !filters.is_empty());
            let selector = Selector::from_flags(all, bulk.latest, &names)?;
            Ok(Plan { filters, selector })
        })
        .await
    }

    /// Resolves a plan and drops the objects its filters reject. Named
    /// lookup failures stay in the resolution.
    async fn resolve_plan<T: Resolvable>(&self, plan: Plan<T>) -> Result<(Resolution<T>, bool)> {
        let runtime = Arc::clone(&self.runtime);
        blocking(move || {
            let mut resolution = resolve::<T>(&plan.selector, runtime.as_ref())?;
            resolution.retain(|object| plan.filters.matches(object));
            Ok((resolution, plan.selector.is_all()))
        })
        .await
    }

    async fn list<T: Resolvable>(
        &self,
        filters: &[String],
        keep: impl Fn(&T) -> bool + Send + 'static,
    ) -> Result<Vec<T>> {
        self.ensure_running()?;
        let runtime = Arc::clone(&self.runtime);
        let filters = filters.to_vec();
        let mut objects = blocking(move || {
            let filters = FilterSet::<T::Filter>::parse(&filters, runtime.as_ref())?;
            Ok(filters.apply(T::all(runtime.as_ref())?.into_iter().filter(keep).collect()))
        })
        .await?;
        objects.sort_by(|a, b| b.created().cmp(&a.created()));
        Ok(objects)
    }

    /// Applies a per-container transition to the selection in parallel.
    async fn container_transition<F>(
        &self,
        operation: &'static str,
        selection: Selection<Container>,
        op: F,
    ) -> Vec<OperationReport>
    where
        F: Fn(&dyn Runtime, &Container, bool) -> Result<()> + Send + Sync + Clone + 'static,
    {
        tracing::info!(operation, count = selection.targets.len(), all = selection.all, "starting bulk operation");
        let runtime = Arc::clone(&self.runtime);
        let all = selection.all;
        let results = self
            .coordinator()
            .apply(selection.objects(), ExecutionMode::Parallel, |ctr: Container| {
                let runtime = Arc::clone(&runtime);
                let op = op.clone();
                blocking(move || op(runtime.as_ref(), &ctr, all))
            })
            .await;
        finish(operation, reports_in_order(selection.targets, results, |_| None))
    }

    /// Runs a removal chain per target, one target at a time, sharing
    /// `session` across the batch.
    async fn removal_chains<T, F>(
        &self,
        targets: Vec<(T, String)>,
        session: &Arc<RemovalSession>,
        chain: F,
    ) -> Vec<OperationReport>
    where
        T: ManagedObject,
        F: Fn(&dyn Runtime, &RemovalSession, &T, &str, &mut Vec<OperationReport>) -> Result<()>
            + Send
            + Sync
            + Clone
            + 'static,
    {
        let mut raw_inputs: HashMap<String, String> = HashMap::new();
        for (object, raw) in &targets {
            let _ = raw_inputs
                .entry(object.id().to_string())
                .or_insert_with(|| raw.clone());
        }
        let objects: Vec<T> = targets.iter().map(|(o, _)| o.clone()).collect();
        let runtime = Arc::clone(&self.runtime);
        let mut results = self
            .coordinator()
            .apply(objects, ExecutionMode::Sequential, |object: T| {
                let runtime = Arc::clone(&runtime);
                let session = Arc::clone(session);
                let chain = chain.clone();
                let raw = raw_inputs.get(object.id()).cloned().unwrap_or_default();
                blocking(move || {
                    let mut reports = Vec::new();
                    if let Err(err) = chain(runtime.as_ref(), &session, &object, &raw, &mut reports) {
                        reports.push(OperationReport::failed(object.id(), raw, err));
                    }
                    Ok(reports)
                })
            })
            .await;

        let mut reports = Vec::new();
        for (object, raw) in targets {
            match results.remove(object.id()) {
                Some(Ok(chain_reports)) => reports.extend(chain_reports),
                Some(Err(err)) => reports.push(OperationReport::failed(object.id(), raw, err)),
                None => {}
            }
        }
        reports
    }

    async fn remove_containers(
        &self,
        selection: Selection<Container>,
        opts: RemoveOptions,
        depend: bool,
    ) -> Vec<OperationReport> {
        let session = Arc::new(RemovalSession::new());
        let chain = move |rt: &dyn Runtime,
                          session: &RemovalSession,
                          ctr: &Container,
                          raw: &str,
                          reports: &mut Vec<OperationReport>| {
            removal::remove_container_with_dependents(rt, session, ctr, raw, &opts, reports)
        };

        if depend && !selection.all {
            return self.removal_chains(selection.targets, &session, chain).await;
        }

        let mut reports = Vec::new();
        let mut leaves = selection.targets;
        if selection.all {
            let depended_on: HashSet<_> = leaves
                .iter()
                .flat_map(|(c, _)| c.dependencies.iter().cloned())
                .collect();
            let (first, rest): (Vec<_>, Vec<_>) = leaves
                .into_iter()
                .partition(|(c, _)| c.is_infra || depended_on.contains(&c.id));
            tracing::debug!(count = first.len(), "removing infra and depended-on containers first");
            reports = self.removal_chains(first, &session, chain).await;
            leaves = rest
                .into_iter()
                .filter(|(c, _)| !session.is_removed(c.id.as_str()))
                .collect();
        }

        let runtime = Arc::clone(&self.runtime);
        let objects: Vec<Container> = leaves.iter().map(|(c, _)| c.clone()).collect();
        let results = self
            .coordinator()
            .apply(objects, ExecutionMode::Parallel, |ctr: Container| {
                let runtime = Arc::clone(&runtime);
                let session = Arc::clone(&session);
                blocking(move || removal::remove_container(runtime.as_ref(), &session, &ctr, &opts))
            })
            .await;
        reports.extend(reports_in_order(leaves, results, |c| c.size_bytes));
        reports
    }

    async fn evict_containers(
        &self,
        names: &[String],
        opts: RemoveOptions,
        ignore: bool,
    ) -> Result<Vec<OperationReport>> {
        let runtime = Arc::clone(&self.runtime);
        let names = names.to_vec();
        blocking(move || {
            let session = RemovalSession::new();
            Ok(names
                .iter()
                .map(|name| {
                    tracing::debug!(name = %name, "evicting container");
                    let result = runtime.lookup_container(name).and_then(|ctr| {
                        removal::remove_container(runtime.as_ref(), &session, &ctr, &opts)
                            .map(|()| ctr.id.to_string())
                    });
                    match result {
                        Ok(id) => OperationReport::ok(id, name.as_str()),
                        Err(err) if ignore && removal::already_gone(&err) => {
                            tracing::debug!(name = %name, %err, "ignoring missing container");
                            OperationReport::ok(name.as_str(), name.as_str())
                        }
                        Err(err) => OperationReport::failed(name.as_str(), name.as_str(), err),
                    }
                })
                .collect())
        })
        .await
    }

    async fn pod_transition<F>(
        &self,
        names: &[String],
        bulk: &BulkOptions,
        transition: Transition,
        applies_to: fn(&Container) -> bool,
        op: F,
    ) -> Result<Vec<OperationReport>>
    where
        F: Fn(&dyn Runtime, &Container) -> Result<()> + Send + Sync + Clone + 'static,
    {
        self.ensure_running()?;
        let selection = self.select::<Pod>(names, bulk).await?;
        let operation = transition.progressive();
        tracing::info!(operation, count = selection.targets.len(), "starting pod operation");
        let results = self
            .coordinator()
            .apply(selection.objects(), ExecutionMode::Parallel, |pod: Pod| {
                let op = op.clone();
                async move { self.pod_members(&pod, transition, applies_to, op).await }
            })
            .await;
        Ok(finish(operation, reports_in_order(selection.targets, results, |_| None)))
    }

    /// Applies `op` to the pod's members in parallel and folds member
    /// failures into one error.
    async fn pod_members<F>(
        &self,
        pod: &Pod,
        transition: Transition,
        applies_to: fn(&Container) -> bool,
        op: F,
    ) -> Result<()>
    where
        F: Fn(&dyn Runtime, &Container) -> Result<()> + Send + Sync + Clone + 'static,
    {
        let runtime = Arc::clone(&self.runtime);
        let pod_id = pod.id.clone();
        let members: Vec<Container> = blocking(move || runtime.pod_containers(&pod_id))
            .await?
            .into_iter()
            .filter(applies_to)
            .collect();

        let runtime = Arc::clone(&self.runtime);
        let results = self
            .coordinator()
            .apply(members, ExecutionMode::Parallel, |ctr: Container| {
                let runtime = Arc::clone(&runtime);
                let op = op.clone();
                blocking(move || op(runtime.as_ref(), &ctr))
            })
            .await;
        let failures = results
            .into_iter()
            .filter_map(|(id, result)| result.err().map(|err| (id, err)))
            .collect();
        lifecycle::pod_outcome(pod.id.as_str(), transition, failures)
    }

    async fn remove_volumes(
        &self,
        operation: &'static str,
        selection: Selection<Volume>,
        opts: RemoveOptions,
        reclaim: bool,
    ) -> Vec<OperationReport> {
        tracing::info!(operation, count = selection.targets.len(), "starting volume removal");
        let runtime = Arc::clone(&self.runtime);
        let session = Arc::new(RemovalSession::new());
        let results = self
            .coordinator()
            .apply(selection.objects(), ExecutionMode::Parallel, |vol: Volume| {
                let runtime = Arc::clone(&runtime);
                let session = Arc::clone(&session);
                blocking(move || {
                    if opts.force {
                        removal::remove_volume_users(runtime.as_ref(), &session, &vol, &opts)?;
                    }
                    match runtime.remove_volume(&vol.name, &opts) {
                        Err(err) if err.is_not_found() => {
                            tracing::debug!(volume = %vol.name, "volume already removed");
                            Ok(())
                        }
                        result => result.map_err(|e| e.context(format!("removing volume {}", vol.name))),
                    }
                })
            })
            .await;
        let size = move |v: &Volume| reclaim.then_some(v.size_bytes);
        finish(operation, reports_in_order(selection.targets, results, size))
    }

    // ── Containers ──────────────────────────────────────────────

    /// Stops containers and cleans them up.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for invalid inputs, an unreadable cidfile, or
    /// a selection that cannot be resolved.
    pub async fn container_stop(
        &self,
        names: &[String],
        opts: &StopOptions,
    ) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let mut names = names.to_vec();
        for path in &opts.cidfiles {
            names.push(read_cidfile(path)?);
        }
        let selection = self.select::<Container>(&names, &opts.bulk).await?;
        let timeout = self.stop_timeout(opts.timeout);
        Ok(self
            .container_transition("stop", selection, move |rt, ctr, all| {
                lifecycle::stop(rt, ctr, timeout, all)
            })
            .await)
    }

    /// Sends a signal to containers.
    ///
    /// # Errors
    ///
    /// Fails as a whole for an out-of-range signal or an unresolvable
    /// selection.
    pub async fn container_kill(
        &self,
        names: &[String],
        opts: &KillOptions,
    ) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let signal = self.kill_signal(opts.signal)?;
        let selection = self.select::<Container>(names, &opts.bulk).await?;
        Ok(self
            .container_transition("kill", selection, move |rt, ctr, all| {
                lifecycle::kill(rt, ctr, signal, all)
            })
            .await)
    }

    /// Pauses containers.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for an unresolvable selection.
    pub async fn container_pause(
        &self,
        names: &[String],
        opts: &BulkOptions,
    ) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let selection = self.select::<Container>(names, opts).await?;
        Ok(self
            .container_transition("pause", selection, lifecycle::pause)
            .await)
    }

    /// Unpauses containers.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for an unresolvable selection.
    pub async fn container_unpause(
        &self,
        names: &[String],
        opts: &BulkOptions,
    ) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let selection = self.select::<Container>(names, opts).await?;
        Ok(self
            .container_transition("unpause", selection, lifecycle::unpause)
            .await)
    }

    /// Restarts containers.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for an unresolvable selection.
    pub async fn container_restart(
        &self,
        names: &[String],
        opts: &RestartOptions,
    ) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let mut selection = self.select::<Container>(names, &opts.bulk).await?;
        if opts.running {
            selection.retain(|c| c.state == ContainerState::Running);
        }
        let timeout = self.stop_timeout(opts.timeout);
        Ok(self
            .container_transition("restart", selection, move |rt, ctr, all| {
                lifecycle::restart(rt, ctr, timeout, all)
            })
            .await)
    }

    /// Removes containers.
    ///
    /// With `depend`, each container's dependents are removed first. With
    /// `all`, infra and depended-on containers are removed before the rest
    /// are removed in parallel. With `force`, names that fail to resolve
    /// are evicted one by one.
    ///
    /// # Errors
    ///
    /// Fails as a whole for invalid inputs, or when resolution fails and
    /// neither `ignore` nor `force` excuses it.
    pub async fn container_rm(
        &self,
        names: &[String],
        opts: &RmOptions,
    ) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let remove_opts = RemoveOptions {
            force: opts.force,
            volumes: opts.volumes,
            timeout: opts.timeout,
            as_part_of_pod: false,
        };
        let plan = self.plan::<Container>(names, &opts.bulk).await?;
        let (resolution, all) = self.resolve_plan(plan).await?;
        let unresolved = resolution
            .first_error()
            .filter(|err| opts.force && !(opts.bulk.ignore && err.is_not_found()));
        if let Some(err) = unresolved {
            tracing::debug!(%err, "resolution failed, evicting containers by name");
            let reports = self.evict_containers(names, remove_opts, opts.bulk.ignore).await?;
            return Ok(finish("rm", reports));
        }
        let selection = Selection {
            targets: resolution.into_pairs(opts.bulk.ignore)?,
            all,
        };
        tracing::info!(count = selection.targets.len(), all = selection.all, depend = opts.depend, "removing containers");
        let reports = self.remove_containers(selection, remove_opts, opts.depend).await;
        Ok(finish("rm", reports))
    }

    /// Removes every stopped container matching `filters`. Reports carry
    /// the reclaimed size.
    ///
    /// # Errors
    ///
    /// Fails as a whole for invalid filters.
    pub async fn container_prune(&self, filters: &[String]) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let bulk = BulkOptions {
            all: true,
            filters: filters.to_vec(),
            ..BulkOptions::default()
        };
        let mut selection = self.select::<Container>(&[], &bulk).await?;
        selection.retain(|c| !c.state.is_active() && !c.is_infra);
        let reports = self
            .remove_containers(selection, RemoveOptions::default(), false)
            .await;
        Ok(finish("prune", reports))
    }

    /// Lists containers matching the filters, newest first. Only running
    /// containers are listed unless `all` is set.
    ///
    /// # Errors
    ///
    /// Fails for invalid filters or an unreadable store.
    pub async fn container_list(&self, opts: &ListOptions) -> Result<Vec<Container>> {
        let all = opts.all;
        self.list::<Container>(&opts.filters, move |c| {
            all || c.state == ContainerState::Running
        })
        .await
    }

    /// Returns `true` if a container with that name or ID exists.
    ///
    /// # Errors
    ///
    /// Fails for lookup errors other than not-found.
    pub async fn container_exists(&self, name_or_id: &str) -> Result<bool> {
        self.ensure_running()?;
        let runtime = Arc::clone(&self.runtime);
        let name = name_or_id.to_string();
        match blocking(move || runtime.lookup_container(&name)).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_container_gone() => Ok(false),
            Err(err) => Err(err),
        }
    }

    // ── Pods ────────────────────────────────────────────────────

    /// Stops every container of the selected pods.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for an unresolvable selection.
    pub async fn pod_stop(
        &self,
        names: &[String],
        opts: &PodStopOptions,
    ) -> Result<Vec<OperationReport>> {
        let timeout = self.stop_timeout(opts.timeout);
        self.pod_transition(names, &opts.bulk, Transition::Stop, |_| true, move |rt, ctr| {
            lifecycle::stop(rt, ctr, timeout, true)
        })
        .await
    }

    /// Signals the running containers of the selected pods.
    ///
    /// # Errors
    ///
    /// Fails as a whole for an out-of-range signal or an unresolvable
    /// selection.
    pub async fn pod_kill(
        &self,
        names: &[String],
        opts: &KillOptions,
    ) -> Result<Vec<OperationReport>> {
        let signal = self.kill_signal(opts.signal)?;
        self.pod_transition(
            names,
            &opts.bulk,
            Transition::Kill,
            |c| c.state == ContainerState::Running,
            move |rt, ctr| lifecycle::kill(rt, ctr, signal, true),
        )
        .await
    }

    /// Pauses the running containers of the selected pods.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for an unresolvable selection.
    pub async fn pod_pause(
        &self,
        names: &[String],
        opts: &BulkOptions,
    ) -> Result<Vec<OperationReport>> {
        self.pod_transition(
            names,
            opts,
            Transition::Pause,
            |c| c.state == ContainerState::Running,
            |rt, ctr| lifecycle::pause(rt, ctr, true),
        )
        .await
    }

    /// Unpauses the paused containers of the selected pods.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for an unresolvable selection.
    pub async fn pod_unpause(
        &self,
        names: &[String],
        opts: &BulkOptions,
    ) -> Result<Vec<OperationReport>> {
        self.pod_transition(
            names,
            opts,
            Transition::Unpause,
            |c| c.state == ContainerState::Paused,
            |rt, ctr| lifecycle::unpause(rt, ctr, true),
        )
        .await
    }

    /// Restarts every container of the selected pods.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for an unresolvable selection.
    pub async fn pod_restart(
        &self,
        names: &[String],
        opts: &PodStopOptions,
    ) -> Result<Vec<OperationReport>> {
        let timeout = self.stop_timeout(opts.timeout);
        self.pod_transition(names, &opts.bulk, Transition::Restart, |_| true, move |rt, ctr| {
            lifecycle::restart(rt, ctr, timeout, true)
        })
        .await
    }

    /// Removes pods with their members, one pod at a time. Member reports
    /// precede their pod's report.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for an unresolvable selection.
    pub async fn pod_rm(
        &self,
        names: &[String],
        opts: &PodRmOptions,
    ) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let selection = self.select::<Pod>(names, &opts.bulk).await?;
        let remove_opts = RemoveOptions {
            force: opts.force,
            timeout: opts.timeout,
            ..RemoveOptions::default()
        };
        Ok(finish("pod rm", self.remove_pods(selection, remove_opts).await))
    }

    async fn remove_pods(&self, selection: Selection<Pod>, opts: RemoveOptions) -> Vec<OperationReport> {
        tracing::info!(count = selection.targets.len(), "removing pods");
        let session = Arc::new(RemovalSession::new());
        self.removal_chains(
            selection.targets,
            &session,
            move |rt: &dyn Runtime,
                  session: &RemovalSession,
                  pod: &Pod,
                  raw: &str,
                  reports: &mut Vec<OperationReport>| {
                removal::remove_pod_with_dependents(rt, session, pod, raw, &opts, reports)
            },
        )
        .await
    }

    /// Removes every pod matching `filters` that has no running or paused
    /// members.
    ///
    /// # Errors
    ///
    /// Fails as a whole for invalid filters.
    pub async fn pod_prune(&self, filters: &[String]) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let bulk = BulkOptions {
            all: true,
            filters: filters.to_vec(),
            ..BulkOptions::default()
        };
        let mut selection = self.select::<Pod>(&[], &bulk).await?;
        selection.retain(|p| {
            matches!(
                p.status(),
                PodStatus::Exited | PodStatus::Stopped | PodStatus::Created
            ) && !p.has_active_members()
        });
        Ok(finish("pod prune", self.remove_pods(selection, RemoveOptions::default()).await))
    }

    /// Lists pods matching the filters, newest first.
    ///
    /// # Errors
    ///
    /// Fails for invalid filters or an unreadable store.
    pub async fn pod_list(&self, filters: &[String]) -> Result<Vec<Pod>> {
        self.list::<Pod>(filters, |_| true).await
    }

    // ── Volumes ─────────────────────────────────────────────────

    /// Removes volumes. With `force`, containers using them are removed too.
    ///
    /// # Errors
    ///
    /// Fails as a whole only for an unresolvable selection.
    pub async fn volume_rm(
        &self,
        names: &[String],
        opts: &VolumeRmOptions,
    ) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let selection = self.select::<Volume>(names, &opts.bulk).await?;
        let remove_opts = RemoveOptions {
            force: opts.force,
            ..RemoveOptions::default()
        };
        Ok(self.remove_volumes("volume rm", selection, remove_opts, false).await)
    }

    /// Removes every dangling volume matching `filters`. Reports carry the
    /// reclaimed size.
    ///
    /// # Errors
    ///
    /// Fails as a whole for invalid filters.
    pub async fn volume_prune(&self, filters: &[String]) -> Result<Vec<OperationReport>> {
        self.ensure_running()?;
        let bulk = BulkOptions {
            all: true,
            filters: filters.to_vec(),
            ..BulkOptions::default()
        };
        let mut selection = self.select::<Volume>(&[], &bulk).await?;
        selection.retain(Volume::is_dangling);
        Ok(self
            .remove_volumes("volume prune", selection, RemoveOptions::default(), true)
            .await)
    }

    /// Lists volumes matching the filters, newest first.
    ///
    /// # Errors
    ///
    /// Fails for invalid filters or an unreadable store.
    pub async fn volume_list(&self, filters: &[String]) -> Result<Vec<Volume>> {
        self.list::<Volume>(filters, |_| true).await
    }
}

/// Turns coordinator results into reports in selection order.
///
/// `size` is consulted for successful objects only.
fn reports_in_order<T: ManagedObject>(
    targets: Vec<(T, String)>,
    mut results: HashMap<String, Result<()>>,
    size: impl Fn(&T) -> Option<u64>,
) -> Vec<OperationReport> {
    targets
        .into_iter()
        .filter_map(|(object, raw)| {
            let result = results.remove(object.id())?;
            let reclaimed = if result.is_ok() { size(&object) } else { None };
            Some(OperationReport::from_result(object.id(), raw, result).with_size(reclaimed))
        })
        .collect()
}

fn finish(operation: &'static str, reports: Vec<OperationReport>) -> Vec<OperationReport> {
    tracing::info!(
        operation,
        total = reports.len(),
        failed = report::collect_errors(&reports).len(),
        reclaimed = report::sum_size(&reports),
        "bulk operation finished"
    );
    reports
}

/// Reads the container ID from the first line of a cidfile.
fn read_cidfile(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| CorralError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    content
        .lines()
        .next()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| {
            CorralError::invalid_argument(format!("cidfile {} is empty", path.display()))
        })
}
