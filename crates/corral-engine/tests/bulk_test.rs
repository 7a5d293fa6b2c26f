//! Integration tests for bulk lifecycle commands.
//!
//! A recording runtime wraps the in-memory runtime so the tests can
//! assert the order and multiplicity of removal primitives, not only the
//! final state.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use corral_common::config::EngineConfig;
use corral_common::error::{ErrorKind, Result};
use corral_common::types::{ContainerId, ContainerState, PodId};
use corral_engine::report::{self, OperationReport};
use corral_engine::{
    BulkOptions, Engine, KillOptions, PodRmOptions, PodStopOptions, RmOptions, StopOptions,
    VolumeRmOptions,
};
use corral_runtime::backend::memory::MemoryRuntime;
use corral_runtime::backend::{RemoveOptions, Runtime};
use corral_runtime::container::Container;
use corral_runtime::network::Network;
use corral_runtime::pod::Pod;
use corral_runtime::volume::Volume;

/// Delegates to [`MemoryRuntime`] and records every removal primitive.
#[derive(Default)]
struct RecordingRuntime {
    inner: MemoryRuntime,
    removals: Mutex<Vec<String>>,
}

impl RecordingRuntime {
    fn removals(&self) -> Vec<String> {
        self.removals.lock().unwrap().clone()
    }

    fn record(&self, id: &str) {
        self.removals.lock().unwrap().push(id.to_string());
    }
}

impl Runtime for RecordingRuntime {
    fn lookup_container(&self, name_or_id: &str) -> Result<Container> {
        self.inner.lookup_container(name_or_id)
    }

    fn lookup_pod(&self, name_or_id: &str) -> Result<Pod> {
        self.inner.lookup_pod(name_or_id)
    }

    fn lookup_volume(&self, name: &str) -> Result<Volume> {
        self.inner.lookup_volume(name)
    }

    fn all_containers(&self) -> Result<Vec<Container>> {
        self.inner.all_containers()
    }

    fn all_pods(&self) -> Result<Vec<Pod>> {
        self.inner.all_pods()
    }

    fn all_volumes(&self) -> Result<Vec<Volume>> {
        self.inner.all_volumes()
    }

    fn pod_containers(&self, pod: &PodId) -> Result<Vec<Container>> {
        self.inner.pod_containers(pod)
    }

    fn container_dependents(&self, id: &ContainerId) -> Result<Vec<ContainerId>> {
        self.inner.container_dependents(id)
    }

    fn network_inspect(&self, name_or_id: &str) -> Result<Network> {
        self.inner.network_inspect(name_or_id)
    }

    fn stop_container(&self, id: &ContainerId, timeout: Option<u32>) -> Result<()> {
        self.inner.stop_container(id, timeout)
    }

    fn cleanup_container(&self, id: &ContainerId) -> Result<()> {
        self.inner.cleanup_container(id)
    }

    fn kill_container(&self, id: &ContainerId, signal: i32) -> Result<()> {
        self.inner.kill_container(id, signal)
    }

    fn pause_container(&self, id: &ContainerId) -> Result<()> {
        self.inner.pause_container(id)
    }

    fn unpause_container(&self, id: &ContainerId) -> Result<()> {
        self.inner.unpause_container(id)
    }

    fn restart_container(&self, id: &ContainerId, timeout: Option<u32>) -> Result<()> {
        self.inner.restart_container(id, timeout)
    }

    fn remove_container(&self, id: &ContainerId, opts: &RemoveOptions) -> Result<()> {
        self.record(id.as_str());
        self.inner.remove_container(id, opts)
    }

    fn remove_pod(&self, id: &PodId, opts: &RemoveOptions) -> Result<()> {
        self.record(id.as_str());
        self.inner.remove_pod(id, opts)
    }

    fn remove_volume(&self, name: &str, opts: &RemoveOptions) -> Result<()> {
        self.record(name);
        self.inner.remove_volume(name, opts)
    }
}

fn engine(rt: &Arc<RecordingRuntime>) -> Engine {
    let config = EngineConfig {
        parallelism: Some(4),
        ..EngineConfig::default()
    };
    Engine::new(Arc::clone(rt) as Arc<dyn Runtime>, config)
}

fn names(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

fn position(order: &[String], id: &ContainerId) -> usize {
    order
        .iter()
        .position(|r| r == id.as_str())
        .unwrap_or_else(|| panic!("{id} was never removed"))
}

fn running(name: &str) -> Container {
    Container::new(name, "docker.io/library/alpine:latest").in_state(ContainerState::Running)
}

fn exited(name: &str) -> Container {
    Container::new(name, "docker.io/library/alpine:latest").exited_with(0)
}

// ── Stop and pod removal ────────────────────────────────────────────

#[tokio::test]
async fn stop_all_then_remove_pod_with_infra() {
    let rt = Arc::new(RecordingRuntime::default());
    let pod_id = rt.inner.insert_pod(Pod::new("P")).unwrap();
    let a = rt.inner.insert_container(running("A")).unwrap();
    let b = rt
        .inner
        .insert_container(Container::new("B", "x").in_state(ContainerState::Stopped))
        .unwrap();
    let c = rt
        .inner
        .insert_container(running("C").in_pod(pod_id.clone(), true))
        .unwrap();
    let engine = engine(&rt);

    let opts = StopOptions {
        bulk: BulkOptions {
            all: true,
            ..BulkOptions::default()
        },
        ..StopOptions::default()
    };
    let reports = engine.container_stop(&[], &opts).await.unwrap();
    assert_eq!(reports.len(), 3);
    assert!(!report::has_errors(&reports));
    for id in [&a, &b, &c] {
        assert_eq!(
            rt.lookup_container(id.as_str()).unwrap().state,
            ContainerState::Exited
        );
    }

    let reports = engine
        .pod_rm(&names(&["P"]), &PodRmOptions::default())
        .await
        .unwrap();
    let ids = report::collect_ids(&reports);
    assert_eq!(ids, vec![c.as_str(), pod_id.as_str()]);
    assert_eq!(reports[1].raw_input, "P");
    assert!(!report::has_errors(&reports));
    assert!(rt.lookup_pod("P").unwrap_err().is_not_found());
}

#[tokio::test]
async fn named_stop_of_never_started_container_is_reported() {
    let rt = Arc::new(RecordingRuntime::default());
    let _ = rt.inner.insert_container(Container::new("fresh", "x")).unwrap();
    let _ = rt.inner.insert_container(running("live")).unwrap();
    let engine = engine(&rt);

    let reports = engine
        .container_stop(&names(&["fresh", "live"]), &StopOptions::default())
        .await
        .unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].raw_input, "fresh");
    assert!(
        reports[0]
            .err
            .as_ref()
            .is_some_and(|e| e.is(ErrorKind::ContainerStateInvalid))
    );
    assert!(reports[1].is_ok());
}

#[tokio::test]
async fn pod_stop_stops_every_member() {
    let rt = Arc::new(RecordingRuntime::default());
    let pod_id = rt.inner.insert_pod(Pod::new("web")).unwrap();
    let one = rt
        .inner
        .insert_container(running("one").in_pod(pod_id.clone(), false))
        .unwrap();
    let two = rt
        .inner
        .insert_container(running("two").in_pod(pod_id.clone(), false))
        .unwrap();
    let engine = engine(&rt);

    let reports = engine
        .pod_stop(&names(&["web"]), &PodStopOptions::default())
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].id, pod_id.as_str());
    assert!(reports[0].is_ok());
    for id in [&one, &two] {
        assert!(!rt.lookup_container(id.as_str()).unwrap().state.is_active());
    }
}

#[tokio::test]
async fn pod_kill_only_signals_running_members() {
    let rt = Arc::new(RecordingRuntime::default());
    let pod_id = rt.inner.insert_pod(Pod::new("jobs")).unwrap();
    let live = rt
        .inner
        .insert_container(running("live").in_pod(pod_id.clone(), false))
        .unwrap();
    let _ = rt
        .inner
        .insert_container(exited("done").in_pod(pod_id, false))
        .unwrap();
    let engine = engine(&rt);

    let reports = engine
        .pod_kill(&names(&["jobs"]), &KillOptions::default())
        .await
        .unwrap();
    assert!(reports[0].is_ok());
    let killed = rt.lookup_container(live.as_str()).unwrap();
    assert!(!killed.state.is_active());
    assert!(killed.exited);
    assert_eq!(killed.exit_code, 128 + 9);
}

// ── Dependency-aware removal ────────────────────────────────────────

#[tokio::test]
async fn diamond_is_removed_once_dependents_first() {
    let rt = Arc::new(RecordingRuntime::default());
    let base = rt.inner.insert_container(exited("base")).unwrap();
    let left = rt
        .inner
        .insert_container(exited("left").depends_on(base.clone()))
        .unwrap();
    let right = rt
        .inner
        .insert_container(exited("right").depends_on(base.clone()))
        .unwrap();
    let top = rt
        .inner
        .insert_container(
            exited("top")
                .depends_on(left.clone())
                .depends_on(right.clone()),
        )
        .unwrap();
    let engine = engine(&rt);

    let opts = RmOptions {
        depend: true,
        ..RmOptions::default()
    };
    let reports = engine.container_rm(&names(&["base"]), &opts).await.unwrap();
    assert_eq!(reports.len(), 4);
    assert!(!report::has_errors(&reports));
    assert_eq!(reports[3].raw_input, "base");

    let order = rt.removals();
    assert_eq!(order.len(), 4);
    assert!(position(&order, &top) < position(&order, &left));
    assert!(position(&order, &top) < position(&order, &right));
    assert!(position(&order, &left) < position(&order, &base));
    assert!(position(&order, &right) < position(&order, &base));
}

#[tokio::test]
async fn remove_all_takes_dependents_before_their_dependencies() {
    let rt = Arc::new(RecordingRuntime::default());
    let db = rt.inner.insert_container(exited("db")).unwrap();
    let app = rt
        .inner
        .insert_container(exited("app").depends_on(db.clone()))
        .unwrap();
    let _ = rt.inner.insert_container(exited("lonely")).unwrap();
    let engine = engine(&rt);

    let opts = RmOptions {
        bulk: BulkOptions {
            all: true,
            ..BulkOptions::default()
        },
        ..RmOptions::default()
    };
    let reports = engine.container_rm(&[], &opts).await.unwrap();
    assert_eq!(reports.len(), 3);
    assert!(!report::has_errors(&reports));

    let order = rt.removals();
    assert_eq!(order.len(), 3);
    assert!(position(&order, &app) < position(&order, &db));
    assert!(rt.all_containers().unwrap().is_empty());
}

#[tokio::test]
async fn remove_all_takes_pod_members_then_infra_then_pod() {
    let rt = Arc::new(RecordingRuntime::default());
    let pod_id = rt.inner.insert_pod(Pod::new("web")).unwrap();
    let infra = rt
        .inner
        .insert_container(exited("web-infra").in_pod(pod_id.clone(), true))
        .unwrap();
    let member = rt
        .inner
        .insert_container(
            exited("web-app")
                .in_pod(pod_id.clone(), false)
                .depends_on(infra.clone()),
        )
        .unwrap();
    let lonely = rt.inner.insert_container(exited("lonely")).unwrap();
    let engine = engine(&rt);

    let opts = RmOptions {
        bulk: BulkOptions {
            all: true,
            ..BulkOptions::default()
        },
        ..RmOptions::default()
    };
    let reports = engine.container_rm(&[], &opts).await.unwrap();
    assert!(!report::has_errors(&reports));

    let order = rt.removals();
    assert_eq!(
        &order[..3],
        [member.to_string(), infra.to_string(), pod_id.to_string()]
    );
    assert_eq!(order.len(), 4);
    assert!(order.contains(&lonely.to_string()));

    let ids = report::collect_ids(&reports);
    assert_eq!(ids.len(), 4);
    assert_eq!(ids.iter().filter(|id| **id == member.as_str()).count(), 1);
    assert!(rt.all_containers().unwrap().is_empty());
    assert!(rt.all_pods().unwrap().is_empty());
}

#[tokio::test]
async fn repeated_name_is_removed_once() {
    let rt = Arc::new(RecordingRuntime::default());
    let id = rt.inner.insert_container(exited("dup")).unwrap();
    let engine = engine(&rt);

    let reports = engine
        .container_rm(&names(&["dup", "dup", id.as_str()]), &RmOptions::default())
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].raw_input, "dup");
    assert_eq!(rt.removals(), vec![id.to_string()]);
}

#[tokio::test]
async fn running_dependent_blocks_target_without_force() {
    let rt = Arc::new(RecordingRuntime::default());
    let base = rt.inner.insert_container(exited("base")).unwrap();
    let _ = rt
        .inner
        .insert_container(running("busy").depends_on(base.clone()))
        .unwrap();
    let engine = engine(&rt);

    let opts = RmOptions {
        depend: true,
        ..RmOptions::default()
    };
    let reports = engine.container_rm(&names(&["base"]), &opts).await.unwrap();
    assert_eq!(reports.len(), 1);
    let err = reports[0].err.as_ref().expect("target should fail");
    assert_eq!(err.kind(), ErrorKind::ContainerStateInvalid);
    assert!(err.to_string().contains("removing dependent container"));
    assert!(rt.lookup_container("base").is_ok());

    let forced = RmOptions {
        depend: true,
        force: true,
        ..RmOptions::default()
    };
    let reports = engine.container_rm(&names(&["base"]), &forced).await.unwrap();
    assert_eq!(reports.len(), 2);
    assert!(!report::has_errors(&reports));
}

#[tokio::test]
async fn removing_infra_container_removes_its_pod() {
    let rt = Arc::new(RecordingRuntime::default());
    let pod_id = rt.inner.insert_pod(Pod::new("svc")).unwrap();
    let infra = rt
        .inner
        .insert_container(exited("svc-infra").in_pod(pod_id.clone(), true))
        .unwrap();
    let member = rt
        .inner
        .insert_container(exited("svc-app").in_pod(pod_id.clone(), false))
        .unwrap();
    let engine = engine(&rt);

    let opts = RmOptions {
        depend: true,
        ..RmOptions::default()
    };
    let reports = engine
        .container_rm(&names(&["svc-infra"]), &opts)
        .await
        .unwrap();
    let ids = report::collect_ids(&reports);
    assert_eq!(ids, vec![member.as_str(), infra.as_str(), pod_id.as_str()]);
    assert!(rt.lookup_pod("svc").is_err());
}

// ── Resolution ──────────────────────────────────────────────────────

#[tokio::test]
async fn ignore_drops_missing_names() {
    let rt = Arc::new(RecordingRuntime::default());
    let _ = rt.inner.insert_container(exited("real")).unwrap();
    let engine = engine(&rt);

    let strict = engine
        .container_rm(&names(&["real", "ghost"]), &RmOptions::default())
        .await
        .unwrap_err();
    assert_eq!(strict.kind(), ErrorKind::NoSuchContainer);
    assert!(rt.removals().is_empty());

    let opts = RmOptions {
        bulk: BulkOptions {
            ignore: true,
            ..BulkOptions::default()
        },
        ..RmOptions::default()
    };
    let reports = engine
        .container_rm(&names(&["real", "ghost"]), &opts)
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].raw_input, "real");
}

#[tokio::test]
async fn forced_remove_evicts_by_name_when_resolution_fails() {
    let rt = Arc::new(RecordingRuntime::default());
    let real = rt.inner.insert_container(running("real")).unwrap();
    let engine = engine(&rt);

    let opts = RmOptions {
        force: true,
        ..RmOptions::default()
    };
    let reports = engine
        .container_rm(&names(&["real", "ghost"]), &opts)
        .await
        .unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].id, real.as_str());
    assert!(reports[0].is_ok());
    assert_eq!(reports[1].raw_input, "ghost");
    assert!(
        reports[1]
            .err
            .as_ref()
            .is_some_and(|e| e.is(ErrorKind::NoSuchContainer))
    );
}

#[tokio::test]
async fn forced_remove_with_bad_filter_touches_nothing() {
    let rt = Arc::new(RecordingRuntime::default());
    let _ = rt.inner.insert_container(running("web")).unwrap();
    let engine = engine(&rt);

    for filter in ["status=sleepy", "status", "until=someday", "exited=zero", "colour=red"] {
        let opts = RmOptions {
            force: true,
            bulk: BulkOptions {
                filters: names(&[filter]),
                ..BulkOptions::default()
            },
            ..RmOptions::default()
        };
        let result = engine.container_rm(&names(&["web"]), &opts).await;
        assert!(result.is_err(), "{filter}");
    }
    assert!(rt.removals().is_empty());
    assert!(rt.lookup_container("web").is_ok());
}

#[tokio::test]
async fn conflicting_selection_is_rejected() {
    let rt = Arc::new(RecordingRuntime::default());
    let engine = engine(&rt);
    let opts = StopOptions {
        bulk: BulkOptions {
            all: true,
            latest: true,
            ..BulkOptions::default()
        },
        ..StopOptions::default()
    };
    let err = engine.container_stop(&[], &opts).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

// ── Prune ───────────────────────────────────────────────────────────

#[tokio::test]
async fn container_prune_reclaims_stopped_containers() {
    let rt = Arc::new(RecordingRuntime::default());
    let mut old = exited("old");
    old.size_bytes = Some(1024);
    let mut older = exited("older");
    older.size_bytes = Some(2048);
    let _ = rt.inner.insert_container(old).unwrap();
    let _ = rt.inner.insert_container(older).unwrap();
    let _ = rt.inner.insert_container(running("keep")).unwrap();
    let engine = engine(&rt);

    let reports = engine.container_prune(&[]).await.unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(report::sum_size(&reports), 3072);
    assert!(rt.lookup_container("keep").is_ok());
}

#[tokio::test]
async fn volume_prune_skips_volumes_in_use() {
    let rt = Arc::new(RecordingRuntime::default());
    let mut cache = Volume::new("cache");
    cache.size_bytes = 4096;
    rt.inner.insert_volume(cache).unwrap();
    rt.inner.insert_volume(Volume::new("data")).unwrap();
    let _ = rt
        .inner
        .insert_container(running("db").with_volume("data", "/var/lib/db"))
        .unwrap();
    let engine = engine(&rt);

    let reports = engine.volume_prune(&[]).await.unwrap();
    assert_eq!(report::collect_ids(&reports), vec!["cache"]);
    assert_eq!(report::sum_size(&reports), 4096);
    assert!(rt.lookup_volume("data").is_ok());
}

#[tokio::test]
async fn volume_rm_in_use_needs_force() {
    let rt = Arc::new(RecordingRuntime::default());
    rt.inner.insert_volume(Volume::new("data")).unwrap();
    let _ = rt
        .inner
        .insert_container(running("db").with_volume("data", "/var/lib/db"))
        .unwrap();
    let engine = engine(&rt);

    let reports = engine
        .volume_rm(&names(&["data"]), &VolumeRmOptions::default())
        .await
        .unwrap();
    assert!(
        reports[0]
            .err
            .as_ref()
            .is_some_and(|e| e.is(ErrorKind::VolumeInUse))
    );

    let forced = VolumeRmOptions {
        force: true,
        ..VolumeRmOptions::default()
    };
    let reports = engine.volume_rm(&names(&["data"]), &forced).await.unwrap();
    assert!(reports[0].is_ok());
    assert!(rt.lookup_container("db").is_err());
}

#[tokio::test]
async fn forced_volume_rm_leaves_no_orphans() {
    let rt = Arc::new(RecordingRuntime::default());
    rt.inner.insert_volume(Volume::new("data")).unwrap();
    let pod_id = rt.inner.insert_pod(Pod::new("p")).unwrap();
    let infra = rt
        .inner
        .insert_container(
            exited("p-infra")
                .in_pod(pod_id.clone(), true)
                .with_volume("data", "/data"),
        )
        .unwrap();
    let base = rt
        .inner
        .insert_container(exited("base").with_volume("data", "/data"))
        .unwrap();
    let dep = rt
        .inner
        .insert_container(running("dep").depends_on(base.clone()))
        .unwrap();
    let engine = engine(&rt);

    let forced = VolumeRmOptions {
        force: true,
        ..VolumeRmOptions::default()
    };
    let reports = engine.volume_rm(&names(&["data"]), &forced).await.unwrap();
    assert!(!report::has_errors(&reports));

    let order = rt.removals();
    assert!(position(&order, &infra) < order.iter().position(|r| *r == pod_id.as_str()).unwrap());
    assert!(position(&order, &dep) < position(&order, &base));
    assert_eq!(order.last().map(String::as_str), Some("data"));
    assert!(rt.all_containers().unwrap().is_empty());
    assert!(rt.lookup_pod("p").is_err());
    assert!(rt.lookup_volume("data").is_err());
}

// ── Aggregation and lifecycle of the engine ─────────────────────────

#[test]
fn aggregation_skips_absent_reports() {
    let reports: Vec<Option<OperationReport>> = vec![
        Some(OperationReport::ok("a", "a").with_size(Some(10))),
        None,
        Some(OperationReport::ok("b", "b").with_size(Some(5))),
    ];
    assert_eq!(report::collect_ids(&reports), vec!["a", "b"]);
    assert_eq!(report::sum_size(&reports), 15);
    assert!(!report::has_errors(&reports));
}

#[tokio::test]
async fn cancelled_engine_reports_every_object_as_cancelled() {
    let rt = Arc::new(RecordingRuntime::default());
    let _ = rt.inner.insert_container(running("one")).unwrap();
    let _ = rt.inner.insert_container(running("two")).unwrap();
    let engine = engine(&rt);
    engine.cancellation_token().cancel();

    let opts = BulkOptions {
        all: true,
        ..BulkOptions::default()
    };
    let reports = engine.container_pause(&[], &opts).await.unwrap();
    assert_eq!(reports.len(), 2);
    assert!(
        report::collect_errors(&reports)
            .iter()
            .all(|e| e.is(ErrorKind::Cancelled))
    );
    assert_eq!(rt.lookup_container("one").unwrap().state, ContainerState::Running);
}

#[tokio::test]
async fn shutdown_twice_then_commands_fail() {
    let rt = Arc::new(RecordingRuntime::default());
    let engine = engine(&rt);
    engine.shutdown().unwrap();
    engine.shutdown().unwrap();
    let err = engine
        .pod_rm(&names(&["anything"]), &PodRmOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EngineStopped);
}
