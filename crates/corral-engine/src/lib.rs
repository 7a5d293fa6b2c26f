//! Filter engine and bulk lifecycle coordinator.
//!
//! [`Engine`] resolves names, IDs, `--all` and `--latest` selections into
//! object snapshots, narrows them with `key=value` filters, and applies
//! stop, kill, pause, restart, and removal to many containers, pods, or
//! volumes at once. Every attempted object yields an [`OperationReport`];
//! a single object's failure never aborts its siblings.
//!
//! Removal walks the dependency graph so that dependents go before the
//! containers they depend on and pod members go before their pod, each
//! object exactly once per command.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod engine;
pub mod filter;
pub mod lifecycle;
pub mod options;
pub mod parallel;
pub mod removal;
pub mod report;
pub mod resolve;

pub use engine::Engine;
pub use options::{
    BulkOptions, KillOptions, ListOptions, PodRmOptions, PodStopOptions, RestartOptions,
    RmOptions, StopOptions, VolumeRmOptions,
};
pub use report::OperationReport;
