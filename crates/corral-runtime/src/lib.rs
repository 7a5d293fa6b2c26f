//! Object model and runtime seam for the corral engine.
//!
//! The engine never touches storage or the OCI runtime directly. It reads
//! immutable object snapshots and requests transitions through the
//! [`Runtime`](backend::Runtime) trait, which [`MemoryRuntime`](backend::memory::MemoryRuntime)
//! implements on top of a JSON state file.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod container;
pub mod network;
pub mod object;
pub mod pod;
pub mod state;
pub mod volume;
