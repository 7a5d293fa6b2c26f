//! Bulk operation coordinator.
//!
//! Runs one operation per object on a bounded pool and collects the
//! results keyed by object ID. A failure never cancels siblings; only
//! the cancellation token stops further dispatch.

use std::collections::{HashMap, HashSet};
use std::future::Future;

use corral_common::error::{CorralError, Result};
use corral_runtime::object::ManagedObject;
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;

/// How objects are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Independent objects, up to the worker limit at a time, completing
    /// in any order.
    Parallel,
    /// One object at a time, in input order.
    Sequential,
}

/// Dispatches per-object operations under a worker limit.
#[derive(Debug, Clone)]
pub struct Coordinator {
    limit: usize,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a coordinator running at most `limit` objects at once.
    #[must_use]
    pub fn new(limit: usize, cancel: CancellationToken) -> Self {
        Self {
            limit: limit.max(1),
            cancel,
        }
    }

    /// Applies `op` to every object and waits for all of them.
    ///
    /// Each object is attempted at most once; repeated IDs are dropped.
    /// Objects not yet dispatched when the token is cancelled get a
    /// [`CorralError::Cancelled`] result, while in-flight operations
    /// run to completion.
    pub async fn apply<T, R, F, Fut>(
        &self,
        objects: Vec<T>,
        mode: ExecutionMode,
        op: F,
    ) -> HashMap<String, Result<R>>
    where
        T: ManagedObject,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let width = match mode {
            ExecutionMode::Parallel => self.limit,
            ExecutionMode::Sequential => 1,
        };
        let mut seen = HashSet::new();
        let unique: Vec<T> = objects
            .into_iter()
            .filter(|o| seen.insert(o.id().to_string()))
            .collect();
        let kind = T::KIND;
        tracing::debug!(%kind, count = unique.len(), width, "dispatching bulk operation");

        let cancel = &self.cancel;
        let op = &op;
        stream::iter(unique)
            .map(|object| {
                let id = object.id().to_string();
                let dispatched = (!cancel.is_cancelled()).then(|| op(object));
                async move {
                    let result = match dispatched {
                        Some(fut) => fut.await,
                        None => {
                            tracing::debug!(id = %id, "not dispatched, operation cancelled");
                            Err(CorralError::Cancelled { id: id.clone() })
                        }
                    };
                    (id, result)
                }
            })
            .buffer_unordered(width)
            .collect()
            .await
    }
}

/// Runs a blocking runtime call on the blocking thread pool.
///
/// # Errors
///
/// Returns the call's own error, or [`CorralError::Storage`] if the
/// worker thread panicked.
pub async fn blocking<R, F>(f: F) -> Result<R>
where
    F: FnOnce() -> Result<R> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CorralError::Storage {
            message: format!("worker task failed: {e}"),
        })?
}
