//! Per-worker task submission with an all-or-nothing barrier.

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::ClusterContext;
use crate::types::{Result, StrataError, WorkerFailure, WorkerId};

/// Handle to a task submitted for one worker.
#[derive(Debug)]
pub struct TaskHandle<T> {
    worker: WorkerId,
    inner: JoinHandle<Result<T>>,
}

impl<T> TaskHandle<T> {
    /// Worker the task runs for.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }
}

impl ClusterContext {
    /// Submits a blocking task to run on behalf of `worker`.
    ///
    /// Must be called from within a tokio runtime. Fails when the cluster is
    /// closed or the worker is not part of it; the task itself is not started
    /// in that case.
    pub fn submit<T, F>(&self, worker: WorkerId, task: F) -> Result<TaskHandle<T>>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_open()?;
        if !self.contains(worker) {
            return Err(StrataError::Cluster(format!(
                "{worker} is not part of session {}",
                self.session_id()
            )));
        }
        debug!(%worker, "task submitted");
        Ok(TaskHandle {
            worker,
            inner: tokio::task::spawn_blocking(task),
        })
    }
}

/// Waits for every handle, then returns all results in submission order, or
/// every failure when at least one task failed or panicked.
///
/// No handle is dropped early: the barrier always resolves the full set
/// before reporting.
pub async fn join_all<T>(handles: Vec<TaskHandle<T>>) -> std::result::Result<Vec<(WorkerId, T)>, Vec<WorkerFailure>> {
    let mut results = Vec::with_capacity(handles.len());
    let mut failures = Vec::new();
    for handle in handles {
        let worker = handle.worker;
        match handle.inner.await {
            Ok(Ok(value)) => results.push((worker, value)),
            Ok(Err(err)) => {
                warn!(%worker, error = %err, "worker task failed");
                failures.push(WorkerFailure {
                    worker,
                    reason: err.to_string(),
                });
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "task panicked".to_string()
                } else {
                    format!("task did not complete: {join_err}")
                };
                warn!(%worker, %reason, "worker task aborted");
                failures.push(WorkerFailure { worker, reason });
            }
        }
    }
    if failures.is_empty() {
        Ok(results)
    } else {
        Err(failures)
    }
}
