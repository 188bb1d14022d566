//! Shared identifiers and the crate-wide error type.

use std::fmt;

pub mod vertex;

pub use vertex::{KeyKind, KeyValue, VertexId, VertexKey};

/// Identifier of one worker in a cluster.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct WorkerId(pub u32);

/// Identifier of one communicator session.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct SessionId(pub u64);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u32> for WorkerId {
    fn from(value: u32) -> Self {
        WorkerId(value)
    }
}

/// A single worker's build failure, reported as part of [`StrataError::Construction`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerFailure {
    /// Worker whose task failed.
    pub worker: WorkerId,
    /// Human readable failure reason.
    pub reason: String,
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.worker, self.reason)
    }
}

/// Errors raised by graph construction and queries.
#[derive(thiserror::Error, Debug)]
pub enum StrataError {
    /// Malformed or missing columns, or arguments of the wrong shape.
    #[error("validation error: {0}")]
    Validation(String),
    /// The graph is not in a state that allows the operation.
    #[error("invalid state: {0}")]
    State(&'static str),
    /// The operation is not available on the distributed representation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
    /// One or more per-worker build tasks failed.
    #[error(
        "graph construction failed on {} worker(s): {}",
        .failures.len(),
        join_failures(.failures)
    )]
    Construction {
        /// Every failed worker, in worker order.
        failures: Vec<WorkerFailure>,
    },
    /// The cluster context rejected the request.
    #[error("cluster error: {0}")]
    Cluster(String),
    /// IO error.
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StrataError>;

impl StrataError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        StrataError::Validation(msg.into())
    }
}

fn join_failures(failures: &[WorkerFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
