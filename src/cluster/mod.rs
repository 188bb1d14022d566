//! Cluster context and per-worker communicators.
//!
//! A [`ClusterContext`] is opened once per cluster and threaded through every
//! distributed call. It owns the session id and one read-only
//! [`Communicator`] per worker; closing it invalidates every later lookup.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::config::ClusterConfig;
use crate::types::{Result, SessionId, StrataError, WorkerId};

pub mod tasks;

pub use tasks::{join_all, TaskHandle};

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Collective-communication handle bound to one worker of a session.
#[derive(Debug)]
pub struct Communicator {
    session: SessionId,
    rank: WorkerId,
    size: usize,
}

impl Communicator {
    /// Session this communicator belongs to.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Worker this communicator is bound to.
    pub fn rank(&self) -> WorkerId {
        self.rank
    }

    /// Number of workers in the session.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// Shared handle to an open cluster.
#[derive(Clone, Debug)]
pub struct ClusterContext {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    session: SessionId,
    workers: Vec<WorkerId>,
    comms: FxHashMap<WorkerId, Arc<Communicator>>,
    open: AtomicBool,
}

impl ClusterContext {
    /// Opens a cluster with the configured number of workers.
    pub fn open(config: &ClusterConfig) -> Result<Self> {
        if config.workers == 0 {
            return Err(StrataError::validation("cluster needs at least one worker"));
        }
        let session = SessionId(NEXT_SESSION.fetch_add(1, Ordering::Relaxed));
        let workers: Vec<WorkerId> = (0..config.workers as u32).map(WorkerId).collect();
        let comms = workers
            .iter()
            .map(|&rank| {
                let comm = Communicator {
                    session,
                    rank,
                    size: workers.len(),
                };
                (rank, Arc::new(comm))
            })
            .collect();
        info!(session = %session, workers = workers.len(), "cluster opened");
        Ok(Self {
            inner: Arc::new(Inner {
                session,
                workers,
                comms,
                open: AtomicBool::new(true),
            }),
        })
    }

    /// Session id of this cluster.
    pub fn session_id(&self) -> SessionId {
        self.inner.session
    }

    /// Workers in rank order.
    pub fn workers(&self) -> &[WorkerId] {
        &self.inner.workers
    }

    /// Whether [`close`](Self::close) has not been called yet.
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::Acquire)
    }

    /// Fails unless the cluster is open.
    pub fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(StrataError::Cluster(format!(
                "session {} is closed",
                self.inner.session
            )))
        }
    }

    /// Whether `worker` is part of this cluster.
    pub fn contains(&self, worker: WorkerId) -> bool {
        self.inner.comms.contains_key(&worker)
    }

    /// Looks up the communicator of `worker` in `session`.
    pub fn get_handle(&self, session: SessionId, worker: WorkerId) -> Result<Arc<Communicator>> {
        self.ensure_open()?;
        if session != self.inner.session {
            return Err(StrataError::Cluster(format!(
                "unknown session {session}, expected {}",
                self.inner.session
            )));
        }
        self.inner
            .comms
            .get(&worker)
            .cloned()
            .ok_or_else(|| StrataError::Cluster(format!("{worker} is not part of session {session}")))
    }

    /// Tears the cluster down. Idempotent.
    pub fn close(&self) {
        if self.inner.open.swap(false, Ordering::AcqRel) {
            info!(session = %self.inner.session, "cluster closed");
        } else {
            debug!(session = %self.inner.session, "cluster already closed");
        }
    }
}
