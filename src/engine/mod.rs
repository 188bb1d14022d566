//! Seam to the per-worker native graph engine.
//!
//! Construction hands each worker's renumbered partition to a
//! [`NativeGraphEngine`]; the returned [`NativeGraph`] owns whatever resources
//! the engine allocated and is what distributed algorithms dispatch on.

use std::fmt::Debug;
use std::sync::Arc;

use crate::cluster::Communicator;
use crate::table::DType;
use crate::types::{Result, WorkerId};

mod csr;

pub use csr::{CsrEngine, CsrGraph};

/// Structural flags shared by every worker's graph.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct GraphProperties {
    /// Parallel edges are allowed.
    pub is_multigraph: bool,
    /// Every edge is stored in both directions.
    pub is_symmetric: bool,
}

/// Edge weights in one of the engine's floating types.
#[derive(Clone, Debug, PartialEq)]
pub enum WeightArray {
    /// Single precision weights.
    Float32(Vec<f32>),
    /// Double precision weights.
    Float64(Vec<f64>),
}

impl WeightArray {
    /// Number of weights.
    pub fn len(&self) -> usize {
        match self {
            WeightArray::Float32(v) => v.len(),
            WeightArray::Float64(v) => v.len(),
        }
    }

    /// Whether there are no weights.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element type of the weights.
    pub fn dtype(&self) -> DType {
        match self {
            WeightArray::Float32(_) => DType::Float32,
            WeightArray::Float64(_) => DType::Float64,
        }
    }

    /// Weight at `idx` widened to `f64`.
    pub fn get(&self, idx: usize) -> f64 {
        match self {
            WeightArray::Float32(v) => f64::from(v[idx]),
            WeightArray::Float64(v) => v[idx],
        }
    }
}

/// One worker's share of the renumbered edge list.
#[derive(Clone, Debug, PartialEq)]
pub struct NativeGraphInput {
    /// Renumbered source ids.
    pub src: Vec<i64>,
    /// Renumbered destination ids.
    pub dst: Vec<i64>,
    /// Weights aligned with `src`/`dst`.
    pub weights: WeightArray,
    /// Store the transposed (destination-major) structure.
    pub store_transposed: bool,
    /// Edge count of the whole graph, fixed before distribution.
    pub num_edges: u64,
}

/// A worker-local native graph object.
pub trait NativeGraph: Send + Sync + Debug {
    /// Worker owning this graph.
    fn worker(&self) -> WorkerId;

    /// Structural flags the graph was built with.
    fn properties(&self) -> GraphProperties;

    /// Edges held by this worker.
    fn local_edge_count(&self) -> usize;

    /// Edges of the whole graph.
    fn total_edge_count(&self) -> u64;

    /// Whether the graph is stored destination-major.
    fn store_transposed(&self) -> bool;

    /// Element type of the stored weights.
    fn weight_dtype(&self) -> DType;
}

/// Constructor of worker-local native graphs. Calls are synchronous.
pub trait NativeGraphEngine: Send + Sync {
    /// Builds the graph for the worker `comm` is bound to.
    fn build(
        &self,
        comm: Arc<Communicator>,
        properties: GraphProperties,
        input: NativeGraphInput,
    ) -> Result<Arc<dyn NativeGraph>>;
}
