use std::sync::Arc;

use tracing::trace;

use super::{GraphProperties, NativeGraph, NativeGraphEngine, NativeGraphInput, WeightArray};
use crate::cluster::Communicator;
use crate::table::DType;
use crate::types::{Result, StrataError, WorkerId};

/// Reference engine storing each worker's edges in compressed sparse form.
#[derive(Clone, Copy, Debug, Default)]
pub struct CsrEngine;

/// Compressed adjacency of one worker's edges, keyed by major vertex
/// (source, or destination when transposed).
#[derive(Debug)]
pub struct CsrGraph {
    comm: Arc<Communicator>,
    properties: GraphProperties,
    store_transposed: bool,
    total_edges: u64,
    majors: Vec<i64>,
    offsets: Vec<usize>,
    minors: Vec<i64>,
    weights: WeightArray,
}

impl NativeGraphEngine for CsrEngine {
    fn build(
        &self,
        comm: Arc<Communicator>,
        properties: GraphProperties,
        input: NativeGraphInput,
    ) -> Result<Arc<dyn NativeGraph>> {
        Ok(Arc::new(CsrGraph::build(comm, properties, input)?))
    }
}

impl CsrGraph {
    /// Builds the compressed structure from one worker's edge list.
    pub fn build(
        comm: Arc<Communicator>,
        properties: GraphProperties,
        input: NativeGraphInput,
    ) -> Result<Self> {
        let NativeGraphInput {
            src,
            dst,
            weights,
            store_transposed,
            num_edges,
        } = input;
        if src.len() != dst.len() || src.len() != weights.len() {
            return Err(StrataError::validation(format!(
                "edge arrays disagree in length: {} sources, {} destinations, {} weights",
                src.len(),
                dst.len(),
                weights.len()
            )));
        }
        if src.len() as u64 > num_edges {
            return Err(StrataError::validation(format!(
                "{} local edges exceed the global edge count {num_edges}",
                src.len()
            )));
        }
        if src.iter().chain(&dst).any(|&v| v < 0) {
            return Err(StrataError::validation("negative vertex id in edge list"));
        }
        let (major, minor) = if store_transposed { (&dst, &src) } else { (&src, &dst) };

        let mut order: Vec<usize> = (0..major.len()).collect();
        order.sort_by_key(|&i| (major[i], minor[i]));

        let mut majors = Vec::new();
        let mut offsets = vec![0];
        let mut minors = Vec::with_capacity(order.len());
        for (pos, &i) in order.iter().enumerate() {
            if majors.last() != Some(&major[i]) {
                if !majors.is_empty() {
                    offsets.push(pos);
                }
                majors.push(major[i]);
            }
            minors.push(minor[i]);
        }
        if !majors.is_empty() {
            offsets.push(order.len());
        }
        let weights = match weights {
            WeightArray::Float32(w) => WeightArray::Float32(order.iter().map(|&i| w[i]).collect()),
            WeightArray::Float64(w) => WeightArray::Float64(order.iter().map(|&i| w[i]).collect()),
        };
        trace!(worker = %comm.rank(), majors = majors.len(), edges = minors.len(), "csr built");
        Ok(Self {
            comm,
            properties,
            store_transposed,
            total_edges: num_edges,
            majors,
            offsets,
            minors,
            weights,
        })
    }

    /// Minor endpoints adjacent to `major`, with their weights.
    pub fn neighbors(&self, major: i64) -> Vec<(i64, f64)> {
        match self.majors.binary_search(&major) {
            Ok(idx) => (self.offsets[idx]..self.offsets[idx + 1])
                .map(|pos| (self.minors[pos], self.weights.get(pos)))
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Major vertices with at least one local edge, ascending.
    pub fn majors(&self) -> &[i64] {
        &self.majors
    }
}

impl NativeGraph for CsrGraph {
    fn worker(&self) -> WorkerId {
        self.comm.rank()
    }

    fn properties(&self) -> GraphProperties {
        self.properties
    }

    fn local_edge_count(&self) -> usize {
        self.minors.len()
    }

    fn total_edge_count(&self) -> u64 {
        self.total_edges
    }

    fn store_transposed(&self) -> bool {
        self.store_transposed
    }

    fn weight_dtype(&self) -> DType {
        self.weights.dtype()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::ClusterContext;
    use crate::config::ClusterConfig;

    fn comm() -> Arc<Communicator> {
        let cluster = ClusterContext::open(&ClusterConfig { workers: 1 }).unwrap();
        cluster.get_handle(cluster.session_id(), WorkerId(0)).unwrap()
    }

    fn input(transposed: bool) -> NativeGraphInput {
        NativeGraphInput {
            src: vec![2, 0, 0, 1],
            dst: vec![0, 2, 1, 2],
            weights: WeightArray::Float32(vec![4.0, 2.0, 1.0, 3.0]),
            store_transposed: transposed,
            num_edges: 4,
        }
    }

    #[test]
    fn groups_edges_by_source() {
        let graph = CsrGraph::build(comm(), GraphProperties::default(), input(false)).unwrap();
        assert_eq!(graph.majors(), &[0, 1, 2]);
        assert_eq!(graph.neighbors(0), vec![(1, 1.0), (2, 2.0)]);
        assert_eq!(graph.neighbors(2), vec![(0, 4.0)]);
        assert!(graph.neighbors(7).is_empty());
        assert_eq!(graph.local_edge_count(), 4);
        assert_eq!(graph.weight_dtype(), DType::Float32);
    }

    #[test]
    fn transposed_groups_by_destination() {
        let graph = CsrGraph::build(comm(), GraphProperties::default(), input(true)).unwrap();
        assert_eq!(graph.neighbors(2), vec![(0, 2.0), (1, 3.0)]);
        assert!(graph.store_transposed());
    }

    #[test]
    fn rejects_ragged_arrays() {
        let mut bad = input(false);
        bad.dst.pop();
        assert!(CsrGraph::build(comm(), GraphProperties::default(), bad).is_err());
    }

    #[test]
    fn empty_partition_builds_empty_graph() {
        let empty = NativeGraphInput {
            src: Vec::new(),
            dst: Vec::new(),
            weights: WeightArray::Float64(Vec::new()),
            store_transposed: false,
            num_edges: 10,
        };
        let graph = CsrGraph::build(comm(), GraphProperties::default(), empty).unwrap();
        assert_eq!(graph.local_edge_count(), 0);
        assert_eq!(graph.total_edge_count(), 10);
    }
}
