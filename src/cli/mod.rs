#![forbid(unsafe_code)]

//! Command-line support: CSV edge lists and printable graph reports.

/// CSV edge list loading and generation.
pub mod edges;

use serde::Serialize;

use crate::structure::DistributedGraph;
pub use edges::{generate_edge_csv, load_edge_csv, CliError, EdgeCsvConfig, GenerateConfig};

/// Edges held by one worker after construction.
#[derive(Clone, Debug, Serialize)]
pub struct WorkerEdges {
    /// Worker name.
    pub worker: String,
    /// Local edge count.
    pub edges: usize,
}

/// Summary of a constructed graph.
#[derive(Clone, Debug, Serialize)]
pub struct BuildReport {
    /// Session the graph was built in.
    pub session: String,
    /// Number of vertices.
    pub vertices: u64,
    /// Number of stored edges.
    pub edges: u64,
    /// Whether the graph is directed.
    pub directed: bool,
    /// Whether the graph carries weights.
    pub weighted: bool,
    /// Whether vertex ids were reassigned.
    pub renumbered: bool,
    /// Per-worker edge distribution.
    pub workers: Vec<WorkerEdges>,
    /// Layout boundaries of the id space.
    pub segment_offsets: Vec<u64>,
}

impl BuildReport {
    /// Collects the report from a built graph.
    pub fn from_graph(graph: &DistributedGraph) -> Result<Self, CliError> {
        let props = graph.properties();
        let workers = graph
            .handles()?
            .iter()
            .map(|(worker, native)| WorkerEdges {
                worker: worker.to_string(),
                edges: native.local_edge_count(),
            })
            .collect();
        Ok(Self {
            session: graph.cluster().session_id().to_string(),
            vertices: graph.number_of_vertices()?,
            edges: graph.number_of_edges()?,
            directed: props.directed,
            weighted: props.weighted,
            renumbered: props.renumbered,
            workers,
            segment_offsets: graph.segment_offsets()?.as_slice().to_vec(),
        })
    }
}
