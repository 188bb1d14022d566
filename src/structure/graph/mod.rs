//! A graph whose edges stay partitioned across cluster workers.
//!
//! [`DistributedGraph::from_edge_table`] canonicalizes the input edge table,
//! renumbers it into a contiguous id space and builds one native graph per
//! worker. The pre-renumbering table is kept for queries so that degrees and
//! membership tests answer in caller-facing identifiers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use super::number_map::{NumberMap, RenumberOptions, SegmentOffsets};
use super::properties::Properties;
use crate::cluster::ClusterContext;
use crate::engine::{NativeGraph, NativeGraphEngine};
use crate::table::EdgeTable;
use crate::types::{KeyKind, Result, StrataError, VertexId, WorkerId};

mod build_ops;
mod degree_ops;
mod membership_ops;

/// Structural kind of a graph, fixed at creation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GraphKind {
    /// Edges are ordered pairs. Undirected graphs store both directions.
    pub directed: bool,
    /// Parallel edges between the same pair are kept.
    pub multi_edge: bool,
}

/// Describes how to read an edge table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EdgeListOptions {
    /// Source vertex column(s).
    pub source: Vec<String>,
    /// Destination vertex column(s), same arity as `source`.
    pub destination: Vec<String>,
    /// Numeric edge attribute, stored as the graph's weights.
    pub edge_attr: Option<String>,
    /// Map vertices to a contiguous id space. When off, vertices must be
    /// non-negative integers in a single column.
    pub renumber: bool,
    /// Build destination-major native graphs.
    pub store_transposed: bool,
    /// Renumber in key order only, without degree segments.
    pub legacy_renum_only: bool,
}

impl EdgeListOptions {
    /// Single-column source and destination with renumbering enabled.
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self::composite([source.into()], [destination.into()])
    }

    /// Multi-column (composite) source and destination.
    pub fn composite<I, J>(source: I, destination: J) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        J: IntoIterator,
        J::Item: Into<String>,
    {
        Self {
            source: source.into_iter().map(Into::into).collect(),
            destination: destination.into_iter().map(Into::into).collect(),
            edge_attr: None,
            renumber: true,
            store_transposed: false,
            legacy_renum_only: false,
        }
    }

    /// Uses `column` as the edge weight.
    pub fn edge_attr(mut self, column: impl Into<String>) -> Self {
        self.edge_attr = Some(column.into());
        self
    }

    /// Enables or disables renumbering.
    pub fn renumber(mut self, renumber: bool) -> Self {
        self.renumber = renumber;
        self
    }

    /// Stores native graphs destination-major.
    pub fn store_transposed(mut self, store_transposed: bool) -> Self {
        self.store_transposed = store_transposed;
        self
    }

    /// Selects key-ordered renumbering.
    pub fn legacy_renum_only(mut self, legacy: bool) -> Self {
        self.legacy_renum_only = legacy;
        self
    }
}

/// The per-worker native graphs produced by one construction.
#[derive(Clone, Debug, Default)]
pub struct GraphHandles {
    handles: BTreeMap<WorkerId, Arc<dyn NativeGraph>>,
}

impl GraphHandles {
    /// Native graph built for `worker`.
    pub fn get(&self, worker: WorkerId) -> Option<&Arc<dyn NativeGraph>> {
        self.handles.get(&worker)
    }

    /// Number of workers with a native graph.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no native graph exists.
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// `(worker, graph)` pairs in worker order.
    pub fn iter(&self) -> impl Iterator<Item = (WorkerId, &Arc<dyn NativeGraph>)> + '_ {
        self.handles.iter().map(|(worker, graph)| (*worker, graph))
    }
}

impl FromIterator<(WorkerId, Arc<dyn NativeGraph>)> for GraphHandles {
    fn from_iter<I: IntoIterator<Item = (WorkerId, Arc<dyn NativeGraph>)>>(iter: I) -> Self {
        Self {
            handles: iter.into_iter().collect(),
        }
    }
}

/// Degree of one vertex.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VertexDegree {
    /// Caller-facing vertex identifier.
    pub vertex: VertexId,
    /// Number of incident edge endpoints of the requested kind.
    pub degree: u64,
}

/// The canonical (symmetrized, pre-renumbering) edge list.
#[derive(Debug)]
struct InputEdges {
    table: EdgeTable,
    source: Vec<String>,
    destination: Vec<String>,
    key_kinds: Vec<KeyKind>,
    legacy: bool,
}

/// Renumbered edges together with the mapping and layout that produced them.
#[derive(Debug)]
struct RenumberEntry {
    edges: EdgeTable,
    number_map: Arc<NumberMap>,
    segment_offsets: SegmentOffsets,
    transposed: bool,
}

/// A graph distributed over the workers of a [`ClusterContext`].
pub struct DistributedGraph {
    cluster: ClusterContext,
    engine: Arc<dyn NativeGraphEngine>,
    renumber_options: RenumberOptions,
    properties: RwLock<Properties>,
    input: Option<InputEdges>,
    cache: RwLock<Option<Arc<RenumberEntry>>>,
    handles: Option<GraphHandles>,
    renumber_passes: AtomicU64,
}

impl DistributedGraph {
    /// Creates an empty graph bound to `cluster`.
    pub fn new(cluster: ClusterContext, engine: Arc<dyn NativeGraphEngine>, kind: GraphKind) -> Self {
        Self {
            cluster,
            engine,
            renumber_options: RenumberOptions::default(),
            properties: RwLock::new(Properties::new(kind.directed, kind.multi_edge)),
            input: None,
            cache: RwLock::new(None),
            handles: None,
            renumber_passes: AtomicU64::new(0),
        }
    }

    /// Overrides the renumbering layout parameters.
    pub fn with_renumber_options(mut self, options: RenumberOptions) -> Self {
        self.renumber_options = options;
        self
    }

    /// Cluster the graph is distributed over.
    pub fn cluster(&self) -> &ClusterContext {
        &self.cluster
    }

    /// Snapshot of the graph's flags and cached counts.
    pub fn properties(&self) -> Properties {
        self.properties.read().clone()
    }

    /// Whether edges are ordered pairs.
    pub fn is_directed(&self) -> bool {
        self.properties.read().directed
    }

    /// Whether parallel edges are kept.
    pub fn is_multigraph(&self) -> bool {
        self.properties.read().multi_edge
    }

    /// Whether the graph carries edge weights.
    pub fn is_weighted(&self) -> bool {
        self.properties.read().weighted
    }

    /// Number of renumbering passes run over the graph's lifetime.
    pub fn renumber_passes(&self) -> u64 {
        self.renumber_passes.load(Ordering::Relaxed)
    }

    /// Native graphs of the last successful construction.
    pub fn handles(&self) -> Result<&GraphHandles> {
        self.handles
            .as_ref()
            .ok_or(StrataError::State("graph has no native handles; build it from an edge table first"))
    }

    /// The vertex mapping of the current edge list.
    pub fn number_map(&self) -> Result<Arc<NumberMap>> {
        Ok(Arc::clone(&self.current_entry()?.number_map))
    }

    /// Layout boundaries of the renumbered id space.
    pub fn segment_offsets(&self) -> Result<SegmentOffsets> {
        Ok(self.current_entry()?.segment_offsets.clone())
    }

    /// The renumbered edge table (`renumbered_src`, `renumbered_dst`, optional `value`).
    pub fn view_edge_list(&self) -> Result<EdgeTable> {
        Ok(self.current_entry()?.edges.clone())
    }

    /// Source and destination columns of the canonical edge list, in
    /// caller-facing identifiers.
    pub fn edges(&self) -> Result<EdgeTable> {
        let input = self.input()?;
        let columns: Vec<String> = input.source.iter().chain(&input.destination).cloned().collect();
        input.table.select(&columns)
    }

    /// Number of columns forming a vertex identifier.
    pub fn vertex_column_size(&self) -> Result<usize> {
        Ok(self.input()?.key_kinds.len())
    }

    /// Number of partitions of the canonical edge list.
    pub fn npartitions(&self) -> Result<usize> {
        Ok(self.input()?.table.npartitions())
    }

    /// Number of vertices.
    pub fn number_of_vertices(&self) -> Result<u64> {
        if let Some(count) = self.properties.read().node_count {
            return Ok(count);
        }
        let count = self.number_map()?.len();
        self.properties.write().node_count = Some(count);
        Ok(count)
    }

    /// Alias of [`number_of_vertices`](Self::number_of_vertices).
    pub fn number_of_nodes(&self) -> Result<u64> {
        self.number_of_vertices()
    }

    /// Number of stored edges. Undirected graphs store both directions of
    /// every non-loop edge.
    pub fn number_of_edges(&self) -> Result<u64> {
        if let Some(count) = self.properties.read().edge_count {
            return Ok(count);
        }
        let count = self.input()?.table.len() as u64;
        self.properties.write().edge_count = Some(count);
        Ok(count)
    }

    /// Not available on distributed graphs.
    pub fn degrees(&self) -> Result<Vec<(VertexId, u64, u64)>> {
        Err(StrataError::Unsupported("degrees is not available on distributed graphs"))
    }

    /// Not available on distributed graphs.
    pub fn to_directed(&self) -> Result<DistributedGraph> {
        Err(StrataError::Unsupported("to_directed is not available on distributed graphs"))
    }

    /// Not available on distributed graphs.
    pub fn to_undirected(&self) -> Result<DistributedGraph> {
        Err(StrataError::Unsupported("to_undirected is not available on distributed graphs"))
    }

    /// Drops the edge list, the renumbering cache and the native handles.
    pub fn delete_edge_list(&mut self) {
        self.input = None;
        *self.cache.get_mut() = None;
        self.handles = None;
        self.properties.get_mut().reset_edge_list();
        debug!("edge list deleted");
    }

    /// Alias of [`delete_edge_list`](Self::delete_edge_list).
    pub fn clear(&mut self) {
        self.delete_edge_list();
    }

    fn input(&self) -> Result<&InputEdges> {
        self.input
            .as_ref()
            .ok_or(StrataError::State("graph has no edge list"))
    }

    /// Cached renumbering in the layout the graph was built with.
    fn current_entry(&self) -> Result<Arc<RenumberEntry>> {
        if let Some(entry) = self.cache.read().as_ref() {
            return Ok(Arc::clone(entry));
        }
        let transposed = self.properties.read().store_transposed;
        self.renumber_entry(transposed)
    }

    /// Makes sure a renumbered edge list exists for the requested
    /// orientation.
    ///
    /// Undirected graphs reuse any cached renumbering. Directed graphs reuse
    /// it only when `transposed` matches and renumber again otherwise,
    /// replacing the cached entry. The legacy layout choice made when the
    /// edge list was loaded is kept.
    pub fn compute_renumber_edge_list(&self, transposed: bool) -> Result<()> {
        self.renumber_entry(transposed).map(|_| ())
    }

    fn renumber_entry(&self, transposed: bool) -> Result<Arc<RenumberEntry>> {
        let input = self.input()?;
        let (directed, renumber) = {
            let props = self.properties.read();
            (props.directed, props.renumber)
        };
        let mut cache = self.cache.write();
        if let Some(entry) = cache.as_ref() {
            if !directed || entry.transposed == transposed {
                debug!(transposed, "renumbered edge list served from cache");
                return Ok(Arc::clone(entry));
            }
        }
        let entry = Arc::new(self.renumber_input(input, renumber, transposed)?);
        *cache = Some(Arc::clone(&entry));
        Ok(entry)
    }

    fn renumber_input(&self, input: &InputEdges, renumber: bool, transposed: bool) -> Result<RenumberEntry> {
        let renumbered = if renumber {
            let options = RenumberOptions {
                legacy_mode: self.renumber_options.legacy_mode || input.legacy,
                ..self.renumber_options.clone()
            };
            self.renumber_passes.fetch_add(1, Ordering::Relaxed);
            NumberMap::renumber_and_segment(
                &input.table,
                &input.source,
                &input.destination,
                transposed,
                &options,
                self.cluster.workers(),
            )?
        } else {
            NumberMap::identity(&input.table, &input.source, &input.destination)?
        };
        Ok(RenumberEntry {
            edges: renumbered.edges,
            number_map: Arc::new(renumbered.number_map),
            segment_offsets: renumbered.segment_offsets,
            transposed,
        })
    }
}

impl std::fmt::Debug for DistributedGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedGraph")
            .field("session", &self.cluster.session_id())
            .field("properties", &*self.properties.read())
            .field("has_edge_list", &self.input.is_some())
            .field("handles", &self.handles.as_ref().map(GraphHandles::len))
            .finish()
    }
}
