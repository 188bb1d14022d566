use std::sync::Arc;

use tracing::{error, info};

use super::{DistributedGraph, EdgeListOptions, GraphHandles, InputEdges, RenumberEntry};
use crate::cluster::join_all;
use crate::engine::{GraphProperties, NativeGraphInput, WeightArray};
use crate::structure::number_map::{integer_ids, RENUMBERED_DST, RENUMBERED_SRC};
use crate::structure::symmetrize::symmetrize;
use crate::structure::WEIGHT_COLUMN;
use crate::table::{Column, EdgeTable, Frame};
use crate::types::{KeyKind, Result, StrataError};

/// Everything a successful construction installs at once.
struct Built {
    input: InputEdges,
    entry: Arc<RenumberEntry>,
    handles: GraphHandles,
}

impl DistributedGraph {
    /// Builds the graph from a partitioned edge table.
    ///
    /// Validation happens before any distributed work. Undirected graphs are
    /// symmetrized, then the edge list is renumbered and one native graph is
    /// built per cluster worker, including workers that hold no edges. The
    /// new edge list, mapping and handles are installed together only once
    /// every worker has succeeded. On any failure the graph is left without
    /// an edge list, and a worker failure reports every failed worker once
    /// all tasks have resolved.
    pub async fn from_edge_table(
        &mut self,
        table: EdgeTable,
        options: EdgeListOptions,
    ) -> Result<GraphHandles> {
        let built = match self.construct(table, &options).await {
            Ok(built) => built,
            Err(err) => {
                self.delete_edge_list();
                return Err(err);
            }
        };
        {
            let props = self.properties.get_mut();
            props.reset_edge_list();
            props.weighted = options.edge_attr.is_some();
            props.renumber = options.renumber;
            props.renumbered = built.entry.number_map.is_renumbered();
            props.store_transposed = options.store_transposed;
        }
        self.input = Some(built.input);
        *self.cache.get_mut() = Some(built.entry);
        self.handles = Some(built.handles.clone());
        Ok(built.handles)
    }

    async fn construct(&self, table: EdgeTable, options: &EdgeListOptions) -> Result<Built> {
        self.cluster.ensure_open()?;
        let key_kinds = self.validate_edge_table(&table, options)?;

        let table = match &options.edge_attr {
            Some(attr) => table.rename(attr, WEIGHT_COLUMN)?,
            None => table,
        };
        let weight = options.edge_attr.as_ref().map(|_| WEIGHT_COLUMN);
        let (directed, multi_edge) = {
            let props = self.properties.read();
            (props.directed, props.multi_edge)
        };
        let edges = symmetrize(
            &table,
            &options.source,
            &options.destination,
            weight,
            multi_edge,
            !directed,
            self.cluster.workers(),
        )?;
        let input = InputEdges {
            table: edges,
            source: options.source.clone(),
            destination: options.destination.clone(),
            key_kinds,
            legacy: options.legacy_renum_only,
        };
        info!(
            session = %self.cluster.session_id(),
            workers = self.cluster.workers().len(),
            input_edges = table.len(),
            directed,
            "building distributed graph"
        );

        let entry = Arc::new(self.renumber_input(&input, options.renumber, options.store_transposed)?);
        let properties = GraphProperties {
            is_multigraph: multi_edge,
            is_symmetric: !directed,
        };
        let handles = self.build_workers(&entry, properties, options.store_transposed).await?;
        info!(
            session = %self.cluster.session_id(),
            vertices = entry.number_map.len(),
            edges = entry.edges.len(),
            "distributed graph built"
        );
        Ok(Built { input, entry, handles })
    }

    fn validate_edge_table(&self, table: &EdgeTable, options: &EdgeListOptions) -> Result<Vec<KeyKind>> {
        if options.source.is_empty() || options.source.len() != options.destination.len() {
            return Err(StrataError::validation(format!(
                "source and destination need the same non-zero number of columns, got {} and {}",
                options.source.len(),
                options.destination.len()
            )));
        }
        let vertex_kind = |name: &str| {
            let dtype = table
                .dtype(name)
                .ok_or_else(|| StrataError::validation(format!("column '{name}' not found in edge table")))?;
            dtype.key_kind().ok_or_else(|| {
                StrataError::validation(format!("column '{name}' of type {dtype:?} cannot hold vertex identifiers"))
            })
        };
        let mut kinds = Vec::with_capacity(options.source.len());
        for (s, d) in options.source.iter().zip(&options.destination) {
            let (sk, dk) = (vertex_kind(s)?, vertex_kind(d)?);
            if sk != dk {
                return Err(StrataError::validation(format!(
                    "columns '{s}' ({sk}) and '{d}' ({dk}) hold different vertex kinds"
                )));
            }
            kinds.push(sk);
        }
        if let Some(attr) = &options.edge_attr {
            match table.dtype(attr) {
                None => {
                    return Err(StrataError::validation(format!(
                        "edge attribute '{attr}' not found in edge table"
                    )))
                }
                Some(dtype) if !dtype.is_numeric() => {
                    return Err(StrataError::validation(format!(
                        "edge attribute '{attr}' must be numeric, found {dtype:?}"
                    )))
                }
                Some(_) => {}
            }
        }
        if !options.renumber && kinds != [KeyKind::Int] {
            return Err(StrataError::validation(
                "without renumbering, vertices must be a single integer column",
            ));
        }
        if !options.renumber {
            for part in table.partitions() {
                for name in options.source.iter().chain(&options.destination) {
                    integer_ids(part.frame.require(name)?)?;
                }
            }
        }
        if let Some(foreign) = table.workers().into_iter().find(|w| !self.cluster.contains(*w)) {
            return Err(StrataError::validation(format!(
                "partition on {foreign} belongs to no worker of session {}",
                self.cluster.session_id()
            )));
        }
        Ok(kinds)
    }

    async fn build_workers(
        &self,
        entry: &RenumberEntry,
        properties: GraphProperties,
        store_transposed: bool,
    ) -> Result<GraphHandles> {
        let num_edges = entry.edges.len() as u64;
        let session = self.cluster.session_id();
        let mut tasks = Vec::with_capacity(self.cluster.workers().len());
        for &worker in self.cluster.workers() {
            let comm = self.cluster.get_handle(session, worker)?;
            let frame = entry.edges.local_frame(worker)?;
            let engine = Arc::clone(&self.engine);
            tasks.push(self.cluster.submit(worker, move || {
                let input = native_input(&frame, store_transposed, num_edges)?;
                engine.build(comm, properties, input)
            })?);
        }
        match join_all(tasks).await {
            Ok(built) => Ok(built.into_iter().collect()),
            Err(failures) => {
                for failure in &failures {
                    error!(worker = %failure.worker, reason = %failure.reason, "native graph build failed");
                }
                Err(StrataError::Construction { failures })
            }
        }
    }
}

/// Extracts one worker's native input from its renumbered partitions.
///
/// Missing weights become `f64` ones; integer weights widen to the float of
/// the same width.
fn native_input(frame: &Frame, store_transposed: bool, num_edges: u64) -> Result<NativeGraphInput> {
    let ids = |name: &str| {
        frame
            .require(name)?
            .to_i64_vec()
            .ok_or(StrataError::State("renumbered vertex column is not integral"))
    };
    let src = ids(RENUMBERED_SRC)?;
    let dst = ids(RENUMBERED_DST)?;
    let weights = match frame.column(WEIGHT_COLUMN) {
        None => WeightArray::Float64(vec![1.0; src.len()]),
        Some(Column::Int32(w)) => WeightArray::Float32(w.iter().map(|&x| x as f32).collect()),
        Some(Column::Int64(w)) => WeightArray::Float64(w.iter().map(|&x| x as f64).collect()),
        Some(Column::Float32(w)) => WeightArray::Float32(w.clone()),
        Some(Column::Float64(w)) => WeightArray::Float64(w.clone()),
        Some(Column::Utf8(_)) => return Err(StrataError::validation("edge weights must be numeric")),
    };
    Ok(NativeGraphInput {
        src,
        dst,
        weights,
        store_transposed,
        num_edges,
    })
}
