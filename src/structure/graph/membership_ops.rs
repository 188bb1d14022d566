use std::collections::BTreeSet;

use rayon::prelude::*;

use super::degree_ops::normalize_subset;
use super::DistributedGraph;
use crate::structure::number_map::{RENUMBERED_DST, RENUMBERED_SRC};
use crate::table::key_at;
use crate::table::ops::distinct_vertices;
use crate::table::shuffle::owner_of;
use crate::types::{Result, StrataError, VertexId, VertexKey};

impl DistributedGraph {
    /// Whether `vertex` is an endpoint of any edge.
    pub fn has_node(&self, vertex: &VertexId) -> Result<bool> {
        self.has_nodes(std::slice::from_ref(vertex))
    }

    /// Whether every vertex in `vertices` is an endpoint of some edge.
    pub fn has_nodes(&self, vertices: &[VertexId]) -> Result<bool> {
        let input = self.input()?;
        let wanted = normalize_subset(vertices, &input.key_kinds)?;
        let shards = self.cluster.workers().len();
        let known = distinct_vertices(&input.table, &input.source, &input.destination, shards)?;
        let found = wanted
            .iter()
            .filter(|key| known[owner_of(key, shards)].contains(*key))
            .count();
        Ok(found == wanted.len())
    }

    /// Whether the edge `(u, v)` is stored. Undirected graphs store both
    /// orientations, so the argument order does not matter for them.
    pub fn has_edge(&self, u: &VertexId, v: &VertexId) -> Result<bool> {
        let kinds = &self.input()?.key_kinds;
        let (u, v) = (u.normalize(kinds)?, v.normalize(kinds)?);
        let entry = self.current_entry()?;
        let (Some(u), Some(v)) = (entry.number_map.to_internal(&u), entry.number_map.to_internal(&v)) else {
            return Ok(false);
        };
        let (u, v) = (u as i64, v as i64);
        entry
            .edges
            .partitions()
            .par_iter()
            .map(|part| {
                let src = part.frame.require(RENUMBERED_SRC)?.to_i64_vec();
                let dst = part.frame.require(RENUMBERED_DST)?.to_i64_vec();
                let (Some(src), Some(dst)) = (src, dst) else {
                    return Err(StrataError::State("renumbered vertex column is not integral"));
                };
                Ok(src.iter().zip(&dst).any(|(&s, &d)| s == u && d == v))
            })
            .try_reduce(|| false, |a, b| Ok(a || b))
    }

    /// Every vertex of the graph, ordered by key.
    pub fn nodes(&self) -> Result<Vec<VertexId>> {
        let input = self.input()?;
        let shards = self.cluster.workers().len();
        let known: BTreeSet<VertexKey> =
            distinct_vertices(&input.table, &input.source, &input.destination, shards)?
                .into_iter()
                .flatten()
                .collect();
        Ok(known.iter().map(|key| VertexId::from_key(key)).collect())
    }

    /// Distinct destinations of edges leaving `vertex`, ordered by key.
    pub fn neighbors(&self, vertex: &VertexId) -> Result<Vec<VertexId>> {
        let input = self.input()?;
        let key = vertex.normalize(&input.key_kinds)?;
        let partial = input
            .table
            .partitions()
            .par_iter()
            .map(|part| {
                let src_cols = part.frame.key_columns(&input.source)?;
                let dst_cols = part.frame.key_columns(&input.destination)?;
                Ok((0..part.frame.len())
                    .filter(|&row| key_at(&src_cols, row) == key)
                    .map(|row| key_at(&dst_cols, row))
                    .collect::<Vec<_>>())
            })
            .collect::<Result<Vec<_>>>()?;
        let found: BTreeSet<VertexKey> = partial.into_iter().flatten().collect();
        Ok(found.iter().map(|key| VertexId::from_key(key)).collect())
    }

    /// Whether any edge starts and ends at the same vertex. Cached after the
    /// first call.
    pub fn has_self_loops(&self) -> Result<bool> {
        if let Some(cached) = self.properties.read().self_loop {
            return Ok(cached);
        }
        let input = self.input()?;
        let found = input
            .table
            .partitions()
            .par_iter()
            .map(|part| {
                let src_cols = part.frame.key_columns(&input.source)?;
                let dst_cols = part.frame.key_columns(&input.destination)?;
                Ok::<_, StrataError>((0..part.frame.len()).any(|row| key_at(&src_cols, row) == key_at(&dst_cols, row)))
            })
            .try_reduce(|| false, |a, b| Ok(a || b))?;
        self.properties.write().self_loop = Some(found);
        Ok(found)
    }
}
