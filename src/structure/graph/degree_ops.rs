use std::collections::BTreeSet;

use tracing::debug;

use super::{DistributedGraph, VertexDegree};
use crate::table::ops::{endpoint_counts, ShardedCounts};
use crate::types::{KeyKind, Result, VertexId, VertexKey};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum DegreeKind {
    In,
    Out,
    All,
}

impl DistributedGraph {
    /// In-degree of every vertex, or of the vertices in `subset`.
    ///
    /// Vertices without incoming edges report zero. Subset members that are
    /// not part of the graph are omitted and duplicates are collapsed.
    /// Results are ordered by vertex key.
    pub fn in_degree(&self, subset: Option<&[VertexId]>) -> Result<Vec<VertexDegree>> {
        self.degree_of(DegreeKind::In, subset)
    }

    /// Out-degree of every vertex, or of the vertices in `subset`.
    pub fn out_degree(&self, subset: Option<&[VertexId]>) -> Result<Vec<VertexDegree>> {
        self.degree_of(DegreeKind::Out, subset)
    }

    /// Sum of in- and out-degree. On undirected graphs every edge is stored in
    /// both directions, so each neighbor contributes two.
    pub fn degree(&self, subset: Option<&[VertexId]>) -> Result<Vec<VertexDegree>> {
        self.degree_of(DegreeKind::All, subset)
    }

    fn degree_of(&self, kind: DegreeKind, subset: Option<&[VertexId]>) -> Result<Vec<VertexDegree>> {
        let input = self.input()?;
        let subset = subset
            .map(|vertices| normalize_subset(vertices, &input.key_kinds))
            .transpose()?;
        let shards = self.cluster.workers().len();
        let (table, src, dst) = (&input.table, &input.source, &input.destination);

        let counts = match kind {
            DegreeKind::In => endpoint_counts(table, dst, src, shards)?,
            DegreeKind::Out => endpoint_counts(table, src, dst, shards)?,
            DegreeKind::All => merge_counts(
                endpoint_counts(table, dst, src, shards)?,
                endpoint_counts(table, src, dst, shards)?,
            ),
        };
        let mut rows: Vec<(VertexKey, u64)> = counts
            .into_iter()
            .flatten()
            .filter(|(key, _)| subset.as_ref().map_or(true, |s| s.contains(key)))
            .collect();
        rows.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        debug!(?kind, vertices = rows.len(), "degrees computed");
        Ok(rows
            .into_iter()
            .map(|(key, degree)| VertexDegree {
                vertex: VertexId::from_key(&key),
                degree,
            })
            .collect())
    }
}

/// Normalizes caller-facing vertices, collapsing duplicates.
pub(super) fn normalize_subset(vertices: &[VertexId], kinds: &[KeyKind]) -> Result<BTreeSet<VertexKey>> {
    vertices.iter().map(|v| v.normalize(kinds)).collect()
}

/// Sums two shard-aligned count tables.
fn merge_counts(mut left: ShardedCounts, right: ShardedCounts) -> ShardedCounts {
    for (shard, other) in left.iter_mut().zip(right) {
        for (key, count) in other {
            *shard.entry(key).or_insert(0) += count;
        }
    }
    left
}
