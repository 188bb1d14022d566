//! Global, contiguous vertex renumbering.
//!
//! Every distinct vertex key is owned by exactly one shard, picked by hashing
//! the key. Owners order their keys deterministically and receive a base
//! offset from an exclusive prefix sum over shard sizes, so every worker maps
//! a key to the same integer no matter where the key's edges live.

use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::table::ops::endpoint_counts;
use crate::table::shuffle::owner_of;
use crate::table::{key_at, Column, EdgeTable, Frame};
use crate::types::{KeyKind, KeyValue, Result, StrataError, VertexId, VertexKey, WorkerId};

/// Renumbered source column name.
pub const RENUMBERED_SRC: &str = "renumbered_src";
/// Renumbered destination column name.
pub const RENUMBERED_DST: &str = "renumbered_dst";

/// Layout parameters for renumbering.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RenumberOptions {
    /// Number vertices in key order only and emit shard boundaries as the
    /// only segment offsets.
    #[serde(default)]
    pub legacy_mode: bool,
    /// Major degree at or above which a vertex lands in the high segment.
    #[serde(default = "default_high_degree_threshold")]
    pub high_degree_threshold: u64,
    /// Major degree at or above which a vertex lands in the mid segment.
    #[serde(default = "default_mid_degree_threshold")]
    pub mid_degree_threshold: u64,
}

impl Default for RenumberOptions {
    fn default() -> Self {
        Self {
            legacy_mode: false,
            high_degree_threshold: default_high_degree_threshold(),
            mid_degree_threshold: default_mid_degree_threshold(),
        }
    }
}

fn default_high_degree_threshold() -> u64 {
    1024
}

fn default_mid_degree_threshold() -> u64 {
    32
}

/// Boundaries of the degree-ordered id space.
///
/// For each shard: its base, then the ends of its high, mid and low degree
/// segments (the remainder up to the next base holds zero-degree vertices).
/// The final entry is the vertex count. Legacy layouts carry only the bases.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SegmentOffsets(Vec<u64>);

impl SegmentOffsets {
    /// Offsets in ascending order.
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }
}

#[derive(Debug)]
struct MapShard {
    owner: WorkerId,
    base: u64,
    keys: Vec<VertexKey>,
    index: FxHashMap<VertexKey, u64>,
}

#[derive(Debug)]
enum Mapping {
    Identity { vertex_count: u64 },
    Sharded { shards: Vec<MapShard> },
}

/// Bijection between caller-facing vertex keys and `[0, N)`.
#[derive(Debug)]
pub struct NumberMap {
    mapping: Mapping,
    key_kinds: Vec<KeyKind>,
}

/// Output of a renumbering pass.
#[derive(Debug)]
pub struct Renumbered {
    /// Edge table with `renumbered_src`/`renumbered_dst` plus every non-vertex
    /// input column; partitions stay on their workers.
    pub edges: EdgeTable,
    /// The mapping used.
    pub number_map: NumberMap,
    /// Layout boundaries for adjacency construction.
    pub segment_offsets: SegmentOffsets,
}

impl NumberMap {
    /// Renumbers `table` across `workers` and computes segment offsets.
    ///
    /// `transposed` picks the degree that orders the layout (in-degree when
    /// set, out-degree otherwise); it never changes which keys map to
    /// distinct ids.
    pub fn renumber_and_segment(
        table: &EdgeTable,
        source: &[String],
        destination: &[String],
        transposed: bool,
        options: &RenumberOptions,
        workers: &[WorkerId],
    ) -> Result<Renumbered> {
        let key_kinds = vertex_kinds(table, source, destination)?;
        if workers.is_empty() {
            return Err(StrataError::validation("renumbering needs at least one worker"));
        }
        let shards = workers.len();
        let (major, minor) = if transposed {
            (destination, source)
        } else {
            (source, destination)
        };

        let degrees = endpoint_counts(table, major, minor, shards)?;
        debug!(shards, transposed, "vertex keys shuffled to owners");

        let ordered: Vec<Vec<(VertexKey, u64)>> = degrees
            .into_par_iter()
            .map(|shard| {
                let mut keys: Vec<(VertexKey, u64)> = shard.into_iter().collect();
                if options.legacy_mode {
                    keys.sort_unstable_by(|a, b| a.0.cmp(&b.0));
                } else {
                    keys.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                }
                keys
            })
            .collect();

        let mut offsets = Vec::with_capacity(shards * 4 + 1);
        let mut map_shards = Vec::with_capacity(shards);
        let mut base = 0u64;
        for (owner, keys) in workers.iter().zip(ordered) {
            offsets.push(base);
            if !options.legacy_mode {
                let at_least = |threshold: u64| keys.iter().take_while(|(_, d)| *d >= threshold).count() as u64;
                offsets.push(base + at_least(options.high_degree_threshold.max(1)));
                offsets.push(base + at_least(options.mid_degree_threshold.max(1)));
                offsets.push(base + at_least(1));
            }
            let index = keys
                .iter()
                .enumerate()
                .map(|(pos, (key, _))| (key.clone(), pos as u64))
                .collect();
            let len = keys.len() as u64;
            map_shards.push(MapShard {
                owner: *owner,
                base,
                keys: keys.into_iter().map(|(key, _)| key).collect(),
                index,
            });
            base += len;
        }
        offsets.push(base);

        let number_map = NumberMap {
            mapping: Mapping::Sharded { shards: map_shards },
            key_kinds,
        };
        let edges = table.map_partitions(|part| {
            let src_cols = part.frame.key_columns(source)?;
            let dst_cols = part.frame.key_columns(destination)?;
            let mut src = Vec::with_capacity(part.frame.len());
            let mut dst = Vec::with_capacity(part.frame.len());
            for row in 0..part.frame.len() {
                src.push(number_map.resolve(&key_at(&src_cols, row))?);
                dst.push(number_map.resolve(&key_at(&dst_cols, row))?);
            }
            renumbered_frame(&part.frame, src, dst, source, destination)
        })?;
        info!(
            vertices = base,
            edges = edges.len(),
            shards,
            legacy = options.legacy_mode,
            "edge table renumbered"
        );
        Ok(Renumbered {
            edges,
            number_map,
            segment_offsets: SegmentOffsets(offsets),
        })
    }

    /// Skips renumbering: ids are taken as-is and must already be
    /// non-negative integers in a single column.
    pub fn identity(table: &EdgeTable, source: &[String], destination: &[String]) -> Result<Renumbered> {
        let key_kinds = vertex_kinds(table, source, destination)?;
        if key_kinds != [KeyKind::Int] {
            return Err(StrataError::validation(
                "without renumbering, vertices must be a single integer column",
            ));
        }
        let edges = table.map_partitions(|part| {
            let src = integer_ids(part.frame.require(&source[0])?)?;
            let dst = integer_ids(part.frame.require(&destination[0])?)?;
            renumbered_frame(&part.frame, src, dst, source, destination)
        })?;
        let vertex_count = edges
            .partitions()
            .iter()
            .flat_map(|part| {
                [RENUMBERED_SRC, RENUMBERED_DST]
                    .into_iter()
                    .filter_map(|name| part.frame.column(name).and_then(Column::to_i64_vec))
                    .flatten()
                    .max()
            })
            .max()
            .map_or(0, |max| max as u64 + 1);
        debug!(vertices = vertex_count, "renumbering skipped");
        Ok(Renumbered {
            edges,
            number_map: NumberMap {
                mapping: Mapping::Identity { vertex_count },
                key_kinds,
            },
            segment_offsets: SegmentOffsets(vec![0, vertex_count]),
        })
    }

    /// Number of vertices `N`.
    pub fn len(&self) -> u64 {
        match &self.mapping {
            Mapping::Identity { vertex_count } => *vertex_count,
            Mapping::Sharded { shards } => shards.iter().map(|s| s.keys.len() as u64).sum(),
        }
    }

    /// Whether the map holds no vertices.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether ids were actually reassigned (`false` for the identity map).
    pub fn is_renumbered(&self) -> bool {
        matches!(self.mapping, Mapping::Sharded { .. })
    }

    /// Kinds of the vertex key components.
    pub fn key_kinds(&self) -> &[KeyKind] {
        &self.key_kinds
    }

    /// Number of columns forming a vertex key.
    pub fn vertex_column_size(&self) -> usize {
        self.key_kinds.len()
    }

    /// Worker owning the shard that holds `key`; `None` for the identity map.
    pub fn owner(&self, key: &[KeyValue]) -> Option<WorkerId> {
        match &self.mapping {
            Mapping::Identity { .. } => None,
            Mapping::Sharded { shards } => Some(shards[owner_of(key, shards.len())].owner),
        }
    }

    /// Internal id of a normalized key.
    pub fn to_internal(&self, key: &[KeyValue]) -> Option<u64> {
        match &self.mapping {
            Mapping::Identity { vertex_count } => match key {
                [KeyValue::Int(v)] if *v >= 0 && (*v as u64) < *vertex_count => Some(*v as u64),
                _ => None,
            },
            Mapping::Sharded { shards } => {
                let shard = &shards[owner_of(key, shards.len())];
                shard.index.get(key).map(|pos| shard.base + pos)
            }
        }
    }

    /// Caller-facing key of an internal id.
    pub fn from_internal(&self, id: u64) -> Option<VertexId> {
        match &self.mapping {
            Mapping::Identity { vertex_count } => {
                (id < *vertex_count).then(|| VertexId::from(id as i64))
            }
            Mapping::Sharded { shards } => {
                let idx = shards.partition_point(|s| s.base <= id).checked_sub(1)?;
                let shard = &shards[idx];
                shard
                    .keys
                    .get((id - shard.base) as usize)
                    .map(|key| VertexId::from_key(key))
            }
        }
    }

    /// Looks up internal ids for caller-facing vertices, preserving order;
    /// unknown vertices yield `None`.
    pub fn add_internal_vertex_id(&self, vertices: &[VertexId]) -> Result<Vec<Option<u64>>> {
        vertices
            .iter()
            .map(|v| Ok(self.to_internal(&v.normalize(&self.key_kinds)?)))
            .collect()
    }

    /// Maps algorithm output ids back to caller-facing vertices.
    pub fn unrenumber(&self, ids: &[i64]) -> Result<Vec<VertexId>> {
        ids.iter()
            .map(|&id| {
                u64::try_from(id)
                    .ok()
                    .and_then(|id| self.from_internal(id))
                    .ok_or_else(|| StrataError::validation(format!("internal id {id} is out of range")))
            })
            .collect()
    }

    /// Every vertex in internal id order.
    pub fn vertices(&self) -> Box<dyn Iterator<Item = VertexId> + '_> {
        match &self.mapping {
            Mapping::Identity { vertex_count } => {
                Box::new((0..*vertex_count as i64).map(VertexId::from))
            }
            Mapping::Sharded { shards } => Box::new(
                shards
                    .iter()
                    .flat_map(|s| s.keys.iter().map(|key| VertexId::from_key(key))),
            ),
        }
    }

    fn resolve(&self, key: &[KeyValue]) -> Result<i64> {
        self.to_internal(key)
            .map(|id| id as i64)
            .ok_or(StrataError::State("vertex missing from number map"))
    }
}

fn vertex_kinds(table: &EdgeTable, source: &[String], destination: &[String]) -> Result<Vec<KeyKind>> {
    if source.is_empty() || source.len() != destination.len() {
        return Err(StrataError::validation(
            "source and destination need the same non-zero number of columns",
        ));
    }
    source
        .iter()
        .zip(destination)
        .map(|(s, d)| {
            let kind_of = |name: &str| {
                table
                    .dtype(name)
                    .ok_or_else(|| StrataError::validation(format!("column '{name}' not found")))?
                    .key_kind()
                    .ok_or_else(|| {
                        StrataError::validation(format!("column '{name}' cannot hold vertex identifiers"))
                    })
            };
            let (sk, dk) = (kind_of(s)?, kind_of(d)?);
            if sk != dk {
                return Err(StrataError::validation(format!(
                    "columns '{s}' ({sk}) and '{d}' ({dk}) hold different vertex kinds"
                )));
            }
            Ok(sk)
        })
        .collect()
}

pub(crate) fn integer_ids(column: &Column) -> Result<Vec<i64>> {
    let ids = column
        .to_i64_vec()
        .ok_or_else(|| StrataError::validation("vertex column must hold integers"))?;
    if let Some(bad) = ids.iter().find(|&&v| v < 0) {
        return Err(StrataError::validation(format!(
            "vertex id {bad} is negative; enable renumbering for arbitrary identifiers"
        )));
    }
    Ok(ids)
}

fn renumbered_frame(
    input: &Frame,
    src: Vec<i64>,
    dst: Vec<i64>,
    source: &[String],
    destination: &[String],
) -> Result<Frame> {
    let mut out = Frame::new()
        .with_column(RENUMBERED_SRC, Column::Int64(src))?
        .with_column(RENUMBERED_DST, Column::Int64(dst))?;
    for name in input.column_names() {
        if !source.contains(name) && !destination.contains(name) {
            out.push_column(name.clone(), input.require(name)?.clone())?;
        }
    }
    Ok(out)
}
