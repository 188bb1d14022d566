//! Keyed aggregations over partitioned tables.
//!
//! Each aggregation runs in two steps: every partition builds partial results
//! bucketed by owning shard, then every shard merges the partials addressed to
//! it. Merges are commutative, so results do not depend on partition order.

use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};

use super::shuffle::owner_of;
use super::{key_at, EdgeTable};
use crate::types::{Result, VertexKey};

/// Per-shard maps from vertex key to a count.
pub type ShardedCounts = Vec<FxHashMap<VertexKey, u64>>;

/// Counts occurrences of the `counted` key per vertex, sharded by owner.
///
/// Keys found in the `touched` columns are registered with a zero count when
/// they never appear in `counted`, so the result also covers vertices that
/// only occur on the other side of an edge. Pass an empty `touched` slice for
/// a plain group-by count.
pub fn endpoint_counts(
    table: &EdgeTable,
    counted: &[String],
    touched: &[String],
    shards: usize,
) -> Result<ShardedCounts> {
    let partials: Vec<ShardedCounts> = table
        .partitions()
        .par_iter()
        .map(|part| {
            let counted_cols = part.frame.key_columns(counted)?;
            let touched_cols = if touched.is_empty() {
                Vec::new()
            } else {
                part.frame.key_columns(touched)?
            };
            let mut local: ShardedCounts = vec![FxHashMap::default(); shards];
            for row in 0..part.frame.len() {
                let key = key_at(&counted_cols, row);
                *local[owner_of(&key, shards)].entry(key).or_insert(0) += 1;
                if !touched_cols.is_empty() {
                    let other = key_at(&touched_cols, row);
                    local[owner_of(&other, shards)].entry(other).or_insert(0);
                }
            }
            Ok(local)
        })
        .collect::<Result<_>>()?;

    Ok((0..shards)
        .into_par_iter()
        .map(|shard| {
            let mut merged: FxHashMap<VertexKey, u64> = FxHashMap::default();
            for partial in &partials {
                for (key, count) in &partial[shard] {
                    *merged.entry(key.clone()).or_insert(0) += count;
                }
            }
            merged
        })
        .collect())
}

/// Distinct vertices appearing in either key column group, sharded by owner.
pub fn distinct_vertices(
    table: &EdgeTable,
    source: &[String],
    destination: &[String],
    shards: usize,
) -> Result<Vec<FxHashSet<VertexKey>>> {
    let counts = endpoint_counts(table, source, destination, shards)?;
    Ok(counts
        .into_iter()
        .map(|shard| shard.into_keys().collect())
        .collect())
}
