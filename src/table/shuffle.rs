//! Hash routing of rows and keys to owning workers.

use rayon::prelude::*;
use xxhash_rust::xxh64::Xxh64;

use super::{key_at, EdgeTable, Frame};
use crate::types::{KeyValue, Result, StrataError, WorkerId};

const ROUTE_SEED: u64 = 0x7374_7261_7461_0001;

/// Stable 64-bit hash of a full-tuple key.
///
/// Integer components hash identically whether they came from a 32-bit or a
/// 64-bit column.
pub fn key_hash(key: &[KeyValue]) -> u64 {
    let mut hasher = Xxh64::new(ROUTE_SEED);
    for part in key {
        match part {
            KeyValue::Int(v) => {
                hasher.update(&[0]);
                hasher.update(&v.to_le_bytes());
            }
            KeyValue::Str(s) => {
                hasher.update(&[1]);
                hasher.update(&(s.len() as u64).to_le_bytes());
                hasher.update(s.as_bytes());
            }
        }
    }
    hasher.digest()
}

/// Index of the shard that owns `key` among `shards` shards.
pub fn owner_of(key: &[KeyValue], shards: usize) -> usize {
    (key_hash(key) % shards as u64) as usize
}

/// Repartitions rows so that rows with equal keys land on the same worker.
///
/// The result holds exactly one partition per entry of `workers`; rows keep
/// their relative order within each source partition, and source partitions
/// are visited in table order.
pub fn shuffle_rows(table: &EdgeTable, key_cols: &[String], workers: &[WorkerId]) -> Result<EdgeTable> {
    if workers.is_empty() {
        return Err(StrataError::validation("cannot shuffle over zero workers"));
    }
    let shards = workers.len();
    let buckets: Vec<Vec<Frame>> = table
        .partitions()
        .par_iter()
        .map(|part| {
            let cols = part.frame.key_columns(key_cols)?;
            let mut rows: Vec<Vec<usize>> = vec![Vec::new(); shards];
            for row in 0..part.frame.len() {
                rows[owner_of(&key_at(&cols, row), shards)].push(row);
            }
            Ok(rows.iter().map(|r| part.frame.take(r)).collect())
        })
        .collect::<Result<_>>()?;

    let parts = workers
        .par_iter()
        .enumerate()
        .map(|(shard, worker)| {
            let frame = Frame::concat(buckets.iter().map(|b| &b[shard]))?;
            Ok((*worker, frame))
        })
        .collect::<Result<Vec<_>>>()?;
    EdgeTable::from_partitions(parts)
}
