//! Canonical edge-table form: optional mirroring plus duplicate collapse.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::table::shuffle::shuffle_rows;
use crate::table::{key_at, EdgeTable, Frame};
use crate::types::{Result, StrataError, VertexKey, WorkerId};

/// Brings an edge table into canonical form.
///
/// The output holds `source ++ destination [++ weight]` columns. With
/// `symmetrize`, every non-loop edge `(u, v)` is accompanied by `(v, u)`; self
/// loops are their own reverse and are not mirrored. Unless `multi_edge` is
/// set, duplicate `(src, dst)` pairs of the mirrored table are then collapsed
/// across all partitions, summing their weights. Without `symmetrize` the
/// table passes through with column selection only.
pub fn symmetrize(
    table: &EdgeTable,
    source: &[String],
    destination: &[String],
    weight: Option<&str>,
    multi_edge: bool,
    symmetrize: bool,
    workers: &[WorkerId],
) -> Result<EdgeTable> {
    validate_columns(table, source, destination, weight, symmetrize)?;
    let mut columns: Vec<String> = source.iter().chain(destination).cloned().collect();
    if let Some(w) = weight {
        columns.push(w.to_string());
    }
    let selected = table.select(&columns)?;
    if !symmetrize {
        return Ok(selected);
    }

    let mirrored = selected.map_partitions(|part| mirror(&part.frame, source, destination))?;
    debug!(input = selected.len(), mirrored = mirrored.len(), "edges mirrored");
    if multi_edge {
        return Ok(mirrored);
    }

    let key_cols: Vec<String> = source.iter().chain(destination).cloned().collect();
    let shuffled = shuffle_rows(&mirrored, &key_cols, workers)?;
    let deduped = shuffled.map_partitions(|part| collapse(&part.frame, source, destination, weight))?;
    debug!(before = mirrored.len(), after = deduped.len(), "duplicate edges collapsed");
    Ok(deduped)
}

fn validate_columns(
    table: &EdgeTable,
    source: &[String],
    destination: &[String],
    weight: Option<&str>,
    symmetrize: bool,
) -> Result<()> {
    if source.is_empty() || source.len() != destination.len() {
        return Err(StrataError::validation(format!(
            "source and destination need the same non-zero number of columns, got {} and {}",
            source.len(),
            destination.len()
        )));
    }
    for name in source.iter().chain(destination).map(String::as_str).chain(weight) {
        if !table.has_column(name) {
            return Err(StrataError::validation(format!(
                "column '{name}' not found in edge table"
            )));
        }
    }
    if symmetrize {
        for (s, d) in source.iter().zip(destination) {
            if table.dtype(s) != table.dtype(d) {
                return Err(StrataError::validation(format!(
                    "columns '{s}' and '{d}' must share a type to be symmetrized"
                )));
            }
        }
    }
    Ok(())
}

fn mirror(frame: &Frame, source: &[String], destination: &[String]) -> Result<Frame> {
    let src_cols = frame.key_columns(source)?;
    let dst_cols = frame.key_columns(destination)?;
    let non_loops: Vec<usize> = (0..frame.len())
        .filter(|&row| key_at(&src_cols, row) != key_at(&dst_cols, row))
        .collect();

    let mut reversed = Frame::new();
    for name in frame.column_names() {
        let from = if let Some(idx) = source.iter().position(|s| s == name) {
            &destination[idx]
        } else if let Some(idx) = destination.iter().position(|d| d == name) {
            &source[idx]
        } else {
            name
        };
        reversed.push_column(name.clone(), frame.require(from)?.take(&non_loops))?;
    }
    Frame::concat([frame, &reversed])
}

fn collapse(
    frame: &Frame,
    source: &[String],
    destination: &[String],
    weight: Option<&str>,
) -> Result<Frame> {
    let src_cols = frame.key_columns(source)?;
    let dst_cols = frame.key_columns(destination)?;
    let mut slots: FxHashMap<(VertexKey, VertexKey), usize> = FxHashMap::default();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for row in 0..frame.len() {
        let pair = (key_at(&src_cols, row), key_at(&dst_cols, row));
        let slot = *slots.entry(pair).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(row);
    }

    let firsts: Vec<usize> = groups.iter().map(|g| g[0]).collect();
    let mut out = Frame::new();
    for name in frame.column_names() {
        let column = frame.require(name)?;
        let collapsed = if Some(name.as_str()) == weight {
            column.sum_groups(&groups)
        } else {
            column.take(&firsts)
        };
        out.push_column(name.clone(), collapsed)?;
    }
    Ok(out)
}
