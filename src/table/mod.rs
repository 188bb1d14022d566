//! Partitioned in-memory edge tables.
//!
//! An [`EdgeTable`] is an ordered list of [`Partition`]s, each owned by one
//! worker. Per-partition work runs in parallel; cross-partition work goes
//! through the hash shuffles in [`shuffle`] and the aggregations in [`ops`].

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;

use crate::types::{KeyKind, KeyValue, Result, StrataError, VertexKey, WorkerId};

pub mod ops;
pub mod shuffle;

/// Element type of a [`Column`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    /// 32-bit signed integers.
    Int32,
    /// 64-bit signed integers.
    Int64,
    /// 32-bit floats.
    Float32,
    /// 64-bit floats.
    Float64,
    /// UTF-8 strings.
    Utf8,
}

impl DType {
    /// Kind of vertex key stored in a column of this type, if it can hold vertices.
    pub fn key_kind(self) -> Option<KeyKind> {
        match self {
            DType::Int32 | DType::Int64 => Some(KeyKind::Int),
            DType::Utf8 => Some(KeyKind::Str),
            DType::Float32 | DType::Float64 => None,
        }
    }

    /// Whether the column holds numbers.
    pub fn is_numeric(self) -> bool {
        !matches!(self, DType::Utf8)
    }

    /// Creates an empty column of this type.
    pub fn empty_column(self) -> Column {
        match self {
            DType::Int32 => Column::Int32(Vec::new()),
            DType::Int64 => Column::Int64(Vec::new()),
            DType::Float32 => Column::Float32(Vec::new()),
            DType::Float64 => Column::Float64(Vec::new()),
            DType::Utf8 => Column::Utf8(Vec::new()),
        }
    }
}

/// A typed column of values.
#[derive(Clone, Debug, PartialEq)]
pub enum Column {
    /// 32-bit signed integers.
    Int32(Vec<i32>),
    /// 64-bit signed integers.
    Int64(Vec<i64>),
    /// 32-bit floats.
    Float32(Vec<f32>),
    /// 64-bit floats.
    Float64(Vec<f64>),
    /// UTF-8 strings.
    Utf8(Vec<String>),
}

impl Column {
    /// Element type.
    pub fn dtype(&self) -> DType {
        match self {
            Column::Int32(_) => DType::Int32,
            Column::Int64(_) => DType::Int64,
            Column::Float32(_) => DType::Float32,
            Column::Float64(_) => DType::Float64,
            Column::Utf8(_) => DType::Utf8,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Int32(v) => v.len(),
            Column::Int64(v) => v.len(),
            Column::Float32(v) => v.len(),
            Column::Float64(v) => v.len(),
            Column::Utf8(v) => v.len(),
        }
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vertex key component at `row`; `None` for float columns.
    pub fn key_at(&self, row: usize) -> Option<KeyValue> {
        match self {
            Column::Int32(v) => Some(KeyValue::Int(i64::from(v[row]))),
            Column::Int64(v) => Some(KeyValue::Int(v[row])),
            Column::Utf8(v) => Some(KeyValue::Str(v[row].clone())),
            Column::Float32(_) | Column::Float64(_) => None,
        }
    }

    /// Copies the given rows into a new column.
    pub fn take(&self, rows: &[usize]) -> Column {
        match self {
            Column::Int32(v) => Column::Int32(rows.iter().map(|&r| v[r]).collect()),
            Column::Int64(v) => Column::Int64(rows.iter().map(|&r| v[r]).collect()),
            Column::Float32(v) => Column::Float32(rows.iter().map(|&r| v[r]).collect()),
            Column::Float64(v) => Column::Float64(rows.iter().map(|&r| v[r]).collect()),
            Column::Utf8(v) => Column::Utf8(rows.iter().map(|&r| v[r].clone()).collect()),
        }
    }

    /// Appends `other`, which must have the same element type.
    pub fn extend_from(&mut self, other: &Column) -> Result<()> {
        match (self, other) {
            (Column::Int32(a), Column::Int32(b)) => a.extend_from_slice(b),
            (Column::Int64(a), Column::Int64(b)) => a.extend_from_slice(b),
            (Column::Float32(a), Column::Float32(b)) => a.extend_from_slice(b),
            (Column::Float64(a), Column::Float64(b)) => a.extend_from_slice(b),
            (Column::Utf8(a), Column::Utf8(b)) => a.extend_from_slice(b),
            (a, b) => {
                return Err(StrataError::validation(format!(
                    "cannot append {:?} column to {:?} column",
                    b.dtype(),
                    a.dtype()
                )))
            }
        }
        Ok(())
    }

    /// Sums each group of rows in the column's own element type.
    ///
    /// String columns keep the first value of each group.
    pub fn sum_groups(&self, groups: &[Vec<usize>]) -> Column {
        match self {
            Column::Int32(v) => Column::Int32(
                groups
                    .iter()
                    .map(|g| g.iter().fold(0i32, |acc, &r| acc.wrapping_add(v[r])))
                    .collect(),
            ),
            Column::Int64(v) => Column::Int64(
                groups
                    .iter()
                    .map(|g| g.iter().fold(0i64, |acc, &r| acc.wrapping_add(v[r])))
                    .collect(),
            ),
            Column::Float32(v) => {
                Column::Float32(groups.iter().map(|g| g.iter().map(|&r| v[r]).sum()).collect())
            }
            Column::Float64(v) => {
                Column::Float64(groups.iter().map(|g| g.iter().map(|&r| v[r]).sum()).collect())
            }
            Column::Utf8(v) => Column::Utf8(groups.iter().map(|g| v[g[0]].clone()).collect()),
        }
    }

    /// Integer values widened to `i64`; `None` unless this is an integer column.
    pub fn to_i64_vec(&self) -> Option<Vec<i64>> {
        match self {
            Column::Int32(v) => Some(v.iter().map(|&x| i64::from(x)).collect()),
            Column::Int64(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Named, equal-length columns holding one partition's rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Column>,
    rows: usize,
}

impl Frame {
    /// Creates a frame with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column, builder style.
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        self.push_column(name, column)?;
        Ok(self)
    }

    /// Adds a column; its length must match the existing columns.
    pub fn push_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(StrataError::validation(format!("duplicate column '{name}'")));
        }
        if !self.names.is_empty() && column.len() != self.rows {
            return Err(StrataError::validation(format!(
                "column '{name}' has {} rows, expected {}",
                column.len(),
                self.rows
            )));
        }
        self.rows = column.len();
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows
    }

    /// Whether the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Column names in order.
    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|idx| &self.columns[idx])
    }

    /// Looks up a column by name, failing with a validation error when absent.
    pub fn require(&self, name: &str) -> Result<&Column> {
        self.column(name)
            .ok_or_else(|| StrataError::validation(format!("column '{name}' not found")))
    }

    /// `(name, dtype)` pairs in column order.
    pub fn schema(&self) -> Vec<(String, DType)> {
        self.names
            .iter()
            .cloned()
            .zip(self.columns.iter().map(Column::dtype))
            .collect()
    }

    /// Keeps only the named columns, in the given order.
    pub fn select(&self, names: &[String]) -> Result<Frame> {
        let mut out = Frame::new();
        for name in names {
            out.push_column(name.clone(), self.require(name)?.clone())?;
        }
        out.rows = self.rows;
        Ok(out)
    }

    /// Renames a column in place.
    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if self.names.iter().any(|n| n == to) {
            return Err(StrataError::validation(format!("duplicate column '{to}'")));
        }
        let idx = self
            .names
            .iter()
            .position(|n| n == from)
            .ok_or_else(|| StrataError::validation(format!("column '{from}' not found")))?;
        self.names[idx] = to.to_string();
        Ok(())
    }

    /// Copies the given rows into a new frame with the same schema.
    pub fn take(&self, rows: &[usize]) -> Frame {
        Frame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.take(rows)).collect(),
            rows: rows.len(),
        }
    }

    /// Concatenates frames sharing one schema.
    pub fn concat<'a, I>(frames: I) -> Result<Frame>
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        let mut iter = frames.into_iter();
        let Some(first) = iter.next() else {
            return Ok(Frame::new());
        };
        let mut out = first.clone();
        for frame in iter {
            if frame.names != out.names {
                return Err(StrataError::validation("cannot concatenate frames with different columns"));
            }
            for (dst, src) in out.columns.iter_mut().zip(&frame.columns) {
                dst.extend_from(src)?;
            }
            out.rows += frame.rows;
        }
        Ok(out)
    }

    /// Resolves the named columns for key extraction with [`key_at`].
    pub fn key_columns(&self, names: &[String]) -> Result<Vec<&Column>> {
        names
            .iter()
            .map(|name| {
                let column = self.require(name)?;
                if column.dtype().key_kind().is_none() {
                    return Err(StrataError::validation(format!(
                        "column '{name}' of type {:?} cannot hold vertex identifiers",
                        column.dtype()
                    )));
                }
                Ok(column)
            })
            .collect()
    }

    fn empty_like(&self) -> Frame {
        Frame {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.dtype().empty_column()).collect(),
            rows: 0,
        }
    }
}

/// Full-tuple key of `row` across the given key columns.
pub fn key_at(columns: &[&Column], row: usize) -> VertexKey {
    columns
        .iter()
        .filter_map(|column| column.key_at(row))
        .collect()
}

/// One worker-local shard of an [`EdgeTable`].
#[derive(Clone, Debug, PartialEq)]
pub struct Partition {
    /// Worker holding this partition.
    pub worker: WorkerId,
    /// The partition's rows.
    pub frame: Frame,
}

/// A table whose rows are spread across worker-owned partitions.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeTable {
    partitions: Vec<Partition>,
}

impl EdgeTable {
    /// Builds a table from explicit partitions, which must share one schema.
    pub fn from_partitions(parts: Vec<(WorkerId, Frame)>) -> Result<Self> {
        let Some((_, first)) = parts.first() else {
            return Err(StrataError::validation("edge table needs at least one partition"));
        };
        let schema = first.schema();
        for (worker, frame) in &parts {
            if frame.schema() != schema {
                return Err(StrataError::validation(format!(
                    "partition on {worker} does not match the table schema"
                )));
            }
        }
        Ok(Self {
            partitions: parts
                .into_iter()
                .map(|(worker, frame)| Partition { worker, frame })
                .collect(),
        })
    }

    /// Splits one frame into contiguous chunks, one partition per worker.
    pub fn distribute(frame: Frame, workers: &[WorkerId]) -> Result<Self> {
        if workers.is_empty() {
            return Err(StrataError::validation("cannot distribute a table over zero workers"));
        }
        let rows = frame.len();
        let chunk = rows.div_ceil(workers.len()).max(1);
        let parts = workers
            .iter()
            .enumerate()
            .map(|(idx, worker)| {
                let start = (idx * chunk).min(rows);
                let end = ((idx + 1) * chunk).min(rows);
                let indices: Vec<usize> = (start..end).collect();
                (*worker, frame.take(&indices))
            })
            .collect();
        Self::from_partitions(parts)
    }

    /// Partitions in order.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    /// Number of partitions.
    pub fn npartitions(&self) -> usize {
        self.partitions.len()
    }

    /// Total number of rows across partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.frame.len()).sum()
    }

    /// Whether every partition is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column names shared by every partition.
    pub fn column_names(&self) -> &[String] {
        self.partitions[0].frame.column_names()
    }

    /// Whether the table has a column named `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.column_names().iter().any(|n| n == name)
    }

    /// Element type of the named column.
    pub fn dtype(&self, name: &str) -> Option<DType> {
        self.partitions[0].frame.column(name).map(Column::dtype)
    }

    /// Workers holding at least one partition.
    pub fn workers(&self) -> BTreeSet<WorkerId> {
        self.partitions.iter().map(|p| p.worker).collect()
    }

    /// Keeps only the named columns in every partition.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        self.map_partitions(|part| part.frame.select(names))
    }

    /// Renames a column in every partition.
    pub fn rename(&self, from: &str, to: &str) -> Result<Self> {
        self.map_partitions(|part| {
            let mut frame = part.frame.clone();
            frame.rename(from, to)?;
            Ok(frame)
        })
    }

    /// Applies `f` to every partition in parallel, keeping partition ownership.
    pub fn map_partitions<F>(&self, f: F) -> Result<Self>
    where
        F: Fn(&Partition) -> Result<Frame> + Sync,
    {
        let frames = self
            .partitions
            .par_iter()
            .map(|part| f(part).map(|frame| (part.worker, frame)))
            .collect::<Result<Vec<_>>>()?;
        Self::from_partitions(frames)
    }

    /// Partitions grouped by the worker that holds them.
    pub fn worker_to_parts(&self) -> BTreeMap<WorkerId, Vec<&Frame>> {
        let mut map: BTreeMap<WorkerId, Vec<&Frame>> = BTreeMap::new();
        for part in &self.partitions {
            map.entry(part.worker).or_default().push(&part.frame);
        }
        map
    }

    /// All of `worker`'s partitions concatenated; an empty frame with the
    /// table's schema when it holds none.
    pub fn local_frame(&self, worker: WorkerId) -> Result<Frame> {
        let local: Vec<&Frame> = self
            .partitions
            .iter()
            .filter(|p| p.worker == worker)
            .map(|p| &p.frame)
            .collect();
        if local.is_empty() {
            return Ok(self.partitions[0].frame.empty_like());
        }
        Frame::concat(local)
    }

    /// Gathers every partition into one frame.
    pub fn collect(&self) -> Result<Frame> {
        Frame::concat(self.partitions.iter().map(|p| &p.frame))
    }
}
