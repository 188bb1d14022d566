//! Graph structure: canonical edge lists, renumbering and the distributed
//! graph built on top of them.

pub mod graph;
pub mod number_map;
pub mod properties;
pub mod symmetrize;

pub use graph::{DistributedGraph, EdgeListOptions, GraphHandles, GraphKind, VertexDegree};
pub use number_map::{NumberMap, RenumberOptions, Renumbered, SegmentOffsets, RENUMBERED_DST, RENUMBERED_SRC};
pub use properties::Properties;
pub use symmetrize::symmetrize;

/// Name the edge attribute column is stored under once a graph owns it.
pub const WEIGHT_COLUMN: &str = "value";

/// Free-function form of [`NumberMap::renumber_and_segment`].
pub fn renumber_and_segment(
    table: &crate::table::EdgeTable,
    source: &[String],
    destination: &[String],
    transposed: bool,
    options: &RenumberOptions,
    workers: &[crate::types::WorkerId],
) -> crate::types::Result<Renumbered> {
    NumberMap::renumber_and_segment(table, source, destination, transposed, options, workers)
}
