//! Distributed graph construction and vertex renumbering.
//!
//! Edge tables are partitioned across the workers of a [`ClusterContext`].
//! A [`DistributedGraph`] canonicalizes such a table (symmetrizing undirected
//! input), maps every vertex key to a contiguous integer id through a sharded
//! [`NumberMap`], and builds one native graph per worker through a pluggable
//! [`NativeGraphEngine`]. Degree and membership queries answer in the
//! caller's own vertex identifiers.

#![warn(missing_docs)]

pub mod cli;
pub mod cluster;
pub mod config;
pub mod engine;
pub mod structure;
pub mod table;
pub mod telemetry;
pub mod types;

pub use cluster::{ClusterContext, Communicator};
pub use config::{ClusterConfig, StrataConfig};
pub use engine::{CsrEngine, NativeGraph, NativeGraphEngine};
pub use structure::{
    DistributedGraph, EdgeListOptions, GraphHandles, GraphKind, NumberMap, Properties, RenumberOptions,
    SegmentOffsets, VertexDegree,
};
pub use table::{Column, DType, EdgeTable, Frame};
pub use types::{KeyValue, Result, StrataError, VertexId, WorkerId};
