use serde::Serialize;

/// Flags and cached counts describing a [`DistributedGraph`](super::DistributedGraph).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Properties {
    /// Edges are ordered pairs.
    pub directed: bool,
    /// Parallel edges are kept.
    pub multi_edge: bool,
    /// The graph was built with an edge attribute.
    pub weighted: bool,
    /// Renumbering was requested for the current edge list.
    pub renumber: bool,
    /// Vertex ids were actually reassigned.
    pub renumbered: bool,
    /// Adjacency is stored by destination.
    pub store_transposed: bool,
    /// Whether any edge starts and ends at the same vertex; computed lazily.
    pub self_loop: Option<bool>,
    /// Cached vertex count.
    pub node_count: Option<u64>,
    /// Cached edge count.
    pub edge_count: Option<u64>,
}

impl Properties {
    pub(crate) fn new(directed: bool, multi_edge: bool) -> Self {
        Self {
            directed,
            multi_edge,
            ..Self::default()
        }
    }

    /// Forgets everything derived from an edge list.
    pub(crate) fn reset_edge_list(&mut self) {
        *self = Self::new(self.directed, self.multi_edge);
    }
}
