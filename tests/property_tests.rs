#![allow(missing_docs)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use proptest::prelude::*;
use strata::structure::renumber_and_segment;
use strata::{
    ClusterConfig, ClusterContext, Column, CsrEngine, DistributedGraph, EdgeListOptions, EdgeTable, Frame,
    GraphKind, KeyValue, RenumberOptions, VertexId, WorkerId,
};

fn arb_edges() -> impl Strategy<Value = Vec<(i64, i64)>> {
    prop::collection::vec((0i64..40, 0i64..40), 1..120)
}

fn table(edges: &[(i64, i64)], workers: &[WorkerId]) -> EdgeTable {
    let frame = Frame::new()
        .with_column("src", Column::Int64(edges.iter().map(|e| e.0).collect()))
        .unwrap()
        .with_column("dst", Column::Int64(edges.iter().map(|e| e.1).collect()))
        .unwrap();
    EdgeTable::distribute(frame, workers).unwrap()
}

fn build(edges: &[(i64, i64)], workers: usize, kind: GraphKind) -> DistributedGraph {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let cluster = ClusterContext::open(&ClusterConfig { workers }).unwrap();
    let input = table(edges, cluster.workers());
    let mut graph = DistributedGraph::new(cluster, Arc::new(CsrEngine), kind);
    runtime
        .block_on(graph.from_edge_table(input, EdgeListOptions::new("src", "dst")))
        .unwrap();
    graph
}

fn names(col: &str) -> Vec<String> {
    vec![col.to_string()]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_degree_is_in_plus_out(edges in arb_edges(), workers in 1usize..5, directed in any::<bool>()) {
        let graph = build(&edges, workers, GraphKind { directed, multi_edge: false });
        let mut expected: BTreeMap<VertexId, u64> = BTreeMap::new();
        for row in graph.in_degree(None).unwrap().into_iter().chain(graph.out_degree(None).unwrap()) {
            *expected.entry(row.vertex).or_insert(0) += row.degree;
        }
        let actual: BTreeMap<VertexId, u64> = graph
            .degree(None)
            .unwrap()
            .into_iter()
            .map(|row| (row.vertex, row.degree))
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_has_node_exactly_for_endpoints(edges in arb_edges(), candidate in 0i64..50) {
        let graph = build(&edges, 3, GraphKind { directed: true, multi_edge: true });
        let endpoints: BTreeSet<i64> = edges.iter().flat_map(|&(s, d)| [s, d]).collect();
        prop_assert_eq!(graph.has_node(&VertexId::from(candidate)).unwrap(), endpoints.contains(&candidate));
        prop_assert_eq!(graph.number_of_vertices().unwrap(), endpoints.len() as u64);
        prop_assert_eq!(graph.number_of_edges().unwrap(), edges.len() as u64);
    }

    #[test]
    fn prop_renumbering_is_a_deterministic_bijection(
        edges in arb_edges(),
        workers in 1u32..6,
        transposed in any::<bool>(),
    ) {
        let workers: Vec<WorkerId> = (0..workers).map(WorkerId).collect();
        let input = table(&edges, &workers);
        let options = RenumberOptions::default();
        let first = renumber_and_segment(&input, &names("src"), &names("dst"), transposed, &options, &workers).unwrap();
        let second = renumber_and_segment(&input, &names("src"), &names("dst"), transposed, &options, &workers).unwrap();
        prop_assert_eq!(&first.edges, &second.edges);
        prop_assert_eq!(&first.segment_offsets, &second.segment_offsets);

        let map = &first.number_map;
        let endpoints: BTreeSet<i64> = edges.iter().flat_map(|&(s, d)| [s, d]).collect();
        prop_assert_eq!(map.len(), endpoints.len() as u64);
        let ids: BTreeSet<u64> = endpoints
            .iter()
            .map(|&v| map.to_internal(&[KeyValue::Int(v)]).unwrap())
            .collect();
        prop_assert_eq!(ids, (0..map.len()).collect::<BTreeSet<u64>>());
        for id in 0..map.len() {
            let vertex = map.from_internal(id).unwrap();
            prop_assert_eq!(map.add_internal_vertex_id(&[vertex]).unwrap(), vec![Some(id)]);
        }
    }
}
