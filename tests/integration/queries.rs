#![allow(missing_docs)]

use std::sync::Arc;

use strata::{
    ClusterConfig, ClusterContext, Column, CsrEngine, DistributedGraph, EdgeListOptions, EdgeTable, Frame,
    GraphKind, KeyValue, StrataError, VertexDegree, VertexId,
};

async fn build(directed: bool, src: Vec<i64>, dst: Vec<i64>) -> DistributedGraph {
    let cluster = ClusterContext::open(&ClusterConfig { workers: 3 }).expect("open cluster");
    let frame = Frame::new()
        .with_column("src", Column::Int64(src))
        .unwrap()
        .with_column("dst", Column::Int64(dst))
        .unwrap();
    let table = EdgeTable::distribute(frame, cluster.workers()).unwrap();
    let mut graph = DistributedGraph::new(
        cluster,
        Arc::new(CsrEngine),
        GraphKind {
            directed,
            multi_edge: false,
        },
    );
    graph
        .from_edge_table(table, EdgeListOptions::new("src", "dst"))
        .await
        .expect("build graph");
    graph
}

fn pairs(rows: Vec<VertexDegree>) -> Vec<(i64, u64)> {
    rows.into_iter()
        .map(|r| (r.vertex.to_string().parse().unwrap(), r.degree))
        .collect()
}

#[tokio::test]
async fn directed_triangle_queries() {
    let graph = build(true, vec![0, 1, 2], vec![1, 2, 0]).await;
    assert_eq!(graph.number_of_vertices().unwrap(), 3);
    assert_eq!(graph.number_of_nodes().unwrap(), 3);
    assert_eq!(graph.number_of_edges().unwrap(), 3);
    assert!(graph.has_edge(&VertexId::from(0i64), &VertexId::from(1i64)).unwrap());
    assert!(!graph.has_edge(&VertexId::from(1i64), &VertexId::from(0i64)).unwrap());
    assert_eq!(pairs(graph.degree(Some(&[VertexId::from(0i64)])).unwrap()), vec![(0, 2)]);
    assert!(!graph.has_self_loops().unwrap());
}

#[tokio::test]
async fn degree_is_the_sum_of_in_and_out() {
    let graph = build(true, vec![0, 0, 1, 3, 3], vec![1, 2, 2, 3, 0]).await;
    let ins = pairs(graph.in_degree(None).unwrap());
    let outs = pairs(graph.out_degree(None).unwrap());
    let all = pairs(graph.degree(None).unwrap());
    assert_eq!(all.len(), 4);
    for ((vin, din), ((vout, dout), (v, d))) in ins.iter().zip(outs.iter().zip(&all)) {
        assert_eq!(vin, v);
        assert_eq!(vout, v);
        assert_eq!(din + dout, *d);
    }
    assert_eq!(all, vec![(0, 3), (1, 2), (2, 2), (3, 3)]);
}

#[tokio::test]
async fn has_node_matches_edge_endpoints() {
    let graph = build(false, vec![10, 20], vec![20, 30]).await;
    for v in [10i64, 20, 30] {
        assert!(graph.has_node(&VertexId::from(v)).unwrap());
    }
    assert!(!graph.has_node(&VertexId::from(15i64)).unwrap());
    assert!(graph.has_nodes(&[]).unwrap());
    assert_eq!(graph.nodes().unwrap().len(), 3);
    assert_eq!(
        graph.neighbors(&VertexId::from(20i64)).unwrap(),
        vec![VertexId::from(10i64), VertexId::from(30i64)]
    );
}

#[tokio::test]
async fn malformed_vertices_are_rejected() {
    let graph = build(true, vec![0], vec![1]).await;
    let composite = VertexId::composite([KeyValue::Int(0), KeyValue::Int(1)]);
    assert!(matches!(graph.has_node(&composite), Err(StrataError::Validation(_))));
    assert!(matches!(
        graph.out_degree(Some(&[VertexId::from("0")])),
        Err(StrataError::Validation(_))
    ));
}

#[tokio::test]
async fn queries_need_an_edge_list() {
    let cluster = ClusterContext::open(&ClusterConfig { workers: 1 }).unwrap();
    let graph = DistributedGraph::new(cluster, Arc::new(CsrEngine), GraphKind::default());
    assert!(matches!(graph.in_degree(None), Err(StrataError::State(_))));
    assert!(matches!(graph.nodes(), Err(StrataError::State(_))));
    assert!(matches!(graph.number_map(), Err(StrataError::State(_))));
    assert!(matches!(
        graph.neighbors(&VertexId::from(0i64)),
        Err(StrataError::State(_))
    ));
}
