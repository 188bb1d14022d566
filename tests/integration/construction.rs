#![allow(missing_docs)]

use std::sync::Arc;

use strata::{
    ClusterConfig, ClusterContext, Column, CsrEngine, DistributedGraph, EdgeListOptions,
    EdgeTable, Frame, GraphKind, RenumberOptions, StrataError, VertexId, WorkerId,
};

fn open(workers: usize) -> ClusterContext {
    ClusterContext::open(&ClusterConfig { workers }).expect("open cluster")
}

fn ring(cluster: &ClusterContext, n: i64) -> EdgeTable {
    let src: Vec<i64> = (0..n).collect();
    let dst: Vec<i64> = (0..n).map(|v| (v + 1) % n).collect();
    let frame = Frame::new()
        .with_column("src", Column::Int64(src))
        .unwrap()
        .with_column("dst", Column::Int64(dst))
        .unwrap();
    EdgeTable::distribute(frame, cluster.workers()).unwrap()
}

#[tokio::test]
async fn counts_are_stable_across_builds() {
    let cluster = open(4);
    let mut first = DistributedGraph::new(cluster.clone(), Arc::new(CsrEngine), GraphKind::default());
    let mut second = DistributedGraph::new(cluster.clone(), Arc::new(CsrEngine), GraphKind::default());
    first
        .from_edge_table(ring(&cluster, 50), EdgeListOptions::new("src", "dst"))
        .await
        .unwrap();
    second
        .from_edge_table(ring(&cluster, 50), EdgeListOptions::new("src", "dst"))
        .await
        .unwrap();
    assert_eq!(first.number_of_vertices().unwrap(), 50);
    assert_eq!(first.number_of_edges().unwrap(), 100);
    assert_eq!(
        first.number_of_vertices().unwrap(),
        second.number_of_vertices().unwrap()
    );
    assert_eq!(first.segment_offsets().unwrap(), second.segment_offsets().unwrap());
    assert_eq!(
        first.view_edge_list().unwrap().collect().unwrap(),
        second.view_edge_list().unwrap().collect().unwrap()
    );
}

#[tokio::test]
async fn number_map_round_trips_every_vertex() {
    let cluster = open(3);
    let names = ["ada", "grace", "alan", "edsger", "barbara"];
    let src: Vec<String> = names.iter().map(|s| s.to_string()).collect();
    let dst: Vec<String> = names.iter().cycle().skip(1).take(names.len()).map(|s| s.to_string()).collect();
    let frame = Frame::new()
        .with_column("from", Column::Utf8(src))
        .unwrap()
        .with_column("to", Column::Utf8(dst))
        .unwrap();
    let table = EdgeTable::distribute(frame, cluster.workers()).unwrap();
    let mut graph = DistributedGraph::new(
        cluster,
        Arc::new(CsrEngine),
        GraphKind {
            directed: true,
            multi_edge: false,
        },
    );
    graph
        .from_edge_table(table, EdgeListOptions::new("from", "to"))
        .await
        .unwrap();

    let map = graph.number_map().unwrap();
    assert_eq!(map.len(), 5);
    let vertices: Vec<VertexId> = names.iter().map(|n| VertexId::from(*n)).collect();
    let ids: Vec<i64> = map
        .add_internal_vertex_id(&vertices)
        .unwrap()
        .into_iter()
        .map(|id| id.unwrap() as i64)
        .collect();
    assert_eq!(map.unrenumber(&ids).unwrap(), vertices);
    let mut sorted = ids.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
    assert_eq!(map.vertices().count(), 5);
}

#[tokio::test]
async fn segment_offsets_partition_the_id_space() {
    let cluster = open(2);
    // Vertex 0 is a hub with out-degree 40; 1..=40 have out-degree 1 or 0.
    let mut src = vec![0i64; 40];
    let mut dst: Vec<i64> = (1..=40).collect();
    src.extend(1..=5);
    dst.extend(std::iter::repeat(0).take(5));
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
            directed: true,
            multi_edge: false,
        },
    )
    .with_renumber_options(RenumberOptions {
        legacy_mode: false,
        high_degree_threshold: 10,
        mid_degree_threshold: 1,
    });
    graph
        .from_edge_table(table, EdgeListOptions::new("src", "dst"))
        .await
        .unwrap();

    let offsets = graph.segment_offsets().unwrap();
    let offsets = offsets.as_slice();
    assert_eq!(offsets.len(), 2 * 4 + 1);
    assert!(offsets.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*offsets.last().unwrap(), 41);
    let high: u64 = offsets.chunks(4).filter(|c| c.len() == 4).map(|c| c[1] - c[0]).sum();
    let mid: u64 = offsets.chunks(4).filter(|c| c.len() == 4).map(|c| c[2] - c[1]).sum();
    assert_eq!(high, 1);
    assert_eq!(mid, 5);
    let hub = graph
        .number_map()
        .unwrap()
        .to_internal(&[strata::KeyValue::Int(0)])
        .unwrap();
    assert!(offsets.chunks(4).any(|c| c[0] == hub));
}

#[tokio::test]
async fn reverse_duplicates_sum_their_weights() {
    let cluster = open(2);
    let frame = Frame::new()
        .with_column("a", Column::Int64(vec![0, 1]))
        .unwrap()
        .with_column("b", Column::Int64(vec![1, 0]))
        .unwrap()
        .with_column("cost", Column::Float64(vec![2.5, 4.0]))
        .unwrap();
    let table = EdgeTable::distribute(frame, cluster.workers()).unwrap();
    let mut graph = DistributedGraph::new(cluster, Arc::new(CsrEngine), GraphKind::default());
    graph
        .from_edge_table(table, EdgeListOptions::new("a", "b").edge_attr("cost"))
        .await
        .unwrap();

    assert_eq!(graph.number_of_edges().unwrap(), 2);
    let edges = graph.view_edge_list().unwrap().collect().unwrap();
    assert_eq!(edges.column("value"), Some(&Column::Float64(vec![6.5, 6.5])));
    assert!(graph.properties().weighted);
}

#[tokio::test]
async fn explicit_partitions_on_known_workers() {
    let cluster = open(3);
    let part = |src: Vec<i64>, dst: Vec<i64>| {
        Frame::new()
            .with_column("s", Column::Int64(src))
            .unwrap()
            .with_column("d", Column::Int64(dst))
            .unwrap()
    };
    let table = EdgeTable::from_partitions(vec![
        (WorkerId(2), part(vec![0, 1], vec![1, 2])),
        (WorkerId(2), part(vec![2], vec![3])),
        (WorkerId(0), part(vec![3], vec![0])),
    ])
    .unwrap();
    let mut graph = DistributedGraph::new(
        cluster,
        Arc::new(CsrEngine),
        GraphKind {
            directed: true,
            multi_edge: true,
        },
    );
    let handles = graph
        .from_edge_table(table, EdgeListOptions::new("s", "d"))
        .await
        .unwrap();
    assert_eq!(handles.len(), 3);
    assert_eq!(handles.get(WorkerId(2)).unwrap().local_edge_count(), 3);
    assert_eq!(handles.get(WorkerId(1)).unwrap().local_edge_count(), 0);
    assert_eq!(handles.get(WorkerId(0)).unwrap().total_edge_count(), 4);
    assert!(handles.get(WorkerId(0)).unwrap().properties().is_multigraph);
}

#[tokio::test]
async fn string_ids_require_renumbering() {
    let cluster = open(2);
    let frame = Frame::new()
        .with_column("s", Column::Utf8(vec!["a".into()]))
        .unwrap()
        .with_column("d", Column::Utf8(vec!["b".into()]))
        .unwrap();
    let table = EdgeTable::distribute(frame, cluster.workers()).unwrap();
    let mut graph = DistributedGraph::new(cluster, Arc::new(CsrEngine), GraphKind::default());
    let err = graph
        .from_edge_table(table, EdgeListOptions::new("s", "d").renumber(false))
        .await
        .unwrap_err();
    assert!(matches!(err, StrataError::Validation(_)));
}

#[tokio::test]
async fn renumbering_is_reused_until_the_orientation_changes() {
    let cluster = open(2);
    let directed_kind = GraphKind {
        directed: true,
        multi_edge: false,
    };
    let mut directed = DistributedGraph::new(cluster.clone(), Arc::new(CsrEngine), directed_kind);
    assert!(matches!(
        directed.compute_renumber_edge_list(false),
        Err(StrataError::State(_))
    ));
    directed
        .from_edge_table(ring(&cluster, 10), EdgeListOptions::new("src", "dst"))
        .await
        .unwrap();
    assert_eq!(directed.renumber_passes(), 1);

    directed.compute_renumber_edge_list(false).unwrap();
    assert_eq!(directed.renumber_passes(), 1);
    directed.compute_renumber_edge_list(true).unwrap();
    assert_eq!(directed.renumber_passes(), 2);
    directed.compute_renumber_edge_list(true).unwrap();
    assert_eq!(directed.renumber_passes(), 2);
    directed.compute_renumber_edge_list(false).unwrap();
    assert_eq!(directed.renumber_passes(), 3);
    assert_eq!(directed.number_of_vertices().unwrap(), 10);

    let mut undirected = DistributedGraph::new(cluster.clone(), Arc::new(CsrEngine), GraphKind::default());
    undirected
        .from_edge_table(ring(&cluster, 10), EdgeListOptions::new("src", "dst"))
        .await
        .unwrap();
    undirected.compute_renumber_edge_list(true).unwrap();
    undirected.compute_renumber_edge_list(false).unwrap();
    assert_eq!(undirected.renumber_passes(), 1);
}
