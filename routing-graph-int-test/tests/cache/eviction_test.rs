use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use routing_graph::{GraphSettings, NodePtr, RoutingGraph, WgsPos};
use routing_graph_int_test::test_util::{
    cleanup, create_test_context, grid_node_id, grid_package, grid_street, run_test,
    synthetic_package, NODE_A, NODE_B, NODE_C,
};
use std::io::Cursor;
use std::sync::Arc;

const GRID_ID: u32 = 5;
const GRID_SIZE: u32 = 6;

fn grid_origin() -> WgsPos {
    WgsPos::new(58.0, 26.0)
}

fn grid_graph(settings: GraphSettings) -> RoutingGraph {
    let mut graph = RoutingGraph::new(settings);
    let writer = grid_package(GRID_ID, "grid", grid_origin(), GRID_SIZE);
    graph
        .import_reader(Cursor::new(writer.to_bytes().unwrap()))
        .unwrap();
    graph
}

#[test]
fn test_node_ptr_survives_eviction() {
    run_test(
        create_test_context,
        |_ctx| {
            let mut graph = RoutingGraph::new(GraphSettings::builder().cache_size(1).build());
            graph.import_reader(Cursor::new(synthetic_package().to_bytes()?))?;

            let b = graph.get_node(NODE_B)?;
            let before: Vec<_> = b.edges().iter().map(|e| e.target_node_id).collect();

            // node block 1 replaces block 0 in the single-entry cache
            let c = graph.get_node(NODE_C)?;
            assert_eq!(graph.stats().node_blocks.evictions, 1);
            assert_eq!(Arc::strong_count(b.block()), 1);

            let after: Vec<_> = b.edges().iter().map(|e| e.target_node_id).collect();
            assert_eq!(before, after);
            assert_eq!(graph.get_node_name(&b)?, "Beta Street");
            assert_eq!(graph.get_node_name(&c)?, "Gamma Street");

            // reloading yields an equal but distinct block
            let a = graph.get_node(NODE_A)?;
            assert!(!Arc::ptr_eq(a.block(), b.block()));
            assert_eq!(a.edges()[0].target_node_id, NODE_B);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_results_independent_of_cache_size() {
    run_test(
        create_test_context,
        |_ctx| {
            let roomy = grid_graph(GraphSettings::default());
            let tiny = grid_graph(GraphSettings::builder().cache_size(1).build());
            let mut rng = StdRng::seed_from_u64(42);

            for _ in 0..200 {
                let row = rng.gen_range(0..GRID_SIZE);
                let column = rng.gen_range(0..GRID_SIZE);
                let node_id = grid_node_id(GRID_ID, GRID_SIZE, row, column);

                let expected = roomy.get_node(node_id)?;
                let actual = tiny.get_node(node_id)?;
                assert_eq!(actual.node_data, expected.node_data);
                assert_eq!(tiny.get_node_name(&actual)?, format!("Street {}-{}", row, column));
                assert_eq!(
                    tiny.get_node_geometry(&actual)?,
                    grid_street(&grid_origin(), row, column)
                );

                let query = WgsPos::new(
                    grid_origin().lat + rng.gen_range(0.0..0.06),
                    grid_origin().lon + rng.gen_range(0.0..0.06),
                );
                assert_eq!(
                    tiny.find_nearest_node(&query)?,
                    roomy.find_nearest_node(&query)?
                );
            }

            let stats = tiny.stats();
            assert!(stats.iter().all(|cache| cache.len <= 1));
            assert!(stats.node_blocks.evictions > 0);
            assert!(stats.geometry_blocks.evictions > 0);
            assert!(stats.name_blocks.evictions > 0);
            assert!(stats.rtree_node_blocks.evictions > 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_held_handles_outlive_cache_pressure() {
    run_test(
        create_test_context,
        |_ctx| {
            let graph = grid_graph(GraphSettings::builder().low_memory_preset().cache_size(2).build());

            let held: Vec<NodePtr> = (0..GRID_SIZE)
                .map(|column| graph.get_node(grid_node_id(GRID_ID, GRID_SIZE, 0, column)))
                .collect::<Result<_, _>>()?;
            for row in 1..GRID_SIZE {
                for column in 0..GRID_SIZE {
                    graph.get_node(grid_node_id(GRID_ID, GRID_SIZE, row, column))?;
                }
            }

            for (column, node) in held.iter().enumerate() {
                assert_eq!(node.node_id(), grid_node_id(GRID_ID, GRID_SIZE, 0, column as u32));
                assert_eq!(node.node_data.weight, column as u32);
            }
            assert_eq!(graph.stats().node_blocks.len, 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_cache_hits() {
    run_test(
        create_test_context,
        |_ctx| {
            let graph = grid_graph(GraphSettings::default());
            let node_id = grid_node_id(GRID_ID, GRID_SIZE, 2, 3);
            for _ in 0..5 {
                graph.get_node(node_id)?;
            }
            let stats = graph.stats().node_blocks;
            assert_eq!(stats.misses, 1);
            assert_eq!(stats.hits, 4);
            assert_eq!(stats.len, 1);
            assert!((stats.hit_ratio() - 0.8).abs() < 1e-12);
            Ok(())
        },
        cleanup,
    )
}
