use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use routing_graph::{GraphSettings, RoutingGraph, WgsPos};
use routing_graph_int_test::test_util::{
    cleanup, create_test_context, grid_node_id, grid_package, run_test, synthetic_package, NODE_B,
};
use std::io::Cursor;
use std::thread;

const GRID_ID: u32 = 4;
const GRID_SIZE: u32 = 10;
const THREADS: u64 = 8;

fn shared_graph(cache_size: usize) -> RoutingGraph {
    let mut graph = RoutingGraph::new(GraphSettings::builder().cache_size(cache_size).build());
    for writer in [
        synthetic_package(),
        grid_package(GRID_ID, "grid", WgsPos::new(58.0, 26.0), GRID_SIZE),
    ] {
        graph
            .import_reader(Cursor::new(writer.to_bytes().unwrap()))
            .unwrap();
    }
    graph
}

#[test]
fn test_concurrent_queries_under_eviction() {
    run_test(
        create_test_context,
        |_ctx| {
            let graph = shared_graph(3);
            let reference = shared_graph(4096);

            thread::scope(|scope| {
                for seed in 0..THREADS {
                    let graph = &graph;
                    let reference = &reference;
                    scope.spawn(move || {
                        let mut rng = StdRng::seed_from_u64(seed);
                        for _ in 0..100 {
                            let row = rng.gen_range(0..GRID_SIZE);
                            let column = rng.gen_range(0..GRID_SIZE);
                            let node = graph
                                .get_node(grid_node_id(GRID_ID, GRID_SIZE, row, column))
                                .unwrap();
                            assert_eq!(
                                graph.get_node_name(&node).unwrap(),
                                format!("Street {}-{}", row, column)
                            );

                            let query = WgsPos::new(
                                58.0 + rng.gen_range(0.0..0.1),
                                26.0 + rng.gen_range(0.0..0.1),
                            );
                            assert_eq!(
                                graph.find_nearest_node(&query).unwrap(),
                                reference.find_nearest_node(&query).unwrap()
                            );
                        }
                    });
                }
            });

            assert!(graph.stats().node_blocks.evictions > 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_concurrent_first_access_shares_block() {
    run_test(
        create_test_context,
        |_ctx| {
            let graph = shared_graph(64);

            let handles: Vec<_> = thread::scope(|scope| {
                let workers: Vec<_> = (0..THREADS)
                    .map(|_| scope.spawn(|| graph.get_node(NODE_B).unwrap()))
                    .collect();
                workers.into_iter().map(|w| w.join().unwrap()).collect()
            });

            // racing loads may decode twice, but the cache keeps a single copy
            let cached = graph.get_node(NODE_B)?;
            assert_eq!(graph.stats().node_blocks.len, 1);
            for handle in &handles {
                assert_eq!(handle.edges(), cached.edges());
            }
            Ok(())
        },
        cleanup,
    )
}
