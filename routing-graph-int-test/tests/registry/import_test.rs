use routing_graph::constants::VERSION_MAJOR;
use routing_graph::{GraphError, GraphSettings, RoutingGraph, WgsPos};
use routing_graph_int_test::test_util::{
    cleanup, create_test_context, grid_package, neighbour_package, run_test, synthetic_package,
    NEIGHBOUR_PACKAGE_ID, NODE_A, SYNTHETIC_PACKAGE_ID,
};
use std::io::Cursor;

fn package_names(graph: &RoutingGraph) -> Vec<String> {
    let mut names: Vec<String> = graph
        .packages()
        .into_iter()
        .map(|info| info.package_name)
        .collect();
    names.sort();
    names
}

#[test]
fn test_import_directory_loads_every_package() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.write_package("synthetic", &synthetic_package())?;
            ctx.write_package("neighbour", &neighbour_package())?;

            let mut graph = RoutingGraph::default();
            assert!(graph.import(ctx.path()));
            assert_eq!(graph.package_count(), 2);
            assert_eq!(package_names(&graph), vec!["neighbour", "synthetic"]);

            let info = graph
                .packages()
                .into_iter()
                .find(|info| info.package_id == SYNTHETIC_PACKAGE_ID)
                .unwrap();
            assert_eq!(info.node_blocks, 2);
            assert_eq!(info.geometry_blocks, 1);
            assert_eq!(info.name_blocks, 1);
            assert_eq!(info.global_node_blocks, 1);
            assert_eq!(info.rtree_node_blocks, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_child_package_replaces_parent() {
    run_test(
        create_test_context,
        |ctx| {
            ctx.write_package("estonia", &synthetic_package())?;
            ctx.write_package(
                "estonia-tallinn",
                &grid_package(3, "tallinn", WgsPos::new(59.40, 24.70), 2),
            )?;

            let mut graph = RoutingGraph::default();
            assert_eq!(graph.import_directory(ctx.path())?, 1);
            assert_eq!(package_names(&graph), vec!["tallinn"]);

            // nothing of the parent is reachable
            assert!(matches!(
                graph.get_node(NODE_A),
                Err(GraphError::UnknownPackage(SYNTHETIC_PACKAGE_ID))
            ));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unrelated_prefixes_are_not_skipped() {
    run_test(
        create_test_context,
        |ctx| {
            // "estonia" is only a parent of names whose part before the first '-' equals it
            ctx.write_package("estonia", &synthetic_package())?;
            ctx.write_package("estonian-islands", &neighbour_package())?;
            ctx.write_package(
                "latvia-riga",
                &grid_package(3, "riga", WgsPos::new(56.90, 24.05), 2),
            )?;

            let graph = ctx.open_graph(GraphSettings::default())?;
            assert_eq!(graph.package_count(), 3);
            assert!(graph.get_node(NODE_A).is_ok());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_unsupported_version_is_skipped() {
    run_test(
        create_test_context,
        |ctx| {
            let future = synthetic_package().with_version(VERSION_MAJOR + 1, 0);
            let future_path = ctx.write_package("future", &future)?;
            ctx.write_package("neighbour", &neighbour_package())?;

            let mut graph = RoutingGraph::default();
            assert!(graph.import(ctx.path()));
            assert_eq!(graph.package_count(), 1);
            assert_eq!(graph.packages()[0].package_id, NEIGHBOUR_PACKAGE_ID);

            match graph.import_file(&future_path) {
                Err(GraphError::UnsupportedVersion { major, .. }) => {
                    assert_eq!(major, VERSION_MAJOR + 1)
                }
                other => panic!("expected a version error, got {:?}", other),
            }
            assert_eq!(graph.package_count(), 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_import_fails_when_nothing_loads() {
    run_test(
        create_test_context,
        |ctx| {
            let future = synthetic_package().with_version(VERSION_MAJOR + 1, 0);
            ctx.write_package("future", &future)?;
            std::fs::write(ctx.path().join("notes.txt"), "not a package")?;

            let mut graph = RoutingGraph::default();
            assert!(!graph.import(ctx.path()));
            assert!(!graph.import(ctx.path().join("missing.nutigraph")));
            assert_eq!(graph.package_count(), 0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_empty_directory() {
    run_test(
        create_test_context,
        |ctx| {
            let mut graph = RoutingGraph::default();
            assert_eq!(graph.import_directory(ctx.path())?, 0);
            assert!(!graph.import(ctx.path()));
            assert!(graph.find_nearest_node(&WgsPos::new(59.5, 24.5))?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_duplicate_package_id_is_rejected() {
    run_test(
        create_test_context,
        |ctx| {
            let first = ctx.write_package("first", &synthetic_package())?;
            let second = ctx.write_package("second", &synthetic_package())?;

            let mut graph = RoutingGraph::default();
            assert_eq!(graph.import_file(&first)?, SYNTHETIC_PACKAGE_ID);
            assert!(matches!(
                graph.import_file(&second),
                Err(GraphError::DuplicatePackage { package_id: SYNTHETIC_PACKAGE_ID, .. })
            ));
            assert_eq!(graph.package_count(), 1);

            // the directory import loads one of them and reports the other
            let mut graph = RoutingGraph::default();
            assert_eq!(graph.import_directory(ctx.path())?, 1);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_import_stream() {
    run_test(
        create_test_context,
        |_ctx| {
            let mut graph = RoutingGraph::default();
            assert!(graph.import_stream(Cursor::new(synthetic_package().to_bytes()?)));
            assert!(!graph.import_stream(Cursor::new(b"definitely not a package".to_vec())));
            assert!(!graph.import_stream(Cursor::new(Vec::new())));
            assert!(graph.import_stream(Cursor::new(neighbour_package().to_bytes()?)));
            assert_eq!(graph.package_count(), 2);
            Ok(())
        },
        cleanup,
    )
}
