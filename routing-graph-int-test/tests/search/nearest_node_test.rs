use routing_graph::constants::EARTH_RADIUS_METERS;
use routing_graph::{GraphSettings, RoutingGraph, WgsPos};
use routing_graph_int_test::test_util::{
    cleanup, create_test_context, grid_node_id, grid_package, grid_street, neighbour_package,
    run_test, synthetic_package, NODE_A, NODE_B, NODE_C, NODE_D,
};
use std::io::Cursor;

fn graph(settings: GraphSettings) -> RoutingGraph {
    let mut graph = RoutingGraph::new(settings);
    for writer in [synthetic_package(), neighbour_package()] {
        graph
            .import_reader(Cursor::new(writer.to_bytes().unwrap()))
            .unwrap();
    }
    graph
}

/// Projection of `query` onto the segment `(lat0, lon0)..(lat1, lon1)` in an
/// equirectangular frame centered at the query: relative position and meters.
fn project_onto_segment(query: WgsPos, lat0: f64, lon0: f64, lat1: f64, lon1: f64) -> (f64, f64) {
    let meters_per_degree = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;
    let scale_x = query.lat.to_radians().cos() * meters_per_degree;
    let (ax, ay) = ((lon0 - query.lon) * scale_x, (lat0 - query.lat) * meters_per_degree);
    let (bx, by) = ((lon1 - query.lon) * scale_x, (lat1 - query.lat) * meters_per_degree);
    let t = (-(ax * (bx - ax) + ay * (by - ay)) / ((bx - ax).powi(2) + (by - ay).powi(2)))
        .clamp(0.0, 1.0);
    let (px, py) = (ax + (bx - ax) * t, ay + (by - ay) * t);
    (t, px.hypot(py))
}

#[test]
fn test_nearest_node_on_diagonal_street() {
    run_test(
        create_test_context,
        |_ctx| {
            let graph = graph(GraphSettings::default());
            let query = WgsPos::new(59.58, 24.60);

            let result = graph.find_nearest_node(&query)?;
            assert_eq!(result.len(), 1);
            let nearest = result[0];
            assert_eq!(nearest.node_id, NODE_B);
            assert_eq!(nearest.geometry_segment_index, 0);

            let (rel_pos, distance) = project_onto_segment(query, 59.50, 24.50, 59.60, 24.80);
            assert!((nearest.geometry_rel_pos - rel_pos).abs() < 1e-6);
            assert!((nearest.distance - distance).abs() < 1e-3);
            assert!(nearest.geometry_rel_pos > 0.0 && nearest.geometry_rel_pos < 1.0);

            // the returned point lies on B between its end points
            assert!(nearest.node_pos.lat > 59.50 && nearest.node_pos.lat < 59.60);
            assert!(nearest.node_pos.lon > 24.50 && nearest.node_pos.lon < 24.80);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_nearest_node_uses_travel_direction() {
    run_test(
        create_test_context,
        |_ctx| {
            let graph = graph(GraphSettings::default());

            // C is stored reversed; positions are reported along 24.10 -> 24.30
            let result = graph.find_nearest_node(&WgsPos::new(59.92, 24.15))?;
            assert_eq!(result[0].node_id, NODE_C);
            assert!((result[0].geometry_rel_pos - 0.25).abs() < 1e-6);

            let result = graph.find_nearest_node(&WgsPos::new(59.95, 24.35))?;
            assert_eq!(result[0].node_id, NODE_C);
            assert_eq!(result[0].geometry_rel_pos, 1.0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_nearest_node_on_geometry() {
    run_test(
        create_test_context,
        |_ctx| {
            let graph = graph(GraphSettings::default());
            let result = graph.find_nearest_node(&WgsPos::new(59.10, 24.10))?;
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].node_id, NODE_A);
            assert!(result[0].geometry_rel_pos < 1e-9);
            assert!(result[0].distance < 0.5);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_nearest_node_in_second_package() {
    run_test(
        create_test_context,
        |_ctx| {
            let graph = graph(GraphSettings::default());
            let result = graph.find_nearest_node(&WgsPos::new(59.50, 25.20))?;
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].node_id, NODE_D);
            assert!((result[0].geometry_rel_pos - 0.5).abs() < 1e-6);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_query_outside_packages() {
    run_test(
        create_test_context,
        |_ctx| {
            let query = WgsPos::new(60.50, 24.50);
            assert!(graph(GraphSettings::default())
                .find_nearest_node(&query)?
                .is_empty());

            let graph = graph(GraphSettings::builder().nearest_search_radius(100_000.0).build());
            let result = graph.find_nearest_node(&query)?;
            assert_eq!(result.len(), 1);
            assert_eq!(result[0].node_id, NODE_C);
            assert_eq!(result[0].geometry_rel_pos, 1.0);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_invalid_query() {
    run_test(
        create_test_context,
        |_ctx| {
            let graph = graph(GraphSettings::default());
            assert!(graph.find_nearest_node(&WgsPos::new(91.0, 24.5))?.is_empty());
            assert!(graph.find_nearest_node(&WgsPos::new(59.5, f64::NAN))?.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_step_cap() {
    run_test(
        create_test_context,
        |_ctx| {
            let query = WgsPos::new(59.58, 24.60);

            // the root is expanded, then the cap stops the search before any block is scanned
            let capped = graph(GraphSettings::builder().max_search_steps(1).build());
            assert!(capped.find_nearest_node(&query)?.is_empty());

            let generous = graph(GraphSettings::builder().max_search_steps(100).build());
            assert_eq!(generous.find_nearest_node(&query)?[0].node_id, NODE_B);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_nearest_node_on_grid() {
    run_test(
        create_test_context,
        |ctx| {
            let origin = WgsPos::new(58.0, 26.0);
            let size = 8;
            ctx.write_package("grid", &grid_package(9, "grid", origin, size))?;
            let graph = ctx.open_graph(GraphSettings::default())?;

            for (row, column) in [(0, 0), (3, 5), (7, 7), (5, 2)] {
                let street = grid_street(&origin, row, column);
                let middle = WgsPos::new(
                    street[0].to_wgs().lat,
                    (street[0].to_wgs().lon + street[1].to_wgs().lon) / 2.0,
                );
                let result = graph.find_nearest_node(&middle)?;
                assert_eq!(result.len(), 1);
                assert_eq!(result[0].node_id, grid_node_id(9, size, row, column));
                assert!((result[0].geometry_rel_pos - 0.5).abs() < 1e-6);
            }
            Ok(())
        },
        cleanup,
    )
}
