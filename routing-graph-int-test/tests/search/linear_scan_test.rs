use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use routing_graph::constants::TIE_DISTANCE_METERS;
use routing_graph::format::{ElementRef, NodeBlockRecord, NodeRecord, RTreeNodeRecord};
use routing_graph::{
    closest_segment_point, point_distance, BlockId, BoundingBox, GraphSettings, NodeId,
    PackageWriter, Point, RoutingGraph, WgsPos,
};
use routing_graph_int_test::test_util::{cleanup, create_test_context, line_bbox, run_test, wgs};
use std::io::Cursor;

const PACKAGE_ID: u32 = 11;
const BLOCK_COUNT: u32 = 40;
const LEAF_SIZE: usize = 4;
const MIN_LAT: f64 = 59.0;
const MIN_LON: f64 = 24.0;
const EXTENT: f64 = 0.5;

/// Random streets in `BLOCK_COUNT` node blocks. Leaves group the blocks in
/// shuffled order, so leaf boxes overlap and the leaf with the smallest lower
/// bound often does not hold the nearest street.
fn random_package(rng: &mut StdRng) -> (PackageWriter, Vec<(NodeId, Vec<Point>)>) {
    let mut writer = PackageWriter::new(
        PACKAGE_ID,
        "random",
        BoundingBox::new(MIN_LON, MIN_LAT, MIN_LON + EXTENT, MIN_LAT + EXTENT),
    );
    let mut streets = Vec::new();
    let mut block_boxes = Vec::new();

    for block_index in 0..BLOCK_COUNT {
        let center_lat = MIN_LAT + rng.gen_range(0.03..EXTENT - 0.03);
        let center_lon = MIN_LON + rng.gen_range(0.03..EXTENT - 0.03);
        let node_count = rng.gen_range(1..=3);

        let mut geometries = Vec::new();
        let mut nodes = Vec::new();
        let mut block_bbox = BoundingBox::empty();
        for element_index in 0..node_count {
            let point_count = rng.gen_range(1..=4);
            let stored: Vec<Point> = (0..point_count)
                .map(|_| {
                    wgs(
                        center_lat + rng.gen_range(-0.03..0.03),
                        center_lon + rng.gen_range(-0.03..0.03),
                    )
                })
                .collect();
            let reversed = rng.gen_bool(0.3);
            let mut travel = stored.clone();
            if reversed {
                travel.reverse();
            }

            block_bbox.expand(&line_bbox(&stored));
            nodes.push(NodeRecord {
                first_edge: 0,
                edge_count: 0,
                geometry: Some(ElementRef::new(block_index, element_index)),
                geometry_reversed: reversed,
                name: None,
                weight: 1,
                travel_mode: 0,
            });
            geometries.push(stored);
            streets.push((
                NodeId::new(BlockId::new(PACKAGE_ID, block_index), element_index),
                travel,
            ));
        }

        writer.add_geometry_block(geometries).unwrap();
        writer
            .add_node_block(NodeBlockRecord {
                nodes,
                edges: Vec::new(),
            })
            .unwrap();
        block_boxes.push((block_bbox, block_index));
    }

    block_boxes.shuffle(rng);
    let mut root = RTreeNodeRecord::default();
    let mut leaves = Vec::new();
    for (leaf_index, group) in block_boxes.chunks(LEAF_SIZE).enumerate() {
        let mut leaf_bbox = BoundingBox::empty();
        group.iter().for_each(|(bbox, _)| leaf_bbox.expand(bbox));
        root.children
            .push((leaf_bbox, ElementRef::new(0, leaf_index as u32 + 1)));
        leaves.push(RTreeNodeRecord {
            children: Vec::new(),
            node_blocks: group.to_vec(),
        });
    }
    let mut rtree = vec![root];
    rtree.extend(leaves);
    writer.add_rtree_block(rtree).unwrap();
    writer.set_rtree_root(ElementRef::new(0, 0));

    (writer, streets)
}

/// Distance from `query` to the closest point of `street`.
fn street_distance(query: &WgsPos, street: &[Point]) -> f64 {
    match street {
        [point] => point_distance(query, &point.to_wgs()),
        _ => street
            .windows(2)
            .map(|segment| {
                let (closest, _) =
                    closest_segment_point(query, &segment[0].to_wgs(), &segment[1].to_wgs());
                point_distance(query, &closest)
            })
            .fold(f64::INFINITY, f64::min),
    }
}

#[test]
fn test_search_matches_linear_scan() {
    run_test(
        create_test_context,
        |_ctx| {
            let mut rng = StdRng::seed_from_u64(2024);

            for _ in 0..20 {
                let (writer, streets) = random_package(&mut rng);
                let mut graph = RoutingGraph::new(GraphSettings::builder().cache_size(2).build());
                graph.import_reader(Cursor::new(writer.to_bytes()?))?;

                for _ in 0..25 {
                    let query = WgsPos::new(
                        MIN_LAT + rng.gen_range(0.0..EXTENT),
                        MIN_LON + rng.gen_range(0.0..EXTENT),
                    );
                    let scanned: Vec<(NodeId, f64)> = streets
                        .iter()
                        .map(|(node_id, street)| (*node_id, street_distance(&query, street)))
                        .collect();
                    let best = scanned
                        .iter()
                        .map(|(_, distance)| *distance)
                        .fold(f64::INFINITY, f64::min);

                    let result = graph.find_nearest_node(&query)?;
                    assert!(!result.is_empty(), "no result for {}", query);
                    assert!(
                        (result[0].distance - best).abs() < 1e-6,
                        "query {}: search found {} m, scan found {} m",
                        query,
                        result[0].distance,
                        best
                    );
                    for found in &result {
                        assert!(found.distance <= best + TIE_DISTANCE_METERS + 1e-6);
                        assert!(scanned.iter().any(|(node_id, distance)| {
                            *node_id == found.node_id && (*distance - found.distance).abs() < 1e-6
                        }));
                    }
                }

                assert!(graph.stats().node_blocks.len <= 2);
            }
            Ok(())
        },
        cleanup,
    )
}
