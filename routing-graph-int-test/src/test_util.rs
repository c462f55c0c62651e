use routing_graph::constants::PACKAGE_EXTENSION;
use routing_graph::format::{
    EdgeRecord, ElementRef, GlobalNodeRecord, NodeBlockRecord, NodeRecord, NodeRef,
    RTreeNodeRecord,
};
use routing_graph::{
    BlockId, BoundingBox, GraphResult, GraphSettings, NodeId, PackageWriter, Point, RoutingGraph,
    WgsPos,
};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;

/// Runs a test between a setup and a teardown step. The teardown runs even
/// when the test fails or panics.
pub fn run_test<B, T, A>(before: B, test: T, after: A)
where
    B: Fn() -> GraphResult<TestContext>,
    T: Fn(TestContext) -> GraphResult<()>,
    A: Fn(TestContext) -> GraphResult<()>,
{
    let ctx = match before() {
        Ok(ctx) => ctx,
        Err(e) => panic!("Before run failed: {:?}", e),
    };

    let start_time = Instant::now();
    let result = panic::catch_unwind(AssertUnwindSafe(|| test(ctx.clone())));
    let elapsed = start_time.elapsed();
    let after_result = after(ctx);

    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => panic!("Test failed (took {:?}): {:?}", elapsed, e),
        Err(panic_err) => {
            eprintln!("\n========== Test Panicked (took {:?}) ==========", elapsed);
            panic::resume_unwind(panic_err);
        }
    }
    if let Err(e) = after_result {
        panic!("After run failed: {:?}", e);
    }
}

/// A scratch package directory shared by one test.
#[derive(Clone)]
pub struct TestContext {
    dir: Arc<TempDir>,
}

impl TestContext {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn package_path(&self, name: &str) -> PathBuf {
        self.path().join(format!("{}.{}", name, PACKAGE_EXTENSION))
    }

    /// Writes a package as `<name>.nutigraph` into the directory.
    pub fn write_package(&self, name: &str, writer: &PackageWriter) -> GraphResult<PathBuf> {
        let path = self.package_path(name);
        writer.write_to(&path)?;
        Ok(path)
    }

    /// Imports the whole directory into a new graph.
    pub fn open_graph(&self, settings: GraphSettings) -> GraphResult<RoutingGraph> {
        let mut graph = RoutingGraph::new(settings);
        graph.import_directory(self.path())?;
        Ok(graph)
    }
}

pub fn create_test_context() -> GraphResult<TestContext> {
    Ok(TestContext {
        dir: Arc::new(tempfile::tempdir()?),
    })
}

pub fn cleanup(ctx: TestContext) -> GraphResult<()> {
    if let Ok(dir) = Arc::try_unwrap(ctx.dir) {
        dir.close()?;
    }
    Ok(())
}

pub fn wgs(lat: f64, lon: f64) -> Point {
    Point::from_wgs(&WgsPos::new(lat, lon))
}

pub fn line_bbox(points: &[Point]) -> BoundingBox {
    let positions: Vec<WgsPos> = points.iter().map(Point::to_wgs).collect();
    BoundingBox::from_positions(&positions)
}

fn node_record(first_edge: u32, edge_count: u32, geometry: ElementRef, name: ElementRef) -> NodeRecord {
    NodeRecord {
        first_edge,
        edge_count,
        geometry: Some(geometry),
        geometry_reversed: false,
        name: Some(name),
        weight: 100,
        travel_mode: 1,
    }
}

fn edge_record(target: NodeRef, weight: u32) -> EdgeRecord {
    EdgeRecord {
        target,
        contracted_node: None,
        forward: true,
        backward: false,
        weight,
        turn_instruction: 0,
    }
}

// ==================== Synthetic three node package ====================

pub const SYNTHETIC_PACKAGE_ID: u32 = 1;
pub const NEIGHBOUR_PACKAGE_ID: u32 = 2;

pub const NODE_A: NodeId = NodeId::new(BlockId::new(SYNTHETIC_PACKAGE_ID, 0), 0);
pub const NODE_B: NodeId = NodeId::new(BlockId::new(SYNTHETIC_PACKAGE_ID, 0), 1);
pub const NODE_C: NodeId = NodeId::new(BlockId::new(SYNTHETIC_PACKAGE_ID, 1), 0);
pub const NODE_D: NodeId = NodeId::new(BlockId::new(NEIGHBOUR_PACKAGE_ID, 0), 0);

pub fn geometry_a() -> Vec<Point> {
    vec![wgs(59.10, 24.10), wgs(59.10, 24.40)]
}

pub fn geometry_b() -> Vec<Point> {
    vec![wgs(59.50, 24.50), wgs(59.60, 24.80)]
}

/// Geometry of node C in travel direction. It is stored reversed.
pub fn geometry_c() -> Vec<Point> {
    vec![wgs(59.90, 24.10), wgs(59.90, 24.30)]
}

pub fn geometry_d() -> Vec<Point> {
    vec![wgs(59.55, 25.10), wgs(59.55, 25.30)]
}

/// Package 1 with nodes A and B in node block 0 and node C in node block 1.
///
/// Edges: A->B, B->A, B->C, B->D (D lives in package 2 and is reached through
/// the global node table) and C->B contracted over A.
pub fn synthetic_package() -> PackageWriter {
    let mut writer = PackageWriter::new(
        SYNTHETIC_PACKAGE_ID,
        "synthetic",
        BoundingBox::new(24.0, 59.0, 25.0, 60.0),
    );

    let mut stored_c = geometry_c();
    stored_c.reverse();
    writer
        .add_geometry_block(vec![geometry_a(), geometry_b(), stored_c])
        .unwrap();
    writer
        .add_name_block(vec![
            "Alpha Street".to_string(),
            "Beta Street".to_string(),
            "Gamma Street".to_string(),
        ])
        .unwrap();

    writer
        .add_node_block(NodeBlockRecord {
            nodes: vec![
                node_record(0, 1, ElementRef::new(0, 0), ElementRef::new(0, 0)),
                node_record(1, 3, ElementRef::new(0, 1), ElementRef::new(0, 1)),
            ],
            edges: vec![
                edge_record(NodeRef::Local(ElementRef::new(0, 1)), 10),
                edge_record(NodeRef::Local(ElementRef::new(0, 0)), 10),
                edge_record(NodeRef::Local(ElementRef::new(1, 0)), 20),
                edge_record(NodeRef::Global(ElementRef::new(0, 0)), 30),
            ],
        })
        .unwrap();
    writer
        .add_node_block(NodeBlockRecord {
            nodes: vec![NodeRecord {
                geometry_reversed: true,
                ..node_record(0, 1, ElementRef::new(0, 2), ElementRef::new(0, 2))
            }],
            edges: vec![EdgeRecord {
                contracted_node: Some(NodeRef::Local(ElementRef::new(0, 0))),
                ..edge_record(NodeRef::Local(ElementRef::new(0, 1)), 40)
            }],
        })
        .unwrap();

    writer
        .add_global_node_block(vec![
            GlobalNodeRecord {
                package_id: NEIGHBOUR_PACKAGE_ID,
                block_index: 0,
                element_index: 0,
            },
            GlobalNodeRecord {
                package_id: SYNTHETIC_PACKAGE_ID,
                block_index: 1,
                element_index: 0,
            },
        ])
        .unwrap();

    let block0_bbox = line_bbox(&geometry_a()).union(&line_bbox(&geometry_b()));
    let block1_bbox = line_bbox(&geometry_c());
    writer
        .add_rtree_block(vec![
            RTreeNodeRecord {
                children: vec![
                    (block0_bbox, ElementRef::new(0, 1)),
                    (block1_bbox, ElementRef::new(0, 2)),
                ],
                node_blocks: Vec::new(),
            },
            RTreeNodeRecord {
                children: Vec::new(),
                node_blocks: vec![(block0_bbox, 0)],
            },
            RTreeNodeRecord {
                children: Vec::new(),
                node_blocks: vec![(block1_bbox, 1)],
            },
        ])
        .unwrap();
    writer.set_rtree_root(ElementRef::new(0, 0));
    writer
}

/// Package 2 with the single node D, linked back to node B of package 1.
pub fn neighbour_package() -> PackageWriter {
    let mut writer = PackageWriter::new(
        NEIGHBOUR_PACKAGE_ID,
        "neighbour",
        BoundingBox::new(25.0, 59.0, 26.0, 60.0),
    );
    writer.add_geometry_block(vec![geometry_d()]).unwrap();
    writer
        .add_name_block(vec!["Delta Road".to_string()])
        .unwrap();
    writer
        .add_node_block(NodeBlockRecord {
            nodes: vec![node_record(0, 1, ElementRef::new(0, 0), ElementRef::new(0, 0))],
            edges: vec![edge_record(NodeRef::Global(ElementRef::new(0, 0)), 30)],
        })
        .unwrap();
    writer
        .add_global_node_block(vec![GlobalNodeRecord {
            package_id: SYNTHETIC_PACKAGE_ID,
            block_index: 0,
            element_index: 1,
        }])
        .unwrap();
    writer
        .add_rtree_block(vec![RTreeNodeRecord {
            children: Vec::new(),
            node_blocks: vec![(line_bbox(&geometry_d()), 0)],
        }])
        .unwrap();
    writer
}

// ==================== Grid package ====================

pub const GRID_CELL: f64 = 0.01;

/// Street of grid cell `(row, column)`: a short west-east segment.
pub fn grid_street(origin: &WgsPos, row: u32, column: u32) -> Vec<Point> {
    let lat = origin.lat + (row as f64 + 0.5) * GRID_CELL;
    let lon = origin.lon + column as f64 * GRID_CELL;
    vec![wgs(lat, lon + 0.2 * GRID_CELL), wgs(lat, lon + 0.8 * GRID_CELL)]
}

pub fn grid_node_id(package_id: u32, size: u32, row: u32, column: u32) -> NodeId {
    NodeId::new(BlockId::new(package_id, row * size + column), 0)
}

/// A `size` x `size` grid starting at `origin`. Every cell has its own node,
/// geometry and name block, so walking the grid puts pressure on every cache.
pub fn grid_package(package_id: u32, name: &str, origin: WgsPos, size: u32) -> PackageWriter {
    let extent = size as f64 * GRID_CELL;
    let mut writer = PackageWriter::new(
        package_id,
        name,
        BoundingBox::new(origin.lon, origin.lat, origin.lon + extent, origin.lat + extent),
    );

    let mut root = RTreeNodeRecord::default();
    let mut leaves = Vec::new();
    for row in 0..size {
        let mut leaf = RTreeNodeRecord::default();
        for column in 0..size {
            let street = grid_street(&origin, row, column);
            let bbox = line_bbox(&street);
            let geometry_block = writer.add_geometry_block(vec![street]).unwrap();
            let name_block = writer
                .add_name_block(vec![format!("Street {}-{}", row, column)])
                .unwrap();
            let node_block = writer
                .add_node_block(NodeBlockRecord {
                    nodes: vec![NodeRecord {
                        weight: row * size + column,
                        ..node_record(
                            0,
                            0,
                            ElementRef::new(geometry_block, 0),
                            ElementRef::new(name_block, 0),
                        )
                    }],
                    edges: Vec::new(),
                })
                .unwrap();
            leaf.node_blocks.push((bbox, node_block));
        }
        let mut row_bbox = BoundingBox::empty();
        leaf.node_blocks.iter().for_each(|(b, _)| row_bbox.expand(b));
        root.children.push((row_bbox, ElementRef::new(row + 1, 0)));
        leaves.push(leaf);
    }

    // one r-tree block per node so that r-tree blocks get evicted as well
    writer.add_rtree_block(vec![root]).unwrap();
    for leaf in leaves {
        writer.add_rtree_block(vec![leaf]).unwrap();
    }
    writer.set_rtree_root(ElementRef::new(0, 0));
    writer
}
