//! # Routing Graph - Paged Road Graph Storage
//!
//! This crate serves a read-only road graph for turn-by-turn routing out of
//! binary package files. Each package covers one region; its nodes, edges,
//! geometries, street names, cross-package node table and R-tree are split
//! into blocks that are decoded on demand and kept in per-kind LRU caches.
//!
//! ## Features
//!
//! - **Paged Storage**: blocks are read from disk only when first accessed
//! - **Block Caches**: five independent LRU caches, one per block kind
//! - **Eviction Safe Handles**: a [`NodePtr`] keeps its block alive after eviction
//! - **Region Overlays**: `region-sub` packages replace their `region` parent
//! - **Nearest Road Search**: best-first branch and bound over the package R-trees
//! - **Thread Safe**: queries run concurrently on a shared graph
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use routing_graph::{GraphSettings, RoutingGraph, WgsPos};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = RoutingGraph::new(GraphSettings::builder().low_memory_preset().build());
//! graph.import("/var/lib/routing/packages");
//!
//! for nearest in graph.find_nearest_node(&WgsPos::new(59.437, 24.745))? {
//!     let node = graph.get_node(nearest.node_id)?;
//!     let geometry = graph.get_node_geometry(&node)?;
//!     println!(
//!         "{} ({} points), segment {} at {:.2}",
//!         graph.get_node_name(&node)?,
//!         geometry.len(),
//!         nearest.geometry_segment_index,
//!         nearest.geometry_rel_pos
//!     );
//! }
//! # Ok(())
//! # }
//! ```

pub mod block_cache;
pub mod blocks;
pub mod bounding_box;
pub mod codec;
pub mod constants;
pub mod container;
pub(crate) mod decoder;
pub mod errors;
pub mod format;
pub mod geometry;
pub mod graph;
pub mod ids;
pub mod package;
pub mod search;
pub mod settings;
pub mod writer;

pub use block_cache::{CacheStats, GraphStats};
pub use blocks::{
    Block, BlockKind, Edge, EdgeData, GeometryBlock, GlobalNodeBlock, NameBlock, Node, NodeBlock,
    NodeData, RTreeNode, RTreeNodeBlock,
};
pub use bounding_box::BoundingBox;
pub use errors::{GraphError, GraphResult};
pub use geometry::{bbox_distance, closest_segment_point, point_distance, Point, WgsPos};
pub use graph::{NodePtr, RoutingGraph};
pub use ids::{BlockId, ElementId, GeometryId, GlobalNodeId, NameId, NodeId, RTreeNodeId};
pub use package::PackageInfo;
pub use search::NearestNode;
pub use settings::{GraphSettings, GraphSettingsBuilder};
pub use writer::PackageWriter;
