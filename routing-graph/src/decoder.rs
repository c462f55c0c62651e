//! Block decoders.
//!
//! Each decoder turns the raw bytes of one block into its typed form. They are
//! pure: no cache or lock is touched, and malformed input always surfaces as a
//! [`GraphError::Decode`] instead of a partially built block.

use crate::blocks::{
    BlockKind, Edge, EdgeData, GeometryBlock, GlobalNodeBlock, NameBlock, Node, NodeBlock, NodeData,
    RTreeNode, RTreeNodeBlock,
};
use crate::codec::decode_geometry;
use crate::constants::COORDINATE_SCALE;
use crate::errors::{GraphError, GraphResult};
use crate::format::{
    decode_record, ElementRef, GeometryBlockRecord, GlobalNodeBlockRecord, NameBlockRecord,
    NodeBlockRecord, NodeRef, RTreeNodeBlockRecord,
};
use crate::geometry::Point;
use crate::ids::{BlockId, ElementId, GlobalNodeId, NodeId};

const MAX_LAT: i64 = (90.0 * COORDINATE_SCALE) as i64;
const MAX_LON: i64 = (180.0 * COORDINATE_SCALE) as i64;

fn read<T: serde::de::DeserializeOwned>(
    kind: BlockKind,
    block_id: BlockId,
    bytes: &[u8],
) -> GraphResult<T> {
    decode_record(bytes).map_err(|reason| GraphError::decode(kind, block_id, reason))
}

fn local<B>(block_id: BlockId, element: ElementRef) -> ElementId<B> {
    ElementId::new(
        BlockId::new(block_id.package_id(), element.block_index),
        element.element_index,
    )
}

// ==================== Node blocks ====================

#[derive(Debug, Clone, Copy)]
enum EdgeSlot {
    Target,
    Contracted,
}

#[derive(Debug)]
struct PendingRef {
    edge_index: usize,
    slot: EdgeSlot,
    global_node_id: GlobalNodeId,
}

/// A decoded node block whose cross-package edge references still point at
/// global node table entries.
#[derive(Debug)]
pub(crate) struct StagedNodeBlock {
    block: NodeBlock,
    pending: Vec<PendingRef>,
}

impl StagedNodeBlock {
    #[cfg(test)]
    pub(crate) fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Replaces every global reference with the local node id `resolve` returns for it.
    pub(crate) fn link<F>(self, mut resolve: F) -> GraphResult<NodeBlock>
    where
        F: FnMut(GlobalNodeId) -> GraphResult<NodeId>,
    {
        let StagedNodeBlock { mut block, pending } = self;
        let edges = block.edges_mut();
        for reference in pending {
            let node_id = resolve(reference.global_node_id)?;
            let edge = &mut edges[reference.edge_index];
            match reference.slot {
                EdgeSlot::Target => edge.target_node_id = node_id,
                EdgeSlot::Contracted => edge.contracted_node_id = Some(node_id),
            }
        }
        Ok(block)
    }
}

/// Decodes a node block. Global edge references are left for [`StagedNodeBlock::link`].
pub(crate) fn decode_node_block(block_id: BlockId, bytes: &[u8]) -> GraphResult<StagedNodeBlock> {
    let record: NodeBlockRecord = read(BlockKind::Node, block_id, bytes)?;
    let edge_count = record.edges.len();

    let mut nodes = Vec::with_capacity(record.nodes.len());
    for (index, node) in record.nodes.into_iter().enumerate() {
        let last_edge = node
            .first_edge
            .checked_add(node.edge_count)
            .filter(|last| *last as usize <= edge_count)
            .ok_or_else(|| {
                GraphError::decode(
                    BlockKind::Node,
                    block_id,
                    format!(
                        "node {} edges [{}, +{}) exceed {} edges",
                        index, node.first_edge, node.edge_count, edge_count
                    ),
                )
            })?;
        nodes.push(Node {
            first_edge: node.first_edge,
            last_edge,
            node_data: NodeData {
                geometry_id: node.geometry.map(|g| local(block_id, g)),
                geometry_reversed: node.geometry_reversed,
                name_id: node.name.map(|n| local(block_id, n)),
                weight: node.weight,
                travel_mode: node.travel_mode,
            },
        });
    }

    let mut pending = Vec::new();
    let mut edges = Vec::with_capacity(edge_count);
    for (edge_index, edge) in record.edges.into_iter().enumerate() {
        let mut resolve_slot = |node_ref: NodeRef, slot: EdgeSlot| -> NodeId {
            match node_ref {
                NodeRef::Local(element) => local(block_id, element),
                NodeRef::Global(element) => {
                    pending.push(PendingRef {
                        edge_index,
                        slot,
                        global_node_id: local(block_id, element),
                    });
                    // placeholder until linked
                    NodeId::new(block_id, 0)
                }
            }
        };
        let target_node_id = resolve_slot(edge.target, EdgeSlot::Target);
        let contracted_node_id = edge
            .contracted_node
            .map(|node_ref| resolve_slot(node_ref, EdgeSlot::Contracted));
        edges.push(Edge {
            target_node_id,
            contracted_node_id,
            forward: edge.forward,
            backward: edge.backward,
            edge_data: EdgeData {
                weight: edge.weight,
                turn_instruction: edge.turn_instruction,
            },
        });
    }

    Ok(StagedNodeBlock {
        block: NodeBlock::new(nodes, edges),
        pending,
    })
}

// ==================== Geometry, name and global node blocks ====================

pub(crate) fn decode_geometry_block(block_id: BlockId, bytes: &[u8]) -> GraphResult<GeometryBlock> {
    let record: GeometryBlockRecord = read(BlockKind::Geometry, block_id, bytes)?;
    let mut geometries = Vec::with_capacity(record.geometries.len());
    for (index, deltas) in record.geometries.iter().enumerate() {
        let points = decode_geometry(deltas);
        if let Some(point) = points.iter().find(|p| !is_valid_point(p)) {
            return Err(GraphError::decode(
                BlockKind::Geometry,
                block_id,
                format!(
                    "geometry {} has out of range coordinate ({}, {})",
                    index, point.lat, point.lon
                ),
            ));
        }
        geometries.push(points);
    }
    Ok(GeometryBlock::new(geometries))
}

fn is_valid_point(point: &Point) -> bool {
    (point.lat as i64).abs() <= MAX_LAT && (point.lon as i64).abs() <= MAX_LON
}

pub(crate) fn decode_name_block(block_id: BlockId, bytes: &[u8]) -> GraphResult<NameBlock> {
    let record: NameBlockRecord = read(BlockKind::Name, block_id, bytes)?;
    Ok(NameBlock::new(record.names))
}

pub(crate) fn decode_global_node_block(
    block_id: BlockId,
    bytes: &[u8],
) -> GraphResult<GlobalNodeBlock> {
    let record: GlobalNodeBlockRecord = read(BlockKind::GlobalNode, block_id, bytes)?;
    let global_node_ids = record
        .nodes
        .into_iter()
        .map(|node| {
            NodeId::new(
                BlockId::new(node.package_id, node.block_index),
                node.element_index,
            )
        })
        .collect();
    Ok(GlobalNodeBlock::new(global_node_ids))
}

// ==================== R-tree blocks ====================

pub(crate) fn decode_rtree_node_block(
    block_id: BlockId,
    bytes: &[u8],
) -> GraphResult<RTreeNodeBlock> {
    let record: RTreeNodeBlockRecord = read(BlockKind::RTreeNode, block_id, bytes)?;
    let package_id = block_id.package_id();

    let mut rtree_nodes = Vec::with_capacity(record.nodes.len());
    for (index, node) in record.nodes.into_iter().enumerate() {
        let mut bboxes = node
            .children
            .iter()
            .map(|(bbox, _)| bbox)
            .chain(node.node_blocks.iter().map(|(bbox, _)| bbox));
        if let Some(bbox) = bboxes.find(|bbox| !bbox.is_valid()) {
            return Err(GraphError::decode(
                BlockKind::RTreeNode,
                block_id,
                format!("r-tree node {} has invalid bounding box {}", index, bbox),
            ));
        }

        let rtree_node = match (node.children.is_empty(), node.node_blocks.is_empty()) {
            (false, false) => {
                return Err(GraphError::decode(
                    BlockKind::RTreeNode,
                    block_id,
                    format!("r-tree node {} has both child nodes and node blocks", index),
                ))
            }
            (false, true) => RTreeNode::Interior(
                node.children
                    .into_iter()
                    .map(|(bbox, child)| (bbox, local(block_id, child)))
                    .collect(),
            ),
            (true, _) => RTreeNode::Leaf(
                node.node_blocks
                    .into_iter()
                    .map(|(bbox, block_index)| (bbox, BlockId::new(package_id, block_index)))
                    .collect(),
            ),
        };
        rtree_nodes.push(rtree_node);
    }
    Ok(RTreeNodeBlock::new(rtree_nodes))
}
