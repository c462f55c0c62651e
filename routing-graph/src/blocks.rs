//! Decoded block types.
//!
//! Blocks are immutable once decoded and shared through `Arc`: the caches hold
//! one reference and every outstanding handle holds another, so evicting a
//! block never invalidates data a caller is still looking at.

use std::fmt::{self, Display};
use std::ops::Range;

use crate::bounding_box::BoundingBox;
use crate::constants::{GEOMETRY_CHUNK, GLOBAL_NODE_CHUNK, NAME_CHUNK, NODE_CHUNK, RTREE_CHUNK};
use crate::errors::{GraphError, GraphResult};
use crate::geometry::Point;
use crate::ids::{BlockId, ElementId, GeometryId, NameId, NodeId, RTreeNodeId};

/// The five block kinds of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Node,
    Geometry,
    Name,
    GlobalNode,
    RTreeNode,
}

impl BlockKind {
    pub const ALL: [BlockKind; 5] = [
        BlockKind::Node,
        BlockKind::Geometry,
        BlockKind::Name,
        BlockKind::GlobalNode,
        BlockKind::RTreeNode,
    ];

    /// Tag of the chunk holding blocks of this kind.
    pub fn chunk_tag(&self) -> [u8; 4] {
        match self {
            BlockKind::Node => NODE_CHUNK,
            BlockKind::Geometry => GEOMETRY_CHUNK,
            BlockKind::Name => NAME_CHUNK,
            BlockKind::GlobalNode => GLOBAL_NODE_CHUNK,
            BlockKind::RTreeNode => RTREE_CHUNK,
        }
    }

    pub(crate) fn id_name(&self) -> &'static str {
        match self {
            BlockKind::Node => "NodeId",
            BlockKind::Geometry => "GeometryId",
            BlockKind::Name => "NameId",
            BlockKind::GlobalNode => "GlobalNodeId",
            BlockKind::RTreeNode => "RTreeNodeId",
        }
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Node => "node",
            BlockKind::Geometry => "geometry",
            BlockKind::Name => "name",
            BlockKind::GlobalNode => "global node",
            BlockKind::RTreeNode => "r-tree node",
        };
        f.write_str(name)
    }
}

/// A decoded block: a sequence of elements addressed by [`ElementId`].
pub trait Block: Send + Sync + Sized + 'static {
    type Element;

    const KIND: BlockKind;

    fn elements(&self) -> &[Self::Element];

    /// Looks up an element, failing with a corrupt-data error when the index
    /// is beyond the block. Never clamps.
    fn element(&self, id: ElementId<Self>) -> GraphResult<&Self::Element> {
        let elements = self.elements();
        elements
            .get(id.element_index() as usize)
            .ok_or(GraphError::InvalidElement {
                kind: Self::KIND,
                block_id: id.block_id(),
                element_index: id.element_index(),
                len: elements.len(),
            })
    }
}

/// Routing cost and maneuver hint of a directed edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EdgeData {
    pub weight: u32,
    pub turn_instruction: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Global references are resolved at load time, so this may name a node of another package.
    pub target_node_id: NodeId,
    /// The node bypassed by a contraction shortcut.
    pub contracted_node_id: Option<NodeId>,
    pub forward: bool,
    pub backward: bool,
    pub edge_data: EdgeData,
}

impl Edge {
    pub fn is_contracted(&self) -> bool {
        self.contracted_node_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeData {
    pub geometry_id: Option<GeometryId>,
    /// The stored geometry is shared with the opposite direction and must be read backwards.
    pub geometry_reversed: bool,
    pub name_id: Option<NameId>,
    pub weight: u32,
    pub travel_mode: u8,
}

/// A graph node. Its outgoing edges are the range `first_edge..last_edge` of
/// the owning [`NodeBlock`]'s edge array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub first_edge: u32,
    pub last_edge: u32,
    pub node_data: NodeData,
}

impl Node {
    pub fn edge_range(&self) -> Range<usize> {
        self.first_edge as usize..self.last_edge as usize
    }

    pub fn edge_count(&self) -> usize {
        self.edge_range().len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeBlock {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl NodeBlock {
    /// Every node's edge range must lie inside `edges`; the decoder checks this.
    pub(crate) fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_edges(&self, node: &Node) -> &[Edge] {
        self.edges.get(node.edge_range()).unwrap_or(&[])
    }

    pub(crate) fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }
}

impl Block for NodeBlock {
    type Element = Node;
    const KIND: BlockKind = BlockKind::Node;

    fn elements(&self) -> &[Node] {
        &self.nodes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryBlock {
    geometries: Vec<Vec<Point>>,
}

impl GeometryBlock {
    pub(crate) fn new(geometries: Vec<Vec<Point>>) -> Self {
        Self { geometries }
    }

    pub fn geometries(&self) -> &[Vec<Point>] {
        &self.geometries
    }
}

impl Block for GeometryBlock {
    type Element = Vec<Point>;
    const KIND: BlockKind = BlockKind::Geometry;

    fn elements(&self) -> &[Vec<Point>] {
        &self.geometries
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameBlock {
    names: Vec<String>,
}

impl NameBlock {
    pub(crate) fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Block for NameBlock {
    type Element = String;
    const KIND: BlockKind = BlockKind::Name;

    fn elements(&self) -> &[String] {
        &self.names
    }
}

/// Indirection table from global node ids to package-local node ids.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalNodeBlock {
    global_node_ids: Vec<NodeId>,
}

impl GlobalNodeBlock {
    pub(crate) fn new(global_node_ids: Vec<NodeId>) -> Self {
        Self { global_node_ids }
    }

    pub fn global_node_ids(&self) -> &[NodeId] {
        &self.global_node_ids
    }
}

impl Block for GlobalNodeBlock {
    type Element = NodeId;
    const KIND: BlockKind = BlockKind::GlobalNode;

    fn elements(&self) -> &[NodeId] {
        &self.global_node_ids
    }
}

/// A node of a package's R-tree.
#[derive(Debug, Clone, PartialEq)]
pub enum RTreeNode {
    /// Child R-tree nodes with their bounding boxes
    Interior(Vec<(BoundingBox, RTreeNodeId)>),
    /// Node blocks whose members fall inside the given bounding boxes
    Leaf(Vec<(BoundingBox, BlockId)>),
}

impl RTreeNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self, RTreeNode::Leaf(_))
    }

    pub fn len(&self) -> usize {
        match self {
            RTreeNode::Interior(children) => children.len(),
            RTreeNode::Leaf(node_blocks) => node_blocks.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounding box enclosing all entries.
    pub fn compute_bbox(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        match self {
            RTreeNode::Interior(children) => children.iter().for_each(|(b, _)| bbox.expand(b)),
            RTreeNode::Leaf(node_blocks) => node_blocks.iter().for_each(|(b, _)| bbox.expand(b)),
        }
        bbox
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RTreeNodeBlock {
    rtree_nodes: Vec<RTreeNode>,
}

impl RTreeNodeBlock {
    pub(crate) fn new(rtree_nodes: Vec<RTreeNode>) -> Self {
        Self { rtree_nodes }
    }

    pub fn rtree_nodes(&self) -> &[RTreeNode] {
        &self.rtree_nodes
    }
}

impl Block for RTreeNodeBlock {
    type Element = RTreeNode;
    const KIND: BlockKind = BlockKind::RTreeNode;

    fn elements(&self) -> &[RTreeNode] {
        &self.rtree_nodes
    }
}
