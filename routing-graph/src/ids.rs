//! Composite block and element identifiers.
//!
//! Identifiers never carry raw offsets or pointers: an element is addressed by
//! the block that contains it plus its index inside the decoded block, so an id
//! stays meaningful after the block has been evicted from its cache and loaded
//! again. The element identifier is typed by the block it points into, which
//! keeps e.g. a [`GlobalNodeId`] from being passed where a [`NodeId`] is
//! expected.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use crate::blocks::{
    Block, GeometryBlock, GlobalNodeBlock, NameBlock, NodeBlock, RTreeNodeBlock,
};

/// Identifies one block inside the chunk of a package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    package_id: u32,
    block_index: u32,
}

impl BlockId {
    pub const fn new(package_id: u32, block_index: u32) -> Self {
        Self {
            package_id,
            block_index,
        }
    }

    pub fn package_id(&self) -> u32 {
        self.package_id
    }

    pub fn block_index(&self) -> u32 {
        self.block_index
    }
}

impl Display for BlockId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.package_id, self.block_index)
    }
}

/// Identifies one element inside a decoded block of kind `B`.
pub struct ElementId<B> {
    block_id: BlockId,
    element_index: u32,
    _block: PhantomData<fn() -> B>,
}

/// A node inside a [`NodeBlock`].
pub type NodeId = ElementId<NodeBlock>;
/// A point sequence inside a [`GeometryBlock`].
pub type GeometryId = ElementId<GeometryBlock>;
/// A street name inside a [`NameBlock`].
pub type NameId = ElementId<NameBlock>;
/// An indirection entry inside a [`GlobalNodeBlock`].
pub type GlobalNodeId = ElementId<GlobalNodeBlock>;
/// An R-tree node inside an [`RTreeNodeBlock`].
pub type RTreeNodeId = ElementId<RTreeNodeBlock>;

impl<B> ElementId<B> {
    pub const fn new(block_id: BlockId, element_index: u32) -> Self {
        Self {
            block_id,
            element_index,
            _block: PhantomData,
        }
    }

    pub fn block_id(&self) -> BlockId {
        self.block_id
    }

    pub fn element_index(&self) -> u32 {
        self.element_index
    }

    pub fn package_id(&self) -> u32 {
        self.block_id.package_id
    }
}

impl<B> Clone for ElementId<B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for ElementId<B> {}

impl<B> PartialEq for ElementId<B> {
    fn eq(&self, other: &Self) -> bool {
        self.block_id == other.block_id && self.element_index == other.element_index
    }
}

impl<B> Eq for ElementId<B> {}

impl<B> Hash for ElementId<B> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.block_id.hash(state);
        self.element_index.hash(state);
    }
}

impl<B> PartialOrd for ElementId<B> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<B> Ord for ElementId<B> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.block_id
            .cmp(&other.block_id)
            .then(self.element_index.cmp(&other.element_index))
    }
}

impl<B: Block> Debug for ElementId<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}, {}, {})",
            B::KIND.id_name(),
            self.block_id.package_id,
            self.block_id.block_index,
            self.element_index
        )
    }
}

impl<B> Display for ElementId<B> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.block_id, self.element_index)
    }
}
