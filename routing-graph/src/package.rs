//! Imported packages and the parent/child naming rule.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::blocks::BlockKind;
use crate::bounding_box::BoundingBox;
use crate::constants::META_CHUNK;
use crate::container::{ContainerReader, DataChunk};
use crate::errors::{GraphError, GraphResult};
use crate::format::PackageMeta;
use crate::ids::{BlockId, RTreeNodeId};

/// One imported region: its metadata and the five block chunks it owns.
pub(crate) struct Package {
    package_id: u32,
    package_name: String,
    bbox: BoundingBox,
    rtree_root: Option<RTreeNodeId>,
    node_chunk: DataChunk,
    geometry_chunk: DataChunk,
    name_chunk: DataChunk,
    global_node_chunk: DataChunk,
    rtree_chunk: DataChunk,
}

impl Package {
    /// Reads the package metadata and opens every block chunk.
    pub(crate) fn open(container: &Arc<ContainerReader>) -> GraphResult<Self> {
        let meta: PackageMeta = container.read_record(META_CHUNK)?;
        if !meta.bbox.is_valid() {
            return Err(GraphError::Header(format!(
                "package '{}' has invalid bounding box {}",
                meta.package_name, meta.bbox
            )));
        }

        let rtree_chunk = container.chunk(BlockKind::RTreeNode.chunk_tag())?;
        // a package without r-tree blocks has nothing to search
        let rtree_root = (rtree_chunk.block_count() > 0).then(|| {
            RTreeNodeId::new(
                BlockId::new(meta.package_id, meta.rtree_root.block_index),
                meta.rtree_root.element_index,
            )
        });
        Ok(Self {
            package_id: meta.package_id,
            package_name: meta.package_name,
            bbox: meta.bbox,
            rtree_root,
            node_chunk: container.chunk(BlockKind::Node.chunk_tag())?,
            geometry_chunk: container.chunk(BlockKind::Geometry.chunk_tag())?,
            name_chunk: container.chunk(BlockKind::Name.chunk_tag())?,
            global_node_chunk: container.chunk(BlockKind::GlobalNode.chunk_tag())?,
            rtree_chunk,
        })
    }

    pub(crate) fn package_id(&self) -> u32 {
        self.package_id
    }

    pub(crate) fn package_name(&self) -> &str {
        &self.package_name
    }

    pub(crate) fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    /// Root of the package's R-tree, `None` when the package has no R-tree blocks.
    pub(crate) fn rtree_root(&self) -> Option<RTreeNodeId> {
        self.rtree_root
    }

    pub(crate) fn chunk(&self, kind: BlockKind) -> &DataChunk {
        match kind {
            BlockKind::Node => &self.node_chunk,
            BlockKind::Geometry => &self.geometry_chunk,
            BlockKind::Name => &self.name_chunk,
            BlockKind::GlobalNode => &self.global_node_chunk,
            BlockKind::RTreeNode => &self.rtree_chunk,
        }
    }

    pub(crate) fn info(&self) -> PackageInfo {
        PackageInfo {
            package_id: self.package_id,
            package_name: self.package_name.clone(),
            bbox: self.bbox,
            node_blocks: self.node_chunk.block_count(),
            geometry_blocks: self.geometry_chunk.block_count(),
            name_blocks: self.name_chunk.block_count(),
            global_node_blocks: self.global_node_chunk.block_count(),
            rtree_node_blocks: self.rtree_chunk.block_count(),
        }
    }
}

/// Read-only summary of a loaded package.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageInfo {
    pub package_id: u32,
    pub package_name: String,
    pub bbox: BoundingBox,
    pub node_blocks: usize,
    pub geometry_blocks: usize,
    pub name_blocks: usize,
    pub global_node_blocks: usize,
    pub rtree_node_blocks: usize,
}

/// Name of the parent region of `name`: the part before the first `-`.
pub(crate) fn parent_name(name: &str) -> Option<&str> {
    name.split_once('-').map(|(parent, _)| parent)
}

/// Splits package names into those to load and those overridden by a child
/// package. Each skipped name is paired with the child that overrides it.
pub(crate) fn select_packages<'a>(
    names: impl IntoIterator<Item = &'a str>,
) -> (Vec<&'a str>, Vec<(&'a str, &'a str)>) {
    let names: BTreeSet<&str> = names.into_iter().collect();
    let mut selected = Vec::new();
    let mut skipped = Vec::new();
    for name in &names {
        let child = names
            .iter()
            .find(|other| *other != name && parent_name(other) == Some(*name));
        match child {
            Some(child) => skipped.push((*name, *child)),
            None => selected.push(*name),
        }
    }
    (selected, skipped)
}
