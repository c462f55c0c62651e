//! Package file writer.
//!
//! Assembles the blocks of one package and lays them out in the container
//! format read by [`ContainerReader`](crate::container::ContainerReader). The
//! writer never touches a loaded graph; it produces new files only.

use std::path::Path;

use log::debug;

use crate::blocks::BlockKind;
use crate::bounding_box::BoundingBox;
use crate::codec::encode_geometry;
use crate::constants::{MAGIC, META_CHUNK, VERSION_MAJOR, VERSION_MINOR};
use crate::errors::GraphResult;
use crate::format::{
    encode_record, encode_table, ChunkEntry, ElementRef, FileHeader, GeometryBlockRecord,
    GlobalNodeBlockRecord, GlobalNodeRecord, NameBlockRecord, NodeBlockRecord, PackageMeta,
    RTreeNodeBlockRecord, RTreeNodeRecord,
};
use crate::geometry::Point;

/// Builds one package file.
///
/// # Examples
///
/// ```rust
/// use routing_graph::{BoundingBox, PackageWriter, RoutingGraph};
///
/// let mut writer = PackageWriter::new(1, "tiny", BoundingBox::new(0.0, 0.0, 1.0, 1.0));
/// writer.add_name_block(vec!["Main Street".to_string()]).unwrap();
/// let bytes = writer.to_bytes().unwrap();
///
/// let mut graph = RoutingGraph::default();
/// assert!(graph.import_stream(std::io::Cursor::new(bytes)));
/// assert_eq!(graph.packages()[0].package_name, "tiny");
/// ```
#[derive(Debug, Clone)]
pub struct PackageWriter {
    meta: PackageMeta,
    version_major: u16,
    version_minor: u16,
    node_blocks: Vec<Vec<u8>>,
    geometry_blocks: Vec<Vec<u8>>,
    name_blocks: Vec<Vec<u8>>,
    global_node_blocks: Vec<Vec<u8>>,
    rtree_node_blocks: Vec<Vec<u8>>,
}

impl PackageWriter {
    pub fn new(package_id: u32, package_name: &str, bbox: BoundingBox) -> Self {
        Self {
            meta: PackageMeta {
                package_id,
                package_name: package_name.to_string(),
                bbox,
                rtree_root: ElementRef::new(0, 0),
            },
            version_major: VERSION_MAJOR,
            version_minor: VERSION_MINOR,
            node_blocks: Vec::new(),
            geometry_blocks: Vec::new(),
            name_blocks: Vec::new(),
            global_node_blocks: Vec::new(),
            rtree_node_blocks: Vec::new(),
        }
    }

    /// Overrides the format version written to the header.
    pub fn with_version(mut self, major: u16, minor: u16) -> Self {
        self.version_major = major;
        self.version_minor = minor;
        self
    }

    pub fn package_id(&self) -> u32 {
        self.meta.package_id
    }

    /// Sets the R-tree node the nearest-node search starts from.
    pub fn set_rtree_root(&mut self, root: ElementRef) {
        self.meta.rtree_root = root;
    }

    /// Appends a node block and returns its block index.
    pub fn add_node_block(&mut self, block: NodeBlockRecord) -> GraphResult<u32> {
        self.push(BlockKind::Node, encode_record(&block)?)
    }

    /// Appends a block of point sequences, delta and zig-zag encoding each one.
    pub fn add_geometry_block(&mut self, geometries: Vec<Vec<Point>>) -> GraphResult<u32> {
        let record = GeometryBlockRecord {
            geometries: geometries.iter().map(|g| encode_geometry(g)).collect(),
        };
        self.push(BlockKind::Geometry, encode_record(&record)?)
    }

    pub fn add_name_block(&mut self, names: Vec<String>) -> GraphResult<u32> {
        self.push(BlockKind::Name, encode_record(&NameBlockRecord { names })?)
    }

    pub fn add_global_node_block(&mut self, nodes: Vec<GlobalNodeRecord>) -> GraphResult<u32> {
        let record = GlobalNodeBlockRecord { nodes };
        self.push(BlockKind::GlobalNode, encode_record(&record)?)
    }

    pub fn add_rtree_block(&mut self, nodes: Vec<RTreeNodeRecord>) -> GraphResult<u32> {
        let record = RTreeNodeBlockRecord { nodes };
        self.push(BlockKind::RTreeNode, encode_record(&record)?)
    }

    /// Appends pre-encoded block bytes as they are, without validation.
    pub fn add_raw_block(&mut self, kind: BlockKind, bytes: Vec<u8>) -> GraphResult<u32> {
        self.push(kind, bytes)
    }

    fn push(&mut self, kind: BlockKind, bytes: Vec<u8>) -> GraphResult<u32> {
        let blocks = self.blocks_mut(kind);
        blocks.push(bytes);
        Ok((blocks.len() - 1) as u32)
    }

    fn blocks(&self, kind: BlockKind) -> &[Vec<u8>] {
        match kind {
            BlockKind::Node => &self.node_blocks,
            BlockKind::Geometry => &self.geometry_blocks,
            BlockKind::Name => &self.name_blocks,
            BlockKind::GlobalNode => &self.global_node_blocks,
            BlockKind::RTreeNode => &self.rtree_node_blocks,
        }
    }

    fn blocks_mut(&mut self, kind: BlockKind) -> &mut Vec<Vec<u8>> {
        match kind {
            BlockKind::Node => &mut self.node_blocks,
            BlockKind::Geometry => &mut self.geometry_blocks,
            BlockKind::Name => &mut self.name_blocks,
            BlockKind::GlobalNode => &mut self.global_node_blocks,
            BlockKind::RTreeNode => &mut self.rtree_node_blocks,
        }
    }

    /// Encodes the complete package file.
    pub fn to_bytes(&self) -> GraphResult<Vec<u8>> {
        let mut chunks: Vec<([u8; 4], Vec<u8>)> = Vec::with_capacity(6);
        chunks.push((META_CHUNK, encode_record(&self.meta)?));
        for kind in BlockKind::ALL {
            chunks.push((kind.chunk_tag(), self.encode_chunk(self.blocks(kind))?));
        }

        // the header is fixed-int encoded, so its size only depends on the chunk count
        let mut header = FileHeader {
            magic: MAGIC,
            version_major: self.version_major,
            version_minor: self.version_minor,
            chunks: chunks
                .iter()
                .map(|(tag, _)| ChunkEntry {
                    tag: *tag,
                    offset: 0,
                    length: 0,
                })
                .collect(),
        };
        let mut offset = encode_table(&header)?.len() as u64;
        for (entry, (_, data)) in header.chunks.iter_mut().zip(&chunks) {
            entry.offset = offset;
            entry.length = data.len() as u64;
            offset += entry.length;
        }

        let mut bytes = encode_table(&header)?;
        for (_, data) in chunks {
            bytes.extend(data);
        }
        debug!(
            "Encoded package {} '{}' ({} bytes)",
            self.meta.package_id,
            self.meta.package_name,
            bytes.len()
        );
        Ok(bytes)
    }

    fn encode_chunk(&self, blocks: &[Vec<u8>]) -> GraphResult<Vec<u8>> {
        let mut offsets = Vec::with_capacity(blocks.len() + 1);
        let mut end = 0u64;
        offsets.push(end);
        for block in blocks {
            end += block.len() as u64;
            offsets.push(end);
        }
        let mut chunk = encode_table(&offsets)?;
        for block in blocks {
            chunk.extend_from_slice(block);
        }
        Ok(chunk)
    }

    /// Writes the package file to `path`, replacing any existing file.
    pub fn write_to(&self, path: impl AsRef<Path>) -> GraphResult<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}
