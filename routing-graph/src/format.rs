//! On-disk records of the package container.
//!
//! A package file is laid out as:
//!
//! ```text
//! +--------------------------------------------------------------+
//! | FileHeader (fixed-int): magic, version, chunk directory      |
//! +--------------------------------------------------------------+
//! | chunk "meta": PackageMeta                                    |
//! | chunk "node" / "geom" / "name" / "glnd" / "rtre":            |
//! |   Vec<u64> block offsets (fixed-int), then block payloads    |
//! +--------------------------------------------------------------+
//! ```
//!
//! Block payloads use bincode's varint encoding so that the zig-zag geometry
//! deltas and intra-package indices stay compact. References inside a block
//! never name their own package; the decoder supplies it.

use bincode::config::Config;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::bounding_box::BoundingBox;
use crate::constants::{MAGIC, MAX_RECORD_BYTES, VERSION_MAJOR};
use crate::errors::{GraphError, GraphResult};

/// File header stored at the beginning of every package file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHeader {
    pub magic: [u8; 4],
    pub version_major: u16,
    pub version_minor: u16,
    pub chunks: Vec<ChunkEntry>,
}

impl FileHeader {
    pub fn validate(&self) -> GraphResult<()> {
        if self.magic != MAGIC {
            return Err(GraphError::BadMagic(self.magic));
        }
        if self.version_major != VERSION_MAJOR {
            return Err(GraphError::UnsupportedVersion {
                major: self.version_major,
                minor: self.version_minor,
                supported: VERSION_MAJOR,
            });
        }
        Ok(())
    }

    pub fn chunk(&self, tag: [u8; 4]) -> GraphResult<&ChunkEntry> {
        self.chunks
            .iter()
            .find(|entry| entry.tag == tag)
            .ok_or_else(|| GraphError::MissingChunk(tag_name(tag)))
    }
}

/// Location of one named chunk inside the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkEntry {
    pub tag: [u8; 4],
    pub offset: u64,
    pub length: u64,
}

/// Package metadata stored in the `meta` chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageMeta {
    pub package_id: u32,
    pub package_name: String,
    pub bbox: BoundingBox,
    pub rtree_root: ElementRef,
}

/// An element of a block in the same package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    pub block_index: u32,
    pub element_index: u32,
}

impl ElementRef {
    pub const fn new(block_index: u32, element_index: u32) -> Self {
        Self {
            block_index,
            element_index,
        }
    }
}

/// A node reference stored in an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRef {
    /// A node block element of the same package
    Local(ElementRef),
    /// An entry of the package's global node table, which may point into another package
    Global(ElementRef),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub first_edge: u32,
    pub edge_count: u32,
    pub geometry: Option<ElementRef>,
    pub geometry_reversed: bool,
    pub name: Option<ElementRef>,
    pub weight: u32,
    pub travel_mode: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub target: NodeRef,
    pub contracted_node: Option<NodeRef>,
    pub forward: bool,
    pub backward: bool,
    pub weight: u32,
    pub turn_instruction: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeBlockRecord {
    pub nodes: Vec<NodeRecord>,
    pub edges: Vec<EdgeRecord>,
}

/// Geometries as zig-zag `[lat, lon]` deltas
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryBlockRecord {
    pub geometries: Vec<Vec<[u32; 2]>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NameBlockRecord {
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalNodeRecord {
    pub package_id: u32,
    pub block_index: u32,
    pub element_index: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalNodeBlockRecord {
    pub nodes: Vec<GlobalNodeRecord>,
}

/// Either `children` or `node_blocks` is populated, never both
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RTreeNodeRecord {
    pub children: Vec<(BoundingBox, ElementRef)>,
    pub node_blocks: Vec<(BoundingBox, u32)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RTreeNodeBlockRecord {
    pub nodes: Vec<RTreeNodeRecord>,
}

pub(crate) fn tag_name(tag: [u8; 4]) -> String {
    String::from_utf8_lossy(&tag).into_owned()
}

/// Fixed-int encoding for the header and chunk offset tables.
pub(crate) fn table_config() -> impl Config {
    bincode::config::legacy().with_limit::<MAX_RECORD_BYTES>()
}

/// Varint encoding for block payloads and metadata.
pub(crate) fn record_config() -> impl Config {
    bincode::config::standard().with_limit::<MAX_RECORD_BYTES>()
}

pub(crate) fn encode_record<T: Serialize>(record: &T) -> GraphResult<Vec<u8>> {
    bincode::serde::encode_to_vec(record, record_config())
        .map_err(|e| GraphError::Serialization(e.to_string()))
}

/// Decodes one record that must span the whole slice.
pub(crate) fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    let (record, consumed) =
        bincode::serde::decode_from_slice::<T, _>(bytes, record_config()).map_err(|e| e.to_string())?;
    if consumed != bytes.len() {
        return Err(format!(
            "{} trailing bytes after record",
            bytes.len() - consumed
        ));
    }
    Ok(record)
}

pub(crate) fn encode_table<T: Serialize>(table: &T) -> GraphResult<Vec<u8>> {
    bincode::serde::encode_to_vec(table, table_config())
        .map_err(|e| GraphError::Serialization(e.to_string()))
}
