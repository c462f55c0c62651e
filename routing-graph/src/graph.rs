//! The routing graph: package registry, block loading and node accessors.

use std::collections::{BTreeMap, HashMap};
use std::ffi::OsStr;
use std::fmt;
use std::io::{Read, Seek};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::block_cache::{BlockCaches, CachedBlock, GraphStats};
use crate::blocks::{Block, Edge, GeometryBlock, GlobalNodeBlock, NameBlock, Node, NodeBlock, RTreeNodeBlock};
use crate::constants::PACKAGE_EXTENSION;
use crate::container::ContainerReader;
use crate::decoder::{
    decode_geometry_block, decode_global_node_block, decode_name_block, decode_node_block,
    decode_rtree_node_block,
};
use crate::errors::{GraphError, GraphResult};
use crate::geometry::Point;
use crate::ids::{BlockId, GlobalNodeId, NodeId};
use crate::package::{select_packages, Package, PackageInfo};
use crate::settings::GraphSettings;

/// A read-only road graph paged in from package files.
///
/// Packages are imported once through `&mut self`; afterwards the graph is
/// shared between query threads. Queries lock the block caches only around each
/// individual cache lookup or insert, never across a whole traversal, and block
/// decoding runs outside the lock.
///
/// # Examples
///
/// ```rust,no_run
/// use routing_graph::{RoutingGraph, WgsPos};
///
/// let mut graph = RoutingGraph::default();
/// if graph.import("/var/lib/routing/packages") {
///     for nearest in graph.find_nearest_node(&WgsPos::new(59.437, 24.745))? {
///         let node = graph.get_node(nearest.node_id)?;
///         println!("{} at {}", graph.get_node_name(&node)?, nearest.node_pos);
///     }
/// }
/// # Ok::<(), routing_graph::GraphError>(())
/// ```
pub struct RoutingGraph {
    settings: GraphSettings,
    packages: Vec<Package>,
    package_index: HashMap<u32, usize>,
    caches: Mutex<BlockCaches>,
}

impl Default for RoutingGraph {
    fn default() -> Self {
        Self::new(GraphSettings::default())
    }
}

impl fmt::Debug for RoutingGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutingGraph")
            .field("settings", &self.settings)
            .field("packages", &self.packages.len())
            .finish()
    }
}

impl RoutingGraph {
    pub fn new(settings: GraphSettings) -> Self {
        let caches = BlockCaches::new(&settings);
        Self {
            settings,
            packages: Vec::new(),
            package_index: HashMap::new(),
            caches: Mutex::new(caches),
        }
    }

    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    // ==================== Import ====================

    /// Imports a single package file or every package file of a directory.
    ///
    /// Failures are logged and the offending package skipped. Returns `false`
    /// when nothing could be loaded.
    pub fn import(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let result = if path.is_dir() {
            self.import_directory(path).map(|loaded| loaded > 0)
        } else {
            self.import_file(path).map(|_| true)
        };
        result.unwrap_or_else(|e| {
            warn!("Failed to import '{}': {}", path.display(), e);
            false
        })
    }

    /// Imports one package from an already open stream.
    pub fn import_stream<R: Read + Seek + Send + 'static>(&mut self, reader: R) -> bool {
        match self.import_reader(reader) {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to import package stream: {}", e);
                false
            }
        }
    }

    /// Imports one package file and returns its package id.
    pub fn import_file(&mut self, path: impl AsRef<Path>) -> GraphResult<u32> {
        let container = ContainerReader::open(path)?;
        self.add_package(&container)
    }

    /// Imports one package from a stream and returns its package id.
    pub fn import_reader<R: Read + Seek + Send + 'static>(&mut self, reader: R) -> GraphResult<u32> {
        let container = ContainerReader::from_reader(reader)?;
        self.add_package(&container)
    }

    /// Imports the package files of a directory, applying the parent/child rule:
    /// a package `region` is skipped when a package `region-<anything>` exists.
    ///
    /// Returns the number of packages loaded.
    pub fn import_directory(&mut self, dir: impl AsRef<Path>) -> GraphResult<usize> {
        let dir = dir.as_ref();
        let mut files: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() || path.extension() != Some(OsStr::new(PACKAGE_EXTENSION)) {
                continue;
            }
            match path.file_stem().and_then(OsStr::to_str) {
                Some(name) => {
                    files.insert(name.to_string(), path.clone());
                }
                None => warn!("Ignoring package file with non UTF-8 name '{}'", path.display()),
            }
        }

        let (selected, skipped) = select_packages(files.keys().map(String::as_str));
        for (parent, child) in skipped {
            warn!("Skipping package '{}' as '{}' exists", parent, child);
        }

        let mut loaded = 0;
        for name in selected {
            let path = &files[name];
            info!("Loading package '{}' from {}", name, path.display());
            match self.import_file(path) {
                Ok(_) => loaded += 1,
                Err(e) => warn!("Failed to load package '{}': {}", name, e),
            }
        }
        info!("Loaded {} package(s) from {}", loaded, dir.display());
        Ok(loaded)
    }

    fn add_package(&mut self, container: &Arc<ContainerReader>) -> GraphResult<u32> {
        let package = Package::open(container)?;
        let package_id = package.package_id();
        if self.package_index.contains_key(&package_id) {
            return Err(GraphError::DuplicatePackage {
                package_id,
                name: package.package_name().to_string(),
            });
        }

        info!(
            "Imported package {} '{}' {}",
            package_id,
            package.package_name(),
            package.bbox()
        );
        self.package_index.insert(package_id, self.packages.len());
        self.packages.push(package);
        Ok(package_id)
    }

    // ==================== Registry ====================

    /// Loaded packages in import order.
    pub fn packages(&self) -> Vec<PackageInfo> {
        self.packages.iter().map(Package::info).collect()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub(crate) fn package_list(&self) -> &[Package] {
        &self.packages
    }

    fn package(&self, package_id: u32) -> GraphResult<&Package> {
        self.package_index
            .get(&package_id)
            .map(|index| &self.packages[*index])
            .ok_or(GraphError::UnknownPackage(package_id))
    }

    /// Hit, miss and size counters of the five block caches.
    pub fn stats(&self) -> GraphStats {
        self.caches.lock().stats()
    }

    // ==================== Block loading ====================

    /// Returns the cached block or reads and decodes it. The cache lock is held
    /// only for the lookup and the insert.
    fn load_block<B, F>(&self, block_id: BlockId, decode: F) -> GraphResult<Arc<B>>
    where
        B: CachedBlock,
        F: FnOnce(&[u8]) -> GraphResult<B>,
    {
        let cached = self.caches.lock().cache::<B>().get(block_id);
        if let Some(block) = cached {
            return Ok(block);
        }

        let package = self.package(block_id.package_id())?;
        let bytes = package.chunk(B::KIND).read_block(block_id.block_index())?;
        debug!("Decoding {} block {} ({} bytes)", B::KIND, block_id, bytes.len());
        let block = Arc::new(decode(&bytes)?);
        Ok(self.caches.lock().cache::<B>().insert(block_id, block))
    }

    pub(crate) fn load_node_block(&self, block_id: BlockId) -> GraphResult<Arc<NodeBlock>> {
        self.load_block(block_id, |bytes| {
            decode_node_block(block_id, bytes)?.link(|global| self.resolve_global_node_id(global))
        })
    }

    pub(crate) fn load_geometry_block(&self, block_id: BlockId) -> GraphResult<Arc<GeometryBlock>> {
        self.load_block(block_id, |bytes| decode_geometry_block(block_id, bytes))
    }

    pub(crate) fn load_name_block(&self, block_id: BlockId) -> GraphResult<Arc<NameBlock>> {
        self.load_block(block_id, |bytes| decode_name_block(block_id, bytes))
    }

    pub(crate) fn load_global_node_block(
        &self,
        block_id: BlockId,
    ) -> GraphResult<Arc<GlobalNodeBlock>> {
        self.load_block(block_id, |bytes| decode_global_node_block(block_id, bytes))
    }

    pub(crate) fn load_rtree_node_block(
        &self,
        block_id: BlockId,
    ) -> GraphResult<Arc<RTreeNodeBlock>> {
        self.load_block(block_id, |bytes| decode_rtree_node_block(block_id, bytes))
    }

    // ==================== Accessors ====================

    /// Returns a handle to a node. The handle keeps the node's block alive
    /// after it is evicted from the cache.
    pub fn get_node(&self, node_id: NodeId) -> GraphResult<NodePtr> {
        let block = self.load_node_block(node_id.block_id())?;
        block.element(node_id)?;
        Ok(NodePtr { block, node_id })
    }

    /// Street name of a node, empty when the node has none.
    pub fn get_node_name(&self, node: &Node) -> GraphResult<String> {
        let Some(name_id) = node.node_data.name_id else {
            return Ok(String::new());
        };
        let block = self.load_name_block(name_id.block_id())?;
        block.element(name_id).cloned()
    }

    /// Geometry of a node in travel direction, empty when the node has none.
    pub fn get_node_geometry(&self, node: &Node) -> GraphResult<Vec<Point>> {
        let Some(geometry_id) = node.node_data.geometry_id else {
            return Ok(Vec::new());
        };
        let block = self.load_geometry_block(geometry_id.block_id())?;
        let mut points = block.element(geometry_id)?.clone();
        if node.node_data.geometry_reversed {
            points.reverse();
        }
        Ok(points)
    }

    /// Maps a global node table entry to the node it stands for.
    pub fn resolve_global_node_id(&self, global_node_id: GlobalNodeId) -> GraphResult<NodeId> {
        let block = self.load_global_node_block(global_node_id.block_id())?;
        block.element(global_node_id).copied()
    }
}

/// Shared handle to one node of a decoded [`NodeBlock`].
///
/// Dereferences to the [`Node`]. Holding a `NodePtr` keeps the whole block,
/// including the node's edges, alive regardless of cache eviction.
#[derive(Clone)]
pub struct NodePtr {
    block: Arc<NodeBlock>,
    node_id: NodeId,
}

impl NodePtr {
    pub fn node_id(&self) -> NodeId {
        self.node_id
    }

    /// Outgoing edges of the node.
    pub fn edges(&self) -> &[Edge] {
        self.block.node_edges(self.node())
    }

    pub fn block(&self) -> &Arc<NodeBlock> {
        &self.block
    }

    fn node(&self) -> &Node {
        // the index was checked when the handle was created
        &self.block.nodes()[self.node_id.element_index() as usize]
    }
}

impl Deref for NodePtr {
    type Target = Node;

    fn deref(&self) -> &Node {
        self.node()
    }
}

impl fmt::Debug for NodePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodePtr")
            .field("node_id", &self.node_id)
            .field("node", self.node())
            .finish()
    }
}
