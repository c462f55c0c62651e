use crate::constants::{
    DEFAULT_GEOMETRY_BLOCK_CACHE_SIZE, DEFAULT_GLOBAL_NODE_BLOCK_CACHE_SIZE,
    DEFAULT_NAME_BLOCK_CACHE_SIZE, DEFAULT_NODE_BLOCK_CACHE_SIZE,
    DEFAULT_RTREE_NODE_BLOCK_CACHE_SIZE,
};

/// Tuning parameters of a [`RoutingGraph`](crate::RoutingGraph).
///
/// Cache capacities are counted in decoded blocks, one capacity per block kind.
/// Node and geometry blocks are touched by every query and get the largest
/// caches; names, global node tables and R-tree fragments are read far less often.
///
/// # Examples
///
/// ```rust
/// use routing_graph::GraphSettings;
///
/// let settings = GraphSettings::builder()
///     .node_block_cache_size(1024)
///     .nearest_search_radius(50.0)
///     .build();
/// assert_eq!(settings.node_block_cache_size(), 1024);
/// assert_eq!(settings.name_block_cache_size(), 1024);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSettings {
    node_block_cache_size: usize,
    geometry_block_cache_size: usize,
    name_block_cache_size: usize,
    global_node_block_cache_size: usize,
    rtree_node_block_cache_size: usize,
    nearest_search_radius: f64,
    max_search_steps: Option<usize>,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            node_block_cache_size: DEFAULT_NODE_BLOCK_CACHE_SIZE,
            geometry_block_cache_size: DEFAULT_GEOMETRY_BLOCK_CACHE_SIZE,
            name_block_cache_size: DEFAULT_NAME_BLOCK_CACHE_SIZE,
            global_node_block_cache_size: DEFAULT_GLOBAL_NODE_BLOCK_CACHE_SIZE,
            rtree_node_block_cache_size: DEFAULT_RTREE_NODE_BLOCK_CACHE_SIZE,
            nearest_search_radius: 0.0,
            max_search_steps: None,
        }
    }
}

impl GraphSettings {
    #[inline]
    pub fn builder() -> GraphSettingsBuilder {
        GraphSettingsBuilder::new()
    }

    #[inline]
    pub fn node_block_cache_size(&self) -> usize {
        self.node_block_cache_size
    }

    #[inline]
    pub fn geometry_block_cache_size(&self) -> usize {
        self.geometry_block_cache_size
    }

    #[inline]
    pub fn name_block_cache_size(&self) -> usize {
        self.name_block_cache_size
    }

    #[inline]
    pub fn global_node_block_cache_size(&self) -> usize {
        self.global_node_block_cache_size
    }

    #[inline]
    pub fn rtree_node_block_cache_size(&self) -> usize {
        self.rtree_node_block_cache_size
    }

    /// Distance in meters a package's bounding box may be from the query
    /// position and still be searched. `0.0` means the box must cover the position.
    #[inline]
    pub fn nearest_search_radius(&self) -> f64 {
        self.nearest_search_radius
    }

    /// Maximum number of R-tree nodes expanded plus node blocks scanned by one
    /// nearest-node query. `None` means unlimited.
    #[inline]
    pub fn max_search_steps(&self) -> Option<usize> {
        self.max_search_steps
    }
}

/// Builder for [`GraphSettings`].
///
/// Capacities below one block are raised to one; a cache must at least hold
/// the block it is returning.
#[derive(Debug, Clone, Default)]
pub struct GraphSettingsBuilder {
    settings: GraphSettings,
}

impl GraphSettingsBuilder {
    #[inline]
    pub fn new() -> GraphSettingsBuilder {
        GraphSettingsBuilder {
            settings: GraphSettings::default(),
        }
    }

    /// Small caches for memory constrained hosts and tests.
    pub fn low_memory_preset(self) -> Self {
        self.node_block_cache_size(256)
            .geometry_block_cache_size(256)
            .name_block_cache_size(32)
            .global_node_block_cache_size(32)
            .rtree_node_block_cache_size(16)
    }

    #[inline]
    pub fn node_block_cache_size(mut self, size: usize) -> Self {
        self.settings.node_block_cache_size = size.max(1);
        self
    }

    #[inline]
    pub fn geometry_block_cache_size(mut self, size: usize) -> Self {
        self.settings.geometry_block_cache_size = size.max(1);
        self
    }

    #[inline]
    pub fn name_block_cache_size(mut self, size: usize) -> Self {
        self.settings.name_block_cache_size = size.max(1);
        self
    }

    #[inline]
    pub fn global_node_block_cache_size(mut self, size: usize) -> Self {
        self.settings.global_node_block_cache_size = size.max(1);
        self
    }

    #[inline]
    pub fn rtree_node_block_cache_size(mut self, size: usize) -> Self {
        self.settings.rtree_node_block_cache_size = size.max(1);
        self
    }

    /// Sets every cache capacity at once.
    pub fn cache_size(self, size: usize) -> Self {
        self.node_block_cache_size(size)
            .geometry_block_cache_size(size)
            .name_block_cache_size(size)
            .global_node_block_cache_size(size)
            .rtree_node_block_cache_size(size)
    }

    /// Negative and non-finite radii are treated as `0.0`.
    #[inline]
    pub fn nearest_search_radius(mut self, meters: f64) -> Self {
        self.settings.nearest_search_radius = if meters.is_finite() { meters.max(0.0) } else { 0.0 };
        self
    }

    /// Caps R-tree node expansions plus node block scans per query. Zero is raised to 1.
    #[inline]
    pub fn max_search_steps(mut self, steps: usize) -> Self {
        self.settings.max_search_steps = Some(steps.max(1));
        self
    }

    #[inline]
    pub fn build(self) -> GraphSettings {
        self.settings
    }
}
