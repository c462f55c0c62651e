//! LRU caches of decoded blocks.
//!
//! There is one cache per block kind, each keyed by [`BlockId`] and holding
//! `Arc` handles. Evicting an entry only drops the cache's reference; callers
//! holding a handle keep the block alive. All five caches live in a single
//! [`BlockCaches`] value that the graph guards with one lock.

use std::num::NonZeroUsize;
use std::sync::Arc;

use log::debug;
use lru::LruCache;

use crate::blocks::{
    Block, BlockKind, GeometryBlock, GlobalNodeBlock, NameBlock, NodeBlock, RTreeNodeBlock,
};
use crate::ids::BlockId;
use crate::settings::GraphSettings;

/// Counters of one block cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub kind: BlockKind,
    pub len: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Fraction of lookups served from the cache, `0.0` before the first lookup.
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Counters of all five block caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphStats {
    pub node_blocks: CacheStats,
    pub geometry_blocks: CacheStats,
    pub name_blocks: CacheStats,
    pub global_node_blocks: CacheStats,
    pub rtree_node_blocks: CacheStats,
}

impl GraphStats {
    pub fn iter(&self) -> impl Iterator<Item = &CacheStats> {
        [
            &self.node_blocks,
            &self.geometry_blocks,
            &self.name_blocks,
            &self.global_node_blocks,
            &self.rtree_node_blocks,
        ]
        .into_iter()
    }
}

/// LRU cache for one block kind
pub(crate) struct BlockCache<B: Block> {
    entries: LruCache<BlockId, Arc<B>>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl<B: Block> BlockCache<B> {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Looks up a block, promoting it to most recently used.
    pub(crate) fn get(&mut self, block_id: BlockId) -> Option<Arc<B>> {
        match self.entries.get(&block_id) {
            Some(block) => {
                self.hits += 1;
                Some(Arc::clone(block))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts a freshly decoded block, evicting the least recently used one
    /// when full. If another thread inserted the same block in the meantime,
    /// that copy is kept and returned so every caller shares one instance.
    pub(crate) fn insert(&mut self, block_id: BlockId, block: Arc<B>) -> Arc<B> {
        if let Some(existing) = self.entries.get(&block_id) {
            return Arc::clone(existing);
        }
        if let Some((evicted_id, _)) = self.entries.push(block_id, Arc::clone(&block)) {
            self.evictions += 1;
            debug!("Evicted {} block {} from cache", B::KIND, evicted_id);
        }
        block
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, block_id: BlockId) -> bool {
        self.entries.contains(&block_id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            kind: B::KIND,
            len: self.len(),
            capacity: self.capacity(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }
}

/// The five block caches of a graph.
pub(crate) struct BlockCaches {
    node_blocks: BlockCache<NodeBlock>,
    geometry_blocks: BlockCache<GeometryBlock>,
    name_blocks: BlockCache<NameBlock>,
    global_node_blocks: BlockCache<GlobalNodeBlock>,
    rtree_node_blocks: BlockCache<RTreeNodeBlock>,
}

impl BlockCaches {
    pub(crate) fn new(settings: &GraphSettings) -> Self {
        Self {
            node_blocks: BlockCache::new(settings.node_block_cache_size()),
            geometry_blocks: BlockCache::new(settings.geometry_block_cache_size()),
            name_blocks: BlockCache::new(settings.name_block_cache_size()),
            global_node_blocks: BlockCache::new(settings.global_node_block_cache_size()),
            rtree_node_blocks: BlockCache::new(settings.rtree_node_block_cache_size()),
        }
    }

    pub(crate) fn cache<B: CachedBlock>(&mut self) -> &mut BlockCache<B> {
        B::cache(self)
    }

    pub(crate) fn stats(&self) -> GraphStats {
        GraphStats {
            node_blocks: self.node_blocks.stats(),
            geometry_blocks: self.geometry_blocks.stats(),
            name_blocks: self.name_blocks.stats(),
            global_node_blocks: self.global_node_blocks.stats(),
            rtree_node_blocks: self.rtree_node_blocks.stats(),
        }
    }
}

/// Selects the cache a block kind is stored in.
pub(crate) trait CachedBlock: Block {
    fn cache(caches: &mut BlockCaches) -> &mut BlockCache<Self>;
}

impl CachedBlock for NodeBlock {
    fn cache(caches: &mut BlockCaches) -> &mut BlockCache<Self> {
        &mut caches.node_blocks
    }
}

impl CachedBlock for GeometryBlock {
    fn cache(caches: &mut BlockCaches) -> &mut BlockCache<Self> {
        &mut caches.geometry_blocks
    }
}

impl CachedBlock for NameBlock {
    fn cache(caches: &mut BlockCaches) -> &mut BlockCache<Self> {
        &mut caches.name_blocks
    }
}

impl CachedBlock for GlobalNodeBlock {
    fn cache(caches: &mut BlockCaches) -> &mut BlockCache<Self> {
        &mut caches.global_node_blocks
    }
}

impl CachedBlock for RTreeNodeBlock {
    fn cache(caches: &mut BlockCaches) -> &mut BlockCache<Self> {
        &mut caches.rtree_node_blocks
    }
}
