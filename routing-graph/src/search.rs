//! Nearest routable point search over the R-tree forest.
//!
//! Best-first branch and bound: R-tree nodes, node blocks and candidate
//! points share one priority queue ordered by distance to the query. R-tree
//! nodes and node blocks are keyed by the lower bound of their bounding box,
//! candidates by their exact distance. The first candidate popped is
//! therefore the nearest one; popping continues only to collect ties.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use log::{trace, warn};

use crate::blocks::{Block, RTreeNode};
use crate::constants::TIE_DISTANCE_METERS;
use crate::errors::GraphResult;
use crate::geometry::{Metric, Point, WgsPos};
use crate::graph::RoutingGraph;
use crate::ids::{BlockId, NodeId, RTreeNodeId};

/// A point on the geometry of a node closest to a query position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestNode {
    /// The closest point itself
    pub node_pos: WgsPos,
    pub node_id: NodeId,
    /// Index of the geometry segment `node_pos` lies on
    pub geometry_segment_index: u32,
    /// Relative position of `node_pos` along that segment, in `[0, 1]`
    pub geometry_rel_pos: f64,
    /// Distance from the query position in meters
    pub distance: f64,
}

#[derive(Debug)]
enum SearchItem {
    RTreeNode(RTreeNodeId),
    NodeBlock(BlockId),
    Candidate(NearestNode),
}

#[derive(Debug)]
struct SearchNode {
    distance: f64,
    sequence: usize,
    item: SearchItem,
}

impl PartialEq for SearchNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SearchNode {}

impl PartialOrd for SearchNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SearchNode {
    // reversed: BinaryHeap pops the smallest distance first, oldest entry on ties
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct SearchQueue {
    heap: BinaryHeap<SearchNode>,
    sequence: usize,
}

impl SearchQueue {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            sequence: 0,
        }
    }

    fn push(&mut self, distance: f64, item: SearchItem) {
        self.sequence += 1;
        self.heap.push(SearchNode {
            distance,
            sequence: self.sequence,
            item,
        });
    }

    fn pop(&mut self) -> Option<SearchNode> {
        self.heap.pop()
    }

    fn into_candidates(self) -> impl Iterator<Item = NearestNode> {
        self.heap.into_iter().filter_map(|node| match node.item {
            SearchItem::Candidate(candidate) => Some(candidate),
            _ => None,
        })
    }
}

impl RoutingGraph {
    /// Finds the routable points nearest to `pos`.
    ///
    /// Returns the nearest point plus every other point at the same distance,
    /// ordered by node id. An invalid position or one outside every
    /// package yields an empty result.
    pub fn find_nearest_node(&self, pos: &WgsPos) -> GraphResult<Vec<NearestNode>> {
        if !pos.is_valid() {
            return Ok(Vec::new());
        }
        let metric = Metric::around(pos);
        let radius = self.settings().nearest_search_radius();

        let mut queue = SearchQueue::new();
        for package in self.package_list() {
            let Some(root) = package.rtree_root() else {
                continue;
            };
            let distance = metric.bbox_distance(pos, package.bbox());
            if distance <= radius {
                queue.push(distance, SearchItem::RTreeNode(root));
            }
        }

        let max_steps = self.settings().max_search_steps();
        let mut steps = 0usize;
        let mut scanned_blocks = HashSet::new();
        let mut results: Vec<NearestNode> = Vec::new();

        while let Some(entry) = queue.pop() {
            if let Some(best) = results.first() {
                if entry.distance > best.distance + TIE_DISTANCE_METERS {
                    break;
                }
            }

            match entry.item {
                SearchItem::Candidate(candidate) => results.push(candidate),
                SearchItem::RTreeNode(rtree_node_id) => {
                    if !Self::take_step(&mut steps, max_steps) {
                        warn!("Nearest node search for {} stopped after {} steps", pos, steps);
                        results.extend(queue.into_candidates());
                        return Ok(nearest_of(results));
                    }
                    trace!("Expanding r-tree node {:?} at {:.3} m", rtree_node_id, entry.distance);
                    self.expand_rtree_node(&metric, pos, rtree_node_id, &mut queue)?;
                }
                SearchItem::NodeBlock(block_id) => {
                    if !scanned_blocks.insert(block_id) {
                        continue;
                    }
                    if !Self::take_step(&mut steps, max_steps) {
                        warn!("Nearest node search for {} stopped after {} steps", pos, steps);
                        results.extend(queue.into_candidates());
                        return Ok(nearest_of(results));
                    }
                    trace!("Scanning node block {} at {:.3} m", block_id, entry.distance);
                    self.scan_node_block(&metric, pos, block_id, &mut queue)?;
                }
            }
        }

        Ok(nearest_of(results))
    }

    fn take_step(steps: &mut usize, max_steps: Option<usize>) -> bool {
        if max_steps.is_some_and(|max| *steps >= max) {
            return false;
        }
        *steps += 1;
        true
    }

    fn expand_rtree_node(
        &self,
        metric: &Metric,
        pos: &WgsPos,
        rtree_node_id: RTreeNodeId,
        queue: &mut SearchQueue,
    ) -> GraphResult<()> {
        let block = self.load_rtree_node_block(rtree_node_id.block_id())?;
        match block.element(rtree_node_id)? {
            RTreeNode::Interior(children) => {
                for (bbox, child) in children {
                    queue.push(metric.bbox_distance(pos, bbox), SearchItem::RTreeNode(*child));
                }
            }
            RTreeNode::Leaf(node_blocks) => {
                for (bbox, block_id) in node_blocks {
                    queue.push(metric.bbox_distance(pos, bbox), SearchItem::NodeBlock(*block_id));
                }
            }
        }
        Ok(())
    }

    fn scan_node_block(
        &self,
        metric: &Metric,
        pos: &WgsPos,
        block_id: BlockId,
        queue: &mut SearchQueue,
    ) -> GraphResult<()> {
        let block = self.load_node_block(block_id)?;
        for (index, node) in block.nodes().iter().enumerate() {
            let geometry = self.get_node_geometry(node)?;
            let Some(closest) = closest_geometry_point(metric, pos, &geometry) else {
                continue;
            };
            let candidate = NearestNode {
                node_pos: closest.pos,
                node_id: NodeId::new(block_id, index as u32),
                geometry_segment_index: closest.segment_index,
                geometry_rel_pos: closest.rel_pos,
                distance: closest.distance,
            };
            queue.push(candidate.distance, SearchItem::Candidate(candidate));
        }
        Ok(())
    }
}

struct GeometryPoint {
    pos: WgsPos,
    segment_index: u32,
    rel_pos: f64,
    distance: f64,
}

/// Closest point of a point sequence to `pos`. A single point is its own
/// segment 0; an empty sequence has no closest point.
fn closest_geometry_point(metric: &Metric, pos: &WgsPos, points: &[Point]) -> Option<GeometryPoint> {
    match points {
        [] => None,
        [point] => {
            let point = point.to_wgs();
            Some(GeometryPoint {
                pos: point,
                segment_index: 0,
                rel_pos: 0.0,
                distance: metric.point_distance(pos, &point),
            })
        }
        _ => points
            .windows(2)
            .enumerate()
            .map(|(index, segment)| {
                let (closest, rel_pos) =
                    metric.closest_segment_point(pos, &segment[0].to_wgs(), &segment[1].to_wgs());
                GeometryPoint {
                    pos: closest,
                    segment_index: index as u32,
                    rel_pos,
                    distance: metric.point_distance(pos, &closest),
                }
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance)),
    }
}

/// Keeps the nearest candidate and its ties, ordered by node id.
fn nearest_of(mut candidates: Vec<NearestNode>) -> Vec<NearestNode> {
    let Some(best) = candidates
        .iter()
        .map(|c| c.distance)
        .min_by(|a, b| a.total_cmp(b))
    else {
        return candidates;
    };
    candidates.retain(|c| c.distance <= best + TIE_DISTANCE_METERS);
    candidates.sort_by(|a, b| a.node_id.cmp(&b.node_id));
    candidates
}
