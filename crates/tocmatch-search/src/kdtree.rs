//! Immutable k-d tree over embedded tracklists.
//!
//! The tree is built once from a batch of points and never modified. Nodes
//! live in a flat arena and refer to their children by index; leaves refer
//! to a contiguous range of the reordered point array. Distances are
//! squared Euclidean throughout.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tocmatch_core::{Point, DIMENSIONS};

use crate::error::{Result, SearchError};

/// Maximum number of points stored in a leaf.
pub const LEAF_SIZE: usize = 8;

/// A query hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Neighbor {
    pub id: u64,
    pub squared_distance: u64,
}

/// Maps a point's position in the tree to its catalog id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalIdTable {
    ids: Vec<u64>,
}

impl ExternalIdTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.ids.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.iter().copied()
    }
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Leaf {
        start: usize,
        end: usize,
    },
    Branch {
        dim: usize,
        split: u64,
        left: usize,
        right: usize,
    },
}

/// A fully built, read-only k-d tree.
#[derive(Debug)]
pub struct SpatialIndex {
    points: Vec<Point>,
    ids: ExternalIdTable,
    nodes: Vec<Node>,
    root: usize,
    depth: usize,
}

impl SpatialIndex {
    /// Build a tree from parallel point and id arrays.
    pub fn build(points: Vec<Point>, ids: Vec<u64>) -> Result<Self> {
        if points.len() != ids.len() {
            return Err(SearchError::LengthMismatch {
                points: points.len(),
                ids: ids.len(),
            });
        }
        if points.is_empty() {
            return Err(SearchError::EmptyBatch);
        }
        check_unique(&ids)?;

        let mut entries: Vec<(Point, u64)> = points.into_iter().zip(ids).collect();
        let mut nodes = Vec::with_capacity(2 * entries.len() / LEAF_SIZE + 1);
        let mut depth = 0;
        let root = build_node(&mut entries, 0, 0, &mut nodes, &mut depth);

        let (points, ids): (Vec<Point>, Vec<u64>) = entries.into_iter().unzip();
        log::debug!(
            "Built k-d tree: {} points, {} nodes, depth {}",
            points.len(),
            nodes.len(),
            depth
        );

        Ok(Self {
            points,
            ids: ExternalIdTable { ids },
            nodes,
            root,
            depth,
        })
    }

    /// Number of indexed points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always `false`: empty batches are rejected at build time.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Depth of the deepest leaf (the root is depth 0).
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    #[must_use]
    pub const fn ids(&self) -> &ExternalIdTable {
        &self.ids
    }

    /// The `k` nearest points to `query`, closest first.
    ///
    /// Equal distances are ordered by ascending id.
    #[must_use]
    pub fn query(&self, query: &Point, k: usize) -> Vec<Neighbor> {
        if k == 0 {
            return Vec::new();
        }

        let mut heap = BinaryHeap::with_capacity(k.saturating_add(1));
        self.search(self.root, query, k, &mut heap);

        heap.into_sorted_vec()
            .into_iter()
            .map(|entry| Neighbor {
                id: entry.id,
                squared_distance: entry.squared_distance,
            })
            .collect()
    }

    fn search(&self, node: usize, query: &Point, k: usize, heap: &mut BinaryHeap<HeapEntry>) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for position in start..end {
                    let candidate = HeapEntry {
                        squared_distance: query.squared_distance(&self.points[position]),
                        id: self.ids.ids[position],
                    };
                    offer(heap, k, candidate);
                }
            }
            Node::Branch {
                dim,
                split,
                left,
                right,
            } => {
                let (near, far) = if query[dim] < split {
                    (left, right)
                } else {
                    (right, left)
                };
                self.search(near, query, k, heap);

                // Every point on the far side is at least `gap` away along
                // `dim`. Ties must still be visited for the id tie-break.
                let gap = query[dim].abs_diff(split);
                let bound = gap.saturating_mul(gap);
                let visit_far = heap.len() < k
                    || heap
                        .peek()
                        .is_some_and(|worst| bound <= worst.squared_distance);
                if visit_far {
                    self.search(far, query, k, heap);
                }
            }
        }
    }
}

/// Heap entry ordered by `(squared_distance, id)`; the heap's top is the
/// current worst kept candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    squared_distance: u64,
    id: u64,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.squared_distance
            .cmp(&other.squared_distance)
            .then(self.id.cmp(&other.id))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn offer(heap: &mut BinaryHeap<HeapEntry>, k: usize, candidate: HeapEntry) {
    if heap.len() < k {
        heap.push(candidate);
    } else if heap.peek().is_some_and(|worst| candidate < *worst) {
        heap.pop();
        heap.push(candidate);
    }
}

/// Recursively partition `entries` around the median of the depth's
/// dimension. Returns the arena index of the subtree root.
fn build_node(
    entries: &mut [(Point, u64)],
    offset: usize,
    depth: usize,
    nodes: &mut Vec<Node>,
    max_depth: &mut usize,
) -> usize {
    *max_depth = (*max_depth).max(depth);

    if entries.len() <= LEAF_SIZE {
        nodes.push(Node::Leaf {
            start: offset,
            end: offset + entries.len(),
        });
        return nodes.len() - 1;
    }

    let dim = depth % DIMENSIONS;
    let mid = entries.len() / 2;
    entries.select_nth_unstable_by_key(mid, |(point, _)| point[dim]);
    let split = entries[mid].0[dim];

    let slot = nodes.len();
    nodes.push(Node::Leaf { start: 0, end: 0 });

    let (lower, upper) = entries.split_at_mut(mid);
    let left = build_node(lower, offset, depth + 1, nodes, max_depth);
    let right = build_node(upper, offset + mid, depth + 1, nodes, max_depth);

    nodes[slot] = Node::Branch {
        dim,
        split,
        left,
        right,
    };
    slot
}

fn check_unique(ids: &[u64]) -> Result<()> {
    let mut sorted = ids.to_vec();
    sorted.sort_unstable();
    match sorted.windows(2).find(|pair| pair[0] == pair[1]) {
        Some(pair) => Err(SearchError::DuplicateId(pair[0])),
        None => Ok(()),
    }
}
