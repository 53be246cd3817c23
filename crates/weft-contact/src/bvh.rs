//! Bounding volume hierarchy broad phase.
//!
//! One binary tree per element class, built top-down by splitting at the
//! median centroid along the longest axis of the centroid bounds, with one
//! element per leaf. Between rebuilds:
//!
//! - `update` refits the element's leaf and every ancestor;
//! - `insert` parks the element in a pending list that queries scan linearly;
//! - `remove` tombstones the leaf.
//!
//! The tree is rebuilt once pending inserts plus tombstones exceed
//! [`REBUILD_FRACTION`] of the tree size (and at the end of every full
//! rebuild of the broad phase).

use std::collections::HashMap;

use weft_math::Aabb;

use crate::broad::{BroadPhase, ElementClass};
use crate::geometry::MeshQuery;

/// Pending + tombstoned elements, relative to tree size, that trigger a rebuild.
pub const REBUILD_FRACTION: f64 = 0.25;

/// Below this many stale elements the tree is never rebuilt eagerly.
const MIN_STALE_FOR_REBUILD: usize = 16;

const NO_PARENT: u32 = u32::MAX;

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf { id: u32, live: bool },
    Internal { left: u32, right: u32 },
}

#[derive(Debug, Clone, Copy)]
struct Node {
    aabb: Aabb,
    parent: u32,
    kind: NodeKind,
}

/// Tree plus side tables for one element class.
#[derive(Debug, Clone, Default)]
struct Hierarchy {
    nodes: Vec<Node>,
    root: Option<u32>,
    /// Live boxes of every registered element (tree and pending).
    boxes: HashMap<u32, Aabb>,
    /// Element id → leaf node, for elements in the tree.
    leaf_of: HashMap<u32, u32>,
    /// Elements inserted since the last build.
    pending: Vec<u32>,
    tombstones: usize,
}

impl Hierarchy {
    fn clear(&mut self) {
        *self = Self::default();
    }

    fn insert(&mut self, id: u32, aabb: Aabb, deferred: bool) {
        self.boxes.insert(id, aabb);
        self.pending.push(id);
        if !deferred {
            self.maybe_rebuild();
        }
    }

    fn update(&mut self, id: u32, aabb: Aabb, deferred: bool) {
        if !self.boxes.contains_key(&id) {
            self.insert(id, aabb, deferred);
            return;
        }
        self.boxes.insert(id, aabb);
        if let Some(&leaf) = self.leaf_of.get(&id) {
            self.nodes[leaf as usize].aabb = aabb;
            self.refit(self.nodes[leaf as usize].parent);
        }
    }

    fn remove(&mut self, id: u32) {
        if self.boxes.remove(&id).is_none() {
            return;
        }
        match self.leaf_of.remove(&id) {
            Some(leaf) => {
                if let NodeKind::Leaf { live, .. } = &mut self.nodes[leaf as usize].kind {
                    *live = false;
                }
                self.tombstones += 1;
            }
            None => self.pending.retain(|&p| p != id),
        }
        self.maybe_rebuild();
    }

    /// Recomputes ancestor boxes from their children, walking up to the root.
    fn refit(&mut self, mut node: u32) {
        while node != NO_PARENT {
            let current = self.nodes[node as usize];
            if let NodeKind::Internal { left, right } = current.kind {
                let aabb = self.nodes[left as usize]
                    .aabb
                    .union(&self.nodes[right as usize].aabb);
                self.nodes[node as usize].aabb = aabb;
            }
            node = current.parent;
        }
    }

    fn maybe_rebuild(&mut self) {
        let stale = self.pending.len() + self.tombstones;
        let threshold = (self.leaf_of.len() as f64 * REBUILD_FRACTION) as usize;
        if stale > threshold.max(MIN_STALE_FOR_REBUILD) {
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        let mut items: Vec<(u32, Aabb)> = self.boxes.iter().map(|(&id, &b)| (id, b)).collect();
        // HashMap order is arbitrary; sort so equal inputs build equal trees
        items.sort_unstable_by_key(|&(id, _)| id);

        self.nodes.clear();
        self.nodes.reserve(items.len().saturating_mul(2));
        self.leaf_of.clear();
        self.pending.clear();
        self.tombstones = 0;
        self.root = if items.is_empty() {
            None
        } else {
            Some(self.build(&mut items, NO_PARENT))
        };
    }

    fn build(&mut self, items: &mut [(u32, Aabb)], parent: u32) -> u32 {
        let index = self.nodes.len() as u32;

        if let [(id, aabb)] = *items {
            self.nodes.push(Node {
                aabb,
                parent,
                kind: NodeKind::Leaf { id, live: true },
            });
            self.leaf_of.insert(id, index);
            return index;
        }

        let mut bounds = items[0].1;
        let mut centroids = Aabb::from_point(items[0].1.center());
        for (_, aabb) in items.iter() {
            bounds = bounds.union(aabb);
            centroids.include(aabb.center());
        }
        let axis = centroids.longest_axis();

        let mid = items.len() / 2;
        items.select_nth_unstable_by(mid, |a, b| {
            a.1.center()[axis]
                .total_cmp(&b.1.center()[axis])
                .then(a.0.cmp(&b.0))
        });

        self.nodes.push(Node {
            aabb: bounds,
            parent,
            kind: NodeKind::Internal {
                left: NO_PARENT,
                right: NO_PARENT,
            },
        });
        let (lo, hi) = items.split_at_mut(mid);
        let left = self.build(lo, index);
        let right = self.build(hi, index);
        self.nodes[index as usize].kind = NodeKind::Internal { left, right };
        index
    }

    fn query(&self, aabb: &Aabb) -> Vec<u32> {
        let mut hits = Vec::new();

        if let Some(root) = self.root {
            let mut stack = vec![root];
            while let Some(node) = stack.pop() {
                let node = &self.nodes[node as usize];
                if !node.aabb.overlaps(aabb) {
                    continue;
                }
                match node.kind {
                    NodeKind::Leaf { id, live: true } => hits.push(id),
                    NodeKind::Leaf { live: false, .. } => {}
                    NodeKind::Internal { left, right } => {
                        stack.push(left);
                        stack.push(right);
                    }
                }
            }
        }

        for id in &self.pending {
            if self.boxes[id].overlaps(aabb) {
                hits.push(*id);
            }
        }

        hits.sort_unstable();
        hits.dedup();
        hits
    }

    fn depth(&self) -> usize {
        let Some(root) = self.root else {
            return 0;
        };
        let mut deepest = 0;
        let mut stack = vec![(root, 1)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let NodeKind::Internal { left, right } = self.nodes[node as usize].kind {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }
}

/// Bounding volume hierarchy broad phase with one tree per element class.
#[derive(Debug, Clone, Default)]
pub struct BvhBroadPhase {
    trees: [Hierarchy; 3],
    /// Set between `begin_rebuild` and `end_rebuild`; inserts only queue.
    bulk_loading: bool,
}

impl BvhBroadPhase {
    /// Creates an empty hierarchy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds every tree from the live boxes, folding in pending inserts
    /// and dropping tombstones.
    pub fn rebuild_trees(&mut self) {
        for tree in &mut self.trees {
            tree.rebuild();
        }
    }

    /// Number of elements waiting for the next tree build.
    pub fn pending_count(&self, class: ElementClass) -> usize {
        self.trees[class.index()].pending.len()
    }

    /// Number of removed leaves still present in the tree.
    pub fn tombstone_count(&self, class: ElementClass) -> usize {
        self.trees[class.index()].tombstones
    }

    /// Depth of a class's tree (0 when empty).
    pub fn depth(&self, class: ElementClass) -> usize {
        self.trees[class.index()].depth()
    }
}

impl BroadPhase for BvhBroadPhase {
    fn insert(&mut self, class: ElementClass, id: u32, aabb: Aabb) {
        let tree = &mut self.trees[class.index()];
        debug_assert!(
            !tree.boxes.contains_key(&id),
            "{class:?} {id} is already registered; use update"
        );
        if tree.boxes.contains_key(&id) {
            tree.update(id, aabb, self.bulk_loading);
        } else {
            tree.insert(id, aabb, self.bulk_loading);
        }
    }

    fn update(&mut self, class: ElementClass, id: u32, aabb: Aabb) {
        self.trees[class.index()].update(id, aabb, self.bulk_loading);
    }

    fn remove(&mut self, class: ElementClass, id: u32) {
        self.trees[class.index()].remove(id);
    }

    fn query(&self, class: ElementClass, aabb: &Aabb) -> Vec<u32> {
        self.trees[class.index()].query(aabb)
    }

    fn len(&self, class: ElementClass) -> usize {
        self.trees[class.index()].boxes.len()
    }

    fn clear(&mut self) {
        for tree in &mut self.trees {
            tree.clear();
        }
    }

    fn name(&self) -> &str {
        "bvh"
    }

    fn begin_rebuild(&mut self, _mesh: &dyn MeshQuery) {
        self.bulk_loading = true;
    }

    fn end_rebuild(&mut self) {
        self.bulk_loading = false;
        self.rebuild_trees();
    }
}
