//! The mutable construction-time BVH.
//!
//! Nodes live in an index arena rather than behind owning pointers; parent
//! back-references are then plain indices, which is all the threaded
//! conversion needs to build its miss links.

use tracing::debug;

use crate::config::{EPSILON_POINT, SENSIBLE_INF};
use crate::math::{Point3, Vec3};
use crate::ray::{Intersection, Ray};
use crate::shape::{extents_contain_point, extents_hit, intersect_linear, Boundable, Extents};
use crate::store::{RayStats, ShapeStore};

use super::{major_axes, partition_in_place, NO_NODE};

#[derive(Debug, Clone)]
pub(super) struct FatNode {
    pub extents: Extents,
    /// `[lo, hi)` into the shared shape vector; emptied when the node
    /// splits.
    pub shape_range: (usize, usize),
    pub children: Option<[usize; 2]>,
    pub parent: usize,
    /// Slot for the threaded conversion's pre-order numbering.
    pub id: usize,
}

impl FatNode {
    fn new(shape_range: (usize, usize), parent: usize) -> Self {
        Self {
            extents: (Point3::zero(), Point3::zero()),
            shape_range,
            children: None,
            parent,
            id: 0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }

    pub fn center(&self) -> Point3 {
        (self.extents.0 + self.extents.1) / 2.0
    }
}

/// Top-down midpoint-split BVH over a shared shape vector.
pub struct FatBvh<S = crate::shape::BoundableShape> {
    pub(super) shapes: Vec<S>,
    pub(super) nodes: Vec<FatNode>,
}

impl<S: Boundable + Clone + Send + Sync> FatBvh<S> {
    /// Builds the tree. Splitting stops at `max_depth`, or when a node
    /// holds `min_shapes` or fewer, or when no axis yields two children of
    /// at least `min_shapes` each.
    pub fn build(shapes: Vec<S>, max_depth: usize, min_shapes: usize) -> Self {
        let count = shapes.len();
        let mut tree = Self {
            shapes,
            nodes: vec![FatNode::new((0, count), NO_NODE)],
        };
        tree.split(0, 0, max_depth, min_shapes);

        debug!(
            shapes = count,
            nodes = tree.nodes.len(),
            leaves = tree.nodes.iter().filter(|n| n.is_leaf()).count(),
            "built fat bvh"
        );
        tree
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Node extents as the ε-inflated union of the shapes in the node's
    /// subtree range.
    fn calculate_extents(&mut self, node: usize) {
        let (lo, hi) = self.nodes[node].shape_range;

        let mut min = Vec3::splat(SENSIBLE_INF);
        let mut max = Vec3::splat(-SENSIBLE_INF);
        for shape in &self.shapes[lo..hi] {
            let e = shape.extents();
            min = min.min(e.0);
            max = max.max(e.1);
        }

        self.nodes[node].extents = (min - EPSILON_POINT, max + EPSILON_POINT);
    }

    fn split(&mut self, node: usize, depth: usize, max_depth: usize, min_shapes: usize) -> bool {
        self.calculate_extents(node);

        let (lo, hi) = self.nodes[node].shape_range;
        let count = hi - lo;
        if depth >= max_depth || count <= min_shapes {
            return false;
        }

        let extents = self.nodes[node].extents;
        for axis in major_axes(&extents) {
            // Right-half bounds: the node's box with the near half of the
            // candidate axis removed.
            let mut rhs_bounds = extents;
            rhs_bounds.0[axis] += (extents.1[axis] - extents.0[axis]) / 2.0;

            // Centers outside the right half first; k is the left child's
            // share.
            let k = partition_in_place(&mut self.shapes[lo..hi], |s| {
                !extents_contain_point(&rhs_bounds, s.center())
            });

            if k < min_shapes || count - k < min_shapes {
                continue;
            }

            let (left, right) = self.split_at(node, k);
            self.split(left, depth + 1, max_depth, min_shapes);
            self.split(right, depth + 1, max_depth, min_shapes);
            return true;
        }

        false
    }

    /// Turns a leaf into an internal node whose children own
    /// `[lo, lo + k)` and `[lo + k, hi)` of its slice.
    fn split_at(&mut self, node: usize, k: usize) -> (usize, usize) {
        debug_assert!(self.nodes[node].is_leaf());
        let (lo, hi) = self.nodes[node].shape_range;
        let k = k.min(hi - lo);

        let left = self.nodes.len();
        let right = left + 1;
        self.nodes.push(FatNode::new((lo, lo + k), node));
        self.nodes.push(FatNode::new((lo + k, hi), node));

        let parent = &mut self.nodes[node];
        parent.children = Some([left, right]);
        parent.shape_range = (lo, lo);
        (left, right)
    }

    // ── Conversion support ──────────────────────────────────────────────

    /// Node indices in pre-order (left subtree before right).
    pub(super) fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![0];
        while let Some(i) = stack.pop() {
            order.push(i);
            if let Some([l, r]) = self.nodes[i].children {
                stack.push(r);
                stack.push(l);
            }
        }
        order
    }

    pub(super) fn swap_children(&mut self, node: usize) {
        if let Some(children) = &mut self.nodes[node].children {
            children.swap(0, 1);
        }
    }

    fn intersect_node(
        &self,
        index: usize,
        ray: &Ray,
        stats: &mut RayStats,
    ) -> Option<Intersection> {
        stats.count_bound_check();
        let node = &self.nodes[index];
        if !extents_hit(&node.extents, ray) {
            return None;
        }

        if let Some([l, r]) = node.children {
            let mut best = self.intersect_node(l, ray, stats);
            Intersection::replace(&mut best, self.intersect_node(r, ray, stats));
            best
        } else {
            let (lo, hi) = node.shape_range;
            stats.count_shape_checks(hi - lo);
            intersect_linear(ray, &self.shapes[lo..hi])
        }
    }

    // ── Invariant checks (tests and debugging) ──────────────────────────

    /// Leaf shape ranges in index order; their concatenation must cover
    /// `[0, shape_count)` exactly.
    pub fn leaf_ranges(&self) -> Vec<(usize, usize)> {
        let mut ranges: Vec<_> = self
            .nodes
            .iter()
            .filter(|n| n.is_leaf())
            .map(|n| n.shape_range)
            .collect();
        ranges.sort_unstable();
        ranges
    }

    /// Whether every node's extents contain the extents of each shape in
    /// its range and of each child node.
    pub fn extents_are_consistent(&self) -> bool {
        self.nodes.iter().all(|node| {
            let shapes_ok = {
                let (lo, hi) = node.shape_range;
                self.shapes[lo..hi]
                    .iter()
                    .all(|s| crate::shape::extents_contain(&node.extents, &s.extents()))
            };
            let children_ok = node.children.map_or(true, |[l, r]| {
                crate::shape::extents_contain(&node.extents, &self.nodes[l].extents)
                    && crate::shape::extents_contain(&node.extents, &self.nodes[r].extents)
            });
            shapes_ok && children_ok
        })
    }
}

impl<S: Boundable + Clone + Send + Sync> ShapeStore for FatBvh<S> {
    fn intersect_impl(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection> {
        self.intersect_node(0, ray, stats)
    }

    fn total_shape_count(&self) -> usize {
        self.shapes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{BoundableShape, Sphere};

    fn sphere_grid(n: usize) -> Vec<BoundableShape> {
        (0..n)
            .map(|i| {
                let f = i as f64;
                BoundableShape::from(Sphere::new(
                    i,
                    Point3::new(f % 10.0, (f / 10.0).floor(), 0.0),
                    0.25,
                ))
            })
            .collect()
    }

    #[test]
    fn build_splits_into_nonempty_leaves() {
        let tree = FatBvh::build(sphere_grid(100), 16, 4);
        assert!(tree.node_count() > 1);

        for node in &tree.nodes {
            let (lo, hi) = node.shape_range;
            if node.is_leaf() {
                assert!(hi > lo, "leaf with empty shape slice");
            } else {
                assert_eq!(lo, hi, "internal node still owns shapes");
                assert!(node.children.is_some());
            }
        }
    }

    #[test]
    fn leaves_partition_the_shape_vector() {
        let tree = FatBvh::build(sphere_grid(64), 12, 3);
        let ranges = tree.leaf_ranges();

        let mut cursor = 0;
        for (lo, hi) in ranges {
            assert_eq!(lo, cursor, "gap or overlap between leaf slices");
            cursor = hi;
        }
        assert_eq!(cursor, tree.shape_count());
    }

    #[test]
    fn extents_contain_subtrees() {
        let tree = FatBvh::build(sphere_grid(100), 16, 2);
        assert!(tree.extents_are_consistent());
    }

    #[test]
    fn respects_max_depth_zero() {
        let tree = FatBvh::build(sphere_grid(32), 0, 1);
        assert_eq!(tree.node_count(), 1);
    }

    #[test]
    fn closest_hit_matches_linear_scan() {
        use crate::math::Vec3;
        use crate::shape::intersect_linear;

        let shapes = sphere_grid(100);
        let tree = FatBvh::build(shapes.clone(), 16, 2);

        let ray = Ray::new(Point3::new(4.6, 4.2, -20.0), Vec3::unit_z());
        let linear = intersect_linear(&ray, &shapes);
        let mut stats = RayStats::new();
        let tree_hit = tree.intersect_ray(&ray, &mut stats);

        match (linear, tree_hit) {
            (Some(a), Some(b)) => {
                assert!((a.distance - b.distance).abs() < 1e-12);
                assert_eq!(a.material_index, b.material_index);
            }
            (None, None) => {}
            other => panic!("linear and bvh disagree: {other:?}"),
        }
    }

    #[test]
    fn single_shape_tree_still_answers() {
        let tree = FatBvh::build(sphere_grid(1), 8, 1);
        let ray = Ray::new(Point3::new(0.0, 0.0, -5.0), crate::math::Vec3::unit_z());
        let mut stats = RayStats::new();
        assert!(tree.intersect_ray(&ray, &mut stats).is_some());
    }

    #[test]
    fn empty_tree_misses_everything() {
        let tree = FatBvh::<BoundableShape>::build(Vec::new(), 8, 1);
        let ray = Ray::new(Point3::zero(), crate::math::Vec3::unit_z());
        let mut stats = RayStats::new();
        assert!(tree.intersect_ray(&ray, &mut stats).is_none());
    }
}
