//! Bounding-volume hierarchies in three progressively more compact
//! layouts.
//!
//! Construction always starts from the mutable [`FatBvh`]: a top-down
//! midpoint split over the longest axes. From there the tree can be
//! flattened into a [`ThinBvh`] (breadth-first array, explicit-stack
//! traversal) or a [`ThreadedBvh`] (pre-order array with per-direction
//! hit/miss links, stackless traversal). Conversions borrow the fat tree;
//! source and derived layouts may coexist and each one is a drop-in
//! [`ShapeStore`](crate::store::ShapeStore).

mod fat;
mod thin;
mod threaded;

pub use fat::FatBvh;
pub use thin::ThinBvh;
pub use threaded::ThreadedBvh;

use crate::shape::{collect_boundable, Boundable, Extents};
use crate::store::LinearStore;

/// Index sentinel for "no node" in parent pointers and miss links.
pub(crate) const NO_NODE: usize = usize::MAX;

/// Builds a fat BVH over the boundable shapes of a linear store (planes
/// stay behind; they have no extents to organize).
pub fn build_bvh(store: &LinearStore, max_depth: usize, min_shapes: usize) -> FatBvh {
    FatBvh::build(collect_boundable(&store.shapes), max_depth, min_shapes)
}

/// Flattens a fat tree into the breadth-first thin layout.
pub fn to_thin<S: Boundable + Clone + Send + Sync>(tree: &FatBvh<S>) -> ThinBvh<S> {
    ThinBvh::from_fat(tree)
}

/// Flattens a fat tree into the threaded layout, with either one link
/// table or all six per-direction tables.
pub fn to_threaded<S: Boundable + Clone + Send + Sync>(
    tree: &mut FatBvh<S>,
    multi_direction: bool,
) -> ThreadedBvh<S> {
    ThreadedBvh::from_fat(tree, multi_direction)
}

/// The three axes ordered by descending extent length, the split-candidate
/// order during construction.
pub(crate) fn major_axes(extents: &Extents) -> [usize; 3] {
    let lengths = extents.1 - extents.0;
    let mut axes = [0usize, 1, 2];
    axes.sort_by(|&a, &b| lengths[b].partial_cmp(&lengths[a]).unwrap_or(std::cmp::Ordering::Equal));
    axes
}

/// In-place unstable partition; returns the size of the predicate-true
/// prefix.
pub(crate) fn partition_in_place<T>(slice: &mut [T], pred: impl Fn(&T) -> bool) -> usize {
    let mut first = 0;
    for i in 0..slice.len() {
        if pred(&slice[i]) {
            slice.swap(first, i);
            first += 1;
        }
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn major_axes_sorted_by_length() {
        let extents = (Vec3::zero(), Vec3::new(1.0, 5.0, 3.0));
        assert_eq!(major_axes(&extents), [1, 2, 0]);
    }

    #[test]
    fn partition_prefix_holds_predicate() {
        let mut values = vec![3, 8, 1, 9, 4, 7];
        let k = partition_in_place(&mut values, |&v| v < 5);
        assert_eq!(k, 3);
        assert!(values[..k].iter().all(|&v| v < 5));
        assert!(values[k..].iter().all(|&v| v >= 5));
    }
}
