//! The threaded (stackless) flat BVH layout.
//!
//! Nodes are emitted in pre-order and every node gets a `(hit, miss)`
//! link pair: `hit` is where to continue after entering the node's box,
//! `miss` is where to continue after missing it (or exhausting a leaf).
//! The miss target is the right sibling of the nearest ancestor the
//! traversal has not yet exited, so a walk needs no stack at all.
//!
//! With `multi_direction` enabled there is one link table per signed major
//! axis; before generating each table the children of every internal node
//! are swapped so the child nearer along that direction is visited first.

use crate::ray::{Intersection, MajorAxis, Ray};
use crate::shape::{extents_hit, intersect_linear, Boundable, Extents};
use crate::store::{RayStats, ShapeStore};

use super::{FatBvh, NO_NODE};

/// `[hit, miss]` continuation indices; [`NO_NODE`] ends the traversal.
type Link = [usize; 2];

#[derive(Debug, Clone)]
struct ThreadedNode {
    /// `[lo, hi)` into the packed shape vector; empty for internal nodes.
    shape_range: (usize, usize),
    extents: Extents,
}

/// Immutable stackless-traversal BVH.
pub struct ThreadedBvh<S = crate::shape::BoundableShape> {
    shapes: Vec<S>,
    nodes: Vec<ThreadedNode>,
    /// Six tables indexed by [`MajorAxis`], or a single shared table.
    link_tables: Vec<Vec<Link>>,
    multi_direction: bool,
}

impl<S: Boundable + Clone + Send + Sync> ThreadedBvh<S> {
    /// Flattens `tree`. The fat tree is borrowed mutably: conversion
    /// stamps pre-order ids into its nodes and, in multi-direction mode,
    /// leaves the children ordered for the last direction generated.
    pub fn from_fat(tree: &mut FatBvh<S>, multi_direction: bool) -> Self {
        // Pre-order numbering fixes each node's slot in the flat arrays;
        // later child swaps change link targets but not ids.
        let order = tree.preorder();
        let mut shapes = Vec::with_capacity(tree.shape_count());
        let mut nodes = Vec::with_capacity(order.len());

        for (id, &index) in order.iter().enumerate() {
            tree.nodes[index].id = id;

            let (lo, hi) = tree.nodes[index].shape_range;
            let start = shapes.len();
            shapes.extend(tree.shapes[lo..hi].iter().cloned());
            let end = shapes.len();

            nodes.push(ThreadedNode {
                shape_range: (start, end),
                extents: tree.nodes[index].extents,
            });
        }

        let link_tables = if multi_direction {
            MajorAxis::all()
                .into_iter()
                .map(|direction| {
                    reorder_children(tree, direction);
                    generate_links(tree)
                })
                .collect()
        } else {
            vec![generate_links(tree)]
        };

        Self {
            shapes,
            nodes,
            link_tables,
            multi_direction,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_multi_direction(&self) -> bool {
        self.multi_direction
    }
}

/// Swaps children throughout the tree so the child whose box center is
/// nearer along `direction` is always the left (first-visited) one.
fn reorder_children<S: Boundable + Clone + Send + Sync>(
    tree: &mut FatBvh<S>,
    direction: MajorAxis,
) {
    let axis = direction.axis();
    for index in 0..tree.nodes.len() {
        let Some([l, r]) = tree.nodes[index].children else {
            continue;
        };

        let lhs = tree.nodes[l].center()[axis];
        let rhs = tree.nodes[r].center()[axis];
        let out_of_order = if direction.is_negative() {
            lhs < rhs
        } else {
            lhs > rhs
        };

        if out_of_order {
            tree.swap_children(index);
        }
    }
}

/// One `(hit, miss)` pair per node id for the tree's current child order.
fn generate_links<S: Boundable + Clone + Send + Sync>(tree: &FatBvh<S>) -> Vec<Link> {
    let mut links = vec![[NO_NODE, NO_NODE]; tree.nodes.len()];

    for index in 0..tree.nodes.len() {
        let node = &tree.nodes[index];
        let miss = miss_link(tree, index);
        let hit = match node.children {
            Some([l, _]) => tree.nodes[l].id,
            None => miss,
        };
        links[node.id] = [hit, miss];
    }

    links
}

/// Climbs toward the root while the current node is a right child; the
/// first left-child position yields its right sibling, the continuation
/// after this subtree is exhausted.
fn miss_link<S: Boundable + Clone + Send + Sync>(tree: &FatBvh<S>, node: usize) -> usize {
    let mut current = node;
    loop {
        let parent = tree.nodes[current].parent;
        if parent == NO_NODE {
            return NO_NODE;
        }
        let [l, r] = tree.nodes[parent]
            .children
            .expect("parent link points at a leaf");
        if l == current {
            return tree.nodes[r].id;
        }
        current = parent;
    }
}

impl<S: Boundable + Clone + Send + Sync> ShapeStore for ThreadedBvh<S> {
    fn intersect_impl(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection> {
        let table = if self.multi_direction {
            &self.link_tables[ray.major_axis.index()]
        } else {
            &self.link_tables[0]
        };

        let mut best = None;
        let mut pos = 0usize;

        while pos < self.nodes.len() {
            let node = &self.nodes[pos];
            let links = table[pos];

            stats.count_bound_check();
            if extents_hit(&node.extents, ray) {
                let (lo, hi) = node.shape_range;
                if hi > lo {
                    stats.count_shape_checks(hi - lo);
                    Intersection::replace(&mut best, intersect_linear(ray, &self.shapes[lo..hi]));
                }
                // Single-table layouts are stored in pre-order, so the hit
                // continuation is simply the next slot.
                pos = if self.multi_direction { links[0] } else { pos + 1 };
            } else {
                pos = links[1];
            }
        }

        best
    }

    fn total_shape_count(&self) -> usize {
        self.shapes.len()
    }
}
