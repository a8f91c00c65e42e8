//! Shape stores: composable collections answering "closest hit for this
//! ray", plus the scene that owns the material table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::math::Color;
use crate::ray::{Intersection, Ray};
use crate::shape::{intersect_linear, Shape};

// ─── Ray Statistics ─────────────────────────────────────────────────────────

/// Per-ray traversal counters, threaded through every store as an
/// out-parameter so the statistics integrator can surface them.
///
/// With the `ray-stats` feature disabled the increments compile away and
/// the counters stay zero.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RayStats {
    pub bound_checks: usize,
    pub shape_checks: usize,
}

impl RayStats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn count_bound_check(&mut self) {
        #[cfg(feature = "ray-stats")]
        {
            self.bound_checks += 1;
        }
    }

    #[inline(always)]
    pub fn count_shape_checks(&mut self, n: usize) {
        #[cfg(not(feature = "ray-stats"))]
        let _ = n;
        #[cfg(feature = "ray-stats")]
        {
            self.shape_checks += n;
        }
    }
}

// ─── Shape Store ────────────────────────────────────────────────────────────

/// A collection of shapes that can answer closest-hit queries, composable
/// through shared child stores.
///
/// Children are `Arc`-shared so one store can be mounted under several
/// parents; stores are treated as immutable once the scene is assembled,
/// which is what makes lock-free parallel traversal sound.
pub trait ShapeStore: Send + Sync {
    /// Closest hit against this store's own shapes, children excluded.
    fn intersect_impl(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection>;

    fn children(&self) -> &[Arc<dyn ShapeStore>] {
        &[]
    }

    /// Inserting is optional; stores with a fixed layout refuse.
    fn insert_shape(&mut self, _shape: Shape) -> bool {
        false
    }

    fn total_shape_count(&self) -> usize {
        0
    }

    /// Closest positive-distance hit across this store and all transitive
    /// children.
    fn intersect_ray(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection> {
        let mut best = self.intersect_impl(ray, stats);
        for child in self.children() {
            Intersection::replace(&mut best, child.intersect_ray(ray, stats));
        }
        best
    }
}

// ─── Linear Store ───────────────────────────────────────────────────────────

/// The trivial store: a contiguous shape vector tested exhaustively. The
/// only store that accepts unbounded shapes (planes), and the staging area
/// BVH construction reads from.
#[derive(Default)]
pub struct LinearStore {
    pub shapes: Vec<Shape>,
    children: Vec<Arc<dyn ShapeStore>>,
}

impl LinearStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_shapes(shapes: Vec<Shape>) -> Self {
        Self {
            shapes,
            children: Vec::new(),
        }
    }

    pub fn insert_child(&mut self, child: Arc<dyn ShapeStore>) {
        self.children.push(child);
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

impl ShapeStore for LinearStore {
    fn intersect_impl(&self, ray: &Ray, stats: &mut RayStats) -> Option<Intersection> {
        stats.count_shape_checks(self.shapes.len());
        intersect_linear(ray, &self.shapes)
    }

    fn children(&self) -> &[Arc<dyn ShapeStore>] {
        &self.children
    }

    fn insert_shape(&mut self, shape: Shape) -> bool {
        self.shapes.push(shape);
        true
    }

    fn total_shape_count(&self) -> usize {
        self.shapes.len()
    }
}

// ─── Material ───────────────────────────────────────────────────────────────

/// Surface description referenced by index from shapes. Immutable once
/// inserted into a scene.
#[derive(Debug, Clone, Copy)]
pub struct Material {
    pub albedo: Color,
    pub emittance: Color,
    /// Probability mass of specular reflection, in `[0, 1]`.
    pub reflectance: f64,
    /// Index of refraction, ≥ 1.
    pub index_of_refraction: f64,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Color::zero(),
            emittance: Color::zero(),
            reflectance: 0.0,
            index_of_refraction: 1.0,
        }
    }
}

// ─── Scene ──────────────────────────────────────────────────────────────────

/// The top-level store: a material table plus shared child stores.
#[derive(Default)]
pub struct Scene {
    stores: Vec<Arc<dyn ShapeStore>>,
    materials: Vec<Material>,
    material_aliases: HashMap<String, usize>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a material and returns its table index, registering the
    /// alias when given.
    pub fn insert_material(&mut self, material: Material, alias: Option<&str>) -> usize {
        self.materials.push(material);
        let index = self.materials.len() - 1;
        if let Some(alias) = alias {
            self.material_aliases.insert(alias.to_owned(), index);
        }
        index
    }

    /// Index for an alias; unknown aliases resolve to the last material.
    ///
    /// Resolving against an empty table is a programmer error and aborts.
    pub fn resolve_material(&self, alias: &str) -> usize {
        assert!(
            !self.materials.is_empty(),
            "material lookup against an empty material table"
        );
        self.material_aliases
            .get(alias)
            .copied()
            .unwrap_or(self.materials.len() - 1)
    }

    /// Material by index, clamped to the table. An empty table is a
    /// programmer error and aborts.
    pub fn material(&self, index: usize) -> Material {
        assert!(
            !self.materials.is_empty(),
            "material lookup against an empty material table"
        );
        self.materials[index.min(self.materials.len() - 1)]
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn insert_store(&mut self, store: Arc<dyn ShapeStore>) {
        self.stores.push(store);
    }

    pub fn store_count(&self) -> usize {
        self.stores.len()
    }
}

impl ShapeStore for Scene {
    fn intersect_impl(&self, _ray: &Ray, _stats: &mut RayStats) -> Option<Intersection> {
        // The scene holds no shapes of its own; everything lives in the
        // child stores.
        None
    }

    fn children(&self) -> &[Arc<dyn ShapeStore>] {
        &self.stores
    }

    fn total_shape_count(&self) -> usize {
        self.stores.iter().map(|s| s.total_shape_count()).sum()
    }
}
