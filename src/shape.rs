//! Geometry primitives and their closed-form ray intersections.
//!
//! Shapes form a closed sum type (see [`Shape`] / [`BoundableShape`]);
//! dispatch is a match on the tag rather than a virtual call so the
//! per-shape intersection routines stay inline-able inside the BVH
//! traversal loops.

use crate::config::SENSIBLE_EPS;
use crate::math::{Point3, Vec2, Vec3};
use crate::ray::{Intersection, Ray};

/// Axis-aligned bounds as `(min, max)` corners.
pub type Extents = (Point3, Point3);

// ─── Bounds Helpers ─────────────────────────────────────────────────────────

/// Whether `outer` contains `inner` on every axis.
pub fn extents_contain(outer: &Extents, inner: &Extents) -> bool {
    for i in 0..3 {
        if outer.0[i] > inner.0[i] || outer.1[i] < inner.1[i] {
            return false;
        }
    }
    true
}

/// Whether the box contains the point on every axis.
pub fn extents_contain_point(bounds: &Extents, p: Point3) -> bool {
    for i in 0..3 {
        if bounds.0[i] > p[i] || bounds.1[i] < p[i] {
            return false;
        }
    }
    true
}

/// Slab-method interval test shared by the box shape and all BVH layouts.
///
/// Returns the clamped `(t_near, t_far)` pair; the caller decides what a
/// hit means. The running clamps mirror each bound into the other so
/// axis-parallel rays and NaN products fall out as misses.
#[inline(always)]
fn slab_interval(extents: &Extents, ray: &Ray) -> (f64, f64) {
    let mut t_near = -f64::MAX;
    let mut t_far = f64::MAX;

    for i in 0..3 {
        let t1 = (extents.0[i] - ray.origin[i]) * ray.direction_reciprocals[i];
        let t2 = (extents.1[i] - ray.origin[i]) * ray.direction_reciprocals[i];

        t_near = t_near.max(t1.min(t2).min(t_far));
        t_far = t_far.min(t1.max(t2).max(t_near));
    }

    (t_near, t_far)
}

/// Boolean slab test against a bounding box; used on every BVH node visit.
#[inline(always)]
pub fn extents_hit(extents: &Extents, ray: &Ray) -> bool {
    let (t_near, t_far) = slab_interval(extents, ray);
    t_far > t_near.max(0.0)
}

// ─── Shape Traits ───────────────────────────────────────────────────────────

/// Closed-form ray intersection, a pure function of the shape and the ray.
pub trait Intersectable {
    fn intersect_ray(&self, ray: &Ray) -> Option<Intersection>;
}

/// Shapes with finite axis-aligned bounds and a representative center;
/// everything the BVH can organize (all primitives except the plane).
pub trait Boundable: Intersectable {
    fn extents(&self) -> Extents;
    fn center(&self) -> Point3;
}

// ─── Sphere ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Point3,
    pub radius: f64,
    pub material_index: usize,
    extents: Extents,
}

impl Sphere {
    pub fn new(material_index: usize, center: Point3, radius: f64) -> Self {
        let r = Vec3::splat(radius);
        Self {
            center,
            radius,
            material_index,
            extents: (center - r, center + r),
        }
    }
}

impl Intersectable for Sphere {
    /// Solves `a·t² + 2b·t + c = 0` with `a = d·d`, `b = (o−c)·d`,
    /// `c = (o−c)·(o−c) − r²`. The root cascade prefers the smallest root
    /// past `t = 1` so a camera sitting just inside the surface still sees
    /// the far wall.
    fn intersect_ray(&self, ray: &Ray) -> Option<Intersection> {
        let oc = ray.origin - self.center;

        let a = ray.direction.dot(ray.direction);
        let b = oc.dot(ray.direction);
        let c = oc.dot(oc) - self.radius * self.radius;

        let disc = b * b - a * c;
        if disc < 0.0 {
            return None;
        }
        let sq_disc = disc.sqrt();

        let s0 = (-b + sq_disc) / a;
        let s1 = (-b - sq_disc) / a;

        let t = if s0 < 1.0 {
            s1
        } else if s1 < 1.0 {
            s0
        } else {
            s0.min(s1)
        };

        if t < SENSIBLE_EPS {
            return None;
        }

        let normal = (ray.at(t) - self.center).normalized();
        let uv = Vec2::new(
            0.5 + normal.x.atan2(normal.z) * 0.5 * std::f64::consts::FRAC_1_PI,
            0.5 - normal.y.asin() * std::f64::consts::FRAC_1_PI,
        );

        Some(Intersection::new(ray, self.material_index, t, normal, uv))
    }
}

impl Boundable for Sphere {
    fn extents(&self) -> Extents {
        self.extents
    }

    fn center(&self) -> Point3 {
        self.center
    }
}

// ─── Plane ──────────────────────────────────────────────────────────────────

/// An infinite plane through `center` with unit `normal`. Unbounded, so it
/// can only live in linear stores; it carries no meaningful UVs.
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub center: Point3,
    pub normal: Vec3,
    pub material_index: usize,
}

impl Plane {
    pub fn new(material_index: usize, center: Point3, normal: Vec3) -> Self {
        Self {
            center,
            normal: normal.normalized(),
            material_index,
        }
    }

    /// Signed ray parameter of the plane hit, or a negative sentinel when
    /// the ray is parallel to within ε.
    #[inline]
    fn intersect_distance(&self, ray: &Ray) -> f64 {
        debug_assert!(ray.direction.is_normalized());
        let denom = self.normal.dot(ray.direction);

        if denom.abs() <= SENSIBLE_EPS {
            return -1.0;
        }

        (self.center - ray.origin).dot(self.normal) / denom
    }
}

impl Intersectable for Plane {
    fn intersect_ray(&self, ray: &Ray) -> Option<Intersection> {
        let t = self.intersect_distance(ray);
        if t < SENSIBLE_EPS {
            return None;
        }
        Some(Intersection::new(
            ray,
            self.material_index,
            t,
            self.normal,
            Vec2::zero(),
        ))
    }
}

// ─── Disc ───────────────────────────────────────────────────────────────────

/// A plane intersection filtered by squared distance from the disc center.
/// Bounds are the lazy cube `center ± radius`.
#[derive(Debug, Clone, Copy)]
pub struct Disc {
    pub center: Point3,
    pub normal: Vec3,
    pub radius: f64,
    pub material_index: usize,
    extents: Extents,
}

impl Disc {
    pub fn new(material_index: usize, center: Point3, normal: Vec3, radius: f64) -> Self {
        let r = Vec3::splat(radius);
        Self {
            center,
            normal: normal.normalized(),
            radius,
            material_index,
            extents: (center - r, center + r),
        }
    }
}

impl Intersectable for Disc {
    fn intersect_ray(&self, ray: &Ray) -> Option<Intersection> {
        let plane = Plane {
            center: self.center,
            normal: self.normal,
            material_index: self.material_index,
        };
        let hit = plane.intersect_ray(ray)?;

        let d = hit.point - self.center;
        if d.dot(d) > self.radius * self.radius {
            return None;
        }
        Some(hit)
    }
}

impl Boundable for Disc {
    fn extents(&self) -> Extents {
        self.extents
    }

    fn center(&self) -> Point3 {
        self.center
    }
}

// ─── Triangle / Parallelogram ───────────────────────────────────────────────

/// Möller–Trumbore shape over three vertices.
///
/// ```text
/// V2    x → V2 + E0 when PARALLELOGRAM
/// | \
/// E1  \
/// |    \
/// V0-E0-V1
/// ```
///
/// The two variants share everything but a single barycentric reject:
/// the triangle discards `u + v > 1`, the parallelogram only `v > 1`.
#[derive(Debug, Clone, Copy)]
pub struct TriangleShape<const PARALLELOGRAM: bool> {
    vertices: [Point3; 3],
    edges: [Vec3; 2],
    extents: Extents,
    center: Point3,
    pub normal: Vec3,
    pub material_index: usize,
}

pub type Triangle = TriangleShape<false>;
pub type Parallelogram = TriangleShape<true>;

impl<const PARALLELOGRAM: bool> TriangleShape<PARALLELOGRAM> {
    pub fn new(material_index: usize, vertices: [Point3; 3]) -> Self {
        let edges = [vertices[1] - vertices[0], vertices[2] - vertices[0]];

        let min = vertices[0].min(vertices[1]).min(vertices[2]);
        let extents = if PARALLELOGRAM {
            (min, vertices[0] + (edges[0] + edges[1]))
        } else {
            (min, vertices[0].max(vertices[1]).max(vertices[2]))
        };

        let center = if PARALLELOGRAM {
            (extents.0 + extents.1) / 2.0
        } else {
            (vertices[0] + vertices[1] + vertices[2]) / 3.0
        };

        Self {
            vertices,
            edges,
            extents,
            center,
            normal: edges[0].cross(edges[1]).normalized(),
            material_index,
        }
    }
}

impl<const PARALLELOGRAM: bool> Intersectable for TriangleShape<PARALLELOGRAM> {
    fn intersect_ray(&self, ray: &Ray) -> Option<Intersection> {
        debug_assert!(ray.direction.is_normalized());

        let h = ray.direction.cross(self.edges[1]);
        let a = self.edges[0].dot(h);

        if a.abs() <= SENSIBLE_EPS {
            return None;
        }
        let f = 1.0 / a;

        let s = ray.origin - self.vertices[0];
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(self.edges[0]);
        let v = f * ray.direction.dot(q);
        let over_far_edge = if PARALLELOGRAM { v > 1.0 } else { u + v > 1.0 };
        if v < 0.0 || over_far_edge {
            return None;
        }

        let t = f * self.edges[1].dot(q);
        if t <= SENSIBLE_EPS {
            return None;
        }

        Some(Intersection::new(
            ray,
            self.material_index,
            t,
            self.normal,
            Vec2::new(u, v),
        ))
    }
}

impl<const PARALLELOGRAM: bool> Boundable for TriangleShape<PARALLELOGRAM> {
    fn extents(&self) -> Extents {
        self.extents
    }

    fn center(&self) -> Point3 {
        self.center
    }
}

// ─── Axis-Aligned Box ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct AxisAlignedBox {
    pub extents: Extents,
    pub material_index: usize,
    center: Point3,
}

impl AxisAlignedBox {
    pub fn new(material_index: usize, min: Point3, max: Point3) -> Self {
        Self {
            extents: (min, max),
            material_index,
            center: (min + max) / 2.0,
        }
    }
}

impl Intersectable for AxisAlignedBox {
    fn intersect_ray(&self, ray: &Ray) -> Option<Intersection> {
        let (t_near, t_far) = slab_interval(&self.extents, ray);
        if t_far <= t_near.max(0.0) {
            return None;
        }

        // Near root from outside, far root from inside.
        let t = if t_near > 0.0 { t_near } else { t_far };
        if t < SENSIBLE_EPS {
            return None;
        }

        // Project the hit point onto the half-extents; the bias pushes the
        // dominant component past 1 so truncation singles out the hit face
        // without an explicit arg-max over nearly equal values.
        let point = ray.at(t);
        let p = point - (self.extents.0 + self.extents.1) * 0.5;
        let d = (self.extents.0 - self.extents.1) * 0.5;
        const BIAS: f64 = 1.000001;

        let normal = Vec3::new(
            (p.x / d.x.abs() * BIAS).trunc(),
            (p.y / d.y.abs() * BIAS).trunc(),
            (p.z / d.z.abs() * BIAS).trunc(),
        )
        .normalized();

        Some(Intersection::new(
            ray,
            self.material_index,
            t,
            normal,
            Vec2::zero(),
        ))
    }
}

impl Boundable for AxisAlignedBox {
    fn extents(&self) -> Extents {
        self.extents
    }

    fn center(&self) -> Point3 {
        self.center
    }
}

// ─── Shape Sums ─────────────────────────────────────────────────────────────

macro_rules! shape_sum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy)]
        pub enum $name {
            $($variant($variant),)+
        }

        $(impl From<$variant> for $name {
            fn from(s: $variant) -> Self {
                Self::$variant(s)
            }
        })+

        impl Intersectable for $name {
            #[inline]
            fn intersect_ray(&self, ray: &Ray) -> Option<Intersection> {
                match self {
                    $(Self::$variant(s) => s.intersect_ray(ray),)+
                }
            }
        }
    };
}

shape_sum!(
    /// The closed sum of every primitive the engine renders.
    Shape {
        AxisAlignedBox,
        Disc,
        Parallelogram,
        Plane,
        Sphere,
        Triangle,
    }
);

shape_sum!(
    /// The boundable subset of [`Shape`] — everything a BVH can hold.
    BoundableShape {
        AxisAlignedBox,
        Disc,
        Parallelogram,
        Sphere,
        Triangle,
    }
);

impl Boundable for BoundableShape {
    #[inline]
    fn extents(&self) -> Extents {
        match self {
            Self::AxisAlignedBox(s) => s.extents(),
            Self::Disc(s) => s.extents(),
            Self::Parallelogram(s) => s.extents(),
            Self::Sphere(s) => s.extents(),
            Self::Triangle(s) => s.extents(),
        }
    }

    #[inline]
    fn center(&self) -> Point3 {
        match self {
            Self::AxisAlignedBox(s) => s.center(),
            Self::Disc(s) => s.center(),
            Self::Parallelogram(s) => s.center(),
            Self::Sphere(s) => s.center(),
            Self::Triangle(s) => s.center(),
        }
    }
}

impl TryFrom<Shape> for BoundableShape {
    type Error = Shape;

    /// Fails for the plane, the one unbounded primitive.
    fn try_from(shape: Shape) -> Result<Self, Shape> {
        match shape {
            Shape::AxisAlignedBox(s) => Ok(Self::AxisAlignedBox(s)),
            Shape::Disc(s) => Ok(Self::Disc(s)),
            Shape::Parallelogram(s) => Ok(Self::Parallelogram(s)),
            Shape::Sphere(s) => Ok(Self::Sphere(s)),
            Shape::Triangle(s) => Ok(Self::Triangle(s)),
            Shape::Plane(_) => Err(shape),
        }
    }
}

impl From<BoundableShape> for Shape {
    fn from(shape: BoundableShape) -> Self {
        match shape {
            BoundableShape::AxisAlignedBox(s) => Self::AxisAlignedBox(s),
            BoundableShape::Disc(s) => Self::Disc(s),
            BoundableShape::Parallelogram(s) => Self::Parallelogram(s),
            BoundableShape::Sphere(s) => Self::Sphere(s),
            BoundableShape::Triangle(s) => Self::Triangle(s),
        }
    }
}

/// Extracts the boundable shapes from a mixed bag, dropping planes; the
/// feed for BVH construction.
pub fn collect_boundable(shapes: &[Shape]) -> Vec<BoundableShape> {
    shapes
        .iter()
        .filter_map(|s| BoundableShape::try_from(*s).ok())
        .collect()
}

/// Closest-hit fold over a run of shapes.
#[inline]
pub fn intersect_linear<'a, S, I>(ray: &Ray, shapes: I) -> Option<Intersection>
where
    S: Intersectable + 'a,
    I: IntoIterator<Item = &'a S>,
{
    let mut best = None;
    for shape in shapes {
        Intersection::replace(&mut best, shape.intersect_ray(ray));
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ray(origin: Point3, toward: Vec3) -> Ray {
        Ray::new(origin, toward.normalized())
    }

    #[test]
    fn sphere_hit_from_outside() {
        let s = Sphere::new(0, Point3::zero(), 1.0);
        let r = ray(Point3::new(0.0, 0.0, -3.0), Vec3::unit_z());
        let hit = s.intersect_ray(&r).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-9);
        assert!(hit.going_in);
        assert!((hit.normal - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-9);
    }

    #[test]
    fn sphere_hit_from_inside_picks_far_root() {
        let s = Sphere::new(0, Point3::zero(), 2.0);
        let r = ray(Point3::zero(), Vec3::unit_z());
        let hit = s.intersect_ray(&r).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-9);
        assert!(!hit.going_in);
        assert!(hit.oriented_normal.dot(r.direction) < 0.0);
    }

    #[test]
    fn sphere_behind_ray_misses() {
        let s = Sphere::new(0, Point3::new(0.0, 0.0, -5.0), 1.0);
        let r = ray(Point3::zero(), Vec3::unit_z());
        assert!(s.intersect_ray(&r).is_none());
    }

    #[test]
    fn sphere_uv_poles_and_equator() {
        let s = Sphere::new(0, Point3::zero(), 1.0);
        let r = ray(Point3::new(0.0, 0.0, 5.0), -Vec3::unit_z());
        let hit = s.intersect_ray(&r).unwrap();
        // Equator facing +Z: u = 0.5, v = 0.5.
        assert!((hit.uv.x - 0.5).abs() < 1e-9);
        assert!((hit.uv.y - 0.5).abs() < 1e-9);
    }

    #[test]
    fn plane_parallel_ray_misses() {
        let p = Plane::new(0, Point3::zero(), Vec3::unit_y());
        let r = ray(Point3::new(0.0, 1.0, 0.0), Vec3::unit_x());
        assert!(p.intersect_ray(&r).is_none());
    }

    #[test]
    fn plane_hit_distance_and_orientation() {
        let p = Plane::new(0, Point3::zero(), Vec3::unit_y());
        let r = ray(Point3::new(0.0, 2.0, 0.0), -Vec3::unit_y());
        let hit = p.intersect_ray(&r).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-12);
        assert!(hit.oriented_normal.dot(r.direction) < 0.0);

        // Behind the origin: no hit.
        let away = ray(Point3::new(0.0, 2.0, 0.0), Vec3::unit_y());
        assert!(p.intersect_ray(&away).is_none());
    }

    #[test]
    fn disc_accepts_inside_rejects_outside() {
        let d = Disc::new(0, Point3::zero(), Vec3::unit_y(), 1.0);
        let inside = ray(Point3::new(0.5, 1.0, 0.0), -Vec3::unit_y());
        let outside = ray(Point3::new(1.5, 1.0, 0.0), -Vec3::unit_y());
        assert!(d.intersect_ray(&inside).is_some());
        assert!(d.intersect_ray(&outside).is_none());
    }

    #[test]
    fn triangle_barycentric_boundaries() {
        let t = Triangle::new(
            0,
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
        );

        // u = 0 and v = 0 edges count as hits.
        let on_v_edge = ray(Point3::new(0.0, 0.5, 1.0), -Vec3::unit_z());
        assert!(t.intersect_ray(&on_v_edge).is_some());
        let on_u_edge = ray(Point3::new(0.5, 0.0, 1.0), -Vec3::unit_z());
        assert!(t.intersect_ray(&on_u_edge).is_some());

        // Just past the hypotenuse misses.
        let past = ray(
            Point3::new(0.5 + 5e-7, 0.5 + 5e-7, 1.0),
            -Vec3::unit_z(),
        );
        assert!(t.intersect_ray(&past).is_none());
    }

    #[test]
    fn triangle_centroid_center() {
        let t = Triangle::new(
            0,
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(3.0, 0.0, 0.0),
                Point3::new(0.0, 3.0, 0.0),
            ],
        );
        assert_eq!(t.center(), Point3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn parallelogram_covers_the_far_corner() {
        let p = Parallelogram::new(
            0,
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
        );

        // u + v > 1 but u, v ≤ 1: inside for a parallelogram.
        let far_corner = ray(Point3::new(0.9, 0.9, 1.0), -Vec3::unit_z());
        assert!(p.intersect_ray(&far_corner).is_some());

        let past_v = ray(Point3::new(0.5, 1.1, 1.0), -Vec3::unit_z());
        assert!(p.intersect_ray(&past_v).is_none());
    }

    #[test]
    fn box_near_root_outside_far_root_inside() {
        let b = AxisAlignedBox::new(0, Point3::splat(-1.0), Point3::splat(1.0));

        let outside = ray(Point3::new(0.0, 0.0, -3.0), Vec3::unit_z());
        let hit = b.intersect_ray(&outside).unwrap();
        assert!((hit.distance - 2.0).abs() < 1e-9);
        assert!((hit.normal - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-9);

        let inside = ray(Point3::zero(), Vec3::unit_z());
        let hit = b.intersect_ray(&inside).unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-9);

        // Entering one face exits through the opposite one.
        let through = ray(Point3::new(0.25, -0.25, -3.0), Vec3::unit_z());
        let entry = b.intersect_ray(&through).unwrap();
        let beyond = ray(entry.point + Vec3::unit_z() * 1e-6, Vec3::unit_z());
        let exit = b.intersect_ray(&beyond).unwrap();
        assert!((entry.point.z + 1.0).abs() < 1e-9);
        assert!((exit.point.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn box_misses_sideways() {
        let b = AxisAlignedBox::new(0, Point3::splat(-1.0), Point3::splat(1.0));
        let r = ray(Point3::new(3.0, 0.0, -3.0), Vec3::unit_z());
        assert!(b.intersect_ray(&r).is_none());
    }

    #[test]
    fn shape_enum_dispatch_matches_concrete() {
        let sphere = Sphere::new(0, Point3::zero(), 1.0);
        let as_enum = Shape::from(sphere);
        let r = ray(Point3::new(0.0, 0.0, -3.0), Vec3::unit_z());
        assert_eq!(
            as_enum.intersect_ray(&r).map(|i| i.distance),
            sphere.intersect_ray(&r).map(|i| i.distance),
        );
    }

    #[test]
    fn collect_boundable_drops_planes() {
        let shapes = vec![
            Shape::from(Sphere::new(0, Point3::zero(), 1.0)),
            Shape::from(Plane::new(0, Point3::zero(), Vec3::unit_y())),
            Shape::from(AxisAlignedBox::new(0, Point3::splat(-1.0), Point3::splat(1.0))),
        ];
        let boundable = collect_boundable(&shapes);
        assert_eq!(boundable.len(), 2);
    }

    #[test]
    fn intersect_linear_returns_closest() {
        let shapes = vec![
            BoundableShape::from(Sphere::new(0, Point3::new(0.0, 0.0, 5.0), 1.0)),
            BoundableShape::from(Sphere::new(1, Point3::new(0.0, 0.0, 2.5), 0.5)),
        ];
        let r = ray(Point3::zero(), Vec3::unit_z());
        let hit = intersect_linear(&r, &shapes).unwrap();
        assert_eq!(hit.material_index, 1);
        assert!((hit.distance - 2.0).abs() < 1e-9);
    }

    #[test]
    fn extents_containment_helpers() {
        let outer = (Point3::splat(-2.0), Point3::splat(2.0));
        let inner = (Point3::splat(-1.0), Point3::splat(1.0));
        assert!(extents_contain(&outer, &inner));
        assert!(!extents_contain(&inner, &outer));
        assert!(extents_contain_point(&inner, Point3::zero()));
        assert!(!extents_contain_point(&inner, Point3::splat(1.5)));
    }

    #[test]
    fn extents_hit_respects_origin_inside() {
        let bounds = (Point3::splat(-1.0), Point3::splat(1.0));
        let from_inside = ray(Point3::zero(), Vec3::unit_x());
        let from_outside = ray(Point3::new(0.0, 0.0, -5.0), Vec3::unit_z());
        let pointing_away = ray(Point3::new(0.0, 0.0, -5.0), -Vec3::unit_z());
        assert!(extents_hit(&bounds, &from_inside));
        assert!(extents_hit(&bounds, &from_outside));
        assert!(!extents_hit(&bounds, &pointing_away));
    }
}
