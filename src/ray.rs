use crate::config::BLINN_PHONG_SHININESS;
use crate::math::{Point3, Vec2, Vec3};

// ─── Major Axis ─────────────────────────────────────────────────────────────

/// The signed world axis a ray direction is most aligned with.
///
/// Threaded BVH traversal keeps one hit/miss link table per variant so the
/// near child of every node can be visited first without a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum MajorAxis {
    PosX = 0,
    NegX = 1,
    PosY = 2,
    NegY = 3,
    PosZ = 4,
    NegZ = 5,
}

impl MajorAxis {
    pub const COUNT: usize = 6;

    /// Tag for the axis in which `direction` has the largest magnitude,
    /// signed by that component.
    #[inline]
    pub fn of(direction: Vec3) -> Self {
        let axis = direction.largest_axis();
        let negative = direction[axis] < 0.0;
        match (axis, negative) {
            (0, false) => Self::PosX,
            (0, true) => Self::NegX,
            (1, false) => Self::PosY,
            (1, true) => Self::NegY,
            (2, false) => Self::PosZ,
            _ => Self::NegZ,
        }
    }

    /// The unsigned world axis index (0, 1, 2).
    #[inline(always)]
    pub fn axis(self) -> usize {
        self as usize / 2
    }

    /// Whether the tag points down the negative side of its axis.
    #[inline(always)]
    pub fn is_negative(self) -> bool {
        self as usize % 2 == 1
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn all() -> [Self; Self::COUNT] {
        [
            Self::PosX,
            Self::NegX,
            Self::PosY,
            Self::NegY,
            Self::PosZ,
            Self::NegZ,
        ]
    }
}

// ─── Ray ────────────────────────────────────────────────────────────────────

/// A parametric ray `R(t) = origin + t · direction`, the fundamental
/// geometric primitive for all intersection queries.
///
/// The direction is normalized at construction and never mutated; its
/// component reciprocals and major-axis tag are precomputed so the slab
/// test and the threaded BVH can reuse them per node visit.
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3,
    pub direction: Vec3,
    pub direction_reciprocals: Vec3,
    pub major_axis: MajorAxis,
}

impl Ray {
    #[inline]
    pub fn new(origin: Point3, direction: Vec3) -> Self {
        debug_assert!(direction.is_normalized(), "ray direction not normalized");
        Self {
            origin,
            direction,
            direction_reciprocals: direction.recip(),
            major_axis: MajorAxis::of(direction),
        }
    }

    /// Evaluates the ray at parameter `t`. Positive `t` gives points ahead
    /// of the origin.
    #[inline(always)]
    pub fn at(self, t: f64) -> Point3 {
        self.origin + self.direction * t
    }
}

// ─── Intersection ───────────────────────────────────────────────────────────

/// A ray-surface hit record.
///
/// `oriented_normal` is the geometric normal flipped, when necessary, to
/// point into the half-space the ray arrived from, so shading always sees
/// a consistent hemisphere.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    pub material_index: usize,
    pub distance: f64,
    pub point: Point3,
    pub normal: Vec3,
    pub going_in: bool,
    pub oriented_normal: Vec3,
    pub uv: Vec2,
}

impl Intersection {
    #[inline]
    pub fn new(ray: &Ray, material_index: usize, distance: f64, normal: Vec3, uv: Vec2) -> Self {
        let going_in = normal.dot(ray.direction) < 0.0;
        Self {
            material_index,
            distance,
            point: ray.at(distance),
            normal,
            going_in,
            oriented_normal: if going_in { normal } else { -normal },
            uv,
        }
    }

    /// The nearest-hit fold: `candidate` wins when `best` is empty, or when
    /// it is strictly closer with a positive distance. Returns whether a
    /// replacement happened.
    #[inline]
    pub fn replace(best: &mut Option<Intersection>, candidate: Option<Intersection>) -> bool {
        match candidate {
            Some(c) if best.is_none() || (c.distance < best.unwrap().distance && c.distance > 0.0) => {
                *best = Some(c);
                true
            }
            _ => false,
        }
    }
}

// ─── Shading Helpers ────────────────────────────────────────────────────────

/// Blinn-Phong terms for one dot light.
///
/// `n` is the oriented surface normal at `point`, `view` the unit vector
/// from `point` toward the viewer. Returns `(lambertian, specular)` where
/// specular uses the half-vector `h = normalize(l + v)` raised to the
/// configured shininess.
#[inline]
pub fn blinn_phong_coefficients(light: Point3, point: Point3, n: Vec3, view: Vec3) -> (f64, f64) {
    let l = (light - point).normalized();
    let h = (l + view).normalized();

    let lambertian = l.dot(n).max(0.0);
    let specular = h.dot(n).max(0.0).powf(BLINN_PHONG_SHININESS);

    (lambertian, specular)
}
