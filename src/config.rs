//! Engine-wide constants and tuning knobs.
//!
//! Everything here is domain-scaled rather than machine-epsilon-scaled:
//! scenes are assumed to live within a few thousand units of the origin,
//! so a fixed fuzz constant is both cheaper and more predictable than
//! per-value ULP arithmetic.

use std::num::NonZeroUsize;
use std::thread;

/// Domain-scaled epsilon used to reject self-intersections ("shadow acne")
/// and near-parallel denominators.
pub const SENSIBLE_EPS: f64 = 1e-7;

/// Domain-scaled infinity (2²⁴ − 1) used to seed bounding-volume extents
/// before folding shape bounds into them.
pub const SENSIBLE_INF: f64 = 16_777_215.0;

/// Per-side inflation applied to every computed bounding box.
pub const EPSILON_POINT: crate::math::Vec3 =
    crate::math::Vec3::new(SENSIBLE_EPS, SENSIBLE_EPS, SENSIBLE_EPS);

/// Recursion bound for the Whitted integrator.
pub const WHITTED_MAX_DEPTH: usize = 8;

/// Path depth after which Russian roulette begins (strictly greater than).
pub const RR_START_DEPTH: usize = 7;

/// Russian-roulette survival probability once past [`RR_START_DEPTH`].
pub const RR_SURVIVAL: f64 = 0.2;

/// Blinn-Phong specular exponent.
pub const BLINN_PHONG_SHININESS: f64 = 16.0;

/// Materials at or above this reflectance are treated as perfect mirrors.
pub const MIRROR_REFLECTANCE_CUTOFF: f64 = 0.95;

/// Aperture diameters at or below this are treated as a pinhole camera.
pub const APERTURE_THRESHOLD: f64 = 0.001;

/// Wait-groups spin by default; render work items are short enough that
/// parking the calling thread costs more than it saves.
pub const DEFAULT_SPIN: bool = true;

/// Number of worker threads integrator pools spawn.
pub fn preferred_thread_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
