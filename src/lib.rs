//! # photon-core 🔬
//!
//! A physically-based offline ray tracing core: the acceleration
//! structures, sampling integrators, and parallel execution machinery a
//! renderer is built around, with the host concerns (scene description
//! loading, image encoding, CLI) left to the embedding application.
//!
//! ## Architecture
//!
//! - **Geometric primitives**: sphere, plane, disc, triangle,
//!   parallelogram, and axis-aligned box as one closed sum type with
//!   match-dispatched closed-form intersections
//! - **Shape stores**: composable closest-hit collections — a linear
//!   store plus a BVH in three layouts (mutable fat tree, breadth-first
//!   thin tree, stackless threaded tree with per-direction hit/miss
//!   links)
//! - **Integrators**: albedo preview, traversal-cost visualizer, Whitted
//!   direct lighting with mirror bounces, and a Monte Carlo path tracer,
//!   all driven by a persistent per-integrator worker pool
//! - **Progressive rendering**: an averager that wraps any integrator and
//!   maintains a running per-pixel mean across samples
//! - **Camera**: rotation-matrix orientation with look-at support, pixel
//!   jitter, and lens-aperture depth of field
//!
//! ## Rendering equation
//!
//! The path tracer estimates the rendering equation by Monte Carlo
//! integration:
//!
//! ```text
//!   L_o(p, ω_o) = L_e(p, ω_o) + ∫_Ω f_r(p, ω_i, ω_o) · L_i(p, ω_i) · |cos θ_i| dω_i
//! ```
//!
//! one light-path sample per pixel per pass; the averager turns repeated
//! passes into a converging estimate.
//!
//! ## Typical setup
//!
//! ```no_run
//! use std::sync::Arc;
//! use photon_core::prelude::*;
//!
//! let mut scene = Scene::new();
//! let gray = scene.insert_material(
//!     Material { albedo: Color::splat(0.5), ..Material::default() },
//!     Some("gray"),
//! );
//!
//! let mut store = LinearStore::new();
//! store.insert_shape(Sphere::new(gray, Point3::new(0.0, 0.0, 0.0), 0.5).into());
//! let bvh = build_bvh(&store, 16, 4);
//! scene.insert_store(Arc::new(bvh));
//!
//! let mut camera = Camera::new();
//! camera.position = Point3::new(0.0, 1.0, -3.0);
//! camera.resolution = (640, 480);
//! camera.fov_degrees = 90.0;
//! camera.aperture_diameter = 0.0;
//! camera.set_look_at(Point3::zero());
//!
//! let mut renderer = IntegratorAverager::new(Box::new(MonteCarloIntegrator::monte_carlo()));
//! renderer.set_camera(camera);
//! renderer.set_scene(Arc::new(scene));
//! for _ in 0..256 {
//!     renderer.render();
//! }
//! let frame = renderer.image();
//! ```

pub mod bvh;
pub mod camera;
pub mod config;
pub mod image;
pub mod integrator;
pub mod math;
pub mod ray;
pub mod rng;
pub mod shape;
pub mod store;
pub mod sync;

/// The names almost every embedding pulls in.
pub mod prelude {
    pub use crate::bvh::{build_bvh, to_thin, to_threaded, FatBvh, ThinBvh, ThreadedBvh};
    pub use crate::camera::Camera;
    pub use crate::image::{Image, ImageView};
    pub use crate::integrator::{
        AlbedoIntegrator, Integrator, IntegratorAverager, MonteCarloIntegrator, StatIntegrator,
        WhittedIntegrator,
    };
    pub use crate::math::{Color, Mat3, Point3, Vec2, Vec3};
    pub use crate::ray::{Intersection, MajorAxis, Ray};
    pub use crate::shape::{
        AxisAlignedBox, BoundableShape, Disc, Parallelogram, Plane, Shape, Sphere, Triangle,
    };
    pub use crate::store::{LinearStore, Material, RayStats, Scene, ShapeStore};
}
