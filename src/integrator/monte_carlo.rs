//! The unidirectional Monte-Carlo path tracer.

use crate::config::{RR_START_DEPTH, RR_SURVIVAL, SENSIBLE_EPS};
use crate::math::Color;
use crate::ray::Ray;
use crate::rng;
use crate::store::{RayStats, Scene, ShapeStore};

use super::sampler::{Sampler, SamplerIntegrator};

/// One-sample path-traced radiance estimate per pixel.
///
/// The walk keeps the usual accumulators: gathered radiance, albedo
/// throughput, and the cosine at the previous bounce. Each hit deposits
/// the material's emittance (front faces only) weighted by both, then
/// scatters — uniformly over the sphere with probability
/// `1 − reflectance`, otherwise as a perfect mirror. Depth is unbounded;
/// Russian roulette starts after [`RR_START_DEPTH`] bounces.
///
/// A single sample is extremely noisy by construction; stack an
/// [`IntegratorAverager`](super::IntegratorAverager) on top and keep
/// rendering to converge.
#[derive(Debug, Clone, Copy, Default)]
pub struct MonteCarloSampler;

impl Sampler for MonteCarloSampler {
    fn sample(&self, ray: &Ray, scene: &Scene) -> Color {
        let mut radiance = Color::zero();
        let mut throughput = Color::ones();
        let mut previous_cosine = 1.0;

        let mut stats = RayStats::new();
        let mut current = *ray;

        for depth in 0.. {
            if depth > RR_START_DEPTH && rng::uniform() > RR_SURVIVAL {
                break;
            }

            let Some(hit) = scene.intersect_ray(&current, &mut stats) else {
                break;
            };

            let material = scene.material(hit.material_index);
            let safe_reflection_spot = hit.point + hit.oriented_normal * SENSIBLE_EPS;

            if hit.going_in {
                radiance += material.emittance.hadamard(throughput) * previous_cosine;
            }
            throughput = throughput.hadamard(material.albedo);

            current = if rng::uniform() > material.reflectance {
                Ray::new(safe_reflection_spot, rng::unit_vector())
            } else {
                Ray::new(
                    safe_reflection_spot,
                    current.direction.reflect(hit.oriented_normal),
                )
            };
            previous_cosine = current.direction.dot(hit.oriented_normal);
        }

        radiance
    }
}

pub type MonteCarloIntegrator = SamplerIntegrator<MonteCarloSampler>;

impl MonteCarloIntegrator {
    pub fn monte_carlo() -> Self {
        Self::new(MonteCarloSampler)
    }
}
