//! Whitted-style direct lighting with perfect mirror bounces.

use crate::config::{MIRROR_REFLECTANCE_CUTOFF, SENSIBLE_EPS, WHITTED_MAX_DEPTH};
use crate::math::{Color, Point3};
use crate::ray::{blinn_phong_coefficients, Ray};
use crate::store::{RayStats, Scene, ShapeStore};

use super::sampler::{Sampler, SamplerIntegrator};

/// A point light with no falloff.
#[derive(Debug, Clone, Copy)]
pub struct DotLight {
    pub position: Point3,
    pub emission: Color,
}

/// Blinn-Phong shading from a set of dot lights, with materials at or
/// above the mirror cutoff reflectance handled by recursive reflection
/// (bounded at eight bounces).
#[derive(Debug, Clone)]
pub struct WhittedSampler {
    pub ambient_light: Color,
    dot_lights: Vec<DotLight>,
}

impl Default for WhittedSampler {
    fn default() -> Self {
        Self {
            ambient_light: Color::zero(),
            dot_lights: vec![
                DotLight {
                    position: Point3::new(-10.0, 10.0, -2.5),
                    emission: Color::ones(),
                },
                DotLight {
                    position: Point3::new(10.0, 10.0, -2.5),
                    emission: Color::ones(),
                },
            ],
        }
    }
}

impl WhittedSampler {
    /// A sampler with no lights at all; add them with
    /// [`WhittedSampler::add_dot_light`].
    pub fn unlit() -> Self {
        Self {
            ambient_light: Color::zero(),
            dot_lights: Vec::new(),
        }
    }

    pub fn add_dot_light(&mut self, position: Point3, emission: Color) {
        self.dot_lights.push(DotLight { position, emission });
    }

    pub fn dot_lights(&self) -> &[DotLight] {
        &self.dot_lights
    }

    fn sample_impl(&self, ray: &Ray, scene: &Scene, depth: usize, stats: &mut RayStats) -> Color {
        if depth >= WHITTED_MAX_DEPTH {
            return Color::zero();
        }

        let Some(hit) = scene.intersect_ray(ray, stats) else {
            return Color::zero();
        };

        let material = scene.material(hit.material_index);
        let safe_reflection_spot = hit.point + hit.oriented_normal * SENSIBLE_EPS;

        if material.reflectance >= MIRROR_REFLECTANCE_CUTOFF {
            let reflected = Ray::new(
                safe_reflection_spot,
                ray.direction.reflect(hit.oriented_normal),
            );
            return self.sample_impl(&reflected, scene, depth + 1, stats);
        }

        let mut lambertian = Color::zero();
        let mut specular = Color::zero();

        for light in &self.dot_lights {
            let to_light = light.position - hit.point;
            let light_distance = to_light.length();

            // Occluders between the surface and the light leave only the
            // ambient term.
            let shadow_ray = Ray::new(safe_reflection_spot, to_light / light_distance);
            if let Some(occluder) = scene.intersect_ray(&shadow_ray, stats) {
                if occluder.distance < light_distance {
                    continue;
                }
            }

            let (c_lambert, c_specular) = blinn_phong_coefficients(
                light.position,
                hit.point,
                hit.oriented_normal,
                -ray.direction,
            );

            lambertian += light.emission * c_lambert;
            specular += light.emission * c_specular;
        }

        material
            .albedo
            .hadamard(lambertian + specular + self.ambient_light)
    }
}

impl Sampler for WhittedSampler {
    fn sample(&self, ray: &Ray, scene: &Scene) -> Color {
        let mut stats = RayStats::new();
        self.sample_impl(ray, scene, 0, &mut stats)
    }
}

pub type WhittedIntegrator = SamplerIntegrator<WhittedSampler>;

impl WhittedIntegrator {
    pub fn whitted() -> Self {
        Self::new(WhittedSampler::default())
    }
}
