//! Integrators turn intersections into pixels.
//!
//! Every integrator owns a persistent worker pool; `render` slices the
//! image's rows into contiguous chunks, queues them, and waits for the
//! pool's wait-group to drain. The per-ray shading strategies are
//! [`Sampler`] implementations plugged into the shared
//! [`SamplerIntegrator`] wrapper; the [`IntegratorAverager`] stacks on top
//! of any integrator to accumulate a running mean across samples.

mod averager;
mod monte_carlo;
mod sampler;
mod whitted;

pub use averager::IntegratorAverager;
pub use monte_carlo::{MonteCarloIntegrator, MonteCarloSampler};
pub use sampler::{
    AlbedoIntegrator, AlbedoSampler, SamplerIntegrator, Sampler, StatIntegrator, StatSampler,
};
pub use whitted::{DotLight, WhittedIntegrator, WhittedSampler};

use std::sync::Arc;

use crate::camera::Camera;
use crate::image::ImageView;
use crate::store::Scene;

/// The rendering contract every integrator satisfies.
pub trait Integrator: Send {
    /// Binds and prepares the camera, resizing the back buffer to match.
    fn set_camera(&mut self, camera: Camera);

    fn set_scene(&mut self, scene: Arc<Scene>);

    /// Renders one full frame; returns once every pixel has been written.
    fn render(&mut self);

    /// Borrowing view of the most recently rendered frame.
    fn image(&mut self) -> ImageView<'_>;
}
