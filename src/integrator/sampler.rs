//! The per-ray integrator wrapper and the two trivial shading strategies.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::camera::Camera;
use crate::config;
use crate::image::{Image, ImageView};
use crate::math::Color;
use crate::ray::Ray;
use crate::store::{RayStats, Scene, ShapeStore};
use crate::sync::WorkerPool;

use super::Integrator;

/// A per-ray shading strategy. Implementations are cloned into each render
/// pass and invoked concurrently from every worker thread.
pub trait Sampler: Clone + Send + Sync + 'static {
    fn sample(&self, ray: &Ray, scene: &Scene) -> Color;
}

/// Everything one render pass needs, shared by the pass's work items.
///
/// Snapshotting camera, scene handle, and sampler per pass keeps the
/// persistent workers decoupled from the integrator's mutable state.
struct RenderPass<S: Sampler> {
    camera: Camera,
    scene: Arc<Scene>,
    sampler: S,
    results: Mutex<Vec<RowBand>>,
}

/// A completed run of rows on its way back to the back buffer.
pub(super) struct RowBand {
    pub start_row: usize,
    pub pixels: Vec<Color>,
}

struct RenderJob<S: Sampler> {
    rows: (usize, usize),
    pass: Arc<RenderPass<S>>,
}

/// Pool worker: trace every pixel of the job's rows into an owned band,
/// then hand the band back for stitching. Workers never touch the back
/// buffer directly, so the pass needs no write synchronization beyond the
/// results list.
fn render_rows<S: Sampler>(job: RenderJob<S>) {
    let pass = &job.pass;
    let (start, end) = job.rows;
    let width = pass.camera.resolution.0;

    let mut pixels = Vec::with_capacity((end - start) * width);
    for y in start..end {
        for x in 0..width {
            let ray = pass.camera.make_ray(x, y);
            pixels.push(pass.sampler.sample(&ray, &pass.scene));
        }
    }

    pass.results.lock().unwrap().push(RowBand {
        start_row: start,
        pixels,
    });
}

/// Drives a [`Sampler`] over every pixel with a persistent worker pool,
/// one primary ray per pixel per pass.
pub struct SamplerIntegrator<S: Sampler> {
    sampler: S,
    camera: Camera,
    scene: Option<Arc<Scene>>,
    back_buffer: Image,
    pool: WorkerPool<RenderJob<S>>,
    threads: usize,
}

impl<S: Sampler> SamplerIntegrator<S> {
    pub fn new(sampler: S) -> Self {
        let threads = config::preferred_thread_count();
        let mut pool = WorkerPool::new(render_rows::<S>, threads);
        pool.do_work(threads);

        Self {
            sampler,
            camera: Camera::default(),
            scene: None,
            back_buffer: Image::default(),
            pool,
            threads,
        }
    }

    pub fn sampler(&self) -> &S {
        &self.sampler
    }

    /// Sampler configuration hook (lights, toggles); call before
    /// rendering.
    pub fn sampler_mut(&mut self) -> &mut S {
        &mut self.sampler
    }
}

impl<S: Sampler> Integrator for SamplerIntegrator<S> {
    fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.camera.prepare();
        self.back_buffer
            .resize(camera.resolution.0, camera.resolution.1);
    }

    fn set_scene(&mut self, scene: Arc<Scene>) {
        self.scene = Some(scene);
    }

    fn render(&mut self) {
        let scene = self
            .scene
            .as_ref()
            .expect("render called before set_scene");
        let (width, height) = self.camera.resolution;
        if width == 0 || height == 0 {
            return;
        }

        let pass = Arc::new(RenderPass {
            camera: self.camera,
            scene: Arc::clone(scene),
            sampler: self.sampler.clone(),
            results: Mutex::new(Vec::new()),
        });

        let rows_per_item = height.div_ceil(self.threads);
        self.pool.split_work(height, rows_per_item, |start, end| RenderJob {
            rows: (start, end),
            pass: Arc::clone(&pass),
        });
        self.pool.wait();

        for band in pass.results.lock().unwrap().drain(..) {
            self.back_buffer.write_rows(band.start_row, &band.pixels);
        }
        debug!(width, height, "render pass complete");
    }

    fn image(&mut self) -> ImageView<'_> {
        self.back_buffer.view()
    }
}

// ─── Albedo ─────────────────────────────────────────────────────────────────

/// Returns the hit material's albedo, or black on a miss. The cheapest way
/// to sanity-check scene geometry and camera framing.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlbedoSampler;

impl Sampler for AlbedoSampler {
    fn sample(&self, ray: &Ray, scene: &Scene) -> Color {
        let mut stats = RayStats::new();
        match scene.intersect_ray(ray, &mut stats) {
            Some(hit) => scene.material(hit.material_index).albedo,
            None => Color::zero(),
        }
    }
}

pub type AlbedoIntegrator = SamplerIntegrator<AlbedoSampler>;

impl AlbedoIntegrator {
    pub fn albedo() -> Self {
        Self::new(AlbedoSampler)
    }
}

// ─── Traversal Statistics ───────────────────────────────────────────────────

/// Encodes the traversal cost of the primary ray as a "color":
/// bounding-box tests in the red channel, shape tests in green, blue zero.
/// The raw counts are emitted as-is; scaling them into a viewable range is
/// left to whatever consumes the image.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatSampler;

impl Sampler for StatSampler {
    fn sample(&self, ray: &Ray, scene: &Scene) -> Color {
        let mut stats = RayStats::new();
        let _ = scene.intersect_ray(ray, &mut stats);
        Color::new(stats.bound_checks as f64, stats.shape_checks as f64, 0.0)
    }
}

pub type StatIntegrator = SamplerIntegrator<StatSampler>;

impl StatIntegrator {
    pub fn stat() -> Self {
        Self::new(StatSampler)
    }
}
