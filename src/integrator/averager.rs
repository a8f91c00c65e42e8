//! Progressive averaging over any inner integrator.

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::camera::Camera;
use crate::config;
use crate::image::{Image, ImageView};
use crate::math::Color;
use crate::store::Scene;
use crate::sync::WorkerPool;

use super::sampler::RowBand;
use super::Integrator;

/// One summing work item: add the freshly rendered rows onto the matching
/// rows of the running sum.
struct SumJob {
    start_row: usize,
    rendered: Vec<Color>,
    sum: Vec<Color>,
    results: Arc<Mutex<Vec<RowBand>>>,
}

fn sum_rows(job: SumJob) {
    let pixels = job
        .sum
        .iter()
        .zip(&job.rendered)
        .map(|(&sum, &fresh)| sum + fresh)
        .collect();
    job.results.lock().unwrap().push(RowBand {
        start_row: job.start_row,
        pixels,
    });
}

/// One averaging work item: divide the sum rows by the sample count.
struct AverageJob {
    start_row: usize,
    sum: Vec<Color>,
    inverse_count: f64,
    results: Arc<Mutex<Vec<RowBand>>>,
}

fn average_rows(job: AverageJob) {
    let pixels = job.sum.iter().map(|&sum| sum * job.inverse_count).collect();
    job.results.lock().unwrap().push(RowBand {
        start_row: job.start_row,
        pixels,
    });
}

/// Wraps an integrator and accumulates a per-pixel running mean across
/// `render` calls, the backbone of long Monte-Carlo renders: keep calling
/// `render`, ask for `image` whenever a normalized view is wanted.
///
/// Two dedicated pools parallelize the pixel arithmetic by rows — one
/// folds each new frame into the sum, the other divides the sum down into
/// the presentable average.
pub struct IntegratorAverager {
    inner: Box<dyn Integrator>,
    image_sum: Image,
    image_average: Image,
    sample_count: f64,
    summer_pool: WorkerPool<SumJob>,
    averager_pool: WorkerPool<AverageJob>,
    threads: usize,
}

impl IntegratorAverager {
    pub fn new(inner: Box<dyn Integrator>) -> Self {
        let threads = config::preferred_thread_count();
        let mut summer_pool = WorkerPool::new(sum_rows, threads);
        summer_pool.do_work(threads);
        let mut averager_pool = WorkerPool::new(average_rows, threads);
        averager_pool.do_work(threads);

        Self {
            inner,
            image_sum: Image::default(),
            image_average: Image::default(),
            sample_count: 0.0,
            summer_pool,
            averager_pool,
            threads,
        }
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count as u64
    }
}

impl Integrator for IntegratorAverager {
    fn set_camera(&mut self, camera: Camera) {
        self.inner.set_camera(camera);
        let resized = self
            .image_sum
            .resize(camera.resolution.0, camera.resolution.1);
        self.image_average
            .resize(camera.resolution.0, camera.resolution.1);
        if resized {
            // A new resolution starts a new accumulation.
            self.sample_count = 0.0;
        }
    }

    fn set_scene(&mut self, scene: Arc<Scene>) {
        self.inner.set_scene(scene);
    }

    /// Renders one sample with the inner integrator and folds it into the
    /// running sum.
    fn render(&mut self) {
        self.inner.render();

        let height = self.image_sum.height();
        if height == 0 {
            return;
        }

        let results = Arc::new(Mutex::new(Vec::new()));
        {
            let view = self.inner.image();
            let sum = &self.image_sum;
            let rows_per_item = height.div_ceil(self.threads);
            self.summer_pool.split_work(height, rows_per_item, |start, end| SumJob {
                start_row: start,
                rendered: view.rows(start, end).to_vec(),
                sum: sum.rows(start, end).to_vec(),
                results: Arc::clone(&results),
            });
        }
        self.summer_pool.wait();

        for band in results.lock().unwrap().drain(..) {
            self.image_sum.write_rows(band.start_row, &band.pixels);
        }

        self.sample_count += 1.0;
        debug!(samples = self.sample_count, "averaged sample");
    }

    /// Normalizes the sum by the sample count and returns the result.
    fn image(&mut self) -> ImageView<'_> {
        let height = self.image_sum.height();
        if height > 0 && self.sample_count > 0.0 {
            let results = Arc::new(Mutex::new(Vec::new()));
            let inverse_count = 1.0 / self.sample_count;
            {
                let sum = &self.image_sum;
                let rows_per_item = height.div_ceil(self.threads);
                self.averager_pool
                    .split_work(height, rows_per_item, |start, end| AverageJob {
                        start_row: start,
                        sum: sum.rows(start, end).to_vec(),
                        inverse_count,
                        results: Arc::clone(&results),
                    });
            }
            self.averager_pool.wait();

            for band in results.lock().unwrap().drain(..) {
                self.image_average.write_rows(band.start_row, &band.pixels);
            }
        }

        self.image_average.view()
    }
}
