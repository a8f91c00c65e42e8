use crate::config::APERTURE_THRESHOLD;
use crate::math::{align_rotation, Mat3, Point3, Vec3};
use crate::ray::Ray;
use crate::rng;

/// The primary-ray generator.
///
/// Orientation is a plain rotation matrix taking camera-space directions
/// into world space; the viewing plane sits `focal_distance` in front of
/// the camera along local +Z. A non-trivial `aperture_diameter` jitters
/// ray origins across the lens for depth of field, with the focal plane
/// kept sharp.
///
/// After changing any public field call [`Camera::prepare`] before the
/// next render; it derives the viewing-plane distance and the pixel scale
/// the per-ray math depends on.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub position: Point3,
    /// Image resolution `(width, height)` in pixels.
    pub resolution: (usize, usize),
    /// Camera-space → world-space rotation.
    pub ray_transform: Mat3,
    /// Horizontal field of view in degrees.
    pub fov_degrees: f64,
    pub focal_distance: f64,
    pub aperture_diameter: f64,

    resolution_scale: f64,
    scaled_resolution: (f64, f64),
    viewing_plane_distance: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Point3::zero(),
            resolution: (0, 0),
            ray_transform: Mat3::identity(),
            fov_degrees: 45.0,
            focal_distance: 1.0,
            aperture_diameter: 1.0,
            resolution_scale: 0.0,
            scaled_resolution: (0.0, 0.0),
            viewing_plane_distance: 0.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orients the camera from Euler angles in degrees.
    pub fn set_look_deg(&mut self, angles: Vec3) -> &mut Self {
        self.set_look_rad(angles * (std::f64::consts::PI / 180.0))
    }

    /// Orients the camera from `(yaw, pitch, roll)` in radians.
    pub fn set_look_rad(&mut self, angles: Vec3) -> &mut Self {
        self.ray_transform = Mat3::rotation(angles.x, angles.y, angles.z);
        self
    }

    /// Points local +Z at `target`.
    pub fn set_look_at(&mut self, target: Point3) -> &mut Self {
        let direction = (target - self.position).normalized();
        self.ray_transform = align_rotation(direction, Vec3::unit_z()).transposed();
        self
    }

    /// Derives the quantities `make_ray` reads: the distance of the
    /// viewing plane that realizes the horizontal field of view, and the
    /// pixel scale that maps it onto the focal plane.
    pub fn prepare(&mut self) {
        let half_width = self.resolution.0 as f64 / 2.0;
        let half_fov = self.fov_degrees / 2.0;

        self.viewing_plane_distance = half_width / (half_fov / 180.0 * std::f64::consts::PI).tan();
        self.resolution_scale = self.focal_distance / self.viewing_plane_distance;
        self.scaled_resolution = (
            self.resolution.0 as f64 * self.resolution_scale,
            self.resolution.1 as f64 * self.resolution_scale,
        );
    }

    /// Primary ray through pixel `(x, y)`, jittered around the pixel by a
    /// unit-disk sample for antialiasing and across the lens when the
    /// aperture is open.
    pub fn make_ray(&self, x: usize, y: usize) -> Ray {
        let nudge = rng::unit_disk();
        let base = Vec3::new(
            (x as f64 + nudge.x - 0.5) * self.resolution_scale - self.scaled_resolution.0 / 2.0,
            (-(y as f64) + nudge.y - 0.5) * self.resolution_scale + self.scaled_resolution.1 / 2.0,
            self.focal_distance,
        );

        if self.aperture_diameter > APERTURE_THRESHOLD {
            let lens = rng::unit_disk() * self.aperture_diameter;
            let offset = Vec3::new(lens.x, lens.y, 0.0);

            return Ray::new(
                self.position + self.ray_transform * offset,
                (self.ray_transform * base - offset).normalized(),
            );
        }

        Ray::new(self.position, (self.ray_transform * base).normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(position: Point3, resolution: (usize, usize), fov: f64) -> Camera {
        let mut cam = Camera::new();
        cam.position = position;
        cam.resolution = resolution;
        cam.fov_degrees = fov;
        cam.aperture_diameter = 0.0;
        cam.prepare();
        cam
    }

    #[test]
    fn prepare_matches_fov_geometry() {
        let cam = prepared(Point3::zero(), (64, 64), 90.0);
        // Half width 32 over tan(45°) = 32.
        assert!((cam.viewing_plane_distance - 32.0).abs() < 1e-9);
        assert!((cam.resolution_scale - 1.0 / 32.0).abs() < 1e-12);
        assert!((cam.scaled_resolution.0 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn pinhole_rays_start_at_the_camera() {
        crate::rng::reseed(42);
        let cam = prepared(Point3::new(1.0, 2.0, 3.0), (32, 32), 60.0);
        for (x, y) in [(0, 0), (16, 16), (31, 31)] {
            let ray = cam.make_ray(x, y);
            assert_eq!(ray.origin, cam.position);
            assert!(ray.direction.is_normalized());
        }
    }

    #[test]
    fn central_ray_points_forward() {
        crate::rng::reseed(42);
        let cam = prepared(Point3::zero(), (64, 64), 90.0);
        let ray = cam.make_ray(32, 32);
        assert!(ray.direction.z > 0.99, "direction {}", ray.direction);
    }

    #[test]
    fn look_at_aims_the_central_ray() {
        crate::rng::reseed(42);
        let mut cam = prepared(Point3::new(0.0, 1.0, -3.0), (64, 64), 90.0);
        cam.set_look_at(Point3::zero());
        cam.prepare();

        let expected = (Point3::zero() - cam.position).normalized();
        let ray = cam.make_ray(32, 32);
        // Disk jitter can push the central ray up to ~3° off axis.
        assert!(
            ray.direction.dot(expected) > 0.997,
            "direction {} expected {expected}",
            ray.direction
        );
    }

    #[test]
    fn corner_rays_diverge_by_the_field_of_view() {
        crate::rng::reseed(42);
        let cam = prepared(Point3::zero(), (256, 256), 90.0);
        let left = cam.make_ray(0, 128);
        let right = cam.make_ray(255, 128);
        // Horizontal fov 90° means the edge rays sit ~45° off axis.
        let angle = left.direction.dot(right.direction).acos().to_degrees();
        assert!((angle - 90.0).abs() < 2.0, "angle {angle}");
    }

    #[test]
    fn open_aperture_spreads_origins() {
        crate::rng::reseed(42);
        let mut cam = prepared(Point3::zero(), (64, 64), 90.0);
        cam.aperture_diameter = 0.5;
        cam.prepare();

        let a = cam.make_ray(32, 32);
        let b = cam.make_ray(32, 32);
        assert!((a.origin - b.origin).length() > 0.0);
    }

    #[test]
    fn look_rad_roundtrips_through_degrees() {
        let mut by_rad = Camera::new();
        let mut by_deg = Camera::new();
        by_rad.set_look_rad(Vec3::new(std::f64::consts::FRAC_PI_2, 0.0, 0.0));
        by_deg.set_look_deg(Vec3::new(90.0, 0.0, 0.0));
        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (by_rad.ray_transform.at(i, j) - by_deg.ray_transform.at(i, j)).abs() < 1e-12
                );
            }
        }
    }
}
