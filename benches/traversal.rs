//! Closest-hit throughput of the store layouts over the same triangle
//! soup.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use photon_core::bvh::{build_bvh, to_thin, to_threaded};
use photon_core::math::{Point3, Vec3};
use photon_core::ray::Ray;
use photon_core::shape::{Shape, Triangle};
use photon_core::store::{LinearStore, RayStats, ShapeStore};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn triangle_soup(rng: &mut SmallRng, count: usize) -> LinearStore {
    let mut store = LinearStore::new();
    for i in 0..count {
        let anchor = Point3::new(
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
        );
        let mut corner = |rng: &mut SmallRng| {
            anchor
                + Vec3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                )
        };
        store.insert_shape(Shape::from(Triangle::new(i, [anchor, corner(rng), corner(rng)])));
    }
    store
}

fn probe_rays(rng: &mut SmallRng, count: usize) -> Vec<Ray> {
    (0..count)
        .map(|_| {
            let origin = Point3::new(
                rng.gen_range(-15.0..15.0),
                rng.gen_range(-15.0..15.0),
                -25.0,
            );
            let toward = Point3::new(
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
                rng.gen_range(-10.0..10.0),
            );
            Ray::new(origin, (toward - origin).normalized())
        })
        .collect()
}

fn bench_layouts(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(42);
    let store = triangle_soup(&mut rng, 1000);
    let mut fat = build_bvh(&store, 20, 4);
    let thin = to_thin(&fat);
    let threaded = to_threaded(&mut fat, true);
    let rays = probe_rays(&mut rng, 256);

    let mut group = c.benchmark_group("closest_hit");
    let run = |store: &dyn ShapeStore| {
        let mut stats = RayStats::new();
        for ray in &rays {
            black_box(store.intersect_ray(ray, &mut stats));
        }
    };

    group.bench_function("linear", |b| b.iter(|| run(&store)));
    group.bench_function("fat", |b| b.iter(|| run(&fat)));
    group.bench_function("thin", |b| b.iter(|| run(&thin)));
    group.bench_function("threaded", |b| b.iter(|| run(&threaded)));
    group.finish();
}

criterion_group!(benches, bench_layouts);
criterion_main!(benches);
