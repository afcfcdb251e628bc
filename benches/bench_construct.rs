use criterion::{criterion_group, criterion_main, Criterion};
use kinect_context::{
    construct::{construct, construct_into},
    SpatialBounds,
};
use nalgebra::Vector3;
use ndarray::Array3;
use rand::{rngs::SmallRng, Rng, SeedableRng};

fn criterion_benchmark(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(17);
    // NFOV unbinned grid.
    let point_cloud = Array3::<i16>::from_shape_fn((576, 640, 3), |(_, _, c)| {
        if c == 2 {
            rng.gen_range(0..4000)
        } else {
            rng.gen_range(-2000..2000)
        }
    });
    let color = Array3::<u8>::from_shape_fn((576, 640, 4), |_| rng.gen());
    let bounds = SpatialBounds::new(
        Vector3::new(-500.0, -500.0, 500.0),
        Vector3::new(500.0, 500.0, 2500.0),
    );

    c.bench_function("construct", |b| {
        b.iter(|| construct(&point_cloud, &color, &bounds).unwrap());
    });

    c.bench_function("construct_into_recycled", |b| {
        let mut previous = Some(construct(&point_cloud, &color, &bounds).unwrap());
        b.iter(|| {
            let clouds = construct_into(&point_cloud, &color, &bounds, previous.take()).unwrap();
            previous = Some(clouds);
        });
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
